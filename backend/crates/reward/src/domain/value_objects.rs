//! Domain Value Objects
//!
//! Immutable value types for the reward ledger.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RewardError, RewardResult};

/// Non-negative reward point amount
///
/// Used both for balances and for the magnitude stored in a reward record.
/// The direction of a change is carried by [`RewardKind`], never by a sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct RewardAmount(i64);

impl RewardAmount {
    pub const ZERO: RewardAmount = RewardAmount(0);

    /// Validate a caller-supplied amount
    pub fn new(value: i64) -> RewardResult<Self> {
        if value < 0 {
            return Err(RewardError::InvalidArgument(format!(
                "amount must not be negative (got {value})"
            )));
        }
        Ok(Self(value))
    }

    /// Rebuild from a column guarded by `CHECK (... >= 0)`
    pub(crate) fn from_db(value: i64) -> RewardResult<Self> {
        Self::new(value)
            .map_err(|_| RewardError::Internal(format!("negative amount in store: {value}")))
    }

    pub const fn value(&self) -> i64 {
        self.0
    }

    pub fn checked_add(self, rhs: RewardAmount) -> RewardResult<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or_else(|| RewardError::InvalidArgument("balance would overflow".to_string()))
    }

    /// Subtract, flooring at zero
    pub fn saturating_sub(self, rhs: RewardAmount) -> Self {
        Self((self.0 - rhs.0).max(0))
    }
}

impl fmt::Display for RewardAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for RewardAmount {
    type Error = RewardError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for RewardAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = i64::deserialize(deserializer)?;
        RewardAmount::new(value).map_err(serde::de::Error::custom)
    }
}

/// Kind of balance-affecting event recorded in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i16)]
pub enum RewardKind {
    /// Credit from a referral commission
    Redeemed = 1,
    /// Debit from spending points
    Cost = 2,
    /// Credit from a daily check-in
    Checkin = 3,
    /// Credit from buying points
    Buy = 4,
}

impl RewardKind {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> RewardResult<Self> {
        use RewardKind::*;
        match id {
            1 => Ok(Redeemed),
            2 => Ok(Cost),
            3 => Ok(Checkin),
            4 => Ok(Buy),
            _ => Err(RewardError::Internal(format!("invalid reward kind id: {id}"))),
        }
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        use RewardKind::*;
        match self {
            Redeemed => "Redeemed",
            Cost => "Cost",
            Checkin => "Checkin",
            Buy => "Buy",
        }
    }

    /// Whether this kind adds to the balance
    #[inline]
    pub const fn is_credit(&self) -> bool {
        !matches!(self, RewardKind::Cost)
    }
}

impl fmt::Display for RewardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a commission fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(i16)]
pub enum CommissionStatus {
    Pending = 0,
    #[default]
    Completed = 1,
    Rejected = 2,
}

impl CommissionStatus {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> RewardResult<Self> {
        use CommissionStatus::*;
        match id {
            0 => Ok(Pending),
            1 => Ok(Completed),
            2 => Ok(Rejected),
            _ => Err(RewardError::Internal(format!(
                "invalid commission status id: {id}"
            ))),
        }
    }
}

/// Store-assigned commission identifier (monotonic)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommissionId(i64);

impl CommissionId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for CommissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-assigned reward record identifier (monotonic)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewardRecordId(i64);

impl RewardRecordId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RewardRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
