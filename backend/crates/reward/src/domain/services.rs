//! Domain Services
//!
//! Pure balance rules. Every ledger operation is one [`BalanceMutation`];
//! the variant decides the new balance, the record kind and the origin.

use crate::domain::entities::NewCommission;
use crate::domain::value_objects::{RewardAmount, RewardKind};
use crate::error::RewardResult;

/// One balance-affecting operation
#[derive(Debug, Clone)]
pub enum BalanceMutation {
    /// Referral payout credited to the invited user, guarded by the commission fact
    Commission {
        commission: NewCommission,
        origin: String,
    },
    /// Spend points; the balance floors at zero
    Consume { origin: String },
    /// Check-in bonus
    Checkin { origin: String },
    /// Bought points
    Purchase { origin: String },
}

impl BalanceMutation {
    pub fn kind(&self) -> RewardKind {
        match self {
            BalanceMutation::Commission { .. } => RewardKind::Redeemed,
            BalanceMutation::Consume { .. } => RewardKind::Cost,
            BalanceMutation::Checkin { .. } => RewardKind::Checkin,
            BalanceMutation::Purchase { .. } => RewardKind::Buy,
        }
    }

    pub fn origin(&self) -> &str {
        match self {
            BalanceMutation::Commission { origin, .. }
            | BalanceMutation::Consume { origin }
            | BalanceMutation::Checkin { origin }
            | BalanceMutation::Purchase { origin } => origin,
        }
    }

    /// The commission fact this mutation must insert first, if any
    pub fn commission(&self) -> Option<&NewCommission> {
        match self {
            BalanceMutation::Commission { commission, .. } => Some(commission),
            _ => None,
        }
    }

    /// Balance after applying `amount` to `current`
    pub fn next_balance(
        &self,
        current: RewardAmount,
        amount: RewardAmount,
    ) -> RewardResult<RewardAmount> {
        if self.kind().is_credit() {
            current.checked_add(amount)
        } else {
            Ok(current.saturating_sub(amount))
        }
    }
}
