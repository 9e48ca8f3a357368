//! Domain Entities
//!
//! Core business entities for the reward ledger.

use chrono::{DateTime, Utc};
use kernel::id::UserId;

use crate::domain::value_objects::{
    CommissionId, CommissionStatus, RewardAmount, RewardKind, RewardRecordId,
};

/// Reward record - one immutable entry of the audit trail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardRecord {
    pub id: RewardRecordId,
    pub user_id: UserId,
    pub amount: RewardAmount,
    pub kind: RewardKind,
    pub origin: String,
    pub created_at: DateTime<Utc>,
}

/// Reward record before the store has assigned its id
#[derive(Debug, Clone)]
pub struct NewRewardRecord {
    pub user_id: UserId,
    pub amount: RewardAmount,
    pub kind: RewardKind,
    pub origin: String,
    pub created_at: DateTime<Utc>,
}

impl NewRewardRecord {
    pub fn new(user_id: UserId, amount: RewardAmount, kind: RewardKind, origin: String) -> Self {
        Self {
            user_id,
            amount,
            kind,
            origin,
            created_at: Utc::now(),
        }
    }

    /// Attach the store-assigned id
    pub fn into_record(self, id: RewardRecordId) -> RewardRecord {
        RewardRecord {
            id,
            user_id: self.user_id,
            amount: self.amount,
            kind: self.kind,
            origin: self.origin,
            created_at: self.created_at,
        }
    }
}

/// Commission fact - a referral payout for one (payer, invited) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commission {
    pub id: CommissionId,
    pub payer_user_id: UserId,
    pub invited_user_id: UserId,
    pub amount: RewardAmount,
    pub status: CommissionStatus,
    pub created_at: DateTime<Utc>,
}

/// Commission fact before insertion
#[derive(Debug, Clone)]
pub struct NewCommission {
    pub payer_user_id: UserId,
    pub invited_user_id: UserId,
    pub amount: RewardAmount,
    pub status: CommissionStatus,
    pub created_at: DateTime<Utc>,
}

impl NewCommission {
    pub fn new(
        payer_user_id: UserId,
        invited_user_id: UserId,
        amount: RewardAmount,
        status: CommissionStatus,
    ) -> Self {
        Self {
            payer_user_id,
            invited_user_id,
            amount,
            status,
            created_at: Utc::now(),
        }
    }

    pub fn into_commission(self, id: CommissionId) -> Commission {
        Commission {
            id,
            payer_user_id: self.payer_user_id,
            invited_user_id: self.invited_user_id,
            amount: self.amount,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

/// Result of one committed balance mutation
#[derive(Debug, Clone)]
pub struct BalanceChange {
    pub record: RewardRecord,
    pub balance_before: RewardAmount,
    pub balance_after: RewardAmount,
}

impl BalanceChange {
    /// True when a debit was floored at zero, i.e. the recorded amount
    /// is larger than what actually left the balance
    pub fn clamped(&self) -> bool {
        !self.record.kind.is_credit()
            && self.balance_before.value() - self.balance_after.value()
                < self.record.amount.value()
    }
}

/// Result of `award_commission`
#[derive(Debug, Clone)]
pub enum CommissionOutcome {
    /// A fresh payout was committed
    Paid {
        commission_id: CommissionId,
        change: BalanceChange,
    },
    /// The pair had already been paid; nothing was written
    AlreadyPaid,
}

impl CommissionOutcome {
    pub fn commission_id(&self) -> Option<CommissionId> {
        match self {
            CommissionOutcome::Paid { commission_id, .. } => Some(*commission_id),
            CommissionOutcome::AlreadyPaid => None,
        }
    }

    pub fn is_already_paid(&self) -> bool {
        matches!(self, CommissionOutcome::AlreadyPaid)
    }
}
