//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{BalanceChange, RewardRecord};
use crate::domain::value_objects::RewardKind;

/// Response for GET /api/rewards/balance
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub user_id: Uuid,
    pub reward_amount: i64,
}

/// One entry of GET /api/rewards/records
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardRecordResponse {
    pub record_id: i64,
    pub amount: i64,
    pub kind: RewardKind,
    pub origin: String,
    pub created_at: DateTime<Utc>,
}

impl From<RewardRecord> for RewardRecordResponse {
    fn from(record: RewardRecord) -> Self {
        Self {
            record_id: record.id.value(),
            amount: record.amount.value(),
            kind: record.kind,
            origin: record.origin,
            created_at: record.created_at,
        }
    }
}

/// Request for POST /api/rewards/consume
///
/// Amounts are plain integers here so that a negative value reaches the
/// service and comes back as a 400, not as a body rejection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeRequest {
    pub amount: i64,
    pub origin: String,
}

/// Request for POST /api/rewards/purchase
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub amount: i64,
}

/// Request for POST /api/rewards/referral
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralRequest {
    pub referral_code: String,
}

/// Response for consume and checkin
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChangeResponse {
    pub record: RewardRecordResponse,
    pub balance_before: i64,
    pub balance_after: i64,
    pub clamped: bool,
}

impl From<BalanceChange> for BalanceChangeResponse {
    fn from(change: BalanceChange) -> Self {
        let clamped = change.clamped();
        Self {
            balance_before: change.balance_before.value(),
            balance_after: change.balance_after.value(),
            clamped,
            record: change.record.into(),
        }
    }
}

/// Response for POST /api/rewards/purchase
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseResponse {
    pub success: bool,
    #[serde(flatten)]
    pub change: BalanceChangeResponse,
}

/// Response for POST /api/rewards/referral
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralResponse {
    pub commission_id: Option<i64>,
    pub already_paid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_after: Option<i64>,
}
