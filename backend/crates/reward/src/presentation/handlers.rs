//! HTTP Handlers

use axum::Json;
use axum::extract::{Extension, State};
use std::sync::Arc;

use crate::application::config::RewardConfig;
use crate::application::reward_ledger::RewardLedgerService;
use crate::domain::entities::CommissionOutcome;
use crate::domain::repository::{AccountDirectory, LedgerStore};
use crate::error::{RewardError, RewardResult};
use crate::presentation::dto::{
    BalanceChangeResponse, BalanceResponse, ConsumeRequest, PurchaseRequest, PurchaseResponse,
    ReferralRequest, ReferralResponse, RewardRecordResponse,
};
use crate::presentation::middleware::AuthenticatedUser;

/// Shared state for reward handlers
pub struct RewardAppState<R>
where
    R: LedgerStore + AccountDirectory + Clone + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub config: Arc<RewardConfig>,
}

impl<R> Clone for RewardAppState<R>
where
    R: LedgerStore + AccountDirectory + Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            config: Arc::clone(&self.config),
        }
    }
}

impl<R> RewardAppState<R>
where
    R: LedgerStore + AccountDirectory + Clone + Send + Sync + 'static,
{
    fn ledger(&self) -> RewardLedgerService<R> {
        RewardLedgerService::new(self.repo.clone(), self.config.clone())
    }
}

/// GET /api/rewards/balance
pub async fn get_balance<R>(
    State(state): State<RewardAppState<R>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> RewardResult<Json<BalanceResponse>>
where
    R: LedgerStore + AccountDirectory + Clone + Send + Sync + 'static,
{
    let balance = state.ledger().get_balance(user_id).await?;

    Ok(Json(BalanceResponse {
        user_id: user_id.into_uuid(),
        reward_amount: balance.value(),
    }))
}

/// GET /api/rewards/records
pub async fn list_records<R>(
    State(state): State<RewardAppState<R>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> RewardResult<Json<Vec<RewardRecordResponse>>>
where
    R: LedgerStore + AccountDirectory + Clone + Send + Sync + 'static,
{
    let records = state.ledger().list_records(user_id).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// POST /api/rewards/consume
pub async fn consume<R>(
    State(state): State<RewardAppState<R>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Json(req): Json<ConsumeRequest>,
) -> RewardResult<Json<BalanceChangeResponse>>
where
    R: LedgerStore + AccountDirectory + Clone + Send + Sync + 'static,
{
    let change = state
        .ledger()
        .consume_reward(user_id, req.amount, &req.origin)
        .await?;
    Ok(Json(change.into()))
}

/// POST /api/rewards/checkin
pub async fn checkin<R>(
    State(state): State<RewardAppState<R>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> RewardResult<Json<BalanceChangeResponse>>
where
    R: LedgerStore + AccountDirectory + Clone + Send + Sync + 'static,
{
    let amount = state.config.checkin_amount.value();
    let change = state.ledger().grant_checkin_reward(user_id, amount).await?;
    Ok(Json(change.into()))
}

/// POST /api/rewards/purchase
pub async fn purchase<R>(
    State(state): State<RewardAppState<R>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Json(req): Json<PurchaseRequest>,
) -> RewardResult<Json<PurchaseResponse>>
where
    R: LedgerStore + AccountDirectory + Clone + Send + Sync + 'static,
{
    let change = state.ledger().purchase_reward(user_id, req.amount).await?;

    Ok(Json(PurchaseResponse {
        success: true,
        change: change.into(),
    }))
}

/// POST /api/rewards/referral
///
/// The authenticated user is the invited one; the referral code names the payer.
pub async fn redeem_referral<R>(
    State(state): State<RewardAppState<R>>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Json(req): Json<ReferralRequest>,
) -> RewardResult<Json<ReferralResponse>>
where
    R: LedgerStore + AccountDirectory + Clone + Send + Sync + 'static,
{
    let code = req.referral_code.trim();
    if code.is_empty() {
        return Err(RewardError::InvalidArgument(
            "referral code must not be empty".to_string(),
        ));
    }

    let payer = tokio::time::timeout(
        state.config.unit_timeout,
        state.repo.resolve_referral_code(code),
    )
    .await
    .map_err(|_| RewardError::Timeout)??
    .ok_or(RewardError::ReferralCodeNotFound)?;

    let outcome = state
        .ledger()
        .award_commission(
            payer,
            user_id,
            state.config.referral_commission_amount.value(),
            state.config.referral_commission_status,
        )
        .await?;

    let response = match outcome {
        CommissionOutcome::Paid {
            commission_id,
            change,
        } => ReferralResponse {
            commission_id: Some(commission_id.value()),
            already_paid: false,
            balance_after: Some(change.balance_after.value()),
        },
        CommissionOutcome::AlreadyPaid => ReferralResponse {
            commission_id: None,
            already_paid: true,
            balance_after: None,
        },
    };

    Ok(Json(response))
}
