//! Reward Ledger Service
//!
//! The public operations of the ledger. Each mutating operation builds one
//! [`BalanceMutation`] and hands it to the shared atomic unit routine.

use std::sync::Arc;

use kernel::id::UserId;

use crate::application::apply_mutation::{apply_mutation, UnitOutcome};
use crate::application::config::RewardConfig;
use crate::domain::entities::{BalanceChange, CommissionOutcome, NewCommission, RewardRecord};
use crate::domain::repository::LedgerStore;
use crate::domain::services::BalanceMutation;
use crate::domain::value_objects::{CommissionStatus, RewardAmount};
use crate::error::{RewardError, RewardResult};

/// Reward ledger service
pub struct RewardLedgerService<S>
where
    S: LedgerStore,
{
    store: Arc<S>,
    config: Arc<RewardConfig>,
}

impl<S> Clone for RewardLedgerService<S>
where
    S: LedgerStore,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S> RewardLedgerService<S>
where
    S: LedgerStore + Sync,
{
    pub fn new(store: Arc<S>, config: Arc<RewardConfig>) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    /// Pay a referral commission to `invited_user_id`, at most once per pair
    ///
    /// A repeated or concurrent call for the same pair returns
    /// `CommissionOutcome::AlreadyPaid` and writes nothing.
    pub async fn award_commission(
        &self,
        payer_user_id: UserId,
        invited_user_id: UserId,
        amount: i64,
        status: CommissionStatus,
    ) -> RewardResult<CommissionOutcome> {
        let amount = RewardAmount::new(amount)?;

        let mutation = BalanceMutation::Commission {
            commission: NewCommission::new(payer_user_id, invited_user_id, amount, status),
            origin: self.config.commission_origin.clone(),
        };

        match self.run(&invited_user_id, amount, mutation).await? {
            UnitOutcome::Applied {
                commission_id: Some(commission_id),
                change,
            } => {
                tracing::info!(
                    payer_user_id = %payer_user_id,
                    invited_user_id = %invited_user_id,
                    commission_id = %commission_id,
                    "Commission paid"
                );
                Ok(CommissionOutcome::Paid {
                    commission_id,
                    change,
                })
            }
            UnitOutcome::Applied {
                commission_id: None,
                ..
            } => Err(RewardError::Internal(
                "commission unit committed without a commission id".to_string(),
            )),
            UnitOutcome::DuplicateCommission => {
                tracing::info!(
                    payer_user_id = %payer_user_id,
                    invited_user_id = %invited_user_id,
                    "Commission already paid, skipped"
                );
                Ok(CommissionOutcome::AlreadyPaid)
            }
        }
    }

    /// Spend points; the balance floors at zero
    ///
    /// The record keeps the requested amount and `origin` exactly as given,
    /// even when the balance was clamped. `BalanceChange::clamped` reports
    /// when that happened.
    pub async fn consume_reward(
        &self,
        user_id: UserId,
        amount: i64,
        origin: &str,
    ) -> RewardResult<BalanceChange> {
        let amount = RewardAmount::new(amount)?;
        let mutation = BalanceMutation::Consume {
            origin: origin.to_string(),
        };
        self.run_plain(&user_id, amount, mutation).await
    }

    /// Grant a check-in bonus
    pub async fn grant_checkin_reward(
        &self,
        user_id: UserId,
        amount: i64,
    ) -> RewardResult<BalanceChange> {
        let amount = RewardAmount::new(amount)?;
        let mutation = BalanceMutation::Checkin {
            origin: self.config.checkin_origin.clone(),
        };
        self.run_plain(&user_id, amount, mutation).await
    }

    /// Credit bought points
    pub async fn purchase_reward(
        &self,
        user_id: UserId,
        amount: i64,
    ) -> RewardResult<BalanceChange> {
        let amount = RewardAmount::new(amount)?;
        let mutation = BalanceMutation::Purchase {
            origin: self.config.purchase_origin.clone(),
        };
        self.run_plain(&user_id, amount, mutation).await
    }

    /// Every record of the user, oldest first
    pub async fn list_records(&self, user_id: UserId) -> RewardResult<Vec<RewardRecord>> {
        self.bounded(self.store.list_records(&user_id)).await
    }

    pub async fn get_balance(&self, user_id: UserId) -> RewardResult<RewardAmount> {
        self.bounded(self.store.balance(&user_id)).await
    }

    async fn run(
        &self,
        user_id: &UserId,
        amount: RewardAmount,
        mutation: BalanceMutation,
    ) -> RewardResult<UnitOutcome> {
        apply_mutation(
            self.store.as_ref(),
            user_id,
            amount,
            mutation,
            self.config.unit_timeout,
        )
        .await
    }

    async fn run_plain(
        &self,
        user_id: &UserId,
        amount: RewardAmount,
        mutation: BalanceMutation,
    ) -> RewardResult<BalanceChange> {
        match self.run(user_id, amount, mutation).await? {
            UnitOutcome::Applied { change, .. } => Ok(change),
            UnitOutcome::DuplicateCommission => Err(RewardError::Internal(
                "duplicate commission reported for a non-commission unit".to_string(),
            )),
        }
    }

    /// Reads get the same upper bound as units
    async fn bounded<T>(
        &self,
        query: impl std::future::Future<Output = RewardResult<T>>,
    ) -> RewardResult<T> {
        tokio::time::timeout(self.config.unit_timeout, query)
            .await
            .map_err(|_| RewardError::Timeout)?
    }
}
