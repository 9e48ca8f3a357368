//! Atomic Balance Unit
//!
//! The single routine behind every ledger operation:
//! lock balance → guard commission → set balance → append record → commit.
//!
//! Any `?` before `commit` drops the unit, which rolls back everything the
//! unit wrote. The same happens when the timeout fires mid-unit.
//!
//! The timeout covers the staged steps only. Once `commit` is sent the unit
//! may already be durable on the store, so it is awaited to the end; the
//! store's own statement timeout bounds it.

use kernel::id::UserId;
use std::time::Duration;

use crate::domain::entities::{BalanceChange, NewRewardRecord};
use crate::domain::repository::{LedgerStore, LedgerUnit};
use crate::domain::services::BalanceMutation;
use crate::domain::value_objects::{CommissionId, RewardAmount};
use crate::error::{RewardError, RewardResult};

/// What a committed (or skipped) unit produced
#[derive(Debug)]
pub(crate) enum UnitOutcome {
    Applied {
        commission_id: Option<CommissionId>,
        change: BalanceChange,
    },
    /// The commission pair already exists; the unit wrote nothing
    DuplicateCommission,
}

/// A unit with every write staged, waiting for `commit`
enum Staged<U> {
    Ready {
        unit: U,
        commission_id: Option<CommissionId>,
        change: BalanceChange,
    },
    DuplicateCommission,
}

/// Run `mutation` against `user_id` as one atomic unit
///
/// Staging is bounded by `timeout`; a unit cut off there wrote nothing.
pub(crate) async fn apply_mutation<S>(
    store: &S,
    user_id: &UserId,
    amount: RewardAmount,
    mutation: BalanceMutation,
    timeout: Duration,
) -> RewardResult<UnitOutcome>
where
    S: LedgerStore + Sync,
{
    let kind = mutation.kind();
    let staged = match tokio::time::timeout(timeout, stage_unit(store, user_id, amount, &mutation))
        .await
    {
        Ok(staged) => staged?,
        Err(_) => {
            tracing::warn!(
                user_id = %user_id,
                kind = %kind,
                timeout_ms = timeout.as_millis() as u64,
                "Ledger unit timed out, rolled back"
            );
            return Err(RewardError::Timeout);
        }
    };

    let (unit, commission_id, change) = match staged {
        Staged::Ready {
            unit,
            commission_id,
            change,
        } => (unit, commission_id, change),
        Staged::DuplicateCommission => return Ok(UnitOutcome::DuplicateCommission),
    };

    unit.commit().await?;

    if change.clamped() {
        tracing::warn!(
            user_id = %user_id,
            requested = amount.value(),
            balance_before = change.balance_before.value(),
            "Cost clamped at zero; record keeps the requested amount"
        );
    }

    tracing::info!(
        user_id = %user_id,
        kind = %change.record.kind,
        amount = amount.value(),
        balance_after = change.balance_after.value(),
        record_id = %change.record.id,
        "Ledger unit committed"
    );

    Ok(UnitOutcome::Applied {
        commission_id,
        change,
    })
}

async fn stage_unit<S>(
    store: &S,
    user_id: &UserId,
    amount: RewardAmount,
    mutation: &BalanceMutation,
) -> RewardResult<Staged<S::Unit>>
where
    S: LedgerStore + Sync,
{
    let mut unit = store.begin().await?;

    // Locking first keeps a missing account from leaving an orphan commission
    // fact behind, and serializes every unit that touches this balance.
    let balance_before = unit.lock_balance(user_id).await?;

    let commission_id = match mutation.commission() {
        Some(commission) => {
            if unit
                .commission_exists(&commission.payer_user_id, &commission.invited_user_id)
                .await?
            {
                return Ok(Staged::DuplicateCommission);
            }
            match unit.insert_commission(commission).await? {
                Some(id) => Some(id),
                None => return Ok(Staged::DuplicateCommission),
            }
        }
        None => None,
    };

    let balance_after = mutation.next_balance(balance_before, amount)?;
    unit.set_balance(user_id, balance_after).await?;

    let record = unit
        .append_record(NewRewardRecord::new(
            *user_id,
            amount,
            mutation.kind(),
            mutation.origin().to_string(),
        ))
        .await?;

    Ok(Staged::Ready {
        unit,
        commission_id,
        change: BalanceChange {
            record,
            balance_before,
            balance_after,
        },
    })
}
