//! In-Memory Repository
//!
//! A ledger store for tests and local runs. A unit holds the state lock for
//! its whole lifetime and works on a staged copy; `commit` swaps the copy in,
//! dropping the unit discards it. Units are therefore fully serialized.
//!
//! Faults can be armed to make one step fail or stall once, which is how
//! rollback and timeout behavior are exercised without a database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use kernel::id::UserId;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::entities::{Commission, NewCommission, NewRewardRecord, RewardRecord};
use crate::domain::repository::{AccountDirectory, LedgerStore, LedgerUnit};
use crate::domain::value_objects::{CommissionId, RewardAmount, RewardRecordId};
use crate::error::{RewardError, RewardResult};

/// Steps of a unit that a fault can be armed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Begin,
    LockBalance,
    SetBalance,
    AppendRecord,
    InsertCommission,
    Commit,
}

/// How long a stalled step takes; far beyond any unit timeout
const STALL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy)]
enum Fault {
    /// Return a storage failure
    Fail(FailPoint),
    /// Answer only after `STALL`, as a store call that hangs
    Stall(FailPoint),
}

impl Fault {
    fn point(&self) -> FailPoint {
        match self {
            Fault::Fail(p) | Fault::Stall(p) => *p,
        }
    }
}

#[derive(Debug, Clone)]
struct Account {
    referral_code: Option<String>,
    reward_amount: RewardAmount,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    accounts: HashMap<UserId, Account>,
    records: Vec<RewardRecord>,
    commissions: Vec<Commission>,
    last_record_id: i64,
    last_commission_id: i64,
}

/// In-memory ledger store
#[derive(Clone, Default)]
pub struct MemoryRewardRepository {
    state: Arc<Mutex<MemoryState>>,
    fault: Arc<StdMutex<Option<Fault>>>,
}

impl MemoryRewardRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an account with an initial balance
    pub async fn insert_user(
        &self,
        user_id: UserId,
        referral_code: Option<&str>,
        reward_amount: i64,
    ) -> RewardResult<()> {
        let reward_amount = RewardAmount::new(reward_amount)?;
        let mut state = self.state.lock().await;

        let code_taken = referral_code.is_some_and(|code| {
            state
                .accounts
                .values()
                .any(|a| a.referral_code.as_deref() == Some(code))
        });
        if code_taken || state.accounts.contains_key(&user_id) {
            return Err(RewardError::InvalidArgument(
                "user id or referral code already in use".to_string(),
            ));
        }

        state.accounts.insert(
            user_id,
            Account {
                referral_code: referral_code.map(str::to_string),
                reward_amount,
            },
        );
        Ok(())
    }

    /// All committed commission facts, in insertion order
    pub async fn commissions(&self) -> Vec<Commission> {
        self.state.lock().await.commissions.clone()
    }

    /// Make the next unit that reaches `point` fail with a storage error
    pub fn fail_once(&self, point: FailPoint) {
        self.arm(Fault::Fail(point));
    }

    /// Make the next unit that reaches `point` stall for an hour, then go on
    pub fn stall_once(&self, point: FailPoint) {
        self.arm(Fault::Stall(point));
    }

    fn arm(&self, fault: Fault) {
        *self.fault.lock().unwrap_or_else(PoisonError::into_inner) = Some(fault);
    }
}

/// Fire the armed fault if it targets `point`
async fn check_fault(slot: &StdMutex<Option<Fault>>, point: FailPoint) -> RewardResult<()> {
    let fault = {
        let mut armed = slot.lock().unwrap_or_else(PoisonError::into_inner);
        match armed.as_ref().map(Fault::point) {
            Some(p) if p == point => armed.take(),
            _ => None,
        }
    };

    match fault {
        Some(Fault::Fail(p)) => {
            tracing::debug!(point = ?p, "Injected storage failure");
            Err(RewardError::Unavailable(format!("injected failure at {p:?}")))
        }
        Some(Fault::Stall(p)) => {
            tracing::debug!(point = ?p, "Injected stall");
            tokio::time::sleep(STALL).await;
            Ok(())
        }
        None => Ok(()),
    }
}

impl LedgerStore for MemoryRewardRepository {
    type Unit = MemoryLedgerUnit;

    async fn begin(&self) -> RewardResult<MemoryLedgerUnit> {
        check_fault(&self.fault, FailPoint::Begin).await?;

        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = (*guard).clone();
        Ok(MemoryLedgerUnit {
            guard,
            staged,
            fault: Arc::clone(&self.fault),
        })
    }

    async fn balance(&self, user_id: &UserId) -> RewardResult<RewardAmount> {
        let state = self.state.lock().await;
        state
            .accounts
            .get(user_id)
            .map(|a| a.reward_amount)
            .ok_or(RewardError::UserNotFound)
    }

    async fn list_records(&self, user_id: &UserId) -> RewardResult<Vec<RewardRecord>> {
        let state = self.state.lock().await;
        if !state.accounts.contains_key(user_id) {
            return Err(RewardError::UserNotFound);
        }
        Ok(state
            .records
            .iter()
            .filter(|r| r.user_id == *user_id)
            .cloned()
            .collect())
    }
}

impl AccountDirectory for MemoryRewardRepository {
    async fn resolve_referral_code(&self, referral_code: &str) -> RewardResult<Option<UserId>> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .iter()
            .find(|(_, a)| a.referral_code.as_deref() == Some(referral_code))
            .map(|(id, _)| *id))
    }
}

/// Unit over a staged copy of the state
pub struct MemoryLedgerUnit {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    fault: Arc<StdMutex<Option<Fault>>>,
}

impl MemoryLedgerUnit {
    fn account_mut(&mut self, user_id: &UserId) -> RewardResult<&mut Account> {
        self.staged
            .accounts
            .get_mut(user_id)
            .ok_or(RewardError::UserNotFound)
    }
}

impl LedgerUnit for MemoryLedgerUnit {
    async fn lock_balance(&mut self, user_id: &UserId) -> RewardResult<RewardAmount> {
        check_fault(&self.fault, FailPoint::LockBalance).await?;
        Ok(self.account_mut(user_id)?.reward_amount)
    }

    async fn set_balance(&mut self, user_id: &UserId, amount: RewardAmount) -> RewardResult<()> {
        check_fault(&self.fault, FailPoint::SetBalance).await?;
        self.account_mut(user_id)?.reward_amount = amount;
        Ok(())
    }

    async fn append_record(&mut self, record: NewRewardRecord) -> RewardResult<RewardRecord> {
        check_fault(&self.fault, FailPoint::AppendRecord).await?;
        if !self.staged.accounts.contains_key(&record.user_id) {
            return Err(RewardError::UserNotFound);
        }

        self.staged.last_record_id += 1;
        let record = record.into_record(RewardRecordId::new(self.staged.last_record_id));
        self.staged.records.push(record.clone());
        Ok(record)
    }

    async fn commission_exists(
        &mut self,
        payer_user_id: &UserId,
        invited_user_id: &UserId,
    ) -> RewardResult<bool> {
        Ok(self.staged.commissions.iter().any(|c| {
            c.payer_user_id == *payer_user_id && c.invited_user_id == *invited_user_id
        }))
    }

    async fn insert_commission(
        &mut self,
        commission: &NewCommission,
    ) -> RewardResult<Option<CommissionId>> {
        check_fault(&self.fault, FailPoint::InsertCommission).await?;

        let duplicate = self.staged.commissions.iter().any(|c| {
            c.payer_user_id == commission.payer_user_id
                && c.invited_user_id == commission.invited_user_id
        });
        if duplicate {
            return Ok(None);
        }
        if !self.staged.accounts.contains_key(&commission.payer_user_id)
            || !self.staged.accounts.contains_key(&commission.invited_user_id)
        {
            return Err(RewardError::UserNotFound);
        }

        self.staged.last_commission_id += 1;
        let id = CommissionId::new(self.staged.last_commission_id);
        self.staged
            .commissions
            .push(commission.clone().into_commission(id));
        Ok(Some(id))
    }

    async fn commit(self) -> RewardResult<()> {
        check_fault(&self.fault, FailPoint::Commit).await?;

        let MemoryLedgerUnit {
            mut guard, staged, ..
        } = self;
        *guard = staged;
        Ok(())
    }
}
