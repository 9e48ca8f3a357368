//! Repository Traits
//!
//! Interfaces for data persistence. Implementations are in the infra layer.
//!
//! Every balance mutation runs inside one [`LedgerUnit`]: a scoped unit of
//! work that either commits all of its writes or none of them. Dropping a
//! unit without calling `commit` rolls it back.

use kernel::id::UserId;

use crate::domain::entities::{NewCommission, NewRewardRecord, RewardRecord};
use crate::domain::value_objects::{CommissionId, RewardAmount};
use crate::error::RewardResult;

/// Ledger store - hands out atomic units and serves read queries
#[trait_variant::make(LedgerStore: Send)]
pub trait LocalLedgerStore {
    type Unit: LedgerUnit + Send;

    /// Acquire a connection and open a unit of work
    async fn begin(&self) -> RewardResult<Self::Unit>;

    /// Current balance; `UserNotFound` if the account does not exist
    async fn balance(&self, user_id: &UserId) -> RewardResult<RewardAmount>;

    /// All records of a user, oldest first
    async fn list_records(&self, user_id: &UserId) -> RewardResult<Vec<RewardRecord>>;
}

/// One atomic unit against the balance, ledger and commission tables
#[trait_variant::make(LedgerUnit: Send)]
pub trait LocalLedgerUnit {
    /// Read the balance and hold it until the unit ends
    ///
    /// Concurrent units locking the same user are serialized here.
    async fn lock_balance(&mut self, user_id: &UserId) -> RewardResult<RewardAmount>;

    async fn set_balance(&mut self, user_id: &UserId, amount: RewardAmount) -> RewardResult<()>;

    /// Append a record; the store assigns the id
    async fn append_record(&mut self, record: NewRewardRecord) -> RewardResult<RewardRecord>;

    /// Fast-path duplicate check
    async fn commission_exists(
        &mut self,
        payer_user_id: &UserId,
        invited_user_id: &UserId,
    ) -> RewardResult<bool>;

    /// Insert the commission fact; `None` when the pair is already present
    ///
    /// This is the actual deduplication guard: implementations must make
    /// two concurrent inserts of the same pair yield exactly one `Some`.
    async fn insert_commission(
        &mut self,
        commission: &NewCommission,
    ) -> RewardResult<Option<CommissionId>>;

    async fn commit(self) -> RewardResult<()>;
}

/// Account directory - resolves referral codes to accounts
#[trait_variant::make(AccountDirectory: Send)]
pub trait LocalAccountDirectory {
    async fn resolve_referral_code(&self, referral_code: &str) -> RewardResult<Option<UserId>>;
}
