//! Reward Ledger Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, balance rules, store traits
//! - `application/` - The atomic unit routine and the ledger service
//! - `infra/` - PostgreSQL and in-memory stores
//! - `presentation/` - HTTP handlers
//!
//! ## Consistency Model
//! - Every balance change and its reward record commit together or not at all
//! - Units on the same user are serialized by a row lock on the balance
//! - A commission is paid at most once per (payer, invited) pair; the unique
//!   constraint is the guard, the existence check only a fast path
//! - Reward records are append-only

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::RewardConfig;
pub use application::reward_ledger::RewardLedgerService;
pub use domain::entities::{BalanceChange, CommissionOutcome, RewardRecord};
pub use domain::value_objects::{CommissionStatus, RewardAmount, RewardKind};
pub use error::{RewardError, RewardResult};
pub use infra::memory::{FailPoint, MemoryRewardRepository};
pub use infra::postgres::PgRewardRepository;
pub use presentation::router::{reward_router, reward_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[cfg(test)]
mod tests;
