//! Domain Layer - Business logic and entities
//!
//! This layer contains:
//! - Domain entities (RewardRecord, Commission, BalanceChange)
//! - Domain value objects (RewardAmount, RewardKind, CommissionStatus, ids)
//! - Domain services (balance mutation rules)
//! - Repository traits (ledger store, atomic unit, account directory)

pub mod entities;
pub mod repository;
pub mod services;
pub mod value_objects;
