//! Application Layer - Use Cases
//!
//! This layer orchestrates domain logic and infrastructure.
//! Every balance mutation goes through `apply_mutation`.

pub mod apply_mutation;
pub mod config;
pub mod reward_ledger;
