//! Shared Kernel - Domain-crossing minimal core
//!
//! The vocabulary every backend crate agrees on:
//! - Unified error type ([`error::app_error::AppError`]) and its classification
//! - Typed identifiers for entities owned by more than one crate
//!
//! Anything ledger-specific lives in the `reward` crate, not here.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
