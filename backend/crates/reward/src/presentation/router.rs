//! Reward Router

use crate::application::config::RewardConfig;
use crate::domain::repository::{AccountDirectory, LedgerStore};
use crate::infra::postgres::PgRewardRepository;
use crate::presentation::handlers::{self, RewardAppState};
use crate::presentation::middleware::require_bearer_user;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;

/// Create the reward router with PostgreSQL repository
pub fn reward_router(repo: PgRewardRepository, config: RewardConfig) -> Router {
    reward_router_generic(repo, config)
}

/// Create a generic reward router for any repository implementation
///
/// Every route requires a bearer token.
pub fn reward_router_generic<R>(repo: R, config: RewardConfig) -> Router
where
    R: LedgerStore + AccountDirectory + Clone + Send + Sync + 'static,
{
    let state = RewardAppState {
        repo: Arc::new(repo),
        config: Arc::new(config),
    };

    Router::new()
        .route("/balance", get(handlers::get_balance::<R>))
        .route("/records", get(handlers::list_records::<R>))
        .route("/consume", post(handlers::consume::<R>))
        .route("/checkin", post(handlers::checkin::<R>))
        .route("/purchase", post(handlers::purchase::<R>))
        .route("/referral", post(handlers::redeem_referral::<R>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer_user::<R>,
        ))
        .with_state(state)
}
