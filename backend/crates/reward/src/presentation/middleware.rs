//! Reward Middleware

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, header};
use axum::middleware::Next;
use axum::response::Response;
use kernel::id::UserId;
use uuid::Uuid;

use crate::domain::repository::{AccountDirectory, LedgerStore};
use crate::error::RewardError;
use crate::presentation::handlers::RewardAppState;

/// The user a verified bearer token belongs to
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub UserId);

/// Middleware that requires a valid bearer token
///
/// On success the request carries an [`AuthenticatedUser`] extension.
pub async fn require_bearer_user<R>(
    State(state): State<RewardAppState<R>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, RewardError>
where
    R: LedgerStore + AccountDirectory + Clone + Send + Sync + 'static,
{
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(platform::token::bearer_token)
        .ok_or_else(|| {
            tracing::debug!("No bearer token");
            RewardError::Unauthorized
        })?;

    let now_ms = chrono::Utc::now().timestamp_millis();
    let subject = platform::token::verify_token(token, &state.config.token_secret, now_ms)
        .inspect_err(|e| tracing::debug!(error = %e, "Bearer token rejected"))?;

    let user_id = UserId::from_uuid(Uuid::from_bytes(subject));
    req.extensions_mut().insert(AuthenticatedUser(user_id));

    Ok(next.run(req).await)
}
