//! Application Configuration
//!
//! Configuration for the reward application layer.

use std::time::Duration;

use crate::domain::value_objects::{CommissionStatus, RewardAmount};

/// Reward application configuration
#[derive(Debug, Clone)]
pub struct RewardConfig {
    /// Origin recorded for commission payouts
    pub commission_origin: String,
    /// Origin recorded for check-in bonuses
    pub checkin_origin: String,
    /// Origin recorded for bought points
    pub purchase_origin: String,
    /// Points granted by `POST /checkin`
    pub checkin_amount: RewardAmount,
    /// Points paid to the invited user by `POST /referral`
    pub referral_commission_amount: RewardAmount,
    /// Status written on commission facts created over HTTP
    pub referral_commission_status: CommissionStatus,
    /// Upper bound for one atomic unit, connection acquisition included
    pub unit_timeout: Duration,
    /// Secret for verifying bearer tokens (32 bytes)
    pub token_secret: [u8; 32],
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            commission_origin: "Redeemed by commission".to_string(),
            checkin_origin: "Checkin reward".to_string(),
            purchase_origin: "Bought by user".to_string(),
            checkin_amount: RewardAmount::new(10).unwrap_or_default(),
            referral_commission_amount: RewardAmount::new(100).unwrap_or_default(),
            referral_commission_status: CommissionStatus::Completed,
            unit_timeout: Duration::from_secs(5),
            token_secret: [0u8; 32],
        }
    }
}

impl RewardConfig {
    /// Create config with a random token secret (for development)
    pub fn with_random_secret() -> Self {
        Self {
            token_secret: platform::crypto::random_secret(),
            ..Default::default()
        }
    }

    /// Create config for development (generous timeout for stepping through units)
    pub fn development() -> Self {
        Self {
            unit_timeout: Duration::from_secs(30),
            ..Self::with_random_secret()
        }
    }
}
