//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations with no domain knowledge:
//! - Cryptographic utilities (HMAC-SHA256, Base64, random secrets)
//! - Signed bearer tokens (the peer verifier the API trusts for caller identity)

pub mod crypto;
pub mod token;
