// src/utils/jwt.rs

use std::{
    collections::HashSet,
    time::{SystemTime, UNIX_EPOCH},
};

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Claims the client reads from the bearer token.
///
/// The backend signs `user_id`, `email` and `role`; `sub` is accepted as well so the
/// client works against either claim layout.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Expiration time as Unix timestamp.
    #[serde(default)]
    pub exp: Option<u64>,
}

impl Claims {
    /// A token without `exp` never expires client-side; the server still decides.
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.exp.is_some_and(|exp| exp <= now)
    }
}

/// Reads the claims of a JWT without checking its signature.
///
/// The client does not hold the signing secret. The expiry read here is only an
/// optimization to avoid a doomed request; a 401 from the server is authoritative.
pub fn read_claims(token: &str) -> Result<Claims, ClientError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| ClientError::Auth(format!("Malformed token: {}", e)))?;

    Ok(token_data.claims)
}

pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
