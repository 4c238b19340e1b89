//! Client-assertion JWTs for the ReportStream token endpoint.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{SendError, SendResult};
use crate::constants::PRODUCTION_ENVIRONMENT;

const AUDIENCE_HOST: &str = "prime.cdc.gov";
const ASSERTION_LIFETIME_MINUTES: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    pub jti: String,
}

impl AssertionClaims {
    pub fn new(client_name: &str, environment: &str) -> Self {
        Self {
            iss: client_name.to_string(),
            sub: client_name.to_string(),
            aud: audience(environment),
            exp: (Utc::now() + Duration::minutes(ASSERTION_LIFETIME_MINUTES)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// `<env>.prime.cdc.gov`, or the bare host in production
pub fn audience(environment: &str) -> String {
    if environment == PRODUCTION_ENVIRONMENT {
        AUDIENCE_HOST.to_string()
    } else {
        format!("{environment}.{AUDIENCE_HOST}")
    }
}

/// Sign an RS256 assertion keyed by the client name
pub fn sign_client_assertion(
    client_name: &str,
    environment: &str,
    private_key_pem: &str,
) -> SendResult<String> {
    let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
        .map_err(|e| SendError::token(format!("invalid private key: {e}")))?;

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(client_name.to_string());

    encode(&header, &AssertionClaims::new(client_name, environment), &key)
        .map_err(|e| SendError::token(e.to_string()))
}
