//! Local verification of Supabase session tokens (HS256, signed with the project JWT secret).

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use super::{AuthError, Identity, IdentityProvider};

/// Audience Supabase stamps on tokens of signed-in users.
pub const SUPABASE_AUDIENCE: &str = "authenticated";

#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

pub struct JwtIdentityProvider {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[SUPABASE_AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Option<Identity> {
        let data = match decode::<SessionClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data,
            Err(e) => {
                debug!(error = %e, "rejected session token");
                return None;
            }
        };
        let id = match Uuid::parse_str(&data.claims.sub) {
            Ok(id) => id,
            Err(_) => {
                debug!(sub = %data.claims.sub, "session token subject is not a uuid");
                return None;
            }
        };
        Some(Identity {
            id,
            email: data.claims.email.map(|e| e.to_lowercase()),
        })
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn current_user(&self, token: &str) -> Result<Option<Identity>, AuthError> {
        Ok(self.verify(token))
    }
}
