//! Token resolution through the Supabase auth service (`GET /auth/v1/user`).

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use super::{AuthError, Identity, IdentityProvider};

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: Uuid,
    email: Option<String>,
}

pub struct RemoteIdentityProvider {
    client: reqwest::Client,
    user_endpoint: Url,
    anon_key: String,
}

impl RemoteIdentityProvider {
    pub fn new(supabase_url: &Url, anon_key: impl Into<String>) -> Result<Self, url::ParseError> {
        Ok(Self {
            client: reqwest::Client::new(),
            user_endpoint: supabase_url.join("/auth/v1/user")?,
            anon_key: anon_key.into(),
        })
    }

    pub fn user_endpoint(&self) -> &Url {
        &self.user_endpoint
    }
}

#[async_trait]
impl IdentityProvider for RemoteIdentityProvider {
    async fn current_user(&self, token: &str) -> Result<Option<Identity>, AuthError> {
        let response = self
            .client
            .get(self.user_endpoint.clone())
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let user: AuthUser = response.json().await?;
                Ok(Some(Identity {
                    id: user.id,
                    email: user.email.map(|e| e.to_lowercase()),
                }))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!("auth service rejected session token");
                Ok(None)
            }
            status => Err(AuthError::UnexpectedStatus(status)),
        }
    }
}
