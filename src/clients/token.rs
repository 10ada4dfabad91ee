//! Token refresh guard for the ATS OAuth bridge.
//!
//! Every upstream call goes through [`TokenService::call_with_refresh`]: on a
//! 401/403 the stored refresh token is exchanged exactly once for a new
//! bearer token and the call is retried with fresh credentials. A second
//! rejection is returned as-is; there is never more than one retry per
//! logical call.

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::future::Future;
use tracing::{info, warn};

use crate::database::{Credentials, CredentialsRepository};
use crate::error::PipelineError;

const REFRESH_TIMEOUT_SECS: u64 = 30;

/// Response from the token refresh endpoint. The provider may rotate the
/// refresh token; when it does, the new one replaces the stored one.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

pub struct TokenService {
    http: Client,
    base_url: String,
    client_id: String,
    pool: SqlitePool,
}

impl TokenService {
    pub fn new(base_url: String, client_id: String, pool: SqlitePool) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(REFRESH_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url,
            client_id,
            pool,
        })
    }

    /// Load the stored credentials for an owner key
    pub async fn credentials_for(&self, owner_key: &str) -> Result<Credentials, PipelineError> {
        CredentialsRepository::new(&self.pool)
            .find_by_owner(owner_key)
            .await
            .map_err(|e| PipelineError::Store(e.to_string()))?
            .ok_or_else(|| PipelineError::MissingCredentials(owner_key.to_string()))
    }

    /// Exchange the stored refresh token for a new bearer token, persist the
    /// result, and return the updated credentials.
    pub async fn refresh(&self, credentials: &Credentials) -> Result<Credentials, PipelineError> {
        if credentials.refresh_token.trim().is_empty() {
            return Err(PipelineError::RefreshFailed(
                "no refresh token on file".to_string(),
            ));
        }

        let token_url = format!("{}/oauth2/token", self.base_url);
        info!("Refreshing bearer token for owner: {}", credentials.owner_key);

        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("refresh_token", credentials.refresh_token.as_str()),
        ];

        let response = self.http.post(&token_url).form(&params).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(PipelineError::RefreshFailed(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let token: TokenResponse = response.json().await?;

        let repo = CredentialsRepository::new(&self.pool);
        repo.rotate(
            &credentials.owner_key,
            &token.access_token,
            token.refresh_token.as_deref(),
        )
        .await
        .map_err(|e| PipelineError::Store(e.to_string()))?;

        // Re-read so retried calls see exactly what was persisted
        repo.find_by_owner(&credentials.owner_key)
            .await
            .map_err(|e| PipelineError::Store(e.to_string()))?
            .ok_or_else(|| PipelineError::MissingCredentials(credentials.owner_key.clone()))
    }

    /// Run an upstream request with the owner's credentials, refreshing the
    /// bearer token once if the first attempt comes back 401/403.
    ///
    /// If the refresh itself fails, the original rejected response is
    /// returned unmodified so the caller sees the provider's answer.
    pub async fn call_with_refresh<F, Fut>(
        &self,
        owner_key: &str,
        request: F,
    ) -> Result<reqwest::Response, PipelineError>
    where
        F: Fn(Credentials) -> Fut,
        Fut: Future<Output = reqwest::Result<reqwest::Response>>,
    {
        let credentials = self.credentials_for(owner_key).await?;
        let first = request(credentials.clone()).await?;

        let status = first.status();
        if status != StatusCode::UNAUTHORIZED && status != StatusCode::FORBIDDEN {
            return Ok(first);
        }

        let refreshed = match self.refresh(&credentials).await {
            Ok(updated) => updated,
            Err(e) => {
                warn!("Token refresh failed for owner {}: {}", owner_key, e);
                return Ok(first);
            }
        };

        Ok(request(refreshed).await?)
    }
}
