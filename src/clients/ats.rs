//! Client for the ATS talent-pool slice API.
//!
//! Pools are paginated by a zero-based slice index; each page carries its
//! records, a `last` flag, and (sometimes) a total count in the body or in
//! an `x-total-count` header.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::error;

use crate::clients::token::TokenService;
use crate::error::PipelineError;

const FETCH_TIMEOUT_SECS: u64 = 60;
const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// One page of upstream results, records left as raw JSON for the
/// normalizer to untangle.
#[derive(Debug)]
pub struct SlicePage {
    pub content: Vec<Value>,
    pub last: bool,
    pub total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SliceBody {
    #[serde(default)]
    content: Vec<Value>,
    #[serde(default)]
    last: bool,
    #[serde(default, rename = "totalElements")]
    total_elements: Option<u64>,
}

#[derive(Clone)]
pub struct AtsClient {
    http: Client,
    base_url: String,
    tokens: Arc<TokenService>,
}

impl AtsClient {
    pub fn new(base_url: String, tokens: Arc<TokenService>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url,
            tokens,
        })
    }

    /// Fetch one slice of a talent pool. The request goes through the token
    /// refresh guard, so an expired bearer token costs one transparent retry.
    pub async fn fetch_slice(
        &self,
        owner_key: &str,
        source_id: &str,
        index: u32,
    ) -> Result<SlicePage, PipelineError> {
        let url = format!("{}/pools/{}/slice", self.base_url, source_id);

        let response = self
            .tokens
            .call_with_refresh(owner_key, |credentials| {
                self.http
                    .get(&url)
                    .query(&[("index", index)])
                    .bearer_auth(credentials.access_token)
                    .send()
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Slice {} of pool {} rejected ({}): {}", index, source_id, status, body);
            return Err(PipelineError::UpstreamRejected {
                index,
                status: status.as_u16(),
            });
        }

        let header_total = response
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());

        let body: SliceBody = response.json().await?;

        Ok(SlicePage {
            content: body.content,
            last: body.last,
            total: header_total.or(body.total_elements),
        })
    }
}
