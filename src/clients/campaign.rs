//! Client for the campaign platform's bulk-import API.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use crate::error::PipelineError;
use crate::types::ContactRecord;

const IMPORT_TIMEOUT_SECS: u64 = 120;

/// Where imported contacts land: a tag, subscription lists, or both.
/// At least one must be present for an import to make sense.
#[derive(Debug, Clone)]
pub struct Destination {
    pub tag: Option<String>,
    pub list_ids: Option<Vec<String>>,
}

impl Destination {
    pub fn is_configured(&self) -> bool {
        self.tag.is_some() || self.list_ids.as_ref().is_some_and(|ids| !ids.is_empty())
    }
}

#[derive(Debug, Serialize)]
struct SubscribeList {
    listid: String,
}

#[derive(Debug, Serialize)]
struct BulkImportPayload<'a> {
    contacts: &'a [ContactRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subscribe: Option<Vec<SubscribeList>>,
    exclude_automations: bool,
}

#[derive(Clone)]
pub struct CampaignClient {
    http: Client,
    base_url: String,
    api_token: String,
}

impl CampaignClient {
    pub fn new(base_url: String, api_token: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(IMPORT_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url,
            api_token,
        })
    }

    /// POST one batch of contacts to the bulk-import endpoint. Any non-2xx
    /// answer is fatal for the whole pipeline.
    pub async fn bulk_import(
        &self,
        records: &[ContactRecord],
        destination: &Destination,
    ) -> Result<(), PipelineError> {
        let payload = BulkImportPayload {
            contacts: records,
            tags: destination.tag.clone().map(|tag| vec![tag]),
            subscribe: destination.list_ids.as_ref().map(|ids| {
                ids.iter()
                    .map(|id| SubscribeList { listid: id.clone() })
                    .collect()
            }),
            exclude_automations: true,
        };

        let url = format!("{}/import", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("Api-Token", &self.api_token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Bulk import of {} contacts rejected ({}): {}", records.len(), status, body);
            return Err(PipelineError::DownstreamRejected {
                status: status.as_u16(),
                body,
            });
        }

        info!("Bulk import accepted: {} contacts", records.len());
        Ok(())
    }
}
