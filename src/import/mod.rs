//! Bulk import pipeline.
//!
//! A start request registers a job and detaches a task that walks the pool's
//! slices, normalizes and filters each record, batches the valid ones to the
//! campaign platform, and mutates the job registry as it goes. Progress is
//! only ever visible through the registry: pipeline failures land in the
//! job's `error` field, never on an HTTP response.

pub mod filter;
pub mod normalizer;
pub mod registry;
pub mod sender;
pub mod walker;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::clients::ats::AtsClient;
use crate::clients::campaign::{CampaignClient, Destination};
use crate::error::PipelineError;
use crate::settings::ImportSettings;
use crate::types::ImportJob;

use filter::{Outcome, RecordFilter};
use normalizer::normalize;
use registry::JobRegistry;
use sender::BatchSender;
use walker::{SliceWalker, WalkLimits};

/// Validated parameters for one import run.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub source_id: String,
    pub owner_key: String,
    pub destination: Destination,
    pub settings: ImportSettings,
}

#[derive(Clone)]
pub struct ImportPipeline {
    ats: AtsClient,
    campaign: CampaignClient,
    registry: JobRegistry,
    defaults: ImportSettings,
}

impl ImportPipeline {
    pub fn new(
        ats: AtsClient,
        campaign: CampaignClient,
        registry: JobRegistry,
        defaults: ImportSettings,
    ) -> Self {
        Self {
            ats,
            campaign,
            registry,
            defaults,
        }
    }

    pub fn defaults(&self) -> &ImportSettings {
        &self.defaults
    }

    /// Register a job and launch its pipeline as a detached task; the job id
    /// is returned immediately for progress polling.
    pub fn start(&self, request: ImportRequest) -> Uuid {
        let job = ImportJob::new(
            request.source_id.clone(),
            request.owner_key.clone(),
            request.destination.tag.clone(),
            request.destination.list_ids.clone(),
        );
        let job_id = job.id;
        let cancel = self.registry.create(job);

        info!(
            "Import job {} accepted: pool {} for owner {}",
            job_id, request.source_id, request.owner_key
        );

        let pipeline = self.clone();
        tokio::spawn(async move {
            pipeline.run(job_id, request, cancel).await;
        });

        job_id
    }

    async fn run(&self, job_id: Uuid, request: ImportRequest, cancel: CancellationToken) {
        match self.execute(job_id, &request, &cancel).await {
            Ok(()) => {
                self.registry.complete(&job_id);
                info!("Import job {} finished", job_id);
            }
            Err(e) => {
                error!("Import job {} failed: {}", job_id, e);
                self.registry.fail(&job_id, e.to_string());
            }
        }
    }

    async fn execute(
        &self,
        job_id: Uuid,
        request: &ImportRequest,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        let settings = &request.settings;
        let mut filter = RecordFilter::new();
        let mut sender = BatchSender::new(&self.campaign, &request.destination, settings, cancel);
        let mut walker = SliceWalker::new(
            &self.ats,
            &request.owner_key,
            &request.source_id,
            WalkLimits {
                max_pages: settings.max_pages,
                max_records: settings.max_records,
            },
        );

        let mut valid_count: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let Some(page) = walker.next_page(valid_count).await? else {
                break;
            };

            if walker.pages_fetched() == 1 {
                let pool_total = walker.pool_total();
                self.registry
                    .update(&job_id, |totals| totals.pool_total = pool_total);
            }

            let mut capped = false;
            for raw in &page.content {
                if settings.max_records.is_some_and(|cap| valid_count >= cap) {
                    // The record that trips the cap is seen, never classified.
                    self.registry.update(&job_id, |totals| totals.seen += 1);
                    capped = true;
                    break;
                }

                let record = normalize(raw);
                let outcome = filter.accept(&record);

                // One atomic update per record keeps
                // valid == seen - skippedNoEmail - duplicates at every snapshot.
                self.registry.update(&job_id, |totals| {
                    totals.seen += 1;
                    match outcome {
                        Outcome::Valid => totals.valid += 1,
                        Outcome::SkippedNoEmail => totals.skipped_no_email += 1,
                        Outcome::Duplicate => totals.duplicates += 1,
                    }
                });

                if outcome == Outcome::Valid {
                    valid_count += 1;
                    if let Some(sent_total) = sender.push(record).await? {
                        self.registry
                            .update(&job_id, |totals| totals.sent = sent_total);
                    }
                }
            }

            let pages_fetched = walker.pages_fetched();
            self.registry
                .update(&job_id, |totals| totals.pages_fetched = pages_fetched);

            if capped {
                break;
            }
        }

        if let Some(sent_total) = sender.finish().await? {
            self.registry
                .update(&job_id, |totals| totals.sent = sent_total);
        }

        Ok(())
    }
}
