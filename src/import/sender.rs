//! Batch sender: groups valid records into fixed-size chunks and forwards
//! them downstream, pacing between sends.

use std::collections::VecDeque;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::clients::campaign::{CampaignClient, Destination};
use crate::error::PipelineError;
use crate::settings::ImportSettings;
use crate::types::ContactRecord;

pub struct BatchSender<'a> {
    campaign: &'a CampaignClient,
    destination: &'a Destination,
    cancel: &'a CancellationToken,
    chunk_size: usize,
    pause: std::time::Duration,
    max_chunk_bytes: usize,
    buffer: Vec<ContactRecord>,
    sent: u64,
}

impl<'a> BatchSender<'a> {
    pub fn new(
        campaign: &'a CampaignClient,
        destination: &'a Destination,
        settings: &ImportSettings,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            campaign,
            destination,
            cancel,
            chunk_size: settings.chunk_size,
            pause: settings.pause(),
            max_chunk_bytes: settings.max_chunk_bytes,
            buffer: Vec::with_capacity(settings.chunk_size),
            sent: 0,
        }
    }

    /// Buffer one valid record; once a full chunk has accumulated it is
    /// flushed. Returns the new running `sent` total when a flush happened.
    pub async fn push(&mut self, record: ContactRecord) -> Result<Option<u64>, PipelineError> {
        self.buffer.push(record);
        if self.buffer.len() >= self.chunk_size {
            return self.flush_chunk().await.map(Some);
        }
        Ok(None)
    }

    /// Flush whatever remains after the walk finished.
    pub async fn finish(&mut self) -> Result<Option<u64>, PipelineError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }
        self.flush_chunk().await.map(Some)
    }

    /// Send one logical chunk. The `sent` total moves only after the whole
    /// chunk is accepted, so observers see it grow in chunk-size steps.
    async fn flush_chunk(&mut self) -> Result<u64, PipelineError> {
        let chunk: Vec<ContactRecord> = self.buffer.drain(..).collect();
        let count = chunk.len() as u64;

        self.send_fitting(chunk).await?;

        self.sent += count;
        debug!("Chunk flushed, {} contacts sent so far", self.sent);
        Ok(self.sent)
    }

    /// Send a chunk, splitting it in halves until every part fits under the
    /// serialized byte ceiling. Order is preserved and nothing is dropped; a
    /// single record over the ceiling is still sent on its own.
    async fn send_fitting(&self, chunk: Vec<ContactRecord>) -> Result<(), PipelineError> {
        let mut pending = VecDeque::from([chunk]);

        while let Some(part) = pending.pop_front() {
            if part.len() > 1 && serialized_bytes(&part) > self.max_chunk_bytes {
                warn!(
                    "Chunk of {} records over the {}-byte ceiling, splitting",
                    part.len(),
                    self.max_chunk_bytes
                );
                let mid = part.len() / 2;
                let mut left = part;
                let right = left.split_off(mid);
                pending.push_front(right);
                pending.push_front(left);
                continue;
            }

            self.campaign.bulk_import(&part, self.destination).await?;

            if !self.pause.is_zero() {
                tokio::select! {
                    _ = sleep(self.pause) => {}
                    _ = self.cancel.cancelled() => {}
                }
            }
        }

        Ok(())
    }
}

fn serialized_bytes(records: &[ContactRecord]) -> usize {
    serde_json::to_vec(records).map_or(usize::MAX, |bytes| bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn destination() -> Destination {
        Destination {
            tag: Some("tag".to_string()),
            list_ids: None,
        }
    }

    fn settings() -> ImportSettings {
        ImportSettings::new().with_chunk_size(2).with_pause_ms(0)
    }

    fn record(n: usize) -> ContactRecord {
        ContactRecord::new("First", "Last", &format!("contact{}@x.com", n))
    }

    #[tokio::test]
    async fn test_flushes_once_chunk_fills() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/import"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let campaign = CampaignClient::new(server.uri(), "t".to_string()).unwrap();
        let dest = destination();
        let cfg = settings();
        let cancel = CancellationToken::new();
        let mut sender = BatchSender::new(&campaign, &dest, &cfg, &cancel);

        assert_eq!(sender.push(record(1)).await.unwrap(), None);
        assert_eq!(sender.push(record(2)).await.unwrap(), Some(2));
        assert_eq!(sender.push(record(3)).await.unwrap(), None);
        assert_eq!(sender.push(record(4)).await.unwrap(), Some(4));
        assert_eq!(sender.finish().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_finish_flushes_remainder() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/import"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let campaign = CampaignClient::new(server.uri(), "t".to_string()).unwrap();
        let dest = destination();
        let cfg = settings();
        let cancel = CancellationToken::new();
        let mut sender = BatchSender::new(&campaign, &dest, &cfg, &cancel);

        sender.push(record(1)).await.unwrap();
        assert_eq!(sender.finish().await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_oversized_chunk_splits_instead_of_dropping() {
        let server = MockServer::start().await;
        // ceiling forces the 4-record chunk into single-record parts
        Mock::given(method("POST"))
            .and(path("/import"))
            .respond_with(ResponseTemplate::new(200))
            .expect(4)
            .mount(&server)
            .await;

        let campaign = CampaignClient::new(server.uri(), "t".to_string()).unwrap();
        let dest = destination();
        let mut cfg = ImportSettings::new().with_chunk_size(4).with_pause_ms(0);
        cfg.max_chunk_bytes = 100;
        let cancel = CancellationToken::new();
        let mut sender = BatchSender::new(&campaign, &dest, &cfg, &cancel);

        for n in 1..=3 {
            assert_eq!(sender.push(record(n)).await.unwrap(), None);
        }
        // fourth record fills the chunk; all four still go out, in parts,
        // and `sent` moves once for the whole logical chunk
        assert_eq!(sender.push(record(4)).await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn test_downstream_rejection_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/import"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let campaign = CampaignClient::new(server.uri(), "t".to_string()).unwrap();
        let dest = destination();
        let cfg = settings();
        let cancel = CancellationToken::new();
        let mut sender = BatchSender::new(&campaign, &dest, &cfg, &cancel);

        sender.push(record(1)).await.unwrap();
        let result = sender.push(record(2)).await;
        assert!(matches!(
            result,
            Err(PipelineError::DownstreamRejected { status: 500, .. })
        ));
    }
}
