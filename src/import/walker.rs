//! Slice walker: in-order iteration over a pool's paginated slices.

use tracing::warn;

use crate::clients::ats::{AtsClient, SlicePage};
use crate::error::PipelineError;

/// Stop conditions for one walk, beyond the upstream's own `last` flag.
#[derive(Debug, Clone, Copy)]
pub struct WalkLimits {
    /// Hard ceiling on pages fetched, the runaway-loop backstop.
    pub max_pages: u32,
    /// Caller-supplied ceiling on accepted records, if any.
    pub max_records: Option<u64>,
}

/// Walks a pool slice by slice, strictly in increasing index order.
///
/// The first page is load-bearing: if it cannot be fetched the walk is
/// fatal. Later pages are best effort: a failure stops the walk early and
/// whatever was accumulated so far is kept.
pub struct SliceWalker<'a> {
    ats: &'a AtsClient,
    owner_key: &'a str,
    source_id: &'a str,
    limits: WalkLimits,
    slice_index: u32,
    finished: bool,
    pool_total: Option<u64>,
}

impl<'a> SliceWalker<'a> {
    pub fn new(
        ats: &'a AtsClient,
        owner_key: &'a str,
        source_id: &'a str,
        limits: WalkLimits,
    ) -> Self {
        Self {
            ats,
            owner_key,
            source_id,
            limits,
            slice_index: 0,
            finished: false,
            pool_total: None,
        }
    }

    /// Total pool size reported by the upstream on the first page, if any.
    pub fn pool_total(&self) -> Option<u64> {
        self.pool_total
    }

    /// Pages fetched so far. A token-refresh retry inside a fetch does not
    /// count as an extra page.
    pub fn pages_fetched(&self) -> u32 {
        self.slice_index
    }

    /// Fetch the next slice, or `None` once the walk is over. `valid_so_far`
    /// is the caller's running count of accepted records, checked against
    /// the record ceiling before another page is pulled.
    pub async fn next_page(
        &mut self,
        valid_so_far: u64,
    ) -> Result<Option<SlicePage>, PipelineError> {
        if self.finished {
            return Ok(None);
        }

        if self.slice_index >= self.limits.max_pages {
            warn!(
                "Pool {} hit the {}-page safety ceiling, stopping walk",
                self.source_id, self.limits.max_pages
            );
            self.finished = true;
            return Ok(None);
        }

        if let Some(cap) = self.limits.max_records {
            if valid_so_far >= cap {
                self.finished = true;
                return Ok(None);
            }
        }

        match self
            .ats
            .fetch_slice(self.owner_key, self.source_id, self.slice_index)
            .await
        {
            Ok(page) => {
                if self.slice_index == 0 {
                    self.pool_total = page.total;
                }
                self.slice_index += 1;
                if page.last {
                    self.finished = true;
                }
                Ok(Some(page))
            }
            // Nothing fetched yet: surface the failure.
            Err(e) if self.slice_index == 0 => Err(e),
            // Mid-walk flakiness: keep the partial results.
            Err(e) => {
                warn!(
                    "Slice {} of pool {} failed, keeping partial results: {}",
                    self.slice_index, self.source_id, e
                );
                self.finished = true;
                Ok(None)
            }
        }
    }
}
