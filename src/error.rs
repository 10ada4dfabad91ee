//! Pipeline error taxonomy.
//!
//! Every failure a running import can hit maps onto one of these variants;
//! the pipeline recovers them into the job's `error` field rather than
//! surfacing them to an HTTP caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// No credentials row exists for the owner key that started the job.
    #[error("no stored credentials for owner '{0}'")]
    MissingCredentials(String),

    /// The token endpoint rejected the refresh attempt, or no refresh token
    /// is on file.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// The paginated slice source answered with a non-2xx status.
    #[error("upstream slice {index} fetch failed with status {status}")]
    UpstreamRejected { index: u32, status: u16 },

    /// The bulk-import endpoint answered with a non-2xx status. Always fatal.
    #[error("downstream bulk import rejected chunk ({status}): {body}")]
    DownstreamRejected { status: u16, body: String },

    /// Transport-level failure talking to any collaborator.
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Credential store read/write failure.
    #[error("credential store error: {0}")]
    Store(String),
}
