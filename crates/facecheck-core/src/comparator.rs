use crate::types::ComparisonResult;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompareError {
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("request to comparison API failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("comparison API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("invalid comparison API response: {0}")]
    InvalidResponse(String),
    #[error("comparison task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("invalid comparator configuration: {0}")]
    InvalidConfig(String),
}

/// Strategy for comparing a captured image against one reference image.
///
/// Implementations own whatever client or configuration they need; they are
/// built once at startup and shared across requests.
#[async_trait]
pub trait Comparator: Send + Sync {
    /// Short backend name for logs and status output.
    fn name(&self) -> &'static str;

    async fn compare(
        &self,
        reference: &[u8],
        captured: &[u8],
    ) -> Result<ComparisonResult, CompareError>;
}
