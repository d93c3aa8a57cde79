use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::telemetry::{TelemetryFilters, TelemetryPage, TelemetrySummary};

mod http;
pub use http::HttpTelemetryClient;

/// Anything that can hand out telemetry pages and summaries. The views only ever talk to this trait.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Retrieves one page of telemetry. `Ok(None)` means the backend answered with `null`.
    async fn retrieve_page(
        &self,
        limit: u64,
        offset: u64,
        filters: &TelemetryFilters,
    ) -> Result<Option<TelemetryPage>, FetchError>;

    /// Retrieves the aggregate country and ip address lists.
    async fn retrieve_summary(&self) -> Result<TelemetrySummary, FetchError>;
}

/// A "dynamically typed" telemetry source that doesn't expose the exact underlying transport.
pub type DynTelemetrySource = Arc<dyn TelemetrySource>;

/// Failure to fetch something from the telemetry backend
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("non-success status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("cannot build endpoint url: {0}")]
    Url(#[from] url::ParseError),
}
