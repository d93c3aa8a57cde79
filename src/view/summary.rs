use serde::Serialize;

use crate::{
    client::{DynTelemetrySource, FetchError},
    telemetry::TelemetrySummary,
};

/// Sidebar counters.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SummaryCounts {
    pub deployments: usize,
    pub countries: usize,
}

impl From<&TelemetrySummary> for SummaryCounts {
    fn from(summary: &TelemetrySummary) -> Self {
        Self {
            deployments: summary.ip_addresses.len(),
            countries: summary.countries.len(),
        }
    }
}

/// The sidebar view. Fetches the summary once and keeps it.
pub struct SummaryView {
    source: DynTelemetrySource,
    summary: Option<TelemetrySummary>,
}

impl SummaryView {
    pub fn new(source: DynTelemetrySource) -> Self {
        Self {
            source,
            summary: None,
        }
    }

    /// Loads the summary on first call; later calls return the same counts without touching the backend.
    pub async fn load(&mut self) -> Result<SummaryCounts, FetchError> {
        if let Some(summary) = &self.summary {
            return Ok(summary.into());
        }
        let summary = self.source.retrieve_summary().await.map_err(|e| {
            log::warn!("summary fetch failed: {}", e);
            e
        })?;
        let counts = SummaryCounts::from(&summary);
        log::info!(
            "summary loaded: {} deployments in {} countries",
            counts.deployments,
            counts.countries
        );
        self.summary = Some(summary);
        Ok(counts)
    }

    pub fn counts(&self) -> Option<SummaryCounts> {
        self.summary.as_ref().map(SummaryCounts::from)
    }

    /// Country names, for listing in the sidebar.
    pub fn countries(&self) -> &[smol_str::SmolStr] {
        self.summary
            .as_ref()
            .map(|s| s.countries.as_slice())
            .unwrap_or_default()
    }
}
