use thiserror::Error;

use super::{popup_html, MarkerSink};
use crate::{
    client::{DynTelemetrySource, FetchError},
    config::{ConfigError, MapParams},
    telemetry::TelemetryFilters,
};

/// What a completed map load did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MapReport {
    /// Number of page requests issued, including the terminating empty page.
    pub requests: u64,
    /// Number of markers placed.
    pub markers: u64,
}

/// Map load error. Every variant carries enough to tell a partial map from a complete one.
#[derive(Error, Debug)]
pub enum MapError {
    #[error("fetching page failed after {markers} markers: {source}")]
    Fetch { source: FetchError, markers: u64 },
    #[error("backend returned no page {requests} times in a row")]
    NoData { requests: u64, markers: u64 },
    #[error("gave up after {requests} pages without reaching an empty page")]
    PageLimit { requests: u64, markers: u64 },
    #[error("page total {total} overflows offset {offset}")]
    BadTotal {
        offset: u64,
        total: u64,
        markers: u64,
    },
    #[error("cannot render popup: {source}")]
    Popup { source: tera::Error, markers: u64 },
}

impl MapError {
    /// Markers that were already placed when the load stopped.
    pub fn markers(&self) -> u64 {
        match self {
            MapError::Fetch { markers, .. }
            | MapError::NoData { markers, .. }
            | MapError::PageLimit { markers, .. }
            | MapError::BadTotal { markers, .. }
            | MapError::Popup { markers, .. } => *markers,
        }
    }
}

/// The map view. Owns its marker sink for as long as it lives; dropping the view (or a pending `load`) releases it.
pub struct MapView<S: MarkerSink> {
    source: DynTelemetrySource,
    sink: S,
    params: MapParams,
    filters: TelemetryFilters,
}

impl<S: MarkerSink> MapView<S> {
    pub fn new(
        source: DynTelemetrySource,
        sink: S,
        params: MapParams,
        filters: TelemetryFilters,
    ) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self {
            source,
            sink,
            params,
            filters,
        })
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Tears the view down, handing back the sink with whatever was rendered into it.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Pages through the backend from offset 0, placing one marker per record, until a page reports a total of zero.
    pub async fn load(&mut self) -> Result<MapReport, MapError> {
        let mut report = MapReport::default();
        let mut offset = 0;
        let mut null_streak = 0;
        loop {
            if report.requests >= self.params.max_pages {
                log::warn!(
                    "no empty page after {} requests, stopping at offset {}",
                    report.requests,
                    offset
                );
                return Err(MapError::PageLimit {
                    requests: report.requests,
                    markers: report.markers,
                });
            }
            report.requests += 1;
            log::debug!("requesting page at offset {}", offset);
            let page = match self
                .source
                .retrieve_page(self.params.limit, offset, &self.filters)
                .await
            {
                Ok(Some(page)) => page,
                Ok(None) => {
                    null_streak += 1;
                    log::warn!(
                        "no page at offset {} ({} in a row)",
                        offset,
                        null_streak
                    );
                    if null_streak >= self.params.max_null_pages {
                        return Err(MapError::NoData {
                            requests: report.requests,
                            markers: report.markers,
                        });
                    }
                    smol::Timer::after(self.params.null_page_delay).await;
                    continue;
                }
                Err(source) => {
                    log::warn!("page at offset {} failed: {}", offset, source);
                    return Err(MapError::Fetch {
                        source,
                        markers: report.markers,
                    });
                }
            };
            null_streak = 0;
            if page.total == 0 {
                break;
            }
            for record in page.telemetry.iter() {
                let popup = popup_html(record).map_err(|source| MapError::Popup {
                    source,
                    markers: report.markers,
                })?;
                self.sink
                    .add_marker(record.latitude, record.longitude, &popup);
                report.markers += 1;
            }
            offset = match offset.checked_add(page.total) {
                Some(next) => next,
                None => {
                    log::warn!("page total {} overflows offset {}", page.total, offset);
                    return Err(MapError::BadTotal {
                        offset,
                        total: page.total,
                        markers: report.markers,
                    });
                }
            };
        }
        log::info!(
            "map loaded: {} markers from {} requests",
            report.markers,
            report.requests
        );
        Ok(report)
    }
}
