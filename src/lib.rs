pub use client::*;
pub use config::*;
pub use geojson::*;
pub use telemetry::*;
pub use view::{
    map::{MapError, MapReport, MapView},
    summary::{SummaryCounts, SummaryView},
    MarkerSink,
};

use anyhow::Context;
use std::sync::Arc;

pub mod client;
mod config;
mod geojson;
mod telemetry;
pub mod view;

/// Both views of the call-home dashboard, mounted on one telemetry source.
pub struct Dashboard {
    source: DynTelemetrySource,
    map_params: MapParams,
}

/// The result of loading both views once.
pub struct Snapshot {
    pub layer: GeoJsonLayer,
    pub report: MapReport,
    pub counts: SummaryCounts,
}

impl Dashboard {
    /// Create a dashboard talking to the backend over HTTP
    pub fn new(client_params: ClientParams, map_params: MapParams) -> anyhow::Result<Self> {
        map_params.validate()?;
        let client = HttpTelemetryClient::new(client_params).context("cannot create client")?;
        Ok(Self::with_source(Arc::new(client), map_params))
    }

    /// Create a dashboard on top of any telemetry source
    pub fn with_source(source: DynTelemetrySource, map_params: MapParams) -> Self {
        Dashboard { source, map_params }
    }

    pub fn map_view<S: MarkerSink>(
        &self,
        sink: S,
        filters: TelemetryFilters,
    ) -> Result<MapView<S>, ConfigError> {
        MapView::new(self.source.clone(), sink, self.map_params, filters)
    }

    pub fn summary_view(&self) -> SummaryView {
        SummaryView::new(self.source.clone())
    }

    /// Loads the map into a GeoJSON layer, then the summary.
    pub async fn snapshot(&self, filters: TelemetryFilters) -> anyhow::Result<Snapshot> {
        let mut map = self.map_view(GeoJsonLayer::default(), filters)?;
        let report = map.load().await.context("map view did not load")?;
        let counts = self
            .summary_view()
            .load()
            .await
            .context("summary view did not load")?;
        Ok(Snapshot {
            layer: map.into_sink(),
            report,
            counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::view::testing::{page, record, server_error, ScriptedSource};

    fn dashboard(source: ScriptedSource) -> Dashboard {
        Dashboard::with_source(
            Arc::new(source),
            MapParams {
                null_page_delay: Duration::ZERO,
                ..Default::default()
            },
        )
    }

    #[test]
    fn snapshot() {
        let source = ScriptedSource::with_pages([
            Ok(page(vec![record("1.2.3.4", "kenya"), record("5.6.7.8", "serbia")])),
            Ok(page(vec![])),
        ])
        .with_summary(Ok(TelemetrySummary {
            countries: vec!["kenya".into(), "serbia".into()],
            ip_addresses: vec!["1.2.3.4".into(), "5.6.7.8".into(), "9.9.9.9".into()],
        }));
        let snap = smol::block_on(dashboard(source).snapshot(TelemetryFilters::default())).unwrap();
        assert_eq!(snap.layer.markers().len(), 2);
        assert_eq!(snap.report.requests, 2);
        assert_eq!(
            snap.counts,
            SummaryCounts {
                deployments: 3,
                countries: 2
            }
        );
    }

    #[test]
    fn snapshot_fails_on_partial_map() {
        let source = ScriptedSource::with_pages([
            Ok(page(vec![record("1.2.3.4", "kenya")])),
            Err(server_error()),
        ]);
        let err = smol::block_on(dashboard(source).snapshot(TelemetryFilters::default()))
            .err()
            .unwrap();
        let map_err = err.downcast_ref::<MapError>().unwrap();
        assert_eq!(map_err.markers(), 1);
    }

    #[test]
    fn views_share_source() {
        let dash = dashboard(ScriptedSource::default());
        let mut layer = GeoJsonLayer::default();
        let mut map = dash
            .map_view(&mut layer, TelemetryFilters::default())
            .unwrap();
        smol::block_on(map.load()).unwrap();
        drop(map);
        assert!(layer.markers().is_empty());
        assert_eq!(
            smol::block_on(dash.summary_view().load()).unwrap(),
            SummaryCounts::default()
        );
    }
}
