use chrono::SecondsFormat;
use tera::{Context, Tera};

use crate::telemetry::TelemetryRecord;

pub mod map;
pub mod summary;

const POPUP_TEMPLATE: &str = "<h3>Deployment details</h3>\
    <p>IP Address:\t{{ ip_address }}</p>\
    <p>Version:\t{{ version }}</p>\
    <p>Last seen:\t{{ last_seen }}</p>\
    <p>Country:\t{{ country }}</p>\
    <p>City:\t{{ city }}</p>\
    <p>Services:\t{{ services | join(sep=\",\") }}</p>";

/// The rendering boundary of the map view. Implementations put a marker on some map; the view never touches a map library directly.
pub trait MarkerSink {
    fn add_marker(&mut self, latitude: f64, longitude: f64, popup_html: &str);
}

impl<S: MarkerSink + ?Sized> MarkerSink for &mut S {
    fn add_marker(&mut self, latitude: f64, longitude: f64, popup_html: &str) {
        (**self).add_marker(latitude, longitude, popup_html)
    }
}

/// Renders the popup shown for a deployment's marker. Values are html-escaped.
pub fn popup_html(record: &TelemetryRecord) -> Result<String, tera::Error> {
    let mut ctx = Context::new();
    ctx.insert("ip_address", &record.ip_address);
    ctx.insert("version", &record.version);
    ctx.insert(
        "last_seen",
        &record.last_seen.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    ctx.insert("country", &record.country);
    ctx.insert("city", &record.city);
    ctx.insert("services", &record.services);
    Tera::one_off(POPUP_TEMPLATE, &ctx, true)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;
    use reqwest::StatusCode;

    use crate::{
        client::{FetchError, TelemetrySource},
        telemetry::{TelemetryFilters, TelemetryPage, TelemetryRecord, TelemetrySummary},
    };

    pub fn record(ip: &str, country: &str) -> TelemetryRecord {
        TelemetryRecord {
            latitude: 1.5,
            longitude: 2.5,
            ip_address: ip.into(),
            version: "0.13.0".into(),
            last_seen: Utc.with_ymd_and_hms(2023, 3, 1, 10, 0, 0).unwrap(),
            country: country.into(),
            city: "Nairobi".into(),
            services: vec!["things".into(), "users".into()],
        }
    }

    pub fn page(records: Vec<TelemetryRecord>) -> Option<TelemetryPage> {
        Some(TelemetryPage {
            total: records.len() as u64,
            offset: 0,
            limit: 10,
            telemetry: records,
        })
    }

    pub fn server_error() -> FetchError {
        FetchError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".into(),
        }
    }

    /// Plays back a fixed list of responses and records the offsets it was asked for.
    #[derive(Default)]
    pub struct ScriptedSource {
        pages: Mutex<VecDeque<Result<Option<TelemetryPage>, FetchError>>>,
        summary: Mutex<Option<Result<TelemetrySummary, FetchError>>>,
        pub offsets: Mutex<Vec<u64>>,
        pub summary_calls: Mutex<usize>,
    }

    impl ScriptedSource {
        pub fn with_pages(
            pages: impl IntoIterator<Item = Result<Option<TelemetryPage>, FetchError>>,
        ) -> Self {
            Self {
                pages: Mutex::new(pages.into_iter().collect()),
                ..Default::default()
            }
        }

        pub fn with_summary(self, summary: Result<TelemetrySummary, FetchError>) -> Self {
            *self.summary.lock() = Some(summary);
            self
        }
    }

    #[async_trait]
    impl TelemetrySource for ScriptedSource {
        async fn retrieve_page(
            &self,
            _limit: u64,
            offset: u64,
            _filters: &TelemetryFilters,
        ) -> Result<Option<TelemetryPage>, FetchError> {
            self.offsets.lock().push(offset);
            // an exhausted script behaves like an empty backend
            self.pages
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(page(vec![])))
        }

        async fn retrieve_summary(&self) -> Result<TelemetrySummary, FetchError> {
            *self.summary_calls.lock() += 1;
            self.summary
                .lock()
                .take()
                .unwrap_or_else(|| Ok(TelemetrySummary::default()))
        }
    }
}
