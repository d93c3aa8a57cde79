use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};
use smol_str::SmolStr;

/// One reported deployment, as returned by the sheets endpoint.
#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TelemetryRecord {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub ip_address: SmolStr,
    #[serde(rename = "mainflux_version", default)]
    pub version: SmolStr,
    pub last_seen: DateTime<Utc>,
    #[serde(default)]
    pub country: SmolStr,
    #[serde(default)]
    pub city: SmolStr,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub services: Vec<SmolStr>,
}

/// A page of telemetry. `total` is the number of records in *this* page, not in the whole collection.
/// An empty page comes back with `"telemetry": null`.
#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TelemetryPage {
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub telemetry: Vec<TelemetryRecord>,
}

/// Pre-aggregated telemetry used by the sidebar.
#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TelemetrySummary {
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub countries: Vec<SmolStr>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub ip_addresses: Vec<SmolStr>,
}

/// Optional filters understood by the sheets endpoint. Unset filters are not sent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TelemetryFilters {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub country: Option<SmolStr>,
    pub city: Option<SmolStr>,
    pub version: Option<SmolStr>,
    pub service: Option<SmolStr>,
}

impl TelemetryFilters {
    /// Query parameters for the set filters, in a stable order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(from) = self.from {
            pairs.push(("from", from.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(to) = self.to {
            pairs.push(("to", to.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        let strings = [
            ("country", &self.country),
            ("city", &self.city),
            ("version", &self.version),
            ("service", &self.service),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                pairs.push((key, value.to_string()));
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn decode_sparse_record() {
        // the backend omits empty fields
        let rec: TelemetryRecord = serde_json::from_str(
            r#"{"latitude": -1.28, "longitude": 36.82, "mainflux_version": "0.13.0", "last_seen": "2023-03-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(rec.version, "0.13.0");
        assert_eq!(rec.ip_address, "");
        assert!(rec.services.is_empty());
        assert_eq!(
            rec.last_seen,
            Utc.with_ymd_and_hms(2023, 3, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn decode_null_page_telemetry() {
        let page: TelemetryPage =
            serde_json::from_str(r#"{"total":0,"offset":2,"limit":10,"telemetry":null}"#).unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(page.offset, 2);
        assert!(page.telemetry.is_empty());

        let rec: TelemetryRecord = serde_json::from_str(
            r#"{"ip_address": "1.2.3.4", "last_seen": "2023-03-01T10:00:00Z", "services": null}"#,
        )
        .unwrap();
        assert!(rec.services.is_empty());

        let summary: TelemetrySummary =
            serde_json::from_str(r#"{"countries":null,"ip_addresses":["1.2.3.4"]}"#).unwrap();
        assert!(summary.countries.is_empty());
        assert_eq!(summary.ip_addresses, vec!["1.2.3.4"]);
    }

    #[test]
    fn decode_empty_summary() {
        let summary: TelemetrySummary = serde_json::from_str("{}").unwrap();
        assert_eq!(summary, TelemetrySummary::default());
    }

    #[test]
    fn filter_pairs() {
        assert!(TelemetryFilters::default().query_pairs().is_empty());
        let filters = TelemetryFilters {
            from: Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()),
            country: Some("Serbia".into()),
            service: Some("things".into()),
            ..Default::default()
        };
        assert_eq!(
            filters.query_pairs(),
            vec![
                ("from", "2023-01-01T00:00:00Z".to_string()),
                ("country", "Serbia".to_string()),
                ("service", "things".to_string()),
            ]
        );
    }
}
