use async_compat::CompatExt;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use url::Url;

use super::{FetchError, TelemetrySource};
use crate::{
    config::{ClientParams, ConfigError},
    telemetry::{TelemetryFilters, TelemetryPage, TelemetrySummary},
};

const SHEETS_PATH: &str = "telemetry/sheets";
const SUMMARY_PATH: &str = "telemetry/summary";

/// A TelemetrySource that talks to the call-home backend over HTTP, authenticating with an `apikey` header.
pub struct HttpTelemetryClient {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpTelemetryClient {
    /// Creates a new client. The api key is attached to every request.
    pub fn new(params: ClientParams) -> Result<Self, ConfigError> {
        let mut apikey =
            HeaderValue::from_str(&params.api_key).map_err(|_| ConfigError::BadApiKey)?;
        apikey.set_sensitive(true);
        let client = reqwest::ClientBuilder::new()
            .default_headers({
                let mut hh = HeaderMap::new();
                hh.insert("apikey", apikey);
                hh
            })
            .timeout(params.timeout)
            .build()?;
        Ok(Self {
            base_url: params.base_url,
            client,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = self.base_url.join(path)?;
        log::debug!("GET {} {:?}", url, query);
        let resp = self.client.get(url).query(query).send().compat().await?;
        let status = resp.status();
        let body = resp.bytes().compat().await?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl TelemetrySource for HttpTelemetryClient {
    async fn retrieve_page(
        &self,
        limit: u64,
        offset: u64,
        filters: &TelemetryFilters,
    ) -> Result<Option<TelemetryPage>, FetchError> {
        let mut query = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
        query.extend(filters.query_pairs());
        self.get_json(SHEETS_PATH, &query).await
    }

    async fn retrieve_summary(&self) -> Result<TelemetrySummary, FetchError> {
        self.get_json(SUMMARY_PATH, &[]).await
    }
}
