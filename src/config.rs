use std::{fmt, time::Duration};

use smol_str::SmolStr;
use thiserror::Error;
use url::Url;

/// Largest page the backend accepts.
pub const MAX_LIMIT: u64 = 100;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration error
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid base url {url:?}: {source}")]
    BadUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("base url {0} cannot carry a path")]
    OpaqueUrl(Url),
    #[error("invalid timeout {0:?}")]
    BadTimeout(String),
    #[error("api key is not a valid header value")]
    BadApiKey,
    #[error("page limit must be between 1 and 100, got {0}")]
    BadLimit(u64),
    #[error("{0} must be at least 1")]
    ZeroBound(&'static str),
    #[error("could not build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Where and how to reach the telemetry backend.
#[derive(Clone)]
pub struct ClientParams {
    pub base_url: Url,
    pub api_key: SmolStr,
    pub timeout: Duration,
}

impl fmt::Debug for ClientParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientParams")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientParams {
    /// Creates the parameters from a base url and an api key, with the default timeout.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ConfigError> {
        let mut url = Url::parse(base_url).map_err(|source| ConfigError::BadUrl {
            url: base_url.to_string(),
            source,
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::OpaqueUrl(url));
        }
        // endpoint paths are joined relative to the base, so it must end in a slash
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self {
            base_url: url,
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `CALLHOME_URL`, `CALLHOME_API_KEY` and the optional `CALLHOME_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = lookup("CALLHOME_URL").ok_or(ConfigError::MissingVar("CALLHOME_URL"))?;
        let key = lookup("CALLHOME_API_KEY").ok_or(ConfigError::MissingVar("CALLHOME_API_KEY"))?;
        let params = Self::new(&url, &key)?;
        match lookup("CALLHOME_TIMEOUT_SECS") {
            Some(secs) => {
                let secs: u64 = secs
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::BadTimeout(secs.clone()))?;
                Ok(params.with_timeout(Duration::from_secs(secs)))
            }
            None => Ok(params),
        }
    }
}

/// Parameters of the map view's pagination loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapParams {
    /// Page size requested from the backend.
    pub limit: u64,
    /// Hard cap on requests issued by a single load.
    pub max_pages: u64,
    /// Consecutive `null` pages tolerated before giving up.
    pub max_null_pages: u64,
    /// Pause before re-requesting after a `null` page.
    pub null_page_delay: Duration,
}

impl Default for MapParams {
    fn default() -> Self {
        Self {
            limit: 10,
            max_pages: 10_000,
            max_null_pages: 3,
            null_page_delay: Duration::from_secs(1),
        }
    }
}

impl MapParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit == 0 || self.limit > MAX_LIMIT {
            return Err(ConfigError::BadLimit(self.limit));
        }
        if self.max_pages == 0 {
            return Err(ConfigError::ZeroBound("max_pages"));
        }
        if self.max_null_pages == 0 {
            return Err(ConfigError::ZeroBound("max_null_pages"));
        }
        Ok(())
    }
}
