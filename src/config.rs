//! Client configuration.
//!
//! The coordinator is handed a finished [`Configuration`]. Reading the process
//! environment happens here, and only when a caller asks for it.

use std::env;

use thiserror::Error;

/// Environment variable holding the service base URL.
pub const SERVICE_URL_VAR: &str = "LAYLA_OCR_SERVICE_URL";
/// Environment variable holding the optional service port.
pub const SERVICE_PORT_VAR: &str = "LAYLA_OCR_SERVICE_PORT";
/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "LAYLA_API_KEY";

/// Errors loading a [`Configuration`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("{var} must be a port number, got {value:?}")]
    InvalidPort { var: &'static str, value: String },
}

/// Where the OCR service lives and how we authenticate with it.
#[derive(Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Base URL of the service, including the scheme.
    pub service_url: String,

    /// Port to append to `service_url`, if it does not already carry one.
    pub service_port: Option<u16>,

    /// Sent as `X-API-Key` on every authenticated call.
    pub api_key: String,
}

impl Configuration {
    /// Create a configuration from explicit values.
    pub fn new(
        service_url: impl Into<String>,
        service_port: Option<u16>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            service_url: service_url.into(),
            service_port,
            api_key: api_key.into(),
        }
    }

    /// Load a configuration from `LAYLA_OCR_SERVICE_URL`,
    /// `LAYLA_OCR_SERVICE_PORT` and `LAYLA_API_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load a configuration using `lookup` to resolve variable names.
    ///
    /// Empty values are treated as missing.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let service_url =
            get(SERVICE_URL_VAR).ok_or(ConfigError::Missing(SERVICE_URL_VAR))?;
        let service_port = get(SERVICE_PORT_VAR)
            .map(|value| {
                value
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidPort {
                        var: SERVICE_PORT_VAR,
                        value,
                    })
            })
            .transpose()?;
        let api_key = get(API_KEY_VAR).ok_or(ConfigError::Missing(API_KEY_VAR))?;

        Ok(Self {
            service_url: service_url.trim().to_owned(),
            service_port,
            api_key,
        })
    }

    /// The address all endpoint paths are appended to.
    pub fn base_url(&self) -> String {
        let url = self.service_url.trim_end_matches('/');
        match self.service_port {
            Some(port) => format!("{url}:{port}"),
            None => url.to_owned(),
        }
    }
}

// Keep the API key out of logs.
impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("service_url", &self.service_url)
            .field("service_port", &self.service_port)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
