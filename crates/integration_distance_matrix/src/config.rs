//! Distance Matrix client configuration

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::DistanceMatrixError;
use crate::query::Language;
use crate::rate_limit::RateLimitConfig;
use crate::retry::RetryConfig;

/// Configuration for the Distance Matrix client
///
/// Exactly one authentication mode must be configured: an API `key`, or a
/// `client_id`/`client_secret` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceMatrixConfig {
    /// Base URL of the web service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key
    #[serde(default, skip_serializing)]
    pub key: Option<SecretString>,

    /// Client ID (premium plan)
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret, a.k.a. private key (premium plan)
    #[serde(default, skip_serializing)]
    pub client_secret: Option<SecretString>,

    /// Usage reporting channel (premium plan)
    #[serde(default)]
    pub channel: Option<String>,

    /// Request timeout in milliseconds, measured from submission
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Default language for all queries
    #[serde(default)]
    pub language: Option<Language>,

    /// Rate limiting
    #[serde(default)]
    pub rate: RateLimitConfig,

    /// Retry of transient failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "https://api.distancematrix.ai".to_string()
}

const fn default_timeout_ms() -> u64 {
    60_000
}

fn default_user_agent() -> String {
    format!("integration_distance_matrix/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for DistanceMatrixConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            key: None,
            client_id: None,
            client_secret: None,
            channel: None,
            timeout_ms: default_timeout_ms(),
            language: None,
            rate: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            user_agent: default_user_agent(),
        }
    }
}

/// The active authentication mode
#[derive(Debug, Clone)]
pub enum Credentials {
    /// API key sent as `key`
    ApiKey(SecretString),
    /// Premium plan client credentials
    Client {
        /// Sent as `client`
        client_id: String,
        /// Signing secret
        client_secret: SecretString,
        /// Sent as `channel`, if set
        channel: Option<String>,
    },
}

impl Credentials {
    /// Authentication query parameters
    pub(crate) fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::ApiKey(key) => vec![("key", key.expose_secret().to_string())],
            Self::Client {
                client_id, channel, ..
            } => {
                let mut params = vec![("client", client_id.clone())];
                if let Some(channel) = channel {
                    params.push(("channel", channel.clone()));
                }
                params
            },
        }
    }
}

impl DistanceMatrixConfig {
    /// Configuration authenticated with an API key
    #[must_use]
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Some(SecretString::from(key.into())),
            ..Default::default()
        }
    }

    /// Configuration authenticated with premium plan client credentials
    #[must_use]
    pub fn with_client_credentials(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client_id: Some(client_id.into()),
            client_secret: Some(SecretString::from(client_secret.into())),
            ..Default::default()
        }
    }

    /// Create a configuration suitable for testing
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            timeout_ms: 5_000,
            retry: RetryConfig::with_interval_ms(10),
            ..Self::with_key("test-key")
        }
    }

    /// Resolve the active authentication mode
    ///
    /// # Errors
    ///
    /// Returns a configuration error unless exactly one mode is configured.
    pub fn credentials(&self) -> Result<Credentials, DistanceMatrixError> {
        let has_client = self.client_id.is_some() || self.client_secret.is_some();
        match (&self.key, has_client) {
            (Some(key), false) => {
                if key.expose_secret().is_empty() {
                    return Err(config_error("key must not be empty"));
                }
                Ok(Credentials::ApiKey(key.clone()))
            },
            (None, true) => match (&self.client_id, &self.client_secret) {
                (Some(client_id), Some(client_secret)) if !client_id.is_empty() => {
                    Ok(Credentials::Client {
                        client_id: client_id.clone(),
                        client_secret: client_secret.clone(),
                        channel: self.channel.clone(),
                    })
                },
                _ => Err(config_error(
                    "client_id and client_secret must both be set",
                )),
            },
            (Some(_), true) => Err(config_error(
                "configure either key or client_id/client_secret, not both",
            )),
            (None, false) => Err(config_error(
                "key is required unless client_id and client_secret are provided",
            )),
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), DistanceMatrixError> {
        if self.base_url.is_empty() {
            return Err(config_error("base_url must not be empty"));
        }

        if self.timeout_ms == 0 {
            return Err(config_error("timeout_ms must be greater than 0"));
        }

        if self.rate.limit == 0 {
            return Err(config_error("rate.limit must be greater than 0"));
        }

        if self.rate.period_ms == 0 {
            return Err(config_error("rate.period_ms must be greater than 0"));
        }

        self.credentials().map(|_| ())
    }
}

fn config_error(message: &str) -> DistanceMatrixError {
    DistanceMatrixError::Configuration(message.to_string())
}
