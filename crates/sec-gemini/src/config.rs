use config::{Config, Environment};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::errors::ConfigError;

pub const API_KEY_ENV_VAR: &str = "SEC_GEMINI_API_KEY";
pub const ENV_PREFIX: &str = "SEC_GEMINI";
pub const DEFAULT_HOST: &str = "https://api.secgemini.google";
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Opaque token authorizing calls to the service. Never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for an empty or whitespace-only token
    pub fn new<S: Into<String>>(token: S) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Everything an [`AnalysisClient`](crate::client::AnalysisClient) needs.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credential: Credential,
    pub host: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            host: DEFAULT_HOST.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Process-level settings read once at start-up.
///
/// Values come from `SEC_GEMINI_*` environment variables, with command-line
/// overrides layered on top:
/// - `SEC_GEMINI_API_KEY` (required)
/// - `SEC_GEMINI_HOST`
/// - `SEC_GEMINI_TIMEOUT_SECS`
#[derive(Deserialize)]
pub struct Settings {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("host", &self.host)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Command-line values that take precedence over the environment
#[derive(Debug, Default)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub host: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(Overrides::default())
    }

    pub fn load_with(overrides: Overrides) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("host", default_host())?
            .set_default("timeout_secs", default_timeout_secs())?
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("api_key", overrides.api_key)?
            .set_override_option("host", overrides.host)?
            .build()?;

        let settings: Settings = config.try_deserialize().map_err(|err| {
            tracing::debug!("Configuration error: {:?}", &err);
            ConfigError::Other(err)
        })?;

        Url::parse(&settings.host).map_err(|source| ConfigError::InvalidHost {
            host: settings.host.clone(),
            source,
        })?;

        Ok(settings)
    }

    /// The credential, or the fatal error describing its absence
    pub fn credential(&self) -> Result<Credential, ConfigError> {
        self.api_key
            .clone()
            .and_then(Credential::new)
            .ok_or_else(|| ConfigError::MissingCredential {
                env_var: API_KEY_ENV_VAR.to_string(),
            })
    }

    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        Ok(ClientConfig::new(self.credential()?)
            .with_host(self.host.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs)))
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
