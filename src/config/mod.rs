//! Configuration for flurry.
//!
//! One YAML file, interpolated against the environment, validated once at
//! load. Components receive the validated struct; nothing reads environment
//! variables ad hoc at run time.

mod vars;

pub use vars::{InterpolationResult, interpolate};

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use url::Url;

use crate::client::Credentials;
use crate::error::{
    ConfigError, EmptyAnalyzerIdSnafu, EmptyApiVersionSnafu, EmptyConnectionStringSnafu,
    EmptyContainerSnafu, EmptyEndpointSnafu, EnvInterpolationSnafu, InvalidEndpointSnafu,
    MissingCredentialsSnafu, ReadFileSnafu, YamlParseSnafu,
};

/// Placeholder value deployment templates ship for the key slot; treated
/// the same as an absent credential.
const KEY_SENTINEL: &str = "AZURE_CONTENT_UNDERSTANDING_SUBSCRIPTION_KEY";

/// Placeholder for the token slot; treated the same as an absent credential.
const TOKEN_SENTINEL: &str = "AZURE_CONTENT_UNDERSTANDING_AAD_TOKEN";

/// Configuration for the analysis service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service endpoint URL.
    pub endpoint: String,
    /// API version passed on every request.
    pub api_version: String,
    /// Analyzer to provision and analyze with.
    pub analyzer_id: String,
    /// Subscription key; wins over the token when both are set.
    #[serde(default)]
    pub subscription_key: Option<String>,
    /// Bearer token used when no subscription key is configured.
    #[serde(default)]
    pub aad_token: Option<String>,
    /// Path to the analyzer schema JSON (required for `provision`).
    #[serde(default)]
    pub schema_path: Option<String>,
    /// Default input to analyze when the CLI passes none.
    #[serde(default)]
    pub input: Option<String>,
    /// Local path to dump the raw result JSON to after a successful run.
    #[serde(default)]
    pub result_dump: Option<String>,
    /// Seconds between status polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Wall-clock budget for the analysis poll loop, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_poll_interval() -> u64 {
    2
}

fn default_timeout() -> u64 {
    3600
}

/// Configuration for the ledger's blob container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Azure storage connection string (`AccountName=...;AccountKey=...`).
    pub connection_string: String,
    /// Container holding the ledger objects.
    pub container: String,
}

/// Configuration for the daily CSV ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Path prefix inside the container (e.g. `reports/`).
    #[serde(default)]
    pub base_path: String,
    /// Logical ledger name; combined with the current date into the key.
    pub prefix: String,
}

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Analysis service configuration.
    pub service: ServiceConfig,
    /// Blob storage configuration.
    pub storage: StorageConfig,
    /// Ledger configuration.
    pub ledger: LedgerConfig,
}

/// Treat empty strings and the sentinel placeholder as "not provided".
fn provided<'a>(value: Option<&'a str>, sentinel: &str) -> Option<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != sentinel)
}

impl ServiceConfig {
    /// Pick the credential the client should use.
    ///
    /// A subscription key wins over a token when both are present. Neither
    /// being usable is a configuration error.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        if let Some(key) = provided(self.subscription_key.as_deref(), KEY_SENTINEL) {
            return Ok(Credentials::subscription_key(key));
        }
        if let Some(token) = provided(self.aad_token.as_deref(), TOKEN_SENTINEL) {
            let token = token.to_string();
            return Ok(Credentials::token(move || token.clone()));
        }
        MissingCredentialsSnafu.fail()
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).context(ReadFileSnafu)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let result = interpolate(contents);
        ensure!(
            result.is_ok(),
            EnvInterpolationSnafu {
                message: result.errors.join("\n"),
            }
        );

        let config: Config = serde_yaml::from_str(&result.text).context(YamlParseSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(!self.service.endpoint.trim().is_empty(), EmptyEndpointSnafu);
        Url::parse(&self.service.endpoint).context(InvalidEndpointSnafu {
            endpoint: &self.service.endpoint,
        })?;
        ensure!(
            !self.service.api_version.trim().is_empty(),
            EmptyApiVersionSnafu
        );
        ensure!(
            !self.service.analyzer_id.trim().is_empty(),
            EmptyAnalyzerIdSnafu
        );
        self.service.credentials()?;
        ensure!(
            !self.storage.connection_string.trim().is_empty(),
            EmptyConnectionStringSnafu
        );
        ensure!(!self.storage.container.trim().is_empty(), EmptyContainerSnafu);
        Ok(())
    }
}
