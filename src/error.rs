//! Error types for flurry.
//!
//! One enum per domain (configuration, storage, the analysis client, and
//! field extraction), composed into `AppError` at the top level. Nothing in
//! here retries; every error propagates to the caller.

use std::time::Duration;

use snafu::prelude::*;

// ============ Config Errors ============

/// Errors raised while loading and validating configuration.
///
/// These all fail fast: they are produced once at startup (or at client and
/// store construction), never mid-run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Service endpoint is empty.
    #[snafu(display("Service endpoint cannot be empty"))]
    EmptyEndpoint,

    /// Service endpoint is not a valid URL.
    #[snafu(display("Invalid service endpoint '{endpoint}': {source}"))]
    InvalidEndpoint {
        endpoint: String,
        source: url::ParseError,
    },

    /// API version is empty.
    #[snafu(display("API version cannot be empty"))]
    EmptyApiVersion,

    /// Analyzer id is empty.
    #[snafu(display("Analyzer id cannot be empty"))]
    EmptyAnalyzerId,

    /// Neither a subscription key nor a token was provided.
    ///
    /// Empty strings and the documented sentinel placeholders count as
    /// "not provided".
    #[snafu(display("Either a subscription key or a token must be provided"))]
    MissingCredentials,

    /// Provisioning was requested without a schema path.
    #[snafu(display("service.schema_path must be set to provision an analyzer"))]
    MissingSchemaPath,

    /// Analysis was requested without an input.
    #[snafu(display("No input to analyze: pass a file path or URL, or set service.input"))]
    MissingInput,

    /// Storage connection string is empty.
    #[snafu(display("Storage connection string cannot be empty"))]
    EmptyConnectionString,

    /// Storage connection string lacks a required entry.
    #[snafu(display("Storage connection string has no '{field}' entry"))]
    ConnectionStringField { field: &'static str },

    /// Container name is empty.
    #[snafu(display("Container name cannot be empty"))]
    EmptyContainer,

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read the configuration file.
    #[snafu(display("Failed to read configuration file: {source}"))]
    ReadFile { source: std::io::Error },

    /// Failed to read the analyzer schema document.
    #[snafu(display("Failed to read analyzer schema {path}: {source}"))]
    SchemaRead {
        path: String,
        source: std::io::Error,
    },

    /// Analyzer schema document is not valid JSON.
    #[snafu(display("Analyzer schema {path} is not valid JSON: {source}"))]
    SchemaParse {
        path: String,
        source: serde_json::Error,
    },

    /// Failed to read the input file to analyze.
    #[snafu(display("Failed to read input file {path}: {source}"))]
    InputRead {
        path: String,
        source: std::io::Error,
    },

    /// Failed to build the HTTP client.
    #[snafu(display("Failed to build HTTP client: {source}"))]
    HttpClient { source: reqwest::Error },

    /// Azure storage configuration error.
    #[snafu(display("Azure storage configuration error: {source}"))]
    AzureConfig { source: object_store::Error },
}

// ============ Storage Errors ============

/// Errors that can occur during blob store operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Object store operation failed.
    #[snafu(display("Storage operation failed: {source}"))]
    ObjectStore { source: object_store::Error },

    /// Staged append failed; the target object was left unchanged.
    #[snafu(display("Staged append to {location} failed: {source}"))]
    StagedAppend {
        location: String,
        source: object_store::Error,
    },
}

impl StorageError {
    /// Check if this error represents a "not found" condition.
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::ObjectStore { source } | StorageError::StagedAppend { source, .. } => {
                matches!(source, object_store::Error::NotFound { .. })
            }
        }
    }
}

// ============ Client Errors ============

/// Errors that can occur while talking to the analysis service.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ClientError {
    /// Request never completed (connection, DNS, timeout at the transport).
    #[snafu(display("Request to {url} failed: {source}"))]
    Request { url: String, source: reqwest::Error },

    /// Service answered with a non-2xx status.
    #[snafu(display("{operation} request returned HTTP {status}: {body}"))]
    Http {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// Submit response carried no operation-tracking URL.
    #[snafu(display("No Operation-Location header in the {operation} response"))]
    MissingOperationLocation { operation: &'static str },

    /// Response body was not the JSON the service promises.
    #[snafu(display("Failed to decode response body from {url}: {source}"))]
    BodyDecode { url: String, source: reqwest::Error },

    /// Poll loop ran past its wall-clock budget.
    #[snafu(display("Operation timed out after {budget:?}"))]
    Timeout { budget: Duration },

    /// Service reported the analysis job as failed.
    #[snafu(display("Analysis job failed: {body}"))]
    JobFailed { body: serde_json::Value },

    /// Service reported analyzer provisioning as anything but succeeded.
    #[snafu(display("Analyzer provisioning failed: {body}"))]
    ProvisioningFailed { body: serde_json::Value },
}

// ============ Field Errors ============

/// Errors raised while decoding analyzer fields from a result document.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum FieldError {
    /// Field carries a type tag this client does not know.
    #[snafu(display("Field '{field}' has unknown type tag '{tag}'"))]
    UnknownType { field: String, tag: String },

    /// Field is missing the value key its type tag promises.
    #[snafu(display("Field '{field}' is missing its '{key}' value"))]
    MissingValue { field: String, key: &'static str },

    /// Field value is present but has the wrong JSON shape.
    #[snafu(display("Field '{field}' has a malformed '{key}' value"))]
    MalformedValue { field: String, key: &'static str },

    /// Date or time value did not parse.
    #[snafu(display("Field '{field}' has an invalid {kind} value '{value}': {source}"))]
    InvalidTemporal {
        field: String,
        kind: &'static str,
        value: String,
        source: chrono::ParseError,
    },

    /// Failed to render extracted fields as a CSV record.
    #[snafu(display("Failed to render CSV record: {source}"))]
    CsvRender { source: csv::Error },
}

// ============ Top-level Errors ============

/// Top-level application errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum AppError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Storage error.
    #[snafu(display("Storage error: {source}"))]
    Storage { source: StorageError },

    /// Analysis service error.
    #[snafu(display("Analysis service error: {source}"))]
    Client { source: ClientError },

    /// Field extraction error.
    #[snafu(display("Field extraction error: {source}"))]
    Fields { source: FieldError },

    /// Failed to encode the raw analysis result for the dump file.
    #[snafu(display("Failed to encode analysis result: {source}"))]
    ResultEncode { source: serde_json::Error },

    /// Failed to write the raw analysis result dump.
    #[snafu(display("Failed to write result dump {path}: {source}"))]
    ResultDump {
        path: String,
        source: std::io::Error,
    },
}

impl From<ConfigError> for AppError {
    fn from(source: ConfigError) -> Self {
        AppError::Config { source }
    }
}

impl From<StorageError> for AppError {
    fn from(source: StorageError) -> Self {
        AppError::Storage { source }
    }
}

impl From<ClientError> for AppError {
    fn from(source: ClientError) -> Self {
        AppError::Client { source }
    }
}

impl From<FieldError> for AppError {
    fn from(source: FieldError) -> Self {
        AppError::Fields { source }
    }
}
