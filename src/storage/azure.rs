//! Azure Blob Storage backend construction.

use object_store::RetryConfig;
use object_store::azure::MicrosoftAzureBuilder;
use snafu::prelude::*;
use std::sync::Arc;

use crate::error::{
    AzureConfigSnafu, ConfigError, ConnectionStringFieldSnafu, EmptyConnectionStringSnafu,
    EmptyContainerSnafu,
};

use super::BlobStore;

impl BlobStore {
    /// Build an Azure-backed store from an account connection string
    /// (`AccountName=...;AccountKey=...`) and a container name.
    ///
    /// Fails fast on an empty connection string or container, or on a
    /// connection string missing the account entries.
    pub fn from_connection_string(
        connection_string: &str,
        container: &str,
    ) -> Result<Self, ConfigError> {
        ensure!(
            !connection_string.trim().is_empty(),
            EmptyConnectionStringSnafu
        );
        ensure!(!container.trim().is_empty(), EmptyContainerSnafu);

        let account = field(connection_string, "AccountName").context(
            ConnectionStringFieldSnafu {
                field: "AccountName",
            },
        )?;
        let key =
            field(connection_string, "AccountKey").context(ConnectionStringFieldSnafu {
                field: "AccountKey",
            })?;

        let store = MicrosoftAzureBuilder::new()
            .with_account(account)
            .with_access_key(key)
            .with_container_name(container)
            .with_retry(RetryConfig::default())
            .build()
            .context(AzureConfigSnafu)?;

        let label = format!("https://{account}.blob.core.windows.net/{container}");
        Ok(Self::with_store(Arc::new(store), label))
    }
}

/// Pull one `Key=value` entry out of a semicolon-separated connection
/// string. The split is on the first `=`, so base64 key padding survives.
fn field<'a>(connection_string: &'a str, name: &str) -> Option<&'a str> {
    connection_string.split(';').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key.trim().eq_ignore_ascii_case(name) && !value.is_empty()).then_some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONN: &str = "DefaultEndpointsProtocol=https;AccountName=acct;\
                        AccountKey=dGVzdGtleQ==;EndpointSuffix=core.windows.net";

    #[test]
    fn test_field_extraction() {
        assert_eq!(field(CONN, "AccountName"), Some("acct"));
        assert_eq!(field(CONN, "AccountKey"), Some("dGVzdGtleQ=="));
        assert_eq!(field(CONN, "SasToken"), None);
    }

    #[test]
    fn test_construction_succeeds() {
        let store = BlobStore::from_connection_string(CONN, "replays").unwrap();
        assert_eq!(
            format!("{store:?}"),
            "BlobStore<https://acct.blob.core.windows.net/replays>"
        );
    }

    #[test]
    fn test_empty_connection_string_rejected() {
        let err = BlobStore::from_connection_string("", "replays").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyConnectionString));
    }

    #[test]
    fn test_empty_container_rejected() {
        let err = BlobStore::from_connection_string(CONN, "").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyContainer));
    }

    #[test]
    fn test_missing_account_key_rejected() {
        let err =
            BlobStore::from_connection_string("AccountName=acct", "replays").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ConnectionStringField { field: "AccountKey" }
        ));
    }
}
