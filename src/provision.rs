//! Analyzer lifecycle: delete the remote analyzer if present, recreate it
//! from the schema document, and wait for provisioning to finish.
//!
//! Recreation is idempotent delete-then-create, not update-in-place; the
//! delete failing (typically 404 on a first run) is expected and ignored.

use std::time::Duration;

use serde_json::Value;
use snafu::prelude::*;
use tracing::info;

use crate::client::AnalysisClient;
use crate::error::{AppError, ConfigError, SchemaParseSnafu, SchemaReadSnafu};

/// Pause between the delete and the create calls; the service rate-limits
/// back-to-back analyzer mutations.
const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Load the analyzer schema document from disk.
pub fn load_schema(path: &str) -> Result<Value, ConfigError> {
    let raw = std::fs::read(path).context(SchemaReadSnafu { path })?;
    serde_json::from_slice(&raw).context(SchemaParseSnafu { path })
}

/// Destroy and recreate `analyzer_id` from `schema`, then wait for the
/// provisioning operation to succeed.
///
/// The wait has no timeout; a stuck provisioning run is the operator's call
/// to kill. Any settled status other than `succeeded` fails with the
/// service's full diagnostic body.
pub async fn provision_analyzer(
    client: &AnalysisClient,
    analyzer_id: &str,
    schema: &Value,
    poll_interval: Duration,
) -> Result<(), AppError> {
    info!("Recreating analyzer {analyzer_id}");

    client.delete_analyzer(analyzer_id).await;
    tokio::time::sleep(SETTLE_DELAY).await;

    let operation = client.create_analyzer(analyzer_id, schema).await?;
    client.wait_for_provisioning(&operation, poll_interval).await?;

    info!("Analyzer '{analyzer_id}' created successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_schema_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.json");
        std::fs::write(&path, br#"{"description": "card reader"}"#).unwrap();

        let schema = load_schema(path.to_str().unwrap()).unwrap();
        assert_eq!(schema["description"], "card reader");
    }

    #[test]
    fn test_load_schema_missing_file() {
        let err = load_schema("does-not-exist.json").unwrap_err();
        assert!(matches!(err, ConfigError::SchemaRead { .. }));
    }

    #[test]
    fn test_load_schema_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, b"not json").unwrap();

        let err = load_schema(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::SchemaParse { .. }));
    }
}
