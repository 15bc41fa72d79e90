//! One analysis run: submit, poll, extract, land rows in the ledger.

use std::time::Duration;

use bytes::Bytes;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::client::{AnalysisClient, AnalyzeSource};
use crate::config::Config;
use crate::error::{
    AppError, ConfigError, InputReadSnafu, MissingInputSnafu, ResultDumpSnafu, ResultEncodeSnafu,
};
use crate::fields::{extract_fields, ledger_record};
use crate::ledger::write_csv_row;
use crate::storage::BlobStore;

/// Resolve what to analyze.
///
/// A positional override beats the configured input. An `http(s)://` value
/// is passed to the service by reference; anything else is read from disk
/// up front, so the client only ever sees payload shapes, never paths.
pub async fn resolve_source(
    configured: Option<&str>,
    override_input: Option<&str>,
) -> Result<AnalyzeSource, ConfigError> {
    let location = override_input.or(configured).context(MissingInputSnafu)?;

    if location.starts_with("http://") || location.starts_with("https://") {
        return Ok(AnalyzeSource::Url(location.to_string()));
    }

    let data = tokio::fs::read(location)
        .await
        .context(InputReadSnafu { path: location })?;
    Ok(AnalyzeSource::Bytes(Bytes::from(data)))
}

/// Run one analysis end to end and append one ledger row per content entry.
pub async fn run_analysis(
    config: &Config,
    client: &AnalysisClient,
    store: &BlobStore,
    source: AnalyzeSource,
) -> Result<(), AppError> {
    let service = &config.service;

    let operation = client.begin_analyze(&service.analyzer_id, source).await?;
    let result = client
        .poll_result(
            &operation,
            Duration::from_secs(service.timeout_secs),
            Duration::from_secs(service.poll_interval_secs),
        )
        .await?;

    if let Some(path) = &service.result_dump {
        let pretty = serde_json::to_vec_pretty(&result).context(ResultEncodeSnafu)?;
        tokio::fs::write(path, pretty)
            .await
            .context(ResultDumpSnafu { path })?;
        info!("Raw analysis result saved to {path}");
    }

    let documents = extract_fields(&result)?;
    if documents.is_empty() {
        info!("No contents found in analysis result");
        return Ok(());
    }

    for fields in &documents {
        if fields.is_empty() {
            debug!("Skipping content entry with no fields");
            continue;
        }
        for (name, value) in fields {
            debug!("{name}: {}", value.render());
        }

        let (header, row) = ledger_record(fields)?;
        let key = write_csv_row(
            store,
            &config.ledger.base_path,
            &config.ledger.prefix,
            &header,
            &row,
        )
        .await?;
        info!("Ledger row written to {key}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_source_prefers_override() {
        let source = resolve_source(Some("https://example.com/a.png"), Some("https://example.com/b.png"))
            .await
            .unwrap();
        assert!(matches!(source, AnalyzeSource::Url(url) if url.ends_with("b.png")));
    }

    #[tokio::test]
    async fn test_resolve_source_url_is_passed_by_reference() {
        let source = resolve_source(Some("http://example.com/card.png"), None)
            .await
            .unwrap();
        assert!(matches!(source, AnalyzeSource::Url(_)));
    }

    #[tokio::test]
    async fn test_resolve_source_reads_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.png");
        std::fs::write(&path, b"png bytes").unwrap();

        let source = resolve_source(None, Some(path.to_str().unwrap()))
            .await
            .unwrap();
        assert!(matches!(source, AnalyzeSource::Bytes(data) if data.as_ref() == b"png bytes"));
    }

    #[tokio::test]
    async fn test_resolve_source_requires_some_input() {
        let err = resolve_source(None, None).await.unwrap_err();
        assert!(matches!(err, ConfigError::MissingInput));
    }

    #[tokio::test]
    async fn test_resolve_source_missing_file() {
        let err = resolve_source(None, Some("no-such-file.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::InputRead { .. }));
    }
}
