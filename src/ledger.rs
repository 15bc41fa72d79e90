//! Daily CSV ledger writer.
//!
//! One ledger object per (prefix, calendar day), keyed
//! `{base_path}{prefix}_{MM-DD-YYYY}.csv`. The first write of a day creates
//! the object with a header line; every later write appends a bare row, so
//! the header appears exactly once and the object only ever grows.
//!
//! Concurrent writers on the same key can interleave through the adapter's
//! read-modify-write append and lose rows; one writer per key per day is
//! assumed.

use bytes::Bytes;
use chrono::{Local, NaiveDate};
use tracing::info;

use crate::error::StorageError;
use crate::storage::BlobStore;

/// Append one row to today's ledger for `prefix`, creating the object with
/// `header` if this is the first write of the day.
///
/// `row` is not validated against `header`; column agreement is the
/// caller's job. Exactly one write-or-append store call per invocation.
/// Returns the object key that was written.
pub async fn write_csv_row(
    store: &BlobStore,
    base_path: &str,
    prefix: &str,
    header: &str,
    row: &str,
) -> Result<String, StorageError> {
    write_csv_row_on(store, base_path, prefix, Local::now().date_naive(), header, row).await
}

/// Date-pinned variant backing [`write_csv_row`]; lets tests fix the day.
pub async fn write_csv_row_on(
    store: &BlobStore,
    base_path: &str,
    prefix: &str,
    date: NaiveDate,
    header: &str,
    row: &str,
) -> Result<String, StorageError> {
    let key = ledger_key(base_path, prefix, date);

    if store.exists(&key).await? {
        store.append(&key, Bytes::from(format!("{row}\n"))).await?;
        info!("Appended ledger row to {key}");
    } else {
        store
            .write(&key, Bytes::from(format!("{header}\n{row}\n")))
            .await?;
        info!("Created ledger {key}");
    }

    Ok(key)
}

/// Build the ledger object key: `{base_path}{prefix}_{MM-DD-YYYY}.csv`.
pub fn ledger_key(base_path: &str, prefix: &str, date: NaiveDate) -> String {
    format!("{base_path}{prefix}_{}.csv", date.format("%m-%d-%Y"))
}
