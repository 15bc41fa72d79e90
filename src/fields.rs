//! Typed extraction of analyzer fields from a result document.
//!
//! The service reports fields as `{type, valueString|valueNumber|...}`
//! maps under `result.contents[].fields`. Decoding is explicit: every type
//! tag maps to one variant of [`FieldValue`], and an unknown tag or a
//! missing value key is an error rather than a silent skip.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;
use snafu::prelude::*;
use tracing::debug;

use crate::error::{
    CsvRenderSnafu, FieldError, InvalidTemporalSnafu, MalformedValueSnafu, MissingValueSnafu,
    UnknownTypeSnafu,
};

/// A single extracted field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Number(f64),
    Integer(i64),
    Date(NaiveDate),
    Time(NaiveTime),
    /// Kept opaque; element shape is analyzer-specific.
    Array(Vec<Value>),
}

impl FieldValue {
    /// Render the value for a CSV cell.
    pub fn render(&self) -> String {
        match self {
            FieldValue::String(s) => s.clone(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Date(d) => d.to_string(),
            FieldValue::Time(t) => t.to_string(),
            FieldValue::Array(items) => Value::Array(items.clone()).to_string(),
        }
    }
}

/// Extracted fields of one content entry, in stable (sorted) name order.
pub type ContentFields = BTreeMap<String, FieldValue>;

/// Walk `result.contents[]` and decode every `fields` map.
///
/// Entries without a `fields` key decode to an empty map; a missing or
/// empty `contents` array yields no entries.
pub fn extract_fields(result: &Value) -> Result<Vec<ContentFields>, FieldError> {
    let contents = result
        .pointer("/result/contents")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    contents
        .iter()
        .map(|content| {
            let Some(fields) = content.get("fields").and_then(Value::as_object) else {
                debug!("Content entry has no fields");
                return Ok(ContentFields::new());
            };
            fields
                .iter()
                .map(|(name, data)| decode_field(name, data).map(|value| (name.clone(), value)))
                .collect()
        })
        .collect()
}

/// Render a header + row pair for one content entry.
pub fn ledger_record(fields: &ContentFields) -> Result<(String, String), FieldError> {
    let header = csv_line(fields.keys())?;
    let row = csv_line(fields.values().map(FieldValue::render))?;
    Ok((header, row))
}

/// Quote one record the way a CSV reader expects it, without a terminator.
fn csv_line<I>(cells: I) -> Result<String, FieldError>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(cells).context(CsvRenderSnafu)?;
    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
        .context(CsvRenderSnafu)?;

    let line = String::from_utf8_lossy(&bytes);
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Decode one wire field entry from its `{type, value*}` shape.
fn decode_field(name: &str, data: &Value) -> Result<FieldValue, FieldError> {
    let tag = data.get("type").and_then(Value::as_str).unwrap_or_default();
    match tag {
        "string" => Ok(FieldValue::String(
            require_str(name, data, "valueString")?.to_string(),
        )),
        "number" => require(name, data, "valueNumber")?
            .as_f64()
            .map(FieldValue::Number)
            .context(MalformedValueSnafu {
                field: name,
                key: "valueNumber",
            }),
        "integer" => require(name, data, "valueInteger")?
            .as_i64()
            .map(FieldValue::Integer)
            .context(MalformedValueSnafu {
                field: name,
                key: "valueInteger",
            }),
        "date" => {
            let raw = require_str(name, data, "valueDate")?;
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(FieldValue::Date)
                .context(InvalidTemporalSnafu {
                    field: name,
                    kind: "date",
                    value: raw,
                })
        }
        "time" => {
            let raw = require_str(name, data, "valueTime")?;
            NaiveTime::parse_from_str(raw, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
                .map(FieldValue::Time)
                .context(InvalidTemporalSnafu {
                    field: name,
                    kind: "time",
                    value: raw,
                })
        }
        "array" => require(name, data, "valueArray")?
            .as_array()
            .cloned()
            .map(FieldValue::Array)
            .context(MalformedValueSnafu {
                field: name,
                key: "valueArray",
            }),
        other => UnknownTypeSnafu {
            field: name,
            tag: other,
        }
        .fail(),
    }
}

fn require<'a>(field: &str, data: &'a Value, key: &'static str) -> Result<&'a Value, FieldError> {
    data.get(key).context(MissingValueSnafu { field, key })
}

fn require_str<'a>(field: &str, data: &'a Value, key: &'static str) -> Result<&'a str, FieldError> {
    require(field, data, key)?
        .as_str()
        .context(MalformedValueSnafu { field, key })
}
