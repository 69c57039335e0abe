//! Decoding of InfluxDB 1.x JSON query responses.

use chrono::{DateTime, Utc};
use fxmaster_types::{Bar, Frequency, Tag, TickRecord, ValidationOutcome, ValidationStatus};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::{Result, StoreError};

/// Top level response document (one per chunk when chunked).
#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub(crate) results: Vec<StatementResult>,
    #[serde(default)]
    pub(crate) error: Option<String>,
}

/// Result of one statement.
#[derive(Debug, Deserialize)]
pub(crate) struct StatementResult {
    #[serde(default)]
    pub(crate) series: Vec<Series>,
    #[serde(default)]
    pub(crate) error: Option<String>,
}

/// One result series.
#[derive(Debug, Deserialize)]
pub(crate) struct Series {
    #[serde(default)]
    pub(crate) tags: HashMap<String, String>,
    #[serde(default)]
    pub(crate) columns: Vec<String>,
    #[serde(default)]
    pub(crate) values: Vec<Vec<Value>>,
}

impl QueryResponse {
    /// Returns every series of every statement, failing on any embedded error.
    pub(crate) fn into_series(self) -> Result<Vec<Series>> {
        if let Some(error) = self.error {
            return Err(StoreError::Query(error));
        }
        let mut out = Vec::new();
        for statement in self.results {
            if let Some(error) = statement.error {
                return Err(StoreError::Query(error));
            }
            out.extend(statement.series);
        }
        Ok(out)
    }
}

impl Series {
    fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.column(name)
            .ok_or_else(|| StoreError::Decode(format!("missing column '{name}'")))
    }

    /// Reads a tag either from the row (selected tag column) or from the
    /// series' group-by tags.
    fn tag<'a>(&'a self, row: &'a [Value], index: Option<usize>, key: &str) -> Option<&'a str> {
        index
            .and_then(|i| row.get(i))
            .and_then(Value::as_str)
            .or_else(|| self.tags.get(key).map(String::as_str))
    }
}

fn cell_f64(row: &[Value], index: usize) -> Result<f64> {
    row.get(index)
        .and_then(Value::as_f64)
        .ok_or_else(|| StoreError::Decode(format!("expected number in column {index}")))
}

fn cell_i64(row: &[Value], index: usize) -> Result<i64> {
    row.get(index)
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .ok_or_else(|| StoreError::Decode(format!("expected integer in column {index}")))
}

fn cell_time(row: &[Value], index: usize) -> Result<DateTime<Utc>> {
    let ms = cell_i64(row, index)?;
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Decode(format!("timestamp out of range: {ms}")))
}

/// Decodes `time, bid, ask, symbol, provider` rows.
pub(crate) fn decode_ticks(series: Vec<Series>) -> Result<Vec<TickRecord>> {
    let mut ticks = Vec::new();
    for s in series {
        let (time, bid, ask) = (s.require("time")?, s.require("bid")?, s.require("ask")?);
        let (symbol, provider) = (s.column(Tag::Symbol.as_str()), s.column(Tag::Provider.as_str()));

        ticks.reserve(s.values.len());
        for row in &s.values {
            ticks.push(TickRecord::new(
                cell_time(row, time)?,
                s.tag(row, symbol, Tag::Symbol.as_str()).unwrap_or_default(),
                s.tag(row, provider, Tag::Provider.as_str()).unwrap_or_default(),
                cell_f64(row, bid)?,
                cell_f64(row, ask)?,
            ));
        }
    }
    Ok(ticks)
}

/// Decodes bar rows selected with their tags.
pub(crate) fn decode_bars(series: Vec<Series>) -> Result<Vec<Bar>> {
    let mut bars = Vec::new();
    for s in series {
        let time = s.require("time")?;
        let (open, high, low, close) = (
            s.require("open")?,
            s.require("high")?,
            s.require("low")?,
            s.require("close")?,
        );
        let tick_count = s.column("tick_count");
        let symbol = s.column(Tag::Symbol.as_str());
        let provider = s.column(Tag::Provider.as_str());
        let frequency = s.column(Tag::Frequency.as_str());

        for row in &s.values {
            let freq = s
                .tag(row, frequency, Tag::Frequency.as_str())
                .ok_or_else(|| StoreError::Decode("bar without frequency tag".into()))?;
            bars.push(Bar {
                period_start: cell_time(row, time)?,
                symbol: s.tag(row, symbol, Tag::Symbol.as_str()).unwrap_or_default().to_string(),
                provider: s
                    .tag(row, provider, Tag::Provider.as_str())
                    .unwrap_or_default()
                    .to_string(),
                frequency: freq
                    .parse::<Frequency>()
                    .map_err(|e| StoreError::Decode(e.to_string()))?,
                open: cell_f64(row, open)?,
                high: cell_f64(row, high)?,
                low: cell_f64(row, low)?,
                close: cell_f64(row, close)?,
                tick_count: tick_count
                    .and_then(|i| row.get(i))
                    .and_then(Value::as_u64)
                    .map_or(0, |n| n as u32),
            });
        }
    }
    bars.sort_by_key(|b| b.period_start);
    Ok(bars)
}

/// Decodes the single aggregate value of a `SELECT COUNT(...)` statement.
pub(crate) fn decode_count(series: &[Series]) -> Result<u64> {
    let Some(s) = series.first() else {
        return Ok(0);
    };
    let Some(row) = s.values.first() else {
        return Ok(0);
    };
    Ok(cell_i64(row, 1)?.max(0) as u64)
}

/// Decodes a count grouped by one tag.
pub(crate) fn decode_grouped_count(series: &[Series], tag: &str) -> Result<Vec<(String, u64)>> {
    let mut out = Vec::with_capacity(series.len());
    for s in series {
        let Some(value) = s.tags.get(tag) else {
            continue;
        };
        let count = match s.values.first() {
            Some(row) => cell_i64(row, 1)?.max(0) as u64,
            None => 0,
        };
        out.push((value.clone(), count));
    }
    out.sort();
    Ok(out)
}

/// Decodes the timestamp of a `FIRST(...)` or `LAST(...)` statement.
pub(crate) fn decode_single_time(series: &[Series]) -> Result<Option<DateTime<Utc>>> {
    match series.first().and_then(|s| s.values.first()) {
        Some(row) => cell_time(row, 0).map(Some),
        None => Ok(None),
    }
}

/// Decodes the first column of every row as a string (`SHOW FIELD KEYS`,
/// `SHOW TAG VALUES` uses the `value` column).
pub(crate) fn decode_strings(series: &[Series], column: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for s in series {
        let index = s.require(column)?;
        out.extend(
            s.values
                .iter()
                .filter_map(|row| row.get(index).and_then(Value::as_str).map(str::to_string)),
        );
    }
    Ok(out)
}

/// Decodes a cached validation row.
pub(crate) fn decode_validation(series: &[Series]) -> Result<Option<ValidationOutcome>> {
    let Some(s) = series.first() else {
        return Ok(None);
    };
    let Some(row) = s.values.first() else {
        return Ok(None);
    };
    let status = row
        .get(s.require("status")?)
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Decode("validation row without status".into()))?;
    let status = match status {
        "absent" => ValidationStatus::Absent,
        "exact" => ValidationStatus::Exact,
        "acceptable" => ValidationStatus::Acceptable,
        "unacceptable" => ValidationStatus::Unacceptable,
        other => return Err(StoreError::Decode(format!("unknown status '{other}'"))),
    };
    Ok(Some(ValidationOutcome {
        status,
        csv_row_count: cell_i64(row, s.require("csv_row_count")?)?.max(0) as u64,
        store_row_count: cell_i64(row, s.require("store_row_count")?)?.max(0) as u64,
        difference: cell_i64(row, s.require("difference")?)?,
    }))
}
