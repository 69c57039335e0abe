//! In-process store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use fxmaster_types::{
    Bar, Frequency, Predicate, Quote, SeriesKey, Tag, TagSet, TickRecord, TimeWindow,
    ValidationOutcome,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::store::TickStream;
use crate::{Result, StoreError, TickStore};

type Fields = BTreeMap<&'static str, f64>;

/// Rows of one table keyed by `(timestamp_ms, tags)`, so iteration is
/// time ordered and identical tags+timestamp upsert.
type Table = BTreeMap<(i64, TagSet), Fields>;

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, Table>,
    validations: HashMap<(String, TagSet), ValidationOutcome>,
}

/// A [`TickStore`] held in memory.
///
/// Behaves like the database for everything the pipeline relies on: rows
/// with identical tags and timestamp are merged, selections are time
/// ordered, and deletes remove exactly the rows matching every filter.
/// Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of rows in `table`, whatever their fields.
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.lock().tables.get(table).map_or(0, BTreeMap::len)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn upsert(&self, table: &str, rows: impl IntoIterator<Item = (i64, TagSet, Fields)>) -> usize {
        let mut inner = self.lock();
        let table = inner.tables.entry(table.to_string()).or_default();
        let mut written = 0;
        for (time, tags, fields) in rows {
            table.entry((time, tags)).or_default().extend(fields);
            written += 1;
        }
        written
    }

    fn matching(
        &self,
        table: &str,
        predicate: &Predicate,
        window: Option<&TimeWindow>,
    ) -> Vec<(i64, TagSet, Fields)> {
        let inner = self.lock();
        let Some(rows) = inner.tables.get(table) else {
            return Vec::new();
        };
        rows.iter()
            .filter(|((time, tags), _)| {
                predicate.matches(tags) && window.is_none_or(|w| in_window(w, *time))
            })
            .map(|((time, tags), fields)| (*time, tags.clone(), fields.clone()))
            .collect()
    }

    fn select_tick_rows(
        &self,
        table: &str,
        predicate: &Predicate,
        window: &TimeWindow,
    ) -> Result<Vec<TickRecord>> {
        check_predicate(predicate)?;
        Ok(self
            .matching(table, predicate, Some(window))
            .into_iter()
            .filter_map(|(time, tags, fields)| tick_from_row(time, &tags, &fields))
            .collect())
    }
}

fn in_window(window: &TimeWindow, time_ms: i64) -> bool {
    time_ms >= window.start.timestamp_millis() && time_ms < window.end.timestamp_millis()
}

/// Mirrors the database, which rejects an empty `OR` filter.
fn check_predicate(predicate: &Predicate) -> Result<()> {
    let empty_or = predicate
        .filters()
        .iter()
        .any(|f| f.pairs().is_empty() && f.joiner() == fxmaster_types::Joiner::Or);
    if empty_or {
        Err(StoreError::EmptyFilter)
    } else {
        Ok(())
    }
}

fn timestamp(time_ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(time_ms)
        .ok_or_else(|| StoreError::Decode(format!("timestamp out of range: {time_ms}")))
}

fn tick_from_row(time_ms: i64, tags: &TagSet, fields: &Fields) -> Option<TickRecord> {
    Some(TickRecord::new(
        DateTime::from_timestamp_millis(time_ms)?,
        tags.get(Tag::Symbol).unwrap_or_default(),
        tags.get(Tag::Provider).unwrap_or_default(),
        *fields.get("bid")?,
        *fields.get("ask")?,
    ))
}

fn bar_from_row(time_ms: i64, tags: &TagSet, fields: &Fields) -> Option<Bar> {
    Some(Bar {
        period_start: DateTime::from_timestamp_millis(time_ms)?,
        symbol: tags.get(Tag::Symbol)?.to_string(),
        provider: tags.get(Tag::Provider)?.to_string(),
        frequency: tags.get(Tag::Frequency)?.parse::<Frequency>().ok()?,
        open: *fields.get("open")?,
        high: *fields.get("high")?,
        low: *fields.get("low")?,
        close: *fields.get("close")?,
        tick_count: fields.get("tick_count").map_or(0, |n| *n as u32),
    })
}

#[async_trait]
impl TickStore for MemoryStore {
    async fn write_ticks(&self, table: &str, tags: &TagSet, quotes: &[Quote]) -> Result<usize> {
        Ok(self.upsert(
            table,
            quotes.iter().map(|q| {
                let fields = Fields::from([("bid", q.bid), ("ask", q.ask)]);
                (q.timestamp.timestamp_millis(), tags.clone(), fields)
            }),
        ))
    }

    async fn write_bars(&self, table: &str, bars: &[Bar]) -> Result<usize> {
        Ok(self.upsert(
            table,
            bars.iter().map(|bar| {
                let tags = bar.series().tags().with(Tag::Frequency, bar.frequency.as_str());
                let fields = Fields::from([
                    ("open", bar.open),
                    ("high", bar.high),
                    ("low", bar.low),
                    ("close", bar.close),
                    ("tick_count", f64::from(bar.tick_count)),
                ]);
                (bar.period_start.timestamp_millis(), tags, fields)
            }),
        ))
    }

    async fn count(&self, table: &str, predicate: &Predicate) -> Result<u64> {
        check_predicate(predicate)?;
        Ok(self
            .matching(table, predicate, None)
            .iter()
            .filter(|(_, _, fields)| fields.contains_key("bid"))
            .count() as u64)
    }

    async fn count_by(
        &self,
        table: &str,
        predicate: &Predicate,
        tag: Tag,
    ) -> Result<Vec<(String, u64)>> {
        check_predicate(predicate)?;
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for (_, tags, fields) in self.matching(table, predicate, None) {
            if let (Some(value), true) = (tags.get(tag), fields.contains_key("bid")) {
                *counts.entry(value.to_string()).or_default() += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }

    async fn select_ticks(
        &self,
        table: &str,
        predicate: &Predicate,
        window: &TimeWindow,
    ) -> Result<Vec<TickRecord>> {
        self.select_tick_rows(table, predicate, window)
    }

    async fn stream_ticks(
        &self,
        table: &str,
        predicate: &Predicate,
        window: &TimeWindow,
    ) -> Result<TickStream> {
        let ticks = self.select_tick_rows(table, predicate, window)?;
        Ok(stream::iter(ticks.into_iter().map(Ok)).boxed())
    }

    async fn select_bars(
        &self,
        table: &str,
        predicate: &Predicate,
        window: Option<&TimeWindow>,
    ) -> Result<Vec<Bar>> {
        check_predicate(predicate)?;
        Ok(self
            .matching(table, predicate, window)
            .into_iter()
            .filter_map(|(time, tags, fields)| bar_from_row(time, &tags, &fields))
            .collect())
    }

    async fn delete(&self, table: &str, predicate: &Predicate) -> Result<()> {
        check_predicate(predicate)?;
        let mut inner = self.lock();
        if let Some(rows) = inner.tables.get_mut(table) {
            rows.retain(|(_, tags), _| !predicate.matches(tags));
        }
        Ok(())
    }

    async fn time_bounds(
        &self,
        table: &str,
        predicate: &Predicate,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        check_predicate(predicate)?;
        let rows = self.matching(table, predicate, None);
        match (rows.first(), rows.last()) {
            (Some((first, _, _)), Some((last, _, _))) => {
                Ok(Some((timestamp(*first)?, timestamp(*last)?)))
            }
            _ => Ok(None),
        }
    }

    async fn series(&self, table: &str) -> Result<Vec<SeriesKey>> {
        let inner = self.lock();
        let keys: BTreeSet<SeriesKey> = inner
            .tables
            .get(table)
            .into_iter()
            .flat_map(|rows| rows.keys())
            .filter_map(|(_, tags)| {
                Some(SeriesKey::new(tags.get(Tag::Symbol)?, tags.get(Tag::Provider)?))
            })
            .collect();
        Ok(keys.into_iter().collect())
    }

    async fn tag_values(&self, table: &str, tag: Tag) -> Result<Vec<String>> {
        let inner = self.lock();
        let values: BTreeSet<String> = inner
            .tables
            .get(table)
            .into_iter()
            .flat_map(|rows| rows.keys())
            .filter_map(|(_, tags)| tags.get(tag).map(str::to_string))
            .collect();
        Ok(values.into_iter().collect())
    }

    async fn read_validation(
        &self,
        table: &str,
        tags: &TagSet,
    ) -> Result<Option<ValidationOutcome>> {
        Ok(self
            .lock()
            .validations
            .get(&(table.to_string(), tags.clone()))
            .copied())
    }

    async fn write_validation(
        &self,
        table: &str,
        tags: &TagSet,
        outcome: &ValidationOutcome,
    ) -> Result<()> {
        self.lock()
            .validations
            .insert((table.to_string(), tags.clone()), *outcome);
        Ok(())
    }
}
