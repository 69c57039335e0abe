//! The store capability shared by every pipeline stage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use fxmaster_types::{
    Bar, Predicate, Quote, SeriesKey, Tag, TagSet, TickRecord, TimeWindow, ValidationOutcome,
};

use crate::Result;

/// Ordered stream of ticks returned by [`TickStore::stream_ticks`].
pub type TickStream = BoxStream<'static, Result<TickRecord>>;

/// A tag-queryable time-series store holding ticks, bars and the
/// validation cache.
///
/// Rows are identified by their tags and timestamp: writing a row with the
/// same tags and timestamp as an existing one replaces it.
#[async_trait]
pub trait TickStore: Send + Sync {
    /// Writes quotes tagged with `tags`. Returns the number of rows sent.
    async fn write_ticks(&self, table: &str, tags: &TagSet, quotes: &[Quote]) -> Result<usize>;

    /// Writes bars tagged `{symbol, provider, frequency}`.
    async fn write_bars(&self, table: &str, bars: &[Bar]) -> Result<usize>;

    /// Counts tick rows (rows with a `bid`) matching `predicate`.
    async fn count(&self, table: &str, predicate: &Predicate) -> Result<u64>;

    /// Counts tick rows matching `predicate`, grouped by the value of `tag`.
    ///
    /// Results are sorted by tag value.
    async fn count_by(
        &self,
        table: &str,
        predicate: &Predicate,
        tag: Tag,
    ) -> Result<Vec<(String, u64)>>;

    /// Selects ticks in `window`, ordered by time.
    async fn select_ticks(
        &self,
        table: &str,
        predicate: &Predicate,
        window: &TimeWindow,
    ) -> Result<Vec<TickRecord>>;

    /// Streams ticks in `window`, ordered by time, without materializing
    /// the whole selection.
    async fn stream_ticks(
        &self,
        table: &str,
        predicate: &Predicate,
        window: &TimeWindow,
    ) -> Result<TickStream>;

    /// Selects bars, ordered by time. `None` selects the whole series.
    async fn select_bars(
        &self,
        table: &str,
        predicate: &Predicate,
        window: Option<&TimeWindow>,
    ) -> Result<Vec<Bar>>;

    /// Deletes every row matching `predicate`.
    async fn delete(&self, table: &str, predicate: &Predicate) -> Result<()>;

    /// Returns the timestamps of the first and last row matching `predicate`.
    async fn time_bounds(
        &self,
        table: &str,
        predicate: &Predicate,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>>;

    /// Lists the `(symbol, provider)` series present in `table`.
    async fn series(&self, table: &str) -> Result<Vec<SeriesKey>>;

    /// Lists the distinct values of `tag` in `table`, sorted.
    async fn tag_values(&self, table: &str, tag: Tag) -> Result<Vec<String>>;

    /// Reads the cached validation row for a bucket.
    async fn read_validation(
        &self,
        table: &str,
        tags: &TagSet,
    ) -> Result<Option<ValidationOutcome>>;

    /// Replaces the cached validation row for a bucket.
    async fn write_validation(
        &self,
        table: &str,
        tags: &TagSet,
        outcome: &ValidationOutcome,
    ) -> Result<()>;
}
