//! InfluxDB 1.x HTTP backend.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use fxmaster_types::{
    Bar, Predicate, Quote, SeriesKey, Tag, TagSet, TickRecord, TimeWindow, ValidationOutcome,
};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::{debug, trace};

use crate::query::{FieldValue, quote_ident, where_clause, write_point};
use crate::response::{
    QueryResponse, Series, decode_bars, decode_count, decode_grouped_count, decode_single_time,
    decode_strings, decode_ticks, decode_validation,
};
use crate::store::TickStream;
use crate::{Result, StoreError, TickStore};

/// Configuration for the InfluxDB client.
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    /// Base URL of the server.
    pub url: String,
    /// Database name.
    pub database: String,
    /// Optional user name.
    pub username: Option<String>,
    /// Optional password.
    pub password: Option<String>,
    /// Request timeout. Expiry is a hard failure.
    pub timeout: Duration,
    /// Points per write request.
    pub batch_size: usize,
    /// Rows per chunk for streamed selects.
    pub chunk_size: usize,
    /// User agent string.
    pub user_agent: String,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            database: "fxmaster".to_string(),
            username: None,
            password: None,
            timeout: Duration::from_secs(300),
            batch_size: 10_000,
            chunk_size: 1_000,
            user_agent: format!("fxmaster/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// A [`TickStore`] backed by an InfluxDB 1.x server.
///
/// Writes use line protocol with millisecond precision; reads use InfluxQL
/// with `epoch=ms` so timestamps come back as integers. Cached validation
/// rows are written at timestamp 0, one point per bucket tag set, so a new
/// write replaces the previous one.
#[derive(Debug, Clone)]
pub struct InfluxStore {
    client: Client,
    config: InfluxConfig,
}

impl InfluxStore {
    /// Creates a new store client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: InfluxConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .tcp_nodelay(true)
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;
        Ok(Self { client, config })
    }

    /// Creates a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_defaults() -> Result<Self> {
        Self::new(InfluxConfig::default())
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &InfluxConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.url.trim_end_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.username {
            Some(user) => request.basic_auth(user, self.config.password.as_deref()),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(StoreError::Server {
            status: status.as_u16(),
            message,
        })
    }

    /// Runs a read statement and returns its series.
    async fn query(&self, statement: &str) -> Result<Vec<Series>> {
        debug!(statement, "influx query");
        let request = self.client.get(self.endpoint("query")).query(&[
            ("db", self.config.database.as_str()),
            ("q", statement),
            ("epoch", "ms"),
        ]);
        let body = self.send(request).await?.bytes().await?;
        serde_json::from_slice::<QueryResponse>(&body)?.into_series()
    }

    /// Runs a statement that modifies data (`DELETE`, `DROP`).
    async fn execute(&self, statement: &str) -> Result<()> {
        debug!(statement, "influx execute");
        let request = self
            .client
            .post(self.endpoint("query"))
            .query(&[("db", self.config.database.as_str())])
            .form(&[("q", statement)]);
        let body = self.send(request).await?.bytes().await?;
        serde_json::from_slice::<QueryResponse>(&body)?
            .into_series()
            .map(|_| ())
    }

    /// Sends line protocol in batches of `batch_size` lines.
    async fn write_lines(&self, lines: &[String]) -> Result<usize> {
        let batch_size = self.config.batch_size.max(1);
        for batch in lines.chunks(batch_size) {
            trace!(points = batch.len(), "influx write");
            let body = batch.concat();
            let request = self
                .client
                .post(self.endpoint("write"))
                .query(&[
                    ("db", self.config.database.as_str()),
                    ("precision", "ms"),
                ])
                .body(body);
            self.send(request).await?;
        }
        Ok(lines.len())
    }

    /// Returns the first field key of a table, used to anchor aggregates.
    async fn first_field(&self, table: &str) -> Result<Option<String>> {
        let series = self
            .query(&format!("SHOW FIELD KEYS FROM {}", quote_ident(table)))
            .await?;
        Ok(decode_strings(&series, "fieldKey")?.into_iter().next())
    }

    fn tick_statement(table: &str, predicate: &Predicate, window: &TimeWindow) -> Result<String> {
        Ok(format!(
            "SELECT time, bid, ask, symbol, provider FROM {}{} ORDER BY time ASC",
            quote_ident(table),
            where_clause(predicate, Some(window))?
        ))
    }
}

/// Incremental reader of a chunked response: one JSON document per line.
struct ChunkReader {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    buffer: Vec<u8>,
    finished: bool,
}

impl ChunkReader {
    async fn next_document(&mut self) -> Result<Option<QueryResponse>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=pos).collect();
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                return Ok(Some(serde_json::from_slice(&line)?));
            }
            if self.finished {
                if self.buffer.iter().all(u8::is_ascii_whitespace) {
                    return Ok(None);
                }
                let rest = std::mem::take(&mut self.buffer);
                return Ok(Some(serde_json::from_slice(&rest)?));
            }
            match self.body.next().await {
                Some(chunk) => self.buffer.extend_from_slice(&chunk?),
                None => self.finished = true,
            }
        }
    }
}

#[async_trait]
impl TickStore for InfluxStore {
    async fn write_ticks(&self, table: &str, tags: &TagSet, quotes: &[Quote]) -> Result<usize> {
        let lines: Vec<String> = quotes
            .iter()
            .map(|q| {
                let mut line = String::new();
                write_point(
                    &mut line,
                    table,
                    tags,
                    &[("bid", FieldValue::Float(q.bid)), ("ask", FieldValue::Float(q.ask))],
                    q.timestamp.timestamp_millis(),
                );
                line
            })
            .collect();
        self.write_lines(&lines).await
    }

    async fn write_bars(&self, table: &str, bars: &[Bar]) -> Result<usize> {
        let lines: Vec<String> = bars
            .iter()
            .map(|bar| {
                let tags = bar.series().tags().with(Tag::Frequency, bar.frequency.as_str());
                let mut line = String::new();
                write_point(
                    &mut line,
                    table,
                    &tags,
                    &[
                        ("open", FieldValue::Float(bar.open)),
                        ("high", FieldValue::Float(bar.high)),
                        ("low", FieldValue::Float(bar.low)),
                        ("close", FieldValue::Float(bar.close)),
                        ("tick_count", FieldValue::Integer(i64::from(bar.tick_count))),
                    ],
                    bar.period_start.timestamp_millis(),
                );
                line
            })
            .collect();
        self.write_lines(&lines).await
    }

    async fn count(&self, table: &str, predicate: &Predicate) -> Result<u64> {
        let statement = format!(
            "SELECT COUNT(bid) FROM {}{}",
            quote_ident(table),
            where_clause(predicate, None)?
        );
        decode_count(&self.query(&statement).await?)
    }

    async fn count_by(
        &self,
        table: &str,
        predicate: &Predicate,
        tag: Tag,
    ) -> Result<Vec<(String, u64)>> {
        let statement = format!(
            "SELECT COUNT(bid) FROM {}{} GROUP BY {}",
            quote_ident(table),
            where_clause(predicate, None)?,
            quote_ident(tag.as_str())
        );
        decode_grouped_count(&self.query(&statement).await?, tag.as_str())
    }

    async fn select_ticks(
        &self,
        table: &str,
        predicate: &Predicate,
        window: &TimeWindow,
    ) -> Result<Vec<TickRecord>> {
        let statement = Self::tick_statement(table, predicate, window)?;
        decode_ticks(self.query(&statement).await?)
    }

    async fn stream_ticks(
        &self,
        table: &str,
        predicate: &Predicate,
        window: &TimeWindow,
    ) -> Result<TickStream> {
        let statement = Self::tick_statement(table, predicate, window)?;
        let chunk_size = self.config.chunk_size.max(1).to_string();
        debug!(%statement, %chunk_size, "influx chunked query");

        let request = self.client.get(self.endpoint("query")).query(&[
            ("db", self.config.database.as_str()),
            ("q", statement.as_str()),
            ("epoch", "ms"),
            ("chunked", "true"),
            ("chunk_size", chunk_size.as_str()),
        ]);
        let response = self.send(request).await?;
        let reader = ChunkReader {
            body: response.bytes_stream().boxed(),
            buffer: Vec::new(),
            finished: false,
        };

        let ticks = stream::try_unfold(reader, |mut reader| async move {
            match reader.next_document().await? {
                Some(document) => {
                    let ticks = decode_ticks(document.into_series()?)?;
                    let items = ticks.into_iter().map(Ok::<TickRecord, StoreError>);
                    Ok::<_, StoreError>(Some((stream::iter(items), reader)))
                }
                None => Ok::<_, StoreError>(None),
            }
        })
        .try_flatten();
        Ok(ticks.boxed())
    }

    async fn select_bars(
        &self,
        table: &str,
        predicate: &Predicate,
        window: Option<&TimeWindow>,
    ) -> Result<Vec<Bar>> {
        let statement = format!(
            "SELECT time, open, high, low, close, tick_count, symbol, provider, frequency FROM {}{} ORDER BY time ASC",
            quote_ident(table),
            where_clause(predicate, window)?
        );
        decode_bars(self.query(&statement).await?)
    }

    async fn delete(&self, table: &str, predicate: &Predicate) -> Result<()> {
        let statement = format!(
            "DELETE FROM {}{}",
            quote_ident(table),
            where_clause(predicate, None)?
        );
        self.execute(&statement).await
    }

    async fn time_bounds(
        &self,
        table: &str,
        predicate: &Predicate,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        let Some(field) = self.first_field(table).await? else {
            return Ok(None);
        };
        let condition = where_clause(predicate, None)?;
        let first = format!(
            "SELECT FIRST({}) FROM {}{condition}",
            quote_ident(&field),
            quote_ident(table)
        );
        let last = format!(
            "SELECT LAST({}) FROM {}{condition}",
            quote_ident(&field),
            quote_ident(table)
        );

        let first = decode_single_time(&self.query(&first).await?)?;
        let last = decode_single_time(&self.query(&last).await?)?;
        Ok(first.zip(last))
    }

    async fn series(&self, table: &str) -> Result<Vec<SeriesKey>> {
        let Some(field) = self.first_field(table).await? else {
            return Ok(Vec::new());
        };
        let statement = format!(
            "SELECT COUNT({}) FROM {} GROUP BY {}, {}",
            quote_ident(&field),
            quote_ident(table),
            quote_ident(Tag::Symbol.as_str()),
            quote_ident(Tag::Provider.as_str())
        );
        let mut keys: Vec<SeriesKey> = self
            .query(&statement)
            .await?
            .into_iter()
            .filter_map(|s| {
                Some(SeriesKey::new(
                    s.tags.get(Tag::Symbol.as_str())?,
                    s.tags.get(Tag::Provider.as_str())?,
                ))
            })
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn tag_values(&self, table: &str, tag: Tag) -> Result<Vec<String>> {
        let statement = format!(
            "SHOW TAG VALUES FROM {} WITH KEY = {}",
            quote_ident(table),
            quote_ident(tag.as_str())
        );
        let mut values = decode_strings(&self.query(&statement).await?, "value")?;
        values.sort();
        values.dedup();
        Ok(values)
    }

    async fn read_validation(
        &self,
        table: &str,
        tags: &TagSet,
    ) -> Result<Option<ValidationOutcome>> {
        let statement = format!(
            "SELECT csv_row_count, store_row_count, difference, status FROM {}{}",
            quote_ident(table),
            where_clause(&Predicate::exact(tags), None)?
        );
        decode_validation(&self.query(&statement).await?)
    }

    async fn write_validation(
        &self,
        table: &str,
        tags: &TagSet,
        outcome: &ValidationOutcome,
    ) -> Result<()> {
        let mut line = String::new();
        write_point(
            &mut line,
            table,
            tags,
            &[
                ("csv_row_count", FieldValue::Integer(outcome.csv_row_count as i64)),
                ("store_row_count", FieldValue::Integer(outcome.store_row_count as i64)),
                ("difference", FieldValue::Integer(outcome.difference)),
                ("status", FieldValue::Text(outcome.status.as_str().to_string())),
            ],
            0,
        );
        self.write_lines(&[line]).await.map(|_| ())
    }
}
