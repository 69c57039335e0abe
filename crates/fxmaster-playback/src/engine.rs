//! Ordered single-pass replay of stored ticks.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use fxmaster_store::{TickStore, TickStream};
use fxmaster_types::{Predicate, Tag, TickRecord, TimeWindow};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{PlaybackError, PlaybackEvent, Result};

/// Lifecycle of a playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Not opened yet.
    Unopened,
    /// Query open, events available.
    Streaming,
    /// End of stream reached. Terminal.
    Exhausted,
}

impl PlaybackState {
    /// Returns the state as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unopened => "unopened",
            Self::Streaming => "streaming",
            Self::Exhausted => "exhausted",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Checks every pulled tick against the request.
///
/// Ticks must belong to a requested series, lie inside the window and never
/// go back in time within their own symbol.
#[derive(Debug, Clone)]
pub struct OrderGuard {
    symbols: BTreeSet<String>,
    provider: String,
    window: TimeWindow,
    last_seen: HashMap<String, DateTime<Utc>>,
}

impl OrderGuard {
    /// Creates a guard for `symbols` from `provider` in `window`.
    #[must_use]
    pub fn new(symbols: BTreeSet<String>, provider: impl Into<String>, window: TimeWindow) -> Self {
        Self {
            symbols,
            provider: provider.into(),
            window,
            last_seen: HashMap::new(),
        }
    }

    /// Accepts `tick` or reports why it cannot be replayed.
    ///
    /// # Errors
    ///
    /// Returns an error for an unexpected series, an out-of-window tick, or
    /// a tick earlier than the previous one of the same symbol.
    pub fn check(&mut self, tick: &TickRecord) -> Result<()> {
        if tick.provider != self.provider || !self.symbols.contains(&tick.symbol) {
            return Err(PlaybackError::UnexpectedSeries {
                symbol: tick.symbol.clone(),
                provider: tick.provider.clone(),
            });
        }
        if !self.window.contains(tick.timestamp) {
            return Err(PlaybackError::OutOfRange {
                timestamp: tick.timestamp,
                window: self.window,
            });
        }
        if let Some(&previous) = self.last_seen.get(&tick.symbol)
            && tick.timestamp < previous
        {
            return Err(PlaybackError::OutOfOrder {
                symbol: tick.symbol.clone(),
                previous,
                timestamp: tick.timestamp,
            });
        }
        self.last_seen.insert(tick.symbol.clone(), tick.timestamp);
        Ok(())
    }
}

/// Replays the ticks of a symbol set, in time order, as a pull cursor.
///
/// The query is streamed, so memory use does not grow with the window.
/// Once [`next`](Self::next) returns `Ok(None)` the playback is exhausted
/// and cannot be reopened.
pub struct HistoricPlayback {
    store: Arc<dyn TickStore>,
    table: String,
    state: PlaybackState,
    stream: Option<TickStream>,
    guard: Option<OrderGuard>,
    emitted: u64,
}

impl std::fmt::Debug for HistoricPlayback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoricPlayback")
            .field("table", &self.table)
            .field("state", &self.state)
            .field("emitted", &self.emitted)
            .finish_non_exhaustive()
    }
}

impl HistoricPlayback {
    /// Creates an unopened playback over `table`.
    pub fn new(store: Arc<dyn TickStore>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
            state: PlaybackState::Unopened,
            stream: None,
            guard: None,
            emitted: 0,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> PlaybackState {
        self.state
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub const fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Opens one time-ordered query for `symbols` from `provider` in
    /// `window`.
    ///
    /// # Errors
    ///
    /// Returns an error if `symbols` is empty, the playback was already
    /// opened, or the query fails.
    pub async fn open<I, S>(&mut self, symbols: I, provider: &str, window: TimeWindow) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.state != PlaybackState::Unopened {
            return Err(PlaybackError::InvalidState(self.state));
        }
        let symbols: BTreeSet<String> = symbols.into_iter().map(Into::into).collect();
        if symbols.is_empty() {
            return Err(PlaybackError::NoSymbols);
        }

        let predicate =
            Predicate::one_of(Tag::Symbol, symbols.iter().cloned()).and_eq(Tag::Provider, provider);
        let stream = self
            .store
            .stream_ticks(&self.table, &predicate, &window)
            .await?;
        info!(
            table = %self.table,
            provider,
            symbols = symbols.len(),
            window = %window,
            "playback opened"
        );

        self.stream = Some(stream);
        self.guard = Some(OrderGuard::new(symbols, provider, window));
        self.state = PlaybackState::Streaming;
        Ok(())
    }

    /// Pulls the next event. `Ok(None)` marks the end of the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the playback is not open, a store read fails,
    /// or a tick violates the ordering or range of the request.
    pub async fn next(&mut self) -> Result<Option<PlaybackEvent>> {
        match self.state {
            PlaybackState::Unopened => return Err(PlaybackError::InvalidState(self.state)),
            PlaybackState::Exhausted => return Ok(None),
            PlaybackState::Streaming => {}
        }

        let (Some(stream), Some(guard)) = (self.stream.as_mut(), self.guard.as_mut()) else {
            return Err(PlaybackError::InvalidState(self.state));
        };
        match stream.next().await {
            Some(tick) => {
                let tick = tick?;
                guard.check(&tick)?;
                self.emitted += 1;
                Ok(Some(tick.into()))
            }
            None => {
                debug!(emitted = self.emitted, "playback exhausted");
                self.state = PlaybackState::Exhausted;
                self.stream = None;
                Ok(None)
            }
        }
    }
}
