//! Queue-backed driver feeding a backtest.

use fxmaster_types::StopFlag;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{HistoricPlayback, MarketEvent, PlaybackError, Result};

enum EventSender {
    Unbounded(mpsc::UnboundedSender<MarketEvent>),
    Bounded(mpsc::Sender<MarketEvent>),
}

impl EventSender {
    async fn send(&self, event: MarketEvent) -> Result<()> {
        match self {
            Self::Unbounded(tx) => tx.send(event).map_err(|_| PlaybackError::QueueClosed),
            Self::Bounded(tx) => tx.send(event).await.map_err(|_| PlaybackError::QueueClosed),
        }
    }
}

/// Receiving end of a [`TickFeed`].
#[derive(Debug)]
pub enum EventReceiver {
    /// Queue without a size limit.
    Unbounded(mpsc::UnboundedReceiver<MarketEvent>),
    /// Queue that blocks the feed when full.
    Bounded(mpsc::Receiver<MarketEvent>),
}

impl EventReceiver {
    /// Receives the next event, or `None` once the feed is dropped and the
    /// queue drained.
    pub async fn recv(&mut self) -> Option<MarketEvent> {
        match self {
            Self::Unbounded(rx) => rx.recv().await,
            Self::Bounded(rx) => rx.recv().await,
        }
    }

    /// Receives an event if one is queued.
    pub fn try_recv(&mut self) -> Option<MarketEvent> {
        match self {
            Self::Unbounded(rx) => rx.try_recv().ok(),
            Self::Bounded(rx) => rx.try_recv().ok(),
        }
    }
}

/// Pushes replayed ticks onto an event queue for a backtest driver.
///
/// `continue_backtest` stays true until the playback is exhausted.
pub struct TickFeed {
    playback: HistoricPlayback,
    sender: EventSender,
    continue_backtest: bool,
    stop: StopFlag,
}

impl std::fmt::Debug for TickFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickFeed")
            .field("playback", &self.playback)
            .field("continue_backtest", &self.continue_backtest)
            .finish_non_exhaustive()
    }
}

impl TickFeed {
    /// Wraps an opened playback with an unbounded queue.
    #[must_use]
    pub fn new(playback: HistoricPlayback) -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self::with_sender(playback, EventSender::Unbounded(tx)),
            EventReceiver::Unbounded(rx),
        )
    }

    /// Wraps an opened playback with a queue of `capacity` events. The
    /// feed waits while the queue is full.
    #[must_use]
    pub fn bounded(playback: HistoricPlayback, capacity: usize) -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self::with_sender(playback, EventSender::Bounded(tx)),
            EventReceiver::Bounded(rx),
        )
    }

    fn with_sender(playback: HistoricPlayback, sender: EventSender) -> Self {
        Self {
            playback,
            sender,
            continue_backtest: true,
            stop: StopFlag::new(),
        }
    }

    /// Uses `stop` to end [`run`](Self::run) between events.
    #[must_use]
    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    /// Returns false once the playback is exhausted.
    #[must_use]
    pub const fn continue_backtest(&self) -> bool {
        self.continue_backtest
    }

    /// Returns the underlying playback.
    #[must_use]
    pub const fn playback(&self) -> &HistoricPlayback {
        &self.playback
    }

    /// Enqueues the next tick. Returns false at the end of the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if playback fails or the receiver was dropped.
    pub async fn stream_next_tick(&mut self) -> Result<bool> {
        match self.playback.next().await? {
            Some(event) => {
                self.sender.send(MarketEvent::Tick(event)).await?;
                Ok(true)
            }
            None => {
                debug!("tick feed exhausted");
                self.continue_backtest = false;
                Ok(false)
            }
        }
    }

    /// Enqueues ticks until the playback is exhausted or the stop flag is
    /// set. Returns the number of events sent.
    ///
    /// # Errors
    ///
    /// Returns an error if playback fails or the receiver was dropped.
    pub async fn run(&mut self) -> Result<u64> {
        let mut sent = 0;
        while self.continue_backtest && !self.stop.is_stopped() {
            if self.stream_next_tick().await? {
                sent += 1;
            }
        }
        info!(sent, exhausted = !self.continue_backtest, "tick feed finished");
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PlaybackState;
    use chrono::{DateTime, TimeZone, Utc};
    use fxmaster_store::{MemoryStore, TickStore};
    use fxmaster_types::{Quote, Tag, TagSet, TimeWindow};
    use std::sync::Arc;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 2, 1, 10, minute, 0).unwrap()
    }

    async fn opened(ticks: u32) -> HistoricPlayback {
        let store = MemoryStore::new();
        let tags = TagSet::new()
            .with(Tag::Symbol, "EURUSD")
            .with(Tag::Provider, "fxcm")
            .with(Tag::Filename, "EURUSD_2016_5");
        let quotes: Vec<_> = (0..ticks)
            .map(|m| Quote::new(at(m), 1.1, 1.1002))
            .collect();
        store.write_ticks("fx_ticks", &tags, &quotes).await.unwrap();

        let mut playback = HistoricPlayback::new(Arc::new(store), "fx_ticks");
        let window = TimeWindow::new(at(0), at(59)).unwrap();
        playback.open(["EURUSD"], "fxcm", window).await.unwrap();
        playback
    }

    #[tokio::test]
    async fn test_feed_flags_exhaustion() {
        let (mut feed, mut rx) = TickFeed::new(opened(3).await);
        assert!(feed.continue_backtest());

        let mut pulled = 0;
        while feed.stream_next_tick().await.unwrap() {
            pulled += 1;
        }
        assert_eq!(pulled, 3);
        assert!(!feed.continue_backtest());
        assert_eq!(feed.playback().state(), PlaybackState::Exhausted);

        let mut received = Vec::new();
        while let Some(event) = rx.try_recv() {
            received.push(event.timestamp());
        }
        assert_eq!(received, vec![at(0), at(1), at(2)]);
    }

    #[tokio::test]
    async fn test_bounded_queue_applies_backpressure() {
        let (mut feed, mut rx) = TickFeed::bounded(opened(10).await, 2);
        let producer = tokio::spawn(async move { feed.run().await });

        let mut received = 0;
        while let Some(MarketEvent::Tick(event)) = rx.recv().await {
            assert_eq!(event.symbol, "EURUSD");
            received += 1;
        }
        assert_eq!(received, 10);
        assert_eq!(producer.await.unwrap().unwrap(), 10);
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_an_error() {
        let (mut feed, rx) = TickFeed::new(opened(2).await);
        drop(rx);
        assert!(matches!(
            feed.stream_next_tick().await,
            Err(PlaybackError::QueueClosed)
        ));
    }

    #[tokio::test]
    async fn test_stop_flag_ends_run() {
        let stop = StopFlag::new();
        let (feed, _rx) = TickFeed::new(opened(5).await);
        let mut feed = feed.with_stop_flag(stop.clone());
        stop.stop();
        assert_eq!(feed.run().await.unwrap(), 0);
        assert!(feed.continue_backtest());
    }
}
