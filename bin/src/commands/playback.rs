//! Playback command implementation.
//!
//! Drives a [`TickFeed`] the way a backtest loop does: one tick is pushed,
//! then the queue is drained, until the feed runs dry.

use super::open_store;
use crate::display::{Format, event_line};
use anyhow::{Context, Result};
use fxmaster_lib::prelude::*;

/// Replays `symbols` in `window` to stdout.
pub(crate) async fn playback(
    settings: &Settings,
    symbols: Vec<String>,
    provider: &str,
    window: TimeWindow,
    limit: Option<u64>,
    format: Format,
    stop: StopFlag,
) -> Result<()> {
    let mut playback = HistoricPlayback::new(open_store(settings)?, &settings.playback.table);
    playback
        .open(symbols, provider, window)
        .await
        .with_context(|| format!("Failed to open playback over {window}"))?;

    #[allow(clippy::option_if_let_else)]
    let (mut feed, mut events) = match settings.playback.queue_capacity {
        Some(capacity) => TickFeed::bounded(playback, capacity),
        None => TickFeed::new(playback),
    };

    let mut printed = 0u64;
    while feed.continue_backtest() && !stop.is_stopped() {
        feed.stream_next_tick().await.context("Playback failed")?;
        while let Some(event) = events.try_recv() {
            println!("{}", event_line(&event, format)?);
            printed += 1;
        }
        if limit.is_some_and(|limit| printed >= limit) {
            break;
        }
    }

    eprintln!("{printed} events replayed");
    Ok(())
}
