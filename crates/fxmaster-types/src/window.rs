//! Half-open time windows and chunk iteration.

use chrono::{DateTime, TimeDelta, Timelike, Utc};
use thiserror::Error;

/// Error for invalid time windows.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// Start is not strictly before end.
    #[error("Invalid time window: {start} >= {end}")]
    InvalidRange {
        /// The start instant.
        start: DateTime<Utc>,
        /// The end instant.
        end: DateTime<Utc>,
    },

    /// Chunk size is zero or negative.
    #[error("Invalid chunk size: {0}")]
    InvalidChunk(TimeDelta),
}

/// A half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    /// Start instant (inclusive).
    pub start: DateTime<Utc>,
    /// End instant (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new window, validating that start < end.
    ///
    /// # Errors
    ///
    /// Returns an error if start >= end.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WindowError> {
        if start >= end {
            return Err(WindowError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Builds the window covering every tick between `first` and `last`.
    ///
    /// Both bounds are truncated to the start of their minute; the end is
    /// pushed one minute past the truncated last tick so that minute is
    /// covered.
    #[must_use]
    pub fn covering(first: DateTime<Utc>, last: DateTime<Utc>) -> Self {
        let start = truncate_to_minute(first);
        let end = truncate_to_minute(last.max(first)) + TimeDelta::minutes(1);
        Self { start, end }
    }

    /// Returns the length of the window.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Returns true if the window contains the given instant.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    /// Returns a copy of the window starting at `start` instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the new start is not before the end.
    pub fn starting_at(&self, start: DateTime<Utc>) -> Result<Self, WindowError> {
        Self::new(start, self.end)
    }

    /// Splits the window into consecutive chunks of `size`.
    ///
    /// The last chunk is clipped to the end of the window.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is not positive.
    pub fn chunks(&self, size: TimeDelta) -> Result<ChunkIterator, WindowError> {
        if size <= TimeDelta::zero() {
            return Err(WindowError::InvalidChunk(size));
        }
        Ok(ChunkIterator {
            current: self.start,
            end: self.end,
            size,
        })
    }

    /// Returns the number of chunks of `size` needed to cover the window.
    #[must_use]
    pub fn chunk_count(&self, size: TimeDelta) -> usize {
        let size_ms = size.num_milliseconds();
        if size_ms <= 0 {
            return 0;
        }
        let total = self.duration().num_milliseconds();
        ((total + size_ms - 1) / size_ms) as usize
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.end.format("%Y-%m-%d %H:%M:%S%.3f")
        )
    }
}

/// Iterator over the chunks of a time window.
#[derive(Debug, Clone)]
pub struct ChunkIterator {
    current: DateTime<Utc>,
    end: DateTime<Utc>,
    size: TimeDelta,
}

impl Iterator for ChunkIterator {
    type Item = TimeWindow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.end {
            return None;
        }

        let start = self.current;
        let end = (start + self.size).min(self.end);
        self.current = end;
        Some(TimeWindow { start, end })
    }
}

/// Truncates a timestamp to the start of its minute.
#[must_use]
pub fn truncate_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .with_second(0)
        .and_then(|dt| dt.with_nanosecond(0))
        .unwrap_or(instant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 3, day, hour, minute, second).unwrap()
    }

    #[test]
    fn test_window_new() {
        let window = TimeWindow::new(at(1, 0, 0, 0), at(2, 0, 0, 0)).unwrap();
        assert_eq!(window.duration(), TimeDelta::hours(24));
    }

    #[test]
    fn test_window_invalid() {
        assert!(TimeWindow::new(at(2, 0, 0, 0), at(1, 0, 0, 0)).is_err());
        assert!(TimeWindow::new(at(1, 0, 0, 0), at(1, 0, 0, 0)).is_err());
    }

    #[test]
    fn test_window_is_half_open() {
        let window = TimeWindow::new(at(1, 0, 0, 0), at(1, 1, 0, 0)).unwrap();
        assert!(window.contains(at(1, 0, 0, 0)));
        assert!(window.contains(at(1, 0, 59, 59)));
        assert!(!window.contains(at(1, 1, 0, 0)));
    }

    #[test]
    fn test_chunks_clip_last() {
        let window = TimeWindow::new(at(1, 0, 0, 0), at(3, 12, 0, 0)).unwrap();
        let chunks: Vec<_> = window.chunks(TimeDelta::hours(24)).unwrap().collect();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].start, at(1, 0, 0, 0));
        assert_eq!(chunks[1].start, at(2, 0, 0, 0));
        assert_eq!(chunks[2].end, at(3, 12, 0, 0));
        assert_eq!(window.chunk_count(TimeDelta::hours(24)), 3);
    }

    #[test]
    fn test_chunks_rejects_zero_size() {
        let window = TimeWindow::new(at(1, 0, 0, 0), at(2, 0, 0, 0)).unwrap();
        assert!(window.chunks(TimeDelta::zero()).is_err());
    }

    #[test]
    fn test_covering_truncates_to_minute() {
        let first = at(1, 22, 0, 1) + TimeDelta::milliseconds(587);
        let last = at(6, 21, 59, 58) + TimeDelta::milliseconds(12);
        let window = TimeWindow::covering(first, last);

        assert_eq!(window.start, at(1, 22, 0, 0));
        assert_eq!(window.end, at(6, 22, 0, 0));
        assert!(window.contains(last));
    }
}
