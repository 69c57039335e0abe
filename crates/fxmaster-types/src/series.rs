//! Series identity.

use serde::{Deserialize, Serialize};

use crate::{Predicate, Tag, TagSet};

/// `(symbol, provider)` pair: the unit of resampling and playback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    /// Six letter currency pair.
    pub symbol: String,
    /// Data provider.
    pub provider: String,
}

impl SeriesKey {
    /// Creates a new series key.
    #[must_use]
    pub fn new(symbol: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            provider: provider.into(),
        }
    }

    /// Returns the series tags.
    #[must_use]
    pub fn tags(&self) -> TagSet {
        TagSet::new()
            .with(Tag::Symbol, &self.symbol)
            .with(Tag::Provider, &self.provider)
    }

    /// Returns the predicate selecting exactly this series.
    #[must_use]
    pub fn predicate(&self) -> Predicate {
        Predicate::exact(&self.tags())
    }
}

impl std::fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.symbol, self.provider)
    }
}
