//! Tag sets and the predicate builder used by store queries.
//!
//! A [`Predicate`] is a conjunction of [`TagFilter`]s; each filter is a list
//! of `(tag, value)` equalities joined by one [`Joiner`]. This covers the two
//! shapes the pipeline needs: an exact tag set (`symbol AND provider AND
//! filename`) and a symbol list under a provider (`provider AND (symbol OR
//! symbol ...)`). Rendering to a concrete query language is left to the store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag keys attached to stored rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    /// Currency pair.
    Symbol,
    /// Data provider.
    Provider,
    /// Source file id (file name without extension).
    Filename,
    /// Bar frequency.
    Frequency,
}

impl Tag {
    /// Returns the tag key as stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Symbol => "symbol",
            Self::Provider => "provider",
            Self::Filename => "filename",
            Self::Frequency => "frequency",
        }
    }

    /// Parses a stored tag key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "symbol" => Some(Self::Symbol),
            "provider" => Some(Self::Provider),
            "filename" => Some(Self::Filename),
            "frequency" => Some(Self::Frequency),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fixed key/value tag set attached to written rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TagSet(BTreeMap<Tag, String>);

impl TagSet {
    /// Creates an empty tag set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds or replaces a tag.
    #[must_use]
    pub fn with(mut self, tag: Tag, value: impl Into<String>) -> Self {
        self.0.insert(tag, value.into());
        self
    }

    /// Sets a tag in place.
    pub fn insert(&mut self, tag: Tag, value: impl Into<String>) {
        self.0.insert(tag, value.into());
    }

    /// Returns the value of a tag.
    #[must_use]
    pub fn get(&self, tag: Tag) -> Option<&str> {
        self.0.get(&tag).map(String::as_str)
    }

    /// Iterates over tags in key order.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Returns the number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no tag is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for TagSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Operator joining the pairs of one filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joiner {
    /// Every pair must match.
    And,
    /// At least one pair must match.
    Or,
}

impl Joiner {
    /// Returns the operator keyword.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// A list of `(tag, value)` equalities joined by one operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagFilter {
    joiner: Joiner,
    pairs: Vec<(Tag, String)>,
}

impl TagFilter {
    /// Creates an empty filter with the given operator.
    #[must_use]
    pub const fn new(joiner: Joiner) -> Self {
        Self {
            joiner,
            pairs: Vec::new(),
        }
    }

    /// Adds an equality.
    #[must_use]
    pub fn eq(mut self, tag: Tag, value: impl Into<String>) -> Self {
        self.pairs.push((tag, value.into()));
        self
    }

    /// Returns the operator.
    #[must_use]
    pub const fn joiner(&self) -> Joiner {
        self.joiner
    }

    /// Returns the equalities.
    #[must_use]
    pub fn pairs(&self) -> &[(Tag, String)] {
        &self.pairs
    }

    /// Evaluates the filter against a row's tags.
    ///
    /// An empty `And` filter matches everything; an empty `Or` filter
    /// matches nothing.
    #[must_use]
    pub fn matches(&self, tags: &TagSet) -> bool {
        let hit = |(tag, value): &(Tag, String)| tags.get(*tag) == Some(value.as_str());
        match self.joiner {
            Joiner::And => self.pairs.iter().all(hit),
            Joiner::Or => self.pairs.iter().any(hit),
        }
    }
}

/// Conjunction of tag filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Predicate {
    filters: Vec<TagFilter>,
}

impl Predicate {
    /// Creates a predicate that matches every row.
    #[must_use]
    pub const fn any() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Creates a predicate matching every tag of `tags` exactly.
    #[must_use]
    pub fn exact(tags: &TagSet) -> Self {
        let filter = tags
            .iter()
            .fold(TagFilter::new(Joiner::And), |f, (tag, value)| f.eq(tag, value));
        Self::any().and(filter)
    }

    /// Creates a predicate matching any of `values` for one tag.
    #[must_use]
    pub fn one_of<I, V>(tag: Tag, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let filter = values
            .into_iter()
            .fold(TagFilter::new(Joiner::Or), |f, value| f.eq(tag, value));
        Self::any().and(filter)
    }

    /// Adds a filter to the conjunction.
    #[must_use]
    pub fn and(mut self, filter: TagFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Adds a single equality to the conjunction.
    #[must_use]
    pub fn and_eq(self, tag: Tag, value: impl Into<String>) -> Self {
        self.and(TagFilter::new(Joiner::And).eq(tag, value))
    }

    /// Returns the filters.
    #[must_use]
    pub fn filters(&self) -> &[TagFilter] {
        &self.filters
    }

    /// Returns true if no filter is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Evaluates the predicate against a row's tags.
    #[must_use]
    pub fn matches(&self, tags: &TagSet) -> bool {
        self.filters.iter().all(|f| f.matches(tags))
    }
}
