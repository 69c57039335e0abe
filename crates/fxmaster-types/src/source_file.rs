//! Weekly source file naming.
//!
//! Source files follow the `SYMBOL_YYYY_WW.csv.gz` convention, e.g.
//! `EURUSD_2016_5.csv.gz`. The name is the only source of the bucket's
//! identity; the file contents are never consulted.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Tag, TagSet};

/// Extension of every source file.
pub const SOURCE_EXTENSION: &str = ".csv.gz";

/// First year accepted in a source file name.
const MIN_YEAR: u16 = 2015;

/// A weekly tick file, identified by its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceFile {
    /// Six letter currency pair.
    pub symbol: String,
    /// Calendar year.
    pub year: u16,
    /// Week number (1..=53).
    pub week: u8,
    /// Location on disk.
    pub path: PathBuf,
}

impl SourceFile {
    /// Builds a source file from a path whose name follows the convention.
    ///
    /// Returns `None` for any other name.
    ///
    /// # Example
    ///
    /// ```
    /// use fxmaster_types::SourceFile;
    ///
    /// let file = SourceFile::from_path("/data/EURUSD/2016/EURUSD_2016_5.csv.gz").unwrap();
    /// assert_eq!(file.file_id(), "EURUSD_2016_5");
    /// assert!(SourceFile::from_path("/data/eurusd_2016_5.csv.gz").is_none());
    /// ```
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let name = path.file_name()?.to_str()?;
        let (symbol, year, week) = parse_file_name(name)?;
        Some(Self {
            symbol,
            year,
            week,
            path: path.to_path_buf(),
        })
    }

    /// Returns the file id: the name without its extension.
    #[must_use]
    pub fn file_id(&self) -> String {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_suffix(SOURCE_EXTENSION))
            .map_or_else(
                || format!("{}_{}_{}", self.symbol, self.year, self.week),
                str::to_string,
            )
    }

    /// Returns the exact tag set of this bucket for `provider`.
    #[must_use]
    pub fn tags(&self, provider: &str) -> TagSet {
        TagSet::new()
            .with(Tag::Symbol, &self.symbol)
            .with(Tag::Provider, provider)
            .with(Tag::Filename, self.file_id())
    }

    /// Reconstructs the conventional location of a stored bucket:
    /// `<root>/<SYMBOL>/<YEAR>/<file_id>.csv.gz`.
    ///
    /// Returns `None` if `file_id` does not follow the naming convention.
    #[must_use]
    pub fn store_path(root: impl AsRef<Path>, file_id: &str) -> Option<PathBuf> {
        let name = format!("{file_id}{SOURCE_EXTENSION}");
        let (symbol, year, _) = parse_file_name(&name)?;
        Some(root.as_ref().join(symbol).join(year.to_string()).join(name))
    }
}

impl std::fmt::Display for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_id())
    }
}

/// Parses a file name of the form `SYMBOL_20YY_W.csv.gz`.
///
/// The symbol is exactly six uppercase ASCII letters, the year is four digits
/// starting with `20` and not before 2015, and the week is one or two digits
/// in `1..=53`. Returns `(symbol, year, week)`.
#[must_use]
pub fn parse_file_name(name: &str) -> Option<(String, u16, u8)> {
    let stem = name.strip_suffix(SOURCE_EXTENSION)?;
    let mut parts = stem.split('_');
    let (symbol, year, week) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    if symbol.len() != 6 || !symbol.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    if year.len() != 4 || !year.starts_with("20") || !is_digits(year) {
        return None;
    }
    if week.is_empty() || week.len() > 2 || !is_digits(week) {
        return None;
    }

    let year: u16 = year.parse().ok()?;
    let week: u8 = week.parse().ok()?;
    if year < MIN_YEAR || !(1..=53).contains(&week) {
        return None;
    }

    Some((symbol.to_string(), year, week))
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_conventional_names() {
        assert_eq!(
            parse_file_name("EURUSD_2016_5.csv.gz"),
            Some(("EURUSD".to_string(), 2016, 5))
        );
        assert_eq!(
            parse_file_name("AUDCAD_2015_1.csv.gz"),
            Some(("AUDCAD".to_string(), 2015, 1))
        );
        assert_eq!(
            parse_file_name("GBPJPY_2019_53.csv.gz"),
            Some(("GBPJPY".to_string(), 2019, 53))
        );
    }

    #[test]
    fn test_rejects_bad_names() {
        assert!(parse_file_name("eurusd_2016_5.csv.gz").is_none());
        assert!(parse_file_name("EURUSD_16_5.csv.gz").is_none());
        assert!(parse_file_name("EURUSD_2016_5.csv").is_none());
        assert!(parse_file_name("EURUSD_2016_123.csv.gz").is_none());
        assert!(parse_file_name("EURUSDX_2016_5.csv.gz").is_none());
        assert!(parse_file_name("EURUSD_2016_5_1.csv.gz").is_none());
        assert!(parse_file_name("EURUSD_2016_.csv.gz").is_none());
        assert!(parse_file_name("EURUSD_1916_5.csv.gz").is_none());
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(parse_file_name("EURUSD_2014_5.csv.gz").is_none());
        assert!(parse_file_name("EURUSD_2016_0.csv.gz").is_none());
        assert!(parse_file_name("EURUSD_2016_54.csv.gz").is_none());
    }

    #[test]
    fn test_file_id_and_tags() {
        let file = SourceFile::from_path("/data/AUDCAD/2015/AUDCAD_2015_1.csv.gz").unwrap();
        assert_eq!(file.file_id(), "AUDCAD_2015_1");

        let tags = file.tags("fxcm");
        assert_eq!(tags.get(Tag::Symbol), Some("AUDCAD"));
        assert_eq!(tags.get(Tag::Provider), Some("fxcm"));
        assert_eq!(tags.get(Tag::Filename), Some("AUDCAD_2015_1"));
    }

    #[test]
    fn test_leading_zero_week_keeps_id() {
        let file = SourceFile::from_path("EURUSD_2016_05.csv.gz").unwrap();
        assert_eq!(file.week, 5);
        assert_eq!(file.file_id(), "EURUSD_2016_05");
    }

    #[test]
    fn test_store_path() {
        let path = SourceFile::store_path("/data", "EURUSD_2016_5").unwrap();
        assert_eq!(path, PathBuf::from("/data/EURUSD/2016/EURUSD_2016_5.csv.gz"));
        assert!(SourceFile::store_path("/data", "not_a_file").is_none());
    }
}
