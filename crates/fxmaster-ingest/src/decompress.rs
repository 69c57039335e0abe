//! Gzip source file decoding.

use flate2::read::GzDecoder;
use fxmaster_types::{Quote, SourceFile};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::parse::{is_data_line, parse_line};
use crate::{DecodeError, IngestError, Result};

/// Reads and decompresses a whole source file.
///
/// NUL characters are dropped: some provider files pad every character
/// with one.
///
/// # Errors
///
/// Returns [`DecodeError::Read`] if the file cannot be opened or the gzip
/// stream is corrupt.
pub fn read_source(path: &Path) -> std::result::Result<String, DecodeError> {
    let read_error = |source| DecodeError::Read {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(read_error)?;
    let mut decoder = GzDecoder::new(BufReader::new(file));
    let mut content = String::new();
    decoder.read_to_string(&mut content).map_err(read_error)?;
    content.retain(|c| c != '\0');
    Ok(content)
}

/// Counts data rows: every non-blank line after the header.
#[must_use]
pub fn count_data_rows(content: &str) -> u64 {
    content.lines().skip(1).filter(|line| is_data_line(line)).count() as u64
}

/// Parses every data row of a decompressed file.
///
/// # Errors
///
/// Fails on the first unparseable row, or if the parsed row count differs
/// from the counted data rows.
pub fn decode_source(content: &str) -> std::result::Result<Vec<Quote>, DecodeError> {
    let counted = count_data_rows(content);
    let mut quotes = Vec::with_capacity(counted as usize);

    for (index, line) in content.lines().enumerate().skip(1) {
        if !is_data_line(line) {
            continue;
        }
        let quote = parse_line(line).map_err(|source| DecodeError::Row {
            line: index + 1,
            source,
        })?;
        quotes.push(quote);
    }

    let parsed = quotes.len() as u64;
    if parsed != counted {
        return Err(DecodeError::RowCountMismatch { counted, parsed });
    }
    Ok(quotes)
}

/// Decodes a source file on the blocking pool.
///
/// The outer error is a task failure; the inner one is fatal for this
/// bucket only.
///
/// # Errors
///
/// Returns [`IngestError::Task`] if the blocking task panics.
pub async fn decode_file(
    file: &SourceFile,
) -> Result<std::result::Result<Vec<Quote>, DecodeError>> {
    let path = file.path.clone();
    tokio::task::spawn_blocking(move || read_source(&path).and_then(|c| decode_source(&c)))
        .await
        .map_err(|e| IngestError::Task(e.to_string()))
}

/// Counts the data rows of a source file on the blocking pool.
///
/// # Errors
///
/// Returns [`IngestError::Task`] if the blocking task panics.
pub async fn count_rows(file: &SourceFile) -> Result<std::result::Result<u64, DecodeError>> {
    let path = file.path.clone();
    tokio::task::spawn_blocking(move || read_source(&path).map(|c| count_data_rows(&c)))
        .await
        .map_err(|e| IngestError::Task(e.to_string()))
}


#[cfg(test)]
mod tests {
    use super::fixtures::{HEADER, tick_rows, write_gz};
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_count_skips_header_and_blank_lines() {
        let content = format!("{HEADER}\n01/04/2015 22:00:01.587,0.9,1.0\n\n  \n01/04/2015 22:00:02.000,0.9,1.0\n");
        assert_eq!(count_data_rows(&content), 2);
        assert_eq!(count_data_rows(HEADER), 0);
        assert_eq!(count_data_rows(""), 0);
    }

    #[test]
    fn test_decode_source() {
        let quotes = decode_source(&tick_rows(120)).unwrap();
        assert_eq!(quotes.len(), 120);
        assert!(quotes.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_decode_reports_line_number() {
        let content = format!("{HEADER}\n01/04/2015 22:00:01.587,0.9,1.0\n2015-01-04,0.9,1.0\n");
        match decode_source(&content) {
            Err(DecodeError::Row { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_read_round_trip_and_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_gz(temp_dir.path(), "AUDCAD_2015_1.csv.gz", &tick_rows(10));
        let content = read_source(&path).unwrap();
        assert_eq!(count_data_rows(&content), 10);

        let corrupt = temp_dir.path().join("AUDCAD_2015_2.csv.gz");
        std::fs::write(&corrupt, b"not gzip at all").unwrap();
        assert!(matches!(read_source(&corrupt), Err(DecodeError::Read { .. })));
    }

    #[test]
    fn test_read_drops_nul_padding() {
        let temp_dir = TempDir::new().unwrap();
        let padded: String = format!("{HEADER}\n01/04/2015 22:00:01.587,0.9,1.0\n")
            .chars()
            .flat_map(|c| [c, '\0'])
            .collect();
        let path = write_gz(temp_dir.path(), "AUDCAD_2015_1.csv.gz", &padded);

        let content = read_source(&path).unwrap();
        assert!(!content.contains('\0'));
        assert_eq!(count_data_rows(&content), 1);

        let quotes = decode_source(&content).unwrap();
        assert_eq!(quotes.len(), 1);
        assert!((quotes[0].bid - 0.9).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_decode_file_on_blocking_pool() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_gz(temp_dir.path(), "AUDCAD_2015_1.csv.gz", &tick_rows(25));
        let file = SourceFile::from_path(path).unwrap();

        assert_eq!(decode_file(&file).await.unwrap().unwrap().len(), 25);
        assert_eq!(count_rows(&file).await.unwrap().unwrap(), 25);
    }
}
