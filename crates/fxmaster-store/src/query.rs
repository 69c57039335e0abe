//! InfluxQL and line protocol rendering.
//!
//! Everything here is pure string building so it can be tested without a
//! server. Identifiers are double quoted and literals single quoted with
//! backslash escapes; timestamps are rendered as epoch milliseconds.

use chrono::{DateTime, Utc};
use fxmaster_types::{Joiner, Predicate, TagSet, TimeWindow};

use crate::{Result, StoreError};

/// Quotes an identifier (measurement, tag or field key).
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Quotes a string literal.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Renders a timestamp as an epoch millisecond literal.
#[must_use]
pub fn time_literal(instant: DateTime<Utc>) -> String {
    format!("{}ms", instant.timestamp_millis())
}

/// Renders the condition for a half-open window.
#[must_use]
pub fn render_window(window: &TimeWindow) -> String {
    format!(
        "time >= {} AND time < {}",
        time_literal(window.start),
        time_literal(window.end)
    )
}

/// Renders a predicate as an InfluxQL condition.
///
/// Returns `None` for a predicate with no filters.
///
/// # Errors
///
/// Returns [`StoreError::EmptyFilter`] for an `OR` filter without pairs,
/// which cannot match any row.
pub fn render_predicate(predicate: &Predicate) -> Result<Option<String>> {
    let mut clauses = Vec::with_capacity(predicate.filters().len());

    for filter in predicate.filters() {
        if filter.pairs().is_empty() {
            match filter.joiner() {
                Joiner::And => continue,
                Joiner::Or => return Err(StoreError::EmptyFilter),
            }
        }

        let terms: Vec<String> = filter
            .pairs()
            .iter()
            .map(|(tag, value)| format!("{} = {}", quote_ident(tag.as_str()), quote_literal(value)))
            .collect();
        let joined = terms.join(&format!(" {} ", filter.joiner().as_str()));
        if terms.len() > 1 && filter.joiner() == Joiner::Or {
            clauses.push(format!("({joined})"));
        } else {
            clauses.push(joined);
        }
    }

    if clauses.is_empty() {
        Ok(None)
    } else {
        Ok(Some(clauses.join(" AND ")))
    }
}

/// Renders a `WHERE` clause (with leading space) or an empty string.
///
/// # Errors
///
/// Propagates [`render_predicate`] errors.
pub fn where_clause(predicate: &Predicate, window: Option<&TimeWindow>) -> Result<String> {
    let mut parts = Vec::with_capacity(2);
    if let Some(condition) = render_predicate(predicate)? {
        parts.push(condition);
    }
    if let Some(window) = window {
        parts.push(render_window(window));
    }

    if parts.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(" WHERE {}", parts.join(" AND ")))
    }
}

/// Escapes a measurement name for line protocol.
#[must_use]
pub fn escape_measurement(name: &str) -> String {
    name.replace(',', "\\,").replace(' ', "\\ ")
}

/// Escapes a tag key or value for line protocol.
#[must_use]
pub fn escape_tag(value: &str) -> String {
    value
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

/// Escapes a string field value (without the surrounding quotes).
#[must_use]
pub fn escape_field_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A field value in a line protocol point.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 64-bit float.
    Float(f64),
    /// Signed integer.
    Integer(i64),
    /// String.
    Text(String),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Display for f64 is the shortest representation that round-trips.
            Self::Float(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}i"),
            Self::Text(v) => write!(f, "\"{}\"", escape_field_string(v)),
        }
    }
}

/// Appends one line protocol point (with trailing newline) to `out`.
pub fn write_point(
    out: &mut String,
    measurement: &str,
    tags: &TagSet,
    fields: &[(&str, FieldValue)],
    timestamp_ms: i64,
) {
    out.push_str(&escape_measurement(measurement));
    for (tag, value) in tags.iter() {
        out.push_str(&format!(",{}={}", escape_tag(tag.as_str()), escape_tag(value)));
    }
    for (i, (key, value)) in fields.iter().enumerate() {
        let sep = if i == 0 { ' ' } else { ',' };
        out.push_str(&format!("{sep}{}={value}", escape_tag(key)));
    }
    out.push_str(&format!(" {timestamp_ms}\n"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fxmaster_types::Tag;

    fn bucket() -> TagSet {
        TagSet::new()
            .with(Tag::Symbol, "AUDCAD")
            .with(Tag::Provider, "fxcm")
            .with(Tag::Filename, "AUDCAD_2015_1")
    }

    #[test]
    fn test_render_exact_predicate() {
        let rendered = render_predicate(&Predicate::exact(&bucket())).unwrap().unwrap();
        assert_eq!(
            rendered,
            "\"symbol\" = 'AUDCAD' AND \"provider\" = 'fxcm' AND \"filename\" = 'AUDCAD_2015_1'"
        );
    }

    #[test]
    fn test_render_symbol_list() {
        let predicate = Predicate::any()
            .and_eq(Tag::Provider, "fxcm")
            .and(
                fxmaster_types::TagFilter::new(Joiner::Or)
                    .eq(Tag::Symbol, "EURUSD")
                    .eq(Tag::Symbol, "GBPUSD"),
            );
        let rendered = render_predicate(&predicate).unwrap().unwrap();
        assert_eq!(
            rendered,
            "\"provider\" = 'fxcm' AND (\"symbol\" = 'EURUSD' OR \"symbol\" = 'GBPUSD')"
        );
    }

    #[test]
    fn test_empty_or_is_rejected() {
        let predicate = Predicate::one_of(Tag::Symbol, Vec::<String>::new());
        assert!(matches!(
            render_predicate(&predicate),
            Err(StoreError::EmptyFilter)
        ));
        assert_eq!(render_predicate(&Predicate::any()).unwrap(), None);
    }

    #[test]
    fn test_literal_escaping() {
        assert_eq!(quote_literal("o'hara"), "'o\\'hara'");
        assert_eq!(quote_ident("fx \"ticks\""), "\"fx \\\"ticks\\\"\"");
    }

    #[test]
    fn test_where_clause_with_window() {
        let start = Utc.with_ymd_and_hms(2016, 1, 4, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2016, 1, 5, 0, 0, 0).unwrap();
        let window = TimeWindow::new(start, end).unwrap();
        let clause = where_clause(&Predicate::any(), Some(&window)).unwrap();
        assert_eq!(
            clause,
            " WHERE time >= 1451865600000ms AND time < 1451952000000ms"
        );
        assert_eq!(where_clause(&Predicate::any(), None).unwrap(), "");
    }

    #[test]
    fn test_write_point() {
        let mut out = String::new();
        write_point(
            &mut out,
            "fx_ticks",
            &bucket(),
            &[("bid", FieldValue::Float(1.1)), ("ask", FieldValue::Float(1.0))],
            1_420_070_400_123,
        );
        assert_eq!(
            out,
            "fx_ticks,symbol=AUDCAD,provider=fxcm,filename=AUDCAD_2015_1 bid=1.1,ask=1 1420070400123\n"
        );
    }

    #[test]
    fn test_write_point_appends_typed_fields() {
        let tags = TagSet::new().with(Tag::Symbol, "AUD CAD");
        let mut out = String::new();
        write_point(&mut out, "fx validation", &tags, &[("rows", FieldValue::Integer(5))], 0);
        write_point(
            &mut out,
            "fx validation",
            &tags,
            &[
                ("rows", FieldValue::Integer(-3)),
                ("status", FieldValue::Text("exact".into())),
            ],
            1,
        );
        assert_eq!(
            out,
            "fx\\ validation,symbol=AUD\\ CAD rows=5i 0\nfx\\ validation,symbol=AUD\\ CAD rows=-3i,status=\"exact\" 1\n"
        );
    }

    #[test]
    fn test_tag_escaping() {
        assert_eq!(escape_tag("a b,c=d"), "a\\ b\\,c\\=d");
        assert_eq!(FieldValue::Text("say \"hi\"".into()).to_string(), "\"say \\\"hi\\\"\"");
        assert_eq!(FieldValue::Integer(42).to_string(), "42i");
    }
}
