use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::NaiveDateTime;

/// Fixed-width, second-precision format used for temporal column values.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single cell of a dumped row, in the shape it is written to (and can be
/// read back from) a dump document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    /// Renders the value as a statement literal safe to replay.
    pub fn render(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Timestamp(ts) => format!("'{}'", ts.format(TIMESTAMP_FORMAT)),
            SqlValue::Bytes(bytes) => format!("FROM_BASE64('{}')", BASE64.encode(bytes)),
            SqlValue::Text(text) => format!("'{}'", escape(text)),
        }
    }

    /// Inverse of [`render`](Self::render).
    ///
    /// Quoted literals that match the exact timestamp width parse as
    /// [`SqlValue::Timestamp`]; everything else quoted parses as text.
    pub fn parse(literal: &str) -> Option<SqlValue> {
        if literal == "NULL" {
            return Some(SqlValue::Null);
        }
        if let Some(encoded) = literal
            .strip_prefix("FROM_BASE64('")
            .and_then(|rest| rest.strip_suffix("')"))
        {
            return BASE64.decode(encoded).ok().map(SqlValue::Bytes);
        }

        let inner = literal.strip_prefix('\'')?.strip_suffix('\'')?;
        let text = unescape(inner)?;
        if text.len() == 19 {
            if let Ok(ts) = NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT) {
                return Some(SqlValue::Timestamp(ts));
            }
        }
        Some(SqlValue::Text(text))
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push(chars.next()?),
            // an unescaped quote cannot appear inside a rendered literal
            '\'' => return None,
            c => out.push(c),
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn round_trip(value: SqlValue) {
        let rendered = value.render();
        assert_eq!(SqlValue::parse(&rendered), Some(value), "literal: {rendered}");
    }

    #[test]
    fn null_round_trips() {
        assert_eq!(SqlValue::Null.render(), "NULL");
        round_trip(SqlValue::Null);
    }

    #[test]
    fn timestamp_round_trips_at_second_precision() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(17, 5, 42)
            .unwrap();
        assert_eq!(SqlValue::Timestamp(ts).render(), "'2024-03-09 17:05:42'");
        round_trip(SqlValue::Timestamp(ts));
    }

    #[test]
    fn subsecond_precision_is_truncated_on_render() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_micro_opt(17, 5, 42, 123_456)
            .unwrap();
        assert_eq!(SqlValue::Timestamp(ts).render(), "'2024-03-09 17:05:42'");
    }

    #[test]
    fn binary_round_trips_and_is_distinguishable() {
        let bytes = vec![0u8, 159, 146, 150, 255];
        let rendered = SqlValue::Bytes(bytes.clone()).render();
        assert!(rendered.starts_with("FROM_BASE64('"));
        round_trip(SqlValue::Bytes(bytes));
    }

    #[test]
    fn text_with_quotes_and_backslashes_round_trips() {
        assert_eq!(SqlValue::Text(r"a\b".into()).render(), r"'a\\b'");
        assert_eq!(SqlValue::Text("it's".into()).render(), r"'it\'s'");
        round_trip(SqlValue::Text(r"it's a \'tricky\' value \".to_string()));
    }

    #[test]
    fn plain_text_renders_quoted() {
        assert_eq!(SqlValue::Text("hello".into()).render(), "'hello'");
        round_trip(SqlValue::Text("hello".into()));
    }

    #[test]
    fn timestamp_shaped_text_parses_as_timestamp() {
        let parsed = SqlValue::parse("'2024-03-09 17:05:42'").unwrap();
        assert!(matches!(parsed, SqlValue::Timestamp(_)));
    }

    #[test]
    fn malformed_literals_are_rejected() {
        assert_eq!(SqlValue::parse("unquoted"), None);
        assert_eq!(SqlValue::parse("'dangling"), None);
        assert_eq!(SqlValue::parse("'bad\\'"), None);
    }
}
