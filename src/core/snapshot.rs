//! Secret snapshots and the .env line codec.
//!
//! A [`Snapshot`] is the complete key-value secret set for one environment at
//! a point in time. Snapshots are immutable once constructed; every operation
//! that would change one produces a new snapshot.
//!
//! The codec round-trips: `parse(format(s)) == s` for any snapshot whose
//! values are single-line. `format(parse(t))` is semantically equivalent to
//! `t` but not byte-identical (comments and blank lines are dropped, quoting
//! is normalized).

use std::collections::BTreeMap;
use std::path::Path;

use tracing::warn;

use crate::core::validation;
use crate::error::{Result, ValidationError};

/// How to treat lines that are not blank, not comments, and not `KEY=VALUE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Reject the whole file on the first malformed line.
    Strict,
    /// Skip malformed lines with a warning. Display paths only.
    Lenient,
}

/// An immutable mapping from secret name to secret value.
///
/// Keys are unique; iteration order is the canonical (sorted) key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<String, String>,
}

impl Snapshot {
    /// Build a snapshot from key-value pairs. Later duplicates win.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse the line-oriented .env format.
    ///
    /// Rules: blank lines and `#` comments are skipped; the first `=` splits
    /// key from value; a value wrapped in matching single or double quotes is
    /// unwrapped, with `\"` unescaped inside double quotes; an unquoted value
    /// is taken verbatim to end of line. A key with no value yields `""`.
    /// Duplicate keys: the last occurrence wins.
    pub fn parse(text: &str, path: &str, mode: ParseMode) -> Result<Self> {
        let mut entries = BTreeMap::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                match mode {
                    ParseMode::Strict => {
                        return Err(ValidationError::MalformedLine {
                            path: path.to_string(),
                            line: idx + 1,
                        }
                        .into());
                    }
                    ParseMode::Lenient => {
                        warn!(path, line = idx + 1, "skipping malformed line");
                        continue;
                    }
                }
            };

            let key = key.trim();
            if key.is_empty() {
                match mode {
                    ParseMode::Strict => {
                        return Err(ValidationError::MalformedLine {
                            path: path.to_string(),
                            line: idx + 1,
                        }
                        .into());
                    }
                    ParseMode::Lenient => {
                        warn!(path, line = idx + 1, "skipping line with empty key");
                        continue;
                    }
                }
            }
            if let Err(e) = validation::validate_key(key) {
                match mode {
                    ParseMode::Strict => return Err(e),
                    ParseMode::Lenient => {
                        warn!(path, line = idx + 1, "skipping invalid key");
                        continue;
                    }
                }
            }

            entries.insert(key.to_string(), unquote(value.trim()));
        }

        Ok(Self { entries })
    }

    /// Read and parse a snapshot file.
    pub fn load(path: &Path, mode: ParseMode) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, &path.display().to_string(), mode)
    }

    /// Serialize to the .env format: keys in canonical order, newline-joined,
    /// no trailing blank line.
    pub fn format(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{}={}", k, quote(v)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Iterate entries in canonical key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keys in canonical order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of secrets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot holds no secrets.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Strip matching surrounding quotes and unescape `\"` inside double quotes.
fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && first == b'"' {
            let inner = &value[1..value.len() - 1];
            return inner.replace("\\\"", "\"");
        }
        if first == last && first == b'\'' {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

/// Quote a value for emission when required for a faithful round-trip.
///
/// Empty values, values containing whitespace, and values that would parse
/// as quoted must be wrapped in double quotes with `"` escaped as `\"`.
fn quote(value: &str) -> String {
    let looks_quoted = {
        let b = value.as_bytes();
        b.len() >= 2 && b[0] == b[b.len() - 1] && (b[0] == b'"' || b[0] == b'\'')
    };

    if value.is_empty() || value.chars().any(char::is_whitespace) || looks_quoted {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parse(text: &str) -> Snapshot {
        Snapshot::parse(text, ".env", ParseMode::Strict).unwrap()
    }

    #[test]
    fn test_parse_basic() {
        let snap = parse("API_KEY=secret123\nDB_URL=postgres://localhost/db");
        assert_eq!(snap.get("API_KEY"), Some("secret123"));
        assert_eq!(snap.get("DB_URL"), Some("postgres://localhost/db"));
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let snap = parse("# comment\n\n  # indented comment\nKEY=value\n");
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.get("KEY"), Some("value"));
    }

    #[test]
    fn test_parse_first_equals_splits() {
        let snap = parse("TOKEN=abc=def==");
        assert_eq!(snap.get("TOKEN"), Some("abc=def=="));
    }

    #[test]
    fn test_parse_empty_value() {
        let snap = parse("EMPTY=");
        assert_eq!(snap.get("EMPTY"), Some(""));
    }

    #[test]
    fn test_parse_strips_matching_quotes() {
        let snap = parse("A=\"hello world\"\nB='single quoted'\nC=\"esc \\\" quote\"");
        assert_eq!(snap.get("A"), Some("hello world"));
        assert_eq!(snap.get("B"), Some("single quoted"));
        assert_eq!(snap.get("C"), Some("esc \" quote"));
    }

    #[test]
    fn test_parse_unquoted_value_verbatim() {
        let snap = parse("CMD=echo hello world");
        assert_eq!(snap.get("CMD"), Some("echo hello world"));
    }

    #[test]
    fn test_parse_mismatched_quotes_kept() {
        let snap = parse("A=\"unterminated\nB='mixed\"");
        assert_eq!(snap.get("A"), Some("\"unterminated"));
        assert_eq!(snap.get("B"), Some("'mixed\""));
    }

    #[test]
    fn test_parse_duplicate_last_wins() {
        let snap = parse("K=first\nK=second");
        assert_eq!(snap.get("K"), Some("second"));
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn test_parse_strict_rejects_malformed() {
        let err = Snapshot::parse("NOT A PAIR", ".env", ParseMode::Strict).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_parse_lenient_skips_malformed() {
        let snap = Snapshot::parse("garbage\nGOOD=1", ".env", ParseMode::Lenient).unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.get("GOOD"), Some("1"));
    }

    #[test]
    fn test_format_canonical_order_no_trailing_newline() {
        let snap = Snapshot::from_pairs([("ZED", "1"), ("ALPHA", "2")]);
        assert_eq!(snap.format(), "ALPHA=2\nZED=1");
    }

    #[test]
    fn test_format_quotes_when_needed() {
        let snap = Snapshot::from_pairs([
            ("SPACES", "a b"),
            ("EMPTY", ""),
            ("PLAIN", "plain"),
            ("QUOTY", "\"wrapped\""),
        ]);
        let text = snap.format();
        assert!(text.contains("SPACES=\"a b\""));
        assert!(text.contains("EMPTY=\"\""));
        assert!(text.contains("PLAIN=plain"));
        assert!(text.contains("QUOTY=\"\\\"wrapped\\\"\""));
    }

    #[test]
    fn test_round_trip_tricky_values() {
        let snap = Snapshot::from_pairs([
            ("A", "value with spaces"),
            ("B", ""),
            ("C", "has\"quote"),
            ("D", "a=b=c"),
            ("E", "'single'"),
            ("F", "#not-a-comment"),
        ]);
        assert_eq!(parse(&snap.format()), snap);
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            pairs in proptest::collection::btree_map(
                "[A-Za-z_][A-Za-z0-9_]{0,12}",
                "[ -~]{0,24}",
                0..8,
            )
        ) {
            let snap = Snapshot::from_pairs(pairs);
            let reparsed = Snapshot::parse(&snap.format(), ".env", ParseMode::Strict).unwrap();
            prop_assert_eq!(reparsed, snap);
        }
    }
}
