use crate::error::DumpError;
use crate::resolve::{Object, is_stats_row};
use serde_json::Value;
use tracing::debug;

/// How to pick one change when a dump holds several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// Use the first candidate and report the ambiguity.
    #[default]
    First,
    /// Refuse to guess.
    Strict,
}

/// The chosen raw record plus how many candidates competed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Selected {
    pub record: Object,
    pub candidates: usize,
}

impl Selected {
    pub fn is_ambiguous(&self) -> bool {
        self.candidates > 1
    }
}

/// Splits raw dump text into candidate change records, in input order.
///
/// Accepts a single object, an array of objects, or newline-delimited
/// objects. Statistics rows are discarded.
pub fn parse_dump(text: &str) -> Result<Vec<Object>, DumpError> {
    let text = text.trim();

    let mut candidates = match serde_json::from_str::<Value>(text) {
        Ok(value) => whole_document(value),
        Err(err) => {
            debug!("dump is not a single json document ({err}), reading line by line");
            Vec::new()
        }
    };

    if candidates.is_empty() {
        candidates = line_delimited(text);
    }

    if candidates.is_empty() {
        return Err(DumpError::NoValidRecord);
    }
    Ok(candidates)
}

/// Parses `text` and picks one record according to `policy`.
pub fn select_change(text: &str, policy: SelectionPolicy) -> Result<Selected, DumpError> {
    let mut candidates = parse_dump(text)?;
    let count = candidates.len();
    if count > 1 {
        match policy {
            SelectionPolicy::First => {
                debug!(count, "multiple change objects found; using the first one");
            }
            SelectionPolicy::Strict => return Err(DumpError::AmbiguousInput { count }),
        }
    }
    let record = candidates.swap_remove(0);
    Ok(Selected {
        record,
        candidates: count,
    })
}

fn whole_document(value: Value) -> Vec<Object> {
    match value {
        Value::Array(items) => items.into_iter().filter_map(change_object).collect(),
        other => change_object(other).into_iter().collect(),
    }
}

fn line_delimited(text: &str) -> Vec<Object> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<Value>(line) {
            Ok(value) => change_object(value),
            Err(err) => {
                debug!("skipping unparseable dump line: {err}");
                None
            }
        })
        .collect()
}

fn change_object(value: Value) -> Option<Object> {
    match value {
        Value::Object(object) if !is_stats_row(&object) => Some(object),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_object() {
        let records = parse_dump(r#"{"number": 12, "subject": "Fix"}"#).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(Value::Object(records[0].clone()), json!({"number": 12, "subject": "Fix"}));
    }

    #[test]
    fn test_array_drops_stats_row_and_keeps_order() {
        let text = r#"[
            {"number": 1},
            {"type": "stats", "rowCount": 2},
            {"number": 2},
            "not an object"
        ]"#;
        let records = parse_dump(text).unwrap();
        let numbers: Vec<_> = records.iter().map(|r| r["number"].clone()).collect();
        assert_eq!(numbers, vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_newline_delimited_with_garbage() {
        let text = "{\"number\": 1}\n\nnot json\n{\"number\": 2}\n{\"type\":\"stats\",\"rowCount\":2}\n";
        let records = parse_dump(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["number"], json!(2));
    }

    #[test]
    fn test_only_stats_is_malformed() {
        let err = parse_dump(r#"{"type": "stats", "rowCount": 0}"#).unwrap_err();
        assert!(matches!(err, DumpError::NoValidRecord));
        assert!(matches!(parse_dump("").unwrap_err(), DumpError::NoValidRecord));
        assert!(matches!(parse_dump("[1, 2]").unwrap_err(), DumpError::NoValidRecord));
    }

    #[test]
    fn test_select_first_reports_ambiguity() {
        let text = "{\"number\": 1}\n{\"number\": 2}\n";
        let selected = select_change(text, SelectionPolicy::First).unwrap();
        assert!(selected.is_ambiguous());
        assert_eq!(selected.candidates, 2);
        assert_eq!(selected.record["number"], json!(1));
    }

    #[test]
    fn test_select_strict_rejects_ambiguity() {
        let text = "{\"number\": 1}\n{\"number\": 2}\n";
        let err = select_change(text, SelectionPolicy::Strict).unwrap_err();
        assert!(matches!(err, DumpError::AmbiguousInput { count: 2 }));

        let single = select_change("{\"number\": 1}", SelectionPolicy::Strict).unwrap();
        assert!(!single.is_ambiguous());
    }
}
