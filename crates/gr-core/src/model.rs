//! Canonical, read-only view of one review change.

use crate::resolve::{
    Object, resolve, resolve_any, resolve_list, resolve_name, resolve_str, resolve_text,
    resolve_u32,
};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

pub const UNKNOWN_REVIEWER: &str = "Unknown";

const PATCH_SET_KEYS: &[&str] = &["patchSets", "patch_sets"];
const MESSAGE_KEYS: &[&str] = &["messages"];
const COMMENT_KEYS: &[&str] = &["comments"];
const NUMBER_KEYS: &[&str] = &["_number", "number"];
const FILE_KEYS: &[&str] = &["file", "path", "filename"];
const COMMENT_PATCH_SET_KEYS: &[&str] = &["patchSet", "patch_set"];

#[derive(Debug, Clone, PartialEq)]
pub struct PatchSet {
    pub number: u32,
    pub revision: Option<String>,
    pub uploader: Option<String>,
    pub created: Option<String>,
    pub raw: Object,
}

impl PatchSet {
    fn from_json(object: &Object) -> Option<Self> {
        let Some(number) = resolve_u32(object, NUMBER_KEYS) else {
            debug!("dropping patch set without a number");
            return None;
        };
        Some(Self {
            number,
            revision: resolve_str(object, &["revision", "commit"])
                .filter(|rev| is_revision(rev, number))
                .map(str::to_string),
            uploader: resolve_name(object, &["uploader", "author"]),
            created: resolve_text(object, &["createdOn", "created", "date"]),
            raw: object.clone(),
        })
    }

    /// Abbreviated revision for display.
    pub fn short_revision(&self) -> &str {
        match &self.revision {
            Some(revision) => revision.get(..7).unwrap_or(revision),
            None => "N/A",
        }
    }
}

/// Commit ids are hex; anything else is ignored rather than handed to git.
fn is_revision(revision: &str, number: u32) -> bool {
    if revision.is_empty() {
        return false;
    }
    let hex = revision.chars().all(|c| c.is_ascii_hexdigit());
    if !hex {
        warn!(patch_set = number, revision, "ignoring revision that is not a commit id");
    }
    hex
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub file: String,
    pub line: u32,
    pub patch_set: Option<u32>,
    pub reviewer: Option<String>,
    pub message: String,
    pub timestamp: Option<String>,
    pub raw: Object,
}

impl Comment {
    fn from_json(file: &str, object: &Object, inherited_patch_set: Option<u32>) -> Option<Self> {
        let Some(line) = resolve_u32(object, &["line"]) else {
            debug!(file, "dropping comment without a line number");
            return None;
        };
        Some(Self {
            file: file.to_string(),
            line,
            patch_set: resolve_u32(object, COMMENT_PATCH_SET_KEYS).or(inherited_patch_set),
            reviewer: resolve_name(object, &["reviewer", "author"]),
            message: resolve_text(object, &["message"]).unwrap_or_default(),
            timestamp: resolve_text(object, &["timestamp", "updated", "date"]),
            raw: object.clone(),
        })
    }

    pub fn reviewer_name(&self) -> &str {
        self.reviewer.as_deref().unwrap_or(UNKNOWN_REVIEWER)
    }

    /// Comments without a patch set pass every filter.
    pub fn matches_patch_set(&self, filter: Option<&str>) -> bool {
        match (filter, self.patch_set) {
            (None, _) | (_, None) => true,
            (Some(filter), Some(number)) => number.to_string() == filter.trim(),
        }
    }

    /// Sort key for ordering within a line; absent patch sets sort first.
    pub fn order_key(&self) -> u32 {
        self.patch_set.unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub revision_number: Option<u32>,
    pub author: Option<String>,
    pub timestamp: Option<String>,
    pub body: String,
    pub raw: Object,
}

impl Message {
    fn from_json(object: &Object) -> Self {
        Self {
            revision_number: resolve_u32(
                object,
                &["_revision_number", "revision_number", "patchSet", "patch_set"],
            ),
            author: resolve_name(object, &["author", "reviewer"]),
            timestamp: resolve_text(object, &["date", "timestamp"]),
            body: resolve_text(object, &["message"]).unwrap_or_default(),
            raw: object.clone(),
        }
    }

    pub fn author_name(&self) -> &str {
        self.author.as_deref().unwrap_or(UNKNOWN_REVIEWER)
    }
}

/// One review change, normalized from whatever shape the dump used.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub number: Option<u64>,
    pub subject: Option<String>,
    pub extra: Object,
    pub patch_sets: Vec<PatchSet>,
    pub messages: Vec<Message>,
    pub comments: IndexMap<String, Vec<Comment>>,
    pub dropped_comments: usize,
}

impl ChangeRecord {
    pub fn from_json(object: &Object) -> Self {
        let patch_sets = patch_sets(object);
        let messages: Vec<Message> = resolve_list(object, MESSAGE_KEYS)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(Message::from_json)
                    .collect()
            })
            .unwrap_or_default();

        let mut comments = CommentCollector::default();
        if let Some(container) = resolve_any(object, COMMENT_KEYS) {
            comments.collect(container, None);
        }
        // Without a messages list, file-less entries of a flat comment list
        // (the ssh query's change-level comments) are the change messages.
        let messages = if messages.is_empty() {
            comments.unanchored.iter().map(Message::from_json).collect()
        } else {
            comments.dropped += comments.unanchored.len();
            messages
        };
        // The ssh query nests inline comments under each patch set.
        for raw in resolve_list(object, PATCH_SET_KEYS).into_iter().flatten() {
            let Some(raw) = raw.as_object() else { continue };
            if let Some(container) = resolve_any(raw, COMMENT_KEYS) {
                comments.collect(container, resolve_u32(raw, NUMBER_KEYS));
            }
        }

        let extra = object
            .iter()
            .filter(|(key, _)| !is_structural_key(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            number: resolve_any(object, NUMBER_KEYS).and_then(|value| match value {
                Value::Number(number) => number.as_u64(),
                Value::String(text) => text.trim().parse().ok(),
                _ => None,
            }),
            subject: resolve_text(object, &["subject"]),
            extra,
            patch_sets,
            messages,
            comments: comments.files,
            dropped_comments: comments.dropped,
        }
    }

    pub fn patch_set(&self, filter: &str) -> Option<&PatchSet> {
        let filter = filter.trim();
        self.patch_sets
            .iter()
            .find(|ps| ps.number.to_string() == filter)
    }

    pub fn comment_count(&self) -> usize {
        self.comments.values().map(Vec::len).sum()
    }

    /// Files with comments whose path contains `filter`, in insertion order.
    pub fn files<'a>(
        &'a self,
        filter: Option<&'a str>,
    ) -> impl Iterator<Item = (&'a str, &'a [Comment])> + 'a {
        self.comments
            .iter()
            .filter(move |(path, _)| filter.is_none_or(|f| path.contains(f)))
            .map(|(path, comments)| (path.as_str(), comments.as_slice()))
    }

    pub fn messages_for<'a>(&'a self, filter: Option<&'a str>) -> impl Iterator<Item = &'a Message> {
        self.messages.iter().filter(move |m| match (filter, m.revision_number) {
            (None, _) => true,
            (Some(filter), Some(number)) => number.to_string() == filter.trim(),
            (Some(_), None) => false,
        })
    }
}

fn is_structural_key(key: &str) -> bool {
    PATCH_SET_KEYS
        .iter()
        .chain(MESSAGE_KEYS)
        .chain(COMMENT_KEYS)
        .any(|known| known.eq_ignore_ascii_case(key))
}

fn patch_sets(object: &Object) -> Vec<PatchSet> {
    let mut patch_sets: Vec<PatchSet> = Vec::new();
    for raw in resolve_list(object, PATCH_SET_KEYS).into_iter().flatten() {
        let Some(patch_set) = raw.as_object().and_then(PatchSet::from_json) else {
            continue;
        };
        if patch_sets.iter().any(|ps| ps.number == patch_set.number) {
            warn!(number = patch_set.number, "duplicate patch set ignored");
            continue;
        }
        patch_sets.push(patch_set);
    }
    patch_sets.sort_by_key(|ps| ps.number);
    patch_sets
}

#[derive(Default)]
struct CommentCollector {
    files: IndexMap<String, Vec<Comment>>,
    unanchored: Vec<Object>,
    dropped: usize,
}

impl CommentCollector {
    /// Accepts either `{path: [comment]}` or `[comment-with-file]`.
    fn collect(&mut self, container: &Value, patch_set: Option<u32>) {
        match container {
            Value::Object(by_file) => {
                for (file, items) in by_file {
                    let Some(items) = items.as_array() else {
                        continue;
                    };
                    for item in items {
                        self.push(Some(file), item, patch_set);
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    let file = item.as_object().and_then(|c| resolve_str(c, FILE_KEYS));
                    self.push(file, item, patch_set);
                }
            }
            _ => debug!("ignoring comments container that is neither a map nor a list"),
        }
    }

    fn push(&mut self, file: Option<&str>, item: &Value, patch_set: Option<u32>) {
        let comment = match (file, item.as_object()) {
            (Some(file), Some(object)) if !file.is_empty() => {
                Comment::from_json(file, object, patch_set)
            }
            (None, Some(object)) if patch_set.is_none() => {
                self.unanchored.push(object.clone());
                return;
            }
            _ => None,
        };
        match comment {
            Some(comment) => self
                .files
                .entry(comment.file.clone())
                .or_default()
                .push(comment),
            None => self.dropped += 1,
        }
    }
}

/// Raw value of an arbitrary comment field, for custom annotation fields.
pub fn raw_field(comment: &Comment, field: &str) -> Option<String> {
    match resolve(&comment.raw, field)? {
        Value::String(text) => Some(text.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn change(value: Value) -> ChangeRecord {
        ChangeRecord::from_json(value.as_object().unwrap())
    }

    #[test]
    fn test_mapping_shape() {
        let record = change(json!({
            "comments": {"a.py": [
                {"line": 3, "patchSet": 1, "reviewer": {"name": "Al"}, "message": "fix"}
            ]}
        }));
        let comments = &record.comments["a.py"];
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].line, 3);
        assert_eq!(comments[0].patch_set, Some(1));
        assert_eq!(comments[0].reviewer_name(), "Al");
        assert_eq!(comments[0].message, "fix");
    }

    #[test]
    fn test_flat_list_shape_matches_mapping_shape() {
        let flat = change(json!({
            "comments": [
                {"file": "b.rs", "line": 1, "patch_set": 2, "message": "x"},
                {"file": "a.rs", "line": 4, "patch_set": 2, "message": "y"},
                {"file": "b.rs", "line": 9, "message": "z"}
            ]
        }));
        let mapped = change(json!({
            "comments": {
                "b.rs": [
                    {"line": 1, "patch_set": 2, "message": "x"},
                    {"line": 9, "message": "z"}
                ],
                "a.rs": [{"line": 4, "patch_set": 2, "message": "y"}]
            }
        }));
        let files: Vec<_> = flat.comments.keys().cloned().collect();
        assert_eq!(files, vec!["b.rs", "a.rs"]);
        for (path, comments) in &flat.comments {
            let other = &mapped.comments[path];
            let lines: Vec<_> = comments.iter().map(|c| (c.line, c.patch_set)).collect();
            let other_lines: Vec<_> = other.iter().map(|c| (c.line, c.patch_set)).collect();
            assert_eq!(lines, other_lines);
        }
    }

    #[test]
    fn test_comment_without_line_is_dropped() {
        let record = change(json!({
            "comments": {"a.py": [
                {"message": "file level"},
                {"line": 2, "message": "kept"},
                {"line": 0, "message": "bogus"}
            ]}
        }));
        assert_eq!(record.comment_count(), 1);
        assert_eq!(record.dropped_comments, 2);
        assert_eq!(record.comments["a.py"][0].message, "kept");
    }

    #[test]
    fn test_patch_sets_sorted_and_deduplicated() {
        let record = change(json!({
            "patch_sets": [
                {"number": "3", "revision": "cccccccccc"},
                {"number": 1, "revision": "aaaaaaaaaa", "uploader": {"name": "Al"}, "createdOn": 1700000000},
                {"revision": "no-number"},
                {"number": 3, "revision": "duplicate"}
            ]
        }));
        let numbers: Vec<_> = record.patch_sets.iter().map(|ps| ps.number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(record.patch_sets[0].created.as_deref(), Some("1700000000"));
        assert_eq!(record.patch_sets[0].uploader.as_deref(), Some("Al"));
        assert_eq!(record.patch_sets[0].short_revision(), "aaaaaaa");
        assert_eq!(record.patch_set("3").unwrap().revision.as_deref(), Some("cccccccccc"));
        assert_eq!(record.patch_sets.last().unwrap().number, 3);
    }

    #[test]
    fn test_non_hex_revisions_are_ignored() {
        let record = change(json!({"patchSets": [
            {"number": 1, "revision": "--output=/tmp/x"},
            {"number": 2, "revision": "HEAD"},
            {"number": 3, "revision": "0123abcDEF"}
        ]}));
        let revisions: Vec<_> = record.patch_sets.iter().map(|ps| ps.revision.as_deref()).collect();
        assert_eq!(revisions, vec![None, None, Some("0123abcDEF")]);
        assert_eq!(record.patch_sets[0].short_revision(), "N/A");
    }

    #[test]
    fn test_comments_nested_in_patch_sets_inherit_number() {
        let record = change(json!({
            "number": 42,
            "patchSets": [{
                "number": 2,
                "revision": "abc",
                "comments": [
                    {"file": "x.c", "line": 5, "reviewer": {"name": "Cy"}, "message": "nit"}
                ]
            }]
        }));
        assert_eq!(record.number, Some(42));
        let comment = &record.comments["x.c"][0];
        assert_eq!(comment.patch_set, Some(2));
        assert_eq!(comment.reviewer_name(), "Cy");
    }

    #[test]
    fn test_extra_metadata_excludes_structural_keys() {
        let record = change(json!({
            "_number": 7,
            "subject": "Add thing",
            "owner": {"name": "Al"},
            "patchSets": [],
            "Messages": [],
            "comments": {}
        }));
        let keys: Vec<_> = record.extra.keys().cloned().collect();
        assert_eq!(keys, vec!["_number", "subject", "owner"]);
        assert_eq!(record.subject.as_deref(), Some("Add thing"));
    }

    #[test]
    fn test_messages() {
        let record = change(json!({
            "messages": [
                {"_revision_number": 1, "author": {"name": "Al"}, "date": "2024-01-01", "message": "Uploaded patch set 1."},
                {"_revision_number": 2, "message": "Uploaded patch set 2."}
            ]
        }));
        assert_eq!(record.messages.len(), 2);
        assert_eq!(record.messages[1].author_name(), UNKNOWN_REVIEWER);
        let second: Vec<_> = record.messages_for(Some("2")).collect();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].body, "Uploaded patch set 2.");
    }

    #[test]
    fn test_change_level_comments_become_messages() {
        let record = change(json!({
            "comments": [
                {"timestamp": 1700000000, "reviewer": {"name": "Al"}, "message": "Patch Set 1: Code-Review+1"},
                {"file": "a.c", "line": 2, "message": "inline"}
            ]
        }));
        assert_eq!(record.messages.len(), 1);
        assert_eq!(record.messages[0].author_name(), "Al");
        assert_eq!(record.messages[0].timestamp.as_deref(), Some("1700000000"));
        assert_eq!(record.comment_count(), 1);
        assert_eq!(record.dropped_comments, 0);
    }

    #[test]
    fn test_patch_set_filter_matching() {
        let record = change(json!({
            "comments": {"a": [
                {"line": 1, "patchSet": 1},
                {"line": 1}
            ]}
        }));
        let comments = &record.comments["a"];
        assert!(comments[0].matches_patch_set(Some("1")));
        assert!(!comments[0].matches_patch_set(Some("2")));
        assert!(comments[1].matches_patch_set(Some("2")));
        assert!(comments[0].matches_patch_set(None));
    }

    #[test]
    fn test_file_filter_is_substring() {
        let record = change(json!({
            "comments": {
                "src/main.rs": [{"line": 1}],
                "docs/guide.md": [{"line": 1}]
            }
        }));
        let files: Vec<_> = record.files(Some("src/")).map(|(path, _)| path).collect();
        assert_eq!(files, vec!["src/main.rs"]);
        assert_eq!(record.files(None).count(), 2);
    }
}
