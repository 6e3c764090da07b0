use crate::error::SummaryError;
use crate::model::{ChangeRecord, Comment, Message, PatchSet};
use indexmap::IndexMap;
use serde_json::{Map, Value, json};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryFormat {
    Json,
    Markdown,
    Text,
}

impl FromStr for SummaryFormat {
    type Err = SummaryError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(SummaryFormat::Json),
            "markdown" | "md" => Ok(SummaryFormat::Markdown),
            "text" | "txt" => Ok(SummaryFormat::Text),
            _ => Err(SummaryError::UnknownFormat {
                name: name.to_string(),
            }),
        }
    }
}

impl fmt::Display for SummaryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryFormat::Json => f.write_str("json"),
            SummaryFormat::Markdown => f.write_str("markdown"),
            SummaryFormat::Text => f.write_str("text"),
        }
    }
}

/// Patch-set and file filters shared by every format.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryFilter<'a> {
    pub patch_set: Option<&'a str>,
    pub file: Option<&'a str>,
}

struct View<'a> {
    change: &'a ChangeRecord,
    patch_sets: Vec<&'a PatchSet>,
    messages: Vec<&'a Message>,
    files: IndexMap<&'a str, Vec<&'a Comment>>,
}

impl<'a> View<'a> {
    fn new(change: &'a ChangeRecord, filter: SummaryFilter<'a>) -> Self {
        let patch_sets = change
            .patch_sets
            .iter()
            .filter(|ps| filter.patch_set.is_none_or(|f| ps.number.to_string() == f.trim()))
            .collect();
        let files = change
            .files(filter.file)
            .map(|(path, comments)| {
                let kept: Vec<&Comment> = comments
                    .iter()
                    .filter(|c| c.matches_patch_set(filter.patch_set))
                    .collect();
                (path, kept)
            })
            .filter(|(_, kept)| !kept.is_empty())
            .collect();
        Self {
            change,
            patch_sets,
            messages: change.messages_for(filter.patch_set).collect(),
            files,
        }
    }

    fn title(&self) -> String {
        let number = self
            .change
            .number
            .map_or_else(|| "Unknown".to_string(), |n| n.to_string());
        let subject = self.change.subject.as_deref().unwrap_or("No subject");
        format!("Change {number}: {subject}")
    }

    /// Comments of one file grouped by patch set, first appearance first.
    fn grouped(comments: &[&'a Comment]) -> IndexMap<String, Vec<&'a Comment>> {
        let mut groups: IndexMap<String, Vec<&Comment>> = IndexMap::new();
        for comment in comments {
            let key = comment
                .patch_set
                .map_or_else(|| "Unknown".to_string(), |n| n.to_string());
            groups.entry(key).or_default().push(*comment);
        }
        groups
    }
}

pub fn render_summary(
    change: &ChangeRecord,
    format: SummaryFormat,
    filter: SummaryFilter<'_>,
) -> Result<String, SummaryError> {
    let view = View::new(change, filter);
    match format {
        SummaryFormat::Json => render_json(&view),
        SummaryFormat::Markdown => Ok(render_markdown(&view)),
        SummaryFormat::Text => Ok(render_text(&view)),
    }
}

fn render_json(view: &View<'_>) -> Result<String, SummaryError> {
    let comments: Map<String, Value> = view
        .files
        .iter()
        .map(|(path, comments)| {
            let raw = comments.iter().map(|c| Value::Object(c.raw.clone())).collect();
            ((*path).to_string(), Value::Array(raw))
        })
        .collect();
    let summary = json!({
        "change": view.change.extra,
        "patchSets": view.patch_sets.iter().map(|ps| &ps.raw).collect::<Vec<_>>(),
        "messages": view.messages.iter().map(|m| &m.raw).collect::<Vec<_>>(),
        "comments": comments,
    });
    serde_json::to_string_pretty(&summary).map_err(|err| SummaryError::Encode {
        message: err.to_string(),
    })
}

fn render_markdown(view: &View<'_>) -> String {
    let mut lines = vec![format!("# {}", view.title()), String::new()];

    lines.push("## Patch Sets".to_string());
    if view.patch_sets.is_empty() {
        lines.push("None".to_string());
    }
    for ps in &view.patch_sets {
        lines.push(format!(
            "- **Patchset {}**: revision `{}`, uploader: {}, created: {}",
            ps.number,
            ps.short_revision(),
            ps.uploader.as_deref().unwrap_or("Unknown"),
            ps.created.as_deref().unwrap_or_default(),
        ));
    }

    lines.push(String::new());
    lines.push("## Change Messages".to_string());
    if view.messages.is_empty() {
        lines.push("None".to_string());
    }
    for message in &view.messages {
        lines.push(format!("- {}", message_line(message, "**")));
    }

    lines.push(String::new());
    lines.push("## Inline Comments by File".to_string());
    if view.files.is_empty() {
        lines.push("None".to_string());
    }
    for (path, comments) in &view.files {
        lines.push(format!("### File: {path}"));
        for (patch_set, group) in View::grouped(comments) {
            lines.push(format!("- **Patchset {patch_set}**:"));
            for comment in group {
                lines.push(format!("    - {}", comment_line(comment)));
            }
        }
    }
    lines.join("\n")
}

fn render_text(view: &View<'_>) -> String {
    let mut lines = vec![view.title(), String::new()];

    lines.push("Patch Sets:".to_string());
    if view.patch_sets.is_empty() {
        lines.push("  None".to_string());
    }
    for ps in &view.patch_sets {
        lines.push(format!(
            "  Patchset {}: revision {}, uploader: {}, created: {}",
            ps.number,
            ps.short_revision(),
            ps.uploader.as_deref().unwrap_or("Unknown"),
            ps.created.as_deref().unwrap_or_default(),
        ));
    }

    lines.push(String::new());
    lines.push("Change Messages:".to_string());
    if view.messages.is_empty() {
        lines.push("  None".to_string());
    }
    for message in &view.messages {
        lines.push(format!("  {}", message_line(message, "")));
    }

    lines.push(String::new());
    lines.push("Inline Comments by File:".to_string());
    if view.files.is_empty() {
        lines.push("  None".to_string());
    }
    for (path, comments) in &view.files {
        lines.push(format!("File: {path}"));
        for (patch_set, group) in View::grouped(comments) {
            lines.push(format!("  Patchset {patch_set}:"));
            for comment in group {
                lines.push(format!("    {}", comment_line(comment)));
            }
        }
    }
    lines.join("\n")
}

fn message_line(message: &Message, emphasis: &str) -> String {
    let revision = message
        .revision_number
        .map_or_else(|| "N/A".to_string(), |n| n.to_string());
    format!(
        "{emphasis}Patchset {revision}{emphasis} by {} on {}: {}",
        message.author_name(),
        message.timestamp.as_deref().unwrap_or_default(),
        message.body,
    )
}

fn comment_line(comment: &Comment) -> String {
    format!(
        "Line {}: {}: {}",
        comment.line,
        comment.reviewer_name(),
        comment.message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> ChangeRecord {
        let value = json!({
            "_number": 1234,
            "subject": "Add parser",
            "owner": {"name": "Al"},
            "patchSets": [
                {"number": 2, "revision": "bbbbbbbbbbbb", "uploader": {"name": "Bo"}, "created": "2024-02-02"},
                {"number": 1, "revision": "aaaaaaaaaaaa", "uploader": {"name": "Al"}, "created": "2024-01-01"}
            ],
            "messages": [
                {"_revision_number": 1, "author": {"name": "Bo"}, "date": "2024-01-02", "message": "Looks close"},
                {"_revision_number": 2, "author": {"name": "Cy"}, "date": "2024-02-03", "message": "LGTM"}
            ],
            "comments": {
                "src/lib.rs": [
                    {"line": 3, "patchSet": 1, "reviewer": {"name": "Bo"}, "message": "rename"},
                    {"line": 7, "patchSet": 2, "reviewer": {"name": "Cy"}, "message": "nit"}
                ],
                "README.md": [
                    {"line": 1, "patchSet": 1, "reviewer": {"name": "Bo"}, "message": "typo"}
                ]
            }
        });
        ChangeRecord::from_json(value.as_object().unwrap())
    }

    #[test]
    fn test_format_names() {
        assert_eq!("md".parse::<SummaryFormat>().unwrap(), SummaryFormat::Markdown);
        assert_eq!("JSON".parse::<SummaryFormat>().unwrap(), SummaryFormat::Json);
        assert!(matches!(
            "yaml".parse::<SummaryFormat>(),
            Err(SummaryError::UnknownFormat { .. })
        ));
    }

    #[test]
    fn test_markdown() {
        let rendered =
            render_summary(&sample(), SummaryFormat::Markdown, SummaryFilter::default()).unwrap();
        let expected = "\
# Change 1234: Add parser

## Patch Sets
- **Patchset 1**: revision `aaaaaaa`, uploader: Al, created: 2024-01-01
- **Patchset 2**: revision `bbbbbbb`, uploader: Bo, created: 2024-02-02

## Change Messages
- **Patchset 1** by Bo on 2024-01-02: Looks close
- **Patchset 2** by Cy on 2024-02-03: LGTM

## Inline Comments by File
### File: src/lib.rs
- **Patchset 1**:
    - Line 3: Bo: rename
- **Patchset 2**:
    - Line 7: Cy: nit
### File: README.md
- **Patchset 1**:
    - Line 1: Bo: typo";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_text_with_filters() {
        let filter = SummaryFilter {
            patch_set: Some("2"),
            file: Some("src/"),
        };
        let rendered = render_summary(&sample(), SummaryFormat::Text, filter).unwrap();
        let expected = "\
Change 1234: Add parser

Patch Sets:
  Patchset 2: revision bbbbbbb, uploader: Bo, created: 2024-02-02

Change Messages:
  Patchset 2 by Cy on 2024-02-03: LGTM

Inline Comments by File:
File: src/lib.rs
  Patchset 2:
    Line 7: Cy: nit";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_empty_sections() {
        let change = ChangeRecord::from_json(json!({"subject": "Empty"}).as_object().unwrap());
        let rendered =
            render_summary(&change, SummaryFormat::Text, SummaryFilter::default()).unwrap();
        assert_eq!(
            rendered,
            "Change Unknown: Empty\n\nPatch Sets:\n  None\n\nChange Messages:\n  None\n\nInline Comments by File:\n  None"
        );
    }

    #[test]
    fn test_json_keeps_raw_values() {
        let filter = SummaryFilter {
            patch_set: Some("1"),
            file: None,
        };
        let rendered = render_summary(&sample(), SummaryFormat::Json, filter).unwrap();
        let parsed: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["change"]["_number"], json!(1234));
        assert_eq!(parsed["change"]["owner"], json!({"name": "Al"}));
        assert!(parsed["change"].get("patchSets").is_none());
        assert_eq!(parsed["patchSets"].as_array().unwrap().len(), 1);
        assert_eq!(parsed["patchSets"][0]["revision"], json!("aaaaaaaaaaaa"));
        assert_eq!(parsed["messages"].as_array().unwrap().len(), 1);
        let files: Vec<_> = parsed["comments"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(files, vec!["src/lib.rs", "README.md"]);
        assert_eq!(parsed["comments"]["src/lib.rs"][0]["message"], json!("rename"));
    }
}
