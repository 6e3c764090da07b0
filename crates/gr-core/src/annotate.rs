//! Merges line-anchored review comments onto file text.
//!
//! Original lines keep their 1-based identity no matter how many comments
//! attach to them: marker-line rendering only inserts extra lines, and
//! inline-suffix rendering only extends existing ones.

use crate::model::{Comment, raw_field};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_MARKER: &str = "  >>> ";
pub const DEFAULT_SEPARATOR: &str = "    // ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderPolicy {
    /// Ascending patch-set number.
    #[default]
    Oldest,
    /// Descending patch-set number.
    Latest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentField {
    PatchSet,
    Reviewer,
    Message,
    Timestamp,
    /// Any other key of the raw comment object.
    Raw(String),
}

impl CommentField {
    pub fn defaults() -> Vec<CommentField> {
        vec![
            CommentField::PatchSet,
            CommentField::Reviewer,
            CommentField::Message,
        ]
    }

    /// Parses a comma-separated field list such as `patchset,reviewer,message`.
    pub fn parse_list(list: &str) -> Vec<CommentField> {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .filter_map(|name| name.parse().ok())
            .collect()
    }
}

impl FromStr for CommentField {
    type Err = std::convert::Infallible;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Ok(match name.to_ascii_lowercase().as_str() {
            "patchset" | "patch_set" | "patch-set" => CommentField::PatchSet,
            "reviewer" | "author" => CommentField::Reviewer,
            "message" => CommentField::Message,
            "timestamp" => CommentField::Timestamp,
            _ => CommentField::Raw(name.to_string()),
        })
    }
}

impl fmt::Display for CommentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommentField::PatchSet => f.write_str("patchset"),
            CommentField::Reviewer => f.write_str("reviewer"),
            CommentField::Message => f.write_str("message"),
            CommentField::Timestamp => f.write_str("timestamp"),
            CommentField::Raw(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderMode {
    /// One extra line per comment directly below its source line.
    MarkerLine { marker: String },
    /// All comments appended to the end of their source line.
    InlineSuffix { separator: String },
}

impl Default for RenderMode {
    fn default() -> Self {
        RenderMode::MarkerLine {
            marker: DEFAULT_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedLine {
    pub number: usize,
    pub text: String,
    pub annotations: Vec<String>,
}

/// A comment whose target line lies past the end of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overflow {
    pub line: u32,
    pub annotation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedDocument {
    pub lines: Vec<AnnotatedLine>,
    pub overflow: Vec<Overflow>,
    line_ending: &'static str,
}

impl AnnotatedDocument {
    pub fn annotation_count(&self) -> usize {
        self.lines.iter().map(|l| l.annotations.len()).sum::<usize>() + self.overflow.len()
    }

    pub fn render(&self, mode: &RenderMode) -> String {
        let mut out: Vec<String> = Vec::with_capacity(self.lines.len());
        match mode {
            RenderMode::MarkerLine { marker } => {
                for line in &self.lines {
                    out.push(line.text.clone());
                    out.extend(line.annotations.iter().map(|a| format!("{marker}{a}")));
                }
                out.extend(
                    self.overflow
                        .iter()
                        .map(|o| format!("{marker}{}", o.annotation)),
                );
            }
            RenderMode::InlineSuffix { separator } => {
                for line in &self.lines {
                    if line.annotations.is_empty() {
                        out.push(line.text.clone());
                    } else {
                        out.push(format!(
                            "{}{separator}{}",
                            line.text,
                            line.annotations.join(" ")
                        ));
                    }
                }
                for overflow in &self.overflow {
                    warn!(
                        line = overflow.line,
                        lines = self.lines.len(),
                        "comment targets a line past the end of the file; skipped"
                    );
                }
            }
        }
        let mut rendered = out.join(self.line_ending);
        rendered.push_str(self.line_ending);
        rendered
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotator {
    fields: Vec<CommentField>,
    order: OrderPolicy,
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new(CommentField::defaults(), OrderPolicy::Oldest)
    }
}

impl Annotator {
    pub fn new(fields: Vec<CommentField>, order: OrderPolicy) -> Self {
        let fields = if fields.is_empty() {
            CommentField::defaults()
        } else {
            fields
        };
        Self { fields, order }
    }

    pub fn annotate(
        &self,
        text: &str,
        comments: &[Comment],
        patch_set_filter: Option<&str>,
    ) -> AnnotatedDocument {
        let (lines, line_ending) = split_lines(text);

        let mut selected: Vec<&Comment> = comments
            .iter()
            .filter(|c| c.matches_patch_set(patch_set_filter))
            .collect();
        // Both sorts are stable, so ties keep input order.
        match self.order {
            OrderPolicy::Oldest => selected.sort_by_key(|c| c.order_key()),
            OrderPolicy::Latest => selected.sort_by_key(|c| Reverse(c.order_key())),
        }

        let mut by_line: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for comment in selected {
            by_line
                .entry(comment.line)
                .or_default()
                .push(self.describe(comment));
        }

        let lines: Vec<AnnotatedLine> = lines
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let number = index + 1;
                let annotations = u32::try_from(number)
                    .ok()
                    .and_then(|n| by_line.remove(&n))
                    .unwrap_or_default();
                AnnotatedLine {
                    number,
                    text: text.to_string(),
                    annotations,
                }
            })
            .collect();

        let overflow = by_line
            .into_iter()
            .flat_map(|(line, annotations)| {
                annotations
                    .into_iter()
                    .map(move |annotation| Overflow { line, annotation })
            })
            .collect();

        AnnotatedDocument {
            lines,
            overflow,
            line_ending,
        }
    }

    /// Renders one comment as `[Patchset N] reviewer: message` (for the
    /// default fields).
    pub fn describe(&self, comment: &Comment) -> String {
        let last = self.fields.len().saturating_sub(1);
        let parts: Vec<String> = self
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| match field {
                CommentField::PatchSet => match comment.patch_set {
                    Some(number) => format!("[Patchset {number}]"),
                    None => "[Patchset Unknown]".to_string(),
                },
                CommentField::Reviewer if index < last => format!("{}:", comment.reviewer_name()),
                CommentField::Reviewer => comment.reviewer_name().to_string(),
                CommentField::Message => single_line(&comment.message),
                CommentField::Timestamp => comment.timestamp.clone().unwrap_or_default(),
                CommentField::Raw(name) => raw_field(comment, name)
                    .map(|value| single_line(&value))
                    .unwrap_or_default(),
            })
            .collect();
        parts.join(" ")
    }
}

/// Splits on `\n`, dropping one trailing terminator and any `\r`.
fn split_lines(text: &str) -> (Vec<&str>, &'static str) {
    let line_ending = if text.contains("\r\n") { "\r\n" } else { "\n" };
    if text.is_empty() {
        return (Vec::new(), line_ending);
    }
    let body = text.strip_suffix('\n').unwrap_or(text);
    let lines = body
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    (lines, line_ending)
}

// Multi-line messages would otherwise break the one-annotation-per-line rule.
fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
