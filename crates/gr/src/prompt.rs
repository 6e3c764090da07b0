use gr_core::{ChangeError, Comment, PatchSet};
use std::io::{self, BufRead, IsTerminal, Write};

/// Prompts only make sense when a person is on both ends.
pub fn is_interactive() -> bool {
    io::stdin().is_terminal() && io::stderr().is_terminal()
}

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Change(#[from] ChangeError),
    #[error("invalid selection {answer:?}")]
    InvalidChoice { answer: String },
    #[error("no terminal to choose from; pass --pick N")]
    NotInteractive,
}

const SUMMARY_WIDTH: usize = 50;

/// Lists `available` and reads a patch-set number; an empty answer picks the
/// latest.
pub fn choose_patch_set<'a>(
    available: &'a [PatchSet],
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<&'a PatchSet, PromptError> {
    let latest = available.last().ok_or(ChangeError::NoPatchSets)?;
    writeln!(out, "Available patch sets:")?;
    for ps in available {
        writeln!(
            out,
            "  {:>3}  {}  {}  {}",
            ps.number,
            ps.short_revision(),
            ps.uploader.as_deref().unwrap_or("Unknown"),
            ps.created.as_deref().unwrap_or_default(),
        )?;
    }
    write!(out, "Select patch set number (Enter for latest, {}): ", latest.number)?;
    out.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(latest);
    }
    available
        .iter()
        .find(|ps| ps.number.to_string() == answer)
        .ok_or_else(|| {
            ChangeError::UnknownPatchSet {
                requested: answer.to_string(),
            }
            .into()
        })
}

/// Numbers `comments` from 1 and reads a choice; an empty answer skips.
pub fn choose_comment<'a>(
    comments: &[&'a Comment],
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<Option<&'a Comment>, PromptError> {
    writeln!(out, "Inline comments:")?;
    for (index, comment) in comments.iter().enumerate() {
        let patch_set = comment
            .patch_set
            .map_or_else(|| "?".to_string(), |n| n.to_string());
        writeln!(
            out,
            "{:>3}: {} line {} by {} (patch set {patch_set}) - {}",
            index + 1,
            comment.file,
            comment.line,
            comment.reviewer_name(),
            abbreviate(&comment.message),
        )?;
    }
    write!(out, "Comment number to open (Enter to skip): ")?;
    out.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(None);
    }
    pick(comments, answer).map(Some)
}

/// 1-based lookup used by both the prompt and `--pick`.
pub fn pick<'a>(comments: &[&'a Comment], answer: &str) -> Result<&'a Comment, PromptError> {
    answer
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| comments.get(index).copied())
        .ok_or_else(|| PromptError::InvalidChoice {
            answer: answer.to_string(),
        })
}

fn abbreviate(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or_default();
    if first_line.chars().count() <= SUMMARY_WIDTH && !message.contains('\n') {
        return first_line.to_string();
    }
    let head: String = first_line.chars().take(SUMMARY_WIDTH).collect();
    format!("{head}...")
}

pub fn wait_for_enter(input: &mut impl BufRead, out: &mut impl Write) -> io::Result<()> {
    write!(out, "Press Enter to finish and clean up temporary files...")?;
    out.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gr_core::ChangeRecord;
    use serde_json::json;

    fn patch_sets() -> Vec<PatchSet> {
        let value = json!({"patchSets": [
            {"number": 1, "revision": "aaaaaaaaa", "uploader": {"name": "Al"}},
            {"number": 2, "revision": "bbbbbbbbb"}
        ]});
        ChangeRecord::from_json(value.as_object().unwrap()).patch_sets
    }

    #[test]
    fn test_enter_picks_latest() {
        let available = patch_sets();
        let mut out = Vec::new();
        let chosen = choose_patch_set(&available, &mut "\n".as_bytes(), &mut out).unwrap();
        assert_eq!(chosen.number, 2);
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("aaaaaaa"));
        assert!(shown.contains("Enter for latest, 2"));
    }

    #[test]
    fn test_explicit_choice() {
        let available = patch_sets();
        let chosen = choose_patch_set(&available, &mut " 1 \n".as_bytes(), &mut Vec::new()).unwrap();
        assert_eq!(chosen.number, 1);
    }

    #[test]
    fn test_unknown_choice() {
        let available = patch_sets();
        let err = choose_patch_set(&available, &mut "7\n".as_bytes(), &mut Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            PromptError::Change(ChangeError::UnknownPatchSet { .. })
        ));
    }

    fn comments() -> ChangeRecord {
        let value = json!({"comments": {
            "src/a.rs": [
                {"line": 3, "patchSet": 1, "reviewer": {"name": "Al"}, "message": "short"},
                {"line": 9, "patchSet": 2, "message": "x".repeat(60)}
            ],
            "b.py": [{"line": 1, "message": "two\nlines"}]
        }});
        ChangeRecord::from_json(value.as_object().unwrap())
    }

    #[test]
    fn test_choose_comment_lists_and_picks() {
        let change = comments();
        let all: Vec<&Comment> = change.comments.values().flatten().collect();
        let mut out = Vec::new();

        let chosen = choose_comment(&all, &mut "2\n".as_bytes(), &mut out)
            .unwrap()
            .unwrap();

        assert_eq!((chosen.file.as_str(), chosen.line), ("src/a.rs", 9));
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("  1: src/a.rs line 3 by Al (patch set 1) - short"));
        let long = format!(
            "  2: src/a.rs line 9 by Unknown (patch set 2) - {}...",
            "x".repeat(50)
        );
        assert!(shown.contains(&long));
        assert!(shown.contains("  3: b.py line 1 by Unknown (patch set ?) - two..."));
    }

    #[test]
    fn test_choose_comment_skip_and_invalid() {
        let change = comments();
        let all: Vec<&Comment> = change.comments.values().flatten().collect();
        assert!(choose_comment(&all, &mut "\n".as_bytes(), &mut Vec::new())
            .unwrap()
            .is_none());
        for answer in ["0\n", "4\n", "two\n"] {
            assert!(matches!(
                choose_comment(&all, &mut answer.as_bytes(), &mut Vec::new()),
                Err(PromptError::InvalidChoice { .. })
            ));
        }
    }

    #[test]
    fn test_wait_for_enter_accepts_eof() {
        let mut out = Vec::new();
        wait_for_enter(&mut "".as_bytes(), &mut out).unwrap();
        assert!(!out.is_empty());
    }
}
