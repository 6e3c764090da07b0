//! Jump from an inline comment to the line it is anchored to.

use crate::cli::GotoArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::prompt::{self, PromptError};
use crate::source::load_change;
use crate::ui;
use gr_core::{ChangeRecord, Comment};
use gr_vcs::{ExternalEditor, GitCli, confined};
use std::io;
use std::path::PathBuf;
use tracing::debug;

pub fn run(args: &GotoArgs, settings: &Settings, git: &GitCli) -> Result<(), CliError> {
    let command = args.editor.as_deref().unwrap_or(&settings.editor);
    let editor = ExternalEditor::parse(command).map_err(CliError::Editor)?;
    let change = load_change(
        &args.source.source(),
        args.source.policy(),
        args.source.save_change.as_deref(),
        &settings.ssh,
        git,
    )?;

    let comments = inline_comments(
        &change,
        args.filter.patchset.as_deref(),
        args.filter.file.as_deref(),
    );
    if comments.is_empty() {
        ui::note("no inline comments to open");
        return Ok(());
    }

    let comment = match args.pick.as_deref() {
        Some(answer) => prompt::pick(&comments, answer)?,
        None if prompt::is_interactive() => {
            let chosen =
                prompt::choose_comment(&comments, &mut io::stdin().lock(), &mut io::stderr())?;
            let Some(comment) = chosen else {
                debug!("no comment chosen");
                return Ok(());
            };
            comment
        }
        None => return Err(PromptError::NotInteractive.into()),
    };

    let path = location(git, comment)?;
    ui::note(format_args!("opening {}:{}", comment.file, comment.line));
    editor.open(&path, comment.line).map_err(CliError::Editor)
}

/// Comments surviving both filters, in file then thread order.
pub fn inline_comments<'a>(
    change: &'a ChangeRecord,
    patch_set: Option<&str>,
    file: Option<&'a str>,
) -> Vec<&'a Comment> {
    change
        .files(file)
        .flat_map(|(_, comments)| comments)
        .filter(|comment| comment.matches_patch_set(patch_set))
        .collect()
}

fn location(git: &GitCli, comment: &Comment) -> Result<PathBuf, CliError> {
    confined(git.repo(), &comment.file).ok_or_else(|| CliError::OutsideRepository {
        path: comment.file.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn change() -> ChangeRecord {
        let value = json!({"comments": {
            "src/a.rs": [
                {"line": 3, "patchSet": 1, "message": "old"},
                {"line": 9, "patchSet": 2, "message": "new"}
            ],
            "b.py": [{"line": 1, "message": "any"}],
            "/etc/passwd": [{"line": 1, "patchSet": 2, "message": "nope"}]
        }});
        ChangeRecord::from_json(value.as_object().unwrap())
    }

    fn lines(comments: &[&Comment]) -> Vec<(String, u32)> {
        comments.iter().map(|c| (c.file.clone(), c.line)).collect()
    }

    #[test]
    fn test_filters_apply() {
        let record = change();
        assert_eq!(inline_comments(&record, None, None).len(), 4);
        assert_eq!(
            lines(&inline_comments(&record, Some("2"), Some("src/"))),
            vec![("src/a.rs".to_string(), 9)]
        );
        assert_eq!(
            lines(&inline_comments(&record, Some("1"), None)),
            vec![("src/a.rs".to_string(), 3), ("b.py".to_string(), 1)]
        );
    }

    #[test]
    fn test_location_is_inside_repository() {
        let record = change();
        let git = GitCli::new("/work");
        let all = inline_comments(&record, None, None);
        assert_eq!(
            location(&git, all[0]).unwrap(),
            PathBuf::from("/work/src/a.rs")
        );
        assert!(matches!(
            location(&git, all[3]),
            Err(CliError::OutsideRepository { .. })
        ));
    }

    #[test]
    fn test_pick_opens_editor_at_line() {
        use crate::cli::{Cli, Command};
        use clap::Parser;

        let work = tempfile::tempdir().unwrap();
        let dump = work.path().join("dump.json");
        let value = json!({"comments": {"src/a.rs": [
            {"line": 3, "message": "x"},
            {"line": 7, "message": "y"}
        ]}});
        std::fs::write(&dump, value.to_string()).unwrap();
        let record = work.path().join("opened");
        let editor = format!(r#"sh -c 'printf %s "$0" > {}'"#, record.display());

        let cli = Cli::try_parse_from([
            "gr",
            "goto",
            "--json-file",
            dump.to_str().unwrap(),
            "--pick",
            "2",
            "--editor",
            &editor,
        ])
        .unwrap();
        let Command::Goto(args) = cli.command else {
            panic!("expected goto");
        };
        run(&args, &Settings::default(), &GitCli::new(work.path())).unwrap();

        assert_eq!(
            std::fs::read_to_string(&record).unwrap(),
            format!("{}:7", work.path().join("src/a.rs").display())
        );
    }
}
