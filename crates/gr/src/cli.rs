use crate::config::Style;
use crate::source::{CommitQuery, DumpSource};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use gr_core::{OrderPolicy, SelectionPolicy, SummaryFormat};
use gr_vcs::RetrievalMode;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "gr",
    version,
    about = "Gerrit review comments, annotated onto the code they were written against"
)]
pub struct Cli {
    /// Config file (default: .gr/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More logging; repeat for more detail
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print a summary of patch sets, messages and inline comments
    Summary(SummaryArgs),
    /// Open annotated historical files next to the working copy
    Diff(DiffArgs),
    /// List inline comments and open one in an editor at its line
    Goto(GotoArgs),
    /// Generate shell completions
    Completions { shell: clap_complete::Shell },
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct SourceSelect {
    /// Change dump to read; `-` reads stdin
    #[arg(long, value_name = "PATH")]
    pub json_file: Option<PathBuf>,

    /// Gerrit query run over ssh, e.g. `change:12345`
    #[arg(long, value_name = "QUERY")]
    pub query: Option<String>,

    /// Query the change named by this commit's Change-Id footer
    #[arg(long, value_name = "REV")]
    pub commit: Option<String>,
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    #[command(flatten)]
    pub select: SourceSelect,

    /// Save the selected change as JSON
    #[arg(long, value_name = "PATH")]
    pub save_change: Option<PathBuf>,

    /// Fail instead of picking the first change when the dump holds several
    #[arg(long)]
    pub strict: bool,

    /// How `--commit` names the change in the gerrit query
    #[arg(long, value_enum, value_name = "KIND", default_value_t = CommitQuery::ChangeId)]
    pub commit_query: CommitQuery,
}

impl SourceArgs {
    pub fn source(&self) -> DumpSource {
        let SourceSelect {
            json_file,
            query,
            commit,
        } = &self.select;
        match (json_file, query, commit) {
            (Some(path), _, _) => DumpSource::from_path(path.clone()),
            (None, Some(query), _) => DumpSource::Query(query.clone()),
            (None, None, Some(revision)) => DumpSource::Commit {
                revision: revision.clone(),
                query: self.commit_query,
            },
            (None, None, None) => DumpSource::Commit {
                revision: "HEAD".to_string(),
                query: self.commit_query,
            },
        }
    }

    pub fn policy(&self) -> SelectionPolicy {
        if self.strict {
            SelectionPolicy::Strict
        } else {
            SelectionPolicy::First
        }
    }
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Only this patch set's comments
    #[arg(long, value_name = "N")]
    pub patchset: Option<String>,

    /// Only files whose path contains this text
    #[arg(long = "file", value_name = "TEXT")]
    pub file: Option<String>,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Output formats: json, markdown, text
    #[arg(
        long = "format",
        value_name = "FORMAT",
        num_args = 1..,
        value_delimiter = ',',
        default_value = "text"
    )]
    pub formats: Vec<SummaryFormat>,

    /// Also write every requested format to this file
    #[arg(long, value_name = "PATH")]
    pub summary_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    #[value(alias = "local")]
    WorkingCopy,
    #[value(alias = "clone")]
    ClonedSnapshot,
    #[value(alias = "git")]
    VersionControlShow,
}

impl From<ModeArg> for RetrievalMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::WorkingCopy => RetrievalMode::WorkingCopy,
            ModeArg::ClonedSnapshot => RetrievalMode::ClonedSnapshot,
            ModeArg::VersionControlShow => RetrievalMode::VersionControlShow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrderArg {
    Oldest,
    Latest,
}

impl From<OrderArg> for OrderPolicy {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Oldest => OrderPolicy::Oldest,
            OrderArg::Latest => OrderPolicy::Latest,
        }
    }
}

#[derive(Debug, Args)]
pub struct DiffArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// How historical file text is produced
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Comment order on a line
    #[arg(long, value_enum)]
    pub order: Option<OrderArg>,

    /// Marker lines below the code, or one suffix on the line itself
    #[arg(long, value_enum)]
    pub style: Option<Style>,

    /// Prefix of each marker line
    #[arg(long, value_name = "TEXT", allow_hyphen_values = true)]
    pub marker: Option<String>,

    /// Text between the code and an inline annotation
    #[arg(long, value_name = "TEXT", allow_hyphen_values = true)]
    pub separator: Option<String>,

    /// Comma-separated comment fields, e.g. `patchset,reviewer,message`
    #[arg(long, value_name = "LIST")]
    pub fields: Option<String>,

    /// Diff viewer command; the two files are appended
    #[arg(long, value_name = "CMD")]
    pub diff_tool: Option<String>,

    /// Copy the annotated files to ./gr-preserved-<timestamp> before exiting
    #[arg(long)]
    pub no_cleanup: bool,

    /// Exit right after launching the viewers
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Debug, Args)]
pub struct GotoArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Open comment N of the list without prompting
    #[arg(long, value_name = "N")]
    pub pick: Option<String>,

    /// Editor command; `<path>:<line>` is appended
    #[arg(long, value_name = "CMD")]
    pub editor: Option<String>,
}
