use crate::backend::LaunchError;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;
use tracing::debug;

pub const DEFAULT_DIFF_TOOL: &str = "code --diff";
pub const DEFAULT_EDITOR: &str = "code --goto";

/// Shows two files side by side.
pub trait DiffViewer {
    fn show(&self, annotated: &Path, current: &Path) -> Result<(), LaunchError>;
}

/// An external program invoked as `<argv...> <annotated> <current>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalDiffTool {
    program: String,
    args: Vec<String>,
}

impl ExternalDiffTool {
    pub fn parse(command: &str) -> Result<Self, LaunchError> {
        let (program, args) = split_command(command)?;
        Ok(Self { program, args })
    }
}

impl DiffViewer for ExternalDiffTool {
    fn show(&self, annotated: &Path, current: &Path) -> Result<(), LaunchError> {
        debug!(
            program = %self.program,
            annotated = %annotated.display(),
            current = %current.display(),
            "launching diff tool"
        );
        launch(
            &self.program,
            &self.args,
            [annotated.as_os_str(), current.as_os_str()],
        )
    }
}

/// An editor invoked as `<argv...> <path>:<line>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalEditor {
    program: String,
    args: Vec<String>,
}

impl ExternalEditor {
    pub fn parse(command: &str) -> Result<Self, LaunchError> {
        let (program, args) = split_command(command)?;
        Ok(Self { program, args })
    }

    pub fn open(&self, path: &Path, line: u32) -> Result<(), LaunchError> {
        let location = format!("{}:{line}", path.display());
        debug!(program = %self.program, %location, "launching editor");
        launch(&self.program, &self.args, [OsStr::new(&location)])
    }
}

fn split_command(command: &str) -> Result<(String, Vec<String>), LaunchError> {
    let argv = shell_words::split(command).map_err(|err| LaunchError::InvalidCommand {
        reason: err.to_string(),
    })?;
    let (program, args) = argv.split_first().ok_or(LaunchError::EmptyCommand)?;
    Ok((program.clone(), args.to_vec()))
}

fn launch<'a>(
    program: &str,
    args: &[String],
    extra: impl IntoIterator<Item = &'a OsStr>,
) -> Result<(), LaunchError> {
    let status = Command::new(program)
        .args(args)
        .args(extra)
        .status()
        .map_err(|err| LaunchError::Spawn {
            program: program.to_string(),
            reason: err.to_string(),
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(LaunchError::Exited {
            program: program.to_string(),
            status: status.to_string(),
        })
    }
}
