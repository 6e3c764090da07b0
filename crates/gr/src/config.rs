//! Layered settings: built-in defaults, then `.gr/config.toml` (or
//! `--config`), then `GR_*` environment variables. Command-line flags are
//! applied last by each subcommand.

use crate::error::ConfigError;
use gr_core::annotate::{DEFAULT_MARKER, DEFAULT_SEPARATOR};
use gr_core::{CommentField, OrderPolicy, RenderMode};
use gr_vcs::RetrievalMode;
use gr_vcs::viewer::{DEFAULT_DIFF_TOOL, DEFAULT_EDITOR};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CONFIG_PATH: &str = ".gr/config.toml";
pub const DEFAULT_SSH_PORT: u16 = 29418;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Style {
    #[default]
    Marker,
    Inline,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    diff_tool: Option<String>,
    editor: Option<String>,
    mode: Option<RetrievalMode>,
    order: Option<OrderPolicy>,
    style: Option<Style>,
    marker: Option<String>,
    separator: Option<String>,
    fields: Option<String>,
    git: Option<String>,
    ssh: SshFile,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SshFile {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshSettings {
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
}

impl SshSettings {
    /// `user@host`, or just the host when no user is set.
    pub fn destination(&self) -> Option<String> {
        let host = self.host.as_deref()?;
        Some(match &self.user {
            Some(user) => format!("{user}@{host}"),
            None => host.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub diff_tool: String,
    pub editor: String,
    pub mode: RetrievalMode,
    pub order: OrderPolicy,
    pub style: Style,
    pub marker: String,
    pub separator: String,
    pub fields: Vec<CommentField>,
    pub git: String,
    pub ssh: SshSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            diff_tool: DEFAULT_DIFF_TOOL.to_string(),
            editor: DEFAULT_EDITOR.to_string(),
            mode: RetrievalMode::default(),
            order: OrderPolicy::default(),
            style: Style::default(),
            marker: DEFAULT_MARKER.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
            fields: CommentField::defaults(),
            git: "git".to_string(),
            ssh: SshSettings {
                host: None,
                port: DEFAULT_SSH_PORT,
                user: None,
            },
        }
    }
}

impl Settings {
    /// Loads the config file and environment on top of the defaults.
    ///
    /// An explicit path must exist; the default path is optional.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) => read_config(path)?,
            None => {
                let path = cwd.join(DEFAULT_CONFIG_PATH);
                match read_config(&path) {
                    Err(ConfigError::Read { .. }) if !path.exists() => {
                        debug!(path = %path.display(), "no config file");
                        ConfigFile::default()
                    }
                    other => other?,
                }
            }
        };
        let mut settings = Settings::default();
        settings.apply_file(file);
        settings.apply_env(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        let ConfigFile {
            diff_tool,
            editor,
            mode,
            order,
            style,
            marker,
            separator,
            fields,
            git,
            ssh,
        } = file;
        set(&mut self.diff_tool, diff_tool);
        set(&mut self.editor, editor);
        set(&mut self.mode, mode);
        set(&mut self.order, order);
        set(&mut self.style, style);
        set(&mut self.marker, marker);
        set(&mut self.separator, separator);
        set(&mut self.git, git);
        if let Some(fields) = fields {
            self.set_fields(&fields);
        }
        self.ssh.host = ssh.host.or(self.ssh.host.take());
        set(&mut self.ssh.port, ssh.port);
        self.ssh.user = ssh.user.or(self.ssh.user.take());
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(host) = lookup("GR_SSH_HOST") {
            self.ssh.host = Some(host);
        }
        if let Some(user) = lookup("GR_SSH_USER") {
            self.ssh.user = Some(user);
        }
        if let Some(port) = lookup("GR_SSH_PORT") {
            self.ssh.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: "GR_SSH_PORT",
                value: port,
            })?;
        }
        if let Some(tool) = lookup("GR_DIFF_TOOL") {
            self.diff_tool = tool;
        }
        if let Some(editor) = lookup("GR_EDITOR") {
            self.editor = editor;
        }
        Ok(())
    }

    /// Replaces the annotation fields; an empty list keeps the current ones.
    pub fn set_fields(&mut self, list: &str) {
        let fields = CommentField::parse_list(list);
        if !fields.is_empty() {
            self.fields = fields;
        }
    }

    pub fn render_mode(&self) -> RenderMode {
        match self.style {
            Style::Marker => RenderMode::MarkerLine {
                marker: self.marker.clone(),
            },
            Style::Inline => RenderMode::InlineSuffix {
                separator: self.separator.clone(),
            },
        }
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn read_config(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = fs::read_to_string(path).map_err(|err| ConfigError::Read {
        path: PathBuf::from(path),
        reason: err.to_string(),
    })?;
    toml::from_str(&content).map_err(|err| ConfigError::Parse {
        path: PathBuf::from(path),
        reason: err.to_string(),
    })
}
