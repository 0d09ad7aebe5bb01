use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::DiffMode;

const CONFIG_DIRECTORY: &str = "diffman";
const CONFIG_FILE: &str = "config.toml";

/// User settings read from `<config dir>/diffman/config.toml`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub(crate) struct Config {
    /// Diff mode used at startup.
    pub(crate) mode: DiffMode,
    /// Show comment bodies under their lines, not only gutter markers.
    pub(crate) inline_comments: bool,
    /// Lines kept above the cursor when jumping to a comment.
    pub(crate) jump_padding: usize,
    pub(crate) export_title: String,
    pub(crate) file_pane_width: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: DiffMode::All,
            inline_comments: true,
            jump_padding: 10,
            export_title: "Review comments:".to_string(),
            file_pane_width: 40,
        }
    }
}

impl Config {
    pub(crate) fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIRECTORY).join(CONFIG_FILE))
    }

    /// Loads the file at `path`, falling back to defaults when it is missing
    /// or blank.
    pub(crate) fn load_from(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("failed to read config {}", path.display()));
            }
        };

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub(crate) fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match explicit_path {
            Some(path) => Self::load_from(path),
            None => match Self::default_path() {
                Some(path) => Self::load_from(&path),
                None => Ok(Self::default()),
            },
        }
    }

    pub(crate) fn with_overrides(mut self, mode: Option<DiffMode>) -> Self {
        if let Some(mode) = mode {
            self.mode = mode;
        }
        self
    }
}
