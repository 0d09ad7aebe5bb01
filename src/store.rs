use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::debug;

use crate::comments::{Comment, sort_comments};

const STORE_DIRECTORY: &str = ".diffman";
const STORE_FILE: &str = "comments.json";

/// Comment persistence under the repository's git directory.
pub(crate) struct CommentStore {
    path: PathBuf,
}

impl CommentStore {
    pub(crate) fn new(git_dir: &Path) -> Self {
        Self {
            path: git_dir.join(STORE_DIRECTORY).join(STORE_FILE),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn load(&self) -> Result<Vec<Comment>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("failed to read comments {}", self.path.display()));
            }
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let comments: Vec<Comment> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse comments {}", self.path.display()))?;
        debug!(count = comments.len(), path = %self.path.display(), "loaded comments");
        Ok(comments)
    }

    pub(crate) fn save(&self, comments: &[Comment]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }

        let mut sorted = comments.to_vec();
        sort_comments(&mut sorted);
        let mut output =
            serde_json::to_string_pretty(&sorted).context("failed to serialize comments")?;
        output.push('\n');

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, output)
            .with_context(|| format!("failed to write comments {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.path)
            .with_context(|| format!("failed to replace comments {}", self.path.display()))?;

        debug!(count = sorted.len(), path = %self.path.display(), "saved comments");
        Ok(())
    }
}
