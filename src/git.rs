use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::model::{DiffMode, FileItem};

const NO_INDEX_DIFFERENCES_FOUND: i32 = 1;

/// Raw unified diff text for one path.
pub trait DiffSource {
    fn diff(&self, path: &str, mode: DiffMode) -> Result<String>;
}

pub trait StatusSource {
    fn changed_files(&self) -> Result<Vec<FileItem>>;
}

fn format_command(args: &[OsString]) -> String {
    format!(
        "git {}",
        args.iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    )
}

/// Runs git and returns stdout when the exit code is zero or one of
/// `accepted_codes`.
fn run_git_accepting<I, S>(args: I, cwd: &Path, accepted_codes: &[i32]) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args_vec: Vec<OsString> = args
        .into_iter()
        .map(|arg| arg.as_ref().to_os_string())
        .collect();

    let output = Command::new("git")
        .args(&args_vec)
        .current_dir(cwd)
        .output()
        .with_context(|| format!("failed to run git in {}", cwd.display()))?;

    let accepted = output.status.success()
        || output
            .status
            .code()
            .is_some_and(|code| accepted_codes.contains(&code));
    if !accepted {
        let stderr_text = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let details = if stderr_text.is_empty() {
            format!("exit status {}", output.status)
        } else {
            stderr_text
        };

        bail!("{} failed: {details}", format_command(&args_vec));
    }

    debug!(command = %format_command(&args_vec), bytes = output.stdout.len(), "git finished");
    Ok(output.stdout)
}

pub(crate) fn run_git_text<I, S>(args: I, cwd: &Path) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = run_git_accepting(args, cwd, &[])?;
    Ok(String::from_utf8_lossy(&output).into_owned())
}

pub(crate) fn repository_root(cwd: &Path) -> Result<PathBuf> {
    let output = run_git_text(["rev-parse", "--show-toplevel"], cwd)?;
    Ok(PathBuf::from(output.trim()))
}

pub(crate) fn git_dir(repo_root: &Path) -> Result<PathBuf> {
    let git_dir = run_git_text(["rev-parse", "--git-dir"], repo_root)?;
    let parsed = PathBuf::from(git_dir.trim());
    if parsed.is_absolute() {
        Ok(parsed)
    } else {
        Ok(repo_root.join(parsed))
    }
}

fn diff_args(mode: DiffMode, path: &str) -> Vec<&str> {
    match mode {
        DiffMode::All => vec!["diff", "HEAD", "-U3", "--", path],
        DiffMode::Unstaged => vec!["diff", "-U3", "--", path],
        DiffMode::Staged => vec!["diff", "--cached", "-U3", "--", path],
    }
}

#[derive(Clone, Debug)]
pub(crate) struct GitDiffSource {
    repo_root: PathBuf,
}

impl GitDiffSource {
    pub(crate) fn new(repo_root: PathBuf) -> Self {
        Self { repo_root }
    }
}

impl DiffSource for GitDiffSource {
    fn diff(&self, path: &str, mode: DiffMode) -> Result<String> {
        let output = run_git_text(diff_args(mode, path), &self.repo_root)?;
        if !output.trim().is_empty() || mode == DiffMode::Staged {
            return Ok(output);
        }

        // Untracked files only show up when diffed against /dev/null.
        match run_git_accepting(
            ["diff", "--no-index", "--", "/dev/null", path],
            &self.repo_root,
            &[NO_INDEX_DIFFERENCES_FOUND],
        ) {
            Ok(raw) => Ok(String::from_utf8_lossy(&raw).into_owned()),
            Err(error) => {
                debug!(path, %error, "no-index diff unavailable");
                Ok(String::new())
            }
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct GitStatusSource {
    repo_root: PathBuf,
}

impl GitStatusSource {
    pub(crate) fn new(repo_root: PathBuf) -> Self {
        Self { repo_root }
    }
}

impl StatusSource for GitStatusSource {
    fn changed_files(&self) -> Result<Vec<FileItem>> {
        let output = run_git_text(
            ["status", "--porcelain=v2", "--untracked-files=all", "-z"],
            &self.repo_root,
        )?;
        let mut items = parse_porcelain_status(&output)?;
        items.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(items)
    }
}

fn item_from_xy(path: &str, xy: &str) -> FileItem {
    let mut flags = xy.chars();
    let has_staged = flags.next().is_some_and(|flag| flag != '.');
    let has_unstaged = flags.next().is_some_and(|flag| flag != '.');
    let status = match xy.trim() {
        "" => "..".to_string(),
        trimmed => trimmed.to_string(),
    };

    FileItem {
        path: path.to_string(),
        status,
        has_staged,
        has_unstaged,
    }
}

fn tracked_record(record: &str, field_count: usize) -> Result<FileItem> {
    let fields: Vec<&str> = record.splitn(field_count, ' ').collect();
    if fields.len() != field_count {
        bail!("unexpected porcelain record: {record:?}");
    }
    Ok(item_from_xy(fields[field_count - 1], fields[1]))
}

/// Parses `git status --porcelain=v2 -z` output.
pub(crate) fn parse_porcelain_status(raw: &str) -> Result<Vec<FileItem>> {
    let mut items = Vec::new();
    let mut records = raw.split('\0').filter(|record| !record.is_empty());

    while let Some(record) = records.next() {
        match record.as_bytes()[0] {
            b'1' => items.push(tracked_record(record, 9)?),
            b'2' => {
                items.push(tracked_record(record, 10)?);
                // Renames and copies are followed by their original path.
                let _ = records.next();
            }
            b'u' => items.push(tracked_record(record, 11)?),
            b'?' => items.push(FileItem {
                path: record.strip_prefix("? ").unwrap_or(record).to_string(),
                status: "??".to_string(),
                has_staged: false,
                has_unstaged: true,
            }),
            b'!' | b'#' => {}
            _ => bail!("unknown porcelain record: {record:?}"),
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::{diff_args, parse_porcelain_status};
    use crate::model::DiffMode;

    #[test]
    fn parses_ordinary_renamed_unmerged_and_untracked_records() {
        let raw = concat!(
            "# branch.oid abc\0",
            "1 .M N... 100644 100644 100644 aaa bbb src/main.rs\0",
            "2 R. N... 100644 100644 100644 aaa bbb R100 docs/new name.md\0docs/old.md\0",
            "u UU N... 100644 100644 100644 100644 aaa bbb ccc conflict.rs\0",
            "? notes/todo list.txt\0",
            "! target/ignored\0",
        );
        let items = parse_porcelain_status(raw).expect("status should parse");
        assert_eq!(items.len(), 4);

        assert_eq!(items[0].path, "src/main.rs");
        assert_eq!(items[0].status, ".M");
        assert!(!items[0].has_staged);
        assert!(items[0].has_unstaged);

        assert_eq!(items[1].path, "docs/new name.md");
        assert!(items[1].has_staged);
        assert!(!items[1].has_unstaged);

        assert_eq!(items[2].path, "conflict.rs");
        assert_eq!(items[2].status, "UU");

        assert_eq!(items[3].path, "notes/todo list.txt");
        assert_eq!(items[3].status, "??");
    }

    #[test]
    fn rejects_unknown_records() {
        assert!(parse_porcelain_status("x what\0").is_err());
        assert!(parse_porcelain_status("1 .M short\0").is_err());
    }

    #[test]
    fn diff_args_follow_mode() {
        assert_eq!(diff_args(DiffMode::All, "a.rs"), ["diff", "HEAD", "-U3", "--", "a.rs"]);
        assert_eq!(diff_args(DiffMode::Unstaged, "a.rs"), ["diff", "-U3", "--", "a.rs"]);
        assert_eq!(
            diff_args(DiffMode::Staged, "a.rs"),
            ["diff", "--cached", "-U3", "--", "a.rs"]
        );
    }
}
