use std::fmt::{self, Display};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which half of a split diff a line number or comment refers to.
///
/// Written as `"old"`/`"new"`. Reading also accepts `0`/`1`, the encoding
/// used by older comment files.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "SideRepr")]
pub enum Side {
    Old,
    New,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SideRepr {
    Name(String),
    Index(u64),
}

impl TryFrom<SideRepr> for Side {
    type Error = String;

    fn try_from(value: SideRepr) -> Result<Self, Self::Error> {
        match value {
            SideRepr::Name(name) if name == "old" => Ok(Side::Old),
            SideRepr::Name(name) if name == "new" => Ok(Side::New),
            SideRepr::Index(0) => Ok(Side::Old),
            SideRepr::Index(1) => Ok(Side::New),
            SideRepr::Name(name) => Err(format!("unknown side `{name}`")),
            SideRepr::Index(index) => Err(format!("unknown side index {index}")),
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Old => write!(f, "old"),
            Side::New => write!(f, "new"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RowKind {
    Context,
    Delete,
    Add,
    Change,
    HunkHeader,
}

/// One aligned row of a parsed diff.
///
/// Hunk headers keep their `@@ ... @@` text in `old_text` and carry no line
/// numbers. `hunk_id` counts hunks within a file starting at zero.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiffRow {
    pub kind: RowKind,
    pub old_line: Option<u32>,
    pub new_line: Option<u32>,
    pub old_text: String,
    pub new_text: String,
    pub path: String,
    pub hunk_id: usize,
}

impl DiffRow {
    pub fn line(&self, side: Side) -> Option<u32> {
        match side {
            Side::Old => self.old_line,
            Side::New => self.new_line,
        }
    }

    pub fn text(&self, side: Side) -> &str {
        match side {
            Side::Old => &self.old_text,
            Side::New => &self.new_text,
        }
    }

    pub fn is_header(&self) -> bool {
        self.kind == RowKind::HunkHeader
    }
}

/// Half-open range of char offsets into normalized text.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffMode {
    #[default]
    #[value(name = "all")]
    All,
    #[value(name = "unstaged")]
    Unstaged,
    #[value(name = "staged")]
    Staged,
}

impl DiffMode {
    pub fn next(self) -> Self {
        match self {
            DiffMode::All => DiffMode::Unstaged,
            DiffMode::Unstaged => DiffMode::Staged,
            DiffMode::Staged => DiffMode::All,
        }
    }
}

impl Display for DiffMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffMode::All => write!(f, "all"),
            DiffMode::Unstaged => write!(f, "unstaged"),
            DiffMode::Staged => write!(f, "staged"),
        }
    }
}

/// A changed path reported by `git status`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileItem {
    pub path: String,
    pub status: String,
    pub has_staged: bool,
    pub has_unstaged: bool,
}
