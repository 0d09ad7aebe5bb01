use std::{
    collections::HashMap,
    fmt::{self, Display},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    model::{DiffRow, RowKind, Side},
    render::CommentLookup,
};

pub type StaleMap = HashMap<String, bool>;

/// Identity of a comment: one line on one side of one file.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CommentAnchor {
    pub path: String,
    pub side: Side,
    pub line: u32,
}

impl CommentAnchor {
    pub fn new(path: impl Into<String>, side: Side, line: u32) -> Self {
        Self {
            path: path.into(),
            side,
            line,
        }
    }

    pub fn key(&self) -> String {
        anchor_key(&self.path, self.side, self.line)
    }
}

impl Display for CommentAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.path, self.side, self.line)
    }
}

pub fn anchor_key(path: &str, side: Side, line: u32) -> String {
    format!("{path}:{side}:{line}")
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub path: String,
    pub side: Side,
    pub line: u32,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub hunk_header: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub context_before: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub context_after: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Comment {
    pub fn anchor(&self) -> CommentAnchor {
        CommentAnchor::new(self.path.clone(), self.side, self.line)
    }

    pub fn key(&self) -> String {
        anchor_key(&self.path, self.side, self.line)
    }
}

pub(crate) fn sort_comments(comments: &mut [Comment]) {
    comments.sort_by(|a, b| {
        a.path
            .cmp(&b.path)
            .then(a.line.cmp(&b.line))
            .then(a.side.cmp(&b.side))
            .then(a.created_at.cmp(&b.created_at))
    });
}

/// In-memory comment set keyed by anchor.
#[derive(Clone, Debug, Default)]
pub struct CommentBook {
    comments: HashMap<String, Comment>,
}

impl CommentBook {
    pub fn new(comments: Vec<Comment>) -> Self {
        let comments = comments
            .into_iter()
            .map(|comment| (comment.key(), comment))
            .collect();
        Self { comments }
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Comment> {
        self.comments.get(key)
    }

    /// Inserts or replaces the comment at its anchor. A replaced comment keeps
    /// its original creation time.
    pub fn upsert(&mut self, mut comment: Comment) {
        let key = comment.key();
        if let Some(existing) = self.comments.get(&key) {
            comment.created_at = existing.created_at;
        }
        self.comments.insert(key, comment);
    }

    pub fn set_body(&mut self, key: &str, body: &str) -> bool {
        match self.comments.get_mut(key) {
            Some(comment) => {
                comment.body = body.to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Comment> {
        self.comments.remove(key)
    }

    pub fn clear(&mut self) {
        self.comments.clear();
    }

    pub fn sorted(&self) -> Vec<Comment> {
        let mut comments: Vec<Comment> = self.comments.values().cloned().collect();
        sort_comments(&mut comments);
        comments
    }

    pub fn exportable(&self, stale: &StaleMap) -> Vec<Comment> {
        self.sorted()
            .into_iter()
            .filter(|comment| !is_stale(stale, &comment.key()))
            .collect()
    }

    pub fn stale_count(&self, stale: &StaleMap) -> usize {
        self.comments
            .keys()
            .filter(|key| is_stale(stale, key))
            .count()
    }

    pub fn all_stale(&self) -> StaleMap {
        self.comments.keys().map(|key| (key.clone(), true)).collect()
    }
}

impl CommentLookup for CommentBook {
    fn has_comment(&self, path: &str, line: u32, side: Side) -> bool {
        self.comments.contains_key(&anchor_key(path, side, line))
    }

    fn comment_text(&self, path: &str, line: u32, side: Side) -> Option<&str> {
        self.comments
            .get(&anchor_key(path, side, line))
            .map(|comment| comment.body.as_str())
    }
}

pub(crate) fn is_stale(stale: &StaleMap, key: &str) -> bool {
    stale.get(key).copied().unwrap_or(false)
}

/// The side a new comment on `row` attaches to. Deletes anchor on the old
/// side, everything else prefers the new side. Headers have no anchor.
pub fn pick_anchor(row: &DiffRow) -> Option<CommentAnchor> {
    let side = match row.kind {
        RowKind::HunkHeader => return None,
        RowKind::Delete => Side::Old,
        RowKind::Add => Side::New,
        RowKind::Context | RowKind::Change => {
            if row.new_line.is_some() {
                Side::New
            } else {
                Side::Old
            }
        }
    };
    let line = row.line(side)?;
    Some(CommentAnchor::new(row.path.clone(), side, line))
}

fn side_text(row: &DiffRow, side: Side) -> &str {
    if row.line(side).is_some() {
        row.text(side)
    } else {
        ""
    }
}

fn nearest_text<'a>(
    candidates: impl Iterator<Item = &'a DiffRow>,
    path: &str,
    side: Side,
) -> Option<String> {
    candidates
        .filter(|row| row.path == path)
        .map(|row| side_text(row, side))
        .find(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}

/// Nearest non-empty line above `index` on `side`, then the target line and
/// the nearest non-empty line below it.
pub fn context_around(rows: &[DiffRow], index: usize, side: Side) -> (Vec<String>, Vec<String>) {
    let Some(target_row) = rows.get(index) else {
        return (Vec::new(), Vec::new());
    };
    let path = target_row.path.as_str();
    let before = nearest_text(rows[..index].iter().rev(), path, side);
    let after = nearest_text(rows[index + 1..].iter(), path, side);
    let target = side_text(target_row, side);

    let context_before = before.into_iter().collect();
    let mut context_after = Vec::with_capacity(2);
    if !target.is_empty() {
        context_after.push(target.to_string());
    }
    context_after.extend(after);
    (context_before, context_after)
}

pub fn hunk_header_for_row(rows: &[DiffRow], index: usize) -> Option<&str> {
    let path = &rows.get(index)?.path;
    rows[..=index]
        .iter()
        .rev()
        .filter(|row| &row.path == path)
        .find(|row| row.is_header())
        .map(|row| row.old_text.as_str())
}

/// Builds a comment anchored on the row at `index`, with surrounding context
/// captured for export.
pub fn draft_comment(
    rows: &[DiffRow],
    index: usize,
    body: &str,
    now: DateTime<Utc>,
) -> Option<Comment> {
    let anchor = pick_anchor(rows.get(index)?)?;
    let (context_before, context_after) = context_around(rows, index, anchor.side);
    Some(Comment {
        path: anchor.path,
        side: anchor.side,
        line: anchor.line,
        body: body.to_string(),
        created_at: now,
        hunk_header: hunk_header_for_row(rows, index)
            .unwrap_or_default()
            .to_string(),
        context_before,
        context_after,
    })
}

pub fn find_anchor_row(rows: &[DiffRow], anchor: &CommentAnchor) -> Option<usize> {
    rows.iter()
        .position(|row| row.path == anchor.path && row.line(anchor.side) == Some(anchor.line))
}

/// Indexes of rows carrying a non-stale comment on either side.
pub fn comment_rows<L: CommentLookup + ?Sized>(
    rows: &[DiffRow],
    lookup: &L,
    stale: &StaleMap,
) -> Vec<usize> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| {
            [Side::Old, Side::New].into_iter().any(|side| {
                row.line(side).is_some_and(|line| {
                    lookup.has_comment(&row.path, line, side)
                        && !is_stale(stale, &anchor_key(&row.path, side, line))
                })
            })
        })
        .map(|(index, _)| index)
        .collect()
}

/// Next (or previous) comment row relative to `cursor`, wrapping around.
pub fn next_comment_row(comment_rows: &[usize], cursor: usize, forward: bool) -> Option<usize> {
    if forward {
        comment_rows
            .iter()
            .copied()
            .find(|row| *row > cursor)
            .or_else(|| comment_rows.first().copied())
    } else {
        comment_rows
            .iter()
            .rev()
            .copied()
            .find(|row| *row < cursor)
            .or_else(|| comment_rows.last().copied())
    }
}
