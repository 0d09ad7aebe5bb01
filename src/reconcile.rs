use std::collections::{BTreeMap, HashSet};

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    comments::{Comment, StaleMap, anchor_key},
    git::DiffSource,
    model::{DiffMode, DiffRow, Side},
    parse::{ParseError, parse_unified_diff},
};

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ReconcileError {
    #[error("failed to fetch diff for {path}: {message}")]
    Fetch { path: String, message: String },
    #[error("failed to parse diff for {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },
}

/// Staleness of every comment handed to [`reconcile`], plus the first
/// failure hit while checking them.
#[derive(Debug, Default)]
pub struct StaleReport {
    pub stale: StaleMap,
    pub first_error: Option<ReconcileError>,
}

/// Anchor keys exposed by a set of parsed rows.
#[derive(Debug, Default)]
pub struct AnchorLines {
    keys: HashSet<String>,
}

impl AnchorLines {
    pub fn from_rows(rows: &[DiffRow]) -> Self {
        let keys = rows
            .iter()
            .flat_map(|row| {
                [Side::Old, Side::New].into_iter().filter_map(move |side| {
                    row.line(side).map(|line| anchor_key(&row.path, side, line))
                })
            })
            .collect();
        Self { keys }
    }

    pub fn contains(&self, comment: &Comment) -> bool {
        self.keys.contains(&comment.key())
    }
}

/// Marks each comment stale unless one of `rows` exposes its anchor.
pub fn reconcile_rows(comments: &[Comment], rows: &[DiffRow]) -> StaleMap {
    let anchors = AnchorLines::from_rows(rows);
    comments
        .iter()
        .map(|comment| (comment.key(), !anchors.contains(comment)))
        .collect()
}

fn mark_all(stale: &mut StaleMap, group: &[&Comment]) {
    stale.extend(group.iter().map(|comment| (comment.key(), true)));
}

/// Checks every comment against the current diff of its file, fetching each
/// changed path once.
///
/// Comments on unchanged paths, or on paths whose diff cannot be fetched,
/// is empty, or does not parse, are stale. The report always covers every
/// comment.
pub fn reconcile<S: DiffSource + ?Sized>(
    changed_paths: &[String],
    comments: &[Comment],
    source: &S,
    mode: DiffMode,
) -> StaleReport {
    let mut report = StaleReport::default();
    let changed: HashSet<&str> = changed_paths.iter().map(String::as_str).collect();

    let mut by_path: BTreeMap<&str, Vec<&Comment>> = BTreeMap::new();
    for comment in comments {
        if changed.contains(comment.path.as_str()) {
            by_path.entry(&comment.path).or_default().push(comment);
        } else {
            report.stale.insert(comment.key(), true);
        }
    }

    for (path, group) in by_path {
        let raw = match source.diff(path, mode) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(path, %error, "diff fetch failed during reconcile");
                report.first_error.get_or_insert(ReconcileError::Fetch {
                    path: path.to_string(),
                    message: format!("{error:#}"),
                });
                mark_all(&mut report.stale, &group);
                continue;
            }
        };

        if raw.trim().is_empty() {
            mark_all(&mut report.stale, &group);
            continue;
        }

        let rows = match parse_unified_diff(&raw, path) {
            Ok(rows) => rows,
            Err(error) => {
                warn!(path, %error, "diff parse failed during reconcile");
                report.first_error.get_or_insert(ReconcileError::Parse {
                    path: path.to_string(),
                    source: error,
                });
                mark_all(&mut report.stale, &group);
                continue;
            }
        };

        let anchors = AnchorLines::from_rows(&rows);
        for comment in group {
            report
                .stale
                .insert(comment.key(), !anchors.contains(comment));
        }
    }

    debug!(
        comments = comments.len(),
        stale = report.stale.values().filter(|stale| **stale).count(),
        "reconciled comments"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::{ReconcileError, reconcile, reconcile_rows};
    use crate::{
        comments::Comment,
        git::DiffSource,
        model::{DiffMode, Side},
        parse::parse_unified_diff,
    };
    use anyhow::{Result, bail};
    use chrono::Utc;
    use std::{cell::RefCell, collections::HashMap};

    struct FakeSource {
        diffs: HashMap<&'static str, Result<&'static str, &'static str>>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeSource {
        fn new(entries: &[(&'static str, Result<&'static str, &'static str>)]) -> Self {
            Self {
                diffs: entries.iter().cloned().collect(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl DiffSource for FakeSource {
        fn diff(&self, path: &str, _mode: DiffMode) -> Result<String> {
            self.calls.borrow_mut().push(path.to_string());
            match self.diffs.get(path) {
                Some(Ok(raw)) => Ok(raw.to_string()),
                Some(Err(message)) => bail!("{message}"),
                None => Ok(String::new()),
            }
        }
    }

    fn comment(path: &str, side: Side, line: u32) -> Comment {
        Comment {
            path: path.to_string(),
            side,
            line,
            body: "note".to_string(),
            created_at: Utc::now(),
            hunk_header: String::new(),
            context_before: Vec::new(),
            context_after: Vec::new(),
        }
    }

    const DIFF: &str = "@@ -1,2 +1,2 @@\n keep\n-old\n+new\n";

    fn paths(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn comments_on_visible_lines_are_fresh() {
        let source = FakeSource::new(&[("a.rs", Ok(DIFF))]);
        let comments = [
            comment("a.rs", Side::Old, 2),
            comment("a.rs", Side::New, 2),
            comment("a.rs", Side::New, 9),
        ];
        let report = reconcile(&paths(&["a.rs"]), &comments, &source, DiffMode::All);
        assert_eq!(report.stale.get("a.rs:old:2"), Some(&false));
        assert_eq!(report.stale.get("a.rs:new:2"), Some(&false));
        assert_eq!(report.stale.get("a.rs:new:9"), Some(&true));
        assert!(report.first_error.is_none());
    }

    #[test]
    fn fetches_each_path_once() {
        let source = FakeSource::new(&[("a.rs", Ok(DIFF))]);
        let comments = [comment("a.rs", Side::Old, 1), comment("a.rs", Side::New, 1)];
        reconcile(&paths(&["a.rs"]), &comments, &source, DiffMode::All);
        assert_eq!(source.calls.borrow().as_slice(), ["a.rs"]);
    }

    #[test]
    fn unchanged_paths_are_stale_without_fetching() {
        let source = FakeSource::new(&[]);
        let comments = [comment("gone.rs", Side::New, 1)];
        let report = reconcile(&paths(&["other.rs"]), &comments, &source, DiffMode::All);
        assert_eq!(report.stale.get("gone.rs:new:1"), Some(&true));
        assert!(source.calls.borrow().is_empty());
    }

    #[test]
    fn fetch_failure_marks_group_stale_and_keeps_first_error() {
        let source = FakeSource::new(&[("a.rs", Err("boom")), ("b.rs", Err("bang"))]);
        let comments = [comment("b.rs", Side::New, 1), comment("a.rs", Side::New, 1)];
        let report = reconcile(&paths(&["a.rs", "b.rs"]), &comments, &source, DiffMode::All);
        assert_eq!(report.stale.len(), 2);
        assert!(report.stale.values().all(|stale| *stale));
        assert_eq!(
            report.first_error,
            Some(ReconcileError::Fetch {
                path: "a.rs".to_string(),
                message: "boom".to_string()
            })
        );
    }

    #[test]
    fn empty_and_unparseable_diffs_mark_comments_stale() {
        let source = FakeSource::new(&[("empty.rs", Ok("  \n")), ("bad.rs", Ok("@@ -1 +1 @@\n?x\n"))]);
        let comments = [comment("empty.rs", Side::New, 1), comment("bad.rs", Side::New, 1)];
        let report = reconcile(
            &paths(&["empty.rs", "bad.rs"]),
            &comments,
            &source,
            DiffMode::Staged,
        );
        assert_eq!(report.stale.get("empty.rs:new:1"), Some(&true));
        assert_eq!(report.stale.get("bad.rs:new:1"), Some(&true));
        assert!(matches!(
            report.first_error,
            Some(ReconcileError::Parse { ref path, .. }) if path == "bad.rs"
        ));
    }

    #[test]
    fn result_does_not_depend_on_comment_order() {
        let source = FakeSource::new(&[("a.rs", Ok(DIFF)), ("b.rs", Err("nope"))]);
        let mut comments = vec![
            comment("a.rs", Side::New, 2),
            comment("b.rs", Side::Old, 1),
            comment("c.rs", Side::Old, 1),
        ];
        let changed = paths(&["a.rs", "b.rs"]);
        let forward = reconcile(&changed, &comments, &source, DiffMode::All);
        comments.reverse();
        let backward = reconcile(&changed, &comments, &source, DiffMode::All);
        assert_eq!(forward.stale, backward.stale);
        assert_eq!(forward.first_error, backward.first_error);
    }

    #[test]
    fn reconcile_rows_checks_already_parsed_rows() {
        let rows = parse_unified_diff(DIFF, "a.rs").expect("fixture should parse");
        let comments = [comment("a.rs", Side::New, 1), comment("a.rs", Side::Old, 3)];
        let stale = reconcile_rows(&comments, &rows);
        assert_eq!(stale.get("a.rs:new:1"), Some(&false));
        assert_eq!(stale.get("a.rs:old:3"), Some(&true));
    }
}
