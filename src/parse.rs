use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::model::{DiffRow, RowKind};

static HUNK_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@(.*)$")
        .expect("hunk header regex should be valid")
});

/// Failure to turn a unified diff into rows. Line numbers are 1-based.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ParseError {
    #[error("line {line}: invalid hunk header `{header}`")]
    InvalidHunkHeader { line: usize, header: String },
    #[error("line {line}: unexpected prefix {prefix:?} in hunk body")]
    UnexpectedPrefix { line: usize, prefix: char },
    #[error("line {line}: hunk ends before its declared line counts are consumed")]
    TruncatedHunk { line: usize },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct HunkHeader {
    old_start: u32,
    old_count: u32,
    new_start: u32,
    new_count: u32,
}

#[derive(Default)]
struct EditRun {
    deletes: Vec<(u32, String)>,
    adds: Vec<(u32, String)>,
}

fn parse_count(value: Option<regex::Match<'_>>, default: u32) -> Option<u32> {
    match value {
        Some(found) => found.as_str().parse().ok(),
        None => Some(default),
    }
}

fn parse_hunk_header(line: &str, line_number: usize) -> Result<HunkHeader, ParseError> {
    let invalid = || ParseError::InvalidHunkHeader {
        line: line_number,
        header: line.to_string(),
    };
    let captures = HUNK_HEADER_RE.captures(line).ok_or_else(invalid)?;

    let old_start = parse_count(captures.get(1), 0).ok_or_else(invalid)?;
    let old_count = parse_count(captures.get(2), 1).ok_or_else(invalid)?;
    let new_start = parse_count(captures.get(3), 0).ok_or_else(invalid)?;
    let new_count = parse_count(captures.get(4), 1).ok_or_else(invalid)?;
    old_start.checked_add(old_count).ok_or_else(invalid)?;
    new_start.checked_add(new_count).ok_or_else(invalid)?;

    Ok(HunkHeader {
        old_start,
        old_count,
        new_start,
        new_count,
    })
}

fn flush_run(run: &mut EditRun, path: &str, hunk_id: usize, rows: &mut Vec<DiffRow>) {
    let mut deletes = std::mem::take(&mut run.deletes).into_iter();
    let mut adds = std::mem::take(&mut run.adds).into_iter();

    loop {
        let row = match (deletes.next(), adds.next()) {
            (None, None) => break,
            (Some((old_line, old_text)), Some((new_line, new_text))) => DiffRow {
                kind: RowKind::Change,
                old_line: Some(old_line),
                new_line: Some(new_line),
                old_text,
                new_text,
                path: path.to_string(),
                hunk_id,
            },
            (Some((old_line, old_text)), None) => DiffRow {
                kind: RowKind::Delete,
                old_line: Some(old_line),
                new_line: None,
                old_text,
                new_text: String::new(),
                path: path.to_string(),
                hunk_id,
            },
            (None, Some((new_line, new_text))) => DiffRow {
                kind: RowKind::Add,
                old_line: None,
                new_line: Some(new_line),
                old_text: String::new(),
                new_text,
                path: path.to_string(),
                hunk_id,
            },
        };
        rows.push(row);
    }
}

/// Parses a single-file unified diff into aligned rows.
///
/// File headers and anything else outside a hunk are skipped. Each hunk body
/// is read until its declared old/new counts are consumed; a deletion run
/// directly followed by an addition run is paired index by index into
/// `Change` rows, with the leftover tail emitted as plain deletes or adds.
pub fn parse_unified_diff(raw: &str, path: &str) -> Result<Vec<DiffRow>, ParseError> {
    let lines: Vec<&str> = raw.lines().collect();
    let mut rows = Vec::new();
    let mut hunk_id = 0;
    let mut index = 0;

    while index < lines.len() {
        let line = lines[index];
        if !line.starts_with("@@") {
            index += 1;
            continue;
        }

        let header_line = index + 1;
        let header = parse_hunk_header(line.trim_end(), header_line)?;
        let overflow = || ParseError::InvalidHunkHeader {
            line: header_line,
            header: line.trim_end().to_string(),
        };
        rows.push(DiffRow {
            kind: RowKind::HunkHeader,
            old_line: None,
            new_line: None,
            old_text: line.trim_end().to_string(),
            new_text: String::new(),
            path: path.to_string(),
            hunk_id,
        });
        index += 1;

        let mut old_line = header.old_start;
        let mut new_line = header.new_start;
        let mut old_remaining = header.old_count;
        let mut new_remaining = header.new_count;
        let mut run = EditRun::default();

        while old_remaining > 0 || new_remaining > 0 {
            let Some(body) = lines.get(index) else {
                return Err(ParseError::TruncatedHunk { line: index + 1 });
            };
            if body.starts_with("@@") {
                return Err(ParseError::TruncatedHunk { line: index + 1 });
            }

            let mut chars = body.chars();
            match chars.next() {
                None | Some(' ') => {
                    flush_run(&mut run, path, hunk_id, &mut rows);
                    let text = chars.as_str().to_string();
                    rows.push(DiffRow {
                        kind: RowKind::Context,
                        old_line: Some(old_line),
                        new_line: Some(new_line),
                        old_text: text.clone(),
                        new_text: text,
                        path: path.to_string(),
                        hunk_id,
                    });
                    old_line = old_line.checked_add(1).ok_or_else(overflow)?;
                    new_line = new_line.checked_add(1).ok_or_else(overflow)?;
                    old_remaining = old_remaining.saturating_sub(1);
                    new_remaining = new_remaining.saturating_sub(1);
                }
                Some('-') => {
                    if !run.adds.is_empty() {
                        flush_run(&mut run, path, hunk_id, &mut rows);
                    }
                    run.deletes.push((old_line, chars.as_str().to_string()));
                    old_line = old_line.checked_add(1).ok_or_else(overflow)?;
                    old_remaining = old_remaining.saturating_sub(1);
                }
                Some('+') => {
                    run.adds.push((new_line, chars.as_str().to_string()));
                    new_line = new_line.checked_add(1).ok_or_else(overflow)?;
                    new_remaining = new_remaining.saturating_sub(1);
                }
                Some('\\') => flush_run(&mut run, path, hunk_id, &mut rows),
                Some(prefix) => {
                    return Err(ParseError::UnexpectedPrefix {
                        line: index + 1,
                        prefix,
                    });
                }
            }
            index += 1;
        }

        flush_run(&mut run, path, hunk_id, &mut rows);
        hunk_id += 1;
    }

    debug!(path, rows = rows.len(), hunks = hunk_id, "parsed unified diff");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::{ParseError, parse_unified_diff};
    use crate::model::{DiffRow, RowKind};

    const MODIFIED: &str = "diff --git a/src/lib.rs b/src/lib.rs
index 1111111..2222222 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,4 +1,4 @@ fn main()
 alpha
-beta
+zeta
 gamma
 delta
";

    fn kinds(rows: &[DiffRow]) -> Vec<RowKind> {
        rows.iter().map(|row| row.kind).collect()
    }

    #[test]
    fn parses_header_context_and_change_rows() {
        let rows = parse_unified_diff(MODIFIED, "src/lib.rs").expect("diff should parse");
        assert_eq!(
            kinds(&rows),
            [
                RowKind::HunkHeader,
                RowKind::Context,
                RowKind::Change,
                RowKind::Context,
                RowKind::Context,
            ]
        );
        assert_eq!(rows[0].old_text, "@@ -1,4 +1,4 @@ fn main()");
        assert_eq!(rows[0].old_line, None);
        assert_eq!(rows[2].old_text, "beta");
        assert_eq!(rows[2].new_text, "zeta");
        assert_eq!(rows[2].old_line, Some(2));
        assert_eq!(rows[2].new_line, Some(2));
        assert!(rows.iter().all(|row| row.path == "src/lib.rs"));
    }

    #[test]
    fn pairs_longer_delete_run_with_trailing_deletes() {
        let raw = "@@ -1,3 +1,1 @@\n-a\n-b\n-c\n+x\n";
        let rows = parse_unified_diff(raw, "f").expect("diff should parse");
        assert_eq!(
            kinds(&rows),
            [
                RowKind::HunkHeader,
                RowKind::Change,
                RowKind::Delete,
                RowKind::Delete
            ]
        );
        assert_eq!(rows[2].old_line, Some(2));
        assert_eq!(rows[2].new_line, None);
        assert_eq!(rows[3].old_line, Some(3));
    }

    #[test]
    fn pairs_longer_add_run_with_trailing_adds() {
        let raw = "@@ -1 +1,3 @@\n-a\n+x\n+y\n+z\n";
        let rows = parse_unified_diff(raw, "f").expect("diff should parse");
        assert_eq!(
            kinds(&rows),
            [RowKind::HunkHeader, RowKind::Change, RowKind::Add, RowKind::Add]
        );
        assert_eq!(rows[3].new_line, Some(3));
        assert_eq!(rows[3].old_line, None);
    }

    #[test]
    fn additions_without_deletions_are_plain_adds() {
        let raw = "@@ -0,0 +1,2 @@\n+first\n+second\n";
        let rows = parse_unified_diff(raw, "new.txt").expect("diff should parse");
        assert_eq!(kinds(&rows), [RowKind::HunkHeader, RowKind::Add, RowKind::Add]);
        assert_eq!(rows[1].new_line, Some(1));
    }

    #[test]
    fn additions_before_deletions_are_not_paired() {
        let raw = "@@ -1 +1 @@\n+x\n-a\n";
        let rows = parse_unified_diff(raw, "f").expect("diff should parse");
        assert_eq!(kinds(&rows), [RowKind::HunkHeader, RowKind::Add, RowKind::Delete]);
    }

    #[test]
    fn assigns_hunk_ids_per_hunk() {
        let raw = "@@ -1 +1 @@\n-a\n+b\n@@ -10,2 +10,2 @@\n c\n d\n";
        let rows = parse_unified_diff(raw, "f").expect("diff should parse");
        let ids: Vec<usize> = rows.iter().map(|row| row.hunk_id).collect();
        assert_eq!(ids, [0, 0, 1, 1, 1]);
        assert_eq!(rows[3].old_line, Some(10));
        assert_eq!(rows[4].new_line, Some(11));
    }

    #[test]
    fn no_newline_marker_ends_a_deletion_run() {
        let raw = "@@ -1 +1 @@\n-old\n\\ No newline at end of file\n+new\n\\ No newline at end of file\n";
        let rows = parse_unified_diff(raw, "f").expect("diff should parse");
        assert_eq!(kinds(&rows), [RowKind::HunkHeader, RowKind::Delete, RowKind::Add]);
        assert_eq!(rows[1].old_line, Some(1));
        assert_eq!(rows[2].new_line, Some(1));
    }

    #[test]
    fn no_newline_marker_after_a_paired_run_keeps_the_pairs() {
        let raw = "@@ -1,2 +1,2 @@\n a\n-old\n+new\n\\ No newline at end of file\n";
        let rows = parse_unified_diff(raw, "f").expect("diff should parse");
        assert_eq!(
            kinds(&rows),
            [RowKind::HunkHeader, RowKind::Context, RowKind::Change]
        );
    }

    #[test]
    fn rejects_hunk_start_that_overflows() {
        let raw = "@@ -4294967295,2 +1,2 @@\n a\n b\n";
        let error = parse_unified_diff(raw, "f").expect_err("overflowing start should fail");
        assert!(matches!(error, ParseError::InvalidHunkHeader { line: 1, .. }));
    }

    #[test]
    fn last_representable_line_number_is_accepted() {
        let raw = "@@ -4294967294,1 +4294967294,1 @@\n-a\n+b\n";
        let rows = parse_unified_diff(raw, "f").expect("diff should parse");
        assert_eq!(rows[1].old_line, Some(u32::MAX - 1));
        assert_eq!(rows[1].new_line, Some(u32::MAX - 1));
    }

    #[test]
    fn numbered_rows_match_declared_hunk_counts() {
        let raw = "diff --git a/f b/f
--- a/f
+++ b/f
@@ -1,6 +1,5 @@ head
 a
-b
-c
+B
 d
+e
-f
 h
@@ -20,3 +19,5 @@
 x
+y
+z
-w
+v
 u
@@ -40,0 +41,2 @@
+p
+q
";
        let rows = parse_unified_diff(raw, "f").expect("diff should parse");
        let declared = [(0, 6, 5), (1, 3, 5), (2, 0, 2)];
        for (hunk_id, old_count, new_count) in declared {
            let hunk: Vec<&DiffRow> = rows.iter().filter(|row| row.hunk_id == hunk_id).collect();
            let old = hunk.iter().filter(|row| row.old_line.is_some()).count();
            let new = hunk.iter().filter(|row| row.new_line.is_some()).count();
            assert_eq!((old, new), (old_count, new_count), "hunk {hunk_id}");
        }
    }

    #[test]
    fn empty_line_inside_hunk_is_empty_context() {
        let raw = "@@ -1,3 +1,3 @@\n a\n\n b\n";
        let rows = parse_unified_diff(raw, "f").expect("diff should parse");
        assert_eq!(rows[2].kind, RowKind::Context);
        assert_eq!(rows[2].old_text, "");
        assert_eq!(rows[3].old_line, Some(3));
    }

    #[test]
    fn accepts_crlf_line_endings() {
        let raw = "@@ -1 +1 @@\r\n-a\r\n+b\r\n";
        let rows = parse_unified_diff(raw, "f").expect("diff should parse");
        assert_eq!(rows[1].old_text, "a");
        assert_eq!(rows[1].new_text, "b");
    }

    #[test]
    fn line_numbers_strictly_increase_per_side() {
        let raw = "@@ -1,5 +1,5 @@\n a\n-b\n-c\n+B\n d\n+e\n-f\n e2\n";
        let rows = parse_unified_diff(raw, "f").expect("diff should parse");
        let old: Vec<u32> = rows.iter().filter_map(|row| row.old_line).collect();
        let new: Vec<u32> = rows.iter().filter_map(|row| row.new_line).collect();
        assert!(old.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(new.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn rejects_unexpected_prefix() {
        let raw = "@@ -1,2 +1,2 @@\n a\n?b\n";
        assert_eq!(
            parse_unified_diff(raw, "f"),
            Err(ParseError::UnexpectedPrefix {
                line: 3,
                prefix: '?'
            })
        );
    }

    #[test]
    fn rejects_malformed_hunk_header() {
        let raw = "@@ -x +1 @@\n a\n";
        assert!(matches!(
            parse_unified_diff(raw, "f"),
            Err(ParseError::InvalidHunkHeader { line: 1, .. })
        ));
    }

    #[test]
    fn rejects_truncated_hunk() {
        let raw = "@@ -1,3 +1,3 @@\n a\n";
        assert_eq!(
            parse_unified_diff(raw, "f"),
            Err(ParseError::TruncatedHunk { line: 3 })
        );
    }

    #[test]
    fn input_without_hunks_yields_no_rows() {
        let rows = parse_unified_diff("Binary files a/x and b/x differ\n", "x")
            .expect("non-hunk input should parse");
        assert!(rows.is_empty());
    }
}
