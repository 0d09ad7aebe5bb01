use std::ops::Range;

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

use crate::{
    model::{DiffRow, RowKind, Side, TextRange},
    text::{WrapChunk, display_width, graphemes, normalize_content, take_width, wrap_text},
    worddiff::changed_word_ranges,
};

pub const GUTTER_WIDTH: usize = 3;
const MIN_NUMBER_WIDTH: usize = 3;

const COLOR_BG_DELETED: Color = Color::Rgb(48, 24, 24);
const COLOR_BG_ADDED: Color = Color::Rgb(22, 34, 24);
const COLOR_WORD_DELETED: Color = Color::Rgb(110, 40, 40);
const COLOR_WORD_ADDED: Color = Color::Rgb(36, 90, 44);

/// Comment state consulted while rendering. Bodies are optional so callers
/// can show markers without inline text.
pub trait CommentLookup {
    fn has_comment(&self, path: &str, line: u32, side: Side) -> bool;

    fn comment_text(&self, _path: &str, _line: u32, _side: Side) -> Option<&str> {
        None
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoComments;

impl CommentLookup for NoComments {
    fn has_comment(&self, _path: &str, _line: u32, _side: Side) -> bool {
        false
    }
}

/// Forwards markers from the wrapped lookup but never injects bodies.
#[derive(Clone, Copy, Debug)]
pub struct MarkersOnly<'a, L: CommentLookup + ?Sized>(pub &'a L);

impl<L: CommentLookup + ?Sized> CommentLookup for MarkersOnly<'_, L> {
    fn has_comment(&self, path: &str, line: u32, side: Side) -> bool {
        self.0.has_comment(path, line, side)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GutterMarker {
    None,
    Cursor,
    Comment,
    CursorAndComment,
}

impl GutterMarker {
    pub fn new(is_cursor: bool, has_comment: bool) -> Self {
        match (is_cursor, has_comment) {
            (false, false) => GutterMarker::None,
            (true, false) => GutterMarker::Cursor,
            (false, true) => GutterMarker::Comment,
            (true, true) => GutterMarker::CursorAndComment,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            GutterMarker::None => "   ",
            GutterMarker::Cursor => ">  ",
            GutterMarker::Comment => " C ",
            GutterMarker::CursorAndComment => ">C ",
        }
    }

    fn style(self) -> Style {
        match self {
            GutterMarker::None => Style::default(),
            GutterMarker::Cursor | GutterMarker::CursorAndComment => Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            GutterMarker::Comment => Style::default().fg(Color::Yellow),
        }
    }
}

/// Two height-synchronized panes plus the row to visual line index.
#[derive(Clone, Debug, Default)]
pub struct SplitRender {
    pub old_lines: Vec<Line<'static>>,
    pub new_lines: Vec<Line<'static>>,
    pub row_starts: Vec<usize>,
    pub row_heights: Vec<usize>,
}

impl SplitRender {
    pub fn total_lines(&self) -> usize {
        self.old_lines.len()
    }

    pub fn visual_range(&self, row: usize) -> Option<Range<usize>> {
        let start = *self.row_starts.get(row)?;
        let height = *self.row_heights.get(row)?;
        Some(start..start + height)
    }

    pub fn row_for_visual_line(&self, line: usize) -> Option<usize> {
        if line >= self.total_lines() {
            return None;
        }
        let after = self.row_starts.partition_point(|start| *start <= line);
        after.checked_sub(1)
    }
}

fn number_width(rows: &[DiffRow], side: Side) -> usize {
    rows.iter()
        .filter_map(|row| row.line(side))
        .max()
        .map_or(0, |line| line.to_string().len())
        .max(MIN_NUMBER_WIDTH)
}

fn row_background(kind: RowKind, side: Side) -> Style {
    match (kind, side) {
        (RowKind::Delete | RowKind::Change, Side::Old) => Style::default().bg(COLOR_BG_DELETED),
        (RowKind::Add | RowKind::Change, Side::New) => Style::default().bg(COLOR_BG_ADDED),
        _ => Style::default(),
    }
}

fn word_highlight(side: Side) -> Style {
    let color = match side {
        Side::Old => COLOR_WORD_DELETED,
        Side::New => COLOR_WORD_ADDED,
    };
    Style::default().bg(color).add_modifier(Modifier::BOLD)
}

fn change_sign(kind: RowKind, side: Side) -> char {
    match (kind, side) {
        (RowKind::Delete | RowKind::Change, Side::Old) => '-',
        (RowKind::Add | RowKind::Change, Side::New) => '+',
        _ => ' ',
    }
}

/// Truncates or pads spans so the line is exactly `width` columns wide.
fn fit_spans(spans: Vec<Span<'static>>, width: usize, pad_style: Style) -> Line<'static> {
    let mut fitted = Vec::with_capacity(spans.len() + 1);
    let mut used = 0;

    for span in spans {
        if used >= width {
            break;
        }
        let span_width = display_width(&span.content);
        if used + span_width <= width {
            used += span_width;
            fitted.push(span);
            continue;
        }

        let kept = take_width(&span.content, width - used);
        used += display_width(&kept);
        if !kept.is_empty() {
            fitted.push(Span::styled(kept, span.style));
        }
        break;
    }

    if used < width {
        fitted.push(Span::styled(" ".repeat(width - used), pad_style));
    }
    Line::from(fitted)
}

fn highlighted_spans(
    chunk: &WrapChunk,
    ranges: &[TextRange],
    base: Style,
    highlight: Style,
) -> Vec<Span<'static>> {
    if ranges.is_empty() {
        return vec![Span::styled(chunk.text.clone(), base)];
    }

    let mut spans = Vec::new();
    let mut current = String::new();
    let mut current_marked = false;
    for grapheme in graphemes(&chunk.text) {
        let marked = ranges
            .iter()
            .any(|range| range.contains(chunk.start + grapheme.start));
        if marked != current_marked && !current.is_empty() {
            let style = if current_marked { highlight } else { base };
            spans.push(Span::styled(std::mem::take(&mut current), style));
        }
        current_marked = marked;
        current.push_str(grapheme.text);
    }
    if !current.is_empty() {
        let style = if current_marked { highlight } else { base };
        spans.push(Span::styled(current, style));
    }
    spans
}

struct SideContext<'a> {
    side: Side,
    pane_width: usize,
    number_width: usize,
    marker: GutterMarker,
    ranges: &'a [TextRange],
}

fn render_side<L: CommentLookup + ?Sized>(
    row: &DiffRow,
    context: &SideContext<'_>,
    comments: &L,
) -> Vec<Line<'static>> {
    let SideContext {
        side,
        pane_width,
        number_width,
        marker,
        ranges,
    } = *context;
    let background = row_background(row.kind, side);
    let gutter = |first: bool| {
        if first {
            Span::styled(marker.symbol(), background.patch(marker.style()))
        } else {
            Span::styled(GutterMarker::None.symbol(), background)
        }
    };

    if row.is_header() {
        let header_style = Style::default().fg(Color::Magenta);
        let text = normalize_content(&row.old_text);
        return wrap_text(&text, pane_width.saturating_sub(GUTTER_WIDTH))
            .iter()
            .enumerate()
            .map(|(index, chunk)| {
                fit_spans(
                    vec![
                        gutter(index == 0),
                        Span::styled(chunk.text.clone(), header_style),
                    ],
                    pane_width,
                    Style::default(),
                )
            })
            .collect();
    }

    let Some(line_number) = row.line(side) else {
        return vec![fit_spans(vec![gutter(true)], pane_width, background)];
    };

    let meta = format!(
        "{} {line_number:>number_width$} ",
        change_sign(row.kind, side)
    );
    let meta_width = display_width(&meta);
    let blank_meta = " ".repeat(meta_width);
    let content_width = pane_width
        .saturating_sub(GUTTER_WIDTH + meta_width)
        .max(1);
    let text = normalize_content(row.text(side));
    let highlight = word_highlight(side);

    let mut lines: Vec<Line<'static>> = wrap_text(&text, content_width)
        .iter()
        .enumerate()
        .map(|(index, chunk)| {
            let first = index == 0;
            let meta_span = if first {
                Span::styled(meta.clone(), background)
            } else {
                Span::styled(blank_meta.clone(), background)
            };
            let mut spans = vec![gutter(first), meta_span];
            spans.extend(highlighted_spans(chunk, ranges, background, highlight));
            fit_spans(spans, pane_width, background)
        })
        .collect();

    if let Some(body) = comments.comment_text(&row.path, line_number, side) {
        let comment_style = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::ITALIC);
        for body_line in body.lines() {
            let normalized = normalize_content(body_line);
            for chunk in wrap_text(&normalized, content_width) {
                lines.push(fit_spans(
                    vec![
                        gutter(false),
                        Span::raw(blank_meta.clone()),
                        Span::styled(chunk.text, comment_style),
                    ],
                    pane_width,
                    Style::default(),
                ));
            }
        }
    }

    lines
}

/// Lays out rows as two fixed-width panes whose lines stay aligned row by row.
///
/// Every produced line is exactly as wide as its pane. Widths of zero are
/// treated as one column.
pub fn render_split<L: CommentLookup + ?Sized>(
    rows: &[DiffRow],
    old_width: usize,
    new_width: usize,
    cursor: Option<usize>,
    comments: &L,
) -> SplitRender {
    let old_width = old_width.max(1);
    let new_width = new_width.max(1);
    let old_number_width = number_width(rows, Side::Old);
    let new_number_width = number_width(rows, Side::New);

    let mut output = SplitRender {
        row_starts: Vec::with_capacity(rows.len()),
        row_heights: Vec::with_capacity(rows.len()),
        ..SplitRender::default()
    };

    for (index, row) in rows.iter().enumerate() {
        let has_comment = [Side::Old, Side::New].into_iter().any(|side| {
            row.line(side)
                .is_some_and(|line| comments.has_comment(&row.path, line, side))
        });
        let marker = GutterMarker::new(cursor == Some(index), has_comment);

        let (old_ranges, new_ranges) = if row.kind == RowKind::Change {
            changed_word_ranges(
                &normalize_content(&row.old_text),
                &normalize_content(&row.new_text),
            )
        } else {
            (Vec::new(), Vec::new())
        };

        let mut old_block = render_side(
            row,
            &SideContext {
                side: Side::Old,
                pane_width: old_width,
                number_width: old_number_width,
                marker,
                ranges: &old_ranges,
            },
            comments,
        );
        let mut new_block = render_side(
            row,
            &SideContext {
                side: Side::New,
                pane_width: new_width,
                number_width: new_number_width,
                marker,
                ranges: &new_ranges,
            },
            comments,
        );

        let height = old_block.len().max(new_block.len()).max(1);
        let old_pad = row_background(row.kind, Side::Old);
        let new_pad = row_background(row.kind, Side::New);
        old_block.resize_with(height, || fit_spans(Vec::new(), old_width, old_pad));
        new_block.resize_with(height, || fit_spans(Vec::new(), new_width, new_pad));

        output.row_starts.push(output.old_lines.len());
        output.row_heights.push(height);
        output.old_lines.extend(old_block);
        output.new_lines.extend(new_block);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::{
        CommentLookup, GutterMarker, MarkersOnly, NoComments, SplitRender, render_split,
    };
    use crate::model::{DiffRow, RowKind, Side};
    use ratatui::{style::Color, text::Line};

    struct OneComment {
        line: u32,
        side: Side,
        body: &'static str,
    }

    impl CommentLookup for OneComment {
        fn has_comment(&self, _path: &str, line: u32, side: Side) -> bool {
            line == self.line && side == self.side
        }

        fn comment_text(&self, path: &str, line: u32, side: Side) -> Option<&str> {
            self.has_comment(path, line, side).then_some(self.body)
        }
    }

    fn row(kind: RowKind, old: Option<(u32, &str)>, new: Option<(u32, &str)>) -> DiffRow {
        DiffRow {
            kind,
            old_line: old.map(|(line, _)| line),
            new_line: new.map(|(line, _)| line),
            old_text: old.map(|(_, text)| text.to_string()).unwrap_or_default(),
            new_text: new.map(|(_, text)| text.to_string()).unwrap_or_default(),
            path: "src/lib.rs".to_string(),
            hunk_id: 0,
        }
    }

    fn header(text: &str) -> DiffRow {
        DiffRow {
            kind: RowKind::HunkHeader,
            old_line: None,
            new_line: None,
            old_text: text.to_string(),
            new_text: String::new(),
            path: "src/lib.rs".to_string(),
            hunk_id: 0,
        }
    }

    fn plain(line: &Line<'_>) -> String {
        line.spans
            .iter()
            .map(|span| span.content.as_ref())
            .collect()
    }

    fn assert_geometry(render: &SplitRender, old_width: usize, new_width: usize) {
        assert_eq!(render.old_lines.len(), render.new_lines.len());
        assert!(render.old_lines.iter().all(|line| line.width() == old_width));
        assert!(render.new_lines.iter().all(|line| line.width() == new_width));
        let mut expected_start = 0;
        for (start, height) in render.row_starts.iter().zip(&render.row_heights) {
            assert_eq!(*start, expected_start);
            assert!(*height >= 1);
            expected_start += height;
        }
        assert_eq!(expected_start, render.total_lines());
    }

    #[test]
    fn gutter_markers_render_four_states() {
        assert_eq!(GutterMarker::new(false, false).symbol(), "   ");
        assert_eq!(GutterMarker::new(true, false).symbol(), ">  ");
        assert_eq!(GutterMarker::new(false, true).symbol(), " C ");
        assert_eq!(GutterMarker::new(true, true).symbol(), ">C ");
    }

    #[test]
    fn delete_row_shows_sign_and_padded_number() {
        let rows = [row(RowKind::Delete, Some((5, "gone")), None)];
        let render = render_split(&rows, 30, 30, None, &NoComments);
        assert!(plain(&render.old_lines[0]).contains("-   5 gone"));
        assert_eq!(plain(&render.new_lines[0]).trim(), "");
        assert_geometry(&render, 30, 30);
    }

    #[test]
    fn cursor_marker_shows_on_blank_side() {
        let rows = [row(RowKind::Delete, Some((5, "gone")), None)];
        let render = render_split(&rows, 30, 30, Some(0), &NoComments);
        assert_eq!(plain(&render.new_lines[0]).trim_end(), ">");
        assert!(plain(&render.old_lines[0]).starts_with(">  -"));
    }

    #[test]
    fn comment_on_either_side_marks_both_gutters() {
        let rows = [row(RowKind::Change, Some((3, "a")), Some((3, "b")))];
        let lookup = OneComment {
            line: 3,
            side: Side::New,
            body: "note",
        };
        let render = render_split(&rows, 30, 30, Some(0), &MarkersOnly(&lookup));
        assert!(plain(&render.old_lines[0]).starts_with(">C "));
        assert!(plain(&render.new_lines[0]).starts_with(">C "));
        assert_eq!(render.total_lines(), 1);
    }

    #[test]
    fn long_lines_wrap_with_aligned_continuations() {
        let rows = [row(
            RowKind::Add,
            None,
            Some((1, "abcdefghijklmnopqrstuvwxyz")),
        )];
        let render = render_split(&rows, 22, 22, None, &NoComments);
        assert_eq!(render.row_heights, [2]);
        let continuation = plain(&render.new_lines[1]);
        assert!(continuation.starts_with("         "));
        assert!(!continuation[9..].starts_with(' '));
        assert_geometry(&render, 22, 22);
    }

    #[test]
    fn shorter_side_is_padded_to_row_height() {
        let rows = [row(
            RowKind::Change,
            Some((1, "short")),
            Some((1, "a much longer replacement line that wraps")),
        )];
        let render = render_split(&rows, 20, 20, None, &NoComments);
        assert!(render.row_heights[0] > 1);
        assert_geometry(&render, 20, 20);
        assert_eq!(plain(&render.old_lines[1]).trim(), "");
    }

    #[test]
    fn changed_words_are_highlighted() {
        let rows = [row(
            RowKind::Change,
            Some((1, "alpha beta")),
            Some((1, "alpha zeta")),
        )];
        let render = render_split(&rows, 40, 40, None, &NoComments);
        let highlighted = |line: &Line<'_>| -> Vec<String> {
            line.spans
                .iter()
                .filter(|span| {
                    matches!(
                        span.style.bg,
                        Some(Color::Rgb(110, 40, 40)) | Some(Color::Rgb(36, 90, 44))
                    )
                })
                .map(|span| span.content.to_string())
                .collect()
        };
        assert_eq!(highlighted(&render.old_lines[0]), ["beta"]);
        assert_eq!(highlighted(&render.new_lines[0]), ["zeta"]);
    }

    #[test]
    fn inline_comment_body_adds_lines_under_content() {
        let rows = [row(RowKind::Context, Some((7, "x")), Some((7, "x")))];
        let lookup = OneComment {
            line: 7,
            side: Side::Old,
            body: "first\nsecond",
        };
        let render = render_split(&rows, 30, 30, None, &lookup);
        assert_eq!(render.row_heights, [3]);
        let body_line = plain(&render.old_lines[1]);
        assert_eq!(body_line.trim(), "first");
        assert_eq!(body_line.find('f'), Some(3 + 6));
        assert_geometry(&render, 30, 30);
    }

    #[test]
    fn cursor_does_not_change_layout() {
        let rows = [
            header("@@ -1,2 +1,2 @@"),
            row(RowKind::Change, Some((1, "one two three")), Some((1, "one 2 three"))),
            row(RowKind::Context, Some((2, "tail")), Some((2, "tail"))),
        ];
        let without = render_split(&rows, 12, 14, None, &NoComments);
        let with = render_split(&rows, 12, 14, Some(1), &NoComments);
        assert_eq!(without.row_heights, with.row_heights);
        assert_geometry(&with, 12, 14);
    }

    #[test]
    fn header_text_shows_on_both_panes() {
        let rows = [header("@@ -1 +1 @@ fn main")];
        let render = render_split(&rows, 40, 40, None, &NoComments);
        assert!(plain(&render.old_lines[0]).contains("@@ -1 +1 @@ fn main"));
        assert!(plain(&render.new_lines[0]).contains("@@ -1 +1 @@ fn main"));
    }

    #[test]
    fn emoji_lines_keep_exact_pane_width() {
        let hearts = "\u{2764}\u{fe0f}".repeat(4);
        let rows = [row(RowKind::Add, None, Some((1, hearts.as_str())))];
        let render = render_split(&rows, 20, 12, None, &NoComments);
        assert!(render.row_heights[0] > 1);
        assert_geometry(&render, 20, 12);

        let changed = [row(
            RowKind::Change,
            Some((1, "\u{2764}\u{fe0f} old tail")),
            Some((1, "\u{2764}\u{fe0f} new tail")),
        )];
        assert_geometry(&render_split(&changed, 17, 17, None, &NoComments), 17, 17);
    }

    #[test]
    fn zero_widths_are_coerced() {
        let rows = [
            header("@@ -1 +1 @@"),
            row(RowKind::Change, Some((1, "a\tb")), Some((1, "日本"))),
        ];
        let render = render_split(&rows, 0, 0, Some(1), &NoComments);
        assert_geometry(&render, 1, 1);
    }

    #[test]
    fn number_width_grows_with_large_line_numbers() {
        let rows = [row(RowKind::Context, Some((12345, "x")), Some((9, "x")))];
        let render = render_split(&rows, 30, 30, None, &NoComments);
        assert!(plain(&render.old_lines[0]).starts_with("     12345 x"));
        assert!(plain(&render.new_lines[0]).starts_with("       9 x"));
    }

    #[test]
    fn visual_lines_map_back_to_rows() {
        let rows = [
            row(RowKind::Context, Some((1, "a")), Some((1, "a"))),
            row(RowKind::Add, None, Some((2, "a long line that needs wrapping"))),
            row(RowKind::Context, Some((2, "b")), Some((3, "b"))),
        ];
        let render = render_split(&rows, 20, 20, None, &NoComments);
        let second = render.visual_range(1).expect("row 1 should have a range");
        assert_eq!(second.start, 1);
        assert_eq!(render.row_for_visual_line(0), Some(0));
        assert_eq!(render.row_for_visual_line(second.end - 1), Some(1));
        assert_eq!(render.row_for_visual_line(second.end), Some(2));
        assert_eq!(render.row_for_visual_line(render.total_lines()), None);
        assert_eq!(render.visual_range(3), None);
    }

    #[test]
    fn empty_rows_render_nothing() {
        let render = render_split(&[], 10, 10, None, &NoComments);
        assert_eq!(render.total_lines(), 0);
        assert_eq!(render.row_for_visual_line(0), None);
    }
}
