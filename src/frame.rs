use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

use crate::{
    app::{AppState, DiffView, Focus, InputMode},
    comments::is_stale,
    text::fit_line,
};

const HEADER_LINE_COUNT: usize = 1;
const FOOTER_LINE_COUNT: usize = 2;
const FRAME_DIVIDER_LINE_COUNT: usize = 2;
const MIN_BODY_LINE_COUNT: usize = 3;
const PANE_SEPARATOR: &str = " | ";
const HELP_TEXT: &str = "tab: focus  j/k: move  enter: open  c/e/d: comment  n/p: next/prev  m: comments  y: copy  C: clear  t: mode  r: refresh  z: files  ?: help  q: quit";
const HELP_LINES: [&str; 6] = [
    "Keys (any key closes this help)",
    "",
    "Global: q quit, tab switch focus, m comments view, t cycle diff mode, r refresh, y copy export, C clear all, ? help",
    "Files: j/k move, g/G top/bottom, enter open diff, z hide or show the file list",
    "Diff: j/k move, g/G top/bottom, ctrl-f/ctrl-b page, ctrl-e/ctrl-y scroll, c comment, e edit, d delete, n/p next/prev comment",
    "Comments view: j/k move, g/G top/bottom, enter jump to diff, e edit, d delete, m/esc close",
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct FrameLayout {
    pub(crate) columns: usize,
    pub(crate) body_height: usize,
    /// Zero when the file list is hidden.
    pub(crate) file_pane_width: usize,
    pub(crate) old_width: usize,
    pub(crate) new_width: usize,
}

impl FrameLayout {
    fn diff_width(&self) -> usize {
        self.old_width + PANE_SEPARATOR.len() + self.new_width
    }
}

pub(crate) fn get_body_line_count(rows: usize) -> usize {
    rows.saturating_sub(HEADER_LINE_COUNT + FOOTER_LINE_COUNT + FRAME_DIVIDER_LINE_COUNT)
        .max(MIN_BODY_LINE_COUNT)
}

pub(crate) fn create_frame_layout(
    columns: u16,
    rows: u16,
    file_pane_width: Option<u16>,
) -> FrameLayout {
    let columns = columns as usize;
    let file_pane_width = file_pane_width.map_or(0, |width| (width as usize).min(columns / 2));
    let diff_columns = if file_pane_width == 0 {
        columns
    } else {
        columns.saturating_sub(file_pane_width + PANE_SEPARATOR.len())
    };
    let available_pane_width = diff_columns.saturating_sub(PANE_SEPARATOR.len()).max(2);
    let old_width = (available_pane_width / 2).max(1);
    let new_width = available_pane_width.saturating_sub(old_width).max(1);

    FrameLayout {
        columns,
        body_height: get_body_line_count(rows as usize),
        file_pane_width,
        old_width,
        new_width,
    }
}

pub(crate) fn layout_for(
    app: &AppState,
    file_pane_width: u16,
    columns: u16,
    rows: u16,
) -> FrameLayout {
    let file_pane = app.file_pane_visible.then_some(file_pane_width);
    create_frame_layout(columns, rows, file_pane)
}

fn divider(columns: usize) -> Line<'static> {
    Line::from(fit_line(&"-".repeat(columns.max(1)), columns))
}

fn file_pane_lines(app: &AppState, layout: &FrameLayout) -> Vec<Line<'static>> {
    let width = layout.file_pane_width;
    let height = layout.body_height;
    let offset = app.file_cursor.saturating_sub(height.saturating_sub(1));

    (0..height)
        .map(|row| {
            let index = offset + row;
            let Some(file) = app.files.get(index) else {
                return Line::from(fit_line("", width));
            };
            let is_cursor = index == app.file_cursor;
            let is_open = app.selected_path.as_deref() == Some(file.path.as_str());
            let marker = if is_cursor { ">" } else { " " };
            let text = fit_line(&format!("{marker}{:>2} {}", file.status, file.path), width);

            let mut style = Style::default();
            if is_open {
                style = style.add_modifier(Modifier::BOLD);
            }
            if is_cursor && app.focus == Focus::Files {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Line::styled(text, style)
        })
        .collect()
}

fn placeholder(view: &DiffView) -> Option<String> {
    match view {
        DiffView::Idle => Some("No changed files.".to_string()),
        DiffView::Loading => Some("Loading diff...".to_string()),
        DiffView::Empty => Some("No textual diff for this file.".to_string()),
        DiffView::Failed(message) => Some(format!("Diff unavailable: {message}")),
        DiffView::Rows(_) => None,
    }
}

fn diff_pane_lines(app: &mut AppState, layout: &FrameLayout) -> Vec<Vec<Span<'static>>> {
    let height = layout.body_height;
    let diff_width = layout.diff_width();

    if let Some(message) = placeholder(&app.diff) {
        let style = Style::default().fg(Color::DarkGray);
        return (0..height)
            .map(|row| {
                let text = if row == 0 { message.as_str() } else { "" };
                vec![Span::styled(fit_line(text, diff_width), style)]
            })
            .collect();
    }

    let scroll = app.diff_scroll;
    let render = app.split_render(layout.old_width, layout.new_width);
    (0..height)
        .map(|row| {
            let line = scroll + row;
            match (render.old_lines.get(line), render.new_lines.get(line)) {
                (Some(old), Some(new)) => {
                    let mut spans = old.spans.clone();
                    spans.push(Span::raw(PANE_SEPARATOR));
                    spans.extend(new.spans.iter().cloned());
                    spans
                }
                _ => vec![Span::raw(fit_line("", diff_width))],
            }
        })
        .collect()
}

fn blank(columns: usize) -> Line<'static> {
    Line::from(fit_line("", columns))
}

fn help_lines(columns: usize, height: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = HELP_LINES
        .iter()
        .map(|text| Line::from(fit_line(text, columns)))
        .collect();
    lines[0] = lines[0].clone().style(Style::default().add_modifier(Modifier::BOLD));
    lines.resize_with(height, || blank(columns));
    lines
}

/// Every comment in anchor order; `!` marks stale ones.
fn comments_view_lines(app: &AppState, columns: usize, height: usize) -> Vec<Line<'static>> {
    let comments = app.comments.sorted();
    let mut lines = vec![
        Line::styled(
            fit_line(&format!("Comments ({})", comments.len()), columns),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        blank(columns),
    ];
    if comments.is_empty() {
        lines.push(Line::styled(
            fit_line("No comments.", columns),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let visible = height.saturating_sub(lines.len()).max(1);
    let offset = app.comments_cursor.saturating_sub(visible - 1);
    for (index, comment) in comments.iter().enumerate().skip(offset).take(visible) {
        let is_cursor = index == app.comments_cursor;
        let stale = is_stale(&app.stale, &comment.key());
        let text = format!(
            "{}{} {}:{}:{} | {}",
            if is_cursor { "> " } else { "  " },
            if stale { "!" } else { " " },
            comment.path,
            comment.side,
            comment.line,
            comment.body.trim().replace('\n', " / ")
        );
        let style = if is_cursor {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else if stale {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        lines.push(Line::styled(fit_line(&text, columns), style));
    }

    lines.resize_with(height, || blank(columns));
    lines
}

fn pane_lines(app: &mut AppState, layout: &FrameLayout) -> Vec<Line<'static>> {
    let files = if layout.file_pane_width > 0 {
        file_pane_lines(app, layout)
    } else {
        Vec::new()
    };
    let diff = diff_pane_lines(app, layout);

    diff.into_iter()
        .enumerate()
        .map(|(row, diff_spans)| {
            let mut spans = Vec::new();
            if let Some(file_line) = files.get(row) {
                spans.extend(
                    file_line
                        .spans
                        .iter()
                        .cloned()
                        .map(|span| span.patch_style(file_line.style)),
                );
                spans.push(Span::raw(PANE_SEPARATOR));
            }
            spans.extend(diff_spans);
            Line::from(spans)
        })
        .collect()
}

fn header_line(app: &AppState, columns: usize) -> Line<'static> {
    let path = app.selected_path.as_deref().unwrap_or("no file");
    let position = if app.files.is_empty() {
        "0/0".to_string()
    } else {
        format!("{}/{}", app.file_cursor + 1, app.files.len())
    };
    let text = format!(
        "diffman [{}]  {path}  file {position}  comments: {}  stale: {}",
        app.mode,
        app.comments.len(),
        app.stale_count()
    );
    Line::styled(
        fit_line(&text, columns),
        Style::default().add_modifier(Modifier::BOLD),
    )
}

fn status_line(app: &AppState, columns: usize) -> Line<'static> {
    match &app.input {
        InputMode::Comment {
            anchor,
            editing,
            buffer,
            ..
        } => {
            let verb = if *editing { "Edit" } else { "New" };
            Line::styled(
                fit_line(
                    &format!("{verb} comment on {anchor}: {buffer}_  (enter: save, esc: cancel)"),
                    columns,
                ),
                Style::default().fg(Color::Cyan),
            )
        }
        InputMode::ConfirmClear => Line::styled(
            fit_line(
                &format!("Clear all {} comments? (y/n)", app.comments.len()),
                columns,
            ),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        InputMode::Normal => match &app.alert {
            Some(alert) => Line::styled(
                fit_line(alert, columns),
                Style::default().fg(Color::Yellow),
            ),
            None if app.focus == Focus::Comments => {
                let count = app.comments.len();
                let position = if count == 0 {
                    0
                } else {
                    app.comments_cursor + 1
                };
                Line::from(fit_line(&format!("comment {position}/{count}"), columns))
            }
            None => {
                let rows = app.rows().len();
                let position = if rows == 0 {
                    0
                } else {
                    app.diff_cursor + 1
                };
                Line::from(fit_line(
                    &format!("row {position}/{rows}  scroll {}", app.diff_scroll),
                    columns,
                ))
            }
        },
    }
}

/// Composes the whole screen: header, body, footer. The body is the file
/// list and diff panes, or the comments view or help when open.
pub(crate) fn render_frame(app: &mut AppState, layout: &FrameLayout) -> Vec<Line<'static>> {
    let columns = layout.columns;
    let body = if app.show_help {
        help_lines(columns, layout.body_height)
    } else if app.focus == Focus::Comments {
        comments_view_lines(app, columns, layout.body_height)
    } else {
        pane_lines(app, layout)
    };

    let mut lines = Vec::with_capacity(layout.body_height + 5);
    lines.push(header_line(app, columns));
    lines.push(divider(columns));
    lines.extend(body);

    lines.push(divider(columns));
    lines.push(Line::from(fit_line(HELP_TEXT, columns)));
    lines.push(status_line(app, columns));
    lines
}
