use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use tracing::debug;

use crate::{
    comments::{
        Comment, CommentAnchor, CommentBook, StaleMap, comment_rows, draft_comment,
        find_anchor_row, is_stale, next_comment_row, pick_anchor,
    },
    config::Config,
    export::export_plain,
    frame::FrameLayout,
    loader::{DiffOutcome, LoadRequest, LoadResult},
    model::{DiffMode, DiffRow, FileItem, Side},
    reconcile::reconcile_rows,
    render::{CommentLookup, MarkersOnly, SplitRender, render_split},
};

const MOUSE_WHEEL_SCROLL_LINES: isize = 3;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Focus {
    Files,
    Diff,
    /// Full-width list of every comment across files.
    Comments,
}

#[derive(Debug)]
pub(crate) enum DiffView {
    Idle,
    Loading,
    Rows(Vec<DiffRow>),
    Empty,
    Failed(String),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum InputMode {
    Normal,
    Comment {
        anchor: CommentAnchor,
        /// Diff row the draft is taken from; `None` when editing from the
        /// comments view.
        row: Option<usize>,
        editing: bool,
        buffer: String,
    },
    ConfirmClear,
}

#[derive(Clone, Copy, Debug, Default)]
struct Generations {
    files: u64,
    diff: u64,
    stale: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct RenderKey {
    rows_revision: u64,
    cursor: usize,
    old_width: usize,
    new_width: usize,
    comment_revision: u64,
}

struct RenderCache {
    key: RenderKey,
    render: SplitRender,
}

#[derive(Debug, Default)]
pub(crate) struct KeypressOutcome {
    pub(crate) should_quit: bool,
    pub(crate) requests: Vec<LoadRequest>,
    pub(crate) persist: bool,
    pub(crate) export: Option<String>,
}

impl KeypressOutcome {
    fn quit() -> Self {
        Self {
            should_quit: true,
            ..Self::default()
        }
    }
}

pub(crate) struct AppState {
    pub(crate) mode: DiffMode,
    pub(crate) focus: Focus,
    pub(crate) files: Vec<FileItem>,
    pub(crate) file_cursor: usize,
    pub(crate) selected_path: Option<String>,
    pub(crate) diff: DiffView,
    pub(crate) diff_cursor: usize,
    pub(crate) diff_scroll: usize,
    pub(crate) file_pane_visible: bool,
    pub(crate) comments: CommentBook,
    pub(crate) stale: StaleMap,
    pub(crate) alert: Option<String>,
    pub(crate) input: InputMode,
    pub(crate) comments_cursor: usize,
    pub(crate) show_help: bool,
    comments_return: Focus,
    pending_jump: Option<CommentAnchor>,
    inline_comments: bool,
    jump_padding: usize,
    export_title: String,
    comment_revision: u64,
    rows_revision: u64,
    loaded_path: Option<String>,
    pending_padding: Option<usize>,
    settled_cursor: Option<usize>,
    generations: Generations,
    render_cache: Option<RenderCache>,
}

impl AppState {
    pub(crate) fn new(config: &Config, comments: Vec<Comment>) -> Self {
        Self {
            mode: config.mode,
            focus: Focus::Files,
            files: Vec::new(),
            file_cursor: 0,
            selected_path: None,
            diff: DiffView::Idle,
            diff_cursor: 0,
            diff_scroll: 0,
            file_pane_visible: true,
            comments: CommentBook::new(comments),
            stale: StaleMap::new(),
            alert: None,
            input: InputMode::Normal,
            comments_cursor: 0,
            show_help: false,
            comments_return: Focus::Files,
            pending_jump: None,
            inline_comments: config.inline_comments,
            jump_padding: config.jump_padding,
            export_title: config.export_title.clone(),
            comment_revision: 0,
            rows_revision: 0,
            loaded_path: None,
            pending_padding: None,
            settled_cursor: None,
            generations: Generations::default(),
            render_cache: None,
        }
    }

    pub(crate) fn initial_requests(&mut self) -> Vec<LoadRequest> {
        vec![self.files_request()]
    }

    pub(crate) fn rows(&self) -> &[DiffRow] {
        match &self.diff {
            DiffView::Rows(rows) => rows,
            _ => &[],
        }
    }

    pub(crate) fn stale_count(&self) -> usize {
        self.comments.stale_count(&self.stale)
    }

    fn set_alert(&mut self, message: impl Into<String>) {
        self.alert = Some(message.into());
    }

    fn comments_changed(&mut self) {
        self.comment_revision += 1;
    }

    fn files_request(&mut self) -> LoadRequest {
        self.generations.files += 1;
        LoadRequest::Files {
            generation: self.generations.files,
        }
    }

    fn diff_request(&mut self) -> Option<LoadRequest> {
        let path = self.selected_path.clone()?;
        if self.loaded_path.as_deref() != Some(path.as_str()) {
            self.diff = DiffView::Loading;
            self.rows_revision += 1;
        }
        self.generations.diff += 1;
        Some(LoadRequest::Diff {
            generation: self.generations.diff,
            path,
            mode: self.mode,
        })
    }

    fn stale_request(&mut self) -> Option<LoadRequest> {
        if self.comments.is_empty() {
            self.stale.clear();
            return None;
        }
        self.generations.stale += 1;
        Some(LoadRequest::Stale {
            generation: self.generations.stale,
            changed: self.files.iter().map(|file| file.path.clone()).collect(),
            comments: self.comments.sorted(),
            mode: self.mode,
        })
    }

    fn open_file(&mut self, index: usize) -> Option<LoadRequest> {
        let path = self.files.get(index)?.path.clone();
        self.file_cursor = index;
        self.selected_path = Some(path);
        self.diff_request()
    }

    /// Applies a background result, dropping results that a newer request of
    /// the same kind has superseded. Returns follow-up requests.
    pub(crate) fn apply_result(&mut self, result: LoadResult) -> Vec<LoadRequest> {
        let mut requests = Vec::new();
        match result {
            LoadResult::Files { generation, files } => {
                if generation != self.generations.files {
                    debug!(generation, "dropping outdated file list");
                    return requests;
                }
                match files {
                    Ok(files) => {
                        self.apply_files(files);
                        requests.extend(self.diff_request());
                        requests.extend(self.stale_request());
                    }
                    Err(message) => self.set_alert(format!("Failed to list files: {message}")),
                }
            }
            LoadResult::Diff {
                generation,
                path,
                mode,
                outcome,
            } => {
                if generation != self.generations.diff
                    || mode != self.mode
                    || self.selected_path.as_deref() != Some(path.as_str())
                {
                    debug!(generation, path = %path, "dropping outdated diff");
                    return requests;
                }
                self.apply_diff(path, outcome);
            }
            LoadResult::Stale { generation, report } => {
                if generation != self.generations.stale {
                    debug!(generation, "dropping outdated staleness report");
                    return requests;
                }
                self.stale = report.stale;
                self.comments_changed();
                if let Some(error) = report.first_error {
                    self.set_alert(format!("Some comments could not be checked: {error}"));
                }
            }
        }
        requests
    }

    fn apply_files(&mut self, files: Vec<FileItem>) {
        self.files = files;
        if self.files.is_empty() {
            self.file_cursor = 0;
            self.selected_path = None;
            self.loaded_path = None;
            self.diff = DiffView::Idle;
            self.rows_revision += 1;
            return;
        }

        let selected_index = self
            .selected_path
            .as_deref()
            .and_then(|path| self.files.iter().position(|file| file.path == path));
        match selected_index {
            Some(index) => self.file_cursor = index,
            None => {
                self.file_cursor = self.file_cursor.min(self.files.len() - 1);
                self.selected_path = Some(self.files[self.file_cursor].path.clone());
            }
        }
    }

    fn mark_path_stale(&mut self, path: &str) {
        for comment in self.comments.sorted() {
            if comment.path == path {
                self.stale.insert(comment.key(), true);
            }
        }
    }

    fn apply_diff(&mut self, path: String, outcome: DiffOutcome) {
        let same_file = self.loaded_path.as_deref() == Some(path.as_str());
        match outcome {
            DiffOutcome::Rows(rows) => {
                let path_comments: Vec<Comment> = self
                    .comments
                    .sorted()
                    .into_iter()
                    .filter(|comment| comment.path == path)
                    .collect();
                self.stale.extend(reconcile_rows(&path_comments, &rows));
                self.diff = DiffView::Rows(rows);
            }
            DiffOutcome::Empty => {
                self.mark_path_stale(&path);
                self.diff = DiffView::Empty;
            }
            DiffOutcome::Failed(message) => {
                self.mark_path_stale(&path);
                self.diff = DiffView::Failed(message);
            }
        }
        self.rows_revision += 1;
        self.comments_changed();
        self.loaded_path = Some(path);

        if same_file {
            self.diff_cursor = self.diff_cursor.min(self.rows().len().saturating_sub(1));
        } else {
            self.diff_cursor = self
                .rows()
                .iter()
                .position(|row| !row.is_header())
                .unwrap_or(0);
            self.diff_scroll = 0;
        }

        if let Some(anchor) = self.pending_jump.take() {
            let loaded = self.loaded_path.as_deref() == Some(anchor.path.as_str());
            if loaded && !self.jump_to_anchor(&anchor) {
                self.set_alert(format!("Comment on {anchor} is no longer in the diff."));
            }
        }
    }

    fn compute_render(&self, old_width: usize, new_width: usize) -> SplitRender {
        let cursor = Some(self.diff_cursor);
        if self.inline_comments {
            render_split(self.rows(), old_width, new_width, cursor, &self.comments)
        } else {
            render_split(
                self.rows(),
                old_width,
                new_width,
                cursor,
                &MarkersOnly(&self.comments),
            )
        }
    }

    /// Split layout of the current rows, recomputed only when rows, cursor,
    /// widths or comments changed.
    pub(crate) fn split_render(&mut self, old_width: usize, new_width: usize) -> &SplitRender {
        let key = RenderKey {
            rows_revision: self.rows_revision,
            cursor: self.diff_cursor,
            old_width,
            new_width,
            comment_revision: self.comment_revision,
        };
        let cache = match self.render_cache.take() {
            Some(cache) if cache.key == key => cache,
            _ => RenderCache {
                key,
                render: self.compute_render(old_width, new_width),
            },
        };
        &self.render_cache.insert(cache).render
    }

    /// Adjusts the scroll offset so the cursor row is on screen. A freshly
    /// moved cursor is shown whole when it fits; comment jumps keep padding
    /// lines above the target.
    pub(crate) fn settle_viewport(&mut self, layout: &FrameLayout) {
        let height = layout.body_height.max(1);
        let cursor = self.diff_cursor;
        let cursor_moved = self.settled_cursor != Some(cursor);
        let padding = self.pending_padding.take();
        let mut scroll = self.diff_scroll;

        let render = self.split_render(layout.old_width, layout.new_width);
        let total = render.total_lines();
        let Some(range) = render.visual_range(cursor) else {
            self.diff_scroll = 0;
            return;
        };

        if let Some(padding) = padding {
            scroll = range.start.saturating_sub(padding);
        } else if range.start < scroll {
            scroll = range.start;
        } else if range.start >= scroll + height || (cursor_moved && range.end > scroll + height)
        {
            scroll = range.end.saturating_sub(height).min(range.start);
        }

        self.diff_scroll = scroll.min(total.saturating_sub(height)).min(range.start);
        self.settled_cursor = Some(cursor);
    }

    /// Scrolls the diff by `delta` lines, dragging the cursor along when it
    /// would leave the screen.
    fn scroll_lines(&mut self, layout: &FrameLayout, delta: isize) {
        let height = layout.body_height.max(1);
        let cursor = self.diff_cursor;
        let scroll = self.diff_scroll;
        let render = self.split_render(layout.old_width, layout.new_width);
        let total = render.total_lines();
        if total == 0 {
            return;
        }

        let new_scroll = scroll
            .saturating_add_signed(delta)
            .min(total.saturating_sub(height));
        let bottom = (new_scroll + height - 1).min(total - 1);
        let cursor_start = render.visual_range(cursor).map_or(0, |range| range.start);

        let new_cursor = if cursor_start < new_scroll {
            let top = render.row_for_visual_line(new_scroll).unwrap_or(cursor);
            if render.visual_range(top).is_some_and(|range| range.start < new_scroll)
                && top + 1 < render.row_starts.len()
            {
                top + 1
            } else {
                top
            }
        } else if cursor_start > bottom {
            render.row_for_visual_line(bottom).unwrap_or(cursor)
        } else {
            cursor
        };

        self.diff_scroll = new_scroll;
        self.diff_cursor = new_cursor;
        self.settled_cursor = Some(new_cursor);
    }

    fn move_diff_cursor(&mut self, delta: isize) {
        let last = self.rows().len().saturating_sub(1);
        self.diff_cursor = self.diff_cursor.saturating_add_signed(delta).min(last);
    }

    fn move_file_cursor(&mut self, delta: isize) {
        let last = self.files.len().saturating_sub(1);
        self.file_cursor = self.file_cursor.saturating_add_signed(delta).min(last);
    }

    /// Anchor for editing or deleting on the cursor row: the side a new
    /// comment would use, else the other side if it carries a comment.
    fn existing_anchor(&self) -> Option<(usize, CommentAnchor)> {
        let row = self.rows().get(self.diff_cursor)?;
        let other_sides = [Side::Old, Side::New].into_iter().filter_map(|side| {
            row.line(side)
                .map(|line| CommentAnchor::new(row.path.clone(), side, line))
        });
        pick_anchor(row)
            .into_iter()
            .chain(other_sides)
            .find(|anchor| {
                self.comments
                    .has_comment(&anchor.path, anchor.line, anchor.side)
            })
            .map(|anchor| (self.diff_cursor, anchor))
    }

    fn start_comment(&mut self) {
        let Some(anchor) = self.rows().get(self.diff_cursor).and_then(pick_anchor) else {
            self.set_alert("Cannot comment on this line.");
            return;
        };
        let buffer = self
            .comments
            .get(&anchor.key())
            .map(|comment| comment.body.clone())
            .unwrap_or_default();
        let editing = !buffer.is_empty();
        self.input = InputMode::Comment {
            anchor,
            row: Some(self.diff_cursor),
            editing,
            buffer,
        };
    }

    fn start_edit(&mut self) {
        let Some((row, anchor)) = self.existing_anchor() else {
            self.set_alert("No comment on this line.");
            return;
        };
        let buffer = self
            .comments
            .get(&anchor.key())
            .map(|comment| comment.body.clone())
            .unwrap_or_default();
        self.input = InputMode::Comment {
            anchor,
            row: Some(row),
            editing: true,
            buffer,
        };
    }

    fn delete_comment(&mut self, outcome: &mut KeypressOutcome) {
        let Some((_, anchor)) = self.existing_anchor() else {
            self.set_alert("No comment on this line.");
            return;
        };
        self.remove_comment(&anchor, outcome);
    }

    fn remove_comment(&mut self, anchor: &CommentAnchor, outcome: &mut KeypressOutcome) {
        let key = anchor.key();
        self.comments.remove(&key);
        self.stale.remove(&key);
        self.comments_changed();
        self.set_alert(format!("Deleted comment on {anchor}."));
        outcome.persist = true;
    }

    fn submit_comment(&mut self, outcome: &mut KeypressOutcome) {
        let InputMode::Comment {
            anchor,
            row,
            editing,
            buffer,
        } = std::mem::replace(&mut self.input, InputMode::Normal)
        else {
            return;
        };

        let body = buffer.trim();
        if body.is_empty() {
            self.set_alert("Comment is empty; nothing saved.");
            return;
        }

        let key = anchor.key();
        let saved = if editing && self.comments.set_body(&key, body) {
            true
        } else if let Some(comment) =
            row.and_then(|row| draft_comment(self.rows(), row, body, Utc::now()))
        {
            self.comments.upsert(comment);
            true
        } else {
            false
        };

        if saved {
            self.stale.insert(key, false);
            self.comments_changed();
            self.set_alert(format!("Saved comment on {anchor}."));
            outcome.persist = true;
        } else {
            self.set_alert("Line is no longer in the diff; comment not saved.");
        }
    }

    fn jump_to_anchor(&mut self, anchor: &CommentAnchor) -> bool {
        match find_anchor_row(self.rows(), anchor) {
            Some(row) => {
                self.diff_cursor = row;
                self.pending_padding = Some(self.jump_padding);
                true
            }
            None => false,
        }
    }

    fn toggle_comments_view(&mut self) {
        if self.focus == Focus::Comments {
            self.focus = self.comments_return;
            if self.focus == Focus::Files {
                self.file_pane_visible = true;
            }
        } else {
            self.comments_return = self.focus;
            self.focus = Focus::Comments;
            self.move_comments_cursor(0);
        }
    }

    fn move_comments_cursor(&mut self, delta: isize) {
        let last = self.comments.len().saturating_sub(1);
        self.comments_cursor = self.comments_cursor.saturating_add_signed(delta).min(last);
    }

    fn selected_comment(&mut self) -> Option<Comment> {
        let comment = self.comments.sorted().into_iter().nth(self.comments_cursor);
        if comment.is_none() {
            self.set_alert("No comments.");
        }
        comment
    }

    /// Leaves the comments view for the diff at the selected comment,
    /// loading its file first when another one is open.
    fn open_selected_comment(&mut self) -> Option<LoadRequest> {
        let comment = self.selected_comment()?;
        if is_stale(&self.stale, &comment.key()) {
            self.set_alert("Selected comment is stale and cannot be jumped to.");
            return None;
        }

        let anchor = comment.anchor();
        let loaded = self.loaded_path.as_deref() == Some(anchor.path.as_str())
            && self.selected_path == self.loaded_path;
        if loaded && self.jump_to_anchor(&anchor) {
            self.focus = Focus::Diff;
            return None;
        }

        let Some(index) = self.files.iter().position(|file| file.path == anchor.path) else {
            self.set_alert(format!("{} is not in the changed files.", anchor.path));
            return None;
        };
        self.focus = Focus::Diff;
        self.pending_jump = Some(anchor);
        self.open_file(index)
    }

    fn edit_selected_comment(&mut self) {
        let Some(comment) = self.selected_comment() else {
            return;
        };
        self.input = InputMode::Comment {
            anchor: comment.anchor(),
            row: None,
            editing: true,
            buffer: comment.body,
        };
    }

    fn delete_selected_comment(&mut self, outcome: &mut KeypressOutcome) {
        let Some(comment) = self.selected_comment() else {
            return;
        };
        self.remove_comment(&comment.anchor(), outcome);
        self.move_comments_cursor(0);
    }

    fn jump_to_comment(&mut self, forward: bool) {
        let rows = comment_rows(self.rows(), &self.comments, &self.stale);
        match next_comment_row(&rows, self.diff_cursor, forward) {
            Some(row) => {
                self.diff_cursor = row;
                self.pending_padding = Some(self.jump_padding);
            }
            None => self.set_alert("No comments in current diff."),
        }
    }

    fn export(&mut self, outcome: &mut KeypressOutcome) {
        let comments = self.comments.exportable(&self.stale);
        if comments.is_empty() {
            self.set_alert("No comments to export.");
            return;
        }
        outcome.export = Some(export_plain(&comments, &self.export_title));
    }

    fn refresh_requests(&mut self) -> Vec<LoadRequest> {
        vec![self.files_request()]
    }
}

fn handle_comment_input(key: KeyEvent, app: &mut AppState) -> KeypressOutcome {
    let mut outcome = KeypressOutcome::default();
    match key.code {
        KeyCode::Enter => app.submit_comment(&mut outcome),
        KeyCode::Esc => app.input = InputMode::Normal,
        KeyCode::Backspace => {
            if let InputMode::Comment { buffer, .. } = &mut app.input {
                buffer.pop();
            }
        }
        KeyCode::Char(ch)
            if !key.modifiers.contains(KeyModifiers::CONTROL)
                && !key.modifiers.contains(KeyModifiers::ALT) =>
        {
            if let InputMode::Comment { buffer, .. } = &mut app.input {
                buffer.push(ch);
            }
        }
        _ => {}
    }
    outcome
}

fn handle_confirm_clear(key: KeyEvent, app: &mut AppState) -> KeypressOutcome {
    let mut outcome = KeypressOutcome::default();
    app.input = InputMode::Normal;
    if matches!(key.code, KeyCode::Char('y') | KeyCode::Enter) {
        let count = app.comments.len();
        app.comments.clear();
        app.stale.clear();
        app.comments_changed();
        app.set_alert(format!("Cleared {count} comments."));
        outcome.persist = true;
    } else {
        app.set_alert("Clear cancelled.");
    }
    outcome
}

fn handle_comments_key(key: KeyEvent, app: &mut AppState) -> KeypressOutcome {
    let mut outcome = KeypressOutcome::default();
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return outcome;
    }
    match key.code {
        KeyCode::Char('q') => return KeypressOutcome::quit(),
        KeyCode::Char('m') | KeyCode::Esc => app.toggle_comments_view(),
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Char('j') | KeyCode::Down => app.move_comments_cursor(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_comments_cursor(-1),
        KeyCode::Char('g') | KeyCode::Home => app.comments_cursor = 0,
        KeyCode::Char('G') | KeyCode::End => app.move_comments_cursor(isize::MAX),
        KeyCode::Enter => outcome.requests.extend(app.open_selected_comment()),
        KeyCode::Char('e') => app.edit_selected_comment(),
        KeyCode::Char('d') => app.delete_selected_comment(&mut outcome),
        _ => {}
    }
    outcome
}

fn handle_files_key(key: KeyEvent, app: &mut AppState) -> KeypressOutcome {
    let mut outcome = KeypressOutcome::default();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.move_file_cursor(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_file_cursor(-1),
        KeyCode::Char('g') | KeyCode::Home => app.file_cursor = 0,
        KeyCode::Char('G') | KeyCode::End => app.move_file_cursor(isize::MAX),
        KeyCode::Enter => {
            outcome.requests.extend(app.open_file(app.file_cursor));
            app.focus = Focus::Diff;
        }
        _ => {}
    }
    outcome
}

fn handle_diff_key(key: KeyEvent, app: &mut AppState) -> KeypressOutcome {
    let mut outcome = KeypressOutcome::default();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.move_diff_cursor(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_diff_cursor(-1),
        KeyCode::Char('g') | KeyCode::Home => app.diff_cursor = 0,
        KeyCode::Char('G') | KeyCode::End => app.move_diff_cursor(isize::MAX),
        KeyCode::Char('c') => app.start_comment(),
        KeyCode::Char('e') => app.start_edit(),
        KeyCode::Char('d') => app.delete_comment(&mut outcome),
        KeyCode::Char('n') => app.jump_to_comment(true),
        KeyCode::Char('p') => app.jump_to_comment(false),
        _ => {}
    }
    outcome
}

pub(crate) fn handle_keypress(
    key: KeyEvent,
    app: &mut AppState,
    layout: &FrameLayout,
) -> KeypressOutcome {
    let control = key.modifiers.contains(KeyModifiers::CONTROL);
    if control && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C')) {
        return KeypressOutcome::quit();
    }

    match app.input {
        InputMode::Comment { .. } => return handle_comment_input(key, app),
        InputMode::ConfirmClear => return handle_confirm_clear(key, app),
        InputMode::Normal => {}
    }

    if app.show_help {
        app.show_help = false;
        return KeypressOutcome::default();
    }

    app.alert = None;
    if app.focus == Focus::Comments {
        return handle_comments_key(key, app);
    }
    let page = layout.body_height.max(1) as isize;
    let mut outcome = KeypressOutcome::default();

    match key.code {
        KeyCode::Char('f') if control => app.scroll_lines(layout, page),
        KeyCode::Char('b') if control => app.scroll_lines(layout, -page),
        KeyCode::Char('e') if control => app.scroll_lines(layout, 1),
        KeyCode::Char('y') if control => app.scroll_lines(layout, -1),
        KeyCode::PageDown => app.scroll_lines(layout, page),
        KeyCode::PageUp => app.scroll_lines(layout, -page),
        _ if control => {}
        KeyCode::Char('q') => return KeypressOutcome::quit(),
        KeyCode::Tab => {
            app.focus = match app.focus {
                Focus::Files => Focus::Diff,
                Focus::Diff | Focus::Comments => {
                    app.file_pane_visible = true;
                    Focus::Files
                }
            };
        }
        KeyCode::Char('z') => {
            app.file_pane_visible = !app.file_pane_visible;
            if !app.file_pane_visible {
                app.focus = Focus::Diff;
            }
        }
        KeyCode::Char('r') => {
            outcome.requests = app.refresh_requests();
            app.set_alert("Refreshing...");
        }
        KeyCode::Char('t') => {
            app.mode = app.mode.next();
            outcome.requests = app.refresh_requests();
            app.set_alert(format!("Diff mode: {}", app.mode));
        }
        KeyCode::Char('y') => app.export(&mut outcome),
        KeyCode::Char('m') => app.toggle_comments_view(),
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Char('C') => {
            if app.comments.is_empty() {
                app.set_alert("No comments to clear.");
            } else {
                app.input = InputMode::ConfirmClear;
            }
        }
        _ => {
            outcome = match app.focus {
                Focus::Files => handle_files_key(key, app),
                Focus::Diff => handle_diff_key(key, app),
                Focus::Comments => handle_comments_key(key, app),
            };
        }
    }

    outcome
}

pub(crate) fn handle_mouse(mouse: MouseEvent, app: &mut AppState, layout: &FrameLayout) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_lines(layout, -MOUSE_WHEEL_SCROLL_LINES),
        MouseEventKind::ScrollDown => app.scroll_lines(layout, MOUSE_WHEEL_SCROLL_LINES),
        _ => {}
    }
}
