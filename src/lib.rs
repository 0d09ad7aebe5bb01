mod app;
mod cli;
mod clipboard;
mod comments;
mod config;
mod export;
mod frame;
mod git;
mod loader;
mod logging;
mod model;
mod parse;
mod reconcile;
mod render;
mod store;
mod terminal;
mod text;
mod worddiff;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

pub use crate::{
    comments::{
        Comment, CommentAnchor, CommentBook, StaleMap, anchor_key, comment_rows, context_around,
        draft_comment, find_anchor_row, hunk_header_for_row, next_comment_row, pick_anchor,
    },
    export::export_plain,
    git::{DiffSource, StatusSource},
    model::{DiffMode, DiffRow, FileItem, RowKind, Side, TextRange},
    parse::{ParseError, parse_unified_diff},
    reconcile::{AnchorLines, ReconcileError, StaleReport, reconcile, reconcile_rows},
    render::{
        CommentLookup, GUTTER_WIDTH, GutterMarker, MarkersOnly, NoComments, SplitRender,
        render_split,
    },
    worddiff::changed_word_ranges,
};

use crate::{
    app::AppState,
    cli::{RunAction, parse_cli_options},
    clipboard::SessionClipboard,
    comments::is_stale,
    config::Config,
    git::{GitDiffSource, GitStatusSource, git_dir, repository_root},
    loader::Loader,
    store::CommentStore,
    terminal::{Session, start_interactive_review},
};

fn stale_report<D, S>(
    comments: &[Comment],
    diff_source: &D,
    status_source: &S,
    mode: DiffMode,
) -> Result<StaleReport>
where
    D: DiffSource + ?Sized,
    S: StatusSource + ?Sized,
{
    let changed: Vec<String> = status_source
        .changed_files()?
        .into_iter()
        .map(|file| file.path)
        .collect();
    let report = reconcile(&changed, comments, diff_source, mode);
    if let Some(error) = &report.first_error {
        warn!(%error, "staleness check was incomplete");
        eprintln!("warning: {error}");
    }
    Ok(report)
}

fn print_export(comments: Vec<Comment>, report: &StaleReport, title: &str) {
    let book = CommentBook::new(comments);
    let exportable = book.exportable(&report.stale);
    if exportable.is_empty() {
        eprintln!("No comments to export.");
        return;
    }
    println!("{}", export_plain(&exportable, title));
}

fn print_check(comments: &[Comment], report: &StaleReport) -> Result<()> {
    let stale: Vec<&Comment> = comments
        .iter()
        .filter(|comment| is_stale(&report.stale, &comment.key()))
        .collect();
    if stale.is_empty() {
        println!("All {} comments still match the diff.", comments.len());
        return Ok(());
    }

    for comment in &stale {
        println!("{}  {}", comment.anchor(), comment.body);
    }
    bail!("{} of {} comments are stale", stale.len(), comments.len())
}

pub fn run() -> Result<()> {
    let options = parse_cli_options()?;
    let config = Config::load(options.config_path.as_deref())?.with_overrides(options.mode);
    let _log_guard = logging::init(options.log_file.as_deref())?;
    info!(mode = %config.mode, action = ?options.action, "starting diffman");

    let current_directory = std::env::current_dir().context("failed to read current directory")?;
    let repository_root = repository_root(&current_directory)?;
    let store = CommentStore::new(&git_dir(&repository_root)?);
    let comments = store.load()?;
    info!(count = comments.len(), path = %store.path().display(), "loaded comments");

    let status_source = GitStatusSource::new(repository_root.clone());
    let diff_source = GitDiffSource::new(repository_root);

    match options.action {
        RunAction::Export => {
            let report = stale_report(&comments, &diff_source, &status_source, config.mode)?;
            print_export(comments, &report, &config.export_title);
            Ok(())
        }
        RunAction::Check => {
            let report = stale_report(&comments, &diff_source, &status_source, config.mode)?;
            print_check(&comments, &report)
        }
        RunAction::Interactive => {
            let mut app = AppState::new(&config, comments);
            let session = Session {
                loader: Loader::spawn(diff_source, status_source)?,
                store,
                clipboard: SessionClipboard::new(),
                file_pane_width: config.file_pane_width,
            };
            start_interactive_review(&mut app, session)
        }
    }
}
