use std::{
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, JoinHandle},
};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::{
    comments::Comment,
    git::{DiffSource, StatusSource},
    model::{DiffMode, DiffRow, FileItem},
    parse::parse_unified_diff,
    reconcile::{StaleReport, reconcile},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum RequestKind {
    Files,
    Diff,
    Stale,
}

#[derive(Clone, Debug)]
pub(crate) enum LoadRequest {
    Files {
        generation: u64,
    },
    Diff {
        generation: u64,
        path: String,
        mode: DiffMode,
    },
    Stale {
        generation: u64,
        changed: Vec<String>,
        comments: Vec<Comment>,
        mode: DiffMode,
    },
}

impl LoadRequest {
    pub(crate) fn kind(&self) -> RequestKind {
        match self {
            LoadRequest::Files { .. } => RequestKind::Files,
            LoadRequest::Diff { .. } => RequestKind::Diff,
            LoadRequest::Stale { .. } => RequestKind::Stale,
        }
    }
}

#[derive(Debug)]
pub(crate) enum DiffOutcome {
    Rows(Vec<DiffRow>),
    Empty,
    Failed(String),
}

#[derive(Debug)]
pub(crate) enum LoadResult {
    Files {
        generation: u64,
        files: Result<Vec<FileItem>, String>,
    },
    Diff {
        generation: u64,
        path: String,
        mode: DiffMode,
        outcome: DiffOutcome,
    },
    Stale {
        generation: u64,
        report: StaleReport,
    },
}

/// Fetches and parses one file's diff. Fetch and parse failures are folded
/// into the outcome so the caller can show a placeholder.
pub(crate) fn load_diff<D: DiffSource + ?Sized>(
    source: &D,
    path: &str,
    mode: DiffMode,
) -> DiffOutcome {
    let raw = match source.diff(path, mode) {
        Ok(raw) => raw,
        Err(error) => {
            warn!(path, %error, "diff fetch failed");
            return DiffOutcome::Failed(format!("{error:#}"));
        }
    };
    if raw.trim().is_empty() {
        return DiffOutcome::Empty;
    }

    match parse_unified_diff(&raw, path) {
        Ok(rows) if rows.is_empty() => DiffOutcome::Empty,
        Ok(rows) => DiffOutcome::Rows(rows),
        Err(error) => {
            warn!(path, %error, "diff parse failed");
            DiffOutcome::Failed(error.to_string())
        }
    }
}

/// Keeps only the newest request of each kind, in arrival order.
fn collapse(batch: Vec<LoadRequest>) -> Vec<LoadRequest> {
    let kinds: Vec<RequestKind> = batch.iter().map(LoadRequest::kind).collect();
    batch
        .into_iter()
        .enumerate()
        .filter(|(index, request)| !kinds[index + 1..].contains(&request.kind()))
        .map(|(_, request)| request)
        .collect()
}

fn execute<D, S>(request: LoadRequest, diff_source: &D, status_source: &S) -> LoadResult
where
    D: DiffSource + ?Sized,
    S: StatusSource + ?Sized,
{
    match request {
        LoadRequest::Files { generation } => LoadResult::Files {
            generation,
            files: status_source
                .changed_files()
                .map_err(|error| format!("{error:#}")),
        },
        LoadRequest::Diff {
            generation,
            path,
            mode,
        } => {
            let outcome = load_diff(diff_source, &path, mode);
            LoadResult::Diff {
                generation,
                path,
                mode,
                outcome,
            }
        }
        LoadRequest::Stale {
            generation,
            changed,
            comments,
            mode,
        } => LoadResult::Stale {
            generation,
            report: reconcile(&changed, &comments, diff_source, mode),
        },
    }
}

/// Runs git work on a single background thread.
pub(crate) struct Loader {
    requests: Sender<LoadRequest>,
    results: Receiver<LoadResult>,
    _worker: JoinHandle<()>,
}

impl Loader {
    pub(crate) fn spawn<D, S>(diff_source: D, status_source: S) -> Result<Self>
    where
        D: DiffSource + Send + 'static,
        S: StatusSource + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel::<LoadRequest>();
        let (result_tx, result_rx) = mpsc::channel::<LoadResult>();

        let worker = thread::Builder::new()
            .name("diffman-loader".to_string())
            .spawn(move || {
                while let Ok(first) = request_rx.recv() {
                    let mut batch = vec![first];
                    batch.extend(request_rx.try_iter());
                    let received = batch.len();
                    let batch = collapse(batch);
                    debug!(received, running = batch.len(), "loader batch");

                    for request in batch {
                        let result = execute(request, &diff_source, &status_source);
                        if result_tx.send(result).is_err() {
                            return;
                        }
                    }
                }
            })
            .context("failed to start loader thread")?;

        Ok(Self {
            requests: request_tx,
            results: result_rx,
            _worker: worker,
        })
    }

    pub(crate) fn request(&self, request: LoadRequest) -> Result<()> {
        self.requests
            .send(request)
            .context("loader thread has stopped")
    }

    pub(crate) fn drain(&self) -> Vec<LoadResult> {
        self.results.try_iter().collect()
    }
}
