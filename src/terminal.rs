use std::{
    io::{self, IsTerminal},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use crossterm::{
    cursor::{Hide, Show},
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
    text::Text,
    widgets::{Clear, Paragraph},
};
use tracing::{info, warn};

use crate::{
    app::{AppState, KeypressOutcome, handle_keypress, handle_mouse},
    clipboard::SessionClipboard,
    frame::{FrameLayout, layout_for, render_frame},
    loader::{LoadRequest, Loader},
    store::CommentStore,
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Side effects the interactive loop performs on behalf of the app state.
pub(crate) struct Session {
    pub(crate) loader: Loader,
    pub(crate) store: CommentStore,
    pub(crate) clipboard: SessionClipboard,
    pub(crate) file_pane_width: u16,
}

impl Session {
    fn send(&self, requests: Vec<LoadRequest>) -> Result<()> {
        for request in requests {
            self.loader.request(request)?;
        }
        Ok(())
    }

    fn current_layout(&self, app: &AppState) -> Result<FrameLayout> {
        let (columns, rows) =
            crossterm::terminal::size().context("failed to read terminal size")?;
        Ok(layout_for(app, self.file_pane_width, columns, rows))
    }

    fn apply_outcome(&mut self, outcome: KeypressOutcome, app: &mut AppState) -> Result<()> {
        self.send(outcome.requests)?;

        if outcome.persist {
            if let Err(error) = self.store.save(&app.comments.sorted()) {
                warn!(
                    path = %self.store.path().display(),
                    error = %format!("{error:#}"),
                    "failed to save comments"
                );
                app.alert = Some(format!("Failed to save comments: {error:#}"));
            }
        }

        if let Some(text) = outcome.export {
            let count = app.comments.exportable(&app.stale).len();
            app.alert = Some(match self.clipboard.copy(&text) {
                Ok(()) => format!("Copied {count} comments to clipboard."),
                Err(error) => {
                    warn!(error = %format!("{error:#}"), "clipboard copy failed");
                    format!("Clipboard unavailable: {error:#}")
                }
            });
        }

        Ok(())
    }
}

fn draw_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut AppState,
    file_pane_width: u16,
) -> Result<()> {
    let size = terminal.size()?;
    let layout = layout_for(app, file_pane_width, size.width, size.height);
    app.settle_viewport(&layout);

    let text = Text::from(render_frame(app, &layout));
    terminal.draw(move |frame| {
        let area = frame.area();
        frame.render_widget(Clear, area);
        frame.render_widget(Paragraph::new(text), area);
    })?;

    Ok(())
}

fn run_event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut AppState,
    session: &mut Session,
) -> Result<()> {
    session.send(app.initial_requests())?;
    draw_app(terminal, app, session.file_pane_width)?;

    loop {
        let mut dirty = false;
        for result in session.loader.drain() {
            let requests = app.apply_result(result);
            session.send(requests)?;
            dirty = true;
        }

        if event::poll(POLL_INTERVAL).context("failed to poll terminal events")? {
            match event::read().context("failed to read terminal event")? {
                Event::Key(key) => {
                    if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                        continue;
                    }

                    let layout = session.current_layout(app)?;
                    let outcome = handle_keypress(key, app, &layout);
                    if outcome.should_quit {
                        info!("quit requested");
                        break;
                    }
                    session.apply_outcome(outcome, app)?;
                }
                Event::Mouse(mouse) => {
                    let layout = session.current_layout(app)?;
                    handle_mouse(mouse, app, &layout);
                }
                Event::Resize(_, _) => {}
                Event::FocusGained | Event::FocusLost | Event::Paste(_) => {}
            }
            dirty = true;
        }

        if dirty {
            draw_app(terminal, app, session.file_pane_width)?;
        }
    }

    Ok(())
}

pub(crate) fn start_interactive_review(app: &mut AppState, mut session: Session) -> Result<()> {
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        bail!("Interactive TTY is required to run diffman; use --export or --check instead");
    }

    enable_raw_mode().context("failed to enable raw mode")?;

    let mut stdout = io::stdout();
    if let Err(error) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture, Hide) {
        let _ = disable_raw_mode();
        return Err(error).context("failed to initialize terminal UI");
    }

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = match Terminal::new(backend) {
        Ok(terminal) => terminal,
        Err(error) => {
            let _ = disable_raw_mode();
            let mut cleanup_stdout = io::stdout();
            let _ = execute!(
                cleanup_stdout,
                Show,
                DisableMouseCapture,
                LeaveAlternateScreen
            );
            return Err(error).context("failed to build terminal backend");
        }
    };

    let run_result = run_event_loop(&mut terminal, app, &mut session);

    let mut restore_error: Option<anyhow::Error> = None;
    if let Err(error) = disable_raw_mode() {
        restore_error = Some(error.into());
    }
    if let Err(error) = execute!(
        terminal.backend_mut(),
        Show,
        DisableMouseCapture,
        LeaveAlternateScreen
    ) {
        if restore_error.is_none() {
            restore_error = Some(error.into());
        }
    }
    if let Err(error) = terminal.show_cursor() {
        if restore_error.is_none() {
            restore_error = Some(error.into());
        }
    }

    if let Some(error) = restore_error {
        return Err(error).context("failed to restore terminal state");
    }

    run_result
}
