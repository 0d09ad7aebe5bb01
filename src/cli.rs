use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;

use crate::model::DiffMode;

#[derive(Parser, Debug)]
#[command(
    name = "diffman",
    about = "Reviews working-tree git diffs side by side and keeps per-line comments.",
    after_help = r#"Examples:
  diffman
  diffman --mode staged
  diffman --export > review.txt
  diffman --check

Key bindings:
  q / ctrl-c       quit
  tab              switch focus between files and diff
  j / k            move down / up
  enter            open selected file
  z                show / hide file list
  g / G            top / bottom
  ctrl-f / ctrl-b  page down / up
  ctrl-e / ctrl-y  scroll down / up
  c                comment on current line
  e                edit comment on current line
  d                delete comment on current line
  n / p            next / previous comment
  y                copy comments to clipboard
  C                clear all comments
  t                cycle diff mode (all, unstaged, staged)
  r                refresh
  m                comments view (enter: jump, e: edit, d: delete, esc: close)
  ?                key help"#
)]
struct Cli {
    /// Which changes to diff.
    #[arg(long, value_enum)]
    mode: Option<DiffMode>,
    /// Config file to use instead of the default location.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Print non-stale comments and exit.
    #[arg(long)]
    export: bool,
    /// Print stale comments and exit.
    #[arg(long)]
    check: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum RunAction {
    Interactive,
    Export,
    Check,
}

#[derive(Clone, Debug)]
pub(crate) struct CliOptions {
    pub(crate) mode: Option<DiffMode>,
    pub(crate) config_path: Option<PathBuf>,
    pub(crate) log_file: Option<PathBuf>,
    pub(crate) action: RunAction,
}

impl TryFrom<Cli> for CliOptions {
    type Error = anyhow::Error;

    fn try_from(value: Cli) -> Result<Self> {
        let action = match (value.export, value.check) {
            (true, true) => bail!("--export and --check cannot be used together"),
            (true, false) => RunAction::Export,
            (false, true) => RunAction::Check,
            (false, false) => RunAction::Interactive,
        };

        Ok(Self {
            mode: value.mode,
            config_path: value.config,
            log_file: value.log_file,
            action,
        })
    }
}

pub(crate) fn parse_cli_options() -> Result<CliOptions> {
    let cli = Cli::parse();
    CliOptions::try_from(cli)
}
