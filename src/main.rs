//! # tb - Taskboard
//!
//! A single-list task tracker for the terminal, with an interactive board (TUI) and a
//! scriptable CLI over the same handlers.
//!
//! ## Key Features
//!
//! - **Subtasks with derived progress**: a task either tracks its own 0-100% progress or
//!   breaks into subtasks whose average it reports
//! - **Due-date filters**: All, Today, Pending, Overdue and Completed, plus text search
//! - **Ordered board**: tasks and subtasks keep the order you give them
//! - **Deferred deletes**: rows fade for a moment before removal
//! - **Local storage**: one JSON document in `~/.taskboard/`
//!
//! ## Quick Start
//!
//! ```bash
//! # Launch the board
//! tb
//!
//! # Add a task due Friday with two subtasks
//! tb add "Release 1.2" --due fri --subtask "Changelog" --subtask "Tag"
//!
//! # What is overdue?
//! tb list --filter overdue
//!
//! # Mark a subtask done
//! tb progress <TASK_ID> 100 --subtask <SUBTASK_ID>
//! ```
//!
//! Settings are read from `<data-dir>/config.toml` when it exists. While the board is
//! open, log output goes to `<data-dir>/taskboard.log` instead of the terminal.

use clap::Parser;

pub mod cli;
pub mod cmd;
pub mod config;
pub mod controller;
pub mod dates;
pub mod error;
pub mod filter;
pub mod form;
pub mod input;
pub mod logging;
pub mod progress;
pub mod store;
pub mod task;
pub mod view;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod enums;
    pub mod run;
    pub mod utils;
}

use cli::Cli;
use cmd::*;
use config::Config;
use controller::Controller;
use logging::LogTarget;
use store::Store;

fn main() {
    let cli = Cli::parse();

    let config = match Config::resolve(cli.data_dir.as_deref(), cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let command = cli.command.unwrap_or(Commands::Ui);

    // The board owns the terminal, so its logs go to a file.
    let level = logging::default_level(cli.verbose, config.log_level.as_deref());
    let log_path = config.log_path();
    let target = match command {
        Commands::Ui => LogTarget::File(&log_path),
        _ => LogTarget::Stderr,
    };
    logging::init(&level, target);
    tracing::debug!(data_dir = %config.data_dir.display(), key = %config.storage_key, "config resolved");

    if let Commands::Completions { shell } = command {
        cmd_completions(shell);
        return;
    }

    let store = Store::load(config.storage(), &config.storage_key);
    let mut ctl = Controller::new(store)
        .with_delete_delay(config.delete_delay)
        .with_filter(config.default_filter);

    match command {
        Commands::Ui => cmd_ui(ctl),
        Commands::Add { text, due, subtasks } => cmd_add(&mut ctl, text, due, subtasks),
        Commands::List { filter, search } => cmd_list(&mut ctl, filter, search),
        Commands::Show { id } => cmd_show(&ctl, id),
        Commands::Edit { id, text, due, subtasks, leaf } =>
            cmd_edit(&mut ctl, id, text, due, subtasks, leaf),
        Commands::Progress { id, value, subtask } => cmd_progress(&mut ctl, id, value, subtask),
        Commands::Move { id, to, subtask } => cmd_move(&mut ctl, id, to, subtask),
        Commands::Delete { id, subtask } => cmd_delete(&mut ctl, id, subtask),
        Commands::Completions { .. } => unreachable!("completions handled above"),
    }
}
