//! Command implementations for the CLI interface.
//!
//! Every subcommand goes through the same [`Controller`] as the TUI. Deletions are
//! flushed at once since there is no transition to wait for, and not-found ids are
//! reported on stderr with exit code 1.

use std::time::Instant;

use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::controller::{Controller, Outcome};
use crate::dates::{format_due_relative, now_ms, today};
use crate::error::ValidationError;
use crate::filter::Filter;
use crate::form::{TaskDraft, TaskForm};
use crate::progress::{aggregate_progress, display_progress, is_complete};
use crate::store::Storage;
use crate::task::{Id, Task};
use crate::input::InputField;
use crate::tui::run::run_tui;
use crate::view::{render_detail, ListRow, ListView, RowStatus, SubtaskState};

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive UI (the default).
    Ui,

    /// Add a new task.
    Add {
        /// What needs doing.
        text: String,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", "fri", "in 3d". Defaults to today.
        #[arg(long)]
        due: Option<String>,
        /// Break the task into subtasks. May be repeated.
        #[arg(long = "subtask", value_name = "TEXT")]
        subtasks: Vec<String>,
    },

    /// List tasks in board order.
    List {
        /// Which tasks to show. Defaults to the configured filter.
        #[arg(long, value_enum)]
        filter: Option<Filter>,
        /// Case-insensitive text search.
        #[arg(long)]
        search: Option<String>,
    },

    /// Show one task and its subtasks.
    Show {
        id: Id,
    },

    /// Change a task's text, due date or subtasks.
    Edit {
        id: Id,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        due: Option<String>,
        /// Replace the subtask list. May be repeated.
        #[arg(long = "subtask", value_name = "TEXT", conflicts_with = "leaf")]
        subtasks: Vec<String>,
        /// Drop all subtasks and track progress on the task itself.
        #[arg(long)]
        leaf: bool,
    },

    /// Set progress (0-100) on a task or one of its subtasks.
    Progress {
        id: Id,
        /// Percent complete; out-of-range values are clamped.
        #[arg(allow_hyphen_values = true)]
        value: String,
        #[arg(long, value_name = "SUBTASK_ID")]
        subtask: Option<Id>,
    },

    /// Move a task (or a subtask within its task) to a new position, counting from 0.
    Move {
        id: Id,
        to: usize,
        #[arg(long, value_name = "SUBTASK_ID")]
        subtask: Option<Id>,
    },

    /// Delete a task or one of its subtasks.
    Delete {
        id: Id,
        #[arg(long, value_name = "SUBTASK_ID")]
        subtask: Option<Id>,
    },

    /// Generate shell completion scripts.
    Completions {
        /// The shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

fn not_found(id: Id) -> ! {
    eprintln!("Task {id} not found.");
    std::process::exit(1);
}

/// Exit non-zero if the last write did not reach storage.
fn ensure_saved<S: Storage>(ctl: &Controller<S>) {
    if let Some(notice) = ctl.notice() {
        fail(notice);
    }
}

fn require_task<S: Storage>(ctl: &Controller<S>, id: Id) -> &Task {
    ctl.store().find_task(id).unwrap_or_else(|| not_found(id))
}

/// Launch the TUI.
pub fn cmd_ui<S: Storage>(ctl: Controller<S>) {
    if let Err(e) = run_tui(ctl) {
        eprintln!("UI error: {e}");
        std::process::exit(1);
    }
}

/// Add a new task.
pub fn cmd_add<S: Storage>(
    ctl: &mut Controller<S>,
    text: String,
    due: Option<String>,
    subtasks: Vec<String>,
) {
    let now = now_ms();
    let mut staging = TaskForm::new();
    for sub in &subtasks {
        if staging.stage(sub, now).is_none() {
            fail(ValidationError::EmptyText);
        }
    }
    let draft = TaskDraft {
        text,
        due: due.unwrap_or_default(),
        subtasks: staging.staging,
    };
    match ctl.add_task(draft, today(), now) {
        Ok(id) => {
            ensure_saved(ctl);
            println!("Added {id}");
        }
        Err(e) => fail(e),
    }
}

/// List tasks passing the filter and search.
pub fn cmd_list<S: Storage>(ctl: &mut Controller<S>, filter: Option<Filter>, search: Option<String>) {
    if let Some(filter) = filter {
        let _ = ctl.set_filter(filter);
    }
    if let Some(search) = search {
        let _ = ctl.set_search(&search);
    }
    let today = today();
    match ctl.list_view(today) {
        ListView::Empty => println!("No tasks."),
        ListView::Rows(rows) => print_table(&rows, today),
    }
}

fn print_table(rows: &[ListRow], today: chrono::NaiveDate) {
    println!("{:<14} {:<3} {:>5}  {:<24} TEXT", "ID", "", "DONE", "DUE");
    for row in rows {
        let mark = if row.complete { "[x]" } else { "[ ]" };
        let progress = row
            .progress
            .map(|p| format!("{p}%"))
            .unwrap_or_else(|| "-".into());
        let due = match row.status {
            RowStatus::Completed => "completed".to_string(),
            RowStatus::Due(d) => format!("{d} ({})", format_due_relative(d, today)),
        };
        println!("{:<14} {mark} {progress:>5}  {due:<24} {}", row.id, row.text);
        if let Some(summary) = &row.subtask_summary {
            println!("{:<14}     {:>5}  {:<24} - {summary}", "", "", "");
        }
    }
}

/// Show a task and, for composites, each subtask.
pub fn cmd_show<S: Storage>(ctl: &Controller<S>, id: Id) {
    let task = require_task(ctl, id);
    let today = today();
    println!("ID:        {}", task.id);
    println!("Text:      {}", task.text);
    println!("Due:       {} ({})", task.due_date, format_due_relative(task.due_date, today));
    println!(
        "Progress:  {}",
        display_progress(task).map(|p| format!("{p}%")).unwrap_or_else(|| "-".into())
    );
    println!("Status:    {}", if is_complete(task) { "completed" } else { "open" });

    let Some(detail) = render_detail(ctl.store().tasks(), id, None, ctl.pending()) else {
        return;
    };
    println!("Subtasks ({}% overall):", detail.aggregate);
    if detail.subtasks.is_empty() {
        println!("  -");
    }
    for row in detail.subtasks {
        let readout = match row.state {
            SubtaskState::Completed => "completed".to_string(),
            SubtaskState::InProgress { progress } | SubtaskState::Editing { progress, .. } => {
                format!("{progress}%")
            }
        };
        println!("  {:<14} {:<10} {}", row.id, readout, row.text);
    }
}

/// Edit a task through the same form the TUI uses.
pub fn cmd_edit<S: Storage>(
    ctl: &mut Controller<S>,
    id: Id,
    text: Option<String>,
    due: Option<String>,
    subtasks: Vec<String>,
    leaf: bool,
) {
    require_task(ctl, id);
    if ctl.open_edit_form(id) != Ok(Outcome::Applied) {
        not_found(id);
    }
    let now = now_ms();
    if let Some(form) = ctl.form_mut() {
        if let Some(text) = text {
            form.text = InputField::with_value(&text);
        }
        if let Some(due) = due {
            form.due = InputField::with_value(&due);
        }
        if leaf || !subtasks.is_empty() {
            form.staging.clear();
        }
    }
    for sub in &subtasks {
        if let Err(e) = ctl.stage_subtask(sub, now) {
            fail(e);
        }
    }
    match ctl.submit_form(today(), now) {
        Ok(Outcome::Applied) => {
            ensure_saved(ctl);
            println!("Updated {id}");
        }
        Ok(_) => not_found(id),
        Err(e) => fail(e),
    }
}

/// Set progress on a leaf task or a subtask.
pub fn cmd_progress<S: Storage>(ctl: &mut Controller<S>, id: Id, value: String, subtask: Option<Id>) {
    let result = match subtask {
        Some(sid) => ctl.update_subtask_progress(id, sid, &value),
        None => ctl.update_task_progress(id, &value),
    };
    match result {
        Ok(Outcome::Applied) => {
            ensure_saved(ctl);
            let task = require_task(ctl, id);
            match subtask.and_then(|sid| task.subtask(sid)) {
                Some(s) => println!("{} {}: {}", id, s.id, s.progress),
                None => println!("{}: {}%", id, aggregate_progress(task)),
            }
        }
        Ok(_) => {
            let task = require_task(ctl, id);
            match subtask {
                Some(sid) => fail(format!("Subtask {sid} not found in task {id}.")),
                None if task.is_composite() => fail(format!(
                    "Task {id} has subtasks; its progress is derived. Use --subtask."
                )),
                None => not_found(id),
            }
        }
        Err(e) => fail(e),
    }
}

/// Move a task or subtask to position `to`.
pub fn cmd_move<S: Storage>(ctl: &mut Controller<S>, id: Id, to: usize, subtask: Option<Id>) {
    let task = require_task(ctl, id);
    let result = match subtask {
        Some(sid) => {
            let Some(from) = task.subtasks().iter().position(|s| s.id == sid) else {
                fail(format!("Subtask {sid} not found in task {id}."));
            };
            ctl.reorder_subtasks(id, from, to)
        }
        None => {
            let Some(from) = ctl.store().task_index(id) else {
                not_found(id);
            };
            // Unfiltered, so display positions are store positions.
            let _ = ctl.set_filter(Filter::All);
            let _ = ctl.set_search("");
            ctl.reorder_tasks(from, to, today())
        }
    };
    match result {
        Ok(Outcome::Applied) => {
            ensure_saved(ctl);
            println!("Moved to {to}");
        }
        Ok(_) => println!("Nothing to move."),
        Err(e) => fail(e),
    }
}

/// Delete a task or subtask right away.
pub fn cmd_delete<S: Storage>(ctl: &mut Controller<S>, id: Id, subtask: Option<Id>) {
    let now = Instant::now();
    let result = match subtask {
        Some(sid) => ctl.request_delete_subtask(id, sid, now),
        None => ctl.request_delete_task(id, now),
    };
    match (result, subtask) {
        (Ok(Outcome::Deferred), _) => {
            ctl.flush_deletions();
            ensure_saved(ctl);
            println!("Deleted.");
        }
        (_, Some(sid)) => {
            require_task(ctl, id);
            fail(format!("Subtask {sid} not found in task {id}."));
        }
        (_, None) => not_found(id),
    }
}

/// Print completions for `shell` to stdout.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}
