//! Command handlers.
//!
//! [`Controller`] owns the store and every piece of transient UI state (filter,
//! search, current view, open form, open progress editor, pending deletions). Both
//! the TUI and the CLI drive it; neither touches the store directly.
//!
//! Handlers return `Result<Outcome, ValidationError>`:
//! - unknown ids and suppressed actions are `Ok(Outcome::Skipped)`
//! - rejected input is `Err`, and whatever form or editor is open stays open
//! - a failed save keeps the in-memory change and raises [`Notice::SaveFailed`]

use std::fmt;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::dates::resolve_due;
use crate::error::ValidationError;
use crate::filter::Filter;
use crate::form::{TaskDraft, TaskForm};
use crate::progress::Progress;
use crate::store::{Storage, Store};
use crate::task::{Id, Subtask, Task, TaskBody};
use crate::input::InputField;
use crate::view::{render_detail, render_list, DetailView, ListView};

/// Transition window between marking an item for deletion and removing it.
pub const DEFAULT_DELETE_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Marked now, removed once the deletion window passes.
    Deferred,
    Skipped,
}

/// Non-fatal problems surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    SaveFailed(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::SaveFailed(reason) => write!(f, "Changes not saved: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    List,
    Detail { task_id: Id },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    Task(Id),
    Subtask { task_id: Id, subtask_id: Id },
}

/// Inline numeric editor open on one task or subtask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEditor {
    pub target: EditTarget,
    pub input: InputField,
}

/// Items marked for deletion, each with the instant it may be removed.
#[derive(Debug, Clone, Default)]
pub struct PendingDeletions {
    tasks: Vec<(Id, Instant)>,
    subtasks: Vec<(Id, Id, Instant)>,
}

impl PendingDeletions {
    /// Returns false if the task was already marked.
    pub fn mark_task(&mut self, id: Id, deadline: Instant) -> bool {
        if self.is_task_pending(id) {
            return false;
        }
        self.tasks.push((id, deadline));
        true
    }

    pub fn mark_subtask(&mut self, task_id: Id, subtask_id: Id, deadline: Instant) -> bool {
        if self.is_subtask_pending(task_id, subtask_id) {
            return false;
        }
        self.subtasks.push((task_id, subtask_id, deadline));
        true
    }

    pub fn is_task_pending(&self, id: Id) -> bool {
        self.tasks.iter().any(|&(t, _)| t == id)
    }

    pub fn is_subtask_pending(&self, task_id: Id, subtask_id: Id) -> bool {
        self.subtasks
            .iter()
            .any(|&(t, s, _)| t == task_id && s == subtask_id)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.subtasks.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.tasks
            .iter()
            .map(|&(_, d)| d)
            .chain(self.subtasks.iter().map(|&(_, _, d)| d))
            .min()
    }

    /// Remove and return every mark due at `now`, or all of them for `None`.
    fn take_due(&mut self, now: Option<Instant>) -> (Vec<Id>, Vec<(Id, Id)>) {
        let due = |deadline: Instant| now.map_or(true, |now| deadline <= now);
        let (ready, waiting): (Vec<_>, Vec<_>) =
            self.tasks.drain(..).partition(|&(_, d)| due(d));
        self.tasks = waiting;
        let (ready_subs, waiting_subs): (Vec<_>, Vec<_>) =
            self.subtasks.drain(..).partition(|&(_, _, d)| due(d));
        self.subtasks = waiting_subs;
        (
            ready.into_iter().map(|(id, _)| id).collect(),
            ready_subs.into_iter().map(|(t, s, _)| (t, s)).collect(),
        )
    }

    /// Remove the subtask marks under one task regardless of deadline.
    fn take_subtasks_of(&mut self, task_id: Id) -> Vec<Id> {
        let (mine, rest): (Vec<_>, Vec<_>) =
            self.subtasks.drain(..).partition(|&(t, _, _)| t == task_id);
        self.subtasks = rest;
        mine.into_iter().map(|(_, s, _)| s).collect()
    }
}

fn skipped(action: &'static str, id: Id) -> Result<Outcome, ValidationError> {
    debug!(action, id = %id, "skipped");
    Ok(Outcome::Skipped)
}

/// Owner of the task store and all interaction state.
#[derive(Debug)]
pub struct Controller<S: Storage> {
    store: Store<S>,
    filter: Filter,
    search: String,
    view: View,
    form: Option<TaskForm>,
    editor: Option<ProgressEditor>,
    pending: PendingDeletions,
    notice: Option<Notice>,
    delete_delay: Duration,
}

impl<S: Storage> Controller<S> {
    pub fn new(store: Store<S>) -> Self {
        Controller {
            store,
            filter: Filter::default(),
            search: String::new(),
            view: View::List,
            form: None,
            editor: None,
            pending: PendingDeletions::default(),
            notice: None,
            delete_delay: DEFAULT_DELETE_DELAY,
        }
    }

    pub fn with_delete_delay(mut self, delay: Duration) -> Self {
        self.delete_delay = delay;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn form(&self) -> Option<&TaskForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut TaskForm> {
        self.form.as_mut()
    }

    pub fn editor(&self) -> Option<&ProgressEditor> {
        self.editor.as_ref()
    }

    pub fn editor_input_mut(&mut self) -> Option<&mut InputField> {
        self.editor.as_mut().map(|e| &mut e.input)
    }

    pub fn pending(&self) -> &PendingDeletions {
        &self.pending
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    // Projections

    pub fn list_view(&self, today: NaiveDate) -> ListView {
        render_list(self.store.tasks(), self.filter, &self.search, today, &self.pending)
    }

    pub fn detail_view(&self) -> Option<DetailView> {
        match self.view {
            View::Detail { task_id } => {
                render_detail(self.store.tasks(), task_id, self.editor.as_ref(), &self.pending)
            }
            View::List => None,
        }
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save() {
            warn!(error = %e, "failed to save tasks, keeping in-memory state");
            self.notice = Some(Notice::SaveFailed(e.to_string()));
        }
    }

    /// Drop view and editor state that points at something no longer there.
    fn sync_view(&mut self) {
        if let View::Detail { task_id } = self.view {
            if !self.store.find_task(task_id).is_some_and(Task::is_composite) {
                debug!(task = %task_id, "selected task gone, back to list");
                self.view = View::List;
            }
        }
        if let Some(editor) = &self.editor {
            let alive = match editor.target {
                EditTarget::Task(id) => self
                    .store
                    .find_task(id)
                    .is_some_and(|t| !t.is_composite()),
                EditTarget::Subtask { task_id, subtask_id } => {
                    self.store.find_subtask(task_id, subtask_id).is_some()
                }
            };
            if !alive {
                self.editor = None;
            }
        }
    }

    // Navigation

    pub fn open_detail(&mut self, task_id: Id) -> Result<Outcome, ValidationError> {
        if self.pending.is_task_pending(task_id) {
            return skipped("open_detail", task_id);
        }
        match self.store.find_task(task_id) {
            Some(task) if task.has_subtasks() => {
                self.view = View::Detail { task_id };
                self.editor = None;
                Ok(Outcome::Applied)
            }
            _ => skipped("open_detail", task_id),
        }
    }

    pub fn back_to_list(&mut self) -> Result<Outcome, ValidationError> {
        self.view = View::List;
        self.editor = None;
        Ok(Outcome::Applied)
    }

    pub fn set_filter(&mut self, filter: Filter) -> Result<Outcome, ValidationError> {
        self.filter = filter;
        Ok(Outcome::Applied)
    }

    pub fn set_search(&mut self, text: &str) -> Result<Outcome, ValidationError> {
        self.search = text.to_string();
        Ok(Outcome::Applied)
    }

    // Form

    pub fn open_add_form(&mut self) -> Result<Outcome, ValidationError> {
        self.editor = None;
        self.form = Some(TaskForm::new());
        Ok(Outcome::Applied)
    }

    /// Open the form on an existing task.
    ///
    /// Subtask deletions still in their window are committed first so the staging
    /// list never carries one back in.
    pub fn open_edit_form(&mut self, task_id: Id) -> Result<Outcome, ValidationError> {
        if self.pending.is_task_pending(task_id) || self.store.find_task(task_id).is_none() {
            return skipped("open_edit_form", task_id);
        }
        let doomed = self.pending.take_subtasks_of(task_id);
        if !doomed.is_empty() {
            for subtask_id in &doomed {
                self.store.remove_subtask(task_id, *subtask_id);
            }
            self.persist();
        }
        let Some(task) = self.store.find_task(task_id) else {
            return skipped("open_edit_form", task_id);
        };
        self.form = Some(TaskForm::from_task(task));
        self.editor = None;
        Ok(Outcome::Applied)
    }

    pub fn close_form(&mut self) -> Result<Outcome, ValidationError> {
        Ok(match self.form.take() {
            Some(_) => Outcome::Applied,
            None => Outcome::Skipped,
        })
    }

    pub fn stage_subtask(&mut self, text: &str, now_ms: i64) -> Result<Outcome, ValidationError> {
        let Some(form) = self.form.as_mut() else {
            debug!("stage_subtask without an open form");
            return Ok(Outcome::Skipped);
        };
        form.stage(text, now_ms)
            .map(|_| Outcome::Applied)
            .ok_or(ValidationError::EmptyText)
    }

    pub fn unstage_subtask(&mut self, subtask_id: Id) -> Result<Outcome, ValidationError> {
        if self.form.as_mut().is_some_and(|form| form.unstage(subtask_id)) {
            Ok(Outcome::Applied)
        } else {
            skipped("unstage_subtask", subtask_id)
        }
    }

    /// Add or edit from the open form. The form closes only on success.
    pub fn submit_form(&mut self, today: NaiveDate, now_ms: i64) -> Result<Outcome, ValidationError> {
        let Some(form) = self.form.as_ref() else {
            debug!("submit_form without an open form");
            return Ok(Outcome::Skipped);
        };
        let (task_id, draft) = (form.task_id, form.draft());
        let outcome = match task_id {
            None => self.add_task(draft, today, now_ms).map(|_| Outcome::Applied)?,
            Some(id) => self.edit_task(id, draft, today)?,
        };
        self.form = None;
        Ok(outcome)
    }

    // Mutations

    /// Create a task. Staged subtasks make it composite, each starting at 0.
    pub fn add_task(
        &mut self,
        draft: TaskDraft,
        today: NaiveDate,
        now_ms: i64,
    ) -> Result<Id, ValidationError> {
        let text = draft.text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        let due = resolve_due(&draft.due, today)?.unwrap_or(today);
        let id = self.store.next_task_id(now_ms);
        let task = if draft.subtasks.is_empty() {
            Task::leaf(id, text, due)
        } else {
            let subtasks = draft
                .subtasks
                .into_iter()
                .map(|s| Subtask::new(s.id, s.text))
                .collect();
            Task::composite(id, text, due, subtasks)
        };
        info!(task = %id, composite = task.is_composite(), "added task");
        self.store.push(task);
        self.persist();
        Ok(id)
    }

    /// Replace a task's text, due date and shape.
    ///
    /// An empty due field keeps the current date. Non-empty subtasks make the task
    /// composite and discard any leaf progress; none makes it a leaf, keeping its
    /// progress only if it already was one.
    pub fn edit_task(
        &mut self,
        task_id: Id,
        draft: TaskDraft,
        today: NaiveDate,
    ) -> Result<Outcome, ValidationError> {
        if self.pending.is_task_pending(task_id) {
            return skipped("edit_task", task_id);
        }
        let Some(existing) = self.store.find_task(task_id) else {
            return skipped("edit_task", task_id);
        };
        let text = draft.text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        let due = resolve_due(&draft.due, today)?.unwrap_or(existing.due_date);
        let body = if draft.subtasks.is_empty() {
            match existing.body {
                TaskBody::Leaf { progress } => TaskBody::Leaf { progress },
                TaskBody::Composite { .. } => TaskBody::Leaf { progress: Progress::ZERO },
            }
        } else {
            TaskBody::Composite { subtasks: draft.subtasks.clone() }
        };
        let text = text.to_string();
        if let Some(task) = self.store.find_task_mut(task_id) {
            task.text = text;
            task.due_date = due;
            task.body = body;
        }
        info!(task = %task_id, "edited task");
        self.persist();
        self.sync_view();
        Ok(Outcome::Applied)
    }

    /// First phase of a task deletion: mark it and start the window.
    pub fn request_delete_task(&mut self, task_id: Id, now: Instant) -> Result<Outcome, ValidationError> {
        if self.pending.is_task_pending(task_id) || self.store.find_task(task_id).is_none() {
            return skipped("request_delete_task", task_id);
        }
        self.pending.take_subtasks_of(task_id);
        self.pending.mark_task(task_id, now + self.delete_delay);
        if self.editor.as_ref().is_some_and(|e| match e.target {
            EditTarget::Task(id) => id == task_id,
            EditTarget::Subtask { task_id: t, .. } => t == task_id,
        }) {
            self.editor = None;
        }
        debug!(task = %task_id, "task marked for deletion");
        Ok(Outcome::Deferred)
    }

    pub fn request_delete_subtask(
        &mut self,
        task_id: Id,
        subtask_id: Id,
        now: Instant,
    ) -> Result<Outcome, ValidationError> {
        if self.pending.is_task_pending(task_id)
            || self.pending.is_subtask_pending(task_id, subtask_id)
            || self.store.find_subtask(task_id, subtask_id).is_none()
        {
            return skipped("request_delete_subtask", subtask_id);
        }
        self.pending
            .mark_subtask(task_id, subtask_id, now + self.delete_delay);
        if self
            .editor
            .as_ref()
            .is_some_and(|e| e.target == EditTarget::Subtask { task_id, subtask_id })
        {
            self.editor = None;
        }
        debug!(task = %task_id, subtask = %subtask_id, "subtask marked for deletion");
        Ok(Outcome::Deferred)
    }

    /// Second phase: remove everything whose window has passed. Returns how many
    /// items actually left the store.
    pub fn commit_due_deletions(&mut self, now: Instant) -> usize {
        self.commit_deletions(Some(now))
    }

    /// Commit every mark immediately.
    pub fn flush_deletions(&mut self) -> usize {
        self.commit_deletions(None)
    }

    fn commit_deletions(&mut self, now: Option<Instant>) -> usize {
        let (tasks, subtasks) = self.pending.take_due(now);
        if tasks.is_empty() && subtasks.is_empty() {
            return 0;
        }
        let mut removed = 0;
        for id in tasks {
            if self.store.remove_task(id).is_some() {
                info!(task = %id, "deleted task");
                removed += 1;
            } else {
                debug!(task = %id, "pending task already gone");
            }
        }
        for (task_id, subtask_id) in subtasks {
            if self.store.remove_subtask(task_id, subtask_id).is_some() {
                info!(task = %task_id, subtask = %subtask_id, "deleted subtask");
                removed += 1;
            } else {
                debug!(task = %task_id, subtask = %subtask_id, "pending subtask already gone");
            }
        }
        if removed > 0 {
            self.persist();
        }
        self.sync_view();
        removed
    }

    /// Set a leaf task's progress. Composite tasks derive theirs and are skipped.
    pub fn update_task_progress(&mut self, task_id: Id, input: &str) -> Result<Outcome, ValidationError> {
        if self.pending.is_task_pending(task_id) {
            return skipped("update_task_progress", task_id);
        }
        if !self.store.find_task(task_id).is_some_and(|t| !t.is_composite()) {
            return skipped("update_task_progress", task_id);
        }
        let progress = Progress::parse(input)?;
        if let Some(task) = self.store.find_task_mut(task_id) {
            task.body = TaskBody::Leaf { progress };
        }
        debug!(task = %task_id, %progress, "task progress updated");
        self.persist();
        Ok(Outcome::Applied)
    }

    pub fn update_subtask_progress(
        &mut self,
        task_id: Id,
        subtask_id: Id,
        input: &str,
    ) -> Result<Outcome, ValidationError> {
        if self.pending.is_task_pending(task_id)
            || self.pending.is_subtask_pending(task_id, subtask_id)
            || self.store.find_subtask(task_id, subtask_id).is_none()
        {
            return skipped("update_subtask_progress", subtask_id);
        }
        let progress = Progress::parse(input)?;
        if let Some(subtask) = self.store.find_subtask_mut(task_id, subtask_id) {
            subtask.progress = progress;
        }
        debug!(task = %task_id, subtask = %subtask_id, %progress, "subtask progress updated");
        self.persist();
        Ok(Outcome::Applied)
    }

    // Inline progress editor

    /// Open the numeric editor pre-filled with the current value.
    ///
    /// Composite tasks have no editor of their own, and completed subtasks only
    /// offer deletion.
    pub fn open_progress_editor(&mut self, target: EditTarget) -> Result<Outcome, ValidationError> {
        let current = match target {
            EditTarget::Task(id) if !self.pending.is_task_pending(id) => {
                self.store.find_task(id).and_then(|t| match t.body {
                    TaskBody::Leaf { progress } => Some(progress),
                    TaskBody::Composite { .. } => None,
                })
            }
            EditTarget::Subtask { task_id, subtask_id }
                if !self.pending.is_task_pending(task_id)
                    && !self.pending.is_subtask_pending(task_id, subtask_id) =>
            {
                self.store
                    .find_subtask(task_id, subtask_id)
                    .map(|s| s.progress)
                    .filter(|p| !p.is_done())
            }
            _ => None,
        };
        let Some(current) = current else {
            let id = match target {
                EditTarget::Task(id) => id,
                EditTarget::Subtask { subtask_id, .. } => subtask_id,
            };
            return skipped("open_progress_editor", id);
        };
        let mut input = InputField::with_value(&current.value().to_string());
        input.active = true;
        self.editor = Some(ProgressEditor { target, input });
        Ok(Outcome::Applied)
    }

    /// Apply the editor's value. On bad input the editor stays open.
    pub fn commit_progress_editor(&mut self) -> Result<Outcome, ValidationError> {
        let Some(editor) = self.editor.as_ref() else {
            debug!("commit_progress_editor without an open editor");
            return Ok(Outcome::Skipped);
        };
        let (target, input) = (editor.target, editor.input.value.clone());
        let outcome = match target {
            EditTarget::Task(id) => self.update_task_progress(id, &input)?,
            EditTarget::Subtask { task_id, subtask_id } => {
                self.update_subtask_progress(task_id, subtask_id, &input)?
            }
        };
        self.editor = None;
        Ok(outcome)
    }

    pub fn cancel_progress_editor(&mut self) -> Result<Outcome, ValidationError> {
        Ok(match self.editor.take() {
            Some(_) => Outcome::Applied,
            None => Outcome::Skipped,
        })
    }

    // Reordering

    /// Move a row of the current list. Positions are display positions under the
    /// active filter and search; they are mapped back to store positions first.
    pub fn reorder_tasks(
        &mut self,
        display_from: usize,
        display_to: usize,
        today: NaiveDate,
    ) -> Result<Outcome, ValidationError> {
        let view = self.list_view(today);
        let rows = view.rows();
        let (Some(from), Some(to)) = (rows.get(display_from), rows.get(display_to)) else {
            debug!(display_from, display_to, "reorder outside the list");
            return Ok(Outcome::Skipped);
        };
        if from.pending_delete || from.store_index == to.store_index {
            return skipped("reorder_tasks", from.id);
        }
        let (id, from_idx, to_idx) = (from.id, from.store_index, to.store_index);
        if !self.store.move_task(from_idx, to_idx) {
            return skipped("reorder_tasks", id);
        }
        debug!(task = %id, from = from_idx, to = to_idx, "task moved");
        self.persist();
        Ok(Outcome::Applied)
    }

    pub fn reorder_subtasks(
        &mut self,
        task_id: Id,
        from: usize,
        to: usize,
    ) -> Result<Outcome, ValidationError> {
        if self.pending.is_task_pending(task_id) || from == to {
            return skipped("reorder_subtasks", task_id);
        }
        let moving = self
            .store
            .find_task(task_id)
            .and_then(|t| t.subtasks().get(from))
            .map(|s| s.id);
        match moving {
            Some(sid) if !self.pending.is_subtask_pending(task_id, sid) => {}
            _ => return skipped("reorder_subtasks", task_id),
        }
        if !self.store.move_subtask(task_id, from, to) {
            return skipped("reorder_subtasks", task_id);
        }
        debug!(task = %task_id, from, to, "subtask moved");
        self.persist();
        Ok(Outcome::Applied)
    }
}
