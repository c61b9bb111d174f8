//! The add/edit task form and its staging subtask list.
//!
//! One form serves both modes: `task_id` is `Some` when editing. Subtasks typed into
//! the form are held in `staging` and only reach the store on submit.

use crate::{
    input::InputField,
    task::{Id, Subtask, Task},
};

/// Field order for keyboard navigation.
pub const TEXT_FIELD: usize = 0;
pub const DUE_FIELD: usize = 1;
pub const SUBTASK_FIELD: usize = 2;
pub const STAGING_LIST: usize = 3;
const FIELD_COUNT: usize = 4;

/// Form-free description of a task to add or the new state of one being edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub text: String,
    /// Raw due input; empty means "default" (today on add, unchanged on edit).
    pub due: String,
    pub subtasks: Vec<Subtask>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskForm {
    pub task_id: Option<Id>,
    pub text: InputField,
    pub due: InputField,
    pub subtask_input: InputField,
    pub staging: Vec<Subtask>,
    /// Highlighted entry in the staging list.
    pub staged_selected: usize,
    pub current_field: usize,
}

impl TaskForm {
    /// Empty form in add mode.
    pub fn new() -> Self {
        let mut form = Self::default();
        form.update_active_field();
        form
    }

    /// Form in edit mode, populated from an existing task.
    ///
    /// The staging list starts as a copy of the task's subtasks so their progress
    /// survives the edit.
    pub fn from_task(task: &Task) -> Self {
        let mut form = Self {
            task_id: Some(task.id),
            text: InputField::with_value(&task.text),
            due: InputField::with_value(&task.due_date.format("%Y-%m-%d").to_string()),
            staging: task.subtasks().to_vec(),
            ..Self::default()
        };
        form.update_active_field();
        form
    }

    pub fn is_edit(&self) -> bool {
        self.task_id.is_some()
    }

    /// Stage a subtask. Returns `None` for blank text.
    pub fn stage(&mut self, text: &str, now_ms: i64) -> Option<Id> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let id = Id::fresh(now_ms, self.staging.iter().map(|s| s.id));
        self.staging.push(Subtask::new(id, text));
        Some(id)
    }

    pub fn unstage(&mut self, id: Id) -> bool {
        let before = self.staging.len();
        self.staging.retain(|s| s.id != id);
        if self.staged_selected >= self.staging.len() {
            self.staged_selected = self.staging.len().saturating_sub(1);
        }
        self.staging.len() != before
    }

    /// Id of the highlighted staged subtask, if the list is non-empty.
    pub fn selected_staged(&self) -> Option<Id> {
        self.staging.get(self.staged_selected).map(|s| s.id)
    }

    pub fn draft(&self) -> TaskDraft {
        TaskDraft {
            text: self.text.value.clone(),
            due: self.due.value.clone(),
            subtasks: self.staging.clone(),
        }
    }

    fn fields_mut(&mut self) -> [&mut InputField; 3] {
        [&mut self.text, &mut self.due, &mut self.subtask_input]
    }

    /// The text field the cursor is in, if the focus is not on the staging list.
    pub fn active_input_mut(&mut self) -> Option<&mut InputField> {
        match self.current_field {
            TEXT_FIELD => Some(&mut self.text),
            DUE_FIELD => Some(&mut self.due),
            SUBTASK_FIELD => Some(&mut self.subtask_input),
            _ => None,
        }
    }

    pub fn next_field(&mut self) {
        self.current_field = (self.current_field + 1) % FIELD_COUNT;
        self.update_active_field();
    }

    pub fn prev_field(&mut self) {
        self.current_field = (self.current_field + FIELD_COUNT - 1) % FIELD_COUNT;
        self.update_active_field();
    }

    pub fn update_active_field(&mut self) {
        let current = self.current_field;
        for (i, field) in self.fields_mut().into_iter().enumerate() {
            field.active = i == current;
        }
    }

    pub fn handle_char(&mut self, c: char) {
        if let Some(field) = self.active_input_mut() {
            field.handle_char(c);
        }
    }

    pub fn handle_backspace(&mut self) {
        if let Some(field) = self.active_input_mut() {
            field.handle_backspace();
        }
    }

    /// Cursor movement in text fields.
    pub fn handle_left_right(&mut self, right: bool) {
        if let Some(field) = self.active_input_mut() {
            if right {
                field.move_cursor_right();
            } else {
                field.move_cursor_left();
            }
        }
    }

    /// Move the staging-list highlight.
    pub fn handle_up_down(&mut self, down: bool) {
        if self.staging.is_empty() {
            return;
        }
        if down {
            self.staged_selected = (self.staged_selected + 1).min(self.staging.len() - 1);
        } else {
            self.staged_selected = self.staged_selected.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Progress;
    use chrono::NaiveDate;

    #[test]
    fn staging_assigns_unique_ids_and_rejects_blank() {
        let mut form = TaskForm::new();
        let a = form.stage("Design", 500).unwrap();
        let b = form.stage("  Build ", 500).unwrap();
        assert_ne!(a, b);
        assert_eq!(form.staging[1].text, "Build");
        assert!(form.stage("   ", 500).is_none());
        assert!(form.unstage(a));
        assert!(!form.unstage(a));
        assert_eq!(form.draft().subtasks.len(), 1);
    }

    #[test]
    fn edit_form_copies_task_state() {
        let mut sub = Subtask::new(Id(2), "Design");
        sub.progress = Progress::clamped(60);
        let task = Task::composite(
            Id(1),
            "Launch",
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            vec![sub.clone()],
        );
        let form = TaskForm::from_task(&task);
        assert!(form.is_edit());
        assert_eq!(form.text.value, "Launch");
        assert_eq!(form.due.value, "2025-02-01");
        assert_eq!(form.staging, vec![sub]);
        assert!(form.text.active);
    }

    #[test]
    fn navigation_routes_keys_to_active_field() {
        let mut form = TaskForm::new();
        form.handle_char('a');
        form.next_field();
        form.handle_char('b');
        form.next_field();
        form.handle_char('c');
        form.next_field();
        assert_eq!(form.current_field, STAGING_LIST);
        form.handle_char('z');
        assert_eq!((form.text.value.as_str(), form.due.value.as_str()), ("a", "b"));
        assert_eq!(form.subtask_input.value, "c");
        form.next_field();
        assert_eq!(form.current_field, TEXT_FIELD);
        form.prev_field();
        assert_eq!(form.current_field, STAGING_LIST);
    }
}
