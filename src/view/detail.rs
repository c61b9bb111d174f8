use chrono::NaiveDate;

use crate::controller::{EditTarget, PendingDeletions, ProgressEditor};
use crate::progress::aggregate_progress;
use crate::task::{Id, Task};

/// One composite task with its subtasks broken out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailView {
    pub task_id: Id,
    pub title: String,
    pub due_date: NaiveDate,
    pub aggregate: u8,
    pub subtasks: Vec<SubtaskRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtaskState {
    Completed,
    InProgress { progress: u8 },
    /// The inline numeric editor is open on this row.
    Editing { progress: u8, input: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtaskRow {
    pub id: Id,
    pub text: String,
    pub state: SubtaskState,
    pub pending_delete: bool,
}

/// Project one composite task. `None` if the task is gone or is a leaf.
pub fn render_detail(
    tasks: &[Task],
    task_id: Id,
    editor: Option<&ProgressEditor>,
    pending: &PendingDeletions,
) -> Option<DetailView> {
    let task = tasks.iter().find(|t| t.id == task_id)?;
    if !task.is_composite() {
        return None;
    }
    let editing = editor.and_then(|e| match e.target {
        EditTarget::Subtask { task_id: t, subtask_id } if t == task_id => {
            Some((subtask_id, e.input.value.as_str()))
        }
        _ => None,
    });

    let subtasks = task
        .subtasks()
        .iter()
        .map(|s| {
            let progress = s.progress.value();
            let state = match editing {
                Some((id, input)) if id == s.id => SubtaskState::Editing {
                    progress,
                    input: input.to_string(),
                },
                _ if s.progress.is_done() => SubtaskState::Completed,
                _ => SubtaskState::InProgress { progress },
            };
            SubtaskRow {
                id: s.id,
                text: s.text.clone(),
                state,
                pending_delete: pending.is_subtask_pending(task_id, s.id),
            }
        })
        .collect();

    Some(DetailView {
        task_id,
        title: task.text.clone(),
        due_date: task.due_date,
        aggregate: aggregate_progress(task),
        subtasks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Progress;
    use crate::task::Subtask;
    use crate::input::InputField;
    use std::time::{Duration, Instant};

    fn tasks() -> Vec<Task> {
        let due = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let mut done = Subtask::new(Id(11), "Design");
        done.progress = Progress::DONE;
        let mut half = Subtask::new(Id(12), "Build");
        half.progress = Progress::clamped(40);
        vec![
            Task::leaf(Id(1), "Buy milk", due),
            Task::composite(Id(2), "Launch", due, vec![done, half]),
        ]
    }

    #[test]
    fn leaf_or_missing_has_no_detail() {
        let p = PendingDeletions::default();
        assert!(render_detail(&tasks(), Id(1), None, &p).is_none());
        assert!(render_detail(&tasks(), Id(99), None, &p).is_none());
    }

    #[test]
    fn subtask_rows_reflect_progress_and_editor() {
        let mut pending = PendingDeletions::default();
        pending.mark_subtask(Id(2), Id(11), Instant::now() + Duration::from_secs(1));
        let editor = ProgressEditor {
            target: EditTarget::Subtask { task_id: Id(2), subtask_id: Id(12) },
            input: InputField::with_value("7"),
        };
        let view = render_detail(&tasks(), Id(2), Some(&editor), &pending).unwrap();
        assert_eq!(view.title, "Launch");
        assert_eq!(view.aggregate, 70);
        assert_eq!(view.subtasks[0].state, SubtaskState::Completed);
        assert!(view.subtasks[0].pending_delete);
        assert_eq!(
            view.subtasks[1].state,
            SubtaskState::Editing { progress: 40, input: "7".into() }
        );

        let view = render_detail(&tasks(), Id(2), None, &PendingDeletions::default()).unwrap();
        assert_eq!(view.subtasks[1].state, SubtaskState::InProgress { progress: 40 });
    }
}
