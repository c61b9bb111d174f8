use chrono::NaiveDate;

use crate::controller::PendingDeletions;
use crate::filter::{matches_search, Filter};
use crate::progress::{display_progress, is_complete};
use crate::task::{Id, Task, TaskBody};

/// The task list as shown for one filter and search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListView {
    /// Nothing matched; the placeholder is drawn instead of the list.
    Empty,
    Rows(Vec<ListRow>),
}

impl ListView {
    pub fn rows(&self) -> &[ListRow] {
        match self {
            ListView::Empty => &[],
            ListView::Rows(rows) => rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ListView::Empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Due(NaiveDate),
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowActions {
    pub open_detail: bool,
    pub edit_progress: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub id: Id,
    /// Position in the store, for mapping display moves back to store moves.
    pub store_index: usize,
    pub complete: bool,
    pub text: String,
    pub subtask_summary: Option<String>,
    pub status: RowStatus,
    pub progress: Option<u8>,
    pub actions: RowActions,
    pub pending_delete: bool,
}

impl ListRow {
    fn project(task: &Task, store_index: usize, pending: &PendingDeletions) -> Self {
        let complete = is_complete(task);
        let subtask_summary = task.has_subtasks().then(|| {
            task.subtasks()
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        });
        ListRow {
            id: task.id,
            store_index,
            complete,
            text: task.text.clone(),
            subtask_summary,
            status: if complete { RowStatus::Completed } else { RowStatus::Due(task.due_date) },
            progress: display_progress(task),
            actions: RowActions {
                open_detail: task.has_subtasks(),
                edit_progress: matches!(task.body, TaskBody::Leaf { .. }),
            },
            pending_delete: pending.is_task_pending(task.id),
        }
    }
}

/// Project the store into list rows, in store order.
pub fn render_list(
    tasks: &[Task],
    filter: Filter,
    search: &str,
    today: NaiveDate,
    pending: &PendingDeletions,
) -> ListView {
    let rows: Vec<ListRow> = tasks
        .iter()
        .enumerate()
        .filter(|(_, t)| filter.matches(t, today) && matches_search(t, search))
        .map(|(i, t)| ListRow::project(t, i, pending))
        .collect();
    if rows.is_empty() {
        ListView::Empty
    } else {
        ListView::Rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Progress;
    use crate::task::Subtask;
    use std::time::{Duration, Instant};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn tasks() -> Vec<Task> {
        let mut design = Subtask::new(Id(11), "Design");
        design.progress = Progress::DONE;
        vec![
            Task::leaf(Id(1), "Buy milk", day(9)),
            Task::composite(Id(2), "Launch", day(20), vec![design, Subtask::new(Id(12), "Build")]),
            Task::composite(Id(3), "Emptied", day(15), Vec::new()),
        ]
    }

    #[test]
    fn rows_carry_store_index_under_filter() {
        let view = render_list(&tasks(), Filter::Pending, "", day(10), &PendingDeletions::default());
        let rows = view.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].id, rows[0].store_index), (Id(2), 1));
        assert_eq!(rows[0].subtask_summary.as_deref(), Some("Design, Build"));
        assert_eq!(rows[0].progress, Some(50));
        assert!(rows[0].actions.open_detail);
        assert!(!rows[0].actions.edit_progress);
        // composite without subtasks: no bar, no detail, no inline editor
        assert_eq!(rows[1].id, Id(3));
        assert_eq!(rows[1].progress, None);
        assert_eq!(rows[1].subtask_summary, None);
        assert_eq!(rows[1].actions, RowActions { open_detail: false, edit_progress: false });
    }

    #[test]
    fn completed_rows_show_badge_instead_of_date() {
        let mut all = tasks();
        all[0].body = TaskBody::Leaf { progress: Progress::DONE };
        let view = render_list(&all, Filter::All, "", day(10), &PendingDeletions::default());
        assert_eq!(view.rows()[0].status, RowStatus::Completed);
        assert!(view.rows()[0].complete);
        assert_eq!(view.rows()[1].status, RowStatus::Due(day(20)));
    }

    #[test]
    fn no_match_is_the_placeholder() {
        let view = render_list(&tasks(), Filter::All, "xyz", day(10), &PendingDeletions::default());
        assert_eq!(view, ListView::Empty);
        assert!(render_list(&[], Filter::All, "", day(10), &PendingDeletions::default()).is_empty());
    }

    #[test]
    fn pending_rows_are_flagged() {
        let mut pending = PendingDeletions::default();
        pending.mark_task(Id(1), Instant::now() + Duration::from_secs(1));
        let view = render_list(&tasks(), Filter::All, "", day(10), &pending);
        assert!(view.rows()[0].pending_delete);
        assert!(!view.rows()[1].pending_delete);
    }

    #[test]
    fn projection_is_deterministic() {
        let p = PendingDeletions::default();
        assert_eq!(
            render_list(&tasks(), Filter::Overdue, "mil", day(10), &p),
            render_list(&tasks(), Filter::Overdue, "mil", day(10), &p)
        );
    }
}
