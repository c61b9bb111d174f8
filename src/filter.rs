//! List filters and search matching.

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::progress::is_complete;
use crate::task::Task;

/// Which slice of the task list is shown. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Filter {
    #[default]
    All,
    Today,
    Pending,
    Overdue,
    Completed,
}

impl Filter {
    pub const ALL: [Filter; 5] = [
        Filter::All,
        Filter::Today,
        Filter::Pending,
        Filter::Overdue,
        Filter::Completed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Filter::All => "All",
            Filter::Today => "Today",
            Filter::Pending => "Pending",
            Filter::Overdue => "Overdue",
            Filter::Completed => "Completed",
        }
    }

    /// Cycle to the next filter, wrapping around.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&f| f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|&f| f == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn matches(self, task: &Task, today: NaiveDate) -> bool {
        match self {
            Filter::All => true,
            Filter::Today => task.due_date == today,
            Filter::Pending => !is_complete(task) && task.due_date > today,
            Filter::Overdue => !is_complete(task) && task.due_date < today,
            Filter::Completed => is_complete(task),
        }
    }
}

/// Case-insensitive substring match on the task text. Empty queries match everything.
pub fn matches_search(task: &Task, query: &str) -> bool {
    query.is_empty() || task.text.to_lowercase().contains(&query.to_lowercase())
}
