//! Task data structures and their persisted shape.
//!
//! A [`Task`] is either a leaf that tracks its own progress or a composite whose
//! progress is derived from its [`Subtask`]s. The JSON document keeps the original
//! flat layout (`subtasks` plus an optional `progress`), so the conversion between
//! the two lives here in [`TaskRecord`].

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::error::ValidationError;
use crate::progress::Progress;

/// Identifier for tasks and subtasks.
///
/// Written as a JSON number. Older documents that stored ids as numeric strings
/// still load and compare equal by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(pub u64);

impl Id {
    /// Millisecond timestamp id, bumped past anything already in `taken`.
    ///
    /// When nothing fits above the largest taken id, the smallest free value is used.
    pub fn fresh(now_ms: i64, taken: impl IntoIterator<Item = Id>) -> Id {
        let taken: BTreeSet<u64> = taken.into_iter().map(|id| id.0).collect();
        let candidate = now_ms.max(0) as u64;
        match taken.last() {
            Some(&max) if max >= candidate => match max.checked_add(1) {
                Some(next) => Id(next),
                None => Id((0..).find(|n| !taken.contains(n)).unwrap_or(0)),
            },
            _ => Id(candidate),
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for Id {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Id)
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = Id;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative integer id")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Id, E> {
                Ok(Id(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Id, E> {
                u64::try_from(v)
                    .map(Id)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Id, E> {
                if v.is_finite() && v >= 0.0 && v.fract() == 0.0 {
                    Ok(Id(v as u64))
                } else {
                    Err(E::invalid_value(de::Unexpected::Float(v), &self))
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Id, E> {
                v.parse()
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// One step of a composite task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SubtaskRecord", into = "SubtaskRecord")]
pub struct Subtask {
    pub id: Id,
    pub text: String,
    pub progress: Progress,
}

impl Subtask {
    pub fn new(id: Id, text: impl Into<String>) -> Self {
        Subtask { id, text: text.into(), progress: Progress::ZERO }
    }
}

/// Leaf or composite: exactly one source of progress per task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskBody {
    Leaf { progress: Progress },
    Composite { subtasks: Vec<Subtask> },
}

/// A tracked item with a due date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TaskRecord", into = "TaskRecord")]
pub struct Task {
    pub id: Id,
    pub text: String,
    pub due_date: NaiveDate,
    pub body: TaskBody,
}

impl Task {
    pub fn leaf(id: Id, text: impl Into<String>, due_date: NaiveDate) -> Self {
        Task {
            id,
            text: text.into(),
            due_date,
            body: TaskBody::Leaf { progress: Progress::ZERO },
        }
    }

    pub fn composite(
        id: Id,
        text: impl Into<String>,
        due_date: NaiveDate,
        subtasks: Vec<Subtask>,
    ) -> Self {
        Task { id, text: text.into(), due_date, body: TaskBody::Composite { subtasks } }
    }

    /// Subtasks in display order; empty for a leaf.
    pub fn subtasks(&self) -> &[Subtask] {
        match &self.body {
            TaskBody::Leaf { .. } => &[],
            TaskBody::Composite { subtasks } => subtasks,
        }
    }

    pub fn subtasks_mut(&mut self) -> Option<&mut Vec<Subtask>> {
        match &mut self.body {
            TaskBody::Leaf { .. } => None,
            TaskBody::Composite { subtasks } => Some(subtasks),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.body, TaskBody::Composite { .. })
    }

    /// Composite with at least one subtask; the only kind with a detail view.
    pub fn has_subtasks(&self) -> bool {
        !self.subtasks().is_empty()
    }

    pub fn subtask(&self, id: Id) -> Option<&Subtask> {
        self.subtasks().iter().find(|s| s.id == id)
    }
}

#[derive(Serialize, Deserialize)]
struct SubtaskRecord {
    id: Id,
    text: String,
    #[serde(default)]
    progress: Option<Progress>,
}

impl TryFrom<SubtaskRecord> for Subtask {
    type Error = ValidationError;

    fn try_from(r: SubtaskRecord) -> Result<Self, Self::Error> {
        if r.text.trim().is_empty() {
            return Err(ValidationError::EmptyText);
        }
        Ok(Subtask { id: r.id, text: r.text, progress: r.progress.unwrap_or_default() })
    }
}

impl From<Subtask> for SubtaskRecord {
    fn from(s: Subtask) -> Self {
        SubtaskRecord { id: s.id, text: s.text, progress: Some(s.progress) }
    }
}

/// Flat on-disk form of a task.
///
/// `progress` is tri-state: absent, explicitly `null`, or a number. Absent plus an
/// empty `subtasks` list is a composite whose last subtask was deleted.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    id: Id,
    text: String,
    due_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subtasks: Option<Vec<Subtask>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    progress: Option<Option<Progress>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl TryFrom<TaskRecord> for Task {
    type Error = ValidationError;

    fn try_from(r: TaskRecord) -> Result<Self, Self::Error> {
        if r.text.trim().is_empty() {
            return Err(ValidationError::EmptyText);
        }
        let body = match (r.subtasks, r.progress) {
            (Some(subtasks), Some(_)) if !subtasks.is_empty() => {
                warn!(id = %r.id, "task has both subtasks and progress; keeping subtasks");
                TaskBody::Composite { subtasks }
            }
            (Some(subtasks), None) if !subtasks.is_empty() => TaskBody::Composite { subtasks },
            (Some(_), None) => TaskBody::Composite { subtasks: Vec::new() },
            (_, progress) => TaskBody::Leaf { progress: progress.flatten().unwrap_or_default() },
        };
        Ok(Task { id: r.id, text: r.text, due_date: r.due_date, body })
    }
}

impl From<Task> for TaskRecord {
    fn from(t: Task) -> Self {
        let (subtasks, progress) = match t.body {
            TaskBody::Leaf { progress } => (Vec::new(), Some(Some(progress))),
            TaskBody::Composite { subtasks } => (subtasks, None),
        };
        TaskRecord {
            id: t.id,
            text: t.text,
            due_date: t.due_date,
            subtasks: Some(subtasks),
            progress,
        }
    }
}
