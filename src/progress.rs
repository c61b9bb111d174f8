//! Completion rules for tasks and subtasks.
//!
//! Leaf tasks carry their own [`Progress`]; composite tasks derive theirs from their
//! subtasks on every call. Nothing here is cached or stored.

use std::fmt;
use std::num::IntErrorKind;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;
use crate::task::{Task, TaskBody};

/// Percentage complete, always within `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Progress(u8);

impl Progress {
    pub const ZERO: Progress = Progress(0);
    pub const DONE: Progress = Progress(100);

    /// Clamp any integer into range.
    pub fn clamped(value: i64) -> Self {
        Progress(value.clamp(0, 100) as u8)
    }

    /// Parse user input from a numeric editor.
    ///
    /// Out-of-range numbers are clamped, including ones too long for an `i64`;
    /// anything that is not an integer is rejected so the editor can stay open for
    /// correction.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        match trimmed.parse::<i64>() {
            Ok(value) => Ok(Self::clamped(value)),
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow => Ok(Self::DONE),
                IntErrorKind::NegOverflow => Ok(Self::ZERO),
                _ => Err(ValidationError::NotANumber(trimmed.to_string())),
            },
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_done(self) -> bool {
        self.0 >= 100
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl Serialize for Progress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> Deserialize<'de> for Progress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ProgressVisitor;

        impl Visitor<'_> for ProgressVisitor {
            type Value = Progress;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number between 0 and 100")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Progress, E> {
                Ok(Progress::clamped(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Progress, E> {
                Ok(Progress::clamped(v.min(100) as i64))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Progress, E> {
                if v.is_finite() {
                    Ok(Progress::clamped(v.round() as i64))
                } else {
                    Err(E::invalid_value(de::Unexpected::Float(v), &self))
                }
            }
        }

        deserializer.deserialize_any(ProgressVisitor)
    }
}

/// Whether a task counts as done.
///
/// A composite task is complete only when it has subtasks and all of them are done.
/// One with no subtasks has no progress of its own, so it is never complete.
pub fn is_complete(task: &Task) -> bool {
    match &task.body {
        TaskBody::Leaf { progress } => progress.is_done(),
        TaskBody::Composite { subtasks } => {
            !subtasks.is_empty() && subtasks.iter().all(|s| s.progress.is_done())
        }
    }
}

/// Mean subtask progress rounded half-up, or the leaf's own value.
pub fn aggregate_progress(task: &Task) -> u8 {
    match &task.body {
        TaskBody::Leaf { progress } => progress.value(),
        TaskBody::Composite { subtasks } => {
            if subtasks.is_empty() {
                return 0;
            }
            let n = subtasks.len() as u64;
            let sum: u64 = subtasks.iter().map(|s| s.progress.value() as u64).sum();
            // (sum / n) + 0.5, floored, in integers.
            ((2 * sum + n) / (2 * n)) as u8
        }
    }
}

/// The value a progress bar shows, if the task gets one at all.
pub fn display_progress(task: &Task) -> Option<u8> {
    match &task.body {
        TaskBody::Composite { subtasks } if subtasks.is_empty() => None,
        _ => Some(aggregate_progress(task)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Id, Subtask};
    use chrono::NaiveDate;

    fn composite(values: &[i64]) -> Task {
        Task {
            id: Id(1),
            text: "Launch".into(),
            due_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            body: TaskBody::Composite {
                subtasks: values
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| Subtask {
                        id: Id(10 + i as u64),
                        text: format!("step {i}"),
                        progress: Progress::clamped(v),
                    })
                    .collect(),
            },
        }
    }

    fn leaf(value: i64) -> Task {
        Task {
            id: Id(2),
            text: "Buy milk".into(),
            due_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            body: TaskBody::Leaf { progress: Progress::clamped(value) },
        }
    }

    #[test]
    fn aggregate_is_rounded_mean() {
        assert_eq!(aggregate_progress(&composite(&[0, 0])), 0);
        assert_eq!(aggregate_progress(&composite(&[100, 0])), 50);
        assert_eq!(aggregate_progress(&composite(&[100, 0, 0])), 33);
        assert_eq!(aggregate_progress(&composite(&[100, 100, 0])), 67);
        // 0.5 rounds up
        assert_eq!(aggregate_progress(&composite(&[1, 0])), 1);
        assert_eq!(aggregate_progress(&composite(&[25, 50])), 38);
    }

    #[test]
    fn aggregate_of_empty_composite_is_zero() {
        let task = composite(&[]);
        assert_eq!(aggregate_progress(&task), 0);
        assert_eq!(display_progress(&task), None);
        assert!(!is_complete(&task));
    }

    #[test]
    fn composite_complete_only_when_every_subtask_done() {
        assert!(!is_complete(&composite(&[100, 99])));
        assert!(is_complete(&composite(&[100, 100])));
    }

    #[test]
    fn leaf_completion_uses_own_progress() {
        assert!(!is_complete(&leaf(99)));
        assert!(is_complete(&leaf(100)));
        assert_eq!(display_progress(&leaf(40)), Some(40));
    }

    #[test]
    fn parse_clamps_and_rejects_garbage() {
        assert_eq!(Progress::parse(" 42 ").unwrap().value(), 42);
        assert_eq!(Progress::parse("250").unwrap(), Progress::DONE);
        assert_eq!(Progress::parse("-3").unwrap(), Progress::ZERO);
        assert_eq!(Progress::parse("100000000000000000000").unwrap(), Progress::DONE);
        assert_eq!(Progress::parse("-100000000000000000000").unwrap(), Progress::ZERO);
        assert_eq!(
            Progress::parse("abc"),
            Err(ValidationError::NotANumber("abc".into()))
        );
        assert!(Progress::parse("").is_err());
        assert!(Progress::parse("12.5").is_err());
    }

    #[test]
    fn deserialises_loose_numbers() {
        let p: Progress = serde_json::from_str("150").unwrap();
        assert_eq!(p, Progress::DONE);
        let p: Progress = serde_json::from_str("49.6").unwrap();
        assert_eq!(p.value(), 50);
        let p: Progress = serde_json::from_str("-1").unwrap();
        assert_eq!(p, Progress::ZERO);
        assert!(serde_json::from_str::<Progress>("\"x\"").is_err());
    }
}
