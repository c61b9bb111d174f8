//! Ordered task collection mirrored to a key/value backend.
//!
//! The whole collection lives under one key as a JSON array. It is read once at
//! startup and overwritten in full after every mutation.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::task::{Id, Subtask, Task};

/// Key/value persistence seam.
pub trait Storage {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStorage { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(buf) => Ok(Some(buf)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        // Atomic-ish write via temp + rename.
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        f.write_all(value.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }
}

/// In-process backend for tests; can be switched to reject writes.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    pub fail_writes: bool,
}

impl MemoryStorage {
    pub fn with(key: &str, value: &str) -> Self {
        let mut entries = HashMap::new();
        entries.insert(key.to_string(), value.to_string());
        MemoryStorage { entries, fail_writes: false }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(std::io::Error::other("storage quota exceeded").into());
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// In-memory task list plus the backend it is saved to.
#[derive(Debug)]
pub struct Store<S: Storage> {
    tasks: Vec<Task>,
    storage: S,
    key: String,
}

impl<S: Storage> Store<S> {
    /// Load the collection, starting empty on any read or parse failure.
    ///
    /// Records are decoded one at a time; malformed ones are logged and dropped so a
    /// single bad entry never takes the rest of the list down with it.
    pub fn load(storage: S, key: &str) -> Self {
        let tasks = match storage.read(key) {
            Ok(Some(buf)) => decode_document(&buf),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, key, "failed to read task store, starting empty");
                Vec::new()
            }
        };
        debug!(count = tasks.len(), key, "loaded tasks");
        Store { tasks, storage, key: key.to_string() }
    }

    /// Overwrite the persisted document with the current collection.
    pub fn save(&mut self) -> Result<(), StoreError> {
        let doc = self.to_document()?;
        self.storage.write(&self.key, &doc)
    }

    pub fn to_document(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(&self.tasks)?)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn task_index(&self, id: Id) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    pub fn find_task(&self, id: Id) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn find_task_mut(&mut self, id: Id) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn find_subtask(&self, task_id: Id, subtask_id: Id) -> Option<&Subtask> {
        self.find_task(task_id)?.subtask(subtask_id)
    }

    pub fn find_subtask_mut(&mut self, task_id: Id, subtask_id: Id) -> Option<&mut Subtask> {
        self.find_task_mut(task_id)?
            .subtasks_mut()?
            .iter_mut()
            .find(|s| s.id == subtask_id)
    }

    /// Id for a new task: the timestamp, or one past the largest id in use.
    pub fn next_task_id(&self, now_ms: i64) -> Id {
        Id::fresh(now_ms, self.tasks.iter().map(|t| t.id))
    }

    pub fn push(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn remove_task(&mut self, id: Id) -> Option<Task> {
        let idx = self.task_index(id)?;
        Some(self.tasks.remove(idx))
    }

    pub fn remove_subtask(&mut self, task_id: Id, subtask_id: Id) -> Option<Subtask> {
        let subtasks = self.find_task_mut(task_id)?.subtasks_mut()?;
        let idx = subtasks.iter().position(|s| s.id == subtask_id)?;
        Some(subtasks.remove(idx))
    }

    /// Move the task at `from` so it ends up at `to`. Returns false when out of range.
    pub fn move_task(&mut self, from: usize, to: usize) -> bool {
        splice_move(&mut self.tasks, from, to)
    }

    pub fn move_subtask(&mut self, task_id: Id, from: usize, to: usize) -> bool {
        match self.find_task_mut(task_id).and_then(Task::subtasks_mut) {
            Some(subtasks) => splice_move(subtasks, from, to),
            None => false,
        }
    }
}

fn splice_move<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= items.len() || to >= items.len() {
        return false;
    }
    let item = items.remove(from);
    items.insert(to, item);
    true
}

fn decode_document(buf: &str) -> Vec<Task> {
    let values: Vec<serde_json::Value> = match serde_json::from_str(buf) {
        Ok(values) => values,
        Err(e) => {
            warn!(error = %e, "task store is not a JSON array, starting empty");
            return Vec::new();
        }
    };
    values
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| match serde_json::from_value::<Task>(value) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!(index = idx, error = %e, "dropping malformed task record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Progress;
    use chrono::NaiveDate;
    use serde_json::json;

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn sample_store() -> Store<MemoryStorage> {
        let mut store = Store::load(MemoryStorage::default(), "tasks");
        store.push(Task::leaf(Id(1), "one", due()));
        store.push(Task::composite(
            Id(2),
            "two",
            due(),
            vec![Subtask::new(Id(20), "a"), Subtask::new(Id(21), "b"), Subtask::new(Id(22), "c")],
        ));
        store.push(Task::leaf(Id(3), "three", due()));
        store
    }

    fn ids(store: &Store<MemoryStorage>) -> Vec<u64> {
        store.tasks().iter().map(|t| t.id.0).collect()
    }

    #[test]
    fn missing_key_loads_empty() {
        let store = Store::load(MemoryStorage::default(), "tasks");
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn garbage_document_loads_empty() {
        let store = Store::load(MemoryStorage::with("tasks", "{not json"), "tasks");
        assert!(store.tasks().is_empty());
        let store = Store::load(MemoryStorage::with("tasks", "{\"a\": 1}"), "tasks");
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn malformed_records_are_dropped_individually() {
        let doc = json!([
            {"id": 1, "text": "ok", "dueDate": "2025-01-01", "subtasks": [], "progress": 5},
            {"id": 2, "dueDate": "2025-01-01"},
            "not an object",
            {"id": 3, "text": "also ok", "dueDate": "2025-01-02", "subtasks": [{"id": 4, "text": "s", "progress": 0}]}
        ])
        .to_string();
        let store = Store::load(MemoryStorage::with("tasks", &doc), "tasks");
        assert_eq!(ids(&store), vec![1, 3]);
    }

    #[test]
    fn save_after_load_reproduces_document() {
        let mut store = sample_store();
        store.save().unwrap();
        let first = store.storage().get("tasks").unwrap().to_string();

        let mut reloaded = Store::load(MemoryStorage::with("tasks", &first), "tasks");
        reloaded.save().unwrap();
        let second = reloaded.storage().get("tasks").unwrap();

        let a: serde_json::Value = serde_json::from_str(&first).unwrap();
        let b: serde_json::Value = serde_json::from_str(second).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn move_task_is_a_permutation() {
        let mut store = sample_store();
        assert!(store.move_task(0, 2));
        assert_eq!(ids(&store), vec![2, 3, 1]);
        assert!(store.move_task(2, 0));
        assert_eq!(ids(&store), vec![1, 2, 3]);
        assert!(!store.move_task(0, 3));
        assert_eq!(ids(&store), vec![1, 2, 3]);
    }

    #[test]
    fn move_subtask_reorders_within_parent() {
        let mut store = sample_store();
        assert!(store.move_subtask(Id(2), 2, 0));
        let order: Vec<u64> = store.find_task(Id(2)).unwrap().subtasks().iter().map(|s| s.id.0).collect();
        assert_eq!(order, vec![22, 20, 21]);
        assert!(!store.move_subtask(Id(1), 0, 0));
        assert!(!store.move_subtask(Id(99), 0, 1));
    }

    #[test]
    fn lookups_and_removal() {
        let mut store = sample_store();
        assert!(store.find_subtask(Id(2), Id(21)).is_some());
        assert!(store.find_subtask(Id(1), Id(21)).is_none());
        store.find_subtask_mut(Id(2), Id(21)).unwrap().progress = Progress::DONE;
        assert_eq!(store.remove_subtask(Id(2), Id(21)).unwrap().progress, Progress::DONE);
        assert!(store.remove_subtask(Id(2), Id(21)).is_none());
        assert!(store.remove_task(Id(3)).is_some());
        assert!(store.remove_task(Id(3)).is_none());
        assert_eq!(ids(&store), vec![1, 2]);
    }

    #[test]
    fn next_id_skips_past_existing() {
        let store = sample_store();
        assert_eq!(store.next_task_id(1), Id(4));
        assert_eq!(store.next_task_id(1_000), Id(1_000));
    }

    #[test]
    fn failed_write_surfaces_error_and_keeps_memory() {
        let mut store = sample_store();
        store.storage_mut().fail_writes = true;
        assert!(store.save().is_err());
        assert_eq!(store.tasks().len(), 3);
        assert!(store.storage().get("tasks").is_none());
    }

    #[test]
    fn file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path());
        assert_eq!(storage.read("tasks").unwrap(), None);
        storage.write("tasks", "[]").unwrap();
        assert_eq!(storage.read("tasks").unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("tasks.json").exists());
        assert!(!dir.path().join("tasks.json.tmp").exists());
    }
}
