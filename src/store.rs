//! Row store used by the engines and commands.
//!
//! The store is deliberately dumb: named tables of serde records with
//! insert / query / update / upsert / delete. [`MemoryStore`] keeps the tables
//! in memory, [`JsonStore`] keeps them in a single JSON document on disk.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::{DailyLogEntry, Habit, Note, Notification, Project, Subtask, Task};

/// A row type stored in a named table.
pub trait Record: Serialize + DeserializeOwned + Clone {
    const TABLE: &'static str;

    fn id(&self) -> u64;
    fn set_id(&mut self, id: u64);

    /// Insert is rejected when another row already carries the same key.
    fn unique_key(&self) -> Option<String> {
        None
    }
}

/// A record with a conflict key for upserts.
pub trait Keyed: Record {
    fn conflict_key(&self) -> String;
}

impl Record for Task {
    const TABLE: &'static str = "tasks";

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn unique_key(&self) -> Option<String> {
        self.origin.clone()
    }
}

impl Record for Habit {
    const TABLE: &'static str = "habits";

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

impl Record for DailyLogEntry {
    const TABLE: &'static str = "habit_logs";

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

impl Keyed for DailyLogEntry {
    fn conflict_key(&self) -> String {
        format!("{}:{}", self.item_id, self.date)
    }
}

impl Record for Notification {
    const TABLE: &'static str = "notifications";

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

impl Record for Subtask {
    const TABLE: &'static str = "subtasks";

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

impl Record for Project {
    const TABLE: &'static str = "projects";

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    /// Project titles are unique per owner.
    fn unique_key(&self) -> Option<String> {
        Some(format!("{}:{}", self.owner, self.title.to_lowercase()))
    }
}

impl Record for Note {
    const TABLE: &'static str = "notes";

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

/// Filter, ordering and limit applied to one table.
pub struct Query<'a, R> {
    filter: Option<Box<dyn Fn(&R) -> bool + 'a>>,
    order: Option<Box<dyn Fn(&R, &R) -> Ordering + 'a>>,
    limit: Option<usize>,
}

impl<'a, R> Default for Query<'a, R> {
    fn default() -> Self {
        Query { filter: None, order: None, limit: None }
    }
}

impl<'a, R> Query<'a, R> {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter(mut self, f: impl Fn(&R) -> bool + 'a) -> Self {
        self.filter = Some(Box::new(f));
        self
    }

    pub fn order_by(mut self, cmp: impl Fn(&R, &R) -> Ordering + 'a) -> Self {
        self.order = Some(Box::new(cmp));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    fn apply(&self, rows: Vec<R>) -> Vec<R> {
        let mut rows: Vec<R> = match &self.filter {
            Some(f) => rows.into_iter().filter(|r| f(r)).collect(),
            None => rows,
        };
        if let Some(cmp) = &self.order {
            rows.sort_by(|a, b| cmp(a, b));
        }
        if let Some(n) = self.limit {
            rows.truncate(n);
        }
        rows
    }
}

/// The persistence collaborator of the engines.
pub trait RowStore {
    /// Inserts `record` under a fresh id and returns the stored row.
    fn insert<R: Record>(&mut self, record: R) -> Result<R, StoreError>;

    fn query<R: Record>(&self, query: &Query<'_, R>) -> Result<Vec<R>, StoreError>;

    fn get<R: Record>(&self, id: u64) -> Result<R, StoreError>;

    /// Applies `patch` to the row with `id` and returns the updated row.
    fn update<R: Record>(&mut self, id: u64, patch: impl FnOnce(&mut R)) -> Result<R, StoreError>;

    /// Replaces the row sharing `record`'s conflict key, or inserts it.
    fn upsert<R: Keyed>(&mut self, record: R) -> Result<R, StoreError>;

    fn delete<R: Record>(&mut self, id: u64) -> Result<(), StoreError>;
}

/// Raw table contents shared by both store implementations.
#[derive(Debug, Default, Serialize, serde::Deserialize)]
#[serde(transparent)]
struct Tables(BTreeMap<String, Vec<Value>>);

impl Tables {
    fn rows<R: Record>(&self) -> Result<Vec<R>, StoreError> {
        match self.0.get(R::TABLE) {
            Some(values) => values
                .iter()
                .map(|v| R::deserialize(v))
                .collect::<Result<Vec<R>, _>>()
                .map_err(|source| StoreError::Serde { table: R::TABLE.to_string(), source }),
            None => Ok(Vec::new()),
        }
    }

    fn put<R: Record>(&mut self, rows: &[R]) -> Result<(), StoreError> {
        let values = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()
            .map_err(|source| StoreError::Serde { table: R::TABLE.to_string(), source })?;
        self.0.insert(R::TABLE.to_string(), values);
        Ok(())
    }

    fn insert<R: Record>(&mut self, mut record: R) -> Result<R, StoreError> {
        let mut rows = self.rows::<R>()?;
        if let Some(key) = record.unique_key() {
            if rows.iter().any(|r| r.unique_key().as_deref() == Some(key.as_str())) {
                warn!(table = R::TABLE, %key, "rejected duplicate insert");
                return Err(StoreError::Conflict { table: R::TABLE, key });
            }
        }
        let next_id = rows.iter().map(|r| r.id()).max().unwrap_or(0) + 1;
        record.set_id(next_id);
        rows.push(record.clone());
        self.put(&rows)?;
        debug!(table = R::TABLE, id = next_id, "inserted row");
        Ok(record)
    }

    fn get<R: Record>(&self, id: u64) -> Result<R, StoreError> {
        self.rows::<R>()?
            .into_iter()
            .find(|r| r.id() == id)
            .ok_or(StoreError::NotFound { table: R::TABLE, id })
    }

    fn update<R: Record>(&mut self, id: u64, patch: impl FnOnce(&mut R)) -> Result<R, StoreError> {
        let mut rows = self.rows::<R>()?;
        let row = rows
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or(StoreError::NotFound { table: R::TABLE, id })?;
        patch(row);
        // the id is owned by the store
        row.set_id(id);
        let updated = row.clone();
        self.put(&rows)?;
        Ok(updated)
    }

    fn upsert<R: Keyed>(&mut self, mut record: R) -> Result<R, StoreError> {
        let mut rows = self.rows::<R>()?;
        let key = record.conflict_key();
        match rows.iter().position(|r| r.conflict_key() == key) {
            Some(idx) => {
                record.set_id(rows[idx].id());
                rows[idx] = record.clone();
                self.put(&rows)?;
                Ok(record)
            }
            None => self.insert(record),
        }
    }

    fn delete<R: Record>(&mut self, id: u64) -> Result<(), StoreError> {
        let mut rows = self.rows::<R>()?;
        let len_before = rows.len();
        rows.retain(|r| r.id() != id);
        if rows.len() == len_before {
            return Err(StoreError::NotFound { table: R::TABLE, id });
        }
        self.put(&rows)
    }
}

/// In-process row store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Tables,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowStore for MemoryStore {
    fn insert<R: Record>(&mut self, record: R) -> Result<R, StoreError> {
        self.tables.insert(record)
    }

    fn query<R: Record>(&self, query: &Query<'_, R>) -> Result<Vec<R>, StoreError> {
        Ok(query.apply(self.tables.rows()?))
    }

    fn get<R: Record>(&self, id: u64) -> Result<R, StoreError> {
        self.tables.get(id)
    }

    fn update<R: Record>(&mut self, id: u64, patch: impl FnOnce(&mut R)) -> Result<R, StoreError> {
        self.tables.update(id, patch)
    }

    fn upsert<R: Keyed>(&mut self, record: R) -> Result<R, StoreError> {
        self.tables.upsert(record)
    }

    fn delete<R: Record>(&mut self, id: u64) -> Result<(), StoreError> {
        self.tables.delete::<R>(id)
    }
}

/// Row store persisted as one JSON document.
///
/// Every operation reads the file, and every mutation writes it back through a
/// temp file and rename, so a crash never leaves a half-written database.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        JsonStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io { path: self.path.display().to_string(), source }
    }

    fn load(&self) -> Result<Tables, StoreError> {
        if !self.path.exists() {
            return Ok(Tables::default());
        }
        let mut s = String::new();
        File::open(&self.path)
            .and_then(|mut f| f.read_to_string(&mut s))
            .map_err(|e| self.io_error(e))?;
        if s.trim().is_empty() {
            return Ok(Tables::default());
        }
        serde_json::from_str(&s).map_err(|source| StoreError::Serde {
            table: self.path.display().to_string(),
            source,
        })
    }

    fn save(&self, tables: &Tables) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
        }
        let data = serde_json::to_string_pretty(tables).map_err(|source| StoreError::Serde {
            table: self.path.display().to_string(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        let write = || -> std::io::Result<()> {
            let mut f = File::create(&tmp)?;
            f.write_all(data.as_bytes())?;
            f.flush()?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|e| self.io_error(e))
    }

    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut tables = self.load()?;
        let out = f(&mut tables)?;
        self.save(&tables)?;
        Ok(out)
    }
}

impl RowStore for JsonStore {
    fn insert<R: Record>(&mut self, record: R) -> Result<R, StoreError> {
        self.mutate(|t| t.insert(record))
    }

    fn query<R: Record>(&self, query: &Query<'_, R>) -> Result<Vec<R>, StoreError> {
        Ok(query.apply(self.load()?.rows()?))
    }

    fn get<R: Record>(&self, id: u64) -> Result<R, StoreError> {
        self.load()?.get(id)
    }

    fn update<R: Record>(&mut self, id: u64, patch: impl FnOnce(&mut R)) -> Result<R, StoreError> {
        self.mutate(|t| t.update(id, patch))
    }

    fn upsert<R: Keyed>(&mut self, record: R) -> Result<R, StoreError> {
        self.mutate(|t| t.upsert(record))
    }

    fn delete<R: Record>(&mut self, id: u64) -> Result<(), StoreError> {
        self.mutate(|t| t.delete::<R>(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let mut store = MemoryStore::new();
        let a = store.insert(Task::new("me", "a")).unwrap();
        let b = store.insert(Task::new("me", "b")).unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(store.get::<Task>(2).unwrap().title, "b");
    }

    #[test]
    fn query_filters_orders_and_limits() {
        let mut store = MemoryStore::new();
        for title in ["c", "a", "b"] {
            store.insert(Task::new("me", title)).unwrap();
        }
        let rows = store
            .query(
                &Query::<Task>::all()
                    .filter(|t| t.title != "c")
                    .order_by(|x, y| x.title.cmp(&y.title))
                    .limit(1),
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "a");
    }

    #[test]
    fn upsert_keeps_one_row_per_key() {
        let mut store = MemoryStore::new();
        let first = store.upsert(DailyLogEntry::new(1, day(1), true)).unwrap();
        let second = store.upsert(DailyLogEntry::new(1, day(1), false)).unwrap();
        store.upsert(DailyLogEntry::new(1, day(2), true)).unwrap();
        assert_eq!(first.id, second.id);

        let rows = store.query(&Query::<DailyLogEntry>::all()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(!rows.iter().find(|r| r.date == day(1)).unwrap().done);
    }

    #[test]
    fn duplicate_unique_key_is_a_conflict() {
        let mut store = MemoryStore::new();
        let mut t = Task::new("me", "x");
        t.origin = Some("1:2025-05-01".into());
        store.insert(t.clone()).unwrap();
        assert!(matches!(store.insert(t), Err(StoreError::Conflict { .. })));
    }

    #[test]
    fn update_and_delete_missing_rows_fail() {
        let mut store = MemoryStore::new();
        assert!(matches!(store.update::<Task>(9, |_| {}), Err(StoreError::NotFound { id: 9, .. })));
        assert!(store.delete::<Habit>(1).is_err());
    }

    #[test]
    fn json_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db.json");
        let mut store = JsonStore::open(&path);
        store.insert(Task::new("me", "persisted")).unwrap();
        store.update::<Task>(1, |t| t.title = "renamed".into()).unwrap();

        let reopened = JsonStore::open(&path);
        let tasks = reopened.query(&Query::<Task>::all()).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "renamed");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonStore::open(&path);
        assert!(matches!(store.query(&Query::<Task>::all()), Err(StoreError::Serde { .. })));
    }
}
