// Task store: in-memory collection with blob persistence

use crate::clock::{Clock, SystemClock};
use crate::config::DEFAULT_STORAGE_KEY;
use crate::filter::{CategoryFilter, DateRange, FilterCriteria, PriorityFilter, StatusFilter};
use crate::ids::{IdGenerator, UuidIds};
use crate::models::{Category, NewTask, Task, TaskPatch};
use crate::stats::TodoStats;
use crate::storage::{MemoryStorage, Storage};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

const CURRENT_VERSION: u32 = 1;

/// Persisted form of the store: `{version, tasks, filterCriteria}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub filter_criteria: FilterCriteria,
}

fn current_version() -> u32 {
    CURRENT_VERSION
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            tasks: Vec::new(),
            filter_criteria: FilterCriteria::default(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRef<'a> {
    version: u32,
    tasks: &'a [Task],
    filter_criteria: &'a FilterCriteria,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse snapshot")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize snapshot")
    }
}

/// Owns the task collection and the active filter criteria
///
/// Mutations apply in memory first, then the whole snapshot is written to the
/// backing [`Storage`]. A failed write is logged and leaves the store running
/// session-only until the next successful write; it never undoes the mutation.
///
/// Operations addressing a task by id return `false` when no such task exists,
/// and neither mutate nor persist in that case.
pub struct TaskStore {
    tasks: Vec<Task>,
    criteria: FilterCriteria,
    storage: Box<dyn Storage>,
    clock: Box<dyn Clock>,
    ids: Box<dyn IdGenerator>,
    key: String,
    durable: bool,
}

impl TaskStore {
    /// Rehydrate from the blob stored under `key`, or start empty
    pub fn open(
        storage: Box<dyn Storage>,
        clock: Box<dyn Clock>,
        ids: Box<dyn IdGenerator>,
        key: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let snapshot = Self::load_snapshot(storage.as_ref(), &key);

        info!(
            key = %key,
            tasks = snapshot.tasks.len(),
            "Opened task store"
        );

        Self {
            tasks: snapshot.tasks,
            criteria: snapshot.filter_criteria,
            storage,
            clock,
            ids,
            key,
            durable: true,
        }
    }

    /// Open with the system clock and random ids under the default key
    pub fn with_storage(storage: Box<dyn Storage>) -> Self {
        Self::open(storage, Box::new(SystemClock), Box::new(UuidIds), DEFAULT_STORAGE_KEY)
    }

    /// Session-only store
    pub fn in_memory() -> Self {
        Self::with_storage(Box::new(MemoryStorage::new()))
    }

    fn load_snapshot(storage: &dyn Storage, key: &str) -> Snapshot {
        let raw = match storage.load(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "No persisted state, starting fresh");
                return Snapshot::default();
            }
            Err(e) => {
                warn!(key, error = ?e, "Failed to read persisted state, starting fresh");
                return Snapshot::default();
            }
        };

        let mut snapshot = match Snapshot::from_json(&raw) {
            Ok(s) => s,
            Err(e) => {
                warn!(key, error = ?e, "Persisted state is corrupt, starting fresh");
                return Snapshot::default();
            }
        };

        if snapshot.version > CURRENT_VERSION {
            warn!(
                key,
                version = snapshot.version,
                supported = CURRENT_VERSION,
                "Persisted state written by a newer version"
            );
        }

        // Keep the first occurrence of any repeated id
        let mut seen = HashSet::new();
        let before = snapshot.tasks.len();
        snapshot.tasks.retain(|t| seen.insert(t.id.clone()));
        if snapshot.tasks.len() != before {
            warn!(key, dropped = before - snapshot.tasks.len(), "Dropped tasks with duplicate ids");
        }

        snapshot
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// False after a failed write, until the next write succeeds
    pub fn is_durable(&self) -> bool {
        self.durable
    }

    /// Copy of the current state in persisted form
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: CURRENT_VERSION,
            tasks: self.tasks.clone(),
            filter_criteria: self.criteria.clone(),
        }
    }

    /// Write the snapshot now, returning any storage error
    pub fn persist(&mut self) -> Result<()> {
        let json = serde_json::to_string(&SnapshotRef {
            version: CURRENT_VERSION,
            tasks: &self.tasks,
            filter_criteria: &self.criteria,
        })
        .context("Failed to serialize snapshot")?;

        let result = self.storage.save(&self.key, &json);
        self.durable = result.is_ok();
        result
    }

    fn save(&mut self) {
        if let Err(e) = self.persist() {
            warn!(key = %self.key, error = ?e, "Failed to persist state, continuing in memory");
        }
    }

    // ========================================================================
    // Task mutations
    // ========================================================================

    /// Append a new task; the caller is responsible for validating `input`
    pub fn create_task(&mut self, input: NewTask) -> &Task {
        let now = self.clock.now();
        let task = Task {
            id: self.ids.next_id(),
            title: input.title,
            description: input.description.unwrap_or_default(),
            completed: false,
            priority: input.priority.unwrap_or_default(),
            category: input.category.unwrap_or_default(),
            due_date: input.due_date,
            tags: input.tags,
            created_at: now,
            updated_at: now,
        };
        debug!(id = %task.id, title = %task.title, "Created task");

        self.tasks.push(task);
        self.save();

        let last = self.tasks.len() - 1;
        &self.tasks[last]
    }

    /// Apply `patch` over the task with `id`
    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> bool {
        let now = self.clock.now();
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "update_task: no such task");
            return false;
        };

        patch.apply(task);
        task.updated_at = now.max(task.updated_at);
        debug!(id, "Updated task");

        self.save();
        true
    }

    pub fn toggle_complete(&mut self, id: &str) -> bool {
        let now = self.clock.now();
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "toggle_complete: no such task");
            return false;
        };

        task.completed = !task.completed;
        task.updated_at = now.max(task.updated_at);
        debug!(id, completed = task.completed, "Toggled task");

        self.save();
        true
    }

    pub fn delete_task(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            debug!(id, "delete_task: no such task");
            return false;
        }

        debug!(id, "Deleted task");
        self.save();
        true
    }

    // ========================================================================
    // Filter criteria
    // ========================================================================

    pub fn set_status_filter(&mut self, status: StatusFilter) {
        self.criteria.status = status;
        self.save();
    }

    pub fn set_priority_filter(&mut self, priority: PriorityFilter) {
        self.criteria.priority = priority;
        self.save();
    }

    pub fn set_category_filter(&mut self, category: CategoryFilter) {
        self.criteria.category = category;
        self.save();
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.criteria.search_query = query.into();
        self.save();
    }

    pub fn set_date_range_filter(&mut self, range: DateRange) {
        self.criteria.date_range = range;
        self.save();
    }

    /// Require `tag` (OR'd with any other required tags)
    pub fn add_tag_filter(&mut self, tag: &str) {
        if self.criteria.add_tag(tag) {
            self.save();
        }
    }

    pub fn remove_tag_filter(&mut self, tag: &str) {
        if self.criteria.remove_tag(tag) {
            self.save();
        }
    }

    /// Reset every criterion to its permissive default
    pub fn clear_filters(&mut self) {
        self.criteria = FilterCriteria::default();
        self.save();
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// All tasks in insertion order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn filter_criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Tasks passing the active criteria, in insertion order
    pub fn filtered_tasks(&self) -> Vec<&Task> {
        let today = self.clock.today();
        self.tasks.iter().filter(|t| self.criteria.matches(t, today)).collect()
    }

    pub fn stats(&self) -> TodoStats {
        TodoStats::compute(&self.tasks, self.clock.today())
    }

    pub fn overdue_tasks(&self) -> Vec<&Task> {
        let today = self.clock.today();
        self.tasks.iter().filter(|t| t.is_overdue(today)).collect()
    }

    /// Exact category match, ignoring the active criteria
    pub fn tasks_by_category(&self, category: Category) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.category == category).collect()
    }

    /// Distinct tags across all tasks, in first-seen order
    pub fn all_tags(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.tasks
            .iter()
            .flat_map(|t| t.tags.iter().map(String::as_str))
            .filter(|tag| seen.insert(*tag))
            .collect()
    }
}
