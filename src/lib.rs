// TodoStore - Todo-list state with filtering, statistics and blob persistence

pub mod clock;
pub mod config;
pub mod filter;
pub mod form;
pub mod ids;
pub mod models;
pub mod stats;
pub mod storage;
pub mod store;

// Re-export main types for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Config, StorageBackend, StorageConfig};
pub use filter::{CategoryFilter, DateRange, FilterCriteria, PriorityFilter, StatusFilter};
pub use form::{TagError, TaskForm, ValidationErrors};
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use models::{Category, NewTask, Priority, Task, TaskPatch};
pub use stats::TodoStats;
pub use storage::{FileStorage, MemoryStorage, SqliteStorage, Storage, open_storage};
pub use store::{Snapshot, TaskStore};
