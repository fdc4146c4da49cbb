//! Task store for the todo-graph backend.
//!
//! The crate owns the task data model, the validated inputs the API boundary
//! builds from raw requests, and the [`TaskStore`] trait every storage backend
//! implements. [`InMemoryTaskStore`] is the default backend.

pub mod error;
pub mod store;
pub mod task;

pub use error::TaskError;
pub use store::{InMemoryTaskStore, MockTaskStore, TaskStore};
pub use task::{NewTask, Priority, Task, TaskId, TaskPatch, TaskStats, Title};
