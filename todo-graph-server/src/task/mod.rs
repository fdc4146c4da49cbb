use std::sync::Arc;
use todo_graph::TaskStore;

pub mod api;
pub mod store;

pub use store::SeaOrmTaskStore;

/// Shared state for task handlers: the injected store backend.
#[derive(Clone)]
pub struct TaskState {
    pub store: Arc<dyn TaskStore>,
}

impl TaskState {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }
}
