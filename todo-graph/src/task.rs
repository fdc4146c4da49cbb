use chrono::{DateTime, SubsecRound, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::TaskError;

/// Opaque task identifier, assigned by the store at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for TaskId {
    type Err = TaskError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| TaskError::validation(format!("malformed task id '{}'", raw)))
    }
}

/// Urgency of a task.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Returns the literal enum name used on the wire and in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    /// Parses `LOW`, `MEDIUM` or `HIGH`, ignoring ASCII case.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        [Priority::Low, Priority::Medium, Priority::High]
            .into_iter()
            .find(|priority| priority.as_str().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| {
                TaskError::validation(format!(
                    "unknown priority '{}', expected one of LOW, MEDIUM, HIGH",
                    raw
                ))
            })
    }
}

/// A task title that is guaranteed not to be blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Title(String);

impl Title {
    /// Trims `raw` and rejects it if nothing is left.
    pub fn parse(raw: &str) -> Result<Self, TaskError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TaskError::validation("title must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validated input for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: Title,
    pub description: Option<String>,
    pub priority: Priority,
}

impl NewTask {
    /// Builds a creation request. A blank description is treated as absent and
    /// a missing priority falls back to [`Priority::Medium`].
    pub fn new(
        title: &str,
        description: Option<String>,
        priority: Option<Priority>,
    ) -> Result<Self, TaskError> {
        Ok(Self {
            title: Title::parse(title)?,
            description: description.filter(|text| !text.trim().is_empty()),
            priority: priority.unwrap_or_default(),
        })
    }
}

/// Validated partial update. `None` leaves the field untouched.
///
/// `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<Title>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
}

impl TaskPatch {
    /// Builds a patch from raw optional fields. An empty description string
    /// clears the description; an empty title is rejected.
    pub fn new(
        title: Option<&str>,
        description: Option<String>,
        completed: Option<bool>,
        priority: Option<Priority>,
    ) -> Result<Self, TaskError> {
        Ok(Self {
            title: title.map(Title::parse).transpose()?,
            description: description.map(|text| Some(text).filter(|t| !t.trim().is_empty())),
            completed,
            priority,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.priority.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    title: Title,
    description: Option<String>,
    completed: bool,
    priority: Priority,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a fresh, pending task with a new id.
    pub fn create(new_task: NewTask) -> Self {
        let now = current_timestamp();
        Self {
            id: TaskId::new(),
            title: new_task.title,
            description: new_task.description,
            completed: false,
            priority: new_task.priority,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a task previously written by a store.
    pub fn restore(
        id: TaskId,
        title: Title,
        description: Option<String>,
        completed: bool,
        priority: Priority,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            description,
            completed,
            priority,
            created_at,
            updated_at: updated_at.max(created_at),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn title(&self) -> &str {
        self.title.as_str()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Applies every field present in `patch` and bumps `updated_at`.
    pub fn apply(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        self.touch();
    }

    /// Flips the completion flag and bumps `updated_at`.
    pub fn toggle(&mut self) {
        self.completed = !self.completed;
        self.touch();
    }

    /// Case-insensitive substring match on title and description.
    ///
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.title.as_str().to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .is_some_and(|description| description.to_lowercase().contains(needle))
    }

    fn touch(&mut self) {
        self.updated_at = next_timestamp(self.updated_at);
    }
}

/// Aggregate counts over the task collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub high_priority: usize,
}

impl TaskStats {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        Self::tally(tasks.into_iter().map(|task| (task.completed, task.priority)))
    }

    /// Counts `(completed, priority)` pairs.
    pub fn tally(entries: impl IntoIterator<Item = (bool, Priority)>) -> Self {
        let mut stats = TaskStats::default();
        for (completed, priority) in entries {
            stats.total += 1;
            if completed {
                stats.completed += 1;
            }
            if priority == Priority::High {
                stats.high_priority += 1;
            }
        }
        stats.pending = stats.total - stats.completed;
        stats
    }
}

// Microsecond precision so timestamps survive a database round-trip unchanged.
fn current_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = current_timestamp();
    if now > previous {
        now
    } else {
        previous + chrono::Duration::microseconds(1)
    }
}
