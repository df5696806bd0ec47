//! Bulk fetch task definitions
//!
//! A task is created pending, held by exactly one worker while it is being
//! fetched, and ends in one of two terminal statuses.

use std::fmt;

/// Identifier of a bulk resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a bulk task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Waiting in the queue or held by a worker
    Pending,

    /// Fetched and stored
    Succeeded,

    /// Failed on every permitted attempt
    Exhausted,
}

impl TaskStatus {
    /// Returns true if no further processing will happen
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of bulk work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTask {
    pub id: TaskId,

    /// Failed attempts so far
    pub retries: u32,

    pub status: TaskStatus,

    /// Last failure, kept for exhausted tasks
    pub last_error: Option<String>,
}

impl FetchTask {
    pub fn new(id: impl Into<TaskId>) -> Self {
        Self {
            id: id.into(),
            retries: 0,
            status: TaskStatus::Pending,
            last_error: None,
        }
    }

    /// Creates one pending task per id in `start..=end`
    pub fn range(start: u64, end: u64) -> Vec<Self> {
        (start..=end).map(Self::new).collect()
    }

    /// Marks the task succeeded after `attempts` attempts
    pub fn succeed(&mut self, attempts: u32) {
        self.retries = attempts.saturating_sub(1);
        self.status = TaskStatus::Succeeded;
        self.last_error = None;
    }

    /// Marks the task exhausted after `attempts` failed attempts
    pub fn exhaust(&mut self, attempts: u32, error: impl Into<String>) {
        self.retries = attempts;
        self.status = TaskStatus::Exhausted;
        self.last_error = Some(error.into());
    }
}
