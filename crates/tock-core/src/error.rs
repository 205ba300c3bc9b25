//! Error types shared across the tock crates.
//!
//! Organized by subsystem: event delays, task execution, and world
//! registration. Engine-local errors (configuration, submission) live in
//! `tock-engine`.

use std::error::Error;
use std::fmt;

use smallvec::SmallVec;

// ── DelayError ─────────────────────────────────────────────────────

/// A recurring event's delay was set to an invalid value.
///
/// The rejected call leaves the event's previous delay in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DelayError {
    /// The requested delay was negative.
    Negative {
        /// The rejected delay, in milliseconds.
        delay_ms: i64,
    },
}

impl fmt::Display for DelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negative { delay_ms } => {
                write!(f, "event delay must not be negative, got {delay_ms}ms")
            }
        }
    }
}

impl Error for DelayError {}

// ── TaskFailure ────────────────────────────────────────────────────

/// Failure of a single leaf task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskFailure {
    /// The leaf returned an error.
    Failed {
        /// Label of the failing leaf.
        task: String,
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The leaf panicked; the panic was caught at the task boundary.
    Panicked {
        /// Label of the panicking leaf.
        task: String,
        /// The panic payload, if it was a string.
        message: String,
    },
}

impl TaskFailure {
    /// Convenience constructor for [`TaskFailure::Failed`].
    pub fn failed(task: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            task: task.into(),
            reason: reason.into(),
        }
    }

    /// Label of the leaf that failed.
    pub fn task(&self) -> &str {
        match self {
            Self::Failed { task, .. } | Self::Panicked { task, .. } => task,
        }
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { task, reason } => write!(f, "task '{task}' failed: {reason}"),
            Self::Panicked { task, message } => write!(f, "task '{task}' panicked: {message}"),
        }
    }
}

impl Error for TaskFailure {}

// ── TaskError ──────────────────────────────────────────────────────

/// Aggregated failure of one task execution.
///
/// A parallel group lets every child finish before reporting, so one
/// execution can carry several failures. They are kept in completion
/// order; the first is reported as the error source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskError {
    failures: SmallVec<[TaskFailure; 1]>,
}

impl TaskError {
    /// Wrap a single failure.
    pub fn single(failure: TaskFailure) -> Self {
        let mut failures = SmallVec::new();
        failures.push(failure);
        Self { failures }
    }

    /// Fold the failures of `other` into `self`.
    pub fn merge(&mut self, other: TaskError) {
        self.failures.extend(other.failures);
    }

    /// Combine a set of child errors, or `None` if there were none.
    pub fn aggregate(errors: impl IntoIterator<Item = TaskError>) -> Option<Self> {
        let mut iter = errors.into_iter();
        let mut first = iter.next()?;
        for e in iter {
            first.merge(e);
        }
        Some(first)
    }

    /// Every leaf failure collected by this execution.
    pub fn failures(&self) -> &[TaskFailure] {
        &self.failures
    }

    /// Number of failed leaves.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Always false; a `TaskError` holds at least one failure.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl From<TaskFailure> for TaskError {
    fn from(failure: TaskFailure) -> Self {
        Self::single(failure)
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failures.as_slice() {
            [] => write!(f, "task execution failed"),
            [only] => write!(f, "{only}"),
            [first, ..] => write!(f, "{} tasks failed; first: {first}", self.failures.len()),
        }
    }
}

impl Error for TaskError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.failures.first().map(|f| f as &(dyn Error + 'static))
    }
}

// ── RegisterError ──────────────────────────────────────────────────

/// Reasons the world refuses to register an entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegisterError {
    /// Every slot in the entity table is taken.
    WorldFull,
    /// A player with the same name is already online.
    AlreadyOnline {
        /// The duplicate name.
        name: String,
    },
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorldFull => write!(f, "world is full"),
            Self::AlreadyOnline { name } => write!(f, "player '{name}' is already online"),
        }
    }
}

impl Error for RegisterError {}
