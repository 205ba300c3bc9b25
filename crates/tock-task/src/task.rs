//! The closed set of task shapes.

use std::any::Any;
use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use tock_core::error::{TaskError, TaskFailure};

/// What a leaf body returns. Any error type can be raised with `?`; it is
/// reported as [`TaskFailure::Failed`] with the leaf's label.
pub type LeafResult = Result<(), Box<dyn Error + Send + Sync>>;

type LeafBody = Box<dyn FnOnce() -> LeafResult + Send + 'static>;

// ── Leaf ───────────────────────────────────────────────────────────

/// An indivisible unit of work.
pub struct Leaf {
    label: Cow<'static, str>,
    body: LeafBody,
}

impl Leaf {
    /// Label used in failure reports and logs.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run the body on the current thread.
    ///
    /// Errors and panics are both converted into a [`TaskError`]; a panic
    /// never escapes a leaf.
    pub fn run(self) -> Result<(), TaskError> {
        let Leaf { label, body } = self;
        match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TaskError::single(TaskFailure::Failed {
                task: label.into_owned(),
                reason: e.to_string(),
            })),
            Err(payload) => Err(TaskError::single(TaskFailure::Panicked {
                task: label.into_owned(),
                message: panic_message(payload.as_ref()),
            })),
        }
    }
}

impl fmt::Debug for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Leaf").field("label", &self.label).finish()
    }
}

/// Best-effort text of a panic payload, for logging a caught unwind.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

// ── Task ───────────────────────────────────────────────────────────

/// A schedulable unit of work.
///
/// Tasks are built fresh for one execution and consumed by it. Group
/// children are fixed at construction.
///
/// Parallel children must not touch state that a sibling mutates during
/// the same execution. The type does not enforce this; builders group work
/// so that each parallel child writes only to its own entity.
#[derive(Debug)]
pub enum Task {
    /// A single body.
    Leaf(Leaf),
    /// Children run strictly in order; child `i + 1` starts only after
    /// child `i` (and any barrier it contains) has returned.
    Sequential(Box<[Task]>),
    /// Children run concurrently with no ordering between them.
    Parallel(Box<[Task]>),
}

impl Task {
    /// Build a leaf.
    pub fn leaf<F>(label: impl Into<Cow<'static, str>>, body: F) -> Self
    where
        F: FnOnce() -> LeafResult + Send + 'static,
    {
        Self::Leaf(Leaf {
            label: label.into(),
            body: Box::new(body),
        })
    }

    /// Build a sequential group.
    pub fn sequential(children: impl IntoIterator<Item = Task>) -> Self {
        Self::Sequential(children.into_iter().collect())
    }

    /// Build a parallel group.
    pub fn parallel(children: impl IntoIterator<Item = Task>) -> Self {
        Self::Parallel(children.into_iter().collect())
    }

    /// Number of leaves in this tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Sequential(children) | Self::Parallel(children) => {
                children.iter().map(Task::leaf_count).sum()
            }
        }
    }

    /// Run the whole tree on the current thread.
    ///
    /// Sequential groups stop at the first failing child. Parallel groups
    /// still run every child and aggregate the failures, they just do it
    /// one after another. Used by pool workers so a nested parallel group
    /// never waits on the pool it is running in.
    pub fn run_inline(self) -> Result<(), TaskError> {
        match self {
            Self::Leaf(leaf) => leaf.run(),
            Self::Sequential(children) => {
                for child in children.into_vec() {
                    child.run_inline()?;
                }
                Ok(())
            }
            Self::Parallel(children) => {
                let errors: Vec<TaskError> = children
                    .into_vec()
                    .into_iter()
                    .filter_map(|child| child.run_inline().err())
                    .collect();
                TaskError::aggregate(errors).map_or(Ok(()), Err)
            }
        }
    }
}
