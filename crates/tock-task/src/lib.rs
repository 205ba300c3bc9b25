//! Task composition and barrier execution.
//!
//! A [`Task`] is a leaf, an ordered [`Task::Sequential`] group, or an
//! unordered [`Task::Parallel`] group. [`TaskScheduler::execute`] runs one
//! synchronously: sequential children run in order on the calling thread,
//! parallel children fan out to a fixed-size [`WorkerPool`] and the caller
//! blocks until every child has reported back.
//!
//! ```text
//! caller                     tock-worker-0 .. tock-worker-N
//!   | execute(Parallel[a,b,c])        |
//!   |--job a, b, c (unbounded)------->|
//!   |   recv() x3 on reply channel    | run child, send Result
//!   |<--Result a/b/c------------------|
//!   | aggregate failures, return      |
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod pool;
pub mod scheduler;
pub mod task;

pub use pool::{PoolError, WorkerPool};
pub use scheduler::TaskScheduler;
pub use task::{panic_message, Leaf, LeafResult, Task};
