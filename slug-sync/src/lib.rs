//! # slug-sync
//!
//! Incremental synchronization of a fleet of package repositories against the
//! shared reference index.
//!
//! [`fetch`] is the core pass: classify every indexed repository, fetch only
//! the ones whose tracking refs differ, in parallel, and optionally prune
//! clones that vanished upstream. The functions in [`phases`] build
//! checkout, clone and pull on top of it.

pub mod dispatcher;
pub mod error;
pub mod outcome;
pub mod phases;
pub mod pipeline;
pub mod planner;
pub mod pool;
pub mod pruner;

pub use dispatcher::{DispatchReport, Dispatcher, FetchJob};
pub use error::SyncError;
pub use outcome::{NullReporter, Phase, RepoOutcome, Reporter, SyncOutcome};
pub use phases::PhaseReport;
pub use pipeline::{fetch, FetchOptions, FetchReport, SyncContext};
pub use planner::{plan, Eligibility, FetchSpec, PlanPolicy};
pub use pool::{CancelToken, PoolReport, WorkerPool};
