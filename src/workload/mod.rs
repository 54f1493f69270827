// Workload Module
//
// Collaborators around the join-order core: run history, the executor
// boundary, workload loading and the runner that ties them together.

pub mod history;
pub mod executor;
pub mod loader;
pub mod runner;

pub use self::history::{FileHistory, HistoryError, HistoryStore, InMemoryHistory, RunRecord, SharedHistory};
pub use self::executor::{DryRunExecutor, ExecutionOutcome, ExecutorError, QueryExecutor};
pub use self::loader::{load_query, load_workload, WorkloadQuery};
pub use self::runner::{QueryOutcome, RunSummary, RunnerConfig, WorkloadRunner};
