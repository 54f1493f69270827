// joinperm: join-order permutation engine
//
// Rebuilds single-block SQL queries under arbitrary join orders and tracks
// which orders have already been explored.

pub mod query;
pub mod workload;

// Re-export key items for convenient access
pub use query::model::{ColumnRef, JoinOrderError, JoinOrderResult, JoinPredicate, QueryModel};
pub use query::parser::{extract, ExtractError};
pub use query::planner::{reconstruct, reconstruct_indices};
pub use query::explorer::{explore, Exploration, ExplorationConfig, Explorer, Permutation, PermutationGenerator, PermutationId};
pub use workload::{HistoryStore, QueryExecutor, RunRecord, RunnerConfig, WorkloadRunner};
