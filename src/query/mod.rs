// Query Module
//
// Query model, join-order reconstruction, permutation exploration and the
// restricted extractor that feeds them.

pub mod model;
pub mod parser;
pub mod planner;
pub mod explorer;

pub use model::{JoinOrderError, JoinPredicate, QueryModel};
pub use parser::extract;
pub use planner::{reconstruct, reconstruct_indices};
pub use explorer::{explore, Exploration, Explorer, PermutationId};
