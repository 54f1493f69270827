// Join-Order Planner Module
//
// Reconstructs a query so that its joins are applied in a caller-supplied
// order, building a left-deep join tree.

pub mod join_sequence;
pub mod join_tree;
pub mod reconstruct;

pub use self::join_sequence::{check_permutation, plan_join_sequence, JoinSequence, JoinStep};
pub use self::join_tree::{JoinTree, ReconstructedQuery};
pub use self::reconstruct::{build_query, reconstruct, reconstruct_indices};
