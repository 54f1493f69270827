// Join-Order Exploration Module
//
// Random permutation generation, canonical identifiers and the bounded
// exploration loop that skips orderings already present in history.

pub mod permutation;
pub mod exploration;

pub use self::permutation::{canonical_id, ordering_count, Permutation, PermutationGenerator, PermutationId};
pub use self::exploration::{explore, Exploration, ExplorationConfig, Explorer, DEFAULT_BUDGET};
