// Permutation Generation and Identification
//
// Draws uniformly random orderings of a query's join predicates and names
// each one with a canonical identifier that can be stored in run history.

use std::fmt;
use std::str::FromStr;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::query::model::{JoinOrderError, JoinOrderResult, JoinPredicate, QueryModel};
use crate::query::planner::plan_join_sequence;

/// Separator between predicate indices in an identifier
pub const ID_SEPARATOR: char = '-';

/// Canonical name of one join ordering.
///
/// Encodes the sequence of indices into `QueryModel::joins()` as decimal
/// numbers joined by `-`, e.g. `2-0-1`. A query without joins has the empty
/// identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermutationId(String);

impl PermutationId {
    pub fn from_indices(order: &[usize]) -> Self {
        let parts: Vec<String> = order.iter().map(usize::to_string).collect();
        PermutationId(parts.join(&ID_SEPARATOR.to_string()))
    }

    /// Decode the index sequence
    pub fn indices(&self) -> JoinOrderResult<Vec<usize>> {
        if self.0.is_empty() {
            return Ok(Vec::new());
        }
        self.0
            .split(ID_SEPARATOR)
            .map(|part| {
                part.parse::<usize>().map_err(|_| {
                    JoinOrderError::MalformedModel(format!("'{}' is not a permutation identifier", self.0))
                })
            })
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PermutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PermutationId {
    type Err = JoinOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = PermutationId(s.trim().to_string());
        // Round-trip through the indices so equal orderings compare equal
        // regardless of leading zeros or whitespace.
        Ok(PermutationId::from_indices(&id.indices()?))
    }
}

/// One drawn ordering of a query's join predicates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    /// Canonical identifier
    pub id: PermutationId,
    /// Indices into `QueryModel::joins()` in the order they were drawn
    pub order: Vec<usize>,
}

impl Permutation {
    /// Build a permutation from an explicit ordering, computing its identifier
    pub fn from_order(model: &QueryModel, order: Vec<usize>) -> Self {
        Permutation {
            id: canonical_id(model, &order),
            order,
        }
    }

    /// The drawn ordering as predicates
    pub fn predicates(&self, model: &QueryModel) -> Vec<JoinPredicate> {
        self.order
            .iter()
            .filter_map(|&index| model.joins().get(index).cloned())
            .collect()
    }
}

/// Identifier for `order`.
///
/// Realizable orderings are named by their canonical form, so orderings that
/// only move residual predicates around share one identifier. Orderings that
/// cannot be realized keep their raw index sequence.
pub fn canonical_id(model: &QueryModel, order: &[usize]) -> PermutationId {
    match plan_join_sequence(model, order) {
        Ok(sequence) => PermutationId::from_indices(&sequence.canonical_order()),
        Err(_) => PermutationId::from_indices(order),
    }
}

/// Number of distinct orderings of `n` predicates, saturating at `u128::MAX`
pub fn ordering_count(n: usize) -> u128 {
    (1..=n as u128).try_fold(1u128, |acc, k| acc.checked_mul(k)).unwrap_or(u128::MAX)
}

/// Uniform random source of join orderings
pub struct PermutationGenerator<R: Rng = StdRng> {
    rng: R,
}

impl PermutationGenerator<StdRng> {
    /// Generator with a fixed seed, for reproducible exploration
    pub fn seeded(seed: u64) -> Self {
        PermutationGenerator::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        PermutationGenerator::new(StdRng::from_entropy())
    }
}

impl<R: Rng> PermutationGenerator<R> {
    pub fn new(rng: R) -> Self {
        PermutationGenerator { rng }
    }

    /// Draw a Fisher-Yates shuffle of the model's join predicates
    pub fn generate(&mut self, model: &QueryModel) -> Permutation {
        let mut order: Vec<usize> = (0..model.join_count()).collect();
        order.shuffle(&mut self.rng);
        Permutation::from_order(model, order)
    }
}
