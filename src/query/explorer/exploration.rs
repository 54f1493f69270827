// Exploration Loop
//
// Repeatedly draws join orderings until one is both unseen in history and
// realizable, or until the retry budget is spent.

use std::collections::HashSet;

use rand::Rng;
use rand::rngs::StdRng;

use crate::query::model::{JoinOrderResult, QueryModel};
use crate::query::planner::reconstruct_indices;
use super::permutation::{PermutationGenerator, PermutationId};

/// Default number of discarded draws before giving up on a query
pub const DEFAULT_BUDGET: usize = 100;

/// Configuration for the exploration loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorationConfig {
    /// Discarded draws (already tried or unrealizable) allowed before
    /// the search is declared exhausted
    pub budget: usize,
    /// Seed for reproducible exploration, entropy when unset
    pub seed: Option<u64>,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            budget: DEFAULT_BUDGET,
            seed: None,
        }
    }
}

/// Outcome of one exploration call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exploration {
    /// A fresh, realizable ordering
    Found {
        id: PermutationId,
        query: String,
        /// Draws discarded before this one
        attempts: usize,
    },
    /// Budget spent without finding a fresh ordering
    Exhausted { attempts: usize },
}

impl Exploration {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Exploration::Exhausted { .. })
    }
}

/// Draw orderings until one is neither in `already_tried` nor unrealizable.
///
/// Both kinds of rejected draw count against the same `budget`; once more
/// than `budget` draws have been rejected the result is `Exhausted`. Only a
/// malformed model is reported as an error.
pub fn explore<R: Rng>(
    model: &QueryModel,
    already_tried: &HashSet<PermutationId>,
    budget: usize,
    generator: &mut PermutationGenerator<R>,
) -> JoinOrderResult<Exploration> {
    model.validate()?;

    let mut failures = 0;
    loop {
        let permutation = generator.generate(model);

        if !already_tried.contains(&permutation.id) {
            match reconstruct_indices(model, &permutation.id.indices()?) {
                Ok(query) => {
                    return Ok(Exploration::Found {
                        id: permutation.id,
                        query,
                        attempts: failures,
                    });
                }
                Err(err) if err.is_invalid_order() => {}
                Err(err) => return Err(err),
            }
        }

        failures += 1;
        if failures > budget {
            return Ok(Exploration::Exhausted { attempts: failures });
        }
    }
}

/// Exploration loop bound to a configuration and a random source
pub struct Explorer<R: Rng = StdRng> {
    config: ExplorationConfig,
    generator: PermutationGenerator<R>,
}

impl Explorer<StdRng> {
    pub fn new(config: ExplorationConfig) -> Self {
        let generator = match config.seed {
            Some(seed) => PermutationGenerator::seeded(seed),
            None => PermutationGenerator::from_entropy(),
        };
        Explorer { config, generator }
    }
}

impl<R: Rng> Explorer<R> {
    pub fn with_generator(config: ExplorationConfig, generator: PermutationGenerator<R>) -> Self {
        Explorer { config, generator }
    }

    pub fn config(&self) -> &ExplorationConfig {
        &self.config
    }

    pub fn explore(
        &mut self,
        model: &QueryModel,
        already_tried: &HashSet<PermutationId>,
    ) -> JoinOrderResult<Exploration> {
        explore(model, already_tried, self.config.budget, &mut self.generator)
    }
}
