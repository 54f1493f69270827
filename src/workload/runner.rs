// Workload Runner
//
// Drives exploration across a workload: for each pass and each query, find a
// fresh ordering, execute it and record the timing in history.

use anyhow::{Context, Result};

use crate::query::explorer::{Exploration, ExplorationConfig, Explorer, PermutationId};
use super::executor::QueryExecutor;
use super::history::{HistoryStore, RunRecord};
use super::loader::WorkloadQuery;

/// Configuration for a workload run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub exploration: ExplorationConfig,
    /// Number of sweeps over the workload
    pub passes: usize,
    /// Recorded with every run; the executor is expected to be configured
    /// to match
    pub optimizer_enabled: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            exploration: ExplorationConfig::default(),
            passes: 1,
            optimizer_enabled: true,
        }
    }
}

/// What happened to one query in one pass
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Executed(RunRecord),
    Exhausted { attempts: usize },
    Failed { id: PermutationId, error: String },
}

/// Counters for a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: usize,
    pub exhausted: usize,
    pub failed: usize,
}

impl RunSummary {
    fn add(&mut self, outcome: &QueryOutcome) {
        match outcome {
            QueryOutcome::Executed(_) => self.executed += 1,
            QueryOutcome::Exhausted { .. } => self.exhausted += 1,
            QueryOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

pub struct WorkloadRunner<E: QueryExecutor, H: HistoryStore> {
    config: RunnerConfig,
    explorer: Explorer,
    executor: E,
    history: H,
}

impl<E: QueryExecutor, H: HistoryStore> WorkloadRunner<E, H> {
    pub fn new(config: RunnerConfig, executor: E, history: H) -> Self {
        let explorer = Explorer::new(config.exploration.clone());
        WorkloadRunner {
            config,
            explorer,
            executor,
            history,
        }
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn into_parts(self) -> (E, H) {
        (self.executor, self.history)
    }

    /// Run all passes over the workload
    pub fn run(&mut self, queries: &[WorkloadQuery]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for pass in 1..=self.config.passes {
            log::info!("Pass {}/{} over {} queries", pass, self.config.passes, queries.len());
            for query in queries {
                let outcome = self.run_query(query)?;
                summary.add(&outcome);
            }
        }

        log::info!(
            "Run finished: {} executed, {} exhausted, {} failed",
            summary.executed,
            summary.exhausted,
            summary.failed
        );
        Ok(summary)
    }

    /// Explore, execute and record one fresh ordering of `query`
    pub fn run_query(&mut self, query: &WorkloadQuery) -> Result<QueryOutcome> {
        let tried = self.history.tried(&query.id);
        let exploration = self
            .explorer
            .explore(&query.model, &tried)
            .with_context(|| format!("Query {} has a malformed model", query.id))?;

        let (id, sql) = match exploration {
            Exploration::Found { id, query: sql, attempts } => {
                log::debug!("Query {}: ordering {} after {} discarded draws", query.id, id, attempts);
                (id, sql)
            }
            Exploration::Exhausted { attempts } => {
                log::warn!(
                    "Could not find a fresh join ordering for query {} in {} attempts",
                    query.id,
                    attempts
                );
                return Ok(QueryOutcome::Exhausted { attempts });
            }
        };

        match self.executor.execute(&sql) {
            Ok(outcome) => {
                let record = RunRecord {
                    query_id: query.id.clone(),
                    permutation_id: id,
                    elapsed: outcome.elapsed,
                    rows: outcome.rows,
                    optimizer_enabled: self.config.optimizer_enabled,
                    executed: true,
                };
                self.history
                    .record(record.clone())
                    .with_context(|| format!("Failed to record run of query {}", query.id))?;
                log::info!("Query {} [{}]: {:?}", query.id, record.permutation_id, record.elapsed);
                Ok(QueryOutcome::Executed(record))
            }
            Err(err) => {
                log::error!("Query {} [{}] failed: {}", query.id, id, err);
                Ok(QueryOutcome::Failed {
                    id,
                    error: err.to_string(),
                })
            }
        }
    }
}
