// Query Executor Adapter
//
// Boundary to the engine that actually runs reconstructed queries. Connection
// handling and optimizer settings live behind this trait.

use std::time::{Duration, Instant};

use thiserror::Error;

/// Measurement of one execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub elapsed: Duration,
    pub rows: usize,
}

/// Error type for query execution
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Execution failed: {0}")]
    Failed(String),

    #[error("Execution timed out after {0:?}")]
    Timeout(Duration),
}

/// Runs a query string and reports its cost
pub trait QueryExecutor {
    fn execute(&mut self, sql: &str) -> Result<ExecutionOutcome, ExecutorError>;
}

impl<F> QueryExecutor for F
where
    F: FnMut(&str) -> Result<ExecutionOutcome, ExecutorError>,
{
    fn execute(&mut self, sql: &str) -> Result<ExecutionOutcome, ExecutorError> {
        self(sql)
    }
}

/// Executor that only collects the statements it is given
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    statements: Vec<String>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Take the collected statements, leaving the executor empty
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.statements)
    }
}

impl QueryExecutor for DryRunExecutor {
    fn execute(&mut self, sql: &str) -> Result<ExecutionOutcome, ExecutorError> {
        let start = Instant::now();
        self.statements.push(sql.to_string());
        Ok(ExecutionOutcome {
            elapsed: start.elapsed(),
            rows: 0,
        })
    }
}
