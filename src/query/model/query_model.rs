// Query Model Implementation
//
// Holds everything needed to rebuild a query under an arbitrary join order.
// The model is populated once by an extractor and is read-only afterwards.

use std::fmt;

use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Serialize};

use super::error::{JoinOrderError, JoinOrderResult};
use super::predicate::{quote_identifier, JoinPredicate};

/// Structured representation of a single-block join query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryModel {
    /// alias -> table name, in FROM-clause order
    tables: LinkedHashMap<String, String>,
    /// Verbatim text between SELECT and FROM
    projection: String,
    /// Non-join conjuncts of the WHERE clause, may be empty
    filter: String,
    /// Join predicates in canonical storage order (sorted, no duplicates)
    joins: Vec<JoinPredicate>,
}

impl QueryModel {
    /// Create an empty model with the given projection
    pub fn new(projection: impl Into<String>) -> Self {
        QueryModel {
            projection: projection.into().trim().to_string(),
            ..Default::default()
        }
    }

    /// Bind a table under an alias. Without an alias the table name is used.
    pub fn add_table(&mut self, table: impl Into<String>, alias: Option<&str>) -> JoinOrderResult<()> {
        let table = table.into();
        let alias = alias.map(str::to_string).unwrap_or_else(|| table.clone());

        if self.tables.contains_key(&alias) {
            return Err(JoinOrderError::MalformedModel(format!(
                "alias '{}' is bound more than once",
                alias
            )));
        }

        self.tables.insert(alias, table);
        Ok(())
    }

    pub fn set_projection(&mut self, projection: impl Into<String>) {
        self.projection = projection.into().trim().to_string();
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into().trim().to_string();
    }

    /// Insert a join predicate. Returns false if an equal predicate was
    /// already present.
    pub fn add_join(&mut self, join: JoinPredicate) -> JoinOrderResult<bool> {
        self.check_bound(&join)?;

        match self.joins.binary_search(&join) {
            Ok(_) => Ok(false),
            Err(pos) => {
                self.joins.insert(pos, join);
                Ok(true)
            }
        }
    }

    pub fn tables(&self) -> &LinkedHashMap<String, String> {
        &self.tables
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn table_for(&self, alias: &str) -> Option<&str> {
        self.tables.get(alias).map(String::as_str)
    }

    pub fn projection(&self) -> &str {
        &self.projection
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Join predicates in canonical storage order.
    /// Identifier indices refer to positions in this slice.
    pub fn joins(&self) -> &[JoinPredicate] {
        &self.joins
    }

    pub fn join_count(&self) -> usize {
        self.joins.len()
    }

    /// Position of a predicate in canonical storage order
    pub fn index_of(&self, join: &JoinPredicate) -> Option<usize> {
        self.joins.binary_search(join).ok()
    }

    /// Render a binding as it appears in FROM / JOIN clauses
    pub fn binding_sql(&self, alias: &str) -> JoinOrderResult<String> {
        match self.tables.get(alias) {
            Some(table) if table == alias => Ok(quote_identifier(table).into_owned()),
            Some(table) => Ok(format!("{} AS {}", quote_identifier(table), quote_identifier(alias))),
            None => Err(JoinOrderError::MalformedModel(format!("unknown table alias '{}'", alias))),
        }
    }

    /// Re-check all structural invariants
    pub fn validate(&self) -> JoinOrderResult<()> {
        if self.tables.is_empty() {
            return Err(JoinOrderError::MalformedModel("query binds no tables".to_string()));
        }
        for join in &self.joins {
            self.check_bound(join)?;
        }
        Ok(())
    }

    fn check_bound(&self, join: &JoinPredicate) -> JoinOrderResult<()> {
        for alias in [join.left_table(), join.right_table()] {
            if !self.tables.contains_key(alias) {
                return Err(JoinOrderError::MalformedModel(format!(
                    "join '{}' references unbound alias '{}'",
                    join, alias
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for QueryModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings: Vec<String> = self
            .tables
            .iter()
            .map(|(alias, table)| format!("{} AS {}", quote_identifier(table), quote_identifier(alias)))
            .collect();

        writeln!(f, "SELECT\t{}", self.projection)?;
        writeln!(f, "FROM\t{}", bindings.join(", "))?;
        writeln!(f, "WHERE\t{}", self.filter)?;
        writeln!(f, "JOINS: [{}]", self.joins.len())?;
        for (i, join) in self.joins.iter().enumerate() {
            writeln!(f, "\t{}: {}", i, join)?;
        }
        Ok(())
    }
}
