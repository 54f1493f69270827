// Left-Deep Join Tree
//
// Plan representation produced from a classified join sequence and rendered
// back to SQL text.

use std::fmt;

use crate::query::model::{quote_identifier, JoinOrderError, JoinOrderResult, JoinPredicate, QueryModel};
use crate::query::parser::has_top_level_or;
use super::join_sequence::{JoinSequence, JoinStep};

/// A node in a left-deep join tree
#[derive(Debug, Clone, PartialEq)]
pub enum JoinTree {
    /// Scan a bound table
    Scan {
        /// Table name
        table_name: String,
        /// Alias the query refers to it by
        alias: String,
    },
    /// Inner join of the tree so far with one more table
    Join {
        /// Accumulated left input
        left: Box<JoinTree>,
        /// Always a `Scan` in a left-deep tree
        right: Box<JoinTree>,
        /// ON condition
        condition: JoinPredicate,
    },
}

impl JoinTree {
    fn scan(model: &QueryModel, alias: &str) -> JoinOrderResult<Self> {
        let table_name = model
            .table_for(alias)
            .ok_or_else(|| JoinOrderError::MalformedModel(format!("unknown table alias '{}'", alias)))?;
        Ok(JoinTree::Scan {
            table_name: table_name.to_string(),
            alias: alias.to_string(),
        })
    }

    /// Aliases in FROM / JOIN order
    pub fn aliases(&self) -> Vec<&str> {
        match self {
            JoinTree::Scan { alias, .. } => vec![alias.as_str()],
            JoinTree::Join { left, right, .. } => {
                let mut aliases = left.aliases();
                aliases.extend(right.aliases());
                aliases
            }
        }
    }

    /// Number of INNER JOIN clauses
    pub fn depth(&self) -> usize {
        match self {
            JoinTree::Scan { .. } => 0,
            JoinTree::Join { left, .. } => left.depth() + 1,
        }
    }
}

impl fmt::Display for JoinTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinTree::Scan { table_name, alias } if table_name == alias => {
                write!(f, "{}", quote_identifier(table_name))
            }
            JoinTree::Scan { table_name, alias } => {
                write!(f, "{} AS {}", quote_identifier(table_name), quote_identifier(alias))
            }
            JoinTree::Join { left, right, condition } => {
                write!(f, "{} INNER JOIN {} ON {}", left, right, condition)
            }
        }
    }
}

/// A query rebuilt for one specific join order
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedQuery {
    pub projection: String,
    pub tree: JoinTree,
    /// Query filter (grouped in parentheses when residuals follow a
    /// disjunction), then residual join predicates
    pub filters: Vec<String>,
}

impl ReconstructedQuery {
    /// Fold a classified join sequence into a left-deep tree
    pub fn build(model: &QueryModel, sequence: &JoinSequence) -> JoinOrderResult<Self> {
        let joins = model.joins();
        let mut tree = JoinTree::scan(model, &sequence.seed)?;
        let mut residuals = Vec::new();

        for step in &sequence.steps {
            match step {
                JoinStep::Attach { predicate, table } => {
                    tree = JoinTree::Join {
                        left: Box::new(tree),
                        right: Box::new(JoinTree::scan(model, table)?),
                        condition: joins[*predicate].clone(),
                    };
                }
                JoinStep::Residual { predicate } => residuals.push(joins[*predicate].to_string()),
            }
        }

        let mut filters = Vec::with_capacity(residuals.len() + 1);
        let filter = model.filter();
        if !filter.is_empty() {
            if !residuals.is_empty() && has_top_level_or(filter) {
                filters.push(format!("({})", filter));
            } else {
                filters.push(filter.to_string());
            }
        }
        filters.extend(residuals);

        Ok(ReconstructedQuery {
            projection: model.projection().to_string(),
            tree,
            filters,
        })
    }
}

impl fmt::Display for ReconstructedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT {} FROM {}", self.projection, self.tree)?;
        if !self.filters.is_empty() {
            write!(f, " WHERE {}", self.filters.join(" AND "))?;
        }
        Ok(())
    }
}
