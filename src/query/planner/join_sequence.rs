// Join Sequence Planning
//
// Walks an ordering of join predicates and classifies every predicate as
// either attaching a new table to the growing left-deep tree or acting as a
// residual filter over tables that are already bound.

use std::collections::HashSet;

use crate::query::model::{JoinOrderError, JoinOrderResult, QueryModel};

/// What a single predicate contributes when processed in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinStep {
    /// Predicate brings `table` into the tree
    Attach { predicate: usize, table: String },
    /// Both sides already bound, predicate becomes a WHERE conjunct
    Residual { predicate: usize },
}

impl JoinStep {
    pub fn predicate(&self) -> usize {
        match self {
            JoinStep::Attach { predicate, .. } | JoinStep::Residual { predicate } => *predicate,
        }
    }
}

/// Classified ordering: the seed table plus one step per predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSequence {
    pub seed: String,
    pub steps: Vec<JoinStep>,
}

impl JoinSequence {
    /// Table aliases in the order they enter the tree
    pub fn table_order(&self) -> Vec<&str> {
        let mut tables = vec![self.seed.as_str()];
        for step in &self.steps {
            if let JoinStep::Attach { table, .. } = step {
                tables.push(table.as_str());
            }
        }
        tables
    }

    /// Indices of predicates folded into the WHERE clause, in encounter order
    pub fn residuals(&self) -> Vec<usize> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                JoinStep::Residual { predicate } => Some(*predicate),
                JoinStep::Attach { .. } => None,
            })
            .collect()
    }

    /// Canonical form of the ordering.
    ///
    /// The first predicate stays first since it picks the seed table. Attaching
    /// predicates keep their relative order and residuals follow in ascending
    /// index order, so orderings that differ only in where residuals appear
    /// collapse onto one sequence.
    pub fn canonical_order(&self) -> Vec<usize> {
        let Some(first) = self.steps.first().map(JoinStep::predicate) else {
            return Vec::new();
        };

        let mut order = vec![first];
        order.extend(self.steps.iter().skip(1).filter_map(|step| match step {
            JoinStep::Attach { predicate, .. } => Some(*predicate),
            JoinStep::Residual { .. } => None,
        }));

        let mut residuals: Vec<usize> = self
            .steps
            .iter()
            .skip(1)
            .filter_map(|step| match step {
                JoinStep::Residual { predicate } => Some(*predicate),
                JoinStep::Attach { .. } => None,
            })
            .collect();
        residuals.sort_unstable();
        order.extend(residuals);
        order
    }
}

/// Check that `order` is a permutation of `0..model.join_count()`
pub fn check_permutation(model: &QueryModel, order: &[usize]) -> JoinOrderResult<()> {
    if order.len() != model.join_count() {
        return Err(JoinOrderError::MalformedModel(format!(
            "ordering has {} predicates but the query has {}",
            order.len(),
            model.join_count()
        )));
    }

    let mut seen = vec![false; order.len()];
    for &index in order {
        match seen.get_mut(index) {
            Some(flag) if !*flag => *flag = true,
            Some(_) => {
                return Err(JoinOrderError::MalformedModel(format!(
                    "predicate {} appears more than once in the ordering",
                    index
                )));
            }
            None => {
                return Err(JoinOrderError::MalformedModel(format!(
                    "predicate index {} is out of range",
                    index
                )));
            }
        }
    }
    Ok(())
}

/// Classify every predicate of `order` against the growing set of bound tables.
///
/// Fails with `InvalidJoinOrder` when a predicate touches no bound table or
/// when some table is never attached.
pub fn plan_join_sequence(model: &QueryModel, order: &[usize]) -> JoinOrderResult<JoinSequence> {
    model.validate()?;
    check_permutation(model, order)?;

    let joins = model.joins();
    let seed = match order.first() {
        Some(&first) => joins[first].left_table().to_string(),
        None => single_table(model)?,
    };

    let mut used: HashSet<&str> = HashSet::new();
    used.insert(seed.as_str());
    let mut bound = vec![seed.as_str()];
    let mut steps = Vec::with_capacity(order.len());

    for &index in order {
        let join = &joins[index];
        let (left, right) = (join.left_table(), join.right_table());

        let step = match (used.contains(left), used.contains(right)) {
            (true, true) => JoinStep::Residual { predicate: index },
            (true, false) => JoinStep::Attach { predicate: index, table: right.to_string() },
            (false, true) => JoinStep::Attach { predicate: index, table: left.to_string() },
            (false, false) => {
                return Err(JoinOrderError::InvalidJoinOrder(format!(
                    "'{}' touches no joined table (available: {})",
                    join,
                    bound.join(", ")
                )));
            }
        };

        if let JoinStep::Attach { .. } = step {
            let new_table = if used.contains(left) { right } else { left };
            used.insert(new_table);
            bound.push(new_table);
        }
        steps.push(step);
    }

    let unreached: Vec<&str> = model
        .tables()
        .keys()
        .map(String::as_str)
        .filter(|alias| !used.contains(alias))
        .collect();
    if !unreached.is_empty() {
        return Err(JoinOrderError::InvalidJoinOrder(format!(
            "tables never joined: {}",
            unreached.join(", ")
        )));
    }

    Ok(JoinSequence { seed, steps })
}

/// Seed for a query without joins: only valid when a single table is bound
fn single_table(model: &QueryModel) -> JoinOrderResult<String> {
    let mut aliases = model.tables().keys();
    match (aliases.next(), aliases.next()) {
        (Some(alias), None) => Ok(alias.clone()),
        _ => Err(JoinOrderError::InvalidJoinOrder(format!(
            "{} tables but no join predicates to connect them",
            model.table_count()
        ))),
    }
}
