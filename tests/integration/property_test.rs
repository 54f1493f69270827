//! Property-based tests for join-order reconstruction (proptest).

use std::collections::HashSet;

use proptest::prelude::*;

use joinperm::query::explorer::{canonical_id, PermutationGenerator};
use joinperm::{reconstruct_indices, JoinOrderError, QueryModel};

#[path = "../common/mod.rs"]
mod common;

use common::{build_model, joined_aliases};

const MAX_TABLES: usize = 5;

/// Model over tables t0..t{n-1} with a join for every selected pair
fn graph_model(tables: usize, edges: &[bool]) -> (QueryModel, Vec<String>) {
    let bindings: Vec<(String, String)> = (0..tables).map(|i| (format!("T{}", i), format!("t{}", i))).collect();
    let binding_refs: Vec<(&str, &str)> = bindings.iter().map(|(t, a)| (t.as_str(), a.as_str())).collect();

    let mut joins = Vec::new();
    let mut edge = edges.iter();
    for i in 0..tables {
        for j in (i + 1)..tables {
            if edge.next().copied().unwrap_or(false) {
                joins.push(format!("t{}.c{} = t{}.c{}", i, j, j, i));
            }
        }
    }
    let join_refs: Vec<&str> = joins.iter().map(String::as_str).collect();

    let model = build_model("*", &binding_refs, &join_refs, "t0.v > 0").unwrap();
    (model, joins)
}

fn is_connected(tables: usize, joins: &[String]) -> bool {
    let mut reached = vec![false; tables];
    reached[0] = true;
    let mut changed = true;
    while changed {
        changed = false;
        for join in joins {
            let aliases: Vec<usize> = join
                .split(" = ")
                .map(|side| side[1..side.find('.').unwrap()].parse().unwrap())
                .collect();
            if reached[aliases[0]] != reached[aliases[1]] {
                reached[aliases[0]] = true;
                reached[aliases[1]] = true;
                changed = true;
            }
        }
    }
    reached.iter().all(|r| *r)
}

// Replays `order` over alias pairs: the first predicate binds both sides,
// each later one must share a side with what is bound, and every table must
// end up bound
fn connects_step_by_step(model: &QueryModel, order: &[usize]) -> bool {
    let mut bound: HashSet<String> = HashSet::new();
    for (step, &index) in order.iter().enumerate() {
        let join = model.joins()[index].to_string();
        let sides: Vec<String> = join
            .split(" = ")
            .map(|side| side.split('.').next().unwrap().to_string())
            .collect();
        if step > 0 && !sides.iter().any(|alias| bound.contains(alias)) {
            return false;
        }
        bound.extend(sides);
    }
    if order.is_empty() {
        return model.table_count() == 1;
    }
    bound.len() == model.table_count()
}

fn model_strategy() -> impl Strategy<Value = (usize, Vec<bool>, u64)> {
    (
        1..=MAX_TABLES,
        prop::collection::vec(any::<bool>(), MAX_TABLES * (MAX_TABLES - 1) / 2),
        any::<u64>(),
    )
}

proptest! {
    /// Reconstruction is a pure function of the model and the order
    #[test]
    fn test_reconstruction_is_deterministic((tables, edges, seed) in model_strategy()) {
        let (model, _) = graph_model(tables, &edges);
        let order = PermutationGenerator::seeded(seed).generate(&model).order;

        prop_assert_eq!(reconstruct_indices(&model, &order), reconstruct_indices(&model, &order));
    }

    /// A successful reconstruction binds every alias exactly once
    #[test]
    fn test_success_covers_every_alias_once((tables, edges, seed) in model_strategy()) {
        let (model, _) = graph_model(tables, &edges);
        let order = PermutationGenerator::seeded(seed).generate(&model).order;

        if let Ok(sql) = reconstruct_indices(&model, &order) {
            let mut aliases = joined_aliases(&sql);
            aliases.sort();
            let expected: Vec<String> = (0..tables).map(|i| format!("t{}", i)).collect();
            prop_assert_eq!(aliases, expected);
        }
    }

    /// Every join predicate is emitted once, as ON condition or residual filter
    #[test]
    fn test_each_predicate_emitted_once((tables, edges, seed) in model_strategy()) {
        let (model, joins) = graph_model(tables, &edges);
        let order = PermutationGenerator::seeded(seed).generate(&model).order;

        if let Ok(sql) = reconstruct_indices(&model, &order) {
            let (tree, filters) = sql.split_once(" WHERE ").unwrap();
            for join in &joins {
                prop_assert_eq!(sql.matches(join.as_str()).count(), 1);
            }
            let residuals = joins.iter().filter(|j| filters.contains(j.as_str())).count();
            prop_assert_eq!(tree.matches(" ON ").count(), tables - 1);
            prop_assert_eq!(residuals, joins.len() - (tables - 1));
        }
    }

    /// Orderings over a disconnected join graph never reconstruct
    #[test]
    fn test_disconnected_graph_fails((tables, edges, seed) in model_strategy()) {
        let (model, joins) = graph_model(tables, &edges);
        let order = PermutationGenerator::seeded(seed).generate(&model).order;

        if !is_connected(tables, &joins) {
            prop_assert!(matches!(
                reconstruct_indices(&model, &order),
                Err(JoinOrderError::InvalidJoinOrder(_))
            ));
        }
    }

    /// The canonical order builds the same join tree and is its own canonical form
    #[test]
    fn test_canonical_order_builds_same_tree((tables, edges, seed) in model_strategy()) {
        let (model, _) = graph_model(tables, &edges);
        let order = PermutationGenerator::seeded(seed).generate(&model).order;

        if let Ok(sql) = reconstruct_indices(&model, &order) {
            let id = canonical_id(&model, &order);
            let canonical = id.indices().unwrap();
            let rebuilt = reconstruct_indices(&model, &canonical).unwrap();

            prop_assert_eq!(rebuilt.split(" WHERE ").next(), sql.split(" WHERE ").next());
            prop_assert_eq!(canonical_id(&model, &canonical), id);
        }
    }

    /// An order reconstructs exactly when it connects the tables step by step;
    /// otherwise the failure is always InvalidJoinOrder
    #[test]
    fn test_success_iff_connected_step_by_step((tables, edges, seed) in model_strategy()) {
        let (model, _) = graph_model(tables, &edges);
        let order = PermutationGenerator::seeded(seed).generate(&model).order;

        match reconstruct_indices(&model, &order) {
            Ok(_) => prop_assert!(connects_step_by_step(&model, &order)),
            Err(err) => {
                prop_assert!(!connects_step_by_step(&model, &order));
                prop_assert!(matches!(err, JoinOrderError::InvalidJoinOrder(_)), "got {:?}", err);
            }
        }
    }
}
