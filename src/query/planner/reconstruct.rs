// Join-Order Reconstruction
//
// Turns a query model plus an explicit ordering of its join predicates into
// an executable query whose FROM / INNER JOIN clauses follow that ordering.

use crate::query::model::{JoinOrderError, JoinOrderResult, JoinPredicate, QueryModel};
use super::join_sequence::plan_join_sequence;
use super::join_tree::ReconstructedQuery;

/// Rebuild the query with joins applied in `order`.
///
/// `order` must contain every predicate of the model exactly once, otherwise
/// `MalformedModel` is returned. Orderings that cannot grow a connected
/// left-deep tree fail with `InvalidJoinOrder`.
pub fn reconstruct(model: &QueryModel, order: &[JoinPredicate]) -> JoinOrderResult<String> {
    let indices = order
        .iter()
        .map(|join| {
            model.index_of(join).ok_or_else(|| {
                JoinOrderError::MalformedModel(format!("'{}' is not a join predicate of this query", join))
            })
        })
        .collect::<JoinOrderResult<Vec<usize>>>()?;

    reconstruct_indices(model, &indices)
}

/// Same as [`reconstruct`], with the ordering given as indices into
/// `model.joins()`
pub fn reconstruct_indices(model: &QueryModel, order: &[usize]) -> JoinOrderResult<String> {
    Ok(build_query(model, order)?.to_string())
}

/// Structured form of the reconstructed query
pub fn build_query(model: &QueryModel, order: &[usize]) -> JoinOrderResult<ReconstructedQuery> {
    let sequence = plan_join_sequence(model, order)?;
    ReconstructedQuery::build(model, &sequence)
}
