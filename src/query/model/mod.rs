// Query Model Module
//
// Structured representation of a single-block join query: table bindings,
// projection, residual filter and the set of equi-join predicates.

pub mod error;
pub mod predicate;
pub mod query_model;

pub use self::error::{JoinOrderError, JoinOrderResult};
pub use self::predicate::{quote_identifier, ColumnRef, JoinPredicate};
pub use self::query_model::QueryModel;
