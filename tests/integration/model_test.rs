use anyhow::Result;
use joinperm::{ColumnRef, JoinOrderError, JoinPredicate, QueryModel};

#[path = "../common/mod.rs"]
mod common;

use common::{build_model, cycle_model};

#[test]
fn test_predicate_writing_order_is_irrelevant() -> Result<()> {
    let a = ColumnRef::new("t", "id");
    let b = ColumnRef::new("mc", "movie_id");

    let one = JoinPredicate::new(a.clone(), b.clone());
    let other = JoinPredicate::new(b, a);

    assert_eq!(one, other);
    assert_eq!(one.to_string(), other.to_string());
    assert_eq!(one.left_table(), "mc");
    assert_eq!(one.right_table(), "t");
    Ok(())
}

#[test]
fn test_storage_order_is_independent_of_insertion() -> Result<()> {
    let forward = cycle_model()?;
    let backward = build_model(
        "COUNT(*)",
        &[("A", "a"), ("B", "b"), ("C", "c"), ("D", "d")],
        &["d.aid = a.id", "d.cid = c.id", "c.bid = b.id", "b.aid = a.id"],
        "",
    )?;

    assert_eq!(forward.joins(), backward.joins());
    Ok(())
}

#[test]
fn test_model_display_lists_joins() -> Result<()> {
    let model = cycle_model()?;
    let text = model.to_string();

    assert!(text.starts_with("SELECT\tCOUNT(*)\n"));
    assert!(text.contains("FROM\tA AS a, B AS b, C AS c, D AS d\n"));
    assert!(text.contains("JOINS: [4]\n"));
    assert!(text.contains("\t0: a.id = b.aid\n"));
    Ok(())
}

#[test]
fn test_unbound_alias_is_malformed() {
    let mut model = QueryModel::new("*");
    model.add_table("A", Some("a")).unwrap();

    let result = model.add_join(JoinPredicate::parse("a.x = q.x").unwrap());
    match result {
        Err(JoinOrderError::MalformedModel(msg)) => assert!(msg.contains("'q'")),
        other => panic!("expected MalformedModel, got {:?}", other),
    }
}

#[test]
fn test_model_is_shareable_across_threads() -> Result<()> {
    let model = std::sync::Arc::new(cycle_model()?);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let model = model.clone();
            std::thread::spawn(move || joinperm::reconstruct_indices(&model, &[0, 2, 3, 1]))
        })
        .collect();

    let expected = joinperm::reconstruct_indices(&model, &[0, 2, 3, 1])?;
    for handle in handles {
        assert_eq!(handle.join().unwrap()?, expected);
    }
    Ok(())
}

#[test]
fn test_model_encodes_with_bincode() -> Result<()> {
    let model = cycle_model()?;
    let bytes = bincode::serialize(&model)?;
    let decoded: QueryModel = bincode::deserialize(&bytes)?;

    // FROM order survives encoding
    assert_eq!(decoded.tables().keys().collect::<Vec<_>>(), vec!["a", "b", "c", "d"]);
    assert_eq!(decoded, model);
    Ok(())
}
