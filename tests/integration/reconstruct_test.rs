use anyhow::Result;
use joinperm::query::planner::{build_query, plan_join_sequence};
use joinperm::{reconstruct, reconstruct_indices, JoinOrderError, JoinPredicate};

#[path = "../common/mod.rs"]
mod common;

use common::{build_model, chain_model, cycle_model, joined_aliases};

fn predicates(texts: &[&str]) -> Result<Vec<JoinPredicate>> {
    Ok(texts.iter().map(|t| JoinPredicate::parse(t)).collect::<Result<Vec<_>, _>>()?)
}

#[test]
fn test_chain_in_written_order() -> Result<()> {
    let model = chain_model()?;
    let sql = reconstruct(&model, &predicates(&["a.x = b.x", "b.y = c.y"])?)?;

    assert_eq!(
        sql,
        "SELECT * FROM A AS a INNER JOIN B AS b ON a.x = b.x INNER JOIN C AS c ON b.y = c.y WHERE a.z > 5"
    );
    Ok(())
}

#[test]
fn test_chain_in_reverse_order_covers_all_tables() -> Result<()> {
    let model = chain_model()?;
    // Written the other way round on purpose: predicates are symmetric
    let sql = reconstruct(&model, &predicates(&["c.y = b.y", "b.x = a.x"])?)?;

    let mut aliases = joined_aliases(&sql);
    assert_eq!(aliases[0], "b");
    aliases.sort();
    assert_eq!(aliases, vec!["a", "b", "c"]);
    assert!(sql.ends_with("WHERE a.z > 5"));
    Ok(())
}

#[test]
fn test_predicate_between_unjoined_tables_is_invalid() -> Result<()> {
    let model = build_model(
        "*",
        &[("A", "a"), ("B", "b"), ("C", "c"), ("D", "d")],
        &["a.x = b.x", "b.y = c.y", "c.z = d.z"],
        "",
    )?;

    let result = reconstruct(&model, &predicates(&["a.x = b.x", "c.z = d.z", "b.y = c.y"])?);
    match result {
        Err(JoinOrderError::InvalidJoinOrder(msg)) => {
            assert!(msg.contains("c.z = d.z"), "unexpected message: {}", msg);
        }
        other => panic!("expected InvalidJoinOrder, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_residual_predicate_moves_to_where() -> Result<()> {
    let model = cycle_model()?;
    let order = predicates(&["a.id = b.aid", "b.id = c.bid", "a.id = d.aid", "c.id = d.cid"])?;
    let sql = reconstruct(&model, &order)?;

    assert_eq!(
        sql,
        "SELECT COUNT(*) FROM A AS a INNER JOIN B AS b ON a.id = b.aid \
         INNER JOIN C AS c ON b.id = c.bid INNER JOIN D AS d ON a.id = d.aid \
         WHERE c.id = d.cid"
    );
    Ok(())
}

#[test]
fn test_residuals_follow_query_filter() -> Result<()> {
    let mut model = cycle_model()?;
    model.set_filter("a.kind = 'x'");
    let order = predicates(&["a.id = d.aid", "c.id = d.cid", "a.id = b.aid", "b.id = c.bid"])?;
    let sql = reconstruct(&model, &order)?;

    assert!(sql.ends_with(" WHERE a.kind = 'x' AND b.id = c.bid"), "got {}", sql);
    assert_eq!(sql.matches("INNER JOIN").count(), 3);
    Ok(())
}

#[test]
fn test_disjunctive_filter_is_grouped_before_residuals() -> Result<()> {
    let mut model = build_model(
        "*",
        &[("A", "a"), ("B", "b")],
        &["a.x = b.x", "a.y = b.y"],
        "a.k = 1 OR a.k = 2",
    )?;

    assert_eq!(
        reconstruct_indices(&model, &[0, 1])?,
        "SELECT * FROM A AS a INNER JOIN B AS b ON a.x = b.x WHERE (a.k = 1 OR a.k = 2) AND a.y = b.y"
    );

    // Without residuals the filter is emitted as written
    model = build_model("*", &[("A", "a"), ("B", "b")], &["a.x = b.x"], "a.k = 1 OR a.k = 2")?;
    assert_eq!(
        reconstruct_indices(&model, &[0])?,
        "SELECT * FROM A AS a INNER JOIN B AS b ON a.x = b.x WHERE a.k = 1 OR a.k = 2"
    );
    Ok(())
}

#[test]
fn test_long_chain_follows_storage_order() -> Result<()> {
    // Aliases t0..t11: "t10" and "t11" sort before "t2" in storage order
    let tables: Vec<(String, String)> = (0..12).map(|i| (format!("T{}", i), format!("t{}", i))).collect();
    let table_refs: Vec<(&str, &str)> = tables.iter().map(|(t, a)| (t.as_str(), a.as_str())).collect();
    let joins: Vec<String> = (1..12).map(|i| format!("t{}.id = t{}.prev_id", i - 1, i)).collect();
    let join_refs: Vec<&str> = joins.iter().map(String::as_str).collect();
    let model = build_model("COUNT(*)", &table_refs, &join_refs, "")?;

    let written: Vec<usize> = (0..model.join_count()).collect();
    assert!(matches!(
        reconstruct_indices(&model, &written),
        Err(JoinOrderError::InvalidJoinOrder(_))
    ));

    let chain = predicates(&join_refs)?
        .iter()
        .map(|join| model.index_of(join))
        .collect::<Option<Vec<usize>>>()
        .ok_or_else(|| anyhow::anyhow!("chain predicate missing from model"))?;
    let sql = reconstruct_indices(&model, &chain)?;
    assert_eq!(joined_aliases(&sql), (0..12).map(|i| format!("t{}", i)).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn test_reconstruction_is_deterministic() -> Result<()> {
    let model = cycle_model()?;
    for order in [[0, 1, 2, 3], [3, 2, 1, 0], [2, 0, 3, 1]] {
        let first = reconstruct_indices(&model, &order);
        let second = reconstruct_indices(&model, &order);
        assert_eq!(first, second);
    }
    Ok(())
}

#[test]
fn test_unjoined_table_is_invalid() -> Result<()> {
    let model = build_model(
        "*",
        &[("A", "a"), ("B", "b"), ("E", "e")],
        &["a.x = b.x"],
        "e.flag = 1",
    )?;

    assert!(matches!(
        reconstruct_indices(&model, &[0]),
        Err(JoinOrderError::InvalidJoinOrder(_))
    ));
    Ok(())
}

#[test]
fn test_order_must_be_a_permutation() -> Result<()> {
    let model = chain_model()?;

    for order in [vec![0], vec![0, 0], vec![1, 2], vec![0, 1, 1]] {
        assert!(
            matches!(reconstruct_indices(&model, &order), Err(JoinOrderError::MalformedModel(_))),
            "order {:?} should be rejected",
            order
        );
    }
    Ok(())
}

#[test]
fn test_identity_bindings_print_bare() -> Result<()> {
    let model = build_model("t.title", &[("title", "title"), ("movie_info", "mi")], &["title.id = mi.movie_id"], "")?;
    let sql = reconstruct_indices(&model, &[0])?;

    // "mi.movie_id" sorts before "title.id", so mi seeds the tree
    assert_eq!(sql, "SELECT t.title FROM movie_info AS mi INNER JOIN title ON mi.movie_id = title.id");
    Ok(())
}

#[test]
fn test_structured_query_matches_sequence() -> Result<()> {
    let model = cycle_model()?;
    let order = [1, 3, 2, 0];
    let sequence = plan_join_sequence(&model, &order)?;
    let query = build_query(&model, &order)?;

    assert_eq!(query.tree.aliases(), sequence.table_order());
    assert_eq!(query.tree.depth(), 3);
    assert_eq!(query.filters.len(), sequence.residuals().len());
    Ok(())
}
