// Workload Loading
//
// A workload is either a single `.sql` file or a directory of them; each
// file holds one query and its stem is the query id.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::query::model::QueryModel;
use crate::query::parser::extract;

/// A query of the workload with its extracted model
#[derive(Debug, Clone)]
pub struct WorkloadQuery {
    pub id: String,
    pub sql: String,
    pub model: QueryModel,
}

impl WorkloadQuery {
    pub fn from_sql(id: impl Into<String>, sql: &str) -> Result<Self> {
        let id = id.into();
        let model = extract(sql).with_context(|| format!("Failed to extract query '{}'", id))?;
        Ok(WorkloadQuery {
            id,
            sql: sql.trim().to_string(),
            model,
        })
    }
}

/// Load a single query file
pub fn load_query(path: &Path) -> Result<WorkloadQuery> {
    let sql = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let id = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?;
    WorkloadQuery::from_sql(id, &sql)
}

/// Load every `.sql` file under `path` (or `path` itself), ordered by id
pub fn load_workload(path: &Path) -> Result<Vec<WorkloadQuery>> {
    if path.is_file() {
        return Ok(vec![load_query(path)?]);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(path).with_context(|| format!("Failed to list {}", path.display()))? {
        let file = entry?.path();
        if file.is_file() && file.extension().is_some_and(|ext| ext == "sql") {
            files.push(file);
        }
    }
    files.sort();

    let queries = files
        .iter()
        .map(|file| load_query(file))
        .collect::<Result<Vec<_>>>()?;

    log::info!("Loaded {} queries from {}", queries.len(), path.display());
    for query in &queries {
        log::debug!(
            "Query {}: {} tables, {} joins",
            query.id,
            query.model.table_count(),
            query.model.join_count()
        );
    }
    Ok(queries)
}
