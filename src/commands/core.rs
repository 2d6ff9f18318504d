//! Core command handlers.

use sqlquad::models::Term;
use sqlquad::storage::SqliteQuadStore;

use super::PatternArgs;

/// Creates the tables.
pub fn cmd_init(store: &SqliteQuadStore) -> anyhow::Result<()> {
    store.create_tables()?;
    match store.db_path() {
        Some(path) => println!("Initialized {}", path.display()),
        None => println!("Initialized in-memory store"),
    }
    Ok(())
}

/// Drops the tables.
pub fn cmd_drop(store: &SqliteQuadStore, yes: bool) -> anyhow::Result<()> {
    if !yes {
        anyhow::bail!("refusing to drop all quads without --yes");
    }
    store.drop_tables()?;
    println!("Dropped all tables");
    Ok(())
}

/// Prints the number of matching quads.
pub fn cmd_count(store: &SqliteQuadStore, pattern: &PatternArgs, estimate: bool) -> anyhow::Result<()> {
    let pattern = pattern.to_pattern()?;
    let count = if estimate {
        store.count_estimate(&pattern)?
    } else {
        store.count(&pattern)?
    };
    println!("{count}");
    Ok(())
}

/// Removes the matching quads.
pub fn cmd_remove(store: &SqliteQuadStore, pattern: &PatternArgs) -> anyhow::Result<()> {
    let pattern = pattern.to_pattern()?;
    if pattern.is_wildcard() {
        anyhow::bail!("refusing to remove every quad; give at least one constraint");
    }
    let summary = store.remove_matches(&pattern)?;
    println!("Removed {} quads in {} batches", summary.rows_deleted, summary.batches);
    Ok(())
}

/// Removes every quad in a graph.
pub fn cmd_delete_graph(store: &SqliteQuadStore, graph: &str) -> anyhow::Result<()> {
    let graph: Term = graph.parse()?;
    let summary = store.delete_graph(&graph)?;
    println!("Removed {} quads from {graph}", summary.rows_deleted);
    Ok(())
}

/// Prints table sizes.
pub fn cmd_stats(store: &SqliteQuadStore) -> anyhow::Result<()> {
    println!("sqlquad Status");
    println!("==============");
    if let Some(path) = store.db_path() {
        println!("Database: {}", path.display());
    }
    println!("Vertexes: {}", store.vertex_count()?);
    println!("Edges:    {}", store.edge_count()?);
    Ok(())
}
