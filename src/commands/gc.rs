//! Garbage collection command handler.

use sqlquad::storage::SqliteQuadStore;

/// Deletes orphan vertexes, optionally refreshing statistics afterwards.
///
/// # Examples
///
/// ```bash
/// sqlquad vacuum
/// sqlquad vacuum --analyze
/// ```
pub fn cmd_vacuum(store: &SqliteQuadStore, analyze: bool) -> anyhow::Result<()> {
    let result = store.vacuum()?;
    println!("{}", result.summary());
    if analyze {
        store.analyze()?;
        println!("Statistics refreshed");
    }
    Ok(())
}
