//! SQLite snapshot sink
//!
//! Every snapshot is stored in full under its name. Rewriting a name replaces
//! the earlier rows in a single transaction, so readers never see half of a
//! snapshot.

use crate::checkpoint::schema::initialize_schema;
use crate::checkpoint::traits::{SinkError, SinkResult, SnapshotSink};
use crate::graph::{Directedness, Node, NodeMetadata, NodeOrigin, Snapshot};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Summary row of a stored snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub name: String,
    pub directedness: Directedness,
    pub taken_at: String,
    pub written_at: String,
    pub node_count: u64,
    pub edge_count: u64,
}

/// SQLite-backed snapshot sink
pub struct SqliteSnapshotSink {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteSnapshotSink {
    /// Opens or creates a snapshot database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteSnapshotSink)` - Successfully opened/created database
    /// * `Err(SinkError)` - Failed to open database
    pub fn new(path: &Path) -> SinkResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> SinkResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    fn lock(&self) -> SinkResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| SinkError::Poisoned)
    }

    /// Loads a stored snapshot by name
    pub fn load_snapshot(&self, name: &str) -> SinkResult<Snapshot> {
        let conn = self.lock()?;

        let header = conn
            .query_row(
                "SELECT id, directedness, taken_at FROM snapshots WHERE name = ?1",
                params![name],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let (id, directedness, taken_at) =
            header.ok_or_else(|| SinkError::SnapshotNotFound(name.to_string()))?;

        let directedness = parse_directedness(&directedness)?;
        let taken_at = DateTime::parse_from_rfc3339(&taken_at)
            .map_err(|e| SinkError::Database(format!("Bad timestamp '{}': {}", taken_at, e)))?
            .with_timezone(&Utc);

        let mut nodes = BTreeMap::new();
        let mut stmt = conn.prepare(
            "SELECT key, title, contributors, origin FROM snapshot_nodes WHERE snapshot_id = ?1",
        )?;
        let rows = stmt.query_map(params![id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        for row in rows {
            let (key, title, contributors, origin) = row?;
            let contributors: Vec<String> = serde_json::from_str(&contributors)?;
            let origin = NodeOrigin::from_db_string(&origin).ok_or_else(|| {
                SinkError::Database(format!("Unknown origin '{}' for node {}", origin, key))
            })?;
            nodes.insert(
                key,
                Node {
                    metadata: NodeMetadata {
                        title,
                        contributors,
                    },
                    origin,
                },
            );
        }

        let mut edges = BTreeSet::new();
        let mut stmt = conn
            .prepare("SELECT source_key, target_key FROM snapshot_edges WHERE snapshot_id = ?1")?;
        let rows = stmt.query_map(params![id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            edges.insert(row?);
        }

        Ok(Snapshot::from_parts(directedness, nodes, edges, taken_at))
    }

    /// Name of the most recently written snapshot
    pub fn latest_snapshot_name(&self) -> SinkResult<Option<String>> {
        let conn = self.lock()?;
        let name = conn
            .query_row(
                "SELECT name FROM snapshots ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name)
    }

    /// All stored snapshots, oldest write first
    pub fn list_snapshots(&self) -> SinkResult<Vec<SnapshotRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT name, directedness, taken_at, written_at, node_count, edge_count
             FROM snapshots ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (name, directedness, taken_at, written_at, node_count, edge_count) = row?;
            records.push(SnapshotRecord {
                name,
                directedness: parse_directedness(&directedness)?,
                taken_at,
                written_at,
                node_count: node_count as u64,
                edge_count: edge_count as u64,
            });
        }
        Ok(records)
    }
}

fn parse_directedness(value: &str) -> SinkResult<Directedness> {
    Directedness::from_db_string(value)
        .ok_or_else(|| SinkError::Database(format!("Unknown directedness '{}'", value)))
}

impl SnapshotSink for SqliteSnapshotSink {
    fn write(&self, snapshot: &Snapshot, name: &str) -> SinkResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM snapshot_nodes WHERE snapshot_id IN (SELECT id FROM snapshots WHERE name = ?1)",
            params![name],
        )?;
        tx.execute(
            "DELETE FROM snapshot_edges WHERE snapshot_id IN (SELECT id FROM snapshots WHERE name = ?1)",
            params![name],
        )?;
        tx.execute("DELETE FROM snapshots WHERE name = ?1", params![name])?;

        tx.execute(
            "INSERT INTO snapshots (name, directedness, taken_at, written_at, node_count, edge_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                name,
                snapshot.directedness().to_db_string(),
                snapshot.taken_at().to_rfc3339(),
                Utc::now().to_rfc3339(),
                snapshot.node_count() as i64,
                snapshot.edge_count() as i64,
            ],
        )?;
        let snapshot_id = tx.last_insert_rowid();

        {
            let mut insert_node = tx.prepare(
                "INSERT INTO snapshot_nodes (snapshot_id, key, title, contributors, origin)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (key, node) in snapshot.nodes() {
                let contributors = serde_json::to_string(&node.metadata.contributors)?;
                insert_node.execute(params![
                    snapshot_id,
                    key,
                    node.metadata.title,
                    contributors,
                    node.origin.to_db_string(),
                ])?;
            }

            let mut insert_edge = tx.prepare(
                "INSERT INTO snapshot_edges (snapshot_id, source_key, target_key) VALUES (?1, ?2, ?3)",
            )?;
            for (from, to) in snapshot.edges() {
                insert_edge.execute(params![snapshot_id, from, to])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("sqlite:{}", path.display()),
            None => "sqlite::memory:".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphAccumulator, Item};

    fn sample_graph() -> GraphAccumulator {
        let mut graph = GraphAccumulator::directed();
        let item = Item::new(
            "10.1/a",
            Some("Scale-free networks".to_string()),
            vec!["Réka Albert".to_string()],
        );
        graph.upsert_node(&item.key, item.metadata());
        graph.upsert_node("10.1/b", Item::bare("10.1/b").metadata());
        graph.upsert_edge("10.1/c", "10.1/a");
        graph
    }

    #[test]
    fn test_write_then_load_preserves_graph() {
        let sink = SqliteSnapshotSink::new_in_memory().unwrap();
        let snapshot = sample_graph().snapshot();

        sink.write(&snapshot, "20240301_120000").unwrap();
        let loaded = sink.load_snapshot("20240301_120000").unwrap();

        assert_eq!(loaded.node_count(), 3);
        assert_eq!(loaded.edge_count(), 1);
        assert!(loaded.contains_edge("10.1/c", "10.1/a"));
        assert!(!loaded.contains_edge("10.1/a", "10.1/c"));
        assert_eq!(
            loaded.node("10.1/a").unwrap().metadata.contributors,
            vec!["Réka Albert"]
        );
        assert!(loaded.node("10.1/c").unwrap().is_dangling());
        assert_eq!(loaded.taken_at().timestamp(), snapshot.taken_at().timestamp());
    }

    #[test]
    fn test_rewriting_a_name_replaces_it() {
        let sink = SqliteSnapshotSink::new_in_memory().unwrap();
        let mut graph = sample_graph();
        sink.write(&graph.snapshot(), "final").unwrap();

        graph.upsert_edge("10.1/d", "10.1/b");
        sink.write(&graph.snapshot(), "final").unwrap();

        let records = sink.list_snapshots().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].edge_count, 2);
        assert_eq!(sink.load_snapshot("final").unwrap().node_count(), 4);
    }

    #[test]
    fn test_latest_snapshot_name_follows_write_order() {
        let sink = SqliteSnapshotSink::new_in_memory().unwrap();
        assert_eq!(sink.latest_snapshot_name().unwrap(), None);

        let snapshot = sample_graph().snapshot();
        sink.write(&snapshot, "20240301_120000").unwrap();
        sink.write(&snapshot, "final").unwrap();

        assert_eq!(sink.latest_snapshot_name().unwrap().as_deref(), Some("final"));
    }

    #[test]
    fn test_missing_snapshot_is_not_found() {
        let sink = SqliteSnapshotSink::new_in_memory().unwrap();
        let err = sink.load_snapshot("nope").unwrap_err();
        assert!(matches!(err, SinkError::SnapshotNotFound(name) if name == "nope"));
    }

    #[test]
    fn test_file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("network.db");

        {
            let sink = SqliteSnapshotSink::new(&path).unwrap();
            sink.write(&sample_graph().snapshot(), "final").unwrap();
        }

        let sink = SqliteSnapshotSink::new(&path).unwrap();
        assert_eq!(sink.load_snapshot("final").unwrap().edge_count(), 1);
        assert!(sink.describe().starts_with("sqlite:"));
    }

    #[test]
    fn test_corrupt_origin_is_an_error() {
        let sink = SqliteSnapshotSink::new_in_memory().unwrap();
        sink.write(&sample_graph().snapshot(), "final").unwrap();
        sink.lock()
            .unwrap()
            .execute(
                "UPDATE snapshot_nodes SET origin = 'imported' WHERE key = '10.1/c'",
                [],
            )
            .unwrap();

        let err = sink.load_snapshot("final").unwrap_err();
        assert!(matches!(err, SinkError::Database(ref m) if m.contains("imported")));
    }

    #[test]
    fn test_corrupt_directedness_is_an_error() {
        let sink = SqliteSnapshotSink::new_in_memory().unwrap();
        sink.write(&sample_graph().snapshot(), "final").unwrap();
        sink.lock()
            .unwrap()
            .execute("UPDATE snapshots SET directedness = 'sideways'", [])
            .unwrap();

        assert!(matches!(
            sink.load_snapshot("final"),
            Err(SinkError::Database(_))
        ));
        assert!(matches!(sink.list_snapshots(), Err(SinkError::Database(_))));
    }
}
