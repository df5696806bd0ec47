//! Sequence stitching of bulk-fetched records
//!
//! Each JSON file holds an ordered array of records (the stations of one line,
//! for example). Consecutive records are linked with undirected edges, and all
//! files are merged into one graph keyed by a chosen field.

use crate::checkpoint::open_sink;
use crate::config::{Config, StitchConfig};
use crate::events::{EventObserver, HarvestEvent};
use crate::graph::{GraphAccumulator, NodeMetadata, Snapshot};
use crate::HarvestError;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Snapshot name used for the stitched graph
pub const STITCHED_SNAPSHOT_NAME: &str = "stitched";

/// What a stitch pass read and produced
#[derive(Debug, Clone)]
pub struct StitchReport {
    /// Files that contributed records
    pub files: usize,

    /// Files that could not be read or parsed, with the reason
    pub skipped_files: Vec<(PathBuf, String)>,

    /// Records linked into the graph
    pub records: usize,

    /// Records without a usable key
    pub skipped_records: usize,

    pub graph: GraphAccumulator,
}

/// Builds the undirected sequence graph from every `*.json` file in a directory
///
/// Files are read in name order. A malformed file is reported and skipped;
/// the rest still contribute.
///
/// # Returns
///
/// * `Ok(StitchReport)` - The merged graph and what went into it
/// * `Err(HarvestError::Io)` - The directory itself could not be listed
pub fn stitch_directory(
    config: &StitchConfig,
    observer: &dyn EventObserver,
) -> Result<StitchReport, HarvestError> {
    let mut report = StitchReport {
        files: 0,
        skipped_files: Vec::new(),
        records: 0,
        skipped_records: 0,
        graph: GraphAccumulator::undirected(),
    };

    for path in json_files(Path::new(&config.input_dir))? {
        let origin = path.display().to_string();

        let records = match read_records(&path, &config.records_field) {
            Ok(records) => records,
            Err(reason) => {
                observer.on_event(&HarvestEvent::RecordSkipped {
                    origin: origin.clone(),
                    reason: reason.clone(),
                });
                report.skipped_files.push((path, reason));
                continue;
            }
        };

        let (linked, skipped) = stitch_records(
            &mut report.graph,
            &records,
            &config.key_field,
            &origin,
            observer,
        );
        report.files += 1;
        report.records += linked;
        report.skipped_records += skipped;
    }

    tracing::info!(
        "Stitched {} files: {} nodes, {} edges",
        report.files,
        report.graph.node_count(),
        report.graph.edge_count()
    );

    Ok(report)
}

/// Links consecutive keyed records of one sequence
///
/// Records without the key field are skipped, and their neighbours are linked
/// to each other instead.
///
/// # Returns
///
/// `(linked, skipped)` record counts
pub fn stitch_records(
    graph: &mut GraphAccumulator,
    records: &[Value],
    key_field: &str,
    origin: &str,
    observer: &dyn EventObserver,
) -> (usize, usize) {
    let mut previous: Option<String> = None;
    let mut linked = 0;
    let mut skipped = 0;

    for (index, record) in records.iter().enumerate() {
        let Some(key) = record_key(record, key_field) else {
            skipped += 1;
            observer.on_event(&HarvestEvent::RecordSkipped {
                origin: format!("{}[{}]", origin, index),
                reason: format!("missing {}", key_field),
            });
            continue;
        };

        if graph.upsert_node(&key, NodeMetadata::empty()) {
            observer.on_event(&HarvestEvent::NodeAdded { key: key.clone() });
        }
        if let Some(prev) = &previous {
            if graph.upsert_edge(prev, &key) {
                observer.on_event(&HarvestEvent::EdgeAdded {
                    from: prev.clone(),
                    to: key.clone(),
                });
            }
        }

        linked += 1;
        previous = Some(key);
    }

    (linked, skipped)
}

/// Builds the stitched graph and writes it to the configured sink
pub fn run_stitch(
    config: &Config,
    stitch: &StitchConfig,
    observer: &dyn EventObserver,
) -> Result<Snapshot, HarvestError> {
    let report = stitch_directory(stitch, observer)?;
    let snapshot = report.graph.snapshot();

    let sink = open_sink(&config.output)?;
    sink.write(&snapshot, STITCHED_SNAPSHOT_NAME)?;
    observer.on_event(&HarvestEvent::CheckpointWritten {
        name: STITCHED_SNAPSHOT_NAME.to_string(),
        nodes: snapshot.node_count(),
        edges: snapshot.edge_count(),
    });

    Ok(snapshot)
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>, HarvestError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_records(path: &Path, records_field: &str) -> Result<Vec<Value>, String> {
    let raw = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let mut document: Value = serde_json::from_str(&raw).map_err(|e| e.to_string())?;

    match document.get_mut(records_field).map(Value::take) {
        Some(Value::Array(records)) => Ok(records),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(_) => Err(format!("'{}' is not an array", records_field)),
    }
}

fn record_key(record: &Value, key_field: &str) -> Option<String> {
    let key = match record.get(key_field)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}
