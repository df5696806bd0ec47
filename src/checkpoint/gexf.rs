//! GEXF file snapshot sink
//!
//! Each snapshot becomes `<dir>/<prefix>_<name>.gexf`, a GEXF 1.2 document
//! readable by Gephi and networkx. Files are written beside the target and
//! renamed into place.

use crate::checkpoint::traits::{SinkResult, SnapshotSink};
use crate::graph::Snapshot;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes snapshots as GEXF files in a directory
#[derive(Debug, Clone)]
pub struct GexfSnapshotSink {
    dir: PathBuf,
    prefix: String,
}

impl GexfSnapshotSink {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    /// Path the snapshot named `name` is written to
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.gexf", self.prefix, name))
    }
}

impl SnapshotSink for GexfSnapshotSink {
    fn write(&self, snapshot: &Snapshot, name: &str) -> SinkResult<()> {
        fs::create_dir_all(&self.dir)?;

        let target = self.path_for(name);
        let partial = target.with_extension("gexf.part");
        write_file(&partial, &format_gexf(snapshot))?;
        fs::rename(&partial, &target)?;

        tracing::debug!("Wrote {}", target.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("gexf:{}", self.dir.display())
    }
}

fn write_file(path: &Path, contents: &str) -> SinkResult<()> {
    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

/// Formats a snapshot as a GEXF 1.2 document
///
/// Nodes carry `title` and `authors` attributes; dangling nodes carry neither.
pub fn format_gexf(snapshot: &Snapshot) -> String {
    let mut xml = String::new();

    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<gexf xmlns=\"http://www.gexf.net/1.2draft\" version=\"1.2\">\n");
    xml.push_str(&format!(
        "  <meta lastmodifieddate=\"{}\">\n    <creator>citation-harvest</creator>\n  </meta>\n",
        snapshot.taken_at().format("%Y-%m-%d")
    ));
    xml.push_str(&format!(
        "  <graph mode=\"static\" defaultedgetype=\"{}\">\n",
        snapshot.directedness()
    ));

    xml.push_str("    <attributes class=\"node\">\n");
    xml.push_str("      <attribute id=\"0\" title=\"title\" type=\"string\"/>\n");
    xml.push_str("      <attribute id=\"1\" title=\"authors\" type=\"string\"/>\n");
    xml.push_str("    </attributes>\n");

    xml.push_str("    <nodes>\n");
    for (key, node) in snapshot.nodes() {
        let key = escape_xml(key);
        if node.metadata.is_empty() {
            xml.push_str(&format!("      <node id=\"{}\" label=\"{}\"/>\n", key, key));
            continue;
        }

        xml.push_str(&format!("      <node id=\"{}\" label=\"{}\">\n", key, key));
        xml.push_str("        <attvalues>\n");
        if let Some(title) = &node.metadata.title {
            xml.push_str(&format!(
                "          <attvalue for=\"0\" value=\"{}\"/>\n",
                escape_xml(title)
            ));
        }
        xml.push_str(&format!(
            "          <attvalue for=\"1\" value=\"{}\"/>\n",
            escape_xml(&node.metadata.contributors_joined())
        ));
        xml.push_str("        </attvalues>\n");
        xml.push_str("      </node>\n");
    }
    xml.push_str("    </nodes>\n");

    xml.push_str("    <edges>\n");
    for (id, (from, to)) in snapshot.edges().enumerate() {
        xml.push_str(&format!(
            "      <edge id=\"{}\" source=\"{}\" target=\"{}\"/>\n",
            id,
            escape_xml(from),
            escape_xml(to)
        ));
    }
    xml.push_str("    </edges>\n");

    xml.push_str("  </graph>\n");
    xml.push_str("</gexf>\n");
    xml
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphAccumulator, Item};

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a & <b> \"c\""), "a &amp; &lt;b&gt; &quot;c&quot;");
        assert_eq!(escape_xml("bell\u{7}"), "bell");
    }

    #[test]
    fn test_format_gexf_contains_nodes_and_edges() {
        let mut graph = GraphAccumulator::directed();
        let item = Item::new(
            "10.1/a",
            Some("Networks & Graphs".to_string()),
            vec!["Ann".to_string(), "Bo".to_string()],
        );
        graph.upsert_node(&item.key, item.metadata());
        graph.upsert_edge("10.1/c", "10.1/a");

        let xml = format_gexf(&graph.snapshot());

        assert!(xml.contains("defaultedgetype=\"directed\""));
        assert!(xml.contains("value=\"Networks &amp; Graphs\""));
        assert!(xml.contains("value=\"Ann; Bo\""));
        assert!(xml.contains("<node id=\"10.1/c\" label=\"10.1/c\"/>"));
        assert!(xml.contains("source=\"10.1/c\" target=\"10.1/a\""));
    }

    #[test]
    fn test_write_places_file_under_prefix_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let sink = GexfSnapshotSink::new(dir.path(), "citation_network");

        let mut graph = GraphAccumulator::undirected();
        graph.upsert_edge("Ueno", "Akihabara");
        sink.write(&graph.snapshot(), "final").unwrap();

        let path = dir.path().join("citation_network_final.gexf");
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("defaultedgetype=\"undirected\""));
        assert!(!dir.path().join("citation_network_final.gexf.part").exists());
    }
}
