//! Human-readable reports over a parsed GLB

use obra_core::ServiceRegistry;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::{self, Write};

use crate::container::GlbFile;
use crate::document::GltfDocument;

/// Header fields and chunk table
pub fn info(glb: &GlbFile, doc: &GltfDocument) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "magic:    {}", String::from_utf8_lossy(&glb.header.magic))?;
    writeln!(out, "version:  {}", glb.header.version)?;
    writeln!(out, "length:   {} bytes", glb.header.length)?;
    writeln!(out, "chunks:")?;
    for (i, (kind, len)) in glb.chunks().into_iter().enumerate() {
        writeln!(out, "  [{}] {:<6} {} bytes", i, kind, len)?;
    }

    let root = &doc.root;
    let generator = root.asset.generator.as_deref().unwrap_or("unknown generator");
    writeln!(out, "glTF {} ({})", root.asset.version, generator)?;
    writeln!(
        out,
        "{} scenes, {} nodes, {} meshes, {} materials",
        root.scenes.len(),
        root.nodes.len(),
        root.meshes.len(),
        root.materials.len()
    )?;
    Ok(out)
}

/// Indented node hierarchy
pub fn tree(doc: &GltfDocument) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for visit in doc.walk() {
        let name = visit.node.name.as_deref().unwrap_or("<unnamed>");
        write!(out, "{}{}", "  ".repeat(visit.depth), name)?;
        if let Some(mesh) = doc.mesh(visit.node) {
            write!(
                out,
                "  [mesh {} x{}]",
                mesh.name.as_deref().unwrap_or("<unnamed>"),
                mesh.primitives.len()
            )?;
        }
        out.push('\n');
    }
    Ok(out)
}

/// Leading part of a node name, up to the first separator or digit
pub fn name_prefix(name: &str) -> Option<&str> {
    let end = name
        .find(|c: char| matches!(c, '_' | '.' | '-' | ' ') || c.is_ascii_digit())
        .unwrap_or(name.len());
    let prefix = &name[..end];
    (!prefix.is_empty()).then_some(prefix)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefixCount {
    pub prefix: String,
    pub count: usize,
}

/// Prefix statistics over mesh-carrying nodes, most frequent first
pub fn prefix_counts(doc: &GltfDocument) -> Vec<PrefixCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in doc.mesh_node_names() {
        if let Some(prefix) = name_prefix(name) {
            *counts.entry(prefix).or_default() += 1;
        }
    }

    let mut counts: Vec<PrefixCount> = counts
        .into_iter()
        .map(|(prefix, count)| PrefixCount {
            prefix: prefix.to_string(),
            count,
        })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.prefix.cmp(&b.prefix)));
    counts
}

pub fn prefixes(doc: &GltfDocument) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for entry in prefix_counts(doc) {
        writeln!(out, "{:>6}  {}", entry.count, entry.prefix)?;
    }
    Ok(out)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassifyReport {
    /// Matched mesh nodes per service, registry order
    pub matched: Vec<(String, usize)>,
    pub unmatched: Vec<String>,
}

/// Run every mesh-carrying node through the registry
pub fn classify(doc: &GltfDocument, registry: &ServiceRegistry) -> ClassifyReport {
    let mut counts = vec![0usize; registry.len()];
    let mut unmatched = Vec::new();

    for name in doc.mesh_node_names() {
        match registry.classify_index(name) {
            Some(index) => counts[index] += 1,
            None => unmatched.push(name.to_string()),
        }
    }

    ClassifyReport {
        matched: registry
            .services()
            .iter()
            .zip(counts)
            .map(|(service, count)| (service.service_name.clone(), count))
            .collect(),
        unmatched,
    }
}

pub fn classify_text(
    report: &ClassifyReport,
    registry: &ServiceRegistry,
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for (service, count) in &report.matched {
        writeln!(out, "{:>6}  {}", count, service)?;
    }

    writeln!(out, "{:>6}  (unmatched)", report.unmatched.len())?;
    let mut unmatched = report.unmatched.clone();
    unmatched.sort();
    unmatched.dedup();
    for name in unmatched {
        writeln!(out, "        {}", name)?;
    }

    for overlap in registry.keyword_overlaps() {
        writeln!(
            out,
            "warning: keyword \"{}\" ({}) also matches \"{}\" ({})",
            overlap.keyword, overlap.service, overlap.other_keyword, overlap.other_service
        )?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::tests::glb_bytes;
    use obra_core::builtin_registry;

    const MODEL: &str = r#"{
        "asset": {"version": "2.0", "generator": "SketchUp"},
        "scenes": [{"name": "Scene", "nodes": [0]}],
        "nodes": [
            {"name": "Casa", "children": [1, 2, 3, 4]},
            {"name": "Tomada_01", "mesh": 0},
            {"name": "Tomada_02", "mesh": 0},
            {"name": "Pilar.003", "mesh": 1},
            {"name": "Cadeira 4", "mesh": 1}
        ],
        "meshes": [
            {"name": "TomadaMesh", "primitives": [{"attributes": {}}]},
            {"name": "Box", "primitives": [{"attributes": {}}, {"attributes": {}}]}
        ]
    }"#;

    fn document() -> (GlbFile, GltfDocument) {
        let glb = GlbFile::parse(&glb_bytes(MODEL, None)).unwrap();
        let doc = glb.document().unwrap();
        (glb, doc)
    }

    #[test]
    fn test_name_prefix() {
        assert_eq!(name_prefix("Tomada_01"), Some("Tomada"));
        assert_eq!(name_prefix("Pilar.003"), Some("Pilar"));
        assert_eq!(name_prefix("Cadeira 4"), Some("Cadeira"));
        assert_eq!(name_prefix("Viga-A"), Some("Viga"));
        assert_eq!(name_prefix("Laje2"), Some("Laje"));
        assert_eq!(name_prefix("Telhado"), Some("Telhado"));
        assert_eq!(name_prefix("_tmp"), None);
        assert_eq!(name_prefix("3D"), None);
    }

    #[test]
    fn test_prefix_counts_sorted() {
        let (_, doc) = document();
        let counts = prefix_counts(&doc);
        assert_eq!(counts[0], PrefixCount { prefix: "Tomada".into(), count: 2 });
        assert_eq!(counts[1].prefix, "Cadeira");
        assert_eq!(counts[2].prefix, "Pilar");
    }

    #[test]
    fn test_tree_and_info() {
        let (glb, doc) = document();
        let tree = tree(&doc).unwrap();
        assert!(tree.starts_with("Casa\n  Tomada_01  [mesh TomadaMesh x1]\n"));
        assert!(tree.contains("  Pilar.003  [mesh Box x2]"));

        let info = info(&glb, &doc).unwrap();
        assert!(info.contains("magic:    glTF"));
        assert!(info.contains("version:  2"));
        assert!(info.contains("[0] JSON"));
        assert!(info.contains("SketchUp"));
        assert!(info.contains("1 scenes, 5 nodes, 2 meshes, 0 materials"));
    }

    #[test]
    fn test_classify_against_builtin() {
        let (_, doc) = document();
        let registry = builtin_registry().unwrap();
        let report = classify(&doc, &registry);

        let count = |name: &str| {
            report
                .matched
                .iter()
                .find(|(service, _)| service == name)
                .map(|(_, count)| *count)
                .unwrap()
        };
        assert_eq!(count("Eletrica"), 2);
        assert_eq!(count("Estrutura"), 1);
        assert_eq!(report.unmatched, vec!["Cadeira 4".to_string()]);

        let text = classify_text(&report, &registry).unwrap();
        assert!(text.contains("Cadeira 4"));
    }
}
