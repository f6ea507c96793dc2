//! Traversal of the glTF JSON scene description

use gltf::json::{Mesh, Node, Root};
use serde::Serialize;

/// The parsed JSON chunk
///
/// Parsed without validation, so files Bevy would reject can still be
/// inspected.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct GltfDocument {
    pub root: Root,
}

/// A node reached by [`GltfDocument::walk`]
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    pub index: usize,
    pub depth: usize,
    pub node: &'a Node,
}

impl GltfDocument {
    pub fn from_slice(json: &[u8]) -> Result<Self, serde_json::Error> {
        Ok(Self {
            root: serde_json::from_slice(json)?,
        })
    }

    /// Roots of the default scene, or of the first scene, or every node no
    /// other node lists as a child
    pub fn root_nodes(&self) -> Vec<usize> {
        let root = &self.root;
        let scene = root
            .scene
            .and_then(|i| root.scenes.get(i.value()))
            .or(root.scenes.first());
        if let Some(scene) = scene {
            return scene.nodes.iter().map(|i| i.value()).collect();
        }

        let mut is_child = vec![false; root.nodes.len()];
        for child in root.nodes.iter().flat_map(|n| n.children.iter().flatten()) {
            if let Some(flag) = is_child.get_mut(child.value()) {
                *flag = true;
            }
        }
        (0..root.nodes.len()).filter(|&i| !is_child[i]).collect()
    }

    /// Depth-first pre-order walk from the scene roots
    ///
    /// Each node is visited at most once, so malformed files with cycles
    /// terminate.
    pub fn walk(&self) -> Vec<Visit<'_>> {
        let nodes = &self.root.nodes;
        let mut seen = vec![false; nodes.len()];
        let mut visits = Vec::new();
        let mut stack: Vec<(usize, usize)> = self
            .root_nodes()
            .into_iter()
            .rev()
            .map(|index| (index, 0))
            .collect();

        while let Some((index, depth)) = stack.pop() {
            let Some(node) = nodes.get(index) else {
                tracing::warn!(index, "Node index out of range");
                continue;
            };
            if std::mem::replace(&mut seen[index], true) {
                continue;
            }
            visits.push(Visit { index, depth, node });
            for child in node.children.iter().flatten().rev() {
                stack.push((child.value(), depth + 1));
            }
        }
        visits
    }

    pub fn mesh(&self, node: &Node) -> Option<&Mesh> {
        node.mesh.and_then(|i| self.root.meshes.get(i.value()))
    }

    /// Name used to classify a mesh-carrying node: its own name, falling
    /// back to the mesh name
    pub fn classification_name<'a>(&'a self, node: &'a Node) -> Option<&'a str> {
        node.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| self.mesh(node).and_then(|m| m.name.as_deref()))
            .filter(|name| !name.is_empty())
    }

    /// Classification names of every node carrying a mesh, in walk order
    pub fn mesh_node_names(&self) -> Vec<&str> {
        self.walk()
            .into_iter()
            .filter(|visit| visit.node.mesh.is_some())
            .filter_map(|visit| self.classification_name(visit.node))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(json: &str) -> GltfDocument {
        GltfDocument::from_slice(json.as_bytes()).unwrap()
    }

    #[test]
    fn test_walk_order_and_roots() {
        let doc = document(
            r#"{
                "asset": {"version": "2.0"},
                "nodes": [
                    {"name": "Casa", "children": [1, 2]},
                    {"name": "Tomada_01", "mesh": 0},
                    {"name": "Parede", "children": [3]},
                    {"mesh": 1},
                    {"name": "Solto", "mesh": 1},
                    {"name": "", "mesh": 1}
                ],
                "meshes": [
                    {"name": "TomadaMesh", "primitives": [{"attributes": {}}]},
                    {"name": "ParedeMesh", "primitives": [{"attributes": {}, "material": 0}]}
                ]
            }"#,
        );

        // No scenes: unreferenced nodes are roots
        assert_eq!(doc.root_nodes(), vec![0, 4, 5]);

        let walk: Vec<(usize, usize)> = doc.walk().iter().map(|v| (v.index, v.depth)).collect();
        assert_eq!(walk, vec![(0, 0), (1, 1), (2, 1), (3, 2), (4, 0), (5, 0)]);

        assert_eq!(
            doc.mesh_node_names(),
            vec!["Tomada_01", "ParedeMesh", "Solto", "ParedeMesh"]
        );
    }

    #[test]
    fn test_default_scene_and_cycles() {
        let doc = document(
            r#"{
                "asset": {"version": "2.0"},
                "scene": 1,
                "scenes": [{"nodes": [0]}, {"nodes": [1]}],
                "nodes": [
                    {"name": "A", "children": [1]},
                    {"name": "B", "children": [0, 7]}
                ]
            }"#,
        );

        assert_eq!(doc.root_nodes(), vec![1]);
        let walk: Vec<usize> = doc.walk().iter().map(|v| v.index).collect();
        assert_eq!(walk, vec![1, 0]);
    }
}
