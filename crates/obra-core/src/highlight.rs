//! Selection highlighting with exact material restoration
//!
//! A selection is a list of element-name fragments. Every mesh node whose
//! name contains one of them gets its own translucent highlight material;
//! the material it had before is kept in a [`MaterialCapture`] so it can be
//! put back. Each new selection first restores and disposes everything the
//! previous one created, so highlight materials never outlive the selection
//! that made them.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::debug;

use crate::color::Rgb;
use crate::scene::MeshScene;

/// Opacity of highlight materials
pub const HIGHLIGHT_OPACITY: f32 = 0.6;

/// Original material per node, recorded before the node's material is swapped
#[derive(Debug, Clone)]
pub struct MaterialCapture<N, M> {
    originals: HashMap<N, M>,
}

impl<N: Copy + Eq + Hash, M: Clone> Default for MaterialCapture<N, M> {
    fn default() -> Self {
        Self {
            originals: HashMap::new(),
        }
    }
}

impl<N: Copy + Eq + Hash, M: Clone> MaterialCapture<N, M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `material` as the node's original unless one is already recorded
    ///
    /// Returns `true` when a new entry was created.
    pub fn capture(&mut self, node: N, material: M) -> bool {
        if self.originals.contains_key(&node) {
            return false;
        }
        self.originals.insert(node, material);
        true
    }

    pub fn original(&self, node: N) -> Option<&M> {
        self.originals.get(&node)
    }

    pub fn contains(&self, node: N) -> bool {
        self.originals.contains_key(&node)
    }

    /// Swap the recorded original of an already captured node
    ///
    /// Returns `false` and records nothing when the node was not captured.
    pub fn replace(&mut self, node: N, material: M) -> bool {
        match self.originals.get_mut(&node) {
            Some(original) => {
                *original = material;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, node: N) -> Option<M> {
        self.originals.remove(&node)
    }

    pub fn clear(&mut self) {
        self.originals.clear();
    }

    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }
}

/// Highlight engine state: captured originals and live highlight materials
#[derive(Debug, Clone)]
pub struct HighlightState<N, M> {
    original_materials: MaterialCapture<N, M>,
    active_highlights: HashMap<N, M>,
    elements: Vec<String>,
    tint: Option<Rgb>,
    opacity: f32,
}

impl<N: Copy + Eq + Hash + Debug, M: Clone> Default for HighlightState<N, M> {
    fn default() -> Self {
        Self::with_opacity(HIGHLIGHT_OPACITY)
    }
}

impl<N: Copy + Eq + Hash + Debug, M: Clone> HighlightState<N, M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_opacity(opacity: f32) -> Self {
        Self {
            original_materials: MaterialCapture::new(),
            active_highlights: HashMap::new(),
            elements: Vec::new(),
            tint: None,
            opacity: opacity.clamp(0.0, 1.0),
        }
    }

    /// Highlight every mesh whose name contains one of `element_names`
    ///
    /// The previous selection is fully restored first. Matching is
    /// case-insensitive; empty fragments are ignored, so an empty list just
    /// clears. Returns the number of highlighted nodes.
    pub fn set_selection<S, E>(&mut self, scene: &mut S, element_names: &[E], tint: Rgb) -> usize
    where
        S: MeshScene<Node = N, Material = M>,
        E: AsRef<str>,
    {
        self.restore(scene);

        let fragments: Vec<String> = element_names
            .iter()
            .map(|e| e.as_ref().trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();

        if fragments.is_empty() {
            self.elements.clear();
            self.tint = None;
            return 0;
        }

        for node in scene.mesh_nodes() {
            let Some(name) = scene.node_name(node) else {
                continue;
            };
            let lowered = name.to_lowercase();
            if !fragments.iter().any(|f| lowered.contains(f.as_str())) {
                continue;
            }

            let Some(current) = scene.material(node) else {
                debug!(node = ?node, "Skipping highlight of mesh without material");
                continue;
            };
            self.original_materials.capture(node, current);

            let highlight = scene.create_highlight(tint, self.opacity);
            scene.set_material(node, highlight.clone());
            self.active_highlights.insert(node, highlight);
        }

        self.elements = fragments;
        self.tint = Some(tint);

        debug!(
            highlighted = self.active_highlights.len(),
            elements = ?self.elements,
            "Selection applied"
        );
        self.active_highlights.len()
    }

    /// Remove all highlights, restoring the captured materials
    pub fn clear_selection<S>(&mut self, scene: &mut S)
    where
        S: MeshScene<Node = N, Material = M>,
    {
        let empty: [&str; 0] = [];
        self.set_selection(scene, &empty, Rgb::WHITE);
    }

    /// Put originals back and dispose every live highlight material
    fn restore<S>(&mut self, scene: &mut S) -> usize
    where
        S: MeshScene<Node = N, Material = M>,
    {
        let restored = self.active_highlights.len();
        for (node, highlight) in self.active_highlights.drain() {
            if let Some(original) = self.original_materials.remove(node) {
                scene.set_material(node, original);
            }
            scene.dispose(highlight);
        }
        self.original_materials.clear();
        restored
    }

    /// Forget all state without touching a scene (the scene was unloaded)
    pub fn reset(&mut self) {
        self.original_materials.clear();
        self.active_highlights.clear();
        self.elements.clear();
        self.tint = None;
    }

    pub fn is_highlighted(&self, node: N) -> bool {
        self.active_highlights.contains_key(&node)
    }

    pub fn highlighted_count(&self) -> usize {
        self.active_highlights.len()
    }

    pub fn original_materials(&self) -> &MaterialCapture<N, M> {
        &self.original_materials
    }

    /// Originals of highlighted nodes, for passes that replace them in place
    pub fn original_materials_mut(&mut self) -> &mut MaterialCapture<N, M> {
        &mut self.original_materials
    }

    /// Lowercased element fragments of the active selection
    pub fn active_elements(&self) -> &[String] {
        &self.elements
    }

    pub fn tint(&self) -> Option<Rgb> {
        self.tint
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Material, MaterialRef, NodeId, SceneGraph};

    fn scene() -> (SceneGraph, Vec<NodeId>) {
        let mut scene = SceneGraph::new();
        let parede = scene.add_material(Material::named("parede"));
        let tomada = scene.add_material(Material::named("tomada"));
        let root = scene.add_group(None, "Residencia");
        let nodes = vec![
            scene.add_mesh(Some(root), Some("ParedeTerreo_01"), Some(MaterialRef::Single(parede))),
            scene.add_mesh(Some(root), Some("ParedeTerreo_02"), Some(MaterialRef::Single(parede))),
            scene.add_mesh(Some(root), Some("Tomada_Sala"), Some(MaterialRef::Single(tomada))),
            scene.add_mesh(Some(root), Some("SemMaterial"), None),
        ];
        (scene, nodes)
    }

    #[test]
    fn test_set_selection_highlights_matches() {
        let (mut scene, nodes) = scene();
        let mut state = HighlightState::new();

        let count = state.set_selection(&mut scene, &["paredeterreo"], Rgb::new(1.0, 0.0, 0.0));
        assert_eq!(count, 2);
        assert!(state.is_highlighted(nodes[0]));
        assert!(state.is_highlighted(nodes[1]));
        assert!(!state.is_highlighted(nodes[2]));

        let highlight = scene.material(nodes[0]).unwrap();
        let MaterialRef::Single(id) = highlight else { panic!("expected single material") };
        let material = scene.get_material(id).unwrap();
        assert!(material.transparent);
        assert!(!material.wireframe);
        assert_eq!(material.opacity, HIGHLIGHT_OPACITY);
        assert_eq!(material.color, Rgb::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_reselect_disposes_previous_highlights() {
        let (mut scene, nodes) = scene();
        let authored = scene.live_materials();
        let mut state = HighlightState::new();

        state.set_selection(&mut scene, &["ParedeTerreo"], Rgb::WHITE);
        let first = scene.material(nodes[0]).unwrap();
        assert_eq!(scene.live_materials(), authored + 2);

        state.set_selection(&mut scene, &["Tomada"], Rgb::WHITE);
        assert_eq!(scene.live_materials(), authored + 1);
        assert_eq!(scene.disposed_count(), 2);

        // Only the second selection's node is highlighted
        assert_eq!(state.highlighted_count(), 1);
        assert!(state.is_highlighted(nodes[2]));
        assert_ne!(scene.material(nodes[0]), Some(first.clone()));
        if let MaterialRef::Single(id) = first {
            assert!(scene.get_material(id).is_none());
        }
    }

    #[test]
    fn test_clear_restores_identity() {
        let (mut scene, nodes) = scene();
        let before: Vec<_> = nodes.iter().map(|n| scene.material(*n)).collect();
        let authored = scene.live_materials();
        let mut state = HighlightState::new();

        state.set_selection(&mut scene, &["Parede", "Tomada"], Rgb::WHITE);
        state.set_selection(&mut scene, &["Tomada_Sala"], Rgb::WHITE);
        state.clear_selection(&mut scene);

        let after: Vec<_> = nodes.iter().map(|n| scene.material(*n)).collect();
        assert_eq!(before, after);
        assert_eq!(scene.live_materials(), authored);
        assert_eq!(scene.highlights_created(), scene.disposed_count());
        assert!(state.original_materials().is_empty());
        assert_eq!(state.highlighted_count(), 0);
        assert!(state.tint().is_none());
    }

    #[test]
    fn test_capture_keeps_first_and_replaces_known() {
        let mut capture: MaterialCapture<NodeId, &str> = MaterialCapture::new();
        assert!(capture.capture(NodeId(1), "autoral"));
        assert!(!capture.capture(NodeId(1), "destaque"));
        assert_eq!(capture.original(NodeId(1)), Some(&"autoral"));

        assert!(capture.replace(NodeId(1), "perfil"));
        assert_eq!(capture.original(NodeId(1)), Some(&"perfil"));
        assert!(!capture.replace(NodeId(2), "perfil"));
        assert_eq!(capture.len(), 1);
    }

    #[test]
    fn test_empty_fragments_mean_no_highlight() {
        let (mut scene, _) = scene();
        let mut state = HighlightState::new();

        assert_eq!(state.set_selection(&mut scene, &["", "  "], Rgb::WHITE), 0);
        assert_eq!(scene.highlights_created(), 0);
    }

    #[test]
    fn test_mesh_without_material_is_skipped() {
        let (mut scene, nodes) = scene();
        let mut state = HighlightState::new();

        // "Sem" only matches the node without material
        assert_eq!(state.set_selection(&mut scene, &["Sem"], Rgb::WHITE), 0);
        assert!(scene.material(nodes[3]).is_none());
    }
}
