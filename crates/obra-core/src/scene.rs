//! Scene access abstraction and an in-memory scene graph
//!
//! The materializer, highlight engine and visibility controller only need a
//! narrow view of a scene: the mesh nodes in depth-first order, their names,
//! the material each one references, and a way to create and release
//! highlight materials. [`MeshScene`] captures that view so the same state
//! machines drive both the Bevy entity hierarchy and the plain
//! [`SceneGraph`] used by tests and tooling.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use thiserror::Error;

use crate::color::Rgb;
use crate::registry::TextureProfile;

/// Per-node material problems; traversals log and skip these
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MaterialError {
    #[error("Material {0} no longer exists")]
    Missing(String),
    #[error("Material {0} does not support PBR overrides")]
    Unsupported(String),
}

/// Narrow, mutable view over a loaded scene
pub trait MeshScene {
    /// Stable node identifier
    type Node: Copy + Eq + Hash + Debug;
    /// Material reference; equality is reference identity
    type Material: Clone + Eq + Hash + Debug;

    /// Nodes carrying a renderable mesh, depth-first
    fn mesh_nodes(&self) -> Vec<Self::Node>;

    /// Name used for classification and element matching
    fn node_name(&self, node: Self::Node) -> Option<&str>;

    /// Material currently assigned to the node
    fn material(&self, node: Self::Node) -> Option<Self::Material>;

    fn set_material(&mut self, node: Self::Node, material: Self::Material);

    fn set_visible(&mut self, node: Self::Node, visible: bool);

    /// Make the node cast and receive shadows
    fn enable_shadows(&mut self, node: Self::Node);

    /// New material copied from `source` with color, metalness, roughness
    /// and emissive taken from `profile`
    ///
    /// `source` is left untouched; other nodes may share it.
    fn derive_material(
        &mut self,
        source: &Self::Material,
        profile: &TextureProfile,
    ) -> Result<Self::Material, MaterialError>;

    /// Create a translucent, non-wireframe material tinted `tint`
    fn create_highlight(&mut self, tint: Rgb, opacity: f32) -> Self::Material;

    /// Release a material created by [`MeshScene::create_highlight`]
    fn dispose(&mut self, material: Self::Material);
}

/// Index of a node in a [`SceneGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Index of a material in a [`SceneGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

/// A node references one material or one per mesh primitive
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MaterialRef {
    Single(MaterialId),
    Multi(Vec<MaterialId>),
}

impl MaterialRef {
    pub fn ids(&self) -> Vec<MaterialId> {
        match self {
            MaterialRef::Single(id) => vec![*id],
            MaterialRef::Multi(ids) => ids.clone(),
        }
    }
}

/// Shading model of a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaterialKind {
    /// Metallic-roughness PBR
    #[default]
    Standard,
    /// Unlit; has no PBR parameters to override
    Basic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub kind: MaterialKind,
    pub color: Rgb,
    pub metalness: f32,
    pub roughness: f32,
    pub emissive: Rgb,
    pub emissive_intensity: f32,
    pub opacity: f32,
    pub transparent: bool,
    pub wireframe: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            kind: MaterialKind::Standard,
            color: Rgb::WHITE,
            metalness: 0.0,
            roughness: 1.0,
            emissive: Rgb::BLACK,
            emissive_intensity: 1.0,
            opacity: 1.0,
            transparent: false,
            wireframe: false,
        }
    }
}

impl Material {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: Option<String>,
    pub has_mesh: bool,
    pub material: Option<MaterialRef>,
    pub visible: bool,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub children: Vec<NodeId>,
}

/// Arena-backed scene graph
///
/// Tracks how many materials were created and disposed so leak checks can
/// be made without a renderer.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    roots: Vec<NodeId>,
    materials: HashMap<MaterialId, Material>,
    next_material: u32,
    highlights_created: usize,
    disposed: usize,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.next_material);
        self.next_material += 1;
        self.materials.insert(id, material);
        id
    }

    /// Add a grouping node without a mesh
    pub fn add_group(&mut self, parent: Option<NodeId>, name: &str) -> NodeId {
        self.push_node(parent, Some(name.to_string()), false, None)
    }

    /// Add a mesh node
    pub fn add_mesh(
        &mut self,
        parent: Option<NodeId>,
        name: Option<&str>,
        material: Option<MaterialRef>,
    ) -> NodeId {
        self.push_node(parent, name.map(str::to_string), true, material)
    }

    fn push_node(
        &mut self,
        parent: Option<NodeId>,
        name: Option<String>,
        has_mesh: bool,
        material: Option<MaterialRef>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            name,
            has_mesh,
            material,
            visible: true,
            cast_shadow: false,
            receive_shadow: false,
            children: Vec::new(),
        });
        match parent.and_then(|p| self.nodes.get_mut(p.0)) {
            Some(parent_node) => parent_node.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn get_material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(&id)
    }

    /// Materials currently alive (authored, derived and highlights)
    pub fn live_materials(&self) -> usize {
        self.materials.len()
    }

    pub fn highlights_created(&self) -> usize {
        self.highlights_created
    }

    pub fn disposed_count(&self) -> usize {
        self.disposed
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes, depth-first from the roots
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(node) = self.nodes.get(id.0) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        order
    }

    /// First node, depth-first, whose name equals `name`
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.depth_first()
            .into_iter()
            .find(|id| self.nodes[id.0].name.as_deref() == Some(name))
    }
}

impl MeshScene for SceneGraph {
    type Node = NodeId;
    type Material = MaterialRef;

    fn mesh_nodes(&self) -> Vec<NodeId> {
        self.depth_first()
            .into_iter()
            .filter(|id| self.nodes[id.0].has_mesh)
            .collect()
    }

    fn node_name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).and_then(|n| n.name.as_deref())
    }

    fn material(&self, node: NodeId) -> Option<MaterialRef> {
        self.nodes.get(node.0).and_then(|n| n.material.clone())
    }

    fn set_material(&mut self, node: NodeId, material: MaterialRef) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.material = Some(material);
        }
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.visible = visible;
        }
    }

    fn enable_shadows(&mut self, node: NodeId) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.cast_shadow = true;
            n.receive_shadow = true;
        }
    }

    fn derive_material(
        &mut self,
        source: &MaterialRef,
        profile: &TextureProfile,
    ) -> Result<MaterialRef, MaterialError> {
        let mut sources = Vec::new();
        for id in source.ids() {
            let material = self
                .materials
                .get(&id)
                .ok_or_else(|| MaterialError::Missing(format!("{:?}", id)))?;
            sources.push((id, material.clone()));
        }
        if !sources.iter().any(|(_, m)| m.kind == MaterialKind::Standard) {
            return Err(MaterialError::Unsupported(format!("{:?}", source)));
        }

        // Unlit slots of a multi-material keep their original
        let ids: Vec<MaterialId> = sources
            .into_iter()
            .map(|(id, mut material)| {
                if material.kind != MaterialKind::Standard {
                    return id;
                }
                material.color = profile.color;
                material.metalness = profile.metalness;
                material.roughness = profile.roughness;
                if let Some(emissive) = profile.emissive {
                    material.emissive = emissive;
                    material.emissive_intensity = profile.emissive_intensity;
                }
                self.add_material(material)
            })
            .collect();

        Ok(match source {
            MaterialRef::Single(_) => MaterialRef::Single(ids[0]),
            MaterialRef::Multi(_) => MaterialRef::Multi(ids),
        })
    }

    fn create_highlight(&mut self, tint: Rgb, opacity: f32) -> MaterialRef {
        self.highlights_created += 1;
        let id = self.add_material(Material {
            name: Some("highlight".to_string()),
            color: tint,
            emissive: tint.scaled(0.2),
            opacity,
            transparent: true,
            wireframe: false,
            ..Default::default()
        });
        MaterialRef::Single(id)
    }

    fn dispose(&mut self, material: MaterialRef) {
        for id in material.ids() {
            if self.materials.remove(&id).is_some() {
                self.disposed += 1;
            }
        }
    }
}
