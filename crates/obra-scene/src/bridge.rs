//! Adapter exposing a spawned glTF scene as a [`MeshScene`]
//!
//! Bevy's glTF loader spawns one entity per node carrying the node's `Name`,
//! with one child entity per mesh primitive carrying `Mesh3d`, the material
//! and a [`GltfMeshName`]. Classification works on the node name, so every
//! primitive is indexed under the name of the node that owns it, falling
//! back to its mesh name when that node is unnamed.

use bevy::color::LinearRgba;
use bevy::gltf::GltfMeshName;
use bevy::prelude::*;
use std::collections::HashMap;

use obra_core::{MaterialError, MeshScene, Rgb, TextureProfile};

/// Components touched on every primitive entity
pub type MeshItems = (
    &'static mut MeshMaterial3d<StandardMaterial>,
    &'static mut Visibility,
);

/// Placeholder Bevy gives unnamed glTF nodes and meshes (`GltfNode3`)
fn is_placeholder(name: &str) -> bool {
    ["GltfNode", "GltfMesh"].iter().any(|prefix| {
        name.strip_prefix(prefix)
            .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
    })
}

fn authored(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty() && !is_placeholder(name)).then(|| name.to_string())
}

/// Depth-first list of primitive entities below a scene root, with names
#[derive(Debug, Clone, Default)]
pub struct SceneIndex {
    pub order: Vec<Entity>,
    pub names: HashMap<Entity, String>,
}

impl SceneIndex {
    /// Walk the hierarchy below `root`
    ///
    /// A primitive takes the name of its direct parent node, then its mesh
    /// name; with neither it is indexed without a name and never matched.
    pub fn build(
        root: Entity,
        children: &Query<&Children>,
        names: &Query<&Name>,
        mesh_names: &Query<&GltfMeshName>,
        primitives: &Query<(), With<Mesh3d>>,
    ) -> Self {
        let mut index = SceneIndex::default();
        let mut stack: Vec<(Entity, Option<Entity>)> = vec![(root, None)];

        while let Some((entity, parent)) = stack.pop() {
            if primitives.get(entity).is_ok() {
                index.order.push(entity);
                let node_name = parent
                    .and_then(|p| names.get(p).ok())
                    .and_then(|n| authored(n.as_str()));
                let name = node_name
                    .or_else(|| mesh_names.get(entity).ok().and_then(|m| authored(&m.0)));
                if let Some(name) = name {
                    index.names.insert(entity, name);
                }
            }

            if let Ok(kids) = children.get(entity) {
                let kids: Vec<Entity> = kids.iter().collect();
                for child in kids.into_iter().rev() {
                    stack.push((child, Some(entity)));
                }
            }
        }

        index
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn to_color(rgb: Rgb) -> Color {
    Color::srgb(rgb.r, rgb.g, rgb.b)
}

fn to_linear(rgb: Rgb, intensity: f32) -> LinearRgba {
    let linear = to_color(rgb).to_linear();
    LinearRgba::rgb(
        linear.red * intensity,
        linear.green * intensity,
        linear.blue * intensity,
    )
}

/// Mutable view over one indexed scene
///
/// Shadow flags need structural changes, which are collected in
/// [`EntityScene::take_shadow_entities`] for the caller to apply.
pub struct EntityScene<'a, 'w, 's> {
    index: &'a SceneIndex,
    meshes: &'a mut Query<'w, 's, MeshItems, With<Mesh3d>>,
    materials: &'a mut Assets<StandardMaterial>,
    shadow_entities: Vec<Entity>,
}

impl<'a, 'w, 's> EntityScene<'a, 'w, 's> {
    pub fn new(
        index: &'a SceneIndex,
        meshes: &'a mut Query<'w, 's, MeshItems, With<Mesh3d>>,
        materials: &'a mut Assets<StandardMaterial>,
    ) -> Self {
        Self {
            index,
            meshes,
            materials,
            shadow_entities: Vec::new(),
        }
    }

    /// Entities that must lose `NotShadowCaster`/`NotShadowReceiver`
    pub fn take_shadow_entities(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.shadow_entities)
    }
}

impl MeshScene for EntityScene<'_, '_, '_> {
    type Node = Entity;
    type Material = Handle<StandardMaterial>;

    fn mesh_nodes(&self) -> Vec<Entity> {
        self.index.order.clone()
    }

    fn node_name(&self, node: Entity) -> Option<&str> {
        self.index.names.get(&node).map(String::as_str)
    }

    fn material(&self, node: Entity) -> Option<Handle<StandardMaterial>> {
        self.meshes.get(node).ok().map(|(material, _)| material.0.clone())
    }

    fn set_material(&mut self, node: Entity, material: Handle<StandardMaterial>) {
        if let Ok((mut current, _)) = self.meshes.get_mut(node) {
            current.0 = material;
        }
    }

    fn set_visible(&mut self, node: Entity, visible: bool) {
        if let Ok((_, mut visibility)) = self.meshes.get_mut(node) {
            *visibility = if visible {
                Visibility::Inherited
            } else {
                Visibility::Hidden
            };
        }
    }

    fn enable_shadows(&mut self, node: Entity) {
        self.shadow_entities.push(node);
    }

    fn derive_material(
        &mut self,
        source: &Handle<StandardMaterial>,
        profile: &TextureProfile,
    ) -> Result<Handle<StandardMaterial>, MaterialError> {
        let Some(source_material) = self.materials.get(source) else {
            return Err(MaterialError::Missing(format!("{:?}", source.id())));
        };
        if source_material.unlit {
            return Err(MaterialError::Unsupported(format!("{:?}", source.id())));
        }

        let mut derived = source_material.clone();
        derived.base_color = to_color(profile.color);
        derived.metallic = profile.metalness;
        derived.perceptual_roughness = profile.roughness;
        if let Some(emissive) = profile.emissive {
            derived.emissive = to_linear(emissive, profile.emissive_intensity);
        }
        Ok(self.materials.add(derived))
    }

    fn create_highlight(&mut self, tint: Rgb, opacity: f32) -> Handle<StandardMaterial> {
        self.materials.add(StandardMaterial {
            base_color: Color::srgba(tint.r, tint.g, tint.b, opacity),
            emissive: to_linear(tint, 0.2),
            alpha_mode: AlphaMode::Blend,
            double_sided: true,
            cull_mode: None,
            ..default()
        })
    }

    fn dispose(&mut self, material: Handle<StandardMaterial>) {
        self.materials.remove(&material);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::SystemState;
    use obra_core::{builtin_registry, ServiceViewer, HIGHLIGHT_OPACITY};

    struct Model {
        root: Entity,
        primitives: Vec<Entity>,
        material: Handle<StandardMaterial>,
    }

    fn spawn_primitive(
        world: &mut World,
        parent: Entity,
        mesh_name: &str,
        material: &Handle<StandardMaterial>,
    ) -> Entity {
        world
            .spawn((
                Mesh3d(Handle::default()),
                MeshMaterial3d(material.clone()),
                GltfMeshName(mesh_name.to_string()),
                Visibility::default(),
                ChildOf(parent),
            ))
            .id()
    }

    /// Casa > Tomada_01 (two primitives), Casa > Parede > GltfNode3 (one
    /// primitive), Casa > GltfNode4 (one primitive of an unnamed mesh)
    fn spawn_model(world: &mut World) -> Model {
        world.init_resource::<Assets<StandardMaterial>>();
        let material = world
            .resource_mut::<Assets<StandardMaterial>>()
            .add(StandardMaterial::default());

        let root = world.spawn(Name::new("Casa")).id();
        let tomada = world.spawn((Name::new("Tomada_01"), ChildOf(root))).id();
        let parede = world.spawn((Name::new("Parede"), ChildOf(root))).id();
        let unnamed = world.spawn((Name::new("GltfNode3"), ChildOf(parede))).id();
        let bare = world.spawn((Name::new("GltfNode4"), ChildOf(root))).id();
        let primitives = vec![
            spawn_primitive(world, tomada, "TomadaMesh", &material),
            spawn_primitive(world, tomada, "TomadaMesh", &material),
            spawn_primitive(world, unnamed, "Sofa", &material),
            spawn_primitive(world, bare, "GltfMesh2", &material),
        ];
        Model {
            root,
            primitives,
            material,
        }
    }

    fn build_index(world: &mut World, root: Entity) -> SceneIndex {
        let mut state: SystemState<(
            Query<&Children>,
            Query<&Name>,
            Query<&GltfMeshName>,
            Query<(), With<Mesh3d>>,
        )> = SystemState::new(world);
        let (children, names, mesh_names, primitives) = state.get(world);
        SceneIndex::build(root, &children, &names, &mesh_names, &primitives)
    }

    fn material_of(world: &World, entity: Entity) -> Handle<StandardMaterial> {
        world
            .get::<MeshMaterial3d<StandardMaterial>>(entity)
            .unwrap()
            .0
            .clone()
    }

    #[test]
    fn test_index_names_from_parent_node() {
        let mut world = World::new();
        let model = spawn_model(&mut world);
        let index = build_index(&mut world, model.root);

        assert_eq!(index.order, model.primitives);
        assert_eq!(index.names[&model.primitives[0]], "Tomada_01");
        assert_eq!(index.names[&model.primitives[1]], "Tomada_01");
        // Unnamed node: mesh name, never a distant ancestor
        assert_eq!(index.names[&model.primitives[2]], "Sofa");
        assert!(!index.names.contains_key(&model.primitives[3]));
    }

    #[test]
    fn test_placeholder_names() {
        assert!(is_placeholder("GltfNode12"));
        assert!(is_placeholder("GltfMesh0"));
        assert!(!is_placeholder("GltfNode"));
        assert!(!is_placeholder("GltfNodeA"));
        assert!(!is_placeholder("Tomada_01"));
    }

    #[test]
    fn test_highlight_round_trip_on_entities() {
        let mut world = World::new();
        let model = spawn_model(&mut world);
        let index = build_index(&mut world, model.root);
        let mut viewer: ServiceViewer<Entity, Handle<StandardMaterial>> =
            ServiceViewer::new(builtin_registry().unwrap(), HIGHLIGHT_OPACITY);

        let mut state: SystemState<(
            Query<MeshItems, With<Mesh3d>>,
            ResMut<Assets<StandardMaterial>>,
        )> = SystemState::new(&mut world);

        {
            let (mut meshes, mut materials) = state.get_mut(&mut world);
            let mut scene = EntityScene::new(&index, &mut meshes, &mut materials);
            viewer.mark_ready(&mut scene);
            assert_eq!(scene.take_shadow_entities().len(), 4);
        }

        // Profiled copy on the tomadas only, shared source untouched
        let profiled = material_of(&world, model.primitives[0]);
        assert_ne!(profiled, model.material);
        assert_eq!(material_of(&world, model.primitives[1]), profiled);
        assert_eq!(material_of(&world, model.primitives[2]), model.material);
        {
            let materials = world.resource::<Assets<StandardMaterial>>();
            let source = materials.get(&model.material).unwrap();
            assert_eq!(source.base_color, StandardMaterial::default().base_color);
            assert_eq!(materials.len(), 2);
        }

        {
            let (mut meshes, mut materials) = state.get_mut(&mut world);
            let mut scene = EntityScene::new(&index, &mut meshes, &mut materials);
            assert_eq!(viewer.select_service(&mut scene, "Eletrica").unwrap(), 2);
        }

        let highlighted = material_of(&world, model.primitives[0]);
        assert_ne!(highlighted, profiled);
        let highlight = world.resource::<Assets<StandardMaterial>>().get(&highlighted).unwrap();
        assert_eq!(highlight.alpha_mode, AlphaMode::Blend);

        {
            let (mut meshes, mut materials) = state.get_mut(&mut world);
            let mut scene = EntityScene::new(&index, &mut meshes, &mut materials);
            viewer.clear_selection(&mut scene).unwrap();
            viewer.toggle_hidden(&mut scene, "Eletrica").unwrap();
        }

        for primitive in &model.primitives[..2] {
            assert_eq!(material_of(&world, *primitive), profiled);
            assert_eq!(world.get::<Visibility>(*primitive), Some(&Visibility::Hidden));
        }
        assert_eq!(world.get::<Visibility>(model.primitives[2]), Some(&Visibility::Inherited));

        let materials = world.resource::<Assets<StandardMaterial>>();
        assert!(materials.get(&highlighted).is_none());
        assert_eq!(materials.len(), 2);
    }
}
