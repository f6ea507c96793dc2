//! Service highlighting and visibility on the spawned model
//!
//! The UI never touches materials directly. It queues [`ServiceAction`]s,
//! which are applied against the model once its scene is ready.

use bevy::gltf::GltfMeshName;
use bevy::light::{NotShadowCaster, NotShadowReceiver};
use bevy::prelude::*;

use obra_core::{LoadState, Rgb, ServiceRegistry, ServiceViewer, ViewerError};

use crate::bridge::{EntityScene, MeshItems, SceneIndex};
use crate::model::{ModelLoad, ModelStatus, SceneReady, ServiceModel};

pub type EntityViewer = ServiceViewer<Entity, Handle<StandardMaterial>>;

/// Viewer state for the loaded model
#[derive(Resource)]
pub struct ServiceSession {
    pub viewer: EntityViewer,
    pub index: SceneIndex,
    /// Mesh primitives per service, registry order
    pub node_counts: Vec<(String, usize)>,
    pub last_error: Option<String>,
}

impl ServiceSession {
    pub fn new(registry: ServiceRegistry, highlight_opacity: f32) -> Self {
        Self {
            viewer: ServiceViewer::new(registry, highlight_opacity),
            index: SceneIndex::default(),
            node_counts: Vec::new(),
            last_error: None,
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        self.viewer.registry()
    }

    /// Primitives counted for `service`, zero when unknown
    pub fn node_count(&self, service: &str) -> usize {
        self.node_counts
            .iter()
            .find(|(name, _)| name == service)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

/// A user request against the model
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceAction {
    SelectService(String),
    SelectElements { elements: Vec<String>, tint: Rgb },
    ClearSelection,
    ToggleHidden(String),
    SetHidden(Vec<String>),
    ShowAll,
}

/// Actions queued by the UI this frame
#[derive(Resource, Default)]
pub struct PendingServiceActions(pub Vec<ServiceAction>);

impl PendingServiceActions {
    pub fn push(&mut self, action: ServiceAction) {
        self.0.push(action);
    }
}

pub struct ServicesPlugin;

impl Plugin for ServicesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingServiceActions>().add_systems(
            Update,
            (track_model_status, materialize_ready_scene, apply_service_actions)
                .chain()
                .after(crate::model::ModelSystems),
        );
    }
}

/// Keep the session's load state in step with the model
fn track_model_status(model: Res<ModelLoad>, mut session: ResMut<ServiceSession>) {
    if !model.is_changed() {
        return;
    }

    match &model.status {
        ModelStatus::Idle | ModelStatus::Loading => {
            if *session.viewer.state() != LoadState::Loading {
                session.viewer.begin_loading();
                session.index = SceneIndex::default();
                session.node_counts.clear();
            }
        }
        ModelStatus::Failed(reason) => {
            if *session.viewer.state() != LoadState::Failed(reason.clone()) {
                session.viewer.mark_failed(reason.clone());
            }
        }
        ModelStatus::Spawned | ModelStatus::Ready => {}
    }
}

/// Index and materialize the model the frame its scene becomes ready
#[allow(clippy::too_many_arguments)]
fn materialize_ready_scene(
    mut commands: Commands,
    mut session: ResMut<ServiceSession>,
    roots: Query<Entity, (With<ServiceModel>, Added<SceneReady>)>,
    children: Query<&Children>,
    names: Query<&Name>,
    mesh_names: Query<&GltfMeshName>,
    primitives: Query<(), With<Mesh3d>>,
    mut meshes: Query<MeshItems, With<Mesh3d>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let Some(root) = roots.iter().next() else {
        return;
    };

    let session = &mut *session;
    session.index = SceneIndex::build(root, &children, &names, &mesh_names, &primitives);

    let mut scene = EntityScene::new(&session.index, &mut meshes, &mut materials);
    let report = session.viewer.mark_ready(&mut scene);
    let shadow_entities = scene.take_shadow_entities();

    match session.viewer.service_node_counts(&scene) {
        Ok(counts) => session.node_counts = counts,
        Err(e) => tracing::warn!("Could not count service meshes: {}", e),
    }

    for entity in shadow_entities {
        commands
            .entity(entity)
            .remove::<(NotShadowCaster, NotShadowReceiver)>();
    }

    tracing::info!(
        "Materialized {} primitives ({} overridden with {} derived materials, {} skipped)",
        report.visited,
        report.overridden,
        report.derived,
        report.skipped
    );
}

fn apply_service_actions(
    mut pending: ResMut<PendingServiceActions>,
    mut session: ResMut<ServiceSession>,
    mut meshes: Query<MeshItems, With<Mesh3d>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if pending.0.is_empty() {
        return;
    }

    let session = &mut *session;
    let mut scene = EntityScene::new(&session.index, &mut meshes, &mut materials);

    for action in pending.0.drain(..) {
        let result: Result<(), ViewerError> = match &action {
            ServiceAction::SelectService(name) => {
                session.viewer.select_service(&mut scene, name).map(|_| ())
            }
            ServiceAction::SelectElements { elements, tint } => session
                .viewer
                .select_elements(&mut scene, elements, *tint)
                .map(|_| ()),
            ServiceAction::ClearSelection => session.viewer.clear_selection(&mut scene),
            ServiceAction::ToggleHidden(name) => {
                session.viewer.toggle_hidden(&mut scene, name).map(|_| ())
            }
            ServiceAction::SetHidden(names) => session
                .viewer
                .set_hidden(&mut scene, names.iter().cloned())
                .map(|_| ()),
            ServiceAction::ShowAll => session.viewer.show_all(&mut scene).map(|_| ()),
        };

        match result {
            Ok(()) => session.last_error = None,
            Err(e) => {
                tracing::warn!("Service action {:?} failed: {}", action, e);
                session.last_error = Some(e.to_string());
            }
        }
    }
}
