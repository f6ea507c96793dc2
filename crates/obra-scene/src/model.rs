//! Building model loading
//!
//! The model is a single glTF binary. Its default scene (or the first one)
//! is spawned under a [`ServiceModel`] root, and [`SceneReady`] is inserted
//! on that root once every entity of the scene instance exists.

use bevy::asset::LoadState;
use bevy::gltf::Gltf;
use bevy::prelude::*;
use bevy::scene::{SceneInstance, SceneSpawner};

/// Path of the model, relative to the asset root
#[derive(Debug, Clone, Resource)]
pub struct ModelSource {
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModelStatus {
    /// Nothing requested yet, or a reload was requested
    #[default]
    Idle,
    Loading,
    /// Scene entity spawned, waiting for its instance
    Spawned,
    Ready,
    Failed(String),
}

/// Load progress of the model
#[derive(Resource, Default)]
pub struct ModelLoad {
    pub handle: Option<Handle<Gltf>>,
    pub root: Option<Entity>,
    pub status: ModelStatus,
}

impl ModelLoad {
    /// Drop the current model and fetch it again
    pub fn request_reload(&mut self) {
        self.status = ModelStatus::Idle;
    }

    pub fn is_ready(&self) -> bool {
        self.status == ModelStatus::Ready
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            ModelStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Marker for the root entity of the building model
#[derive(Component)]
pub struct ServiceModel;

/// Inserted on the [`ServiceModel`] root once its scene is fully spawned
#[derive(Component)]
pub struct SceneReady;

/// Systems that drive [`ModelLoad`]
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelSystems;

pub struct ModelPlugin;

impl Plugin for ModelPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ModelLoad>().add_systems(
            Update,
            (start_model_load, poll_model_load, detect_scene_ready)
                .chain()
                .in_set(ModelSystems),
        );
    }
}

/// Kick off a load whenever the status is idle
fn start_model_load(
    mut commands: Commands,
    source: Option<Res<ModelSource>>,
    mut model: ResMut<ModelLoad>,
    asset_server: Res<AssetServer>,
) {
    if model.status != ModelStatus::Idle {
        return;
    }
    let Some(source) = source else {
        return;
    };

    if let Some(root) = model.root.take() {
        commands.entity(root).despawn();
    }

    tracing::info!("Loading model: {}", source.path);
    model.handle = Some(asset_server.load(source.path.clone()));
    model.status = ModelStatus::Loading;
}

/// Spawn the scene once the glTF asset is loaded
fn poll_model_load(
    mut commands: Commands,
    mut model: ResMut<ModelLoad>,
    asset_server: Res<AssetServer>,
    gltf_assets: Res<Assets<Gltf>>,
) {
    if model.status != ModelStatus::Loading {
        return;
    }
    let Some(handle) = model.handle.clone() else {
        return;
    };

    match asset_server.get_load_state(handle.id()) {
        Some(LoadState::Loaded) => {
            let Some(gltf) = gltf_assets.get(&handle) else {
                return;
            };
            let scene = gltf
                .default_scene
                .clone()
                .or_else(|| gltf.scenes.first().cloned());
            let Some(scene) = scene else {
                tracing::error!("Model has no scenes");
                model.status = ModelStatus::Failed("model has no scenes".to_string());
                return;
            };

            let root = commands
                .spawn((SceneRoot(scene), Transform::default(), ServiceModel))
                .id();
            model.root = Some(root);
            model.status = ModelStatus::Spawned;
        }
        Some(LoadState::Failed(err)) => {
            tracing::error!("Failed to load model: {}", err);
            model.status = ModelStatus::Failed(err.to_string());
        }
        _ => {}
    }
}

fn detect_scene_ready(
    mut commands: Commands,
    mut model: ResMut<ModelLoad>,
    scene_spawner: Res<SceneSpawner>,
    roots: Query<(Entity, &SceneInstance), (With<ServiceModel>, Without<SceneReady>)>,
) {
    if model.status != ModelStatus::Spawned {
        return;
    }

    for (entity, instance) in roots.iter() {
        if Some(entity) != model.root || !scene_spawner.instance_is_ready(**instance) {
            continue;
        }
        commands.entity(entity).insert(SceneReady);
        model.status = ModelStatus::Ready;
        tracing::info!("Model scene spawned");
    }
}
