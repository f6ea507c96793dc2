//! Obra Scene - Bevy integration for the service viewer
//!
//! This crate connects the renderer-independent state in `obra-core` to a
//! Bevy app: it loads the building model and the service spreadsheet as
//! assets, indexes the spawned glTF hierarchy, and applies material
//! overrides, highlights and visibility through an entity-backed
//! `MeshScene`.

pub mod bridge;
pub mod model;
pub mod services;
pub mod spreadsheet;

use bevy::prelude::*;
use obra_core::{ServiceRegistry, HIGHLIGHT_OPACITY};

/// Plugin that sets up model loading, the spreadsheet asset and services
pub struct ObraScenePlugin {
    registry: ServiceRegistry,
    highlight_opacity: f32,
}

impl ObraScenePlugin {
    pub fn new(registry: ServiceRegistry) -> Self {
        Self {
            registry,
            highlight_opacity: HIGHLIGHT_OPACITY,
        }
    }

    pub fn with_highlight_opacity(mut self, opacity: f32) -> Self {
        self.highlight_opacity = opacity;
        self
    }
}

impl Plugin for ObraScenePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(services::ServiceSession::new(
            self.registry.clone(),
            self.highlight_opacity,
        ))
        .add_plugins(model::ModelPlugin)
        .add_plugins(spreadsheet::SpreadsheetPlugin)
        .add_plugins(services::ServicesPlugin);
    }
}

// Re-export commonly used types
pub use bridge::{EntityScene, SceneIndex};
pub use model::{ModelLoad, ModelSource, ModelStatus, SceneReady, ServiceModel};
pub use services::{PendingServiceActions, ServiceAction, ServiceSession};
pub use spreadsheet::{ServiceTable, SpreadsheetAsset, SpreadsheetSource, TableStatus};
