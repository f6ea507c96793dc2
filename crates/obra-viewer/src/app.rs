//! Bevy application setup

use bevy::prelude::*;
use bevy::winit::WinitSettings;
use bevy_egui::EguiPlugin;
use bevy_picking::{prelude::MeshPickingPlugin, DefaultPickingPlugins};

use obra_core::ServiceRegistry;
use obra_scene::{ModelSource, ObraScenePlugin, SpreadsheetSource};

use crate::camera::CameraPlugin;
use crate::config::Config;
use crate::ui::{ElementTint, UiPlugin};

/// Open the viewer window and block until it is closed
pub fn run(config: Config, registry: ServiceRegistry) {
    tracing::info!(
        "Viewer assets: {} (model {}, spreadsheet {})",
        config.viewer.assets,
        config.viewer.model,
        config.viewer.spreadsheet
    );

    App::new()
        .insert_resource(ClearColor(Color::srgb(0.12, 0.13, 0.16)))
        // Redraw on input only; the model is static between actions
        .insert_resource(WinitSettings::desktop_app())
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: config.viewer.title.clone(),
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    file_path: config.viewer.assets.clone(),
                    meta_check: bevy::asset::AssetMetaCheck::Never,
                    ..default()
                }),
        )
        // Picking must be registered before EguiPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(MeshPickingPlugin)
        .add_plugins(EguiPlugin::default())
        .add_plugins(
            ObraScenePlugin::new(registry).with_highlight_opacity(config.highlight.opacity),
        )
        .insert_resource(ModelSource {
            path: config.viewer.model.clone(),
        })
        .insert_resource(SpreadsheetSource {
            path: config.viewer.spreadsheet.clone(),
        })
        .insert_resource(ElementTint(config.highlight.default_tint))
        .add_plugins(CameraPlugin)
        .add_plugins(UiPlugin)
        .run();
}
