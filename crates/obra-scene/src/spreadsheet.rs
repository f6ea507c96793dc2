//! Service spreadsheet as a Bevy asset

use bevy::asset::io::Reader;
use bevy::asset::{AssetLoader, LoadContext, LoadState};
use bevy::prelude::*;
use thiserror::Error;

use obra_core::{Spreadsheet, SpreadsheetError};

/// Parsed spreadsheet
#[derive(Asset, TypePath, Debug, Clone)]
pub struct SpreadsheetAsset(pub Spreadsheet);

#[derive(Debug, Error)]
pub enum SpreadsheetLoaderError {
    #[error("Could not read spreadsheet: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] SpreadsheetError),
}

#[derive(Default)]
pub struct SpreadsheetLoader;

impl AssetLoader for SpreadsheetLoader {
    type Asset = SpreadsheetAsset;
    type Settings = ();
    type Error = SpreadsheetLoaderError;

    async fn load(
        &self,
        reader: &mut dyn Reader,
        _settings: &(),
        _load_context: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        Ok(SpreadsheetAsset(Spreadsheet::from_bytes(bytes)?))
    }

    fn extensions(&self) -> &[&str] {
        &["csv"]
    }
}

/// Path of the spreadsheet, relative to the asset root
#[derive(Debug, Clone, Resource)]
pub struct SpreadsheetSource {
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TableStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// Load progress and handle of the spreadsheet
#[derive(Resource, Default)]
pub struct ServiceTable {
    pub handle: Option<Handle<SpreadsheetAsset>>,
    pub status: TableStatus,
}

impl ServiceTable {
    pub fn request_reload(&mut self) {
        self.status = TableStatus::Idle;
    }

    /// Rows, once loaded
    pub fn spreadsheet<'a>(&self, assets: &'a Assets<SpreadsheetAsset>) -> Option<&'a Spreadsheet> {
        if self.status != TableStatus::Loaded {
            return None;
        }
        self.handle
            .as_ref()
            .and_then(|h| assets.get(h))
            .map(|asset| &asset.0)
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            TableStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

pub struct SpreadsheetPlugin;

impl Plugin for SpreadsheetPlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<SpreadsheetAsset>()
            .init_asset_loader::<SpreadsheetLoader>()
            .init_resource::<ServiceTable>()
            .add_systems(Update, (start_table_load, poll_table_load).chain());
    }
}

fn start_table_load(
    source: Option<Res<SpreadsheetSource>>,
    mut table: ResMut<ServiceTable>,
    asset_server: Res<AssetServer>,
) {
    if table.status != TableStatus::Idle {
        return;
    }
    let Some(source) = source else {
        return;
    };

    // Requesting a failed path again restarts its load
    tracing::info!("Loading spreadsheet: {}", source.path);
    table.handle = Some(asset_server.load(source.path.clone()));
    table.status = TableStatus::Loading;
}

fn poll_table_load(mut table: ResMut<ServiceTable>, asset_server: Res<AssetServer>) {
    if table.status != TableStatus::Loading {
        return;
    }
    let Some(handle) = table.handle.as_ref() else {
        return;
    };

    match asset_server.get_load_state(handle.id()) {
        Some(LoadState::Loaded) => {
            tracing::info!("Spreadsheet loaded");
            table.status = TableStatus::Loaded;
        }
        Some(LoadState::Failed(err)) => {
            tracing::error!("Failed to load spreadsheet: {}", err);
            table.status = TableStatus::Failed(err.to_string());
        }
        _ => {}
    }
}
