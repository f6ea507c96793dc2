use thiserror::Error;

use crate::spreadsheet::SpreadsheetError;

/// Errors surfaced to the viewer UI
#[derive(Error, Debug)]
pub enum ViewerError {
    /// The 3D model could not be fetched or decoded
    #[error("Failed to load model: {0}")]
    AssetLoadFailure(String),
    /// The spreadsheet could not be fetched or parsed
    #[error("Spreadsheet unavailable: {0}")]
    DataUnavailable(#[from] SpreadsheetError),
    #[error("Scene is still loading")]
    SceneNotReady,
    #[error("Unknown service: {0}")]
    UnknownService(String),
}

impl ViewerError {
    /// Whether the UI should offer a reload action
    pub fn is_retryable(&self) -> bool {
        matches!(self, ViewerError::AssetLoadFailure(_) | ViewerError::DataUnavailable(_))
    }
}
