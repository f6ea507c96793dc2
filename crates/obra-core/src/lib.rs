//! Obra Core - Service registry, classification and scene highlighting
//!
//! This crate provides the renderer-independent logic of the Obra viewer:
//! - Service registry mapping construction trades to mesh-name keywords
//! - Cached classification of scene node names
//! - Material overrides, selection highlighting and per-service visibility
//!   over any scene implementing [`MeshScene`]
//! - Parsing of the semicolon-delimited service spreadsheet

pub mod builtin;
pub mod classifier;
pub mod color;
pub mod error;
pub mod highlight;
pub mod materialize;
pub mod registry;
pub mod scene;
pub mod spreadsheet;
pub mod viewer;
pub mod visibility;

pub use builtin::{builtin_profiles, builtin_registry, builtin_services};
pub use classifier::Classifier;
pub use color::{ColorError, Rgb};
pub use error::ViewerError;
pub use highlight::{HighlightState, MaterialCapture, HIGHLIGHT_OPACITY};
pub use materialize::{MaterializeReport, Materializer};
pub use registry::{
    find_keyword_overlaps, KeywordOverlap, RegistryError, ServiceDefinition, ServiceRegistry,
    TextureProfile, DEFAULT_PROFILE,
};
pub use scene::{
    Material, MaterialError, MaterialId, MaterialKind, MaterialRef, MeshScene, NodeId, SceneGraph,
};
pub use spreadsheet::{Spreadsheet, SpreadsheetError, SpreadsheetRow};
pub use viewer::{LoadState, ServiceViewer};
pub use visibility::{apply_hidden_set, VisibilityReport, VisibilityState};
