//! GLB binary container, split into its JSON and BIN chunks by `gltf`

use gltf::binary::{Glb, Header};
use std::path::Path;
use thiserror::Error;

use crate::document::GltfDocument;

#[derive(Error, Debug)]
pub enum GlbError {
    #[error("Failed to read GLB file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid GLB container: {0}")]
    Container(#[from] gltf::Error),
    #[error("Header declares {declared} bytes but file has {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("Invalid JSON chunk: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// A parsed GLB container with owned chunk data
#[derive(Debug, Clone)]
pub struct GlbFile {
    pub header: Header,
    pub json: Vec<u8>,
    pub bin: Option<Vec<u8>>,
}

impl GlbFile {
    pub fn parse(bytes: &[u8]) -> Result<Self, GlbError> {
        let glb = Glb::from_slice(bytes)?;
        if glb.header.length as usize != bytes.len() {
            return Err(GlbError::LengthMismatch {
                declared: glb.header.length as usize,
                actual: bytes.len(),
            });
        }

        tracing::debug!(
            json = glb.json.len(),
            bin = glb.bin.as_ref().map(|b| b.len()),
            "GLB chunks"
        );
        Ok(Self {
            header: glb.header,
            json: glb.json.into_owned(),
            bin: glb.bin.map(|b| b.into_owned()),
        })
    }

    pub fn read(path: &Path) -> Result<Self, GlbError> {
        let bytes = std::fs::read(path)?;
        Self::parse(&bytes)
    }

    /// Chunk names and data lengths, file order
    pub fn chunks(&self) -> Vec<(&'static str, usize)> {
        let mut chunks = vec![("JSON", self.json.len())];
        if let Some(bin) = &self.bin {
            chunks.push(("BIN", bin.len()));
        }
        chunks
    }

    pub fn json_value(&self) -> Result<serde_json::Value, GlbError> {
        Ok(serde_json::from_slice(&self.json)?)
    }

    pub fn document(&self) -> Result<GltfDocument, GlbError> {
        Ok(GltfDocument::from_slice(&self.json)?)
    }
}
