//! Service registry - construction trades mapped to mesh-name keywords
//!
//! Each service names a trade or sub-assembly of the building model (walls,
//! electrical, plumbing...) together with the keyword fragments used to
//! recognise its meshes, a highlight tint and a texture profile.
//!
//! Matching is an unanchored, case-insensitive substring search in registry
//! order, so the first registered service with a matching keyword claims a
//! node. Keywords therefore need to be as specific as possible
//! ("PisoTerreo" rather than "Piso"); [`find_keyword_overlaps`] reports the
//! cases where one keyword is contained in another service's keyword.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::color::Rgb;

/// Name of the profile used for services without a resolvable texture
pub const DEFAULT_PROFILE: &str = "Default";

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to read service registry: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse service registry: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Duplicate service name: {0}")]
    DuplicateService(String),
    #[error("Duplicate texture profile: {0}")]
    DuplicateProfile(String),
    #[error("Registry has no \"{DEFAULT_PROFILE}\" texture profile")]
    MissingDefaultProfile,
}

/// Material parameters applied to the meshes of a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureProfile {
    pub name: String,
    pub color: Rgb,
    #[serde(default = "default_roughness")]
    pub roughness: f32,
    #[serde(default)]
    pub metalness: f32,
    #[serde(default)]
    pub emissive: Option<Rgb>,
    #[serde(default = "default_emissive_intensity")]
    pub emissive_intensity: f32,
}

fn default_roughness() -> f32 {
    0.8
}

fn default_emissive_intensity() -> f32 {
    1.0
}

impl TextureProfile {
    pub fn new(name: &str, color: Rgb, roughness: f32, metalness: f32) -> Self {
        Self {
            name: name.to_string(),
            color,
            roughness,
            metalness,
            emissive: None,
            emissive_intensity: default_emissive_intensity(),
        }
    }

    pub fn with_emissive(mut self, emissive: Rgb, intensity: f32) -> Self {
        self.emissive = Some(emissive);
        self.emissive_intensity = intensity;
        self
    }
}

/// A construction service and the keywords that identify its meshes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    /// Display name, unique across the registry (e.g., "Paredes Terreo")
    #[serde(rename = "name")]
    pub service_name: String,
    /// Highlight tint
    pub color: Rgb,
    /// Case-insensitive substrings matched against node names
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Key into the texture profile table
    #[serde(rename = "texture", default = "default_texture")]
    pub texture_type: String,
    /// Whether materialization overrides the authored material of matched meshes
    #[serde(default)]
    pub overrides_material: bool,
}

fn default_texture() -> String {
    DEFAULT_PROFILE.to_string()
}

impl ServiceDefinition {
    pub fn new(name: &str, color: Rgb, keywords: &[&str], texture_type: &str) -> Self {
        Self {
            service_name: name.to_string(),
            color,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            texture_type: texture_type.to_string(),
            overrides_material: false,
        }
    }

    pub fn overriding_material(mut self) -> Self {
        self.overrides_material = true;
        self
    }

    /// First keyword contained in an already-lowercased node name
    pub fn matching_keyword(&self, lowered_name: &str) -> Option<&str> {
        self.keywords
            .iter()
            .filter(|k| !k.is_empty())
            .find(|k| lowered_name.contains(&k.to_lowercase()))
            .map(|k| k.as_str())
    }
}

/// One service's keyword is contained in another service's keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordOverlap {
    /// Service owning the shorter (contained) keyword
    pub service: String,
    pub keyword: String,
    /// Service owning the longer keyword
    pub other_service: String,
    pub other_keyword: String,
    /// The shorter keyword's service is registered first, so it claims
    /// every node the longer keyword was meant for
    pub shadows: bool,
}

/// On-disk registry layout (`[[profile]]` and `[[service]]` tables)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryFile {
    #[serde(default)]
    pub profile: Vec<TextureProfile>,
    #[serde(default)]
    pub service: Vec<ServiceDefinition>,
}

/// Ordered, validated set of services and texture profiles
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    services: Vec<ServiceDefinition>,
    profiles: HashMap<String, TextureProfile>,
    default_profile: TextureProfile,
    overlaps: Vec<KeywordOverlap>,
}

impl ServiceRegistry {
    /// Build a registry, validating names and profiles
    ///
    /// Duplicate service names and a missing "Default" profile are errors.
    /// Unknown texture types and keyword overlaps are only logged.
    pub fn new(
        services: Vec<ServiceDefinition>,
        profiles: Vec<TextureProfile>,
    ) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for service in &services {
            if !seen.insert(service.service_name.as_str()) {
                return Err(RegistryError::DuplicateService(service.service_name.clone()));
            }
        }

        let mut profile_map = HashMap::new();
        for profile in profiles {
            if profile_map.contains_key(&profile.name) {
                return Err(RegistryError::DuplicateProfile(profile.name));
            }
            profile_map.insert(profile.name.clone(), profile);
        }

        let default_profile = profile_map
            .get(DEFAULT_PROFILE)
            .cloned()
            .ok_or(RegistryError::MissingDefaultProfile)?;

        for service in &services {
            if !profile_map.contains_key(&service.texture_type) {
                warn!(
                    service = %service.service_name,
                    texture = %service.texture_type,
                    "Unknown texture type, falling back to Default"
                );
            }
        }

        let overlaps = find_keyword_overlaps(&services);
        for overlap in &overlaps {
            warn!(
                service = %overlap.service,
                keyword = %overlap.keyword,
                other_service = %overlap.other_service,
                other_keyword = %overlap.other_keyword,
                shadows = overlap.shadows,
                "Keyword is contained in another service's keyword"
            );
        }

        Ok(Self {
            services,
            profiles: profile_map,
            default_profile,
            overlaps,
        })
    }

    /// Load a registry from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = toml::from_str(content)?;
        Self::new(file.service, file.profile)
    }

    /// Load a registry from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Serialize back to the on-disk layout
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        let mut profile: Vec<TextureProfile> = self.profiles.values().cloned().collect();
        profile.sort_by(|a, b| a.name.cmp(&b.name));
        let file = RegistryFile {
            profile,
            service: self.services.clone(),
        };
        toml::to_string_pretty(&file)
    }

    /// Services in registration order
    pub fn services(&self) -> &[ServiceDefinition] {
        &self.services
    }

    pub fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.service_name.clone()).collect()
    }

    /// Look up a service by exact name
    pub fn service(&self, name: &str) -> Option<&ServiceDefinition> {
        self.services.iter().find(|s| s.service_name == name)
    }

    /// Look up a service by name, ignoring case and surrounding whitespace
    pub fn find_service_ignore_case(&self, name: &str) -> Option<&ServiceDefinition> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let lowered = name.to_lowercase();
        self.services
            .iter()
            .find(|s| s.service_name.to_lowercase() == lowered)
    }

    /// Texture profile for a texture type, or the Default profile
    pub fn profile(&self, texture_type: &str) -> &TextureProfile {
        self.profiles
            .get(texture_type)
            .unwrap_or(&self.default_profile)
    }

    pub fn profile_for(&self, service: &ServiceDefinition) -> &TextureProfile {
        self.profile(&service.texture_type)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &TextureProfile> {
        self.profiles.values()
    }

    /// Index of the first service with a keyword contained in `node_name`
    pub fn classify_index(&self, node_name: &str) -> Option<usize> {
        if node_name.is_empty() {
            return None;
        }
        let lowered = node_name.to_lowercase();
        self.services
            .iter()
            .position(|s| s.matching_keyword(&lowered).is_some())
    }

    /// Service claiming a node name, first registered match wins
    pub fn classify(&self, node_name: &str) -> Option<&ServiceDefinition> {
        self.classify_index(node_name).map(|i| &self.services[i])
    }

    /// Keyword overlaps found when the registry was built
    pub fn keyword_overlaps(&self) -> &[KeywordOverlap] {
        &self.overlaps
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Find keywords that are substrings of another service's keyword
pub fn find_keyword_overlaps(services: &[ServiceDefinition]) -> Vec<KeywordOverlap> {
    let mut overlaps = Vec::new();

    for (i, service) in services.iter().enumerate() {
        for (j, other) in services.iter().enumerate() {
            if i == j {
                continue;
            }
            for keyword in service.keywords.iter().filter(|k| !k.is_empty()) {
                let lowered = keyword.to_lowercase();
                for other_keyword in other.keywords.iter().filter(|k| !k.is_empty()) {
                    let other_lowered = other_keyword.to_lowercase();
                    // Identical keywords are reported once, from the earlier service
                    if lowered == other_lowered && i > j {
                        continue;
                    }
                    if other_lowered.contains(&lowered) {
                        overlaps.push(KeywordOverlap {
                            service: service.service_name.clone(),
                            keyword: keyword.clone(),
                            other_service: other.service_name.clone(),
                            other_keyword: other_keyword.clone(),
                            shadows: i < j,
                        });
                    }
                }
            }
        }
    }

    overlaps
}
