//! Configuration loading and validation

use anyhow::{Context, Result};
use obra_core::{builtin_registry, Rgb, ServiceRegistry, HIGHLIGHT_OPACITY};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Directory assets are resolved against
    #[serde(default = "default_assets")]
    pub assets: String,
    /// GLB model, relative to `assets`
    #[serde(default = "default_model")]
    pub model: String,
    /// Service spreadsheet, relative to `assets`
    #[serde(default = "default_spreadsheet")]
    pub spreadsheet: String,
    /// Window title
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            assets: default_assets(),
            model: default_model(),
            spreadsheet: default_spreadsheet(),
            title: default_title(),
        }
    }
}

fn default_assets() -> String {
    "assets".to_string()
}

fn default_model() -> String {
    "models/residencial.glb".to_string()
}

fn default_spreadsheet() -> String {
    "data/servicos.csv".to_string()
}

fn default_title() -> String {
    "Obra - Service Viewer".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightConfig {
    /// Opacity of highlight materials (0.0 - 1.0)
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// Tint for free-text element searches
    #[serde(default = "default_tint")]
    pub default_tint: Rgb,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            opacity: default_opacity(),
            default_tint: default_tint(),
        }
    }
}

fn default_opacity() -> f32 {
    HIGHLIGHT_OPACITY
}

fn default_tint() -> Rgb {
    Rgb::from_rgb8(0x00, 0xe5, 0xff)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Service registry TOML; the compiled-in registry is used when unset
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

impl Config {
    /// Clamp out-of-range values, returning one message per fix
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !(0.0..=1.0).contains(&self.highlight.opacity) {
            let clamped = self.highlight.opacity.clamp(0.0, 1.0);
            warnings.push(format!(
                "Highlight opacity {} out of range, clamping to {}",
                self.highlight.opacity, clamped
            ));
            self.highlight.opacity = clamped;
        }
        warnings
    }

    /// Registry from `[registry] path`, or the compiled-in one
    pub fn load_registry(&self) -> Result<ServiceRegistry> {
        match &self.registry.path {
            Some(path) => {
                let registry = ServiceRegistry::from_file(Path::new(path))
                    .with_context(|| format!("Failed to load service registry {}", path))?;
                info!(path = %path, services = registry.len(), "Loaded service registry");
                Ok(registry)
            }
            None => Ok(builtin_registry()?),
        }
    }
}

/// Outcome of [`load_config`], logged once the subscriber is installed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadNotes {
    pub found: bool,
    pub warnings: Vec<String>,
}

impl LoadNotes {
    pub fn log(&self, path: &Path) {
        if self.found {
            info!(path = %path.display(), "Loaded configuration");
        } else {
            info!(
                path = %path.display(),
                "Configuration file not found, using defaults"
            );
        }
        for warning in &self.warnings {
            warn!("{}", warning);
        }
    }
}

/// Load configuration from file
///
/// Nothing is logged here; the logging level itself comes from the result.
pub fn load_config(path: &Path) -> Result<(Config, LoadNotes)> {
    let found = path.exists();
    let mut config = if found {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)?
    } else {
        Config::default()
    };
    let warnings = config.validate();
    Ok((config, LoadNotes { found, warnings }))
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_uses_defaults() {
        let (config, notes) = load_config(Path::new("/nonexistent/obra.toml")).unwrap();
        assert_eq!(notes, LoadNotes::default());
        assert_eq!(config.viewer.model, "models/residencial.glb");
        assert_eq!(config.viewer.spreadsheet, "data/servicos.csv");
        assert_eq!(config.highlight.opacity, HIGHLIGHT_OPACITY);
        assert!(config.registry.path.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br##"
[viewer]
model = "models/clinica.glb"

[highlight]
opacity = 1.5
default_tint = "#ff0000"
"##,
        )
        .unwrap();

        let (config, notes) = load_config(file.path()).unwrap();
        assert_eq!(config.viewer.model, "models/clinica.glb");
        assert_eq!(config.viewer.assets, "assets");
        assert_eq!(config.highlight.opacity, 1.0);
        assert!(notes.found);
        assert_eq!(notes.warnings.len(), 1);
        assert!(notes.warnings[0].contains("1.5"));
        assert_eq!(config.highlight.default_tint, Rgb::from_rgb8(255, 0, 0));
    }

    #[test]
    fn test_validate_clamps_negative_opacity() {
        let mut config = Config::default();
        assert!(config.validate().is_empty());

        config.highlight.opacity = -0.2;
        let warnings = config.validate();
        assert_eq!(config.highlight.opacity, 0.0);
        assert_eq!(warnings.len(), 1);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_save_default_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obra.toml");
        save_default_config(&path).unwrap();

        let (config, notes) = load_config(&path).unwrap();
        assert!(notes.found && notes.warnings.is_empty());
        assert_eq!(config.viewer.title, default_title());
        assert_eq!(config.highlight.default_tint, default_tint());
    }

    #[test]
    fn test_registry_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br##"
[[profile]]
name = "Default"
color = "#cccccc"

[[service]]
name = "Eletrica"
color = "#ffd700"
keywords = ["Tomada"]
"##,
        )
        .unwrap();

        let config = Config {
            registry: RegistryConfig {
                path: Some(file.path().display().to_string()),
            },
            ..Default::default()
        };
        let registry = config.load_registry().unwrap();
        assert_eq!(registry.service_names(), vec!["Eletrica".to_string()]);

        let builtin = Config::default().load_registry().unwrap();
        assert_eq!(builtin.len(), 15);
    }

    #[test]
    fn test_invalid_registry_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[[service]]\nname = \"Gas\"\ncolor = \"#ffb300\"\n").unwrap();

        let config = Config {
            registry: RegistryConfig {
                path: Some(file.path().display().to_string()),
            },
            ..Default::default()
        };
        // No Default profile
        assert!(config.load_registry().is_err());
    }
}
