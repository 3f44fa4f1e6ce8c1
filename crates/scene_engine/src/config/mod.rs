//! Configuration system
//!
//! Every config struct derives serde with `#[serde(default)]`, so partial
//! files are fine: missing keys fall back to the built-in defaults. Files are
//! TOML or RON, chosen by extension.

pub use serde::{Serialize, Deserialize};

use std::path::Path;

mod settings;
mod world;

pub use settings::{EngineSettings, Quality};
pub use world::{
    EyeConfig, ForestConfig, LandscapeConfig, PlayerConfig, PowerUpConfig, PowerUpKind, SkyConfig,
    SplatterConfig, WorldConfig,
};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from a `.toml` or `.ron` file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match Format::of(path)? {
            Format::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Format::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Load configuration, falling back to defaults when the file is missing
    fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from_file(path)
        } else {
            log::info!("{} not found, using default configuration", path.display());
            Ok(Self::default())
        }
    }

    /// Save configuration to a `.toml` or `.ron` file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match Format::of(path)? {
            Format::Toml => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?,
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents)?;
        Ok(())
    }
}

enum Format {
    Toml,
    Ron,
}

impl Format {
    fn of(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("scene_engine_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_world_config_toml_round_trip() {
        let path = temp_path("world.toml");
        let mut config = WorldConfig::default();
        config.level_duration = 42.0;
        config.landscape.smoothing_passes = 3;

        config.save_to_file(&path).expect("save toml");
        let loaded = WorldConfig::load_from_file(&path).expect("load toml");
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_engine_settings_ron_round_trip() {
        let path = temp_path("settings.ron");
        let settings = EngineSettings {
            max_quality: Quality::Medium,
            debug_bounding_spheres: true,
            ..EngineSettings::default()
        };

        settings.save_to_file(&path).expect("save ron");
        let loaded = EngineSettings::load_from_file(&path).expect("load ron");
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let path = temp_path("partial.toml");
        std::fs::write(&path, "max_quality = \"Low\"\n").expect("write");
        let loaded = EngineSettings::load_from_file(&path).expect("load");
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.max_quality, Quality::Low);
        assert!(!loaded.debug_bounding_spheres);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = EngineSettings::default().save_to_file(temp_path("settings.ini"));
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let loaded = WorldConfig::load_or_default(temp_path("does_not_exist.toml")).expect("default");
        assert_eq!(loaded, WorldConfig::default());
    }
}
