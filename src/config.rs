use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::catalog::{MAX_YEAR, MIN_YEAR, YearRange};
use crate::scene::SceneSettings;

/// Application configuration loaded from TOML config file.
/// All fields have defaults, so the config file is optional.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Catalog JSON file (overrides the data-dir default).
    pub catalog_path: Option<PathBuf>,
    /// Year range applied when the CLI gives none.
    pub years: YearsConfig,
    /// Interaction tunables.
    pub scene: SceneConfig,
    /// Number of threads for catalog validation. 0 = auto-detect.
    pub workers: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct YearsConfig {
    pub from: i32,
    pub to: i32,
}

impl Default for YearsConfig {
    fn default() -> Self {
        Self {
            from: MIN_YEAR,
            to: MAX_YEAR,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Hit-test tolerance in world units.
    pub hit_radius: f32,
    /// Click pause length in milliseconds.
    pub pause_ms: u64,
    /// Rotation per frame in radians.
    pub rotation_step: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        let defaults = SceneSettings::default();
        Self {
            hit_radius: defaults.hit_radius,
            pause_ms: u64::try_from(defaults.pause.as_millis()).unwrap_or(u64::MAX),
            rotation_step: defaults.rotation_step,
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/song-galaxy/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match Self::parse(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn year_range(&self) -> YearRange {
        YearRange::new(self.years.from, self.years.to)
    }

    pub fn scene_settings(&self) -> SceneSettings {
        SceneSettings {
            hit_radius: self.scene.hit_radius,
            pause: Duration::from_millis(self.scene.pause_ms),
            rotation_step: self.scene.rotation_step,
            ..SceneSettings::default()
        }
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Resolve the default catalog path in the XDG data directory.
pub fn default_catalog_path() -> PathBuf {
    ProjectDirs::from("", "", crate::APP_NAME)
        .map(|dirs| dirs.data_dir().join(crate::CATALOG_FILE))
        // Fallback: current directory
        .unwrap_or_else(|| PathBuf::from(crate::CATALOG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert!(config.catalog_path.is_none());
        assert_eq!(config.year_range(), YearRange::default());
        assert_eq!(config.workers, 0);
        assert_eq!(config.scene_settings(), SceneSettings::default());
    }

    #[test]
    fn test_partial_config() {
        let config = AppConfig::parse(
            r#"
            catalog_path = "/srv/galaxy/galaxy_data.json"
            workers = 4

            [years]
            from = 1960

            [scene]
            pause_ms = 1500
            "#,
        )
        .unwrap();
        assert_eq!(
            config.catalog_path.as_deref(),
            Some(std::path::Path::new("/srv/galaxy/galaxy_data.json"))
        );
        assert_eq!(config.year_range(), YearRange::new(1960, MAX_YEAR));

        let settings = config.scene_settings();
        assert_eq!(settings.pause, Duration::from_millis(1500));
        assert_eq!(settings.hit_radius, crate::hit_test::HIT_RADIUS);
    }

    #[test]
    fn test_bad_config_is_an_error() {
        assert!(AppConfig::parse("workers = \"many\"").is_err());
    }
}
