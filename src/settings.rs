//! Viewer preferences, read from and written to a TOML file.
//!
//! ```no_run
//! use minder_view::settings::ViewerSettings;
//!
//! let settings = ViewerSettings::load_from_path("viewer.toml").unwrap_or_default();
//! assert!(settings.overlay_opacity <= 1.0);
//! ```

use crate::enums::InteractionMode;
use crate::overlay::DEFAULT_HIGHLIGHT_COLOR;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// Draw selected objects in `highlight_color` instead of their own color.
    pub highlight_selected: bool,
    pub highlight_color: [u8; 4],
    /// Overlay blend factor in `[0, 1]`.
    pub overlay_opacity: f32,
    /// Lower and upper quantiles of the automatic intensity window.
    pub window_quantiles: (f64, f64),
    pub default_mode: InteractionMode,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            highlight_selected: true,
            highlight_color: DEFAULT_HIGHLIGHT_COLOR,
            overlay_opacity: 0.5,
            window_quantiles: (0.05, 0.99),
            default_mode: InteractionMode::Point,
        }
    }
}

impl ViewerSettings {
    pub fn from_toml_str(contents: &str) -> Result<Self, SettingsError> {
        let mut settings: ViewerSettings = toml::from_str(contents)?;
        settings.overlay_opacity = settings.overlay_opacity.clamp(0.0, 1.0);
        Ok(settings)
    }

    pub fn to_toml_string(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string(self)?)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path.as_ref(), self.to_toml_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_keys_use_defaults() {
        let settings = ViewerSettings::from_toml_str("overlay_opacity = 0.25\n")
            .expect("valid settings");
        assert_eq!(settings.overlay_opacity, 0.25);
        assert!(settings.highlight_selected);
        assert_eq!(settings.highlight_color, [0, 255, 0, 255]);
        assert_eq!(settings.window_quantiles, (0.05, 0.99));
    }

    #[test]
    fn round_trips_through_toml() {
        let settings = ViewerSettings {
            highlight_selected: false,
            default_mode: InteractionMode::WindowLevel,
            ..ViewerSettings::default()
        };
        let text = settings.to_toml_string().expect("serializes");
        assert!(text.contains("default_mode = \"window_level\""));
        assert_eq!(ViewerSettings::from_toml_str(&text).expect("parses"), settings);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().expect("temp dir");
        assert!(matches!(
            ViewerSettings::load_from_path(dir.path().join("absent.toml")),
            Err(SettingsError::Io(_))
        ));
    }

    #[test]
    fn opacity_is_clamped_and_bad_files_error() {
        let settings = ViewerSettings::from_toml_str("overlay_opacity = 3.0").expect("valid");
        assert_eq!(settings.overlay_opacity, 1.0);
        assert!(matches!(
            ViewerSettings::from_toml_str("overlay_opacity = \"high\""),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn saves_and_loads_from_disk() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("viewer.toml");
        let settings = ViewerSettings {
            overlay_opacity: 0.75,
            ..ViewerSettings::default()
        };
        settings.save_to_path(&path).expect("saved");
        assert_eq!(ViewerSettings::load_from_path(&path).expect("loaded"), settings);
    }
}
