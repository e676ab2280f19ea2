use flowmap_graph::{Extent, Margins, SankeyLayouter, SceneStyle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse settings {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowmapSettings {
    #[serde(default = "default_canvas_width")]
    pub canvas_width: f64,
    #[serde(default = "default_canvas_height")]
    pub canvas_height: f64,
    pub margins: Margins,
    pub layout: SankeyLayouter,
    pub scene: SceneStyle,
}

fn default_canvas_width() -> f64 {
    960.0
}
fn default_canvas_height() -> f64 {
    800.0
}

impl Default for FlowmapSettings {
    fn default() -> Self {
        Self {
            canvas_width: default_canvas_width(),
            canvas_height: default_canvas_height(),
            margins: Margins::default(),
            layout: SankeyLayouter::default(),
            scene: SceneStyle::default(),
        }
    }
}

impl FlowmapSettings {
    /// Drawing area inside the margins of the canvas.
    pub fn extent(&self) -> Extent {
        Extent::with_margins(self.canvas_width, self.canvas_height, self.margins)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("Settings loaded from {:?}", path);
        Ok(settings)
    }

    /// Like [`FlowmapSettings::load`], falling back to defaults when the
    /// file is missing or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("Settings file not found, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!("{e}");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, content).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowmap_graph::NodeAlignment;

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings: FlowmapSettings =
            serde_json::from_str(r#"{ "canvas_width": 640, "layout": { "alignment": "center" } }"#)
                .unwrap();
        assert_eq!(settings.canvas_width, 640.0);
        assert_eq!(settings.canvas_height, 800.0);
        assert_eq!(settings.layout.alignment, NodeAlignment::Center);
        assert_eq!(settings.layout.node_width, 15.0);
        assert_eq!(settings.scene.value_unit, "TWh");
        assert_eq!(settings.extent(), Extent::new(1.0, 5.0, 639.0, 795.0));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = FlowmapSettings::default();
        settings.scene.dimmed_opacity = 0.25;
        settings.save(&path).unwrap();

        assert_eq!(FlowmapSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            FlowmapSettings::load(&missing),
            Err(SettingsError::Io { .. })
        ));
        assert_eq!(FlowmapSettings::load_or_default(&missing), FlowmapSettings::default());

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            FlowmapSettings::load(&broken),
            Err(SettingsError::Parse { .. })
        ));
    }
}
