//! Application and asset-directory configuration.
//!
//! Built in code with the [`AppConfig`] builder, or read from a TOML file:
//!
//! ```toml
//! title = "Stagehand"
//! width = 1280
//! height = 720
//! initial_scene = 1
//! stall_warning_secs = 10.0
//!
//! [assets]
//! models = "data/models"
//! textures = "data/images/textures"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::scene::SceneId;

/// Directories relative asset paths are resolved against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    pub data: PathBuf,
    pub models: PathBuf,
    pub textures: PathBuf,
    pub shaders: PathBuf,
    pub fonts: PathBuf,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self::with_root("data")
    }
}

impl AssetPaths {
    /// The standard layout below one data directory.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            data: root.to_path_buf(),
            models: root.join("models"),
            textures: root.join("images").join("textures"),
            shaders: root.join("shaders"),
            fonts: root.join("images").join("fonts"),
        }
    }

    pub fn model(&self, path: impl AsRef<Path>) -> PathBuf {
        resolve(&self.models, path.as_ref())
    }

    pub fn texture(&self, path: impl AsRef<Path>) -> PathBuf {
        resolve(&self.textures, path.as_ref())
    }

    pub fn shader(&self, path: impl AsRef<Path>) -> PathBuf {
        resolve(&self.shaders, path.as_ref())
    }

    pub fn font(&self, path: impl AsRef<Path>) -> PathBuf {
        resolve(&self.fonts, path.as_ref())
    }

    pub fn data_file(&self, path: impl AsRef<Path>) -> PathBuf {
        resolve(&self.data, path.as_ref())
    }
}

// Absolute paths are taken as given.
fn resolve(dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dir.join(path)
    }
}

/// Configuration for the application window and the scene pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Scene switched to once the window is up. `None` starts empty.
    pub initial_scene: Option<SceneId>,
    pub assets: AssetPaths,
    /// Log a warning when a load phase runs longer than this.
    pub stall_warning_secs: Option<f64>,
    /// Fonts loaded once at startup and kept across scene switches.
    pub core_fonts: Vec<FontSpec>,
}

/// A font file and the pixel size to rasterize it at.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub path: PathBuf,
    pub size: f32,
}

impl FontSpec {
    pub fn new(path: impl Into<PathBuf>, size: f32) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Stagehand".to_string(),
            width: 1280,
            height: 720,
            initial_scene: None,
            assets: AssetPaths::default(),
            stall_warning_secs: None,
            core_fonts: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn initial_scene(mut self, id: impl Into<SceneId>) -> Self {
        self.initial_scene = Some(id.into());
        self
    }

    pub fn asset_root(mut self, root: impl AsRef<Path>) -> Self {
        self.assets = AssetPaths::with_root(root);
        self
    }

    pub fn assets(mut self, assets: AssetPaths) -> Self {
        self.assets = assets;
        self
    }

    pub fn stall_warning(mut self, after: Duration) -> Self {
        self.stall_warning_secs = Some(after.as_secs_f64());
        self
    }

    pub fn core_font(mut self, path: impl Into<PathBuf>, size: f32) -> Self {
        self.core_fonts.push(FontSpec::new(path, size));
        self
    }

    /// Stall warning threshold, if a positive one is set.
    pub fn stall_warning_after(&self) -> Option<Duration> {
        self.stall_warning_secs
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
