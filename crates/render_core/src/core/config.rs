//! # Unified Configuration System
//!
//! Configuration for the rendering context, the resource manager and the
//! frame loop, grouped under [`ApplicationConfig`].
//!
//! ## Configuration Categories
//!
//! - **Renderer Config**: projection and camera parameters
//! - **Asset Config**: well-known shader paths used by the resource manager
//! - **Engine Config**: logging and resource sweep scheduling

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;

pub use crate::config::{Config, ConfigError};

/// # Renderer Configuration
///
/// Fixed projection parameters consumed by the rendering context. The field
/// of view and clip planes stay constant; only the aspect ratio follows the
/// viewport on `reshape`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Distance to the near clipping plane
    pub near_plane: f32,
    /// Distance to the far clipping plane
    pub far_plane: f32,
    /// World-space up vector used by the look-at transform
    pub camera_up: [f32; 3],
    /// Viewport width before the first reshape
    pub initial_width: u32,
    /// Viewport height before the first reshape
    pub initial_height: u32,
}

impl RendererConfig {
    /// Create a renderer configuration with standard perspective defaults
    pub fn new() -> Self {
        Self {
            fov_degrees: 45.0,
            near_plane: 0.1,
            far_plane: 1000.0,
            camera_up: [0.0, 1.0, 0.0],
            initial_width: 800,
            initial_height: 600,
        }
    }

    /// Set the vertical field of view
    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.fov_degrees = fov_degrees;
        self
    }

    /// Set the clipping planes
    pub fn with_clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near_plane = near;
        self.far_plane = far;
        self
    }

    /// Up vector as a math type
    pub fn up(&self) -> Vec3 {
        Vec3::from(self.camera_up)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fov_degrees > 0.0 && self.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "Field of view must be within (0, 180) degrees, got {}",
                self.fov_degrees
            )));
        }
        if self.near_plane <= 0.0 || self.far_plane <= self.near_plane {
            return Err(ConfigError::Invalid(format!(
                "Clip planes must satisfy 0 < near < far, got near={} far={}",
                self.near_plane, self.far_plane
            )));
        }
        if self.up().norm_squared() == 0.0 {
            return Err(ConfigError::Invalid("Camera up vector cannot be zero".to_string()));
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Asset Configuration
///
/// Well-known shader paths. The shared fragment stage is linked into every
/// program the resource manager builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Vertex stage used by the default program
    pub default_vertex_shader: String,
    /// Fragment stage used by the default program
    pub default_fragment_shader: String,
    /// Fragment stage linked into every program
    pub shared_fragment_shader: String,
    /// Fragment stage of the default depth-map material
    pub depth_fragment_shader: String,
}

impl AssetConfig {
    /// Create an asset configuration with the standard `data/` layout
    pub fn new() -> Self {
        Self {
            default_vertex_shader: "data/default.vs".to_string(),
            default_fragment_shader: "data/default.fs".to_string(),
            shared_fragment_shader: "data/std.fs".to_string(),
            depth_fragment_shader: "data/shadowmap.fs".to_string(),
        }
    }

    /// Point every well-known shader into `dir`, keeping file names
    pub fn with_shader_dir(mut self, dir: &str) -> Self {
        let relocate = |path: &str| {
            let file = std::path::Path::new(path)
                .file_name()
                .map_or_else(|| path.to_string(), |name| name.to_string_lossy().into_owned());
            format!("{}/{}", dir.trim_end_matches('/'), file)
        };
        self.default_vertex_shader = relocate(&self.default_vertex_shader);
        self.default_fragment_shader = relocate(&self.default_fragment_shader);
        self.shared_fragment_shader = relocate(&self.shared_fragment_shader);
        self.depth_fragment_shader = relocate(&self.depth_fragment_shader);
        self
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Engine Configuration
///
/// Frame-loop behavior that sits above the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log filter for env_logger (e.g. "info", "render_core=debug")
    pub log_level: String,
    /// Frames between resource sweeps; 0 disables periodic sweeping
    pub sweep_interval_frames: u64,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            sweep_interval_frames: 300,
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Whether unused resources should be swept after `frame`
    pub fn should_sweep(&self, frame: u64) -> bool {
        self.sweep_interval_frames != 0 && frame != 0 && frame % self.sweep_interval_frames == 0
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration that encompasses all subsystems.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine loop configuration
    pub engine: EngineConfig,
    /// Rendering context configuration
    pub renderer: RendererConfig,
    /// Resource manager configuration
    pub assets: AssetConfig,
}

impl ApplicationConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.renderer.validate()
    }
}

impl Config for ApplicationConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ApplicationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_clip_planes_rejected() {
        let config = RendererConfig::new().with_clip_planes(10.0, 1.0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_fov_out_of_range_rejected() {
        assert!(RendererConfig::new().with_fov(0.0).validate().is_err());
        assert!(RendererConfig::new().with_fov(180.0).validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.toml");

        let mut config = ApplicationConfig::default();
        config.engine = config.engine.with_log_level("debug");
        config.renderer = config.renderer.with_fov(60.0);
        config.save_to_file(&path).unwrap();

        let loaded = ApplicationConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[renderer]\nfov_degrees = 70.0\n").unwrap();

        let loaded = ApplicationConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.renderer.fov_degrees, 70.0);
        assert_eq!(loaded.renderer.near_plane, 0.1);
        assert_eq!(loaded.assets, AssetConfig::default());
    }

    #[test]
    fn test_ron_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.ron");

        let config = ApplicationConfig::default();
        config.save_to_file(&path).unwrap();
        assert_eq!(ApplicationConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let result = ApplicationConfig::load_from_file("settings.ini");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let loaded = ApplicationConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, ApplicationConfig::default());
    }

    #[test]
    fn test_sweep_schedule() {
        let engine = EngineConfig { sweep_interval_frames: 3, ..EngineConfig::default() };
        assert!(!engine.should_sweep(0));
        assert!(!engine.should_sweep(2));
        assert!(engine.should_sweep(3));
        assert!(engine.should_sweep(6));

        let never = EngineConfig { sweep_interval_frames: 0, ..EngineConfig::default() };
        assert!(!never.should_sweep(300));
    }

    #[test]
    fn test_shader_dir_relocation() {
        let assets = AssetConfig::new().with_shader_dir("/tmp/shaders/");
        assert_eq!(assets.default_vertex_shader, "/tmp/shaders/default.vs");
        assert_eq!(assets.shared_fragment_shader, "/tmp/shaders/std.fs");
    }
}
