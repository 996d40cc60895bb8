//! Material description files
//!
//! A material description is a small TOML document with optional `[color]`,
//! `[shaders]` and `[texture]` sections:
//!
//! ```toml
//! [color]
//! ambient = [0.2, 0.2, 0.2, 1.0]
//! diffuse = [0.8, 0.6, 0.4, 1.0]
//!
//! [shaders]
//! vertex = "data/default.vs"
//! fragment = "data/lambert.fs"
//!
//! [texture]
//! path = "data/grass.png"
//! ```
//!
//! Shader paths left out fall back to the configured defaults when the
//! resource manager builds the material.

use std::path::Path;

use serde::Deserialize;

use crate::assets::AssetError;
use crate::foundation::math::Vec4;

const DEFAULT_AMBIENT: [f32; 4] = [0.2, 0.2, 0.2, 1.0];
const DEFAULT_DIFFUSE: [f32; 4] = [0.8, 0.8, 0.8, 1.0];

/// Parsed material description
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterialDescription {
    /// Color parameters
    #[serde(default)]
    pub color: ColorSection,
    /// Shader stage paths
    #[serde(default)]
    pub shaders: ShaderSection,
    /// Optional texture bound to unit 0
    pub texture: Option<TextureSection>,
}

/// `[color]` section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColorSection {
    /// Ambient RGBA
    #[serde(default = "default_ambient")]
    pub ambient: [f32; 4],
    /// Diffuse RGBA
    #[serde(default = "default_diffuse")]
    pub diffuse: [f32; 4],
}

impl Default for ColorSection {
    fn default() -> Self {
        Self {
            ambient: DEFAULT_AMBIENT,
            diffuse: DEFAULT_DIFFUSE,
        }
    }
}

fn default_ambient() -> [f32; 4] {
    DEFAULT_AMBIENT
}

fn default_diffuse() -> [f32; 4] {
    DEFAULT_DIFFUSE
}

/// `[shaders]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShaderSection {
    /// Vertex stage path
    pub vertex: Option<String>,
    /// Fragment stage path
    pub fragment: Option<String>,
}

/// `[texture]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextureSection {
    /// Image file path
    pub path: String,
}

impl MaterialDescription {
    /// Load and parse a description file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AssetError::NotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents).map_err(|e| match e {
            AssetError::InvalidData(reason) => {
                AssetError::InvalidData(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })
    }

    /// Parse description text
    pub fn parse(contents: &str) -> Result<Self, AssetError> {
        let description: Self =
            toml::from_str(contents).map_err(|e| AssetError::InvalidData(e.to_string()))?;
        description.validate()?;
        Ok(description)
    }

    /// Ambient color as a vector
    pub fn ambient(&self) -> Vec4 {
        Vec4::from(self.color.ambient)
    }

    /// Diffuse color as a vector
    pub fn diffuse(&self) -> Vec4 {
        Vec4::from(self.color.diffuse)
    }

    fn validate(&self) -> Result<(), AssetError> {
        let in_range = |c: &[f32; 4]| c.iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v));
        if !in_range(&self.color.ambient) || !in_range(&self.color.diffuse) {
            return Err(AssetError::InvalidData(
                "color components must lie within [0, 1]".to_string(),
            ));
        }

        let blank = |p: &Option<String>| p.as_deref().is_some_and(|s| s.trim().is_empty());
        if blank(&self.shaders.vertex) || blank(&self.shaders.fragment) {
            return Err(AssetError::InvalidData("shader paths cannot be empty".to_string()));
        }
        if self.texture.as_ref().is_some_and(|t| t.path.trim().is_empty()) {
            return Err(AssetError::InvalidData("texture path cannot be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_full_description() {
        let description = MaterialDescription::parse(
            r#"
            [color]
            ambient = [0.1, 0.1, 0.1, 1.0]
            diffuse = [0.9, 0.5, 0.2, 1.0]

            [shaders]
            vertex = "data/terrain.vs"
            fragment = "data/terrain.fs"

            [texture]
            path = "data/grass.png"
            "#,
        )
        .unwrap();

        assert_eq!(description.diffuse(), Vec4::new(0.9, 0.5, 0.2, 1.0));
        assert_eq!(description.shaders.vertex.as_deref(), Some("data/terrain.vs"));
        assert_eq!(description.texture.unwrap().path, "data/grass.png");
    }

    #[test]
    fn test_empty_description_uses_defaults() {
        let description = MaterialDescription::parse("").unwrap();
        assert_eq!(description.color, ColorSection::default());
        assert_eq!(description.shaders, ShaderSection::default());
        assert!(description.texture.is_none());
    }

    #[test]
    fn test_partial_color_section() {
        let description =
            MaterialDescription::parse("[color]\ndiffuse = [1.0, 0.0, 0.0, 1.0]\n").unwrap();
        assert_eq!(description.color.ambient, DEFAULT_AMBIENT);
        assert_eq!(description.color.diffuse, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_malformed_syntax_rejected() {
        let result = MaterialDescription::parse("[color\nambient = ");
        assert!(matches!(result, Err(AssetError::InvalidData(_))));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = MaterialDescription::parse("[color]\nspecular = [1.0, 1.0, 1.0, 1.0]\n");
        assert!(matches!(result, Err(AssetError::InvalidData(_))));
    }

    #[test]
    fn test_out_of_range_color_rejected() {
        let result = MaterialDescription::parse("[color]\nambient = [2.0, 0.0, 0.0, 1.0]\n");
        assert!(matches!(result, Err(AssetError::InvalidData(_))));
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let result = MaterialDescription::parse("[color]\ndiffuse = [1.0, 0.0]\n");
        assert!(matches!(result, Err(AssetError::InvalidData(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = MaterialDescription::load("no/such/material.toml");
        assert!(matches!(result, Err(AssetError::NotFound(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[shaders]\nfragment = \"data/lambert.fs\"\n").unwrap();

        let description = MaterialDescription::load(file.path()).unwrap();
        assert_eq!(description.shaders.fragment.as_deref(), Some("data/lambert.fs"));
        assert!(description.shaders.vertex.is_none());
    }
}
