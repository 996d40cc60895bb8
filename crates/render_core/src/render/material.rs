//! Materials: shader program plus surface parameters

use crate::assets::Handle;
use crate::foundation::math::Vec4;
use crate::render::context::RenderingContext;
use crate::render::shader::ShaderProgram;
use crate::render::texture::Texture;

/// Default ambient color
pub const DEFAULT_AMBIENT: Vec4 = Vec4::new(0.2, 0.2, 0.2, 1.0);

/// Default diffuse color
pub const DEFAULT_DIFFUSE: Vec4 = Vec4::new(0.8, 0.8, 0.8, 1.0);

/// Shader program, colors and optional texture
///
/// The program and texture are pooled handles, so they stay resident for as
/// long as any material using them does.
#[derive(Debug)]
pub struct Material {
    /// Ambient color
    pub ambient: Vec4,
    /// Diffuse color
    pub diffuse: Vec4,
    shaders: Handle<ShaderProgram>,
    texture: Option<Handle<Texture>>,
}

impl Material {
    /// Material with default colors and no texture
    pub fn new(shaders: Handle<ShaderProgram>) -> Self {
        Self {
            ambient: DEFAULT_AMBIENT,
            diffuse: DEFAULT_DIFFUSE,
            shaders,
            texture: None,
        }
    }

    /// Set both colors
    pub fn with_colors(mut self, ambient: Vec4, diffuse: Vec4) -> Self {
        self.ambient = ambient;
        self.diffuse = diffuse;
        self
    }

    /// Attach a texture sampled from unit 0
    pub fn with_texture(mut self, texture: Handle<Texture>) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Shader program
    pub fn shaders(&self) -> &Handle<ShaderProgram> {
        &self.shaders
    }

    /// Texture, if any
    pub fn texture(&self) -> Option<&Handle<Texture>> {
        self.texture.as_ref()
    }

    /// Activate the program and upload everything a draw needs
    ///
    /// `ctx` must be up to date (see [`RenderingContext::update`]).
    pub fn bind(&self, ctx: &RenderingContext) {
        self.shaders.use_program();
        self.shaders.set_uniform_mvp(ctx);
        self.shaders.set_material_colors(&self.ambient, &self.diffuse);
        if let Some(texture) = &self.texture {
            self.shaders.set_texture_unit(0);
            texture.bind(0);
        }
    }
}
