//! Shader stages and linked programs
//!
//! Compilation failures are soft: a stage that cannot be read or compiled,
//! or a program that cannot be linked, is still constructed. The failure is
//! logged with the driver's diagnostics and the object acts as an inert
//! placeholder, so callers keep running with incorrect output instead of
//! crashing.

use std::fmt;
use std::rc::Rc;

use crate::assets::Handle;
use crate::foundation::math::{Mat4Ext, Vec4};
use crate::render::context::RenderingContext;
use crate::render::device::{GpuId, GraphicsDevice, UniformLocation};

/// Pipeline stage a shader object belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStageKind {
    /// Vertex stage
    Vertex,
    /// Fragment stage
    Fragment,
}

impl fmt::Display for ShaderStageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => write!(f, "vertex"),
            Self::Fragment => write!(f, "fragment"),
        }
    }
}

/// One compiled shader stage, released on drop
pub struct ShaderStage {
    kind: ShaderStageKind,
    path: String,
    id: Option<GpuId>,
    device: Rc<dyn GraphicsDevice>,
}

impl ShaderStage {
    /// Read `path` and compile it as a `kind` stage
    pub fn compile(device: &Rc<dyn GraphicsDevice>, kind: ShaderStageKind, path: &str) -> Self {
        let id = match std::fs::read_to_string(path) {
            Ok(source) => match device.compile_shader(kind, &source) {
                Ok(id) => {
                    log::debug!("Compiled {} shader {}", kind, path);
                    Some(id)
                }
                Err(diagnostics) => {
                    log::error!("Shader {} failed to compile:\n{}", path, diagnostics);
                    None
                }
            },
            Err(e) => {
                log::warn!("Could not open shader {}: {}", path, e);
                None
            }
        };

        Self {
            kind,
            path: path.to_string(),
            id,
            device: Rc::clone(device),
        }
    }

    /// Stage kind
    pub fn kind(&self) -> ShaderStageKind {
        self.kind
    }

    /// Source path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the stage compiled
    pub fn is_compiled(&self) -> bool {
        self.id.is_some()
    }

    /// GPU object, if compiled
    pub fn id(&self) -> Option<GpuId> {
        self.id
    }
}

impl Drop for ShaderStage {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.device.delete_shader(id);
        }
    }
}

impl fmt::Debug for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderStage")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("id", &self.id)
            .finish()
    }
}

/// Cached uniform locations of a linked program
#[derive(Debug, Clone, Copy, Default)]
struct ProgramUniforms {
    mvp: Option<UniformLocation>,
    model: Option<UniformLocation>,
    normal: Option<UniformLocation>,
    camera_position: Option<UniformLocation>,
    texture_sampler: Option<UniformLocation>,
    ambient: Option<UniformLocation>,
    diffuse: Option<UniformLocation>,
}

impl ProgramUniforms {
    fn query(device: &dyn GraphicsDevice, program: GpuId) -> Self {
        let locate = |name: &str| {
            let location = device.uniform_location(program, name);
            if location.is_none() {
                log::debug!("Program {:?} has no {} uniform", program, name);
            }
            location
        };

        Self {
            mvp: locate("MVP"),
            model: locate("M"),
            normal: locate("NormalMx"),
            camera_position: locate("cam_pos"),
            texture_sampler: locate("tex_sampler"),
            ambient: locate("ambient"),
            diffuse: locate("diffuse"),
        }
    }
}

/// Linked shader program
///
/// Holds handles to the stages it was linked from, so pooled stages stay
/// resident for as long as the program does.
pub struct ShaderProgram {
    label: String,
    id: Option<GpuId>,
    stages: Vec<Handle<ShaderStage>>,
    uniforms: ProgramUniforms,
    device: Rc<dyn GraphicsDevice>,
}

impl ShaderProgram {
    /// Link `stages` into a program
    ///
    /// Never fails: if any stage did not compile, or the driver rejects the
    /// link, the program is returned unlinked and logs the reason.
    pub fn link(
        device: &Rc<dyn GraphicsDevice>,
        label: impl Into<String>,
        stages: Vec<Handle<ShaderStage>>,
    ) -> Self {
        let label = label.into();
        log::info!(
            "Linking shader program {} from {}",
            label,
            stages.iter().map(|s| s.path()).collect::<Vec<_>>().join(", ")
        );

        let compiled: Option<Vec<GpuId>> = stages.iter().map(|stage| stage.id()).collect();
        let id = match compiled {
            Some(ids) => match device.link_program(&ids) {
                Ok(id) => Some(id),
                Err(diagnostics) => {
                    log::error!("Program {} failed to link:\n{}", label, diagnostics);
                    None
                }
            },
            None => {
                for stage in stages.iter().filter(|stage| !stage.is_compiled()) {
                    log::error!(
                        "Program {}: {} stage {} is not compiled",
                        label,
                        stage.kind(),
                        stage.path()
                    );
                }
                None
            }
        };

        let uniforms = id.map_or_else(ProgramUniforms::default, |program| {
            ProgramUniforms::query(device.as_ref(), program)
        });

        Self {
            label,
            id,
            stages,
            uniforms,
            device: Rc::clone(device),
        }
    }

    /// Human-readable identity, e.g. `(data/default.vs, data/default.fs)`
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the program linked and can be used
    pub fn is_linked(&self) -> bool {
        self.id.is_some()
    }

    /// GPU object, if linked
    pub fn id(&self) -> Option<GpuId> {
        self.id
    }

    /// Stages this program was linked from
    pub fn stages(&self) -> &[Handle<ShaderStage>] {
        &self.stages
    }

    /// Make this program current. No-op for placeholders.
    pub fn use_program(&self) {
        if let Some(id) = self.id {
            self.device.use_program(id);
        }
    }

    /// Upload MVP, model, normal matrix and camera position from `ctx`
    ///
    /// [`use_program`](Self::use_program) must have been called and
    /// [`RenderingContext::update`] must be current.
    pub fn set_uniform_mvp(&self, ctx: &RenderingContext) {
        if self.id.is_none() {
            return;
        }

        let model = ctx.model_matrix();
        if let Some(location) = self.uniforms.mvp {
            self.device.set_uniform_mat4(location, ctx.mvp());
        }
        if let Some(location) = self.uniforms.model {
            self.device.set_uniform_mat4(location, model);
        }
        if let Some(location) = self.uniforms.normal {
            self.device.set_uniform_mat3(location, &model.normal_matrix());
        }
        if let Some(location) = self.uniforms.camera_position {
            self.device.set_uniform_vec3(location, &ctx.camera_position());
        }
    }

    /// Upload material colors
    pub fn set_material_colors(&self, ambient: &Vec4, diffuse: &Vec4) {
        if self.id.is_none() {
            return;
        }
        if let Some(location) = self.uniforms.ambient {
            self.device.set_uniform_vec4(location, ambient);
        }
        if let Some(location) = self.uniforms.diffuse {
            self.device.set_uniform_vec4(location, diffuse);
        }
    }

    /// Point the texture sampler at `unit`
    pub fn set_texture_unit(&self, unit: u32) {
        if self.id.is_none() {
            return;
        }
        if let (Some(location), Ok(unit)) = (self.uniforms.texture_sampler, i32::try_from(unit)) {
            self.device.set_uniform_i32(location, unit);
        }
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            log::debug!("Deleting shader program {}", self.label);
            self.device.delete_program(id);
        }
    }
}

impl fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("label", &self.label)
            .field("id", &self.id)
            .field("stages", &self.stages.len())
            .finish()
    }
}
