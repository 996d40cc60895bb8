//! Rendering: device seam, GPU resources and the per-frame context

pub mod context;
pub mod device;
pub mod geometry;
pub mod material;
pub mod shader;
pub mod texture;

pub use context::RenderingContext;
pub use device::{DeviceStats, GpuId, GraphicsDevice, HeadlessDevice, UniformLocation};
pub use geometry::{Geometry, Vertex};
pub use material::Material;
pub use shader::{ShaderProgram, ShaderStage, ShaderStageKind};
pub use texture::Texture;
