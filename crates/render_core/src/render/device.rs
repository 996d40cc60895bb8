//! Graphics device abstraction
//!
//! [`GraphicsDevice`] is the seam between this crate and the hardware draw
//! layer: shader compilation, program linking, uniform upload, texture
//! upload and indexed draws. GPU objects created through it are owned by
//! RAII wrappers ([`ShaderStage`], [`ShaderProgram`], [`Texture`]) that hand
//! them back in `Drop`.
//!
//! [`HeadlessDevice`] implements the trait without a GPU, counts every call
//! and remembers the last matrix uploaded to each uniform, which makes it the
//! device of choice for tests and tooling.
//!
//! [`ShaderStage`]: crate::render::ShaderStage
//! [`ShaderProgram`]: crate::render::ShaderProgram
//! [`Texture`]: crate::render::Texture

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::assets::ImageData;
use crate::foundation::math::{Mat3, Mat4, Vec3, Vec4};
use crate::render::geometry::Geometry;
use crate::render::shader::ShaderStageKind;

/// Opaque GPU object name (shader, program or texture)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuId(pub u32);

/// Location of a uniform inside a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

/// Hardware draw layer
///
/// All methods take `&self`; implementations use interior mutability. The
/// device is driven from a single rendering thread.
pub trait GraphicsDevice {
    /// Compile one shader stage. `Err` carries the compiler log.
    fn compile_shader(&self, kind: ShaderStageKind, source: &str) -> Result<GpuId, String>;

    /// Release a compiled stage
    fn delete_shader(&self, shader: GpuId);

    /// Link compiled stages into a program. `Err` carries the linker log.
    fn link_program(&self, stages: &[GpuId]) -> Result<GpuId, String>;

    /// Release a linked program
    fn delete_program(&self, program: GpuId);

    /// Make `program` current for subsequent uniform uploads and draws
    fn use_program(&self, program: GpuId);

    /// Look up a uniform by name; `None` if the program has no such uniform
    fn uniform_location(&self, program: GpuId, name: &str) -> Option<UniformLocation>;

    /// Upload a 4x4 matrix uniform
    fn set_uniform_mat4(&self, location: UniformLocation, value: &Mat4);

    /// Upload a 3x3 matrix uniform
    fn set_uniform_mat3(&self, location: UniformLocation, value: &Mat3);

    /// Upload a vec3 uniform
    fn set_uniform_vec3(&self, location: UniformLocation, value: &Vec3);

    /// Upload a vec4 uniform
    fn set_uniform_vec4(&self, location: UniformLocation, value: &Vec4);

    /// Upload an integer uniform (sampler units)
    fn set_uniform_i32(&self, location: UniformLocation, value: i32);

    /// Upload decoded pixels as a 2D texture
    fn create_texture(&self, image: &ImageData, mipmapped: bool) -> GpuId;

    /// Bind a texture to a sampler unit
    fn bind_texture(&self, texture: GpuId, unit: u32);

    /// Release a texture
    fn delete_texture(&self, texture: GpuId);

    /// Enable or disable depth testing
    fn set_depth_test(&self, enabled: bool);

    /// Issue one indexed draw of `geometry` with the current program
    fn draw_indexed(&self, geometry: &Geometry);
}

/// Call counters recorded by [`HeadlessDevice`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Successful stage compilations
    pub shaders_compiled: usize,
    /// Rejected stage compilations
    pub shader_compile_failures: usize,
    /// Stages released
    pub shaders_deleted: usize,
    /// Successful links
    pub programs_linked: usize,
    /// Rejected links
    pub program_link_failures: usize,
    /// Programs released
    pub programs_deleted: usize,
    /// `use_program` calls
    pub program_binds: usize,
    /// Uniform uploads of any type
    pub uniform_uploads: usize,
    /// Textures created
    pub textures_created: usize,
    /// Texture binds
    pub texture_binds: usize,
    /// Textures released
    pub textures_deleted: usize,
    /// Indexed draws issued
    pub draw_calls: usize,
    /// Indices submitted across all draws
    pub indices_submitted: usize,
    /// Vertex bytes submitted across all draws
    pub vertex_bytes_submitted: usize,
}

impl DeviceStats {
    /// Stages currently alive on the device
    pub fn live_shaders(&self) -> usize {
        self.shaders_compiled - self.shaders_deleted
    }

    /// Programs currently alive on the device
    pub fn live_programs(&self) -> usize {
        self.programs_linked - self.programs_deleted
    }

    /// Textures currently alive on the device
    pub fn live_textures(&self) -> usize {
        self.textures_created - self.textures_deleted
    }
}

/// Device that performs no GPU work
///
/// Rejects empty shader sources (as real drivers do) and links only
/// non-empty stage lists, so soft-failure paths can be exercised.
pub struct HeadlessDevice {
    next_id: Cell<u32>,
    stats: RefCell<DeviceStats>,
    uniforms: RefCell<HashMap<(GpuId, String), UniformLocation>>,
    next_location: Cell<i32>,
    mat4_values: RefCell<HashMap<UniformLocation, Mat4>>,
    current_program: Cell<Option<GpuId>>,
    depth_test: Cell<bool>,
}

impl HeadlessDevice {
    /// Create a headless device
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            stats: RefCell::new(DeviceStats::default()),
            uniforms: RefCell::new(HashMap::new()),
            next_location: Cell::new(0),
            mat4_values: RefCell::new(HashMap::new()),
            current_program: Cell::new(None),
            depth_test: Cell::new(true),
        }
    }

    /// Snapshot of the call counters
    pub fn stats(&self) -> DeviceStats {
        self.stats.borrow().clone()
    }

    /// Program most recently made current
    pub fn current_program(&self) -> Option<GpuId> {
        self.current_program.get()
    }

    /// Whether depth testing is currently enabled
    pub fn depth_test_enabled(&self) -> bool {
        self.depth_test.get()
    }

    /// Last 4x4 matrix uploaded to uniform `name` of `program`
    pub fn uniform_mat4(&self, program: GpuId, name: &str) -> Option<Mat4> {
        let location = *self.uniforms.borrow().get(&(program, name.to_string()))?;
        self.mat4_values.borrow().get(&location).copied()
    }

    fn allocate(&self) -> GpuId {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        GpuId(id)
    }

    fn record(&self, update: impl FnOnce(&mut DeviceStats)) {
        update(&mut self.stats.borrow_mut());
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn compile_shader(&self, kind: ShaderStageKind, source: &str) -> Result<GpuId, String> {
        if source.trim().is_empty() {
            self.record(|s| s.shader_compile_failures += 1);
            return Err(format!("0:1({:?}): error: empty shader source", kind));
        }
        self.record(|s| s.shaders_compiled += 1);
        Ok(self.allocate())
    }

    fn delete_shader(&self, _shader: GpuId) {
        self.record(|s| s.shaders_deleted += 1);
    }

    fn link_program(&self, stages: &[GpuId]) -> Result<GpuId, String> {
        if stages.is_empty() {
            self.record(|s| s.program_link_failures += 1);
            return Err("error: no shader stages attached".to_string());
        }
        self.record(|s| s.programs_linked += 1);
        Ok(self.allocate())
    }

    fn delete_program(&self, program: GpuId) {
        let mut values = self.mat4_values.borrow_mut();
        self.uniforms.borrow_mut().retain(|(owner, _), location| {
            let keep = *owner != program;
            if !keep {
                values.remove(location);
            }
            keep
        });
        drop(values);
        if self.current_program.get() == Some(program) {
            self.current_program.set(None);
        }
        self.record(|s| s.programs_deleted += 1);
    }

    fn use_program(&self, program: GpuId) {
        self.current_program.set(Some(program));
        self.record(|s| s.program_binds += 1);
    }

    fn uniform_location(&self, program: GpuId, name: &str) -> Option<UniformLocation> {
        let mut uniforms = self.uniforms.borrow_mut();
        let location = uniforms.entry((program, name.to_string())).or_insert_with(|| {
            let next = self.next_location.get();
            self.next_location.set(next + 1);
            UniformLocation(next)
        });
        Some(*location)
    }

    fn set_uniform_mat4(&self, location: UniformLocation, value: &Mat4) {
        self.mat4_values.borrow_mut().insert(location, *value);
        self.record(|s| s.uniform_uploads += 1);
    }

    fn set_uniform_mat3(&self, _location: UniformLocation, _value: &Mat3) {
        self.record(|s| s.uniform_uploads += 1);
    }

    fn set_uniform_vec3(&self, _location: UniformLocation, _value: &Vec3) {
        self.record(|s| s.uniform_uploads += 1);
    }

    fn set_uniform_vec4(&self, _location: UniformLocation, _value: &Vec4) {
        self.record(|s| s.uniform_uploads += 1);
    }

    fn set_uniform_i32(&self, _location: UniformLocation, _value: i32) {
        self.record(|s| s.uniform_uploads += 1);
    }

    fn create_texture(&self, image: &ImageData, _mipmapped: bool) -> GpuId {
        log::trace!(
            "Headless texture upload: {}x{} ({} bytes)",
            image.width,
            image.height,
            image.size_bytes()
        );
        self.record(|s| s.textures_created += 1);
        self.allocate()
    }

    fn bind_texture(&self, _texture: GpuId, _unit: u32) {
        self.record(|s| s.texture_binds += 1);
    }

    fn delete_texture(&self, _texture: GpuId) {
        self.record(|s| s.textures_deleted += 1);
    }

    fn set_depth_test(&self, enabled: bool) {
        self.depth_test.set(enabled);
    }

    fn draw_indexed(&self, geometry: &Geometry) {
        let vertex_bytes = geometry.vertex_bytes().len();
        let indices = geometry.indices().len();
        self.record(|s| {
            s.draw_calls += 1;
            s.indices_submitted += indices;
            s.vertex_bytes_submitted += vertex_bytes;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let device = HeadlessDevice::new();
        let a = device.compile_shader(ShaderStageKind::Vertex, "void main() {}").unwrap();
        let b = device.compile_shader(ShaderStageKind::Fragment, "void main() {}").unwrap();
        assert_ne!(a, b);
        assert_eq!(device.stats().live_shaders(), 2);
    }

    #[test]
    fn test_empty_source_rejected() {
        let device = HeadlessDevice::new();
        let log = device.compile_shader(ShaderStageKind::Fragment, "  \n").unwrap_err();
        assert!(log.contains("empty shader source"));
        assert_eq!(device.stats().shader_compile_failures, 1);
    }

    #[test]
    fn test_uniform_locations_are_stable_per_program() {
        let device = HeadlessDevice::new();
        let program = device.link_program(&[GpuId(1)]).unwrap();
        let mvp = device.uniform_location(program, "MVP");
        assert_eq!(device.uniform_location(program, "MVP"), mvp);
        assert_ne!(device.uniform_location(program, "M"), mvp);
    }

    #[test]
    fn test_locations_stay_unique_after_program_deletion() {
        let device = HeadlessDevice::new();
        let first = device.link_program(&[GpuId(1)]).unwrap();
        let second = device.link_program(&[GpuId(1)]).unwrap();
        device.uniform_location(first, "MVP");
        let kept = device.uniform_location(second, "MVP");
        device.delete_program(first);

        let third = device.link_program(&[GpuId(1)]).unwrap();
        assert_ne!(device.uniform_location(third, "MVP"), kept);
    }

    #[test]
    fn test_mat4_uploads_are_recorded() {
        let device = HeadlessDevice::new();
        let program = device.link_program(&[GpuId(1)]).unwrap();
        let location = device.uniform_location(program, "M").unwrap();
        let moved = Mat4::new_translation(&Vec3::new(0.0, 3.0, 0.0));

        assert_eq!(device.uniform_mat4(program, "M"), None);
        device.set_uniform_mat4(location, &moved);
        assert_eq!(device.uniform_mat4(program, "M"), Some(moved));
    }

    #[test]
    fn test_deleting_current_program_unbinds_it() {
        let device = HeadlessDevice::new();
        let program = device.link_program(&[GpuId(1)]).unwrap();
        device.use_program(program);
        device.delete_program(program);
        assert_eq!(device.current_program(), None);
        assert_eq!(device.stats().live_programs(), 0);
    }

    #[test]
    fn test_draw_counts_geometry() {
        let device = HeadlessDevice::new();
        let tile = Geometry::tile();
        device.draw_indexed(&tile);
        device.draw_indexed(&tile);

        let stats = device.stats();
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(stats.indices_submitted, 12);
    }
}
