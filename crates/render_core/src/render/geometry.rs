//! Indexed triangle geometry

// The Pod/Zeroable derives expand to `unsafe impl`
#![allow(unsafe_code)]

use bytemuck::{Pod, Zeroable};

use crate::render::device::GraphicsDevice;

/// Interleaved vertex layout uploaded to the device
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Texture coordinate
    pub uv: [f32; 2],
}

impl Vertex {
    /// Create a vertex
    pub const fn new(position: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, uv }
    }
}

/// Indexed triangle list
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    name: String,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl Geometry {
    /// Built-in unit quad spanning -1..1 in XY, facing +Z
    pub fn tile() -> Self {
        Self::new(
            "tile",
            vec![
                Vertex::new([-1.0, -1.0, 0.0], [0.0, 1.0]),
                Vertex::new([1.0, -1.0, 0.0], [1.0, 1.0]),
                Vertex::new([1.0, 1.0, 0.0], [1.0, 0.0]),
                Vertex::new([-1.0, 1.0, 0.0], [0.0, 0.0]),
            ],
            vec![0, 2, 1, 0, 3, 2],
        )
    }

    /// Create geometry from raw vertex and index data
    pub fn new(name: impl Into<String>, vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        debug_assert!(indices.len() % 3 == 0, "index count must describe whole triangles");
        debug_assert!(
            indices.iter().all(|&i| (i as usize) < vertices.len()),
            "index out of range"
        );
        Self {
            name: name.into(),
            vertices,
            indices,
        }
    }

    /// Geometry name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Vertices
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Vertex data as raw bytes
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Triangle indices
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Issue an indexed draw with the currently bound program
    pub fn draw(&self, device: &dyn GraphicsDevice) {
        log::trace!("Drawing {} ({} triangles)", self.name, self.triangle_count());
        device.draw_indexed(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::HeadlessDevice;

    #[test]
    fn test_tile_layout() {
        let tile = Geometry::tile();
        assert_eq!(tile.name(), "tile");
        assert_eq!(tile.indices(), &[0, 2, 1, 0, 3, 2]);
        assert_eq!(tile.triangle_count(), 2);
        assert_eq!(tile.vertices()[2], Vertex::new([1.0, 1.0, 0.0], [1.0, 0.0]));
    }

    #[test]
    fn test_vertex_bytes_are_tightly_packed() {
        let tile = Geometry::tile();
        assert_eq!(std::mem::size_of::<Vertex>(), 5 * 4);
        assert_eq!(tile.vertex_bytes().len(), 4 * 5 * 4);
    }

    #[test]
    fn test_draw_submits_to_device() {
        let device = HeadlessDevice::new();
        Geometry::tile().draw(&device);
        let stats = device.stats();
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(stats.vertex_bytes_submitted, 80);
    }
}
