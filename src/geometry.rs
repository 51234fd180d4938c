//! Fullscreen quad and ground-plane geometry.
//!
//! Both passes draw fixed 4-vertex, 2-triangle meshes: the base pass a
//! ground plane under the scene, the lighting pass a fullscreen quad. Each
//! mesh packs its attributes into one interleaved vertex buffer built by
//! [`interleave`], a fan-out over independent per-attribute indices — every
//! output vertex names its own source index for the extra channel, the
//! texture coordinate and the position, so attributes do not have to share
//! one index stream.
//!
//! The quad's "extra" channel carries rectangle-texture coordinates in
//! pixel space, proportional to the current output dimensions. That is why
//! [`ScreenGeometry::regenerate`] rebuilds both meshes from scratch on every
//! resize instead of patching buffers in place.

use glow::HasContext;

use crate::error::RenderError;

/// Vertex layout: extra (3 floats) + texcoord (2) + position (3).
const FLOATS_PER_VERTEX: usize = 8;
const VERTEX_STRIDE: i32 = (FLOATS_PER_VERTEX * 4) as i32;

/// Vertices per generated mesh (two triangles, no index buffer).
pub const SCREEN_MESH_VERTICES: i32 = 6;

/// Ground plane: a 20x20 quad at y = 0 with up-facing normals.
const PLANE_POSITIONS: [[f32; 3]; 4] = [
    [-10.0, 0.0, -10.0],
    [-10.0, 0.0, 10.0],
    [10.0, 0.0, 10.0],
    [10.0, 0.0, -10.0],
];

const PLANE_NORMALS: [[f32; 3]; 4] = [
    [0.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
];

const PLANE_TEXCOORDS: [[f32; 2]; 4] = [[0.0, 1.0], [0.0, 0.0], [1.0, 0.0], [1.0, 1.0]];

/// Per-vertex [extra, texcoord, position] index triplets for the plane's
/// two triangles.
const PLANE_INDICES: [[usize; 3]; 6] = [
    [0, 0, 0],
    [1, 1, 1],
    [2, 2, 2],
    [0, 0, 0],
    [2, 2, 2],
    [3, 3, 3],
];

/// Fullscreen quad corners in normalized device coordinates.
const QUAD_POSITIONS: [[f32; 3]; 4] = [
    [-1.0, 1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [1.0, 1.0, 0.0],
    [1.0, -1.0, 0.0],
];

const QUAD_TEXCOORDS: [[f32; 2]; 4] = [[0.0, 1.0], [0.0, 0.0], [1.0, 1.0], [1.0, 0.0]];

const QUAD_INDICES: [[usize; 3]; 6] = [
    [0, 0, 0],
    [1, 1, 1],
    [2, 2, 2],
    [2, 2, 2],
    [1, 1, 1],
    [3, 3, 3],
];

/// Rectangle-texture coordinates for the quad corners, in pixel space of
/// the current output dimensions.
fn quad_rect_coords(width: f32, height: f32) -> [[f32; 3]; 4] {
    [
        [0.0, height, 0.0],
        [0.0, 0.0, 0.0],
        [width, height, 0.0],
        [width, 0.0, 0.0],
    ]
}

/// Interleave per-vertex attributes into one flat buffer.
///
/// Each entry of `indices` is an `[extra, texcoord, position]` triplet of
/// source indices; the output vertex at that entry is `extras[i0]` +
/// `texcoords[i1]` + `positions[i2]`, 8 floats in that fixed order. Pure
/// data transformation, no GPU involvement.
pub fn interleave(
    indices: &[[usize; 3]],
    positions: &[[f32; 3]],
    texcoords: &[[f32; 2]],
    extras: &[[f32; 3]],
) -> Vec<f32> {
    let mut data = Vec::with_capacity(indices.len() * FLOATS_PER_VERTEX);
    for triplet in indices {
        data.extend_from_slice(&extras[triplet[0]]);
        data.extend_from_slice(&texcoords[triplet[1]]);
        data.extend_from_slice(&positions[triplet[2]]);
    }
    data
}

/// One generated mesh: a vertex array with its interleaved vertex buffer.
struct GeneratedMesh {
    vao: glow::VertexArray,
    vbo: glow::Buffer,
}

impl GeneratedMesh {
    /// Upload interleaved vertex data and wire the fixed attribute slots:
    /// slot 2 = extra, slot 1 = texcoord, slot 0 = position.
    fn upload(gl: &glow::Context, data: &[f32]) -> Result<Self, RenderError> {
        unsafe {
            let vao = gl.create_vertex_array().map_err(RenderError::Resource)?;
            let vbo = gl.create_buffer().map_err(RenderError::Resource)?;

            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(data),
                glow::STATIC_DRAW,
            );

            gl.vertex_attrib_pointer_f32(2, 3, glow::FLOAT, false, VERTEX_STRIDE, 0);
            gl.vertex_attrib_pointer_f32(1, 2, glow::FLOAT, false, VERTEX_STRIDE, 12);
            gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, VERTEX_STRIDE, 20);
            gl.enable_vertex_attrib_array(2);
            gl.enable_vertex_attrib_array(1);
            gl.enable_vertex_attrib_array(0);

            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            Ok(Self { vao, vbo })
        }
    }

    fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_buffer(self.vbo);
            gl.delete_vertex_array(self.vao);
        }
    }
}

/// Owner of the fullscreen quad and ground plane meshes.
///
/// Holds the VAO/VBO pairs as plain fields; there is exactly one instance
/// per running pipeline, owned by the frame renderer.
pub struct ScreenGeometry {
    quad: GeneratedMesh,
    plane: GeneratedMesh,
}

impl ScreenGeometry {
    /// Generate both meshes for the given output dimensions.
    pub fn new(gl: &glow::Context, width: f32, height: f32) -> Result<Self, RenderError> {
        let rect_coords = quad_rect_coords(width, height);
        let quad_data = interleave(&QUAD_INDICES, &QUAD_POSITIONS, &QUAD_TEXCOORDS, &rect_coords);
        let plane_data = interleave(
            &PLANE_INDICES,
            &PLANE_POSITIONS,
            &PLANE_TEXCOORDS,
            &PLANE_NORMALS,
        );

        let quad = GeneratedMesh::upload(gl, &quad_data)?;
        let plane = match GeneratedMesh::upload(gl, &plane_data) {
            Ok(plane) => plane,
            Err(e) => {
                quad.destroy(gl);
                return Err(e);
            }
        };

        Ok(Self { quad, plane })
    }

    /// Destroy the current meshes and rebuild them for new dimensions.
    ///
    /// Called on every resize: the quad's rectangle-texture coordinates are
    /// expressed in pixels of the output size, so the old vertex content is
    /// stale the moment the output changes.
    pub fn regenerate(&mut self, gl: &glow::Context, width: f32, height: f32) -> Result<(), RenderError> {
        self.destroy(gl);
        *self = Self::new(gl, width, height)?;
        Ok(())
    }

    /// Bind the fullscreen quad's vertex array for drawing.
    pub fn bind_quad(&self, gl: &glow::Context) {
        unsafe { gl.bind_vertex_array(Some(self.quad.vao)) };
    }

    /// Bind the ground plane's vertex array for drawing.
    pub fn bind_plane(&self, gl: &glow::Context) {
        unsafe { gl.bind_vertex_array(Some(self.plane.vao)) };
    }

    /// Delete both meshes. Handles must not be used afterwards.
    pub fn destroy(&self, gl: &glow::Context) {
        self.quad.destroy(gl);
        self.plane.destroy(gl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleave_packs_extra_texcoord_position() {
        let positions = [[1.0, 2.0, 3.0]];
        let texcoords = [[0.5, 0.25]];
        let extras = [[0.0, 1.0, 0.0]];
        let data = interleave(&[[0, 0, 0]], &positions, &texcoords, &extras);
        assert_eq!(data, vec![0.0, 1.0, 0.0, 0.5, 0.25, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn interleave_resolves_indices_per_attribute() {
        let positions = [[0.0; 3], [9.0, 9.0, 9.0]];
        let texcoords = [[0.0, 0.0], [0.5, 0.5]];
        let extras = [[0.0; 3], [1.0, 1.0, 1.0]];
        // Each attribute pulls from a different source index.
        let data = interleave(&[[1, 0, 1]], &positions, &texcoords, &extras);
        assert_eq!(data, vec![1.0, 1.0, 1.0, 0.0, 0.0, 9.0, 9.0, 9.0]);
    }

    #[test]
    fn interleave_is_deterministic() {
        let rect = quad_rect_coords(800.0, 600.0);
        let a = interleave(&QUAD_INDICES, &QUAD_POSITIONS, &QUAD_TEXCOORDS, &rect);
        let b = interleave(&QUAD_INDICES, &QUAD_POSITIONS, &QUAD_TEXCOORDS, &rect);
        assert_eq!(a, b);
        assert_eq!(a.len(), 6 * FLOATS_PER_VERTEX);
    }

    #[test]
    fn quad_rect_coords_track_output_size() {
        let coords = quad_rect_coords(1024.0, 768.0);
        assert_eq!(coords[0], [0.0, 768.0, 0.0]);
        assert_eq!(coords[2], [1024.0, 768.0, 0.0]);
        // Same dimensions produce identical coordinates.
        assert_eq!(coords, quad_rect_coords(1024.0, 768.0));
    }

    #[test]
    fn plane_spans_two_triangles_at_ground_level() {
        let data = interleave(
            &PLANE_INDICES,
            &PLANE_POSITIONS,
            &PLANE_TEXCOORDS,
            &PLANE_NORMALS,
        );
        assert_eq!(data.len(), 6 * FLOATS_PER_VERTEX);
        for vertex in data.chunks(FLOATS_PER_VERTEX) {
            // Up normal, position y = 0.
            assert_eq!(&vertex[0..3], &[0.0, 1.0, 0.0]);
            assert_eq!(vertex[6], 0.0);
        }
    }
}
