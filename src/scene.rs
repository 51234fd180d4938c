//! glTF scene loading and GPU binding.
//!
//! [`Scene::load`] pulls a glTF file (plus its buffers and images) into
//! memory. [`SceneBindings::bind`] then walks the default scene graph,
//! uploads every buffer view the meshes reference, wires vertex attributes
//! into one vertex array per primitive, and records a flat list of
//! [`PrimitiveDraw`] commands that [`SceneBindings::draw`] replays each
//! frame without touching the document again.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use glow::HasContext;

use crate::alert;
use crate::error::RenderError;
use crate::texture::{MaterialSlot, Texture};

/// Vertex attribute slots the base pass shader expects.
const SLOT_POSITION: u32 = 0;
const SLOT_TEXCOORD: u32 = 1;
const SLOT_NORMAL: u32 = 2;

/// A glTF document together with its decoded buffer and image payloads.
pub struct Scene {
    pub document: gltf::Document,
    pub buffers: Vec<gltf::buffer::Data>,
    pub images: Vec<gltf::image::Data>,
}

impl Scene {
    /// Imports a glTF file from disk, resolving external buffers and images
    /// relative to its location.
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let (document, buffers, images) = gltf::import(path)?;
        log::info!(
            "loaded scene {}: {} nodes, {} meshes, {} images",
            path.display(),
            document.nodes().len(),
            document.meshes().len(),
            images.len(),
        );
        Ok(Self {
            document,
            buffers,
            images,
        })
    }
}

/// One indexed draw recorded during the scene walk.
///
/// The fields are exactly what `glDrawElements` needs, plus the indices of
/// the mesh, primitive, and index buffer view so binding can look the
/// primitive back up in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveDraw {
    pub mesh: usize,
    pub primitive: usize,
    pub index_view: usize,
    pub mode: u32,
    pub count: i32,
    pub component_type: u32,
    pub index_offset: i32,
}

/// Walks the default scene depth-first and collects a draw command for
/// every indexed primitive, in declaration order.
///
/// Nodes are visited parent before children, siblings in the order the
/// document lists them. A node may be reachable through several parents
/// and is drawn once per path; a node that appears on its own ancestor
/// path is a cycle and aborts the walk.
pub fn collect_draws(document: &gltf::Document) -> Result<Vec<PrimitiveDraw>, RenderError> {
    let Some(scene) = document.default_scene().or_else(|| document.scenes().next()) else {
        return Ok(Vec::new());
    };
    let mut draws = Vec::new();
    let mut path = HashSet::new();
    for node in scene.nodes() {
        visit(node, &mut draws, &mut path)?;
    }
    Ok(draws)
}

fn visit(
    node: gltf::Node,
    draws: &mut Vec<PrimitiveDraw>,
    path: &mut HashSet<usize>,
) -> Result<(), RenderError> {
    if !path.insert(node.index()) {
        return Err(RenderError::SceneGraphCycle(node.index()));
    }
    if let Some(mesh) = node.mesh() {
        for (primitive_index, primitive) in mesh.primitives().enumerate() {
            let Some(indices) = primitive.indices() else {
                alert::warn(
                    "Scene",
                    &format!(
                        "mesh {} primitive {} has no indices, skipping",
                        mesh.index(),
                        primitive_index
                    ),
                );
                continue;
            };
            let Some(view) = indices.view() else {
                alert::warn(
                    "Scene",
                    &format!(
                        "mesh {} primitive {} uses a sparse index accessor, skipping",
                        mesh.index(),
                        primitive_index
                    ),
                );
                continue;
            };
            draws.push(PrimitiveDraw {
                mesh: mesh.index(),
                primitive: primitive_index,
                index_view: view.index(),
                mode: primitive.mode().as_gl_enum(),
                count: indices.count() as i32,
                component_type: indices.data_type().as_gl_enum(),
                index_offset: indices.offset() as i32,
            });
        }
    }
    for child in node.children() {
        visit(child, draws, path)?;
    }
    path.remove(&node.index());
    Ok(())
}

fn gl_target(target: gltf::buffer::Target) -> u32 {
    match target {
        gltf::buffer::Target::ArrayBuffer => glow::ARRAY_BUFFER,
        gltf::buffer::Target::ElementArrayBuffer => glow::ELEMENT_ARRAY_BUFFER,
    }
}

/// GPU-resident form of a [`Scene`]: one vertex array per primitive, the
/// element buffers those primitives index into, and the material textures.
pub struct SceneBindings {
    draws: Vec<PrimitiveDraw>,
    vertex_arrays: Vec<glow::VertexArray>,
    index_buffers: HashMap<usize, glow::Buffer>,
    materials: Vec<(MaterialSlot, Texture)>,
}

impl SceneBindings {
    /// Uploads the scene to the GPU.
    ///
    /// Buffer views are uploaded once each, keyed by view index, with the
    /// target the document declares; views that declare no target cannot
    /// be bound and are skipped with a warning. Attribute accessors wire
    /// POSITION, TEXCOORD_0, and NORMAL to their fixed slots and ignore
    /// every other semantic. Vertex buffers are deleted once the vertex
    /// arrays have captured their pointers; element buffers must stay
    /// alive for [`draw`](Self::draw) and are retained.
    pub fn bind(gl: &glow::Context, scene: &Scene) -> Result<Self, RenderError> {
        let draws = collect_draws(&scene.document)?;
        let mut uploaded: HashMap<usize, (glow::Buffer, u32)> = HashMap::new();
        let mut vertex_arrays = Vec::with_capacity(draws.len());
        let mut kept = Vec::with_capacity(draws.len());

        for draw in draws {
            let primitive = scene
                .document
                .meshes()
                .nth(draw.mesh)
                .and_then(|mesh| mesh.primitives().nth(draw.primitive))
                .ok_or_else(|| {
                    RenderError::Resource(format!(
                        "mesh {} primitive {} vanished from the document",
                        draw.mesh, draw.primitive
                    ))
                })?;

            let Some(index_buffer) =
                upload_view_by_index(gl, scene, draw.index_view, &mut uploaded)?
            else {
                continue;
            };

            let vertex_array = unsafe {
                gl.create_vertex_array()
                    .map_err(RenderError::Resource)?
            };
            unsafe {
                gl.bind_vertex_array(Some(vertex_array));
                gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(index_buffer));
            }

            for (semantic, accessor) in primitive.attributes() {
                let slot = match semantic {
                    gltf::Semantic::Positions => SLOT_POSITION,
                    gltf::Semantic::TexCoords(0) => SLOT_TEXCOORD,
                    gltf::Semantic::Normals => SLOT_NORMAL,
                    _ => continue,
                };
                let Some(view) = accessor.view() else {
                    alert::warn(
                        "Scene",
                        &format!("sparse accessor on {:?}, attribute skipped", semantic),
                    );
                    continue;
                };
                let Some(buffer) = upload_view(gl, scene, &view, &mut uploaded)? else {
                    continue;
                };
                unsafe {
                    gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
                    gl.vertex_attrib_pointer_f32(
                        slot,
                        accessor.dimensions().multiplicity() as i32,
                        accessor.data_type().as_gl_enum(),
                        accessor.normalized(),
                        view.stride().unwrap_or(0) as i32,
                        accessor.offset() as i32,
                    );
                    gl.enable_vertex_attrib_array(slot);
                }
            }

            unsafe {
                gl.bind_vertex_array(None);
                gl.bind_buffer(glow::ARRAY_BUFFER, None);
                gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);
            }
            vertex_arrays.push(vertex_array);
            kept.push(draw);
        }

        // The vertex arrays hold the attribute pointers now; only element
        // buffers are still needed at draw time.
        let mut index_buffers = HashMap::new();
        for (view_index, (buffer, target)) in uploaded {
            if target == glow::ELEMENT_ARRAY_BUFFER {
                index_buffers.insert(view_index, buffer);
            } else {
                unsafe { gl.delete_buffer(buffer) };
            }
        }

        let materials = bind_materials(gl, scene)?;

        Ok(Self {
            draws: kept,
            vertex_arrays,
            index_buffers,
            materials,
        })
    }

    /// Binds each material texture to its unit. Sampler uniforms are the
    /// shader's business; this only populates the units.
    pub fn bind_material_units(&self, gl: &glow::Context) {
        for (slot, texture) in &self.materials {
            unsafe {
                gl.active_texture(glow::TEXTURE0 + slot.texture_unit());
                gl.bind_texture(glow::TEXTURE_2D, Some(texture.raw));
            }
        }
        unsafe { gl.active_texture(glow::TEXTURE0) };
    }

    /// Replays the recorded draw commands.
    pub fn draw(&self, gl: &glow::Context) {
        for (vertex_array, draw) in self.vertex_arrays.iter().zip(&self.draws) {
            let Some(index_buffer) = self.index_buffers.get(&draw.index_view) else {
                continue;
            };
            unsafe {
                gl.bind_vertex_array(Some(*vertex_array));
                gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(*index_buffer));
                gl.draw_elements(draw.mode, draw.count, draw.component_type, draw.index_offset);
            }
        }
        unsafe { gl.bind_vertex_array(None) };
    }

    pub fn destroy(&self, gl: &glow::Context) {
        unsafe {
            for vertex_array in &self.vertex_arrays {
                gl.delete_vertex_array(*vertex_array);
            }
            for buffer in self.index_buffers.values() {
                gl.delete_buffer(*buffer);
            }
        }
        for (_, texture) in &self.materials {
            texture.destroy(gl);
        }
    }
}

fn upload_view_by_index(
    gl: &glow::Context,
    scene: &Scene,
    view_index: usize,
    uploaded: &mut HashMap<usize, (glow::Buffer, u32)>,
) -> Result<Option<glow::Buffer>, RenderError> {
    let view = scene.document.views().nth(view_index).ok_or_else(|| {
        RenderError::Resource(format!("buffer view {view_index} vanished from the document"))
    })?;
    upload_view(gl, scene, &view, uploaded)
}

/// Uploads a buffer view once, returning the cached buffer on repeat calls.
/// Views without a declared target have no GPU destination and yield `None`.
fn upload_view(
    gl: &glow::Context,
    scene: &Scene,
    view: &gltf::buffer::View,
    uploaded: &mut HashMap<usize, (glow::Buffer, u32)>,
) -> Result<Option<glow::Buffer>, RenderError> {
    if let Some((buffer, _)) = uploaded.get(&view.index()) {
        return Ok(Some(*buffer));
    }
    let Some(target) = view.target() else {
        alert::warn(
            "Scene",
            &format!("buffer view {} declares no target, skipping", view.index()),
        );
        return Ok(None);
    };
    let target = gl_target(target);
    let data = &scene.buffers[view.buffer().index()];
    let bytes = &data[view.offset()..view.offset() + view.length()];
    let buffer = unsafe { gl.create_buffer().map_err(RenderError::Resource)? };
    unsafe {
        gl.bind_buffer(target, Some(buffer));
        gl.buffer_data_u8_slice(target, bytes, glow::STATIC_DRAW);
        gl.bind_buffer(target, None);
    }
    uploaded.insert(view.index(), (buffer, target));
    Ok(Some(buffer))
}

/// Uploads up to one image per material slot, in slot order. Images the
/// GPU path cannot represent are reported and skipped rather than failing
/// the whole scene.
fn bind_materials(
    gl: &glow::Context,
    scene: &Scene,
) -> Result<Vec<(MaterialSlot, Texture)>, RenderError> {
    let mut materials = Vec::new();
    for (slot, image) in MaterialSlot::ORDER.iter().zip(&scene.images) {
        match Texture::from_image(gl, image)? {
            Some(texture) => materials.push((*slot, texture)),
            None => alert::warn(
                "Scene",
                &format!("image for {slot:?} has an unsupported pixel format, skipping"),
            ),
        }
    }
    Ok(materials)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(json: &str) -> gltf::Document {
        gltf::Gltf::from_slice(json.as_bytes())
            .expect("test document should parse")
            .document
    }

    // Two root nodes, the first with a child; every node draws a mesh.
    const TREE: &str = r#"{
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0, 2]}],
        "nodes": [
            {"mesh": 0, "children": [1]},
            {"mesh": 0},
            {"mesh": 1}
        ],
        "meshes": [
            {"primitives": [{"attributes": {"POSITION": 0}, "indices": 1, "mode": 4}]},
            {"primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}
        ],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0, 0, 0], "max": [0, 0, 0]},
            {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}
        ],
        "bufferViews": [
            {"buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962},
            {"buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963}
        ],
        "buffers": [{"byteLength": 42, "uri": "data:application/octet-stream;base64,AA=="}]
    }"#;

    #[test]
    fn walk_is_depth_first_in_declaration_order() {
        let draws = collect_draws(&document(TREE)).unwrap();
        let visited: Vec<usize> = draws.iter().map(|d| d.mesh).collect();
        // Node 0, then its child node 1, then sibling node 2.
        assert_eq!(visited, vec![0, 0, 1]);
    }

    #[test]
    fn draws_carry_index_accessor_layout() {
        let draws = collect_draws(&document(TREE)).unwrap();
        let first = &draws[0];
        assert_eq!(first.mode, glow::TRIANGLES);
        assert_eq!(first.count, 3);
        assert_eq!(first.component_type, glow::UNSIGNED_SHORT);
        assert_eq!(first.index_offset, 0);
        assert_eq!(first.index_view, 1);
    }

    #[test]
    fn walk_is_deterministic() {
        let doc = document(TREE);
        assert_eq!(collect_draws(&doc).unwrap(), collect_draws(&doc).unwrap());
    }

    #[test]
    fn shared_child_is_drawn_once_per_path() {
        let json = r#"{
            "asset": {"version": "2.0"},
            "scene": 0,
            "scenes": [{"nodes": [0, 1]}],
            "nodes": [
                {"children": [2]},
                {"children": [2]},
                {"mesh": 0}
            ],
            "meshes": [
                {"primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}
            ],
            "accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0, 0, 0], "max": [0, 0, 0]},
                {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}
            ],
            "bufferViews": [
                {"buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962},
                {"buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963}
            ],
            "buffers": [{"byteLength": 42, "uri": "data:application/octet-stream;base64,AA=="}]
        }"#;
        let draws = collect_draws(&document(json)).unwrap();
        assert_eq!(draws.len(), 2);
    }

    #[test]
    fn cyclic_graph_is_rejected() {
        let json = r#"{
            "asset": {"version": "2.0"},
            "scene": 0,
            "scenes": [{"nodes": [0]}],
            "nodes": [
                {"children": [1]},
                {"children": [0]}
            ]
        }"#;
        let err = collect_draws(&document(json)).unwrap_err();
        assert!(matches!(err, RenderError::SceneGraphCycle(0)));
    }

    #[test]
    fn empty_document_yields_no_draws() {
        let json = r#"{"asset": {"version": "2.0"}}"#;
        assert!(collect_draws(&document(json)).unwrap().is_empty());
    }
}
