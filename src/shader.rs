//! Shader program construction for the render passes.
//!
//! This module provides [`ShaderProgram`], which compiles a vertex/fragment
//! stage pair, fixes vertex-attribute and fragment-output slots, and caches
//! uniform locations for later passes.
//!
//! # The two-link binding protocol
//!
//! Attribute and fragment-output slot bindings only take effect through a
//! link step. [`ShaderProgram::build`] therefore links twice: once after
//! attaching the stages, then again after applying all slot bindings. The
//! second link is the step that activates the bindings, not a redundancy —
//! rebinding a slot on an already-linked program without relinking would
//! leave the old layout in effect.
//!
//! # Uniform cache
//!
//! Every uniform name the passes will touch is resolved once at build time.
//! A name the linked program does not expose is cached as `None` (the GL
//! "location -1" sentinel) and uploads to it become no-ops; a shader is free
//! not to use a uniform, so this is not an error.

use std::collections::HashMap;

use glow::HasContext;

use crate::error::RenderError;

/// Source text for one shader stage, with a label for error reports.
pub struct StageSource<'a> {
    /// Where the source came from (file path or other identifier).
    pub label: &'a str,
    /// The GLSL source text.
    pub source: &'a str,
}

/// Everything needed to build one pass's program.
pub struct ProgramDesc<'a> {
    pub vertex: StageSource<'a>,
    pub fragment: StageSource<'a>,
    /// Ordered (slot, attribute name) bindings applied before the final link.
    pub attributes: &'a [(u32, &'a str)],
    /// Ordered (slot, output name) bindings mapping fragment outputs to
    /// color attachments. Empty for passes drawing to the back buffer.
    pub frag_outputs: &'a [(u32, &'a str)],
    /// Uniform names to resolve into the location cache.
    pub uniforms: &'a [&'a str],
}

/// A linked two-stage GL program with a resolved uniform-location cache.
pub struct ShaderProgram {
    program: glow::Program,
    uniforms: HashMap<String, Option<glow::UniformLocation>>,
}

impl ShaderProgram {
    /// Compile, bind and link a program per the descriptor.
    ///
    /// Steps: compile both stages (compile failure is fatal and carries the
    /// compiler log), attach, initial link, apply attribute and
    /// fragment-output slot bindings, final link, then resolve every
    /// requested uniform. The stage objects are detached and deleted once
    /// the final link has succeeded.
    pub fn build(gl: &glow::Context, desc: &ProgramDesc) -> Result<Self, RenderError> {
        unsafe {
            let vertex = compile_stage(gl, &desc.vertex, glow::VERTEX_SHADER)?;
            let fragment = match compile_stage(gl, &desc.fragment, glow::FRAGMENT_SHADER) {
                Ok(fragment) => fragment,
                Err(e) => {
                    gl.delete_shader(vertex);
                    return Err(e);
                }
            };

            let program = gl.create_program().map_err(RenderError::Resource)?;
            gl.attach_shader(program, vertex);
            gl.attach_shader(program, fragment);

            // Initial link, before any slot bindings are in place.
            gl.link_program(program);
            check_link(gl, program, [vertex, fragment])?;

            for (slot, name) in desc.attributes {
                gl.bind_attrib_location(program, *slot, name);
            }
            for (slot, name) in desc.frag_outputs {
                gl.bind_frag_data_location(program, *slot, name);
            }

            // Final link: this is what activates the slot bindings above.
            gl.link_program(program);
            check_link(gl, program, [vertex, fragment])?;

            gl.detach_shader(program, vertex);
            gl.detach_shader(program, fragment);
            gl.delete_shader(vertex);
            gl.delete_shader(fragment);

            let mut uniforms = HashMap::with_capacity(desc.uniforms.len());
            for name in desc.uniforms {
                uniforms.insert(name.to_string(), gl.get_uniform_location(program, name));
            }

            Ok(Self { program, uniforms })
        }
    }

    /// Make this program the active one for subsequent draws and uploads.
    pub fn bind(&self, gl: &glow::Context) {
        unsafe { gl.use_program(Some(self.program)) };
    }

    /// True if the linked program resolved a real location for this uniform.
    pub fn has_uniform(&self, name: &str) -> bool {
        matches!(self.uniforms.get(name), Some(Some(_)))
    }

    fn location(&self, name: &str) -> Option<&glow::UniformLocation> {
        self.uniforms.get(name).and_then(|loc| loc.as_ref())
    }

    /// Upload a 4x4 matrix. No-op when the uniform resolved to the sentinel.
    ///
    /// The program must be bound.
    pub fn set_mat4(&self, gl: &glow::Context, name: &str, value: &glam::Mat4) {
        if let Some(loc) = self.location(name) {
            unsafe { gl.uniform_matrix_4_f32_slice(Some(loc), false, &value.to_cols_array()) };
        }
    }

    /// Upload a float scalar. No-op when the uniform resolved to the sentinel.
    ///
    /// The program must be bound.
    pub fn set_f32(&self, gl: &glow::Context, name: &str, value: f32) {
        if let Some(loc) = self.location(name) {
            unsafe { gl.uniform_1_f32(Some(loc), value) };
        }
    }

    /// Upload an integer (used for sampler texture units). No-op when the
    /// uniform resolved to the sentinel.
    ///
    /// The program must be bound.
    pub fn set_i32(&self, gl: &glow::Context, name: &str, value: i32) {
        if let Some(loc) = self.location(name) {
            unsafe { gl.uniform_1_i32(Some(loc), value) };
        }
    }

    /// Delete the program object. The handle must not be used afterwards.
    pub fn destroy(&self, gl: &glow::Context) {
        unsafe { gl.delete_program(self.program) };
    }
}

unsafe fn compile_stage(
    gl: &glow::Context,
    stage: &StageSource,
    kind: u32,
) -> Result<glow::Shader, RenderError> {
    unsafe {
        let shader = gl.create_shader(kind).map_err(RenderError::Resource)?;
        gl.shader_source(shader, stage.source);
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(RenderError::ShaderCompile {
                path: stage.label.to_string(),
                log,
            });
        }
        Ok(shader)
    }
}

/// Validate a link and, on failure, tear down the program together with
/// its still-attached stage objects before surfacing the linker log.
unsafe fn check_link(
    gl: &glow::Context,
    program: glow::Program,
    stages: [glow::Shader; 2],
) -> Result<(), RenderError> {
    unsafe {
        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            for stage in stages {
                gl.detach_shader(program, stage);
                gl.delete_shader(stage);
            }
            gl.delete_program(program);
            return Err(RenderError::ShaderLink(log));
        }
        Ok(())
    }
}
