//! The per-frame render loop: animate, base pass, lighting pass.
//!
//! Each frame walks a fixed sequence. Animation advances the rotation
//! angle and light distance. The base pass draws the scene and a ground
//! plane into the G-Buffer. The lighting pass shades a fullscreen quad
//! from the G-Buffer textures into the back buffer. Presenting the back
//! buffer is the window layer's job.

use std::path::{Path, PathBuf};

use glam::Mat4;
use glow::HasContext;

use crate::error::RenderError;
use crate::gbuffer::GBuffer;
use crate::geometry::{ScreenGeometry, SCREEN_MESH_VERTICES};
use crate::input::KeyAction;
use crate::scene::{Scene, SceneBindings};
use crate::shader::{ProgramDesc, ShaderProgram, StageSource};
use crate::texture::MaterialSlot;

const ANGLE_INCREMENT: f32 = 0.05;
const ANGLE_WRAP: f32 = 99333.0;
const ANGLE_KEY_STEP: f32 = 1.0;
const LIGHT_WRAP: f32 = 4.1415;
const LIGHT_KEY_STEP: f32 = 0.1;

const FOV_DEGREES: f32 = 45.0;
const NEAR_PLANE: f32 = 1.0;
const FAR_PLANE: f32 = 20.0;

/// Asset paths and animation tuning. Paths are resolved relative to the
/// working directory.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub scene_path: PathBuf,
    pub base_vertex_shader: PathBuf,
    pub base_fragment_shader: PathBuf,
    pub lighting_vertex_shader: PathBuf,
    pub lighting_fragment_shader: PathBuf,
    /// Per-frame light distance increment. Zero holds the light still;
    /// the arrow keys move it either way.
    pub light_drift: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scene_path: PathBuf::from("assets/scene.gltf"),
            base_vertex_shader: PathBuf::from("shaders/base_pass.vert"),
            base_fragment_shader: PathBuf::from("shaders/base_pass.frag"),
            lighting_vertex_shader: PathBuf::from("shaders/lighting_pass.vert"),
            lighting_fragment_shader: PathBuf::from("shaders/lighting_pass.frag"),
            light_drift: 0.0,
        }
    }
}

/// Which uniform a parameter change has to push before the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamUpdate {
    /// Nothing to push; the value is read during the next frame anyway.
    None,
    /// The light distance feeds the lighting program directly and is
    /// pushed as soon as the key is handled.
    LightDistance,
}

/// The two animated frame parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    pub angle: f32,
    pub light_distance: f32,
    pub light_drift: f32,
}

impl FrameParams {
    pub fn new(light_drift: f32) -> Self {
        Self {
            angle: 0.0,
            light_distance: 0.0,
            light_drift,
        }
    }

    /// Advances one frame. Both values wrap to zero past their bound
    /// rather than growing without limit.
    pub fn animate(&mut self) {
        self.angle = if self.angle > ANGLE_WRAP {
            0.0
        } else {
            self.angle + ANGLE_INCREMENT
        };
        self.light_distance = if self.light_distance > LIGHT_WRAP {
            0.0
        } else {
            self.light_distance + self.light_drift
        };
    }

    /// Applies a key action and reports which uniform push it requires.
    pub fn apply(&mut self, action: KeyAction) -> ParamUpdate {
        match action {
            KeyAction::RotateLeft => {
                self.angle -= ANGLE_KEY_STEP;
                ParamUpdate::None
            }
            KeyAction::RotateRight => {
                self.angle += ANGLE_KEY_STEP;
                ParamUpdate::None
            }
            KeyAction::LightNearer => {
                self.light_distance -= LIGHT_KEY_STEP;
                ParamUpdate::LightDistance
            }
            KeyAction::LightFarther => {
                self.light_distance += LIGHT_KEY_STEP;
                ParamUpdate::LightDistance
            }
            KeyAction::Quit => ParamUpdate::None,
        }
    }
}

/// Owns every GPU resource the two passes touch.
pub struct Renderer {
    base_pass: ShaderProgram,
    lighting_pass: ShaderProgram,
    gbuffer: GBuffer,
    scene: SceneBindings,
    geometry: ScreenGeometry,
    params: FrameParams,
    projection: Mat4,
}

impl Renderer {
    pub fn new(
        gl: &glow::Context,
        config: &RenderConfig,
        width: i32,
        height: i32,
    ) -> Result<Self, RenderError> {
        let base_pass = build_base_pass(
            gl,
            &config.base_vertex_shader,
            &config.base_fragment_shader,
        )?;
        let lighting_pass = build_lighting_pass(
            gl,
            &config.lighting_vertex_shader,
            &config.lighting_fragment_shader,
        )?;

        let scene_data = Scene::load(&config.scene_path)?;
        let scene = SceneBindings::bind(gl, &scene_data)?;

        let gbuffer = GBuffer::new(gl, width, height)?;
        let geometry = ScreenGeometry::new(gl, width as f32, height as f32)?;

        unsafe {
            gl.clear_color(0.0, 0.0, 0.0, 0.0);
            gl.clear_depth_f32(1.0);
            gl.enable(glow::DEPTH_TEST);
            gl.depth_func(glow::LEQUAL);
            gl.enable(glow::CULL_FACE);
            gl.cull_face(glow::BACK);
            gl.viewport(0, 0, width, height);
        }

        // Material and G-Buffer textures sit on fixed units for the whole
        // run; the sampler uniforms are set once here.
        scene.bind_material_units(gl);
        gbuffer.bind_sampling_units(gl);
        base_pass.bind(gl);
        for slot in MaterialSlot::ORDER {
            base_pass.set_i32(gl, slot.uniform_name(), slot.texture_unit() as i32);
        }
        lighting_pass.bind(gl);
        lighting_pass.set_i32(gl, "uColor", 1);
        lighting_pass.set_i32(gl, "uNormal", 2);
        lighting_pass.set_i32(gl, "uPosition", 3);

        let projection = projection_for(width, height);

        Ok(Self {
            base_pass,
            lighting_pass,
            gbuffer,
            scene,
            geometry,
            params: FrameParams::new(config.light_drift),
            projection,
        })
    }

    /// Renders one frame into the back buffer. The caller presents it.
    pub fn render(&mut self, gl: &glow::Context) {
        self.params.animate();

        self.lighting_pass.bind(gl);
        self.lighting_pass
            .set_f32(gl, "uLightDistance", self.params.light_distance);

        // Base pass: scene and ground plane into the G-Buffer.
        self.gbuffer.bind(gl);
        unsafe {
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            gl.enable(glow::DEPTH_TEST);
            gl.depth_func(glow::LESS);
            gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
        }
        self.base_pass.bind(gl);

        let model_view = scene_model_view(self.params.angle);
        self.set_model_view(gl, &model_view);
        self.scene.draw(gl);

        let model_view = plane_model_view();
        self.set_model_view(gl, &model_view);
        self.geometry.bind_plane(gl);
        unsafe { gl.draw_arrays(glow::TRIANGLES, 0, SCREEN_MESH_VERTICES) };

        // Lighting pass: fullscreen quad into the back buffer.
        GBuffer::unbind(gl);
        unsafe {
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            gl.disable(glow::DEPTH_TEST);
        }
        self.lighting_pass.bind(gl);
        self.lighting_pass.set_mat4(gl, "uPMatrix", &self.projection);
        self.geometry.bind_quad(gl);
        unsafe {
            gl.draw_arrays(glow::TRIANGLES, 0, SCREEN_MESH_VERTICES);
            gl.bind_vertex_array(None);
        }
    }

    /// Tracks a new output size: viewport, projection aspect, G-Buffer
    /// storage, and the pixel-space quad coordinates all follow it.
    pub fn resize(&mut self, gl: &glow::Context, width: i32, height: i32) -> Result<(), RenderError> {
        let (width, height) = clamp_extent(width, height);
        unsafe { gl.viewport(0, 0, width, height) };
        self.projection = projection_for(width, height);
        self.gbuffer.resize(gl, width, height)?;
        self.geometry.regenerate(gl, width as f32, height as f32)?;
        Ok(())
    }

    /// Handles a parameter key, pushing the light uniform right away so a
    /// held key is visible without waiting for the animation step.
    pub fn update_parameters(&mut self, gl: &glow::Context, action: KeyAction) {
        if self.params.apply(action) == ParamUpdate::LightDistance {
            self.lighting_pass.bind(gl);
            self.lighting_pass
                .set_f32(gl, "uLightDistance", self.params.light_distance);
        }
    }

    pub fn destroy(&self, gl: &glow::Context) {
        self.base_pass.destroy(gl);
        self.lighting_pass.destroy(gl);
        self.gbuffer.destroy(gl);
        self.scene.destroy(gl);
        self.geometry.destroy(gl);
    }

    fn set_model_view(&self, gl: &glow::Context, model_view: &Mat4) {
        let mvp = self.projection * *model_view;
        self.base_pass.set_mat4(gl, "uMVPMatrix", &mvp);
        self.base_pass.set_mat4(gl, "uModelViewMatrix", model_view);
    }
}

/// Minimized windows report a zero extent; GL attachments need at least
/// one pixel each way.
fn clamp_extent(width: i32, height: i32) -> (i32, i32) {
    (width.max(1), height.max(1))
}

fn projection_for(width: i32, height: i32) -> Mat4 {
    let aspect = width as f32 / height.max(1) as f32;
    Mat4::perspective_rh_gl(FOV_DEGREES.to_radians(), aspect, NEAR_PLANE, FAR_PLANE)
}

/// Spins the scene around the camera Y axis, offsets it, and shrinks it
/// into the frustum. The offset is in model units and the scale is applied
/// to the whole placed scene.
fn scene_model_view(angle_degrees: f32) -> Mat4 {
    Mat4::from_scale(glam::Vec3::splat(0.0075))
        * Mat4::from_translation(glam::vec3(-100.0, -200.0, -600.0))
        * Mat4::from_rotation_y(angle_degrees.to_radians())
}

fn plane_model_view() -> Mat4 {
    Mat4::from_translation(glam::vec3(0.0, -2.0, -5.0))
}

fn read_stage(path: &Path) -> Result<String, RenderError> {
    std::fs::read_to_string(path)
        .map_err(|e| RenderError::Context(format!("reading shader {}: {e}", path.display())))
}

fn build_base_pass(
    gl: &glow::Context,
    vertex_path: &Path,
    fragment_path: &Path,
) -> Result<ShaderProgram, RenderError> {
    let vertex = read_stage(vertex_path)?;
    let fragment = read_stage(fragment_path)?;
    ShaderProgram::build(
        gl,
        &ProgramDesc {
            vertex: StageSource {
                label: &vertex_path.to_string_lossy(),
                source: &vertex,
            },
            fragment: StageSource {
                label: &fragment_path.to_string_lossy(),
                source: &fragment,
            },
            attributes: &[(0, "inPosition"), (1, "inTexCoord"), (2, "inNormal")],
            frag_outputs: &[(0, "oColor"), (1, "oNormal"), (2, "oPosition")],
            uniforms: &[
                "uMVPMatrix",
                "uModelViewMatrix",
                "uTexture",
                "uNormalTexture",
                "uPBRTexture",
            ],
        },
    )
}

fn build_lighting_pass(
    gl: &glow::Context,
    vertex_path: &Path,
    fragment_path: &Path,
) -> Result<ShaderProgram, RenderError> {
    let vertex = read_stage(vertex_path)?;
    let fragment = read_stage(fragment_path)?;
    ShaderProgram::build(
        gl,
        &ProgramDesc {
            vertex: StageSource {
                label: &vertex_path.to_string_lossy(),
                source: &vertex,
            },
            fragment: StageSource {
                label: &fragment_path.to_string_lossy(),
                source: &fragment,
            },
            attributes: &[(0, "inPosition"), (1, "inTexcoord"), (2, "inTexcoord2")],
            frag_outputs: &[],
            uniforms: &["uColor", "uNormal", "uPosition", "uLightDistance", "uPMatrix"],
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_keys_step_the_angle() {
        let mut params = FrameParams::new(0.0);
        assert_eq!(params.apply(KeyAction::RotateLeft), ParamUpdate::None);
        assert_eq!(params.apply(KeyAction::RotateLeft), ParamUpdate::None);
        assert_eq!(params.angle, -2.0);
    }

    #[test]
    fn light_keys_step_the_distance_and_push() {
        let mut params = FrameParams::new(0.0);
        assert_eq!(
            params.apply(KeyAction::LightFarther),
            ParamUpdate::LightDistance
        );
        assert_eq!(
            params.apply(KeyAction::LightFarther),
            ParamUpdate::LightDistance
        );
        assert!((params.light_distance - 0.2).abs() < 1e-6);
        assert_eq!(
            params.apply(KeyAction::LightNearer),
            ParamUpdate::LightDistance
        );
        assert!((params.light_distance - 0.1).abs() < 1e-6);
    }

    #[test]
    fn angle_wraps_past_its_bound() {
        let mut params = FrameParams::new(0.0);
        params.angle = ANGLE_WRAP + 0.5;
        params.animate();
        assert_eq!(params.angle, 0.0);
    }

    #[test]
    fn angle_advances_per_frame() {
        let mut params = FrameParams::new(0.0);
        params.animate();
        params.animate();
        assert!((params.angle - 0.1).abs() < 1e-6);
    }

    #[test]
    fn light_drift_advances_and_wraps() {
        let mut params = FrameParams::new(1.0);
        params.animate();
        assert_eq!(params.light_distance, 1.0);
        params.light_distance = LIGHT_WRAP + 0.1;
        params.animate();
        assert_eq!(params.light_distance, 0.0);
    }

    #[test]
    fn missing_shader_error_names_the_file() {
        let err = read_stage(Path::new("shaders/does_not_exist.vert")).unwrap_err();
        assert!(err.to_string().contains("does_not_exist.vert"));
    }

    #[test]
    fn zero_extent_is_clamped_to_one_pixel() {
        assert_eq!(clamp_extent(0, 0), (1, 1));
        assert_eq!(clamp_extent(0, 720), (1, 720));
        assert_eq!(clamp_extent(1280, 0), (1280, 1));
        assert_eq!(clamp_extent(1280, 720), (1280, 720));
    }

    #[test]
    fn still_light_stays_put_through_animation() {
        let mut params = FrameParams::new(0.0);
        params.light_distance = 2.0;
        params.animate();
        assert_eq!(params.light_distance, 2.0);
    }
}
