//! G-Buffer allocation and render-target composition.
//!
//! The base pass writes per-pixel color, normal and position into three
//! half-float rectangle textures plus a 24-bit depth texture, all composed
//! into one framebuffer. The lighting pass samples the color attachments on
//! texture units 1-3.
//!
//! The framebuffer aggregates the textures without owning them separately:
//! [`GBuffer`] owns everything as one unit and rebuilds the whole set on
//! resize, so an attached texture can never outlive or lag the target that
//! references it.

use glow::HasContext;

use crate::error::RenderError;
use crate::texture::Texture;

/// The base pass writes all three color attachments simultaneously.
const DRAW_BUFFERS: [u32; 3] = [
    glow::COLOR_ATTACHMENT0,
    glow::COLOR_ATTACHMENT1,
    glow::COLOR_ATTACHMENT2,
];

/// The intermediate render target for the geometry pass.
pub struct GBuffer {
    color: Texture,
    normal: Texture,
    position: Texture,
    depth: Texture,
    framebuffer: glow::Framebuffer,
    width: i32,
    height: i32,
}

impl GBuffer {
    /// Allocate the attachment textures at exactly the output dimensions and
    /// compose them into a validated framebuffer.
    ///
    /// Any incompleteness (missing or mismatched attachment) is a fatal
    /// initialization error.
    pub fn new(gl: &glow::Context, width: i32, height: i32) -> Result<Self, RenderError> {
        let color = Texture::rect(gl, width, height, glow::RGBA, glow::RGBA16F, glow::HALF_FLOAT)?;
        let normal = Texture::rect(gl, width, height, glow::RGB, glow::RGBA16F, glow::HALF_FLOAT)?;
        let position =
            Texture::rect(gl, width, height, glow::RGB, glow::RGBA16F, glow::HALF_FLOAT)?;
        let depth = Texture::rect(
            gl,
            width,
            height,
            glow::DEPTH_COMPONENT,
            glow::DEPTH_COMPONENT24,
            glow::UNSIGNED_INT,
        )?;

        let framebuffer = compose(
            gl,
            &[
                (glow::COLOR_ATTACHMENT0, &color),
                (glow::COLOR_ATTACHMENT1, &normal),
                (glow::COLOR_ATTACHMENT2, &position),
                (glow::DEPTH_ATTACHMENT, &depth),
            ],
        )?;

        Ok(Self {
            color,
            normal,
            position,
            depth,
            framebuffer,
            width,
            height,
        })
    }

    /// Activate the G-Buffer as the draw target with all three color
    /// attachments enabled.
    pub fn bind(&self, gl: &glow::Context) {
        unsafe {
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(self.framebuffer));
            gl.draw_buffers(&DRAW_BUFFERS);
        }
    }

    /// Switch drawing back to the default framebuffer's back buffer.
    pub fn unbind(gl: &glow::Context) {
        unsafe {
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
            gl.draw_buffer(glow::BACK);
        }
    }

    /// Bind the color/normal/position attachments for sampling on texture
    /// units 1, 2 and 3 (where the lighting pass expects them).
    ///
    /// Called at init and again after every reallocation, since new texture
    /// objects replace the ones the units were holding.
    pub fn bind_sampling_units(&self, gl: &glow::Context) {
        unsafe {
            gl.active_texture(glow::TEXTURE1);
            gl.bind_texture(glow::TEXTURE_RECTANGLE, Some(self.color.raw));
            gl.active_texture(glow::TEXTURE2);
            gl.bind_texture(glow::TEXTURE_RECTANGLE, Some(self.normal.raw));
            gl.active_texture(glow::TEXTURE3);
            gl.bind_texture(glow::TEXTURE_RECTANGLE, Some(self.position.raw));
            gl.active_texture(glow::TEXTURE0);
        }
    }

    /// Reallocate the attachments and framebuffer for new output dimensions.
    ///
    /// A no-op when the dimensions are unchanged. The deferred textures must
    /// track the viewport exactly or the lighting pass samples stale,
    /// mis-sized data.
    pub fn resize(&mut self, gl: &glow::Context, width: i32, height: i32) -> Result<(), RenderError> {
        if width == self.width && height == self.height {
            return Ok(());
        }
        self.destroy(gl);
        *self = Self::new(gl, width, height)?;
        self.bind_sampling_units(gl);
        Ok(())
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Delete the framebuffer and every attachment texture. Handles must
    /// not be used afterwards.
    pub fn destroy(&self, gl: &glow::Context) {
        unsafe { gl.delete_framebuffer(self.framebuffer) };
        self.color.destroy(gl);
        self.normal.destroy(gl);
        self.position.destroy(gl);
        self.depth.destroy(gl);
    }
}

/// Build a framebuffer from (attachment slot, texture) pairs and validate
/// completeness.
fn compose(
    gl: &glow::Context,
    attachments: &[(u32, &Texture)],
) -> Result<glow::Framebuffer, RenderError> {
    unsafe {
        let framebuffer = gl.create_framebuffer().map_err(RenderError::Resource)?;
        gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(framebuffer));

        for (slot, texture) in attachments {
            gl.framebuffer_texture_2d(
                glow::DRAW_FRAMEBUFFER,
                *slot,
                glow::TEXTURE_RECTANGLE,
                Some(texture.raw),
                0,
            );
        }

        let status = gl.check_framebuffer_status(glow::DRAW_FRAMEBUFFER);
        gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);

        match status {
            glow::FRAMEBUFFER_COMPLETE => Ok(framebuffer),
            glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => {
                gl.delete_framebuffer(framebuffer);
                Err(RenderError::FramebufferIncomplete("incomplete attachment"))
            }
            glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => {
                gl.delete_framebuffer(framebuffer);
                Err(RenderError::FramebufferIncomplete("missing attachment"))
            }
            _ => {
                gl.delete_framebuffer(framebuffer);
                Err(RenderError::FramebufferIncomplete("unknown status"))
            }
        }
    }
}
