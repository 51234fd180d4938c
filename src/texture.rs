//! GPU texture resources.
//!
//! Two kinds of textures live here: the empty rectangle textures backing the
//! G-Buffer attachments (pixel-addressed, clamp-to-edge) and the material
//! textures uploaded from decoded scene images (2D, repeating). Both are
//! owning value types destroyed exactly once by whichever component
//! allocated them.

use glow::HasContext;

use crate::error::RenderError;

/// A GPU-resident texture with its allocation dimensions.
///
/// The handle is valid only between creation and [`Texture::destroy`];
/// nothing reads or binds it after destruction.
pub struct Texture {
    pub raw: glow::Texture,
    pub width: i32,
    pub height: i32,
}

impl Texture {
    /// Allocate an empty rectangle texture.
    ///
    /// Used for the G-Buffer attachments: `channels` is the pixel channel
    /// layout (e.g. `glow::RGBA`), `internal_format` the storage format
    /// (e.g. `glow::RGBA16F`), `data_type` the sample type (e.g.
    /// `glow::HALF_FLOAT`). No pixel data is uploaded. Filtering is linear
    /// and coordinates clamp to the edge in both directions.
    pub fn rect(
        gl: &glow::Context,
        width: i32,
        height: i32,
        channels: u32,
        internal_format: u32,
        data_type: u32,
    ) -> Result<Self, RenderError> {
        unsafe {
            let raw = gl.create_texture().map_err(RenderError::Resource)?;
            gl.bind_texture(glow::TEXTURE_RECTANGLE, Some(raw));

            gl.tex_parameter_i32(
                glow::TEXTURE_RECTANGLE,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_RECTANGLE,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_RECTANGLE,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_RECTANGLE,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );

            gl.tex_image_2d(
                glow::TEXTURE_RECTANGLE,
                0,
                internal_format as i32,
                width,
                height,
                0,
                channels,
                data_type,
                glow::PixelUnpackData::Slice(None),
            );

            gl.bind_texture(glow::TEXTURE_RECTANGLE, None);

            Ok(Self { raw, width, height })
        }
    }

    /// Upload a decoded scene image as a repeating 2D material texture.
    ///
    /// Returns `Ok(None)` when the image's pixel format has no GL upload
    /// mapping (the caller reports that as a non-fatal warning and leaves
    /// the material slot empty).
    pub fn from_image(
        gl: &glow::Context,
        image: &gltf::image::Data,
    ) -> Result<Option<Self>, RenderError> {
        let Some((format, data_type)) = gl_pixel_format(image.format) else {
            return Ok(None);
        };

        unsafe {
            let raw = gl.create_texture().map_err(RenderError::Resource)?;
            gl.bind_texture(glow::TEXTURE_2D, Some(raw));

            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);

            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                image.width as i32,
                image.height as i32,
                0,
                format,
                data_type,
                glow::PixelUnpackData::Slice(Some(&image.pixels)),
            );

            gl.bind_texture(glow::TEXTURE_2D, None);

            Ok(Some(Self {
                raw,
                width: image.width as i32,
                height: image.height as i32,
            }))
        }
    }

    /// Delete the texture object. The handle must not be used afterwards.
    pub fn destroy(&self, gl: &glow::Context) {
        unsafe { gl.delete_texture(self.raw) };
    }
}

/// The material textures a mesh can carry, one scene image each.
///
/// [`MaterialSlot::ORDER`] is the assignment order for a scene's images:
/// the first image fills the diffuse slot, the second the PBR slot, the
/// third the normal-map slot. Each slot has a fixed texture unit and a
/// fixed base-pass sampler uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialSlot {
    Diffuse,
    Normal,
    Pbr,
}

impl MaterialSlot {
    /// Image-index to slot assignment order.
    pub const ORDER: [MaterialSlot; 3] =
        [MaterialSlot::Diffuse, MaterialSlot::Pbr, MaterialSlot::Normal];

    /// The texture unit this slot binds to. Units 1-3 are reserved for the
    /// G-Buffer rectangle textures, so materials use 0, 4 and 5.
    pub fn texture_unit(self) -> u32 {
        match self {
            MaterialSlot::Diffuse => 0,
            MaterialSlot::Normal => 4,
            MaterialSlot::Pbr => 5,
        }
    }

    /// The base-pass sampler uniform carrying this slot.
    pub fn uniform_name(self) -> &'static str {
        match self {
            MaterialSlot::Diffuse => "uTexture",
            MaterialSlot::Normal => "uNormalTexture",
            MaterialSlot::Pbr => "uPBRTexture",
        }
    }
}

/// Map a decoded image's channel layout to a GL upload (format, data type)
/// pair. Returns `None` for formats with no byte-wise GL mapping (float
/// formats), which callers treat as a non-fatal skip.
pub fn gl_pixel_format(format: gltf::image::Format) -> Option<(u32, u32)> {
    use gltf::image::Format;
    match format {
        Format::R8 => Some((glow::RED, glow::UNSIGNED_BYTE)),
        Format::R8G8 => Some((glow::RG, glow::UNSIGNED_BYTE)),
        Format::R8G8B8 => Some((glow::RGB, glow::UNSIGNED_BYTE)),
        Format::R8G8B8A8 => Some((glow::RGBA, glow::UNSIGNED_BYTE)),
        Format::R16 => Some((glow::RED, glow::UNSIGNED_SHORT)),
        Format::R16G16 => Some((glow::RG, glow::UNSIGNED_SHORT)),
        Format::R16G16B16 => Some((glow::RGB, glow::UNSIGNED_SHORT)),
        Format::R16G16B16A16 => Some((glow::RGBA, glow::UNSIGNED_SHORT)),
        Format::R32G32B32FLOAT | Format::R32G32B32A32FLOAT => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_format_lookup_covers_byte_formats() {
        use gltf::image::Format;
        assert_eq!(
            gl_pixel_format(Format::R8G8B8A8),
            Some((glow::RGBA, glow::UNSIGNED_BYTE))
        );
        assert_eq!(
            gl_pixel_format(Format::R8G8B8),
            Some((glow::RGB, glow::UNSIGNED_BYTE))
        );
        assert_eq!(
            gl_pixel_format(Format::R16),
            Some((glow::RED, glow::UNSIGNED_SHORT))
        );
    }

    #[test]
    fn pixel_format_lookup_rejects_float_formats() {
        use gltf::image::Format;
        assert_eq!(gl_pixel_format(Format::R32G32B32FLOAT), None);
        assert_eq!(gl_pixel_format(Format::R32G32B32A32FLOAT), None);
    }

    #[test]
    fn material_slot_order_assigns_distinct_units() {
        let units: Vec<u32> = MaterialSlot::ORDER
            .iter()
            .map(|s| s.texture_unit())
            .collect();
        assert_eq!(units, vec![0, 5, 4]);
    }
}
