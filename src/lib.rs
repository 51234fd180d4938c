//! # peltast
//!
//! A small two-pass deferred renderer. The base pass rasterizes a glTF
//! scene and a ground plane into a G-Buffer of half-float rectangle
//! textures (color, normal, position, depth); the lighting pass shades a
//! fullscreen quad from those textures into the back buffer.
//!
//! [`app::App::run`] owns the window and event loop; everything under it
//! is plain OpenGL through [`glow`].

pub mod alert;
pub mod app;
pub mod error;
pub mod gbuffer;
pub mod geometry;
pub mod gpu;
pub mod input;
pub mod renderer;
pub mod scene;
pub mod shader;
pub mod texture;

pub use app::{App, AppConfig};
pub use error::RenderError;
pub use input::{KeyAction, KeyBindings};
pub use renderer::{RenderConfig, Renderer};
