//! Windowed OpenGL context creation and presentation.
//!
//! Wraps the glutin display / surface / context trio behind one type so
//! the rest of the crate only sees a [`glow::Context`] and a handful of
//! window-shaped methods.

use std::num::NonZeroU32;

use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextApi, ContextAttributesBuilder, PossiblyCurrentContext, Version};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasWindowHandle;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

use crate::alert;
use crate::error::RenderError;

/// A window with a current OpenGL 3.3 core context on it.
pub struct GlContext {
    gl: glow::Context,
    context: PossiblyCurrentContext,
    surface: Surface<WindowSurface>,
    window: Window,
}

impl GlContext {
    /// Builds the window, picks a framebuffer config, creates and currents
    /// a 3.3 core context, and loads the GL function pointers.
    pub fn new(
        event_loop: &ActiveEventLoop,
        attributes: WindowAttributes,
    ) -> Result<Self, RenderError> {
        let template = ConfigTemplateBuilder::new().with_depth_size(24);
        let (window, config) = DisplayBuilder::new()
            .with_window_attributes(Some(attributes))
            .build(event_loop, template, |mut configs| {
                configs
                    .next()
                    .unwrap_or_else(|| alert::fatal("OpenGL", "no framebuffer configurations offered"))
            })
            .map_err(|e| RenderError::Context(format!("display creation failed: {e}")))?;
        let window = window
            .ok_or_else(|| RenderError::Context("display builder produced no window".into()))?;

        let raw_handle = window
            .window_handle()
            .map_err(|e| RenderError::Context(format!("window handle unavailable: {e}")))?
            .as_raw();

        let display = config.display();
        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .build(Some(raw_handle));
        let context = unsafe { display.create_context(&config, &context_attributes) }
            .map_err(|e| RenderError::Context(format!("context creation failed: {e}")))?;

        let surface_attributes = window
            .build_surface_attributes(SurfaceAttributesBuilder::new())
            .map_err(|e| RenderError::Context(format!("surface attributes failed: {e}")))?;
        let surface = unsafe { display.create_window_surface(&config, &surface_attributes) }
            .map_err(|e| RenderError::Context(format!("surface creation failed: {e}")))?;

        let context = context
            .make_current(&surface)
            .map_err(|e| RenderError::Context(format!("make current failed: {e}")))?;

        if let Some(interval) = NonZeroU32::new(1) {
            if let Err(e) = surface.set_swap_interval(&context, SwapInterval::Wait(interval)) {
                log::warn!("vsync unavailable: {e}");
            }
        }

        let gl = unsafe {
            glow::Context::from_loader_function_cstr(|name| display.get_proc_address(name).cast())
        };
        log::info!(
            "OpenGL context up: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        Ok(Self {
            gl,
            context,
            surface,
            window,
        })
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn width(&self) -> i32 {
        self.window.inner_size().width as i32
    }

    pub fn height(&self) -> i32 {
        self.window.inner_size().height as i32
    }

    /// Presents the back buffer.
    pub fn swap_buffers(&self) -> Result<(), RenderError> {
        self.surface
            .swap_buffers(&self.context)
            .map_err(|e| RenderError::Context(format!("swap failed: {e}")))
    }

    /// Resizes the GL surface to track the window. Zero dimensions (a
    /// minimized window on some platforms) are clamped to one pixel.
    pub fn resize(&self, width: u32, height: u32) {
        let width = NonZeroU32::new(width).unwrap_or(NonZeroU32::MIN);
        let height = NonZeroU32::new(height).unwrap_or(NonZeroU32::MIN);
        self.surface.resize(&self.context, width, height);
    }
}
