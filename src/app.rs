//! Window lifecycle and event dispatch.
//!
//! The application starts `Pending` with its configuration and becomes
//! `Running` once winit delivers `resumed` and the GL context and renderer
//! exist. Any initialization failure is terminal and reported through a
//! blocking dialog.

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

use crate::alert;
use crate::error::RenderError;
use crate::gpu::GlContext;
use crate::input::{KeyAction, KeyBindings};
use crate::renderer::{RenderConfig, Renderer};

/// Window and renderer configuration, builder style.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub keys: KeyBindings,
    pub render: RenderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "peltast".into(),
            width: 1280,
            height: 720,
            keys: KeyBindings::default(),
            render: RenderConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_keys(mut self, keys: KeyBindings) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_render(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }
}

pub enum App {
    Pending {
        config: AppConfig,
    },
    Running {
        context: GlContext,
        renderer: Renderer,
        keys: KeyBindings,
    },
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        App::Pending { config }
    }

    /// Runs the event loop until the window closes or a quit key lands.
    pub fn run(config: AppConfig) -> Result<(), RenderError> {
        let event_loop = EventLoop::new()
            .map_err(|e| RenderError::Context(format!("event loop creation failed: {e}")))?;
        event_loop.set_control_flow(ControlFlow::Poll);
        let mut app = App::new(config);
        event_loop
            .run_app(&mut app)
            .map_err(|e| RenderError::Context(format!("event loop failed: {e}")))
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let App::Pending { config } = self else {
            return;
        };
        let config = std::mem::take(&mut *config);

        let attributes = Window::default_attributes()
            .with_title(&config.title)
            .with_inner_size(LogicalSize::new(config.width, config.height));

        let context = match GlContext::new(event_loop, attributes) {
            Ok(context) => context,
            Err(e) => alert::fatal("Initialization Error", &e.to_string()),
        };
        let renderer = match Renderer::new(
            context.gl(),
            &config.render,
            context.width(),
            context.height(),
        ) {
            Ok(renderer) => renderer,
            Err(e) => alert::fatal("Initialization Error", &e.to_string()),
        };

        context.window().request_redraw();
        *self = App::Running {
            context,
            renderer,
            keys: config.keys,
        };
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let App::Running {
            context,
            renderer,
            keys,
        } = self
        else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                renderer.destroy(context.gl());
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                context.resize(size.width, size.height);
                if let Err(e) =
                    renderer.resize(context.gl(), size.width as i32, size.height as i32)
                {
                    alert::fatal("Resize Error", &e.to_string());
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                match keys.action(code) {
                    Some(KeyAction::Quit) => {
                        renderer.destroy(context.gl());
                        event_loop.exit();
                    }
                    Some(action) => renderer.update_parameters(context.gl(), action),
                    None => {}
                }
            }
            WindowEvent::RedrawRequested => {
                renderer.render(context.gl());
                if let Err(e) = context.swap_buffers() {
                    log::warn!("present failed: {e}");
                }
                context.window().request_redraw();
            }
            _ => {}
        }
    }
}
