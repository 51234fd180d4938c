//! Crate-wide error type.
//!
//! Everything fallible during pipeline setup funnels into [`RenderError`].
//! Setup errors are fatal by design: the app layer surfaces them in a
//! blocking dialog and exits, so no partially-initialized pipeline ever
//! renders a frame. Per-frame draw calls do not report errors.

/// Errors that can occur while building or tearing down the render pipeline.
#[derive(Debug)]
pub enum RenderError {
    /// Window, display, surface or GL context creation failed.
    Context(String),
    /// A GL object (buffer, texture, program, ...) could not be allocated.
    Resource(String),
    /// A shader stage failed to compile; carries the compiler log.
    ShaderCompile { path: String, log: String },
    /// A program failed to link; carries the linker log.
    ShaderLink(String),
    /// The G-Buffer framebuffer did not validate as complete.
    FramebufferIncomplete(&'static str),
    /// The scene asset could not be imported.
    SceneImport(gltf::Error),
    /// The scene node hierarchy contains a cycle through this node index.
    SceneGraphCycle(usize),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Context(msg) => write!(f, "context creation failed: {}", msg),
            RenderError::Resource(msg) => write!(f, "GL resource allocation failed: {}", msg),
            RenderError::ShaderCompile { path, log } => {
                write!(f, "shader '{}' failed to compile: {}", path, log)
            }
            RenderError::ShaderLink(log) => write!(f, "program failed to link: {}", log),
            RenderError::FramebufferIncomplete(status) => {
                write!(f, "render target incomplete: {}", status)
            }
            RenderError::SceneImport(e) => write!(f, "scene import failed: {}", e),
            RenderError::SceneGraphCycle(node) => {
                write!(f, "scene graph cycle detected at node {}", node)
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::SceneImport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<gltf::Error> for RenderError {
    fn from(e: gltf::Error) -> Self {
        RenderError::SceneImport(e)
    }
}
