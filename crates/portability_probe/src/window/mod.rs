//! Window and surface collaborator
//!
//! The probe only needs a platform window for one thing: a native handle the
//! surface-creation call accepts. GLFW carries the per-platform branching, so
//! the probe stays free of conditional compilation; the `SurfaceSource` trait
//! lets the headless build (and tests) stand in for a real window.

use ash::vk;
use thiserror::Error;

use crate::config::WindowConfig;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// The window could not be created
    #[error("Window creation failed")]
    CreationFailed,

    /// Any other GLFW-reported failure
    #[error("GLFW error: {0}")]
    GlfwError(String),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// Provider of the surface the probe negotiates against
///
/// Implemented by the real GLFW window and by the headless variant. Headless
/// reports no surface, which downgrades queue selection to graphics-only and
/// skips swapchain negotiation entirely.
pub trait SurfaceSource {
    /// Instance extensions the surface requires
    fn required_instance_extensions(&self) -> WindowResult<Vec<String>>;

    /// Create the surface, or `None` for surfaceless operation
    fn create_surface(&mut self, instance: vk::Instance) -> WindowResult<Option<vk::SurfaceKHR>>;
}

/// GLFW window wrapper with proper resource management
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl Window {
    /// Create the probe window at the configured position and size
    pub fn new(config: &WindowConfig, title: &str) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|_| WindowError::InitializationFailed)?;

        // Vulkan only; GLFW must not create a GL context
        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(false));

        let (mut window, events) = glfw
            .create_window(config.width, config.height, title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_pos(config.x, config.y);
        window.set_key_polling(true);
        window.set_close_polling(true);

        Ok(Self {
            glfw,
            window,
            events,
        })
    }

    /// Pump platform events
    ///
    /// Returns false once the user asked the window to close (close button or
    /// Escape), which is the probe's signal to start teardown.
    pub fn poll_events(&mut self) -> bool {
        self.glfw.poll_events();
        for (_, event) in glfw::flush_messages(&self.events) {
            if let glfw::WindowEvent::Key(glfw::Key::Escape, _, glfw::Action::Press, _) = event {
                self.window.set_should_close(true);
            }
        }
        !self.window.should_close()
    }

    /// Current framebuffer size in pixels
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width as u32, height as u32)
    }
}

impl SurfaceSource for Window {
    fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| WindowError::GlfwError("Failed to get required extensions".to_string()))
    }

    fn create_surface(&mut self, instance: vk::Instance) -> WindowResult<Option<vk::SurfaceKHR>> {
        let mut surface = vk::SurfaceKHR::null();
        let result = self
            .window
            .create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == vk::Result::SUCCESS {
            log::info!("vkCreateSurfaceKHR");
            Ok(Some(surface))
        } else {
            Err(WindowError::GlfwError(format!(
                "Failed to create Vulkan surface: {result:?}"
            )))
        }
    }
}

/// Surfaceless stand-in for platforms or harnesses without a window system
pub struct Headless;

impl SurfaceSource for Headless {
    fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        Ok(vec!["VK_KHR_surface".to_string()])
    }

    fn create_surface(&mut self, _instance: vk::Instance) -> WindowResult<Option<vk::SurfaceKHR>> {
        Ok(None)
    }
}
