//! Configuration system

pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Window placement and size for the probe window
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowConfig {
    /// Horizontal position of the window's top-left corner
    pub x: i32,
    /// Vertical position of the window's top-left corner
    pub y: i32,
    /// Client area width in pixels
    pub width: u32,
    /// Client area height in pixels
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            x: 10,
            y: 10,
            width: 800,
            height: 600,
        }
    }
}

/// Whether the probe negotiates a presentable surface or runs headless
///
/// Headless mode reproduces the no-surface build of the probe: no surface is
/// created, queue selection skips the presentation check, and the swapchain
/// stage is bypassed entirely.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceMode {
    /// Create a window and negotiate a presentable swapchain
    #[default]
    Windowed,
    /// No surface, no swapchain; depth/uniform/command provisioning only
    Headless,
}

/// Top-level probe configuration
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ProbeConfig {
    /// Application name reported to the driver
    pub app_name: String,
    /// Surface negotiation mode
    pub surface_mode: SurfaceMode,
    /// Window placement used in windowed mode
    pub window: WindowConfig,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            app_name: "portability-probe".to_string(),
            surface_mode: SurfaceMode::default(),
            window: WindowConfig::default(),
        }
    }
}

impl Config for ProbeConfig {}
