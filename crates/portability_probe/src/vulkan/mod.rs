//! Vulkan driver boundary
//!
//! Everything that talks to the driver lives here: instance and device
//! bring-up, capability catalogs, the memory type resolver, surface
//! negotiation, and the provisioned resources themselves. Selection logic is
//! kept in plain functions over driver-reported tables so it can be exercised
//! without a device.

use ash::vk;
use thiserror::Error;

pub mod commands;
pub mod device;
pub mod extensions;
pub mod instance;
pub mod memory;
pub mod resources;
pub mod surface;
pub mod swapchain;

pub use commands::CommandContext;
pub use device::{select_queue_family, LogicalDevice, PhysicalDeviceInfo};
pub use extensions::{ExtensionCatalog, PortabilitySubsetReport};
pub use instance::VulkanInstance;
pub use memory::{find_memory_type, AllocationRequest, AshAllocator, DeviceAllocator};
pub use resources::{select_depth_tiling, DepthBuffer, UniformBuffer, DEPTH_FORMAT};
pub use surface::{negotiate, SurfaceSupport, SwapchainConfig};
pub use swapchain::Swapchain;

/// Vulkan-specific error types
///
/// Driver result codes are carried verbatim; there is no retry or translation
/// layer. A missing capability means the driver failed the probe.
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// No Vulkan ICD is installed or the loader rejected the instance
    #[error("cannot find a compatible Vulkan ICD")]
    IncompatibleDriver,

    /// Instance creation failed for a reason other than a missing ICD
    #[error("instance creation failed: {0:?}")]
    InstanceCreation(vk::Result),

    /// Vulkan library could not be loaded or initialized
    #[error("initialization failed: {0}")]
    InitializationFailed(String),

    /// A mandatory extension is absent or present at the wrong revision
    #[error("missing required extension {name} (revision {version})")]
    MissingExtension {
        /// Extension name as registered with Khronos
        name: String,
        /// Required spec revision; a different revision counts as absent
        version: u32,
    },

    /// A surface extension the window system needs is absent
    #[error("missing required surface extension {0}")]
    MissingSurfaceExtension(String),

    /// Physical device enumeration returned nothing
    #[error("no Vulkan adapter enumerated")]
    NoAdapter,

    /// No queue family satisfies the graphics + presentation predicate
    #[error("no eligible queue family")]
    NoSuitableQueueFamily,

    /// No memory type matches the allocation's bitmask and property flags
    #[error("no suitable memory type found")]
    NoSuitableMemoryType,

    /// The fixed depth format supports neither linear nor optimal tiling
    #[error("{0:?} unsupported for depth-stencil attachments")]
    UnsupportedDepthFormat(vk::Format),

    /// The surface reported no formats to negotiate with
    #[error("surface reported no formats")]
    NoSurfaceFormats,

    /// Invalid operation attempted
    #[error("invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },
}

impl VulkanError {
    /// Whether this failure terminates with a clean exit code instead of an
    /// abort: a missing/incompatible driver and the unsupported depth format
    /// are expected probe outcomes, everything else is a defect.
    pub fn is_clean_exit(&self) -> bool {
        matches!(
            self,
            Self::IncompatibleDriver | Self::InstanceCreation(_) | Self::UnsupportedDepthFormat(_)
        )
    }
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;
