//! Surface negotiation
//!
//! Queries what the surface supports and derives the swapchain configuration
//! from a fixed, deterministic policy: minimum image count, first reported
//! format, FIFO presentation, opaque composition. The probe never hunts for a
//! "best" mode; it validates that the safe defaults work.

use ash::extensions::khr::Surface as SurfaceLoader;
use ash::vk;

use crate::vulkan::{VulkanError, VulkanResult};

/// Driver-reported surface capabilities, formats, and present modes
pub struct SurfaceSupport {
    /// Surface capability limits
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats, in driver order
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes, in driver order
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    /// Query everything the negotiator needs in one pass
    pub fn query(
        loader: &SurfaceLoader,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VulkanResult<Self> {
        let capabilities = unsafe {
            loader
                .get_physical_device_surface_capabilities(device, surface)
                .map_err(VulkanError::Api)?
        };
        log::info!("vkGetPhysicalDeviceSurfaceCapabilitiesKHR");

        let formats = unsafe {
            loader
                .get_physical_device_surface_formats(device, surface)
                .map_err(VulkanError::Api)?
        };
        log::info!("vkGetPhysicalDeviceSurfaceFormatsKHR: count={}", formats.len());

        let present_modes = unsafe {
            loader
                .get_physical_device_surface_present_modes(device, surface)
                .map_err(VulkanError::Api)?
        };
        log::info!("vkGetPhysicalDeviceSurfacePresentModesKHR: count={}", present_modes.len());

        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }
}

/// Concrete swapchain configuration derived from surface support
#[derive(Debug, Clone, Copy)]
pub struct SwapchainConfig {
    /// Number of swapchain images to request
    pub image_count: u32,
    /// Color format and color space
    pub format: vk::SurfaceFormatKHR,
    /// Image extent in pixels
    pub extent: vk::Extent2D,
    /// Transform applied at presentation
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    /// Alpha composition mode
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
    /// Presentation mode
    pub present_mode: vk::PresentModeKHR,
    /// Swapchain image usage
    pub image_usage: vk::ImageUsageFlags,
    /// Queue sharing mode
    pub sharing_mode: vk::SharingMode,
}

/// Derive the swapchain configuration
///
/// Fixed policy, not configurable:
/// - image count is the surface minimum (single in-flight acquire/present)
/// - the first reported format wins, no ranking
/// - the surface's current extent wins when it reports one; otherwise the
///   fallback extent clamped to the surface limits
/// - IDENTITY pre-transform when supported, else the current transform
/// - OPAQUE composition and FIFO presentation unconditionally
pub fn negotiate(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    formats: &[vk::SurfaceFormatKHR],
    present_modes: &[vk::PresentModeKHR],
    fallback_extent: vk::Extent2D,
) -> VulkanResult<SwapchainConfig> {
    let format = *formats.first().ok_or(VulkanError::NoSurfaceFormats)?;

    // Queried for diagnostics only; the choice below never consults them.
    log::debug!("surface reports {} present modes", present_modes.len());

    let extent = if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: fallback_extent.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: fallback_extent.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    };

    let pre_transform = if capabilities
        .supported_transforms
        .contains(vk::SurfaceTransformFlagsKHR::IDENTITY)
    {
        vk::SurfaceTransformFlagsKHR::IDENTITY
    } else {
        capabilities.current_transform
    };

    Ok(SwapchainConfig {
        image_count: capabilities.min_image_count,
        format,
        extent,
        pre_transform,
        composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
        present_mode: vk::PresentModeKHR::FIFO,
        image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
        sharing_mode: vk::SharingMode::EXCLUSIVE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capabilities() -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 8,
            current_extent: vk::Extent2D { width: 800, height: 600 },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
            supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY
                | vk::SurfaceTransformFlagsKHR::ROTATE_90,
            current_transform: vk::SurfaceTransformFlagsKHR::ROTATE_90,
            ..Default::default()
        }
    }

    fn formats() -> Vec<vk::SurfaceFormatKHR> {
        vec![
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ]
    }

    const FALLBACK: vk::Extent2D = vk::Extent2D { width: 800, height: 600 };

    #[test]
    fn derivation_is_fixed_and_deterministic() {
        let modes = [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO];
        let config = negotiate(&capabilities(), &formats(), &modes, FALLBACK).expect("config");

        assert_eq!(config.image_count, 2);
        assert_eq!(config.format.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!((config.extent.width, config.extent.height), (800, 600));
        assert_eq!(config.pre_transform, vk::SurfaceTransformFlagsKHR::IDENTITY);
        assert_eq!(config.composite_alpha, vk::CompositeAlphaFlagsKHR::OPAQUE);
        assert_eq!(config.present_mode, vk::PresentModeKHR::FIFO);
        assert_eq!(config.image_usage, vk::ImageUsageFlags::COLOR_ATTACHMENT);
        assert_eq!(config.sharing_mode, vk::SharingMode::EXCLUSIVE);
    }

    #[test]
    fn fifo_wins_even_when_mailbox_is_offered_first() {
        let modes = [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE];
        let config = negotiate(&capabilities(), &formats(), &modes, FALLBACK).expect("config");
        assert_eq!(config.present_mode, vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn current_transform_used_when_identity_unsupported() {
        let mut caps = capabilities();
        caps.supported_transforms = vk::SurfaceTransformFlagsKHR::ROTATE_90;
        caps.current_transform = vk::SurfaceTransformFlagsKHR::ROTATE_90;

        let config = negotiate(&caps, &formats(), &[], FALLBACK).expect("config");
        assert_eq!(config.pre_transform, vk::SurfaceTransformFlagsKHR::ROTATE_90);
    }

    #[test]
    fn unreported_extent_falls_back_to_clamped_window_size() {
        let mut caps = capabilities();
        caps.current_extent = vk::Extent2D { width: u32::MAX, height: u32::MAX };
        caps.max_image_extent = vk::Extent2D { width: 640, height: 480 };

        let config = negotiate(&caps, &formats(), &[], FALLBACK).expect("config");
        assert_eq!((config.extent.width, config.extent.height), (640, 480));
    }

    #[test]
    fn no_formats_is_fatal() {
        let err = negotiate(&capabilities(), &[], &[], FALLBACK).unwrap_err();
        assert!(matches!(err, VulkanError::NoSurfaceFormats));
    }
}
