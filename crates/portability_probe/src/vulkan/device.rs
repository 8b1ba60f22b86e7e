//! Physical device and queue family selection, logical device bring-up
//!
//! The probe targets environments with exactly one adapter, so selection
//! takes the first enumerated device. Queue family choice is the first-fit
//! scan over the driver-reported descriptor table: the first family that is
//! graphics-capable and can present to the negotiated surface wins. Both
//! topologies are static per device, so a miss is fatal rather than retried.

use ash::{vk, Device, Instance};
use std::ffi::CStr;

use crate::vulkan::{VulkanError, VulkanResult};

/// Selected physical device and its capability snapshots
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle
    pub device: vk::PhysicalDevice,
    /// Device properties and limits
    pub properties: vk::PhysicalDeviceProperties,
    /// Queue family descriptor table, in driver order
    pub queue_families: Vec<vk::QueueFamilyProperties>,
    /// Memory type table snapshot
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
}

impl PhysicalDeviceInfo {
    /// Select the first enumerated adapter
    pub fn select(instance: &Instance) -> VulkanResult<Self> {
        let devices = unsafe {
            instance
                .enumerate_physical_devices()
                .map_err(VulkanError::Api)?
        };
        log::info!("vkEnumeratePhysicalDevices: count={}", devices.len());

        let device = *devices.first().ok_or(VulkanError::NoAdapter)?;

        let properties = unsafe { instance.get_physical_device_properties(device) };
        log::info!("  using adapter {}", unsafe {
            CStr::from_ptr(properties.device_name.as_ptr()).to_string_lossy()
        });

        let queue_families =
            unsafe { instance.get_physical_device_queue_family_properties(device) };
        log::info!("vkGetPhysicalDeviceQueueFamilyProperties: count={}", queue_families.len());

        let memory_properties = unsafe { instance.get_physical_device_memory_properties(device) };
        log::info!("vkGetPhysicalDeviceMemoryProperties: types={}", memory_properties.memory_type_count);

        Ok(Self {
            device,
            properties,
            queue_families,
            memory_properties,
        })
    }
}

/// First-fit queue family selection
///
/// Walks the descriptor table in index order and returns the first family
/// that has graphics capability and passes the presentation predicate. The
/// predicate is a callback so surface support stays a driver query in
/// production and a plain table in tests; a headless probe passes a predicate
/// that is always true.
pub fn select_queue_family(
    families: &[vk::QueueFamilyProperties],
    mut supports_present: impl FnMut(u32) -> VulkanResult<bool>,
) -> VulkanResult<u32> {
    for (index, family) in families.iter().enumerate() {
        let index = index as u32;
        if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) && supports_present(index)? {
            return Ok(index);
        }
    }
    Err(VulkanError::NoSuitableQueueFamily)
}

/// Logical device wrapper with RAII cleanup
pub struct LogicalDevice {
    /// Vulkan logical device handle
    pub device: Device,
    /// The single provisioned queue
    pub queue: vk::Queue,
    /// Queue family the device was created against
    pub queue_family_index: u32,
}

impl LogicalDevice {
    /// Create the logical device with one queue and the portability-subset
    /// extension enabled
    pub fn new(
        instance: &Instance,
        physical_device: &PhysicalDeviceInfo,
        queue_family_index: u32,
    ) -> VulkanResult<Self> {
        let queue_priorities = [0.0];
        let queue_info = vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(queue_family_index)
            .queue_priorities(&queue_priorities);

        let enabled_extensions = [vk::KhrPortabilitySubsetFn::name().as_ptr()];

        let queue_infos = [queue_info.build()];
        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&enabled_extensions);

        let device = unsafe {
            instance
                .create_device(physical_device.device, &create_info, None)
                .map_err(VulkanError::Api)?
        };
        log::info!("vkCreateDevice: queue_family={queue_family_index}");

        let queue = unsafe { device.get_device_queue(queue_family_index, 0) };

        Ok(Self {
            device,
            queue,
            queue_family_index,
        })
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            // All probe resources are destroyed before the device; the idle
            // wait guards against a driver still chewing on teardown work.
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
        log::info!("vkDestroyDevice");
    }
}
