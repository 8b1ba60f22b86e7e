//! Vulkan instance bring-up
//!
//! Creates the instance with the probe's fixed extension list. Instance
//! creation is the one driver call expected to fail in normal operation (no
//! ICD installed), so its failure is split into a distinguishable
//! incompatible-driver outcome instead of the abort path every other call
//! takes.

use ash::{vk, Entry, Instance};
use std::ffi::CString;

use crate::vulkan::{VulkanError, VulkanResult};

/// Load the Vulkan entry points from the system loader
pub fn load_entry() -> VulkanResult<Entry> {
    unsafe { Entry::load() }
        .map_err(|e| VulkanError::InitializationFailed(format!("Failed to load Vulkan: {e:?}")))
}

/// Vulkan instance wrapper with RAII cleanup
pub struct VulkanInstance {
    /// Vulkan entry point
    pub entry: Entry,
    /// Vulkan instance handle
    pub instance: Instance,
}

impl VulkanInstance {
    /// Create an instance enabling exactly the given extensions
    pub fn new(entry: Entry, app_name: &str, extensions: &[CString]) -> VulkanResult<Self> {
        let app_name_cstr = CString::new(app_name).unwrap();
        let engine_name_cstr = CString::new("PortabilityProbe").unwrap();
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(&engine_name_cstr)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let extension_ptrs: Vec<*const std::os::raw::c_char> =
            extensions.iter().map(|ext| ext.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs);

        let instance = unsafe {
            entry
                .create_instance(&create_info, None)
                .map_err(|result| match result {
                    vk::Result::ERROR_INCOMPATIBLE_DRIVER => VulkanError::IncompatibleDriver,
                    other => VulkanError::InstanceCreation(other),
                })?
        };
        log::info!("vkCreateInstance: extensions={}", extensions.len());

        Ok(Self { entry, instance })
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            self.instance.destroy_instance(None);
        }
        log::info!("vkDestroyInstance");
    }
}
