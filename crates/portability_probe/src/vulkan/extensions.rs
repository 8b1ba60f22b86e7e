//! Extension and feature catalogs
//!
//! Snapshots the extension sets a driver reports at instance and device scope
//! and answers membership queries. Matching is exact on name AND spec
//! revision: the probe targets one known revision of each extension, so a
//! different revision counts as absence. Enumeration uses ash's two-call
//! pattern, so driver-reported counts are never truncated.

use ash::extensions::khr::GetPhysicalDeviceProperties2;
use ash::{vk, Entry, Instance};
use std::ffi::CStr;

use crate::vulkan::{VulkanError, VulkanResult};

/// Spec revision of `VK_KHR_get_physical_device_properties2` the probe targets
pub const GET_PHYSICAL_DEVICE_PROPERTIES_2_REVISION: u32 = 2;

/// Spec revision of `VK_KHR_portability_subset` the probe targets
pub const PORTABILITY_SUBSET_REVISION: u32 = 1;

/// Immutable snapshot of the extensions reported for one scope
pub struct ExtensionCatalog {
    records: Vec<vk::ExtensionProperties>,
}

impl ExtensionCatalog {
    /// Query the instance-level extension set
    pub fn for_instance(entry: &Entry) -> VulkanResult<Self> {
        let records = unsafe {
            entry
                .enumerate_instance_extension_properties(None)
                .map_err(VulkanError::Api)?
        };
        log::info!("vkEnumerateInstanceExtensionProperties: count={}", records.len());
        Ok(Self { records })
    }

    /// Query the extension set of one physical device
    pub fn for_device(instance: &Instance, device: vk::PhysicalDevice) -> VulkanResult<Self> {
        let records = unsafe {
            instance
                .enumerate_device_extension_properties(device)
                .map_err(VulkanError::Api)?
        };
        log::info!("vkEnumerateDeviceExtensionProperties: count={}", records.len());
        Ok(Self { records })
    }

    /// Build a catalog from already-queried records
    pub fn from_records(records: Vec<vk::ExtensionProperties>) -> Self {
        Self { records }
    }

    /// Exact-match membership test on name and spec revision
    pub fn has(&self, name: &CStr, version: u32) -> bool {
        self.records
            .iter()
            .any(|record| record_name(record) == name && record.spec_version == version)
    }

    /// Name-only membership test
    ///
    /// Used for platform surface extensions whose revision the windowing
    /// collaborator does not report.
    pub fn contains(&self, name: &CStr) -> bool {
        self.records.iter().any(|record| record_name(record) == name)
    }

    /// Reported spec revision of a named extension, if present
    pub fn version_of(&self, name: &CStr) -> Option<u32> {
        self.records
            .iter()
            .find(|record| record_name(record) == name)
            .map(|record| record.spec_version)
    }

    /// Fail-fast gate for a mandatory extension at an exact revision
    pub fn require(&self, name: &CStr, version: u32) -> VulkanResult<()> {
        if self.has(name, version) {
            Ok(())
        } else {
            Err(VulkanError::MissingExtension {
                name: name.to_string_lossy().into_owned(),
                version,
            })
        }
    }

    /// Number of reported extensions
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the driver reported no extensions
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn record_name(record: &vk::ExtensionProperties) -> &CStr {
    // extension_name is a driver-written, NUL-terminated fixed array
    unsafe { CStr::from_ptr(record.extension_name.as_ptr()) }
}

/// Portability-subset limits and feature flags reported by the device
#[derive(Debug, Clone, Copy)]
pub struct PortabilitySubsetReport {
    /// Required alignment of vertex input binding strides
    pub min_vertex_input_binding_stride_alignment: u32,
    /// VkEvent support
    pub events: bool,
    /// Point polygon mode support
    pub point_polygons: bool,
    /// Separate front/back stencil reference values
    pub separate_stencil_mask_ref: bool,
    /// Triangle fan primitive topology support
    pub triangle_fans: bool,
}

impl PortabilitySubsetReport {
    /// Query the portability-subset property and feature chains
    ///
    /// Goes through the `VK_KHR_get_physical_device_properties2` entry points
    /// rather than the core 1.1 ones so a 1.0 instance stays sufficient.
    pub fn query(entry: &Entry, instance: &Instance, device: vk::PhysicalDevice) -> Self {
        let loader = GetPhysicalDeviceProperties2::new(entry, instance);

        let mut subset_properties = vk::PhysicalDevicePortabilitySubsetPropertiesKHR::default();
        {
            let mut properties = vk::PhysicalDeviceProperties2KHR::builder()
                .push_next(&mut subset_properties);
            unsafe { loader.get_physical_device_properties2(device, &mut properties) };
        }
        log::info!("vkGetPhysicalDeviceProperties2KHR");
        log::info!(
            "  minVertexInputBindingStrideAlignment = {}",
            subset_properties.min_vertex_input_binding_stride_alignment
        );

        let mut subset_features = vk::PhysicalDevicePortabilitySubsetFeaturesKHR::default();
        {
            let mut features =
                vk::PhysicalDeviceFeatures2KHR::builder().push_next(&mut subset_features);
            unsafe { loader.get_physical_device_features2(device, &mut features) };
        }
        log::info!("vkGetPhysicalDeviceFeatures2KHR");
        log::info!("  events = {}", subset_features.events);
        log::info!("  pointPolygons = {}", subset_features.point_polygons);
        log::info!("  separateStencilMaskRef = {}", subset_features.separate_stencil_mask_ref);
        log::info!("  triangleFans = {}", subset_features.triangle_fans);

        Self {
            min_vertex_input_binding_stride_alignment: subset_properties
                .min_vertex_input_binding_stride_alignment,
            events: subset_features.events != vk::FALSE,
            point_polygons: subset_features.point_polygons != vk::FALSE,
            separate_stencil_mask_ref: subset_features.separate_stencil_mask_ref != vk::FALSE,
            triangle_fans: subset_features.triangle_fans != vk::FALSE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, spec_version: u32) -> vk::ExtensionProperties {
        let mut extension_name = [0; vk::MAX_EXTENSION_NAME_SIZE];
        for (slot, byte) in extension_name.iter_mut().zip(name.bytes()) {
            *slot = byte as std::os::raw::c_char;
        }
        vk::ExtensionProperties {
            extension_name,
            spec_version,
        }
    }

    fn cstr(name: &'static str) -> &'static CStr {
        CStr::from_bytes_with_nul(name.as_bytes()).expect("nul-terminated literal")
    }

    #[test]
    fn has_requires_exact_name_and_revision() {
        let catalog = ExtensionCatalog::from_records(vec![
            record("VK_KHR_get_physical_device_properties2", 2),
            record("VK_KHR_portability_subset", 1),
        ]);

        let properties2 = cstr("VK_KHR_get_physical_device_properties2\0");
        assert!(catalog.has(properties2, 2));

        // A revision mismatch is absence, not a partial match.
        assert!(!catalog.has(properties2, 1));
        assert!(!catalog.has(cstr("VK_KHR_get_physical_device_properties\0"), 2));
    }

    #[test]
    fn contains_ignores_revision() {
        let catalog = ExtensionCatalog::from_records(vec![record("VK_KHR_win32_surface", 6)]);
        let name = cstr("VK_KHR_win32_surface\0");

        assert!(catalog.contains(name));
        assert_eq!(catalog.version_of(name), Some(6));
        assert_eq!(catalog.version_of(cstr("VK_EXT_metal_surface\0")), None);
    }

    #[test]
    fn require_reports_the_missing_revision() {
        let catalog = ExtensionCatalog::from_records(vec![record("VK_KHR_portability_subset", 2)]);
        let err = catalog
            .require(cstr("VK_KHR_portability_subset\0"), PORTABILITY_SUBSET_REVISION)
            .unwrap_err();

        match err {
            VulkanError::MissingExtension { name, version } => {
                assert_eq!(name, "VK_KHR_portability_subset");
                assert_eq!(version, PORTABILITY_SUBSET_REVISION);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_catalog_has_nothing() {
        let catalog = ExtensionCatalog::from_records(Vec::new());
        assert!(catalog.is_empty());
        assert!(!catalog.contains(cstr("VK_KHR_surface\0")));
    }
}
