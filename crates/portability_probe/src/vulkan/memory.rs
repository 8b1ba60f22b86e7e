//! Memory type resolution and the allocation seam
//!
//! `find_memory_type` is the probe's one real search algorithm: a first-fit,
//! ascending-index scan of the device's memory type table. Index order is the
//! tie-break; there is no scoring.
//!
//! `DeviceAllocator` is the seam between the resource provisioner and the
//! driver. Production code goes through `AshAllocator`; tests substitute a
//! recording double to check the create → allocate → bind ordering contract
//! without a device.

use ash::{vk, Device};

use crate::vulkan::{VulkanError, VulkanResult};

/// First-fit memory type scan
///
/// Returns the smallest index `i` such that bit `i` of `type_bits` is set and
/// the type's property flags contain every requested flag. `None` when the
/// table is exhausted without a hit.
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
) -> Option<u32> {
    for i in 0..memory_properties.memory_type_count {
        if (type_bits & (1 << i)) != 0
            && memory_properties.memory_types[i as usize]
                .property_flags
                .contains(required)
        {
            return Some(i);
        }
    }
    None
}

/// One resource's memory demand, derived from its requirements query
#[derive(Debug, Clone, Copy)]
pub struct AllocationRequest {
    /// Required allocation size in bytes
    pub size: vk::DeviceSize,
    /// Bitmask of memory type indices the resource accepts
    pub type_bits: u32,
    /// Property flags the chosen type must carry
    pub required_properties: vk::MemoryPropertyFlags,
}

/// Driver seam for memory-bound resource provisioning
///
/// Creation of a resource, allocation of its backing memory, and binding of
/// the two are three distinct calls so the ordering contract stays visible at
/// the seam.
pub trait DeviceAllocator {
    /// Create an image
    fn create_image(&self, info: &vk::ImageCreateInfo) -> VulkanResult<vk::Image>;
    /// Query an image's memory requirements
    fn image_memory_requirements(&self, image: vk::Image) -> vk::MemoryRequirements;
    /// Create an image view
    fn create_image_view(&self, info: &vk::ImageViewCreateInfo) -> VulkanResult<vk::ImageView>;
    /// Create a buffer
    fn create_buffer(&self, info: &vk::BufferCreateInfo) -> VulkanResult<vk::Buffer>;
    /// Query a buffer's memory requirements
    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements;
    /// Allocate backing memory, resolving the type through the table
    fn allocate(&self, request: &AllocationRequest) -> VulkanResult<vk::DeviceMemory>;
    /// Bind an allocation to an image
    fn bind_image_memory(&self, image: vk::Image, memory: vk::DeviceMemory) -> VulkanResult<()>;
    /// Bind an allocation to a buffer
    fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: vk::DeviceMemory) -> VulkanResult<()>;
    /// Write bytes into host-visible memory via a scoped map
    fn write_memory(&self, memory: vk::DeviceMemory, bytes: &[u8]) -> VulkanResult<()>;
    /// Destroy an image
    fn destroy_image(&self, image: vk::Image);
    /// Destroy an image view
    fn destroy_image_view(&self, view: vk::ImageView);
    /// Destroy a buffer
    fn destroy_buffer(&self, buffer: vk::Buffer);
    /// Free an allocation
    fn free_memory(&self, memory: vk::DeviceMemory);
}

/// Production allocator backed by a logical device
#[derive(Clone)]
pub struct AshAllocator {
    device: Device,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
}

impl AshAllocator {
    /// Wrap a device and its memory type table
    pub fn new(device: Device, memory_properties: vk::PhysicalDeviceMemoryProperties) -> Self {
        Self {
            device,
            memory_properties,
        }
    }
}

/// Scoped mapping of host-visible memory; unmaps on drop so the mapping can
/// never outlive the copy, whatever path leaves the scope.
struct MappedMemory<'a> {
    device: &'a Device,
    memory: vk::DeviceMemory,
    ptr: *mut std::ffi::c_void,
}

impl<'a> MappedMemory<'a> {
    fn map(device: &'a Device, memory: vk::DeviceMemory, size: vk::DeviceSize) -> VulkanResult<Self> {
        let ptr = unsafe {
            device
                .map_memory(memory, 0, size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)?
        };
        log::info!("vkMapMemory: size={size}");
        Ok(Self { device, memory, ptr })
    }
}

impl Drop for MappedMemory<'_> {
    fn drop(&mut self) {
        unsafe {
            self.device.unmap_memory(self.memory);
        }
        log::info!("vkUnmapMemory");
    }
}

impl DeviceAllocator for AshAllocator {
    fn create_image(&self, info: &vk::ImageCreateInfo) -> VulkanResult<vk::Image> {
        let image = unsafe { self.device.create_image(info, None).map_err(VulkanError::Api)? };
        log::info!("vkCreateImage");
        Ok(image)
    }

    fn image_memory_requirements(&self, image: vk::Image) -> vk::MemoryRequirements {
        let requirements = unsafe { self.device.get_image_memory_requirements(image) };
        log::info!(
            "vkGetImageMemoryRequirements: size={:#x} alignment={:#x} type_bits={:#x}",
            requirements.size,
            requirements.alignment,
            requirements.memory_type_bits
        );
        requirements
    }

    fn create_image_view(&self, info: &vk::ImageViewCreateInfo) -> VulkanResult<vk::ImageView> {
        let view = unsafe {
            self.device
                .create_image_view(info, None)
                .map_err(VulkanError::Api)?
        };
        log::info!("vkCreateImageView");
        Ok(view)
    }

    fn create_buffer(&self, info: &vk::BufferCreateInfo) -> VulkanResult<vk::Buffer> {
        let buffer = unsafe { self.device.create_buffer(info, None).map_err(VulkanError::Api)? };
        log::info!("vkCreateBuffer");
        Ok(buffer)
    }

    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
        let requirements = unsafe { self.device.get_buffer_memory_requirements(buffer) };
        log::info!(
            "vkGetBufferMemoryRequirements: size={:#x} type_bits={:#x}",
            requirements.size,
            requirements.memory_type_bits
        );
        requirements
    }

    fn allocate(&self, request: &AllocationRequest) -> VulkanResult<vk::DeviceMemory> {
        let memory_type_index = find_memory_type(
            &self.memory_properties,
            request.type_bits,
            request.required_properties,
        )
        .ok_or(VulkanError::NoSuitableMemoryType)?;

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(request.size)
            .memory_type_index(memory_type_index);

        let memory = unsafe {
            self.device
                .allocate_memory(&alloc_info, None)
                .map_err(VulkanError::Api)?
        };
        log::info!("vkAllocateMemory: size={} type_index={memory_type_index}", request.size);
        Ok(memory)
    }

    fn bind_image_memory(&self, image: vk::Image, memory: vk::DeviceMemory) -> VulkanResult<()> {
        unsafe {
            self.device
                .bind_image_memory(image, memory, 0)
                .map_err(VulkanError::Api)?;
        }
        log::info!("vkBindImageMemory");
        Ok(())
    }

    fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: vk::DeviceMemory) -> VulkanResult<()> {
        unsafe {
            self.device
                .bind_buffer_memory(buffer, memory, 0)
                .map_err(VulkanError::Api)?;
        }
        log::info!("vkBindBufferMemory");
        Ok(())
    }

    fn write_memory(&self, memory: vk::DeviceMemory, bytes: &[u8]) -> VulkanResult<()> {
        let mapping = MappedMemory::map(&self.device, memory, bytes.len() as vk::DeviceSize)?;
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), mapping.ptr.cast::<u8>(), bytes.len());
        }
        Ok(())
    }

    fn destroy_image(&self, image: vk::Image) {
        unsafe { self.device.destroy_image(image, None) };
        log::info!("vkDestroyImage");
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) };
        log::info!("vkDestroyImageView");
    }

    fn destroy_buffer(&self, buffer: vk::Buffer) {
        unsafe { self.device.destroy_buffer(buffer, None) };
        log::info!("vkDestroyBuffer");
    }

    fn free_memory(&self, memory: vk::DeviceMemory) {
        unsafe { self.device.free_memory(memory, None) };
        log::info!("vkFreeMemory");
    }
}
