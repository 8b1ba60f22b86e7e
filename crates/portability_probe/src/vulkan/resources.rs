//! Depth and uniform resource provisioning
//!
//! Every memory-bound resource follows the same three ordered steps: create
//! the logical resource, allocate memory sized to its reported requirements,
//! bind the allocation. The uniform buffer additionally receives its one
//! write (the probe transform) through a scoped map before binding.

use ash::vk;
use bytemuck::cast_slice;

use crate::foundation::math::Mat4;
use crate::vulkan::memory::{AllocationRequest, DeviceAllocator};
use crate::vulkan::VulkanResult;

/// The one depth format the probe validates
pub const DEPTH_FORMAT: vk::Format = vk::Format::D16_UNORM;

/// Two-tier tiling fallback for the depth attachment
///
/// LINEAR wins whenever linear tiling supports depth-stencil attachments,
/// regardless of optimal support; OPTIMAL is the fallback; neither means the
/// format is unusable and the probe fails. No alternate format is tried.
pub fn select_depth_tiling(properties: &vk::FormatProperties) -> Option<vk::ImageTiling> {
    if properties
        .linear_tiling_features
        .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
    {
        Some(vk::ImageTiling::LINEAR)
    } else if properties
        .optimal_tiling_features
        .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
    {
        Some(vk::ImageTiling::OPTIMAL)
    } else {
        None
    }
}

/// Depth image, its backing allocation, and its view
pub struct DepthBuffer<A: DeviceAllocator> {
    allocator: A,
    image: vk::Image,
    memory: vk::DeviceMemory,
    view: vk::ImageView,
}

impl<A: DeviceAllocator> DepthBuffer<A> {
    /// Provision the depth attachment at the given extent and tiling
    pub fn new(allocator: A, extent: vk::Extent2D, tiling: vk::ImageTiling) -> VulkanResult<Self> {
        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .format(DEPTH_FORMAT)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(tiling)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let image = allocator.create_image(&image_info)?;

        let requirements = allocator.image_memory_requirements(image);
        let memory = allocator.allocate(&AllocationRequest {
            size: requirements.size,
            type_bits: requirements.memory_type_bits,
            required_properties: vk::MemoryPropertyFlags::DEVICE_LOCAL,
        })?;

        allocator.bind_image_memory(image, memory)?;

        let view_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(DEPTH_FORMAT)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::R,
                g: vk::ComponentSwizzle::G,
                b: vk::ComponentSwizzle::B,
                a: vk::ComponentSwizzle::A,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::DEPTH,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        let view = allocator.create_image_view(&view_info)?;

        Ok(Self {
            allocator,
            image,
            memory,
            view,
        })
    }

    /// Image view handle
    pub fn view(&self) -> vk::ImageView {
        self.view
    }
}

impl<A: DeviceAllocator> Drop for DepthBuffer<A> {
    fn drop(&mut self) {
        self.allocator.destroy_image_view(self.view);
        self.allocator.destroy_image(self.image);
        self.allocator.free_memory(self.memory);
    }
}

/// Uniform buffer holding the probe's single transform matrix
pub struct UniformBuffer<A: DeviceAllocator> {
    allocator: A,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl<A: DeviceAllocator> std::fmt::Debug for UniformBuffer<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniformBuffer")
            .field("buffer", &self.buffer)
            .field("memory", &self.memory)
            .field("size", &self.size)
            .finish()
    }
}

impl<A: DeviceAllocator> UniformBuffer<A> {
    /// Provision the buffer and write the transform once
    ///
    /// The buffer is sized to exactly one 4x4 matrix. Host-visible, coherent
    /// memory is written through a scoped map, then bound; binding never
    /// precedes the allocation.
    pub fn new(allocator: A, transform: &Mat4) -> VulkanResult<Self> {
        let bytes: &[u8] = cast_slice(transform.as_slice());
        let size = bytes.len() as vk::DeviceSize;

        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(vk::BufferUsageFlags::UNIFORM_BUFFER)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = allocator.create_buffer(&buffer_info)?;

        let requirements = allocator.buffer_memory_requirements(buffer);
        let memory = allocator.allocate(&AllocationRequest {
            size: requirements.size,
            type_bits: requirements.memory_type_bits,
            required_properties: vk::MemoryPropertyFlags::HOST_VISIBLE
                | vk::MemoryPropertyFlags::HOST_COHERENT,
        })?;

        allocator.write_memory(memory, bytes)?;
        allocator.bind_buffer_memory(buffer, memory)?;

        Ok(Self {
            allocator,
            buffer,
            memory,
            size,
        })
    }

    /// Buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Buffer size in bytes
    pub const fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl<A: DeviceAllocator> Drop for UniformBuffer<A> {
    fn drop(&mut self) {
        self.allocator.destroy_buffer(self.buffer);
        self.allocator.free_memory(self.memory);
    }
}
