//! Command pool and command buffer provisioning
//!
//! The probe allocates a pool for the selected queue family and a single
//! primary command buffer. Nothing is recorded or submitted; the allocation
//! succeeding against the chosen family is the property under test. The
//! buffer is freed explicitly before the pool goes away.

use ash::{vk, Device};

use crate::vulkan::{VulkanError, VulkanResult};

/// Command pool plus its one primary command buffer, with RAII cleanup
pub struct CommandContext {
    device: Device,
    pool: vk::CommandPool,
    buffer: vk::CommandBuffer,
}

impl CommandContext {
    /// Create the pool and allocate one primary command buffer
    pub fn new(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        let pool_info = vk::CommandPoolCreateInfo::builder().queue_family_index(queue_family_index);

        let pool = unsafe {
            device
                .create_command_pool(&pool_info, None)
                .map_err(VulkanError::Api)?
        };
        log::info!("vkCreateCommandPool: queue_family={queue_family_index}");

        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let buffers = unsafe {
            device
                .allocate_command_buffers(&alloc_info)
                .map_err(VulkanError::Api)?
        };
        log::info!("vkAllocateCommandBuffers: count={}", buffers.len());

        Ok(Self {
            device,
            pool,
            buffer: buffers[0],
        })
    }

    /// Command pool handle
    pub fn pool(&self) -> vk::CommandPool {
        self.pool
    }

    /// The primary command buffer
    pub fn buffer(&self) -> vk::CommandBuffer {
        self.buffer
    }
}

impl Drop for CommandContext {
    fn drop(&mut self) {
        unsafe {
            self.device.free_command_buffers(self.pool, &[self.buffer]);
            self.device.destroy_command_pool(self.pool, None);
        }
        log::info!("vkDestroyCommandPool");
    }
}
