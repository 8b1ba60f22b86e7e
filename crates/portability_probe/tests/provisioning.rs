//! Provisioning pipeline tests against a recording driver double
//!
//! The double implements the allocator seam, fabricates handles, and records
//! every call, so the create → allocate → bind ordering contract and the
//! reverse teardown discipline can be checked without a device.

use ash::vk;
use ash::vk::Handle;
use std::cell::RefCell;
use std::rc::Rc;

use portability_probe::foundation::math::probe_transform;
use portability_probe::vulkan::{
    find_memory_type, negotiate, select_depth_tiling, select_queue_family, AllocationRequest,
    DepthBuffer, DeviceAllocator, UniformBuffer, VulkanError, VulkanResult,
};
use portability_probe::{ProbeState, ResourceTag, TeardownStack};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    CreateImage,
    ImageRequirements,
    CreateImageView,
    CreateBuffer,
    BufferRequirements,
    Allocate { type_index: u32 },
    BindImage,
    BindBuffer,
    Write { len: usize },
    DestroyImage,
    DestroyImageView,
    DestroyBuffer,
    FreeMemory,
}

/// Recording allocator double over a fabricated memory type table
#[derive(Clone)]
struct MockDriver {
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    trace: Rc<RefCell<Vec<Call>>>,
    next_handle: Rc<RefCell<u64>>,
}

impl MockDriver {
    fn new(memory_properties: vk::PhysicalDeviceMemoryProperties) -> Self {
        Self {
            memory_properties,
            trace: Rc::new(RefCell::new(Vec::new())),
            next_handle: Rc::new(RefCell::new(1)),
        }
    }

    fn record(&self, call: Call) {
        self.trace.borrow_mut().push(call);
    }

    fn fresh_handle(&self) -> u64 {
        let mut next = self.next_handle.borrow_mut();
        let handle = *next;
        *next += 1;
        handle
    }

    fn trace(&self) -> Vec<Call> {
        self.trace.borrow().clone()
    }

    fn position(&self, call: &Call) -> usize {
        self.trace()
            .iter()
            .position(|c| c == call)
            .unwrap_or_else(|| panic!("{call:?} missing from trace"))
    }
}

impl DeviceAllocator for MockDriver {
    fn create_image(&self, _info: &vk::ImageCreateInfo) -> VulkanResult<vk::Image> {
        self.record(Call::CreateImage);
        Ok(vk::Image::from_raw(self.fresh_handle()))
    }

    fn image_memory_requirements(&self, _image: vk::Image) -> vk::MemoryRequirements {
        self.record(Call::ImageRequirements);
        vk::MemoryRequirements {
            size: 0x1000,
            alignment: 0x10,
            memory_type_bits: 0b11,
        }
    }

    fn create_image_view(&self, _info: &vk::ImageViewCreateInfo) -> VulkanResult<vk::ImageView> {
        self.record(Call::CreateImageView);
        Ok(vk::ImageView::from_raw(self.fresh_handle()))
    }

    fn create_buffer(&self, _info: &vk::BufferCreateInfo) -> VulkanResult<vk::Buffer> {
        self.record(Call::CreateBuffer);
        Ok(vk::Buffer::from_raw(self.fresh_handle()))
    }

    fn buffer_memory_requirements(&self, _buffer: vk::Buffer) -> vk::MemoryRequirements {
        self.record(Call::BufferRequirements);
        vk::MemoryRequirements {
            size: 64,
            alignment: 0x10,
            memory_type_bits: 0b11,
        }
    }

    fn allocate(&self, request: &AllocationRequest) -> VulkanResult<vk::DeviceMemory> {
        let type_index = find_memory_type(
            &self.memory_properties,
            request.type_bits,
            request.required_properties,
        )
        .ok_or(VulkanError::NoSuitableMemoryType)?;
        self.record(Call::Allocate { type_index });
        Ok(vk::DeviceMemory::from_raw(self.fresh_handle()))
    }

    fn bind_image_memory(&self, _image: vk::Image, _memory: vk::DeviceMemory) -> VulkanResult<()> {
        self.record(Call::BindImage);
        Ok(())
    }

    fn bind_buffer_memory(
        &self,
        _buffer: vk::Buffer,
        _memory: vk::DeviceMemory,
    ) -> VulkanResult<()> {
        self.record(Call::BindBuffer);
        Ok(())
    }

    fn write_memory(&self, _memory: vk::DeviceMemory, bytes: &[u8]) -> VulkanResult<()> {
        self.record(Call::Write { len: bytes.len() });
        Ok(())
    }

    fn destroy_image(&self, _image: vk::Image) {
        self.record(Call::DestroyImage);
    }

    fn destroy_image_view(&self, _view: vk::ImageView) {
        self.record(Call::DestroyImageView);
    }

    fn destroy_buffer(&self, _buffer: vk::Buffer) {
        self.record(Call::DestroyBuffer);
    }

    fn free_memory(&self, _memory: vk::DeviceMemory) {
        self.record(Call::FreeMemory);
    }
}

/// Type 0 is device-local, type 1 is host-visible and coherent
fn reference_memory_table() -> vk::PhysicalDeviceMemoryProperties {
    let mut properties = vk::PhysicalDeviceMemoryProperties {
        memory_type_count: 2,
        memory_heap_count: 1,
        ..Default::default()
    };
    properties.memory_types[0] = vk::MemoryType {
        property_flags: vk::MemoryPropertyFlags::DEVICE_LOCAL,
        heap_index: 0,
    };
    properties.memory_types[1] = vk::MemoryType {
        property_flags: vk::MemoryPropertyFlags::HOST_VISIBLE
            | vk::MemoryPropertyFlags::HOST_COHERENT,
        heap_index: 0,
    };
    properties
}

const EXTENT: vk::Extent2D = vk::Extent2D {
    width: 800,
    height: 600,
};

#[test]
fn depth_provisioning_creates_allocates_then_binds() {
    let driver = MockDriver::new(reference_memory_table());

    let depth = DepthBuffer::new(driver.clone(), EXTENT, vk::ImageTiling::LINEAR)
        .expect("depth provisioning");

    let create = driver.position(&Call::CreateImage);
    let requirements = driver.position(&Call::ImageRequirements);
    let allocate = driver.position(&Call::Allocate { type_index: 0 });
    let bind = driver.position(&Call::BindImage);
    let view = driver.position(&Call::CreateImageView);

    assert!(create < requirements);
    assert!(requirements < allocate);
    assert!(allocate < bind);
    assert!(bind < view);

    drop(depth);
}

#[test]
fn depth_allocation_resolves_the_device_local_type() {
    let driver = MockDriver::new(reference_memory_table());
    let _depth =
        DepthBuffer::new(driver.clone(), EXTENT, vk::ImageTiling::OPTIMAL).expect("depth");

    assert!(driver.trace().contains(&Call::Allocate { type_index: 0 }));
}

#[test]
fn uniform_provisioning_writes_the_matrix_before_binding() {
    let driver = MockDriver::new(reference_memory_table());

    let uniform =
        UniformBuffer::new(driver.clone(), &probe_transform()).expect("uniform provisioning");
    assert_eq!(uniform.size(), 64);

    let create = driver.position(&Call::CreateBuffer);
    let allocate = driver.position(&Call::Allocate { type_index: 1 });
    let write = driver.position(&Call::Write { len: 64 });
    let bind = driver.position(&Call::BindBuffer);

    assert!(create < allocate);
    assert!(allocate < write);
    assert!(write < bind);
}

#[test]
fn uniform_provisioning_fails_without_mappable_memory() {
    // Device-local only; nothing host-visible to write the matrix into.
    let mut table = reference_memory_table();
    table.memory_type_count = 1;

    let driver = MockDriver::new(table);
    let err = UniformBuffer::new(driver.clone(), &probe_transform()).unwrap_err();

    assert!(matches!(err, VulkanError::NoSuitableMemoryType));
    assert!(!driver.trace().contains(&Call::BindBuffer));
}

#[test]
fn depth_teardown_destroys_view_image_then_memory() {
    let driver = MockDriver::new(reference_memory_table());
    let depth = DepthBuffer::new(driver.clone(), EXTENT, vk::ImageTiling::LINEAR).expect("depth");

    let before = driver.trace().len();
    drop(depth);

    let destroyed: Vec<Call> = driver.trace().split_off(before);
    assert_eq!(
        destroyed,
        [Call::DestroyImageView, Call::DestroyImage, Call::FreeMemory]
    );
}

enum MockResource {
    Depth(DepthBuffer<MockDriver>),
    Uniform(UniformBuffer<MockDriver>),
}

#[test]
fn manifest_drains_resources_in_reverse_creation_order() {
    let driver = MockDriver::new(reference_memory_table());

    let mut manifest = TeardownStack::new();
    let depth = DepthBuffer::new(driver.clone(), EXTENT, vk::ImageTiling::LINEAR).expect("depth");
    manifest.record(ResourceTag::DepthBuffer, MockResource::Depth(depth));
    let uniform = UniformBuffer::new(driver.clone(), &probe_transform()).expect("uniform");
    manifest.record(ResourceTag::UniformBuffer, MockResource::Uniform(uniform));

    let provision_calls = driver.trace().len();

    let mut destroyed_tags = Vec::new();
    manifest.drain(|tag, resource| {
        destroyed_tags.push(tag);
        drop(resource);
    });

    assert_eq!(
        destroyed_tags,
        [ResourceTag::UniformBuffer, ResourceTag::DepthBuffer]
    );
    assert!(manifest.is_empty());

    // The uniform buffer's destruction must precede the depth buffer's.
    let destruction: Vec<Call> = driver.trace().split_off(provision_calls);
    assert_eq!(
        destruction,
        [
            Call::DestroyBuffer,
            Call::FreeMemory,
            Call::DestroyImageView,
            Call::DestroyImage,
            Call::FreeMemory,
        ]
    );
}

#[test]
fn end_to_end_mock_driver_reaches_destroyed_with_nothing_outstanding() {
    // One graphics+present queue family at index 0.
    let families = [vk::QueueFamilyProperties {
        queue_flags: vk::QueueFlags::GRAPHICS,
        queue_count: 1,
        ..Default::default()
    }];
    let queue_family = select_queue_family(&families, |_| Ok(true)).expect("queue family");
    assert_eq!(queue_family, 0);

    // Swapchain negotiation against fixed capabilities.
    let capabilities = vk::SurfaceCapabilitiesKHR {
        min_image_count: 2,
        current_extent: EXTENT,
        supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
        current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
        ..Default::default()
    };
    let formats = [vk::SurfaceFormatKHR {
        format: vk::Format::B8G8R8A8_UNORM,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    }];
    let config = negotiate(&capabilities, &formats, &[vk::PresentModeKHR::FIFO], EXTENT)
        .expect("negotiation");
    assert_eq!(config.image_count, 2);
    assert_eq!(config.present_mode, vk::PresentModeKHR::FIFO);

    // Depth tiling from reported format support.
    let format_properties = vk::FormatProperties {
        linear_tiling_features: vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
        ..Default::default()
    };
    let tiling = select_depth_tiling(&format_properties).expect("tiling");
    assert_eq!(tiling, vk::ImageTiling::LINEAR);

    // Provision depth and uniform through the mock driver.
    let driver = MockDriver::new(reference_memory_table());
    let mut manifest = TeardownStack::new();

    let depth = DepthBuffer::new(driver.clone(), config.extent, tiling).expect("depth");
    manifest.record(ResourceTag::DepthBuffer, MockResource::Depth(depth));
    let uniform = UniformBuffer::new(driver.clone(), &probe_transform()).expect("uniform");
    manifest.record(ResourceTag::UniformBuffer, MockResource::Uniform(uniform));

    assert_eq!(
        manifest.creation_order(),
        [ResourceTag::DepthBuffer, ResourceTag::UniformBuffer]
    );

    // The state machine traverses every stage exactly once and ends Destroyed.
    let mut state = ProbeState::Uninitialized;
    let mut visited = 1;
    while let Some(next) = state.next() {
        state = next;
        visited += 1;
    }
    assert_eq!(state, ProbeState::Destroyed);
    assert_eq!(visited, 8);

    let mut destroyed = Vec::new();
    manifest.drain(|tag, resource| {
        destroyed.push(tag);
        drop(resource);
    });
    assert_eq!(
        destroyed,
        [ResourceTag::UniformBuffer, ResourceTag::DepthBuffer]
    );
    assert!(manifest.is_empty());
}
