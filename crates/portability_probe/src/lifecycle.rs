//! Lifecycle coordination
//!
//! Owns the whole bring-up in order: capability probing, device selection,
//! surface negotiation, resource provisioning, idle, teardown. Every forward
//! transition is gated on the success of its component call. Resources are
//! recorded in the teardown manifest as they are created and destroyed in
//! exact reverse order, no matter how far provisioning got before a failure.

use ash::extensions::khr::Surface as SurfaceLoader;
use ash::vk;
use std::ffi::CString;
use thiserror::Error;

use crate::config::ProbeConfig;
use crate::foundation::math::probe_transform;
use crate::manifest::{ResourceTag, TeardownStack};
use crate::vulkan::extensions::{
    ExtensionCatalog, PortabilitySubsetReport, GET_PHYSICAL_DEVICE_PROPERTIES_2_REVISION,
    PORTABILITY_SUBSET_REVISION,
};
use crate::vulkan::instance::load_entry;
use crate::vulkan::{
    negotiate, select_depth_tiling, select_queue_family, AshAllocator, CommandContext, DepthBuffer,
    LogicalDevice, PhysicalDeviceInfo, Swapchain, SwapchainConfig, SurfaceSupport, UniformBuffer,
    VulkanError, VulkanInstance, DEPTH_FORMAT,
};
use crate::window::{SurfaceSource, WindowError};

/// Probe lifecycle errors
#[derive(Error, Debug)]
pub enum ProbeError {
    /// A driver call or capability check failed
    #[error(transparent)]
    Vulkan(#[from] VulkanError),

    /// The windowing collaborator failed
    #[error(transparent)]
    Window(#[from] WindowError),
}

impl ProbeError {
    /// Exit code for failures that terminate gracefully instead of aborting
    ///
    /// An incompatible/absent driver and the unsupported depth format are
    /// expected probe outcomes and exit with -1; anything else should abort.
    pub fn clean_exit_code(&self) -> Option<i32> {
        match self {
            Self::Vulkan(e) if e.is_clean_exit() => Some(-1),
            _ => None,
        }
    }
}

/// Lifecycle states, traversed strictly in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    /// Nothing touched yet
    Uninitialized,
    /// Instance created, extensions validated, surface (if any) created
    CapabilitiesProbed,
    /// Adapter, queue family, and logical device selected
    DeviceSelected,
    /// Swapchain configuration derived (or skipped headless)
    SurfaceNegotiated,
    /// All GPU resources created and recorded
    ResourcesProvisioned,
    /// Waiting on the platform event loop
    Idle,
    /// Manifest draining in reverse
    TearingDown,
    /// Everything destroyed
    Destroyed,
}

impl ProbeState {
    /// The state that follows this one, if any
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Uninitialized => Some(Self::CapabilitiesProbed),
            Self::CapabilitiesProbed => Some(Self::DeviceSelected),
            Self::DeviceSelected => Some(Self::SurfaceNegotiated),
            Self::SurfaceNegotiated => Some(Self::ResourcesProvisioned),
            Self::ResourcesProvisioned => Some(Self::Idle),
            Self::Idle => Some(Self::TearingDown),
            Self::TearingDown => Some(Self::Destroyed),
            Self::Destroyed => None,
        }
    }
}

/// One entry of the teardown manifest; dropping it destroys the resource
enum ProbeResource {
    Swapchain(Swapchain),
    Depth(DepthBuffer<AshAllocator>),
    Uniform(UniformBuffer<AshAllocator>),
    Commands(CommandContext),
}

/// Owns every driver object the probe creates and walks the state machine
pub struct ProbeLifecycle {
    config: ProbeConfig,
    state: ProbeState,
    resources: TeardownStack<ProbeResource>,
    swapchain_config: Option<SwapchainConfig>,
    queue_family_index: Option<u32>,
    portability: Option<PortabilitySubsetReport>,
    device: Option<LogicalDevice>,
    surface: Option<vk::SurfaceKHR>,
    surface_loader: Option<SurfaceLoader>,
    physical: Option<PhysicalDeviceInfo>,
    instance: Option<VulkanInstance>,
}

impl ProbeLifecycle {
    /// Create an uninitialized lifecycle for the given configuration
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            config,
            state: ProbeState::Uninitialized,
            resources: TeardownStack::new(),
            swapchain_config: None,
            queue_family_index: None,
            portability: None,
            device: None,
            surface: None,
            surface_loader: None,
            physical: None,
            instance: None,
        }
    }

    /// Current lifecycle state
    pub const fn state(&self) -> ProbeState {
        self.state
    }

    /// Number of live resources in the manifest
    pub fn outstanding_resources(&self) -> usize {
        self.resources.len()
    }

    /// Tags of live resources in creation order
    pub fn creation_order(&self) -> Vec<ResourceTag> {
        self.resources.creation_order()
    }

    /// Portability-subset report, once the device stage has run
    pub const fn portability_report(&self) -> Option<PortabilitySubsetReport> {
        self.portability
    }

    /// The negotiated swapchain configuration, if a surface exists
    pub const fn swapchain_config(&self) -> Option<SwapchainConfig> {
        self.swapchain_config
    }

    fn expect_state(&self, expected: ProbeState) -> Result<(), VulkanError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(VulkanError::InvalidOperation {
                reason: format!("expected state {expected:?}, currently {:?}", self.state),
            })
        }
    }

    fn instance_ref(&self) -> Result<&VulkanInstance, VulkanError> {
        self.instance.as_ref().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "instance not created".to_string(),
        })
    }

    fn physical_ref(&self) -> Result<&PhysicalDeviceInfo, VulkanError> {
        self.physical.as_ref().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "physical device not selected".to_string(),
        })
    }

    fn device_ref(&self) -> Result<&LogicalDevice, VulkanError> {
        self.device.as_ref().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "logical device not created".to_string(),
        })
    }

    /// Validate instance extensions, create the instance and the surface
    pub fn probe_capabilities(&mut self, source: &mut dyn SurfaceSource) -> Result<(), ProbeError> {
        self.expect_state(ProbeState::Uninitialized)?;

        let entry = load_entry()?;
        let catalog = ExtensionCatalog::for_instance(&entry)?;

        catalog.require(
            vk::KhrGetPhysicalDeviceProperties2Fn::name(),
            GET_PHYSICAL_DEVICE_PROPERTIES_2_REVISION,
        )?;

        let surface_extensions = source.required_instance_extensions()?;
        for name in &surface_extensions {
            let cname = CString::new(name.as_str()).unwrap();
            match catalog.version_of(&cname) {
                Some(revision) => log::info!("  surface extension {name} (revision {revision})"),
                None => {
                    return Err(VulkanError::MissingSurfaceExtension(name.clone()).into());
                }
            }
        }

        let mut extensions: Vec<CString> = surface_extensions
            .iter()
            .map(|name| CString::new(name.as_str()).unwrap())
            .collect();
        extensions.push(vk::KhrGetPhysicalDeviceProperties2Fn::name().to_owned());

        let instance = VulkanInstance::new(entry, &self.config.app_name, &extensions)?;

        let surface_loader = SurfaceLoader::new(&instance.entry, &instance.instance);
        let surface = source.create_surface(instance.instance.handle())?;

        self.instance = Some(instance);
        self.surface_loader = Some(surface_loader);
        self.surface = surface;
        self.state = ProbeState::CapabilitiesProbed;
        Ok(())
    }

    /// Select the adapter and queue family, create the logical device
    pub fn select_device(&mut self) -> Result<(), ProbeError> {
        self.expect_state(ProbeState::CapabilitiesProbed)?;

        let instance = self.instance_ref()?;
        let physical = PhysicalDeviceInfo::select(&instance.instance)?;

        let device_catalog = ExtensionCatalog::for_device(&instance.instance, physical.device)?;
        device_catalog.require(vk::KhrPortabilitySubsetFn::name(), PORTABILITY_SUBSET_REVISION)?;

        let portability =
            PortabilitySubsetReport::query(&instance.entry, &instance.instance, physical.device);

        let queue_family_index = match (self.surface_loader.as_ref(), self.surface) {
            (Some(loader), Some(surface)) => {
                select_queue_family(&physical.queue_families, |index| unsafe {
                    loader
                        .get_physical_device_surface_support(physical.device, index, surface)
                        .map_err(VulkanError::Api)
                })?
            }
            _ => select_queue_family(&physical.queue_families, |_| Ok(true))?,
        };
        log::info!("using queue family index {queue_family_index}");

        let device = LogicalDevice::new(&instance.instance, &physical, queue_family_index)?;

        self.physical = Some(physical);
        self.portability = Some(portability);
        self.queue_family_index = Some(queue_family_index);
        self.device = Some(device);
        self.state = ProbeState::DeviceSelected;
        Ok(())
    }

    /// Query surface support and derive the swapchain configuration
    pub fn negotiate_surface(&mut self) -> Result<(), ProbeError> {
        self.expect_state(ProbeState::DeviceSelected)?;

        if let (Some(loader), Some(surface)) = (self.surface_loader.as_ref(), self.surface) {
            let physical = self.physical_ref()?;
            let support = SurfaceSupport::query(loader, physical.device, surface)?;
            let fallback = vk::Extent2D {
                width: self.config.window.width,
                height: self.config.window.height,
            };
            let config = negotiate(
                &support.capabilities,
                &support.formats,
                &support.present_modes,
                fallback,
            )?;
            self.swapchain_config = Some(config);
        } else {
            log::info!("headless: skipping surface negotiation");
        }

        self.state = ProbeState::SurfaceNegotiated;
        Ok(())
    }

    /// Create the swapchain, depth buffer, uniform buffer, and command
    /// context, recording each in the manifest
    pub fn provision_resources(&mut self) -> Result<(), ProbeError> {
        self.expect_state(ProbeState::SurfaceNegotiated)?;

        let ash_instance = self.instance_ref()?.instance.clone();
        let (physical_device, memory_properties) = {
            let physical = self.physical_ref()?;
            (physical.device, physical.memory_properties)
        };
        let ash_device = self.device_ref()?.device.clone();

        if let (Some(config), Some(surface)) = (self.swapchain_config, self.surface) {
            let swapchain = Swapchain::new(&ash_instance, ash_device.clone(), surface, &config)?;
            self.resources
                .record(ResourceTag::Swapchain, ProbeResource::Swapchain(swapchain));
        }

        let format_properties = unsafe {
            ash_instance.get_physical_device_format_properties(physical_device, DEPTH_FORMAT)
        };
        log::info!(
            "vkGetPhysicalDeviceFormatProperties: linear={:?} optimal={:?}",
            format_properties.linear_tiling_features,
            format_properties.optimal_tiling_features
        );
        let tiling = select_depth_tiling(&format_properties)
            .ok_or(VulkanError::UnsupportedDepthFormat(DEPTH_FORMAT))?;

        let allocator = AshAllocator::new(ash_device.clone(), memory_properties);

        let depth_extent = self.swapchain_config.map_or(
            vk::Extent2D {
                width: self.config.window.width,
                height: self.config.window.height,
            },
            |config| config.extent,
        );
        let depth = DepthBuffer::new(allocator.clone(), depth_extent, tiling)?;
        self.resources
            .record(ResourceTag::DepthBuffer, ProbeResource::Depth(depth));

        let uniform = UniformBuffer::new(allocator, &probe_transform())?;
        self.resources
            .record(ResourceTag::UniformBuffer, ProbeResource::Uniform(uniform));

        let queue_family_index = self.queue_family_index.ok_or_else(|| {
            VulkanError::InvalidOperation {
                reason: "queue family not selected".to_string(),
            }
        })?;
        let commands = CommandContext::new(ash_device, queue_family_index)?;
        self.resources
            .record(ResourceTag::CommandContext, ProbeResource::Commands(commands));

        self.state = ProbeState::ResourcesProvisioned;
        Ok(())
    }

    /// Enter the idle state; the caller polls the event loop while idle
    pub fn enter_idle(&mut self) -> Result<(), ProbeError> {
        self.expect_state(ProbeState::ResourcesProvisioned)?;
        log::info!("provisioning complete; idle");
        self.state = ProbeState::Idle;
        Ok(())
    }

    /// Destroy everything in exact reverse creation order
    ///
    /// Callable from any state; a lifecycle that failed mid-pipeline tears
    /// down only what its manifest recorded. Idempotent.
    pub fn teardown(&mut self) {
        if self.state == ProbeState::Destroyed {
            return;
        }
        self.state = ProbeState::TearingDown;
        log::info!("tearing down {} resources", self.resources.len());

        self.resources.drain(|tag, resource| {
            log::info!("destroying {tag:?}");
            drop(resource);
        });

        if let Some(surface) = self.surface.take() {
            if let Some(loader) = self.surface_loader.as_ref() {
                unsafe { loader.destroy_surface(surface, None) };
                log::info!("vkDestroySurfaceKHR");
            }
        }
        self.surface_loader = None;
        self.device = None;
        self.physical = None;
        self.instance = None;

        self.state = ProbeState::Destroyed;
    }
}

impl Drop for ProbeLifecycle {
    fn drop(&mut self) {
        self.teardown();
    }
}
