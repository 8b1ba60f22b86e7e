//! # Portability Probe
//!
//! A conformance probe for Vulkan portability-subset drivers.
//!
//! The probe walks a portability-constrained driver through the minimal
//! capability-gated provisioning pipeline a real application would need:
//! extension validation, adapter and queue family selection, swapchain
//! negotiation, depth/uniform resource provisioning, and command pool
//! allocation. Every resource it creates is recorded in a teardown manifest
//! and destroyed in exact reverse order, so a driver defect at any stage
//! leaves nothing dangling.
//!
//! This is a diagnostic tool for driver and runtime engineers, not a
//! rendering engine: nothing is drawn, nothing is submitted. A failure at
//! any step is treated as a driver or environment defect and surfaces
//! immediately.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use portability_probe::{ProbeConfig, ProbeLifecycle, window::Window};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     portability_probe::foundation::logging::init();
//!
//!     let config = ProbeConfig::default();
//!     let mut window = Window::new(&config.window, &config.app_name)?;
//!
//!     let mut probe = ProbeLifecycle::new(config);
//!     probe.probe_capabilities(&mut window)?;
//!     probe.select_device()?;
//!     probe.negotiate_surface()?;
//!     probe.provision_resources()?;
//!     probe.enter_idle()?;
//!     while window.poll_events() {}
//!     probe.teardown();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod manifest;
pub mod vulkan;
pub mod window;

mod lifecycle;

pub use config::{ProbeConfig, SurfaceMode, WindowConfig};
pub use lifecycle::{ProbeError, ProbeLifecycle, ProbeState};
pub use manifest::{ResourceTag, TeardownStack};
pub use vulkan::{VulkanError, VulkanResult};
