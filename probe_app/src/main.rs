//! Portability probe application
//!
//! Drives a portability-subset Vulkan driver through the full provisioning
//! lifecycle and reports the outcome through the process exit code: 0 for a
//! clean run, -1 for an incompatible driver or unsupported depth format, and
//! an abort for any other driver defect.

use portability_probe::config::Config;
use portability_probe::window::{Headless, Window};
use portability_probe::{ProbeConfig, ProbeError, ProbeLifecycle, SurfaceMode};
use std::path::Path;
use std::process;

const CONFIG_PATH: &str = "probe.toml";

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("starting the portability test");

    let config = if Path::new(CONFIG_PATH).exists() {
        match ProbeConfig::load_from_file(CONFIG_PATH) {
            Ok(config) => config,
            Err(err) => panic!("failed to load {CONFIG_PATH}: {err}"),
        }
    } else {
        ProbeConfig::default()
    };

    match run(&config) {
        Ok(()) => log::info!("done."),
        Err(err) => match err.clean_exit_code() {
            Some(code) => {
                log::error!("{err}");
                process::exit(code);
            }
            // Anything else is a driver defect; abort loudly.
            None => panic!("portability probe failed: {err}"),
        },
    }
}

fn run(config: &ProbeConfig) -> Result<(), ProbeError> {
    let mut probe = ProbeLifecycle::new(config.clone());

    match config.surface_mode {
        SurfaceMode::Windowed => {
            let mut window = Window::new(&config.window, &config.app_name)?;
            probe.probe_capabilities(&mut window)?;
            drive(&mut probe)?;

            log::info!("polling...");
            while window.poll_events() {}
        }
        SurfaceMode::Headless => {
            probe.probe_capabilities(&mut Headless)?;
            drive(&mut probe)?;
        }
    }

    probe.teardown();
    Ok(())
}

fn drive(probe: &mut ProbeLifecycle) -> Result<(), ProbeError> {
    probe.select_device()?;
    probe.negotiate_surface()?;
    probe.provision_resources()?;
    probe.enter_idle()?;
    Ok(())
}
