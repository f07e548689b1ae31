//! The binary entry point for the Vitalis viewer.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use vitalis_config::{CliArgs, Config};
use vitalis_viewer::Viewer;
use vitalis_viewer::frame_stats::FIXED_DT;
use vitalis_viewer::platform::PlatformDirs;

/// Frames between checks of `config.ron` for edits.
const RELOAD_INTERVAL_FRAMES: u32 = 300;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let dirs = match &args.config {
        Some(dir) => Ok(PlatformDirs::with_config_dir(dir)),
        None => PlatformDirs::resolve(),
    };
    let dirs = match dirs {
        Ok(dirs) => dirs,
        Err(e) => {
            eprintln!("Failed to resolve platform directories: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = dirs.create_all() {
        eprintln!("Failed to create platform directories: {e}");
        return ExitCode::FAILURE;
    }

    let mut base = Config::load_or_create(&dirs.config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {e}");
        Config::default()
    });
    let mut config = base.clone();
    config.apply_cli_overrides(&args);

    vitalis_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));
    info!("Config directory: {}", dirs.config_dir.display());
    info!("Log directory: {}", dirs.log_dir.display());

    if let Err(e) = config.validate() {
        error!("Invalid config: {e}");
        return ExitCode::FAILURE;
    }

    let mut viewer = match Viewer::new(&config) {
        Ok(viewer) => viewer,
        Err(e) => {
            error!("Failed to start viewer: {e}");
            return ExitCode::FAILURE;
        }
    };

    for frame in 1..=args.frames {
        viewer.step(FIXED_DT);

        if frame % RELOAD_INTERVAL_FRAMES == 0 {
            match base.reload(&dirs.config_dir) {
                Ok(Some(reloaded)) => {
                    let mut next = reloaded.clone();
                    next.apply_cli_overrides(&args);
                    match next.validate() {
                        Ok(()) => {
                            viewer.apply_config(&next);
                            base = reloaded;
                        }
                        Err(e) => warn!("Ignoring reloaded config: {e}"),
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Config reload failed: {e}"),
            }
        }
    }

    info!("Simulated {} frames ({:.1}s of tour)", args.frames, viewer.time());
    ExitCode::SUCCESS
}
