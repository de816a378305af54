use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use globe_engine::device::{Backend, HeadlessBackend};
use globe_engine::logging::{init_logging, LoggingConfig};
use globe_engine::{AppConfig, Application};

/// Desktop globe viewer.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Enable the GPU validation layer and log its messages.
    #[arg(long)]
    debug: bool,

    /// Request the API dump layer.
    #[arg(long)]
    api: bool,

    /// Present without waiting for vertical sync.
    #[arg(long)]
    novsync: bool,

    /// JSON map description to load.
    #[arg(long, value_name = "FILE")]
    map: Option<PathBuf>,

    /// Earth file to import when no --map is given.
    #[arg(long, value_name = "FILE")]
    earthfile: Option<PathBuf>,

    /// Draw the terrain wireframe overlay.
    #[arg(long)]
    wire: bool,

    /// Add the sky and atmosphere.
    #[arg(long)]
    sky: bool,

    /// Record command graphs on several threads.
    #[arg(long)]
    mt: bool,

    /// Log filter, `env_logger` syntax. Overrides RUST_LOG.
    #[arg(long, value_name = "FILTER")]
    log: Option<String>,

    /// Run this many frames without a GPU or windows, then exit.
    #[arg(long, value_name = "N")]
    headless_frames: Option<u64>,
}

impl Args {
    fn app_config(&self) -> AppConfig {
        AppConfig {
            debug_layer: self.debug,
            api_dump_layer: self.api,
            vsync: !self.novsync,
            map_file: self.map.clone(),
            earth_file: self.earthfile.clone(),
            wireframe_overlay: self.wire,
            sky: self.sky,
            multithreaded: self.mt,
            ..AppConfig::default()
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(LoggingConfig {
        env_filter: args.log.clone(),
        ..LoggingConfig::default()
    });

    let config = args.app_config();
    let mut app = match args.headless_frames {
        Some(frames) => headless_app(config, frames),
        None => match gpu_backend() {
            Ok(backend) => Application::new(config, backend),
            Err(e) => {
                log::error!("{e:#}");
                return ExitCode::FAILURE;
            }
        },
    };

    for line in app.about().lines() {
        log::info!("{line}");
    }

    let status = app.run();
    ExitCode::from(u8::try_from(status).unwrap_or(1))
}

/// Closes the only window after `frames` frames.
fn headless_app(config: AppConfig, frames: u64) -> Application {
    let backend = HeadlessBackend::new();
    let probe = backend.probe();
    let mut app = Application::new(config, Box::new(backend));

    let mut remaining = frames;
    app.set_update_function(move |app| {
        remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            for window in app.window_ids() {
                probe.request_close(window);
            }
        }
    });
    app
}

#[cfg(not(any(target_arch = "wasm32", target_os = "ios")))]
fn gpu_backend() -> anyhow::Result<Box<dyn Backend>> {
    use globe_engine::device::{WgpuBackend, WgpuConfig};

    Ok(Box::new(WgpuBackend::new(WgpuConfig::default())?))
}

#[cfg(any(target_arch = "wasm32", target_os = "ios"))]
fn gpu_backend() -> anyhow::Result<Box<dyn Backend>> {
    anyhow::bail!("no GPU backend on this platform; use --headless-frames")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_the_app_config() {
        let args = Args::parse_from([
            "globe-viewer",
            "--debug",
            "--novsync",
            "--wire",
            "--map",
            "world.json",
        ]);
        let config = args.app_config();
        assert!(config.debug_layer);
        assert!(!config.vsync);
        assert!(config.wireframe_overlay);
        assert!(!config.sky);
        assert_eq!(config.map_file, Some(PathBuf::from("world.json")));
    }

    #[test]
    fn headless_run_stops_after_the_requested_frames() {
        let mut app = headless_app(AppConfig::default(), 3);
        assert_eq!(app.run(), 0);
    }
}
