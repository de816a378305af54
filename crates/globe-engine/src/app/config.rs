use std::path::PathBuf;

use crate::content::TerrainSettings;
use crate::runtime::DEFAULT_FRAMES_IN_FLIGHT;

/// Startup configuration of an [`Application`](super::Application).
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Enable the validation layer and route its messages to the log.
    pub debug_layer: bool,
    pub api_dump_layer: bool,

    /// `false` selects the immediate present mode.
    pub vsync: bool,

    /// JSON map description loaded at construction.
    pub map_file: Option<PathBuf>,
    /// Earth file imported when no `map_file` is given.
    pub earth_file: Option<PathBuf>,

    pub wireframe_overlay: bool,
    pub sky: bool,

    /// Multi-threaded recording. Changing it later goes through
    /// `Application::set_threading`.
    pub multithreaded: bool,

    pub terrain: TerrainSettings,
    pub frames_in_flight: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug_layer: false,
            api_dump_layer: false,
            vsync: true,
            map_file: None,
            earth_file: None,
            wireframe_overlay: false,
            sky: false,
            multithreaded: false,
            terrain: TerrainSettings::default(),
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
        }
    }
}
