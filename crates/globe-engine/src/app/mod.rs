//! The application shell.
//!
//! [`Application`] owns everything: the backend, the viewer, the runtime, the
//! scene and the window/view tables. Construction order:
//! 1. scene root with the main scene under it
//! 2. sky (optional), map node, shader defines, map data
//! 3. ECS systems group, last in the main scene
//!
//! Windows and views are added through [`Application::add_window`] and
//! [`Application::add_view`]. Before the first frame those run inline; once
//! the viewer is realized they are deferred to the frame loop's safe point
//! and report completion through a [`Future`](crate::util::Future).
//!
//! Teardown is plain drop order: the viewer and backend go last, after the
//! tables holding render graphs and views.

mod config;
mod frame;
mod manip;
mod view;
mod window;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::content::{read_map_file, sky_node, EarthFileImporter, MapNode, SystemsGroup};
use crate::device::{Backend, DeviceId, WindowId, WindowTraits};
use crate::display::DisplayConfiguration;
use crate::graph::{CommandGraph, RenderGraphId};
use crate::runtime::{Runtime, UpdateQueue};
use crate::scene::{Node, NodeRef};
use crate::time::FrameStats;
use crate::util::sync::write;
use crate::view::ViewId;
use crate::viewer::Viewer;

pub use config::AppConfig;
pub use frame::LoopState;
pub use view::OnCreate;

/// Always defined: lighting is resolved from the light count in shaders.
pub const LIGHTING_DEFINE: &str = "LIGHTING";
pub const WIREFRAME_OVERLAY_DEFINE: &str = "WIREFRAME_OVERLAY";

/// Per-frame user callback, run after the system updates.
pub type UpdateFunction = Box<dyn FnMut(&mut Application)>;

struct WindowRecord {
    traits: WindowTraits,
    device: DeviceId,
    command_graph: CommandGraph,
}

#[derive(Debug, Copy, Clone)]
struct ViewData {
    window: WindowId,
    render_graph: RenderGraphId,
}

pub struct Application {
    // Tables first: render graphs and views drop before the device.
    windows: BTreeMap<WindowId, WindowRecord>,
    display: DisplayConfiguration,
    view_data: HashMap<ViewId, ViewData>,
    next_window: u32,

    root: NodeRef,
    main_scene: NodeRef,
    map_node: MapNode,
    sky: Option<NodeRef>,
    systems: SystemsGroup,

    realized: bool,
    dirty: bool,
    update_function: Option<UpdateFunction>,
    stats: FrameStats,
    rebuilds: usize,

    config: AppConfig,
    runtime: Runtime,
    viewer: Viewer,
    backend: Box<dyn Backend>,
}

impl Application {
    pub fn new(config: AppConfig, backend: Box<dyn Backend>) -> Self {
        Self::with_importer(config, backend, None)
    }

    /// Like [`Application::new`], with an importer for `config.earth_file`.
    pub fn with_importer(
        config: AppConfig,
        backend: Box<dyn Backend>,
        importer: Option<&dyn EarthFileImporter>,
    ) -> Self {
        let root = Node::group();
        let main_scene = Node::group();
        write(&root).add_child(Arc::clone(&main_scene));

        let mut runtime = Runtime::new(config.frames_in_flight);
        let mut map_node = MapNode::new(config.terrain.clone());

        let sky = config.sky.then(|| {
            let sky = sky_node();
            write(&main_scene).add_child(Arc::clone(&sky));
            sky
        });

        if config.wireframe_overlay {
            runtime.define(WIREFRAME_OVERLAY_DEFINE);
        }

        write(&main_scene).add_child(Arc::clone(map_node.node()));
        runtime.define(LIGHTING_DEFINE);

        load_map(&mut map_node, &config, importer);

        let systems = SystemsGroup::new();
        write(&main_scene).add_child(Arc::clone(systems.node()));

        let viewer = Viewer::new(config.multithreaded);
        log::debug!("application created on the {} backend", backend.name());

        Self {
            windows: BTreeMap::new(),
            display: DisplayConfiguration::default(),
            view_data: HashMap::new(),
            next_window: 1,
            root,
            main_scene,
            map_node,
            sky,
            systems,
            realized: false,
            dirty: false,
            update_function: None,
            stats: FrameStats::default(),
            rebuilds: 0,
            config,
            runtime,
            viewer,
            backend,
        }
    }

    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Scene root; views added without children render it.
    #[inline]
    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    /// Scene shown by the default view of every window.
    #[inline]
    pub fn main_scene(&self) -> &NodeRef {
        &self.main_scene
    }

    #[inline]
    pub fn map_node(&self) -> &MapNode {
        &self.map_node
    }

    #[inline]
    pub fn map_node_mut(&mut self) -> &mut MapNode {
        &mut self.map_node
    }

    #[inline]
    pub fn sky(&self) -> Option<&NodeRef> {
        self.sky.as_ref()
    }

    #[inline]
    pub fn systems_mut(&mut self) -> &mut SystemsGroup {
        &mut self.systems
    }

    #[inline]
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    #[inline]
    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.runtime
    }

    /// Handle for scheduling structural changes from any thread.
    pub fn update_queue(&self) -> UpdateQueue {
        self.runtime.queue()
    }

    #[inline]
    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    #[inline]
    pub fn display(&self) -> &DisplayConfiguration {
        &self.display
    }

    pub fn window_ids(&self) -> Vec<WindowId> {
        self.windows.keys().copied().collect()
    }

    /// Traits a window was created with, after the application applied its
    /// own requirements.
    pub fn window_traits(&self, window: WindowId) -> Option<&WindowTraits> {
        self.windows.get(&window).map(|w| &w.traits)
    }

    #[inline]
    pub fn is_realized(&self) -> bool {
        self.realized
    }

    /// Timings of the last frame that recorded and presented.
    #[inline]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// How many times the viewer was rebuilt.
    #[inline]
    pub fn viewer_rebuilds(&self) -> usize {
        self.rebuilds
    }

    pub fn set_update_function(&mut self, f: impl FnMut(&mut Application) + 'static) {
        self.update_function = Some(Box::new(f));
    }

    /// Components and versions, one per line.
    pub fn about(&self) -> String {
        let defines: Vec<&str> = self.runtime.defines().iter().map(String::as_str).collect();
        let mut lines = vec![
            format!("globe-engine {}", env!("CARGO_PKG_VERSION")),
            format!("backend: {}", self.backend.name()),
            format!("shader defines: {}", defines.join(" ")),
        ];
        if let Some(name) = &self.map_node.map.name {
            lines.push(format!("map: {name} ({} layers)", self.map_node.map.layer_count()));
        }
        lines.join("\n")
    }
}

fn load_map(map_node: &mut MapNode, config: &AppConfig, importer: Option<&dyn EarthFileImporter>) {
    if let Some(path) = &config.map_file {
        match read_map_file(path).and_then(|value| map_node.map.from_json(&value)) {
            Ok(n) => log::info!("loaded {n} layers from \"{}\"", path.display()),
            Err(e) => log::warn!("Failed to read map from \"{}\": {e:#}", path.display()),
        }
    } else if let Some(path) = &config.earth_file {
        let Some(importer) = importer else {
            log::warn!("no earth file importer installed; \"{}\" ignored", path.display());
            return;
        };
        match importer.read(path) {
            Ok(value) => match map_node.map.from_json(&value) {
                Ok(0) => log::warn!("Unable to import any layers from the earth file"),
                Ok(n) => log::info!("imported {n} layers from \"{}\"", path.display()),
                Err(e) => log::warn!("earth file import produced an invalid map: {e:#}"),
            },
            Err(e) => log::warn!("Failed to read earth file - {e:#}"),
        }
    }
}

#[cfg(test)]
pub(crate) fn headless_app(config: AppConfig) -> (Application, crate::device::HeadlessProbe) {
    let backend = crate::device::HeadlessBackend::new();
    let probe = backend.probe();
    (Application::new(config, Box::new(backend)), probe)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use serde_json::{json, Value};

    use super::*;
    use crate::util::sync::read;

    struct FixedImporter(Value);

    impl EarthFileImporter for FixedImporter {
        fn read(&self, _path: &Path) -> anyhow::Result<Value> {
            Ok(self.0.clone())
        }
    }

    struct FailingImporter;

    impl EarthFileImporter for FailingImporter {
        fn read(&self, path: &Path) -> anyhow::Result<Value> {
            anyhow::bail!("cannot parse {}", path.display())
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("globe-app-{}-{name}", std::process::id()))
    }

    // ── scene construction ───────────────────────────────────────────────

    #[test]
    fn scene_is_built_in_order() {
        let config = AppConfig {
            sky: true,
            ..AppConfig::default()
        };
        let (app, _) = headless_app(config);

        let root = read(app.root());
        assert_eq!(root.children().len(), 1);
        assert!(Arc::ptr_eq(&root.children()[0], app.main_scene()));

        let scene = read(app.main_scene());
        let children = scene.children();
        assert_eq!(children.len(), 3);
        assert!(Arc::ptr_eq(&children[0], app.sky().unwrap()));
        assert!(Arc::ptr_eq(&children[1], app.map_node().node()));
        assert!(Arc::ptr_eq(&children[2], app.systems.node()));
    }

    #[test]
    fn no_sky_unless_asked() {
        let (app, _) = headless_app(AppConfig::default());
        assert!(app.sky().is_none());
        assert_eq!(read(app.main_scene()).children().len(), 2);
    }

    #[test]
    fn lighting_is_always_defined() {
        let (app, _) = headless_app(AppConfig::default());
        assert!(app.runtime().is_defined(LIGHTING_DEFINE));
        assert!(!app.runtime().is_defined(WIREFRAME_OVERLAY_DEFINE));

        let (wire, _) = headless_app(AppConfig {
            wireframe_overlay: true,
            ..AppConfig::default()
        });
        assert!(wire.runtime().is_defined(WIREFRAME_OVERLAY_DEFINE));
    }

    #[test]
    fn construction_is_unrealized_and_windowless() {
        let (app, probe) = headless_app(AppConfig::default());
        assert_eq!(app.state(), LoopState::Unrealized);
        assert!(app.window_ids().is_empty());
        assert!(probe.log().windows_created.is_empty());
    }

    // ── map loading ──────────────────────────────────────────────────────

    #[test]
    fn map_file_layers_are_loaded() {
        let path = temp_path("two-layers.json");
        let doc = json!({
            "name": "test map",
            "layers": [
                { "type": "image", "name": "imagery", "uri": "tiles/{z}/{x}/{y}.png" },
                { "type": "elevation" }
            ]
        });
        std::fs::write(&path, doc.to_string()).unwrap();

        let (app, _) = headless_app(AppConfig {
            map_file: Some(path.clone()),
            ..AppConfig::default()
        });
        assert_eq!(app.map_node().map.layer_count(), 2);
        assert_eq!(app.map_node().map.name.as_deref(), Some("test map"));
        assert!(app.about().contains("test map (2 layers)"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn unreadable_map_file_leaves_map_empty() {
        let (app, _) = headless_app(AppConfig {
            map_file: Some(temp_path("does-not-exist.json")),
            ..AppConfig::default()
        });
        assert_eq!(app.map_node().map.layer_count(), 0);
    }

    #[test]
    fn earth_file_goes_through_the_importer() {
        let config = AppConfig {
            earth_file: Some(PathBuf::from("world.earth")),
            ..AppConfig::default()
        };
        let importer = FixedImporter(json!({ "layers": [ { "type": "image" } ] }));
        let app = Application::with_importer(
            config.clone(),
            Box::new(crate::device::HeadlessBackend::new()),
            Some(&importer),
        );
        assert_eq!(app.map_node().map.layer_count(), 1);

        let failed = Application::with_importer(
            config.clone(),
            Box::new(crate::device::HeadlessBackend::new()),
            Some(&FailingImporter),
        );
        assert_eq!(failed.map_node().map.layer_count(), 0);

        let without = Application::new(config, Box::new(crate::device::HeadlessBackend::new()));
        assert_eq!(without.map_node().map.layer_count(), 0);
    }

    #[test]
    fn map_file_wins_over_earth_file() {
        let path = temp_path("one-layer.json");
        std::fs::write(&path, r#"{ "layers": [ { "type": "image" } ] }"#).unwrap();
        let importer = FixedImporter(json!({ "layers": [ { "type": "a" }, { "type": "b" } ] }));

        let app = Application::with_importer(
            AppConfig {
                map_file: Some(path.clone()),
                earth_file: Some(PathBuf::from("world.earth")),
                ..AppConfig::default()
            },
            Box::new(crate::device::HeadlessBackend::new()),
            Some(&importer),
        );
        assert_eq!(app.map_node().map.layer_count(), 1);
        std::fs::remove_file(&path).ok();
    }
}
