//! Rendering backend seam.
//!
//! The shell never talks to a GPU API directly. Everything device-, surface-
//! and submission-related goes through [`Backend`]:
//! - [`HeadlessBackend`] records every call (tests, offscreen runs)
//! - [`WgpuBackend`] drives real windows through winit + wgpu

mod error;
mod headless;
#[cfg(not(any(target_arch = "wasm32", target_os = "ios")))]
mod gpu;

use std::collections::HashSet;
use std::sync::Arc;

use crate::graph::{CommandGraph, RenderGraph};
use crate::input::Event;
use crate::scene::{NodeRef, ResourceCounter};
use crate::view::{View, ViewId};

pub use error::{BackendError, SurfaceErrorAction};
pub use headless::{CompileRecord, HeadlessBackend, HeadlessLog, HeadlessProbe, RecordedPass};
#[cfg(not(any(target_arch = "wasm32", target_os = "ios")))]
pub use gpu::{WgpuBackend, WgpuConfig};

/// Instance extension requested so validation messages can be captured.
pub const DEBUG_UTILS_EXTENSION: &str = "debug_utils";

/// Application-level window identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct WindowId(u32);

impl WindowId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Logical GPU device identifier. Windows created with the same device share
/// queues and resources.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DeviceId(u32);

impl DeviceId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum PresentMode {
    /// Vsync.
    #[default]
    Fifo,
    Mailbox,
    /// No vsync.
    Immediate,
}

/// Optional device capabilities a window may require.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DeviceFeature {
    /// Unclamped depth, used by the far-reaching globe projection.
    DepthClipControl,
    /// Line polygon mode, used by the wireframe overlay.
    PolygonModeLine,
}

/// Presentation traits of a window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowTraits {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub present_mode: PresentMode,
    pub debug_layer: bool,
    pub api_dump_layer: bool,
    pub instance_extensions: Vec<String>,
    pub device_features: Vec<DeviceFeature>,

    /// Device to share with an existing window; `None` creates one.
    pub device: Option<DeviceId>,
}

impl WindowTraits {
    pub fn new(width: u32, height: u32, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            present_mode: PresentMode::Fifo,
            debug_layer: false,
            api_dump_layer: false,
            instance_extensions: Vec::new(),
            device_features: Vec::new(),
            device: None,
        }
    }

    /// Traits with a zero extent cannot produce a surface.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn require_feature(&mut self, feature: DeviceFeature) {
        if !self.device_features.contains(&feature) {
            self.device_features.push(feature);
        }
    }

    pub fn require_instance_extension(&mut self, name: &str) {
        if !self.instance_extensions.iter().any(|e| e == name) {
            self.instance_extensions.push(name.to_string());
        }
    }
}

impl Default for WindowTraits {
    fn default() -> Self {
        Self::new(1920, 1080, "Main Window")
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum DebugSeverity {
    Verbose,
    Info,
    Warning,
    Error,
}

/// Receives diagnostic messages from the device (validation layer et al.).
pub type DebugCallback = Arc<dyn Fn(DebugSeverity, &str) + Send + Sync>;

/// Descriptor pool sizing hints for the initial compile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceHints {
    /// Max descriptor sets per pool, regardless of type.
    pub num_descriptor_sets: u32,
    /// `(descriptor kind, count)` pairs per pool.
    pub descriptor_pool_sizes: Vec<(String, u32)>,
}

/// What a compile pass covers.
#[derive(Debug, Clone, Copy)]
pub enum CompileScope<'a> {
    /// Every render graph of the given command graphs.
    Graphs(&'a [&'a CommandGraph]),
    /// A single view; nothing outside it is touched.
    View {
        window: WindowId,
        view: &'a View,
        render_graph: &'a RenderGraph,
    },
    /// One scene subtree, queued through the runtime.
    Node(&'a NodeRef),
}

/// Outcome of a compile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileResult {
    /// GPU resources created.
    pub compiled: usize,
    /// Compiled data needs per-frame transfer by the record task.
    pub dynamic_data: bool,
    /// Views compiled for the first time.
    pub new_views: Vec<ViewId>,
}

impl CompileResult {
    /// True when the running viewer must integrate this result before the
    /// next recording.
    #[inline]
    pub fn requires_viewer_update(&self) -> bool {
        self.dynamic_data || !self.new_views.is_empty()
    }

    pub fn merge(&mut self, other: CompileResult) {
        self.compiled += other.compiled;
        self.dynamic_data |= other.dynamic_data;
        for v in other.new_views {
            if !self.new_views.contains(&v) {
                self.new_views.push(v);
            }
        }
    }
}

/// Compile bookkeeping shared by the backends: counts the resources in
/// scope and reports views seen for the first time.
pub fn compile_scope(scope: &CompileScope<'_>, compiled_views: &mut HashSet<ViewId>) -> CompileResult {
    match scope {
        CompileScope::Graphs(graphs) => {
            let mut result = CompileResult::default();
            for graph in graphs.iter() {
                for rg in graph.children() {
                    if let Some(view) = rg.view() {
                        result.merge(compile_view(&view, compiled_views));
                    }
                }
            }
            result
        }
        CompileScope::View { view, .. } => compile_view(view, compiled_views),
        CompileScope::Node(node) => {
            let counter = ResourceCounter::count(std::slice::from_ref(*node));
            CompileResult {
                compiled: counter.resources,
                dynamic_data: counter.resources > 0,
                new_views: Vec::new(),
            }
        }
    }
}

fn compile_view(view: &View, compiled_views: &mut HashSet<ViewId>) -> CompileResult {
    let counter = ResourceCounter::count(&view.children());
    let new_views = if compiled_views.insert(view.id()) {
        vec![view.id()]
    } else {
        Vec::new()
    };
    CompileResult {
        compiled: counter.resources,
        dynamic_data: false,
        new_views,
    }
}

/// GPU execution and presentation service.
///
/// Implementations are externally synchronized: the shell calls them only
/// from the frame thread, and structural changes are always preceded by
/// [`Backend::device_wait_idle`].
pub trait Backend {
    /// Short backend name for diagnostics.
    fn name(&self) -> &str;

    /// Creates the OS window and its surface. Returns the device the window
    /// renders with, which is `traits.device` when one was given.
    fn create_window(&mut self, id: WindowId, traits: &WindowTraits) -> Result<DeviceId, BackendError>;

    fn destroy_window(&mut self, id: WindowId);

    /// Forgets `view`'s compile state. A view attached again afterwards
    /// compiles as new.
    fn release_view(&mut self, view: ViewId);

    /// Routes the device's diagnostic messages for `window` to `callback`.
    fn install_debug_messenger(&mut self, window: WindowId, callback: DebugCallback);

    /// Blocks until all submitted GPU work has completed.
    fn device_wait_idle(&mut self);

    /// Appends pending window events to `events`.
    fn poll_events(&mut self, events: &mut Vec<Event>);

    fn compile(
        &mut self,
        scope: CompileScope<'_>,
        hints: Option<&ResourceHints>,
    ) -> Result<CompileResult, BackendError>;

    /// Regenerates the graphics pipelines baked for `render_graph`'s pass.
    fn rebuild_pipelines(&mut self, render_graph: &RenderGraph) -> Result<(), BackendError>;

    /// Records every render graph of `graphs` and submits the result.
    fn record_and_submit(&mut self, graphs: &[&CommandGraph]) -> Result<(), BackendError>;

    /// Presents everything submitted since the last call.
    fn present(&mut self) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_extent_traits_are_invalid() {
        assert!(!WindowTraits::new(0, 10, "w").is_valid());
        assert!(!WindowTraits::new(10, 0, "w").is_valid());
        assert!(WindowTraits::new(1, 1, "w").is_valid());
    }

    #[test]
    fn requirements_are_deduplicated() {
        let mut t = WindowTraits::default();
        t.require_feature(DeviceFeature::DepthClipControl);
        t.require_feature(DeviceFeature::DepthClipControl);
        t.require_instance_extension(DEBUG_UTILS_EXTENSION);
        t.require_instance_extension(DEBUG_UTILS_EXTENSION);
        assert_eq!(t.device_features, vec![DeviceFeature::DepthClipControl]);
        assert_eq!(t.instance_extensions.len(), 1);
    }

    #[test]
    fn merge_accumulates_and_dedupes_views() {
        let view = View::without_camera();
        let mut a = CompileResult {
            compiled: 2,
            dynamic_data: false,
            new_views: vec![view.id()],
        };
        a.merge(CompileResult {
            compiled: 3,
            dynamic_data: true,
            new_views: vec![view.id()],
        });
        assert_eq!(a.compiled, 5);
        assert!(a.dynamic_data);
        assert_eq!(a.new_views, vec![view.id()]);
    }

    #[test]
    fn empty_result_needs_no_viewer_update() {
        assert!(!CompileResult::default().requires_viewer_update());
    }
}
