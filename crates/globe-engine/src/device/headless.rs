use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use crate::graph::{ClearColor, CommandGraph, RenderArea, RenderGraph, RenderGraphId};
use crate::input::{Event, InputEvent};
use crate::util::sync::lock;
use crate::view::ViewId;

use super::{
    compile_scope, Backend, BackendError, CompileResult, CompileScope, DebugCallback,
    DebugSeverity, DeviceId, ResourceHints, WindowId, WindowTraits,
};

/// One `Backend::compile` call as seen by the headless backend.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileRecord {
    Graphs {
        windows: Vec<WindowId>,
        render_graphs: usize,
        hints: Option<ResourceHints>,
    },
    View {
        window: WindowId,
        view: ViewId,
        render_graph: RenderGraphId,
    },
    Node {
        resources: usize,
    },
}

/// One render pass recorded by `record_and_submit`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPass {
    pub window: WindowId,
    pub render_graph: RenderGraphId,
    pub view: Option<ViewId>,
    pub clear_color: ClearColor,
    pub render_area: RenderArea,
}

/// Everything the headless backend was asked to do, in call order per kind.
#[derive(Debug, Clone, Default)]
pub struct HeadlessLog {
    pub windows_created: Vec<(WindowId, DeviceId, WindowTraits)>,
    pub windows_destroyed: Vec<WindowId>,
    pub devices_created: usize,
    pub idle_waits: usize,
    pub compiles: Vec<CompileRecord>,
    pub pipeline_rebuilds: Vec<(RenderGraphId, u64)>,

    /// Windows covered by each `record_and_submit` call.
    pub records: Vec<Vec<WindowId>>,
    pub recorded_passes: Vec<RecordedPass>,
    pub passes_per_record: Vec<usize>,
    pub presents: usize,
    pub debug_messengers: Vec<WindowId>,
    pub views_released: Vec<ViewId>,
}

impl HeadlessLog {
    /// Passes recorded by the most recent `record_and_submit` call.
    pub fn last_frame_passes(&self) -> &[RecordedPass] {
        let n = self.passes_per_record.last().copied().unwrap_or(0);
        &self.recorded_passes[self.recorded_passes.len() - n..]
    }
}

#[derive(Default)]
struct HeadlessShared {
    log: HeadlessLog,
    next_device: u32,
    live: BTreeMap<WindowId, DeviceId>,
    events: VecDeque<Event>,
    debug_callbacks: Vec<(WindowId, DebugCallback)>,
    compiled_views: HashSet<ViewId>,
    fail_next_submit: Option<BackendError>,
    fail_next_compile: Option<BackendError>,
}

/// Backend with no GPU and no OS windows.
///
/// Every call is recorded in a [`HeadlessLog`]; input events and device
/// diagnostics are scripted through a [`HeadlessProbe`].
pub struct HeadlessBackend {
    shared: Arc<Mutex<HeadlessShared>>,
}

/// Handle onto a [`HeadlessBackend`] that stays usable after the backend has
/// been moved into an application.
#[derive(Clone)]
pub struct HeadlessProbe {
    shared: Arc<Mutex<HeadlessShared>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(HeadlessShared::default())),
        }
    }

    pub fn probe(&self) -> HeadlessProbe {
        HeadlessProbe {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessProbe {
    /// Snapshot of the call log.
    pub fn log(&self) -> HeadlessLog {
        lock(&self.shared).log.clone()
    }

    pub fn live_windows(&self) -> Vec<WindowId> {
        lock(&self.shared).live.keys().copied().collect()
    }

    /// Queues an event for the next `poll_events`.
    pub fn push_event(&self, window: WindowId, input: InputEvent) {
        lock(&self.shared).events.push_back(Event::new(window, input));
    }

    pub fn request_close(&self, window: WindowId) {
        self.push_event(window, InputEvent::CloseRequested);
    }

    /// Delivers a diagnostic message to every installed messenger.
    ///
    /// Returns how many callbacks received it.
    pub fn emit_debug_message(&self, severity: DebugSeverity, message: &str) -> usize {
        // Callbacks run unlocked; they may log through code that probes back.
        let callbacks: Vec<DebugCallback> = lock(&self.shared)
            .debug_callbacks
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for cb in &callbacks {
            cb(severity, message);
        }
        callbacks.len()
    }

    /// Makes the next `record_and_submit` fail with `err`.
    pub fn fail_next_submit(&self, err: BackendError) {
        lock(&self.shared).fail_next_submit = Some(err);
    }

    pub fn fail_next_compile(&self, err: BackendError) {
        lock(&self.shared).fail_next_compile = Some(err);
    }
}

impl Backend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn create_window(&mut self, id: WindowId, traits: &WindowTraits) -> Result<DeviceId, BackendError> {
        if !traits.is_valid() {
            return Err(BackendError::WindowCreation(format!(
                "invalid extent {}x{}",
                traits.width, traits.height
            )));
        }

        let mut s = lock(&self.shared);
        let shared_device = traits
            .device
            .filter(|d| s.live.values().any(|live| live == d));
        let device = match shared_device {
            Some(d) => d,
            None => {
                let d = DeviceId::new(s.next_device);
                s.next_device += 1;
                s.log.devices_created += 1;
                d
            }
        };

        s.live.insert(id, device);
        s.log.windows_created.push((id, device, traits.clone()));
        Ok(device)
    }

    fn destroy_window(&mut self, id: WindowId) {
        let mut s = lock(&self.shared);
        if s.live.remove(&id).is_some() {
            s.log.windows_destroyed.push(id);
        }
        s.debug_callbacks.retain(|(w, _)| *w != id);
    }

    fn release_view(&mut self, view: ViewId) {
        let mut s = lock(&self.shared);
        s.compiled_views.remove(&view);
        s.log.views_released.push(view);
    }

    fn install_debug_messenger(&mut self, window: WindowId, callback: DebugCallback) {
        let mut s = lock(&self.shared);
        s.debug_callbacks.push((window, callback));
        s.log.debug_messengers.push(window);
    }

    fn device_wait_idle(&mut self) {
        lock(&self.shared).log.idle_waits += 1;
    }

    fn poll_events(&mut self, events: &mut Vec<Event>) {
        let mut s = lock(&self.shared);
        events.extend(s.events.drain(..));
    }

    fn compile(
        &mut self,
        scope: CompileScope<'_>,
        hints: Option<&ResourceHints>,
    ) -> Result<CompileResult, BackendError> {
        let mut s = lock(&self.shared);
        if let Some(err) = s.fail_next_compile.take() {
            return Err(err);
        }

        let record = match &scope {
            CompileScope::Graphs(graphs) => CompileRecord::Graphs {
                windows: graphs.iter().map(|g| g.window()).collect(),
                render_graphs: graphs.iter().map(|g| g.len()).sum(),
                hints: hints.cloned(),
            },
            CompileScope::View {
                window,
                view,
                render_graph,
            } => CompileRecord::View {
                window: *window,
                view: view.id(),
                render_graph: render_graph.id(),
            },
            CompileScope::Node(_) => CompileRecord::Node { resources: 0 },
        };

        let result = compile_scope(&scope, &mut s.compiled_views);
        let record = match record {
            CompileRecord::Node { .. } => CompileRecord::Node {
                resources: result.compiled,
            },
            other => other,
        };
        s.log.compiles.push(record);
        Ok(result)
    }

    fn rebuild_pipelines(&mut self, render_graph: &RenderGraph) -> Result<(), BackendError> {
        lock(&self.shared)
            .log
            .pipeline_rebuilds
            .push((render_graph.id(), render_graph.pipeline_revision()));
        Ok(())
    }

    fn record_and_submit(&mut self, graphs: &[&CommandGraph]) -> Result<(), BackendError> {
        let mut s = lock(&self.shared);
        if let Some(err) = s.fail_next_submit.take() {
            return Err(err);
        }

        let mut windows = Vec::with_capacity(graphs.len());
        let mut passes = 0;
        for graph in graphs {
            if !s.live.contains_key(&graph.window()) {
                return Err(BackendError::UnknownWindow(graph.window()));
            }
            windows.push(graph.window());
            for rg in graph.children() {
                s.log.recorded_passes.push(RecordedPass {
                    window: graph.window(),
                    render_graph: rg.id(),
                    view: rg.view().map(|v| v.id()),
                    clear_color: rg.clear_color(),
                    render_area: rg.render_area(),
                });
                passes += 1;
            }
        }
        s.log.records.push(windows);
        s.log.passes_per_record.push(passes);
        Ok(())
    }

    fn present(&mut self) -> Result<(), BackendError> {
        lock(&self.shared).log.presents += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::View;

    // ── windows and devices ──────────────────────────────────────────────

    #[test]
    fn shared_device_is_reused() {
        let mut backend = HeadlessBackend::new();
        let probe = backend.probe();

        let first = backend
            .create_window(WindowId::new(1), &WindowTraits::new(10, 10, "a"))
            .unwrap();
        let mut traits = WindowTraits::new(10, 10, "b");
        traits.device = Some(first);
        let second = backend.create_window(WindowId::new(2), &traits).unwrap();

        assert_eq!(first, second);
        assert_eq!(probe.log().devices_created, 1);
    }

    #[test]
    fn invalid_traits_fail_window_creation() {
        let mut backend = HeadlessBackend::new();
        let err = backend
            .create_window(WindowId::new(1), &WindowTraits::new(0, 0, "x"))
            .unwrap_err();
        assert!(matches!(err, BackendError::WindowCreation(_)));
        assert!(backend.probe().live_windows().is_empty());
    }

    #[test]
    fn destroyed_window_drops_its_messenger() {
        let mut backend = HeadlessBackend::new();
        let probe = backend.probe();
        backend
            .create_window(WindowId::new(1), &WindowTraits::default())
            .unwrap();
        backend.install_debug_messenger(WindowId::new(1), Arc::new(|_, _| {}));
        assert_eq!(probe.emit_debug_message(DebugSeverity::Warning, "w"), 1);

        backend.destroy_window(WindowId::new(1));
        assert_eq!(probe.emit_debug_message(DebugSeverity::Warning, "w"), 0);
        assert_eq!(probe.log().windows_destroyed, vec![WindowId::new(1)]);
    }

    // ── events and recording ─────────────────────────────────────────────

    #[test]
    fn scripted_events_are_drained_once() {
        let mut backend = HeadlessBackend::new();
        let probe = backend.probe();
        probe.request_close(WindowId::new(3));

        let mut events = Vec::new();
        backend.poll_events(&mut events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].input, InputEvent::CloseRequested);

        events.clear();
        backend.poll_events(&mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn record_logs_every_render_graph() {
        let mut backend = HeadlessBackend::new();
        let probe = backend.probe();
        let window = WindowId::new(1);
        backend.create_window(window, &WindowTraits::default()).unwrap();

        let view = View::without_camera().into_ref();
        let mut graph = CommandGraph::new(window);
        graph.add_child(RenderGraph::new(window, &view));
        graph.add_child(RenderGraph::new(window, &view));

        backend.record_and_submit(&[&graph]).unwrap();
        let log = probe.log();
        assert_eq!(log.records, vec![vec![window]]);
        assert_eq!(log.last_frame_passes().len(), 2);
        assert_eq!(log.last_frame_passes()[0].view, Some(view.id()));
    }

    #[test]
    fn scripted_submit_failure_fires_once() {
        let mut backend = HeadlessBackend::new();
        let probe = backend.probe();
        probe.fail_next_submit(BackendError::OutOfMemory);

        assert_eq!(backend.record_and_submit(&[]), Err(BackendError::OutOfMemory));
        assert_eq!(backend.record_and_submit(&[]), Ok(()));
    }

    #[test]
    fn view_compile_reports_new_view_once() {
        let mut backend = HeadlessBackend::new();
        let window = WindowId::new(1);
        let view = View::without_camera().into_ref();
        let rg = RenderGraph::new(window, &view);

        let scope = CompileScope::View {
            window,
            view: &view,
            render_graph: &rg,
        };
        let first = backend.compile(scope, None).unwrap();
        let second = backend.compile(scope, None).unwrap();
        assert_eq!(first.new_views, vec![view.id()]);
        assert!(second.new_views.is_empty());
    }
}
