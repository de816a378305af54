//! The viewer: windows being presented, the ordered event-handler list and
//! the record/submit/present task of the running frame loop.
//!
//! A viewer is disposable. Structural changes that invalidate it (new
//! windows, threading mode) replace it wholesale with
//! [`Viewer::successor`], carrying the handlers and clock over.

mod compile;
mod handler;

use crate::device::{Backend, BackendError, CompileResult, WindowId};
use crate::graph::CommandGraph;
use crate::input::Event;
use crate::time::{FrameClock, FrameStamp};
use crate::util::sync::lock;
use crate::view::ViewId;

pub use compile::{CompileManager, RecordAndSubmitTask};
pub use handler::{
    CloseHandler, EventHandler, HandlerCtx, HandlerKind, InstalledHandler, SharedHandler,
};

#[derive(Debug)]
pub struct Viewer {
    windows: Vec<WindowId>,
    handlers: Vec<InstalledHandler>,
    pub compile_manager: CompileManager,
    task: Option<RecordAndSubmitTask>,
    clock: FrameClock,
    stamp: FrameStamp,
    events: Vec<Event>,
    active: bool,
    threading: bool,
    updates: usize,
}

impl Viewer {
    pub fn new(threading: bool) -> Self {
        let clock = FrameClock::new();
        Self::with_clock(clock, threading)
    }

    fn with_clock(clock: FrameClock, threading: bool) -> Self {
        Self {
            windows: Vec::new(),
            handlers: Vec::new(),
            compile_manager: CompileManager::default(),
            task: None,
            clock,
            stamp: FrameStamp::initial(std::time::Instant::now()),
            events: Vec::new(),
            active: true,
            threading,
            updates: 0,
        }
    }

    /// Empty viewer continuing this one's frame clock. A closed viewer stays
    /// closed.
    pub fn successor(&self, threading: bool) -> Self {
        Self {
            stamp: self.stamp,
            active: self.active,
            ..Self::with_clock(self.clock.clone(), threading)
        }
    }

    // ── windows ──────────────────────────────────────────────────────────

    pub fn add_window(&mut self, window: WindowId) {
        if !self.windows.contains(&window) {
            self.windows.push(window);
        }
    }

    pub fn remove_window(&mut self, window: WindowId) {
        self.windows.retain(|w| *w != window);
        self.compile_manager.remove_window(window);
        if let Some(task) = &mut self.task {
            task.windows.retain(|w| *w != window);
        }
    }

    #[inline]
    pub fn windows(&self) -> &[WindowId] {
        &self.windows
    }

    // ── handlers ─────────────────────────────────────────────────────────

    pub fn add_event_handler(&mut self, handler: InstalledHandler) {
        self.handlers.push(handler);
    }

    #[inline]
    pub fn event_handlers(&self) -> &[InstalledHandler] {
        &self.handlers
    }

    /// Removes every handler matching `pred`; returns how many were removed.
    pub fn remove_event_handlers(&mut self, mut pred: impl FnMut(&InstalledHandler) -> bool) -> usize {
        let before = self.handlers.len();
        self.handlers.retain(|h| !pred(h));
        before - self.handlers.len()
    }

    pub fn has_handler(&self, kind: HandlerKind) -> bool {
        self.handlers.iter().any(|h| h.kind == kind)
    }

    // ── frame ────────────────────────────────────────────────────────────

    pub fn assign_record_and_submit_task_and_presentation(&mut self, windows: Vec<WindowId>) {
        self.task = Some(RecordAndSubmitTask::new(windows));
    }

    #[inline]
    pub fn task(&self) -> Option<&RecordAndSubmitTask> {
        self.task.as_ref()
    }

    /// Polls events and advances the frame stamp. False once the viewer was
    /// closed or has nothing to present.
    pub fn advance_to_next_frame(&mut self, backend: &mut dyn Backend) -> bool {
        if !self.active || self.windows.is_empty() {
            return false;
        }

        backend.poll_events(&mut self.events);
        self.stamp = self.clock.tick();
        true
    }

    #[inline]
    pub fn frame_stamp(&self) -> FrameStamp {
        self.stamp
    }

    /// Events polled and not yet dispatched.
    #[inline]
    pub fn pending_events(&self) -> &[Event] {
        &self.events
    }

    /// Runs every pending event through the handler list, in list order.
    pub fn handle_events(&mut self) {
        if self.events.is_empty() {
            return;
        }

        let mut ctx = HandlerCtx::new(self.stamp);
        let events = std::mem::take(&mut self.events);
        for mut event in events {
            for installed in &self.handlers {
                lock(&installed.handler).handle(&mut event, &mut ctx);
            }
        }

        if ctx.close_requested() {
            self.close();
        }
    }

    /// Drops `view` from the compile contexts and the bound task.
    pub fn release_view(&mut self, view: ViewId) {
        self.compile_manager.remove_view(view);
        if let Some(task) = &mut self.task {
            task.views.retain(|v| *v != view);
        }
    }

    /// Integrates a compile that happened after the task was bound.
    pub fn update_viewer(&mut self, result: &CompileResult) {
        self.updates += 1;
        let Some(task) = &mut self.task else {
            return;
        };
        task.dynamic_data |= result.dynamic_data;
        for view in &result.new_views {
            if !task.views.contains(view) {
                task.views.push(*view);
            }
        }
    }

    /// How many compile results were integrated.
    #[inline]
    pub fn viewer_updates(&self) -> usize {
        self.updates
    }

    /// Records the command graphs of the windows bound to the task.
    pub fn record_and_submit(
        &mut self,
        backend: &mut dyn Backend,
        graphs: &[&CommandGraph],
    ) -> Result<(), BackendError> {
        let Some(task) = &self.task else {
            return Ok(());
        };
        let bound: Vec<&CommandGraph> = graphs
            .iter()
            .copied()
            .filter(|g| task.windows.contains(&g.window()))
            .collect();
        backend.record_and_submit(&bound)
    }

    pub fn present(&mut self, backend: &mut dyn Backend) -> Result<(), BackendError> {
        if self.task.is_none() {
            return Ok(());
        }
        backend.present()
    }

    #[inline]
    pub fn active(&self) -> bool {
        self.active
    }

    pub fn close(&mut self) {
        self.active = false;
    }

    #[inline]
    pub fn threading(&self) -> bool {
        self.threading
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::device::{HeadlessBackend, WindowTraits};
    use crate::input::{InputEvent, Key, KeyState, Modifiers};

    struct Recorder {
        name: &'static str,
        seen: Arc<Mutex<Vec<&'static str>>>,
        consume: bool,
    }

    impl EventHandler for Recorder {
        fn handle(&mut self, event: &mut Event, _ctx: &mut HandlerCtx) {
            if event.handled {
                return;
            }
            self.seen.lock().unwrap().push(self.name);
            if self.consume {
                event.handled = true;
            }
        }
    }

    fn viewer_with_window(backend: &mut HeadlessBackend) -> Viewer {
        backend
            .create_window(WindowId::new(1), &WindowTraits::default())
            .unwrap();
        let mut viewer = Viewer::new(false);
        viewer.add_window(WindowId::new(1));
        viewer
    }

    // ── frame advance ────────────────────────────────────────────────────

    #[test]
    fn advance_fails_without_windows() {
        let mut backend = HeadlessBackend::new();
        let mut viewer = Viewer::new(false);
        assert!(!viewer.advance_to_next_frame(&mut backend));
    }

    #[test]
    fn advance_fails_after_close() {
        let mut backend = HeadlessBackend::new();
        let mut viewer = viewer_with_window(&mut backend);
        assert!(viewer.advance_to_next_frame(&mut backend));
        viewer.close();
        assert!(!viewer.advance_to_next_frame(&mut backend));
    }

    #[test]
    fn successor_continues_the_clock() {
        let mut backend = HeadlessBackend::new();
        let mut viewer = viewer_with_window(&mut backend);
        viewer.advance_to_next_frame(&mut backend);
        viewer.advance_to_next_frame(&mut backend);

        let mut next = viewer.successor(true);
        next.add_window(WindowId::new(1));
        next.advance_to_next_frame(&mut backend);
        assert_eq!(next.frame_stamp().frame_count, 2);
        assert!(next.threading());
        assert!(next.event_handlers().is_empty());
    }

    #[test]
    fn successor_of_a_closed_viewer_stays_closed() {
        let mut backend = HeadlessBackend::new();
        let mut viewer = viewer_with_window(&mut backend);
        viewer.close();

        let mut next = viewer.successor(false);
        next.add_window(WindowId::new(1));
        assert!(!next.active());
        assert!(!next.advance_to_next_frame(&mut backend));
    }

    // ── dispatch ─────────────────────────────────────────────────────────

    #[test]
    fn handlers_run_in_order_and_respect_handled() {
        let mut backend = HeadlessBackend::new();
        let probe = backend.probe();
        let mut viewer = viewer_with_window(&mut backend);
        let seen = Arc::new(Mutex::new(Vec::new()));

        for (name, consume) in [("a", false), ("b", true), ("c", false)] {
            viewer.add_event_handler(InstalledHandler::new(
                HandlerKind::User,
                Recorder {
                    name,
                    seen: Arc::clone(&seen),
                    consume,
                },
            ));
        }

        probe.push_event(WindowId::new(1), InputEvent::PointerMoved { x: 1.0, y: 1.0 });
        viewer.advance_to_next_frame(&mut backend);
        viewer.handle_events();

        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn close_handler_stops_viewer_on_escape() {
        let mut backend = HeadlessBackend::new();
        let probe = backend.probe();
        let mut viewer = viewer_with_window(&mut backend);
        viewer.add_event_handler(InstalledHandler::new(HandlerKind::Close, CloseHandler));

        probe.push_event(
            WindowId::new(1),
            InputEvent::Key {
                key: Key::Escape,
                state: KeyState::Pressed,
                modifiers: Modifiers::default(),
                repeat: false,
            },
        );
        viewer.advance_to_next_frame(&mut backend);
        viewer.handle_events();
        assert!(!viewer.active());
    }

    #[test]
    fn remove_event_handlers_by_kind() {
        let mut viewer = Viewer::new(false);
        viewer.add_event_handler(InstalledHandler::new(HandlerKind::Close, CloseHandler));
        viewer.add_event_handler(InstalledHandler::new(HandlerKind::User, CloseHandler));
        assert_eq!(viewer.remove_event_handlers(|h| h.kind == HandlerKind::User), 1);
        assert!(viewer.has_handler(HandlerKind::Close));
        assert!(!viewer.has_handler(HandlerKind::User));
    }

    // ── task ─────────────────────────────────────────────────────────────

    #[test]
    fn record_is_skipped_without_task() {
        let mut backend = HeadlessBackend::new();
        let probe = backend.probe();
        let mut viewer = viewer_with_window(&mut backend);
        let graph = CommandGraph::new(WindowId::new(1));

        viewer.record_and_submit(&mut backend, &[&graph]).unwrap();
        viewer.present(&mut backend).unwrap();
        assert!(probe.log().records.is_empty());
        assert_eq!(probe.log().presents, 0);

        viewer.assign_record_and_submit_task_and_presentation(vec![WindowId::new(1)]);
        viewer.record_and_submit(&mut backend, &[&graph]).unwrap();
        viewer.present(&mut backend).unwrap();
        assert_eq!(probe.log().records, vec![vec![WindowId::new(1)]]);
        assert_eq!(probe.log().presents, 1);
    }

    #[test]
    fn update_viewer_integrates_new_views() {
        let mut viewer = Viewer::new(false);
        viewer.assign_record_and_submit_task_and_presentation(vec![WindowId::new(1)]);
        let view = crate::view::View::without_camera();
        viewer.update_viewer(&CompileResult {
            compiled: 1,
            dynamic_data: false,
            new_views: vec![view.id()],
        });
        let task = viewer.task().unwrap();
        assert_eq!(task.views, vec![view.id()]);
        assert_eq!(viewer.viewer_updates(), 1);
    }

    #[test]
    fn released_views_leave_the_task_and_compile_contexts() {
        let mut viewer = Viewer::new(false);
        let window = WindowId::new(1);
        viewer.assign_record_and_submit_task_and_presentation(vec![window]);
        let (a, b) = (crate::view::View::without_camera(), crate::view::View::without_camera());
        for view in [&a, &b] {
            viewer.compile_manager.add(window, view.id());
            viewer.update_viewer(&CompileResult {
                compiled: 0,
                dynamic_data: false,
                new_views: vec![view.id()],
            });
        }

        viewer.release_view(a.id());
        assert_eq!(viewer.task().unwrap().views, vec![b.id()]);
        assert!(!viewer.compile_manager.contains(window, a.id()));
        assert!(viewer.compile_manager.contains(window, b.id()));
    }
}
