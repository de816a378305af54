use crate::device::WindowId;
use crate::view::ViewId;

/// `(window, view)` pairs the viewer compiles for.
#[derive(Debug, Default, Clone)]
pub struct CompileManager {
    contexts: Vec<(WindowId, ViewId)>,
}

impl CompileManager {
    /// Registers a context; registering twice is a no-op.
    pub fn add(&mut self, window: WindowId, view: ViewId) {
        if !self.contains(window, view) {
            self.contexts.push((window, view));
        }
    }

    pub fn contains(&self, window: WindowId, view: ViewId) -> bool {
        self.contexts.contains(&(window, view))
    }

    pub fn remove_view(&mut self, view: ViewId) {
        self.contexts.retain(|(_, v)| *v != view);
    }

    pub fn remove_window(&mut self, window: WindowId) {
        self.contexts.retain(|(w, _)| *w != window);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn contexts(&self) -> &[(WindowId, ViewId)] {
        &self.contexts
    }
}

/// Record, submit and present work bound to a set of windows.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordAndSubmitTask {
    pub windows: Vec<WindowId>,

    /// Set once any compile produced data needing per-frame transfer.
    pub dynamic_data: bool,

    /// Views integrated through `Viewer::update_viewer` after the task was
    /// bound.
    pub views: Vec<ViewId>,
}

impl RecordAndSubmitTask {
    pub fn new(windows: Vec<WindowId>) -> Self {
        Self {
            windows,
            dynamic_data: false,
            views: Vec::new(),
        }
    }
}
