//! Views: a camera plus the scene subtree it renders.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::camera::{CameraRef, ViewportState};
use crate::manip::ManipulatorRef;
use crate::scene::NodeRef;
use crate::util::sync::lock;

/// Process-unique view identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ViewId(u64);

impl ViewId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Shared view handle. The caller that created a view controls its lifetime;
/// render graphs only hold a weak reference to it.
pub type ViewRef = Arc<View>;

pub struct View {
    id: ViewId,
    name: String,
    camera: Option<CameraRef>,
    children: Mutex<Vec<NodeRef>>,

    // Metadata slot so the view's manipulator is found without a side table.
    manipulator: Mutex<Option<ManipulatorRef>>,
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("has_camera", &self.camera.is_some())
            .finish()
    }
}

impl View {
    pub fn new(camera: CameraRef) -> Self {
        Self::build(Some(camera))
    }

    /// A view with no camera. Such a view is rejected by `add_view`.
    pub fn without_camera() -> Self {
        Self::build(None)
    }

    fn build(camera: Option<CameraRef>) -> Self {
        let id = ViewId::next();
        Self {
            id,
            name: format!("view {}", id.0),
            camera,
            children: Mutex::new(Vec::new()),
            manipulator: Mutex::new(None),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_child(self, node: NodeRef) -> Self {
        lock(&self.children).push(node);
        self
    }

    #[inline]
    pub fn into_ref(self) -> ViewRef {
        Arc::new(self)
    }

    #[inline]
    pub fn id(&self) -> ViewId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn camera(&self) -> Option<&CameraRef> {
        self.camera.as_ref()
    }

    /// Current camera viewport, if the view has a camera.
    pub fn viewport(&self) -> Option<ViewportState> {
        self.camera.as_ref().map(|c| lock(c).viewport)
    }

    pub fn add_child(&self, node: NodeRef) {
        lock(&self.children).push(node);
    }

    pub fn has_children(&self) -> bool {
        !lock(&self.children).is_empty()
    }

    /// Snapshot of the child list.
    pub fn children(&self) -> Vec<NodeRef> {
        lock(&self.children).clone()
    }

    pub fn manipulator(&self) -> Option<ManipulatorRef> {
        lock(&self.manipulator).clone()
    }

    pub(crate) fn set_manipulator(&self, manipulator: Option<ManipulatorRef>) {
        *lock(&self.manipulator) = manipulator;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::scene::Node;

    #[test]
    fn ids_are_unique() {
        let a = View::without_camera();
        let b = View::without_camera();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn viewport_reads_through_camera() {
        let cam = Camera::for_globe(1.0, 640, 480).into_ref();
        let view = View::new(cam.clone());
        assert_eq!(view.viewport(), Some(ViewportState::new(0, 0, 640, 480)));

        lock(&cam).set_viewport(ViewportState::new(5, 5, 10, 10));
        assert_eq!(view.viewport(), Some(ViewportState::new(5, 5, 10, 10)));
    }

    #[test]
    fn children_are_tracked() {
        let view = View::without_camera();
        assert!(!view.has_children());
        view.add_child(Node::group());
        assert!(view.has_children());
        assert_eq!(view.children().len(), 1);
    }

    #[test]
    fn cameraless_view_has_no_viewport() {
        assert_eq!(View::without_camera().viewport(), None);
    }
}
