//! Which views are shown in which window.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::device::WindowId;
use crate::view::{ViewId, ViewRef};

/// Ordered `window -> views` map.
///
/// Windows iterate in id order; each window's views are kept bottom to top,
/// so the last attached view is the topmost one.
#[derive(Debug, Default)]
pub struct DisplayConfiguration {
    windows: BTreeMap<WindowId, Vec<ViewRef>>,
}

impl DisplayConfiguration {
    pub fn insert_window(&mut self, window: WindowId) {
        self.windows.entry(window).or_default();
    }

    /// Drops the window entry and returns the views it held.
    pub fn remove_window(&mut self, window: WindowId) -> Vec<ViewRef> {
        self.windows.remove(&window).unwrap_or_default()
    }

    /// Appends `view` on top of `window`'s views. Returns `false` when the
    /// view is already attached anywhere.
    pub fn attach(&mut self, window: WindowId, view: ViewRef) -> bool {
        if self.window_of(view.id()).is_some() {
            return false;
        }
        self.windows.entry(window).or_default().push(view);
        true
    }

    /// Removes `view`; returns the window it was attached to.
    pub fn detach(&mut self, view: ViewId) -> Option<WindowId> {
        for (window, views) in self.windows.iter_mut() {
            if let Some(pos) = views.iter().position(|v| v.id() == view) {
                views.remove(pos);
                return Some(*window);
            }
        }
        None
    }

    pub fn window_of(&self, view: ViewId) -> Option<WindowId> {
        self.windows
            .iter()
            .find(|(_, views)| views.iter().any(|v| v.id() == view))
            .map(|(w, _)| *w)
    }

    pub fn contains_window(&self, window: WindowId) -> bool {
        self.windows.contains_key(&window)
    }

    /// Views of `window`, bottom to top.
    pub fn views(&self, window: WindowId) -> &[ViewRef] {
        self.windows.get(&window).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (WindowId, &[ViewRef])> {
        self.windows.iter().map(|(w, v)| (*w, v.as_slice()))
    }

    pub fn view_count(&self) -> usize {
        self.windows.values().map(Vec::len).sum()
    }

    /// Views in the order their manipulators must see events: windows in
    /// order, each window's views topmost first.
    pub fn manipulator_order(&self) -> Vec<ViewRef> {
        self.windows
            .values()
            .flat_map(|views| views.iter().rev().map(Arc::clone))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::View;

    fn ids(views: &[ViewRef]) -> Vec<ViewId> {
        views.iter().map(|v| v.id()).collect()
    }

    #[test]
    fn attach_rejects_duplicates() {
        let mut dc = DisplayConfiguration::default();
        let view = View::without_camera().into_ref();
        assert!(dc.attach(WindowId::new(1), Arc::clone(&view)));
        assert!(!dc.attach(WindowId::new(2), Arc::clone(&view)));
        assert_eq!(dc.view_count(), 1);
        assert_eq!(dc.window_of(view.id()), Some(WindowId::new(1)));
    }

    #[test]
    fn manipulator_order_is_topmost_first_per_window() {
        let mut dc = DisplayConfiguration::default();
        let a = View::without_camera().into_ref();
        let b = View::without_camera().into_ref();
        let c = View::without_camera().into_ref();
        dc.attach(WindowId::new(2), Arc::clone(&c));
        dc.attach(WindowId::new(1), Arc::clone(&a));
        dc.attach(WindowId::new(1), Arc::clone(&b));

        assert_eq!(ids(&dc.manipulator_order()), vec![b.id(), a.id(), c.id()]);
    }

    #[test]
    fn detach_reports_owner() {
        let mut dc = DisplayConfiguration::default();
        let view = View::without_camera().into_ref();
        dc.attach(WindowId::new(4), Arc::clone(&view));

        assert_eq!(dc.detach(view.id()), Some(WindowId::new(4)));
        assert_eq!(dc.detach(view.id()), None);
        assert!(dc.contains_window(WindowId::new(4)));
        assert!(dc.views(WindowId::new(4)).is_empty());
    }
}
