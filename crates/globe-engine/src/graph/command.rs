use crate::device::WindowId;
use crate::view::ViewId;

use super::{RenderGraph, RenderGraphId};

/// Per-window unit of recording: the window's render graphs in pass order.
#[derive(Debug)]
pub struct CommandGraph {
    window: WindowId,
    children: Vec<RenderGraph>,
}

impl CommandGraph {
    pub fn new(window: WindowId) -> Self {
        Self {
            window,
            children: Vec::new(),
        }
    }

    #[inline]
    pub fn window(&self) -> WindowId {
        self.window
    }

    #[inline]
    pub fn children(&self) -> &[RenderGraph] {
        &self.children
    }

    #[inline]
    pub fn children_mut(&mut self) -> &mut [RenderGraph] {
        &mut self.children
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Appends a pass; the new pass records last.
    pub fn add_child(&mut self, render_graph: RenderGraph) -> RenderGraphId {
        let id = render_graph.id();
        self.children.push(render_graph);
        id
    }

    /// Inserts a pass that records before every existing one.
    pub fn insert_front(&mut self, render_graph: RenderGraph) -> RenderGraphId {
        let id = render_graph.id();
        self.children.insert(0, render_graph);
        id
    }

    pub fn remove_child(&mut self, id: RenderGraphId) -> Option<RenderGraph> {
        let pos = self.children.iter().position(|rg| rg.id() == id)?;
        Some(self.children.remove(pos))
    }

    pub fn find(&self, id: RenderGraphId) -> Option<&RenderGraph> {
        self.children.iter().find(|rg| rg.id() == id)
    }

    pub fn find_mut(&mut self, id: RenderGraphId) -> Option<&mut RenderGraph> {
        self.children.iter_mut().find(|rg| rg.id() == id)
    }

    pub fn find_by_view(&self, view: ViewId) -> Option<&RenderGraph> {
        self.children.iter().find(|rg| rg.view_id() == view)
    }
}
