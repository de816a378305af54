use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::camera::ViewportState;
use crate::device::WindowId;
use crate::view::{View, ViewId, ViewRef};

/// Background of every view attached through `add_view`.
pub const DEFAULT_CLEAR: ClearColor = ClearColor::new(0.1, 0.12, 0.15, 1.0);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RenderGraphId(u64);

impl RenderGraphId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Linear RGBA clear color.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ClearColor {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// Window-pixel rectangle a render pass draws into.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct RenderArea {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl From<ViewportState> for RenderArea {
    fn from(vp: ViewportState) -> Self {
        Self {
            x: vp.x,
            y: vp.y,
            width: vp.width,
            height: vp.height,
        }
    }
}

/// Render pass wrapping one view for one window.
///
/// The view is referenced weakly: dropping the last strong handle elsewhere
/// leaves a render graph that records an empty pass.
#[derive(Debug, Clone)]
pub struct RenderGraph {
    id: RenderGraphId,
    window: WindowId,
    view: Weak<View>,
    view_id: ViewId,
    clear_color: ClearColor,
    render_area: RenderArea,
    pipeline_revision: u64,
}

impl RenderGraph {
    /// Render area starts as the view's viewport, or empty without a camera.
    pub fn new(window: WindowId, view: &ViewRef) -> Self {
        Self {
            id: RenderGraphId::next(),
            window,
            view: Arc::downgrade(view),
            view_id: view.id(),
            clear_color: DEFAULT_CLEAR,
            render_area: view.viewport().map(RenderArea::from).unwrap_or_default(),
            pipeline_revision: 0,
        }
    }

    pub fn with_clear_color(mut self, color: ClearColor) -> Self {
        self.clear_color = color;
        self
    }

    #[inline]
    pub fn id(&self) -> RenderGraphId {
        self.id
    }

    #[inline]
    pub fn window(&self) -> WindowId {
        self.window
    }

    pub fn view(&self) -> Option<ViewRef> {
        self.view.upgrade()
    }

    #[inline]
    pub fn view_id(&self) -> ViewId {
        self.view_id
    }

    #[inline]
    pub fn clear_color(&self) -> ClearColor {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: ClearColor) {
        self.clear_color = color;
    }

    #[inline]
    pub fn render_area(&self) -> RenderArea {
        self.render_area
    }

    pub fn set_render_area(&mut self, area: RenderArea) {
        self.render_area = area;
    }

    #[inline]
    pub fn pipeline_revision(&self) -> u64 {
        self.pipeline_revision
    }

    /// Marks the baked pipeline state stale.
    pub fn bump_pipeline_revision(&mut self) -> u64 {
        self.pipeline_revision += 1;
        self.pipeline_revision
    }
}
