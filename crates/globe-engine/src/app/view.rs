use std::sync::Arc;

use crate::device::WindowId;
use crate::graph::{
    activate_render_graph, CommandGraph, RenderArea, RenderGraph, RenderGraphId, DEFAULT_CLEAR,
};
use crate::util::{soft_assert, soft_unwrap, Future};
use crate::view::{ViewId, ViewRef};

use super::{Application, ViewData};

/// Callback run once a view's render graph exists. Receives the window's
/// command graph, or `None` when the window was gone by then.
pub type OnCreate = Box<dyn FnOnce(Option<&mut CommandGraph>) + Send>;

impl Application {
    /// Shows `view` in `window`, on top of the window's existing views.
    pub fn add_view(&mut self, window: WindowId, view: ViewRef) -> Future<ViewRef> {
        self.add_view_with(window, view, None)
    }

    /// Like [`Application::add_view`], running `on_create` once the render
    /// graph exists.
    ///
    /// A view without a camera, an unknown window or a view that is already
    /// shown leave the future unresolved.
    pub fn add_view_with(
        &mut self,
        window: WindowId,
        view: ViewRef,
        on_create: Option<OnCreate>,
    ) -> Future<ViewRef> {
        let result = Future::new();
        soft_assert!(
            view.camera().is_some(),
            result,
            "view {} has no camera",
            view.name()
        );
        soft_assert!(
            self.display.window_of(view.id()).is_none(),
            result,
            "view {} is already shown",
            view.name()
        );

        if self.realized {
            let deferred = result.clone();
            self.runtime.run_during_update(move |app| {
                app.attach_view_after_realize(window, view, on_create, &deferred);
            });
        } else {
            soft_assert!(
                self.windows.contains_key(&window),
                result,
                "window {} is not part of this application",
                window.raw()
            );
            self.attach_view(window, view, on_create, &result);
        }
        result
    }

    /// Inline attach, before realization.
    pub(super) fn attach_view(
        &mut self,
        window: WindowId,
        view: ViewRef,
        on_create: Option<OnCreate>,
        result: &Future<ViewRef>,
    ) {
        if self.append_render_graph(window, &view).is_none() {
            return;
        }
        self.install_manipulator(window, &view);
        result.resolve(view);

        if let Some(on_create) = on_create {
            on_create(self.command_graph_mut(window));
        }
    }

    /// Deferred attach: same as [`Application::attach_view`], plus
    /// compiling the new render graph into the running viewer.
    pub(super) fn attach_view_after_realize(
        &mut self,
        window: WindowId,
        view: ViewRef,
        on_create: Option<OnCreate>,
        result: &Future<ViewRef>,
    ) {
        self.backend.device_wait_idle();

        // The window may have been removed between queueing and now.
        let Some(id) = self.append_render_graph(window, &view) else {
            if let Some(on_create) = on_create {
                on_create(None);
            }
            return;
        };

        if let Some(record) = self.windows.get(&window) {
            if let Some(rg) = record.command_graph.find(id) {
                activate_render_graph(rg, window, &mut self.viewer, self.backend.as_mut());
            }
        }
        self.install_manipulator(window, &view);

        if let Some(on_create) = on_create {
            on_create(self.command_graph_mut(window));
        }
        result.resolve(view);
    }

    /// Creates the view's render graph and records it in every table.
    fn append_render_graph(&mut self, window: WindowId, view: &ViewRef) -> Option<RenderGraphId> {
        let record = soft_unwrap!(
            self.windows.get_mut(&window),
            None,
            "window {} is not part of this application",
            window.raw()
        );
        if !self.display.attach(window, Arc::clone(view)) {
            log::error!("view {} is already shown", view.name());
            return None;
        }

        if !view.has_children() {
            view.add_child(Arc::clone(&self.root));
        }

        let rg = RenderGraph::new(window, view).with_clear_color(DEFAULT_CLEAR);
        let id = record.command_graph.add_child(rg);
        self.view_data.insert(
            view.id(),
            ViewData {
                window,
                render_graph: id,
            },
        );
        log::debug!("view {} attached to window {}", view.name(), window.raw());
        Some(id)
    }

    /// Stops showing `view`. Unknown views are ignored.
    pub fn remove_view(&mut self, view: ViewId) {
        if self.realized {
            self.runtime.run_during_update(move |app| app.remove_view_now(view));
        } else {
            self.remove_view_now(view);
        }
    }

    fn remove_view_now(&mut self, view: ViewId) {
        self.backend.device_wait_idle();

        let data = soft_unwrap!(
            self.view_data.get(&view).copied(),
            (),
            "view {} is not shown",
            view.raw()
        );
        let record = soft_unwrap!(
            self.windows.get_mut(&data.window),
            (),
            "window {} of view {} is gone",
            data.window.raw(),
            view.raw()
        );

        record.command_graph.remove_child(data.render_graph);
        self.view_data.remove(&view);
        self.viewer.release_view(view);
        self.backend.release_view(view);

        let removed = self
            .display
            .views(data.window)
            .iter()
            .find(|v| v.id() == view)
            .map(Arc::clone);
        self.display.detach(view);
        if let Some(removed) = removed {
            removed.set_manipulator(None);
        }
        self.reorder_manipulators();
    }

    /// Copies the view's camera viewport into its render area and rebuilds
    /// the pipelines baked for it.
    pub fn refresh_view(&mut self, view: ViewId) {
        if self.realized {
            self.runtime.run_during_update(move |app| app.refresh_view_now(view));
        } else {
            self.refresh_view_now(view);
        }
    }

    fn refresh_view_now(&mut self, view: ViewId) {
        let data = soft_unwrap!(
            self.view_data.get(&view).copied(),
            (),
            "view {} is not shown",
            view.raw()
        );
        let viewport = soft_unwrap!(
            self.display
                .views(data.window)
                .iter()
                .find(|v| v.id() == view)
                .and_then(|v| v.viewport()),
            (),
            "view {} has no camera viewport",
            view.raw()
        );

        self.backend.device_wait_idle();

        let Some(record) = self.windows.get_mut(&data.window) else {
            return;
        };
        let rg = soft_unwrap!(
            record.command_graph.find_mut(data.render_graph),
            (),
            "render graph of view {} is gone",
            view.raw()
        );
        rg.set_render_area(RenderArea::from(viewport));
        rg.bump_pipeline_revision();
        if let Err(e) = self.backend.rebuild_pipelines(rg) {
            log::warn!("pipeline rebuild for view {} failed: {e}", view.raw());
        }
    }

    /// Inserts `render_graph` before every other pass of `window`, e.g. to
    /// render into a texture the main view samples.
    ///
    /// Requires the window to have at least one render graph already.
    pub fn add_pre_render_graph(&mut self, window: WindowId, render_graph: RenderGraph) {
        if self.realized {
            self.runtime
                .run_during_update(move |app| app.add_pre_render_graph_now(window, render_graph));
        } else {
            self.add_pre_render_graph_now(window, render_graph);
        }
    }

    fn add_pre_render_graph_now(&mut self, window: WindowId, render_graph: RenderGraph) {
        let record = soft_unwrap!(
            self.windows.get_mut(&window),
            (),
            "window {} is not part of this application",
            window.raw()
        );
        soft_assert!(
            !record.command_graph.is_empty(),
            (),
            "window {} has no render graph to precede",
            window.raw()
        );

        let id = record.command_graph.insert_front(render_graph);
        if self.realized {
            if let Some(rg) = record.command_graph.find(id) {
                activate_render_graph(rg, window, &mut self.viewer, self.backend.as_mut());
            }
        }
    }
}
