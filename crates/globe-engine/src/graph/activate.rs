use crate::device::{Backend, CompileResult, CompileScope, WindowId};
use crate::viewer::Viewer;

use super::RenderGraph;

/// Makes a render graph added to a running viewer renderable.
///
/// Registers the `(window, view)` compile context, compiles only that view's
/// resources and, when the result needs it, integrates it into the viewer.
/// Returns `None` when the view is gone or the compile failed; failures are
/// logged and never propagated.
pub fn activate_render_graph(
    render_graph: &RenderGraph,
    window: WindowId,
    viewer: &mut Viewer,
    backend: &mut dyn Backend,
) -> Option<CompileResult> {
    let Some(view) = render_graph.view() else {
        log::debug!("render graph {:?} has no live view; nothing to activate", render_graph.id());
        return None;
    };

    viewer.compile_manager.add(window, view.id());

    let scope = CompileScope::View {
        window,
        view: &view,
        render_graph,
    };
    match backend.compile(scope, None) {
        Ok(result) => {
            if result.requires_viewer_update() {
                viewer.update_viewer(&result);
            }
            Some(result)
        }
        Err(e) => {
            log::warn!("compile of view {} failed: {e}", view.name());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{BackendError, CompileRecord, HeadlessBackend};
    use crate::scene::{ContentKind, Node};
    use crate::view::View;

    #[test]
    fn activation_compiles_only_that_view() {
        let mut backend = HeadlessBackend::new();
        let probe = backend.probe();
        let mut viewer = Viewer::new(false);
        viewer.assign_record_and_submit_task_and_presentation(vec![WindowId::new(1)]);

        let view = View::without_camera()
            .with_child(Node::content(ContentKind::Map, 3))
            .into_ref();
        let rg = RenderGraph::new(WindowId::new(1), &view);

        let result = activate_render_graph(&rg, WindowId::new(1), &mut viewer, &mut backend).unwrap();
        assert_eq!(result.compiled, 3);
        assert_eq!(result.new_views, vec![view.id()]);
        assert!(viewer.compile_manager.contains(WindowId::new(1), view.id()));
        assert_eq!(viewer.viewer_updates(), 1);
        assert_eq!(
            probe.log().compiles,
            vec![CompileRecord::View {
                window: WindowId::new(1),
                view: view.id(),
                render_graph: rg.id(),
            }]
        );
    }

    #[test]
    fn already_compiled_view_needs_no_update() {
        let mut backend = HeadlessBackend::new();
        let mut viewer = Viewer::new(false);
        let view = View::without_camera().into_ref();
        let rg = RenderGraph::new(WindowId::new(1), &view);

        activate_render_graph(&rg, WindowId::new(1), &mut viewer, &mut backend);
        activate_render_graph(&rg, WindowId::new(1), &mut viewer, &mut backend);
        assert_eq!(viewer.viewer_updates(), 1);
    }

    #[test]
    fn dead_view_is_skipped() {
        let mut backend = HeadlessBackend::new();
        let probe = backend.probe();
        let mut viewer = Viewer::new(false);
        let view = View::without_camera().into_ref();
        let rg = RenderGraph::new(WindowId::new(1), &view);
        drop(view);

        assert!(activate_render_graph(&rg, WindowId::new(1), &mut viewer, &mut backend).is_none());
        assert!(probe.log().compiles.is_empty());
        assert!(viewer.compile_manager.is_empty());
    }

    #[test]
    fn compile_failure_is_swallowed() {
        let mut backend = HeadlessBackend::new();
        let probe = backend.probe();
        probe.fail_next_compile(BackendError::OutOfMemory);
        let mut viewer = Viewer::new(false);
        let view = View::without_camera().into_ref();
        let rg = RenderGraph::new(WindowId::new(1), &view);

        assert!(activate_render_graph(&rg, WindowId::new(1), &mut viewer, &mut backend).is_none());
        assert_eq!(viewer.viewer_updates(), 0);
    }
}
