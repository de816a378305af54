use std::sync::Arc;

use crate::device::WindowId;
use crate::manip::MapManipulator;
use crate::viewer::{HandlerKind, InstalledHandler, SharedHandler};
use crate::view::ViewRef;

use super::Application;

impl Application {
    /// Gives `view` a map manipulator and puts it in the handler list.
    pub(super) fn install_manipulator(&mut self, window: WindowId, view: &ViewRef) {
        let Some(camera) = view.camera() else {
            return;
        };
        let manipulator =
            MapManipulator::new(window, Arc::clone(camera), self.map_node.ellipsoid.radius()).into_ref();
        view.set_manipulator(Some(manipulator));
        self.reorder_manipulators();
    }

    /// Rebuilds the manipulator part of the handler list so that overlapping
    /// views see events topmost first. Other handlers keep their positions.
    pub(super) fn reorder_manipulators(&mut self) {
        self.viewer.remove_event_handlers(|h| h.kind.is_manipulator());

        for view in self.display.manipulator_order() {
            let Some(manipulator) = view.manipulator() else {
                continue;
            };
            let handler: SharedHandler = manipulator;
            self.viewer
                .add_event_handler(InstalledHandler::shared(HandlerKind::Manipulator(view.id()), handler));
        }
    }
}
