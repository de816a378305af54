use std::sync::Arc;

use crate::camera::Camera;
use crate::device::{
    DebugCallback, DebugSeverity, DeviceFeature, DeviceId, PresentMode, WindowId, WindowTraits,
    DEBUG_UTILS_EXTENSION,
};
use crate::graph::CommandGraph;
use crate::util::{soft_assert, Future};
use crate::view::{View, ViewId};

use super::{Application, WindowRecord};

impl Application {
    /// Creates a window showing the main scene through a new view.
    ///
    /// Before the first frame the window exists when this returns. Afterwards
    /// creation is deferred to the next update and the future resolves then.
    /// Invalid traits or a backend failure leave the future unresolved.
    pub fn add_window(&mut self, traits: WindowTraits) -> Future<WindowId> {
        let result = Future::new();
        soft_assert!(
            traits.is_valid(),
            result,
            "window traits {}x{} are invalid",
            traits.width,
            traits.height
        );

        if self.realized {
            let deferred = result.clone();
            self.runtime
                .run_during_update(move |app| app.add_window_now(traits, &deferred));
        } else {
            self.add_window_now(traits, &result);
        }
        result
    }

    fn add_window_now(&mut self, mut traits: WindowTraits, result: &Future<WindowId>) {
        self.backend.device_wait_idle();

        traits.debug_layer = self.config.debug_layer;
        traits.api_dump_layer = self.config.api_dump_layer;
        if !self.config.vsync {
            traits.present_mode = PresentMode::Immediate;
        }
        traits.require_instance_extension(DEBUG_UTILS_EXTENSION);
        traits.require_feature(DeviceFeature::DepthClipControl);
        if self.config.wireframe_overlay {
            traits.require_feature(DeviceFeature::PolygonModeLine);
        }

        // Every window shares the first window's device.
        if let Some(first) = self.windows.values().next() {
            traits.device = Some(first.device);
        }

        let id = WindowId::new(self.next_window);
        let device = match self.backend.create_window(id, &traits) {
            Ok(device) => device,
            Err(e) => {
                log::error!("failed to create window \"{}\": {e}", traits.title);
                return;
            }
        };
        self.next_window += 1;

        let (width, height) = (traits.width, traits.height);
        self.windows.insert(
            id,
            WindowRecord {
                traits,
                device,
                command_graph: CommandGraph::new(id),
            },
        );
        self.display.insert_window(id);

        let camera = Camera::for_globe(self.map_node.ellipsoid.radius(), width, height).into_ref();
        let view = View::new(camera)
            .with_name(format!("window {} main view", id.raw()))
            .with_child(Arc::clone(&self.main_scene))
            .into_ref();

        if self.realized {
            self.attach_view_after_realize(id, view, None, &Future::new());
        } else {
            self.attach_view(id, view, None, &Future::new());
        }

        if self.windows.len() > 1 {
            self.map_node.settings.support_multi_threaded_record = true;
        }

        self.viewer.add_window(id);
        result.resolve(id);

        if self.config.debug_layer {
            let callback: DebugCallback = Arc::new(|severity, message| {
                if severity >= DebugSeverity::Warning {
                    log::warn!("[gpu] {message}");
                }
            });
            self.backend.install_debug_messenger(id, callback);
        }

        if self.realized {
            self.dirty = true;
        }
    }

    /// Closes a window and drops every view it shows.
    pub fn remove_window(&mut self, window: WindowId) {
        if self.realized {
            self.runtime
                .run_during_update(move |app| app.remove_window_now(window));
        } else {
            self.remove_window_now(window);
        }
    }

    fn remove_window_now(&mut self, window: WindowId) {
        soft_assert!(
            self.windows.contains_key(&window),
            (),
            "window {} is not part of this application",
            window.raw()
        );
        self.backend.device_wait_idle();

        let views = self.display.remove_window(window);
        for view in &views {
            self.view_data.remove(&view.id());
            self.viewer.release_view(view.id());
            self.backend.release_view(view.id());
            view.set_manipulator(None);
        }
        self.reorder_manipulators();

        self.windows.remove(&window);
        self.viewer.remove_window(window);
        self.backend.destroy_window(window);
        log::info!("window {} closed ({} views dropped)", window.raw(), views.len());

        if self.realized {
            self.dirty = true;
        }
    }

    /// Switches multi-threaded recording. Once realized this takes effect
    /// through a viewer rebuild on the next frame.
    pub fn set_threading(&mut self, threaded: bool) {
        if self.config.multithreaded == threaded {
            return;
        }
        self.config.multithreaded = threaded;
        if self.realized {
            self.dirty = true;
        } else {
            self.replace_viewer();
        }
    }

    /// Window currently showing `view`.
    pub fn get_window(&self, view: ViewId) -> Option<WindowId> {
        self.display.window_of(view)
    }

    pub fn get_command_graph(&self, window: WindowId) -> Option<&CommandGraph> {
        self.windows.get(&window).map(|w| &w.command_graph)
    }

    pub(super) fn command_graph_mut(&mut self, window: WindowId) -> Option<&mut CommandGraph> {
        self.windows.get_mut(&window).map(|w| &mut w.command_graph)
    }

    /// Device `window` renders with.
    pub fn window_device(&self, window: WindowId) -> Option<DeviceId> {
        self.windows.get(&window).map(|w| w.device)
    }
}
