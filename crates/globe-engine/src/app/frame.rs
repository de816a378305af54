use std::time::Instant;

use anyhow::Context;

use crate::device::{CompileScope, ResourceHints, WindowTraits};
use crate::graph::CommandGraph;
use crate::time::{FrameStats, PhaseMarks};
use crate::viewer::{CloseHandler, HandlerKind, InstalledHandler};

use super::Application;

/// Where the application is in its lifecycle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoopState {
    /// No frame has run; structural changes apply inline.
    Unrealized,
    /// Realized; structural changes are queued for the next update.
    Stable,
    /// A change invalidated the viewer; the next frame rebuilds it.
    Dirty,
}

impl Application {
    pub fn state(&self) -> LoopState {
        match (self.realized, self.dirty) {
            (false, _) => LoopState::Unrealized,
            (true, false) => LoopState::Stable,
            (true, true) => LoopState::Dirty,
        }
    }

    /// Appends a handler to the viewer's event handler list. Handlers survive
    /// viewer rebuilds.
    pub fn add_event_handler(&mut self, handler: InstalledHandler) {
        self.viewer.add_event_handler(handler);
    }

    /// Opens the default window if none was added, then binds every window
    /// to the viewer. Runs once; later calls do nothing.
    pub fn realize(&mut self) {
        if self.realized {
            return;
        }
        if self.windows.is_empty() {
            self.add_window(WindowTraits::default());
        }
        self.setup_viewer();
        self.realized = true;
        log::info!("viewer realized with {} windows", self.windows.len());
    }

    fn setup_viewer(&mut self) {
        self.systems.initialize(&mut self.runtime);

        if !self.viewer.has_handler(HandlerKind::Close) {
            self.viewer
                .add_event_handler(InstalledHandler::new(HandlerKind::Close, CloseHandler));
        }

        let windows = self.window_ids();
        self.viewer
            .assign_record_and_submit_task_and_presentation(windows);

        // One set per pool; pools grow on demand.
        let hints = ResourceHints {
            num_descriptor_sets: 1,
            descriptor_pool_sizes: Vec::new(),
        };
        let graphs: Vec<&CommandGraph> = self.windows.values().map(|w| &w.command_graph).collect();
        match self.backend.compile(CompileScope::Graphs(&graphs), Some(&hints)) {
            Ok(result) => log::debug!(
                "initial compile: {} resources, {} new views",
                result.compiled,
                result.new_views.len()
            ),
            Err(e) => log::error!("initial compile failed: {e}"),
        }

        for (window, views) in self.display.iter() {
            for view in views {
                self.viewer.compile_manager.add(window, view.id());
            }
        }

        // The compile above built every pipeline against the current defines.
        self.runtime.take_shaders_dirty();
    }

    /// Swaps in an empty viewer carrying over the frame clock, the window
    /// list and the handler list.
    pub(super) fn replace_viewer(&mut self) {
        let handlers = self.viewer.event_handlers().to_vec();
        let mut viewer = self.viewer.successor(self.config.multithreaded);
        for window in self.windows.keys() {
            viewer.add_window(*window);
        }
        for handler in handlers {
            viewer.add_event_handler(handler);
        }
        self.viewer = viewer;
    }

    fn recreate_viewer(&mut self) {
        self.backend.device_wait_idle();
        self.replace_viewer();
        self.setup_viewer();
        self.rebuilds += 1;
        log::debug!("viewer rebuilt ({} so far)", self.rebuilds);
    }

    /// Runs one frame. Returns `Ok(false)` once the viewer stopped.
    ///
    /// Phases, in order: advance and poll, map update, system updates, the
    /// update function, event dispatch, queued operations, runtime update,
    /// then record and present. A frame that rebuilds the viewer stops after
    /// the runtime update and records nothing.
    pub fn frame(&mut self) -> anyhow::Result<bool> {
        if !self.realized {
            self.realize();
        }

        let start = Instant::now();
        if !self.viewer.advance_to_next_frame(self.backend.as_mut()) {
            return Ok(false);
        }
        let update = Instant::now();

        let stamp = self.viewer.frame_stamp();
        self.map_node.update(&stamp);
        self.systems.update(stamp.time);
        self.systems.update_gpu(&mut self.runtime);

        if let Some(mut f) = self.update_function.take() {
            f(self);
            // The callback may have installed a replacement.
            if self.update_function.is_none() {
                self.update_function = Some(f);
            }
        }

        // After the scene update, so handlers tethered to moving content see
        // this frame's positions.
        self.viewer.handle_events();

        for op in self.runtime.take_operations() {
            op(self);
        }

        self.runtime.update(&mut self.viewer, self.backend.as_mut());
        if self.runtime.take_shaders_dirty() {
            self.rebuild_all_pipelines();
        }

        if self.dirty {
            self.dirty = false;
            self.recreate_viewer();
            return Ok(self.viewer.active());
        }

        let record = Instant::now();
        let graphs: Vec<&CommandGraph> = self.windows.values().map(|w| &w.command_graph).collect();
        self.viewer
            .record_and_submit(self.backend.as_mut(), &graphs)
            .context("record and submit failed")?;

        let present = Instant::now();
        self.viewer
            .present(self.backend.as_mut())
            .context("present failed")?;

        self.stats = FrameStats::from_marks(PhaseMarks {
            start,
            update,
            record,
            present,
            end: Instant::now(),
        });

        Ok(self.viewer.active())
    }

    /// Runs frames until the viewer stops. Returns the process exit code.
    pub fn run(&mut self) -> i32 {
        loop {
            match self.frame() {
                Ok(true) => {}
                Ok(false) => return 0,
                Err(e) => {
                    log::error!("frame loop aborted: {e:#}");
                    return 1;
                }
            }
        }
    }

    fn rebuild_all_pipelines(&mut self) {
        self.backend.device_wait_idle();
        for record in self.windows.values_mut() {
            for rg in record.command_graph.children_mut() {
                rg.bump_pipeline_revision();
                if let Err(e) = self.backend.rebuild_pipelines(rg) {
                    log::warn!("pipeline rebuild for render graph {:?} failed: {e}", rg.id());
                }
            }
        }
    }
}
