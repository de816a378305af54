//! Frame-thread services shared by the application and its content:
//! - the deferred-operation queue drained once per frame at the safe point
//! - queued compiles of scene subtrees, including asynchronously built children
//! - shader defines
//! - deferred disposal of objects the GPU may still reference

mod queue;

use std::any::Any;
use std::collections::{BTreeSet, VecDeque};
use std::sync::mpsc::{self, Receiver, Sender};

use crate::app::Application;
use crate::device::{Backend, CompileScope};
use crate::scene::NodeRef;
use crate::util::sync::write;
use crate::util::Future;
use crate::viewer::Viewer;

pub use queue::{Operation, UpdateQueue};
use queue::OperationQueue;

/// Swapchain images the GPU may have in flight at once.
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 3;

struct BuiltChild {
    parent: NodeRef,
    child: Option<NodeRef>,
    done: Future<bool>,
}

pub struct Runtime {
    ops: OperationQueue,

    shader_defines: BTreeSet<String>,
    shader_revision: u64,
    shaders_dirty: bool,

    to_compile: Vec<NodeRef>,
    built_tx: Sender<BuiltChild>,
    built_rx: Receiver<BuiltChild>,

    disposal: VecDeque<Vec<Box<dyn Any + Send>>>,
    frames_in_flight: usize,
}

impl Runtime {
    pub fn new(frames_in_flight: usize) -> Self {
        let (built_tx, built_rx) = mpsc::channel();
        let mut disposal = VecDeque::new();
        disposal.push_back(Vec::new());
        Self {
            ops: OperationQueue::new(),
            shader_defines: BTreeSet::new(),
            shader_revision: 0,
            shaders_dirty: false,
            to_compile: Vec::new(),
            built_tx,
            built_rx,
            disposal,
            frames_in_flight: frames_in_flight.max(1),
        }
    }

    // ── deferred operations ──────────────────────────────────────────────

    pub fn run_during_update(&self, op: impl FnOnce(&mut Application) + Send + 'static) {
        self.ops.push(Box::new(op));
    }

    /// Handle for scheduling operations from other threads.
    pub fn queue(&self) -> UpdateQueue {
        self.ops.handle()
    }

    pub(crate) fn take_operations(&self) -> Vec<Operation> {
        self.ops.snapshot()
    }

    // ── shader defines ───────────────────────────────────────────────────

    /// Returns `false` if `name` was already defined.
    pub fn define(&mut self, name: impl Into<String>) -> bool {
        let inserted = self.shader_defines.insert(name.into());
        if inserted {
            self.dirty_shaders();
        }
        inserted
    }

    pub fn undefine(&mut self, name: &str) -> bool {
        let removed = self.shader_defines.remove(name);
        if removed {
            self.dirty_shaders();
        }
        removed
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.shader_defines.contains(name)
    }

    #[inline]
    pub fn defines(&self) -> &BTreeSet<String> {
        &self.shader_defines
    }

    #[inline]
    pub fn shader_revision(&self) -> u64 {
        self.shader_revision
    }

    /// Forces pipelines to be regenerated on the next update.
    pub fn dirty_shaders(&mut self) {
        self.shader_revision += 1;
        self.shaders_dirty = true;
    }

    pub(crate) fn take_shaders_dirty(&mut self) -> bool {
        std::mem::take(&mut self.shaders_dirty)
    }

    // ── compiles ─────────────────────────────────────────────────────────

    /// Queues `node` for compilation on the next update.
    pub fn compile(&mut self, node: NodeRef) {
        self.to_compile.push(node);
    }

    #[inline]
    pub fn pending_compiles(&self) -> usize {
        self.to_compile.len()
    }

    /// Builds a child on a worker thread, then compiles it and adds it to
    /// `parent` during a later update.
    ///
    /// The future resolves `true` once the child is in the scene, `false` if
    /// the factory produced nothing or `parent` is a content leaf.
    pub fn compile_and_add_child<F>(&self, parent: NodeRef, factory: F) -> Future<bool>
    where
        F: FnOnce() -> Option<NodeRef> + Send + 'static,
    {
        let done = Future::new();
        let result = done.clone();
        let tx = self.built_tx.clone();
        let spawned = std::thread::Builder::new()
            .name("globe-child-factory".into())
            .spawn(move || {
                let child = factory();
                let _ = tx.send(BuiltChild { parent, child, done });
            });
        if let Err(e) = spawned {
            log::warn!("could not spawn child factory: {e}");
            result.resolve(false);
        }
        result
    }

    // ── disposal ─────────────────────────────────────────────────────────

    /// Keeps `object` alive until the GPU can no longer reference it.
    pub fn dispose(&mut self, object: impl Any + Send) {
        if let Some(slot) = self.disposal.back_mut() {
            slot.push(Box::new(object));
        }
    }

    pub fn pending_disposals(&self) -> usize {
        self.disposal.iter().map(Vec::len).sum()
    }

    // ── per-frame ────────────────────────────────────────────────────────

    /// Runs queued compiles, attaches finished children and advances the
    /// disposal ring. Returns the number of resources compiled.
    pub fn update(&mut self, viewer: &mut Viewer, backend: &mut dyn Backend) -> usize {
        let mut compiled = 0;

        for node in std::mem::take(&mut self.to_compile) {
            compiled += compile_node(&node, viewer, backend).unwrap_or(0);
        }

        let built: Vec<BuiltChild> = self.built_rx.try_iter().collect();
        for b in built {
            let Some(child) = b.child else {
                b.done.resolve(false);
                continue;
            };
            compiled += compile_node(&child, viewer, backend).unwrap_or(0);
            let added = write(&b.parent).add_child(child);
            b.done.resolve(added);
        }

        self.disposal.push_back(Vec::new());
        while self.disposal.len() > self.frames_in_flight {
            self.disposal.pop_front();
        }

        compiled
    }
}

fn compile_node(node: &NodeRef, viewer: &mut Viewer, backend: &mut dyn Backend) -> Option<usize> {
    match backend.compile(CompileScope::Node(node), None) {
        Ok(result) => {
            if result.requires_viewer_update() {
                viewer.update_viewer(&result);
            }
            Some(result.compiled)
        }
        Err(e) => {
            log::warn!("node compile failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::device::{CompileRecord, HeadlessBackend};
    use crate::scene::{ContentKind, Node};
    use crate::util::sync::read;

    fn pump_until(rt: &mut Runtime, viewer: &mut Viewer, backend: &mut HeadlessBackend, f: &Future<bool>) {
        for _ in 0..200 {
            rt.update(viewer, backend);
            if f.is_available() {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    // ── shader defines ───────────────────────────────────────────────────

    #[test]
    fn defines_bump_revision_only_on_change() {
        let mut rt = Runtime::new(3);
        assert!(rt.define("LIGHTING"));
        assert!(!rt.define("LIGHTING"));
        assert_eq!(rt.shader_revision(), 1);
        assert!(rt.take_shaders_dirty());
        assert!(!rt.take_shaders_dirty());

        assert!(rt.undefine("LIGHTING"));
        assert!(!rt.is_defined("LIGHTING"));
        assert_eq!(rt.shader_revision(), 2);
    }

    // ── compiles ─────────────────────────────────────────────────────────

    #[test]
    fn queued_compile_runs_on_update() {
        let mut rt = Runtime::new(3);
        let mut viewer = Viewer::new(false);
        let mut backend = HeadlessBackend::new();
        let probe = backend.probe();

        rt.compile(Node::content(ContentKind::Sky, 2));
        assert_eq!(rt.pending_compiles(), 1);
        assert_eq!(rt.update(&mut viewer, &mut backend), 2);
        assert_eq!(rt.pending_compiles(), 0);
        assert_eq!(probe.log().compiles, vec![CompileRecord::Node { resources: 2 }]);
    }

    #[test]
    fn built_child_is_added_and_resolves_true() {
        let mut rt = Runtime::new(3);
        let mut viewer = Viewer::new(false);
        let mut backend = HeadlessBackend::new();
        let parent = Node::group();

        let f = rt.compile_and_add_child(Arc::clone(&parent), || Some(Node::content(ContentKind::Map, 1)));
        pump_until(&mut rt, &mut viewer, &mut backend, &f);

        assert_eq!(f.value(), Some(true));
        assert_eq!(read(&parent).children().len(), 1);
    }

    #[test]
    fn empty_factory_resolves_false() {
        let mut rt = Runtime::new(3);
        let mut viewer = Viewer::new(false);
        let mut backend = HeadlessBackend::new();
        let parent = Node::group();

        let f = rt.compile_and_add_child(Arc::clone(&parent), || None);
        pump_until(&mut rt, &mut viewer, &mut backend, &f);

        assert_eq!(f.value(), Some(false));
        assert!(read(&parent).children().is_empty());
    }

    // ── disposal ─────────────────────────────────────────────────────────

    #[test]
    fn disposed_objects_outlive_frames_in_flight() {
        let mut rt = Runtime::new(2);
        let mut viewer = Viewer::new(false);
        let mut backend = HeadlessBackend::new();
        let tracked = Arc::new(());

        rt.dispose(Arc::clone(&tracked));
        assert_eq!(Arc::strong_count(&tracked), 2);

        rt.update(&mut viewer, &mut backend);
        assert_eq!(Arc::strong_count(&tracked), 2);

        rt.update(&mut viewer, &mut backend);
        assert_eq!(Arc::strong_count(&tracked), 1);
        assert_eq!(rt.pending_disposals(), 0);
    }
}
