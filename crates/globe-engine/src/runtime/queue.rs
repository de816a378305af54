use std::sync::mpsc::{self, Receiver, Sender};

use crate::app::Application;

/// Structural mutation deferred to the frame loop's safe point.
pub type Operation = Box<dyn FnOnce(&mut Application) + Send>;

/// Sending half of the deferred-operation queue.
///
/// Cloneable and `Send`: any thread may schedule work, but operations only
/// ever run on the frame thread.
#[derive(Clone)]
pub struct UpdateQueue {
    tx: Sender<Operation>,
}

impl UpdateQueue {
    pub fn run_during_update(&self, op: impl FnOnce(&mut Application) + Send + 'static) {
        // The receiver lives as long as the application; a send error means
        // the application is gone and the operation has nothing to run on.
        if self.tx.send(Box::new(op)).is_err() {
            log::debug!("update queue closed; operation dropped");
        }
    }
}

pub(super) struct OperationQueue {
    tx: Sender<Operation>,
    rx: Receiver<Operation>,
}

impl OperationQueue {
    pub(super) fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub(super) fn handle(&self) -> UpdateQueue {
        UpdateQueue { tx: self.tx.clone() }
    }

    pub(super) fn push(&self, op: Operation) {
        // Both halves are owned here, so the channel cannot be closed.
        let _ = self.tx.send(op);
    }

    /// Everything queued so far, in enqueue order. Operations queued while
    /// the snapshot runs land in the next one.
    pub(super) fn snapshot(&self) -> Vec<Operation> {
        self.rx.try_iter().collect()
    }
}
