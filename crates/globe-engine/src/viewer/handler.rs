use std::sync::{Arc, Mutex};

use crate::input::{Event, InputEvent, Key};
use crate::time::FrameStamp;
use crate::view::ViewId;

/// Context handed to every event handler.
#[derive(Debug)]
pub struct HandlerCtx {
    pub frame: FrameStamp,
    close_requested: bool,
}

impl HandlerCtx {
    pub fn new(frame: FrameStamp) -> Self {
        Self {
            frame,
            close_requested: false,
        }
    }

    /// Stops the viewer once dispatch of the current frame completes.
    pub fn close(&mut self) {
        self.close_requested = true;
    }

    #[inline]
    pub fn close_requested(&self) -> bool {
        self.close_requested
    }
}

pub trait EventHandler: Send {
    fn handle(&mut self, event: &mut Event, ctx: &mut HandlerCtx);
}

pub type SharedHandler = Arc<Mutex<dyn EventHandler>>;

/// What an installed handler is, so passes over the handler list can find
/// their own entries.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum HandlerKind {
    Close,
    Manipulator(ViewId),
    User,
}

impl HandlerKind {
    #[inline]
    pub fn is_manipulator(self) -> bool {
        matches!(self, HandlerKind::Manipulator(_))
    }
}

#[derive(Clone)]
pub struct InstalledHandler {
    pub kind: HandlerKind,
    pub handler: SharedHandler,
}

impl InstalledHandler {
    pub fn new(kind: HandlerKind, handler: impl EventHandler + 'static) -> Self {
        Self {
            kind,
            handler: Arc::new(Mutex::new(handler)),
        }
    }

    pub fn shared(kind: HandlerKind, handler: SharedHandler) -> Self {
        Self { kind, handler }
    }
}

impl std::fmt::Debug for InstalledHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstalledHandler").field("kind", &self.kind).finish()
    }
}

/// Closes the viewer when a window asks to close or Escape is pressed.
#[derive(Debug, Default)]
pub struct CloseHandler;

impl EventHandler for CloseHandler {
    fn handle(&mut self, event: &mut Event, ctx: &mut HandlerCtx) {
        if event.handled {
            return;
        }
        if matches!(event.input, InputEvent::CloseRequested) || event.is_key_press(Key::Escape) {
            log::info!("close requested from window {}", event.window.raw());
            ctx.close();
            event.handled = true;
        }
    }
}
