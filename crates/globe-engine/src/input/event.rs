use crate::device::WindowId;

use super::types::{InputEvent, Key, KeyState};

/// One input event routed through the viewer's handler list.
///
/// Handlers run in list order. A handler that consumes the event sets
/// `handled`; handlers further down are expected to skip handled events.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub window: WindowId,
    pub input: InputEvent,
    pub handled: bool,
}

impl Event {
    pub fn new(window: WindowId, input: InputEvent) -> Self {
        Self {
            window,
            input,
            handled: false,
        }
    }

    /// True for a key press (not release) of `key`.
    pub fn is_key_press(&self, key: Key) -> bool {
        matches!(
            self.input,
            InputEvent::Key { key: k, state: KeyState::Pressed, .. } if k == key
        )
    }
}
