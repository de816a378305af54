//! Input events.
//!
//! Public API is platform-agnostic and does not expose winit types.
//! Backends translate window-system events into [`InputEvent`]s.

mod event;
mod types;

pub use event::Event;
pub use types::{
    InputEvent,
    Key,
    KeyState,
    Modifiers,
    MouseButton,
    MouseButtonState,
    MouseWheelDelta,
    PointerButtonEvent,
};
