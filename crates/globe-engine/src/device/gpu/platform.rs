use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowAttributes};

use crate::device::{BackendError, WindowId, WindowTraits};
use crate::input::{
    Event, InputEvent, Key, KeyState, Modifiers, MouseButton, MouseButtonState, MouseWheelDelta,
    PointerButtonEvent,
};

/// Pumps needed before the platform hands out its first window.
const MAX_CREATE_PUMPS: usize = 16;

/// Non-blocking winit event loop feeding the frame loop.
///
/// Windows can only be created from inside winit callbacks, so creation
/// requests are queued and fulfilled by the next pump.
pub(super) struct Platform {
    event_loop: EventLoop<()>,
    state: PumpState,
}

impl Platform {
    pub(super) fn new() -> Result<Self, BackendError> {
        let event_loop = EventLoop::new().map_err(|e| BackendError::WindowCreation(e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Poll);
        Ok(Self {
            event_loop,
            state: PumpState::default(),
        })
    }

    pub(super) fn open_window(&mut self, id: WindowId, traits: &WindowTraits) -> Result<Arc<Window>, BackendError> {
        let attrs = Window::default_attributes()
            .with_title(traits.title.clone())
            .with_inner_size(PhysicalSize::new(traits.width, traits.height));
        self.state.pending.push((id, attrs));

        for _ in 0..MAX_CREATE_PUMPS {
            self.pump_once();
            if let Some(pos) = self.state.created.iter().position(|(w, _)| *w == id) {
                let (_, result) = self.state.created.remove(pos);
                return result.map_err(BackendError::WindowCreation);
            }
        }

        self.state.pending.retain(|(w, _)| *w != id);
        Err(BackendError::WindowCreation(
            "event loop never became ready for window creation".into(),
        ))
    }

    pub(super) fn close_window(&mut self, id: WindowId) {
        self.state.windows.retain(|_, tracked| tracked.id != id);
    }

    /// Runs one non-blocking pump and appends the translated events.
    pub(super) fn pump(&mut self, events: &mut Vec<Event>) {
        self.pump_once();
        events.append(&mut self.state.events);
    }

    fn pump_once(&mut self) {
        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.state);

        if let PumpStatus::Exit(code) = status {
            if !self.state.exited {
                log::info!("platform event loop exited with status {code}");
                self.state.exited = true;
            }
            // Closed loop: every remaining window is asked to close.
            let closing: Vec<WindowId> = self.state.windows.values().map(|t| t.id).collect();
            self.state
                .events
                .extend(closing.into_iter().map(|w| Event::new(w, InputEvent::CloseRequested)));
        }
    }
}

struct Tracked {
    id: WindowId,
    window: Arc<Window>,
    modifiers: Modifiers,
    pointer: Option<(f32, f32)>,
}

#[derive(Default)]
struct PumpState {
    resumed: bool,
    exited: bool,
    pending: Vec<(WindowId, WindowAttributes)>,
    created: Vec<(WindowId, Result<Arc<Window>, String>)>,
    windows: HashMap<winit::window::WindowId, Tracked>,
    events: Vec<Event>,
}

impl PumpState {
    fn create_pending(&mut self, event_loop: &ActiveEventLoop) {
        for (id, attrs) in self.pending.drain(..) {
            let result = event_loop
                .create_window(attrs)
                .map(Arc::new)
                .map_err(|e| e.to_string());

            if let Ok(window) = &result {
                self.windows.insert(
                    window.id(),
                    Tracked {
                        id,
                        window: Arc::clone(window),
                        modifiers: Modifiers::default(),
                        pointer: None,
                    },
                );
            }
            self.created.push((id, result));
        }
    }
}

impl ApplicationHandler for PumpState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        self.resumed = true;
        self.create_pending(event_loop);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.resumed {
            self.create_pending(event_loop);
        }
        for tracked in self.windows.values() {
            tracked.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(tracked) = self.windows.get_mut(&window_id) else {
            return;
        };

        if let Some(input) = translate_input_event(tracked, &event) {
            self.events.push(Event::new(tracked.id, input));
        }
    }
}

fn translate_input_event(tracked: &mut Tracked, event: &WindowEvent) -> Option<InputEvent> {
    match event {
        WindowEvent::CloseRequested => Some(InputEvent::CloseRequested),

        WindowEvent::Resized(size) => Some(InputEvent::Resized {
            width: size.width,
            height: size.height,
        }),

        WindowEvent::ScaleFactorChanged { .. } => {
            let size = tracked.window.inner_size();
            Some(InputEvent::Resized {
                width: size.width,
                height: size.height,
            })
        }

        WindowEvent::ModifiersChanged(m) => {
            let ms: ModifiersState = m.state();
            tracked.modifiers = map_modifiers(ms);
            Some(InputEvent::ModifiersChanged(tracked.modifiers))
        }

        WindowEvent::Focused(f) => Some(InputEvent::Focused(*f)),

        WindowEvent::CursorLeft { .. } => {
            tracked.pointer = None;
            Some(InputEvent::PointerLeft)
        }

        // Viewports are in physical pixels, so pointer coordinates are too.
        WindowEvent::CursorMoved { position, .. } => {
            let (x, y) = (position.x as f32, position.y as f32);
            tracked.pointer = Some((x, y));
            Some(InputEvent::PointerMoved { x, y })
        }

        WindowEvent::MouseInput { state: st, button, .. } => {
            let state = match st {
                ElementState::Pressed => MouseButtonState::Pressed,
                ElementState::Released => MouseButtonState::Released,
            };
            let (x, y) = tracked.pointer.unwrap_or((0.0, 0.0));

            Some(InputEvent::PointerButton(PointerButtonEvent {
                button: map_mouse_button(*button),
                state,
                x,
                y,
                modifiers: tracked.modifiers,
            }))
        }

        WindowEvent::MouseWheel { delta, .. } => {
            let delta = match delta {
                MouseScrollDelta::LineDelta(x, y) => MouseWheelDelta::Line { x: *x, y: *y },
                MouseScrollDelta::PixelDelta(p) => MouseWheelDelta::Pixel {
                    x: p.x as f32,
                    y: p.y as f32,
                },
            };
            Some(InputEvent::MouseWheel {
                delta,
                modifiers: tracked.modifiers,
            })
        }

        WindowEvent::KeyboardInput { event, .. } => {
            let state = match event.state {
                ElementState::Pressed => KeyState::Pressed,
                ElementState::Released => KeyState::Released,
            };

            Some(InputEvent::Key {
                key: map_key(event.physical_key),
                state,
                modifiers: tracked.modifiers,
                repeat: event.repeat,
            })
        }

        _ => None,
    }
}

fn map_modifiers(m: ModifiersState) -> Modifiers {
    Modifiers {
        shift: m.shift_key(),
        ctrl: m.control_key(),
        alt: m.alt_key(),
        meta: m.super_key(),
    }
}

fn map_mouse_button(b: WinitMouseButton) -> MouseButton {
    match b {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Other(3),
        WinitMouseButton::Forward => MouseButton::Other(4),
        WinitMouseButton::Other(v) => MouseButton::Other(v),
    }
}

fn map_key(pk: PhysicalKey) -> Key {
    match pk {
        PhysicalKey::Code(code) => match code {
            KeyCode::Escape => Key::Escape,
            KeyCode::Enter => Key::Enter,
            KeyCode::Space => Key::Space,
            KeyCode::Home => Key::Home,

            KeyCode::ArrowUp => Key::ArrowUp,
            KeyCode::ArrowDown => Key::ArrowDown,
            KeyCode::ArrowLeft => Key::ArrowLeft,
            KeyCode::ArrowRight => Key::ArrowRight,

            KeyCode::ShiftLeft | KeyCode::ShiftRight => Key::Shift,
            KeyCode::ControlLeft | KeyCode::ControlRight => Key::Control,
            KeyCode::AltLeft | KeyCode::AltRight => Key::Alt,
            KeyCode::SuperLeft | KeyCode::SuperRight => Key::Meta,

            other => Key::Unknown(other as u32),
        },

        // NativeKeyCode is not a u32 in winit 0.30.
        PhysicalKey::Unidentified(_) => Key::Unknown(0),
    }
}
