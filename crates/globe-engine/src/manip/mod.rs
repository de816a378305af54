//! Camera manipulators.
//!
//! A [`MapManipulator`] orbits its view's camera around the globe center. It
//! lives in the view's metadata slot and in the viewer's handler list; the
//! handler list order decides which overlapping view sees input first.

use std::f64::consts::FRAC_PI_2;
use std::sync::{Arc, Mutex};

use glam::DVec3;

use crate::camera::{CameraRef, LookAt, ViewportState};
use crate::device::WindowId;
use crate::input::{Event, InputEvent, Key, MouseButton, MouseButtonState};
use crate::util::sync::lock;
use crate::viewer::{EventHandler, HandlerCtx};

pub type ManipulatorRef = Arc<Mutex<MapManipulator>>;

/// Radians of orbit per pixel of drag.
const ROTATE_SPEED: f64 = 0.005;

/// Distance scale per wheel line.
const ZOOM_STEP: f64 = 0.9;

/// Elevation stays clear of the poles so `up` never aligns with the view
/// direction.
const MAX_ELEVATION: f64 = FRAC_PI_2 - 0.01;

#[derive(Debug)]
pub struct MapManipulator {
    window: WindowId,
    camera: CameraRef,
    home: LookAt,

    azimuth: f64,
    elevation: f64,
    distance: f64,
    min_distance: f64,
    max_distance: f64,

    dragging: bool,
    last_pointer: Option<(f32, f32)>,
}

impl MapManipulator {
    /// Starts from the camera's current eye; that pose is also "home".
    pub fn new(window: WindowId, camera: CameraRef, radius: f64) -> Self {
        let home = lock(&camera).view;
        let mut m = Self {
            window,
            camera,
            home,
            azimuth: 0.0,
            elevation: 0.0,
            distance: 0.0,
            min_distance: radius * 1.0001,
            max_distance: radius * 10.0,
            dragging: false,
            last_pointer: None,
        };
        m.load_pose(home);
        m
    }

    pub fn into_ref(self) -> ManipulatorRef {
        Arc::new(Mutex::new(self))
    }

    #[inline]
    pub fn window(&self) -> WindowId {
        self.window
    }

    #[inline]
    pub fn camera(&self) -> &CameraRef {
        &self.camera
    }

    #[inline]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    #[inline]
    pub fn azimuth(&self) -> f64 {
        self.azimuth
    }

    #[inline]
    pub fn elevation(&self) -> f64 {
        self.elevation
    }

    /// Returns to the pose the manipulator was created with.
    pub fn home(&mut self) {
        self.load_pose(self.home);
        self.apply();
    }

    pub fn rotate(&mut self, daz: f64, del: f64) {
        self.azimuth += daz;
        self.elevation = (self.elevation + del).clamp(-MAX_ELEVATION, MAX_ELEVATION);
        self.apply();
    }

    /// Scales the orbit distance, clamped between just above the surface
    /// and ten radii.
    pub fn zoom(&mut self, factor: f64) {
        self.distance = (self.distance * factor).clamp(self.min_distance, self.max_distance);
        self.apply();
    }

    fn load_pose(&mut self, pose: LookAt) {
        let offset = pose.eye - pose.center;
        let distance = offset.length();
        self.distance = distance.clamp(self.min_distance, self.max_distance);
        if distance > 0.0 {
            self.azimuth = offset.y.atan2(offset.x);
            self.elevation = (offset.z / distance).asin().clamp(-MAX_ELEVATION, MAX_ELEVATION);
        }
    }

    fn apply(&self) {
        let (sa, ca) = self.azimuth.sin_cos();
        let (se, ce) = self.elevation.sin_cos();
        let eye = DVec3::new(ce * ca, ce * sa, se) * self.distance;
        lock(&self.camera).view = LookAt {
            eye,
            center: DVec3::ZERO,
            up: DVec3::Z,
        };
    }

    fn viewport(&self) -> ViewportState {
        lock(&self.camera).viewport
    }

    fn pointer_inside(&self, x: f32, y: f32) -> bool {
        self.viewport().contains(x, y)
    }
}

impl EventHandler for MapManipulator {
    fn handle(&mut self, event: &mut Event, _ctx: &mut HandlerCtx) {
        if event.window != self.window {
            return;
        }

        match &event.input {
            InputEvent::PointerMoved { x, y } => {
                let (x, y) = (*x, *y);
                if self.dragging && !event.handled {
                    if let Some((lx, ly)) = self.last_pointer {
                        let dx = (x - lx) as f64;
                        let dy = (y - ly) as f64;
                        self.rotate(-dx * ROTATE_SPEED, dy * ROTATE_SPEED);
                    }
                    event.handled = true;
                }
                self.last_pointer = Some((x, y));
            }

            InputEvent::PointerLeft => {
                self.dragging = false;
                self.last_pointer = None;
            }

            _ if event.handled => {}

            InputEvent::PointerButton(b) if b.button == MouseButton::Left => match b.state {
                MouseButtonState::Pressed => {
                    if self.pointer_inside(b.x, b.y) {
                        self.dragging = true;
                        self.last_pointer = Some((b.x, b.y));
                        event.handled = true;
                    }
                }
                MouseButtonState::Released => {
                    if self.dragging {
                        self.dragging = false;
                        event.handled = true;
                    }
                }
            },

            // Wheel events carry no position; an unseen pointer belongs to
            // no view.
            InputEvent::MouseWheel { delta, .. } => {
                let inside = self
                    .last_pointer
                    .is_some_and(|(x, y)| self.pointer_inside(x, y));
                if inside {
                    self.zoom(ZOOM_STEP.powf(delta.lines_y() as f64));
                    event.handled = true;
                }
            }

            InputEvent::Key { .. } if event.is_key_press(Key::Space) || event.is_key_press(Key::Home) => {
                self.home();
                event.handled = true;
            }

            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::input::{KeyState, Modifiers, MouseWheelDelta, PointerButtonEvent};
    use crate::time::FrameStamp;

    const R: f64 = 6_378_137.0;

    fn manipulator(viewport: ViewportState) -> MapManipulator {
        let mut cam = Camera::for_globe(R, 800, 600);
        cam.set_viewport(viewport);
        MapManipulator::new(WindowId::new(1), cam.into_ref(), R)
    }

    fn ctx() -> HandlerCtx {
        HandlerCtx::new(FrameStamp::initial(std::time::Instant::now()))
    }

    fn press(x: f32, y: f32) -> InputEvent {
        InputEvent::PointerButton(PointerButtonEvent {
            button: MouseButton::Left,
            state: MouseButtonState::Pressed,
            x,
            y,
            modifiers: Modifiers::default(),
        })
    }

    fn send(m: &mut MapManipulator, input: InputEvent) -> Event {
        let mut e = Event::new(WindowId::new(1), input);
        m.handle(&mut e, &mut ctx());
        e
    }

    #[test]
    fn pose_derives_from_camera_eye() {
        let m = manipulator(ViewportState::new(0, 0, 800, 600));
        assert!((m.distance() - 3.0 * R).abs() < 1e-3);
        assert!(m.azimuth().abs() < 1e-12);
        assert!(m.elevation().abs() < 1e-12);
    }

    #[test]
    fn drag_inside_viewport_rotates() {
        let mut m = manipulator(ViewportState::new(0, 0, 800, 600));
        assert!(send(&mut m, press(100.0, 100.0)).handled);
        assert!(send(&mut m, InputEvent::PointerMoved { x: 140.0, y: 100.0 }).handled);
        assert!(m.azimuth() < 0.0);

        let eye = lock(m.camera()).view.eye;
        assert!((eye.length() - 3.0 * R).abs() < 1e-3);
    }

    #[test]
    fn press_outside_viewport_is_left_for_others() {
        let mut m = manipulator(ViewportState::new(0, 0, 100, 100));
        assert!(!send(&mut m, press(500.0, 500.0)).handled);
    }

    #[test]
    fn handled_events_are_skipped() {
        let mut m = manipulator(ViewportState::new(0, 0, 800, 600));
        let mut e = Event::new(WindowId::new(1), press(10.0, 10.0));
        e.handled = true;
        m.handle(&mut e, &mut ctx());
        assert!(!m.dragging);
    }

    #[test]
    fn other_windows_are_ignored() {
        let mut m = manipulator(ViewportState::new(0, 0, 800, 600));
        let mut e = Event::new(WindowId::new(2), press(10.0, 10.0));
        m.handle(&mut e, &mut ctx());
        assert!(!e.handled);
    }

    fn wheel() -> InputEvent {
        InputEvent::MouseWheel {
            delta: MouseWheelDelta::Line { x: 0.0, y: 1.0 },
            modifiers: Modifiers::default(),
        }
    }

    #[test]
    fn wheel_zoom_is_clamped() {
        let mut m = manipulator(ViewportState::new(0, 0, 800, 600));
        send(&mut m, InputEvent::PointerMoved { x: 400.0, y: 300.0 });
        for _ in 0..500 {
            assert!(send(&mut m, wheel()).handled);
        }
        assert!(m.distance() >= R);
    }

    #[test]
    fn wheel_needs_a_known_pointer_inside_the_viewport() {
        let mut m = manipulator(ViewportState::new(0, 0, 100, 100));
        let start = m.distance();
        assert!(!send(&mut m, wheel()).handled);

        send(&mut m, InputEvent::PointerMoved { x: 500.0, y: 500.0 });
        assert!(!send(&mut m, wheel()).handled);
        assert_eq!(m.distance(), start);

        send(&mut m, InputEvent::PointerMoved { x: 50.0, y: 50.0 });
        assert!(send(&mut m, wheel()).handled);
        assert!(m.distance() < start);
    }

    #[test]
    fn space_returns_home() {
        let mut m = manipulator(ViewportState::new(0, 0, 800, 600));
        m.rotate(1.0, 0.5);
        let e = send(
            &mut m,
            InputEvent::Key {
                key: Key::Space,
                state: KeyState::Pressed,
                modifiers: Modifiers::default(),
                repeat: false,
            },
        );
        assert!(e.handled);
        assert!(m.azimuth().abs() < 1e-12);
    }
}
