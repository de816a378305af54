//! Cameras: projection, look-at view and viewport.

use std::sync::{Arc, Mutex};

use glam::{DMat4, DVec3};

/// Shared camera handle. A view and its manipulator hold the same camera.
pub type CameraRef = Arc<Mutex<Camera>>;

/// Near plane as a fraction of the ellipsoid radius.
pub const NEAR_FAR_RATIO: f64 = 0.00001;

/// Far plane as a multiple of the ellipsoid radius.
pub const FAR_RADII: f64 = 20.0;

/// Default vertical field of view, in degrees.
pub const DEFAULT_FOVY: f64 = 30.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Perspective {
    pub fovy_degrees: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

impl Perspective {
    pub fn matrix(&self) -> DMat4 {
        DMat4::perspective_rh(self.fovy_degrees.to_radians(), self.aspect, self.near, self.far)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LookAt {
    pub eye: DVec3,
    pub center: DVec3,
    pub up: DVec3,
}

impl LookAt {
    pub fn matrix(&self) -> DMat4 {
        DMat4::look_at_rh(self.eye, self.center, self.up)
    }
}

impl Default for LookAt {
    fn default() -> Self {
        Self {
            eye: DVec3::ZERO,
            center: DVec3::Y,
            up: DVec3::Z,
        }
    }
}

/// Viewport rectangle in window pixels (top-left origin).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ViewportState {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ViewportState {
    #[inline]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Half-open containment: `[min, max)`.
    pub fn contains(&self, px: f32, py: f32) -> bool {
        let (x0, y0) = (self.x as f32, self.y as f32);
        px >= x0 && py >= y0 && px < x0 + self.width as f32 && py < y0 + self.height as f32
    }

    pub fn aspect(&self) -> f64 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f64 / self.height as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub projection: Perspective,
    pub view: LookAt,
    pub viewport: ViewportState,
}

impl Camera {
    pub fn new(projection: Perspective, view: LookAt, viewport: ViewportState) -> Self {
        Self {
            projection,
            view,
            viewport,
        }
    }

    /// Camera sized to a globe of `radius` meters, covering a
    /// `width`×`height` window.
    ///
    /// Near is `radius * NEAR_FAR_RATIO`, far is `radius * FAR_RADII`; the eye
    /// starts three radii out on +X looking at the center.
    pub fn for_globe(radius: f64, width: u32, height: u32) -> Self {
        let viewport = ViewportState::new(0, 0, width, height);
        Self {
            projection: Perspective {
                fovy_degrees: DEFAULT_FOVY,
                aspect: viewport.aspect(),
                near: radius * NEAR_FAR_RATIO,
                far: radius * FAR_RADII,
            },
            view: LookAt {
                eye: DVec3::new(radius * 3.0, 0.0, 0.0),
                center: DVec3::ZERO,
                up: DVec3::Z,
            },
            viewport,
        }
    }

    pub fn into_ref(self) -> CameraRef {
        Arc::new(Mutex::new(self))
    }

    /// Resizes the viewport and keeps the projection aspect in sync.
    pub fn set_viewport(&mut self, viewport: ViewportState) {
        self.viewport = viewport;
        self.projection.aspect = viewport.aspect();
    }

    pub fn view_projection(&self) -> DMat4 {
        self.projection.matrix() * self.view.matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: f64 = 6_378_137.0;

    #[test]
    fn globe_camera_planes_follow_radius() {
        let cam = Camera::for_globe(R, 1920, 1080);
        assert!((cam.projection.near - R * 1e-5).abs() < 1e-6);
        assert!((cam.projection.far - R * 20.0).abs() < 1e-3);
        assert!((cam.projection.aspect - 1920.0 / 1080.0).abs() < 1e-12);
        assert_eq!(cam.viewport, ViewportState::new(0, 0, 1920, 1080));
    }

    #[test]
    fn viewport_contains_is_half_open() {
        let vp = ViewportState::new(10, 20, 100, 50);
        assert!(vp.contains(10.0, 20.0));
        assert!(vp.contains(109.9, 69.9));
        assert!(!vp.contains(110.0, 30.0));
        assert!(!vp.contains(50.0, 19.0));
    }

    #[test]
    fn zero_height_viewport_has_unit_aspect() {
        assert_eq!(ViewportState::new(0, 0, 10, 0).aspect(), 1.0);
    }

    #[test]
    fn set_viewport_updates_aspect() {
        let mut cam = Camera::for_globe(R, 800, 800);
        cam.set_viewport(ViewportState::new(0, 0, 400, 200));
        assert_eq!(cam.projection.aspect, 2.0);
    }
}
