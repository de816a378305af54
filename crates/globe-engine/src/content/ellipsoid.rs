/// Reference ellipsoid of the globe.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ellipsoid {
    pub semi_major_axis: f64,
    pub semi_minor_axis: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        semi_major_axis: 6_378_137.0,
        semi_minor_axis: 6_356_752.314_245,
    };

    /// Radius used to size cameras and manipulator limits.
    #[inline]
    pub fn radius(&self) -> f64 {
        self.semi_major_axis
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}
