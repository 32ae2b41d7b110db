// SPDX: CC0-1.0

use crate::{Complex, Number};
use core::{fmt, ops::Range};

pub const MIN_RESOLUTION: u16 = 50;
pub const MAX_RESOLUTION: u16 = 1000;
/// Odd, so that the center of the window is sampled exactly.
pub const DEFAULT_RESOLUTION: u16 = 301;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WindowErr {
    Center(Complex),
    HalfExtent(Number),
    Resolution(u16),
}

impl fmt::Display for WindowErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Center(c) => write!(f, "window center {c} is not finite"),
            Self::HalfExtent(h) => {
                write!(f, "half extent must be finite and positive, found {h}")
            }
            Self::Resolution(r) => write!(
                f,
                "resolution must be between {MIN_RESOLUTION} and {MAX_RESOLUTION}, found {r}"
            ),
        }
    }
}

impl std::error::Error for WindowErr {}

/// Square region of the complex plane and how densely to sample it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Window {
    center: Complex,
    half_extent: Number,
    resolution: u16,
}

impl Window {
    pub fn new(center: Complex, half_extent: Number, resolution: u16) -> Result<Self, WindowErr> {
        if !(center.re.is_finite() && center.im.is_finite()) {
            return Err(WindowErr::Center(center));
        }
        if !(half_extent.is_finite() && half_extent > 0.0) {
            return Err(WindowErr::HalfExtent(half_extent));
        }
        if !(MIN_RESOLUTION..=MAX_RESOLUTION).contains(&resolution) {
            return Err(WindowErr::Resolution(resolution));
        }
        Ok(Self {
            center,
            half_extent,
            resolution,
        })
    }

    pub const fn center(&self) -> Complex {
        self.center
    }

    pub const fn half_extent(&self) -> Number {
        self.half_extent
    }

    pub const fn resolution(&self) -> u16 {
        self.resolution
    }

    pub fn with_resolution(&self, resolution: u16) -> Result<Self, WindowErr> {
        Self::new(self.center, self.half_extent, resolution)
    }

    pub fn re_range(&self) -> Range<Number> {
        self.center.re - self.half_extent..self.center.re + self.half_extent
    }

    pub fn im_range(&self) -> Range<Number> {
        self.center.im - self.half_extent..self.center.im + self.half_extent
    }

    /// Offset of sample `i` from the center along an axis, in `[-h, h]`.
    fn offset(&self, i: u16) -> Number {
        let last = Number::from(self.resolution - 1);
        self.half_extent * (2.0 * Number::from(i) / last - 1.0)
    }

    /// Complex coordinate of pixel (`col`, `row`); row 0 is the top edge.
    pub fn point(&self, col: u16, row: u16) -> Complex {
        Complex::new(
            self.center.re + self.offset(col),
            self.center.im - self.offset(row),
        )
    }

    /// Nearest pixel to `z`, or `None` if `z` falls outside the window.
    pub fn locate(&self, z: Complex) -> Option<(u32, u32)> {
        let last = Number::from(self.resolution - 1);
        let scale = last / (2.0 * self.half_extent);
        let col = ((z.re - (self.center.re - self.half_extent)) * scale).round();
        let row = ((self.center.im + self.half_extent - z.im) * scale).round();
        let inside = |v: Number| v.is_finite() && (0.0..=last).contains(&v);
        // both are integral and within u16 range here
        (inside(col) && inside(row)).then(|| (col as u32, row as u32))
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("center", &self.center)
            .field("re range", &self.re_range())
            .field("im range", &self.im_range())
            .field("resolution", &self.resolution)
            .finish()
    }
}

/// Row-major `resolution × resolution` complex sample points.
#[derive(Clone, Debug)]
pub struct SampleGrid {
    window: Window,
    points: Vec<Complex>,
}

impl SampleGrid {
    pub fn new(window: &Window) -> Self {
        let n = window.resolution();
        let mut points = Vec::with_capacity(usize::from(n) * usize::from(n));
        for row in 0..n {
            for col in 0..n {
                points.push(window.point(col, row));
            }
        }
        Self {
            window: *window,
            points,
        }
    }

    pub const fn window(&self) -> &Window {
        &self.window
    }

    pub const fn resolution(&self) -> u16 {
        self.window.resolution()
    }

    pub fn points(&self) -> &[Complex] {
        &self.points
    }

    pub fn get(&self, col: u16, row: u16) -> Complex {
        self.points[usize::from(row) * usize::from(self.resolution()) + usize::from(col)]
    }

    /// Every point multiplied by `e^{i angle}`. The window is unchanged, so
    /// pixel `p` of the rotated grid samples `p e^{i angle}`.
    pub fn rotated(&self, angle: Number) -> Self {
        if angle == 0.0 {
            return self.clone();
        }
        let turn = Complex::from_polar(1.0, angle);
        Self {
            window: self.window,
            points: self.points.iter().map(|z| z * turn).collect(),
        }
    }
}

pub fn build_grid(
    center: Complex,
    half_extent: Number,
    resolution: u16,
) -> Result<SampleGrid, WindowErr> {
    Ok(SampleGrid::new(&Window::new(center, half_extent, resolution)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_windows() {
        let c = Complex::new(0.0, 0.0);
        assert_eq!(Window::new(c, 0.0, 101), Err(WindowErr::HalfExtent(0.0)));
        assert!(Window::new(c, Number::NAN, 101).is_err());
        assert_eq!(Window::new(c, 1.0, 10), Err(WindowErr::Resolution(10)));
        assert_eq!(Window::new(c, 1.0, 1001), Err(WindowErr::Resolution(1001)));
        assert!(Window::new(Complex::new(Number::INFINITY, 0.0), 1.0, 101).is_err());
    }

    #[test]
    fn corners_and_center_are_exact() {
        let grid = build_grid(Complex::new(1.0, -1.0), 2.0, 51).unwrap();
        assert_eq!(grid.points().len(), 51 * 51);
        assert_eq!(grid.get(0, 0), Complex::new(-1.0, 1.0));
        assert_eq!(grid.get(50, 0), Complex::new(3.0, 1.0));
        assert_eq!(grid.get(0, 50), Complex::new(-1.0, -3.0));
        assert_eq!(grid.get(25, 25), Complex::new(1.0, -1.0));
    }

    #[test]
    fn spacing_is_even() {
        let grid = build_grid(Complex::new(0.0, 0.0), 1.0, 101).unwrap();
        let step = 2.0 / 100.0;
        for col in 1..101 {
            let d = grid.get(col, 7) - grid.get(col - 1, 7);
            assert!((d.re - step).abs() < 1e-12);
            assert_eq!(d.im, 0.0);
        }
    }

    #[test]
    fn locate_inverts_point() {
        let window = Window::new(Complex::new(0.5, 0.5), 3.0, 75).unwrap();
        for (col, row) in [(0, 0), (74, 0), (13, 61), (74, 74)] {
            assert_eq!(
                window.locate(window.point(col, row)),
                Some((u32::from(col), u32::from(row)))
            );
        }
        assert_eq!(window.locate(Complex::new(10.0, 0.0)), None);
    }

    #[test]
    fn rotation_is_applied_to_points_only() {
        let grid = build_grid(Complex::new(0.0, 0.0), 1.0, 51).unwrap();
        let turned = grid.rotated(core::f64::consts::FRAC_PI_2);
        assert_eq!(turned.window(), grid.window());
        // (1, 0) goes to (0, 1)
        let z = turned.get(50, 25);
        assert!((z - Complex::new(0.0, 1.0)).norm() < 1e-15);
    }
}
