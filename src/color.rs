// SPDX: CC0-1.0

//! Cyclic color schemes for phase, and a sequential ramp for magnitudes.

use crate::Number;
use core::{
    f64::consts::{PI, TAU},
    fmt,
    str::FromStr,
};
use image::Rgba;

/// Color of a pixel without data. Every scheme color is opaque, so this
/// cannot be confused with one.
pub const NO_DATA: Rgba<u8> = Rgba([0, 0, 0, 0]);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColorScheme {
    #[default]
    Hsv,
    Twilight,
    Sinebow,
}

impl ColorScheme {
    pub const fn exhaustive() -> &'static [ColorScheme] {
        &[Self::Hsv, Self::Twilight, Self::Sinebow]
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Hsv => "hsv",
            Self::Twilight => "twilight",
            Self::Sinebow => "sinebow",
        }
    }

    /// Color for a phase in `(-π, π]`. The map is continuous around the
    /// circle, so `-π` and `π` get the same color.
    pub fn color(&self, phase: Number) -> Rgba<u8> {
        // position on the circle in [0, 1)
        let t = ((phase + PI) / TAU).rem_euclid(1.0);
        let [r, g, b] = match self {
            Self::Hsv => hsv_to_rgb(t, 1.0, 1.0),
            Self::Twilight => lerp_stops(&TWILIGHT, t),
            Self::Sinebow => sinebow(t),
        };
        Rgba([r, g, b, 255])
    }
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownScheme(pub String);

impl fmt::Display for UnknownScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown color scheme '{}', expected one of ", self.0)?;
        for (i, scheme) in ColorScheme::exhaustive().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{scheme}'")?;
        }
        Ok(())
    }
}

impl std::error::Error for UnknownScheme {}

impl FromStr for ColorScheme {
    type Err = UnknownScheme;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::exhaustive()
            .iter()
            .find(|c| c.name() == lower)
            .copied()
            .ok_or_else(|| UnknownScheme(s.to_string()))
    }
}

fn channel(x: Number) -> u8 {
    // clamped first, so the cast cannot wrap
    (x.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// `h`, `s` and `v` in `[0, 1]`; `h` wraps.
pub fn hsv_to_rgb(h: Number, s: Number, v: Number) -> [u8; 3] {
    let h = h.rem_euclid(1.0) * 6.0;
    let sector = h.floor();
    let f = h - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match sector as u8 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    [channel(r), channel(g), channel(b)]
}

fn sinebow(t: Number) -> [u8; 3] {
    let t = 0.5 - t;
    let sq = |x: Number| {
        let s = (PI * x).sin();
        s * s
    };
    [
        channel(sq(t)),
        channel(sq(t + 1.0 / 3.0)),
        channel(sq(t + 2.0 / 3.0)),
    ]
}

/// Light at both ends, dark in the middle; first and last stop match.
const TWILIGHT: [(Number, [u8; 3]); 9] = [
    (0.0, [226, 217, 226]),
    (0.125, [165, 182, 204]),
    (0.25, [96, 126, 186]),
    (0.375, [88, 65, 159]),
    (0.5, [47, 20, 54]),
    (0.625, [126, 40, 84]),
    (0.75, [183, 89, 84]),
    (0.875, [210, 163, 141]),
    (1.0, [226, 217, 226]),
];

const VIRIDIS: [(Number, [u8; 3]); 9] = [
    (0.0, [68, 1, 84]),
    (0.125, [71, 44, 122]),
    (0.25, [59, 82, 139]),
    (0.375, [44, 114, 142]),
    (0.5, [33, 145, 140]),
    (0.625, [39, 173, 129]),
    (0.75, [94, 201, 98]),
    (0.875, [170, 220, 50]),
    (1.0, [253, 231, 37]),
];

fn lerp_stops(stops: &[(Number, [u8; 3])], t: Number) -> [u8; 3] {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let hi = stops
        .iter()
        .position(|(at, _)| *at >= t)
        .unwrap_or(stops.len() - 1)
        .max(1);
    let (a, ca) = stops[hi - 1];
    let (b, cb) = stops[hi];
    let f = if b > a { (t - a) / (b - a) } else { 0.0 };
    let mix = |x: u8, y: u8| {
        channel((Number::from(x) + (Number::from(y) - Number::from(x)) * f) / 255.0)
    };
    [mix(ca[0], cb[0]), mix(ca[1], cb[1]), mix(ca[2], cb[2])]
}

/// Viridis-like ramp for `t` in `[0, 1]`, dark to light.
pub fn sequential(t: Number) -> Rgba<u8> {
    let [r, g, b] = lerp_stops(&VIRIDIS, t);
    Rgba([r, g, b, 255])
}
