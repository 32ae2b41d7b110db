// SPDX: CC0-1.0

//! Phase portrait rasters.

use crate::{
    color::{self, ColorScheme, NO_DATA},
    eval::{is_undefined, ValueField},
    grid::Window,
    roots::{Feature, FeatureKind, Features},
    Complex, Number,
};
use core::f64::consts::PI;
use image::{ImageFormat, ImageResult, Rgba, RgbaImage};
use std::io::{Seek, Write};
use tracing::debug;

pub const CONTOUR_LEVELS: u32 = 8;

const MODULUS_CLIP: (Number, Number) = (1.0, 99.0);

const CONTOUR_SHADE: Number = 0.55;
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderConfig {
    pub color_scheme: ColorScheme,
    pub show_contours: bool,
    /// Radians; the plane is turned by this angle before sampling.
    pub rotation_angle: Number,
    /// Half extent of the window, `None` for the per-function default.
    pub view_limit: Option<Number>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            color_scheme: ColorScheme::default(),
            show_contours: false,
            rotation_angle: 0.0,
            view_limit: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub feature: Feature,
    pub pixel: (u32, u32),
    pub label: String,
}

#[derive(Clone, Debug)]
pub struct PixelImage {
    image: RgbaImage,
    phase: Vec<Number>,
    window: Window,
    markers: Vec<Marker>,
}

impl PixelImage {
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Row-major phase in `(-π, π]`, NaN where there is no data.
    pub fn phase(&self) -> &[Number] {
        &self.phase
    }

    pub fn phase_at(&self, col: u32, row: u32) -> Number {
        self.phase[(row * self.image.width() + col) as usize]
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn write_png<W: Write + Seek>(&self, writer: &mut W) -> ImageResult<()> {
        self.image.write_to(writer, ImageFormat::Png)
    }
}

/// `arg w` with `-π` folded onto `π`.
pub fn phase(w: Complex) -> Number {
    let p = w.im.atan2(w.re);
    if p <= -PI {
        PI
    } else {
        p
    }
}

fn phases(field: &ValueField) -> Vec<Number> {
    field
        .values()
        .iter()
        .map(|w| if is_undefined(*w) { Number::NAN } else { phase(*w) })
        .collect()
}

fn log_modulus(w: Complex) -> Option<Number> {
    let m = w.norm();
    (m > 0.0 && m.is_finite()).then(|| m.ln())
}

/// Linearly interpolated percentile of sorted data, `pct` in `[0, 100]`.
pub(crate) fn percentile(sorted: &[Number], pct: Number) -> Option<Number> {
    let last = sorted.len().checked_sub(1)?;
    let pos = pct.clamp(0.0, 100.0) / 100.0 * last as Number;
    // in range since `pos <= last`
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let f = pos - lo as Number;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * f)
}

fn shade(px: &mut Rgba<u8>, by: Number) {
    for c in &mut px.0[..3] {
        // by is in [0, 1]
        *c = (Number::from(*c) * by).round() as u8;
    }
}

fn contour(image: &mut RgbaImage, field: &ValueField) {
    let logs: Vec<Option<Number>> = field.values().iter().map(|w| log_modulus(*w)).collect();
    let (lo, hi) = logs
        .iter()
        .flatten()
        .fold((Number::INFINITY, Number::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    if hi <= lo {
        return;
    }
    let levels = Number::from(CONTOUR_LEVELS);
    let band = |v: &Option<Number>| {
        v.map(|v| (((v - lo) / (hi - lo) * levels).floor() as u32).min(CONTOUR_LEVELS - 1))
    };
    let bands: Vec<Option<u32>> = logs.iter().map(band).collect();

    let n = u32::from(field.resolution());
    let at = |col: u32, row: u32| bands[(row * n + col) as usize];
    for row in 0..n {
        for col in 0..n {
            let Some(here) = at(col, row) else { continue };
            let differs = |other: Option<u32>| other.map_or(false, |b| b != here);
            let edge = (col + 1 < n && differs(at(col + 1, row)))
                || (row + 1 < n && differs(at(col, row + 1)));
            if edge {
                shade(image.get_pixel_mut(col, row), CONTOUR_SHADE);
            }
        }
    }
}

fn put(image: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(image.width()) && y < i64::from(image.height()) {
        // both are within u32 range here
        image.put_pixel(x as u32, y as u32, color);
    }
}

/// 3×5 bitmaps, one row per byte, most significant of the low three bits
/// on the left.
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

// white on black, top-left corner at (x, y)
fn draw_number(image: &mut RgbaImage, x: i64, y: i64, n: u32, scale: i64) {
    let text = n.to_string();
    let width = (4 * text.len() as i64 + 1) * scale;
    for dy in 0..7 * scale {
        for dx in 0..width {
            put(image, x + dx, y + dy, BLACK);
        }
    }
    for (i, digit) in text.bytes().enumerate() {
        let glyph = DIGITS[usize::from(digit - b'0')];
        let left = x + (1 + 4 * i as i64) * scale;
        for (gy, bits) in glyph.iter().enumerate() {
            for gx in 0..3 {
                if bits & (0b100u8 >> gx) == 0 {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        put(
                            image,
                            left + gx * scale + sx,
                            y + (1 + gy as i64) * scale + sy,
                            WHITE,
                        );
                    }
                }
            }
        }
    }
}

fn draw_marker(image: &mut RgbaImage, feature: &Feature, (x, y): (u32, u32)) {
    let n = image.width();
    let r = i64::from((n / 60).max(3));
    let (x, y) = (i64::from(x), i64::from(y));
    for dy in -r - 1..=r + 1 {
        for dx in -r - 1..=r + 1 {
            let color = match feature.kind {
                FeatureKind::Zero => {
                    let d = ((dx * dx + dy * dy) as Number).sqrt();
                    let r = r as Number;
                    if d > r + 0.5 || d < r - 2.5 {
                        continue;
                    } else if d > r - 0.5 || d < r - 1.5 {
                        BLACK
                    } else {
                        WHITE
                    }
                }
                FeatureKind::Pole => {
                    if dx.abs().max(dy.abs()) > r {
                        WHITE
                    } else {
                        BLACK
                    }
                }
            };
            put(image, x + dx, y + dy, color);
        }
    }
    let m = feature.multiplicity.get();
    if m > 1 {
        let scale = i64::from((n / 200).max(1));
        draw_number(image, x + r + 2, y - r - 7 * scale, m, scale);
    }
}

/// Domain coloring of `field`: hue from the phase, optional modulus
/// contours, and a marker for each feature inside the window.
pub fn render(field: &ValueField, features: &Features, config: &RenderConfig) -> PixelImage {
    let n = u32::from(field.resolution());
    let phase = phases(field);
    let mut image = RgbaImage::from_fn(n, n, |col, row| {
        let p = phase[(row * n + col) as usize];
        if p.is_nan() {
            NO_DATA
        } else {
            config.color_scheme.color(p)
        }
    });

    if config.show_contours {
        contour(&mut image, field);
    }

    // the field was sampled at p e^{iφ}, so a feature at w shows at w e^{-iφ}
    let unturn = Complex::from_polar(1.0, -config.rotation_angle);
    let mut markers = vec![];
    for feature in features.iter() {
        let at = if config.rotation_angle == 0.0 {
            feature.position
        } else {
            feature.position * unturn
        };
        if let Some(pixel) = field.window().locate(at) {
            draw_marker(&mut image, feature, pixel);
            markers.push(Marker {
                feature: *feature,
                pixel,
                label: feature.label(),
            });
        }
    }
    debug!(
        scheme = %config.color_scheme,
        markers = markers.len(),
        hidden = features.iter().count() - markers.len(),
        "rendered phase"
    );

    PixelImage {
        image,
        phase,
        window: *field.window(),
        markers,
    }
}

/// Side panel shading `ln|f|` on a sequential ramp, clipped to its 1st and
/// 99th percentiles. Zeros take the darkest color.
pub fn render_modulus(field: &ValueField) -> PixelImage {
    let mut logs: Vec<Number> = field.values().iter().filter_map(|w| log_modulus(*w)).collect();
    logs.sort_by(Number::total_cmp);
    let lo = percentile(&logs, MODULUS_CLIP.0).unwrap_or(0.0);
    let hi = percentile(&logs, MODULUS_CLIP.1).unwrap_or(0.0);

    let n = u32::from(field.resolution());
    let image = RgbaImage::from_fn(n, n, |col, row| {
        let w = field.values()[(row * n + col) as usize];
        if is_undefined(w) {
            return NO_DATA;
        }
        let t = match log_modulus(w) {
            Some(v) if hi > lo => (v - lo) / (hi - lo),
            Some(_) => 0.5,
            None => 0.0,
        };
        color::sequential(t)
    });

    PixelImage {
        image,
        phase: phases(field),
        window: *field.window(),
        markers: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{eval::evaluate, grid::build_grid, parse::compile, roots::find_features};
    use std::io::Cursor;

    fn sample(text: &str, half_extent: Number, resolution: u16) -> (ValueField, Features) {
        let expr = compile(text).unwrap();
        let grid = build_grid(Complex::new(0.0, 0.0), half_extent, resolution).unwrap();
        (evaluate(&expr, &grid), find_features(&expr))
    }

    #[test]
    fn negative_real_axis_has_phase_pi() {
        assert_eq!(phase(Complex::new(-1.0, 0.0)), PI);
        assert_eq!(phase(Complex::new(-1.0, -0.0)), PI);
        assert_eq!(phase(Complex::new(1.0, 0.0)), 0.0);
        assert!((phase(Complex::new(0.0, -2.0)) + PI / 2.0).abs() < 1e-15);
    }

    #[test]
    fn percentile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&data, 0.0), Some(1.0));
        assert_eq!(percentile(&data, 50.0), Some(3.0));
        assert_eq!(percentile(&data, 100.0), Some(5.0));
        assert_eq!(percentile(&data, 62.5), Some(3.5));
        assert_eq!(percentile(&[], 50.0), None);
    }

    #[test]
    fn undefined_pixels_are_transparent() {
        let (field, features) = sample("1/z", 1.0, 51);
        let img = render(&field, &Features::default(), &RenderConfig::default());
        assert_eq!(*img.image().get_pixel(25, 25), NO_DATA);
        assert!(img.phase_at(25, 25).is_nan());
        assert_eq!(img.image().get_pixel(0, 0).0[3], 255);
        // markers are drawn over the hole
        let img = render(&field, &features, &RenderConfig::default());
        assert_eq!(img.markers().len(), 1);
        assert_eq!(img.markers()[0].pixel, (25, 25));
        assert_eq!(img.markers()[0].label, "pole");
    }

    #[test]
    fn contours_only_darken() {
        let (field, _) = sample("z**2 - 1", 2.0, 81);
        let plain = render(&field, &Features::default(), &RenderConfig::default());
        let config = RenderConfig {
            show_contours: true,
            ..RenderConfig::default()
        };
        let lined = render(&field, &Features::default(), &config);
        let mut darkened = 0;
        for (a, b) in plain.image().pixels().zip(lined.image().pixels()) {
            for c in 0..3 {
                assert!(b.0[c] <= a.0[c]);
            }
            darkened += usize::from(a != b);
        }
        assert!(darkened > 0);
        assert_eq!(plain.phase(), lined.phase());
    }

    #[test]
    fn features_outside_the_window_are_not_marked() {
        let (field, features) = sample("(z - 5)*(z + 0.5)", 1.0, 51);
        let img = render(&field, &features, &RenderConfig::default());
        assert_eq!(img.markers().len(), 1);
        assert_eq!(img.markers()[0].feature.position, Complex::new(-0.5, 0.0));
    }

    #[test]
    fn markers_follow_rotation() {
        let (field, features) = sample("z - 1", 2.0, 81);
        let config = RenderConfig {
            rotation_angle: PI / 2.0,
            ..RenderConfig::default()
        };
        let img = render(&field, &features, &config);
        // 1 e^{-iπ/2} = -i, straight below the center
        assert_eq!(img.markers()[0].pixel, (40, 60));
    }

    #[test]
    fn repeated_roots_get_a_count() {
        let (field, features) = sample("(z - 1)**3", 2.0, 201);
        let img = render(&field, &features, &RenderConfig::default());
        let marker = &img.markers()[0];
        assert_eq!(marker.label, "zero ×3");
        // the count sits to the upper right of the ring
        let (x, y) = marker.pixel;
        let r = 3;
        let white = (x + r + 2..x + r + 10)
            .flat_map(|px| (y - r - 8..y).map(move |py| (px, py)))
            .filter(|(px, py)| *img.image().get_pixel(*px, *py) == WHITE)
            .count();
        assert!(white > 0);
    }

    #[test]
    fn png_round_trip_keeps_pixels() {
        let (field, features) = sample("z", 1.0, 50);
        let img = render(&field, &features, &RenderConfig::default());
        let mut buf = Cursor::new(Vec::new());
        img.write_png(&mut buf).unwrap();
        let decoded = image::load_from_memory_with_format(buf.get_ref(), ImageFormat::Png)
            .unwrap()
            .into_rgba8();
        assert_eq!(&decoded, img.image());
    }

    #[test]
    fn modulus_ramp_is_dark_at_zeros() {
        let (field, _) = sample("z", 1.0, 51);
        let img = render_modulus(&field);
        assert_eq!(*img.image().get_pixel(25, 25), color::sequential(0.0));
        assert_eq!(*img.image().get_pixel(0, 0), color::sequential(1.0));
        assert!(img.markers().is_empty());
    }
}
