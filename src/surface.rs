// SPDX: CC0-1.0

//! Height field of `|f|` over the sampled window.

use crate::{
    color,
    eval::{is_undefined, ValueField},
    render::percentile,
    roots::{Feature, FeatureKind, Features},
    Number,
};
use image::{Rgba, RgbaImage};
use std::io::{self, Write};
use tracing::debug;

/// Heights are capped at this percentile of the finite magnitudes.
pub const CLIP_PERCENTILE: Number = 99.0;

/// Larger grids are decimated so that the mesh has at most this many
/// vertices per side.
pub const MAX_MESH_SIDE: u16 = 200;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Annotation {
    pub feature: Feature,
    pub position: [Number; 3],
}

/// Triangulated `side × side` grid of `[re, im, height]` vertices.
#[derive(Clone, Debug)]
pub struct HeightFieldMesh {
    side: usize,
    vertices: Vec<[Number; 3]>,
    triangles: Vec<[u32; 3]>,
    clip_height: Number,
    center: [Number; 2],
    half_extent: Number,
    annotations: Vec<Annotation>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceView {
    // radians
    pub azimuth: Number,
    pub elevation: Number,
    pub width: u32,
    pub height: u32,
}

impl Default for SurfaceView {
    fn default() -> Self {
        Self {
            azimuth: -0.6,
            elevation: 0.5,
            width: 800,
            height: 640,
        }
    }
}

// every `stride`-th index plus the last one
fn decimate(n: u16) -> Vec<u16> {
    let stride = usize::from((n - 1).div_ceil(MAX_MESH_SIDE - 1).max(1));
    let mut idxs: Vec<u16> = (0..n).step_by(stride).collect();
    if idxs.last() != Some(&(n - 1)) {
        idxs.push(n - 1);
    }
    idxs
}

pub fn render_surface(field: &ValueField, features: &Features) -> HeightFieldMesh {
    let mut mags: Vec<Number> = field
        .values()
        .iter()
        .filter(|w| !is_undefined(**w))
        .map(|w| w.norm())
        .filter(|m| m.is_finite())
        .collect();
    mags.sort_by(Number::total_cmp);
    let clip_height = percentile(&mags, CLIP_PERCENTILE).unwrap_or(1.0);

    let window = field.window();
    let idxs = decimate(field.resolution());
    let side = idxs.len();
    let mut vertices = Vec::with_capacity(side * side);
    for &row in &idxs {
        for &col in &idxs {
            let z = window.point(col, row);
            let w = field.get(col, row);
            // no data means unbounded here
            let height = if is_undefined(w) {
                clip_height
            } else {
                w.norm().min(clip_height)
            };
            vertices.push([z.re, z.im, height]);
        }
    }

    let mut triangles = Vec::with_capacity(2 * (side - 1) * (side - 1));
    for i in 0..side - 1 {
        for j in 0..side - 1 {
            // side is at most MAX_MESH_SIDE, so indices fit
            let a = (i * side + j) as u32;
            let b = a + 1;
            let c = a + side as u32;
            let d = c + 1;
            triangles.push([a, c, b]);
            triangles.push([b, c, d]);
        }
    }

    let annotations = features
        .iter()
        .filter(|f| window.locate(f.position).is_some())
        .map(|f| Annotation {
            feature: *f,
            position: [
                f.position.re,
                f.position.im,
                match f.kind {
                    FeatureKind::Zero => 0.0,
                    FeatureKind::Pole => clip_height,
                },
            ],
        })
        .collect();

    debug!(side, clip_height, "built surface mesh");
    HeightFieldMesh {
        side,
        vertices,
        triangles,
        clip_height,
        center: [window.center().re, window.center().im],
        half_extent: window.half_extent(),
        annotations,
    }
}

impl HeightFieldMesh {
    pub fn side(&self) -> usize {
        self.side
    }

    pub fn vertices(&self) -> &[[Number; 3]] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn clip_height(&self) -> Number {
        self.clip_height
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    fn unit(&self, [re, im, h]: [Number; 3]) -> [Number; 3] {
        let z = if self.clip_height > 0.0 {
            h / self.clip_height
        } else {
            0.0
        };
        [
            (re - self.center[0]) / self.half_extent,
            (im - self.center[1]) / self.half_extent,
            z,
        ]
    }

    // screen x, screen y, depth (larger is farther)
    fn view(view: &SurfaceView, [x, y, z]: [Number; 3]) -> (Number, Number, Number) {
        let (sa, ca) = view.azimuth.sin_cos();
        let (se, ce) = view.elevation.sin_cos();
        let u = x * ca - y * sa;
        let d = x * sa + y * ca;
        // shift heights down so the surface sits around the middle
        let z = z - 0.5;
        let up = z * ce + d * se;
        let depth = d * ce - z * se;
        let scale = Number::from(view.width.min(view.height)) / 3.4;
        (
            Number::from(view.width) / 2.0 + u * scale,
            Number::from(view.height) / 2.0 - up * scale,
            depth,
        )
    }

    /// Painter's-algorithm raster of the surface, colored by height.
    pub fn project(&self, view: &SurfaceView) -> RgbaImage {
        let mut image = RgbaImage::from_pixel(view.width, view.height, BACKGROUND);
        let screen: Vec<(Number, Number, Number)> = self
            .vertices
            .iter()
            .map(|v| Self::view(view, self.unit(*v)))
            .collect();

        let mut order: Vec<(Number, usize)> = self
            .triangles
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let depth = t.iter().map(|&k| screen[k as usize].2).sum::<Number>();
                (depth, i)
            })
            .collect();
        // farthest first
        order.sort_by(|a, b| b.0.total_cmp(&a.0));

        for (_, i) in order {
            let tri = self.triangles[i];
            let height = tri
                .iter()
                .map(|&k| self.unit(self.vertices[k as usize])[2])
                .sum::<Number>()
                / 3.0;
            let pts = tri.map(|k| {
                let (x, y, _) = screen[k as usize];
                (x, y)
            });
            fill_triangle(&mut image, pts, color::sequential(height));
        }
        image
    }

    /// Wavefront OBJ: one `v` line per vertex, one `f` line per triangle.
    pub fn write_obj<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "# |f| height field, clipped at {}", self.clip_height)?;
        for [x, y, z] in &self.vertices {
            writeln!(out, "v {x} {y} {z}")?;
        }
        for [a, b, c] in &self.triangles {
            // obj indices start at 1
            writeln!(out, "f {} {} {}", a + 1, b + 1, c + 1)?;
        }
        Ok(())
    }
}

fn fill_triangle(image: &mut RgbaImage, [a, b, c]: [(Number, Number); 3], color: Rgba<u8>) {
    let area = (b.0 - a.0) * (c.1 - a.1) - (c.0 - a.0) * (b.1 - a.1);
    if area == 0.0 || !area.is_finite() {
        return;
    }
    let (w, h) = (Number::from(image.width()), Number::from(image.height()));
    let x0 = a.0.min(b.0).min(c.0).floor().max(0.0);
    let x1 = a.0.max(b.0).max(c.0).ceil().min(w - 1.0);
    let y0 = a.1.min(b.1).min(c.1).floor().max(0.0);
    let y1 = a.1.max(b.1).max(c.1).ceil().min(h - 1.0);
    if x0 > x1 || y0 > y1 {
        return;
    }
    let edge = |p: (Number, Number), q: (Number, Number), x: Number, y: Number| {
        ((q.0 - p.0) * (y - p.1) - (q.1 - p.1) * (x - p.0)) / area
    };
    // bounds are clamped to the image above
    for y in y0 as u32..=y1 as u32 {
        for x in x0 as u32..=x1 as u32 {
            let (px, py) = (Number::from(x) + 0.5, Number::from(y) + 0.5);
            let (l0, l1, l2) = (edge(b, c, px, py), edge(c, a, px, py), edge(a, b, px, py));
            // small slack closes seams between neighbours
            if l0 >= -1e-3 && l1 >= -1e-3 && l2 >= -1e-3 {
                image.put_pixel(x, y, color);
            }
        }
    }
}
