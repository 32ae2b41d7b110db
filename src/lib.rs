// SPDX: CC0-1.0

pub mod color;
pub mod eval;
pub mod expr;
pub mod grid;
pub mod lex;
pub mod parse;
pub mod poly;
pub mod render;
pub mod roots;
pub mod shell;
pub mod stdlib;
pub mod surface;
pub mod zeta;

pub use expr::{classify, default_half_extent, Classification, Expression};
pub use parse::{compile, ParseErr};

use crate::{
    eval::Program,
    grid::{SampleGrid, Window, WindowErr, DEFAULT_RESOLUTION, MIN_RESOLUTION},
    render::{PixelImage, RenderConfig},
    roots::Features,
    surface::HeightFieldMesh,
};
use core::fmt;
use tracing::{debug, warn};

pub type Number = f64;
pub type Complex = num_complex::Complex64;

/// Upper bound on `Program::cost() × resolution²` for one portrait.
pub const MAX_WORK: u64 = 50_000_000;

/// Everything needed to draw one portrait. Built fresh for every
/// interaction.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub text: String,
    pub center: Complex,
    pub resolution: u16,
    pub config: RenderConfig,
    pub show_3d: bool,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            text: String::from(stdlib::Z),
            center: Complex::new(0.0, 0.0),
            resolution: DEFAULT_RESOLUTION,
            config: RenderConfig::default(),
            show_3d: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Portrait {
    pub expression: Expression,
    pub classification: Classification,
    pub window: Window,
    pub image: PixelImage,
    pub modulus: PixelImage,
    pub mesh: Option<HeightFieldMesh>,
    pub features: Features,
}

#[derive(Clone, Debug)]
pub enum PortraitErr {
    Parse(ParseErr),
    Window(WindowErr),
}

impl fmt::Display for PortraitErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "parse error: {err}"),
            Self::Window(err) => write!(f, "invalid window: {err}"),
        }
    }
}

impl std::error::Error for PortraitErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Window(err) => Some(err),
        }
    }
}

impl From<ParseErr> for PortraitErr {
    fn from(err: ParseErr) -> Self {
        Self::Parse(err)
    }
}

impl From<WindowErr> for PortraitErr {
    fn from(err: WindowErr) -> Self {
        Self::Window(err)
    }
}

/// Largest resolution not above `requested` whose work stays within
/// [`MAX_WORK`], but never below [`MIN_RESOLUTION`]. A request already below
/// the minimum is returned as is.
pub fn affordable_resolution(cost: u64, requested: u16) -> u16 {
    let cost = cost.max(1);
    if requested <= MIN_RESOLUTION
        || cost.saturating_mul(u64::from(requested).pow(2)) <= MAX_WORK
    {
        return requested;
    }
    // sqrt of a u64 fits in f64 closely enough for a pixel count
    let side = ((MAX_WORK / cost) as Number).sqrt().floor();
    let side = u16::try_from(side as u64).unwrap_or(u16::MAX);
    side.clamp(MIN_RESOLUTION, requested)
}

pub fn portrait(req: &Request) -> Result<Portrait, PortraitErr> {
    let expression = compile(&req.text)?;
    let classification = classify(&expression);
    let half_extent = req
        .config
        .view_limit
        .unwrap_or_else(|| default_half_extent(&expression));

    let mut window = Window::new(req.center, half_extent, req.resolution)?;
    if let Ok(prog) = Program::compile(&expression) {
        let resolution = affordable_resolution(prog.cost(), req.resolution);
        if resolution < req.resolution {
            warn!(
                expr = %expression,
                requested = req.resolution,
                resolution,
                "expression is expensive, lowering resolution"
            );
            window = window.with_resolution(resolution)?;
        }
    }

    let grid = SampleGrid::new(&window);
    let field = eval::evaluate_rotated(&expression, &grid, req.config.rotation_angle);
    let features = roots::find_features(&expression);
    let image = render::render(&field, &features, &req.config);
    let modulus = render::render_modulus(&field);
    let mesh = req.show_3d.then(|| {
        surface::render_surface(&field, &features.rotated(-req.config.rotation_angle))
    });

    debug!(
        expr = %expression,
        %classification,
        %window,
        zeros = features.zeros.len(),
        poles = features.poles.len(),
        "portrait ready"
    );
    Ok(Portrait {
        expression,
        classification,
        window,
        image,
        modulus,
        mesh,
        features,
    })
}

/// Keeps the last portrait that was drawn successfully.
#[derive(Debug, Default)]
pub struct Session {
    current: Option<Portrait>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Portrait> {
        self.current.as_ref()
    }

    /// Replaces the current portrait on success. On failure the previous
    /// one stays in place.
    pub fn submit(&mut self, req: &Request) -> Result<&Portrait, PortraitErr> {
        let new = portrait(req)?;
        Ok(self.current.insert(new))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Preset {
    pub label: &'static str,
    pub text: &'static str,
}

const fn preset(label: &'static str, text: &'static str) -> Preset {
    Preset { label, text }
}

/// Gallery of functions worth looking at.
pub const PRESETS: &[Preset] = &[
    preset("z", "z"),
    preset("z²", "z**2"),
    preset("z³ - 1", "z**3 - 1"),
    preset("(z+1)(z-2)", "(z+1)*(z-2)"),
    preset("1/z", "1/z"),
    preset("(z³-1)/(z²+1)", "(z**3 - 1)/(z**2 + 1)"),
    preset("exp(z)", "exp(z)"),
    preset("exp(-2π/z)", "exp(-2*pi/z)"),
    preset("sin(z)", "sin(z)"),
    preset("cos(z)", "cos(z)"),
    preset("tan(z)", "tan(z)"),
    preset("log(z)", "log(z)"),
    preset("√z", "sqrt(z)"),
    preset("z^(1/3)", "z**(1/3)"),
    preset("(z - 1)/(z + 1)", "(z - 1)/(z + 1)"),
    preset("(z⁵ - 1)/(z² - 1)", "(z**5 - 1)/(z**2 - 1)"),
    preset("1/(z² + 1)", "1/(z**2 + 1)"),
    preset("(z² + z + 1)/(z² - z + 1)", "(z**2 + z + 1)/(z**2 - z + 1)"),
    preset("1/(z(z-1))", "1/(z*(z-1))"),
    preset("(z² - 1)/(z³ + 2)", "(z**2 - 1)/(z**3 + 2)"),
    preset("exp(1/z)", "exp(1/z)"),
    preset("sin(1/z)", "sin(1/z)"),
    preset("(z - i)/(z + i)", "(z - I)/(z + I)"),
    preset("(z² + 1)/(z² - 1)", "(z**2 + 1)/(z**2 - 1)"),
    preset("(z³ + 2z)/(z² - 4)", "(z**3 + 2*z)/(z**2 - 4)"),
    preset("ζ(z)", "zeta(z)"),
    preset("Γ(z)", "gamma(z)"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_compiles() {
        for p in PRESETS {
            let expr = compile(p.text);
            assert!(expr.is_ok(), "{}: {:?}", p.label, expr.err());
        }
    }

    #[test]
    fn expensive_expressions_get_fewer_pixels() {
        assert_eq!(affordable_resolution(3, 1000), 1000);
        let r = affordable_resolution(500, 1000);
        assert!(r < 1000);
        assert!(500 * u64::from(r) * u64::from(r) <= MAX_WORK);
        assert_eq!(affordable_resolution(u64::MAX / 4, 300), MIN_RESOLUTION);
        assert_eq!(affordable_resolution(1_000_000, 10), 10);
        assert_eq!(affordable_resolution(1_000_000, MIN_RESOLUTION), MIN_RESOLUTION);
    }

    #[test]
    fn view_limit_overrides_default_extent() {
        let req = Request {
            text: String::from("sin(z)"),
            resolution: 51,
            ..Request::default()
        };
        assert_eq!(portrait(&req).unwrap().window.half_extent(), 6.0);
        let req = Request {
            config: RenderConfig {
                view_limit: Some(1.5),
                ..RenderConfig::default()
            },
            ..req
        };
        assert_eq!(portrait(&req).unwrap().window.half_extent(), 1.5);
    }

    #[test]
    fn session_keeps_last_good_portrait() {
        let mut session = Session::new();
        assert!(session.current().is_none());
        let good = Request {
            text: String::from("z**2 - 1"),
            resolution: 51,
            show_3d: true,
            ..Request::default()
        };
        session.submit(&good).unwrap();
        let bad = Request {
            text: String::from("z +* 1"),
            ..good.clone()
        };
        assert!(matches!(session.submit(&bad), Err(PortraitErr::Parse(_))));
        let current = session.current().unwrap();
        assert_eq!(current.expression.src(), "z**2 - 1");
        assert!(current.mesh.is_some());
        assert_eq!(
            current.classification,
            Classification::Polynomial { degree: 2 }
        );
    }

    #[test]
    fn bad_window_is_an_error() {
        let req = Request {
            resolution: 10,
            ..Request::default()
        };
        assert!(matches!(portrait(&req), Err(PortraitErr::Window(_))));
    }
}
