// SPDX: CC0-1.0

//! Approximate zeros and poles of an expression.
//!
//! Roots come from the structural numerator/denominator split in
//! [`crate::poly`]. Multiplicities written in factored form (`(z-1)**2`) are
//! carried through exactly; anything else relies on [`cluster`], which merges
//! numerically close roots. The result is deterministic for a given
//! expression but is an approximation, not a symbolic multiplicity.
//!
//! Zeros and poles are found independently. A removable singularity such as
//! `(z**2 - 1)/(z - 1)` therefore reports a zero and a pole at `1`.

use crate::{poly::Fraction, Complex, Expression, Number};
use core::{fmt, num::NonZeroU32};
use tracing::debug;

/// Roots closer than this are treated as one repeated root.
pub const CLUSTER_TOLERANCE: Number = 1e-6;

/// Coordinates this close to an integer are rounded to it.
pub const SNAP_TOLERANCE: Number = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Zero,
    Pole,
}

impl FeatureKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::Pole => "pole",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Feature {
    pub position: Complex,
    pub kind: FeatureKind,
    pub multiplicity: NonZeroU32,
}

impl Feature {
    /// `"zero"`, or `"zero ×2"` for a repeated one.
    pub fn label(&self) -> String {
        match self.multiplicity.get() {
            1 => self.kind.name().to_string(),
            m => format!("{} ×{m}", self.kind.name()),
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.label(), self.position)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Features {
    pub zeros: Vec<Feature>,
    pub poles: Vec<Feature>,
}

impl Features {
    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.zeros.iter().chain(self.poles.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.zeros.is_empty() && self.poles.is_empty()
    }

    /// Every position multiplied by `e^{i angle}`.
    pub fn rotated(&self, angle: Number) -> Self {
        if angle == 0.0 {
            return self.clone();
        }
        let turn = Complex::from_polar(1.0, angle);
        let turn_all = |features: &[Feature]| {
            features
                .iter()
                .map(|f| Feature {
                    position: f.position * turn,
                    ..*f
                })
                .collect()
        };
        Self {
            zeros: turn_all(&self.zeros),
            poles: turn_all(&self.poles),
        }
    }
}

fn snap(x: Number) -> Number {
    let r = x.round();
    let x = if (x - r).abs() < SNAP_TOLERANCE { r } else { x };
    // no negative zero in reported positions
    if x == 0.0 {
        0.0
    } else {
        x
    }
}

/// Greedy single pass: each root not yet taken starts a cluster and absorbs
/// every later untaken root within `tolerance` of it. Cluster position is
/// its first root.
pub fn cluster(roots: &[Complex], kind: FeatureKind, tolerance: Number) -> Vec<Feature> {
    let mut taken = vec![false; roots.len()];
    let mut features = vec![];
    for (i, root) in roots.iter().enumerate() {
        if taken[i] {
            continue;
        }
        taken[i] = true;
        let mut size = 1u32;
        for (j, other) in roots.iter().enumerate().skip(i + 1) {
            if !taken[j] && (root - other).norm() <= tolerance {
                taken[j] = true;
                size += 1;
            }
        }
        features.push(Feature {
            position: Complex::new(snap(root.re), snap(root.im)),
            kind,
            multiplicity: NonZeroU32::new(size).unwrap_or(NonZeroU32::MIN),
        });
    }
    features
}

fn side(roots: Option<Vec<Complex>>, kind: FeatureKind) -> Vec<Feature> {
    match roots {
        Some(roots) => {
            let roots: Vec<Complex> = roots
                .into_iter()
                .filter(|z| z.re.is_finite() && z.im.is_finite())
                .collect();
            cluster(&roots, kind, CLUSTER_TOLERANCE)
        }
        None => {
            debug!(kind = kind.name(), "not a polynomial, no roots available");
            vec![]
        }
    }
}

pub fn find_features(expr: &Expression) -> Features {
    let frac = Fraction::of(expr.root());
    let features = Features {
        zeros: side(frac.numer_roots(), FeatureKind::Zero),
        poles: side(frac.denom_roots(), FeatureKind::Pole),
    };
    debug!(
        expr = %expr,
        zeros = features.zeros.len(),
        poles = features.poles.len(),
        "found features"
    );
    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::compile;

    fn c(re: Number, im: Number) -> Complex {
        Complex::new(re, im)
    }

    fn summary(features: &[Feature]) -> Vec<(Number, Number, u32)> {
        let mut v: Vec<_> = features
            .iter()
            .map(|f| (f.position.re, f.position.im, f.multiplicity.get()))
            .collect();
        v.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        v
    }

    #[test]
    fn clustering_is_greedy_and_ordered() {
        let roots = [c(0.0, 0.0), c(5e-7, 0.0), c(1.1e-6, 0.0), c(3.0, 0.0)];
        let features = cluster(&roots, FeatureKind::Zero, 1e-6);
        // the third root is within tolerance of the second but not the first
        assert_eq!(
            summary(&features),
            [(0.0, 0.0, 2), (1.1e-6, 0.0, 1), (3.0, 0.0, 1)]
        );
    }

    #[test]
    fn near_integers_snap() {
        let features = cluster(&[c(1.0 + 1e-12, -1e-13)], FeatureKind::Pole, 1e-6);
        assert_eq!(features[0].position, c(1.0, 0.0));
        assert!(features[0].position.im.is_sign_positive());
    }

    #[test]
    fn repeated_expanded_roots_merge() {
        let features = find_features(&compile("z**2 - 2*z + 1").unwrap());
        assert_eq!(summary(&features.zeros), [(1.0, 0.0, 2)]);
        assert!(features.poles.is_empty());
    }

    #[test]
    fn cubic_roots_of_unity() {
        let features = find_features(&compile("(z**3 - 1)/(z**2 + 1)").unwrap());
        assert_eq!(features.zeros.len(), 3);
        for f in &features.zeros {
            assert!((f.position.norm() - 1.0).abs() < 1e-9);
            assert_eq!(f.multiplicity.get(), 1);
        }
        assert_eq!(summary(&features.poles), [(0.0, -1.0, 1), (0.0, 1.0, 1)]);
    }

    #[test]
    fn removable_singularity_reports_both_sides() {
        let features = find_features(&compile("(z**2 - 1)/(z - 1)").unwrap());
        assert_eq!(summary(&features.zeros), [(-1.0, 0.0, 1), (1.0, 0.0, 1)]);
        assert_eq!(summary(&features.poles), [(1.0, 0.0, 1)]);
    }

    #[test]
    fn transcendental_sides_are_empty() {
        let features = find_features(&compile("exp(z)").unwrap());
        assert!(features.is_empty());
        let features = find_features(&compile("sin(z)/(z - 2)").unwrap());
        assert!(features.zeros.is_empty());
        assert_eq!(summary(&features.poles), [(2.0, 0.0, 1)]);
    }

    #[test]
    fn labels_mention_multiplicity() {
        let features = find_features(&compile("z**3/(z - 1)").unwrap());
        assert_eq!(features.zeros[0].label(), "zero ×3");
        assert_eq!(features.poles[0].label(), "pole");
    }

    #[test]
    fn high_multiplicity_and_too_many_roots() {
        let features = find_features(&compile("z**129/(z + 1)").unwrap());
        assert_eq!(summary(&features.zeros), [(0.0, 0.0, 129)]);
        assert_eq!(summary(&features.poles), [(-1.0, 0.0, 1)]);

        let features = find_features(&compile("(z - 1)/((z**128)**128)**128").unwrap());
        assert_eq!(summary(&features.zeros), [(1.0, 0.0, 1)]);
        assert!(features.poles.is_empty());
    }

    #[test]
    fn constants_have_no_features() {
        assert!(find_features(&compile("0").unwrap()).is_empty());
        assert!(find_features(&compile("5*pi").unwrap()).is_empty());
    }
}
