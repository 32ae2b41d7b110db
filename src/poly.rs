// SPDX: CC0-1.0

//! Dense polynomials with complex coefficients, the structural
//! numerator/denominator split of an expression, and numeric roots.

use crate::{
    expr::{Expr, OperatorTyp},
    Complex, Number,
};
use core::{f64::consts::TAU, fmt};
use tracing::{debug, warn};

/// Polynomials of higher degree are not expanded; root finding reports them
/// as unavailable instead.
pub const MAX_DEGREE: usize = 128;

/// Largest total multiplicity of one side of a [`Fraction`]. Factored powers
/// such as `z**1000` may exceed [`MAX_DEGREE`] up to this bound.
pub const MAX_MULTIPLICITY: u32 = 4096;

pub const MAX_ITERATIONS: usize = 500;

const NEWTON_POLISH_STEPS: usize = 4;

/// Coefficients are stored in ascending degree order; the leading
/// coefficient is nonzero unless the polynomial is zero.
#[derive(Clone, Debug, PartialEq)]
pub struct Poly {
    coeffs: Vec<Complex>,
}

fn czero() -> Complex {
    Complex::new(0.0, 0.0)
}

fn is_zero(c: Complex) -> bool {
    c.re == 0.0 && c.im == 0.0
}

impl Poly {
    pub fn new(mut coeffs: Vec<Complex>) -> Self {
        while coeffs.len() > 1 && coeffs.last().map_or(false, |c| is_zero(*c)) {
            coeffs.pop();
        }
        if coeffs.is_empty() {
            coeffs.push(czero());
        }
        Self { coeffs }
    }

    pub fn zero() -> Self {
        Self::new(vec![])
    }

    pub fn constant(c: Complex) -> Self {
        Self::new(vec![c])
    }

    pub fn z() -> Self {
        Self::new(vec![czero(), Complex::new(1.0, 0.0)])
    }

    pub fn coeffs(&self) -> &[Complex] {
        &self.coeffs
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.len() == 1 && is_zero(self.coeffs[0])
    }

    pub fn leading(&self) -> Complex {
        self.coeffs[self.degree()]
    }

    pub fn add(&self, other: &Self) -> Self {
        let len = self.coeffs.len().max(other.coeffs.len());
        let coeffs = (0..len)
            .map(|i| {
                self.coeffs.get(i).copied().unwrap_or_else(czero)
                    + other.coeffs.get(i).copied().unwrap_or_else(czero)
            })
            .collect();
        Self::new(coeffs)
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.scale(Complex::new(-1.0, 0.0)))
    }

    pub fn scale(&self, by: Complex) -> Self {
        Self::new(self.coeffs.iter().map(|c| c * by).collect())
    }

    pub fn mul(&self, other: &Self) -> Self {
        if self.is_zero() || other.is_zero() {
            return Self::zero();
        }
        let mut coeffs = vec![czero(); self.coeffs.len() + other.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in other.coeffs.iter().enumerate() {
                coeffs[i + j] += a * b;
            }
        }
        Self::new(coeffs)
    }

    pub fn powu(&self, mut exp: u32) -> Self {
        let mut base = self.clone();
        let mut acc = Self::constant(Complex::new(1.0, 0.0));
        while exp > 0 {
            if exp & 1 == 1 {
                acc = acc.mul(&base);
            }
            exp >>= 1;
            if exp > 0 {
                base = base.mul(&base);
            }
        }
        acc
    }

    pub fn derivative(&self) -> Self {
        Self::new(
            self.coeffs
                .iter()
                .enumerate()
                .skip(1)
                .map(|(i, c)| c * i as Number)
                .collect(),
        )
    }

    pub fn eval(&self, z: Complex) -> Complex {
        self.coeffs
            .iter()
            .rev()
            .fold(czero(), |acc, c| acc * z + c)
    }

    /// Expands `expr` into a polynomial in `z`, or `None` when it is not one:
    /// a function call of `z`, a non-integer or variable exponent, division
    /// by something that mentions `z`, or a degree above [`MAX_DEGREE`].
    pub fn from_expr(expr: &Expr) -> Option<Self> {
        if let Some(c) = expr.constant() {
            return (c.re.is_finite() && c.im.is_finite()).then(|| Self::constant(c));
        }
        let poly = match expr {
            Expr::Var => Self::z(),
            Expr::Num(_) | Expr::Const(_) => unreachable!("constants are folded above"),
            Expr::Call(..) => return None,
            Expr::Unary(_, arg) => Self::from_expr(arg)?.scale(Complex::new(-1.0, 0.0)),
            Expr::Binary(op, lhs, rhs) => match op {
                OperatorTyp::Add => Self::from_expr(lhs)?.add(&Self::from_expr(rhs)?),
                OperatorTyp::Sub => Self::from_expr(lhs)?.sub(&Self::from_expr(rhs)?),
                OperatorTyp::Mul => {
                    let (lhs, rhs) = (Self::from_expr(lhs)?, Self::from_expr(rhs)?);
                    if lhs.degree() + rhs.degree() > MAX_DEGREE {
                        return None;
                    }
                    lhs.mul(&rhs)
                }
                OperatorTyp::Div => {
                    let divisor = rhs.constant()?;
                    if is_zero(divisor) {
                        return None;
                    }
                    Self::from_expr(lhs)?.scale(divisor.inv())
                }
                OperatorTyp::Pow => {
                    let n = integer_exponent(rhs)?;
                    if n < 0 {
                        return None;
                    }
                    let base = Self::from_expr(lhs)?;
                    if base.degree() * n as usize > MAX_DEGREE {
                        return None;
                    }
                    base.powu(n as u32)
                }
                OperatorTyp::Neg => unreachable!("negation is unary"),
            },
        };
        Some(poly)
    }

    /// All complex roots, repeated according to multiplicity as far as the
    /// numerics allow. The zero polynomial and nonzero constants have none.
    pub fn roots(&self) -> Vec<Complex> {
        if self.is_zero() {
            return vec![];
        }

        // exact roots at the origin
        let shift = self.coeffs.iter().take_while(|c| is_zero(**c)).count();
        let mut roots = vec![czero(); shift];
        let rest = Self::new(self.coeffs[shift..].to_vec());

        match rest.degree() {
            0 => {}
            1 => roots.push(-rest.coeffs[0] / rest.coeffs[1]),
            2 => roots.extend(quadratic_roots(
                rest.coeffs[2],
                rest.coeffs[1],
                rest.coeffs[0],
            )),
            _ => roots.extend(rest.durand_kerner()),
        }
        roots
    }

    fn durand_kerner(&self) -> Vec<Complex> {
        let n = self.degree();
        let monic = self.scale(self.leading().inv());

        // Cauchy bound: every root lies within this radius
        let radius = 1.0
            + monic.coeffs[..n]
                .iter()
                .map(|c| c.norm())
                .fold(0.0, Number::max);
        let mut zs: Vec<Complex> = (0..n)
            .map(|k| Complex::from_polar(radius * 0.5, TAU * k as Number / n as Number + 0.4))
            .collect();

        let mut converged = false;
        for _ in 0..MAX_ITERATIONS {
            let mut max_step: Number = 0.0;
            for k in 0..n {
                let zk = zs[k];
                let mut denom = Complex::new(1.0, 0.0);
                for (j, zj) in zs.iter().enumerate() {
                    if j != k {
                        denom *= zk - zj;
                    }
                }
                if is_zero(denom) {
                    // coincident estimates; nudge apart and keep going
                    zs[k] += Complex::new(1e-8, 1e-8);
                    max_step = Number::INFINITY;
                    continue;
                }
                let step = monic.eval(zk) / denom;
                if !(step.re.is_finite() && step.im.is_finite()) {
                    continue;
                }
                zs[k] -= step;
                max_step = max_step.max(step.norm() / zk.norm().max(1.0));
            }
            if max_step < 1e-14 {
                converged = true;
                break;
            }
        }
        if !converged {
            warn!(
                degree = n,
                "root iteration did not converge in {MAX_ITERATIONS} steps"
            );
        }

        let deriv = self.derivative();
        for z in zs.iter_mut() {
            for _ in 0..NEWTON_POLISH_STEPS {
                let d = deriv.eval(*z);
                if is_zero(d) {
                    break;
                }
                let next = *z - self.eval(*z) / d;
                if !(next.re.is_finite() && next.im.is_finite())
                    || self.eval(next).norm() >= self.eval(*z).norm()
                {
                    break;
                }
                *z = next;
            }
        }
        zs
    }
}

impl fmt::Display for Poly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (i, c) in self.coeffs.iter().enumerate().rev() {
            if is_zero(*c) && !(first && i == 0) {
                continue;
            }
            if !first {
                f.write_str(" + ")?;
            }
            first = false;
            match i {
                0 => write!(f, "({c})")?,
                1 => write!(f, "({c})z")?,
                _ => write!(f, "({c})z^{i}")?,
            }
        }
        Ok(())
    }
}

/// Numerically stable roots of `a z² + b z + c`, `a` and `c` nonzero.
fn quadratic_roots(a: Complex, b: Complex, c: Complex) -> [Complex; 2] {
    let disc = (b * b - a * c * 4.0).sqrt();
    // pick the sign that avoids cancellation in b ± disc
    let q = if (b.conj() * disc).re >= 0.0 {
        (b + disc) * -0.5
    } else {
        (b - disc) * -0.5
    };
    [q / a, c / q]
}

/// A constant, real, integral exponent no larger than [`MAX_MULTIPLICITY`]
/// in magnitude.
fn integer_exponent(expr: &Expr) -> Option<i64> {
    let c = expr.constant()?;
    if c.im != 0.0 || c.re.fract() != 0.0 || c.re.abs() > Number::from(MAX_MULTIPLICITY) {
        return None;
    }
    // the cast is exact: `c.re` is integral and small
    Some(c.re as i64)
}

pub type Factors = Vec<(Expr, u32)>;

fn product(factors: &[(Expr, u32)]) -> Expr {
    factors
        .iter()
        .map(|(e, k)| match k {
            1 => e.clone(),
            _ => Expr::binary(OperatorTyp::Pow, e.clone(), Expr::Num(*k as Number)),
        })
        .reduce(|acc, e| Expr::binary(OperatorTyp::Mul, acc, e))
        .unwrap_or(Expr::Num(1.0))
}

// saturates, and anything past MAX_MULTIPLICITY is rejected by `factor_roots`
fn raise(factors: Factors, by: u32) -> Factors {
    factors
        .into_iter()
        .map(|(e, k)| (e, k.saturating_mul(by)))
        .collect()
}

/// Degree of `expr` read off its structure without expanding it, or `None`
/// when it is not a polynomial in `z`. Terms that cancel are not noticed, so
/// this is an upper bound.
pub fn structural_degree(expr: &Expr) -> Option<usize> {
    if let Some(c) = expr.constant() {
        return (c.re.is_finite() && c.im.is_finite()).then_some(0);
    }
    match expr {
        Expr::Var => Some(1),
        Expr::Unary(_, arg) => structural_degree(arg),
        Expr::Binary(OperatorTyp::Add | OperatorTyp::Sub, lhs, rhs) => {
            Some(structural_degree(lhs)?.max(structural_degree(rhs)?))
        }
        Expr::Binary(OperatorTyp::Mul, lhs, rhs) => {
            structural_degree(lhs)?.checked_add(structural_degree(rhs)?)
        }
        Expr::Binary(OperatorTyp::Div, lhs, rhs) => {
            let divisor = rhs.constant()?;
            if is_zero(divisor) {
                return None;
            }
            structural_degree(lhs)
        }
        Expr::Binary(OperatorTyp::Pow, base, exponent) => {
            let n = usize::try_from(integer_exponent(exponent)?).ok()?;
            structural_degree(base)?.checked_mul(n)
        }
        _ => None,
    }
}

/// Structural numerator/denominator split of an expression, each side kept
/// as a list of powered factors so that multiplicities written in factored
/// form survive. Nothing is cancelled between the two sides.
#[derive(Clone, Debug, PartialEq)]
pub struct Fraction {
    pub numer: Factors,
    pub denom: Factors,
}

impl Fraction {
    pub fn of(expr: &Expr) -> Self {
        let (numer, denom) = split(expr);
        Self { numer, denom }
    }

    pub fn has_variable_denominator(&self) -> bool {
        self.denom.iter().any(|(e, _)| e.depends_on_z())
    }

    // None when some factor is not a polynomial in `z`
    pub fn numer_roots(&self) -> Option<Vec<Complex>> {
        factor_roots(&self.numer)
    }

    pub fn denom_roots(&self) -> Option<Vec<Complex>> {
        factor_roots(&self.denom)
    }
}

fn factor_roots(factors: &[(Expr, u32)]) -> Option<Vec<Complex>> {
    let mut polys = vec![];
    let mut total: u64 = 0;
    for (factor, k) in factors {
        if !factor.depends_on_z() {
            continue;
        }
        let poly = Poly::from_expr(factor)?;
        total = total.saturating_add((poly.degree() as u64).saturating_mul(u64::from(*k)));
        polys.push((poly, *k));
    }
    if total > u64::from(MAX_MULTIPLICITY) {
        debug!(total, "too many roots to list");
        return None;
    }

    let mut roots = Vec::with_capacity(total as usize);
    for (poly, k) in polys {
        for root in poly.roots() {
            roots.extend(core::iter::repeat(root).take(k as usize));
        }
    }
    Some(roots)
}

fn split(expr: &Expr) -> (Factors, Factors) {
    match expr {
        Expr::Binary(OperatorTyp::Mul, lhs, rhs) => {
            let (mut ln, mut ld) = split(lhs);
            let (rn, rd) = split(rhs);
            ln.extend(rn);
            ld.extend(rd);
            (ln, ld)
        }
        Expr::Binary(OperatorTyp::Div, lhs, rhs) => {
            let (mut ln, mut ld) = split(lhs);
            let (rn, rd) = split(rhs);
            ln.extend(rd);
            ld.extend(rn);
            (ln, ld)
        }
        Expr::Unary(OperatorTyp::Neg, arg) => {
            let (mut n, d) = split(arg);
            n.push((Expr::Num(-1.0), 1));
            (n, d)
        }
        Expr::Binary(OperatorTyp::Pow, base, exponent) => match integer_exponent(exponent) {
            Some(0) => (vec![], vec![]),
            Some(k) => {
                let (n, d) = split(base);
                // |k| is at most MAX_MULTIPLICITY
                let by = k.unsigned_abs() as u32;
                if k > 0 {
                    (raise(n, by), raise(d, by))
                } else {
                    (raise(d, by), raise(n, by))
                }
            }
            None => (vec![(expr.clone(), 1)], vec![]),
        },
        Expr::Binary(op @ (OperatorTyp::Add | OperatorTyp::Sub), lhs, rhs) => {
            let (ln, ld) = split(lhs);
            let (rn, rd) = split(rhs);
            if ld.is_empty() && rd.is_empty() {
                return (vec![(expr.clone(), 1)], vec![]);
            }
            if ld == rd {
                let numer = Expr::binary(*op, product(&ln), product(&rn));
                return (vec![(numer, 1)], ld);
            }
            let numer = Expr::binary(
                *op,
                Expr::binary(OperatorTyp::Mul, product(&ln), product(&rd)),
                Expr::binary(OperatorTyp::Mul, product(&rn), product(&ld)),
            );
            let mut denom = ld;
            denom.extend(rd);
            (vec![(numer, 1)], denom)
        }
        _ => (vec![(expr.clone(), 1)], vec![]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::compile;

    fn poly(text: &str) -> Option<Poly> {
        Poly::from_expr(compile(text).unwrap().root())
    }

    fn c(re: Number, im: Number) -> Complex {
        Complex::new(re, im)
    }

    fn sorted(mut v: Vec<Complex>) -> Vec<Complex> {
        v.sort_by(|a, b| a.re.total_cmp(&b.re).then(a.im.total_cmp(&b.im)));
        v
    }

    #[test]
    fn expands_products_and_powers() {
        let p = poly("(z - 1)**2 * (z + 2)").unwrap();
        // z^3 - 3z + 2
        assert_eq!(
            p.coeffs(),
            &[c(2.0, 0.0), c(-3.0, 0.0), c(0.0, 0.0), c(1.0, 0.0)]
        );
        assert_eq!(poly("z/2").unwrap().coeffs(), &[c(0.0, 0.0), c(0.5, 0.0)]);
        assert_eq!(poly("2*I").unwrap().degree(), 0);
    }

    #[test]
    fn rejects_non_polynomials() {
        for text in ["1/z", "exp(z)", "z**0.5", "z**z", "z**-1", "z**1000", "1/(1-1)"] {
            assert!(poly(text).is_none(), "{text}");
        }
    }

    #[test]
    fn low_degree_roots_are_closed_form() {
        assert_eq!(poly("2*z - 4").unwrap().roots(), vec![c(2.0, 0.0)]);
        assert_eq!(
            sorted(poly("z**2 - 1").unwrap().roots()),
            vec![c(-1.0, 0.0), c(1.0, 0.0)]
        );
        assert_eq!(
            poly("z**2 - 2*z + 1").unwrap().roots(),
            vec![c(1.0, 0.0), c(1.0, 0.0)]
        );
        let r = sorted(poly("z**2 + 1").unwrap().roots());
        assert!((r[0] - c(0.0, -1.0)).norm() < 1e-15);
        assert!((r[1] - c(0.0, 1.0)).norm() < 1e-15);
    }

    #[test]
    fn origin_roots_are_exact() {
        let r = poly("z**3").unwrap().roots();
        assert_eq!(r, vec![c(0.0, 0.0); 3]);
        let r = sorted(poly("z**4 - z**2").unwrap().roots());
        assert_eq!(r.iter().filter(|z| z.norm() == 0.0).count(), 2);
    }

    #[test]
    fn durand_kerner_finds_roots_of_unity() {
        let p = poly("z**5 - 1").unwrap();
        let roots = p.roots();
        assert_eq!(roots.len(), 5);
        for root in &roots {
            assert!(p.eval(*root).norm() < 1e-12, "{root}");
            assert!((root.norm() - 1.0).abs() < 1e-12);
        }
        // all distinct
        for (i, a) in roots.iter().enumerate() {
            for b in &roots[i + 1..] {
                assert!((a - b).norm() > 0.5);
            }
        }
    }

    #[test]
    fn fraction_keeps_factored_multiplicity() {
        let frac = Fraction::of(compile("(z-1)**2/(z+1)").unwrap().root());
        assert_eq!(frac.numer.len(), 1);
        assert_eq!(frac.numer[0].1, 2);
        assert_eq!(frac.numer_roots().unwrap(), vec![c(1.0, 0.0); 2]);
        assert_eq!(frac.denom_roots().unwrap(), vec![c(-1.0, 0.0)]);
    }

    #[test]
    fn fraction_of_sums_uses_common_denominator() {
        let frac = Fraction::of(compile("1/z + 1/(z-1)").unwrap().root());
        assert!(frac.has_variable_denominator());
        let poles = sorted(frac.denom_roots().unwrap());
        assert_eq!(poles, vec![c(0.0, 0.0), c(1.0, 0.0)]);
        // (z - 1) + z
        assert_eq!(frac.numer_roots().unwrap(), vec![c(0.5, 0.0)]);
    }

    #[test]
    fn negative_powers_move_to_the_denominator() {
        let frac = Fraction::of(compile("z**-2").unwrap().root());
        assert!(frac.numer.is_empty());
        assert_eq!(frac.denom_roots().unwrap(), vec![c(0.0, 0.0); 2]);
    }

    #[test]
    fn factored_powers_may_exceed_expansion_limit() {
        let frac = Fraction::of(compile("z**129").unwrap().root());
        assert_eq!(frac.numer_roots().unwrap(), vec![c(0.0, 0.0); 129]);
        let frac = Fraction::of(compile("(z - 2)**64 * (z - 2)**65").unwrap().root());
        assert_eq!(frac.numer_roots().unwrap().len(), 129);
    }

    #[test]
    fn nested_powers_saturate_instead_of_overflowing() {
        let text = "((((z**128)**128)**128)**128)**128";
        let frac = Fraction::of(compile(text).unwrap().root());
        assert_eq!(frac.numer[0].1, u32::MAX);
        assert!(frac.numer_roots().is_none());
        let frac = Fraction::of(compile("1/(z**100)**100").unwrap().root());
        assert!(frac.denom_roots().is_none());
    }

    #[test]
    fn structural_degree_without_expansion() {
        let degree = |text: &str| structural_degree(compile(text).unwrap().root());
        assert_eq!(degree("z**200 - z + 1"), Some(200));
        assert_eq!(degree("(z**3 + 1)**100 / 4"), Some(300));
        assert_eq!(degree("exp(z)**200"), None);
        assert_eq!(degree("z**-200"), None);
        assert_eq!(
            degree("(((((z**4096)**4096)**4096)**4096)**4096)**4096"),
            None
        );
    }

    #[test]
    fn non_rational_sides_are_unavailable() {
        let frac = Fraction::of(compile("sin(z)/z").unwrap().root());
        assert!(frac.numer_roots().is_none());
        assert_eq!(frac.denom_roots().unwrap(), vec![c(0.0, 0.0)]);

        let frac = Fraction::of(compile("exp(1/z)").unwrap().root());
        assert!(!frac.has_variable_denominator());
        assert!(frac.denom_roots().unwrap().is_empty());
    }
}
