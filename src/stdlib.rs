// SPDX: CC0-1.0

use crate::{eval::Fun, lex::SubStr, zeta, Complex};
use core::{f64::consts, fmt};
use std::collections::HashMap;

pub const Z: &str = "z";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Constant {
    Pi,
    Tau,
    E,
    I,
}

impl Constant {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Pi => "pi",
            Self::Tau => "tau",
            Self::E => "e",
            Self::I => "I",
        }
    }

    pub const fn value(&self) -> Complex {
        match self {
            Self::Pi => Complex::new(consts::PI, 0.0),
            Self::Tau => Complex::new(consts::TAU, 0.0),
            Self::E => Complex::new(consts::E, 0.0),
            Self::I => Complex::new(0.0, 1.0),
        }
    }
}

/// Coarse grouping of builtins used when classifying an expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FunFamily {
    Exponential,
    Trigonometric,
    Logarithmic,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    Exp,
    Log,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Cot,
    Sec,
    Csc,
    Sinh,
    Cosh,
    Tanh,
    Asin,
    Acos,
    Atan,
    Zeta,
    Gamma,
    Abs,
    Conj,
}

impl Builtin {
    pub const fn exhaustive() -> &'static [Builtin] {
        &[
            Self::Exp,
            Self::Log,
            Self::Sqrt,
            Self::Sin,
            Self::Cos,
            Self::Tan,
            Self::Cot,
            Self::Sec,
            Self::Csc,
            Self::Sinh,
            Self::Cosh,
            Self::Tanh,
            Self::Asin,
            Self::Acos,
            Self::Atan,
            Self::Zeta,
            Self::Gamma,
            Self::Abs,
            Self::Conj,
        ]
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Exp => "exp",
            Self::Log => "log",
            Self::Sqrt => "sqrt",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Cot => "cot",
            Self::Sec => "sec",
            Self::Csc => "csc",
            Self::Sinh => "sinh",
            Self::Cosh => "cosh",
            Self::Tanh => "tanh",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Zeta => "zeta",
            Self::Gamma => "gamma",
            Self::Abs => "abs",
            Self::Conj => "conj",
        }
    }

    pub const fn family(&self) -> FunFamily {
        match self {
            Self::Exp => FunFamily::Exponential,
            Self::Log => FunFamily::Logarithmic,
            Self::Sin
            | Self::Cos
            | Self::Tan
            | Self::Cot
            | Self::Sec
            | Self::Csc
            | Self::Sinh
            | Self::Cosh
            | Self::Tanh => FunFamily::Trigonometric,
            Self::Sqrt
            | Self::Asin
            | Self::Acos
            | Self::Atan
            | Self::Zeta
            | Self::Gamma
            | Self::Abs
            | Self::Conj => FunFamily::Other,
        }
    }

    /// Rough per-call cost relative to a single arithmetic operation.
    pub const fn cost(&self) -> u64 {
        match self {
            Self::Zeta => 120,
            Self::Gamma => 20,
            _ => 4,
        }
    }

    pub const fn fun(&self) -> Fun {
        let fun: fn(&[Complex]) -> Complex = match self {
            Self::Exp => exp,
            Self::Log => log,
            Self::Sqrt => sqrt,
            Self::Sin => sin,
            Self::Cos => cos,
            Self::Tan => tan,
            Self::Cot => cot,
            Self::Sec => sec,
            Self::Csc => csc,
            Self::Sinh => sinh,
            Self::Cosh => cosh,
            Self::Tanh => tanh,
            Self::Asin => arcsin,
            Self::Acos => arccos,
            Self::Atan => arctan,
            Self::Zeta => riemann_zeta,
            Self::Gamma => gamma,
            Self::Abs => abs,
            Self::Conj => conj,
        };
        Fun::new(1, fun)
    }

    pub fn apply(&self, z: Complex) -> Complex {
        (self.fun().fun)(&[z])
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ident {
    Var,
    Const(Constant),
    Fun(Builtin),
}

impl Ident {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Var => "variable",
            Self::Const(_) => "constant",
            Self::Fun(_) => "function",
        }
    }
}

#[derive(Clone, Debug, Eq)]
pub enum IdentKey {
    Arc(SubStr),
    Static(&'static str),
}

impl PartialEq for IdentKey {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl core::hash::Hash for IdentKey {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.get().hash(state)
    }
}

impl IdentKey {
    pub fn get(&self) -> &str {
        match self {
            Self::Arc(s) => s.get(),
            Self::Static(s) => s,
        }
    }
}

impl fmt::Display for IdentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

impl From<SubStr> for IdentKey {
    fn from(s: SubStr) -> Self {
        Self::Arc(s)
    }
}

impl From<&'static str> for IdentKey {
    fn from(s: &'static str) -> Self {
        Self::Static(s)
    }
}

pub type Idents = HashMap<IdentKey, Ident>;

pub fn standard_idents() -> Idents {
    let mut ret = HashMap::new();

    ret.insert(Z.into(), Ident::Var);

    for fun in Builtin::exhaustive() {
        ret.insert(fun.name().into(), Ident::Fun(*fun));
    }
    ret.insert("ln".into(), Ident::Fun(Builtin::Log));
    ret.insert("arcsin".into(), Ident::Fun(Builtin::Asin));
    ret.insert("arccos".into(), Ident::Fun(Builtin::Acos));
    ret.insert("arctan".into(), Ident::Fun(Builtin::Atan));

    for c in [Constant::Pi, Constant::Tau, Constant::E, Constant::I] {
        ret.insert(c.name().into(), Ident::Const(c));
    }
    ret.insert("i".into(), Ident::Const(Constant::I));
    ret
}

/// Closest known identifier to `text`, if any is similar enough to be worth
/// suggesting.
pub fn most_similar<'a>(idents: &'a Idents, text: &str) -> Option<(&'a IdentKey, &'a Ident)> {
    let text = text.to_ascii_lowercase();
    let (sim, kv) = idents
        .iter()
        .map(|(k, v)| {
            (
                strsim::normalized_damerau_levenshtein(&text, &k.get().to_ascii_lowercase()),
                (k, v),
            )
        })
        // ties resolve to the lexicographically smaller name so the hint is stable
        .reduce(|(acc_sim, acc_kv), (elem_sim, elem_kv)| {
            if elem_sim > acc_sim || (elem_sim == acc_sim && elem_kv.0.get() < acc_kv.0.get()) {
                (elem_sim, elem_kv)
            } else {
                (acc_sim, acc_kv)
            }
        })?;
    (sim > 0.3).then_some(kv)
}

#[track_caller]
fn expect_n<const N: usize>(args: &[Complex]) -> [Complex; N] {
    assert_eq!(args.len(), N);
    let mut ret = [Complex::new(0.0, 0.0); N];
    ret.copy_from_slice(args);
    ret
}

pub fn neg(args: &[Complex]) -> Complex {
    let [x] = expect_n::<1>(args);
    -x
}

pub fn add(args: &[Complex]) -> Complex {
    let [x, y] = expect_n::<2>(args);
    x + y
}

pub fn sub(args: &[Complex]) -> Complex {
    let [x, y] = expect_n::<2>(args);
    x - y
}

pub fn mul(args: &[Complex]) -> Complex {
    let [x, y] = expect_n::<2>(args);
    x * y
}

pub fn div(args: &[Complex]) -> Complex {
    let [x, y] = expect_n::<2>(args);
    x / y
}

pub fn pow(args: &[Complex]) -> Complex {
    let [x, exp] = expect_n::<2>(args);
    powc(x, exp)
}

/// Principal-branch power, exact for integer exponents.
pub fn powc(base: Complex, exp: Complex) -> Complex {
    if exp.im == 0.0 {
        let re = exp.re;
        if re.fract() == 0.0 && re.abs() <= f64::from(i32::MAX) {
            // the cast is exact: `re` is integral and in range
            return base.powi(re as i32);
        }
        if base.re == 0.0 && base.im == 0.0 {
            return if re > 0.0 {
                Complex::new(0.0, 0.0)
            } else {
                Complex::new(f64::NAN, f64::NAN)
            };
        }
        return base.powf(re);
    }
    if base.re == 0.0 && base.im == 0.0 {
        return if exp.re > 0.0 {
            Complex::new(0.0, 0.0)
        } else {
            Complex::new(f64::NAN, f64::NAN)
        };
    }
    base.powc(exp)
}

pub fn exp(args: &[Complex]) -> Complex {
    let [x] = expect_n::<1>(args);
    x.exp()
}

pub fn log(args: &[Complex]) -> Complex {
    let [x] = expect_n::<1>(args);
    x.ln()
}

pub fn sqrt(args: &[Complex]) -> Complex {
    let [x] = expect_n::<1>(args);
    x.sqrt()
}

pub fn sin(args: &[Complex]) -> Complex {
    let [x] = expect_n::<1>(args);
    x.sin()
}

pub fn cos(args: &[Complex]) -> Complex {
    let [x] = expect_n::<1>(args);
    x.cos()
}

pub fn tan(args: &[Complex]) -> Complex {
    let [x] = expect_n::<1>(args);
    x.tan()
}

pub fn cot(args: &[Complex]) -> Complex {
    let [x] = expect_n::<1>(args);
    x.cos() / x.sin()
}

pub fn sec(args: &[Complex]) -> Complex {
    let [x] = expect_n::<1>(args);
    x.cos().inv()
}

pub fn csc(args: &[Complex]) -> Complex {
    let [x] = expect_n::<1>(args);
    x.sin().inv()
}

pub fn sinh(args: &[Complex]) -> Complex {
    let [x] = expect_n::<1>(args);
    x.sinh()
}

pub fn cosh(args: &[Complex]) -> Complex {
    let [x] = expect_n::<1>(args);
    x.cosh()
}

pub fn tanh(args: &[Complex]) -> Complex {
    let [x] = expect_n::<1>(args);
    x.tanh()
}

pub fn arcsin(args: &[Complex]) -> Complex {
    let [x] = expect_n::<1>(args);
    x.asin()
}

pub fn arccos(args: &[Complex]) -> Complex {
    let [x] = expect_n::<1>(args);
    x.acos()
}

pub fn arctan(args: &[Complex]) -> Complex {
    let [x] = expect_n::<1>(args);
    x.atan()
}

pub fn riemann_zeta(args: &[Complex]) -> Complex {
    let [x] = expect_n::<1>(args);
    zeta::zeta(x)
}

pub fn gamma(args: &[Complex]) -> Complex {
    let [x] = expect_n::<1>(args);
    zeta::gamma(x)
}

pub fn abs(args: &[Complex]) -> Complex {
    let [x] = expect_n::<1>(args);
    Complex::new(x.norm(), 0.0)
}

pub fn conj(args: &[Complex]) -> Complex {
    let [x] = expect_n::<1>(args);
    x.conj()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_powers_are_exact_at_zero() {
        let zero = Complex::new(0.0, 0.0);
        assert_eq!(powc(zero, Complex::new(2.0, 0.0)), zero);
        assert_eq!(powc(zero, Complex::new(0.0, 0.0)), Complex::new(1.0, 0.0));
        assert!(powc(zero, Complex::new(-1.0, 0.0)).re.is_nan());
        assert_eq!(
            powc(Complex::new(0.0, 1.0), Complex::new(2.0, 0.0)),
            Complex::new(-1.0, 0.0)
        );
    }

    #[test]
    fn fractional_power_uses_principal_branch() {
        let r = powc(Complex::new(-8.0, 0.0), Complex::new(1.0 / 3.0, 0.0));
        // principal cube root of -8 is 2 * e^{i pi/3}
        assert!((r - Complex::new(1.0, 3f64.sqrt())).norm() < 1e-12);
    }

    #[test]
    fn aliases_resolve_to_the_same_builtin() {
        let idents = standard_idents();
        assert_eq!(idents.get(&"ln".into()), Some(&Ident::Fun(Builtin::Log)));
        assert_eq!(idents.get(&"i".into()), idents.get(&"I".into()));
    }

    #[test]
    fn suggests_close_names() {
        let idents = standard_idents();
        let (key, ident) = most_similar(&idents, "sinn").expect("a suggestion");
        assert_eq!(key.get(), "sin");
        assert_eq!(ident.kind(), "function");
        assert!(most_similar(&idents, "qqqqqqqqqqqq").is_none());
    }
}
