// SPDX: CC0-1.0

use crate::{
    eval::Fun,
    poly::{structural_degree, Fraction, Poly},
    stdlib::{self, Builtin, Constant, FunFamily},
    Complex, Number,
};
use core::fmt;
use std::sync::Arc;

pub const DEFAULT_HALF_EXTENT: Number = 2.0;
pub const PERIODIC_HALF_EXTENT: Number = 6.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorTyp {
    Neg,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Associativity {
    Left,
    Right,
}

impl OperatorTyp {
    pub const fn precedence(&self) -> i8 {
        match self {
            Self::Add => 2,
            Self::Sub => 2,
            Self::Mul => 3,
            Self::Div => 3,
            Self::Neg => 4,
            Self::Pow => 5,
        }
    }

    pub const fn associativity(&self) -> Associativity {
        use Associativity::{Left, Right};
        match self {
            Self::Neg => Right,
            Self::Add => Left,
            Self::Sub => Left,
            Self::Mul => Left,
            Self::Div => Left,
            Self::Pow => Right,
        }
    }

    pub const fn is_prefix(&self) -> bool {
        matches!(self, Self::Neg)
    }

    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "**",
        }
    }

    pub const fn fun(&self) -> (&'static str, Fun) {
        match self {
            Self::Neg => ("neg", Fun::new(1, stdlib::neg)),
            Self::Add => ("add", Fun::new(2, stdlib::add)),
            Self::Sub => ("sub", Fun::new(2, stdlib::sub)),
            Self::Mul => ("mul", Fun::new(2, stdlib::mul)),
            Self::Div => ("div", Fun::new(2, stdlib::div)),
            Self::Pow => ("pow", Fun::new(2, stdlib::pow)),
        }
    }
}

/// Syntax tree over the single free variable `z`.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Num(Number),
    Const(Constant),
    Var,
    Unary(OperatorTyp, Box<Expr>),
    Binary(OperatorTyp, Box<Expr>, Box<Expr>),
    Call(Builtin, Box<Expr>),
}

impl Expr {
    pub fn unary(op: OperatorTyp, arg: Expr) -> Self {
        Self::Unary(op, Box::new(arg))
    }

    pub fn binary(op: OperatorTyp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn call(fun: Builtin, arg: Expr) -> Self {
        Self::Call(fun, Box::new(arg))
    }

    /// Visits every node, parents before children.
    pub fn any(&self, pred: &impl Fn(&Expr) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Self::Num(_) | Self::Const(_) | Self::Var => false,
            Self::Unary(_, arg) | Self::Call(_, arg) => arg.any(pred),
            Self::Binary(_, lhs, rhs) => lhs.any(pred) || rhs.any(pred),
        }
    }

    pub fn depends_on_z(&self) -> bool {
        self.any(&|e| matches!(e, Self::Var))
    }

    /// Tree-walking evaluation. The grid path goes through `eval::Program`
    /// instead; this one is for folding constant subtrees.
    pub fn eval(&self, z: Complex) -> Complex {
        match self {
            Self::Num(n) => Complex::new(*n, 0.0),
            Self::Const(c) => c.value(),
            Self::Var => z,
            Self::Unary(op, arg) => (op.fun().1.fun)(&[arg.eval(z)]),
            Self::Binary(op, lhs, rhs) => (op.fun().1.fun)(&[lhs.eval(z), rhs.eval(z)]),
            Self::Call(fun, arg) => fun.apply(arg.eval(z)),
        }
    }

    /// Value of a subtree that does not mention `z`.
    pub fn constant(&self) -> Option<Complex> {
        if self.depends_on_z() {
            None
        } else {
            Some(self.eval(Complex::new(0.0, 0.0)))
        }
    }

    /// Number of nodes; a rough size measure for logging.
    pub fn node_count(&self) -> usize {
        match self {
            Self::Num(_) | Self::Const(_) | Self::Var => 1,
            Self::Unary(_, arg) | Self::Call(_, arg) => 1 + arg.node_count(),
            Self::Binary(_, lhs, rhs) => 1 + lhs.node_count() + rhs.node_count(),
        }
    }

    fn precedence(&self) -> i8 {
        match self {
            Self::Unary(op, _) | Self::Binary(op, _, _) => op.precedence(),
            Self::Num(n) if *n < 0.0 => OperatorTyp::Neg.precedence(),
            _ => i8::MAX,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, parens: bool) -> fmt::Result {
        if parens {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Const(c) => f.write_str(c.name()),
            Self::Var => f.write_str(stdlib::Z),
            Self::Unary(op, arg) => {
                f.write_str(op.symbol())?;
                arg.fmt_child(f, arg.precedence() < op.precedence())
            }
            Self::Binary(op, lhs, rhs) => {
                let prec = op.precedence();
                let (lhs_parens, rhs_parens) = match op.associativity() {
                    Associativity::Left => {
                        (lhs.precedence() < prec, rhs.precedence() <= prec)
                    }
                    Associativity::Right => {
                        (lhs.precedence() <= prec, rhs.precedence() < prec)
                    }
                };
                lhs.fmt_child(f, lhs_parens)?;
                write!(f, " {} ", op.symbol())?;
                rhs.fmt_child(f, rhs_parens)
            }
            Self::Call(fun, arg) => write!(f, "{fun}({arg})"),
        }
    }
}

/// A compiled user expression together with the text it came from.
#[derive(Clone, Debug)]
pub struct Expression {
    src: Arc<String>,
    root: Expr,
}

impl Expression {
    pub fn new(src: Arc<String>, root: Expr) -> Self {
        Self { src, root }
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Classification {
    Polynomial { degree: usize },
    Rational,
    Exponential,
    Trigonometric,
    Logarithmic,
    Unknown,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Polynomial { degree } => write!(f, "polynomial of degree {degree}"),
            Self::Rational => write!(f, "rational"),
            Self::Exponential => write!(f, "exponential"),
            Self::Trigonometric => write!(f, "trigonometric"),
            Self::Logarithmic => write!(f, "logarithmic"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

fn calls_family(expr: &Expr, family: FunFamily) -> bool {
    expr.any(&|e| matches!(e, Expr::Call(fun, _) if fun.family() == family))
}

/// Best-effort shape of an expression. The checks run in a fixed order and
/// the first match wins, so `exp(z)/z` is rational and `exp(sin(z))` is
/// exponential.
pub fn classify(expr: &Expression) -> Classification {
    let root = expr.root();

    // too large to expand still counts, by its structural degree
    let degree = Poly::from_expr(root)
        .map(|poly| poly.degree())
        .or_else(|| structural_degree(root));
    if let Some(degree) = degree {
        return Classification::Polynomial { degree };
    }

    if Fraction::of(root).has_variable_denominator() {
        return Classification::Rational;
    }

    let exponential = calls_family(root, FunFamily::Exponential)
        || root.any(&|e| {
            matches!(e, Expr::Binary(OperatorTyp::Pow, _, exponent) if exponent.depends_on_z())
        });
    if exponential {
        return Classification::Exponential;
    }

    if calls_family(root, FunFamily::Trigonometric) {
        return Classification::Trigonometric;
    }

    if calls_family(root, FunFamily::Logarithmic) {
        return Classification::Logarithmic;
    }

    Classification::Unknown
}

/// Half extent of the default viewing window: wider for a bare periodic
/// function of `z` so that a few periods are visible.
pub fn default_half_extent(expr: &Expression) -> Number {
    match expr.root() {
        Expr::Call(Builtin::Sin | Builtin::Cos | Builtin::Tan, arg) if **arg == Expr::Var => {
            PERIODIC_HALF_EXTENT
        }
        _ => DEFAULT_HALF_EXTENT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::compile;

    fn class(text: &str) -> Classification {
        classify(&compile(text).unwrap())
    }

    #[test]
    fn classification_priority() {
        assert_eq!(class("z**3 - 1"), Classification::Polynomial { degree: 3 });
        assert_eq!(class("z/2 + I"), Classification::Polynomial { degree: 1 });
        assert_eq!(class("7"), Classification::Polynomial { degree: 0 });
        assert_eq!(class("(z**3 - 1)/(z**2 + 1)"), Classification::Rational);
        assert_eq!(class("sin(z)/z"), Classification::Rational);
        assert_eq!(class("exp(z)"), Classification::Exponential);
        assert_eq!(class("exp(-2*pi/z)"), Classification::Exponential);
        assert_eq!(class("z**z"), Classification::Exponential);
        assert_eq!(class("sin(z)"), Classification::Trigonometric);
        assert_eq!(class("tan(z) + cosh(z)"), Classification::Trigonometric);
        assert_eq!(class("log(z)"), Classification::Logarithmic);
        assert_eq!(class("sqrt(z)"), Classification::Unknown);
        assert_eq!(class("z**(1/3)"), Classification::Unknown);
    }

    #[test]
    fn large_powers_keep_their_degree() {
        let degree_129 = Classification::Polynomial { degree: 129 };
        assert_eq!(class("z**129"), degree_129);
        assert_eq!(class("z**64 * z**65"), degree_129);
        assert_eq!(class("(z - 1)**129 + 2"), degree_129);
        assert_eq!(
            class("((z**128)**128)**128"),
            Classification::Polynomial { degree: 128 * 128 * 128 }
        );
        assert_eq!(class("z**5000"), Classification::Unknown);
        assert_eq!(class("z**129/z"), Classification::Rational);
    }

    #[test]
    fn periodic_functions_get_a_wider_window() {
        assert_eq!(
            default_half_extent(&compile("sin(z)").unwrap()),
            PERIODIC_HALF_EXTENT
        );
        assert_eq!(
            default_half_extent(&compile("sin(2*z)").unwrap()),
            DEFAULT_HALF_EXTENT
        );
        assert_eq!(
            default_half_extent(&compile("z**2").unwrap()),
            DEFAULT_HALF_EXTENT
        );
    }

    #[test]
    fn display_keeps_needed_parentheses() {
        for (text, shown) in [
            ("(z-1)**2/(z+1)", "(z - 1) ** 2 / (z + 1)"),
            ("-z**2", "-z ** 2"),
            ("(-z)**2", "(-z) ** 2"),
            ("z - (1 - z)", "z - (1 - z)"),
            ("2**3**z", "2 ** 3 ** z"),
            ("(2**3)**z", "(2 ** 3) ** z"),
            ("exp(-2*pi/z)", "exp(-2 * pi / z)"),
        ] {
            assert_eq!(compile(text).unwrap().to_string(), shown, "{text}");
        }
    }

    #[test]
    fn constant_folding() {
        let e = compile("2*pi*I").unwrap();
        let c = e.root().constant().unwrap();
        assert!((c - Complex::new(0.0, core::f64::consts::TAU)).norm() < 1e-12);
        assert!(compile("z + 1").unwrap().root().constant().is_none());
    }
}
