// SPDX: CC0-1.0

use crate::{
    expr::{Expr, Expression, OperatorTyp},
    grid::{SampleGrid, Window},
    stdlib::{self, Builtin},
    Complex, Number,
};
use core::fmt;
use tracing::{debug, warn};

/// Stands in for every non-finite or failed evaluation.
pub const UNDEFINED: Complex = Complex::new(Number::NAN, Number::NAN);

/// The single normalization policy: anything with a non-finite part becomes
/// [`UNDEFINED`] in both parts.
#[inline]
pub fn normalize(z: Complex) -> Complex {
    if z.re.is_finite() && z.im.is_finite() {
        z
    } else {
        UNDEFINED
    }
}

#[inline]
pub fn is_undefined(z: Complex) -> bool {
    z.re.is_nan() || z.im.is_nan()
}

#[derive(Clone, Copy, Debug)]
pub enum OperationTyp {
    Operator(OperatorTyp),
    Val(Complex),
    Var,
    Call(Builtin),
}

#[derive(Clone, Copy, Debug)]
pub struct Operation {
    pub typ: OperationTyp,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.typ {
            OperationTyp::Val(val) => write!(f, "push {val}"),
            OperationTyp::Var => write!(f, "push {}", stdlib::Z),
            OperationTyp::Operator(typ) => write!(f, "call '{}'", typ.fun().0),
            OperationTyp::Call(fun) => write!(f, "call '{}'", fun.name()),
        }
    }
}

#[derive(Debug)]
pub enum EvalErrTyp {
    Empty,
    MissingArgs {
        name: &'static str,
        arity: usize,
        found: usize,
    },
    StackMismatch {
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for EvalErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.typ {
            EvalErrTyp::Empty => write!(f, "cannot evaluate empty program"),

            EvalErrTyp::MissingArgs { name, arity, found } => write!(
                f,
                "function '{name}' requires {arity} argument{s}, but found {found}",
                s = if *arity == 1 { "" } else { "s" }
            ),

            EvalErrTyp::StackMismatch { expected, found } => write!(
                f,
                "expected {expected} operation{s} on the stack but found {found}",
                s = if *expected == 1 { "" } else { "s" }
            ),
        }
    }
}

impl std::error::Error for EvalErr {}

#[derive(Debug)]
pub struct EvalErr {
    pub typ: EvalErrTyp,
    pub op: Option<Operation>, // if none, associated with end-of-program checking
}

#[derive(Clone, Copy, Debug)]
pub struct Fun {
    pub arity: usize,
    pub fun: fn(&[Complex]) -> Complex,
}

impl Fun {
    pub const fn new(arity: usize, fun: fn(&[Complex]) -> Complex) -> Self {
        Self { arity, fun }
    }
}

/// Postfix program computing `f(z)` for one point at a time.
#[derive(Debug)]
pub struct Program {
    pub(crate) ops: Vec<Operation>,
}

impl Program {
    #[inline]
    pub const fn new(ops: Vec<Operation>) -> Self {
        Self { ops }
    }

    /// Lowers `expr` to postfix and checks that it leaves exactly one value
    /// on the stack.
    pub fn compile(expr: &Expression) -> Result<Self, EvalErr> {
        fn lower(expr: &Expr, ops: &mut Vec<Operation>) {
            let typ = match expr {
                Expr::Num(n) => OperationTyp::Val(Complex::new(*n, 0.0)),
                Expr::Const(c) => OperationTyp::Val(c.value()),
                Expr::Var => OperationTyp::Var,
                Expr::Unary(op, arg) => {
                    lower(arg, ops);
                    OperationTyp::Operator(*op)
                }
                Expr::Binary(op, lhs, rhs) => {
                    lower(lhs, ops);
                    lower(rhs, ops);
                    OperationTyp::Operator(*op)
                }
                Expr::Call(fun, arg) => {
                    lower(arg, ops);
                    OperationTyp::Call(*fun)
                }
            };
            ops.push(Operation { typ });
        }

        let mut ops = Vec::with_capacity(expr.root().node_count());
        lower(expr.root(), &mut ops);
        let prog = Self::new(ops);
        prog.check()?;
        Ok(prog)
    }

    fn check(&self) -> Result<(), EvalErr> {
        if self.ops.is_empty() {
            return Err(EvalErr {
                typ: EvalErrTyp::Empty,
                op: None,
            });
        }
        let mut depth = 0usize;
        for op in &self.ops {
            let (name, arity) = match op.typ {
                OperationTyp::Val(_) | OperationTyp::Var => ("push", 0),
                OperationTyp::Operator(typ) => {
                    let (name, fun) = typ.fun();
                    (name, fun.arity)
                }
                OperationTyp::Call(fun) => (fun.name(), fun.fun().arity),
            };
            if depth < arity {
                return Err(EvalErr {
                    typ: EvalErrTyp::MissingArgs {
                        name,
                        arity,
                        found: depth,
                    },
                    op: Some(*op),
                });
            }
            depth = depth - arity + 1;
        }
        if depth != 1 {
            return Err(EvalErr {
                typ: EvalErrTyp::StackMismatch {
                    expected: 1,
                    found: depth,
                },
                op: None,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn ops(&self) -> core::slice::Iter<'_, Operation> {
        self.ops.iter()
    }

    /// Estimated work per sample point, in units of one arithmetic operation.
    pub fn cost(&self) -> u64 {
        self.ops
            .iter()
            .map(|op| match op.typ {
                OperationTyp::Call(fun) => fun.cost(),
                OperationTyp::Operator(OperatorTyp::Pow) => 4,
                _ => 1,
            })
            .sum()
    }

    pub fn eval(&self, z: Complex, stack: &mut Vec<Complex>) -> Result<Complex, EvalErr> {
        fn eval_fun(
            stack: &mut Vec<Complex>,
            op: Operation,
            name: &'static str,
            fun: &Fun,
        ) -> Result<Complex, EvalErr> {
            let len = stack.len();
            if len < fun.arity {
                return Err(EvalErr {
                    typ: EvalErrTyp::MissingArgs {
                        arity: fun.arity,
                        found: len,
                        name,
                    },
                    op: Some(op),
                });
            }
            // stack: ...a, b, c, d
            //                 ^^^^ args if arity is 2
            let val = (fun.fun)(&stack[len - fun.arity..]);
            stack.truncate(len - fun.arity);
            Ok(val)
        }

        if self.ops.is_empty() {
            return Err(EvalErr {
                typ: EvalErrTyp::Empty,
                op: None,
            });
        }

        stack.clear();

        for op in &self.ops {
            let val = match op.typ {
                OperationTyp::Operator(typ) => {
                    let (name, fun) = typ.fun();
                    eval_fun(stack, *op, name, &fun)?
                }
                OperationTyp::Call(fun) => eval_fun(stack, *op, fun.name(), &fun.fun())?,
                OperationTyp::Val(val) => val,
                OperationTyp::Var => z,
            };
            stack.push(val);
        }

        match (stack.pop(), stack.len()) {
            (Some(val), 0) => Ok(val),
            (_, found) => Err(EvalErr {
                typ: EvalErrTyp::StackMismatch {
                    expected: 1,
                    found: found + 1,
                },
                op: None,
            }),
        }
    }
}

/// Values of `f` over a [`SampleGrid`], same shape, every element finite or
/// [`UNDEFINED`]. Keeps the unrotated window the grid was built from.
#[derive(Clone, Debug)]
pub struct ValueField {
    window: Window,
    values: Vec<Complex>,
}

impl ValueField {
    pub fn filled(window: Window, value: Complex) -> Self {
        let n = usize::from(window.resolution());
        Self {
            window,
            values: vec![normalize(value); n * n],
        }
    }

    pub const fn window(&self) -> &Window {
        &self.window
    }

    pub const fn resolution(&self) -> u16 {
        self.window.resolution()
    }

    pub fn values(&self) -> &[Complex] {
        &self.values
    }

    pub fn get(&self, col: u16, row: u16) -> Complex {
        self.values[usize::from(row) * usize::from(self.resolution()) + usize::from(col)]
    }

    pub fn undefined_count(&self) -> usize {
        self.values.iter().filter(|z| is_undefined(**z)).count()
    }
}

/// Evaluates `expr` at every grid point. Never fails: a program that does
/// not compile yields a field of [`UNDEFINED`], as does every point whose
/// evaluation fails or is not finite.
pub fn evaluate(expr: &Expression, grid: &SampleGrid) -> ValueField {
    let prog = match Program::compile(expr) {
        Ok(prog) => prog,
        Err(err) => {
            warn!(expr = %expr, "cannot compile expression: {err}");
            return ValueField::filled(*grid.window(), UNDEFINED);
        }
    };

    let mut stack = Vec::new();
    let values = grid
        .points()
        .iter()
        .map(|z| match prog.eval(*z, &mut stack) {
            Ok(w) => normalize(w),
            Err(_) => UNDEFINED,
        })
        .collect();
    let field = ValueField {
        window: *grid.window(),
        values,
    };
    debug!(
        expr = %expr,
        resolution = grid.resolution(),
        undefined = field.undefined_count(),
        "evaluated"
    );
    field
}

/// Evaluates on the grid pre-rotated by `angle` (`z → z e^{i angle}`).
pub fn evaluate_rotated(expr: &Expression, grid: &SampleGrid, angle: Number) -> ValueField {
    evaluate(expr, &grid.rotated(angle))
}
