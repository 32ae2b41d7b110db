// SPDX: CC0-1.0

// implementation of shunting yard algorithm by dijkstra (see https://en.wikipedia.org/wiki/Shunting_yard_algorithm)
// that builds a syntax tree instead of a postfix program

use crate::{
    expr::{Associativity, Expr, Expression, OperatorTyp},
    lex::{LexErr, LexErrTyp, Lexer, SubStr, TokTyp},
    stdlib::{self, Builtin, Ident, IdentKey, Idents},
    Number,
};
use core::{fmt, num::ParseFloatError};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub enum ParseErrTyp {
    LexErr(LexErrTyp),
    ParseNum(ParseFloatError),
    ParenMismatch,
    Empty,
    MissingOperand,
    ImplicitMul,
    MissingCall(Builtin),
    UndefinedIdent { similar: Option<(IdentKey, Ident)> },
}

impl fmt::Display for ParseErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LexErr(err) => write!(f, "{err}"),
            Self::ParseNum(err) => write!(f, "invalid number: {err}"),
            Self::ParenMismatch => write!(f, "mismatched parentheses"),
            Self::Empty => write!(f, "empty expression"),
            Self::MissingOperand => write!(f, "missing operand"),
            Self::ImplicitMul => write!(f, "missing operator between operands"),
            Self::MissingCall(fun) => write!(f, "function '{fun}' must be called with parentheses"),
            Self::UndefinedIdent { .. } => write!(f, "undefined identifier"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ParseErr {
    pub typ: ParseErrTyp,
    pub loc: SubStr,
}

impl fmt::Display for ParseErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.loc.is_empty() {
            write!(f, "{} at end of input", self.typ)
        } else {
            write!(f, "{} at '{}'", self.typ, self.loc)
        }
    }
}

impl std::error::Error for ParseErr {}

impl From<LexErr> for ParseErr {
    fn from(err: LexErr) -> Self {
        Self {
            typ: ParseErrTyp::LexErr(err.typ),
            loc: err.loc,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ShuntOpTyp {
    Operator(OperatorTyp),
    Fun(Builtin),
    OpenParen,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ShuntOp {
    typ: ShuntOpTyp,
    loc: SubStr,
}

#[derive(Debug)]
struct Operand {
    expr: Expr,
    loc: SubStr,
}

fn missing_operand(loc: SubStr) -> ParseErr {
    ParseErr {
        typ: ParseErrTyp::MissingOperand,
        loc,
    }
}

/// Pops the operands of `op` off `out` and pushes the combined node.
fn apply(out: &mut Vec<Operand>, op: ShuntOp) -> Result<(), ParseErr> {
    let operand = match op.typ {
        ShuntOpTyp::Operator(typ) if typ.is_prefix() => {
            let arg = out.pop().ok_or_else(|| missing_operand(op.loc.clone()))?;
            Operand {
                loc: op.loc.join(&arg.loc),
                expr: Expr::unary(typ, arg.expr),
            }
        }
        ShuntOpTyp::Operator(typ) => {
            let rhs = out.pop().ok_or_else(|| missing_operand(op.loc.clone()))?;
            let lhs = out.pop().ok_or_else(|| missing_operand(op.loc.clone()))?;
            Operand {
                loc: lhs.loc.join(&rhs.loc),
                expr: Expr::binary(typ, lhs.expr, rhs.expr),
            }
        }
        ShuntOpTyp::Fun(fun) => {
            let arg = out.pop().ok_or_else(|| missing_operand(op.loc.clone()))?;
            Operand {
                loc: op.loc.join(&arg.loc),
                expr: Expr::call(fun, arg.expr),
            }
        }
        ShuntOpTyp::OpenParen => unreachable!("parentheses are never applied"),
    };
    out.push(operand);
    Ok(())
}

pub fn parse(lex: Lexer<'_>, idents: &Idents) -> Result<Expr, ParseErr> {
    let src = lex.src();
    let mut out: Vec<Operand> = Vec::new(); // output
    let mut ops: Vec<ShuntOp> = Vec::new(); // operator stack

    // true between tokens where an operand (or prefix operator) must come next
    let mut expect_operand = true;
    // a function name was just pushed and must be followed by '('
    let mut pending_call: Option<ShuntOp> = None;

    for tok in lex {
        let tok = tok?;

        if let Some(fun) = pending_call.take() {
            if tok.typ != TokTyp::OpenParen {
                let ShuntOpTyp::Fun(builtin) = fun.typ else {
                    unreachable!("only functions wait for a call");
                };
                return Err(ParseErr {
                    typ: ParseErrTyp::MissingCall(builtin),
                    loc: fun.loc,
                });
            }
        }

        let starts_operand = matches!(
            tok.typ,
            TokTyp::Number | TokTyp::Ident | TokTyp::OpenParen
        );
        if starts_operand && !expect_operand {
            // e.g. `2z`, `z(1)` or `(z)(z)`
            return Err(ParseErr {
                typ: ParseErrTyp::ImplicitMul,
                loc: tok.loc,
            });
        }

        match tok.typ {
            TokTyp::Number => {
                let num: Number = match tok.loc.get().parse() {
                    Ok(val) => val,
                    Err(err) => {
                        return Err(ParseErr {
                            typ: ParseErrTyp::ParseNum(err),
                            loc: tok.loc,
                        })
                    }
                };
                out.push(Operand {
                    expr: Expr::Num(num),
                    loc: tok.loc,
                });
                expect_operand = false;
            }

            TokTyp::Ident => match idents.get(&tok.loc.clone().into()) {
                Some(Ident::Var) => {
                    out.push(Operand {
                        expr: Expr::Var,
                        loc: tok.loc,
                    });
                    expect_operand = false;
                }
                Some(Ident::Const(c)) => {
                    out.push(Operand {
                        expr: Expr::Const(*c),
                        loc: tok.loc,
                    });
                    expect_operand = false;
                }
                Some(Ident::Fun(fun)) => {
                    let op = ShuntOp {
                        typ: ShuntOpTyp::Fun(*fun),
                        loc: tok.loc,
                    };
                    pending_call = Some(op.clone());
                    ops.push(op);
                }
                None => {
                    let similar = stdlib::most_similar(idents, tok.loc.get())
                        .map(|(key, ident)| (key.clone(), *ident));
                    return Err(ParseErr {
                        typ: ParseErrTyp::UndefinedIdent { similar },
                        loc: tok.loc,
                    });
                }
            },

            TokTyp::Op(o1) if o1.is_prefix() => {
                // prefix operators have nothing to their left to reduce
                ops.push(ShuntOp {
                    typ: ShuntOpTyp::Operator(o1),
                    loc: tok.loc,
                });
            }

            TokTyp::Op(o1) => {
                if expect_operand {
                    return Err(missing_operand(tok.loc));
                }
                while let Some(o2) = ops.last() {
                    let ShuntOpTyp::Operator(o2_typ) = o2.typ else {
                        break;
                    };
                    if (o2_typ.precedence() > o1.precedence())
                        || ((o1.precedence() == o2_typ.precedence())
                            && (o1.associativity() == Associativity::Left))
                    {
                        let o2 = ops.pop().expect("just peeked");
                        apply(&mut out, o2)?;
                    } else {
                        break;
                    }
                }
                ops.push(ShuntOp {
                    typ: ShuntOpTyp::Operator(o1),
                    loc: tok.loc,
                });
                expect_operand = true;
            }

            TokTyp::OpenParen => {
                ops.push(ShuntOp {
                    typ: ShuntOpTyp::OpenParen,
                    loc: tok.loc,
                });
            }

            TokTyp::CloseParen => {
                if expect_operand {
                    // `()` or a trailing operator like `(z +)`
                    return Err(missing_operand(tok.loc));
                }

                loop {
                    match ops.pop() {
                        Some(ShuntOp {
                            typ: ShuntOpTyp::OpenParen,
                            ..
                        }) => break,
                        Some(op) => apply(&mut out, op)?,
                        None => {
                            return Err(ParseErr {
                                typ: ParseErrTyp::ParenMismatch,
                                loc: tok.loc,
                            })
                        }
                    }
                }

                // handle functions
                if let Some(ShuntOp {
                    typ: ShuntOpTyp::Fun(_),
                    ..
                }) = ops.last()
                {
                    let op = ops.pop().expect("just peeked");
                    apply(&mut out, op)?;
                }
                expect_operand = false;
            }

            TokTyp::XGreater
            | TokTyp::XLess
            | TokTyp::XEqual
            | TokTyp::XPipe
            | TokTyp::XComma
            | TokTyp::XOpenSquareBracket
            | TokTyp::XCloseSquareBracket
            | TokTyp::XOpenCurly
            | TokTyp::XCloseCurly => unreachable!("unsupported token survived until parsing"),
        }
    }

    if let Some(ShuntOp {
        typ: ShuntOpTyp::Fun(fun),
        loc,
    }) = pending_call
    {
        return Err(ParseErr {
            typ: ParseErrTyp::MissingCall(fun),
            loc,
        });
    }

    if out.is_empty() && ops.is_empty() {
        return Err(ParseErr {
            typ: ParseErrTyp::Empty,
            loc: SubStr::all(src),
        });
    }

    if expect_operand {
        return Err(missing_operand(SubStr::end_of(src)));
    }

    while let Some(op) = ops.pop() {
        if let ShuntOpTyp::OpenParen = op.typ {
            return Err(ParseErr {
                typ: ParseErrTyp::ParenMismatch,
                loc: op.loc,
            });
        }
        apply(&mut out, op)?;
    }

    match (out.pop(), out.is_empty()) {
        (Some(root), true) => Ok(root.expr),
        // the operand/operator alternation above rules this out
        (Some(extra), false) => Err(ParseErr {
            typ: ParseErrTyp::ImplicitMul,
            loc: extra.loc,
        }),
        (None, _) => Err(missing_operand(SubStr::end_of(src))),
    }
}

/// Parses a function of `z` against the standard identifiers.
pub fn compile(text: &str) -> Result<Expression, ParseErr> {
    let src = Arc::new(text.to_string());
    let idents = stdlib::standard_idents();
    let root = parse(Lexer::new(&src), &idents)?;
    Ok(Expression::new(src, root))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(text: &str) -> ParseErr {
        compile(text).expect_err(text)
    }

    #[test]
    fn precedence_and_associativity() {
        let e = compile("1 + 2*z**2**3 - z/4").unwrap();
        assert_eq!(e.to_string(), "1 + 2 * z ** 2 ** 3 - z / 4");
        let Expr::Binary(OperatorTyp::Sub, lhs, _) = e.root() else {
            panic!("subtraction should be the root: {e}");
        };
        assert!(matches!(**lhs, Expr::Binary(OperatorTyp::Add, _, _)));
    }

    #[test]
    fn negation_binds_looser_than_power() {
        let e = compile("-z**2").unwrap();
        assert!(matches!(
            e.root(),
            Expr::Unary(OperatorTyp::Neg, arg) if matches!(**arg, Expr::Binary(OperatorTyp::Pow, _, _))
        ));
        let e = compile("2**-z").unwrap();
        assert!(matches!(
            e.root(),
            Expr::Binary(OperatorTyp::Pow, _, rhs) if matches!(**rhs, Expr::Unary(OperatorTyp::Neg, _))
        ));
        let e = compile("-z*2").unwrap();
        assert!(matches!(e.root(), Expr::Binary(OperatorTyp::Mul, _, _)));
    }

    #[test]
    fn function_calls() {
        let e = compile("exp(-2*pi/z)").unwrap();
        assert!(matches!(e.root(), Expr::Call(Builtin::Exp, _)));
        let e = compile("sin(cos(z)) + ln(z)").unwrap();
        assert_eq!(e.to_string(), "sin(cos(z)) + log(z)");
    }

    #[test]
    fn errors_point_at_the_problem() {
        let e = err("(z + 1");
        assert!(matches!(e.typ, ParseErrTyp::ParenMismatch));
        assert_eq!(e.loc.start(), 0);

        let e = err("z + 1)");
        assert!(matches!(e.typ, ParseErrTyp::ParenMismatch));
        assert_eq!(e.loc.start(), 5);

        let e = err("2z");
        assert!(matches!(e.typ, ParseErrTyp::ImplicitMul));
        assert_eq!(e.loc.get(), "z");

        let e = err("z *");
        assert!(matches!(e.typ, ParseErrTyp::MissingOperand));
        assert!(e.loc.is_empty());

        let e = err("sin z");
        assert!(matches!(e.typ, ParseErrTyp::MissingCall(Builtin::Sin)));

        let e = err("sin");
        assert!(matches!(e.typ, ParseErrTyp::MissingCall(Builtin::Sin)));

        let e = err("()");
        assert!(matches!(e.typ, ParseErrTyp::MissingOperand));

        let e = err("   ");
        assert!(matches!(e.typ, ParseErrTyp::Empty));

        let e = err("1..2");
        assert!(matches!(e.typ, ParseErrTyp::ParseNum(_)));

        let e = err("z < 1");
        assert!(matches!(
            e.typ,
            ParseErrTyp::LexErr(LexErrTyp::Unsupported(TokTyp::XLess))
        ));
    }

    #[test]
    fn undefined_identifier_suggests_similar_name() {
        let e = err("expp(z)");
        assert_eq!(e.loc.get(), "expp");
        let ParseErrTyp::UndefinedIdent { similar } = e.typ else {
            panic!("unexpected error: {e}");
        };
        let (key, ident) = similar.expect("exp is close enough");
        assert_eq!(key.get(), "exp");
        assert_eq!(ident, Ident::Fun(Builtin::Exp));
    }

    #[test]
    fn identifiers_are_not_matched_by_prefix() {
        // a name that merely starts with a function name is not that function
        assert!(matches!(
            err("expsomething").typ,
            ParseErrTyp::UndefinedIdent { .. }
        ));
    }

    #[test]
    fn compile_is_deterministic() {
        let a = compile("(z**3 - 1)/(z**2 + 1)").unwrap();
        let b = compile("(z**3 - 1)/(z**2 + 1)").unwrap();
        assert_eq!(a.root(), b.root());
    }
}
