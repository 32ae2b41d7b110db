// SPDX: CC0-1.0

use crate::expr::OperatorTyp;
use core::{fmt, iter::Peekable, str::CharIndices};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubStr {
    // yes, silly, but atomic operations are cheap for this use case
    src: Arc<String>,
    start: usize,
    len: usize,
}

impl SubStr {
    #[inline]
    pub const fn new(src: Arc<String>, start: usize, len: usize) -> Self {
        Self { src, start, len }
    }

    #[inline]
    pub fn all(src: Arc<String>) -> Self {
        let len = src.len();
        Self::new(src, 0, len)
    }

    /// Zero-width span just past the end of the source.
    #[inline]
    pub fn end_of(src: Arc<String>) -> Self {
        let len = src.len();
        Self::new(src, len, 0)
    }

    pub fn src(&self) -> Arc<String> {
        Arc::clone(&self.src)
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self) -> &str {
        &self.src[self.start..self.start + self.len]
    }

    pub fn shift_right(&mut self, by: usize) {
        self.len += by;
    }

    /// Smallest span covering both `self` and `other` (same source assumed).
    pub fn join(&self, other: &Self) -> Self {
        let start = self.start.min(other.start);
        let end = (self.start + self.len).max(other.start + other.len);
        Self::new(self.src(), start, end - start)
    }
}

impl fmt::Display for SubStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokTyp {
    Ident,
    Number,
    Op(OperatorTyp),
    OpenParen,
    CloseParen,

    // unsupported tokens
    XGreater,
    XLess,
    XEqual,
    XPipe,
    XComma,
    XOpenSquareBracket,
    XCloseSquareBracket,
    XOpenCurly,
    XCloseCurly,
}

impl TokTyp {
    pub const fn is_unsupported(&self) -> bool {
        match self {
            Self::Ident | Self::Number | Self::Op(_) | Self::OpenParen | Self::CloseParen => false,

            // unsupported tokens
            Self::XGreater
            | Self::XLess
            | Self::XEqual
            | Self::XPipe
            | Self::XComma
            | Self::XOpenSquareBracket
            | Self::XCloseSquareBracket
            | Self::XOpenCurly
            | Self::XCloseCurly => true,
        }
    }

    /// Whether a token of this type ends an operand, which makes a following
    /// `-` a subtraction rather than a negation.
    pub const fn ends_operand(&self) -> bool {
        matches!(self, Self::Ident | Self::Number | Self::CloseParen)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tok {
    pub typ: TokTyp,
    pub loc: SubStr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LexErrTyp {
    InvalidChar,
    Unsupported(TokTyp),
}

impl fmt::Display for LexErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChar => write!(f, "invalid character"),
            Self::Unsupported(_) => write!(f, "unsupported character"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LexErr {
    pub typ: LexErrTyp,
    pub loc: SubStr,
}

#[derive(Debug)]
pub struct Lexer<'src> {
    src: &'src Arc<String>,
    cur: Peekable<CharIndices<'src>>,
    prev: Option<TokTyp>,
    has_errored: bool, // tells iter to yield None after error
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src Arc<String>) -> Self {
        Self {
            src,
            cur: src.char_indices().peekable(),
            prev: None,
            has_errored: false,
        }
    }

    pub fn src(&self) -> Arc<String> {
        Arc::clone(self.src)
    }

    pub fn trim_whitespace(&mut self) {
        while let Some((_, chr)) = self.cur.peek() {
            if chr.is_whitespace() {
                self.cur.next();
            } else {
                break;
            }
        }
    }

    fn span(&self, start: usize, len: usize) -> SubStr {
        SubStr::new(Arc::clone(self.src), start, len)
    }

    pub fn consume_unambiguous(&mut self) -> Option<Tok> {
        let (idx, chr) = self.cur.peek().copied()?;
        let typ = match chr {
            '+' => TokTyp::Op(OperatorTyp::Add),
            '/' => TokTyp::Op(OperatorTyp::Div),
            '^' => TokTyp::Op(OperatorTyp::Pow),
            '(' => TokTyp::OpenParen,
            ')' => TokTyp::CloseParen,

            '>' => TokTyp::XGreater,
            '<' => TokTyp::XLess,
            '=' => TokTyp::XEqual,
            '|' => TokTyp::XPipe,
            ',' => TokTyp::XComma,
            '[' => TokTyp::XOpenSquareBracket,
            ']' => TokTyp::XCloseSquareBracket,
            '{' => TokTyp::XOpenCurly,
            '}' => TokTyp::XCloseCurly,
            _ => return None,
        };
        self.cur.next(); // consume because we only peeked
        Some(Tok {
            typ,
            loc: self.span(idx, 1),
        })
    }

    /// `*` is multiplication, `**` is exponentiation.
    fn consume_star(&mut self, idx: usize) -> Tok {
        self.cur.next();
        if let Some((_, '*')) = self.cur.peek() {
            self.cur.next();
            Tok {
                typ: TokTyp::Op(OperatorTyp::Pow),
                loc: self.span(idx, 2),
            }
        } else {
            Tok {
                typ: TokTyp::Op(OperatorTyp::Mul),
                loc: self.span(idx, 1),
            }
        }
    }

    pub fn consume_while<P>(&mut self, start: usize, typ: TokTyp, predicate: P) -> Tok
    where
        P: Fn(char) -> bool,
    {
        let mut tok = Tok {
            typ,
            loc: self.span(start, 0),
        };
        while let Some((_, chr)) = self.cur.peek().copied() {
            if predicate(chr) {
                tok.loc.shift_right(chr.len_utf8());
                self.cur.next();
            } else {
                break;
            }
        }
        tok
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Tok, LexErr>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_errored {
            return None;
        }

        loop {
            self.trim_whitespace();

            let (next_idx, next_chr) = self.cur.peek().copied()?;
            let after_operand = self.prev.map(|t| t.ends_operand()).unwrap_or(false);

            let tok = if next_chr == '+' && !after_operand {
                // unary plus is the identity
                self.cur.next();
                continue;
            } else if let Some(tok) = self.consume_unambiguous() {
                tok
            } else if next_chr == '*' {
                self.consume_star(next_idx)
            } else if next_chr == '-' {
                // distinguish subtraction from negation
                self.cur.next();
                let typ = if after_operand {
                    OperatorTyp::Sub
                } else {
                    OperatorTyp::Neg
                };
                Tok {
                    typ: TokTyp::Op(typ),
                    loc: self.span(next_idx, 1),
                }
            } else if next_chr.is_ascii_alphabetic() {
                self.consume_while(next_idx, TokTyp::Ident, |chr| {
                    chr.is_ascii_alphanumeric() || chr == '_'
                })
            } else if next_chr.is_ascii_digit() || next_chr == '.' {
                self.consume_while(next_idx, TokTyp::Number, |chr| {
                    chr.is_ascii_digit() || chr == '.'
                })
            } else {
                self.has_errored = true;
                return Some(Err(LexErr {
                    typ: LexErrTyp::InvalidChar,
                    loc: self.span(next_idx, next_chr.len_utf8()),
                }));
            };

            if tok.typ.is_unsupported() {
                self.has_errored = true;
                return Some(Err(LexErr {
                    typ: LexErrTyp::Unsupported(tok.typ),
                    loc: tok.loc,
                }));
            }

            self.prev = Some(tok.typ);
            return Some(Ok(tok));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(src: &str) -> Vec<TokTyp> {
        let src = Arc::new(src.to_string());
        Lexer::new(&src).map(|tok| tok.unwrap().typ).collect()
    }

    #[test]
    fn minus_depends_on_previous_token() {
        assert_eq!(
            types("z-1"),
            [
                TokTyp::Ident,
                TokTyp::Op(OperatorTyp::Sub),
                TokTyp::Number
            ]
        );
        assert_eq!(
            types("-z*-1"),
            [
                TokTyp::Op(OperatorTyp::Neg),
                TokTyp::Ident,
                TokTyp::Op(OperatorTyp::Mul),
                TokTyp::Op(OperatorTyp::Neg),
                TokTyp::Number
            ]
        );
        assert_eq!(
            types("(z) - 1"),
            [
                TokTyp::OpenParen,
                TokTyp::Ident,
                TokTyp::CloseParen,
                TokTyp::Op(OperatorTyp::Sub),
                TokTyp::Number
            ]
        );
    }

    #[test]
    fn double_star_and_caret_are_powers() {
        assert_eq!(
            types("z**2^3*z"),
            [
                TokTyp::Ident,
                TokTyp::Op(OperatorTyp::Pow),
                TokTyp::Number,
                TokTyp::Op(OperatorTyp::Pow),
                TokTyp::Number,
                TokTyp::Op(OperatorTyp::Mul),
                TokTyp::Ident
            ]
        );
    }

    #[test]
    fn unary_plus_is_dropped() {
        assert_eq!(
            types("+z + +1"),
            [TokTyp::Ident, TokTyp::Op(OperatorTyp::Add), TokTyp::Number]
        );
    }

    #[test]
    fn unicode_error_span_is_a_whole_char() {
        let src = Arc::new(String::from("z + é"));
        let err = Lexer::new(&src)
            .find_map(|tok| tok.err())
            .expect("lexing should fail");
        assert_eq!(err.typ, LexErrTyp::InvalidChar);
        assert_eq!(err.loc.get(), "é");
    }

    #[test]
    fn comparison_is_unsupported() {
        let src = Arc::new(String::from("z = 1"));
        let err = Lexer::new(&src)
            .find_map(|tok| tok.err())
            .expect("lexing should fail");
        assert_eq!(err.typ, LexErrTyp::Unsupported(TokTyp::XEqual));
    }
}
