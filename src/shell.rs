// SPDX: CC0-1.0

use crate::{
    eval::Program,
    lex::{LexErrTyp, SubStr, TokTyp},
    parse::{ParseErr, ParseErrTyp},
    stdlib, Portrait, PRESETS,
};
use anyhow::Context;
use core::fmt;
use std::{
    io::{self, stdin, BufRead, Write},
    sync::Arc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    SetExpr,
    PrintProg,
    Info,
    Plot,
    SetWin,
    Options,
    Presets,
    Animate,
}

impl Command {
    pub const fn exhaustive() -> &'static [Command] {
        &[
            Self::Help,
            Self::Quit,
            Self::SetExpr,
            Self::Presets,
            Self::Info,
            Self::Plot,
            Self::Animate,
            Self::SetWin,
            Self::Options,
            Self::PrintProg,
        ]
    }

    pub const fn help(&self) -> &'static str {
        match self {
            Self::Help => "display help for each command",
            Self::Quit => "quit the shell",
            Self::SetExpr => "set the function of z to visualize",
            Self::PrintProg => "print program compiled from the expression (for debugging)",
            Self::Info => "show type, zeros and poles of the function",
            Self::Plot => "write phase portrait, modulus and (if enabled) 3d surface files",
            Self::SetWin => "set window center, half extent and resolution",
            Self::Options => "set color scheme, contours, 3d surface and rotation",
            Self::Presets => "pick a function from the gallery",
            Self::Animate => "write frames of the portrait turning through a full rotation",
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Quit => "quit",
            Self::SetExpr => "set",
            Self::PrintProg => "prog",
            Self::Info => "info",
            Self::Plot => "plot",
            Self::SetWin => "window",
            Self::Options => "options",
            Self::Presets => "presets",
            Self::Animate => "animate",
        }
    }
}

impl core::str::FromStr for Command {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s: &str = s;
        for c in Self::exhaustive() {
            if s == c.name() {
                return Ok(*c);
            }
        }
        Err(())
    }
}

pub fn input<W: Write>(out: W, prompt: impl fmt::Display) -> anyhow::Result<String> {
    fn inner<W: Write>(mut out: W, prompt: impl fmt::Display) -> io::Result<String> {
        write!(out, "{prompt}")?;
        out.flush()?;
        let mut stdin = stdin().lock();
        let mut s = String::new();
        stdin.read_line(&mut s)?;
        Ok(s.trim().to_string())
    }

    let s = inner(out, prompt).context("read from standard input failed")?;
    Ok(s)
}

pub fn read_fromstr<W: Write, T: core::str::FromStr>(
    mut out: W,
    prompt: impl fmt::Display,
    ignore_empty: bool,
) -> anyhow::Result<Result<Option<T>, <T as core::str::FromStr>::Err>>
where
    <T as core::str::FromStr>::Err: fmt::Display,
{
    let input = Arc::new(input(&mut out, prompt)?);
    if ignore_empty && input.is_empty() {
        return Ok(Ok(None));
    }
    match input.parse::<T>() {
        Ok(new) => Ok(Ok(Some(new))),
        Err(err) => {
            writeln!(out)?;
            underline(&mut out, &SubStr::all(input))?;
            writeln!(out, "parse error: {err}")?;
            Ok(Err(err))
        }
    }
}

/// Prints the source of `span` with carets under the span. Columns count
/// characters, not bytes.
pub fn underline<W: Write>(mut out: W, span: &SubStr) -> io::Result<()> {
    let src = span.src();
    let before = src[..span.start()].chars().count();
    writeln!(out, "{src}")?;
    writeln!(
        out,
        "{}{}",
        " ".repeat(before),
        // a zero-width span points just past the end
        "^".repeat(span.get().chars().count().max(1))
    )?;
    Ok(())
}

/// Underlines the error location and adds a hint for the kind of mistake.
pub fn explain_parse_err<W: Write>(mut out: W, err: &ParseErr) -> io::Result<()> {
    writeln!(out)?;
    underline(&mut out, &err.loc)?;
    writeln!(out, "parse error: {}", err.typ)?;
    match &err.typ {
        ParseErrTyp::LexErr(lex_err) => match lex_err {
            LexErrTyp::InvalidChar => writeln!(
                out,
                "note: available tokens are numbers, alphabetic identifiers, and symbols + - * / ^ ** ( )"
            )?,
            LexErrTyp::Unsupported(typ) => match typ {
                TokTyp::Ident
                | TokTyp::Number
                | TokTyp::Op(_)
                | TokTyp::OpenParen
                | TokTyp::CloseParen => {}

                TokTyp::XGreater | TokTyp::XLess => {
                    writeln!(out, "note: expected an expression but found an inequality")?;
                }
                TokTyp::XEqual => {
                    writeln!(out, "note: expected an expression but found an equation")?;
                }
                TokTyp::XPipe => writeln!(
                    out,
                    "note: use the 'abs' function to compute absolute value"
                )?,
                TokTyp::XComma => {
                    writeln!(out, "note: every function takes a single argument")?;
                }
                TokTyp::XOpenSquareBracket
                | TokTyp::XCloseSquareBracket
                | TokTyp::XOpenCurly
                | TokTyp::XCloseCurly => {
                    writeln!(out, "note: only parentheses can be used for grouping")?;
                }
            },
        },

        ParseErrTyp::ParseNum(_) => writeln!(out, "note: parsing as floating point number")?,

        ParseErrTyp::ImplicitMul => writeln!(
            out,
            "note: implicit multiplication is not supported, so for example '2z' would be '2*z'"
        )?,

        ParseErrTyp::MissingCall(fun) => {
            writeln!(out, "note: call it with an argument, as in '{fun}({})'", stdlib::Z)?;
        }

        ParseErrTyp::UndefinedIdent { similar } => match similar {
            Some((key, ident)) => writeln!(
                out,
                "note: {kind} '{key}' has a similar name",
                kind = ident.kind(),
                key = key.get()
            )?,
            None => writeln!(out, "note: the only variable is '{}'", stdlib::Z)?,
        },

        ParseErrTyp::ParenMismatch | ParseErrTyp::Empty | ParseErrTyp::MissingOperand => {}
    }
    Ok(())
}

pub fn dump_program<W: Write>(
    mut out: W,
    prog: &Program,
    title: core::fmt::Arguments,
) -> io::Result<()> {
    writeln!(out, "{title}: ")?;
    if prog.ops().len() == 0 {
        writeln!(out, "  (empty)")?;
    }
    for op in prog.ops() {
        writeln!(out, "  {op}")?;
    }
    Ok(())
}

pub fn describe<W: Write>(mut out: W, portrait: &Portrait) -> io::Result<()> {
    writeln!(out, "f(z) = {}", portrait.expression)?;
    writeln!(out, "type: {}", portrait.classification)?;
    writeln!(out, "win = {:#}", portrait.window)?;
    for (name, features) in [
        ("zeros", &portrait.features.zeros),
        ("poles", &portrait.features.poles),
    ] {
        if features.is_empty() {
            writeln!(out, "{name}: none found")?;
            continue;
        }
        writeln!(out, "{name}:")?;
        for f in features {
            writeln!(out, "  {f}")?;
        }
    }
    let hidden = portrait.features.iter().count() - portrait.image.markers().len();
    if hidden > 0 {
        writeln!(out, "note: {hidden} outside the window")?;
    }
    Ok(())
}

pub fn list_presets<W: Write>(mut out: W) -> io::Result<()> {
    for (i, p) in PRESETS.iter().enumerate() {
        writeln!(out, "{i:>3}  {:<28}{}", p.label, p.text)?;
    }
    Ok(())
}

pub fn portrait_undefined<W: Write>(mut out: W) -> io::Result<()> {
    writeln!(out, "error: nothing has been plotted yet")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::compile;

    fn explained(text: &str) -> String {
        let err = compile(text).unwrap_err();
        let mut out = Vec::new();
        explain_parse_err(&mut out, &err).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn commands_parse_by_name() {
        for c in Command::exhaustive() {
            assert_eq!(c.name().parse::<Command>(), Ok(*c));
        }
        assert_eq!("plt".parse::<Command>(), Err(()));
    }

    #[test]
    fn underline_counts_chars() {
        let src = Arc::new(String::from("π + é"));
        let mut out = Vec::new();
        underline(&mut out, &SubStr::new(Arc::clone(&src), "π + ".len(), "é".len())).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "π + é\n    ^\n");
    }

    #[test]
    fn end_of_input_gets_a_caret() {
        let text = explained("z +");
        assert!(text.starts_with("\nz +\n   ^\n"), "{text:?}");
        assert!(text.contains("missing operand"));
    }

    #[test]
    fn hints_match_the_mistake() {
        assert!(explained("2z").contains("'2*z'"));
        assert!(explained("|z|").contains("'abs'"));
        assert!(explained("sin z").contains("'sin(z)'"));
        assert!(explained("ep(z)").contains("function 'exp' has a similar name"));
        assert!(explained("z = 1").contains("equation"));
    }
}
