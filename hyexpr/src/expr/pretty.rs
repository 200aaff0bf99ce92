//! RcDoc-based pretty-printer with termcolor annotations for [`QueryExpr`].
//!
//! Role
//! - Convert a [`QueryExpr`] into an annotated document suitable for width-aware rendering.
//! - Provide colored output for terminals (TTY-aware) and plain strings for logs/tests.
//!
//! Output syntax: `F(name)` for field references, SQL-ish literals (`'text'`, `NULL`),
//! infix operators with the minimum parentheses needed, and `NAME(arg, ...)` for calls.

use std::io::{self, Write};

use pretty::{FmtWrite, RcDoc, RenderAnnotated};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::expr::{Operator, QueryExpr};
use crate::value::Value;

/// Styles used to annotate parts of the pretty-printed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Punct, // commas
    /// Parentheses are colored by nesting depth so matching pairs share a color.
    Paren(u8),
    Function, // F, LOWER, COALESCE
    Operator, // +, -, ||
    Ident,    // field names
    Literal,  // constants
}

impl Style {
    fn to_color_spec(self) -> ColorSpec {
        let mut s = ColorSpec::new();
        match self {
            Style::Punct => {
                s.set_dimmed(true);
            }
            Style::Paren(depth) => {
                let fg = match depth % 6 {
                    0 => Color::Blue,
                    1 => Color::Green,
                    2 => Color::White,
                    3 => Color::Yellow,
                    4 => Color::Red,
                    5 => Color::Magenta,
                    _ => unreachable!(),
                };
                s.set_fg(Some(fg)).set_dimmed(true);
            }
            Style::Function => {
                s.set_fg(Some(Color::Cyan)).set_bold(true);
            }
            Style::Operator => {
                s.set_fg(Some(Color::Yellow)).set_bold(true);
            }
            Style::Ident => {
                s.set_fg(Some(Color::Green)).set_bold(true);
            }
            Style::Literal => {
                s.set_fg(Some(Color::Magenta));
            }
        }
        s
    }
}

#[inline]
fn lparen(depth: u8) -> RcDoc<'static, Style> {
    RcDoc::as_string("(").annotate(Style::Paren(depth))
}

#[inline]
fn rparen(depth: u8) -> RcDoc<'static, Style> {
    RcDoc::as_string(")").annotate(Style::Paren(depth))
}

fn op(o: Operator) -> RcDoc<'static, Style> {
    RcDoc::as_string(o.symbol()).annotate(Style::Operator)
}

fn literal(v: &Value) -> RcDoc<'static, Style> {
    RcDoc::as_string(v).annotate(Style::Literal)
}

const ATOM_PRECEDENCE: u8 = u8::MAX;
const NEGATE_PRECEDENCE: u8 = 4;

fn precedence(e: &QueryExpr) -> u8 {
    match e {
        QueryExpr::Combined { op, .. } => op.precedence(),
        QueryExpr::Negate(_) => NEGATE_PRECEDENCE,
        QueryExpr::Field(_) | QueryExpr::Literal(_) | QueryExpr::Func { .. } => ATOM_PRECEDENCE,
    }
}

/// Whether the operand of a binary node needs parentheses.
fn requires_parens(child: &QueryExpr, parent: Operator, right_hand: bool) -> bool {
    let (child_prec, parent_prec) = (precedence(child), parent.precedence());
    if child_prec != parent_prec {
        return child_prec < parent_prec;
    }
    match child {
        QueryExpr::Combined { op, .. } => right_hand && !(parent.is_associative() && *op == parent),
        _ => false,
    }
}

fn parenthesized(e: &QueryExpr, wrap: bool, depth: u8) -> RcDoc<'static, Style> {
    if wrap {
        lparen(depth)
            .append(to_doc_with_depth(e, depth.wrapping_add(1)))
            .append(rparen(depth))
    } else {
        to_doc_with_depth(e, depth)
    }
}

fn to_doc_with_depth(e: &QueryExpr, depth: u8) -> RcDoc<'static, Style> {
    match e {
        QueryExpr::Field(name) => RcDoc::as_string("F")
            .annotate(Style::Function)
            .append(lparen(depth))
            .append(RcDoc::as_string(name).annotate(Style::Ident))
            .append(rparen(depth)),
        QueryExpr::Literal(v) => literal(v),
        QueryExpr::Combined { op: o, lhs, rhs } => {
            parenthesized(lhs, requires_parens(lhs, *o, false), depth)
                .append(RcDoc::line())
                .append(op(*o))
                .append(RcDoc::space())
                .append(parenthesized(rhs, requires_parens(rhs, *o, true), depth))
                .nest(2)
                .group()
        }
        QueryExpr::Negate(inner) => RcDoc::as_string("-")
            .annotate(Style::Operator)
            .append(parenthesized(
                inner,
                precedence(inner) < NEGATE_PRECEDENCE,
                depth,
            )),
        QueryExpr::Func { name, args } => {
            let args = args
                .iter()
                .map(|a| to_doc_with_depth(a, depth.wrapping_add(1)));
            RcDoc::as_string(name)
                .annotate(Style::Function)
                .append(lparen(depth))
                .append(
                    RcDoc::line_()
                        .append(RcDoc::intersperse(
                            args,
                            RcDoc::as_string(",")
                                .annotate(Style::Punct)
                                .append(RcDoc::line()),
                        ))
                        .nest(2),
                )
                .append(RcDoc::line_())
                .append(rparen(depth))
                .group()
        }
    }
}

// A writer that maps Style annotations to termcolor ColorSpec on a WriteColor sink.
struct ColorWriter<'w, W: WriteColor + Write> {
    out: &'w mut W,
}

impl<'a, 'w, W: WriteColor + Write> RenderAnnotated<'a, Style> for ColorWriter<'w, W> {
    fn push_annotation(&mut self, ann: &'a Style) -> io::Result<()> {
        self.out.set_color(&ann.to_color_spec())
    }

    fn pop_annotation(&mut self) -> io::Result<()> {
        self.out.reset()
    }
}

impl<'w, W: WriteColor + Write> pretty::Render for ColorWriter<'w, W> {
    type Error = io::Error;

    fn write_str(&mut self, s: &str) -> io::Result<usize> {
        self.out.write_all(s.as_bytes())?;
        Ok(s.len())
    }

    fn write_str_all(&mut self, s: &str) -> io::Result<()> {
        self.out.write_all(s.as_bytes())
    }

    fn fail_doc(&self) -> Self::Error {
        io::Error::other("render failed")
    }
}

fn render_to<W: WriteColor + Write>(
    doc: &RcDoc<'_, Style>,
    width: usize,
    out: &mut W,
) -> io::Result<()> {
    let mut cw = ColorWriter { out };
    doc.render_raw(width, &mut cw)
}

/// Width of the terminal, or 80 if it cannot be determined.
fn terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Pretty-printing conveniences for [`QueryExpr`].
pub trait PrettyExpr {
    /// Build an RcDoc representation of this expression with style annotations.
    fn pretty_doc(&self) -> RcDoc<'static, Style>;

    /// Render this expression with colors to any termcolor writer at the given width.
    fn pretty_render_to<W: WriteColor + Write>(&self, width: usize, out: &mut W) -> io::Result<()>;

    /// Print this expression to stdout with colors (TTY-aware), at the terminal width.
    fn pretty_print(&self) -> io::Result<()>;

    /// Format this expression into a plain string (no colors) at the given width.
    fn pretty_string_width(&self, width: usize) -> String;

    /// Format this expression into a plain string (no colors).
    fn pretty_string(&self) -> String {
        self.pretty_string_width(80)
    }
}

impl PrettyExpr for QueryExpr {
    #[inline]
    fn pretty_doc(&self) -> RcDoc<'static, Style> {
        to_doc_with_depth(self, 0)
    }

    fn pretty_render_to<W: WriteColor + Write>(&self, width: usize, out: &mut W) -> io::Result<()> {
        render_to(&self.pretty_doc(), width, out)
    }

    fn pretty_print(&self) -> io::Result<()> {
        let stdout = StandardStream::stdout(ColorChoice::Auto);
        let mut stdout = stdout.lock();
        self.pretty_render_to(terminal_width(), &mut stdout)?;
        writeln!(stdout)
    }

    fn pretty_string_width(&self, width: usize) -> String {
        let mut buf = String::new();
        let _ = self.pretty_doc().render_fmt(width, &mut buf);
        buf
    }
}

impl std::fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut w = FmtWrite::new(f);
        self.pretty_doc().render_raw(80, &mut w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{F, func, lit};

    #[test]
    fn minimal_parentheses() {
        assert_eq!((F("a") + 1).to_string(), "F(a) + 1");
        assert_eq!(((F("a") + 1) * 2).to_string(), "(F(a) + 1) * 2");
        assert_eq!((F("a") * 2 + 1).to_string(), "F(a) * 2 + 1");
        assert_eq!((F("a") - (F("b") - 1)).to_string(), "F(a) - (F(b) - 1)");
        assert_eq!((F("a") + (F("b") + 1)).to_string(), "F(a) + F(b) + 1");
        assert_eq!((-(F("a") + 1)).to_string(), "-(F(a) + 1)");
        assert_eq!((-F("a")).to_string(), "-F(a)");
    }

    #[test]
    fn functions_and_literals() {
        let e = func("coalesce", [F("nick"), lit("anon")]).concat(lit(Value::Null));
        assert_eq!(e.to_string(), "COALESCE(F(nick), 'anon') || NULL");
    }

    #[test]
    fn narrow_width_breaks_lines() {
        let e = F("a_rather_long_field_name") + F("another_rather_long_field_name");
        let narrow = e.pretty_string_width(20);
        assert!(narrow.contains('\n'), "expected a line break in {narrow:?}");
        assert_eq!(e.pretty_string(), e.to_string());
    }

    #[test]
    fn colored_render_contains_text() {
        let mut buf = termcolor::Buffer::no_color();
        (F("a") % 3).pretty_render_to(80, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf.into_inner()).unwrap(), "F(a) % 3");
    }
}
