//! Stack-VM command model.
//!
//! One command per source line. `parse_program` turns VM text into
//! `Spanned<Command>` values; `translate::Translator` lowers them to Hack
//! assembly and `writer::VmWriter` emits them from the Jack compiler.

pub mod translate;
pub mod writer;

use std::fmt;

use crate::diagnostic::Diagnostic;
use crate::span::{Span, Spanned};

/// The eight addressable VM segments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    pub fn from_str(s: &str) -> Option<Segment> {
        match s {
            "constant" => Some(Segment::Constant),
            "argument" => Some(Segment::Argument),
            "local" => Some(Segment::Local),
            "static" => Some(Segment::Static),
            "this" => Some(Segment::This),
            "that" => Some(Segment::That),
            "pointer" => Some(Segment::Pointer),
            "temp" => Some(Segment::Temp),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The nine arithmetic-logical VM commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl ArithOp {
    pub fn from_str(s: &str) -> Option<ArithOp> {
        match s {
            "add" => Some(ArithOp::Add),
            "sub" => Some(ArithOp::Sub),
            "neg" => Some(ArithOp::Neg),
            "eq" => Some(ArithOp::Eq),
            "gt" => Some(ArithOp::Gt),
            "lt" => Some(ArithOp::Lt),
            "and" => Some(ArithOp::And),
            "or" => Some(ArithOp::Or),
            "not" => Some(ArithOp::Not),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Neg => "neg",
            ArithOp::Eq => "eq",
            ArithOp::Gt => "gt",
            ArithOp::Lt => "lt",
            ArithOp::And => "and",
            ArithOp::Or => "or",
            ArithOp::Not => "not",
        }
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single stack-VM command.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Push { segment: Segment, index: u16 },
    Pop { segment: Segment, index: u16 },
    Arith(ArithOp),
    Label(String),
    Goto(String),
    IfGoto(String),
    Function { name: String, n_locals: u16 },
    Call { name: String, n_args: u16 },
    Return,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Push { segment, index } => write!(f, "push {} {}", segment, index),
            Command::Pop { segment, index } => write!(f, "pop {} {}", segment, index),
            Command::Arith(op) => write!(f, "{}", op),
            Command::Label(name) => write!(f, "label {}", name),
            Command::Goto(name) => write!(f, "goto {}", name),
            Command::IfGoto(name) => write!(f, "if-goto {}", name),
            Command::Function { name, n_locals } => write!(f, "function {} {}", name, n_locals),
            Command::Call { name, n_args } => write!(f, "call {} {}", name, n_args),
            Command::Return => write!(f, "return"),
        }
    }
}

/// Parse VM source text into commands.
///
/// `//` line comments and blank lines are skipped. Unknown commands and
/// segments are fatal; all diagnostics found are returned together.
pub fn parse_program(source: &str) -> Result<Vec<Spanned<Command>>, Vec<Diagnostic>> {
    let mut commands = Vec::new();
    let mut diagnostics = Vec::new();
    let mut offset = 0usize;

    for raw_line in source.split('\n') {
        let line_start = offset;
        offset += raw_line.len() + 1;

        let code = raw_line.split("//").next().unwrap_or("").trim();
        if code.is_empty() {
            continue;
        }
        // Span of the code part of the line (trimmed)
        let code_off = raw_line.find(code).unwrap_or(0);
        let span = Span::new(
            (line_start + code_off) as u32,
            (line_start + code_off + code.len()) as u32,
        );

        match parse_command(code, span) {
            Ok(cmd) => commands.push(Spanned::new(cmd, span)),
            Err(diag) => diagnostics.push(diag),
        }
    }

    if diagnostics.is_empty() {
        Ok(commands)
    } else {
        Err(diagnostics)
    }
}

fn parse_command(code: &str, span: Span) -> Result<Command, Diagnostic> {
    let mut words = code.split_whitespace();
    let head = words.next().unwrap_or("");
    let cmd = match head {
        "push" | "pop" => {
            let segment = parse_segment(words.next(), span)?;
            let index = parse_index(words.next(), span)?;
            if head == "push" {
                Command::Push { segment, index }
            } else {
                if segment == Segment::Constant {
                    return Err(Diagnostic::error(
                        "cannot pop to the constant segment".to_string(),
                        span,
                    )
                    .with_help("constant is a virtual segment; it has no storage".to_string()));
                }
                Command::Pop { segment, index }
            }
        }
        "label" => Command::Label(parse_name(words.next(), span)?),
        "goto" => Command::Goto(parse_name(words.next(), span)?),
        "if-goto" => Command::IfGoto(parse_name(words.next(), span)?),
        "function" => Command::Function {
            name: parse_name(words.next(), span)?,
            n_locals: parse_index(words.next(), span)?,
        },
        "call" => Command::Call {
            name: parse_name(words.next(), span)?,
            n_args: parse_index(words.next(), span)?,
        },
        "return" => Command::Return,
        other => match ArithOp::from_str(other) {
            Some(op) => Command::Arith(op),
            None => {
                return Err(Diagnostic::error(
                    format!("unknown VM command '{}'", other),
                    span,
                )
                .with_help(
                    "expected push, pop, label, goto, if-goto, function, call, return, \
                     or an arithmetic command"
                        .to_string(),
                ));
            }
        },
    };

    if let Some(extra) = words.next() {
        return Err(Diagnostic::error(
            format!("trailing input '{}' after VM command", extra),
            span,
        ));
    }
    Ok(cmd)
}

fn parse_segment(word: Option<&str>, span: Span) -> Result<Segment, Diagnostic> {
    let word = word.ok_or_else(|| Diagnostic::error("missing segment name".to_string(), span))?;
    Segment::from_str(word).ok_or_else(|| {
        Diagnostic::error(format!("unknown segment '{}'", word), span).with_help(
            "valid segments are constant, argument, local, static, this, that, pointer, temp"
                .to_string(),
        )
    })
}

fn parse_index(word: Option<&str>, span: Span) -> Result<u16, Diagnostic> {
    let word = word.ok_or_else(|| Diagnostic::error("missing index".to_string(), span))?;
    word.parse::<u16>().map_err(|_| {
        Diagnostic::error(format!("invalid index '{}'", word), span)
            .with_help("indices are non-negative decimal integers".to_string())
    })
}

fn parse_name(word: Option<&str>, span: Span) -> Result<String, Diagnostic> {
    word.map(str::to_string)
        .ok_or_else(|| Diagnostic::error("missing name".to_string(), span))
}
