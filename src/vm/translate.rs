//! Hack lowering — expands stack-VM commands into Hack assembly.
//!
//! Stack discipline: SP points one word past the topmost value. `pop` into a
//! dynamic segment parks the target address in R13 while the value comes off
//! the stack; `return` uses R14 for the frame base and R15 for the return
//! address.

use super::{ArithOp, Command, Segment};
use crate::span::Spanned;

/// Translates one compilation unit of VM commands into Hack assembly.
///
/// The unit's basename qualifies static-segment symbols and synthetic
/// labels, so concatenated multi-file outputs stay collision-free.
pub struct Translator {
    filename: String,
    label_id: u32,
}

impl Translator {
    pub fn new(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            label_id: 0,
        }
    }

    /// Lower all commands, echoing each as a `//` comment before its
    /// expansion.
    pub fn translate(&mut self, commands: &[Spanned<Command>]) -> Vec<String> {
        let mut out = Vec::new();
        for cmd in commands {
            out.push(format!("// {}", cmd.node));
            self.lower_command(&cmd.node, &mut out);
        }
        out
    }

    fn lower_command(&mut self, cmd: &Command, out: &mut Vec<String>) {
        match cmd {
            Command::Push { segment, index } => self.lower_push(*segment, *index, out),
            Command::Pop { segment, index } => self.lower_pop(*segment, *index, out),
            Command::Arith(op) => self.lower_arith(*op, out),
            Command::Label(name) => out.push(format!("({})", name)),
            Command::Goto(name) => {
                out.push(format!("@{}", name));
                out.push("0;JMP".to_string());
            }
            Command::IfGoto(name) => {
                out.push("@SP".to_string());
                out.push("AM=M-1".to_string());
                out.push("D=M".to_string());
                out.push(format!("@{}", name));
                out.push("D;JNE".to_string());
            }
            Command::Function { name, n_locals } => self.lower_function(name, *n_locals, out),
            Command::Call { name, n_args } => self.lower_call(name, *n_args, out),
            Command::Return => self.lower_return(out),
        }
    }

    /// The fixed address of a direct segment slot, or the symbol naming it.
    fn direct_address(&self, segment: Segment, index: u16) -> Option<String> {
        match segment {
            Segment::Pointer => Some(format!("{}", 3 + index)),
            Segment::Temp => Some(format!("{}", 5 + index)),
            Segment::Static => Some(format!("{}.{}", self.filename, index)),
            _ => None,
        }
    }

    fn base_symbol(segment: Segment) -> &'static str {
        match segment {
            Segment::Local => "LCL",
            Segment::Argument => "ARG",
            Segment::This => "THIS",
            Segment::That => "THAT",
            _ => unreachable!("segment has no base pointer"),
        }
    }

    fn lower_push(&mut self, segment: Segment, index: u16, out: &mut Vec<String>) {
        if segment == Segment::Constant {
            out.push(format!("@{}", index));
            out.push("D=A".to_string());
            push_d(out);
            return;
        }
        if let Some(addr) = self.direct_address(segment, index) {
            out.push(format!("@{}", addr));
        } else {
            out.push(format!("@{}", Self::base_symbol(segment)));
            out.push("D=M".to_string());
            out.push(format!("@{}", index));
            out.push("A=D+A".to_string());
        }
        out.push("D=M".to_string());
        push_d(out);
    }

    fn lower_pop(&mut self, segment: Segment, index: u16, out: &mut Vec<String>) {
        if let Some(addr) = self.direct_address(segment, index) {
            out.push("@SP".to_string());
            out.push("AM=M-1".to_string());
            out.push("D=M".to_string());
            out.push(format!("@{}", addr));
            out.push("M=D".to_string());
            return;
        }
        // Dynamic segment: compute *base + index into R13 first
        out.push(format!("@{}", Self::base_symbol(segment)));
        out.push("D=M".to_string());
        out.push(format!("@{}", index));
        out.push("D=D+A".to_string());
        out.push("@R13".to_string());
        out.push("M=D".to_string());
        out.push("@SP".to_string());
        out.push("AM=M-1".to_string());
        out.push("D=M".to_string());
        out.push("@R13".to_string());
        out.push("A=M".to_string());
        out.push("M=D".to_string());
    }

    fn lower_arith(&mut self, op: ArithOp, out: &mut Vec<String>) {
        match op {
            ArithOp::Neg | ArithOp::Not => {
                out.push("@SP".to_string());
                out.push("A=M-1".to_string());
                out.push(if op == ArithOp::Neg { "M=-M" } else { "M=!M" }.to_string());
            }
            ArithOp::Add | ArithOp::Sub | ArithOp::And | ArithOp::Or => {
                out.push("@SP".to_string());
                out.push("AM=M-1".to_string());
                out.push("D=M".to_string());
                out.push("A=A-1".to_string());
                let combine = match op {
                    ArithOp::Add => "M=D+M",
                    ArithOp::Sub => "M=M-D",
                    ArithOp::And => "M=D&M",
                    ArithOp::Or => "M=D|M",
                    _ => unreachable!(),
                };
                out.push(combine.to_string());
            }
            ArithOp::Eq | ArithOp::Gt | ArithOp::Lt => self.lower_compare(op, out),
        }
    }

    /// eq/gt/lt: subtract and branch on the sign of D, leaving all-ones for
    /// true or zero for false.
    fn lower_compare(&mut self, op: ArithOp, out: &mut Vec<String>) {
        let jump = match op {
            ArithOp::Eq => "JEQ",
            ArithOp::Gt => "JGT",
            ArithOp::Lt => "JLT",
            _ => unreachable!(),
        };
        let id = self.fresh_label_id();
        let true_label = format!("{}$true.{}", self.filename, id);
        let end_label = format!("{}$end.{}", self.filename, id);

        out.push("@SP".to_string());
        out.push("AM=M-1".to_string());
        out.push("D=M".to_string());
        out.push("A=A-1".to_string());
        out.push("D=M-D".to_string());
        out.push(format!("@{}", true_label));
        out.push(format!("D;{}", jump));
        out.push("@SP".to_string());
        out.push("A=M-1".to_string());
        out.push("M=0".to_string());
        out.push(format!("@{}", end_label));
        out.push("0;JMP".to_string());
        out.push(format!("({})", true_label));
        out.push("@SP".to_string());
        out.push("A=M-1".to_string());
        out.push("M=-1".to_string());
        out.push(format!("({})", end_label));
    }

    fn lower_function(&mut self, name: &str, n_locals: u16, out: &mut Vec<String>) {
        out.push(format!("({})", name));
        for _ in 0..n_locals {
            out.push("@SP".to_string());
            out.push("M=M+1".to_string());
            out.push("A=M-1".to_string());
            out.push("M=0".to_string());
        }
    }

    fn lower_call(&mut self, name: &str, n_args: u16, out: &mut Vec<String>) {
        let label_id = self.fresh_label_id();
        let ret_label = format!("{}$ret.{}.{}", name, self.filename, label_id);

        // Return address, then the caller's LCL/ARG/THIS/THAT
        out.push(format!("@{}", ret_label));
        out.push("D=A".to_string());
        push_d(out);
        for reg in ["LCL", "ARG", "THIS", "THAT"] {
            out.push(format!("@{}", reg));
            out.push("D=M".to_string());
            push_d(out);
        }
        // ARG = SP - 5 - n_args
        out.push(format!("@{}", 5 + n_args));
        out.push("D=A".to_string());
        out.push("@SP".to_string());
        out.push("D=M-D".to_string());
        out.push("@ARG".to_string());
        out.push("M=D".to_string());
        // LCL = SP
        out.push("@SP".to_string());
        out.push("D=M".to_string());
        out.push("@LCL".to_string());
        out.push("M=D".to_string());

        out.push(format!("@{}", name));
        out.push("0;JMP".to_string());
        out.push(format!("({})", ret_label));
    }

    fn lower_return(&mut self, out: &mut Vec<String>) {
        // endFrame = LCL
        out.push("@LCL".to_string());
        out.push("D=M".to_string());
        out.push("@R14".to_string());
        out.push("M=D".to_string());
        // retAddr = *(endFrame - 5), read before the return value lands:
        // on a zero-argument frame ARG[0] is the same slot
        out.push("@5".to_string());
        out.push("D=A".to_string());
        out.push("@R14".to_string());
        out.push("A=M-D".to_string());
        out.push("D=M".to_string());
        out.push("@R15".to_string());
        out.push("M=D".to_string());
        // *ARG = pop()
        out.push("@SP".to_string());
        out.push("AM=M-1".to_string());
        out.push("D=M".to_string());
        out.push("@ARG".to_string());
        out.push("A=M".to_string());
        out.push("M=D".to_string());
        // SP = ARG + 1
        out.push("@ARG".to_string());
        out.push("D=M+1".to_string());
        out.push("@SP".to_string());
        out.push("M=D".to_string());
        // THAT, THIS, ARG, LCL from endFrame-1..-4
        for reg in ["THAT", "THIS", "ARG", "LCL"] {
            out.push("@R14".to_string());
            out.push("AM=M-1".to_string());
            out.push("D=M".to_string());
            out.push(format!("@{}", reg));
            out.push("M=D".to_string());
        }
        // jump to retAddr
        out.push("@R15".to_string());
        out.push("A=M".to_string());
        out.push("0;JMP".to_string());
    }

    fn fresh_label_id(&mut self) -> u32 {
        let id = self.label_id;
        self.label_id += 1;
        id
    }
}

/// `*SP = D; SP += 1`
fn push_d(out: &mut Vec<String>) {
    out.push("@SP".to_string());
    out.push("M=M+1".to_string());
    out.push("A=M-1".to_string());
    out.push("M=D".to_string());
}

/// Bootstrap preamble: optionally set SP, then transfer to Sys.init.
pub fn bootstrap(sp: Option<u16>) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(sp) = sp {
        out.push(format!("@{}", sp));
        out.push("D=A".to_string());
        out.push("@SP".to_string());
        out.push("M=D".to_string());
    }
    out.push("@Sys.init".to_string());
    out.push("0;JMP".to_string());
    out
}
