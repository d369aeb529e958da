use super::{ArithOp, Segment};

/// Append-only emitter for stack-VM commands.
///
/// One line per command, in call order; the writer never reorders.
#[derive(Default)]
pub struct VmWriter {
    lines: Vec<String>,
}

impl VmWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: Segment, index: u16) {
        self.lines.push(format!("push {} {}", segment, index));
    }

    pub fn pop(&mut self, segment: Segment, index: u16) {
        self.lines.push(format!("pop {} {}", segment, index));
    }

    pub fn arithmetic(&mut self, op: ArithOp) {
        self.lines.push(op.as_str().to_string());
    }

    pub fn label(&mut self, name: &str) {
        self.lines.push(format!("label {}", name));
    }

    pub fn goto(&mut self, name: &str) {
        self.lines.push(format!("goto {}", name));
    }

    pub fn if_goto(&mut self, name: &str) {
        self.lines.push(format!("if-goto {}", name));
    }

    pub fn call(&mut self, name: &str, n_args: u16) {
        self.lines.push(format!("call {} {}", name, n_args));
    }

    pub fn function(&mut self, name: &str, n_locals: u16) {
        self.lines.push(format!("function {} {}", name, n_locals));
    }

    pub fn ret(&mut self) {
        self.lines.push("return".to_string());
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// The emitted program as text, one command per line.
    pub fn finish(self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_forms() {
        let mut w = VmWriter::new();
        w.push(Segment::Constant, 7);
        w.pop(Segment::That, 0);
        w.arithmetic(ArithOp::Add);
        w.label("WHILE.0");
        w.goto("WHILE.0");
        w.if_goto("SKIP_WHILE.0");
        w.call("Math.multiply", 2);
        w.function("Main.main", 3);
        w.ret();
        assert_eq!(
            w.into_lines(),
            vec![
                "push constant 7",
                "pop that 0",
                "add",
                "label WHILE.0",
                "goto WHILE.0",
                "if-goto SKIP_WHILE.0",
                "call Math.multiply 2",
                "function Main.main 3",
                "return",
            ]
        );
    }

    #[test]
    fn test_emission_order_preserved() {
        let mut w = VmWriter::new();
        for i in 0..5 {
            w.push(Segment::Constant, i);
        }
        let lines = w.into_lines();
        for (i, line) in lines.iter().enumerate() {
            assert_eq!(line, &format!("push constant {}", i));
        }
    }

    #[test]
    fn test_finish_ends_with_newline() {
        let mut w = VmWriter::new();
        w.ret();
        assert_eq!(w.finish(), "return\n");
    }

    #[test]
    fn test_output_parses_back() {
        let mut w = VmWriter::new();
        w.function("Main.main", 0);
        w.push(Segment::Constant, 1);
        w.push(Segment::Constant, 2);
        w.arithmetic(ArithOp::Add);
        w.ret();
        let text = w.finish();
        let parsed = crate::vm::parse_program(&text).expect("writer output must parse");
        assert_eq!(parsed.len(), 5);
    }
}
