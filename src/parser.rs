use crate::diagnostic::Diagnostic;
use crate::span::{Span, Spanned};
use crate::symbols::{StorageClass, SymbolTable};
use crate::token::{Keyword, Token};
use crate::vm::writer::VmWriter;
use crate::vm::{ArithOp, Segment};

type Parse<T> = Result<T, Diagnostic>;

/// One compiled Jack class.
pub struct ClassOutput {
    pub class_name: String,
    pub code: Vec<String>,
    pub warnings: Vec<Diagnostic>,
}

/// Recursive-descent Jack compiler with one-token lookahead.
///
/// Productions emit VM commands as they are recognized; no syntax tree is
/// built. The first syntax error aborts the compilation.
pub struct Parser {
    tokens: Vec<Spanned<Token>>,
    pos: usize,
    writer: VmWriter,
    symbols: SymbolTable,
    class_name: String,
    label_id: u32,
    warnings: Vec<Diagnostic>,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned<Token>>) -> Self {
        Self {
            tokens,
            pos: 0,
            writer: VmWriter::new(),
            symbols: SymbolTable::new(),
            class_name: String::new(),
            label_id: 0,
            warnings: Vec::new(),
        }
    }

    /// `class <ClassName> { classVarDec* subroutineDec* }`
    pub fn compile_class(mut self) -> Result<ClassOutput, Diagnostic> {
        self.expect_keyword(Keyword::Class)?;
        self.class_name = self.expect_ident()?.node;
        self.expect_symbol('{')?;

        while self.at_keyword(Keyword::Static) || self.at_keyword(Keyword::Field) {
            self.compile_class_var_dec()?;
        }
        while self.at_keyword(Keyword::Constructor)
            || self.at_keyword(Keyword::Function)
            || self.at_keyword(Keyword::Method)
        {
            self.compile_subroutine()?;
        }
        self.expect_symbol('}')?;

        if *self.peek() != Token::Eof {
            return Err(self.expected("end of file"));
        }

        Ok(ClassOutput {
            class_name: self.class_name,
            code: self.writer.into_lines(),
            warnings: self.warnings,
        })
    }

    /// `(static|field) type name (, name)* ;`
    fn compile_class_var_dec(&mut self) -> Parse<()> {
        let kind = if self.eat_keyword(Keyword::Static) {
            StorageClass::Static
        } else {
            self.expect_keyword(Keyword::Field)?;
            StorageClass::Field
        };
        let ty = self.parse_type()?;
        self.define_var(kind, &ty)?;
        while self.eat_symbol(',') {
            self.define_var(kind, &ty)?;
        }
        self.expect_symbol(';')?;
        Ok(())
    }

    /// `(constructor|function|method) (void|type) name ( params ) body`
    fn compile_subroutine(&mut self) -> Parse<()> {
        self.symbols.start_subroutine();
        let kind = match self.advance_keyword() {
            Some(kw) => kw,
            None => return Err(self.expected("subroutine declaration")),
        };

        // A method receives the current object as argument 0
        if kind == Keyword::Method {
            let class_name = self.class_name.clone();
            self.symbols
                .define("this", &class_name, StorageClass::Argument);
        }

        if !self.eat_keyword(Keyword::Void) {
            self.parse_type()?;
        }
        let name = self.expect_ident()?.node;

        self.expect_symbol('(')?;
        self.compile_parameter_list()?;
        self.expect_symbol(')')?;
        self.compile_subroutine_body(kind, &name)?;
        Ok(())
    }

    /// `( (type name (, type name)*)? )` — the caller consumes the parens.
    fn compile_parameter_list(&mut self) -> Parse<()> {
        if self.at_symbol(')') {
            return Ok(());
        }
        let ty = self.parse_type()?;
        self.define_var(StorageClass::Argument, &ty)?;
        while self.eat_symbol(',') {
            let ty = self.parse_type()?;
            self.define_var(StorageClass::Argument, &ty)?;
        }
        Ok(())
    }

    /// `{ varDec* statements }` with the function header and entry code.
    fn compile_subroutine_body(&mut self, kind: Keyword, name: &str) -> Parse<()> {
        self.expect_symbol('{')?;
        while self.at_keyword(Keyword::Var) {
            self.compile_var_dec()?;
        }

        let full_name = format!("{}.{}", self.class_name, name);
        let n_locals = self.symbols.var_count(StorageClass::Local);
        self.writer.function(&full_name, n_locals);

        match kind {
            Keyword::Method => {
                // this = argument 0
                self.writer.push(Segment::Argument, 0);
                self.writer.pop(Segment::Pointer, 0);
            }
            Keyword::Constructor => {
                // this = Memory.alloc(field count)
                let n_fields = self.symbols.var_count(StorageClass::Field);
                self.writer.push(Segment::Constant, n_fields);
                self.writer.call("Memory.alloc", 1);
                self.writer.pop(Segment::Pointer, 0);
            }
            _ => {}
        }

        self.compile_statements()?;
        self.expect_symbol('}')?;
        Ok(())
    }

    /// `var type name (, name)* ;`
    fn compile_var_dec(&mut self) -> Parse<()> {
        self.expect_keyword(Keyword::Var)?;
        let ty = self.parse_type()?;
        self.define_var(StorageClass::Local, &ty)?;
        while self.eat_symbol(',') {
            self.define_var(StorageClass::Local, &ty)?;
        }
        self.expect_symbol(';')?;
        Ok(())
    }

    fn compile_statements(&mut self) -> Parse<()> {
        loop {
            if self.at_keyword(Keyword::Let) {
                self.compile_let()?;
            } else if self.at_keyword(Keyword::If) {
                self.compile_if()?;
            } else if self.at_keyword(Keyword::While) {
                self.compile_while()?;
            } else if self.at_keyword(Keyword::Do) {
                self.compile_do()?;
            } else if self.at_keyword(Keyword::Return) {
                self.compile_return()?;
            } else {
                return Ok(());
            }
        }
    }

    /// `let name ([expr])? = expr ;`
    fn compile_let(&mut self) -> Parse<()> {
        self.expect_keyword(Keyword::Let)?;
        let name = self.expect_ident()?;
        let (segment, index) = self.resolve_variable(&name)?;

        let is_array = self.at_symbol('[');
        if is_array {
            // Target address = base + index expression
            self.writer.push(segment, index);
            self.expect_symbol('[')?;
            self.compile_expression()?;
            self.expect_symbol(']')?;
            self.writer.arithmetic(ArithOp::Add);
        }

        self.expect_symbol('=')?;
        self.compile_expression()?;

        if is_array {
            // Park the value: the index and the value may both have gone
            // through THAT
            self.writer.pop(Segment::Temp, 0);
            self.writer.pop(Segment::Pointer, 1);
            self.writer.push(Segment::Temp, 0);
            self.writer.pop(Segment::That, 0);
        } else {
            self.writer.pop(segment, index);
        }
        self.expect_symbol(';')?;
        Ok(())
    }

    /// `if (expr) { statements } (else { statements })?`
    fn compile_if(&mut self) -> Parse<()> {
        let id = self.fresh_label_id();
        let skip_if = format!("SKIP_IF.{}", id);
        let skip_else = format!("SKIP_ELSE.{}", id);

        self.expect_keyword(Keyword::If)?;
        self.expect_symbol('(')?;
        self.compile_expression()?;
        self.expect_symbol(')')?;
        self.writer.arithmetic(ArithOp::Not);
        self.writer.if_goto(&skip_if);

        self.expect_symbol('{')?;
        self.compile_statements()?;
        self.expect_symbol('}')?;
        self.writer.goto(&skip_else);
        self.writer.label(&skip_if);

        if self.eat_keyword(Keyword::Else) {
            self.expect_symbol('{')?;
            self.compile_statements()?;
            self.expect_symbol('}')?;
        }
        self.writer.label(&skip_else);
        Ok(())
    }

    /// `while (expr) { statements }`
    fn compile_while(&mut self) -> Parse<()> {
        let id = self.fresh_label_id();
        let top = format!("WHILE.{}", id);
        let skip = format!("SKIP_WHILE.{}", id);

        self.writer.label(&top);
        self.expect_keyword(Keyword::While)?;
        self.expect_symbol('(')?;
        self.compile_expression()?;
        self.expect_symbol(')')?;
        self.writer.arithmetic(ArithOp::Not);
        self.writer.if_goto(&skip);

        self.expect_symbol('{')?;
        self.compile_statements()?;
        self.expect_symbol('}')?;
        self.writer.goto(&top);
        self.writer.label(&skip);
        Ok(())
    }

    /// `do subroutineCall ;` — the returned value is discarded.
    fn compile_do(&mut self) -> Parse<()> {
        self.expect_keyword(Keyword::Do)?;
        let first = self.expect_ident()?;
        self.compile_call(first)?;
        self.expect_symbol(';')?;
        self.writer.pop(Segment::Temp, 0);
        Ok(())
    }

    /// `return expr? ;`
    fn compile_return(&mut self) -> Parse<()> {
        self.expect_keyword(Keyword::Return)?;
        if self.eat_symbol(';') {
            // void subroutines still return one word
            self.writer.push(Segment::Constant, 0);
        } else {
            self.compile_expression()?;
            self.expect_symbol(';')?;
        }
        self.writer.ret();
        Ok(())
    }

    /// `term (op term)*`, evaluated left to right with no precedence.
    fn compile_expression(&mut self) -> Parse<()> {
        self.compile_term()?;
        while let Some(op) = self.peek_binary_op() {
            self.advance();
            self.compile_term()?;
            match op {
                '+' => self.writer.arithmetic(ArithOp::Add),
                '-' => self.writer.arithmetic(ArithOp::Sub),
                '*' => self.writer.call("Math.multiply", 2),
                '/' => self.writer.call("Math.divide", 2),
                '&' => self.writer.arithmetic(ArithOp::And),
                '|' => self.writer.arithmetic(ArithOp::Or),
                '<' => self.writer.arithmetic(ArithOp::Lt),
                '>' => self.writer.arithmetic(ArithOp::Gt),
                '=' => self.writer.arithmetic(ArithOp::Eq),
                _ => unreachable!(),
            }
        }
        Ok(())
    }

    fn peek_binary_op(&self) -> Option<char> {
        match self.peek() {
            Token::Symbol(c) if "+-*/&|<>=".contains(*c) => Some(*c),
            _ => None,
        }
    }

    fn compile_term(&mut self) -> Parse<()> {
        match self.peek().clone() {
            Token::IntConst(n) => {
                self.advance();
                self.writer.push(Segment::Constant, n);
            }
            Token::StrConst(text) => {
                self.advance();
                self.compile_string_constant(&text);
            }
            Token::Keyword(Keyword::True) => {
                self.advance();
                // All-ones
                self.writer.push(Segment::Constant, 1);
                self.writer.arithmetic(ArithOp::Neg);
            }
            Token::Keyword(Keyword::False) | Token::Keyword(Keyword::Null) => {
                self.advance();
                self.writer.push(Segment::Constant, 0);
            }
            Token::Keyword(Keyword::This) => {
                self.advance();
                self.writer.push(Segment::Pointer, 0);
            }
            Token::Symbol('(') => {
                self.advance();
                self.compile_expression()?;
                self.expect_symbol(')')?;
            }
            Token::Symbol('-') => {
                self.advance();
                self.compile_term()?;
                self.writer.arithmetic(ArithOp::Neg);
            }
            Token::Symbol('~') => {
                self.advance();
                self.compile_term()?;
                self.writer.arithmetic(ArithOp::Not);
            }
            Token::Ident(_) => {
                let name = self.expect_ident()?;
                if self.at_symbol('[') {
                    // Array read: *(base + index) via THAT
                    let (segment, index) = self.resolve_variable(&name)?;
                    self.writer.push(segment, index);
                    self.expect_symbol('[')?;
                    self.compile_expression()?;
                    self.expect_symbol(']')?;
                    self.writer.arithmetic(ArithOp::Add);
                    self.writer.pop(Segment::Pointer, 1);
                    self.writer.push(Segment::That, 0);
                } else if self.at_symbol('(') || self.at_symbol('.') {
                    self.compile_call(name)?;
                } else {
                    let (segment, index) = self.resolve_variable(&name)?;
                    self.writer.push(segment, index);
                }
            }
            _ => {
                return Err(self
                    .expected("expression")
                    .with_help(
                        "a term is a constant, a variable, a subroutine call, \
                         a parenthesized expression, or a unary - or ~"
                            .to_string(),
                    ));
            }
        }
        Ok(())
    }

    fn compile_string_constant(&mut self, text: &str) {
        self.writer.push(Segment::Constant, text.len() as u16);
        self.writer.call("String.new", 1);
        for ch in text.chars() {
            self.writer.push(Segment::Constant, ch as u16);
            self.writer.call("String.appendChar", 2);
        }
    }

    /// The three call shapes, disambiguated by the first identifier and an
    /// optional `.member`:
    ///   f(args)    — method call on the current object
    ///   v.m(args)  — method call on variable v
    ///   C.f(args)  — function call; an unresolved receiver is a class name
    fn compile_call(&mut self, first: Spanned<String>) -> Parse<()> {
        let (target, receiver_pushed) = if self.eat_symbol('.') {
            let member = self.expect_ident()?.node;
            match self.symbols.resolve(&first.node) {
                Some(sym) => {
                    let target = format!("{}.{}", sym.ty, member);
                    self.writer.push(sym.kind.segment(), sym.index);
                    (target, true)
                }
                None => (format!("{}.{}", first.node, member), false),
            }
        } else {
            self.writer.push(Segment::Pointer, 0);
            (format!("{}.{}", self.class_name, first.node), true)
        };

        self.expect_symbol('(')?;
        let n_args = self.compile_expression_list()?;
        self.expect_symbol(')')?;

        self.writer
            .call(&target, n_args + u16::from(receiver_pushed));
        Ok(())
    }

    /// `(expr (, expr)*)?` — returns the number of expressions compiled.
    fn compile_expression_list(&mut self) -> Parse<u16> {
        let mut count = 0;
        if !self.at_symbol(')') {
            self.compile_expression()?;
            count += 1;
            while self.eat_symbol(',') {
                self.compile_expression()?;
                count += 1;
            }
        }
        Ok(count)
    }

    // ── Name handling ─────────────────────────────────────────────

    /// Parse a declared name and insert it; a redefinition keeps the first
    /// entry and raises a warning.
    fn define_var(&mut self, kind: StorageClass, ty: &str) -> Parse<()> {
        let name = self.expect_ident()?;
        if !self.symbols.define(&name.node, ty, kind) {
            self.warnings.push(
                Diagnostic::warning(
                    format!("variable '{}' is already defined in this scope", name.node),
                    name.span,
                )
                .with_note("the first definition wins".to_string()),
            );
        }
        Ok(())
    }

    fn resolve_variable(&self, name: &Spanned<String>) -> Parse<(Segment, u16)> {
        match self.symbols.resolve(&name.node) {
            Some(sym) => Ok((sym.kind.segment(), sym.index)),
            None => Err(Diagnostic::error(
                format!("undefined variable '{}'", name.node),
                name.span,
            )
            .with_help(
                "declare it with var, or as a field, static, or parameter".to_string(),
            )),
        }
    }

    fn fresh_label_id(&mut self) -> u32 {
        let id = self.label_id;
        self.label_id += 1;
        id
    }

    // ── Token handling ────────────────────────────────────────────

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].node
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn advance(&mut self) -> &Spanned<Token> {
        let tok = &self.tokens[self.pos];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    /// Consume a keyword token, if that is what comes next.
    fn advance_keyword(&mut self) -> Option<Keyword> {
        match self.peek() {
            Token::Keyword(kw) => {
                let kw = *kw;
                self.advance();
                Some(kw)
            }
            _ => None,
        }
    }

    fn at_symbol(&self, c: char) -> bool {
        *self.peek() == Token::Symbol(c)
    }

    fn at_keyword(&self, kw: Keyword) -> bool {
        *self.peek() == Token::Keyword(kw)
    }

    fn eat_symbol(&mut self, c: char) -> bool {
        if self.at_symbol(c) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.at_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, c: char) -> Parse<Span> {
        if self.at_symbol(c) {
            let span = self.current_span();
            self.advance();
            Ok(span)
        } else {
            Err(self.expected(&format!("'{}'", c)))
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> Parse<Span> {
        if self.at_keyword(kw) {
            let span = self.current_span();
            self.advance();
            Ok(span)
        } else {
            Err(self.expected(&format!("'{}'", kw.as_str())))
        }
    }

    fn expect_ident(&mut self) -> Parse<Spanned<String>> {
        if let Token::Ident(name) = self.peek().clone() {
            let span = self.current_span();
            self.advance();
            Ok(Spanned::new(name, span))
        } else {
            Err(self.expected("identifier"))
        }
    }

    /// `int`, `char`, `boolean`, or a class name.
    fn parse_type(&mut self) -> Parse<String> {
        match self.peek().clone() {
            Token::Keyword(kw @ (Keyword::Int | Keyword::Char | Keyword::Boolean)) => {
                self.advance();
                Ok(kw.as_str().to_string())
            }
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self
                .expected("type")
                .with_help("types are int, char, boolean, or a class name".to_string())),
        }
    }

    fn expected(&self, what: &str) -> Diagnostic {
        Diagnostic::error(
            format!("expected {}, found {}", what, self.peek().description()),
            self.current_span(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn compile(source: &str) -> Vec<String> {
        compile_full(source).code
    }

    fn compile_full(source: &str) -> ClassOutput {
        let (tokens, diags) = Lexer::new(source).tokenize();
        assert!(diags.is_empty(), "lex errors: {:?}", diags);
        Parser::new(tokens)
            .compile_class()
            .unwrap_or_else(|e| panic!("should compile, got: {}", e.message))
    }

    fn compile_err(source: &str) -> Diagnostic {
        let (tokens, diags) = Lexer::new(source).tokenize();
        assert!(diags.is_empty(), "lex errors: {:?}", diags);
        match Parser::new(tokens).compile_class() {
            Ok(_) => panic!("should not compile"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_simple_function() {
        let code = compile("class C { function int f() { return 1 + 2; } }");
        assert_eq!(
            code,
            vec![
                "function C.f 0",
                "push constant 1",
                "push constant 2",
                "add",
                "return",
            ]
        );
    }

    #[test]
    fn test_void_return_pushes_zero() {
        let code = compile("class C { function void f() { return; } }");
        assert_eq!(code, vec!["function C.f 0", "push constant 0", "return"]);
    }

    #[test]
    fn test_locals_counted_in_header() {
        let code = compile(
            "class C { function void f() { var int a, b; var boolean c; return; } }",
        );
        assert_eq!(code[0], "function C.f 3");
    }

    #[test]
    fn test_scalar_let() {
        let code = compile("class C { function void f() { var int a; let a = 7; return; } }");
        assert_eq!(
            code,
            vec![
                "function C.f 1",
                "push constant 7",
                "pop local 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_array_assignment_from_array() {
        // let a[i] = a[j]: read through THAT, then park the value in temp 0
        // while THAT is repointed at the target
        let code = compile(
            "class C { function void f(Array a, int i, int j) { let a[i] = a[j]; return; } }",
        );
        assert_eq!(
            code,
            vec![
                "function C.f 0",
                "push argument 0",
                "push argument 1",
                "add",
                "push argument 0",
                "push argument 2",
                "add",
                "pop pointer 1",
                "push that 0",
                "pop temp 0",
                "pop pointer 1",
                "push temp 0",
                "pop that 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_array_read_term() {
        let code =
            compile("class C { function int f(Array a, int i) { return a[i]; } }");
        assert_eq!(
            code,
            vec![
                "function C.f 0",
                "push argument 0",
                "push argument 1",
                "add",
                "pop pointer 1",
                "push that 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_do_method_on_field() {
        let code = compile(
            "class C { field Game g; method void run() { do g.h(1, 2); return; } }",
        );
        assert_eq!(
            code,
            vec![
                "function C.run 0",
                "push argument 0",
                "pop pointer 0",
                "push this 0",
                "push constant 1",
                "push constant 2",
                "call Game.h 3",
                "pop temp 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_do_class_function() {
        // Unknown receiver is treated as a class name; no receiver push
        let code =
            compile("class C { function void f() { do Output.printInt(5); return; } }");
        assert_eq!(
            code,
            vec![
                "function C.f 0",
                "push constant 5",
                "call Output.printInt 1",
                "pop temp 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_do_implicit_method_call() {
        let code = compile(
            "class C { method void a() { do b(); return; } method void b() { return; } }",
        );
        assert_eq!(code[1], "push argument 0"); // method prologue of a
        assert_eq!(
            &code[3..6],
            &["push pointer 0", "call C.b 1", "pop temp 0"]
        );
    }

    #[test]
    fn test_call_as_expression_keeps_value() {
        let code = compile("class C { function int f() { return Math.abs(3); } }");
        assert_eq!(
            code,
            vec![
                "function C.f 0",
                "push constant 3",
                "call Math.abs 1",
                "return",
            ]
        );
    }

    #[test]
    fn test_constructor_allocates_fields() {
        let code = compile(
            "class Point { field int x, y; constructor Point new() { return this; } }",
        );
        assert_eq!(
            code,
            vec![
                "function Point.new 0",
                "push constant 2",
                "call Memory.alloc 1",
                "pop pointer 0",
                "push pointer 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_method_this_is_argument_zero() {
        let code = compile(
            "class C { field int v; method int get(int x) { return v + x; } }",
        );
        assert_eq!(
            code,
            vec![
                "function C.get 0",
                "push argument 0",
                "pop pointer 0",
                "push this 0",
                "push argument 1", // x shifted by the implicit this
                "add",
                "return",
            ]
        );
    }

    #[test]
    fn test_if_else_labels() {
        let code = compile(
            "class C { function void f(boolean b) { if (b) { return; } else { return; } return; } }",
        );
        assert_eq!(
            code,
            vec![
                "function C.f 0",
                "push argument 0",
                "not",
                "if-goto SKIP_IF.0",
                "push constant 0",
                "return",
                "goto SKIP_ELSE.0",
                "label SKIP_IF.0",
                "push constant 0",
                "return",
                "label SKIP_ELSE.0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_if_without_else_keeps_both_labels() {
        let code = compile(
            "class C { function void f(boolean b) { if (b) { return; } return; } }",
        );
        let joined = code.join("\n");
        assert!(joined.contains("label SKIP_IF.0"));
        assert!(joined.contains("label SKIP_ELSE.0"));
    }

    #[test]
    fn test_while_shape() {
        let code = compile("class C { function void f() { while (true) { } return; } }");
        assert_eq!(
            code,
            vec![
                "function C.f 0",
                "label WHILE.0",
                "push constant 1",
                "neg",
                "not",
                "if-goto SKIP_WHILE.0",
                "goto WHILE.0",
                "label SKIP_WHILE.0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_nested_control_flow_labels_unique() {
        let code = compile(
            "class C { function void f(boolean b) {
                while (b) { if (b) { let b = false; } }
                if (b) { let b = false; }
                return; } }",
        );
        let joined = code.join("\n");
        for label in ["WHILE.0", "SKIP_IF.1", "SKIP_ELSE.1", "SKIP_IF.2"] {
            assert!(
                joined.contains(&format!("label {}", label)),
                "missing {} in:\n{}",
                label,
                joined
            );
        }
    }

    #[test]
    fn test_expression_left_to_right() {
        // (1 + 2) * 3 — no precedence
        let code = compile("class C { function int f() { return 1 + 2 * 3; } }");
        assert_eq!(
            code,
            vec![
                "function C.f 0",
                "push constant 1",
                "push constant 2",
                "add",
                "push constant 3",
                "call Math.multiply 2",
                "return",
            ]
        );
    }

    #[test]
    fn test_parentheses_override_order() {
        let code = compile("class C { function int f() { return 1 + (2 * 3); } }");
        assert_eq!(
            code,
            vec![
                "function C.f 0",
                "push constant 1",
                "push constant 2",
                "push constant 3",
                "call Math.multiply 2",
                "add",
                "return",
            ]
        );
    }

    #[test]
    fn test_operator_table() {
        let code = compile(
            "class C { function int f(int a, int b) { return a / b < (a & (b | (a > b))); } }",
        );
        let joined = code.join("\n");
        assert!(joined.contains("call Math.divide 2"));
        assert!(joined.contains("lt"));
        assert!(joined.contains("and"));
        assert!(joined.contains("or"));
        assert!(joined.contains("gt"));
    }

    #[test]
    fn test_keyword_constants() {
        let code = compile(
            "class C { function void f() { var boolean b; let b = true; let b = false; let b = null; return; } }",
        );
        assert_eq!(
            &code[1..4],
            &["push constant 1", "neg", "pop local 0"]
        );
        assert_eq!(&code[4..6], &["push constant 0", "pop local 0"]);
        assert_eq!(&code[6..8], &["push constant 0", "pop local 0"]);
    }

    #[test]
    fn test_unary_operators() {
        let code = compile("class C { function int f(int x) { return -x + ~x; } }");
        assert_eq!(
            code,
            vec![
                "function C.f 0",
                "push argument 0",
                "neg",
                "push argument 0",
                "not",
                "add",
                "return",
            ]
        );
    }

    #[test]
    fn test_string_constant_lowering() {
        let code =
            compile("class C { function void f() { var String s; let s = \"ab\"; return; } }");
        assert_eq!(
            &code[1..8],
            &[
                "push constant 2",
                "call String.new 1",
                "push constant 97",
                "call String.appendChar 2",
                "push constant 98",
                "call String.appendChar 2",
                "pop local 0",
            ]
        );
    }

    #[test]
    fn test_static_variables_use_static_segment() {
        let code = compile(
            "class C { static int count; function void f() { let count = count + 1; return; } }",
        );
        let joined = code.join("\n");
        assert!(joined.contains("push static 0"));
        assert!(joined.contains("pop static 0"));
    }

    #[test]
    fn test_this_term() {
        let code = compile("class C { method C me() { return this; } }");
        assert_eq!(code[3], "push pointer 0");
    }

    // --- Warnings ---

    #[test]
    fn test_redefinition_warns_and_first_wins() {
        let out = compile_full(
            "class C { function void f() { var int x; var boolean x; let x = 1; return; } }",
        );
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0]
            .message
            .contains("variable 'x' is already defined"));
        // Only one local slot
        assert_eq!(out.code[0], "function C.f 1");
    }

    // --- Error path tests ---

    #[test]
    fn test_error_missing_class() {
        let e = compile_err("function void f() { return; }");
        assert!(e.message.contains("expected 'class'"), "got: {}", e.message);
    }

    #[test]
    fn test_error_shows_expected_and_found() {
        let e = compile_err("class C { function void f() { return }");
        assert!(
            e.message.contains("expected") && e.message.contains("found"),
            "got: {}",
            e.message
        );
    }

    #[test]
    fn test_error_missing_semicolon() {
        let e = compile_err("class C { function void f() { var int x; let x = 1 } }");
        assert!(e.message.contains("expected ';'"), "got: {}", e.message);
    }

    #[test]
    fn test_error_undefined_variable_has_help() {
        let e = compile_err("class C { function void f() { let x = 1; return; } }");
        assert!(e.message.contains("undefined variable 'x'"));
        assert!(e.help.is_some());
    }

    #[test]
    fn test_error_bad_type() {
        let e = compile_err("class C { function void f() { var 42 x; return; } }");
        assert!(e.message.contains("expected type"), "got: {}", e.message);
        assert!(e.help.as_deref().unwrap().contains("boolean"));
    }

    #[test]
    fn test_error_expression_wanted() {
        let e = compile_err("class C { function int f() { return ); } }");
        assert!(
            e.message.contains("expected expression"),
            "got: {}",
            e.message
        );
        assert!(e.help.is_some());
    }

    #[test]
    fn test_error_trailing_tokens_after_class() {
        let e = compile_err("class C { } class D { }");
        assert!(
            e.message.contains("expected end of file"),
            "got: {}",
            e.message
        );
    }
}
