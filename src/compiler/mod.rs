//! Single-pass compiler: pulls tokens from the scanner and emits bytecode
//! straight into a chunk, with no syntax tree in between.
//!
//! Expressions use Pratt parsing over the table in `rules`. Statements are
//! plain recursive descent. After the first error in a statement the
//! compiler stops reporting until it resynchronises at a statement boundary,
//! so one mistake yields one diagnostic.

pub mod rules;

use std::fmt;

use crate::chunk::{Chunk, MAX_LONG_OPERAND, OpCode};
use crate::config::VmConfig;
use crate::debug;
use crate::object::Heap;
use crate::scanner::{ScanError, Scanner, Span, Token, TokenKind};
use crate::value::Value;

use rules::Precedence;

/// Where a compile error points, rendered after `Error` in the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// The error was found at end of input.
    End,
    /// The error was found at this lexeme.
    Lexeme(String),
    /// Scan errors: the message already says what was wrong.
    None,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::End => write!(f, " at end"),
            Location::Lexeme(lexeme) => write!(f, " at '{lexeme}'"),
            Location::None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CompileErrorKind {
    #[error("{0}")]
    Scan(ScanError),
    #[error("Expect expression.")]
    ExpectExpression,
    /// A required token was missing; holds the full message.
    #[error("{0}")]
    Expected(&'static str),
    #[error("Invalid assignment target.")]
    InvalidAssignmentTarget,
    #[error("Already a variable with this name in this scope.")]
    DuplicateLocal,
    #[error("Can't read local variable in its own initializer.")]
    LocalInOwnInitializer,
    #[error("Too many local variables in function.")]
    TooManyLocals,
    #[error("Too many constants in one chunk.")]
    TooManyConstants,
}

impl CompileErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            CompileErrorKind::Scan(err) => err.code(),
            CompileErrorKind::ExpectExpression => "LOX-C001",
            CompileErrorKind::Expected(_) => "LOX-C002",
            CompileErrorKind::InvalidAssignmentTarget => "LOX-C003",
            CompileErrorKind::DuplicateLocal => "LOX-C004",
            CompileErrorKind::LocalInOwnInitializer => "LOX-C005",
            CompileErrorKind::TooManyLocals => "LOX-C006",
            CompileErrorKind::TooManyConstants => "LOX-C007",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("[line {line}] Error{location}: {kind}")]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub line: u32,
    pub span: Span,
    pub location: Location,
}

impl CompileError {
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

/// A local variable slot. `depth` is `None` between declaration and the end
/// of its initializer.
#[derive(Debug, Clone, Copy)]
struct Local<'src> {
    name: &'src str,
    depth: Option<usize>,
}

/// Compile `source` into `chunk`, interning identifier and string constants
/// in `heap`. On failure the chunk contents are unspecified and every
/// reported error is returned in source order.
pub fn compile(
    source: &str,
    chunk: &mut Chunk,
    heap: &mut Heap,
    config: &VmConfig,
) -> Result<(), Vec<CompileError>> {
    let mut compiler = Compiler::new(source, chunk, heap, config);
    compiler.advance();
    while !compiler.matches(TokenKind::Eof) {
        compiler.declaration();
    }
    compiler.finish()
}

pub struct Compiler<'src, 'a> {
    scanner: Scanner<'src>,
    current: Token<'src>,
    previous: Token<'src>,
    panic_mode: bool,
    errors: Vec<CompileError>,
    chunk: &'a mut Chunk,
    heap: &'a mut Heap,
    locals: Vec<Local<'src>>,
    scope_depth: usize,
    max_locals: usize,
    print_code: bool,
}

impl<'src, 'a> Compiler<'src, 'a> {
    fn new(source: &'src str, chunk: &'a mut Chunk, heap: &'a mut Heap, config: &VmConfig) -> Self {
        Compiler {
            scanner: Scanner::new(source),
            current: Token::synthetic(""),
            previous: Token::synthetic(""),
            panic_mode: false,
            errors: Vec::new(),
            chunk,
            heap,
            locals: Vec::new(),
            scope_depth: 0,
            max_locals: config.local_limit(),
            print_code: config.print_code,
        }
    }

    fn finish(mut self) -> Result<(), Vec<CompileError>> {
        self.emit_op(OpCode::Return);
        if !self.errors.is_empty() {
            return Err(self.errors);
        }
        if self.print_code {
            eprint!("{}", debug::disassemble_chunk(self.chunk, self.heap, "code"));
        }
        Ok(())
    }

    // ── Token plumbing ───────────────────────────────────────────────

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            match self.current.kind {
                TokenKind::Error(err) => self.error_at_current(CompileErrorKind::Scan(err)),
                _ => break,
            }
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, kind: TokenKind, message: &'static str) {
        if self.check(kind) {
            self.advance();
        } else {
            self.error_at_current(CompileErrorKind::Expected(message));
        }
    }

    // ── Errors ───────────────────────────────────────────────────────

    fn error(&mut self, kind: CompileErrorKind) {
        self.error_at(self.previous, kind);
    }

    fn error_at_current(&mut self, kind: CompileErrorKind) {
        self.error_at(self.current, kind);
    }

    fn error_at(&mut self, token: Token<'src>, kind: CompileErrorKind) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        let location = match token.kind {
            TokenKind::Eof => Location::End,
            TokenKind::Error(_) => Location::None,
            _ => Location::Lexeme(token.lexeme.to_string()),
        };
        self.errors.push(CompileError { kind, line: token.line, span: token.span, location });
    }

    /// Skip tokens until something that looks like a statement boundary.
    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => self.advance(),
            }
        }
    }

    // ── Emission ─────────────────────────────────────────────────────

    fn emit_op(&mut self, op: OpCode) {
        self.chunk.write_op(op, self.previous.line);
    }

    fn emit_ops(&mut self, first: OpCode, second: OpCode) {
        self.emit_op(first);
        self.emit_op(second);
    }

    fn emit_indexed(&mut self, short: OpCode, long: OpCode, index: usize) {
        if self.chunk.write_indexed(short, long, index, self.previous.line).is_err() {
            self.error(CompileErrorKind::TooManyConstants);
        }
    }

    fn make_constant(&mut self, value: Value) -> usize {
        let index = self.chunk.add_constant(value);
        if index > MAX_LONG_OPERAND {
            self.error(CompileErrorKind::TooManyConstants);
            return 0;
        }
        index
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_indexed(OpCode::Constant, OpCode::ConstantLong, index);
    }

    fn identifier_constant(&mut self, name: &str) -> usize {
        let r = self.heap.intern(name);
        self.make_constant(Value::Obj(r))
    }

    // ── Declarations and statements ──────────────────────────────────

    fn declaration(&mut self) {
        if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }
        if self.panic_mode {
            self.synchronize();
        }
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");
        if self.matches(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.");
        self.define_variable(global);
    }

    /// Consume a variable name. Returns the name's constant index for a
    /// global; locals live in stack slots and return 0.
    fn parse_variable(&mut self, message: &'static str) -> usize {
        self.consume(TokenKind::Identifier, message);
        self.declare_variable();
        if self.scope_depth > 0 {
            return 0;
        }
        self.identifier_constant(self.previous.lexeme)
    }

    fn declare_variable(&mut self) {
        if self.scope_depth == 0 {
            return;
        }
        let name = self.previous.lexeme;
        let depth = self.scope_depth;
        let duplicate = self
            .locals
            .iter()
            .rev()
            .take_while(|local| local.depth.is_none_or(|d| d >= depth))
            .any(|local| local.name == name);
        if duplicate {
            self.error(CompileErrorKind::DuplicateLocal);
        }
        self.add_local(name);
    }

    fn add_local(&mut self, name: &'src str) {
        if self.locals.len() >= self.max_locals {
            self.error(CompileErrorKind::TooManyLocals);
            return;
        }
        self.locals.push(Local { name, depth: None });
    }

    fn define_variable(&mut self, global: usize) {
        if self.scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_indexed(OpCode::DefineGlobal, OpCode::DefineGlobalLong, global);
    }

    fn mark_initialized(&mut self) {
        if let Some(local) = self.locals.last_mut() {
            local.depth = Some(self.scope_depth);
        }
    }

    fn statement(&mut self) {
        if self.matches(TokenKind::Print) {
            self.print_statement();
        } else if self.matches(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::Print);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::Pop);
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.");
    }

    fn begin_scope(&mut self) {
        self.scope_depth += 1;
    }

    fn end_scope(&mut self) {
        self.scope_depth -= 1;
        let depth = self.scope_depth;
        while self
            .locals
            .last()
            .is_some_and(|local| local.depth.is_none_or(|d| d > depth))
        {
            self.emit_op(OpCode::Pop);
            self.locals.pop();
        }
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let Some(prefix) = rules::rule(self.previous.kind).prefix else {
            self.error(CompileErrorKind::ExpectExpression);
            return;
        };

        let can_assign = precedence <= Precedence::Assignment;
        prefix(self, can_assign);

        while precedence <= rules::rule(self.current.kind).precedence {
            self.advance();
            if let Some(infix) = rules::rule(self.previous.kind).infix {
                infix(self, can_assign);
            }
        }

        if can_assign && self.matches(TokenKind::Equal) {
            self.error(CompileErrorKind::InvalidAssignmentTarget);
        }
    }

    fn grouping(&mut self, _can_assign: bool) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn number(&mut self, _can_assign: bool) {
        let value = self.previous.lexeme.parse::<f64>().unwrap_or_default();
        self.emit_constant(Value::Number(value));
    }

    fn string(&mut self, _can_assign: bool) {
        let lexeme = self.previous.lexeme;
        let contents = &lexeme[1..lexeme.len() - 1];
        let r = self.heap.intern(contents);
        self.emit_constant(Value::Obj(r));
    }

    fn literal(&mut self, _can_assign: bool) {
        match self.previous.kind {
            TokenKind::False => self.emit_op(OpCode::False),
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            TokenKind::True => self.emit_op(OpCode::True),
            _ => {}
        }
    }

    fn variable(&mut self, can_assign: bool) {
        self.named_variable(self.previous.lexeme, can_assign);
    }

    fn named_variable(&mut self, name: &'src str, can_assign: bool) {
        let (get, get_long, set, set_long, index) = match self.resolve_local(name) {
            Some(slot) => (
                OpCode::GetLocal,
                OpCode::GetLocalLong,
                OpCode::SetLocal,
                OpCode::SetLocalLong,
                slot,
            ),
            None => {
                let index = self.identifier_constant(name);
                (
                    OpCode::GetGlobal,
                    OpCode::GetGlobalLong,
                    OpCode::SetGlobal,
                    OpCode::SetGlobalLong,
                    index,
                )
            }
        };

        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_indexed(set, set_long, index);
        } else {
            self.emit_indexed(get, get_long, index);
        }
    }

    /// Innermost local named `name`, searching from the most recent
    /// declaration outward. `None` means the name is global.
    fn resolve_local(&mut self, name: &str) -> Option<usize> {
        let (slot, initialized) = self
            .locals
            .iter()
            .enumerate()
            .rev()
            .find(|(_, local)| local.name == name)
            .map(|(slot, local)| (slot, local.depth.is_some()))?;
        if !initialized {
            self.error(CompileErrorKind::LocalInOwnInitializer);
        }
        Some(slot)
    }

    fn unary(&mut self, _can_assign: bool) {
        let operator = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenKind::Bang => self.emit_op(OpCode::Not),
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            _ => {}
        }
    }

    fn binary(&mut self, _can_assign: bool) {
        let operator = self.previous.kind;
        let precedence = rules::rule(operator).precedence;
        self.parse_precedence(precedence.next());

        match operator {
            TokenKind::BangEqual => self.emit_ops(OpCode::Equal, OpCode::Not),
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::GreaterEqual => self.emit_ops(OpCode::Less, OpCode::Not),
            TokenKind::Less => self.emit_op(OpCode::Less),
            TokenKind::LessEqual => self.emit_ops(OpCode::Greater, OpCode::Not),
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_ok(source: &str) -> (Chunk, Heap) {
        let mut chunk = Chunk::new();
        let mut heap = Heap::new();
        compile(source, &mut chunk, &mut heap, &VmConfig::default()).unwrap();
        (chunk, heap)
    }

    fn compile_err(source: &str) -> Vec<CompileError> {
        let mut chunk = Chunk::new();
        let mut heap = Heap::new();
        compile(source, &mut chunk, &mut heap, &VmConfig::default()).unwrap_err()
    }

    fn ops(codes: &[OpCode]) -> Vec<u8> {
        codes.iter().map(|&op| op as u8).collect()
    }

    #[test]
    fn precedence_of_arithmetic() {
        let (chunk, _) = compile_ok("print 1 + 2 * 3;");
        let c = OpCode::Constant as u8;
        let mut expected = vec![c, 0, c, 1, c, 2];
        expected.extend(ops(&[OpCode::Multiply, OpCode::Add, OpCode::Print, OpCode::Return]));
        assert_eq!(chunk.code(), expected.as_slice());
        assert_eq!(chunk.constants(), &[Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]);
    }

    #[test]
    fn subtraction_is_left_associative() {
        let (chunk, _) = compile_ok("1 - 2 - 3;");
        let c = OpCode::Constant as u8;
        let s = OpCode::Subtract as u8;
        assert_eq!(&chunk.code()[..8], &[c, 0, c, 1, s, c, 2, s]);
    }

    #[test]
    fn negated_comparisons_use_two_ops() {
        let (chunk, _) = compile_ok("1 != 2; 1 >= 2; 1 <= 2;");
        let code = chunk.code();
        let not = OpCode::Not as u8;
        assert_eq!(&code[4..6], &[OpCode::Equal as u8, not]);
        assert_eq!(&code[11..13], &[OpCode::Less as u8, not]);
        assert_eq!(&code[18..20], &[OpCode::Greater as u8, not]);
    }

    #[test]
    fn strings_are_interned_without_quotes() {
        let (chunk, heap) = compile_ok("\"hi\"; \"hi\";");
        let a = chunk.constant(0).and_then(Value::as_obj).unwrap();
        let b = chunk.constant(1).and_then(Value::as_obj).unwrap();
        assert_eq!(a, b);
        assert_eq!(heap.as_string(a).unwrap().as_str(), "hi");
    }

    #[test]
    fn global_declaration_and_read() {
        let (chunk, heap) = compile_ok("var a = 1; print a;");
        let code = chunk.code();
        assert_eq!(code[2], OpCode::DefineGlobal as u8);
        assert_eq!(code[4], OpCode::GetGlobal as u8);
        let name = chunk.constant(code[3] as usize).and_then(Value::as_obj).unwrap();
        assert_eq!(heap.as_string(name).unwrap().as_str(), "a");
    }

    #[test]
    fn locals_use_slots_and_pop_at_scope_end() {
        let (chunk, _) = compile_ok("{ var a = 1; var b = a; }");
        let c = OpCode::Constant as u8;
        let expected = vec![
            c,
            0,
            OpCode::GetLocal as u8,
            0,
            OpCode::Pop as u8,
            OpCode::Pop as u8,
            OpCode::Return as u8,
        ];
        assert_eq!(chunk.code(), expected.as_slice());
    }

    #[test]
    fn constant_256_uses_long_form() {
        let source: String = (0..=256).map(|i| format!("{i};")).collect();
        let (chunk, _) = compile_ok(&source);
        // Each statement is two bytes of load plus a Pop until the long form kicks in.
        let long_at = 256 * 3;
        assert_eq!(chunk.code()[long_at - 3], OpCode::Constant as u8);
        assert_eq!(chunk.code()[long_at - 2], 255);
        assert_eq!(&chunk.code()[long_at..long_at + 4], &[OpCode::ConstantLong as u8, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn local_slot_past_255_uses_long_form() {
        let mut source = String::from("{");
        for i in 0..300 {
            source.push_str(&format!(" var v{i} = nil;"));
        }
        source.push_str(" v299; }");
        let (chunk, _) = compile_ok(&source);
        let code = chunk.code();
        let get = code.iter().position(|&b| b == OpCode::GetLocalLong as u8).unwrap();
        assert_eq!(chunk.read_u24(get + 1), Some(299));
    }

    #[test]
    fn error_format_at_lexeme_and_end() {
        let errs = compile_err("print 1 +;");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].to_string(), "[line 1] Error at ';': Expect expression.");
        assert_eq!(errs[0].kind, CompileErrorKind::ExpectExpression);
        assert_eq!(errs[0].code(), "LOX-C001");

        let errs = compile_err("print 1");
        assert_eq!(errs[0].to_string(), "[line 1] Error at end: Expect ';' after value.");
        assert_eq!(errs[0].kind, CompileErrorKind::Expected("Expect ';' after value."));
        assert_eq!(errs[0].code(), "LOX-C002");
    }

    #[test]
    fn scan_errors_have_no_location() {
        let errs = compile_err("print \"open;");
        assert_eq!(errs[0].to_string(), "[line 1] Error: Unterminated string.");
        assert_eq!(errs[0].kind, CompileErrorKind::Scan(ScanError::UnterminatedString));
        assert_eq!(errs[0].code(), "LOX-S002");
    }

    #[test]
    fn invalid_assignment_target() {
        let errs = compile_err("var a = 1; var b = 2; a + b = 3;");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].kind, CompileErrorKind::InvalidAssignmentTarget);
        assert_eq!(errs[0].location, Location::Lexeme("=".into()));
    }

    #[test]
    fn duplicate_local_in_same_scope() {
        let errs = compile_err("{ var a = 1; var a = 2; }");
        assert_eq!(errs[0].kind, CompileErrorKind::DuplicateLocal);
        assert_eq!(errs[0].code(), "LOX-C004");

        // Shadowing in a nested scope is fine.
        compile_ok("{ var a = 1; { var a = 2; } }");
    }

    #[test]
    fn local_in_own_initializer() {
        let errs = compile_err("{ var a = a; }");
        assert_eq!(errs[0].to_string(), "[line 1] Error at 'a': Can't read local variable in its own initializer.");
        // At global scope this is allowed and reads the old value at run time.
        compile_ok("var a = a;");
    }

    #[test]
    fn too_many_locals_respects_config() {
        let mut chunk = Chunk::new();
        let mut heap = Heap::new();
        let config = VmConfig::new().with_max_locals(2);
        let errs = compile("{ var a; var b; var c; }", &mut chunk, &mut heap, &config).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].kind, CompileErrorKind::TooManyLocals);
        assert_eq!(errs[0].to_string(), "[line 1] Error at 'c': Too many local variables in function.");
        assert_eq!(errs[0].location, Location::Lexeme("c".into()));
    }

    #[test]
    fn one_error_per_statement_after_synchronize() {
        let errs = compile_err("print +;\nprint -;\nvar ok = 1;\n1 = 2;");
        let lines: Vec<u32> = errs.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![1, 2, 4]);
    }

    #[test]
    fn lines_follow_tokens() {
        let (chunk, _) = compile_ok("print\n1\n;");
        // The constant is emitted while `1` (line 2) is the previous token.
        assert_eq!(chunk.line_for(0), Some(2));
        assert_eq!(chunk.line_for(2), Some(3));
    }
}
