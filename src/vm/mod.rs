//! Stack-based bytecode interpreter.
//!
//! A `Vm` owns its heap, intern table and globals. Each `interpret` call
//! compiles into a fresh chunk, runs it, and drops it; heap objects and
//! globals survive into the next call.

use std::io::{self, Write};

use crate::chunk::{Chunk, OpCode};
use crate::compiler::{self, CompileError};
use crate::config::VmConfig;
use crate::debug;
use crate::object::Heap;
use crate::table::{Key, Table};
use crate::value::Value;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeErrorKind {
    #[error("Operand must be a number.")]
    OperandMustBeNumber,
    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,
    #[error("Operands must be two numbers or two strings.")]
    OperandsMustBeNumbersOrStrings,
    #[error("Undefined variable '{name}'.")]
    UndefinedVariable { name: String },
    #[error("Stack overflow.")]
    StackOverflow,
    #[error("Unknown opcode {0}.")]
    UnknownOpcode(u8),
    #[error("Could not write output: {0}")]
    Output(#[source] io::Error),
    #[error("Malformed bytecode at offset {offset}.")]
    Malformed { offset: usize },
}

impl RuntimeErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            RuntimeErrorKind::OperandMustBeNumber => "LOX-R001",
            RuntimeErrorKind::OperandsMustBeNumbers => "LOX-R002",
            RuntimeErrorKind::OperandsMustBeNumbersOrStrings => "LOX-R003",
            RuntimeErrorKind::UndefinedVariable { .. } => "LOX-R004",
            RuntimeErrorKind::StackOverflow => "LOX-R005",
            RuntimeErrorKind::UnknownOpcode(_) => "LOX-R006",
            RuntimeErrorKind::Output(_) => "LOX-R007",
            RuntimeErrorKind::Malformed { .. } => "LOX-R008",
        }
    }
}

/// A failure while executing, tagged with the source line of the
/// instruction that raised it.
#[derive(Debug, thiserror::Error)]
#[error("{kind}\n[line {line}] in script")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub line: u32,
}

impl RuntimeError {
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InterpretError {
    #[error("{}", render_compile_errors(.0))]
    Compile(Vec<CompileError>),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl InterpretError {
    /// Process exit status for this failure: 65 for compile errors, 70 for
    /// runtime errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            InterpretError::Compile(_) => 65,
            InterpretError::Runtime(_) => 70,
        }
    }
}

fn render_compile_errors(errors: &[CompileError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

type RunResult<T> = Result<T, RuntimeErrorKind>;

enum Flow {
    Continue,
    Return,
}

pub struct Vm<W: Write = io::Stdout> {
    config: VmConfig,
    heap: Heap,
    globals: Table,
    stack: Vec<Value>,
    out: W,
}

impl Vm<io::Stdout> {
    pub fn new(config: VmConfig) -> Self {
        Vm::with_output(config, io::stdout())
    }
}

impl<W: Write> Vm<W> {
    /// A VM whose `print` statements write to `out`.
    pub fn with_output(config: VmConfig, out: W) -> Self {
        Vm {
            config,
            heap: Heap::new(),
            globals: Table::new(),
            stack: Vec::with_capacity(256),
            out,
        }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn globals(&self) -> &Table {
        &self.globals
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// Current value of the global `name`, if it has been defined.
    pub fn global(&self, name: &str) -> Option<Value> {
        let r = self.heap.find_interned(name)?;
        let key = self.heap.key(r)?;
        self.globals.get(key)
    }

    /// Compile and run `source`.
    pub fn interpret(&mut self, source: &str) -> Result<(), InterpretError> {
        let chunk = self.compile(source)?;
        self.run(&chunk)?;
        Ok(())
    }

    /// Compile `source` against this VM's heap without running it.
    pub fn compile(&mut self, source: &str) -> Result<Chunk, InterpretError> {
        let mut chunk = Chunk::new();
        compiler::compile(source, &mut chunk, &mut self.heap, &self.config)
            .map_err(InterpretError::Compile)?;
        Ok(chunk)
    }

    /// Compile `source` and return its disassembly.
    pub fn disassemble(&mut self, source: &str, name: &str) -> Result<String, InterpretError> {
        let chunk = self.compile(source)?;
        Ok(debug::disassemble_chunk(&chunk, &self.heap, name))
    }

    /// Execute `chunk` from its first byte until `RETURN`. On error the
    /// stack is cleared so the VM can run again.
    pub fn run(&mut self, chunk: &Chunk) -> Result<(), RuntimeError> {
        let mut ip = 0;
        loop {
            let start = ip;
            if self.config.trace {
                self.trace(chunk, start);
            }
            match self.step(chunk, &mut ip) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Return) => return Ok(()),
                Err(kind) => {
                    self.stack.clear();
                    let line = chunk.line_for(start).unwrap_or(0);
                    return Err(RuntimeError { kind, line });
                }
            }
        }
    }

    fn trace(&self, chunk: &Chunk, offset: usize) {
        let mut slots = String::from("          ");
        for value in &self.stack {
            slots.push_str(&format!("[ {} ]", value.display(&self.heap)));
        }
        let (instruction, _) = debug::disassemble_instruction(chunk, &self.heap, offset);
        eprintln!("{slots}\n{instruction}");
    }

    fn step(&mut self, chunk: &Chunk, ip: &mut usize) -> RunResult<Flow> {
        let byte = read_byte(chunk, ip)?;
        let op = OpCode::try_from(byte).map_err(|err| RuntimeErrorKind::UnknownOpcode(err.0))?;

        match op {
            OpCode::Constant | OpCode::ConstantLong => {
                let at = *ip;
                let value = read_constant(chunk, ip, op == OpCode::ConstantLong)?;
                if value.as_obj().is_some_and(|r| self.heap.get(r).is_none()) {
                    return Err(RuntimeErrorKind::Malformed { offset: at });
                }
                self.push(value)?;
            }
            OpCode::Nil => self.push(Value::Nil)?,
            OpCode::True => self.push(Value::Bool(true))?,
            OpCode::False => self.push(Value::Bool(false))?,
            OpCode::Pop => {
                self.pop(*ip)?;
            }

            OpCode::DefineGlobal | OpCode::DefineGlobalLong => {
                let key = self.read_name(chunk, ip, op == OpCode::DefineGlobalLong)?;
                let value = self.peek(0, *ip)?;
                self.globals.set(key, value);
                self.pop(*ip)?;
            }
            OpCode::GetGlobal | OpCode::GetGlobalLong => {
                let key = self.read_name(chunk, ip, op == OpCode::GetGlobalLong)?;
                match self.globals.get(key) {
                    Some(value) => self.push(value)?,
                    None => return Err(self.undefined(key)),
                }
            }
            OpCode::SetGlobal | OpCode::SetGlobalLong => {
                let key = self.read_name(chunk, ip, op == OpCode::SetGlobalLong)?;
                let value = self.peek(0, *ip)?;
                if !self.globals.assign(key, value) {
                    return Err(self.undefined(key));
                }
            }

            OpCode::GetLocal | OpCode::GetLocalLong => {
                let slot = read_operand(chunk, ip, op == OpCode::GetLocalLong)?;
                let value = *self.stack.get(slot).ok_or(RuntimeErrorKind::Malformed { offset: *ip })?;
                self.push(value)?;
            }
            OpCode::SetLocal | OpCode::SetLocalLong => {
                let slot = read_operand(chunk, ip, op == OpCode::SetLocalLong)?;
                let value = self.peek(0, *ip)?;
                let target = self.stack.get_mut(slot).ok_or(RuntimeErrorKind::Malformed { offset: *ip })?;
                *target = value;
            }

            OpCode::Equal => {
                let b = self.pop(*ip)?;
                let a = self.pop(*ip)?;
                self.push(Value::Bool(a == b))?;
            }
            OpCode::Greater => self.binary_number(*ip, |a, b| Value::Bool(a > b))?,
            OpCode::Less => self.binary_number(*ip, |a, b| Value::Bool(a < b))?,
            OpCode::Add => self.add(*ip)?,
            OpCode::Subtract => self.binary_number(*ip, |a, b| Value::Number(a - b))?,
            OpCode::Multiply => self.binary_number(*ip, |a, b| Value::Number(a * b))?,
            OpCode::Divide => self.binary_number(*ip, |a, b| Value::Number(a / b))?,

            OpCode::Not => {
                let value = self.pop(*ip)?;
                self.push(Value::Bool(value.is_falsey()))?;
            }
            OpCode::Negate => {
                let Some(n) = self.peek(0, *ip)?.as_number() else {
                    return Err(RuntimeErrorKind::OperandMustBeNumber);
                };
                self.pop(*ip)?;
                self.push(Value::Number(-n))?;
            }

            OpCode::Print => {
                let value = self.pop(*ip)?;
                writeln!(self.out, "{}", value.display(&self.heap)).map_err(RuntimeErrorKind::Output)?;
            }
            OpCode::Return => return Ok(Flow::Return),
        }
        Ok(Flow::Continue)
    }

    // ── Stack ────────────────────────────────────────────────────────

    fn push(&mut self, value: Value) -> RunResult<()> {
        if self.stack.len() >= self.config.max_stack {
            return Err(RuntimeErrorKind::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self, offset: usize) -> RunResult<Value> {
        self.stack.pop().ok_or(RuntimeErrorKind::Malformed { offset })
    }

    fn peek(&self, distance: usize, offset: usize) -> RunResult<Value> {
        self.stack
            .len()
            .checked_sub(distance + 1)
            .map(|i| self.stack[i])
            .ok_or(RuntimeErrorKind::Malformed { offset })
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Pop two numbers and push `f(a, b)`. Operands stay on the stack when
    /// either is not a number.
    fn binary_number(&mut self, offset: usize, f: impl FnOnce(f64, f64) -> Value) -> RunResult<()> {
        let (Some(b), Some(a)) = (self.peek(0, offset)?.as_number(), self.peek(1, offset)?.as_number())
        else {
            return Err(RuntimeErrorKind::OperandsMustBeNumbers);
        };
        self.pop(offset)?;
        self.pop(offset)?;
        self.push(f(a, b))
    }

    fn add(&mut self, offset: usize) -> RunResult<()> {
        let b = self.peek(0, offset)?;
        let a = self.peek(1, offset)?;
        let result = match (a, b) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Value::Obj(a), Value::Obj(b)) => {
                let (Some(left), Some(right)) = (self.heap.as_string(a), self.heap.as_string(b)) else {
                    return Err(RuntimeErrorKind::OperandsMustBeNumbersOrStrings);
                };
                let mut joined = String::with_capacity(left.len() + right.len());
                joined.push_str(left.as_str());
                joined.push_str(right.as_str());
                Value::Obj(self.heap.take_string(joined))
            }
            _ => return Err(RuntimeErrorKind::OperandsMustBeNumbersOrStrings),
        };
        self.pop(offset)?;
        self.pop(offset)?;
        self.push(result)
    }

    /// Read a global's name operand and turn it into a table key.
    fn read_name(&self, chunk: &Chunk, ip: &mut usize, long: bool) -> RunResult<Key> {
        let at = *ip;
        let value = read_constant(chunk, ip, long)?;
        value
            .as_obj()
            .and_then(|r| self.heap.key(r))
            .ok_or(RuntimeErrorKind::Malformed { offset: at })
    }

    fn undefined(&self, key: Key) -> RuntimeErrorKind {
        let name = self
            .heap
            .as_string(key.obj())
            .map(|s| s.as_str().to_string())
            .unwrap_or_default();
        RuntimeErrorKind::UndefinedVariable { name }
    }
}

fn read_byte(chunk: &Chunk, ip: &mut usize) -> RunResult<u8> {
    let byte = chunk.read_byte(*ip).ok_or(RuntimeErrorKind::Malformed { offset: *ip })?;
    *ip += 1;
    Ok(byte)
}

fn read_operand(chunk: &Chunk, ip: &mut usize, long: bool) -> RunResult<usize> {
    if !long {
        return read_byte(chunk, ip).map(usize::from);
    }
    let index = chunk.read_u24(*ip).ok_or(RuntimeErrorKind::Malformed { offset: *ip })?;
    *ip += 3;
    Ok(index)
}

fn read_constant(chunk: &Chunk, ip: &mut usize, long: bool) -> RunResult<Value> {
    let at = *ip;
    let index = read_operand(chunk, ip, long)?;
    chunk.constant(index).ok_or(RuntimeErrorKind::Malformed { offset: at })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm() -> Vm<Vec<u8>> {
        Vm::with_output(VmConfig::default(), Vec::new())
    }

    fn printed(vm: &Vm<Vec<u8>>) -> String {
        String::from_utf8(vm.output().clone()).unwrap()
    }

    fn runtime_error(result: Result<(), InterpretError>) -> RuntimeError {
        match result {
            Err(InterpretError::Runtime(err)) => err,
            other => panic!("expected runtime error, got {other:?}"),
        }
    }

    #[test]
    fn arithmetic_and_print() {
        let mut vm = vm();
        vm.interpret("print 1 + 2 * 3; print -(4 - 6) / 4;").unwrap();
        assert_eq!(printed(&vm), "7\n0.5\n");
        assert_eq!(vm.stack_len(), 0);
    }

    #[test]
    fn comparisons_and_equality() {
        let mut vm = vm();
        vm.interpret("print 1 < 2; print 2 <= 1; print 3 >= 3; print 1 != 1; print nil == false; print !nil;")
            .unwrap();
        assert_eq!(printed(&vm), "true\nfalse\ntrue\nfalse\nfalse\ntrue\n");
    }

    #[test]
    fn string_concatenation_interns_result() {
        let mut vm = vm();
        vm.interpret("print \"foo\" + \"bar\"; print \"foobar\" == \"foo\" + \"bar\";").unwrap();
        assert_eq!(printed(&vm), "foobar\ntrue\n");
        let count = vm
            .heap()
            .arena()
            .iter()
            .filter(|(_, obj)| obj.as_string().is_some_and(|s| s.as_str() == "foobar"))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn globals_and_assignment() {
        let mut vm = vm();
        vm.interpret("var a = 1; a = a + 1; print a; var b; print b;").unwrap();
        assert_eq!(printed(&vm), "2\nnil\n");
        assert_eq!(vm.global("a"), Some(Value::Number(2.0)));
    }

    #[test]
    fn assignment_is_an_expression() {
        let mut vm = vm();
        vm.interpret("var a; var b; a = b = 3; print a; { var l; l = 4; print l = 5; }").unwrap();
        assert_eq!(printed(&vm), "3\n5\n");
    }

    #[test]
    fn undefined_global_read_reports_line() {
        let mut vm = vm();
        let err = runtime_error(vm.interpret("\n\nprint x;"));
        assert_eq!(err.to_string(), "Undefined variable 'x'.\n[line 3] in script");
        assert_eq!(err.code(), "LOX-R004");
        assert_eq!(printed(&vm), "");
        assert_eq!(vm.stack_len(), 0);
    }

    #[test]
    fn undefined_global_assignment_leaves_no_entry() {
        let mut vm = vm();
        let err = runtime_error(vm.interpret("y = 1;"));
        assert!(matches!(err.kind, RuntimeErrorKind::UndefinedVariable { ref name } if name == "y"));
        assert_eq!(vm.global("y"), None);
        assert!(vm.globals().is_empty());
    }

    #[test]
    fn type_errors() {
        let mut vm = vm();
        let err = runtime_error(vm.interpret("-\"a\";"));
        assert!(matches!(err.kind, RuntimeErrorKind::OperandMustBeNumber));
        let err = runtime_error(vm.interpret("1 < \"a\";"));
        assert!(matches!(err.kind, RuntimeErrorKind::OperandsMustBeNumbers));
        let err = runtime_error(vm.interpret("1 + \"a\";"));
        assert!(matches!(err.kind, RuntimeErrorKind::OperandsMustBeNumbersOrStrings));
        assert_eq!(err.to_string(), "Operands must be two numbers or two strings.\n[line 1] in script");
    }

    #[test]
    fn stack_overflow_is_reported() {
        let mut vm = Vm::with_output(VmConfig::new().with_max_stack(2), Vec::new());
        let err = runtime_error(vm.interpret("print 1 + (2 + 3);"));
        assert!(matches!(err.kind, RuntimeErrorKind::StackOverflow));
        assert_eq!(vm.stack_len(), 0);
        vm.interpret("print 1 + 2;").unwrap();
        assert_eq!(printed(&vm), "3\n");
    }

    #[test]
    fn globals_persist_after_errors() {
        let mut vm = vm();
        vm.interpret("var a = 10;").unwrap();
        assert!(vm.interpret("print b;").is_err());
        vm.interpret("print a;").unwrap();
        assert_eq!(printed(&vm), "10\n");
    }

    #[test]
    fn compile_errors_do_not_run() {
        let mut vm = vm();
        let err = vm.interpret("print 1; print ;").unwrap_err();
        assert_eq!(err.exit_code(), 65);
        assert_eq!(err.to_string(), "[line 1] Error at ';': Expect expression.");
        assert_eq!(printed(&vm), "");
    }

    #[test]
    fn unknown_opcode_in_hand_built_chunk() {
        let mut vm = vm();
        let mut chunk = Chunk::new();
        chunk.write(0xFF, 5);
        let err = vm.run(&chunk).unwrap_err();
        assert!(matches!(err.kind, RuntimeErrorKind::UnknownOpcode(0xFF)));
        assert_eq!(err.line, 5);
    }

    #[test]
    fn chunk_from_another_vm_is_malformed() {
        let mut a = vm();
        a.interpret("var pad1 = 1; var pad2 = 2; var pad3 = 3;").unwrap();
        let printing = a.compile("print \"zzz\";").unwrap();
        let reading = a.compile("print pad3;").unwrap();

        let mut b = vm();
        let err = b.run(&printing).unwrap_err();
        assert!(matches!(err.kind, RuntimeErrorKind::Malformed { .. }));
        assert_eq!(err.code(), "LOX-R008");
        let err = b.run(&reading).unwrap_err();
        assert!(matches!(err.kind, RuntimeErrorKind::Malformed { .. }));
        assert_eq!(printed(&b), "");
        assert_eq!(b.stack_len(), 0);
    }

    #[test]
    fn separate_vms_do_not_share_globals() {
        let mut a = vm();
        let mut b = vm();
        a.interpret("var x = 1;").unwrap();
        assert!(b.interpret("print x;").is_err());
        assert_eq!(a.global("x"), Some(Value::Number(1.0)));
    }
}
