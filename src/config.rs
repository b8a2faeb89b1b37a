//! Runtime limits and debugging switches for a `Vm`.
//!
//! The configuration only states limits; the compiler and VM enforce them.

use crate::chunk::MAX_LONG_OPERAND;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Maximum operand stack depth, in values.
    pub max_stack: usize,

    /// Maximum number of locals in scope at once. Clamped to the 24-bit
    /// operand space.
    pub max_locals: usize,

    /// Print the stack and each instruction to stderr before executing it.
    pub trace: bool,

    /// Print the disassembled chunk to stderr after a successful compile.
    pub print_code: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_stack: 1 << 20,
            max_locals: 1 << 16,
            trace: false,
            print_code: false,
        }
    }
}

impl VmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_stack(mut self, max_stack: usize) -> Self {
        self.max_stack = max_stack;
        self
    }

    pub fn with_max_locals(mut self, max_locals: usize) -> Self {
        self.max_locals = max_locals.min(MAX_LONG_OPERAND + 1);
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_print_code(mut self, print_code: bool) -> Self {
        self.print_code = print_code;
        self
    }

    /// `max_locals` after clamping, for callers that built the struct literally.
    pub fn local_limit(&self) -> usize {
        self.max_locals.min(MAX_LONG_OPERAND + 1)
    }
}
