//! A single-pass bytecode compiler and stack virtual machine for Lox
//! expressions, globals, block-scoped locals and `print`.
//!
//! ```no_run
//! use loxvm::{Vm, VmConfig};
//!
//! let mut vm = Vm::new(VmConfig::default());
//! vm.interpret("var greeting = \"hi\"; print greeting + \"!\";").unwrap();
//! ```

pub mod chunk;
pub mod compiler;
pub mod config;
pub mod debug;
pub mod diagnostic;
pub mod object;
pub mod scanner;
pub mod table;
pub mod value;
pub mod vm;

pub use config::VmConfig;
pub use value::Value;
pub use vm::{InterpretError, RuntimeError, Vm};
