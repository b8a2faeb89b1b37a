//! Human-readable chunk listings, used by `--disassemble`, `--print-code`
//! and the execution trace.

use std::fmt::Write;

use crate::chunk::{Chunk, OpCode};
use crate::object::Heap;

/// Disassemble every instruction in `chunk` under a `== name ==` header.
pub fn disassemble_chunk(chunk: &Chunk, heap: &Heap, name: &str) -> String {
    let mut out = format!("== {name} ==\n");
    let mut offset = 0;
    while offset < chunk.len() {
        let (line, next) = disassemble_instruction(chunk, heap, offset);
        out.push_str(&line);
        out.push('\n');
        offset = next;
    }
    out
}

/// One instruction as a single line (no trailing newline), plus the offset
/// of the instruction after it.
///
/// Format: offset, source line (`|` when unchanged from the previous byte),
/// opcode name, and for indexed instructions the operand and, for constant
/// operands, the constant's value.
pub fn disassemble_instruction(chunk: &Chunk, heap: &Heap, offset: usize) -> (String, usize) {
    let mut out = format!("{offset:04} ");

    let line = chunk.line_for(offset);
    if offset > 0 && line == chunk.line_for(offset - 1) {
        out.push_str("   | ");
    } else {
        match line {
            Some(line) => {
                let _ = write!(out, "{line:4} ");
            }
            None => out.push_str("   ? "),
        }
    }

    let Some(byte) = chunk.read_byte(offset) else {
        out.push_str("<end of chunk>");
        return (out, offset + 1);
    };
    let op = match OpCode::try_from(byte) {
        Ok(op) => op,
        Err(err) => {
            let _ = write!(out, "Unknown opcode {}", err.0);
            return (out, offset + 1);
        }
    };

    let width = op.operand_width();
    if width == 0 {
        out.push_str(op.name());
        return (out, offset + 1);
    }

    let operand = match width {
        1 => chunk.read_byte(offset + 1).map(usize::from),
        _ => chunk.read_u24(offset + 1),
    };
    let Some(index) = operand else {
        let _ = write!(out, "{:<16} <truncated>", op.name());
        return (out, chunk.len());
    };

    let _ = write!(out, "{:<16} {index:4}", op.name());
    if op.reads_constant() {
        match chunk.constant(index) {
            Some(value) => {
                let _ = write!(out, " '{}'", value.display(heap));
            }
            None => out.push_str(" <bad constant>"),
        }
    }
    (out, offset + 1 + width)
}
