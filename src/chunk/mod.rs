pub mod lines;
pub mod opcode;

pub use lines::{LineRun, LineTable};
pub use opcode::{OpCode, UnknownOpcode};

use crate::value::Value;

/// Largest operand that fits the one-byte encoding.
pub const MAX_SHORT_OPERAND: usize = u8::MAX as usize;
/// Largest operand that fits the three-byte encoding.
pub const MAX_LONG_OPERAND: usize = 0xFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operand {index} does not fit in 24 bits")]
pub struct OperandOverflow {
    pub index: usize,
}

// ── Chunk ────────────────────────────────────────────────────────────

/// Bytecode for one compilation unit: instruction bytes, the constant pool
/// they index, and the line of every byte.
///
/// Constants may refer to heap strings; the chunk does not own those. They
/// belong to the VM's heap and outlive the chunk.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    code: Vec<u8>,
    constants: Vec<Value>,
    lines: LineTable,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.write(op as u8, line);
    }

    /// Append to the constant pool. No deduplication happens here.
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Emit `short index` when the index fits in a byte, else `long` followed
    /// by the index as three bytes, least significant first.
    pub fn write_indexed(
        &mut self,
        short: OpCode,
        long: OpCode,
        index: usize,
        line: u32,
    ) -> Result<(), OperandOverflow> {
        if index <= MAX_SHORT_OPERAND {
            self.write_op(short, line);
            self.write(index as u8, line);
        } else if index <= MAX_LONG_OPERAND {
            self.write_op(long, line);
            self.write((index & 0xFF) as u8, line);
            self.write(((index >> 8) & 0xFF) as u8, line);
            self.write(((index >> 16) & 0xFF) as u8, line);
        } else {
            return Err(OperandOverflow { index });
        }
        Ok(())
    }

    /// Add `value` to the pool and emit the load for it.
    pub fn write_constant(&mut self, value: Value, line: u32) -> Result<usize, OperandOverflow> {
        let index = self.add_constant(value);
        self.write_indexed(OpCode::Constant, OpCode::ConstantLong, index, line)?;
        Ok(index)
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    pub fn constant(&self, index: usize) -> Option<Value> {
        self.constants.get(index).copied()
    }

    pub fn lines(&self) -> &LineTable {
        &self.lines
    }

    pub fn line_for(&self, offset: usize) -> Option<u32> {
        self.lines.line_for(offset)
    }

    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    /// Three-byte little-endian operand starting at `offset`.
    pub fn read_u24(&self, offset: usize) -> Option<usize> {
        let bytes = self.code.get(offset..offset + 3)?;
        Some(bytes[0] as usize | (bytes[1] as usize) << 8 | (bytes[2] as usize) << 16)
    }
}
