/// One-byte instruction opcodes.
///
/// `*Long` variants carry a 3-byte little-endian operand; their short
/// counterparts carry one byte. Everything else has no operand.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    Constant,
    ConstantLong,
    Nil,
    True,
    False,
    Pop,
    DefineGlobal,
    DefineGlobalLong,
    GetGlobal,
    GetGlobalLong,
    SetGlobal,
    SetGlobalLong,
    GetLocal,
    GetLocalLong,
    SetLocal,
    SetLocalLong,
    Equal,
    Greater,
    Less,
    Add,
    Subtract,
    Multiply,
    Divide,
    Not,
    Negate,
    Print,
    Return,
}

const ALL: [OpCode; 27] = [
    OpCode::Constant,
    OpCode::ConstantLong,
    OpCode::Nil,
    OpCode::True,
    OpCode::False,
    OpCode::Pop,
    OpCode::DefineGlobal,
    OpCode::DefineGlobalLong,
    OpCode::GetGlobal,
    OpCode::GetGlobalLong,
    OpCode::SetGlobal,
    OpCode::SetGlobalLong,
    OpCode::GetLocal,
    OpCode::GetLocalLong,
    OpCode::SetLocal,
    OpCode::SetLocalLong,
    OpCode::Equal,
    OpCode::Greater,
    OpCode::Less,
    OpCode::Add,
    OpCode::Subtract,
    OpCode::Multiply,
    OpCode::Divide,
    OpCode::Not,
    OpCode::Negate,
    OpCode::Print,
    OpCode::Return,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown opcode: {0}")]
pub struct UnknownOpcode(pub u8);

impl TryFrom<u8> for OpCode {
    type Error = UnknownOpcode;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        ALL.get(byte as usize).copied().ok_or(UnknownOpcode(byte))
    }
}

impl OpCode {
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Constant => "OP_CONSTANT",
            OpCode::ConstantLong => "OP_CONSTANT_LONG",
            OpCode::Nil => "OP_NIL",
            OpCode::True => "OP_TRUE",
            OpCode::False => "OP_FALSE",
            OpCode::Pop => "OP_POP",
            OpCode::DefineGlobal => "OP_DEFINE_GLOBAL",
            OpCode::DefineGlobalLong => "OP_DEFINE_GLOBAL_LONG",
            OpCode::GetGlobal => "OP_GET_GLOBAL",
            OpCode::GetGlobalLong => "OP_GET_GLOBAL_LONG",
            OpCode::SetGlobal => "OP_SET_GLOBAL",
            OpCode::SetGlobalLong => "OP_SET_GLOBAL_LONG",
            OpCode::GetLocal => "OP_GET_LOCAL",
            OpCode::GetLocalLong => "OP_GET_LOCAL_LONG",
            OpCode::SetLocal => "OP_SET_LOCAL",
            OpCode::SetLocalLong => "OP_SET_LOCAL_LONG",
            OpCode::Equal => "OP_EQUAL",
            OpCode::Greater => "OP_GREATER",
            OpCode::Less => "OP_LESS",
            OpCode::Add => "OP_ADD",
            OpCode::Subtract => "OP_SUBTRACT",
            OpCode::Multiply => "OP_MULTIPLY",
            OpCode::Divide => "OP_DIVIDE",
            OpCode::Not => "OP_NOT",
            OpCode::Negate => "OP_NEGATE",
            OpCode::Print => "OP_PRINT",
            OpCode::Return => "OP_RETURN",
        }
    }

    /// Number of operand bytes following the opcode.
    pub fn operand_width(self) -> usize {
        match self {
            OpCode::Constant
            | OpCode::DefineGlobal
            | OpCode::GetGlobal
            | OpCode::SetGlobal
            | OpCode::GetLocal
            | OpCode::SetLocal => 1,
            OpCode::ConstantLong
            | OpCode::DefineGlobalLong
            | OpCode::GetGlobalLong
            | OpCode::SetGlobalLong
            | OpCode::GetLocalLong
            | OpCode::SetLocalLong => 3,
            _ => 0,
        }
    }

    /// Whether the operand indexes the constant pool (as opposed to a stack slot).
    pub fn reads_constant(self) -> bool {
        matches!(
            self,
            OpCode::Constant
                | OpCode::ConstantLong
                | OpCode::DefineGlobal
                | OpCode::DefineGlobalLong
                | OpCode::GetGlobal
                | OpCode::GetGlobalLong
                | OpCode::SetGlobal
                | OpCode::SetGlobalLong
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_roundtrip_covers_every_opcode() {
        for (i, op) in ALL.iter().enumerate() {
            assert_eq!(*op as u8, i as u8);
            assert_eq!(OpCode::try_from(i as u8), Ok(*op));
        }
    }

    #[test]
    fn unknown_byte_is_rejected() {
        assert_eq!(OpCode::try_from(200), Err(UnknownOpcode(200)));
        assert_eq!(OpCode::try_from(ALL.len() as u8), Err(UnknownOpcode(ALL.len() as u8)));
    }

    #[test]
    fn long_variants_are_three_bytes() {
        assert_eq!(OpCode::Constant.operand_width(), 1);
        assert_eq!(OpCode::ConstantLong.operand_width(), 3);
        assert_eq!(OpCode::GetLocalLong.operand_width(), 3);
        assert_eq!(OpCode::Add.operand_width(), 0);
        assert!(OpCode::SetGlobalLong.reads_constant());
        assert!(!OpCode::SetLocal.reads_constant());
    }
}
