//! Instruction set

/// A decoded instruction. PUSH/DUP/SWAP/LOG carry their width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Opcode {
    // Stop and arithmetic
    Stop,
    Add,
    Mul,
    Sub,
    Div,
    SDiv,
    Mod,
    SMod,
    AddMod,
    MulMod,
    Exp,
    SignExtend,

    // Comparison and bitwise logic
    Lt,
    Gt,
    SLt,
    SGt,
    Eq,
    IsZero,
    And,
    Or,
    Xor,
    Not,
    Byte,
    Shl,
    Shr,
    Sar,

    Keccak256,

    // Environment
    Address,
    Balance,
    Origin,
    Caller,
    CallValue,
    CallDataLoad,
    CallDataSize,
    CallDataCopy,
    CodeSize,
    CodeCopy,
    GasPrice,
    ExtCodeSize,
    ExtCodeCopy,
    ReturnDataSize,
    ReturnDataCopy,
    ExtCodeHash,

    // Block
    BlockHash,
    Coinbase,
    Timestamp,
    Number,
    PrevRandao,
    GasLimit,
    ChainId,
    SelfBalance,
    BaseFee,

    // Stack, memory, storage and flow
    Pop,
    MLoad,
    MStore,
    MStore8,
    SLoad,
    SStore,
    Jump,
    JumpI,
    Pc,
    MSize,
    Gas,
    JumpDest,

    /// PUSH0..PUSH32, carrying the immediate width
    Push(u8),
    /// DUP1..DUP16
    Dup(u8),
    /// SWAP1..SWAP16
    Swap(u8),
    /// LOG0..LOG4, carrying the topic count
    Log(u8),

    // System
    Create,
    Call,
    CallCode,
    Return,
    DelegateCall,
    Create2,
    StaticCall,
    Revert,
    Invalid,
    SelfDestruct,
}

/// Raw byte of JUMPDEST, used by jump analysis
pub const JUMPDEST: u8 = 0x5b;

impl Opcode {
    /// Decode a byte; `None` for undefined opcodes.
    pub fn from_byte(byte: u8) -> Option<Self> {
        use Opcode::*;
        let op = match byte {
            0x00 => Stop,
            0x01 => Add,
            0x02 => Mul,
            0x03 => Sub,
            0x04 => Div,
            0x05 => SDiv,
            0x06 => Mod,
            0x07 => SMod,
            0x08 => AddMod,
            0x09 => MulMod,
            0x0a => Exp,
            0x0b => SignExtend,
            0x10 => Lt,
            0x11 => Gt,
            0x12 => SLt,
            0x13 => SGt,
            0x14 => Eq,
            0x15 => IsZero,
            0x16 => And,
            0x17 => Or,
            0x18 => Xor,
            0x19 => Not,
            0x1a => Byte,
            0x1b => Shl,
            0x1c => Shr,
            0x1d => Sar,
            0x20 => Keccak256,
            0x30 => Address,
            0x31 => Balance,
            0x32 => Origin,
            0x33 => Caller,
            0x34 => CallValue,
            0x35 => CallDataLoad,
            0x36 => CallDataSize,
            0x37 => CallDataCopy,
            0x38 => CodeSize,
            0x39 => CodeCopy,
            0x3a => GasPrice,
            0x3b => ExtCodeSize,
            0x3c => ExtCodeCopy,
            0x3d => ReturnDataSize,
            0x3e => ReturnDataCopy,
            0x3f => ExtCodeHash,
            0x40 => BlockHash,
            0x41 => Coinbase,
            0x42 => Timestamp,
            0x43 => Number,
            0x44 => PrevRandao,
            0x45 => GasLimit,
            0x46 => ChainId,
            0x47 => SelfBalance,
            0x48 => BaseFee,
            0x50 => Pop,
            0x51 => MLoad,
            0x52 => MStore,
            0x53 => MStore8,
            0x54 => SLoad,
            0x55 => SStore,
            0x56 => Jump,
            0x57 => JumpI,
            0x58 => Pc,
            0x59 => MSize,
            0x5a => Gas,
            JUMPDEST => JumpDest,
            0x5f..=0x7f => Push(byte - 0x5f),
            0x80..=0x8f => Dup(byte - 0x7f),
            0x90..=0x9f => Swap(byte - 0x8f),
            0xa0..=0xa4 => Log(byte - 0xa0),
            0xf0 => Create,
            0xf1 => Call,
            0xf2 => CallCode,
            0xf3 => Return,
            0xf4 => DelegateCall,
            0xf5 => Create2,
            0xfa => StaticCall,
            0xfd => Revert,
            0xfe => Invalid,
            0xff => SelfDestruct,
            _ => return None,
        };
        Some(op)
    }

    /// Number of immediate bytes following the opcode in code.
    pub fn immediate_size(self) -> usize {
        match self {
            Opcode::Push(n) => n as usize,
            _ => 0,
        }
    }

    /// `(items popped, items pushed)`, checked before the handler runs.
    pub fn stack_io(self) -> (usize, usize) {
        use Opcode::*;
        match self {
            Stop | JumpDest | Invalid => (0, 0),

            Add | Mul | Sub | Div | SDiv | Mod | SMod | Exp | SignExtend | Lt | Gt | SLt
            | SGt | Eq | And | Or | Xor | Byte | Shl | Shr | Sar | Keccak256 => (2, 1),
            AddMod | MulMod => (3, 1),
            IsZero | Not => (1, 1),

            Address | Origin | Caller | CallValue | CallDataSize | CodeSize | GasPrice
            | ReturnDataSize | Coinbase | Timestamp | Number | PrevRandao | GasLimit
            | ChainId | SelfBalance | BaseFee | Pc | MSize | Gas | Push(_) => (0, 1),

            Balance | CallDataLoad | ExtCodeSize | ExtCodeHash | BlockHash | MLoad | SLoad => {
                (1, 1)
            }
            CallDataCopy | CodeCopy | ReturnDataCopy => (3, 0),
            ExtCodeCopy => (4, 0),

            Pop | Jump | SelfDestruct => (1, 0),
            MStore | MStore8 | SStore | JumpI | Return | Revert => (2, 0),

            Dup(n) => (n as usize, n as usize + 1),
            Swap(n) => (n as usize + 1, n as usize + 1),
            Log(n) => (n as usize + 2, 0),

            Create => (3, 1),
            Create2 => (4, 1),
            Call | CallCode => (7, 1),
            DelegateCall | StaticCall => (6, 1),
        }
    }

    /// Opcodes that always modify state and are refused inside static frames.
    /// CALL with value is handled separately since it depends on an operand.
    pub fn is_state_write(self) -> bool {
        matches!(
            self,
            Opcode::SStore | Opcode::Log(_) | Opcode::Create | Opcode::Create2 | Opcode::SelfDestruct
        )
    }
}
