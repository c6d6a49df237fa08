//! Result and errors.
use std::{
    fmt::{self, Display, Formatter},
    io,
};

use crate::constants::{Address, MAX_PROGRAM_SIZE};

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

/// Faults raised by the virtual machine.
///
/// Runtime faults carry the program counter of the offending
/// instruction. The machine state is left as it was before the
/// instruction, so the caller may inspect it or carry on.
#[derive(Debug)]
pub enum Chip8Error {
    /// `CALL` issued with a full call stack.
    StackOverflow { pc: Address },
    /// `RET` issued with an empty call stack.
    StackUnderflow { pc: Address },
    /// Memory access outside of the addressable space.
    Address { pc: Address, address: usize },
    /// Sprite pixel drawn outside of the display.
    PixelOutOfBounds { pc: Address, x: usize, y: usize },
    /// Keypad lookup with a register value that is not a key.
    InvalidKey { pc: Address, key: u8 },
    /// Attempt to load a bytecode program that can't fit in memory.
    LargeProgram { size: usize },
    Io(io::Error),
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackOverflow { pc } => write!(f, "call stack overflow at 0x{pc:03X}"),
            Self::StackUnderflow { pc } => write!(f, "call stack underflow at 0x{pc:03X}"),
            Self::Address { pc, address } => {
                write!(f, "address 0x{address:X} out of bounds at 0x{pc:03X}")
            }
            Self::PixelOutOfBounds { pc, x, y } => {
                write!(f, "pixel ({x}, {y}) outside of display at 0x{pc:03X}")
            }
            Self::InvalidKey { pc, key } => write!(f, "invalid key 0x{key:X} at 0x{pc:03X}"),
            Self::LargeProgram { size } => write!(
                f,
                "program too large for VM memory: {size} bytes, maximum is {MAX_PROGRAM_SIZE}"
            ),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Chip8Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Chip8Error {
    fn from(err: io::Error) -> Self {
        Chip8Error::Io(err)
    }
}
