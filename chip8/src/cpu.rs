//! CPU register file and call stack.
use crate::{
    constants::*,
    error::{Chip8Error, Chip8Result},
};

/// Register state for a chip8 interpreter.
#[derive(Debug, Clone)]
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the current position in the bytecode.
    pub(crate) pc: Address,
    /// Stack pointer, indicating the next free slot of the stack.
    pub(crate) sp: usize,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register used for temporarily storing an address.
    ///
    /// It is 16 bits wide and may hold values past the end of memory.
    /// Accesses through it are bounds checked.
    pub(crate) address: Address,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: [Address; STACK_SIZE],
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        Self {
            pc: MEM_START as Address,
            sp: 0,
            registers: [0; REGISTER_COUNT],
            address: 0,
            stack: [0; STACK_SIZE],
        }
    }
}

impl Chip8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    #[inline(always)]
    pub fn pc(&self) -> Address {
        self.pc
    }

    #[inline(always)]
    pub fn sp(&self) -> usize {
        self.sp
    }

    #[inline(always)]
    pub fn address(&self) -> Address {
        self.address
    }

    #[inline(always)]
    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.registers
    }

    /// Value of register `Vx`. Only the lower nibble of `x` is used.
    #[inline(always)]
    pub fn v(&self, x: u8) -> u8 {
        self.registers[x as usize & 0xF]
    }

    #[inline(always)]
    pub(crate) fn set_v(&mut self, x: u8, value: u8) {
        self.registers[x as usize & 0xF] = value;
    }

    #[inline(always)]
    pub(crate) fn set_flag(&mut self, value: bool) {
        self.registers[FLAG_REGISTER] = value as u8;
    }

    /// Push the current program counter and jump to the subroutine.
    pub(crate) fn call(&mut self, target: Address) -> Chip8Result<()> {
        if self.sp >= STACK_SIZE {
            return Err(Chip8Error::StackOverflow { pc: self.pc });
        }

        self.stack[self.sp] = self.pc;
        self.sp += 1;
        self.pc = target;

        Ok(())
    }

    /// Pop the return address and continue at the instruction after the call site.
    pub(crate) fn ret(&mut self) -> Chip8Result<()> {
        let sp = self
            .sp
            .checked_sub(1)
            .ok_or(Chip8Error::StackUnderflow { pc: self.pc })?;

        self.sp = sp;
        self.pc = self.stack[sp].wrapping_add(2);

        Ok(())
    }
}
