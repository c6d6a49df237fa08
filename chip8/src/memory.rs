//! Main memory.
use std::ops::Range;

use crate::{
    constants::*,
    error::{Chip8Error, Chip8Result},
};

/// Flat byte addressable storage holding the font and the loaded program.
#[derive(Clone)]
pub struct Memory {
    ram: Box<[u8; MEM_SIZE]>,
}

impl Default for Memory {
    fn default() -> Self {
        let mut memory = Self {
            ram: Box::new([0; MEM_SIZE]),
        };
        memory.load_font();
        memory
    }
}

impl Memory {
    /// Creates zeroed memory with the built-in font resident.
    pub fn new() -> Self {
        Default::default()
    }

    /// Erase the whole address space, including the font.
    pub(crate) fn clear(&mut self) {
        self.ram.fill(0);
    }

    pub(crate) fn load_font(&mut self) {
        let start = FONTSET_START as usize;
        self.ram[start..start + FONTSET_DATA_LENGTH].copy_from_slice(&FONTSET);
    }

    /// Copy the program into memory at `MEM_START`.
    ///
    /// Programs that don't fit are rejected outright, leaving memory untouched.
    pub(crate) fn load_program(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if bytecode.len() > MAX_PROGRAM_SIZE {
            return Err(Chip8Error::LargeProgram {
                size: bytecode.len(),
            });
        }

        self.ram[MEM_START..MEM_START + bytecode.len()].copy_from_slice(bytecode);

        Ok(())
    }

    /// Fetch the big-endian instruction word at the given address.
    #[inline]
    pub fn fetch(&self, address: usize) -> Option<u16> {
        let bytes = self.get(address..address + 2)?;
        Some(((bytes[0] as u16) << 8) | bytes[1] as u16)
    }

    #[inline]
    pub fn read(&self, address: usize) -> Option<u8> {
        self.ram.get(address).copied()
    }

    /// Borrow a range of memory, or `None` when any part of it is out of bounds.
    #[inline]
    pub fn get(&self, range: Range<usize>) -> Option<&[u8]> {
        self.ram.get(range)
    }

    #[inline]
    pub fn get_mut(&mut self, range: Range<usize>) -> Option<&mut [u8]> {
        self.ram.get_mut(range)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.ram[..]
    }
}
