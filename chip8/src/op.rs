//! Decoded instructions.
//!
//! Each 16-bit instruction word is split into nibbles and
//! decoded into an [`Op`] before it's executed.
use std::fmt::{self, Formatter};

use crate::constants::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum Op {
    /// 00E0 (CLS)
    ///
    /// Clear the screen.
    ClearScreen,
    /// 00EE (RET)
    ///
    /// Return from the sub-routine.
    Return,
    /// 1nnn (JP addr)
    ///
    /// Jump to the address in `nnn`.
    JumpAddress { address: Address },
    /// 2nnn (CALL addr)
    ///
    /// Call the sub-routine at address `nnn`.
    Call { address: Address },
    /// 3xnn (SE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` equals value `nn`
    Skip_Eq_Byte { vx: u8, nn: u8 },
    /// 4xnn (SNE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` does not equal value `nn`.
    Skip_NotEq_Byte { vx: u8, nn: u8 },
    /// 5xy0 (SE Vx, Vy)
    ///
    /// Skip the next instruction if register `Vx` equals register `Vy`.
    Skip_Eq { vx: u8, vy: u8 },
    /// 6xnn (LD Vx, byte)
    Load_Byte { vx: u8, nn: u8 },
    /// 7xnn (ADD Vx, byte)
    ///
    /// Add byte to the value in register `Vx`, store the result in `Vx`.
    /// Carry flag is not set.
    Add_Byte { vx: u8, nn: u8 },

    // ------------------------------------------------------------------------
    // Math
    /// 8xy0 (LD Vx, Vy)
    Load_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy1 (OR Vx, Vy)
    Or_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy2 (AND Vx, Vy)
    And_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy3 (XOR Vx, Vy)
    Xor_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy4 (ADD Vx, Vy)
    ///
    /// Overflow is wrapped. If overflowed, set VF to 1, else 0.
    Add_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy5 (SUB Vx, Vy)
    ///
    /// VF is set to 0 when there is a borrow, set to 1 when there isn't.
    Sub_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy6 (SHR Vx)
    ///
    /// VY is unused.
    ShiftRight { vx: u8 },
    /// 8xy7 (SUBN Vx, Vy)
    ///
    /// Subtracts VX from VY, and stores the result in VY.
    SubReverse_Vx_Vy { vx: u8, vy: u8 },
    /// 8xyE (SHL Vx)
    ///
    /// VY is unused.
    ShiftLeft { vx: u8 },
    /// 9xy0 (SNE Vx, Vy)
    Skip_NotEq { vx: u8, vy: u8 },

    /// Annn (LD I, addr)
    Load_Address { address: Address },
    /// Bnnn (JP V0, addr)
    Jump_V0 { address: Address },
    /// Cxnn (RND Vx, byte)
    Random { vx: u8, nn: u8 },
    /// Dxyn (DRW Vx, Vy, nibble)
    Draw { vx: u8, vy: u8, n: u8 },

    // ------------------------------------------------------------------------
    // Input
    /// Ex9E (SKP Vx)
    Skip_Key { vx: u8 },
    /// ExA1 (SKNP Vx)
    Skip_NotKey { vx: u8 },

    // ------------------------------------------------------------------------
    // Timers and memory
    /// Fx07 (LD Vx, DT)
    Load_Vx_Delay { vx: u8 },
    /// Fx0A (LD Vx, K)
    Wait_Key { vx: u8 },
    /// Fx15 (LD DT, Vx)
    Load_Delay_Vx { vx: u8 },
    /// Fx18 (LD ST, Vx)
    Load_Sound_Vx { vx: u8 },
    /// Fx1E (ADD I, Vx)
    Add_Address { vx: u8 },
    /// Fx29 (LD F, Vx)
    Load_Glyph { vx: u8 },
    /// Fx33 (LD B, Vx)
    Store_Bcd { vx: u8 },
    /// Fx55 (LD [I], Vx)
    Store_Registers { vx: u8 },
    /// Fx65 (LD Vx, [I])
    Load_Registers { vx: u8 },

    /// Bit pattern that doesn't map to any instruction.
    Unknown(u16),
}

impl Op {
    /// Decode an instruction word.
    ///
    /// Dispatches on the top nibble first, then on the
    /// secondary nibbles for the multi-variant families.
    #[inline]
    pub fn decode(code: u16) -> Op {
        let [a, b] = code.to_be_bytes();
        let op = a >> 4; // 0xF000
        let vx = a & 0xF; // 0x0F00
        let vy = b >> 4; // 0x00F0
        let n = b & 0xF; // 0x000F
        let nn = b; // 0x00FF
        let nnn = code & 0x0FFF; // 0x0FFF

        match op {
            0x0 => match code {
                0x00E0 => Op::ClearScreen,
                0x00EE => Op::Return,
                _ => Op::Unknown(code),
            },
            0x1 => Op::JumpAddress { address: nnn },
            0x2 => Op::Call { address: nnn },
            0x3 => Op::Skip_Eq_Byte { vx, nn },
            0x4 => Op::Skip_NotEq_Byte { vx, nn },
            0x5 => match n {
                0x0 => Op::Skip_Eq { vx, vy },
                _ => Op::Unknown(code),
            },
            0x6 => Op::Load_Byte { vx, nn },
            0x7 => Op::Add_Byte { vx, nn },
            // Arithmetic instructions indentified by n
            0x8 => match n {
                0x0 => Op::Load_Vx_Vy { vx, vy },
                0x1 => Op::Or_Vx_Vy { vx, vy },
                0x2 => Op::And_Vx_Vy { vx, vy },
                0x3 => Op::Xor_Vx_Vy { vx, vy },
                0x4 => Op::Add_Vx_Vy { vx, vy },
                0x5 => Op::Sub_Vx_Vy { vx, vy },
                0x6 => Op::ShiftRight { vx },
                0x7 => Op::SubReverse_Vx_Vy { vx, vy },
                0xE => Op::ShiftLeft { vx },
                _ => Op::Unknown(code),
            },
            0x9 => match n {
                0x0 => Op::Skip_NotEq { vx, vy },
                _ => Op::Unknown(code),
            },
            0xA => Op::Load_Address { address: nnn },
            0xB => Op::Jump_V0 { address: nnn },
            0xC => Op::Random { vx, nn },
            0xD => Op::Draw { vx, vy, n },
            // Keyboard instructions identified by nn
            0xE => match nn {
                0x9E => Op::Skip_Key { vx },
                0xA1 => Op::Skip_NotKey { vx },
                _ => Op::Unknown(code),
            },
            // Miscellaneous instructions identified by nn
            0xF => match nn {
                0x07 => Op::Load_Vx_Delay { vx },
                0x0A => Op::Wait_Key { vx },
                0x15 => Op::Load_Delay_Vx { vx },
                0x18 => Op::Load_Sound_Vx { vx },
                0x1E => Op::Add_Address { vx },
                0x29 => Op::Load_Glyph { vx },
                0x33 => Op::Store_Bcd { vx },
                0x55 => Op::Store_Registers { vx },
                0x65 => Op::Load_Registers { vx },
                _ => Op::Unknown(code),
            },
            _ => unreachable!("opcode is a nibble"),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Op::ClearScreen => write!(f, "CLS"),
            Op::Return => write!(f, "RET"),
            Op::JumpAddress { address } => write!(f, "JP 0x{address:03X}"),
            Op::Call { address } => write!(f, "CALL 0x{address:03X}"),
            Op::Skip_Eq_Byte { vx, nn } => write!(f, "SE v{vx:x}, {nn}"),
            Op::Skip_NotEq_Byte { vx, nn } => write!(f, "SNE v{vx:x}, {nn}"),
            Op::Skip_Eq { vx, vy } => write!(f, "SE v{vx:x}, v{vy:x}"),
            Op::Load_Byte { vx, nn } => write!(f, "LD v{vx:x}, {nn}"),
            Op::Add_Byte { vx, nn } => write!(f, "ADD v{vx:x}, {nn}"),
            // ------
            Op::Load_Vx_Vy { vx, vy } => write!(f, "LD v{vx:x}, v{vy:x}"),
            Op::Or_Vx_Vy { vx, vy } => write!(f, "OR v{vx:x}, v{vy:x}"),
            Op::And_Vx_Vy { vx, vy } => write!(f, "AND v{vx:x}, v{vy:x}"),
            Op::Xor_Vx_Vy { vx, vy } => write!(f, "XOR v{vx:x}, v{vy:x}"),
            Op::Add_Vx_Vy { vx, vy } => write!(f, "ADD v{vx:x}, v{vy:x}"),
            Op::Sub_Vx_Vy { vx, vy } => write!(f, "SUB v{vx:x}, v{vy:x}"),
            Op::ShiftRight { vx } => write!(f, "SHR v{vx:x}"),
            Op::SubReverse_Vx_Vy { vx, vy } => write!(f, "SUBN v{vx:x}, v{vy:x}"),
            Op::ShiftLeft { vx } => write!(f, "SHL v{vx:x}"),
            Op::Skip_NotEq { vx, vy } => write!(f, "SNE v{vx:x}, v{vy:x}"),
            // ------
            Op::Load_Address { address } => write!(f, "LD I, 0x{address:03X}"),
            Op::Jump_V0 { address } => write!(f, "JP v0, 0x{address:03X}"),
            Op::Random { vx, nn } => write!(f, "RND v{vx:x}, {nn}"),
            Op::Draw { vx, vy, n } => write!(f, "DRW v{vx:x}, v{vy:x}, {n}"),
            // ------
            Op::Skip_Key { vx } => write!(f, "SKP v{vx:x}"),
            Op::Skip_NotKey { vx } => write!(f, "SKNP v{vx:x}"),
            // ------
            Op::Load_Vx_Delay { vx } => write!(f, "LD v{vx:x}, DT"),
            Op::Wait_Key { vx } => write!(f, "LD v{vx:x}, K"),
            Op::Load_Delay_Vx { vx } => write!(f, "LD DT, v{vx:x}"),
            Op::Load_Sound_Vx { vx } => write!(f, "LD ST, v{vx:x}"),
            Op::Add_Address { vx } => write!(f, "ADD I, v{vx:x}"),
            Op::Load_Glyph { vx } => write!(f, "LD F, v{vx:x}"),
            Op::Store_Bcd { vx } => write!(f, "LD B, v{vx:x}"),
            Op::Store_Registers { vx } => write!(f, "LD [I], v{vx:x}"),
            Op::Load_Registers { vx } => write!(f, "LD v{vx:x}, [I]"),
            Op::Unknown(code) => write!(f, "0x{code:04X}"),
        }
    }
}
