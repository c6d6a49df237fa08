mod clock;
pub mod constants;
mod cpu;
mod display;
mod error;
mod keypad;
mod memory;
mod op;
mod timer;
mod vm;

pub use self::{
    cpu::Chip8Cpu,
    display::{Display, OutOfBounds},
    error::{Chip8Error, Chip8Result},
    keypad::{InvalidKeyCode, KeyCode, Keypad},
    memory::Memory,
    op::Op,
    timer::Timers,
    vm::Hz,
};

pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        error::{Chip8Error, Chip8Result},
        keypad::KeyCode,
        vm::{Chip8Conf, Chip8Vm, CpuState, Flow},
    };
}
