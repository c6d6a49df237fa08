//! Virtual machine.
use std::{
    fmt::{self, Write},
    time::Duration,
};

use log::{debug, info, trace, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    clock::Clock,
    constants::*,
    cpu::Chip8Cpu,
    display::{Display, OutOfBounds},
    error::{Chip8Error, Chip8Result},
    keypad::{KeyCode, Keypad},
    memory::Memory,
    op::Op,
    timer::Timers,
};

/// Chip-8 virtual machine.
///
/// Owns all machine state. The driver calls [`Chip8Vm::execute_cycle`]
/// or [`Chip8Vm::advance`] in a loop, feeds key state in between calls
/// and reads back the display when [`Chip8Vm::take_redraw`] is set.
pub struct Chip8Vm {
    cpu: Chip8Cpu,
    memory: Memory,
    display: Display,
    keypad: Keypad,
    timers: Timers,
    state: CpuState,
    /// Instruction clock.
    clock: Clock,
    /// Delay and sound timer clock.
    timer: Clock,
    rng: StdRng,
    /// Number of instructions executed since the program was loaded.
    loop_counter: usize,
    /// Display buffer has changed since it was last consumed.
    redraw: bool,
    /// Sound timer expired since the tone was last consumed.
    tone: bool,
    conf: Chip8Conf,
}

impl Chip8Vm {
    pub fn new(conf: Chip8Conf) -> Self {
        Chip8Vm {
            cpu: Chip8Cpu::new(),
            memory: Memory::new(),
            display: Display::new(),
            keypad: Keypad::new(),
            timers: Timers::new(),
            state: CpuState::Fetching,
            clock: Clock::new(conf.clock_frequency.into()),
            timer: Clock::new(conf.timer_frequency.into()),
            rng: conf.rng(),
            loop_counter: 0,
            redraw: false,
            tone: false,
            conf,
        }
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    /// Load a program into memory at `MEM_START` and reset the machine.
    ///
    /// Programs larger than `MAX_PROGRAM_SIZE` are rejected and leave
    /// the machine untouched.
    pub fn load_bytecode(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if bytecode.len() > MAX_PROGRAM_SIZE {
            return Err(Chip8Error::LargeProgram {
                size: bytecode.len(),
            });
        }

        // Start with clean memory to avoid leaking previous program.
        self.memory.clear();

        // Reset fonts
        self.memory.load_font();

        // Load program into virtual RAM
        self.memory.load_program(bytecode)?;

        self.reset();

        debug!("loaded program of {} bytes", bytecode.len());

        Ok(())
    }

    /// Clear internal state in preparation for a fresh startup.
    fn reset(&mut self) {
        self.cpu = Chip8Cpu::new();
        self.display.clear();
        self.keypad.clear();
        self.timers = Timers::new();
        self.state = CpuState::Fetching;
        self.clock.reset();
        self.timer.reset();
        self.rng = self.conf.rng();
        self.loop_counter = 0;
        self.redraw = false;
        self.tone = false;
    }

    pub fn cpu(&self) -> &Chip8Cpu {
        &self.cpu
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn state(&self) -> CpuState {
        self.state
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn display_buffer(&self) -> &[bool; DISPLAY_BUFFER_SIZE] {
        self.display.buffer()
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    /// Number of instructions executed since the program was loaded.
    ///
    /// Polls of a pending key wait are counted too.
    pub fn cycle_count(&self) -> usize {
        self.loop_counter
    }

    /// Consume the redraw signal.
    ///
    /// Returns `true` if the display changed since the last call.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }

    /// Consume the tone request signal.
    pub fn take_tone(&mut self) -> bool {
        std::mem::take(&mut self.tone)
    }
}

/// Control flow outcome of a single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Ok,
    /// Program counter has jumped to a new address.
    ///
    /// This is useful for the caller to avoid being
    /// blocked on infinite or long running loops.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// Display buffer was changed.
    Draw,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    KeyWait,
    /// Instruction word was not recognised and skipped.
    Unknown(u16),
}

/// Fetch state of the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    /// Next cycle fetches the instruction at the program counter.
    Fetching,
    /// Stalled on `Fx0A` until any key is pressed.
    AwaitingKey { vx: u8 },
}

/// VM Configuration Parameters.
#[derive(Debug, Clone)]
pub struct Chip8Conf {
    /// Instructions executed per second by [`Chip8Vm::advance`].
    pub clock_frequency: Hz,
    /// Timer count downs per second by [`Chip8Vm::advance`].
    pub timer_frequency: Hz,
    /// Seed for the random number generator. Seeded from entropy when `None`.
    pub seed: Option<u64>,
}

impl Default for Chip8Conf {
    fn default() -> Self {
        Self {
            clock_frequency: Hz(CLOCK_FREQUENCY),
            timer_frequency: Hz(DELAY_FREQUENCY),
            seed: None,
        }
    }
}

impl Chip8Conf {
    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// CPU clock frequency, in hertz (per second)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Hz(pub u64);

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}

/// Interpreter
impl Chip8Vm {
    /// Sets the keyboard key input state.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        self.keypad.set(key, pressed);
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.keypad.clear()
    }

    /// Execute one instruction, then count down the timers once.
    ///
    /// Timers run at whatever rate the caller invokes this. Use
    /// [`Chip8Vm::advance`] to run timers at their own rate.
    ///
    /// On a fault the machine is left as it was before the cycle.
    pub fn execute_cycle(&mut self) -> Chip8Result<Flow> {
        let flow = self.step()?;
        self.tick_timers();
        Ok(flow)
    }

    /// Run the machine for the given amount of wall-clock time.
    ///
    /// Instructions and timers are driven by two independent clocks,
    /// at `clock_frequency` and `timer_frequency` respectively.
    /// Returns the flow of the last executed instruction.
    pub fn advance(&mut self, elapsed: Duration) -> Chip8Result<Flow> {
        for _ in 0..self.timer.advance(elapsed) {
            self.tick_timers();
        }

        let mut flow = Flow::Ok;

        for _ in 0..self.clock.advance(elapsed) {
            flow = self.step()?;

            if flow == Flow::KeyWait {
                // Nothing else can run until the input producer presses a key.
                break;
            }
        }

        Ok(flow)
    }

    /// Run the given number of cycles, stopping at the first fault.
    pub fn run_steps(&mut self, step_count: usize) -> Chip8Result<Flow> {
        let mut flow = Flow::Ok;

        for _ in 0..step_count {
            flow = self.execute_cycle()?;
        }

        Ok(flow)
    }

    /// Count down the delay and sound timers once.
    ///
    /// Returns `true` when the sound timer expired and a tone was requested.
    pub fn tick_timers(&mut self) -> bool {
        let tone = self.timers.tick();
        if tone {
            info!("tone requested");
            self.tone = true;
        }
        tone
    }

    /// Fetch, decode and execute one instruction. Timers are not touched.
    pub fn step(&mut self) -> Chip8Result<Flow> {
        if let CpuState::AwaitingKey { vx } = self.state {
            self.loop_counter += 1;
            return Ok(self.poll_key(vx));
        }

        let pc = self.cpu.pc;

        // Each instruction is two bytes, with the opcode identity in the first 4-bit nibble.
        let code = self
            .memory
            .fetch(pc as usize)
            .ok_or_else(|| self.address_fault(pc as usize))?;

        let op = Op::decode(code);
        trace!("{pc:04X}: {op}");

        let flow = self.exec(op)?;
        self.loop_counter += 1;

        Ok(flow)
    }

    /// Retry the key wait of `Fx0A`.
    fn poll_key(&mut self, vx: u8) -> Flow {
        match self.keypad.first_key() {
            Some(key) => {
                self.cpu.set_v(vx, key.as_u8());
                self.cpu.pc = self.cpu.pc.wrapping_add(2);
                self.state = CpuState::Fetching;
                Flow::Ok
            }
            None => {
                self.state = CpuState::AwaitingKey { vx };
                Flow::KeyWait
            }
        }
    }

    /// Fault for a memory access starting at `start` that runs past the end of memory.
    fn address_fault(&self, start: usize) -> Chip8Error {
        Chip8Error::Address {
            pc: self.cpu.pc,
            address: start.max(MEM_SIZE),
        }
    }

    fn key(&self, vx: u8) -> Chip8Result<KeyCode> {
        let key = self.cpu.v(vx);
        KeyCode::try_from(key).map_err(|_| Chip8Error::InvalidKey {
            pc: self.cpu.pc,
            key,
        })
    }

    /// Execute a decoded instruction.
    ///
    /// Every check that can fault happens before any state is written.
    fn exec(&mut self, op: Op) -> Chip8Result<Flow> {
        let next = self.cpu.pc.wrapping_add(2);
        let skip = self.cpu.pc.wrapping_add(4);

        let mut control_flow = Flow::Ok;

        match op {
            // 00E0 (CLS)
            //
            // Clear display
            Op::ClearScreen => {
                self.display.clear();
                self.redraw = true;
                self.cpu.pc = next;
                control_flow = Flow::Draw;
            }
            // 00EE (RET)
            //
            // Return from a subroutine.
            // Pop the call site from the stack and continue after it.
            Op::Return => {
                self.cpu.ret()?;
                control_flow = Flow::Jump;
            }
            // 1NNN (JP addr)
            //
            // Jump to address.
            Op::JumpAddress { address } => {
                self.cpu.pc = address;
                control_flow = Flow::Jump;
            }
            // 2NNN (CALL addr)
            //
            // Call subroutine at NNN.
            Op::Call { address } => {
                self.cpu.call(address)?;
                control_flow = Flow::Jump;
            }
            // 3XNN (SE Vx, byte)
            //
            // Skip the next instruction if register VX equals value NN.
            Op::Skip_Eq_Byte { vx, nn } => {
                self.cpu.pc = if self.cpu.v(vx) == nn { skip } else { next };
            }
            // 4XNN (SNE Vx, byte)
            //
            // Skip the next instruction if register VX does not equal value NN.
            Op::Skip_NotEq_Byte { vx, nn } => {
                self.cpu.pc = if self.cpu.v(vx) != nn { skip } else { next };
            }
            // 5XY0 (SE Vx, Vy)
            //
            // Skip the next instruction if register VX equals value VY.
            Op::Skip_Eq { vx, vy } => {
                self.cpu.pc = if self.cpu.v(vx) == self.cpu.v(vy) {
                    skip
                } else {
                    next
                };
            }
            // 6XNN (LD Vx, byte)
            //
            // Set register VX to value NN.
            Op::Load_Byte { vx, nn } => {
                self.cpu.set_v(vx, nn);
                self.cpu.pc = next;
            }
            // 7XNN (ADD Vx, byte)
            //
            // Add value NN to register VX. Carry flag is not set.
            Op::Add_Byte { vx, nn } => {
                self.cpu.set_v(vx, self.cpu.v(vx).wrapping_add(nn));
                self.cpu.pc = next;
            }
            // Arithmetic instructions
            Op::Load_Vx_Vy { .. }
            | Op::Or_Vx_Vy { .. }
            | Op::And_Vx_Vy { .. }
            | Op::Xor_Vx_Vy { .. }
            | Op::Add_Vx_Vy { .. }
            | Op::Sub_Vx_Vy { .. }
            | Op::ShiftRight { .. }
            | Op::SubReverse_Vx_Vy { .. }
            | Op::ShiftLeft { .. } => {
                self.exec_math(op);
                self.cpu.pc = next;
            }
            // 9XY0 (SNE Vx, Vy)
            //
            // Skip next instruction if Vx != Vy.
            Op::Skip_NotEq { vx, vy } => {
                self.cpu.pc = if self.cpu.v(vx) != self.cpu.v(vy) {
                    skip
                } else {
                    next
                };
            }
            // ANNN (LD I, addr)
            //
            // Set address register I to value NNN.
            Op::Load_Address { address } => {
                self.cpu.address = address;
                self.cpu.pc = next;
            }
            // BNNN (JP V0, addr)
            //
            // Jump to address NNN plus V0.
            Op::Jump_V0 { address } => {
                self.cpu.pc = address + self.cpu.v(0) as Address;
                control_flow = Flow::Jump;
            }
            // CXNN (RND Vx, byte)
            //
            // Set register VX to the result of bitwise AND between a random number and NN.
            Op::Random { vx, nn } => {
                self.cpu.set_v(vx, nn & self.rng.gen::<u8>());
                self.cpu.pc = next;
            }
            // DXYN (DRW Vx, Vy, nibble)
            //
            // Draw sprite to the display buffer, at coordinate as per registers Vx and Vy.
            // Sprite is encoded as 8 pixels wide, N pixels high, stored in bits located in
            // memory pointed to by address register I.
            //
            // Sprites are not wrapped. Drawing a set pixel outside of the display is a fault.
            //
            // If the drawing operation erases existing pixels in the display buffer, register VF is set to
            // 1, and set to 0 if no display bits are unset. This is used for collision detection.
            Op::Draw { vx, vy, n } => {
                let start = self.cpu.address as usize;
                let end = start + n as usize;
                let sprite = match self.memory.get(start..end) {
                    Some(sprite) => sprite,
                    None => return Err(self.address_fault(start)),
                };

                let (x, y) = (self.cpu.v(vx) as usize, self.cpu.v(vy) as usize);
                let is_erased = match self.display.draw_sprite(x, y, sprite) {
                    Ok(is_erased) => is_erased,
                    Err(OutOfBounds { x, y }) => {
                        return Err(Chip8Error::PixelOutOfBounds {
                            pc: self.cpu.pc,
                            x,
                            y,
                        })
                    }
                };

                // If a pixel was erased, then a collision occurred.
                self.cpu.set_flag(is_erased);
                self.redraw = true;
                self.cpu.pc = next;
                control_flow = Flow::Draw;
            }
            // ----------------------------------------------------------------
            // Ex9E (SKP Vx)
            //
            // Skip next instruction if the key with the value of Vx is pressed.
            Op::Skip_Key { vx } => {
                let key = self.key(vx)?;
                self.cpu.pc = if self.keypad.is_pressed(key) {
                    skip
                } else {
                    next
                };
            }
            // ExA1 (SKNP Vx)
            //
            // Skip next instruction if the key with the value of Vx is not pressed.
            Op::Skip_NotKey { vx } => {
                let key = self.key(vx)?;
                self.cpu.pc = if !self.keypad.is_pressed(key) {
                    skip
                } else {
                    next
                };
            }
            // ----------------------------------------------------------------
            // Fx0A (LD Vx, K)
            //
            // Wait for a key press, store the value of the key in Vx.
            // The program counter stays on this instruction until a key is pressed.
            Op::Wait_Key { vx } => {
                control_flow = self.poll_key(vx);
            }
            Op::Load_Vx_Delay { .. }
            | Op::Load_Delay_Vx { .. }
            | Op::Load_Sound_Vx { .. }
            | Op::Add_Address { .. }
            | Op::Load_Glyph { .. }
            | Op::Store_Bcd { .. }
            | Op::Store_Registers { .. }
            | Op::Load_Registers { .. } => {
                self.exec_misc(op)?;
                self.cpu.pc = next;
            }
            // Unsupported operation.
            Op::Unknown(code) => {
                warn!("unknown opcode 0x{code:04X} at 0x{:03X}", self.cpu.pc);
                self.cpu.pc = next;
                control_flow = Flow::Unknown(code);
            }
        }

        Ok(control_flow)
    }

    /// Execute an arithmetic instruction
    ///
    /// The flag is written after the result, so VF always
    /// holds the flag even when it is also the operand.
    #[inline]
    fn exec_math(&mut self, op: Op) {
        match op {
            // 8XY0 (LD Vx, Vy)
            //
            // Store the value of register VY in register VX.
            Op::Load_Vx_Vy { vx, vy } => {
                self.cpu.set_v(vx, self.cpu.v(vy));
            }
            // 8XY1 (OR Vx, Vy)
            //
            // Performs bitwise OR on VX and VY, and stores the result in VX.
            Op::Or_Vx_Vy { vx, vy } => {
                self.cpu.set_v(vx, self.cpu.v(vx) | self.cpu.v(vy));
            }
            // 8XY2 (AND Vx, Vy)
            //
            // Performs bitwise AND on VX and VY, and stores the result in VX.
            Op::And_Vx_Vy { vx, vy } => {
                self.cpu.set_v(vx, self.cpu.v(vx) & self.cpu.v(vy));
            }
            // 8XY3 (XOR Vx, Vy)
            //
            // Performs bitwise XOR on VX and VY, and stores the result in VX.
            Op::Xor_Vx_Vy { vx, vy } => {
                self.cpu.set_v(vx, self.cpu.v(vx) ^ self.cpu.v(vy));
            }
            // 8XY4 (ADD Vx, Vy)
            //
            // ADDs VX to VY, and stores the result in VX.
            // Overflow is wrapped.
            // If overflow, set VF to 1, else 0.
            Op::Add_Vx_Vy { vx, vy } => {
                let (result, carry) = self.cpu.v(vx).overflowing_add(self.cpu.v(vy));
                self.cpu.set_v(vx, result);
                self.cpu.set_flag(carry);
            }
            // 8XY5 (SUB Vx, Vy)
            //
            // Subtracts VY from VX, and stores the result in VX.
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            Op::Sub_Vx_Vy { vx, vy } => {
                let (x, y) = (self.cpu.v(vx), self.cpu.v(vy));
                self.cpu.set_v(vx, x.wrapping_sub(y));
                self.cpu.set_flag(y <= x);
            }
            // 8XY6 (SHR Vx)
            //
            // VF is set to the least-significant bit of Vx before the shift.
            // Shift VX right by 1.
            Op::ShiftRight { vx } => {
                let x = self.cpu.v(vx);
                self.cpu.set_v(vx, x >> 1);
                self.cpu.set_flag(x & 1 != 0);
            }
            // 8XY7 (SUBN Vx, Vy)
            //
            // Subtracts VX from VY, and stores the result in VY.
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            Op::SubReverse_Vx_Vy { vx, vy } => {
                let (x, y) = (self.cpu.v(vx), self.cpu.v(vy));
                self.cpu.set_v(vy, y.wrapping_sub(x));
                self.cpu.set_flag(x <= y);
            }
            // 8XYE (SHL Vx)
            //
            // VF is set to the most-significant bit of Vx before the shift.
            // Shift VX left by 1.
            Op::ShiftLeft { vx } => {
                let x = self.cpu.v(vx);
                self.cpu.set_v(vx, x << 1);
                self.cpu.set_flag(x & 0x80 != 0);
            }
            _ => unreachable!("not an arithmetic instruction: {op}"),
        }
    }

    /// Execute a timer or memory instruction
    #[inline]
    fn exec_misc(&mut self, op: Op) -> Chip8Result<()> {
        match op {
            // Fx07 (LD Vx, DT)
            //
            // Set Vx = delay timer value.
            Op::Load_Vx_Delay { vx } => {
                self.cpu.set_v(vx, self.timers.delay);
            }
            // Fx15 (LD DT, Vx)
            //
            // Set delay timer = Vx.
            Op::Load_Delay_Vx { vx } => {
                self.timers.delay = self.cpu.v(vx);
            }
            // Fx18 (LD ST, Vx)
            //
            // Set sound timer = Vx.
            Op::Load_Sound_Vx { vx } => {
                self.timers.sound = self.cpu.v(vx);
            }
            // Fx1E (ADD I, Vx)
            //
            // Add Vx to I
            Op::Add_Address { vx } => {
                self.cpu.address = self.cpu.address.wrapping_add(self.cpu.v(vx) as Address);
            }
            // Fx29 (LD F, Vx)
            //
            // Set I = location of sprite for digit Vx.
            Op::Load_Glyph { vx } => {
                let x = self.cpu.v(vx) as Address;
                self.cpu.address = FONTSET_START + x * FONTSET_HEIGHT as Address;
            }
            // Fx33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            #[rustfmt::skip]
            Op::Store_Bcd { vx } => {
                let start = self.cpu.address as usize;
                let x = self.cpu.v(vx);
                let fault = self.address_fault(start);
                let digits = self.memory.get_mut(start..start + 3).ok_or(fault)?;
                digits[0] = x / 100;
                digits[1] = x / 10  % 10;
                digits[2] = x       % 10;
            }
            // Fx55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            Op::Store_Registers { vx } => {
                let start = self.cpu.address as usize;
                let count = vx as usize + 1;
                let fault = self.address_fault(start);
                self.memory
                    .get_mut(start..start + count)
                    .ok_or(fault)?
                    .copy_from_slice(&self.cpu.registers[..count]);
            }
            // Fx65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            Op::Load_Registers { vx } => {
                let start = self.cpu.address as usize;
                let count = vx as usize + 1;
                let values = self
                    .memory
                    .get(start..start + count)
                    .ok_or_else(|| self.address_fault(start))?;
                self.cpu.registers[..count].copy_from_slice(values);
            }
            _ => unreachable!("not a miscellaneous instruction: {op}"),
        }

        Ok(())
    }
}

/// Troubleshooting
impl Chip8Vm {
    /// Returns the display buffer as a human readable string.
    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();
        self.display.dump(&mut buf)?;
        Ok(buf)
    }

    pub fn dump_keys(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        if self.keypad.any_key() {
            write!(buf, "keys: ")?;
            for key in KeyCode::ALL {
                if self.keypad.is_pressed(key) {
                    write!(buf, "{key}")?;
                }
            }
        }

        Ok(buf)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn vm_with(program: &[u8]) -> Chip8Vm {
        let mut vm = Chip8Vm::new(Chip8Conf {
            seed: Some(0x5EED),
            ..Default::default()
        });
        vm.load_bytecode(program).unwrap();
        vm
    }

    #[test]
    fn test_clock_hz() {
        let interval: Duration = Hz(60).into();
        assert_eq!(interval.as_millis(), 16);
        let interval: Duration = Hz(0).into();
        assert!(interval.is_zero());
    }

    /// Fx0A (LD Vx, K)
    ///
    /// Wait for a keypress, then store the key value in Vx.
    /// The VM must stall while waiting, and signal the state to the outer executer.
    #[test]
    #[rustfmt::skip]
    fn test_key_wait() {
        let mut vm = vm_with(&[
            0xF1, 0x0A, // LD v1, K
            0x62, 0x42  // LD v2, 0x42  ; sentinal
        ]);

        // machine must stall
        for _ in 0..6 {
            assert_eq!(vm.execute_cycle().unwrap(), Flow::KeyWait);
            assert_eq!(vm.cpu.pc as usize, MEM_START);
            assert_eq!(vm.state(), CpuState::AwaitingKey { vx: 1 });
        }
        assert_eq!(vm.cpu.v(1), 0);

        // machine has yielded, waiting for any key to be pressed.
        vm.set_key(KeyCode::Key5, true);

        // machine will now advance
        assert_eq!(vm.execute_cycle().unwrap(), Flow::Ok);
        assert_eq!(vm.cpu.pc as usize, MEM_START + 2);
        assert_eq!(vm.state(), CpuState::Fetching);
        assert_eq!(vm.cpu.v(1), 0x05);

        // Ensure the machine is continuing
        vm.execute_cycle().unwrap();
        assert_eq!(vm.cpu.pc as usize, MEM_START + 4);
        assert_eq!(vm.cpu.v(2), 0x42); // sentinal
    }

    #[test]
    fn test_key_wait_already_pressed() {
        let mut vm = vm_with(&[0xF3, 0x0A]);
        vm.set_key(KeyCode::KeyB, true);
        vm.set_key(KeyCode::KeyE, true);

        assert_eq!(vm.execute_cycle().unwrap(), Flow::Ok);
        assert_eq!(vm.cpu.v(3), 0xB);
        assert_eq!(vm.cpu.pc as usize, MEM_START + 2);
    }

    #[test]
    fn test_key_wait_timers_keep_running() {
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x60, 0x03, // LD v0, 3
            0xF0, 0x15, // LD DT, v0
            0xF1, 0x0A, // LD v1, K
        ]);

        vm.run_steps(2).unwrap();
        assert_eq!(vm.timers().delay(), 2);
        vm.run_steps(5).unwrap();
        assert_eq!(vm.timers().delay(), 0);
        assert_eq!(vm.state(), CpuState::AwaitingKey { vx: 1 });
    }

    /// Booleans must be cast to u8 1 or 0
    #[test]
    fn test_assert_bool_cast() {
        assert_eq!(true as u8, 1);
        assert_eq!(false as u8, 0);
    }

    #[test]
    #[rustfmt::skip]
    fn test_draw_collision() {
        // Draw two pixels next to each other.
        // The zero bits of the second draw must not erase
        // the pixels of the first draw
        //
        // draw sprite 1
        // ____####, vf == 0
        //
        // draw sprite 2
        // ########, vf == 0
        let mut vm = vm_with(&[
            0xA2, 0x0C, // LD I, .sprite
            0x60, 0x04, // LD v0, 4
            0x61, 0x00, // LD v1, 0
            0xD0, 0x11, // DRW v0, v1, 1
            0x60, 0x00, // LD v0, 0
            0xD0, 0x11, // DRW v0, v1, 1
            // .sprite
            0b11110000,
            0b00000000,
        ]);

        vm.run_steps(6).unwrap();

        assert!(vm.display_buffer()[0]); // sprite 2
        assert!(vm.display_buffer()[4]); // sprite 1
        assert!(!vm.display_buffer()[8]);
        assert_eq!(vm.cpu.v(0xF), 0);
        assert!(vm.take_redraw());
        assert!(!vm.take_redraw());
    }

    #[test]
    fn test_fault_leaves_state() {
        // DRW at x = 61 with a full row runs off the right edge.
        #[rustfmt::skip]
        let mut vm = vm_with(&[
            0x60, 0x3D, // LD v0, 61
            0xA0, 0x00, // LD I, 0x000 ; glyph '0'
            0xD0, 0x15, // DRW v0, v1, 5
        ]);
        vm.run_steps(2).unwrap();
        let delay = vm.timers().delay();

        let result = vm.execute_cycle();
        assert!(matches!(
            result,
            Err(Chip8Error::PixelOutOfBounds { pc: 0x204, x: 64, y: 0 })
        ));
        assert_eq!(vm.cpu.pc, 0x204);
        assert!(vm.display().is_blank());
        assert_eq!(vm.timers().delay(), delay);
        assert!(!vm.take_redraw());
    }

    #[test]
    fn test_advance_decoupled_clocks() {
        let mut vm = Chip8Vm::new(Chip8Conf {
            clock_frequency: Hz(600),
            timer_frequency: Hz(60),
            seed: Some(1),
        });
        #[rustfmt::skip]
        vm.load_bytecode(&[
            0x60, 0x3C, // LD v0, 60
            0xF0, 0x15, // LD DT, v0
            0x71, 0x01, // ADD v1, 1
            0x12, 0x04, // JP 0x204
        ]).unwrap();

        // 50ms is 30 instructions and 3 timer ticks.
        vm.advance(Duration::from_millis(50)).unwrap();
        assert_eq!(vm.timers().delay(), 60); // set after the 3 ticks ran
        assert_eq!(vm.cpu.v(1), 14);

        vm.advance(Duration::from_millis(100)).unwrap();
        assert_eq!(vm.timers().delay(), 54);
        assert_eq!(vm.cpu.v(1), 44);
    }

    #[test]
    fn test_advance_stops_on_key_wait() {
        let mut vm = vm_with(&[0xF0, 0x0A, 0x61, 0x01]);

        assert_eq!(
            vm.advance(Duration::from_millis(100)).unwrap(),
            Flow::KeyWait
        );
        assert_eq!(vm.cpu.pc as usize, MEM_START);

        vm.set_key(KeyCode::Key9, true);
        vm.advance(Duration::from_millis(4)).unwrap();
        assert_eq!(vm.cpu.v(0), 9);
        assert_eq!(vm.cpu.v(1), 1);
    }

    #[test]
    fn test_load_resets_machine() {
        let mut vm = vm_with(&[0x6A, 0x05, 0x00, 0xE0]);
        vm.run_steps(2).unwrap();
        assert_eq!(vm.cpu.v(0xA), 5);

        vm.load_bytecode(&[0x12, 0x00]).unwrap();
        assert_eq!(vm.cpu.v(0xA), 0);
        assert_eq!(vm.cpu.pc as usize, MEM_START);
        assert_eq!(vm.memory().read(MEM_START + 2), Some(0));
        assert!(!vm.take_redraw());
    }

    #[test]
    fn test_large_program_rejected() {
        let mut vm = vm_with(&[0x6A, 0x05]);
        let result = vm.load_bytecode(&[0; MAX_PROGRAM_SIZE + 1]);
        assert!(matches!(result, Err(Chip8Error::LargeProgram { .. })));
        assert_eq!(vm.memory().read(MEM_START), Some(0x6A));
    }

    #[test]
    fn test_dump_keys() {
        let mut vm = vm_with(&[]);
        assert_eq!(vm.dump_keys().unwrap(), "");
        vm.set_key(KeyCode::Key1, true);
        vm.set_key(KeyCode::KeyF, true);
        assert_eq!(vm.dump_keys().unwrap(), "keys: k1kf");
        vm.clear_keys();
        assert!(!vm.keypad().any_key());
    }
}
