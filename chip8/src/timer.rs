//! Delay and sound timers.

/// Two independent 8-bit countdown timers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timers {
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay: u8,
    /// (ST) Sound timer that counts down to 0.
    pub(crate) sound: u8,
}

impl Timers {
    pub fn new() -> Self {
        Default::default()
    }

    #[inline(always)]
    pub fn delay(&self) -> u8 {
        self.delay
    }

    #[inline(always)]
    pub fn sound(&self) -> u8 {
        self.sound
    }

    /// Count both timers down by one, stopping at zero.
    ///
    /// Returns `true` when the sound timer expires on this tick,
    /// which is when a tone is requested.
    #[inline]
    pub fn tick(&mut self) -> bool {
        // The checked_sub implementation uses `unlikely!()` which degrades performance.
        let (val, underflow) = self.delay.overflowing_sub(1);
        if !underflow {
            self.delay = val;
        }

        let tone = self.sound == 1;
        let (val, underflow) = self.sound.overflowing_sub(1);
        if !underflow {
            self.sound = val;
        }

        tone
    }
}
