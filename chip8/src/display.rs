//! Monochrome display buffer.
use std::fmt::{self, Write};

use crate::constants::*;

/// 64x32 one bit pixel grid, stored row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct Display {
    pixels: Box<[bool; DISPLAY_BUFFER_SIZE]>,
}

/// A sprite pixel that landed outside of the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfBounds {
    pub x: usize,
    pub y: usize,
}

impl Default for Display {
    fn default() -> Self {
        Self {
            pixels: Box::new([false; DISPLAY_BUFFER_SIZE]),
        }
    }
}

impl Display {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn clear(&mut self) {
        self.pixels.fill(false);
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        x < DISPLAY_WIDTH && y < DISPLAY_HEIGHT && self.pixels[x + y * DISPLAY_WIDTH]
    }

    pub fn buffer(&self) -> &[bool; DISPLAY_BUFFER_SIZE] {
        &self.pixels
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|px| !*px)
    }

    /// XOR the sprite rows onto the buffer with the top left corner at `(x, y)`.
    ///
    /// Each row is 8 bits representing 8 pixels, most significant bit on the left.
    /// Coordinates are not wrapped. When any set bit lands outside of the
    /// display, nothing is drawn and the first offending pixel is returned.
    ///
    /// Returns `true` if a pixel was erased, which is a collision.
    pub fn draw_sprite(&mut self, x: usize, y: usize, sprite: &[u8]) -> Result<bool, OutOfBounds> {
        // Validate first so a failed draw doesn't leave half a sprite behind.
        for (r, row) in sprite.iter().enumerate() {
            for c in 0..SPRITE_WIDTH {
                if (row >> (7 - c)) & 1 != 0 && (x + c >= DISPLAY_WIDTH || y + r >= DISPLAY_HEIGHT)
                {
                    return Err(OutOfBounds { x: x + c, y: y + r });
                }
            }
        }

        let mut is_erased = false;

        for (r, row) in sprite.iter().enumerate() {
            for c in 0..SPRITE_WIDTH {
                if (row >> (7 - c)) & 1 == 0 {
                    continue;
                }

                let d = (x + c) + (y + r) * DISPLAY_WIDTH;
                let old_px = self.pixels[d];

                // XOR erases a pixel when both the old and new values are both 1.
                is_erased |= old_px;
                self.pixels[d] = !old_px;
            }
        }

        Ok(is_erased)
    }

    /// Renders the buffer as rows of `#` and `.` characters.
    pub fn dump<W: Write>(&self, w: &mut W) -> fmt::Result {
        for row in self.pixels.chunks(DISPLAY_WIDTH) {
            for px in row {
                w.write_char(if *px { '#' } else { '.' })?;
            }
            writeln!(w)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(f)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_draw_collision() {
        let mut display = Display::new();

        // Draw two sprites next to each other.
        // The zero bits of the second draw must not erase
        // the pixels of the first draw
        //
        // ____####, no collision
        // ########, no collision
        assert_eq!(display.draw_sprite(4, 0, &[0b11110000]), Ok(false));
        assert_eq!(display.draw_sprite(0, 0, &[0b11110000]), Ok(false));
        assert!((0..8).all(|x| display.pixel(x, 0)));

        // Overlapping erases
        assert_eq!(display.draw_sprite(2, 0, &[0b10000000]), Ok(true));
        assert!(!display.pixel(2, 0));
    }

    #[test]
    fn test_draw_twice_restores() {
        let mut display = Display::new();
        display.draw_sprite(10, 10, &[0b10100000]).unwrap();
        let before = display.clone();

        let sprite = [0xFF, 0x81, 0x42];
        assert_eq!(display.draw_sprite(8, 9, &sprite), Ok(false));
        assert_eq!(display.draw_sprite(8, 9, &sprite), Ok(true));
        assert_eq!(display, before);
    }

    #[test]
    fn test_out_of_bounds_draws_nothing() {
        let mut display = Display::new();

        let result = display.draw_sprite(60, 0, &[0b00010000, 0b11111111]);
        assert_eq!(result, Err(OutOfBounds { x: 64, y: 1 }));
        assert!(display.is_blank());

        let result = display.draw_sprite(0, 31, &[0x80, 0x80]);
        assert_eq!(result, Err(OutOfBounds { x: 0, y: 32 }));
        assert!(display.is_blank());
    }

    #[test]
    fn test_unset_bits_may_overhang() {
        let mut display = Display::new();
        assert_eq!(display.draw_sprite(60, 31, &[0b11110000, 0x00]), Ok(false));
        assert!((60..64).all(|x| display.pixel(x, 31)));
    }

    #[test]
    fn test_dump() {
        let mut display = Display::new();
        display.draw_sprite(0, 0, &[0b11000000]).unwrap();

        let mut buf = String::new();
        display.dump(&mut buf).unwrap();
        let lines: Vec<&str> = buf.lines().collect();
        assert_eq!(lines.len(), DISPLAY_HEIGHT);
        assert!(lines[0].starts_with("##.."));
        assert_eq!(lines[1], ".".repeat(DISPLAY_WIDTH));
    }
}
