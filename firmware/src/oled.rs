//! Text-mode driver for a 128x64 SSD1306 panel on I2C.
//!
//! The panel is treated as eight lines of sixteen characters, one line per display page. Glyphs are
//! 5x7 column bitmaps padded to eight pixels, so a full line spans the panel width.
use embedded_hal::i2c::I2c;

/// Panel address with the SA0 pin tied low.
pub const DEFAULT_ADDRESS: u8 = 0x3C;

pub const WIDTH: usize = 128;
pub const LINES: u8 = 8;
pub const GLYPH_WIDTH: usize = 8;
pub const LINE_CHARS: usize = WIDTH / GLYPH_WIDTH;

const COMMAND: u8 = 0x00;
const DATA: u8 = 0x40;

const INIT_SEQUENCE: &[u8] = &[
    COMMAND, 0xAE, // display off
    0xD5, 0x80, // clock divide
    0xA8, 0x3F, // 64 rows
    0xD3, 0x00, // no vertical offset
    0x40, // start line 0
    0x8D, 0x14, // charge pump on
    0x20, 0x02, // page addressing
    0xA1, 0xC8, // flip to match the module orientation
    0xDA, 0x12, // alternative COM pins
    0x81, 0xFF, // full contrast
    0xD9, 0xF1, // pre-charge
    0xDB, 0x40, // VCOMH level
    0xA4, 0xA6, // show RAM, non-inverted
    0xAF, // display on
];

/// Printable ASCII from `' '` to `'~'`, five columns each, least significant bit at the top.
const FONT: [[u8; 5]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00],
    [0x00, 0x00, 0x5F, 0x00, 0x00],
    [0x00, 0x07, 0x00, 0x07, 0x00],
    [0x14, 0x7F, 0x14, 0x7F, 0x14],
    [0x24, 0x2A, 0x7F, 0x2A, 0x12],
    [0x23, 0x13, 0x08, 0x64, 0x62],
    [0x36, 0x49, 0x55, 0x22, 0x50],
    [0x00, 0x05, 0x03, 0x00, 0x00],
    [0x00, 0x1C, 0x22, 0x41, 0x00],
    [0x00, 0x41, 0x22, 0x1C, 0x00],
    [0x08, 0x2A, 0x1C, 0x2A, 0x08],
    [0x08, 0x08, 0x3E, 0x08, 0x08],
    [0x00, 0x50, 0x30, 0x00, 0x00],
    [0x08, 0x08, 0x08, 0x08, 0x08],
    [0x00, 0x60, 0x60, 0x00, 0x00],
    [0x20, 0x10, 0x08, 0x04, 0x02],
    [0x3E, 0x51, 0x49, 0x45, 0x3E],
    [0x00, 0x42, 0x7F, 0x40, 0x00],
    [0x42, 0x61, 0x51, 0x49, 0x46],
    [0x21, 0x41, 0x45, 0x4B, 0x31],
    [0x18, 0x14, 0x12, 0x7F, 0x10],
    [0x27, 0x45, 0x45, 0x45, 0x39],
    [0x3C, 0x4A, 0x49, 0x49, 0x30],
    [0x01, 0x71, 0x09, 0x05, 0x03],
    [0x36, 0x49, 0x49, 0x49, 0x36],
    [0x06, 0x49, 0x49, 0x29, 0x1E],
    [0x00, 0x36, 0x36, 0x00, 0x00],
    [0x00, 0x56, 0x36, 0x00, 0x00],
    [0x08, 0x14, 0x22, 0x41, 0x00],
    [0x14, 0x14, 0x14, 0x14, 0x14],
    [0x00, 0x41, 0x22, 0x14, 0x08],
    [0x02, 0x01, 0x51, 0x09, 0x06],
    [0x32, 0x49, 0x79, 0x41, 0x3E],
    [0x7E, 0x11, 0x11, 0x11, 0x7E],
    [0x7F, 0x49, 0x49, 0x49, 0x36],
    [0x3E, 0x41, 0x41, 0x41, 0x22],
    [0x7F, 0x41, 0x41, 0x22, 0x1C],
    [0x7F, 0x49, 0x49, 0x49, 0x41],
    [0x7F, 0x09, 0x09, 0x01, 0x01],
    [0x3E, 0x41, 0x41, 0x51, 0x32],
    [0x7F, 0x08, 0x08, 0x08, 0x7F],
    [0x00, 0x41, 0x7F, 0x41, 0x00],
    [0x20, 0x40, 0x41, 0x3F, 0x01],
    [0x7F, 0x08, 0x14, 0x22, 0x41],
    [0x7F, 0x40, 0x40, 0x40, 0x40],
    [0x7F, 0x02, 0x04, 0x02, 0x7F],
    [0x7F, 0x04, 0x08, 0x10, 0x7F],
    [0x3E, 0x41, 0x41, 0x41, 0x3E],
    [0x7F, 0x09, 0x09, 0x09, 0x06],
    [0x3E, 0x41, 0x51, 0x21, 0x5E],
    [0x7F, 0x09, 0x19, 0x29, 0x46],
    [0x46, 0x49, 0x49, 0x49, 0x31],
    [0x01, 0x01, 0x7F, 0x01, 0x01],
    [0x3F, 0x40, 0x40, 0x40, 0x3F],
    [0x1F, 0x20, 0x40, 0x20, 0x1F],
    [0x7F, 0x20, 0x18, 0x20, 0x7F],
    [0x63, 0x14, 0x08, 0x14, 0x63],
    [0x03, 0x04, 0x78, 0x04, 0x03],
    [0x61, 0x51, 0x49, 0x45, 0x43],
    [0x00, 0x7F, 0x41, 0x41, 0x00],
    [0x02, 0x04, 0x08, 0x10, 0x20],
    [0x00, 0x41, 0x41, 0x7F, 0x00],
    [0x04, 0x02, 0x01, 0x02, 0x04],
    [0x40, 0x40, 0x40, 0x40, 0x40],
    [0x00, 0x01, 0x02, 0x04, 0x00],
    [0x20, 0x54, 0x54, 0x54, 0x78],
    [0x7F, 0x48, 0x44, 0x44, 0x38],
    [0x38, 0x44, 0x44, 0x44, 0x20],
    [0x38, 0x44, 0x44, 0x48, 0x7F],
    [0x38, 0x54, 0x54, 0x54, 0x18],
    [0x08, 0x7E, 0x09, 0x01, 0x02],
    [0x08, 0x14, 0x54, 0x54, 0x3C],
    [0x7F, 0x08, 0x04, 0x04, 0x78],
    [0x00, 0x44, 0x7D, 0x40, 0x00],
    [0x20, 0x40, 0x44, 0x3D, 0x00],
    [0x00, 0x7F, 0x10, 0x28, 0x44],
    [0x00, 0x41, 0x7F, 0x40, 0x00],
    [0x7C, 0x04, 0x18, 0x04, 0x78],
    [0x7C, 0x08, 0x04, 0x04, 0x78],
    [0x38, 0x44, 0x44, 0x44, 0x38],
    [0x7C, 0x14, 0x14, 0x14, 0x08],
    [0x08, 0x14, 0x14, 0x18, 0x7C],
    [0x7C, 0x08, 0x04, 0x04, 0x08],
    [0x48, 0x54, 0x54, 0x54, 0x20],
    [0x04, 0x3F, 0x44, 0x40, 0x20],
    [0x3C, 0x40, 0x40, 0x20, 0x7C],
    [0x1C, 0x20, 0x40, 0x20, 0x1C],
    [0x3C, 0x40, 0x30, 0x40, 0x3C],
    [0x44, 0x28, 0x10, 0x28, 0x44],
    [0x0C, 0x50, 0x50, 0x50, 0x3C],
    [0x44, 0x64, 0x54, 0x4C, 0x44],
    [0x00, 0x08, 0x36, 0x41, 0x00],
    [0x00, 0x00, 0x7F, 0x00, 0x00],
    [0x00, 0x41, 0x36, 0x08, 0x00],
    [0x08, 0x04, 0x08, 0x10, 0x08],
];

/// Column bitmap for `ch`; anything outside printable ASCII renders as `?`.
pub fn glyph(ch: char) -> &'static [u8; 5] {
    let ch = if (' '..='~').contains(&ch) { ch } else { '?' };
    &FONT[ch as usize - ' ' as usize]
}

pub struct Ssd1306<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> Ssd1306<I> {
    pub fn new(i2c: I) -> Self {
        Self::with_address(i2c, DEFAULT_ADDRESS)
    }

    pub fn with_address(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn release(self) -> I {
        self.i2c
    }

    /// Switch the panel on at full contrast and blank every line.
    pub fn init(&mut self) -> Result<(), I::Error> {
        self.i2c.write(self.address, INIT_SEQUENCE)?;
        self.clear()
    }

    pub fn clear(&mut self) -> Result<(), I::Error> {
        for line in 0..LINES {
            self.write_line(line, &[0u8; WIDTH])?;
        }
        Ok(())
    }

    /// Draw `text` from the left edge of `line`.
    ///
    /// Only the cells covered by `text` are written; the rest of the line keeps its content.
    /// Characters beyond [`LINE_CHARS`] are dropped.
    pub fn draw_text(&mut self, line: u8, text: &str, inverted: bool) -> Result<(), I::Error> {
        let mut columns = [0u8; WIDTH];
        let mut used = 0;
        for (cell, ch) in columns.chunks_exact_mut(GLYPH_WIDTH).zip(text.chars()) {
            cell[..5].copy_from_slice(glyph(ch));
            if inverted {
                cell.iter_mut().for_each(|column| *column = !*column);
            }
            used += GLYPH_WIDTH;
        }
        self.write_line(line, &columns[..used])
    }

    fn write_line(&mut self, line: u8, columns: &[u8]) -> Result<(), I::Error> {
        if columns.is_empty() {
            return Ok(());
        }
        // Page address, then column 0 as low and high nibbles.
        self.i2c
            .write(self.address, &[COMMAND, 0xB0 | (line % LINES), 0x00, 0x10])?;

        let len = columns.len().min(WIDTH);
        let mut frame = [0u8; WIDTH + 1];
        frame[0] = DATA;
        frame[1..=len].copy_from_slice(&columns[..len]);
        self.i2c.write(self.address, &frame[..=len])
    }
}
