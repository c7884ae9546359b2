//! VIC-II (MOS 6569/6567) video chip.
//!
//! The chip is advanced in CPU cycles. Every completed raster line is
//! rendered into a 384×272 buffer of `0x00RRGGBB` pixels (the visible PAL
//! area including the border), so register changes made between lines show
//! up where a real machine would show them. Within a line the state at the
//! end of the line is used.
//!
//! Supported:
//! - Standard, multicolor and extended-color text
//! - Hires and multicolor bitmap
//! - 8 sprites with multicolor, X/Y expansion, priority and collisions
//! - 38-column / 24-row border modes and fine scrolling
//! - Raster, sprite-sprite and sprite-background interrupts
//!
//! Bad-line cycle stealing is not emulated; the CPU always gets the full
//! line.

use std::cell::Cell;

use cpu6502::Device;

use crate::config::Region;
use crate::events::VideoEvent;
use crate::state::{Persist, StateReader, StateWriter};
use crate::system::SnapshotError;

/// VIC-II register count (47 registers at $D000-$D02E).
pub const VIC_REGISTER_COUNT: usize = 47;

pub const FRAME_WIDTH: usize = 384;
pub const FRAME_HEIGHT: usize = 272;

/// Raster line shown at the top of the frame buffer.
const FIRST_VISIBLE_LINE: u16 = 15;

/// Frame-buffer column of the first display pixel.
const DISPLAY_LEFT: usize = 32;
const DISPLAY_WIDTH: usize = 320;
const DISPLAY_HEIGHT: usize = 200;

/// Raster line of the first display line in 25-row mode.
const DISPLAY_TOP_LINE: u16 = 51;

const SPRITE_HEIGHT: u16 = 21;

/// Sprite X coordinate that lines up with the left display edge.
const SPRITE_X_ORIGIN: i32 = 24;

const IRQ_RASTER: u8 = 0x01;
const IRQ_SPRITE_BACKGROUND: u8 = 0x02;
const IRQ_SPRITE_SPRITE: u8 = 0x04;

/// The "Pepto" palette.
pub const PALETTE: [u32; 16] = [
    0x000000, 0xFFFFFF, 0x68372B, 0x70A4B2, 0x6F3D86, 0x588D43, 0x352879, 0xB8C76F, 0x6F4F25,
    0x433900, 0x9A6759, 0x444444, 0x6C6C6C, 0x9AD284, 0x6C5EB5, 0x959595,
];

/// What the VIC sees of the address space.
///
/// Addresses are 14-bit offsets into the 16KB bank selected through CIA #2;
/// the implementor resolves the bank and the character ROM shadow.
pub trait VideoMemory {
    fn fetch(&self, addr: u16) -> u8;

    /// Color RAM nibble for a screen cell (0-999).
    fn color(&self, offset: usize) -> u8;
}

/// Frame-buffer layout, for presentation layers that crop or scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: usize,
    pub height: usize,
    pub display_x: usize,
    pub display_y: usize,
    pub display_width: usize,
    pub display_height: usize,
}

#[derive(Debug, Clone)]
pub struct VicII {
    registers: [u8; VIC_REGISTER_COUNT],
    raster: u16,
    line_cycle: u32,
    raster_lines: u16,
    cycles_per_line: u32,
    /// Cleared on read, hence `Cell`.
    sprite_sprite: Cell<u8>,
    sprite_background: Cell<u8>,
    frame_buffer: Vec<u32>,
    frames: u64,
    frame_skip: u8,
    /// Frames left to skip before the next rendered one.
    skip_countdown: u8,
    events: Vec<VideoEvent>,
}

impl VicII {
    pub fn new(region: Region) -> Self {
        let mut vic = Self {
            registers: [0; VIC_REGISTER_COUNT],
            raster: 0,
            line_cycle: 0,
            raster_lines: region.raster_lines(),
            cycles_per_line: region.cycles_per_line(),
            sprite_sprite: Cell::new(0),
            sprite_background: Cell::new(0),
            frame_buffer: vec![PALETTE[14]; FRAME_WIDTH * FRAME_HEIGHT],
            frames: 0,
            frame_skip: 1,
            skip_countdown: 0,
            events: Vec::new(),
        };
        vic.power_on_registers();
        vic
    }

    fn power_on_registers(&mut self) {
        self.registers = [0; VIC_REGISTER_COUNT];
        self.registers[0x11] = 0x1B;
        self.registers[0x16] = 0xC8;
        self.registers[0x18] = 0x15;
        self.registers[0x20] = 0x0E;
        self.registers[0x21] = 0x06;
    }

    /// Power-on registers and raster position. Frame-skip setting and the
    /// last rendered frame survive.
    pub fn reset(&mut self) {
        self.power_on_registers();
        self.raster = 0;
        self.line_cycle = 0;
        self.sprite_sprite.set(0);
        self.sprite_background.set(0);
        self.skip_countdown = 0;
        self.events.clear();
    }

    pub fn frame_buffer(&self) -> &[u32] {
        &self.frame_buffer
    }

    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry {
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
            display_x: DISPLAY_LEFT,
            display_y: (DISPLAY_TOP_LINE - FIRST_VISIBLE_LINE) as usize,
            display_width: DISPLAY_WIDTH,
            display_height: DISPLAY_HEIGHT,
        }
    }

    pub fn raster(&self) -> u16 {
        self.raster
    }

    /// Frames completed since power-on, rendered or skipped.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn border_color(&self) -> u8 {
        self.registers[0x20] & 0x0F
    }

    pub fn background_color(&self) -> u8 {
        self.registers[0x21] & 0x0F
    }

    pub fn frame_skip(&self) -> u8 {
        self.frame_skip
    }

    /// Render one frame out of every `n`; 0 is treated as 1.
    pub fn set_frame_skip(&mut self, n: u8) {
        self.frame_skip = n.max(1);
        self.skip_countdown = self.skip_countdown.min(self.frame_skip - 1);
    }

    /// Events raised since the last drain, oldest first.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, VideoEvent> {
        self.events.drain(..)
    }

    fn raster_compare(&self) -> u16 {
        (((self.registers[0x11] & 0x80) as u16) << 1) | self.registers[0x12] as u16
    }

    fn rendering(&self) -> bool {
        self.skip_countdown == 0
    }

    /// Runs the raster beam for `cycles` CPU cycles.
    pub fn advance(&mut self, cycles: u32, mem: &impl VideoMemory) {
        self.line_cycle += cycles;
        while self.line_cycle >= self.cycles_per_line {
            self.line_cycle -= self.cycles_per_line;
            self.finish_line(mem);
        }
    }

    fn finish_line(&mut self, mem: &impl VideoMemory) {
        if self.rendering() || self.registers[0x15] != 0 {
            self.render_line(mem);
        }

        self.raster += 1;
        if self.raster >= self.raster_lines {
            self.raster = 0;
            self.finish_frame();
        }

        if self.raster == self.raster_compare() {
            self.raise(IRQ_RASTER);
        }
    }

    fn finish_frame(&mut self) {
        self.frames += 1;
        if self.rendering() {
            self.events.push(VideoEvent::FrameReady { frame: self.frames });
            self.skip_countdown = self.frame_skip - 1;
        } else {
            self.skip_countdown -= 1;
        }
    }

    fn raise(&mut self, source: u8) {
        self.registers[0x19] |= source;
    }

    fn irq_flags(&self) -> u8 {
        let flags = self.registers[0x19] & 0x0F;
        let any = if flags & self.registers[0x1A] & 0x0F != 0 {
            0x80
        } else {
            0
        };
        flags | any | 0x70
    }

    fn render_line(&mut self, mem: &impl VideoMemory) {
        let Some(row) = self.raster.checked_sub(FIRST_VISIBLE_LINE) else {
            return;
        };
        let row = row as usize;
        if row >= FRAME_HEIGHT {
            return;
        }

        let border = self.border_color();
        let mut colors = [border; FRAME_WIDTH];
        let mut foreground = [false; FRAME_WIDTH];

        let ctrl1 = self.registers[0x11];
        let ctrl2 = self.registers[0x16];
        let (top, bottom) = if ctrl1 & 0x08 != 0 {
            (DISPLAY_TOP_LINE, DISPLAY_TOP_LINE + 200)
        } else {
            (DISPLAY_TOP_LINE + 4, DISPLAY_TOP_LINE + 196)
        };
        let (left, right) = if ctrl2 & 0x08 != 0 {
            (DISPLAY_LEFT, DISPLAY_LEFT + DISPLAY_WIDTH)
        } else {
            (DISPLAY_LEFT + 7, DISPLAY_LEFT + DISPLAY_WIDTH - 9)
        };
        let in_window = ctrl1 & 0x10 != 0 && self.raster >= top && self.raster < bottom;

        if in_window {
            self.render_graphics(mem, &mut colors, &mut foreground);
        }

        if self.registers[0x15] != 0 {
            self.render_sprites(mem, &mut colors, &foreground);
        }

        if in_window {
            colors[..left].fill(border);
            colors[right..].fill(border);
        } else {
            colors.fill(border);
        }

        if self.rendering() {
            let line = &mut self.frame_buffer[row * FRAME_WIDTH..(row + 1) * FRAME_WIDTH];
            for (pixel, &color) in line.iter_mut().zip(colors.iter()) {
                *pixel = PALETTE[color as usize & 0x0F];
            }
        }
    }

    /// Fills the 320 display pixels; `foreground` marks pixels that hide
    /// low-priority sprites and count for sprite-background collisions.
    fn render_graphics(
        &self,
        mem: &impl VideoMemory,
        colors: &mut [u8; FRAME_WIDTH],
        foreground: &mut [bool; FRAME_WIDTH],
    ) {
        let ctrl1 = self.registers[0x11];
        let ctrl2 = self.registers[0x16];
        let bg0 = self.registers[0x21] & 0x0F;

        let y_scroll = (ctrl1 & 0x07) as u16;
        let x_scroll = (ctrl2 & 0x07) as usize;

        let display = &mut colors[DISPLAY_LEFT..DISPLAY_LEFT + DISPLAY_WIDTH];
        display.fill(bg0);

        let Some(offset) = self.raster.checked_sub(0x30 + y_scroll) else {
            return;
        };
        let char_row = (offset / 8) as usize;
        let char_line = (offset % 8) as u16;
        if char_row >= 25 {
            return;
        }

        let ecm = ctrl1 & 0x40 != 0;
        let bmm = ctrl1 & 0x20 != 0;
        let mcm = ctrl2 & 0x10 != 0;

        let mem_ptr = self.registers[0x18];
        let matrix = ((mem_ptr & 0xF0) as u16) << 6;
        let char_base = ((mem_ptr & 0x0E) as u16) << 10;
        let bitmap_base = ((mem_ptr & 0x08) as u16) << 10;

        let mut cell = [(0u8, false); 8];
        for col in 0..40 {
            let cell_index = char_row * 40 + col;
            let code = mem.fetch(matrix + cell_index as u16);
            let color = mem.color(cell_index) & 0x0F;

            match (ecm, bmm, mcm) {
                (false, false, false) => {
                    let pattern = mem.fetch(char_base + code as u16 * 8 + char_line);
                    hires(pattern, color, bg0, &mut cell);
                }
                (false, false, true) => {
                    let pattern = mem.fetch(char_base + code as u16 * 8 + char_line);
                    if color & 0x08 != 0 {
                        let palette = [
                            bg0,
                            self.registers[0x22] & 0x0F,
                            self.registers[0x23] & 0x0F,
                            color & 0x07,
                        ];
                        multicolor(pattern, palette, &mut cell);
                    } else {
                        hires(pattern, color, bg0, &mut cell);
                    }
                }
                (false, true, false) => {
                    let pattern =
                        mem.fetch(bitmap_base + (cell_index as u16) * 8 + char_line);
                    hires(pattern, code >> 4, code & 0x0F, &mut cell);
                }
                (false, true, true) => {
                    let pattern =
                        mem.fetch(bitmap_base + (cell_index as u16) * 8 + char_line);
                    multicolor(pattern, [bg0, code >> 4, code & 0x0F, color], &mut cell);
                }
                (true, false, false) => {
                    let pattern = mem.fetch(char_base + (code & 0x3F) as u16 * 8 + char_line);
                    let background = self.registers[0x21 + (code >> 6) as usize] & 0x0F;
                    hires(pattern, color, background, &mut cell);
                }
                _ => {
                    // Invalid mode: black, but the pixels still collide.
                    let pattern = if bmm {
                        mem.fetch(bitmap_base + (cell_index as u16) * 8 + char_line)
                    } else {
                        mem.fetch(char_base + (code & 0x3F) as u16 * 8 + char_line)
                    };
                    hires(pattern, 0, 0, &mut cell);
                }
            }

            for (bit, &(pixel, fg)) in cell.iter().enumerate() {
                let x = col * 8 + bit + x_scroll;
                if x < DISPLAY_WIDTH {
                    display[x] = pixel;
                    foreground[DISPLAY_LEFT + x] = fg;
                }
            }
        }
    }

    fn render_sprites(
        &mut self,
        mem: &impl VideoMemory,
        colors: &mut [u8; FRAME_WIDTH],
        foreground: &[bool; FRAME_WIDTH],
    ) {
        let enabled = self.registers[0x15];
        let matrix = ((self.registers[0x18] & 0xF0) as u16) << 6;

        // Sprite index + 1 of the topmost sprite pixel, 0 for none.
        let mut owner = [0u8; FRAME_WIDTH];
        let mut sprite_sprite = 0u8;
        let mut sprite_background = 0u8;

        for n in 0..8 {
            let bit = 1u8 << n;
            if enabled & bit == 0 {
                continue;
            }
            let y = self.registers[n * 2 + 1] as u16;
            let y_expand = self.registers[0x17] & bit != 0;
            let height = if y_expand {
                SPRITE_HEIGHT * 2
            } else {
                SPRITE_HEIGHT
            };
            let Some(line) = self.raster.checked_sub(y).filter(|&l| l < height) else {
                continue;
            };
            let line = if y_expand { line / 2 } else { line };

            let pointer = mem.fetch(matrix + 0x3F8 + n as u16) as u16 * 64;
            let data = [
                mem.fetch(pointer + line * 3),
                mem.fetch(pointer + line * 3 + 1),
                mem.fetch(pointer + line * 3 + 2),
            ];
            let bits = u32::from_be_bytes([0, data[0], data[1], data[2]]);

            let x_high = (self.registers[0x10] & bit != 0) as i32;
            let x = (x_high << 8) | self.registers[n * 2] as i32;
            let x_expand = self.registers[0x1D] & bit != 0;
            let multicolor = self.registers[0x1C] & bit != 0;
            let behind = self.registers[0x1B] & bit != 0;
            let own_color = self.registers[0x27 + n] & 0x0F;
            let scale = if x_expand { 2 } else { 1 };

            for px in 0..24 * scale {
                let sprite_x = px / scale;
                let color = if multicolor {
                    let pair = (bits >> (22 - (sprite_x & !1))) & 0x03;
                    match pair {
                        0 => None,
                        1 => Some(self.registers[0x25] & 0x0F),
                        2 => Some(own_color),
                        _ => Some(self.registers[0x26] & 0x0F),
                    }
                } else if bits & (1 << (23 - sprite_x)) != 0 {
                    Some(own_color)
                } else {
                    None
                };
                let Some(color) = color else {
                    continue;
                };

                let screen_x = x - SPRITE_X_ORIGIN + DISPLAY_LEFT as i32 + px as i32;
                if !(0..FRAME_WIDTH as i32).contains(&screen_x) {
                    continue;
                }
                let sx = screen_x as usize;

                if foreground[sx] {
                    sprite_background |= bit;
                }
                match owner[sx] {
                    0 => {
                        owner[sx] = n as u8 + 1;
                        if !(behind && foreground[sx]) {
                            colors[sx] = color;
                        }
                    }
                    other => sprite_sprite |= bit | (1 << (other - 1)),
                }
            }
        }

        if sprite_sprite != 0 {
            if self.sprite_sprite.get() == 0 {
                self.raise(IRQ_SPRITE_SPRITE);
            }
            self.sprite_sprite.set(self.sprite_sprite.get() | sprite_sprite);
        }
        if sprite_background != 0 {
            if self.sprite_background.get() == 0 {
                self.raise(IRQ_SPRITE_BACKGROUND);
            }
            self.sprite_background
                .set(self.sprite_background.get() | sprite_background);
        }
    }
}

fn hires(pattern: u8, set: u8, clear: u8, out: &mut [(u8, bool); 8]) {
    for (bit, pixel) in out.iter_mut().enumerate() {
        let on = pattern & (0x80 >> bit) != 0;
        *pixel = (if on { set } else { clear }, on);
    }
}

fn multicolor(pattern: u8, palette: [u8; 4], out: &mut [(u8, bool); 8]) {
    for pair in 0..4 {
        let bits = (pattern >> (6 - pair * 2)) & 0x03;
        let pixel = (palette[bits as usize], bits & 0x02 != 0);
        out[pair * 2] = pixel;
        out[pair * 2 + 1] = pixel;
    }
}

impl Default for VicII {
    fn default() -> Self {
        Self::new(Region::default())
    }
}

impl Device for VicII {
    fn read(&self, offset: u16) -> u8 {
        match offset as usize & 0x3F {
            0x11 => (self.registers[0x11] & 0x7F) | (((self.raster >> 1) & 0x80) as u8),
            0x12 => self.raster as u8,
            0x16 => self.registers[0x16] | 0xC0,
            0x18 => self.registers[0x18] | 0x01,
            0x19 => self.irq_flags(),
            0x1A => self.registers[0x1A] | 0xF0,
            0x1E => self.sprite_sprite.replace(0),
            0x1F => self.sprite_background.replace(0),
            n @ 0x20..=0x2E => self.registers[n] | 0xF0,
            n if n < VIC_REGISTER_COUNT => self.registers[n],
            _ => 0xFF,
        }
    }

    fn write(&mut self, offset: u16, value: u8) {
        let offset = offset as usize & 0x3F;
        match offset {
            0x19 => self.registers[0x19] &= !(value & 0x0F),
            0x1E | 0x1F => {}
            0x20 => {
                let old = self.registers[0x20] & 0x0F;
                self.registers[0x20] = value;
                let color = value & 0x0F;
                if color != old {
                    self.events.push(VideoEvent::BorderChanged {
                        color,
                        rgb: PALETTE[color as usize],
                    });
                }
            }
            n if n < VIC_REGISTER_COUNT => self.registers[n] = value,
            _ => {}
        }
    }

    fn size(&self) -> u16 {
        64
    }

    fn has_interrupt(&self) -> bool {
        self.registers[0x19] & self.registers[0x1A] & 0x0F != 0
    }
}

impl Persist for VicII {
    fn save_state(&self, out: &mut StateWriter) {
        out.bytes(&self.registers);
        out.u16(self.raster);
        out.u32(self.line_cycle);
        out.u8(self.sprite_sprite.get());
        out.u8(self.sprite_background.get());
        out.u64(self.frames);
        out.u8(self.frame_skip);
        out.u8(self.skip_countdown);
    }

    fn load_state(&mut self, input: &mut StateReader<'_>) -> Result<(), SnapshotError> {
        self.registers = input.array()?;
        self.raster = input.u16()? % self.raster_lines;
        self.line_cycle = input.u32()? % self.cycles_per_line;
        self.sprite_sprite.set(input.u8()?);
        self.sprite_background.set(input.u8()?);
        self.frames = input.u64()?;
        self.frame_skip = input.u8()?.max(1);
        self.skip_countdown = input.u8()?.min(self.frame_skip - 1);
        self.events.clear();
        Ok(())
    }
}
