//! CIA (MOS 6526) Complex Interface Adapter.
//!
//! The C64 has two of them:
//! - CIA #1 ($DC00): keyboard matrix and joysticks, drives the IRQ line
//! - CIA #2 ($DD00): VIC bank select and serial bus, drives the NMI line
//!
//! Each chip provides two 8-bit ports with direction registers, two 16-bit
//! interval timers (B may count A's underflows), a BCD time-of-day clock
//! with alarm, a serial data register and the interrupt control register.
//!
//! Port reads take the level of the external pins as an argument because
//! what the keyboard pulls low depends on what the other port drives at the
//! moment of the read. The bus computes [`PortPins`] and calls
//! [`Cia6526::read_with_pins`].

use cpu6502::Device;
use std::cell::Cell;

use crate::state::{Persist, StateReader, StateWriter};
use crate::system::SnapshotError;

/// ICR flag bits.
pub const ICR_TIMER_A: u8 = 0x01;
pub const ICR_TIMER_B: u8 = 0x02;
pub const ICR_TOD_ALARM: u8 = 0x04;
pub const ICR_SERIAL: u8 = 0x08;
pub const ICR_FLAG: u8 = 0x10;

/// External levels on the two ports. Unconnected pins float high.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortPins {
    pub a: u8,
    pub b: u8,
}

impl PortPins {
    pub const IDLE: PortPins = PortPins { a: 0xFF, b: 0xFF };
}

#[derive(Debug, Clone, Default)]
pub struct CiaPort {
    pub data: u8,
    pub ddr: u8,
}

impl CiaPort {
    /// Level the port puts on the wire: outputs drive their latch, inputs
    /// are pulled up.
    #[inline]
    pub fn drive(&self) -> u8 {
        self.data | !self.ddr
    }

    #[inline]
    pub fn read(&self, pins: u8) -> u8 {
        (self.data & self.ddr) | (pins & !self.ddr)
    }
}

#[derive(Debug, Clone)]
pub struct CiaTimer {
    pub counter: u16,
    pub latch: u16,
    pub running: bool,
    pub one_shot: bool,
}

impl CiaTimer {
    fn new() -> Self {
        Self {
            counter: 0xFFFF,
            latch: 0xFFFF,
            running: false,
            one_shot: false,
        }
    }

    /// Counts one pulse. Returns true on underflow, which reloads from the
    /// latch and stops a one-shot timer.
    fn count(&mut self) -> bool {
        if !self.running {
            return false;
        }
        if self.counter == 0 {
            self.counter = self.latch;
            if self.one_shot {
                self.running = false;
            }
            true
        } else {
            self.counter -= 1;
            false
        }
    }
}

/// Time-of-day clock, all fields BCD. Hours carry the PM flag in bit 7.
#[derive(Debug, Clone)]
pub struct TodClock {
    pub tenths: u8,
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub alarm: [u8; 4],
    /// Writing the hours register halts the clock until tenths is written.
    pub stopped: bool,
    /// Reading hours freezes the visible value until tenths is read.
    latch: Cell<Option<[u8; 4]>>,
}

impl TodClock {
    fn new() -> Self {
        Self {
            tenths: 0,
            seconds: 0,
            minutes: 0,
            hours: 0x01,
            alarm: [0; 4],
            stopped: false,
            latch: Cell::new(None),
        }
    }

    fn now(&self) -> [u8; 4] {
        [self.tenths, self.seconds, self.minutes, self.hours]
    }

    /// Advances by one tenth of a second. Returns true on an alarm match.
    fn tick(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        self.tenths = (self.tenths + 1) % 10;
        if self.tenths == 0 {
            self.seconds = bcd_increment(self.seconds, 0x59);
            if self.seconds == 0 {
                self.minutes = bcd_increment(self.minutes, 0x59);
                if self.minutes == 0 {
                    self.advance_hour();
                }
            }
        }
        self.now() == self.alarm
    }

    fn advance_hour(&mut self) {
        let pm = self.hours & 0x80;
        match self.hours & 0x1F {
            0x11 => self.hours = 0x12 | (pm ^ 0x80),
            0x12 => self.hours = 0x01 | pm,
            hour => self.hours = bcd_increment(hour, 0x12) | pm,
        }
    }
}

fn bcd_increment(value: u8, max: u8) -> u8 {
    if value >= max {
        return 0;
    }
    if value & 0x0F >= 9 {
        (value & 0xF0) + 0x10
    } else {
        value + 1
    }
}

/// MOS 6526 Complex Interface Adapter.
#[derive(Debug, Clone)]
pub struct Cia6526 {
    pub port_a: CiaPort,
    pub port_b: CiaPort,
    pub timer_a: CiaTimer,
    pub timer_b: CiaTimer,
    pub tod: TodClock,
    sdr: u8,

    /// ICR flags; reading $0D clears them.
    interrupt_flags: Cell<u8>,
    interrupt_mask: u8,
    interrupt_pending: Cell<bool>,

    cra: u8,
    crb: u8,

    tod_cycles: u32,
    tod_period: u32,

    /// Reads of the port B data register, used to tell when the KERNAL has
    /// finished booting and settled into its keyboard scan loop.
    port_b_reads: Cell<u32>,
    boot_read_threshold: u32,
}

impl Cia6526 {
    /// `clock_hz` sets the time-of-day tick rate (ten ticks per second).
    pub fn new(clock_hz: u32) -> Self {
        Self {
            port_a: CiaPort::default(),
            port_b: CiaPort::default(),
            timer_a: CiaTimer::new(),
            timer_b: CiaTimer::new(),
            tod: TodClock::new(),
            sdr: 0,
            interrupt_flags: Cell::new(0),
            interrupt_mask: 0,
            interrupt_pending: Cell::new(false),
            cra: 0,
            crb: 0,
            tod_cycles: 0,
            tod_period: (clock_hz / 10).max(1),
            port_b_reads: Cell::new(0),
            boot_read_threshold: u32::MAX,
        }
    }

    /// Advances the chip by one system clock.
    pub fn clock(&mut self) {
        let timer_a_underflow = self.cra & 0x20 == 0 && self.timer_a.count();
        if timer_a_underflow {
            self.raise(ICR_TIMER_A);
        }

        let timer_b_input = match self.crb & 0x60 {
            0x00 => true,
            0x20 => false,
            _ => timer_a_underflow,
        };
        if timer_b_input && self.timer_b.count() {
            self.raise(ICR_TIMER_B);
        }

        // A one-shot underflow clears the start bit
        if !self.timer_a.running {
            self.cra &= !0x01;
        }
        if !self.timer_b.running {
            self.crb &= !0x01;
        }

        self.tod_cycles += 1;
        if self.tod_cycles >= self.tod_period {
            self.tod_cycles = 0;
            if self.tod.tick() {
                self.raise(ICR_TOD_ALARM);
            }
        }
    }

    /// Advances the chip by several clocks.
    pub fn advance(&mut self, cycles: u32) {
        for _ in 0..cycles {
            self.clock();
        }
    }

    fn raise(&mut self, flag: u8) {
        self.interrupt_flags.set(self.interrupt_flags.get() | flag);
        self.update_pending();
    }

    /// Asserts the FLAG pin (serial SRQ / cassette read on the C64).
    pub fn trigger_flag(&mut self) {
        self.raise(ICR_FLAG);
    }

    fn update_pending(&mut self) {
        if self.interrupt_flags.get() & self.interrupt_mask != 0 {
            self.interrupt_pending.set(true);
        }
    }

    /// VIC bank 0-3 selected by port A bits 0-1 (inverted). Only
    /// meaningful on CIA #2.
    pub fn vic_bank(&self) -> u8 {
        !self.port_a.drive() & 0x03
    }

    /// ICR flags, without the clear-on-read side effect.
    pub fn interrupt_flags(&self) -> u8 {
        self.interrupt_flags.get()
    }

    pub fn set_boot_read_threshold(&mut self, threshold: u32) {
        self.boot_read_threshold = threshold;
    }

    pub fn port_b_reads(&self) -> u32 {
        self.port_b_reads.get()
    }

    /// True once port B has been read `boot_read_threshold` times.
    pub fn boot_complete(&self) -> bool {
        self.port_b_reads.get() >= self.boot_read_threshold
    }

    /// Power-on state. The boot read counter restarts as well.
    pub fn reset(&mut self) {
        let threshold = self.boot_read_threshold;
        let period = self.tod_period;
        *self = Self {
            boot_read_threshold: threshold,
            tod_period: period,
            ..Self::new(10)
        };
    }

    /// Register read with explicit external pin levels.
    pub fn read_with_pins(&self, offset: u16, pins: PortPins) -> u8 {
        match offset & 0x0F {
            0x00 => self.port_a.read(pins.a),
            0x01 => {
                self.port_b_reads
                    .set(self.port_b_reads.get().saturating_add(1));
                self.port_b.read(pins.b)
            }
            0x02 => self.port_a.ddr,
            0x03 => self.port_b.ddr,
            0x04 => self.timer_a.counter as u8,
            0x05 => (self.timer_a.counter >> 8) as u8,
            0x06 => self.timer_b.counter as u8,
            0x07 => (self.timer_b.counter >> 8) as u8,
            0x08 => {
                let value = self.tod.latch.get().unwrap_or(self.tod.now())[0];
                self.tod.latch.set(None);
                value
            }
            0x09 => self.tod.latch.get().unwrap_or(self.tod.now())[1],
            0x0A => self.tod.latch.get().unwrap_or(self.tod.now())[2],
            0x0B => {
                let now = self.tod.now();
                if self.tod.latch.get().is_none() {
                    self.tod.latch.set(Some(now));
                }
                now[3]
            }
            0x0C => self.sdr,
            0x0D => {
                let flags = self.interrupt_flags.get();
                let pending = self.interrupt_pending.get();
                self.interrupt_flags.set(0);
                self.interrupt_pending.set(false);
                flags | if pending { 0x80 } else { 0 }
            }
            0x0E => self.cra & !0x10,
            _ => self.crb & !0x10,
        }
    }

    fn write_tod(&mut self, index: usize, value: u8) {
        if self.crb & 0x80 != 0 {
            self.tod.alarm[index] = value;
            return;
        }
        match index {
            0 => {
                self.tod.tenths = value & 0x0F;
                self.tod.stopped = false;
            }
            1 => self.tod.seconds = value & 0x7F,
            2 => self.tod.minutes = value & 0x7F,
            _ => {
                self.tod.hours = value & 0x9F;
                self.tod.stopped = true;
            }
        }
    }
}

impl Default for Cia6526 {
    fn default() -> Self {
        Self::new(985_248)
    }
}

impl Device for Cia6526 {
    fn read(&self, offset: u16) -> u8 {
        self.read_with_pins(offset, PortPins::IDLE)
    }

    fn write(&mut self, offset: u16, value: u8) {
        match offset & 0x0F {
            0x00 => self.port_a.data = value,
            0x01 => self.port_b.data = value,
            0x02 => self.port_a.ddr = value,
            0x03 => self.port_b.ddr = value,
            0x04 => self.timer_a.latch = (self.timer_a.latch & 0xFF00) | value as u16,
            0x05 => {
                self.timer_a.latch = (self.timer_a.latch & 0x00FF) | ((value as u16) << 8);
                if !self.timer_a.running {
                    self.timer_a.counter = self.timer_a.latch;
                }
            }
            0x06 => self.timer_b.latch = (self.timer_b.latch & 0xFF00) | value as u16,
            0x07 => {
                self.timer_b.latch = (self.timer_b.latch & 0x00FF) | ((value as u16) << 8);
                if !self.timer_b.running {
                    self.timer_b.counter = self.timer_b.latch;
                }
            }
            0x08 => self.write_tod(0, value & 0x0F),
            0x09 => self.write_tod(1, value & 0x7F),
            0x0A => self.write_tod(2, value & 0x7F),
            0x0B => self.write_tod(3, value & 0x9F),
            0x0C => {
                self.sdr = value;
                if self.cra & 0x40 != 0 {
                    self.raise(ICR_SERIAL);
                }
            }
            0x0D => {
                let mask = value & 0x1F;
                if value & 0x80 != 0 {
                    self.interrupt_mask |= mask;
                } else {
                    self.interrupt_mask &= !mask;
                }
                self.update_pending();
            }
            0x0E => {
                self.cra = value;
                self.timer_a.running = value & 0x01 != 0;
                self.timer_a.one_shot = value & 0x08 != 0;
                if value & 0x10 != 0 {
                    self.timer_a.counter = self.timer_a.latch;
                }
            }
            _ => {
                self.crb = value;
                self.timer_b.running = value & 0x01 != 0;
                self.timer_b.one_shot = value & 0x08 != 0;
                if value & 0x10 != 0 {
                    self.timer_b.counter = self.timer_b.latch;
                }
            }
        }
    }

    fn size(&self) -> u16 {
        256
    }

    /// Interrupt output. The bus routes CIA #1 to IRQ and CIA #2 to NMI.
    fn has_interrupt(&self) -> bool {
        self.interrupt_pending.get()
    }
}

impl Persist for Cia6526 {
    fn save_state(&self, out: &mut StateWriter) {
        for port in [&self.port_a, &self.port_b] {
            out.u8(port.data);
            out.u8(port.ddr);
        }
        for timer in [&self.timer_a, &self.timer_b] {
            out.u16(timer.counter);
            out.u16(timer.latch);
            out.bool(timer.running);
            out.bool(timer.one_shot);
        }
        out.bytes(&self.tod.now());
        out.bytes(&self.tod.alarm);
        out.bool(self.tod.stopped);
        out.u8(self.sdr);
        out.u8(self.interrupt_flags.get());
        out.u8(self.interrupt_mask);
        out.bool(self.interrupt_pending.get());
        out.u8(self.cra);
        out.u8(self.crb);
        out.u32(self.tod_cycles);
        out.u32(self.port_b_reads.get());
    }

    fn load_state(&mut self, input: &mut StateReader<'_>) -> Result<(), SnapshotError> {
        for port in [&mut self.port_a, &mut self.port_b] {
            port.data = input.u8()?;
            port.ddr = input.u8()?;
        }
        for timer in [&mut self.timer_a, &mut self.timer_b] {
            timer.counter = input.u16()?;
            timer.latch = input.u16()?;
            timer.running = input.bool()?;
            timer.one_shot = input.bool()?;
        }
        let [tenths, seconds, minutes, hours] = input.array::<4>()?;
        self.tod.tenths = tenths;
        self.tod.seconds = seconds;
        self.tod.minutes = minutes;
        self.tod.hours = hours;
        self.tod.alarm = input.array::<4>()?;
        self.tod.stopped = input.bool()?;
        self.tod.latch.set(None);
        self.sdr = input.u8()?;
        self.interrupt_flags.set(input.u8()?);
        self.interrupt_mask = input.u8()?;
        self.interrupt_pending.set(input.bool()?);
        self.cra = input.u8()?;
        self.crb = input.u8()?;
        self.tod_cycles = input.u32()?;
        self.port_b_reads.set(input.u32()?);
        Ok(())
    }
}
