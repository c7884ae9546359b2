//! The assembled computer.
//!
//! [`C64`] owns the CPU (which owns the memory map and chips), the serial
//! bus with its drives, and the listeners the host registered. One call to
//! [`C64::step`] runs one instruction and brings every chip forward by the
//! cycles it took.
//!
//! Disk access is serviced at the KERNAL level: when the program counter
//! reaches one of the KERNAL serial routines while the KERNAL ROM is banked
//! in, the routine is performed against the [`IecBus`] and the CPU returns
//! to the caller as if the ROM code had run.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use cpu6502::{MemoryBus, CPU};
use log::{debug, info};

use super::activity::ActivityTimer;
use super::c64_memory::C64Memory;
use super::pacing::adjust_frame_skip;
use super::resources::{load_rom, ResourceLoader, BASIC_ROM, CHARGEN_ROM, KERNAL_ROM};
use crate::config::{FrameSkip, MachineConfig};
use crate::devices::FrameGeometry;
use crate::disk::{ascii_to_petscii, DiskError, Drive, DriveState, IecBus};
use crate::error::{MachineError, Result};
use crate::events::{AudioSink, DriveActivity, DriveEvent, EventHub, VideoEvent};
use crate::system::joystick::JOY_FIRE;

/// KERNAL serial routines serviced by the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trap {
    Talk,
    Listen,
    Second,
    Tksa,
    Ciout,
    Untalk,
    Unlisten,
    Acptr,
}

const TRAPS: [(u16, Trap); 8] = [
    (0xED09, Trap::Talk),
    (0xED0C, Trap::Listen),
    (0xEDB9, Trap::Second),
    (0xEDC7, Trap::Tksa),
    (0xEDDD, Trap::Ciout),
    (0xEDEF, Trap::Untalk),
    (0xEDFE, Trap::Unlisten),
    (0xEE13, Trap::Acptr),
];

/// Cycles charged for a serviced routine (the RTS back to the caller).
const TRAP_CYCLES: u32 = 6;

/// KERNAL status byte `ST`.
const KERNAL_STATUS: u16 = 0x0090;
const KEYBOARD_BUFFER: u16 = 0x0277;
const KEYBOARD_COUNT: u16 = 0x00C6;
const KEYBOARD_BUFFER_SIZE: usize = 10;

const BASIC_START: u16 = 0x0801;
/// VARTAB, ARYTAB and STREND all point past the program after a load.
const BASIC_POINTERS: [u16; 3] = [0x002D, 0x002F, 0x0031];
/// KERNAL end-of-load address.
const LOAD_END: u16 = 0x00AE;

/// SID output is handed to sinks in chunks of at least this many bytes.
const AUDIO_CHUNK: usize = 256;

/// Holds a drive's idle notification until the activity timer runs out.
#[derive(Debug)]
struct IdleNotice {
    timer: ActivityTimer,
    pending: Option<DriveEvent>,
}

pub struct C64 {
    pub(super) cpu: CPU<C64Memory>,
    pub(super) bus: IecBus,
    pub(super) config: MachineConfig,
    video: EventHub<VideoEvent>,
    drive_events: EventHub<DriveEvent>,
    audio: Vec<Box<dyn AudioSink>>,
    text: VecDeque<u8>,
    idle: Vec<IdleNotice>,
}

impl std::fmt::Debug for C64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("C64")
            .field("region", &self.config.region)
            .field("pc", &format_args!("${:04X}", self.cpu.pc()))
            .field("cycles", &self.cpu.cycles())
            .field("bus", &self.bus)
            .finish()
    }
}

impl C64 {
    /// Builds a machine, fetching the system ROMs through `loader`.
    pub fn new(config: MachineConfig, loader: &dyn ResourceLoader) -> Result<Self> {
        let basic = load_rom(loader, BASIC_ROM)?;
        let kernal = load_rom(loader, KERNAL_ROM)?;
        let chargen = load_rom(loader, CHARGEN_ROM)?;
        Self::with_roms(config, &basic, &kernal, &chargen)
    }

    pub fn with_roms(
        config: MachineConfig,
        basic: &[u8],
        kernal: &[u8],
        chargen: &[u8],
    ) -> Result<Self> {
        config.validate()?;

        let mut memory = C64Memory::new(config.region);
        memory.load_roms(basic, kernal, chargen)?;
        memory.cia1.set_boot_read_threshold(config.boot_read_threshold);
        memory.vic.set_frame_skip(match config.frame_skip {
            FrameSkip::Fixed(n) => n,
            FrameSkip::Auto { .. } => 1,
        });

        let mut cpu = CPU::new(memory);
        cpu.set_illegal_opcode_policy(config.illegal_opcodes.into());
        cpu.reset();

        let timeout = Duration::from_millis(config.drive_activity_timeout_ms);
        let idle = (0..config.drive_count)
            .map(|_| IdleNotice {
                timer: ActivityTimer::new(timeout),
                pending: None,
            })
            .collect();

        info!(
            "C64 created: {:?}, {} drive(s), reset vector ${:04X}",
            config.region,
            config.drive_count,
            cpu.pc()
        );

        Ok(Self {
            cpu,
            bus: IecBus::new(config.drive_count),
            config,
            video: EventHub::new(),
            drive_events: EventHub::new(),
            audio: Vec::new(),
            text: VecDeque::new(),
            idle,
        })
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn cpu(&self) -> &CPU<C64Memory> {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut CPU<C64Memory> {
        &mut self.cpu
    }

    pub fn memory(&self) -> &C64Memory {
        self.cpu.memory()
    }

    pub fn memory_mut(&mut self) -> &mut C64Memory {
        self.cpu.memory_mut()
    }

    pub fn bus(&self) -> &IecBus {
        &self.bus
    }

    /// Total CPU cycles since power-on.
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles()
    }

    /// Runs one instruction (or interrupt entry, or serviced KERNAL
    /// routine) and advances the chips by its cycle count.
    pub fn step(&mut self) -> Result<u32> {
        let cycles = match self.trap_at(self.cpu.pc()) {
            Some(trap) => self.service_trap(trap),
            None => u32::from(self.cpu.execute_one()?),
        };
        self.cpu.memory_mut().advance(cycles);
        self.inject_text();
        self.dispatch_chip_output();
        self.poll_activity_timers();
        Ok(cycles)
    }

    /// Runs whole instructions until at least one frame's worth of cycles
    /// has passed.
    pub fn run_frame(&mut self) -> Result<u32> {
        let budget = self.config.region.cycles_per_frame();
        let mut done = 0;
        while done < budget {
            done += self.step()?;
        }
        self.flush_audio();
        Ok(done)
    }

    /// Warm reset: CPU and chips restart, RAM and attached images stay.
    pub fn reset(&mut self) {
        info!("C64 reset");
        self.cpu.memory_mut().reset();
        self.bus.reset();
        self.cpu.reset();
        self.forward_drive_events();
    }

    fn trap_at(&self, pc: u16) -> Option<Trap> {
        if !(0xED09..=0xEE13).contains(&pc)
            || self.cpu.is_jammed()
            || !self.cpu.memory().kernal_visible()
        {
            return None;
        }
        TRAPS
            .iter()
            .find(|(address, _)| *address == pc)
            .map(|&(_, trap)| trap)
    }

    fn service_trap(&mut self, trap: Trap) -> u32 {
        let a = self.cpu.a();
        let status = match trap {
            Trap::Talk => self.bus.talk(a),
            Trap::Listen => self.bus.listen(a),
            Trap::Second => self.bus.second(a),
            Trap::Tksa => self.bus.tksa(a),
            Trap::Ciout => self.bus.ciout(a),
            Trap::Untalk => self.bus.untalk(),
            Trap::Unlisten => self.bus.unlisten(),
            Trap::Acptr => {
                let (byte, status) = self.bus.acptr();
                self.cpu.set_a(byte);
                status
            }
        };
        if !matches!(trap, Trap::Acptr | Trap::Ciout) {
            debug!("iec: {:?} A=${:02X} -> ST ${:02X}", trap, a, status);
        }

        let memory = self.cpu.memory_mut();
        let st = memory.read(KERNAL_STATUS);
        memory.write(KERNAL_STATUS, st | status);

        // RTS
        let sp = self.cpu.sp();
        let lo = self.cpu.memory().read(0x0100 | u16::from(sp.wrapping_add(1)));
        let hi = self.cpu.memory().read(0x0100 | u16::from(sp.wrapping_add(2)));
        self.cpu.set_sp(sp.wrapping_add(2));
        self.cpu
            .set_pc(u16::from_le_bytes([lo, hi]).wrapping_add(1));
        self.cpu.set_flag_c(false);
        self.cpu.add_cycles(u64::from(TRAP_CYCLES));

        self.forward_drive_events();
        TRAP_CYCLES
    }

    fn dispatch_chip_output(&mut self) {
        for event in self.cpu.memory_mut().vic.drain_events() {
            self.video.emit(&event);
        }
        if self.cpu.memory().sid.samples().len() >= AUDIO_CHUNK {
            self.flush_audio();
        }
    }

    /// Hands any buffered PCM bytes to the audio sinks.
    pub fn flush_audio(&mut self) {
        let memory = self.cpu.memory_mut();
        let samples = memory.sid.samples();
        if !samples.is_empty() {
            for sink in &mut self.audio {
                sink.consume(samples);
            }
        }
        memory.sid.clear_samples();
    }

    fn forward_drive_events(&mut self) {
        let now = Instant::now();
        for event in self.bus.drain_events() {
            match event {
                DriveEvent::Activity {
                    drive,
                    state: DriveActivity::Idle,
                    ..
                } => {
                    if let Some(notice) = self.idle.get_mut(drive as usize) {
                        notice.timer.restart(now);
                        notice.pending = Some(event);
                    }
                }
                DriveEvent::Activity { drive, .. } => {
                    if let Some(notice) = self.idle.get_mut(drive as usize) {
                        notice.timer.cancel();
                        notice.pending = None;
                    }
                    self.drive_events.emit(&event);
                }
                other => self.drive_events.emit(&other),
            }
        }
    }

    /// Delivers drive events that do not need the CPU to run: pending
    /// events from the bus and idle notices whose timer ran out.
    pub(crate) fn service_drive_events(&mut self) {
        self.forward_drive_events();
        self.poll_activity_timers();
    }

    fn poll_activity_timers(&mut self) {
        if !self.idle.iter().any(|n| n.timer.is_armed()) {
            return;
        }
        let now = Instant::now();
        for notice in &mut self.idle {
            if notice.timer.poll(now) {
                if let Some(event) = notice.pending.take() {
                    self.drive_events.emit(&event);
                }
            }
        }
    }

    /// Queues text for the KERNAL keyboard buffer. It is typed once the
    /// KERNAL has booted, at most ten characters at a time.
    pub fn type_text(&mut self, text: &str) {
        self.text.extend(text.chars().map(|c| match c {
            '\n' => 0x0D,
            c => ascii_to_petscii(c),
        }));
    }

    pub fn pending_text(&self) -> usize {
        self.text.len()
    }

    fn inject_text(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let memory = self.cpu.memory_mut();
        if !memory.cia1.boot_complete() {
            return;
        }
        let ram = memory.ram_mut();
        if ram[KEYBOARD_COUNT as usize] != 0 {
            return;
        }
        let count = self.text.len().min(KEYBOARD_BUFFER_SIZE);
        for (i, byte) in self.text.drain(..count).enumerate() {
            ram[KEYBOARD_BUFFER as usize + i] = byte;
        }
        ram[KEYBOARD_COUNT as usize] = count as u8;
    }

    /// Copies a PRG into RAM at its load address and returns the end
    /// address. Programs loaded at $0801 get the BASIC pointers set so that
    /// `RUN` works.
    pub fn load_prg(&mut self, data: &[u8]) -> Result<u16> {
        if data.len() < 2 {
            return Err(DiskError::Truncated { offset: data.len() }.into());
        }
        let start = u16::from_le_bytes([data[0], data[1]]);
        let body = &data[2..];
        let end = start as usize + body.len();
        if end > 0x10000 {
            return Err(DiskError::Corrupt(format!(
                "program at ${:04X} runs past $FFFF",
                start
            ))
            .into());
        }
        let end = end as u16;
        let ram = self.cpu.memory_mut().ram_mut();
        ram[start as usize..start as usize + body.len()].copy_from_slice(body);

        let [lo, hi] = end.to_le_bytes();
        ram[LOAD_END as usize] = lo;
        ram[LOAD_END as usize + 1] = hi;
        if start == BASIC_START {
            for pointer in BASIC_POINTERS {
                ram[pointer as usize] = lo;
                ram[pointer as usize + 1] = hi;
            }
        }
        info!("loaded program ${:04X}-${:04X}", start, end);
        Ok(end)
    }

    pub fn drive(&self, index: u8) -> Option<&Drive> {
        self.bus.drive(index)
    }

    /// Direct access to a drive. Its events reach listeners with the next
    /// serial bus access or attach.
    pub fn drive_mut(&mut self, index: u8) -> Result<&mut Drive> {
        self.bus
            .drive_mut(index)
            .ok_or(MachineError::NoSuchDrive(index))
    }

    /// Attaches an image, detecting the format from its name and contents.
    pub fn attach_image(&mut self, drive: u8, name: &str, bytes: Vec<u8>) -> Result<()> {
        self.drive_mut(drive)?.attach_image(name, bytes)?;
        self.forward_drive_events();
        Ok(())
    }

    /// Attaches an image with a previously saved delta applied.
    pub fn attach_image_with_delta(
        &mut self,
        drive: u8,
        name: &str,
        bytes: Vec<u8>,
        delta: &[u8],
    ) -> Result<()> {
        self.drive_mut(drive)?.attach_with_delta(name, bytes, delta)?;
        self.forward_drive_events();
        Ok(())
    }

    pub fn detach_image(&mut self, drive: u8) -> Result<()> {
        self.drive_mut(drive)?.detach_image();
        self.forward_drive_events();
        Ok(())
    }

    /// Delta of the image in `drive` against what was attached, together
    /// with the file name it should be saved under.
    pub fn create_delta(&self, drive: u8) -> Result<Option<(String, Vec<u8>)>> {
        let drive = self.bus.drive(drive).ok_or(MachineError::NoSuchDrive(drive))?;
        let (Some(name), Some(delta)) = (drive.image_name(), drive.create_delta()?) else {
            return Ok(None);
        };
        Ok(Some((self.config.delta_name(name), delta)))
    }

    /// True while any drive transfers file data.
    pub fn drive_busy(&self) -> bool {
        self.bus
            .drives()
            .iter()
            .any(|d| matches!(d.state(), DriveState::Reading | DriveState::Writing))
    }

    pub fn subscribe_video<F>(&mut self, listener: F)
    where
        F: FnMut(&VideoEvent) + Send + 'static,
    {
        self.video.subscribe(listener);
    }

    pub fn subscribe_drive<F>(&mut self, listener: F)
    where
        F: FnMut(&DriveEvent) + Send + 'static,
    {
        self.drive_events.subscribe(listener);
    }

    pub fn add_audio_sink(&mut self, sink: impl AudioSink + 'static) {
        self.audio.push(Box::new(sink));
    }

    /// RGB frame, [`FrameGeometry::width`] pixels per row.
    pub fn frame_buffer(&self) -> &[u32] {
        self.cpu.memory().vic.frame_buffer()
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.cpu.memory().vic.geometry()
    }

    pub fn frame_skip(&self) -> u8 {
        self.cpu.memory().vic.frame_skip()
    }

    pub fn set_frame_skip(&mut self, n: u8) {
        let old = self.frame_skip();
        self.cpu.memory_mut().vic.set_frame_skip(n);
        if old != self.frame_skip() {
            info!("frame skip {} -> {}", old, self.frame_skip());
        }
    }

    /// Applies a performance measurement to an automatic frame-skip
    /// setting. Fixed settings ignore it.
    pub fn tune_frame_skip(&mut self, percent: f64) {
        if let FrameSkip::Auto { max } = self.config.frame_skip {
            let next = adjust_frame_skip(self.frame_skip(), max, percent);
            self.set_frame_skip(next);
        }
    }

    /// Presses a key by symbolic name (`"A"`, `"RETURN"`, `"RESTORE"`).
    /// Returns false for unknown names.
    pub fn press_key(&mut self, name: &str) -> bool {
        let keyboard = &mut self.cpu.memory_mut().keyboard;
        match keyboard.key_by_name(name) {
            Some(key) => {
                keyboard.press(key);
                true
            }
            None => false,
        }
    }

    pub fn release_key(&mut self, name: &str) -> bool {
        let keyboard = &mut self.cpu.memory_mut().keyboard;
        match keyboard.key_by_name(name) {
            Some(key) => {
                keyboard.release(key);
                true
            }
            None => false,
        }
    }

    /// Replaces the directions held on joystick `port` (1 or 2).
    pub fn set_joystick(&mut self, port: u8, bits: u8) {
        self.cpu.memory_mut().joysticks.set(port, bits);
    }

    pub fn set_fire(&mut self, port: u8, pressed: bool) {
        let joysticks = &mut self.cpu.memory_mut().joysticks;
        if pressed {
            joysticks.press(port, JOY_FIRE);
        } else {
            joysticks.release(port, JOY_FIRE);
        }
    }

    /// Replaces the drives after a snapshot restore.
    pub(super) fn replace_bus(&mut self, bus: IecBus) {
        self.bus = bus;
        for notice in &mut self.idle {
            notice.timer.cancel();
            notice.pending = None;
        }
        self.forward_drive_events();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::disk::D64Image;
    use std::sync::{Arc, Mutex};

    /// KERNAL that loops at $E000 and returns from every interrupt.
    pub(crate) fn test_kernal() -> Vec<u8> {
        let mut kernal = vec![0xEA; 8192];
        kernal[0..3].copy_from_slice(&[0x4C, 0x00, 0xE0]);
        kernal[3] = 0x40;
        // NMI, RESET, IRQ vectors
        kernal[0x1FFA..].copy_from_slice(&[0x03, 0xE0, 0x00, 0xE0, 0x03, 0xE0]);
        kernal
    }

    pub(crate) fn test_machine(config: MachineConfig) -> C64 {
        C64::with_roms(config, &[0; 8192], &test_kernal(), &[0; 4096]).unwrap()
    }

    /// Puts `code` at $C000 and points the CPU at it.
    pub(crate) fn run_from(machine: &mut C64, code: &[u8]) {
        machine.memory_mut().ram_mut()[0xC000..0xC000 + code.len()].copy_from_slice(code);
        machine.cpu_mut().set_pc(0xC000);
    }

    #[test]
    fn test_starts_at_reset_vector() {
        let machine = test_machine(MachineConfig::default());
        assert_eq!(machine.cpu().pc(), 0xE000);
    }

    #[test]
    fn test_bad_config_is_rejected() {
        let config = MachineConfig {
            drive_count: 0,
            ..MachineConfig::default()
        };
        assert!(matches!(
            C64::with_roms(config, &[0; 8192], &test_kernal(), &[0; 4096]),
            Err(MachineError::Config(_))
        ));
    }

    #[test]
    fn test_frame_events_and_audio() {
        let mut machine = test_machine(MachineConfig::default());
        let frames = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&frames);
        machine.subscribe_video(move |event| {
            if let VideoEvent::FrameReady { .. } = event {
                *counter.lock().unwrap() += 1;
            }
        });
        let bytes = Arc::new(Mutex::new(0usize));
        let total = Arc::clone(&bytes);
        machine.add_audio_sink(move |samples: &[u8]| *total.lock().unwrap() += samples.len());

        for _ in 0..3 {
            machine.run_frame().unwrap();
        }
        assert!(*frames.lock().unwrap() >= 2);
        // About 441 samples per PAL frame at 22050 Hz
        assert!(*bytes.lock().unwrap() > 1000);
    }

    #[test]
    fn test_kernal_serial_trap_reads_drive_status() {
        let mut machine = test_machine(MachineConfig::default());
        machine
            .attach_image(0, "t.d64", D64Image::blank("T", *b"00").data().to_vec())
            .unwrap();
        run_from(
            &mut machine,
            &[
                0xA9, 0x08, 0x20, 0x0C, 0xED, // LDA #8 : JSR LISTEN
                0xA9, 0x6F, 0x20, 0xB9, 0xED, // LDA #$6F : JSR SECOND
                0xA9, 0x49, 0x20, 0xDD, 0xED, // LDA #'I' : JSR CIOUT
                0x20, 0xFE, 0xED, //             JSR UNLSN
                0xA9, 0x08, 0x20, 0x09, 0xED, // LDA #8 : JSR TALK
                0xA9, 0x6F, 0x20, 0xC7, 0xED, // LDA #$6F : JSR TKSA
                0x20, 0x13, 0xEE, //             JSR ACPTR
                0x8D, 0x00, 0xC1, //             STA $C100
                0x4C, 0x22, 0xC0, //             JMP *
            ],
        );
        for _ in 0..40 {
            machine.step().unwrap();
        }
        assert_eq!(machine.memory().ram()[0xC100], b'0');
        assert_eq!(machine.cpu().pc(), 0xC022);
        assert_eq!(machine.memory().ram()[0x90], 0);
    }

    #[test]
    fn test_trap_sets_device_not_present() {
        let mut machine = test_machine(MachineConfig::default());
        run_from(
            &mut machine,
            &[0xA9, 0x0B, 0x20, 0x0C, 0xED, 0x4C, 0x05, 0xC0],
        );
        for _ in 0..4 {
            machine.step().unwrap();
        }
        assert_eq!(machine.memory().ram()[0x90], 0x80);
    }

    #[test]
    fn test_text_injection_waits_for_boot_and_chunks() {
        let mut machine = test_machine(MachineConfig::default());
        machine.type_text("LOAD\"*\",8,1\n");
        machine.step().unwrap();
        assert_eq!(machine.memory().ram()[0xC6], 0);

        let mut machine = test_machine(MachineConfig {
            boot_read_threshold: 0,
            ..MachineConfig::default()
        });
        machine.type_text("LOAD\"*\",8,1\n");
        machine.step().unwrap();
        let ram = machine.memory().ram();
        assert_eq!(ram[0xC6], 10);
        assert_eq!(&ram[0x0277..0x0281], b"LOAD\"*\",8,");
        assert_eq!(machine.pending_text(), 2);

        machine.memory_mut().ram_mut()[0xC6] = 0;
        machine.step().unwrap();
        let ram = machine.memory().ram();
        assert_eq!(ram[0xC6], 2);
        assert_eq!(&ram[0x0277..0x0279], b"1\r");
    }

    #[test]
    fn test_prg_quick_load_sets_basic_pointers() {
        let mut machine = test_machine(MachineConfig::default());
        let end = machine.load_prg(&[0x01, 0x08, 0x0B, 0x08, 0x0A, 0x00]).unwrap();
        assert_eq!(end, 0x0805);
        let ram = machine.memory().ram();
        assert_eq!(&ram[0x0801..0x0805], &[0x0B, 0x08, 0x0A, 0x00]);
        assert_eq!(&ram[0x2D..0x2F], &[0x05, 0x08]);
        assert_eq!(&ram[0x31..0x33], &[0x05, 0x08]);

        assert!(machine.load_prg(&[0x00]).is_err());
        assert!(machine.load_prg(&[0xFF, 0xFF, 1, 2]).is_err());
    }

    #[test]
    fn test_input_by_name() {
        let mut machine = test_machine(MachineConfig::default());
        assert!(machine.press_key("return"));
        assert!(!machine.press_key("NOPE"));
        assert!(machine.release_key("RETURN"));
        machine.set_joystick(2, 0x01);
        machine.set_fire(2, true);
        assert_eq!(machine.memory().joysticks.get(2), 0x11);
        machine.set_fire(2, false);
        assert_eq!(machine.memory().joysticks.get(2), 0x01);
    }

    #[test]
    fn test_auto_frame_skip() {
        let mut machine = test_machine(MachineConfig {
            frame_skip: FrameSkip::Auto { max: 3 },
            ..MachineConfig::default()
        });
        assert_eq!(machine.frame_skip(), 1);
        machine.tune_frame_skip(50.0);
        machine.tune_frame_skip(50.0);
        machine.tune_frame_skip(50.0);
        assert_eq!(machine.frame_skip(), 3);
        machine.tune_frame_skip(120.0);
        assert_eq!(machine.frame_skip(), 2);

        let mut fixed = test_machine(MachineConfig {
            frame_skip: FrameSkip::Fixed(2),
            ..MachineConfig::default()
        });
        fixed.tune_frame_skip(10.0);
        assert_eq!(fixed.frame_skip(), 2);
    }

    #[test]
    fn test_idle_notice_is_delayed() {
        let mut machine = test_machine(MachineConfig {
            drive_activity_timeout_ms: 0,
            ..MachineConfig::default()
        });
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        machine.subscribe_drive(move |event| sink.lock().unwrap().push(event.clone()));

        machine
            .attach_image(0, "t.d64", D64Image::blank("T", *b"00").data().to_vec())
            .unwrap();
        machine.drive_mut(0).unwrap().open(2, b"$");
        machine.drive_mut(0).unwrap().close(2);
        machine.forward_drive_events();
        assert!(!seen
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, DriveEvent::Activity { state: DriveActivity::Idle, .. })));

        machine.step().unwrap();
        let seen = seen.lock().unwrap();
        assert!(matches!(seen[0], DriveEvent::Attached { drive: 0, .. }));
        assert!(matches!(
            seen.last(),
            Some(DriveEvent::Activity {
                state: DriveActivity::Idle,
                ..
            })
        ));
    }

    #[test]
    fn test_reset_keeps_ram() {
        let mut machine = test_machine(MachineConfig::default());
        machine.memory_mut().ram_mut()[0x0801] = 0x42;
        machine.memory_mut().ram_mut()[0xC000] = 0x99;
        machine.cpu_mut().set_pc(0x1234);
        machine.reset();
        assert_eq!(machine.memory_mut().ram_mut()[0x0801], 0x42);
        assert_eq!(machine.memory_mut().ram_mut()[0xC000], 0x99);
        assert_eq!(machine.cpu().pc(), 0xE000);
    }

    #[test]
    fn test_idle_notice_without_stepping() {
        let mut machine = test_machine(MachineConfig {
            drive_activity_timeout_ms: 0,
            ..MachineConfig::default()
        });
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        machine.subscribe_drive(move |event| sink.lock().unwrap().push(event.clone()));
        machine
            .attach_image(0, "t.d64", D64Image::blank("T", *b"00").data().to_vec())
            .unwrap();
        machine.drive_mut(0).unwrap().open(2, b"$");
        machine.drive_mut(0).unwrap().close(2);

        let cycles = machine.cycles();
        machine.service_drive_events();
        assert_eq!(machine.cycles(), cycles);
        assert!(matches!(
            seen.lock().unwrap().last(),
            Some(DriveEvent::Activity {
                state: DriveActivity::Idle,
                ..
            })
        ));
    }

    #[test]
    fn test_delta_name_and_missing_drive() {
        let mut machine = test_machine(MachineConfig::default());
        assert!(machine.create_delta(0).unwrap().is_none());
        assert!(matches!(
            machine.attach_image(3, "x.d64", vec![]),
            Err(MachineError::NoSuchDrive(3))
        ));
        machine
            .attach_image(0, "game.d64", D64Image::blank("G", *b"00").data().to_vec())
            .unwrap();
        let (name, delta) = machine.create_delta(0).unwrap().unwrap();
        assert_eq!(name, "game.d64.gzd");
        assert!(delta.is_empty());
    }
}
