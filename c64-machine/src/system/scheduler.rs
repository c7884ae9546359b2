//! Runs a [`C64`] on its own thread.
//!
//! The thread owns the machine outright. Everything else talks to it through
//! a [`SchedulerHandle`], whose requests travel over a channel and are
//! picked up between two instructions. While paused the thread blocks on
//! that channel, so a paused machine costs nothing.
//!
//! Pacing compares emulated time with the wall clock every
//! [`PACE_SLICE_US`] microseconds of emulated time and sleeps off any lead.
//! Turbo (throttle off) and auto-throttle during disk transfers skip the
//! sleep; the pacer is rebased whenever pacing switches back on so the
//! machine does not rush to catch up.
//!
//! A paused thread still wakes every [`IDLE_POLL`] to deliver drive idle
//! notices, so an activity indicator goes dark without the CPU running.

use std::ops::Deref;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::machine::C64;
use super::pacing::{Pacer, PerformanceMeter};
use super::resources::ResourceLoader;
use crate::error::{MachineError, Result};

/// Emulated time between two pacing checks.
pub const PACE_SLICE_US: u64 = 2_000;

/// Leads shorter than this are not worth a sleep.
const MIN_SLEEP: Duration = Duration::from_micros(500);

/// How long a paused thread waits for a command before servicing drive
/// events.
pub const IDLE_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Paused,
    Stopped,
}

impl SchedulerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SchedulerState::Running,
            1 => SchedulerState::Paused,
            _ => SchedulerState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            SchedulerState::Running => 0,
            SchedulerState::Paused => 1,
            SchedulerState::Stopped => 2,
        }
    }
}

type Job = Box<dyn FnOnce(&mut C64) + Send>;

enum Command {
    Pause,
    Resume,
    Reset,
    Stop,
    Run(Job),
}

/// Cloneable remote control for a running machine.
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: Sender<Command>,
    state: Arc<AtomicU8>,
}

impl std::fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("state", &self.state())
            .finish()
    }
}

impl SchedulerHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| MachineError::Stopped)
    }

    /// State as of the last command the thread processed.
    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(Command::Resume)
    }

    /// Warm reset at the next instruction boundary. A paused machine stays
    /// paused.
    pub fn reset(&self) -> Result<()> {
        self.send(Command::Reset)
    }

    /// Ends the thread for good. Later requests fail with
    /// [`MachineError::Stopped`].
    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }

    /// Runs `f` on the scheduler thread between two instructions and waits
    /// for its result. Works while paused.
    pub fn with_machine<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut C64) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, result) = mpsc::channel();
        self.send(Command::Run(Box::new(move |machine| {
            let _ = reply.send(f(machine));
        })))?;
        result.recv().map_err(|_| MachineError::Stopped)
    }

    pub fn press_key(&self, name: &str) -> Result<bool> {
        let name = name.to_string();
        self.with_machine(move |m| m.press_key(&name))
    }

    pub fn release_key(&self, name: &str) -> Result<bool> {
        let name = name.to_string();
        self.with_machine(move |m| m.release_key(&name))
    }

    pub fn set_joystick(&self, port: u8, bits: u8) -> Result<()> {
        self.with_machine(move |m| m.set_joystick(port, bits))
    }

    pub fn set_fire(&self, port: u8, pressed: bool) -> Result<()> {
        self.with_machine(move |m| m.set_fire(port, pressed))
    }

    pub fn type_text(&self, text: &str) -> Result<()> {
        let text = text.to_string();
        self.with_machine(move |m| m.type_text(&text))
    }

    pub fn attach_image(&self, drive: u8, name: &str, bytes: Vec<u8>) -> Result<()> {
        let name = name.to_string();
        self.with_machine(move |m| m.attach_image(drive, &name, bytes))?
    }

    pub fn detach_image(&self, drive: u8) -> Result<()> {
        self.with_machine(move |m| m.detach_image(drive))?
    }

    /// Delta of the image in `drive`, taken between instructions so no
    /// transfer is half done.
    pub fn create_delta(&self, drive: u8) -> Result<Option<(String, Vec<u8>)>> {
        self.with_machine(move |m| m.create_delta(drive))?
    }

    pub fn save_snapshot(&self) -> Result<Vec<u8>> {
        self.with_machine(|m| m.save_snapshot())?
    }

    pub fn restore_snapshot<L>(&self, data: Vec<u8>, images: L) -> Result<()>
    where
        L: ResourceLoader + 'static,
    {
        self.with_machine(move |m| m.restore_snapshot(&data, &images))?
    }
}

/// Owns the emulation thread. Dropping it stops the machine.
pub struct Scheduler {
    handle: SchedulerHandle,
    thread: Option<JoinHandle<C64>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.handle.state())
            .finish()
    }
}

impl Scheduler {
    /// Moves `machine` onto a new thread and starts running it.
    pub fn spawn(machine: C64) -> Result<Self> {
        let (commands, inbox) = mpsc::channel();
        let state = Arc::new(AtomicU8::new(SchedulerState::Running.as_u8()));
        let shared = Arc::clone(&state);
        let thread = thread::Builder::new()
            .name("c64-scheduler".into())
            .spawn(move || run_loop(machine, inbox, shared))
            .map_err(MachineError::Spawn)?;
        Ok(Self {
            handle: SchedulerHandle { commands, state },
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Stops the thread and hands the machine back.
    pub fn join(mut self) -> Result<C64> {
        let thread = self.thread.take().ok_or(MachineError::Stopped)?;
        let _ = self.handle.stop();
        thread.join().map_err(|_| MachineError::Panicked)
    }
}

impl Deref for Scheduler {
    type Target = SchedulerHandle;

    fn deref(&self) -> &SchedulerHandle {
        &self.handle
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.handle.stop();
            let _ = thread.join();
        }
    }
}

struct Loop {
    machine: C64,
    state: Arc<AtomicU8>,
    paused: bool,
    paced: bool,
    pacer: Pacer,
    meter: PerformanceMeter,
    slice: u64,
    next_check: u64,
}

/// Whether the machine should be held to real time right now.
fn pacing_wanted(machine: &C64) -> bool {
    let config = machine.config();
    config.throttle && !(config.auto_throttle && machine.drive_busy())
}

impl Loop {
    fn new(machine: C64, state: Arc<AtomicU8>) -> Self {
        let clock = machine.config().region.clock_hz();
        let now = Instant::now();
        let cycles = machine.cycles();
        let slice = u64::from(clock) * PACE_SLICE_US / 1_000_000;
        Self {
            pacer: Pacer::new(clock, now, cycles),
            meter: PerformanceMeter::new(clock, now, cycles),
            paced: true,
            paused: false,
            slice,
            next_check: cycles + slice,
            state,
            machine,
        }
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    fn rebase(&mut self) {
        let now = Instant::now();
        let cycles = self.machine.cycles();
        self.pacer.rebase(now, cycles);
        self.meter.restart(now, cycles);
        self.next_check = cycles + self.slice;
    }

    fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.set_state(SchedulerState::Paused);
            info!("scheduler paused at PC ${:04X}", self.machine.cpu().pc());
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Pause => self.pause(),
            Command::Resume => {
                if self.paused {
                    self.paused = false;
                    self.rebase();
                    self.set_state(SchedulerState::Running);
                    info!("scheduler resumed");
                }
            }
            Command::Reset => {
                self.machine.reset();
                self.rebase();
            }
            Command::Run(job) => job(&mut self.machine),
            Command::Stop => {}
        }
    }

    fn pace(&mut self) {
        let cycles = self.machine.cycles();
        if cycles < self.next_check {
            return;
        }
        self.next_check = cycles + self.slice;

        let now = Instant::now();
        let pace = pacing_wanted(&self.machine);
        if pace != self.paced {
            debug!("pacing {}", if pace { "on" } else { "off" });
            self.paced = pace;
            self.pacer.rebase(now, cycles);
        }
        if pace {
            let lead = self.pacer.ahead_by(now, cycles);
            if lead >= MIN_SLEEP {
                thread::sleep(lead);
            }
        }
        if let Some(percent) = self.meter.sample(now, cycles) {
            debug!("running at {:.1}%", percent);
            self.machine.tune_frame_skip(percent);
        }
    }
}

fn run_loop(machine: C64, inbox: Receiver<Command>, state: Arc<AtomicU8>) -> C64 {
    let mut run = Loop::new(machine, state);
    info!("scheduler started");

    loop {
        if run.paused {
            match inbox.recv_timeout(IDLE_POLL) {
                Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(command) => run.handle(command),
                Err(RecvTimeoutError::Timeout) => run.machine.service_drive_events(),
            }
            continue;
        }
        match inbox.try_recv() {
            Ok(Command::Stop) | Err(TryRecvError::Disconnected) => break,
            Ok(command) => {
                run.handle(command);
                continue;
            }
            Err(TryRecvError::Empty) => {}
        }

        if let Err(err) = run.machine.step() {
            warn!("{}; pausing", err);
            run.pause();
            continue;
        }
        run.pace();
    }

    run.machine.flush_audio();
    run.set_state(SchedulerState::Stopped);
    info!("scheduler stopped after {} cycles", run.machine.cycles());
    run.machine
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IllegalOpcodes, MachineConfig};
    use crate::disk::D64Image;
    use crate::events::{DriveActivity, DriveEvent};
    use crate::system::machine::tests::{run_from, test_machine};

    fn turbo() -> MachineConfig {
        MachineConfig {
            throttle: false,
            ..MachineConfig::default()
        }
    }

    #[test]
    fn test_pause_resume_stop() {
        let scheduler = Scheduler::spawn(test_machine(turbo())).unwrap();
        let handle = scheduler.handle();

        handle.pause().unwrap();
        let first = handle.with_machine(|m| m.cycles()).unwrap();
        assert_eq!(handle.state(), SchedulerState::Paused);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(handle.with_machine(|m| m.cycles()).unwrap(), first);

        handle.resume().unwrap();
        thread::sleep(Duration::from_millis(20));
        let later = handle.with_machine(|m| m.cycles()).unwrap();
        assert!(later > first);
        assert_eq!(handle.state(), SchedulerState::Running);

        let machine = scheduler.join().unwrap();
        assert!(machine.cycles() >= later);
        assert_eq!(handle.state(), SchedulerState::Stopped);
        assert!(matches!(handle.pause(), Err(MachineError::Stopped)));
        assert!(matches!(
            handle.with_machine(|m| m.cycles()),
            Err(MachineError::Stopped)
        ));
    }

    #[test]
    fn test_control_from_another_thread() {
        let scheduler = Scheduler::spawn(test_machine(turbo())).unwrap();
        let handle = scheduler.handle();
        let remote = thread::spawn(move || {
            handle.pause().unwrap();
            handle.with_machine(|m| m.cpu_mut().set_a(0x77)).unwrap();
            handle.reset().unwrap();
            handle.with_machine(|m| (m.cpu().pc(), m.cpu().a())).unwrap()
        });
        let (pc, a) = remote.join().unwrap();
        assert_eq!(pc, 0xE000);
        assert_eq!(a, 0x77);
        assert_eq!(scheduler.state(), SchedulerState::Paused);
        scheduler.stop().unwrap();
    }

    #[test]
    fn test_cpu_fault_pauses() {
        let mut machine = test_machine(MachineConfig {
            illegal_opcodes: IllegalOpcodes::Fatal,
            ..turbo()
        });
        // SLO $10
        run_from(&mut machine, &[0x07, 0x10]);
        let scheduler = Scheduler::spawn(machine).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while scheduler.state() != SchedulerState::Paused && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(scheduler.state(), SchedulerState::Paused);
        assert_eq!(scheduler.with_machine(|m| m.cpu().pc()).unwrap(), 0xC000);
    }

    #[test]
    fn test_throttled_machine_keeps_real_time() {
        let scheduler = Scheduler::spawn(test_machine(MachineConfig::default())).unwrap();
        let start = scheduler.with_machine(|m| m.cycles()).unwrap();
        thread::sleep(Duration::from_millis(100));
        let done = scheduler.with_machine(|m| m.cycles()).unwrap() - start;
        // 100 ms of PAL is about 98,500 cycles
        assert!(done < 200_000, "ran {} cycles", done);
    }

    #[test]
    fn test_auto_throttle_skips_pacing_during_transfer() {
        let mut machine = test_machine(MachineConfig::default());
        machine
            .attach_image(0, "t.d64", D64Image::blank("T", *b"00").data().to_vec())
            .unwrap();
        let mut run = Loop::new(machine, Arc::new(AtomicU8::new(0)));

        run.machine.drive_mut(0).unwrap().open(2, b"$");
        assert!(run.machine.drive_busy());
        run.next_check = 0;
        run.pace();
        assert!(!run.paced);

        run.machine.drive_mut(0).unwrap().close(2);
        assert!(!run.machine.drive_busy());
        run.next_check = 0;
        run.pace();
        assert!(run.paced);
    }

    #[test]
    fn test_pacing_kept_during_transfer_without_auto_throttle() {
        let mut machine = test_machine(MachineConfig {
            auto_throttle: false,
            ..MachineConfig::default()
        });
        machine
            .attach_image(0, "t.d64", D64Image::blank("T", *b"00").data().to_vec())
            .unwrap();
        machine.drive_mut(0).unwrap().open(2, b"$");
        assert!(machine.drive_busy());
        assert!(pacing_wanted(&machine));
        assert!(!pacing_wanted(&test_machine(turbo())));
    }

    #[test]
    fn test_idle_notice_arrives_while_paused() {
        let mut machine = test_machine(MachineConfig {
            drive_activity_timeout_ms: 20,
            ..turbo()
        });
        let (events, inbox) = mpsc::channel();
        machine.subscribe_drive(move |event| {
            let _ = events.send(event.clone());
        });
        let scheduler = Scheduler::spawn(machine).unwrap();
        scheduler.pause().unwrap();
        scheduler
            .attach_image(0, "t.d64", D64Image::blank("T", *b"00").data().to_vec())
            .unwrap();
        let cycles = scheduler
            .with_machine(|m| {
                m.drive_mut(0).unwrap().open(2, b"$");
                m.drive_mut(0).unwrap().close(2);
                m.cycles()
            })
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut idle = false;
        while !idle && Instant::now() < deadline {
            if let Ok(event) = inbox.recv_timeout(Duration::from_millis(100)) {
                idle = matches!(
                    event,
                    DriveEvent::Activity {
                        state: DriveActivity::Idle,
                        ..
                    }
                );
            }
        }
        assert!(idle);
        assert_eq!(scheduler.state(), SchedulerState::Paused);
        assert_eq!(scheduler.with_machine(|m| m.cycles()).unwrap(), cycles);
    }
}
