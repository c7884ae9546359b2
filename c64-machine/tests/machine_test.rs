//! Whole-machine behavior: interrupt timing, configuration, ROM loading,
//! snapshots and the scheduler thread.

use std::io;
use std::thread;
use std::time::Duration;

use c64_machine::disk::{D64Image, DriveHandler};
use c64_machine::system::{DirectoryLoader, KERNAL_ROM};
use c64_machine::{
    DriveEvent, MachineConfig, MachineError, Region, Scheduler, SchedulerState, SnapshotError, C64,
};
use cpu6502::MemoryBus;

const IRQ_HANDLER: u16 = 0xE010;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// KERNAL that idles at $E000 and returns from interrupts at $E010.
fn kernal() -> Vec<u8> {
    let mut kernal = vec![0xEA; 8192];
    kernal[0..3].copy_from_slice(&[0x4C, 0x00, 0xE0]);
    kernal[0x10] = 0x40;
    kernal[0x1FFA..].copy_from_slice(&[0x10, 0xE0, 0x00, 0xE0, 0x10, 0xE0]);
    kernal
}

fn machine(config: MachineConfig) -> C64 {
    C64::with_roms(config, &[0; 8192], &kernal(), &[0; 4096]).unwrap()
}

fn run_until_pc(machine: &mut C64, pc: u16) {
    for _ in 0..100_000 {
        if machine.cpu().pc() == pc {
            return;
        }
        machine.step().unwrap();
    }
    panic!("PC never reached ${:04X}", pc);
}

#[test]
fn test_timer_interrupt_window() {
    init_logging();
    for latch in [40u16, 333, 1000] {
        let mut c64 = machine(MachineConfig::default());
        let [lo, hi] = latch.to_le_bytes();
        let program = [
            0xA9, 0x81, //       LDA #$81
            0x8D, 0x0D, 0xDC, // STA $DC0D   enable timer A interrupt
            0xA9, lo, //         LDA #<latch
            0x8D, 0x04, 0xDC, // STA $DC04
            0xA9, hi, //         LDA #>latch
            0x8D, 0x05, 0xDC, // STA $DC05
            0x58, //             CLI
            0xA9, 0x19, //       LDA #$19    force load, one-shot, start
            0x8D, 0x0E, 0xDC, // STA $DC0E
            0x4C, 0x15, 0xC0, // JMP *
        ];
        c64.memory_mut().ram_mut()[0xC000..0xC000 + program.len()].copy_from_slice(&program);
        c64.cpu_mut().set_pc(0xC000);

        run_until_pc(&mut c64, 0xC012);
        let started = c64.cycles();
        run_until_pc(&mut c64, IRQ_HANDLER);
        // Interrupt entry takes seven cycles.
        let taken = c64.cycles() - 7 - started;
        assert!(
            taken >= u64::from(latch) && taken <= u64::from(latch) + 7,
            "latch {} taken after {}",
            latch,
            taken
        );
    }
}

#[test]
fn test_config_from_json() {
    let config = MachineConfig::from_json(r#"{ "region": "NTSC", "drive_count": 2 }"#).unwrap();
    assert_eq!(config.region, Region::NTSC);
    assert_eq!(config.drive_count, 2);
    assert!(config.throttle);

    let back = MachineConfig::from_json(&config.to_json().unwrap()).unwrap();
    assert_eq!(back, config);

    assert!(matches!(
        MachineConfig::from_json(r#"{ "drive_count": 9 }"#),
        Err(MachineError::Config(_))
    ));
    assert!(matches!(
        MachineConfig::from_json("{ nope"),
        Err(MachineError::Serde(_))
    ));
}

#[test]
fn test_roms_from_a_directory() {
    init_logging();
    let root = std::env::temp_dir().join(format!("c64-roms-{}", std::process::id()));
    std::fs::create_dir_all(root.join("roms")).unwrap();
    std::fs::write(root.join("roms/basic.c64"), vec![0; 8192]).unwrap();
    std::fs::write(root.join("roms/chargen.c64"), vec![0; 4096]).unwrap();

    let loader = DirectoryLoader::new(&root);
    match C64::new(MachineConfig::default(), &loader) {
        Err(MachineError::RomMissing { name, .. }) => assert_eq!(name, KERNAL_ROM),
        other => panic!("unexpected: {:?}", other.map(|_| ())),
    }

    std::fs::write(root.join("roms/kernal.c64"), vec![0; 100]).unwrap();
    assert!(matches!(
        C64::new(MachineConfig::default(), &loader),
        Err(MachineError::RomSize { .. })
    ));

    std::fs::write(root.join("roms/kernal.c64"), kernal()).unwrap();
    let c64 = C64::new(MachineConfig::default(), &loader).unwrap();
    assert_eq!(c64.cpu().pc(), 0xE000);

    std::fs::remove_dir_all(&root).unwrap();
}

#[test]
fn test_snapshot_moves_a_running_machine() {
    init_logging();
    let disk = D64Image::blank("SNAPSHOT", *b"S1").data().to_vec();
    let mut source = machine(MachineConfig::default());
    source.attach_image(0, "snap.d64", disk.clone()).unwrap();
    source.drive_mut(0).unwrap().command("N0:RENAMED,S2");
    source.run_frame().unwrap();
    source.memory_mut().write(0x0400, 0x01);
    let snapshot = source.save_snapshot().unwrap();

    let mut target = machine(MachineConfig::default());
    target.memory_mut().write(0x0400, 0x20);
    let images = move |name: &str| -> io::Result<Vec<u8>> {
        assert_eq!(name, "snap.d64");
        Ok(disk.clone())
    };
    target.restore_snapshot(&snapshot, &images).unwrap();

    assert_eq!(target.cycles(), source.cycles());
    assert_eq!(target.cpu().pc(), source.cpu().pc());
    assert_eq!(target.memory().ram()[0x0400], 0x01);
    let handler = target.drive(0).unwrap().handler().unwrap();
    assert_eq!(handler.label(), "RENAMED");
    assert_eq!(handler.disk_id(), *b"S2");
}

#[test]
fn test_corrupt_snapshot_keeps_the_machine() {
    let source = machine(MachineConfig::default());
    let mut snapshot = source.save_snapshot().unwrap();
    let len = snapshot.len();
    snapshot.truncate(len / 2);

    let mut target = machine(MachineConfig::default());
    target.memory_mut().write(0x2000, 0x33);
    let before = target.cpu().state();
    let no_images =
        |_: &str| -> io::Result<Vec<u8>> { Err(io::Error::from(io::ErrorKind::NotFound)) };
    assert!(matches!(
        target.restore_snapshot(&snapshot, &no_images),
        Err(MachineError::Snapshot(SnapshotError::Truncated { .. }))
    ));
    assert_eq!(target.cpu().state(), before);
    assert_eq!(target.memory().ram()[0x2000], 0x33);
}

#[test]
fn test_scheduler_controlled_from_other_threads() {
    init_logging();
    let scheduler = Scheduler::spawn(machine(MachineConfig {
        throttle: false,
        ..MachineConfig::default()
    }))
    .unwrap();

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let handle = scheduler.handle();
            thread::spawn(move || {
                if i % 2 == 0 {
                    handle.pause().unwrap();
                } else {
                    handle.resume().unwrap();
                }
                handle.with_machine(|m| m.cycles()).unwrap()
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    scheduler.pause().unwrap();
    let paused_at = scheduler.with_machine(|m| m.cycles()).unwrap();
    thread::sleep(Duration::from_millis(10));
    assert_eq!(scheduler.with_machine(|m| m.cycles()).unwrap(), paused_at);
    assert_eq!(scheduler.state(), SchedulerState::Paused);

    scheduler
        .attach_image(0, "live.d64", D64Image::blank("LIVE", *b"LV").data().to_vec())
        .unwrap();
    assert!(matches!(
        scheduler.attach_image(3, "x.d64", Vec::new()),
        Err(MachineError::NoSuchDrive(3))
    ));
    scheduler.resume().unwrap();
    thread::sleep(Duration::from_millis(10));

    let handle = scheduler.handle();
    let machine = scheduler.join().unwrap();
    assert!(machine.cycles() > paused_at);
    assert_eq!(
        machine.drive(0).unwrap().image_name(),
        Some("live.d64")
    );
    assert!(matches!(handle.resume(), Err(MachineError::Stopped)));
}

#[test]
fn test_drive_events_reach_listeners() {
    let mut c64 = machine(MachineConfig::default());
    let (tx, rx) = std::sync::mpsc::channel();
    c64.subscribe_drive(move |event| {
        let _ = tx.send(event.clone());
    });
    c64.attach_image(0, "ev.d64", D64Image::blank("EVENTS", *b"EV").data().to_vec())
        .unwrap();
    c64.detach_image(0).unwrap();
    let events: Vec<_> = rx.try_iter().collect();
    assert!(events.contains(&DriveEvent::Attached {
        drive: 0,
        label: "EVENTS".to_string()
    }));
    assert!(events.contains(&DriveEvent::Detached { drive: 0 }));
}
