//! Serial bus at the KERNAL call level.
//!
//! The machine traps the KERNAL's LISTEN, TALK, SECOND, TKSA, CIOUT, ACPTR,
//! UNLISTEN and UNTALK routines and forwards them here. Secondary
//! addresses follow the KERNAL:
//!
//! - `$60 + channel`: data transfer on an open channel
//! - `$E0 + channel`: CLOSE
//! - `$F0 + channel`: OPEN, the filename follows as LISTEN data
//!
//! Every call returns the bits it adds to the KERNAL status byte `ST`.

use log::trace;

use super::drive::{Drive, FIRST_DEVICE};
use crate::events::DriveEvent;

/// `ST` bit: last byte of a transfer.
pub const STATUS_EOI: u8 = 0x40;
/// `ST` bit: the talker had nothing to send.
pub const STATUS_READ_TIMEOUT: u8 = 0x02;
/// `ST` bit: no device answered.
pub const STATUS_DEVICE_NOT_PRESENT: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IecState {
    #[default]
    Idle,
    Listen,
    Talk,
}

/// What the current LISTEN secondary address asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Secondary {
    Data,
    Open,
}

#[derive(Debug)]
pub struct IecBus {
    drives: Vec<Drive>,
    state: IecState,
    /// Index of the addressed drive.
    active: Option<usize>,
    channel: u8,
    secondary: Secondary,
    name: Vec<u8>,
}

impl IecBus {
    /// A bus with `count` drives at devices 8, 9, ...
    pub fn new(count: u8) -> Self {
        Self {
            drives: (0..count).map(Drive::new).collect(),
            state: IecState::Idle,
            active: None,
            channel: 0,
            secondary: Secondary::Data,
            name: Vec::new(),
        }
    }

    pub fn state(&self) -> IecState {
        self.state
    }

    pub fn drives(&self) -> &[Drive] {
        &self.drives
    }

    pub fn drive(&self, index: u8) -> Option<&Drive> {
        self.drives.get(index as usize)
    }

    pub fn drive_mut(&mut self, index: u8) -> Option<&mut Drive> {
        self.drives.get_mut(index as usize)
    }

    pub fn reset(&mut self) {
        self.state = IecState::Idle;
        self.active = None;
        self.channel = 0;
        self.secondary = Secondary::Data;
        self.name.clear();
        for drive in &mut self.drives {
            drive.reset();
        }
    }

    /// Events of all drives, in drive order.
    pub fn drain_events(&mut self) -> Vec<DriveEvent> {
        self.drives
            .iter_mut()
            .flat_map(|d| d.drain_events().collect::<Vec<_>>())
            .collect()
    }

    fn address(&mut self, device: u8, state: IecState) -> u8 {
        let device = device & 0x1F;
        self.active = device
            .checked_sub(FIRST_DEVICE)
            .map(usize::from)
            .filter(|&i| i < self.drives.len());
        self.secondary = Secondary::Data;
        self.name.clear();
        match self.active {
            Some(_) => {
                self.state = state;
                0
            }
            None => {
                self.state = IecState::Idle;
                trace!("iec: device {} not present", device);
                STATUS_DEVICE_NOT_PRESENT
            }
        }
    }

    fn active_drive(&mut self) -> Option<&mut Drive> {
        let index = self.active?;
        self.drives.get_mut(index)
    }

    pub fn listen(&mut self, device: u8) -> u8 {
        self.address(device, IecState::Listen)
    }

    pub fn talk(&mut self, device: u8) -> u8 {
        self.address(device, IecState::Talk)
    }

    /// Secondary address after LISTEN.
    pub fn second(&mut self, secondary: u8) -> u8 {
        let channel = secondary & 0x0F;
        self.channel = channel;
        self.secondary = Secondary::Data;
        if self.active.is_none() {
            return STATUS_DEVICE_NOT_PRESENT;
        }
        match secondary & 0xF0 {
            0xE0 => {
                if let Some(drive) = self.active_drive() {
                    drive.close(channel);
                }
            }
            0xF0 => {
                self.secondary = Secondary::Open;
                self.name.clear();
            }
            _ => {}
        }
        0
    }

    /// Secondary address after TALK.
    pub fn tksa(&mut self, secondary: u8) -> u8 {
        self.channel = secondary & 0x0F;
        if self.active.is_some() {
            0
        } else {
            STATUS_DEVICE_NOT_PRESENT
        }
    }

    /// One byte to the listener.
    pub fn ciout(&mut self, byte: u8) -> u8 {
        if self.state != IecState::Listen {
            return STATUS_DEVICE_NOT_PRESENT;
        }
        match self.secondary {
            Secondary::Open => self.name.push(byte),
            Secondary::Data => {
                let channel = self.channel;
                if let Some(drive) = self.active_drive() {
                    drive.write(channel, byte);
                }
            }
        }
        0
    }

    /// One byte from the talker, with the `ST` bits for it.
    pub fn acptr(&mut self) -> (u8, u8) {
        if self.state != IecState::Talk {
            return (0, STATUS_DEVICE_NOT_PRESENT | STATUS_READ_TIMEOUT);
        }
        let channel = self.channel;
        match self.active_drive().and_then(|d| d.read(channel)) {
            Some((byte, true)) => (byte, STATUS_EOI),
            Some((byte, false)) => (byte, 0),
            None => (0, STATUS_EOI | STATUS_READ_TIMEOUT),
        }
    }

    /// Ends a LISTEN: completes an OPEN or runs a command sent to channel 15.
    pub fn unlisten(&mut self) -> u8 {
        if self.state == IecState::Listen {
            let channel = self.channel;
            let secondary = self.secondary;
            let name = std::mem::take(&mut self.name);
            if let Some(drive) = self.active_drive() {
                match secondary {
                    Secondary::Open => drive.open(channel, &name),
                    Secondary::Data => drive.end_of_data(channel),
                }
            }
        }
        self.state = IecState::Idle;
        self.secondary = Secondary::Data;
        0
    }

    pub fn untalk(&mut self) -> u8 {
        self.state = IecState::Idle;
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::d64::D64Image;

    fn bus_with_disk() -> IecBus {
        let mut bus = IecBus::new(2);
        bus.drive_mut(0)
            .unwrap()
            .attach_handler("test.d64", Box::new(D64Image::blank("BUS", *b"42")));
        bus
    }

    fn open(bus: &mut IecBus, device: u8, channel: u8, name: &[u8]) {
        assert_eq!(bus.listen(device), 0);
        bus.second(0xF0 | channel);
        for &b in name {
            bus.ciout(b);
        }
        bus.unlisten();
    }

    fn read_all(bus: &mut IecBus, device: u8, channel: u8) -> (Vec<u8>, u8) {
        bus.talk(device);
        bus.tksa(0x60 | channel);
        let mut out = Vec::new();
        loop {
            let (byte, st) = bus.acptr();
            if st & STATUS_READ_TIMEOUT != 0 {
                bus.untalk();
                return (out, st);
            }
            out.push(byte);
            if st & STATUS_EOI != 0 {
                bus.untalk();
                return (out, st);
            }
        }
    }

    #[test]
    fn test_save_and_load_through_bus() {
        let mut bus = bus_with_disk();
        open(&mut bus, 8, 1, b"0:DEMO");
        bus.listen(8);
        bus.second(0x61);
        for &b in &[0x01, 0x08, 0xA9, 0x00] {
            assert_eq!(bus.ciout(b), 0);
        }
        bus.unlisten();
        bus.listen(8);
        bus.second(0xE1);
        bus.unlisten();

        open(&mut bus, 8, 0, b"DEMO");
        let (data, st) = read_all(&mut bus, 8, 0);
        assert_eq!(data, vec![0x01, 0x08, 0xA9, 0x00]);
        assert_eq!(st, STATUS_EOI);
    }

    #[test]
    fn test_command_channel() {
        let mut bus = bus_with_disk();
        open(&mut bus, 8, 15, b"");
        bus.listen(8);
        bus.second(0x6F);
        for &b in b"X" {
            bus.ciout(b);
        }
        bus.unlisten();
        let (status, _) = read_all(&mut bus, 8, 15);
        assert_eq!(status, b"31,SYNTAX ERROR,00,00\r".to_vec());
    }

    #[test]
    fn test_open_with_command_name() {
        let mut bus = bus_with_disk();
        open(&mut bus, 8, 15, b"UJ");
        let (status, _) = read_all(&mut bus, 8, 15);
        assert_eq!(status, b"73,CBM DOS V2.6 1541,00,00\r".to_vec());
    }

    #[test]
    fn test_missing_device_and_file() {
        let mut bus = bus_with_disk();
        assert_eq!(bus.listen(12), STATUS_DEVICE_NOT_PRESENT);
        assert_eq!(bus.state(), IecState::Idle);
        assert_eq!(bus.ciout(0), STATUS_DEVICE_NOT_PRESENT);

        open(&mut bus, 8, 0, b"NOTHERE");
        let (data, st) = read_all(&mut bus, 8, 0);
        assert!(data.is_empty());
        assert_eq!(st, STATUS_EOI | STATUS_READ_TIMEOUT);
    }

    #[test]
    fn test_second_drive_is_empty() {
        let mut bus = bus_with_disk();
        open(&mut bus, 9, 2, b"FILE");
        let (status, _) = read_all(&mut bus, 9, 15);
        assert_eq!(status, b"74,DRIVE NOT READY,00,00\r".to_vec());
    }
}
