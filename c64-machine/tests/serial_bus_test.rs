//! Talking to a drive the way the KERNAL does: LISTEN/TALK, secondary
//! addresses, byte transfers and UNLISTEN/UNTALK.

use c64_machine::disk::{
    D64Image, DriveHandler, FileType, IecBus, STATUS_DEVICE_NOT_PRESENT, STATUS_EOI,
};

const DEVICE: u8 = 8;

fn bus() -> IecBus {
    let mut bus = IecBus::new(1);
    bus.drive_mut(0)
        .unwrap()
        .attach_image("bus.d64", D64Image::blank("SERIAL", *b"SB").data().to_vec())
        .unwrap();
    bus
}

fn open(bus: &mut IecBus, channel: u8, name: &str) {
    assert_eq!(bus.listen(DEVICE), 0);
    bus.second(0xF0 | channel);
    for b in name.bytes() {
        bus.ciout(b);
    }
    bus.unlisten();
}

fn close(bus: &mut IecBus, channel: u8) {
    bus.listen(DEVICE);
    bus.second(0xE0 | channel);
    bus.unlisten();
}

fn send(bus: &mut IecBus, channel: u8, data: &[u8]) {
    bus.listen(DEVICE);
    bus.second(0x60 | channel);
    for &b in data {
        bus.ciout(b);
    }
    bus.unlisten();
}

fn receive(bus: &mut IecBus, channel: u8) -> Vec<u8> {
    bus.talk(DEVICE);
    bus.tksa(0x60 | channel);
    let mut out = Vec::new();
    loop {
        let (byte, status) = bus.acptr();
        if status & !STATUS_EOI != 0 {
            break;
        }
        out.push(byte);
        if status & STATUS_EOI != 0 {
            break;
        }
    }
    bus.untalk();
    out
}

fn command(bus: &mut IecBus, text: &str) -> String {
    send(bus, 15, text.as_bytes());
    String::from_utf8(receive(bus, 15)).unwrap()
}

#[test]
fn test_save_and_load_over_the_bus() {
    let mut bus = bus();
    open(&mut bus, 1, "GREETING");
    send(&mut bus, 1, &[0x01, 0x08, b'H', b'I']);
    close(&mut bus, 1);

    open(&mut bus, 0, "GREET*");
    assert_eq!(receive(&mut bus, 0), vec![0x01, 0x08, b'H', b'I']);
    close(&mut bus, 0);

    let handler = bus.drive(0).unwrap().handler().unwrap();
    let entries = handler.directory_elements().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "GREETING");
    assert_eq!(entries[0].file_type, FileType::Prg);
}

#[test]
fn test_command_channel_strings() {
    let mut bus = bus();
    open(&mut bus, 2, "DATA,S,W");
    send(&mut bus, 2, b"12345");
    close(&mut bus, 2);

    assert_eq!(command(&mut bus, "I"), "00,OK,00,00\r");
    assert_eq!(command(&mut bus, "XYZZY"), "31,SYNTAX ERROR,00,00\r");
    assert_eq!(command(&mut bus, "R0:NEW=MISSING"), "39,FILE NOT FOUND,00,00\r");
    assert_eq!(command(&mut bus, "C0:DATA=DATA"), "63,FILE EXISTS,00,00\r");
    assert_eq!(command(&mut bus, "B-R 4 0 18 0"), "70,NO CHANNEL,00,00\r");
    assert_eq!(command(&mut bus, "S0:DA*"), "01,FILES SCRATCHED,01,00\r");
    assert_eq!(command(&mut bus, "UJ"), "73,CBM DOS V2.6 1541,00,00\r");
    // Reading the status resets it.
    assert_eq!(
        String::from_utf8(receive(&mut bus, 15)).unwrap(),
        "00,OK,00,00\r"
    );
}

#[test]
fn test_file_not_found_on_open() {
    let mut bus = bus();
    open(&mut bus, 0, "NOTHING");
    assert_eq!(
        String::from_utf8(receive(&mut bus, 15)).unwrap(),
        "62,FILE NOT FOUND,00,00\r"
    );
}

#[test]
fn test_directory_listing_is_a_basic_program() {
    let mut bus = bus();
    open(&mut bus, 1, "FIRST");
    send(&mut bus, 1, &[0x01, 0x08, 0x00]);
    close(&mut bus, 1);

    open(&mut bus, 0, "$");
    let listing = receive(&mut bus, 0);
    close(&mut bus, 0);

    assert_eq!(&listing[..2], &[0x01, 0x04]);
    let text: Vec<u8> = listing.iter().copied().filter(|b| b.is_ascii_graphic()).collect();
    let text = String::from_utf8(text).unwrap();
    assert!(text.contains("\"SERIAL"), "{}", text);
    assert!(text.contains("\"FIRST\""), "{}", text);
    assert!(text.contains("BLOCKSFREE."), "{}", text);
    assert_eq!(&listing[listing.len() - 2..], &[0, 0]);
}

#[test]
fn test_absent_device() {
    let mut bus = bus();
    assert_eq!(bus.listen(9), STATUS_DEVICE_NOT_PRESENT);
    assert_eq!(bus.second(0x6F), STATUS_DEVICE_NOT_PRESENT);
    bus.unlisten();
    assert_eq!(bus.talk(30), STATUS_DEVICE_NOT_PRESENT);
    let (_, status) = bus.acptr();
    assert_ne!(status & STATUS_DEVICE_NOT_PRESENT, 0);
}
