//! One 1541 drive: mounted image, channels and the DOS command set.
//!
//! Channels 0-14 carry file data; channel 15 is the command channel.
//! Writing to channel 15 and ending the transfer runs a DOS command;
//! reading it returns the status string. Failures never leave this
//! module as errors, they become the status a program reads back.

use std::vec::Drain;

use log::{debug, info, warn};

use super::channel::{ChannelMode, DriveChannel, PendingFile};
use super::delta::{apply_delta, create_delta};
use super::detect::open_image;
use super::handler::{DriveHandler, FileEntry, FileType};
use super::pattern::{has_wildcards, name_matches, Pattern};
use super::petscii::{ascii_to_petscii, decode_bytes};
use super::status::DriveStatus;
use super::DiskError;
use crate::events::{DriveActivity, DriveEvent};

/// First device number on the serial bus.
pub const FIRST_DEVICE: u8 = 8;

pub const COMMAND_CHANNEL: u8 = 15;

/// Longest command the 1541 accepts.
const MAX_COMMAND_LEN: usize = 58;

/// Load address of a directory listing.
const LISTING_ADDRESS: u16 = 0x0401;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveState {
    Empty,
    Idle,
    Reading,
    Writing,
}

/// Parsed form of an OPEN filename such as `@0:DATA,S,W`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileSpec {
    replace: bool,
    name: String,
    file_type: Option<FileType>,
    mode: Option<char>,
}

impl FileSpec {
    fn parse(text: &str) -> Self {
        let (replace, rest) = match text.strip_prefix('@') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let rest = rest.split_once(':').map_or(rest, |(_, name)| name);
        let mut parts = rest.split(',');
        let name = parts.next().unwrap_or_default().to_string();
        let mut file_type = None;
        let mut mode = None;
        for part in parts {
            match part.trim().chars().next().map(|c| c.to_ascii_uppercase()) {
                Some(c @ ('R' | 'W' | 'A' | 'M')) => mode = Some(c),
                Some(c) => file_type = FileType::from_letter(c).or(file_type),
                None => {}
            }
        }
        Self {
            replace,
            name,
            file_type,
            mode,
        }
    }
}

/// Numeric parameters of a block command, after the command word or colon.
fn block_params(text: &str, skip: usize) -> Option<Vec<u32>> {
    let rest = text.get(skip..)?;
    let rest = rest.split_once(':').map_or(rest, |(_, params)| params);
    rest.split(|c: char| c == ' ' || c == ',' || c == '\u{1d}')
        .filter(|p| !p.is_empty())
        .map(|p| p.trim().parse().ok())
        .collect()
}

fn block_address(params: &[u32]) -> Option<(u8, u8)> {
    let track = u8::try_from(*params.first()?).ok()?;
    let sector = u8::try_from(*params.get(1)?).ok()?;
    Some((track, sector))
}

/// Builds the BASIC program a `LOAD"$",8` returns.
fn directory_listing(
    handler: &dyn DriveHandler,
    pattern: &Pattern,
) -> Result<Vec<u8>, DiskError> {
    let mut lines: Vec<(u16, Vec<u8>)> = Vec::new();

    let mut header = vec![0x12, b'"'];
    let mut label: Vec<u8> = handler.label().chars().take(16).map(ascii_to_petscii).collect();
    label.resize(16, b' ');
    header.extend_from_slice(&label);
    header.extend_from_slice(b"\" ");
    header.extend_from_slice(&handler.disk_id());
    header.extend_from_slice(b" 2A");
    lines.push((0, header));

    for entry in handler.directory_elements()? {
        if !pattern.matches(&entry) {
            continue;
        }
        let pad = match entry.blocks {
            0..=9 => 3,
            10..=99 => 2,
            100..=999 => 1,
            _ => 0,
        };
        let mut text = vec![b' '; pad];
        text.push(b'"');
        let name: Vec<u8> = entry.name.chars().map(ascii_to_petscii).collect();
        text.extend_from_slice(&name);
        text.push(b'"');
        text.extend(std::iter::repeat(b' ').take(16usize.saturating_sub(name.len())));
        text.push(if entry.closed { b' ' } else { b'*' });
        text.extend_from_slice(entry.file_type.label().as_bytes());
        text.push(if entry.locked { b'<' } else { b' ' });
        lines.push((entry.blocks, text));
    }

    let mut footer = b"BLOCKS FREE.".to_vec();
    footer.extend_from_slice(&[b' '; 13]);
    lines.push((handler.free_blocks(), footer));

    let mut out = LISTING_ADDRESS.to_le_bytes().to_vec();
    let mut address = LISTING_ADDRESS;
    for (number, text) in lines {
        let next = address.wrapping_add(4 + text.len() as u16 + 1);
        out.extend_from_slice(&next.to_le_bytes());
        out.extend_from_slice(&number.to_le_bytes());
        out.extend_from_slice(&text);
        out.push(0);
        address = next;
    }
    out.extend_from_slice(&[0, 0]);
    Ok(out)
}

pub struct Drive {
    index: u8,
    handler: Option<Box<dyn DriveHandler>>,
    image_name: Option<String>,
    /// Image bytes as attached, the base for delta files.
    original: Vec<u8>,
    channels: [DriveChannel; 16],
    command: Vec<u8>,
    status: DriveStatus,
    status_out: Vec<u8>,
    status_pos: usize,
    activity: DriveActivity,
    head: (u8, u8),
    events: Vec<DriveEvent>,
}

impl std::fmt::Debug for Drive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Drive")
            .field("device", &self.device())
            .field("image", &self.image_name)
            .field("status", &self.status)
            .field("activity", &self.activity)
            .finish()
    }
}

impl Drive {
    /// Drive `index` answers as device 8 + `index`.
    pub fn new(index: u8) -> Self {
        Self {
            index,
            handler: None,
            image_name: None,
            original: Vec::new(),
            channels: std::array::from_fn(|_| DriveChannel::new()),
            command: Vec::new(),
            status: DriveStatus::dos_version(),
            status_out: Vec::new(),
            status_pos: 0,
            activity: DriveActivity::Idle,
            head: (0, 0),
            events: Vec::new(),
        }
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn device(&self) -> u8 {
        FIRST_DEVICE + self.index
    }

    pub fn state(&self) -> DriveState {
        match (&self.handler, self.activity) {
            (None, _) => DriveState::Empty,
            (Some(_), DriveActivity::Idle) => DriveState::Idle,
            (Some(_), DriveActivity::Reading) => DriveState::Reading,
            (Some(_), DriveActivity::Writing) => DriveState::Writing,
        }
    }

    pub fn status(&self) -> DriveStatus {
        self.status
    }

    pub fn image_name(&self) -> Option<&str> {
        self.image_name.as_deref()
    }

    pub fn handler(&self) -> Option<&dyn DriveHandler> {
        self.handler.as_deref()
    }

    pub fn channel(&self, channel: u8) -> Option<&DriveChannel> {
        self.channels.get(channel as usize)
    }

    /// Mount an image, detecting its format from `name` and its contents.
    pub fn attach_image(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), DiskError> {
        let original = bytes.clone();
        let handler = open_image(name, bytes)?;
        self.mount(name, original, handler);
        Ok(())
    }

    /// Mount an image with a saved delta applied on top.
    pub fn attach_with_delta(
        &mut self,
        name: &str,
        bytes: Vec<u8>,
        delta: &[u8],
    ) -> Result<(), DiskError> {
        let patched = apply_delta(&bytes, delta)?;
        let handler = open_image(name, patched)?;
        self.mount(name, bytes, handler);
        Ok(())
    }

    /// Mount an already opened handler; its current bytes become the delta
    /// base.
    pub fn attach_handler(&mut self, name: &str, handler: Box<dyn DriveHandler>) {
        let original = handler.bytes().to_vec();
        self.mount(name, original, handler);
    }

    fn mount(&mut self, name: &str, original: Vec<u8>, handler: Box<dyn DriveHandler>) {
        self.close_all();
        let label = handler.label();
        info!(
            "drive {}: attached {} ({} \"{}\")",
            self.device(),
            name,
            handler.format_name(),
            label
        );
        self.handler = Some(handler);
        self.image_name = Some(name.to_string());
        self.original = original;
        self.set_status(DriveStatus::ok());
        self.events.push(DriveEvent::Attached {
            drive: self.index,
            label,
        });
    }

    pub fn detach_image(&mut self) -> Option<Box<dyn DriveHandler>> {
        self.close_all();
        let handler = self.handler.take()?;
        info!(
            "drive {}: detached {}",
            self.device(),
            self.image_name.as_deref().unwrap_or_default()
        );
        self.image_name = None;
        self.original.clear();
        self.set_activity(DriveActivity::Idle);
        self.events.push(DriveEvent::Detached { drive: self.index });
        Some(handler)
    }

    /// True when the image differs from what was attached.
    pub fn is_modified(&self) -> bool {
        self.handler
            .as_ref()
            .is_some_and(|h| h.bytes() != self.original.as_slice())
    }

    /// Delta from the attached image to the current contents, or `None`
    /// when the drive is empty.
    pub fn create_delta(&self) -> Result<Option<Vec<u8>>, DiskError> {
        match &self.handler {
            Some(handler) => create_delta(&self.original, handler.bytes()).map(Some),
            None => Ok(None),
        }
    }

    /// Power-on state: all channels closed, status 73.
    pub fn reset(&mut self) {
        self.close_all();
        self.set_activity(DriveActivity::Idle);
        self.set_status(DriveStatus::dos_version());
    }

    pub fn drain_events(&mut self) -> Drain<'_, DriveEvent> {
        self.events.drain(..)
    }

    fn close_all(&mut self) {
        for channel in &mut self.channels {
            channel.close();
        }
        self.command.clear();
        self.status_out.clear();
        self.status_pos = 0;
    }

    fn set_status(&mut self, status: DriveStatus) {
        if !status.is_ok() {
            debug!("drive {}: {}", self.device(), status);
        }
        self.status = status;
        self.status_out.clear();
        self.status_pos = 0;
    }

    fn set_activity(&mut self, activity: DriveActivity) {
        let (track, sector) = self.head;
        self.set_activity_at(activity, track, sector);
    }

    fn set_activity_at(&mut self, activity: DriveActivity, track: u8, sector: u8) {
        if self.activity == activity && self.head == (track, sector) {
            return;
        }
        self.activity = activity;
        self.head = (track, sector);
        self.events.push(DriveEvent::Activity {
            drive: self.index,
            state: activity,
            track,
            sector,
        });
    }

    fn settle_activity(&mut self) {
        let busy = self.channels[..COMMAND_CHANNEL as usize]
            .iter()
            .find(|c| c.is_open() && c.mode() != ChannelMode::Direct);
        let activity = match busy.map(|c| c.mode()) {
            Some(ChannelMode::Write | ChannelMode::Append) => DriveActivity::Writing,
            Some(_) => DriveActivity::Reading,
            None => DriveActivity::Idle,
        };
        self.set_activity(activity);
    }

    fn mark_modified(&mut self) {
        self.events.push(DriveEvent::Modified { drive: self.index });
    }

    /// OPEN with a filename. On channel 15 the name is a command.
    pub fn open(&mut self, channel: u8, name: &[u8]) {
        let channel = channel & 0x0F;
        if channel == COMMAND_CHANNEL {
            if !name.is_empty() {
                self.execute(name);
            }
            return;
        }
        let status = match self.open_channel(channel, &decode_bytes(name)) {
            Ok(()) => DriveStatus::ok(),
            Err(status) => status,
        };
        self.set_status(status);
        self.settle_activity();
    }

    fn open_channel(&mut self, channel: u8, text: &str) -> Result<(), DriveStatus> {
        let handler = self.handler.as_deref().ok_or(DriveStatus::drive_not_ready())?;
        let slot = channel as usize;

        if let Some(rest) = text.strip_prefix('$') {
            let rest = rest.split_once(':').map_or("*", |(_, p)| p);
            let (name, file_type) = match rest.split_once('=') {
                Some((name, t)) => (name, t.chars().next().and_then(FileType::from_letter)),
                None => (rest, None),
            };
            let pattern = Pattern {
                name: if name.is_empty() { "*" } else { name }.to_string(),
                file_type,
            };
            let listing = directory_listing(handler, &pattern).map_err(|e| e.status())?;
            self.channels[slot].open_read(listing);
            self.head = (18, 0);
            return Ok(());
        }

        if text.starts_with('#') {
            self.channels[slot].open_direct();
            return Ok(());
        }

        let spec = FileSpec::parse(text);
        let default_mode = if channel == 1 { 'W' } else { 'R' };
        match spec.mode.unwrap_or(default_mode) {
            'W' => self.open_write(slot, spec),
            'A' => self.open_append(slot, spec),
            _ => self.open_read(slot, spec),
        }
    }

    fn find(&self, name: &str, file_type: Option<FileType>) -> Result<Option<FileEntry>, DriveStatus> {
        let handler = self.handler.as_deref().ok_or(DriveStatus::drive_not_ready())?;
        let entries = handler.directory_elements().map_err(|e| e.status())?;
        let pattern = Pattern {
            name: name.to_string(),
            file_type,
        };
        Ok(entries
            .into_iter()
            .find(|e| e.closed && pattern.matches(e)))
    }

    fn read_entry(&self, entry: &FileEntry) -> Result<Vec<u8>, DriveStatus> {
        let handler = self.handler.as_deref().ok_or(DriveStatus::drive_not_ready())?;
        handler.read_file(entry).map_err(|e| {
            warn!("drive {}: reading {}: {}", self.device(), entry.name, e);
            e.status()
        })
    }

    fn open_read(&mut self, slot: usize, spec: FileSpec) -> Result<(), DriveStatus> {
        if spec.name.is_empty() {
            return Err(DriveStatus::no_filename());
        }
        let file_type = spec
            .file_type
            .or(if slot == 0 { Some(FileType::Prg) } else { None });
        let entry = self
            .find(&spec.name, file_type)?
            .ok_or(DriveStatus::file_not_found())?;
        let data = self.read_entry(&entry)?;
        debug!(
            "drive {}: open {} for read on {} ({} bytes)",
            self.device(),
            entry.name,
            slot,
            data.len()
        );
        let (track, sector) = entry.track_sector();
        self.channels[slot].open_read(data);
        self.channels[slot].set_track_sector(track, sector);
        self.set_activity_at(DriveActivity::Reading, track, sector);
        Ok(())
    }

    fn check_writable_name(&self, name: &str) -> Result<(), DriveStatus> {
        let handler = self.handler.as_deref().ok_or(DriveStatus::drive_not_ready())?;
        if !handler.is_writable() {
            return Err(DriveStatus::write_protect_on());
        }
        if name.is_empty() {
            return Err(DriveStatus::no_filename());
        }
        if has_wildcards(name) {
            return Err(DriveStatus::invalid_filename());
        }
        Ok(())
    }

    fn open_write(&mut self, slot: usize, spec: FileSpec) -> Result<(), DriveStatus> {
        self.check_writable_name(&spec.name)?;
        let file_type = spec.file_type.unwrap_or(if slot <= 1 {
            FileType::Prg
        } else {
            FileType::Seq
        });
        if !spec.replace && self.find(&spec.name, None)?.is_some() {
            return Err(DriveStatus::file_exists());
        }
        let file = PendingFile {
            name: spec.name,
            file_type,
            replace: spec.replace,
        };
        self.channels[slot].open_write(file, Vec::new());
        Ok(())
    }

    fn open_append(&mut self, slot: usize, spec: FileSpec) -> Result<(), DriveStatus> {
        self.check_writable_name(&spec.name)?;
        let entry = self
            .find(&spec.name, spec.file_type)?
            .ok_or(DriveStatus::file_not_found())?;
        let existing = self.read_entry(&entry)?;
        let file = PendingFile {
            name: entry.name,
            file_type: entry.file_type,
            replace: true,
        };
        self.channels[slot].open_write(file, existing);
        Ok(())
    }

    /// CLOSE. Write channels commit their file; channel 15 only drops any
    /// partial command.
    pub fn close(&mut self, channel: u8) {
        let channel = channel & 0x0F;
        if channel == COMMAND_CHANNEL {
            self.command.clear();
            return;
        }
        if let Some((file, data)) = self.channels[channel as usize].close() {
            let status = match self.commit(&file, &data) {
                Ok(()) => DriveStatus::ok(),
                Err(status) => status,
            };
            self.set_status(status);
        }
        self.settle_activity();
    }

    fn commit(&mut self, file: &PendingFile, data: &[u8]) -> Result<(), DriveStatus> {
        if file.replace {
            if let Some(old) = self.find(&file.name, None)? {
                let handler = self.handler.as_deref_mut().ok_or(DriveStatus::drive_not_ready())?;
                handler.delete_file(&old).map_err(|e| e.status())?;
            }
        }
        let handler = self.handler.as_deref_mut().ok_or(DriveStatus::drive_not_ready())?;
        let entry = handler
            .write_file(&file.name, file.file_type, data)
            .map_err(|e| e.status())?;
        debug!(
            "drive {}: saved {} ({} blocks)",
            self.device(),
            entry.name,
            entry.blocks
        );
        let (track, sector) = entry.track_sector();
        self.set_activity_at(DriveActivity::Writing, track, sector);
        self.mark_modified();
        Ok(())
    }

    /// TALK data: next byte and whether it is the last one.
    pub fn read(&mut self, channel: u8) -> Option<(u8, bool)> {
        let channel = channel & 0x0F;
        if channel == COMMAND_CHANNEL {
            return Some(self.read_status_byte());
        }
        let byte = self.channels[channel as usize].read_byte();
        if matches!(byte, Some((_, true))) && self.channels[channel as usize].mode() == ChannelMode::Read {
            self.set_activity(DriveActivity::Idle);
        }
        byte
    }

    fn read_status_byte(&mut self) -> (u8, bool) {
        if self.status_out.is_empty() {
            self.status_out = format!("{}\r", self.status).into_bytes();
            self.status_pos = 0;
        }
        let byte = self.status_out[self.status_pos];
        self.status_pos += 1;
        let last = self.status_pos >= self.status_out.len();
        if last {
            self.status = DriveStatus::ok();
            self.status_out.clear();
            self.status_pos = 0;
        }
        (byte, last)
    }

    /// LISTEN data for `channel`.
    pub fn write(&mut self, channel: u8, byte: u8) {
        let channel = channel & 0x0F;
        if channel == COMMAND_CHANNEL {
            self.command.push(byte);
            return;
        }
        if !self.channels[channel as usize].write_byte(byte) && self.status.is_ok() {
            self.set_status(DriveStatus::file_not_open());
        }
    }

    /// UNLISTEN after data: a pending command on channel 15 runs now.
    pub fn end_of_data(&mut self, channel: u8) {
        if channel & 0x0F == COMMAND_CHANNEL && !self.command.is_empty() {
            let command = std::mem::take(&mut self.command);
            self.execute(&command);
        }
    }

    /// Run a DOS command and return the resulting status.
    pub fn command(&mut self, text: &str) -> DriveStatus {
        let bytes: Vec<u8> = text.chars().map(ascii_to_petscii).collect();
        self.execute(&bytes);
        self.status
    }

    fn execute(&mut self, raw: &[u8]) {
        let mut bytes = raw;
        while let Some((&last, rest)) = bytes.split_last() {
            if last != b'\r' {
                break;
            }
            bytes = rest;
        }
        let status = if bytes.len() > MAX_COMMAND_LEN {
            DriveStatus::command_too_long()
        } else {
            let text = decode_bytes(bytes);
            debug!("drive {}: command {:?}", self.device(), text);
            match self.run_command(&text) {
                Ok(status) => status,
                Err(status) => status,
            }
        };
        self.set_status(status);
    }

    fn run_command(&mut self, text: &str) -> Result<DriveStatus, DriveStatus> {
        let upper = text.to_ascii_uppercase();
        if upper.is_empty() {
            return Ok(DriveStatus::ok());
        }
        if upper.starts_with("UI+") || upper.starts_with("UI-") {
            return Ok(DriveStatus::ok());
        }
        if ["UJ", "UI", "U:", "U;"].iter().any(|p| upper.starts_with(p)) {
            self.reset();
            return Ok(DriveStatus::dos_version());
        }
        if upper.starts_with("U1") || upper.starts_with("UA") {
            return self.block_read(text, 2, false);
        }
        if upper.starts_with("U2") || upper.starts_with("UB") {
            return self.block_write(text, 2, false);
        }
        if let Some(sub) = upper.strip_prefix("B-") {
            return match sub.chars().next() {
                Some('R') => self.block_read(text, 3, true),
                Some('W') => self.block_write(text, 3, true),
                Some('P') => self.block_pointer(text),
                Some('A') => self.block_allocate(text, true),
                Some('F') => self.block_allocate(text, false),
                _ => Err(DriveStatus::invalid_command()),
            };
        }
        match upper.chars().next() {
            Some('I') => {
                for channel in &mut self.channels[..COMMAND_CHANNEL as usize] {
                    channel.close();
                }
                self.settle_activity();
                Ok(DriveStatus::ok())
            }
            Some('V') => {
                self.handler_mut()?.validate().map_err(|e| e.status())?;
                self.mark_modified();
                Ok(DriveStatus::ok())
            }
            Some('N') => self.new_disk(text),
            Some('S') => self.scratch(text),
            Some('R') => self.rename(text),
            Some('C') => self.copy(text),
            _ => Err(DriveStatus::invalid_command()),
        }
    }

    fn handler_mut(&mut self) -> Result<&mut (dyn DriveHandler + 'static), DriveStatus> {
        self.handler.as_deref_mut().ok_or(DriveStatus::drive_not_ready())
    }

    /// Everything after the colon, or an error when there is none.
    fn argument(text: &str) -> Result<&str, DriveStatus> {
        match text.split_once(':') {
            Some((_, arg)) if !arg.is_empty() => Ok(arg),
            _ => Err(DriveStatus::no_filename()),
        }
    }

    /// A file name with an optional `<drive>:` prefix removed.
    fn without_drive(part: &str) -> &str {
        match part.split_once(':') {
            Some((drive, name)) if drive.bytes().all(|b| b.is_ascii_digit()) => name,
            _ => part,
        }
    }

    fn new_disk(&mut self, text: &str) -> Result<DriveStatus, DriveStatus> {
        let arg = Self::argument(text)?;
        let (name, id) = match arg.split_once(',') {
            Some((name, id)) => {
                let mut chars = id.chars().map(ascii_to_petscii);
                let id = [chars.next().unwrap_or(b' '), chars.next().unwrap_or(b' ')];
                (name, Some(id))
            }
            None => (arg, None),
        };
        if has_wildcards(name) {
            return Err(DriveStatus::invalid_filename());
        }
        self.handler_mut()?
            .format(name, id)
            .map_err(|e| e.status())?;
        info!("drive {}: formatted \"{}\"", self.device(), name);
        self.mark_modified();
        Ok(DriveStatus::ok())
    }

    fn scratch(&mut self, text: &str) -> Result<DriveStatus, DriveStatus> {
        let arg = Self::argument(text)?;
        if !self.handler_mut()?.is_writable() {
            return Err(DriveStatus::write_protect_on());
        }
        let mut count = 0u8;
        for pattern in arg.split(',').map(Self::without_drive).map(Pattern::parse) {
            loop {
                let victim = self
                    .handler_mut()?
                    .directory_elements()
                    .map_err(|e| e.status())?
                    .into_iter()
                    .find(|e| !e.locked && pattern.matches(e));
                let Some(entry) = victim else { break };
                self.handler_mut()?
                    .delete_file(&entry)
                    .map_err(|e| e.status())?;
                count = count.saturating_add(1);
            }
        }
        if count == 0 {
            return Err(DriveStatus::file_not_found());
        }
        self.mark_modified();
        Ok(DriveStatus::files_scratched(count))
    }

    /// `new=old` argument of rename and copy.
    fn assignment(text: &str) -> Result<(&str, &str), DriveStatus> {
        let arg = Self::argument(text)?;
        let (new, old) = arg.split_once('=').ok_or(DriveStatus::no_filename())?;
        if new.is_empty() || old.is_empty() {
            return Err(DriveStatus::no_filename());
        }
        if has_wildcards(new) {
            return Err(DriveStatus::invalid_filename());
        }
        Ok((new, old))
    }

    fn rename(&mut self, text: &str) -> Result<DriveStatus, DriveStatus> {
        let (new, old) = Self::assignment(text)?;
        let old = Self::without_drive(old);
        let handler = self.handler_mut()?;
        if !handler.is_writable() {
            return Err(DriveStatus::write_protect_on());
        }
        let entries = handler.directory_elements().map_err(|e| e.status())?;
        if entries.iter().any(|e| name_matches(&e.name, new)) {
            return Err(DriveStatus::file_exists());
        }
        let entry = entries
            .iter()
            .find(|e| name_matches(&e.name, old))
            .ok_or(DriveStatus::source_not_found())?;
        handler.rename_file(entry, new).map_err(|e| e.status())?;
        self.mark_modified();
        Ok(DriveStatus::ok())
    }

    fn copy(&mut self, text: &str) -> Result<DriveStatus, DriveStatus> {
        let (new, sources) = Self::assignment(text)?;
        let handler = self.handler_mut()?;
        if !handler.is_writable() {
            return Err(DriveStatus::write_protect_on());
        }
        let entries = handler.directory_elements().map_err(|e| e.status())?;
        if entries.iter().any(|e| name_matches(&e.name, new)) {
            return Err(DriveStatus::file_exists());
        }
        let mut data = Vec::new();
        let mut file_type = None;
        for source in sources.split(',') {
            let source = Self::without_drive(source);
            let entry = entries
                .iter()
                .find(|e| e.closed && name_matches(&e.name, source))
                .ok_or(DriveStatus::source_not_found())?;
            file_type.get_or_insert(entry.file_type);
            data.extend(handler.read_file(entry).map_err(|e| e.status())?);
        }
        handler
            .write_file(new, file_type.unwrap_or(FileType::Seq), &data)
            .map_err(|e| e.status())?;
        self.mark_modified();
        Ok(DriveStatus::ok())
    }

    /// Channel of a block command; it has to be an open `#` buffer.
    fn direct_channel(&self, params: &[u32]) -> Result<usize, DriveStatus> {
        let channel = *params.first().ok_or(DriveStatus::syntax_error())? as usize;
        match self.channels.get(channel) {
            Some(c) if c.mode() == ChannelMode::Direct => Ok(channel),
            _ => Err(DriveStatus::no_channel()),
        }
    }

    fn block_read(&mut self, text: &str, skip: usize, counted: bool) -> Result<DriveStatus, DriveStatus> {
        let params = block_params(text, skip).ok_or(DriveStatus::syntax_error())?;
        if params.len() < 4 {
            return Err(DriveStatus::syntax_error());
        }
        let slot = self.direct_channel(&params)?;
        let (track, sector) = block_address(&params[2..]).ok_or(DriveStatus::syntax_error())?;
        let handler = self.handler.as_deref().ok_or(DriveStatus::drive_not_ready())?;
        let block = handler.read_block(track, sector).map_err(|e| e.status())?;
        if counted {
            // B-R: byte 0 is the index of the last valid byte.
            let last = if block[0] == 0 { 255 } else { block[0] as usize };
            self.channels[slot].load_block(&block, 1, last + 1);
        } else {
            self.channels[slot].load_block(&block, 0, 256);
        }
        self.channels[slot].set_track_sector(track, sector);
        self.set_activity_at(DriveActivity::Reading, track, sector);
        self.settle_activity();
        Ok(DriveStatus::ok())
    }

    fn block_write(&mut self, text: &str, skip: usize, counted: bool) -> Result<DriveStatus, DriveStatus> {
        let params = block_params(text, skip).ok_or(DriveStatus::syntax_error())?;
        if params.len() < 4 {
            return Err(DriveStatus::syntax_error());
        }
        let slot = self.direct_channel(&params)?;
        let (track, sector) = block_address(&params[2..]).ok_or(DriveStatus::syntax_error())?;
        let mut block = self.channels[slot].block();
        if counted {
            let pointer = self.channels[slot].buffer_pointer();
            block[0] = if pointer == 0 { 255 } else { (pointer - 1) as u8 };
        }
        self.handler_mut()?
            .write_block(track, sector, &block)
            .map_err(|e| e.status())?;
        self.channels[slot].set_track_sector(track, sector);
        self.set_activity_at(DriveActivity::Writing, track, sector);
        self.settle_activity();
        self.mark_modified();
        Ok(DriveStatus::ok())
    }

    fn block_pointer(&mut self, text: &str) -> Result<DriveStatus, DriveStatus> {
        let params = block_params(text, 3).ok_or(DriveStatus::syntax_error())?;
        let slot = self.direct_channel(&params)?;
        let position = *params.get(1).ok_or(DriveStatus::syntax_error())?;
        self.channels[slot].set_buffer_pointer((position & 0xFF) as u8);
        Ok(DriveStatus::ok())
    }

    fn block_allocate(&mut self, text: &str, allocate: bool) -> Result<DriveStatus, DriveStatus> {
        let params = block_params(text, 3).ok_or(DriveStatus::syntax_error())?;
        if params.len() < 3 {
            return Err(DriveStatus::syntax_error());
        }
        let (track, sector) = block_address(&params[1..]).ok_or(DriveStatus::syntax_error())?;
        let handler = self.handler_mut()?;
        let result = if allocate {
            handler.allocate(track, sector)
        } else {
            handler.free(track, sector)
        };
        result.map_err(|e| e.status())?;
        self.mark_modified();
        Ok(DriveStatus::ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::d64::D64Image;

    fn drive_with_blank_disk() -> Drive {
        let mut drive = Drive::new(0);
        drive.attach_handler("blank.d64", Box::new(D64Image::blank("TEST", *b"01")));
        drive.drain_events().for_each(drop);
        drive
    }

    fn save(drive: &mut Drive, name: &str, data: &[u8]) {
        drive.open(1, name.as_bytes());
        for &b in data {
            drive.write(1, b);
        }
        drive.close(1);
    }

    fn load(drive: &mut Drive, channel: u8, name: &str) -> Vec<u8> {
        drive.open(channel, name.as_bytes());
        let mut out = Vec::new();
        while let Some((byte, last)) = drive.read(channel) {
            out.push(byte);
            if last {
                break;
            }
        }
        drive.close(channel);
        out
    }

    fn read_status(drive: &mut Drive) -> String {
        let mut out = Vec::new();
        loop {
            let (byte, last) = drive.read(COMMAND_CHANNEL).unwrap();
            out.push(byte);
            if last {
                break;
            }
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_power_on_status() {
        let mut drive = Drive::new(1);
        assert_eq!(drive.device(), 9);
        assert_eq!(drive.state(), DriveState::Empty);
        assert_eq!(read_status(&mut drive), "73,CBM DOS V2.6 1541,00,00\r");
        assert_eq!(read_status(&mut drive), "00,OK,00,00\r");
    }

    #[test]
    fn test_file_spec_parsing() {
        let spec = FileSpec::parse("@0:DATA,S,W");
        assert!(spec.replace);
        assert_eq!(spec.name, "DATA");
        assert_eq!(spec.file_type, Some(FileType::Seq));
        assert_eq!(spec.mode, Some('W'));

        let spec = FileSpec::parse("LOG,A");
        assert_eq!(spec.mode, Some('A'));
        assert_eq!(spec.file_type, None);
    }

    #[test]
    fn test_save_then_load() {
        let mut drive = drive_with_blank_disk();
        save(&mut drive, "PROG", &[0x01, 0x08, 0xEA, 0x60]);
        assert_eq!(drive.status(), DriveStatus::ok());
        assert_eq!(load(&mut drive, 0, "PR*"), vec![0x01, 0x08, 0xEA, 0x60]);
        assert!(drive.is_modified());
        assert_eq!(drive.state(), DriveState::Idle);
    }

    #[test]
    fn test_sequential_write_and_append() {
        let mut drive = drive_with_blank_disk();
        save_on(&mut drive, 2, "LOG,S,W", b"ONE");
        save_on(&mut drive, 2, "LOG,S,A", b"TWO");
        assert_eq!(load(&mut drive, 2, "LOG,S,R"), b"ONETWO".to_vec());
        assert_eq!(drive.handler().unwrap().directory_elements().unwrap().len(), 1);
    }

    fn save_on(drive: &mut Drive, channel: u8, name: &str, data: &[u8]) {
        drive.open(channel, name.as_bytes());
        for &b in data {
            drive.write(channel, b);
        }
        drive.close(channel);
    }

    #[test]
    fn test_replace_prefix() {
        let mut drive = drive_with_blank_disk();
        save(&mut drive, "FILE", b"old");
        drive.open(1, b"FILE");
        assert_eq!(drive.status(), DriveStatus::file_exists());
        drive.close(1);

        save(&mut drive, "@0:FILE", b"new");
        assert_eq!(load(&mut drive, 2, "FILE,P"), b"new".to_vec());
    }

    #[test]
    fn test_missing_file() {
        let mut drive = drive_with_blank_disk();
        drive.open(0, b"NOPE");
        assert_eq!(drive.read(0), None);
        assert_eq!(read_status(&mut drive), "62,FILE NOT FOUND,00,00\r");
    }

    #[test]
    fn test_directory_listing_program() {
        let mut drive = drive_with_blank_disk();
        save(&mut drive, "HELLO", &[1, 8, 0]);
        let listing = load(&mut drive, 0, "$");
        assert_eq!(&listing[..2], &[0x01, 0x04]);
        // First line: link, line number 0, reverse on, quoted disk name.
        assert_eq!(&listing[4..6], &[0, 0]);
        assert_eq!(listing[6], 0x12);
        assert_eq!(&listing[7..13], b"\"TEST ");
        let text = String::from_utf8_lossy(&listing);
        assert!(text.contains("\"HELLO\""));
        assert!(text.contains("PRG"));
        assert!(text.contains("BLOCKS FREE."));
        assert_eq!(&listing[listing.len() - 2..], &[0, 0]);

        // Line links chain through the program.
        let first_link = u16::from_le_bytes([listing[2], listing[3]]) as usize;
        assert_eq!(listing[first_link - 0x0401 + 2 - 1], 0);
    }

    #[test]
    fn test_scratch_and_counts() {
        let mut drive = drive_with_blank_disk();
        save(&mut drive, "A1", &[1]);
        save(&mut drive, "A2", &[2]);
        save(&mut drive, "B1", &[3]);
        assert_eq!(
            drive.command("S0:A*").to_string(),
            "01,FILES SCRATCHED,02,00"
        );
        assert_eq!(
            drive.command("S0:NOFILE").to_string(),
            "62,FILE NOT FOUND,00,00"
        );
    }

    #[test]
    fn test_scratch_patterns_with_drive_prefix() {
        let mut drive = drive_with_blank_disk();
        save(&mut drive, "A", &[1]);
        save(&mut drive, "B", &[2]);
        save(&mut drive, "C", &[3]);
        assert_eq!(
            drive.command("S0:A,0:B").to_string(),
            "01,FILES SCRATCHED,02,00"
        );
        assert_eq!(
            drive.command("S:C,:B").to_string(),
            "01,FILES SCRATCHED,01,00"
        );
    }

    #[test]
    fn test_rename_and_copy() {
        let mut drive = drive_with_blank_disk();
        save(&mut drive, "PART1", b"AB");
        save(&mut drive, "PART2", b"CD");
        assert_eq!(drive.command("R0:JOINED=MISSING"), DriveStatus::source_not_found());
        assert_eq!(drive.command("R0:PART2=PART1"), DriveStatus::file_exists());
        assert_eq!(drive.command("C0:ALL=PART1,PART2"), DriveStatus::ok());
        assert_eq!(load(&mut drive, 2, "ALL,P"), b"ABCD".to_vec());
        assert_eq!(drive.command("R0:FIRST=PART1"), DriveStatus::ok());
        assert_eq!(load(&mut drive, 2, "FIRST,P"), b"AB".to_vec());
        assert_eq!(drive.command("C0:X*=FIRST"), DriveStatus::invalid_filename());
    }

    #[test]
    fn test_rename_and_copy_with_drive_prefix() {
        let mut drive = drive_with_blank_disk();
        save(&mut drive, "X", b"XY");
        assert_eq!(drive.command("R0:Y=0:X"), DriveStatus::ok());
        assert_eq!(load(&mut drive, 2, "Y,P"), b"XY".to_vec());
        assert_eq!(drive.command("C0:Z=0:Y"), DriveStatus::ok());
        assert_eq!(load(&mut drive, 2, "Z,P"), b"XY".to_vec());
        assert_eq!(drive.command("R0:W=0:X"), DriveStatus::source_not_found());
    }

    #[test]
    fn test_block_commands() {
        let mut drive = drive_with_blank_disk();
        drive.open(2, b"#");
        assert_eq!(drive.command("U1:2 0 18 0"), DriveStatus::ok());
        let (byte, _) = drive.read(2).unwrap();
        assert_eq!(byte, 18);

        assert_eq!(drive.command("B-P:2 0"), DriveStatus::ok());
        for b in b"HI" {
            drive.write(2, *b);
        }
        assert_eq!(drive.command("U2:2 0 1 0"), DriveStatus::ok());
        let block = drive.handler().unwrap().read_block(1, 0).unwrap();
        assert_eq!(&block[..2], b"HI");

        assert_eq!(drive.command("B-A:0 1 0"), DriveStatus::ok());
        assert_eq!(drive.command("B-A:0 1 0").to_string(), "65,NO BLOCK,01,01");
        assert_eq!(drive.command("B-F:0 1 0"), DriveStatus::ok());
        assert_eq!(
            drive.command("U1:2 0 40 0").to_string(),
            "66,ILLEGAL TRACK OR SECTOR,40,00"
        );
        assert_eq!(drive.command("U1:5 0 18 0"), DriveStatus::no_channel());
        assert_eq!(drive.command("B-R:2 0"), DriveStatus::syntax_error());
    }

    #[test]
    fn test_counted_block_round_trip() {
        let mut drive = drive_with_blank_disk();
        drive.open(3, b"#");
        drive.command("B-P 3 1");
        for b in b"DATA" {
            drive.write(3, *b);
        }
        assert_eq!(drive.command("B-W 3 0 2 5"), DriveStatus::ok());
        drive.close(3);

        drive.open(3, b"#");
        assert_eq!(drive.command("B-R 3 0 2 5"), DriveStatus::ok());
        let mut out = Vec::new();
        while let Some((byte, last)) = drive.read(3) {
            out.push(byte);
            if last {
                break;
            }
        }
        assert_eq!(out, b"DATA".to_vec());
    }

    #[test]
    fn test_misc_commands() {
        let mut drive = drive_with_blank_disk();
        assert_eq!(drive.command("I"), DriveStatus::ok());
        assert_eq!(drive.command("UJ"), DriveStatus::dos_version());
        assert_eq!(drive.command("V"), DriveStatus::ok());
        assert_eq!(drive.command("X"), DriveStatus::invalid_command());
        assert_eq!(drive.command("M-R"), DriveStatus::invalid_command());
        assert_eq!(drive.command("N0:FRESH,99"), DriveStatus::ok());
        assert_eq!(drive.handler().unwrap().label(), "FRESH");
        assert_eq!(drive.command("N"), DriveStatus::no_filename());
        assert_eq!(
            drive.command(&"S".repeat(60)),
            DriveStatus::command_too_long()
        );
    }

    #[test]
    fn test_command_over_the_channel() {
        let mut drive = drive_with_blank_disk();
        save(&mut drive, "GONE", &[1]);
        for &b in b"S0:GONE\r" {
            drive.write(COMMAND_CHANNEL, b);
        }
        drive.end_of_data(COMMAND_CHANNEL);
        assert_eq!(read_status(&mut drive), "01,FILES SCRATCHED,01,00\r");
    }

    #[test]
    fn test_empty_drive() {
        let mut drive = Drive::new(0);
        drive.open(0, b"ANY");
        assert_eq!(drive.status(), DriveStatus::drive_not_ready());
        assert_eq!(drive.command("I"), DriveStatus::ok());
        assert!(drive.create_delta().unwrap().is_none());
    }

    #[test]
    fn test_activity_events() {
        let mut drive = drive_with_blank_disk();
        save(&mut drive, "F", &[1, 2]);
        let events: Vec<DriveEvent> = drive.drain_events().collect();
        assert!(events.iter().any(|e| matches!(
            e,
            DriveEvent::Activity {
                state: DriveActivity::Writing,
                ..
            }
        )));
        assert!(events.contains(&DriveEvent::Modified { drive: 0 }));
        assert!(matches!(
            events.last(),
            Some(DriveEvent::Activity {
                state: DriveActivity::Idle,
                ..
            })
        ));
    }

    #[test]
    fn test_delta_reattach() {
        let mut drive = drive_with_blank_disk();
        let original = drive.handler().unwrap().bytes().to_vec();
        save(&mut drive, "KEPT", b"payload");
        let delta = drive.create_delta().unwrap().unwrap();
        assert!(!delta.is_empty());

        let mut other = Drive::new(0);
        other
            .attach_with_delta("blank.d64", original, &delta)
            .unwrap();
        assert_eq!(load(&mut other, 2, "KEPT,P"), b"payload".to_vec());
        assert!(other.is_modified());
    }
}
