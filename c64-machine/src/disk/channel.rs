//! Drive channels (secondary addresses 0-15).

use super::handler::FileType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMode {
    #[default]
    Closed,
    Read,
    Write,
    Append,
    /// `#` buffer used by the block commands.
    Direct,
}

/// Pending file a write or append channel commits on close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub name: String,
    pub file_type: FileType,
    /// `@` prefix: replace an existing file.
    pub replace: bool,
}

/// One of the 16 logical channels of a drive.
///
/// Read channels hold the whole file, write channels collect bytes until
/// close. Direct channels hold one 256 byte block with a buffer pointer.
#[derive(Debug, Clone, Default)]
pub struct DriveChannel {
    mode: ChannelMode,
    data: Vec<u8>,
    position: usize,
    /// One past the last readable byte of a direct buffer.
    limit: usize,
    pending: Option<PendingFile>,
    track: u8,
    sector: u8,
}

impl DriveChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ChannelMode {
        self.mode
    }

    pub fn is_open(&self) -> bool {
        self.mode != ChannelMode::Closed
    }

    /// Head position of the last block this channel touched.
    pub fn track_sector(&self) -> (u8, u8) {
        (self.track, self.sector)
    }

    pub fn set_track_sector(&mut self, track: u8, sector: u8) {
        self.track = track;
        self.sector = sector;
    }

    pub fn open_read(&mut self, data: Vec<u8>) {
        self.close();
        self.mode = ChannelMode::Read;
        self.limit = data.len();
        self.data = data;
    }

    pub fn open_write(&mut self, file: PendingFile, existing: Vec<u8>) {
        self.close();
        self.mode = if existing.is_empty() {
            ChannelMode::Write
        } else {
            ChannelMode::Append
        };
        self.data = existing;
        self.pending = Some(file);
    }

    pub fn open_direct(&mut self) {
        self.close();
        self.mode = ChannelMode::Direct;
        self.data = vec![0; 256];
        self.limit = 256;
    }

    /// Next byte and whether it is the last one (EOI).
    pub fn read_byte(&mut self) -> Option<(u8, bool)> {
        match self.mode {
            ChannelMode::Read => {
                let byte = *self.data.get(self.position)?;
                self.position += 1;
                Some((byte, self.position >= self.data.len()))
            }
            ChannelMode::Direct => {
                let byte = self.data[self.position & 0xFF];
                self.position = (self.position + 1) & 0xFF;
                Some((byte, self.position >= self.limit || self.position == 0))
            }
            _ => None,
        }
    }

    /// Returns false when the channel does not accept data.
    pub fn write_byte(&mut self, byte: u8) -> bool {
        match self.mode {
            ChannelMode::Write | ChannelMode::Append => {
                self.data.push(byte);
                true
            }
            ChannelMode::Direct => {
                self.data[self.position & 0xFF] = byte;
                self.position = (self.position + 1) & 0xFF;
                true
            }
            _ => false,
        }
    }

    /// Direct buffer contents.
    pub fn block(&self) -> [u8; 256] {
        let mut block = [0u8; 256];
        if self.mode == ChannelMode::Direct {
            block.copy_from_slice(&self.data[..256]);
        }
        block
    }

    /// Load a block into a direct buffer; reads start at `position` and
    /// stop before `limit`.
    pub fn load_block(&mut self, block: &[u8; 256], position: usize, limit: usize) {
        if self.mode == ChannelMode::Direct {
            self.data.copy_from_slice(block);
            self.position = position & 0xFF;
            self.limit = limit.clamp(1, 256);
        }
    }

    pub fn buffer_pointer(&self) -> usize {
        self.position
    }

    pub fn set_buffer_pointer(&mut self, position: u8) {
        self.position = position as usize;
        self.limit = 256;
    }

    /// Close the channel, returning the file and bytes a write channel
    /// still has to commit.
    pub fn close(&mut self) -> Option<(PendingFile, Vec<u8>)> {
        let pending = self.pending.take();
        let data = std::mem::take(&mut self.data);
        self.mode = ChannelMode::Closed;
        self.position = 0;
        self.limit = 0;
        self.track = 0;
        self.sector = 0;
        pending.map(|file| (file, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_signals_last_byte() {
        let mut channel = DriveChannel::new();
        channel.open_read(vec![1, 2]);
        assert_eq!(channel.read_byte(), Some((1, false)));
        assert_eq!(channel.read_byte(), Some((2, true)));
        assert_eq!(channel.read_byte(), None);
    }

    #[test]
    fn test_write_collects_until_close() {
        let mut channel = DriveChannel::new();
        let file = PendingFile {
            name: "OUT".to_string(),
            file_type: FileType::Seq,
            replace: false,
        };
        channel.open_write(file.clone(), Vec::new());
        assert_eq!(channel.mode(), ChannelMode::Write);
        assert!(channel.write_byte(b'A'));
        assert!(channel.write_byte(b'B'));
        assert_eq!(channel.close(), Some((file, b"AB".to_vec())));
        assert!(!channel.is_open());
        assert!(!channel.write_byte(b'C'));
    }

    #[test]
    fn test_direct_buffer_pointer_wraps() {
        let mut channel = DriveChannel::new();
        channel.open_direct();
        channel.set_buffer_pointer(255);
        assert!(channel.write_byte(0x11));
        assert_eq!(channel.buffer_pointer(), 0);
        assert!(channel.write_byte(0x22));
        let block = channel.block();
        assert_eq!(block[255], 0x11);
        assert_eq!(block[0], 0x22);
    }

    #[test]
    fn test_loaded_block_limit() {
        let mut channel = DriveChannel::new();
        channel.open_direct();
        let mut block = [0u8; 256];
        block[0] = 3;
        block[1] = 0xAA;
        block[2] = 0xBB;
        channel.load_block(&block, 1, 3);
        assert_eq!(channel.read_byte(), Some((0xAA, false)));
        assert_eq!(channel.read_byte(), Some((0xBB, true)));
    }
}
