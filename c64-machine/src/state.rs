//! Little-endian byte codec shared by every component's snapshot code.
//!
//! Writers and readers must visit fields in the same order with the same
//! widths; a reader that runs out of bytes reports
//! [`SnapshotError::Truncated`] rather than returning garbage.

use crate::system::SnapshotError;

#[derive(Debug, Default)]
pub(crate) struct StateWriter {
    buf: Vec<u8>,
}

impl StateWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub(crate) fn bool(&mut self, value: bool) {
        self.buf.push(value as u8);
    }

    pub(crate) fn u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn bytes(&mut self, value: &[u8]) {
        self.buf.extend_from_slice(value);
    }

    /// u16 length prefix followed by UTF-8.
    pub(crate) fn string(&mut self, value: &str) {
        let bytes = value.as_bytes();
        let len = bytes.len().min(u16::MAX as usize);
        self.u16(len as u16);
        self.buf.extend_from_slice(&bytes[..len]);
    }

    pub(crate) fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Debug)]
pub(crate) struct StateReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> StateReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn bytes(&mut self, len: usize) -> Result<&'a [u8], SnapshotError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(SnapshotError::Truncated { offset: self.pos })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N], SnapshotError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, SnapshotError> {
        Ok(self.bytes(1)?[0])
    }

    pub(crate) fn bool(&mut self) -> Result<bool, SnapshotError> {
        Ok(self.u8()? != 0)
    }

    pub(crate) fn u16(&mut self) -> Result<u16, SnapshotError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub(crate) fn u32(&mut self) -> Result<u32, SnapshotError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub(crate) fn u64(&mut self) -> Result<u64, SnapshotError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    pub(crate) fn string(&mut self) -> Result<String, SnapshotError> {
        let len = self.u16()? as usize;
        let offset = self.pos;
        let bytes = self.bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SnapshotError::BadString { offset })
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }
}

/// Chip state that takes part in a snapshot.
///
/// `load_state` may leave `self` half-written on error; callers load into a
/// scratch copy and only swap it in once every component succeeded.
pub(crate) trait Persist {
    fn save_state(&self, out: &mut StateWriter);
    fn load_state(&mut self, input: &mut StateReader<'_>) -> Result<(), SnapshotError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_read_back_in_order() {
        let mut out = StateWriter::new();
        out.u8(0x12);
        out.u16(0x3456);
        out.u32(0xDEADBEEF);
        out.bool(true);
        out.string("DISK.D64");
        let data = out.into_inner();

        let mut input = StateReader::new(&data);
        assert_eq!(input.u8().unwrap(), 0x12);
        assert_eq!(input.u16().unwrap(), 0x3456);
        assert_eq!(input.u32().unwrap(), 0xDEADBEEF);
        assert!(input.bool().unwrap());
        assert_eq!(input.string().unwrap(), "DISK.D64");
        assert!(input.is_empty());
    }

    #[test]
    fn test_short_input_is_truncated() {
        let mut input = StateReader::new(&[0x01]);
        assert!(matches!(
            input.u16(),
            Err(SnapshotError::Truncated { offset: 0 })
        ));
    }
}
