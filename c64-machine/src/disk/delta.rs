//! Byte-level image deltas.
//!
//! A patch is a sequence of records, each
//!
//! ```text
//! varint  gap    bytes between the end of the previous record and this one
//! varint  count  number of replacement bytes
//! [u8]    data   `count` literal bytes
//! ```
//!
//! Varints hold 7 bits per byte, low bits first, with bit 7 set when
//! another byte follows. At most three bytes are used, so values are
//! limited to 21 bits; longer gaps and runs are split into several
//! records.

use super::DiskError;

/// Largest value a varint can hold.
pub const MAX_VARINT: usize = (1 << 21) - 1;

/// Equal bytes between two changed runs are folded into one record when
/// that is no longer than starting a new record.
const MERGE_GAP: usize = 2;

fn write_varint(out: &mut Vec<u8>, value: usize) {
    debug_assert!(value <= MAX_VARINT);
    if value < 0x80 {
        out.push(value as u8);
    } else if value < 0x4000 {
        out.push((value & 0x7F) as u8 | 0x80);
        out.push((value >> 7) as u8);
    } else {
        out.push((value & 0x7F) as u8 | 0x80);
        out.push(((value >> 7) & 0x7F) as u8 | 0x80);
        out.push((value >> 14) as u8);
    }
}

fn read_varint(patch: &[u8], pos: &mut usize) -> Result<usize, DiskError> {
    let mut value = 0usize;
    for shift in [0, 7, 14] {
        let byte = *patch
            .get(*pos)
            .ok_or(DiskError::BadDelta { offset: *pos })?;
        *pos += 1;
        value |= ((byte & 0x7F) as usize) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(DiskError::BadDelta { offset: *pos - 1 })
}

fn write_record(out: &mut Vec<u8>, mut gap: usize, data: &[u8]) {
    while gap > MAX_VARINT {
        write_varint(out, MAX_VARINT);
        write_varint(out, 0);
        gap -= MAX_VARINT;
    }
    let mut chunks = data.chunks(MAX_VARINT);
    if let Some(first) = chunks.next() {
        write_varint(out, gap);
        write_varint(out, first.len());
        out.extend_from_slice(first);
    }
    for chunk in chunks {
        write_varint(out, 0);
        write_varint(out, chunk.len());
        out.extend_from_slice(chunk);
    }
}

/// Patch that turns `original` into `modified`. Both must be the same
/// length; identical inputs give an empty patch.
pub fn create_delta(original: &[u8], modified: &[u8]) -> Result<Vec<u8>, DiskError> {
    if original.len() != modified.len() {
        return Err(DiskError::LengthMismatch {
            expected: original.len(),
            got: modified.len(),
        });
    }

    let mut patch = Vec::new();
    let mut last_end = 0;
    let mut pos = 0;
    let len = original.len();
    while pos < len {
        if original[pos] == modified[pos] {
            pos += 1;
            continue;
        }
        let start = pos;
        let mut end = pos + 1;
        loop {
            while end < len && original[end] != modified[end] {
                end += 1;
            }
            // Look past a short run of equal bytes for another change.
            let resume = (end..len.min(end + MERGE_GAP + 1))
                .find(|&i| original[i] != modified[i]);
            match resume {
                Some(next) => end = next,
                None => break,
            }
        }
        write_record(&mut patch, start - last_end, &modified[start..end]);
        last_end = end;
        pos = end;
    }
    Ok(patch)
}

/// Rebuild the modified image from `original` and a patch from
/// [`create_delta`].
pub fn apply_delta(original: &[u8], patch: &[u8]) -> Result<Vec<u8>, DiskError> {
    let mut out = original.to_vec();
    let mut target = 0usize;
    let mut pos = 0usize;
    while pos < patch.len() {
        let record = pos;
        let gap = read_varint(patch, &mut pos)?;
        let count = read_varint(patch, &mut pos)?;
        let start = target + gap;
        let end = start + count;
        if end > out.len() {
            return Err(DiskError::BadDelta { offset: record });
        }
        let data = patch
            .get(pos..pos + count)
            .ok_or(DiskError::BadDelta { offset: pos })?;
        out[start..end].copy_from_slice(data);
        pos += count;
        target = end;
    }
    Ok(out)
}
