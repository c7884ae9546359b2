//! Image format detection.

use log::info;

use super::d64::{D64Image, D64_SIZE, D64_SIZE_WITH_ERRORS};
use super::handler::{DriveHandler, FileType};
use super::p00::{P00Image, P00_MAGIC};
use super::prg::PrgImage;
use super::t64::T64Image;
use super::tape_adapter::TapeAdapter;
use super::DiskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    D64,
    T64,
    Prg,
    /// PC64 container; the type comes from the extension letter.
    P00(FileType),
    /// Raw tape pulses (`.TAP`), which need a tape deck rather than a drive.
    RawTape,
}

/// `(stem, extension)` of the last path component of `name`.
fn split_name(name: &str) -> (&str, String) {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match file.rsplit_once('.') {
        Some((stem, ext)) => (stem, ext.to_ascii_lowercase()),
        None => (file, String::new()),
    }
}

/// Identify an image from its magic bytes, falling back to the size and
/// extension.
pub fn detect_format(name: &str, bytes: &[u8]) -> Option<ImageFormat> {
    let (_, ext) = split_name(name);
    if bytes.starts_with(b"C64-TAPE-RAW") {
        return Some(ImageFormat::RawTape);
    }
    if bytes.starts_with(b"C64S tape") || bytes.starts_with(b"C64 tape") {
        return Some(ImageFormat::T64);
    }
    if bytes.starts_with(P00_MAGIC) {
        let file_type = ext
            .chars()
            .next()
            .and_then(FileType::from_letter)
            .unwrap_or(FileType::Prg);
        return Some(ImageFormat::P00(file_type));
    }
    if bytes.len() == D64_SIZE || bytes.len() == D64_SIZE_WITH_ERRORS {
        return Some(ImageFormat::D64);
    }
    match ext.as_str() {
        "d64" => Some(ImageFormat::D64),
        "t64" => Some(ImageFormat::T64),
        "prg" => Some(ImageFormat::Prg),
        "tap" => Some(ImageFormat::RawTape),
        _ => None,
    }
}

/// Mount `bytes` with the handler matching its format. Tape-style images
/// come back wrapped in a [`TapeAdapter`].
pub fn open_image(name: &str, bytes: Vec<u8>) -> Result<Box<dyn DriveHandler>, DiskError> {
    let format = detect_format(name, &bytes)
        .ok_or_else(|| DiskError::Unsupported(format!("unknown image format: {}", name)))?;
    info!("{}: detected {:?}", name, format);
    let handler: Box<dyn DriveHandler> = match format {
        ImageFormat::D64 => Box::new(D64Image::mount(bytes)?),
        ImageFormat::T64 => Box::new(TapeAdapter::<T64Image>::mount(bytes)?),
        ImageFormat::Prg => {
            let (stem, _) = split_name(name);
            Box::new(TapeAdapter::new(PrgImage::named(bytes, stem)?))
        }
        ImageFormat::P00(file_type) => Box::new(TapeAdapter::new(
            P00Image::mount(bytes)?.with_file_type(file_type),
        )),
        ImageFormat::RawTape => {
            return Err(DiskError::Unsupported(
                "raw tape images need a tape deck".to_string(),
            ))
        }
    };
    Ok(handler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_wins_over_extension() {
        assert_eq!(
            detect_format("game.prg", b"C64S tape image file\0\0"),
            Some(ImageFormat::T64)
        );
        assert_eq!(
            detect_format("x.tap", b"C64-TAPE-RAW\x01"),
            Some(ImageFormat::RawTape)
        );
        assert_eq!(
            detect_format("NOTES.S00", b"C64File\0rest"),
            Some(ImageFormat::P00(FileType::Seq))
        );
    }

    #[test]
    fn test_size_and_extension() {
        assert_eq!(
            detect_format("disk.bin", &vec![0; D64_SIZE]),
            Some(ImageFormat::D64)
        );
        assert_eq!(
            detect_format("http://host/dir/GAME.PRG", &[1, 8, 0]),
            Some(ImageFormat::Prg)
        );
        assert_eq!(detect_format("readme.txt", b"hello"), None);
    }

    #[test]
    fn test_open_prg_uses_file_stem() {
        let handler = open_image("games/Blaster.prg", vec![0x01, 0x08, 0x00]).unwrap();
        assert_eq!(handler.format_name(), "PRG");
        let entries = handler.directory_elements().unwrap();
        assert_eq!(entries[0].name, "BLASTER");
    }

    #[test]
    fn test_open_blank_d64() {
        let blank = D64Image::blank("EMPTY", *b"01");
        let handler = open_image("empty.d64", blank.data().to_vec()).unwrap();
        assert!(handler.is_writable());
        assert_eq!(handler.label(), "EMPTY");
    }

    #[test]
    fn test_raw_tape_is_rejected() {
        assert!(matches!(
            open_image("x.tap", b"C64-TAPE-RAW".to_vec()),
            Err(DiskError::Unsupported(_))
        ));
    }
}
