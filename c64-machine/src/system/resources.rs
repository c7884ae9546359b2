//! Named binary resources: ROMs and disk images.
//!
//! The machine never opens files itself. ROMs are fetched by name through a
//! [`ResourceLoader`]; the default names below match the layout shipped by
//! most front ends.

use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{MachineError, Result};

pub const BASIC_ROM: &str = "/roms/basic.c64";
pub const KERNAL_ROM: &str = "/roms/kernal.c64";
pub const CHARGEN_ROM: &str = "/roms/chargen.c64";
/// 1541 DOS ROM. Only needed by a cycle-level drive; the high-level drive
/// works without it.
pub const FLOPPY_ROM: &str = "/roms/floppy.c64";

/// Source of named resources.
pub trait ResourceLoader: Send {
    fn load(&self, name: &str) -> io::Result<Vec<u8>>;
}

impl<F> ResourceLoader for F
where
    F: Fn(&str) -> io::Result<Vec<u8>> + Send,
{
    fn load(&self, name: &str) -> io::Result<Vec<u8>> {
        self(name)
    }
}

/// Resolves names relative to a directory; a leading `/` is ignored.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name.trim_start_matches('/'))
    }
}

impl ResourceLoader for DirectoryLoader {
    fn load(&self, name: &str) -> io::Result<Vec<u8>> {
        let path = self.path_of(name);
        debug!("loading {}", path.display());
        std::fs::read(path)
    }
}

/// Fetches a ROM, mapping I/O failures to [`MachineError::RomMissing`].
pub fn load_rom(loader: &dyn ResourceLoader, name: &str) -> Result<Vec<u8>> {
    loader.load(name).map_err(|source| MachineError::RomMissing {
        name: name.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_loader_strips_leading_slash() {
        let loader = DirectoryLoader::new("/opt/c64");
        assert_eq!(
            loader.path_of(KERNAL_ROM),
            PathBuf::from("/opt/c64/roms/kernal.c64")
        );
    }

    #[test]
    fn test_missing_rom_is_reported_by_name() {
        let loader = |_: &str| -> io::Result<Vec<u8>> {
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
        };
        match load_rom(&loader, BASIC_ROM) {
            Err(MachineError::RomMissing { name, .. }) => assert_eq!(name, BASIC_ROM),
            other => panic!("unexpected: {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_directory_loader_reads_files() {
        let dir = std::env::temp_dir().join(format!("c64-loader-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("roms")).unwrap();
        std::fs::write(dir.join("roms/chargen.c64"), [7u8; 4]).unwrap();

        let loader = DirectoryLoader::new(&dir);
        assert_eq!(loader.load(CHARGEN_ROM).unwrap(), vec![7u8; 4]);
        assert!(loader.load(FLOPPY_ROM).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
