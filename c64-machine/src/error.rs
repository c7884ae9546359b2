use cpu6502::ExecutionError;
use thiserror::Error;

use crate::disk::DiskError;
use crate::system::SnapshotError;

/// Errors surfaced by machine construction and the control API.
///
/// Disk command failures never show up here: the drive reports them to the
/// emulated program on its command channel instead.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("ROM {name} could not be loaded: {source}")]
    RomMissing {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("ROM {name} has {got} bytes, expected {expected}")]
    RomSize {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("CPU fault: {0}")]
    Cpu(#[from] ExecutionError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("disk error: {0}")]
    Disk(#[from] DiskError),
    #[error("no drive with index {0}")]
    NoSuchDrive(u8),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("serialize error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("machine has been stopped")]
    Stopped,
    #[error("could not start the scheduler thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("scheduler thread panicked")]
    Panicked,
}

pub type Result<T> = std::result::Result<T, MachineError>;
