//! Machine configuration.
//!
//! Everything that a host may want to tune without recompiling lives in
//! [`MachineConfig`]. The struct round-trips through JSON so a front end can
//! persist it next to its own settings; missing fields fall back to their
//! defaults.

use cpu6502::IllegalOpcodePolicy;
use serde::{Deserialize, Serialize};

use crate::error::MachineError;

/// Video standard, which fixes the clock rate and raster geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Region {
    /// PAL: 985,248 Hz, 312 raster lines of 63 cycles, 50 Hz.
    #[default]
    PAL,
    /// NTSC: 1,022,727 Hz, 263 raster lines of 65 cycles, 60 Hz.
    NTSC,
}

impl Region {
    /// CPU clock frequency in Hz.
    pub fn clock_hz(&self) -> u32 {
        match self {
            Region::PAL => 985_248,
            Region::NTSC => 1_022_727,
        }
    }

    /// Number of raster lines per frame.
    pub fn raster_lines(&self) -> u16 {
        match self {
            Region::PAL => 312,
            Region::NTSC => 263,
        }
    }

    /// CPU cycles per raster line.
    pub fn cycles_per_line(&self) -> u32 {
        match self {
            Region::PAL => 63,
            Region::NTSC => 65,
        }
    }

    /// CPU cycles per frame.
    pub fn cycles_per_frame(&self) -> u32 {
        self.raster_lines() as u32 * self.cycles_per_line()
    }

    /// Frame rate in Hz.
    pub fn frame_rate(&self) -> f64 {
        self.clock_hz() as f64 / self.cycles_per_frame() as f64
    }
}

/// How often the video unit materializes a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameSkip {
    /// Render one frame out of every `n` (1 renders every frame).
    Fixed(u8),
    /// Adjust between 1 and `max` from the measured emulation speed.
    Auto { max: u8 },
}

impl Default for FrameSkip {
    fn default() -> Self {
        FrameSkip::Fixed(1)
    }
}

/// Serializable mirror of [`IllegalOpcodePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IllegalOpcodes {
    /// Run undocumented opcodes the way an NMOS part does.
    #[default]
    Execute,
    /// Treat any undocumented opcode as a fatal emulation error.
    Fatal,
}

impl From<IllegalOpcodes> for IllegalOpcodePolicy {
    fn from(value: IllegalOpcodes) -> Self {
        match value {
            IllegalOpcodes::Execute => IllegalOpcodePolicy::Execute,
            IllegalOpcodes::Fatal => IllegalOpcodePolicy::Fatal,
        }
    }
}

/// Tunable machine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub region: Region,
    /// Pace emulation to wall-clock time. `false` is turbo mode.
    pub throttle: bool,
    /// Drop pacing while a drive transfers data.
    pub auto_throttle: bool,
    pub frame_skip: FrameSkip,
    pub illegal_opcodes: IllegalOpcodes,
    /// Number of keyboard-port reads on CIA #1 after which the KERNAL is
    /// considered booted. Depends on the ROM revision in use.
    pub boot_read_threshold: u32,
    /// Delay before the drive activity indicator goes dark.
    pub drive_activity_timeout_ms: u64,
    /// Suffix appended to an image name to form its delta file name.
    pub delta_suffix: String,
    /// Number of drives on the serial bus (devices 8 upward).
    pub drive_count: u8,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            region: Region::PAL,
            throttle: true,
            auto_throttle: true,
            frame_skip: FrameSkip::Fixed(1),
            illegal_opcodes: IllegalOpcodes::Execute,
            boot_read_threshold: 2500,
            drive_activity_timeout_ms: 500,
            delta_suffix: ".gzd".to_string(),
            drive_count: 1,
        }
    }
}

impl MachineConfig {
    /// Parses and validates a JSON document.
    pub fn from_json(text: &str) -> Result<Self, MachineError> {
        let config: MachineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, MachineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects settings the machine cannot honor.
    pub fn validate(&self) -> Result<(), MachineError> {
        if !(1..=4).contains(&self.drive_count) {
            return Err(MachineError::Config(format!(
                "drive_count must be 1-4, got {}",
                self.drive_count
            )));
        }
        match self.frame_skip {
            FrameSkip::Fixed(0) => {
                return Err(MachineError::Config(
                    "fixed frame skip must be at least 1".to_string(),
                ))
            }
            FrameSkip::Auto { max: 0 } => {
                return Err(MachineError::Config(
                    "auto frame skip maximum must be at least 1".to_string(),
                ))
            }
            _ => {}
        }
        if self.delta_suffix.is_empty() {
            return Err(MachineError::Config("delta_suffix is empty".to_string()));
        }
        Ok(())
    }

    /// Delta file name for an attached image.
    pub fn delta_name(&self, image_name: &str) -> String {
        format!("{}{}", image_name, self.delta_suffix)
    }
}
