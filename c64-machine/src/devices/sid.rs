//! SID (MOS 6581) Sound Interface Device.
//!
//! Three voices, each with:
//! - 24-bit phase accumulator and four waveforms (combined by AND)
//! - ADSR envelope with the chip's rate table and piecewise exponential
//!   decay
//! - Ring modulation and hard sync from the previous voice
//!
//! followed by a state-variable multimode filter and the master volume.
//! The chip is clocked once per CPU cycle and emits unsigned 8-bit mono
//! PCM at [`SAMPLE_RATE`].

use cpu6502::Device;

use crate::state::{Persist, StateReader, StateWriter};
use crate::system::SnapshotError;

/// SID register count (29 registers at $D400-$D41C).
pub const SID_REGISTER_COUNT: usize = 29;

pub const VOICE_COUNT: usize = 3;

pub const SAMPLE_RATE: u32 = 22050;
pub const BITS_PER_SAMPLE: u16 = 8;
pub const CHANNELS: u16 = 1;

/// Unsigned PCM level for silence.
const SILENCE: u8 = 0x80;

/// CPU cycles between attack steps, per attack setting (0-15).
pub const ATTACK_RATE_PERIODS: [u16; 16] = [
    9, 32, 63, 95, 149, 220, 267, 313, 392, 977, 1954, 3126, 3907, 11720, 19532, 31251,
];

/// CPU cycles between decay/release steps before the exponential divider.
pub const DECAY_RELEASE_RATE_PERIODS: [u16; 16] = ATTACK_RATE_PERIODS;

const LFSR_SEED: u32 = 0x7F_FFF8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Attack,
    Decay,
    Sustain,
    Release,
}

impl EnvelopeState {
    fn to_byte(self) -> u8 {
        match self {
            Self::Attack => 0,
            Self::Decay => 1,
            Self::Sustain => 2,
            Self::Release => 3,
        }
    }

    fn from_byte(value: u8) -> Self {
        match value {
            0 => Self::Attack,
            1 => Self::Decay,
            2 => Self::Sustain,
            _ => Self::Release,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SidVoice {
    pub freq: u16,
    /// 12-bit pulse width.
    pub pulse_width: u16,
    /// Control register (waveform, test, ring, sync, gate).
    pub control: u8,
    pub attack_decay: u8,
    pub sustain_release: u8,

    /// 24-bit phase accumulator.
    pub accumulator: u32,
    /// 23-bit noise LFSR, taps at bits 22 and 17.
    pub lfsr: u32,
    pub envelope_state: EnvelopeState,
    pub envelope_counter: u8,
    rate_counter: u16,
    exp_counter: u8,
}

impl SidVoice {
    pub fn new() -> Self {
        Self {
            freq: 0,
            pulse_width: 0,
            control: 0,
            attack_decay: 0,
            sustain_release: 0,
            accumulator: 0,
            lfsr: LFSR_SEED,
            envelope_state: EnvelopeState::Release,
            envelope_counter: 0,
            rate_counter: 0,
            exp_counter: 0,
        }
    }

    #[inline]
    pub fn gate(&self) -> bool {
        self.control & 0x01 != 0
    }

    #[inline]
    fn sync_enabled(&self) -> bool {
        self.control & 0x02 != 0
    }

    #[inline]
    fn ring_mod_enabled(&self) -> bool {
        self.control & 0x04 != 0
    }

    #[inline]
    fn test_bit(&self) -> bool {
        self.control & 0x08 != 0
    }

    /// Bit 4 = triangle, 5 = sawtooth, 6 = pulse, 7 = noise.
    #[inline]
    pub fn waveform(&self) -> u8 {
        self.control >> 4
    }

    /// Sustain nibble scaled to the envelope range (0x0 → 0, 0xF → 255).
    #[inline]
    fn sustain_value(&self) -> u8 {
        (self.sustain_release >> 4) * 17
    }

    /// Divider that bends the linear decay into the chip's exponential
    /// curve.
    #[inline]
    fn exp_period(&self) -> u8 {
        match self.envelope_counter {
            94..=255 => 1,
            55..=93 => 2,
            27..=54 => 4,
            15..=26 => 8,
            7..=14 => 16,
            _ => 30,
        }
    }

    #[inline]
    fn msb(&self) -> bool {
        self.accumulator & 0x0080_0000 != 0
    }

    fn write_control(&mut self, value: u8) {
        let was_gate = self.gate();
        self.control = value;
        if !was_gate && self.gate() {
            self.envelope_state = EnvelopeState::Attack;
            self.rate_counter = 0;
        } else if was_gate && !self.gate() {
            self.envelope_state = EnvelopeState::Release;
            self.rate_counter = 0;
        }
    }

    fn clock_lfsr(&mut self) {
        let feedback = ((self.lfsr >> 22) ^ (self.lfsr >> 17)) & 1;
        self.lfsr = ((self.lfsr << 1) | feedback) & 0x7F_FFFF;
    }

    fn triangle(&self, ring_msb: bool) -> u16 {
        let msb = if self.ring_mod_enabled() {
            self.msb() ^ ring_msb
        } else {
            self.msb()
        };
        let ramp = ((self.accumulator >> 11) & 0xFFF) as u16;
        if msb {
            ramp ^ 0xFFF
        } else {
            ramp
        }
    }

    fn sawtooth(&self) -> u16 {
        (self.accumulator >> 12) as u16 & 0xFFF
    }

    fn pulse(&self) -> u16 {
        if self.test_bit() || self.sawtooth() < self.pulse_width {
            0xFFF
        } else {
            0
        }
    }

    fn noise(&self) -> u16 {
        let l = self.lfsr;
        let bit = |from: u32, to: u16| (((l >> from) & 1) as u16) << to;
        bit(20, 11)
            | bit(18, 10)
            | bit(14, 9)
            | bit(11, 8)
            | bit(9, 7)
            | bit(5, 6)
            | bit(2, 5)
            | bit(0, 4)
    }

    /// 12-bit waveform output; `ring_msb` is the modulating voice's MSB.
    pub fn output(&self, ring_msb: bool) -> u16 {
        let waveform = self.waveform();
        if waveform == 0 {
            return 0;
        }
        let mut out = 0xFFF;
        if waveform & 0x1 != 0 {
            out &= self.triangle(ring_msb);
        }
        if waveform & 0x2 != 0 {
            out &= self.sawtooth();
        }
        if waveform & 0x4 != 0 {
            out &= self.pulse();
        }
        if waveform & 0x8 != 0 {
            out &= self.noise();
        }
        out
    }

    /// Signed, envelope-scaled contribution to the mix.
    fn amplitude(&self, ring_msb: bool) -> i32 {
        if self.waveform() == 0 {
            return 0;
        }
        ((self.output(ring_msb) as i32 - 0x800) * self.envelope_counter as i32) >> 8
    }

    fn clock_envelope(&mut self) {
        let period = match self.envelope_state {
            EnvelopeState::Sustain => return,
            EnvelopeState::Attack => ATTACK_RATE_PERIODS[(self.attack_decay >> 4) as usize],
            EnvelopeState::Decay => DECAY_RELEASE_RATE_PERIODS[(self.attack_decay & 0x0F) as usize],
            EnvelopeState::Release => {
                DECAY_RELEASE_RATE_PERIODS[(self.sustain_release & 0x0F) as usize]
            }
        };

        self.rate_counter = self.rate_counter.wrapping_add(1);
        if self.rate_counter < period {
            return;
        }
        self.rate_counter = 0;

        match self.envelope_state {
            EnvelopeState::Attack => {
                self.envelope_counter = self.envelope_counter.saturating_add(1);
                if self.envelope_counter == 255 {
                    self.envelope_state = EnvelopeState::Decay;
                    self.exp_counter = 0;
                }
            }
            EnvelopeState::Decay => {
                let sustain = self.sustain_value();
                if self.envelope_counter > sustain {
                    self.step_down();
                }
                if self.envelope_counter <= sustain {
                    self.envelope_counter = sustain;
                    self.envelope_state = EnvelopeState::Sustain;
                }
            }
            EnvelopeState::Release => {
                if self.envelope_counter > 0 {
                    self.step_down();
                }
            }
            EnvelopeState::Sustain => {}
        }
    }

    fn step_down(&mut self) {
        self.exp_counter = self.exp_counter.wrapping_add(1);
        if self.exp_counter >= self.exp_period() {
            self.exp_counter = 0;
            self.envelope_counter = self.envelope_counter.saturating_sub(1);
        }
    }
}

impl Default for SidVoice {
    fn default() -> Self {
        Self::new()
    }
}

/// Chamberlin state-variable filter standing in for the 6581's analog
/// stage.
#[derive(Debug, Clone, Default)]
pub struct SidFilter {
    /// 11-bit cutoff.
    pub cutoff: u16,
    pub resonance: u8,
    /// Voices routed through the filter (bits 0-2).
    pub routing: u8,
    /// Bits 4-7 of $D418: LP, BP, HP, voice 3 off.
    pub mode: u8,
    low: f32,
    band: f32,
}

impl SidFilter {
    /// Cutoff coefficient at the output sample rate.
    fn coefficient(&self) -> f32 {
        // The 6581 spans roughly 30 Hz to 12 kHz over the register range.
        let hz = 30.0 + self.cutoff as f32 * 5.8;
        let f = 2.0 * (std::f32::consts::PI * hz / SAMPLE_RATE as f32).sin();
        f.min(0.9)
    }

    fn damping(&self) -> f32 {
        1.4 - self.resonance as f32 * 0.075
    }

    fn process(&mut self, input: f32) -> f32 {
        let f = self.coefficient();
        self.low += f * self.band;
        let high = input - self.low - self.damping() * self.band;
        self.band += f * high;

        let mut out = 0.0;
        if self.mode & 0x01 != 0 {
            out += self.low;
        }
        if self.mode & 0x02 != 0 {
            out += self.band;
        }
        if self.mode & 0x04 != 0 {
            out += high;
        }
        out
    }
}

/// MOS 6581 Sound Interface Device.
#[derive(Debug, Clone)]
pub struct Sid6581 {
    voices: [SidVoice; VOICE_COUNT],
    filter: SidFilter,
    volume: u8,
    clock_hz: u32,
    /// Bresenham accumulator for the CPU clock to sample rate ratio.
    sample_clock: u32,
    /// Voice sums collected between two output samples, split by
    /// filter routing.
    direct_sum: i64,
    filter_sum: i64,
    mix_count: u32,
    mix_phase: u8,
    samples: Vec<u8>,
    audio_enabled: bool,
}

impl Sid6581 {
    pub fn new(clock_hz: u32) -> Self {
        Self {
            voices: [SidVoice::new(), SidVoice::new(), SidVoice::new()],
            filter: SidFilter::default(),
            volume: 0,
            clock_hz,
            sample_clock: 0,
            direct_sum: 0,
            filter_sum: 0,
            mix_count: 0,
            mix_phase: 0,
            samples: Vec::with_capacity(1024),
            audio_enabled: true,
        }
    }

    /// Samples produced since the last [`clear_samples`](Self::clear_samples).
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn clear_samples(&mut self) {
        self.samples.clear();
    }

    /// With audio disabled the oscillators keep running (OSC3/ENV3 stay
    /// valid) but no PCM is produced.
    pub fn set_audio_enabled(&mut self, enabled: bool) {
        self.audio_enabled = enabled;
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn voice(&self, index: usize) -> Option<&SidVoice> {
        self.voices.get(index)
    }

    pub fn advance(&mut self, cycles: u32) {
        for _ in 0..cycles {
            self.clock();
        }
    }

    /// One CPU cycle.
    pub fn clock(&mut self) {
        self.clock_oscillators();
        for voice in &mut self.voices {
            voice.clock_envelope();
        }

        if !self.audio_enabled {
            return;
        }

        // Voices are sampled every 4 cycles and averaged per output sample.
        self.mix_phase = (self.mix_phase + 1) & 0x03;
        if self.mix_phase == 0 {
            let (direct, filtered) = self.mix();
            self.direct_sum += direct as i64;
            self.filter_sum += filtered as i64;
            self.mix_count += 1;
        }

        self.sample_clock += SAMPLE_RATE;
        if self.sample_clock >= self.clock_hz {
            self.sample_clock -= self.clock_hz;
            let sample = self.output_sample();
            self.samples.push(sample);
        }
    }

    fn clock_oscillators(&mut self) {
        let prev_msb = [
            self.voices[0].msb(),
            self.voices[1].msb(),
            self.voices[2].msb(),
        ];

        for voice in &mut self.voices {
            if voice.test_bit() {
                voice.accumulator = 0;
                voice.lfsr = 0x7F_FFFF;
                continue;
            }
            let before = voice.accumulator;
            voice.accumulator = (voice.accumulator + voice.freq as u32) & 0x00FF_FFFF;
            if before & 0x0008_0000 == 0 && voice.accumulator & 0x0008_0000 != 0 {
                voice.clock_lfsr();
            }
        }

        // Voice 1 syncs to voice 3, voice 2 to voice 1, voice 3 to voice 2.
        for index in 0..VOICE_COUNT {
            let source = (index + 2) % VOICE_COUNT;
            if self.voices[index].sync_enabled() && !prev_msb[source] && self.voices[source].msb()
            {
                self.voices[index].accumulator = 0;
            }
        }
    }

    /// Unfiltered and filter-bound voice sums.
    fn mix(&self) -> (i32, i32) {
        let ring = [
            self.voices[2].msb(),
            self.voices[0].msb(),
            self.voices[1].msb(),
        ];

        let mut direct = 0;
        let mut filtered = 0;
        for (index, voice) in self.voices.iter().enumerate() {
            let amplitude = voice.amplitude(ring[index]);
            if self.filter.routing & (1 << index) != 0 {
                filtered += amplitude;
            } else if index != 2 || self.filter.mode & 0x08 == 0 {
                direct += amplitude;
            }
        }
        (direct, filtered)
    }

    fn output_sample(&mut self) -> u8 {
        let count = self.mix_count.max(1) as f32;
        let direct = self.direct_sum as f32 / count;
        let filter_input = self.filter_sum as f32 / count;
        self.direct_sum = 0;
        self.filter_sum = 0;
        self.mix_count = 0;

        let filtered = if self.filter.routing & 0x07 != 0 {
            self.filter.process(filter_input)
        } else {
            0.0
        };

        // Three full-scale voices span about ±6144.
        let mixed = direct + filtered;
        let scaled = mixed * self.volume as f32 / 15.0 * 127.0 / 6144.0;
        (SILENCE as f32 + scaled).clamp(0.0, 255.0) as u8
    }

    pub fn reset(&mut self) {
        self.voices = [SidVoice::new(), SidVoice::new(), SidVoice::new()];
        self.filter = SidFilter::default();
        self.volume = 0;
        self.sample_clock = 0;
        self.direct_sum = 0;
        self.filter_sum = 0;
        self.mix_count = 0;
        self.samples.clear();
    }
}

impl Default for Sid6581 {
    fn default() -> Self {
        Self::new(985_248)
    }
}

impl Device for Sid6581 {
    fn read(&self, offset: u16) -> u8 {
        match offset & 0x1F {
            // Paddles are not connected.
            0x19 | 0x1A => 0xFF,
            0x1B => (self.voices[2].output(self.voices[1].msb()) >> 4) as u8,
            0x1C => self.voices[2].envelope_counter,
            _ => 0,
        }
    }

    fn write(&mut self, offset: u16, value: u8) {
        let offset = (offset & 0x1F) as usize;
        if offset < 21 {
            let voice = &mut self.voices[offset / 7];
            match offset % 7 {
                0 => voice.freq = (voice.freq & 0xFF00) | value as u16,
                1 => voice.freq = (voice.freq & 0x00FF) | ((value as u16) << 8),
                2 => voice.pulse_width = (voice.pulse_width & 0xF00) | value as u16,
                3 => voice.pulse_width = (voice.pulse_width & 0x0FF) | (((value & 0x0F) as u16) << 8),
                4 => voice.write_control(value),
                5 => voice.attack_decay = value,
                _ => voice.sustain_release = value,
            }
            return;
        }

        match offset {
            0x15 => self.filter.cutoff = (self.filter.cutoff & 0x7F8) | (value & 0x07) as u16,
            0x16 => self.filter.cutoff = (self.filter.cutoff & 0x007) | ((value as u16) << 3),
            0x17 => {
                self.filter.routing = value & 0x0F;
                self.filter.resonance = value >> 4;
            }
            0x18 => {
                self.volume = value & 0x0F;
                self.filter.mode = value >> 4;
            }
            _ => {}
        }
    }

    fn size(&self) -> u16 {
        32
    }
}

impl Persist for Sid6581 {
    fn save_state(&self, out: &mut StateWriter) {
        for voice in &self.voices {
            out.u16(voice.freq);
            out.u16(voice.pulse_width);
            out.u8(voice.control);
            out.u8(voice.attack_decay);
            out.u8(voice.sustain_release);
            out.u32(voice.accumulator);
            out.u32(voice.lfsr);
            out.u8(voice.envelope_state.to_byte());
            out.u8(voice.envelope_counter);
            out.u16(voice.rate_counter);
            out.u8(voice.exp_counter);
        }
        out.u16(self.filter.cutoff);
        out.u8(self.filter.resonance);
        out.u8(self.filter.routing);
        out.u8(self.filter.mode);
        out.u32(self.filter.low.to_bits());
        out.u32(self.filter.band.to_bits());
        out.u8(self.volume);
        out.u32(self.sample_clock);
    }

    fn load_state(&mut self, input: &mut StateReader<'_>) -> Result<(), SnapshotError> {
        for voice in &mut self.voices {
            voice.freq = input.u16()?;
            voice.pulse_width = input.u16()? & 0x0FFF;
            voice.control = input.u8()?;
            voice.attack_decay = input.u8()?;
            voice.sustain_release = input.u8()?;
            voice.accumulator = input.u32()? & 0x00FF_FFFF;
            voice.lfsr = input.u32()? & 0x7F_FFFF;
            voice.envelope_state = EnvelopeState::from_byte(input.u8()?);
            voice.envelope_counter = input.u8()?;
            voice.rate_counter = input.u16()?;
            voice.exp_counter = input.u8()?;
        }
        self.filter.cutoff = input.u16()? & 0x07FF;
        self.filter.resonance = input.u8()? & 0x0F;
        self.filter.routing = input.u8()? & 0x0F;
        self.filter.mode = input.u8()? & 0x0F;
        self.filter.low = f32::from_bits(input.u32()?);
        self.filter.band = f32::from_bits(input.u32()?);
        self.volume = input.u8()? & 0x0F;
        self.sample_clock = input.u32()? % self.clock_hz.max(1);
        self.direct_sum = 0;
        self.filter_sum = 0;
        self.mix_count = 0;
        self.samples.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sid_is_silent() {
        let mut sid = Sid6581::new(985_248);
        sid.advance(10_000);
        assert!(!sid.samples().is_empty());
        assert!(sid.samples().iter().all(|&s| s == SILENCE));
    }

    #[test]
    fn test_sample_rate_over_one_second() {
        let mut sid = Sid6581::new(985_248);
        sid.advance(985_248);
        assert_eq!(sid.samples().len(), SAMPLE_RATE as usize);
        sid.clear_samples();
        assert!(sid.samples().is_empty());
    }

    #[test]
    fn test_audio_disabled_produces_nothing() {
        let mut sid = Sid6581::new(985_248);
        sid.set_audio_enabled(false);
        sid.advance(10_000);
        assert!(sid.samples().is_empty());
    }

    #[test]
    fn test_voice_registers() {
        let mut sid = Sid6581::new(985_248);
        sid.write(0x07, 0x34);
        sid.write(0x08, 0x12);
        sid.write(0x09, 0xFF);
        sid.write(0x0A, 0xFF);
        let voice = sid.voice(1).unwrap();
        assert_eq!(voice.freq, 0x1234);
        assert_eq!(voice.pulse_width, 0x0FFF);
    }

    #[test]
    fn test_gate_starts_attack_and_release() {
        let mut sid = Sid6581::new(985_248);
        sid.write(0x04, 0x11);
        assert_eq!(sid.voice(0).unwrap().envelope_state, EnvelopeState::Attack);
        sid.write(0x04, 0x10);
        assert_eq!(sid.voice(0).unwrap().envelope_state, EnvelopeState::Release);
    }

    #[test]
    fn test_fastest_attack_reaches_peak_then_sustain() {
        let mut sid = Sid6581::new(985_248);
        sid.write(0x05, 0x00);
        sid.write(0x06, 0xF0);
        sid.write(0x04, 0x21);
        sid.advance(9 * 255);
        let voice = sid.voice(0).unwrap();
        assert_eq!(voice.envelope_counter, 255);
        sid.advance(9 * 2);
        assert_eq!(sid.voice(0).unwrap().envelope_state, EnvelopeState::Sustain);
    }

    #[test]
    fn test_accumulator_wraps_at_24_bits() {
        let mut sid = Sid6581::new(985_248);
        sid.write(0x00, 0xFF);
        sid.write(0x01, 0xFF);
        sid.advance(257);
        assert!(sid.voice(0).unwrap().accumulator <= 0x00FF_FFFF);
    }

    #[test]
    fn test_test_bit_holds_accumulator() {
        let mut sid = Sid6581::new(985_248);
        sid.write(0x00, 0x00);
        sid.write(0x01, 0x10);
        sid.advance(100);
        assert_ne!(sid.voice(0).unwrap().accumulator, 0);
        sid.write(0x04, 0x08);
        sid.advance(100);
        assert_eq!(sid.voice(0).unwrap().accumulator, 0);
    }

    #[test]
    fn test_hard_sync_resets_voice() {
        let mut sid = Sid6581::new(985_248);
        // Voice 3 wraps its MSB quickly; voice 1 syncs to it.
        sid.write(0x0F, 0x80);
        sid.write(0x01, 0x01);
        sid.write(0x04, 0x02);
        sid.advance(256);
        assert!(sid.voice(0).unwrap().accumulator < 0x100 * 256);
    }

    #[test]
    fn test_osc3_and_env3_readback() {
        let mut sid = Sid6581::new(985_248);
        assert_eq!(sid.read(0x1B), 0);
        assert_eq!(sid.read(0x1C), 0);

        sid.write(0x0E, 0x00);
        sid.write(0x0F, 0x10);
        sid.write(0x12, 0x20);
        sid.advance(0x100);
        // Sawtooth: top 8 bits of the accumulator.
        assert_eq!(sid.read(0x1B), 0x10);
    }

    #[test]
    fn test_paddles_read_high() {
        let sid = Sid6581::new(985_248);
        assert_eq!(sid.read(0x19), 0xFF);
        assert_eq!(sid.read(0x1A), 0xFF);
    }

    #[test]
    fn test_audible_voice_moves_output() {
        let mut sid = Sid6581::new(985_248);
        sid.write(0x18, 0x0F);
        sid.write(0x00, 0x00);
        sid.write(0x01, 0x20);
        sid.write(0x05, 0x00);
        sid.write(0x06, 0xF0);
        sid.write(0x04, 0x41);
        sid.write(0x02, 0x00);
        sid.write(0x03, 0x08);
        sid.advance(20_000);
        let samples = sid.samples();
        let min = samples.iter().copied().min().unwrap();
        let max = samples.iter().copied().max().unwrap();
        assert!(max > SILENCE + 20);
        assert!(min < SILENCE - 20);
    }

    #[test]
    fn test_state_round_trip() {
        let mut sid = Sid6581::new(985_248);
        sid.write(0x0E, 0x55);
        sid.write(0x12, 0x21);
        sid.write(0x18, 0x1F);
        sid.advance(5000);

        let mut out = StateWriter::new();
        sid.save_state(&mut out);
        let data = out.into_inner();

        let mut restored = Sid6581::new(985_248);
        restored.load_state(&mut StateReader::new(&data)).unwrap();
        assert_eq!(restored.read(0x1C), sid.read(0x1C));
        assert_eq!(restored.read(0x1B), sid.read(0x1B));
        assert_eq!(restored.volume(), 15);
    }
}
