//! Streaming three-band equalizer pipeline
//!
//! Consumes raw 16-bit PCM chunks, splits them through the filter bank,
//! applies per-band gain, and re-quantizes. Filtering is stateful across
//! chunks; state restarts only at stream boundaries (track changes).

use crate::filter::{Band, BandFilter, FilterError, FilterSpec};
use tracing::warn;

/// Full-scale divisor for normalizing 16-bit samples
const I16_SCALE: f32 = 32768.0;

/// Per-band gains in decibels
///
/// Values are clamped to the control range on construction. Conversion to
/// linear multipliers happens once per chunk, not per sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainSet {
    bass_db: f32,
    mid_db: f32,
    treble_db: f32,
}

impl GainSet {
    pub const MIN_DB: f32 = -10.0;
    pub const MAX_DB: f32 = 10.0;

    /// Create a gain set, clamping each band to [-10, +10] dB
    pub fn new(bass_db: f32, mid_db: f32, treble_db: f32) -> Self {
        Self {
            bass_db: bass_db.clamp(Self::MIN_DB, Self::MAX_DB),
            mid_db: mid_db.clamp(Self::MIN_DB, Self::MAX_DB),
            treble_db: treble_db.clamp(Self::MIN_DB, Self::MAX_DB),
        }
    }

    /// Unity gain on all bands
    pub fn flat() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn bass_db(&self) -> f32 {
        self.bass_db
    }

    pub fn mid_db(&self) -> f32 {
        self.mid_db
    }

    pub fn treble_db(&self) -> f32 {
        self.treble_db
    }

    /// Linear multipliers for [low, mid, high]
    fn to_linear(self) -> [f32; 3] {
        [
            db_to_linear(self.bass_db),
            db_to_linear(self.mid_db),
            db_to_linear(self.treble_db),
        ]
    }
}

impl Default for GainSet {
    fn default() -> Self {
        Self::flat()
    }
}

fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

struct FilterBank {
    low: BandFilter,
    mid: BandFilter,
    high: BandFilter,
    channels: usize,
}

/// Chunk-wise equalizer bound to one stream format
///
/// Unconfigured until [`configure`](EqualizerPipeline::configure) is called
/// with the stream's sample rate and channel count; until then (and on any
/// processing fault) chunks pass through unmodified so playback never stops.
pub struct EqualizerPipeline {
    bank: Option<FilterBank>,
    gains: GainSet,
}

impl EqualizerPipeline {
    pub fn new() -> Self {
        Self {
            bank: None,
            gains: GainSet::flat(),
        }
    }

    /// Build the filter bank for a stream format
    ///
    /// Replaces any previous bank, discarding its delay registers.
    pub fn configure(&mut self, sample_rate: u32, channels: u16) -> Result<(), FilterError> {
        let spec = FilterSpec::new(sample_rate, channels)?;
        self.bank = Some(FilterBank {
            low: BandFilter::design(Band::Low, &spec)?,
            mid: BandFilter::design(Band::Mid, &spec)?,
            high: BandFilter::design(Band::High, &spec)?,
            channels: spec.channels as usize,
        });
        Ok(())
    }

    /// Drop the filter bank; subsequent chunks pass through
    pub fn deconfigure(&mut self) {
        self.bank = None;
    }

    pub fn is_configured(&self) -> bool {
        self.bank.is_some()
    }

    /// Update band gains; takes effect from the next chunk
    pub fn set_gains(&mut self, gains: GainSet) {
        self.gains = gains;
    }

    pub fn gains(&self) -> GainSet {
        self.gains
    }

    /// Clear filter delay registers (stream restart), keeping the design
    pub fn reset(&mut self) {
        if let Some(bank) = &mut self.bank {
            bank.low.reset();
            bank.mid.reset();
            bank.high.reset();
        }
    }

    /// Process one PCM chunk, returning a new chunk of equal length
    ///
    /// On any fault the original chunk is returned unmodified and a
    /// diagnostic is logged; uninterrupted playback wins over the effect.
    pub fn process(&mut self, chunk: &[i16]) -> Vec<i16> {
        if chunk.is_empty() {
            return Vec::new();
        }
        match self.try_process(chunk) {
            Ok(out) => out,
            Err(e) => {
                warn!("equalizer pass-through: {e}");
                chunk.to_vec()
            }
        }
    }

    fn try_process(&mut self, chunk: &[i16]) -> Result<Vec<i16>, FilterError> {
        let bank = self.bank.as_mut().ok_or(FilterError::NotConfigured)?;
        let [gain_low, gain_mid, gain_high] = self.gains.to_linear();
        let channels = bank.channels;

        let mut out = Vec::with_capacity(chunk.len());
        for (i, &sample) in chunk.iter().enumerate() {
            let channel = i % channels;
            let x = sample as f32 / I16_SCALE;

            // The bands filter the same input independently; they are
            // summed, not chained.
            let sum = bank.low.process_sample(x, channel) * gain_low
                + bank.mid.process_sample(x, channel) * gain_mid
                + bank.high.process_sample(x, channel) * gain_high;

            let clipped = sum.clamp(-1.0, 1.0);
            out.push((clipped * (I16_SCALE - 1.0)).round() as i16);
        }
        Ok(out)
    }
}

impl Default for EqualizerPipeline {
    fn default() -> Self {
        Self::new()
    }
}
