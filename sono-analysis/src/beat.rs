//! Bass-energy beat detection against a rolling baseline

use std::collections::VecDeque;

/// Number of bass-energy scalars kept for the rolling average
const HISTORY_LEN: usize = 50;

/// Low-frequency bin range summed as "bass energy"
const BASS_BINS: std::ops::Range<usize> = 0..50;

/// Energy ratio above the rolling average that fires a beat
const BEAT_THRESHOLD: f32 = 1.3;

/// Per-call decay applied to the held beat energy
const BEAT_DECAY: f32 = 0.95;

/// Minimum gap between fired beats
const DEBOUNCE_MS: f64 = 100.0;

/// One detector reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatPulse {
    pub is_beat: bool,
    /// Beat strength; decays smoothly between discrete beats so the
    /// visualization falls off instead of cutting out
    pub intensity: f32,
}

/// Beat detector over spectrum frames
///
/// Call [`detect`](BeatDetector::detect) once per visual frame with the
/// current magnitude spectrum and a monotonic timestamp. The timestamp is
/// injected (rather than read from a wall clock) so the debounce is exact
/// under simulated time.
pub struct BeatDetector {
    energy_history: VecDeque<f32>,
    current_beat_energy: f32,
    last_beat_ms: Option<f64>,
}

impl BeatDetector {
    pub fn new() -> Self {
        Self {
            energy_history: VecDeque::with_capacity(HISTORY_LEN),
            current_beat_energy: 0.0,
            last_beat_ms: None,
        }
    }

    /// Evaluate the current spectrum frame at the given timestamp
    pub fn detect(&mut self, spectrum: &[f32], now_ms: f64) -> BeatPulse {
        let end = BASS_BINS.end.min(spectrum.len());
        let bass_energy: f32 = spectrum[..end].iter().sum();

        self.energy_history.push_back(bass_energy);
        if self.energy_history.len() > HISTORY_LEN {
            self.energy_history.pop_front();
        }
        let average: f32 =
            self.energy_history.iter().sum::<f32>() / self.energy_history.len() as f32;

        // Held energy decays on every call, beat or not
        self.current_beat_energy *= BEAT_DECAY;

        let mut is_beat = false;
        let mut intensity = 1.0;

        if bass_energy > average * BEAT_THRESHOLD {
            let past_debounce = self
                .last_beat_ms
                .map_or(true, |last| now_ms - last > DEBOUNCE_MS);
            if past_debounce {
                is_beat = true;
                self.last_beat_ms = Some(now_ms);
                intensity = bass_energy / average;
                self.current_beat_energy = intensity;
                tracing::trace!(intensity, "beat fired");
            }
        }

        BeatPulse {
            is_beat,
            intensity: intensity.max(self.current_beat_energy),
        }
    }

    /// Forget history and held energy (track change)
    pub fn reset(&mut self) {
        self.energy_history.clear();
        self.current_beat_energy = 0.0;
        self.last_beat_ms = None;
    }
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self::new()
    }
}
