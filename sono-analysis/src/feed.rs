//! Beat-driven feed for the visualization layer
//!
//! Bundles the spectrum analyzer and beat detector behind the two calls
//! the renderer needs: ingest processed PCM, then take one numeric frame
//! per redraw. Pixel work happens elsewhere.

use crate::beat::{BeatDetector, BeatPulse};
use crate::spectrum::SpectralAnalyzer;

/// Hue phase advance per frame, wrapped into [0, 1)
const HUE_STEP: f32 = 0.005;

/// Numeric inputs for one rendered frame
#[derive(Debug, Clone)]
pub struct VisualFrame {
    /// Magnitude spectrum, normalized to [0, 1]
    pub spectrum: Vec<f32>,
    pub is_beat: bool,
    /// Beat strength with smooth falloff between beats
    pub intensity: f32,
    /// Slowly rotating color phase in [0, 1)
    pub hue_phase: f32,
}

/// Combined analysis feed for one playback stream
pub struct VisualFeed {
    analyzer: SpectralAnalyzer,
    detector: BeatDetector,
    hue_phase: f32,
}

impl VisualFeed {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            analyzer: SpectralAnalyzer::new(sample_rate, channels),
            detector: BeatDetector::new(),
            hue_phase: 0.0,
        }
    }

    /// Feed processed PCM into the rolling analysis buffer
    pub fn ingest(&mut self, chunk: &[i16]) {
        self.analyzer.ingest(chunk);
    }

    /// Produce the numeric inputs for one frame
    ///
    /// Runs beat detection against the current spectrum and advances the
    /// hue phase; call once per redraw.
    pub fn frame(&mut self) -> VisualFrame {
        let BeatPulse { is_beat, intensity } = self
            .detector
            .detect(self.analyzer.spectrum(), self.analyzer.clock_ms());

        self.hue_phase = (self.hue_phase + HUE_STEP) % 1.0;

        VisualFrame {
            spectrum: self.analyzer.spectrum().to_vec(),
            is_beat,
            intensity,
            hue_phase: self.hue_phase,
        }
    }

    /// Discard all analysis state (track change); the hue phase persists
    /// since it belongs to the renderer's timeline, not the stream
    pub fn reset(&mut self) {
        self.analyzer.reset();
        self.detector.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::ANALYSIS_WINDOW;

    #[test]
    fn frame_before_any_audio_is_silent() {
        let mut feed = VisualFeed::new(44100, 2);
        let frame = feed.frame();
        assert!(!frame.is_beat);
        assert!(frame.spectrum.iter().all(|&m| m == 0.0));
    }

    #[test]
    fn hue_phase_advances_and_wraps() {
        let mut feed = VisualFeed::new(44100, 2);
        let first = feed.frame().hue_phase;
        let second = feed.frame().hue_phase;
        assert!(second > first);

        for _ in 0..400 {
            feed.frame();
        }
        assert!(feed.frame().hue_phase < 1.0);
    }

    #[test]
    fn reset_clears_spectrum_but_not_hue() {
        let mut feed = VisualFeed::new(44100, 1);
        feed.ingest(&[8000i16; ANALYSIS_WINDOW]);
        let before = feed.frame();
        assert!(before.spectrum.iter().any(|&m| m > 0.0));

        feed.reset();
        let after = feed.frame();
        assert!(after.spectrum.iter().all(|&m| m == 0.0));
        assert!(after.hue_phase > before.hue_phase);
    }
}
