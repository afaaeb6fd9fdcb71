//! Rolling magnitude spectrum over the most recent analysis window

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Analysis window size in samples
pub const ANALYSIS_WINDOW: usize = 512;

/// Full-scale divisor for normalizing 16-bit samples
const I16_SCALE: f32 = 32768.0;

/// Streaming spectrum analyzer
///
/// Accumulates PCM samples across chunks of any size; once the rolling
/// buffer holds a full window, the magnitude spectrum of the most recent
/// window is recomputed and the buffer keeps only the trailing window.
///
/// A clock derived from the ingested sample count provides simulated
/// milliseconds for the beat detector's debounce, so tests are
/// deterministic without wall time.
pub struct SpectralAnalyzer {
    sample_rate: u32,
    channels: u16,
    buffer: Vec<f32>,
    spectrum: Vec<f32>,
    has_frame: bool,
    fft: Arc<dyn Fft<f32>>,
    fft_buffer: Vec<Complex<f32>>,
    clock_ms: f64,
}

impl SpectralAnalyzer {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(ANALYSIS_WINDOW);

        Self {
            sample_rate,
            channels: channels.max(1),
            buffer: Vec::with_capacity(ANALYSIS_WINDOW * 2),
            spectrum: vec![0.0; ANALYSIS_WINDOW / 2 + 1],
            has_frame: false,
            fft,
            fft_buffer: vec![Complex::new(0.0, 0.0); ANALYSIS_WINDOW],
            clock_ms: 0.0,
        }
    }

    /// Append samples to the rolling buffer, recomputing the spectrum
    /// whenever a full window is available
    pub fn ingest(&mut self, chunk: &[i16]) {
        let frames = chunk.len() as f64 / self.channels as f64;
        self.clock_ms += frames * 1000.0 / self.sample_rate as f64;

        self.buffer
            .extend(chunk.iter().map(|&s| s as f32 / I16_SCALE));

        if self.buffer.len() >= ANALYSIS_WINDOW {
            self.transform();
            // Retain only the trailing window; older samples are consumed
            let excess = self.buffer.len() - ANALYSIS_WINDOW;
            self.buffer.drain(..excess);
        }
    }

    fn transform(&mut self) {
        let start = self.buffer.len() - ANALYSIS_WINDOW;
        for (slot, &sample) in self.fft_buffer.iter_mut().zip(&self.buffer[start..]) {
            *slot = Complex::new(sample, 0.0);
        }

        self.fft.process(&mut self.fft_buffer);

        // Real input: bins 0..=N/2 carry the whole spectrum
        for (bin, slot) in self.spectrum.iter_mut().enumerate() {
            *slot = self.fft_buffer[bin].norm() / ANALYSIS_WINDOW as f32;
        }

        // Rescale so the loudest bin reads 1.0; all-zero input stays zero
        let max = self.spectrum.iter().cloned().fold(0.0f32, f32::max);
        if max > 0.0 {
            for slot in &mut self.spectrum {
                *slot /= max;
            }
        }

        self.has_frame = true;
    }

    /// Latest magnitude frame, normalized to [0, 1]
    ///
    /// All zeros until the first full window has been ingested.
    pub fn spectrum(&self) -> &[f32] {
        &self.spectrum
    }

    /// Whether at least one full window has been transformed
    pub fn has_frame(&self) -> bool {
        self.has_frame
    }

    /// Simulated milliseconds of audio ingested since creation or reset
    pub fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    /// Discard all buffered samples and the current frame (track change)
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.spectrum.fill(0.0);
        self.has_frame = false;
        self.clock_ms = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_chunks_accumulate_before_first_frame() {
        let mut analyzer = SpectralAnalyzer::new(44100, 1);

        analyzer.ingest(&[1000i16; 200]);
        analyzer.ingest(&[1000i16; 200]);
        assert!(!analyzer.has_frame());

        analyzer.ingest(&[1000i16; 200]);
        assert!(analyzer.has_frame());
    }

    #[test]
    fn all_zero_input_yields_all_zero_frame() {
        let mut analyzer = SpectralAnalyzer::new(44100, 1);
        analyzer.ingest(&[0i16; ANALYSIS_WINDOW]);

        assert!(analyzer.has_frame());
        assert!(analyzer.spectrum().iter().all(|&m| m == 0.0));
        assert!(analyzer.spectrum().iter().all(|m| !m.is_nan()));
    }

    #[test]
    fn loudest_bin_normalizes_to_one() {
        let mut analyzer = SpectralAnalyzer::new(44100, 1);

        // Tone landing exactly on bin 8 of the window
        let tone: Vec<i16> = (0..ANALYSIS_WINDOW)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * 8.0 * i as f32 / ANALYSIS_WINDOW as f32;
                (12000.0 * phase.sin()) as i16
            })
            .collect();
        analyzer.ingest(&tone);

        let spectrum = analyzer.spectrum();
        let max = spectrum.iter().cloned().fold(0.0f32, f32::max);
        assert!((max - 1.0).abs() < 1e-6);

        let peak_bin = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap()
            .0;
        assert_eq!(peak_bin, 8);
    }

    #[test]
    fn clock_advances_by_ingested_frames() {
        let mut analyzer = SpectralAnalyzer::new(1000, 2);
        // 500 interleaved samples = 250 frames = 250 ms at 1 kHz
        analyzer.ingest(&[0i16; 500]);
        assert!((analyzer.clock_ms() - 250.0).abs() < 1e-9);
    }

    #[test]
    fn reset_discards_buffered_samples() {
        let mut analyzer = SpectralAnalyzer::new(44100, 1);
        analyzer.ingest(&[500i16; 600]);
        analyzer.reset();

        assert!(!analyzer.has_frame());
        assert_eq!(analyzer.clock_ms(), 0.0);

        // A short chunk after reset must not complete a window
        analyzer.ingest(&[500i16; 100]);
        assert!(!analyzer.has_frame());
    }
}
