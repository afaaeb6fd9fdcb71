//! Band filters for the three-band equalizer
//!
//! Biquad sections use RBJ Audio EQ Cookbook designs. Each band cascades
//! two second-order sections into a fourth-order response:
//! - Low: Butterworth lowpass at the bass cutoff
//! - Mid: highpass at the bass cutoff into lowpass at the treble cutoff
//! - High: Butterworth highpass at the treble cutoff

use std::f32::consts::{FRAC_1_SQRT_2, PI};
use thiserror::Error;

/// Errors from filter design and pipeline configuration
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("cutoff {cutoff} Hz outside (0, {nyquist}) Hz for sample rate {sample_rate}")]
    CutoffOutOfRange {
        cutoff: f32,
        nyquist: f32,
        sample_rate: u32,
    },
    #[error("bass cutoff {bass} Hz must lie below treble cutoff {treble} Hz")]
    BandOrder { bass: f32, treble: f32 },
    #[error("channel count must be at least 1")]
    NoChannels,
    #[error("pipeline not configured for a stream format")]
    NotConfigured,
}

/// Frequency band selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Low,
    Mid,
    High,
}

/// Design parameters for the filter bank
///
/// Immutable once constructed; rebuild when the sample rate changes.
#[derive(Debug, Clone, Copy)]
pub struct FilterSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bass_cutoff: f32,
    pub treble_cutoff: f32,
}

impl FilterSpec {
    pub const DEFAULT_BASS_CUTOFF: f32 = 250.0;
    pub const DEFAULT_TREBLE_CUTOFF: f32 = 4000.0;

    /// Create a spec with the default band split
    pub fn new(sample_rate: u32, channels: u16) -> Result<Self, FilterError> {
        Self::with_cutoffs(
            sample_rate,
            channels,
            Self::DEFAULT_BASS_CUTOFF,
            Self::DEFAULT_TREBLE_CUTOFF,
        )
    }

    /// Create a spec with explicit cutoffs
    ///
    /// Cutoffs must lie strictly between 0 and Nyquist.
    pub fn with_cutoffs(
        sample_rate: u32,
        channels: u16,
        bass_cutoff: f32,
        treble_cutoff: f32,
    ) -> Result<Self, FilterError> {
        if channels == 0 {
            return Err(FilterError::NoChannels);
        }
        let nyquist = sample_rate as f32 / 2.0;
        for cutoff in [bass_cutoff, treble_cutoff] {
            if cutoff <= 0.0 || cutoff >= nyquist {
                return Err(FilterError::CutoffOutOfRange {
                    cutoff,
                    nyquist,
                    sample_rate,
                });
            }
        }
        if bass_cutoff >= treble_cutoff {
            return Err(FilterError::BandOrder {
                bass: bass_cutoff,
                treble: treble_cutoff,
            });
        }
        Ok(Self {
            sample_rate,
            channels,
            bass_cutoff,
            treble_cutoff,
        })
    }
}

/// Biquad filter coefficients (normalized, a* feedforward, b* feedback)
#[derive(Clone, Copy, Default)]
struct BiquadCoeffs {
    a0: f32,
    a1: f32,
    a2: f32,
    b1: f32,
    b2: f32,
}

impl BiquadCoeffs {
    /// RBJ lowpass
    fn lowpass(sample_rate: f32, cutoff: f32, q: f32) -> Self {
        let omega = 2.0 * PI * cutoff / sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / (2.0 * q);

        let b0 = (1.0 - cos_omega) / 2.0;
        let b1 = 1.0 - cos_omega;
        let b2 = (1.0 - cos_omega) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        Self {
            a0: b0 / a0,
            a1: b1 / a0,
            a2: b2 / a0,
            b1: a1 / a0,
            b2: a2 / a0,
        }
    }

    /// RBJ highpass
    fn highpass(sample_rate: f32, cutoff: f32, q: f32) -> Self {
        let omega = 2.0 * PI * cutoff / sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / (2.0 * q);

        let b0 = (1.0 + cos_omega) / 2.0;
        let b1 = -(1.0 + cos_omega);
        let b2 = (1.0 + cos_omega) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        Self {
            a0: b0 / a0,
            a1: b1 / a0,
            a2: b2 / a0,
            b1: a1 / a0,
            b2: a2 / a0,
        }
    }
}

/// Biquad delay registers for a single channel
#[derive(Default, Clone)]
struct BiquadState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadState {
    #[inline]
    fn process(&mut self, input: f32, coeffs: &BiquadCoeffs) -> f32 {
        let output = coeffs.a0 * input + coeffs.a1 * self.x1 + coeffs.a2 * self.x2
            - coeffs.b1 * self.y1
            - coeffs.b2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// Section Q values for a fourth-order Butterworth cascade
const BUTTERWORTH_Q: [f32; 2] = [0.541_196_1, 1.306_563];

/// One band of the filter bank: two cascaded biquad sections with
/// per-channel delay registers
pub struct BandFilter {
    sections: [BiquadCoeffs; 2],
    state: Vec<[BiquadState; 2]>,
}

impl BandFilter {
    /// Design a band for the given spec
    pub fn design(band: Band, spec: &FilterSpec) -> Result<Self, FilterError> {
        let rate = spec.sample_rate as f32;
        let sections = match band {
            Band::Low => [
                BiquadCoeffs::lowpass(rate, spec.bass_cutoff, BUTTERWORTH_Q[0]),
                BiquadCoeffs::lowpass(rate, spec.bass_cutoff, BUTTERWORTH_Q[1]),
            ],
            Band::Mid => [
                BiquadCoeffs::highpass(rate, spec.bass_cutoff, FRAC_1_SQRT_2),
                BiquadCoeffs::lowpass(rate, spec.treble_cutoff, FRAC_1_SQRT_2),
            ],
            Band::High => [
                BiquadCoeffs::highpass(rate, spec.treble_cutoff, BUTTERWORTH_Q[0]),
                BiquadCoeffs::highpass(rate, spec.treble_cutoff, BUTTERWORTH_Q[1]),
            ],
        };

        Ok(Self {
            sections,
            state: vec![Default::default(); spec.channels as usize],
        })
    }

    /// Number of channels this band was designed for
    pub fn channels(&self) -> usize {
        self.state.len()
    }

    /// Run one sample of the given channel through both sections
    #[inline]
    pub fn process_sample(&mut self, input: f32, channel: usize) -> f32 {
        let state = &mut self.state[channel];
        let mid = state[0].process(input, &self.sections[0]);
        state[1].process(mid, &self.sections[1])
    }

    /// Clear delay registers; coefficients are kept
    pub fn reset(&mut self) {
        for channel in &mut self.state {
            for section in channel {
                section.reset();
            }
        }
    }
}
