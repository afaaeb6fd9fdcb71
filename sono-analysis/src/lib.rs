//! Audio analysis for Sono
//!
//! Provides the numeric input pipeline for the reactive visualization:
//! rolling magnitude spectrum, bass-energy beat detection, and the
//! combined visual feed. Read-only with respect to playback.

mod beat;
mod feed;
mod spectrum;

pub use beat::{BeatDetector, BeatPulse};
pub use feed::{VisualFeed, VisualFrame};
pub use spectrum::{SpectralAnalyzer, ANALYSIS_WINDOW};
