//! Equalizer pipeline for Sono - band filters and gain staging
//!
//! This crate provides the streaming DSP core of the player:
//! - Filter bank: three fixed-topology IIR band filters (low/mid/high)
//! - EqualizerPipeline: chunk-wise, stateful processing of 16-bit PCM

mod equalizer;
mod filter;

pub use equalizer::{EqualizerPipeline, GainSet};
pub use filter::{Band, BandFilter, FilterError, FilterSpec};
