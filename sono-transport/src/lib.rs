//! Playback transport for Sono
//!
//! Defines the boundary the player core drives - commands, lifecycle
//! events, PCM exchange - and ships the concrete engine behind it:
//! - TrackLoader: Symphonia decode + resampling to the device rate
//! - OutputStream: cpal output fed from a lock-free ring buffer
//! - AudioTransport: ties both together and reports position/lifecycle

mod engine;
mod loader;
mod output;
mod transport;

pub use engine::AudioTransport;
pub use loader::{DecodedTrack, LoadError, TrackLoader};
pub use output::{OutputError, OutputStream};
pub use transport::{MediaStatus, Transport, TransportEvent};
