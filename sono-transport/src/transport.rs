//! The transport boundary: commands, events, and the trait the player drives

use std::path::Path;

/// Media lifecycle states reported by a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaStatus {
    Loading,
    Loaded,
    Buffering,
    EndOfMedia,
    InvalidMedia,
}

/// Asynchronous notifications emitted by a transport
///
/// All times are milliseconds of stream position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    DurationChanged(u64),
    PositionChanged(u64),
    StatusChanged(MediaStatus),
}

/// The playback engine surface the player core drives
///
/// Commands mirror a media backend; events are polled by the host loop and
/// fed to the playback state machine, which must tolerate them arriving at
/// arbitrary points relative to user actions. PCM exchange is pull based:
/// [`next_chunk`](Transport::next_chunk) hands out raw audio whenever the
/// output side has room, [`submit_chunk`](Transport::submit_chunk) accepts
/// the processed result for the sink.
pub trait Transport {
    fn load(&mut self, source: &Path);
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn set_position(&mut self, ms: u64);
    fn position(&self) -> u64;
    /// Sink volume in [0.0, 1.0]
    fn set_volume(&mut self, volume: f32);
    /// Sample rate and channel count of the PCM this transport delivers
    fn audio_format(&self) -> Option<(u32, u16)>;
    /// Next raw PCM chunk, when playing and the sink has room
    fn next_chunk(&mut self) -> Option<Vec<i16>>;
    /// Accept a processed chunk for output
    fn submit_chunk(&mut self, chunk: Vec<i16>);
    /// Drain one pending event, oldest first
    fn poll_event(&mut self) -> Option<TransportEvent>;
}
