//! Concrete transport: decoded track + output ring + lifecycle reporting

use crate::loader::{DecodedTrack, TrackLoader};
use crate::output::{OutputError, OutputStream};
use crate::transport::{MediaStatus, Transport, TransportEvent};
use ringbuf::{traits::*, HeapProd};
use std::collections::VecDeque;
use std::path::Path;
use tracing::{debug, warn};

/// Frames handed out per pump call
const CHUNK_FRAMES: usize = 1024;

/// Full-scale divisor for normalizing 16-bit samples
const I16_SCALE: f32 = 32768.0;

struct ActiveTrack {
    samples: Vec<i16>,
    /// Next sample index to hand out
    cursor: usize,
    duration_ms: u64,
}

/// Transport over the default audio device
///
/// Decodes a source file up front, hands raw PCM to the caller chunk by
/// chunk, and queues the processed result for the cpal callback. Position
/// derives from the samples handed to the ring minus the ring backlog, so
/// it tracks what the listener actually hears to within the ring capacity.
pub struct AudioTransport {
    output: OutputStream,
    producer: HeapProd<f32>,
    loader: TrackLoader,
    track: Option<ActiveTrack>,
    playing: bool,
    /// EndOfMedia already reported for the current cursor run
    ended: bool,
    events: VecDeque<TransportEvent>,
    last_reported_ms: u64,
}

impl AudioTransport {
    /// Open the default output device
    pub fn open() -> Result<Self, OutputError> {
        let (output, producer) = OutputStream::open()?;
        let loader = TrackLoader::new(output.sample_rate(), output.channels());
        debug!(
            "output stream at {} Hz, {} channels",
            output.sample_rate(),
            output.channels()
        );
        Ok(Self {
            output,
            producer,
            loader,
            track: None,
            playing: false,
            ended: false,
            events: VecDeque::new(),
            last_reported_ms: 0,
        })
    }

    fn channels(&self) -> usize {
        self.output.channels() as usize
    }

    fn frames_to_ms(&self, frames: usize) -> u64 {
        frames as u64 * 1000 / self.output.sample_rate() as u64
    }

    fn ms_to_samples(&self, ms: u64) -> usize {
        let frames = ms as usize * self.output.sample_rate() as usize / 1000;
        frames * self.channels()
    }
}

impl Transport for AudioTransport {
    fn load(&mut self, source: &Path) {
        self.stop();
        self.events
            .push_back(TransportEvent::StatusChanged(MediaStatus::Loading));

        match self.loader.load(source) {
            Ok(DecodedTrack {
                samples,
                duration_ms,
                title,
                artist,
                ..
            }) => {
                debug!("loaded {title} - {artist} ({duration_ms} ms)");
                self.track = Some(ActiveTrack {
                    samples,
                    cursor: 0,
                    duration_ms,
                });
                self.ended = false;
                self.events
                    .push_back(TransportEvent::DurationChanged(duration_ms));
                self.events
                    .push_back(TransportEvent::StatusChanged(MediaStatus::Loaded));
            }
            Err(e) => {
                warn!("failed to load {}: {e}", source.display());
                self.track = None;
                self.events
                    .push_back(TransportEvent::StatusChanged(MediaStatus::InvalidMedia));
            }
        }
    }

    fn play(&mut self) {
        if self.track.is_some() {
            self.playing = true;
            self.output.set_running(true);
        }
    }

    fn pause(&mut self) {
        self.playing = false;
        self.output.set_running(false);
    }

    fn stop(&mut self) {
        self.playing = false;
        self.ended = false;
        self.last_reported_ms = 0;
        self.output.set_running(false);
        self.output.request_flush();
        if let Some(track) = &mut self.track {
            track.cursor = 0;
        }
    }

    fn set_position(&mut self, ms: u64) {
        let channels = self.channels();
        let target = self.ms_to_samples(ms);
        if let Some(track) = &mut self.track {
            // Align to a frame boundary so channels stay interleaved
            let clamped = target.min(track.samples.len());
            track.cursor = clamped - clamped % channels;
            self.ended = false;
            // Queued audio belongs to the old position
            self.output.request_flush();
        }
    }

    fn position(&self) -> u64 {
        let Some(track) = &self.track else {
            return 0;
        };
        let backlog = self.producer.occupied_len();
        let played_samples = track.cursor.saturating_sub(backlog);
        self.frames_to_ms(played_samples / self.channels())
    }

    fn set_volume(&mut self, volume: f32) {
        self.output.set_volume(volume);
    }

    fn audio_format(&self) -> Option<(u32, u16)> {
        Some((self.output.sample_rate(), self.output.channels()))
    }

    fn next_chunk(&mut self) -> Option<Vec<i16>> {
        if !self.playing || self.output.flush_pending() {
            return None;
        }

        let chunk_len = CHUNK_FRAMES * self.channels();
        if self.producer.vacant_len() < chunk_len {
            return None;
        }

        let ring_empty = self.producer.occupied_len() == 0;
        let track = self.track.as_mut()?;

        if track.cursor >= track.samples.len() {
            // Source exhausted; report the end once the sink has drained
            if !self.ended && ring_empty {
                self.ended = true;
                self.playing = false;
                self.events
                    .push_back(TransportEvent::StatusChanged(MediaStatus::EndOfMedia));
            }
            return None;
        }

        let end = (track.cursor + chunk_len).min(track.samples.len());
        let chunk = track.samples[track.cursor..end].to_vec();
        track.cursor = end;

        // Push a position event on whole-second boundaries; the host's
        // poll timer covers the gaps
        let position = self.position();
        if position / 1000 != self.last_reported_ms / 1000 {
            self.last_reported_ms = position;
            self.events
                .push_back(TransportEvent::PositionChanged(position));
        }

        Some(chunk)
    }

    fn submit_chunk(&mut self, chunk: Vec<i16>) {
        let floats: Vec<f32> = chunk.iter().map(|&s| s as f32 / I16_SCALE).collect();
        let pushed = self.producer.push_slice(&floats);
        if pushed < floats.len() {
            // next_chunk reserves room up front, so this indicates the
            // caller submitted more than it was handed
            warn!("output ring overflow, dropped {} samples", floats.len() - pushed);
        }
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.events.pop_front()
    }
}

impl AudioTransport {
    /// Duration of the loaded track, if any
    pub fn duration(&self) -> Option<u64> {
        self.track.as_ref().map(|t| t.duration_ms)
    }
}
