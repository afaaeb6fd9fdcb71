//! cpal output stream fed from a lock-free ring buffer

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use ringbuf::{traits::*, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Ring capacity in whole frames (~quarter second at 48 kHz)
const RING_FRAMES: usize = 12288;

/// Errors from opening the output device
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    #[error("no audio output device found")]
    NoDevice,
    #[error("failed to get audio config: {0}")]
    Config(String),
    #[error("failed to build audio stream: {0}")]
    Stream(String),
}

/// Output sink: owns the cpal stream and the shared volume cell
///
/// The audio callback never blocks: it pops from the ring, emits silence
/// on underrun, and reads the volume with a try-lock so a held lock on the
/// control thread can never stall it.
pub struct OutputStream {
    _stream: cpal::Stream,
    sample_rate: u32,
    channels: u16,
    volume: Arc<Mutex<f32>>,
    running: Arc<AtomicBool>,
    flush: Arc<AtomicBool>,
}

impl OutputStream {
    /// Open the default output device and start the stream
    ///
    /// Returns the stream handle and the producer half of the sample ring.
    pub fn open() -> Result<(Self, HeapProd<f32>), OutputError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(OutputError::NoDevice)?;
        let config = device
            .default_output_config()
            .map_err(|e| OutputError::Config(e.to_string()))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels();

        let ring = HeapRb::<f32>::new(RING_FRAMES * channels as usize);
        let (producer, mut consumer) = ring.split();

        let volume = Arc::new(Mutex::new(1.0f32));
        let running = Arc::new(AtomicBool::new(false));
        let flush = Arc::new(AtomicBool::new(false));

        let volume_cb = Arc::clone(&volume);
        let running_cb = Arc::clone(&running);
        let flush_cb = Arc::clone(&flush);

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    // Drop everything queued before a stop/seek so stale
                    // audio never bleeds into the new stream position
                    if flush_cb.swap(false, Ordering::Relaxed) {
                        while consumer.try_pop().is_some() {}
                    }
                    if !running_cb.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }
                    let gain = volume_cb.try_lock().map(|v| *v).unwrap_or(1.0);
                    for slot in data.iter_mut() {
                        *slot = consumer.try_pop().unwrap_or(0.0) * gain;
                    }
                },
                |err| warn!("output stream error: {err}"),
                None,
            )
            .map_err(|e| OutputError::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| OutputError::Stream(e.to_string()))?;

        Ok((
            Self {
                _stream: stream,
                sample_rate,
                channels,
                volume,
                running,
                flush,
            },
            producer,
        ))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Set sink volume in [0.0, 1.0]
    pub fn set_volume(&self, volume: f32) {
        *self.volume.lock() = volume.clamp(0.0, 1.0);
    }

    /// Gate the callback: while not running it emits silence and leaves
    /// buffered samples in place, so pause/resume keeps continuity
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Relaxed);
    }

    /// Ask the callback to discard everything currently queued
    pub fn request_flush(&self) {
        self.flush.store(true, Ordering::Relaxed);
    }

    /// Whether a requested flush has not yet been serviced
    pub fn flush_pending(&self) -> bool {
        self.flush.load(Ordering::Relaxed)
    }
}
