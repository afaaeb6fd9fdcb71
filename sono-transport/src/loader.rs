//! Audio file loading and decoding

use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

/// Errors that can occur during track loading
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no audio track found in file")]
    NoAudioTrack,
    #[error("decode error: {0}")]
    Decode(String),
}

/// A fully decoded track, converted to the output stream's format
pub struct DecodedTrack {
    /// Interleaved 16-bit samples at the loader's target rate and layout
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Source duration in milliseconds (measured before resampling)
    pub duration_ms: u64,
    pub title: String,
    pub artist: String,
}

/// Audio file loader using Symphonia
///
/// Decodes the whole file up front and converts it to the given sample
/// rate and channel layout, so playback itself never touches the decoder.
pub struct TrackLoader {
    target_sample_rate: u32,
    target_channels: u16,
}

impl TrackLoader {
    pub fn new(target_sample_rate: u32, target_channels: u16) -> Self {
        Self {
            target_sample_rate,
            target_channels: target_channels.max(1),
        }
    }

    /// Load and decode an audio file
    pub fn load(&self, path: &Path) -> Result<DecodedTrack, LoadError> {
        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(LoadError::NoAudioTrack)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let source_sample_rate = codec_params.sample_rate.unwrap_or(44100);
        let source_channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(2);

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let (title, artist) = extract_tags(&mut format, path);

        // Decode the whole stream to interleaved f32
        let mut samples: Vec<f32> = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(_) => break,
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(_) => continue,
            };

            let spec = *decoded.spec();
            let capacity = decoded.capacity() as u64;
            let mut sample_buf = SampleBuffer::<f32>::new(capacity, spec);
            sample_buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(sample_buf.samples());
        }

        if samples.is_empty() {
            return Err(LoadError::Decode("stream decoded to no samples".into()));
        }

        let source_frames = samples.len() / source_channels as usize;
        let duration_ms = source_frames as u64 * 1000 / source_sample_rate as u64;

        let samples = adapt_channels(samples, source_channels, self.target_channels);
        let samples = if source_sample_rate != self.target_sample_rate {
            self.resample(&samples, source_sample_rate)?
        } else {
            samples
        };

        let samples = samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16)
            .collect();

        Ok(DecodedTrack {
            samples,
            sample_rate: self.target_sample_rate,
            channels: self.target_channels,
            duration_ms,
            title,
            artist,
        })
    }

    /// Resample interleaved audio (already in the target channel layout)
    fn resample(&self, samples: &[f32], source_rate: u32) -> Result<Vec<f32>, LoadError> {
        use rubato::{FftFixedInOut, Resampler};

        let channels = self.target_channels as usize;
        let frames = samples.len() / channels;

        let mut resampler = FftFixedInOut::<f32>::new(
            source_rate as usize,
            self.target_sample_rate as usize,
            1024,
            channels,
        )
        .map_err(|e| LoadError::Decode(e.to_string()))?;

        // Deinterleave
        let deinterleaved: Vec<Vec<f32>> = (0..channels)
            .map(|ch| (0..frames).map(|f| samples[f * channels + ch]).collect())
            .collect();

        let chunk_size = resampler.input_frames_next();
        let mut output: Vec<Vec<f32>> = vec![Vec::new(); channels];

        let mut pos = 0;
        while pos + chunk_size <= frames {
            let input_refs: Vec<&[f32]> = deinterleaved
                .iter()
                .map(|ch| &ch[pos..pos + chunk_size])
                .collect();

            let resampled = resampler
                .process(&input_refs, None)
                .map_err(|e| LoadError::Decode(e.to_string()))?;

            for (ch, data) in resampled.into_iter().enumerate() {
                output[ch].extend(data);
            }

            pos += chunk_size;
        }

        // Flush the tail, zero-padded to a full resampler block
        if pos < frames {
            let remaining = frames - pos;
            let padded: Vec<Vec<f32>> = deinterleaved
                .iter()
                .map(|ch| {
                    let mut v = ch[pos..].to_vec();
                    v.resize(chunk_size, 0.0);
                    v
                })
                .collect();

            let input_refs: Vec<&[f32]> = padded.iter().map(|v| v.as_slice()).collect();

            if let Ok(resampled) = resampler.process(&input_refs, None) {
                let wanted =
                    (remaining * self.target_sample_rate as usize) / source_rate as usize;
                for (ch, data) in resampled.into_iter().enumerate() {
                    output[ch].extend(&data[..wanted.min(data.len())]);
                }
            }
        }

        // Reinterleave
        let output_frames = output[0].len();
        let mut interleaved = Vec::with_capacity(output_frames * channels);
        for frame in 0..output_frames {
            for channel in &output {
                interleaved.push(channel[frame]);
            }
        }

        Ok(interleaved)
    }
}

/// Map interleaved audio between channel layouts
///
/// Mono spreads to every output channel; extra source channels fold into
/// an average when the target is mono; otherwise each output channel takes
/// the nearest source channel.
fn adapt_channels(samples: Vec<f32>, source: u16, target: u16) -> Vec<f32> {
    if source == target {
        return samples;
    }

    let source = source as usize;
    let target = target as usize;
    let frames = samples.len() / source;
    let mut out = Vec::with_capacity(frames * target);

    for frame in 0..frames {
        let start = frame * source;
        if target == 1 {
            let sum: f32 = samples[start..start + source].iter().sum();
            out.push(sum / source as f32);
        } else {
            for ch in 0..target {
                out.push(samples[start + ch.min(source - 1)]);
            }
        }
    }

    out
}

/// Pull title/artist tags, falling back to the file stem
fn extract_tags(
    format: &mut Box<dyn symphonia::core::formats::FormatReader>,
    path: &Path,
) -> (String, String) {
    let mut title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Unknown")
        .to_string();
    let mut artist = "Unknown".to_string();

    if let Some(meta) = format.metadata().current() {
        for tag in meta.tags() {
            match tag.std_key {
                Some(symphonia::core::meta::StandardTagKey::TrackTitle) => {
                    title = tag.value.to_string();
                }
                Some(symphonia::core::meta::StandardTagKey::Artist) => {
                    artist = tag.value.to_string();
                }
                _ => {}
            }
        }
    }

    (title, artist)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_io_error() {
        let loader = TrackLoader::new(48000, 2);
        let err = loader.load(Path::new("/nonexistent/sono-track.mp3"));
        assert!(matches!(err, Err(LoadError::Io(_))));
    }

    #[test]
    fn mono_spreads_to_stereo() {
        let out = adapt_channels(vec![0.1, 0.2, 0.3], 1, 2);
        assert_eq!(out, vec![0.1, 0.1, 0.2, 0.2, 0.3, 0.3]);
    }

    #[test]
    fn stereo_folds_to_mono() {
        let out = adapt_channels(vec![0.25, 0.75, -0.25, -0.75], 2, 1);
        assert_eq!(out, vec![0.5, -0.5]);
    }

    #[test]
    fn matching_layout_is_untouched() {
        let samples = vec![0.5, -0.5, 0.25, -0.25];
        assert_eq!(adapt_channels(samples.clone(), 2, 2), samples);
    }
}
