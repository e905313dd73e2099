//! Audio file I/O for Beatstack
//!
//! Songs are read from WAV and kept as a single mono f32 channel at their
//! native sample rate. Playback sources are rendered back to 32-bit float WAV
//! so the audio output can load them by path.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::{BeatstackError, Result};

/// Decoded mono audio
#[derive(Debug, Clone, PartialEq)]
pub struct MonoAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl MonoAudio {
    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        crate::engine::time::duration_secs(self.samples.len(), self.sample_rate)
    }
}

/// Read a WAV file and down-mix it to mono
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `InvalidAudio` - If the file is not a readable WAV file
/// * `EmptyAudio` - If the file holds no samples
pub fn import_wav(path: &Path) -> Result<MonoAudio> {
    if !path.exists() {
        return Err(BeatstackError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let reader = WavReader::open(path).map_err(|e| BeatstackError::InvalidAudio {
        reason: format!("Failed to open WAV file {}: {}", path.display(), e),
    })?;

    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;
    let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;

    if interleaved.is_empty() {
        return Err(BeatstackError::EmptyAudio);
    }

    Ok(MonoAudio {
        samples: downmix(&interleaved, channels),
        sample_rate: spec.sample_rate,
    })
}

/// Write mono samples as a 32-bit float WAV file
pub fn export_wav(samples: &[f32], sample_rate: u32, path: &Path) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec).map_err(|e| wav_write_error(path, e))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| wav_write_error(path, e))?;
    }
    writer.finalize().map_err(|e| wav_write_error(path, e))?;

    Ok(())
}

/// Generate a mono sine wave, used for demo projects and tests
pub fn generate_test_tone(frequency: f32, duration_secs: f32, sample_rate: u32) -> MonoAudio {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;

    MonoAudio {
        samples: (0..num_samples)
            .map(|i| (angular_freq * i as f32).sin())
            .collect(),
        sample_rate,
    }
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn wav_write_error(path: &Path, e: hound::Error) -> BeatstackError {
    BeatstackError::FileWriteError {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
    }
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let invalid = |e: hound::Error| BeatstackError::InvalidAudio {
        reason: format!("Failed to read {}-bit samples: {}", bits_per_sample, e),
    };

    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(invalid),
        SampleFormat::Int => {
            let scale = match bits_per_sample {
                8 => 128.0,
                16 => 32768.0,
                24 => 8388608.0,
                32 => 2147483648.0,
                other => {
                    return Err(BeatstackError::InvalidAudio {
                        reason: format!("{}-bit integer audio is not supported", other),
                    })
                }
            };
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(invalid)
        }
    }
}

/// Average interleaved channels into one
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}
