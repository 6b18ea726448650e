//! Vocal cleaning and lead-in detection
//!
//! The isolated vocal stem is low-pass filtered, run through a spectral noise
//! gate and scanned for the first non-silent region. The cleaned signal only
//! serves silence detection; transcription reads the untouched stem.

pub mod denoise;
pub mod filter;
pub mod silence;

use std::path::Path;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::{debug, info};

use crate::error::{Result, KaraokeError};

/// Low-pass cutoff applied before noise reduction
pub const LOW_PASS_CUTOFF_HZ: f64 = 3000.0;

/// Shortest silence that separates two non-silent regions
pub const MIN_SILENCE_MS: u64 = 300;

/// Loudness below which a window counts as silent
pub const SILENCE_THRESHOLD_DBFS: f64 = -40.0;

/// Interleaved audio normalized to [-1, 1] together with its WAV layout
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub spec: WavSpec,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, spec: WavSpec) -> Self {
        Self { samples, spec }
    }

    pub fn channels(&self) -> usize {
        self.spec.channels.max(1) as usize
    }

    pub fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels()
    }

    /// Duration in whole milliseconds, rounded
    pub fn duration_ms(&self) -> u64 {
        if self.spec.sample_rate == 0 {
            return 0;
        }
        (self.frames() as f64 * 1000.0 / self.spec.sample_rate as f64).round() as u64
    }

    /// Split interleaved samples into one buffer per channel
    pub fn deinterleave(&self) -> Vec<Vec<f32>> {
        let channels = self.channels();
        let mut planes = vec![Vec::with_capacity(self.frames()); channels];
        for frame in self.samples.chunks_exact(channels) {
            for (plane, &sample) in planes.iter_mut().zip(frame) {
                plane.push(sample);
            }
        }
        planes
    }

    /// Rebuild a clip with this clip's layout from per-channel buffers
    pub fn from_planes(planes: &[Vec<f32>], spec: WavSpec) -> Self {
        let frames = planes.iter().map(Vec::len).min().unwrap_or(0);
        let mut samples = Vec::with_capacity(frames * planes.len());
        for i in 0..frames {
            for plane in planes {
                samples.push(plane[i]);
            }
        }
        Self { samples, spec }
    }

    /// Round every sample to the precision of the clip's bit depth
    pub fn quantize(&mut self) {
        if self.spec.sample_format == SampleFormat::Float {
            return;
        }
        let scale = integer_scale(self.spec.bits_per_sample);
        for sample in &mut self.samples {
            *sample = ((*sample as f64 * scale).round().clamp(-scale, scale - 1.0) / scale) as f32;
        }
    }

    pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        KaraokeError::require_file(path)?;

        let mut reader = WavReader::open(path)?;
        let spec = reader.spec();
        let samples = match spec.sample_format {
            SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<Vec<_>, _>>()?,
            SampleFormat::Int => {
                let scale = integer_scale(spec.bits_per_sample);
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| (v as f64 / scale) as f32))
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        debug!(
            "Decoded {}: {} Hz, {} channels, {} bit, {} samples",
            path.display(),
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample,
            samples.len()
        );

        Ok(Self { samples, spec })
    }

    pub fn write_wav<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = WavWriter::create(path, self.spec)?;
        match self.spec.sample_format {
            SampleFormat::Float => {
                for &sample in &self.samples {
                    writer.write_sample(sample)?;
                }
            }
            SampleFormat::Int => {
                let scale = integer_scale(self.spec.bits_per_sample);
                for &sample in &self.samples {
                    let value = (sample as f64 * scale).round().clamp(-scale, scale - 1.0) as i32;
                    writer.write_sample(value)?;
                }
            }
        }
        writer.finalize()?;
        Ok(())
    }
}

fn integer_scale(bits_per_sample: u16) -> f64 {
    (1u64 << (bits_per_sample.clamp(8, 32) - 1)) as f64
}

/// Cleaned vocal signal and the start of its first non-silent region
#[derive(Debug, Clone)]
pub struct CleanedVocals {
    pub clip: AudioClip,
    /// Seconds before vocals begin; 0.0 when no non-silent region exists
    pub lead_in: f64,
}

/// Low-pass and denoise `clip`, keeping its rate, width and channel count
pub fn clean(clip: &AudioClip) -> AudioClip {
    let filtered = filter::low_pass(clip, LOW_PASS_CUTOFF_HZ);
    let planes: Vec<Vec<f32>> = filtered
        .deinterleave()
        .iter()
        .map(|plane| denoise::spectral_gate(plane, filtered.sample_rate()))
        .collect();

    let mut cleaned = AudioClip::from_planes(&planes, filtered.spec);
    cleaned.quantize();
    cleaned
}

/// Lead-in of an already cleaned clip
pub fn find_lead_in(clip: &AudioClip) -> f64 {
    silence::detect_nonsilent(clip, MIN_SILENCE_MS, SILENCE_THRESHOLD_DBFS)
        .first()
        .map(|range| range.start_ms as f64 / 1000.0)
        .unwrap_or(0.0)
}

/// Decode the vocal stem, clean it and locate where singing starts
pub fn clean_and_find_lead_in<P: AsRef<Path>>(vocals_path: P) -> Result<CleanedVocals> {
    let vocals_path = vocals_path.as_ref();
    info!("Cleaning vocals from {}", vocals_path.display());

    let clip = AudioClip::read_wav(vocals_path)?;
    let cleaned = clean(&clip);
    let lead_in = find_lead_in(&cleaned);

    info!("Vocals start at {:.3}s", lead_in);
    Ok(CleanedVocals { clip: cleaned, lead_in })
}
