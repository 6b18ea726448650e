//! Stationary spectral gate
//!
//! A noise profile is estimated per frequency bin from the quietest frames of
//! the signal. Bins that do not rise `NOISE_STD_THRESHOLD` standard deviations
//! above that profile are gated. Smoothing the mask in frequency and time
//! lets gated bins next to open ones through partially, while open bins keep
//! full gain. The signal is rebuilt by weighted overlap-add.

use rustfft::{num_complex::Complex, FftPlanner};

/// FFT window size
pub const N_FFT: usize = 1024;

/// Hop length between frames (75% overlap)
pub const HOP_LENGTH: usize = N_FFT / 4;

const NUM_FREQ_BINS: usize = N_FFT / 2 + 1;

/// Share of the quietest frames used as the noise profile
const NOISE_PROFILE_QUANTILE: f64 = 0.2;

/// Standard deviations above the noise mean a bin needs to pass the gate
const NOISE_STD_THRESHOLD: f32 = 1.5;

const MASK_SMOOTH_HZ: f32 = 500.0;
const MASK_SMOOTH_MS: f32 = 50.0;

/// Magnitude floor keeping the dB conversion finite (-200 dB)
const MAGNITUDE_FLOOR: f32 = 1e-10;

/// Gate stationary noise out of one channel. Output length equals input length.
pub fn spectral_gate(samples: &[f32], sample_rate: u32) -> Vec<f32> {
    if samples.len() < N_FFT || sample_rate == 0 {
        return samples.to_vec();
    }

    // Center frames so both ends are covered by full overlap
    let pad = N_FFT / 2;
    let mut padded = vec![0.0f32; samples.len() + 2 * pad];
    padded[pad..pad + samples.len()].copy_from_slice(samples);

    let window = hann_window(N_FFT);
    let mut spectrogram = stft(&padded, &window);
    if spectrogram.is_empty() {
        return samples.to_vec();
    }

    let db: Vec<Vec<f32>> = spectrogram
        .iter()
        .map(|frame| frame.iter().map(|c| 20.0 * c.norm().max(MAGNITUDE_FLOOR).log10()).collect())
        .collect();

    let thresholds = noise_thresholds(&spectrogram, &db);
    let mut mask: Vec<Vec<f32>> = db
        .iter()
        .map(|frame| {
            frame
                .iter()
                .zip(&thresholds)
                .map(|(&value, &threshold)| if value > threshold { 1.0 } else { 0.0 })
                .collect()
        })
        .collect();

    let bin_hz = sample_rate as f32 / N_FFT as f32;
    let hop_ms = HOP_LENGTH as f32 * 1000.0 / sample_rate as f32;
    let freq_radius = (MASK_SMOOTH_HZ / bin_hz).round() as usize;
    let time_radius = (MASK_SMOOTH_MS / hop_ms).round() as usize;
    smooth_mask(&mut mask, freq_radius, time_radius);

    for (frame, gains) in spectrogram.iter_mut().zip(&mask) {
        for (bin, &gain) in frame.iter_mut().zip(gains) {
            *bin *= gain;
        }
    }

    let rebuilt = istft(&spectrogram, &window, padded.len());
    rebuilt[pad..pad + samples.len()].to_vec()
}

/// Per-bin gate level from the lowest-energy frames
fn noise_thresholds(spectrogram: &[Vec<Complex<f32>>], db: &[Vec<f32>]) -> Vec<f32> {
    let mut energies: Vec<(usize, f32)> = spectrogram
        .iter()
        .enumerate()
        .map(|(i, frame)| (i, frame.iter().map(|c| c.norm_sqr()).sum()))
        .collect();
    energies.sort_by(|a, b| a.1.total_cmp(&b.1));

    let count = ((energies.len() as f64 * NOISE_PROFILE_QUANTILE).ceil() as usize).max(1);
    let quiet: Vec<usize> = energies.iter().take(count).map(|(i, _)| *i).collect();

    (0..NUM_FREQ_BINS)
        .map(|bin| {
            let mean = quiet.iter().map(|&f| db[f][bin]).sum::<f32>() / count as f32;
            let variance = quiet
                .iter()
                .map(|&f| {
                    let diff = db[f][bin] - mean;
                    diff * diff
                })
                .sum::<f32>()
                / count as f32;
            mean + NOISE_STD_THRESHOLD * variance.sqrt()
        })
        .collect()
}

/// Separable moving average over frequency then time, never lowering a gain
fn smooth_mask(mask: &mut [Vec<f32>], freq_radius: usize, time_radius: usize) {
    if freq_radius > 0 {
        for frame in mask.iter_mut() {
            let smoothed = moving_average(frame, freq_radius);
            for (gain, soft) in frame.iter_mut().zip(smoothed) {
                *gain = gain.max(soft);
            }
        }
    }

    if time_radius > 0 && !mask.is_empty() {
        for bin in 0..NUM_FREQ_BINS {
            let column: Vec<f32> = mask.iter().map(|frame| frame[bin]).collect();
            for (frame, soft) in mask.iter_mut().zip(moving_average(&column, time_radius)) {
                frame[bin] = frame[bin].max(soft);
            }
        }
    }
}

fn moving_average(values: &[f32], radius: usize) -> Vec<f32> {
    let mut prefix = Vec::with_capacity(values.len() + 1);
    prefix.push(0.0f64);
    for &v in values {
        let last = *prefix.last().unwrap_or(&0.0);
        prefix.push(last + v as f64);
    }

    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius + 1).min(values.len());
            ((prefix[hi] - prefix[lo]) / (hi - lo) as f64) as f32
        })
        .collect()
}

fn stft(samples: &[f32], window: &[f32]) -> Vec<Vec<Complex<f32>>> {
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(N_FFT);

    let num_frames = (samples.len().saturating_sub(N_FFT)) / HOP_LENGTH + 1;
    let mut spectrogram = Vec::with_capacity(num_frames);

    for frame_idx in 0..num_frames {
        let start = frame_idx * HOP_LENGTH;
        let mut buffer: Vec<Complex<f32>> = window
            .iter()
            .enumerate()
            .map(|(i, &w)| Complex::new(samples.get(start + i).copied().unwrap_or(0.0) * w, 0.0))
            .collect();

        fft.process(&mut buffer);
        buffer.truncate(NUM_FREQ_BINS);
        spectrogram.push(buffer);
    }

    spectrogram
}

fn istft(spectrogram: &[Vec<Complex<f32>>], window: &[f32], output_length: usize) -> Vec<f32> {
    let mut planner = FftPlanner::new();
    let ifft = planner.plan_fft_inverse(N_FFT);

    let mut output = vec![0.0f32; output_length];
    let mut window_sum = vec![0.0f32; output_length];
    let scale = 1.0 / N_FFT as f32;

    for (frame_idx, frame) in spectrogram.iter().enumerate() {
        let start = frame_idx * HOP_LENGTH;

        let mut buffer = vec![Complex::new(0.0f32, 0.0); N_FFT];
        buffer[..NUM_FREQ_BINS].copy_from_slice(frame);
        for i in 1..NUM_FREQ_BINS - 1 {
            buffer[N_FFT - i] = frame[i].conj();
        }

        ifft.process(&mut buffer);

        for (i, &w) in window.iter().enumerate() {
            if start + i < output_length {
                output[start + i] += buffer[i].re * scale * w;
                window_sum[start + i] += w * w;
            }
        }
    }

    for (sample, &ws) in output.iter_mut().zip(&window_sum) {
        if ws > 1e-8 {
            *sample /= ws;
        }
    }

    output
}

fn hann_window(size: usize) -> Vec<f32> {
    use std::f32::consts::PI;
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
        .collect()
}
