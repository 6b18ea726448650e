use super::AudioClip;

/// Single-pole RC low-pass filter applied to each channel independently
pub fn low_pass(clip: &AudioClip, cutoff_hz: f64) -> AudioClip {
    let channels = clip.channels();
    if clip.samples.len() < channels || clip.sample_rate() == 0 {
        return clip.clone();
    }

    let rc = 1.0 / (cutoff_hz * 2.0 * std::f64::consts::PI);
    let dt = 1.0 / clip.sample_rate() as f64;
    let alpha = (dt / (rc + dt)) as f32;

    let mut filtered = clip.samples.clone();
    for i in channels..filtered.len() {
        let last = filtered[i - channels];
        filtered[i] = last + alpha * (clip.samples[i] - last);
    }

    AudioClip::new(filtered, clip.spec)
}
