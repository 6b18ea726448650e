use super::AudioClip;

/// Millisecond range of audio `[start_ms, end_ms)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl TimeRange {
    pub fn new(start_ms: u64, end_ms: u64) -> Self {
        Self { start_ms, end_ms }
    }
}

/// Convert a dBFS level to a linear amplitude on the normalized scale
pub fn db_to_amplitude(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Running sums of squared samples per frame, summed over channels
struct EnergyIndex {
    prefix: Vec<f64>,
    channels: usize,
    sample_rate: u32,
}

impl EnergyIndex {
    fn new(clip: &AudioClip) -> Self {
        let channels = clip.channels();
        let mut prefix = Vec::with_capacity(clip.frames() + 1);
        prefix.push(0.0);
        let mut total = 0.0f64;
        for frame in clip.samples.chunks_exact(channels) {
            total += frame.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>();
            prefix.push(total);
        }
        Self {
            prefix,
            channels,
            sample_rate: clip.sample_rate(),
        }
    }

    fn frame_at(&self, ms: u64) -> usize {
        let frame = (ms as u128 * self.sample_rate as u128 / 1000) as usize;
        frame.min(self.prefix.len() - 1)
    }

    /// RMS over every sample in `[start_ms, end_ms)`
    fn rms(&self, start_ms: u64, end_ms: u64) -> f64 {
        let lo = self.frame_at(start_ms);
        let hi = self.frame_at(end_ms);
        if hi <= lo {
            return 0.0;
        }
        let count = ((hi - lo) * self.channels) as f64;
        ((self.prefix[hi] - self.prefix[lo]).max(0.0) / count).sqrt()
    }
}

/// Silent ranges at least `min_silence_ms` long, scanned with a 1 ms step
pub fn detect_silence(clip: &AudioClip, min_silence_ms: u64, threshold_dbfs: f64) -> Vec<TimeRange> {
    let length_ms = clip.duration_ms();
    if length_ms < min_silence_ms || clip.sample_rate() == 0 {
        return Vec::new();
    }

    let threshold = db_to_amplitude(threshold_dbfs);
    let index = EnergyIndex::new(clip);

    let mut ranges = Vec::new();
    let mut current: Option<(u64, u64)> = None;
    for start in 0..=(length_ms - min_silence_ms) {
        if index.rms(start, start + min_silence_ms) > threshold {
            continue;
        }
        current = match current {
            None => Some((start, start)),
            Some((range_start, prev)) => {
                let continuous = start == prev + 1;
                let has_gap = start > prev + min_silence_ms;
                if !continuous && has_gap {
                    ranges.push(TimeRange::new(range_start, prev + min_silence_ms));
                    Some((start, start))
                } else {
                    Some((range_start, start))
                }
            }
        };
    }

    if let Some((range_start, prev)) = current {
        ranges.push(TimeRange::new(range_start, prev + min_silence_ms));
    }
    ranges
}

/// Complement of `detect_silence` over the clip's duration
pub fn detect_nonsilent(clip: &AudioClip, min_silence_ms: u64, threshold_dbfs: f64) -> Vec<TimeRange> {
    let length_ms = clip.duration_ms();
    let silent = detect_silence(clip, min_silence_ms, threshold_dbfs);

    if silent.is_empty() {
        return vec![TimeRange::new(0, length_ms)];
    }
    if silent[0].start_ms == 0 && silent[0].end_ms == length_ms {
        return Vec::new();
    }

    let mut nonsilent = Vec::with_capacity(silent.len() + 1);
    let mut prev_end = 0;
    for range in &silent {
        if range.start_ms > prev_end {
            nonsilent.push(TimeRange::new(prev_end, range.start_ms));
        }
        prev_end = range.end_ms;
    }
    if prev_end < length_ms {
        nonsilent.push(TimeRange::new(prev_end, length_ms));
    }
    nonsilent
}
