// ECG Edge: Beat Detector
//
// Threshold peak picker over one full buffer of filtered samples. Produces a
// heart-rate estimate and SDNN from the RR intervals between accepted peaks.
// Not diagnostic grade: there is no adaptive threshold and no search-back.

use crate::config::{MAX_RR_INTERVALS, MIN_PEAK_DISTANCE_FRACTION, PEAK_THRESHOLD_BEAT_BAND};

/// Peak-picker tuning. The threshold is in the units of the buffer being
/// analysed, so it belongs to a specific gain/filter stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    /// Minimum sample value for a local maximum to count as a beat.
    pub peak_threshold: f32,
    /// Refractory window after a beat, as a fraction of one second.
    pub min_peak_distance_fraction: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            peak_threshold: PEAK_THRESHOLD_BEAT_BAND,
            min_peak_distance_fraction: MIN_PEAK_DISTANCE_FRACTION,
        }
    }
}

/// Outcome of one buffer analysis.
///
/// `bpm == 0` and `hrv == 0.0` mean fewer than two RR intervals were found.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DetectionResult {
    pub bpm: u32,
    /// Sample standard deviation of the RR intervals, in milliseconds.
    pub hrv: f32,
    /// Accepted peaks in the buffer.
    pub peaks: u32,
    /// Intervals found after the RR sequence was already full.
    pub dropped_intervals: u32,
}

impl DetectionResult {
    pub fn is_informative(&self) -> bool {
        self.bpm > 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct BeatDetector {
    config: DetectorConfig,
}

impl BeatDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Refractory window in samples: `floor(fs * fraction)`.
    pub fn min_peak_distance(&self, sampling_rate: u32) -> usize {
        (sampling_rate as f32 * self.config.min_peak_distance_fraction).floor() as usize
    }

    /// Analyse one buffer sampled at `sampling_rate` Hz. Never fails:
    /// degenerate input yields a result with `bpm == 0`.
    pub fn analyze(&self, signal: &[f32], sampling_rate: u32) -> DetectionResult {
        let mut result = DetectionResult::default();
        if sampling_rate == 0 || signal.len() < 3 {
            return result;
        }

        let threshold = self.config.peak_threshold;
        let min_distance = self.min_peak_distance(sampling_rate);
        let last_index = signal.len() - 1;

        let mut intervals = [0u32; MAX_RR_INTERVALS];
        let mut count = 0usize;
        let mut last_peak: Option<usize> = None;

        let mut i = 1;
        while i < last_index {
            let s = signal[i];
            let is_candidate = s > threshold && s > signal[i - 1] && s > signal[i + 1];
            let outside_refractory = last_peak.map_or(true, |p| i - p > min_distance);

            if is_candidate && outside_refractory {
                if let Some(p) = last_peak {
                    if count < MAX_RR_INTERVALS {
                        intervals[count] = (i - p) as u32;
                        count += 1;
                    } else {
                        result.dropped_intervals += 1;
                    }
                }
                last_peak = Some(i);
                result.peaks += 1;
                // Skip the rest of this QRS complex.
                i = i.saturating_add(min_distance + 1).min(last_index);
                continue;
            }
            i += 1;
        }

        if result.dropped_intervals > 0 {
            log::debug!(
                "RR sequence full: kept {}, dropped {} intervals",
                MAX_RR_INTERVALS,
                result.dropped_intervals
            );
        }

        if count < 2 {
            return result;
        }

        let intervals = &intervals[..count];
        let fs = f64::from(sampling_rate);
        let mean_samples = intervals.iter().map(|&v| f64::from(v)).sum::<f64>() / count as f64;
        result.bpm = (60.0 * fs / mean_samples).round() as u32;

        let to_ms = |samples: f64| samples * 1000.0 / fs;
        let mean_ms = to_ms(mean_samples);
        let sum_sq: f64 = intervals
            .iter()
            .map(|&v| (to_ms(f64::from(v)) - mean_ms).powi(2))
            .sum();
        result.hrv = (sum_sq / (count - 1) as f64).sqrt() as f32;

        result
    }
}
