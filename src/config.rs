// ECG Edge: Hardware, Signal & System Configuration
// Target: ESP32 DevKit + AD8232 single-lead ECG front-end

use crate::dsp::{DetectorConfig, FilterError, FilterForm, FilterSpec};

// ---------------------------------------------------------------------------
// GPIO Pin Definitions
// ---------------------------------------------------------------------------
pub const PIN_ECG: i32 = 34;        // AD8232 OUTPUT (ADC1 channel 6, input-only)
pub const PIN_LO_PLUS: i32 = 25;    // AD8232 LO+ (LOW while the electrode has contact)
pub const PIN_LO_MINUS: i32 = 26;   // AD8232 LO-
pub const PIN_SDN: i32 = 27;        // AD8232 shutdown, HIGH = powered
pub const PIN_BUTTON: i32 = 0;      // BOOT button (INPUT_PULLUP, active LOW)

// ---------------------------------------------------------------------------
// Signal Acquisition
// ---------------------------------------------------------------------------
pub const SAMPLING_RATE: u32 = 360;
pub const SIGNAL_LENGTH: usize = 1024;               // ~2.8 s per analysis window
pub const ADC_FULL_SCALE: u16 = 4095;                // 12-bit

// ---------------------------------------------------------------------------
// Filter Coefficients (precomputed, a[0] = 1)
// ---------------------------------------------------------------------------
pub const FILTER_ORDER: usize = 3;

// Butterworth order 3, "beat" band, Fs = 360 Hz. Non-zero DC gain (~2.65).
pub const BEAT_B: [f32; 4] = [0.18475754, -0.11728189, -0.11728189, 0.18475754];
pub const BEAT_A: [f32; 4] = [1.0, -2.22498772, 1.90591593, -0.63004815];

// Order 3 AF band, Fs = 360 Hz. Zero gain at DC.
pub const AFIB_B: [f32; 4] = [0.05193931, 0.00769507, -0.00769507, -0.05193931];
pub const AFIB_A: [f32; 4] = [1.0, -2.4834211, 2.1311083, -0.63914615];

// Biquad notch, 50 Hz mains, Q = 30, Fs = 360 Hz.
pub const NOTCH_ORDER: usize = 2;
pub const NOTCH_B: [f32; 3] = [0.98739354, -1.26936867, 0.98739354];
pub const NOTCH_A: [f32; 3] = [1.0, -1.26936867, 0.97478709];

// Butterworth band-pass, order 8, Fs = 250 Hz (bench rig). Poles sit close to
// the unit circle, so these stay in double precision.
pub const WIDE_ORDER: usize = 8;
pub const WIDE_SAMPLING_RATE: u32 = 250;
pub const WIDE_B: [f64; 9] = [
    0.0219612634, 0.0, -0.0878450537, 0.0, 0.1317675806, 0.0, -0.0878450537, 0.0, 0.0219612634,
];
pub const WIDE_A: [f64; 9] = [
    1.0, -5.4061545144, 12.7689074569, -17.4196484106, 15.1907165279, -8.7164421149, 3.1973474110,
    -0.6803537539, 0.0656274072,
];

pub const DC_BLOCKER_POLE: f32 = 0.995;

// ---------------------------------------------------------------------------
// Beat Detection
// ---------------------------------------------------------------------------
// Tuned for the beat-band output of raw 12-bit ADC counts (mid-scale 2048
// times the band's DC gain). Any other gain or filter stage needs its own.
pub const PEAK_THRESHOLD_BEAT_BAND: f32 = 2500.0;
pub const MIN_PEAK_DISTANCE_FRACTION: f32 = 0.3;     // 300 ms refractory window
pub const MAX_RR_INTERVALS: usize = 20;
pub const BPM_SMOOTHING_ALPHA: f32 = 0.3;

// ---------------------------------------------------------------------------
// Power & Button Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const INACTIVITY_TIMEOUT_MS: u32 = 60_000;       // 1 minute without signal -> sensor sleep
pub const BUTTON_POLL_INTERVAL_MS: u64 = 10;
pub const DEBOUNCE_MS: u32 = 50;
pub const WAKE_HOLD_MS: u32 = 2000;                  // hold -> wake the sensor
pub const FACTORY_RESET_HOLD_MS: u32 = 3000;         // hold -> erase NVS and restart

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes)
// ---------------------------------------------------------------------------
pub const STACK_SENSOR: usize = 8192;
pub const STACK_UI: usize = 4096;
pub const STACK_REPORT: usize = 4096;

// ---------------------------------------------------------------------------
// Filter presets
// ---------------------------------------------------------------------------

/// Named coefficient sets shipped with the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPreset {
    BeatBand,
    AfibBand,
    MainsNotch50Hz,
    WideBand250Hz,
}

impl FilterPreset {
    pub fn spec(self) -> Result<FilterSpec, FilterError> {
        match self {
            Self::BeatBand => FilterSpec::new(FILTER_ORDER, &BEAT_B, &BEAT_A),
            Self::AfibBand => FilterSpec::new(FILTER_ORDER, &AFIB_B, &AFIB_A),
            Self::MainsNotch50Hz => FilterSpec::new(NOTCH_ORDER, &NOTCH_B, &NOTCH_A),
            Self::WideBand250Hz => FilterSpec::new(WIDE_ORDER, &WIDE_B, &WIDE_A),
        }
    }

    /// Sampling rate the coefficients were designed for.
    pub fn design_rate(self) -> u32 {
        match self {
            Self::WideBand250Hz => WIDE_SAMPLING_RATE,
            _ => SAMPLING_RATE,
        }
    }
}

/// Either a shipped preset or coefficients supplied at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterSource {
    Preset(FilterPreset),
    Custom(FilterSpec),
}

impl FilterSource {
    /// Build the spec for a pipeline sampling at `sampling_rate` Hz. Presets
    /// designed for another rate are refused; custom coefficients are taken
    /// as given.
    pub fn resolve(&self, sampling_rate: u32) -> Result<FilterSpec, FilterError> {
        match self {
            Self::Preset(preset) => {
                let design_rate = preset.design_rate();
                if design_rate != sampling_rate {
                    return Err(FilterError::SamplingRateMismatch {
                        design_rate,
                        sampling_rate,
                    });
                }
                preset.spec()
            }
            Self::Custom(spec) => Ok(spec.clone()),
        }
    }
}

impl From<FilterPreset> for FilterSource {
    fn from(preset: FilterPreset) -> Self {
        Self::Preset(preset)
    }
}

impl From<FilterSpec> for FilterSource {
    fn from(spec: FilterSpec) -> Self {
        Self::Custom(spec)
    }
}

// ---------------------------------------------------------------------------
// Pipeline configuration
// ---------------------------------------------------------------------------

/// Everything the acquisition pipeline needs, owned by `DeviceState`.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub sampling_rate: u32,
    pub signal_length: usize,
    pub form: FilterForm,
    /// Pole of the DC blocker ahead of the beat band, `None` to skip it.
    pub dc_blocker_pole: Option<f32>,
    pub beat_band: FilterSource,
    pub notch: Option<FilterSource>,
    /// Second channel filled in lock-step with the beat buffer.
    pub afib_band: Option<FilterSource>,
    /// Threshold must match the beat-chain output scale.
    pub detector: DetectorConfig,
    pub bpm_smoothing: f32,
    pub inactivity_timeout_ms: u32,
    pub reset_on_lead_recovery: bool,
}

impl Default for PipelineConfig {
    /// Beat band plus AF band over raw ADC counts, threshold 2500.
    fn default() -> Self {
        Self {
            sampling_rate: SAMPLING_RATE,
            signal_length: SIGNAL_LENGTH,
            form: FilterForm::Transposed,
            dc_blocker_pole: None,
            beat_band: FilterPreset::BeatBand.into(),
            notch: None,
            afib_band: Some(FilterPreset::AfibBand.into()),
            detector: DetectorConfig::default(),
            bpm_smoothing: BPM_SMOOTHING_ALPHA,
            inactivity_timeout_ms: INACTIVITY_TIMEOUT_MS,
            reset_on_lead_recovery: true,
        }
    }
}

impl PipelineConfig {
    /// DC blocker, beat band and 50 Hz notch on a single channel.
    ///
    /// The DC blocker removes the ADC offset the default threshold relies
    /// on, so the caller states the threshold for this stage explicitly.
    pub fn dc_blocked(peak_threshold: f32) -> Self {
        Self {
            dc_blocker_pole: Some(DC_BLOCKER_POLE),
            notch: Some(FilterPreset::MainsNotch50Hz.into()),
            afib_band: None,
            detector: DetectorConfig {
                peak_threshold,
                ..DetectorConfig::default()
            },
            ..Self::default()
        }
    }

    /// Sampling period of the acquisition loop.
    pub fn sample_interval_us(&self) -> u64 {
        1_000_000 / u64::from(self.sampling_rate.max(1))
    }
}
