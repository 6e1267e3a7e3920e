// ECG Edge: Device State
//
// Single owner of everything the acquisition path mutates: signal chains,
// sample buffers, detector, lead and power state, status label. The sampling
// loop holds it by value; nothing else touches it, so filter state never
// needs a lock.

use crate::buffer::SampleBuffer;
use crate::config::PipelineConfig;
use crate::dsp::{
    BeatDetector, DcBlocker, DetectionResult, DigitalFilter, Ema, FilterError, FilterSpec, RecursiveFilter,
};
use crate::events::{DeviceStatus, Reading};
use crate::power::{InactivityMonitor, SensorPower};

// ---------------------------------------------------------------------------
// Signal chain
// ---------------------------------------------------------------------------

/// `[DC blocker] -> band-pass -> [notch]`, reset as one unit.
#[derive(Debug, Clone)]
pub struct SignalChain {
    dc_blocker: Option<DcBlocker>,
    band: RecursiveFilter,
    notch: Option<RecursiveFilter>,
}

impl SignalChain {
    pub fn new(dc_blocker: Option<DcBlocker>, band: RecursiveFilter, notch: Option<RecursiveFilter>) -> Self {
        Self { dc_blocker, band, notch }
    }

    /// True when every stage has zeroed state.
    pub fn is_at_rest(&self) -> bool {
        self.dc_blocker.as_ref().map_or(true, DcBlocker::is_at_rest)
            && self.band.is_at_rest()
            && self.notch.as_ref().map_or(true, RecursiveFilter::is_at_rest)
    }
}

impl DigitalFilter for SignalChain {
    fn update(&mut self, sample: f32) -> f32 {
        let mut value = sample;
        if let Some(dc) = &mut self.dc_blocker {
            value = dc.update(value);
        }
        value = self.band.update(value);
        if let Some(notch) = &mut self.notch {
            value = notch.update(value);
        }
        value
    }

    fn reset(&mut self) {
        if let Some(dc) = &mut self.dc_blocker {
            dc.reset();
        }
        self.band.reset();
        if let Some(notch) = &mut self.notch {
            notch.reset();
        }
    }
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

/// A full analysis window, handed out once per buffer fill. The slices stay
/// valid until the next call into `DeviceState`.
#[derive(Debug, Clone, Copy)]
pub struct Capture<'a> {
    pub result: DetectionResult,
    pub smoothed_bpm: f32,
    pub non_finite: u32,
    pub beat: &'a [f32],
    pub afib: Option<&'a [f32]>,
}

impl Capture<'_> {
    pub fn reading(&self) -> Reading {
        Reading {
            result: self.result,
            smoothed_bpm: self.smoothed_bpm,
            non_finite: self.non_finite,
        }
    }
}

// ---------------------------------------------------------------------------
// DeviceState
// ---------------------------------------------------------------------------

pub struct DeviceState {
    sampling_rate: u32,
    beat_chain: SignalChain,
    afib_filter: Option<RecursiveFilter>,
    beat_buffer: SampleBuffer,
    afib_buffer: Option<SampleBuffer>,
    detector: BeatDetector,
    bpm_smoother: Ema,
    inactivity: InactivityMonitor,
    reset_on_lead_recovery: bool,

    power: SensorPower,
    leads_attached: bool,
    non_finite: u32,
    status: DeviceStatus,
}

impl DeviceState {
    /// Build the pipeline. The sensor starts asleep.
    pub fn new(config: &PipelineConfig) -> Result<Self, FilterError> {
        let build = |spec: FilterSpec| RecursiveFilter::new(spec, config.form);

        let dc_blocker = config.dc_blocker_pole.map(DcBlocker::new).transpose()?;
        let rate = config.sampling_rate;
        let band = build(config.beat_band.resolve(rate)?);
        let notch = config.notch.as_ref().map(|s| s.resolve(rate).map(build)).transpose()?;
        let afib_filter = config.afib_band.as_ref().map(|s| s.resolve(rate).map(build)).transpose()?;
        let afib_buffer = afib_filter
            .as_ref()
            .map(|_| SampleBuffer::with_capacity(config.signal_length));

        log::info!(
            "Pipeline: {} Hz, {} samples/window, band order {}{}{}{} ({:?})",
            config.sampling_rate,
            config.signal_length,
            band.spec().order(),
            if dc_blocker.is_some() { ", DC blocker" } else { "" },
            if notch.is_some() { ", notch" } else { "" },
            if afib_filter.is_some() { ", AF channel" } else { "" },
            config.form,
        );

        Ok(Self {
            sampling_rate: config.sampling_rate,
            beat_chain: SignalChain::new(dc_blocker, band, notch),
            afib_filter,
            beat_buffer: SampleBuffer::with_capacity(config.signal_length),
            afib_buffer,
            detector: BeatDetector::new(config.detector),
            bpm_smoother: Ema::new(config.bpm_smoothing)?,
            inactivity: InactivityMonitor::new(config.inactivity_timeout_ms, 0),
            reset_on_lead_recovery: config.reset_on_lead_recovery,
            power: SensorPower::Asleep,
            leads_attached: true,
            non_finite: 0,
            status: DeviceStatus::Initializing,
        })
    }

    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    pub fn is_sensor_active(&self) -> bool {
        self.power == SensorPower::Active
    }

    pub fn leads_attached(&self) -> bool {
        self.leads_attached
    }

    pub fn beat_chain(&self) -> &SignalChain {
        &self.beat_chain
    }

    /// Samples collected in the current window.
    pub fn buffered(&self) -> usize {
        if self.beat_buffer.is_full() {
            0
        } else {
            self.beat_buffer.len()
        }
    }

    /// Power up acquisition with clean filter state. No-op when already active.
    pub fn wake(&mut self, now_ms: u32) {
        if self.is_sensor_active() {
            return;
        }
        log::info!("[POWER] Sensor activated");
        self.power = SensorPower::Active;
        self.leads_attached = true;
        self.restart_capture();
        self.bpm_smoother.reset();
        self.inactivity.touch(now_ms);
        self.status = DeviceStatus::WakingUp;
    }

    /// Stop acquisition. No-op when already asleep.
    pub fn sleep(&mut self) {
        if !self.is_sensor_active() {
            return;
        }
        log::info!("[POWER] Sensor deactivated to save power");
        self.power = SensorPower::Asleep;
        self.status = DeviceStatus::Sleeping;
    }

    /// Restart the inactivity timer.
    pub fn touch(&mut self, now_ms: u32) {
        self.inactivity.touch(now_ms);
    }

    /// Put the sensor to sleep once no activity has been seen for the
    /// configured timeout. Returns `true` when it did.
    pub fn check_inactivity(&mut self, now_ms: u32) -> bool {
        if !self.is_sensor_active() || !self.inactivity.is_expired(now_ms) {
            return false;
        }
        log::info!(
            "[POWER] No activity for {} ms, entering sensor sleep",
            self.inactivity.timeout_ms()
        );
        self.sleep();
        true
    }

    /// Run one raw sample through the pipeline.
    ///
    /// Returns a [`Capture`] when this sample completed a window. Samples are
    /// ignored while asleep and discarded while the leads are off.
    pub fn process_sample(&mut self, raw: f32, leads_attached: bool, now_ms: u32) -> Option<Capture<'_>> {
        if !self.is_sensor_active() {
            return None;
        }

        if !leads_attached {
            if self.leads_attached {
                log::warn!("ECG leads off, discarding samples");
                self.leads_attached = false;
                self.status = DeviceStatus::LeadOff;
            }
            return None;
        }

        if !self.leads_attached {
            log::info!("ECG leads reattached");
            self.leads_attached = true;
            if self.reset_on_lead_recovery {
                self.restart_capture();
            }
        }
        self.status = DeviceStatus::Measuring;
        self.inactivity.touch(now_ms);

        // Previous window was handed out; start the next one.
        if self.beat_buffer.is_full() {
            self.clear_buffers();
        }

        let beat = self.beat_chain.update(raw);
        if !beat.is_finite() {
            self.non_finite += 1;
        }
        let stored = self.beat_buffer.push(beat);
        debug_assert!(stored, "beat window overflow");

        if let (Some(filter), Some(buffer)) = (&mut self.afib_filter, &mut self.afib_buffer) {
            let afib = filter.update(raw);
            if !afib.is_finite() {
                self.non_finite += 1;
            }
            let stored = buffer.push(afib);
            debug_assert!(stored, "AF window overflow");
        }

        if !self.beat_buffer.is_full() {
            return None;
        }

        let result = self.detector.analyze(self.beat_buffer.as_slice(), self.sampling_rate);
        let smoothed_bpm = if result.is_informative() {
            self.bpm_smoother.update(result.bpm as f32)
        } else {
            self.bpm_smoother.value().unwrap_or(0.0)
        };

        if self.non_finite > 0 {
            log::warn!(
                "{} non-finite filter outputs in this window, check the filter coefficients",
                self.non_finite
            );
        }
        log::debug!(
            "Window complete: bpm={} hrv={:.1} ms peaks={} dropped={}",
            result.bpm,
            result.hrv,
            result.peaks,
            result.dropped_intervals
        );

        Some(Capture {
            result,
            smoothed_bpm,
            non_finite: self.non_finite,
            beat: self.beat_buffer.as_slice(),
            afib: self.afib_buffer.as_ref().map(SampleBuffer::as_slice),
        })
    }

    fn restart_capture(&mut self) {
        self.beat_chain.reset();
        if let Some(filter) = &mut self.afib_filter {
            filter.reset();
        }
        self.clear_buffers();
    }

    fn clear_buffers(&mut self) {
        self.beat_buffer.clear();
        if let Some(buffer) = &mut self.afib_buffer {
            buffer.clear();
        }
        self.non_finite = 0;
    }
}
