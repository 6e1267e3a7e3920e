//! Signal conditioning and device logic for a single-lead wearable ECG.
//!
//! Raw AD8232 samples run through an optional DC blocker, a band-pass
//! [`dsp::RecursiveFilter`] and an optional mains notch into a fixed window;
//! every full window is scanned by [`dsp::BeatDetector`] for heart rate and RR variability.
//! [`device::DeviceState`] owns the whole pipeline and is driven by the
//! sampling loop in [`tasks::sensor`].

pub mod buffer;
pub mod config;
pub mod device;
#[cfg(target_os = "espidf")]
pub mod drivers;
pub mod dsp;
pub mod events;
pub mod input;
pub mod power;
pub mod tasks;
