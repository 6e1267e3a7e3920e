// ECG Edge: System Events & Data Types

use crate::dsp::DetectionResult;

// ---------------------------------------------------------------------------
// Device status (shown to the user by the display/BLE collaborators)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceStatus {
    #[default]
    Initializing,
    Sleeping,
    WakingUp,
    Measuring,
    LeadOff,
}

impl DeviceStatus {
    /// Short label for the status line.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing...",
            Self::Sleeping     => "Sleeping",
            Self::WakingUp     => "Waking up!",
            Self::Measuring    => "Measuring",
            Self::LeadOff      => "Leads off",
        }
    }
}

// ---------------------------------------------------------------------------
// Commands into the sampling loop (single-owner queue)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorCommand {
    /// Power the front-end and restart acquisition with clean filter state.
    Wake,
    /// Shut the front-end down.
    Sleep,
    /// User interaction; restarts the inactivity timer.
    Touch,
}

// ---------------------------------------------------------------------------
// Events out of the sampling loop, consumed by the reporting collaborator
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub result: DetectionResult,
    /// BPM averaged across windows; holds its last value through empty windows.
    pub smoothed_bpm: f32,
    /// Non-finite filter outputs seen in the window.
    pub non_finite: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportEvent {
    Reading(Reading),
    StatusChanged(DeviceStatus),
}

// ---------------------------------------------------------------------------
// Button events
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    /// Debounced press edge.
    Pressed,
    /// Held past the wake threshold.
    MediumHold,
    /// Held past the factory-reset threshold.
    LongHold,
    /// Released after at least a medium hold.
    Released { held_ms: u32 },
    /// Released before any hold threshold.
    Cancelled { held_ms: u32 },
}
