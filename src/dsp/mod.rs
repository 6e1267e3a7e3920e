//! Signal-conditioning core: recursive filters, small numeric helpers and
//! the batch beat detector.

pub mod beat;
pub mod filter;
pub mod smoothing;

pub use beat::{BeatDetector, DetectionResult, DetectorConfig};
pub use filter::{DigitalFilter, FilterError, FilterForm, FilterSpec, RecursiveFilter};
pub use smoothing::{DcBlocker, Ema};
