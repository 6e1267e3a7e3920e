// ECG Edge: Small Numeric Utilities
//
// DC blocker (first-order high-pass) and exponential moving average. Both
// carry a couple of registers and share the `DigitalFilter` interface so a
// signal chain can reset them together with the IIR sections.

use super::filter::{DigitalFilter, FilterError};

/// `y[n] = x[n] - x[n-1] + R * y[n-1]`
///
/// Removes the ADC mid-scale offset and slow baseline wander before the
/// beat-band section. The closer `R` is to 1, the lower the corner frequency.
#[derive(Debug, Clone)]
pub struct DcBlocker {
    pole: f32,
    x_prev: f32,
    y_prev: f32,
}

impl DcBlocker {
    pub fn new(pole: f32) -> Result<Self, FilterError> {
        if !(0.0..1.0).contains(&pole) {
            return Err(FilterError::InvalidPole(pole));
        }
        Ok(Self {
            pole,
            x_prev: 0.0,
            y_prev: 0.0,
        })
    }

    /// True when both registers are zero.
    pub fn is_at_rest(&self) -> bool {
        self.x_prev == 0.0 && self.y_prev == 0.0
    }
}

impl DigitalFilter for DcBlocker {
    fn update(&mut self, sample: f32) -> f32 {
        let output = sample - self.x_prev + self.pole * self.y_prev;
        self.x_prev = sample;
        self.y_prev = output;
        output
    }

    fn reset(&mut self) {
        self.x_prev = 0.0;
        self.y_prev = 0.0;
    }
}

/// Exponential moving average. The first sample seeds the average.
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f32,
    value: Option<f32>,
}

impl Ema {
    pub fn new(alpha: f32) -> Result<Self, FilterError> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(FilterError::InvalidSmoothing(alpha));
        }
        Ok(Self { alpha, value: None })
    }

    /// Current average, `None` before the first sample.
    pub fn value(&self) -> Option<f32> {
        self.value
    }
}

impl DigitalFilter for Ema {
    fn update(&mut self, sample: f32) -> f32 {
        let next = match self.value {
            Some(prev) => self.alpha * sample + (1.0 - self.alpha) * prev,
            None => sample,
        };
        self.value = Some(next);
        next
    }

    fn reset(&mut self) {
        self.value = None;
    }
}
