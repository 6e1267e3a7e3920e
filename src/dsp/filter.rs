// ECG Edge: Recursive (IIR) Filters
//
// Fixed-coefficient filters realising H(z) = B(z) / A(z) in one of two forms:
//
//   * Direct-Form-II-Transposed: a single delay line of `order` registers.
//     Used for the production beat-band, AF-band and notch sections.
//   * Direct form: input and output shift registers of `order + 1` entries.
//     Reads exactly like the textbook difference equation, so it serves as
//     the reference the transposed form is checked against.
//
// Samples and outputs are `f32`; coefficients, state and accumulation are
// `f64`. `update` never allocates.

use thiserror::Error;

/// Configuration errors raised while building a filter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("filter order must be at least 1, got {0}")]
    InvalidOrder(usize),

    #[error("order {order} needs {expected} `{which}` coefficients, got {actual}")]
    CoefficientCount {
        which: &'static str,
        order: usize,
        expected: usize,
        actual: usize,
    },

    #[error("leading denominator coefficient a[0] is zero")]
    ZeroLeadingDenominator,

    #[error("coefficient {which}[{index}] is not finite ({value})")]
    NonFiniteCoefficient {
        which: &'static str,
        index: usize,
        value: f64,
    },

    #[error("DC blocker pole must lie in [0, 1), got {0}")]
    InvalidPole(f32),

    #[error("smoothing factor must lie in (0, 1], got {0}")]
    InvalidSmoothing(f32),

    #[error("coefficients designed for {design_rate} Hz, pipeline samples at {sampling_rate} Hz")]
    SamplingRateMismatch { design_rate: u32, sampling_rate: u32 },
}

// ---------------------------------------------------------------------------
// DigitalFilter capability
// ---------------------------------------------------------------------------

/// A sample-by-sample filter with resettable state.
pub trait DigitalFilter {
    /// Feed one sample and return the filtered value.
    fn update(&mut self, sample: f32) -> f32;

    /// Return every state register to zero.
    fn reset(&mut self);

    /// Filter `input` into `output`, stopping at the shorter of the two.
    fn process(&mut self, input: &[f32], output: &mut [f32]) {
        for (x, y) in input.iter().zip(output.iter_mut()) {
            *y = self.update(*x);
        }
    }
}

// ---------------------------------------------------------------------------
// FilterSpec
// ---------------------------------------------------------------------------

/// Immutable filter definition: order and normalised `b`/`a` coefficients.
///
/// Coefficients are divided through by `a[0]` on construction, so `a()[0]`
/// is always `1.0`. Only the first `order + 1` entries of each input vector
/// are used.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    order: usize,
    b: Box<[f64]>,
    a: Box<[f64]>,
}

impl FilterSpec {
    pub fn new<T: Copy + Into<f64>>(order: usize, b: &[T], a: &[T]) -> Result<Self, FilterError> {
        if order < 1 {
            return Err(FilterError::InvalidOrder(order));
        }

        let taps = order + 1;
        let b = collect_coefficients("b", order, b)?;
        let a = collect_coefficients("a", order, a)?;
        debug_assert_eq!(b.len(), taps);

        let a0 = a[0];
        if a0 == 0.0 {
            return Err(FilterError::ZeroLeadingDenominator);
        }

        Ok(Self {
            order,
            b: b.iter().map(|c| c / a0).collect(),
            a: a.iter().map(|c| c / a0).collect(),
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Numerator coefficients `b[0..=order]`.
    pub fn b(&self) -> &[f64] {
        &self.b
    }

    /// Denominator coefficients `a[0..=order]`, with `a[0] == 1`.
    pub fn a(&self) -> &[f64] {
        &self.a
    }

    /// Steady-state gain for a constant input, `B(1) / A(1)`.
    pub fn dc_gain(&self) -> f64 {
        self.b.iter().sum::<f64>() / self.a.iter().sum::<f64>()
    }
}

fn collect_coefficients<T: Copy + Into<f64>>(
    which: &'static str,
    order: usize,
    coeffs: &[T],
) -> Result<Vec<f64>, FilterError> {
    let expected = order + 1;
    if coeffs.len() < expected {
        return Err(FilterError::CoefficientCount {
            which,
            order,
            expected,
            actual: coeffs.len(),
        });
    }

    coeffs[..expected]
        .iter()
        .enumerate()
        .map(|(index, &c)| {
            let value: f64 = c.into();
            if value.is_finite() {
                Ok(value)
            } else {
                Err(FilterError::NonFiniteCoefficient { which, index, value })
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// RecursiveFilter
// ---------------------------------------------------------------------------

/// Realisation used by a [`RecursiveFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterForm {
    #[default]
    Transposed,
    DirectForm,
}

#[derive(Debug, Clone)]
enum FilterState {
    /// `w[0..order]`
    Transposed { w: Box<[f64]> },
    /// `x[0..=order]`, `y[0..=order]`, most recent sample at index 0.
    DirectForm { x: Box<[f64]>, y: Box<[f64]> },
}

/// A stateful IIR filter. Owns its coefficients and delay-line state
/// exclusively; samples must arrive in acquisition order.
#[derive(Debug, Clone)]
pub struct RecursiveFilter {
    spec: FilterSpec,
    state: FilterState,
}

impl RecursiveFilter {
    /// Build a filter with zeroed state.
    pub fn new(spec: FilterSpec, form: FilterForm) -> Self {
        let order = spec.order();
        let state = match form {
            FilterForm::Transposed => FilterState::Transposed {
                w: vec![0.0; order].into_boxed_slice(),
            },
            FilterForm::DirectForm => FilterState::DirectForm {
                x: vec![0.0; order + 1].into_boxed_slice(),
                y: vec![0.0; order + 1].into_boxed_slice(),
            },
        };
        Self { spec, state }
    }

    pub fn from_coefficients<T: Copy + Into<f64>>(
        order: usize,
        b: &[T],
        a: &[T],
        form: FilterForm,
    ) -> Result<Self, FilterError> {
        Ok(Self::new(FilterSpec::new(order, b, a)?, form))
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// True when every state register is zero.
    pub fn is_at_rest(&self) -> bool {
        match &self.state {
            FilterState::Transposed { w } => w.iter().all(|&v| v == 0.0),
            FilterState::DirectForm { x, y } => x.iter().chain(y.iter()).all(|&v| v == 0.0),
        }
    }
}

impl DigitalFilter for RecursiveFilter {
    fn update(&mut self, sample: f32) -> f32 {
        let input = f64::from(sample);
        let b = &self.spec.b;
        let a = &self.spec.a;

        match &mut self.state {
            FilterState::Transposed { w } => {
                let n = w.len();
                let output = b[0] * input + w[0];
                for i in 0..n - 1 {
                    w[i] = b[i + 1] * input - a[i + 1] * output + w[i + 1];
                }
                w[n - 1] = b[n] * input - a[n] * output;
                output as f32
            }
            FilterState::DirectForm { x, y } => {
                let n = x.len() - 1;
                x.copy_within(0..n, 1);
                x[0] = input;
                // y[1..] now holds y[k-1], y[k-2], ...
                y.copy_within(0..n, 1);

                let feedforward: f64 = b.iter().zip(x.iter()).map(|(c, v)| c * v).sum();
                let feedback: f64 = a[1..].iter().zip(y[1..].iter()).map(|(c, v)| c * v).sum();
                let output = (feedforward - feedback) / a[0];

                y[0] = output;
                output as f32
            }
        }
    }

    fn reset(&mut self) {
        match &mut self.state {
            FilterState::Transposed { w } => w.fill(0.0),
            FilterState::DirectForm { x, y } => {
                x.fill(0.0);
                y.fill(0.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AFIB_A, AFIB_B, BEAT_A, BEAT_B, FILTER_ORDER, WIDE_A, WIDE_B, WIDE_ORDER};
    use approx::assert_relative_eq;

    fn pair<T: Copy + Into<f64>>(order: usize, b: &[T], a: &[T]) -> (RecursiveFilter, RecursiveFilter) {
        let spec = FilterSpec::new(order, b, a).unwrap();
        (
            RecursiveFilter::new(spec.clone(), FilterForm::Transposed),
            RecursiveFilter::new(spec, FilterForm::DirectForm),
        )
    }

    /// Deterministic ECG-ish test input: baseline, slow wander and a spike train.
    fn test_signal(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / 360.0;
                let wander = 150.0 * (2.0 * std::f32::consts::PI * 0.3 * t).sin();
                let spike = if i % 250 < 4 { 900.0 } else { 0.0 };
                2048.0 + wander + spike
            })
            .collect()
    }

    fn assert_forms_agree(transposed: &mut RecursiveFilter, direct: &mut RecursiveFilter, input: &[f32]) {
        for (k, &x) in input.iter().enumerate() {
            let t = transposed.update(x);
            let d = direct.update(x);
            assert_relative_eq!(t, d, max_relative = 1e-5, epsilon = 1e-3);
            assert!(t.is_finite(), "sample {k} diverged");
        }
    }

    #[test]
    fn rejects_zero_order() {
        let err = FilterSpec::new(0, &[1.0f32], &[1.0f32]).unwrap_err();
        assert_eq!(err, FilterError::InvalidOrder(0));
    }

    #[test]
    fn rejects_short_coefficient_vectors() {
        let err = FilterSpec::new(3, &[1.0f32, 2.0, 3.0], &[1.0f32, 0.0, 0.0, 0.0]).unwrap_err();
        assert_eq!(
            err,
            FilterError::CoefficientCount { which: "b", order: 3, expected: 4, actual: 3 }
        );

        let err = FilterSpec::new(2, &[1.0f32, 0.0, 0.0], &[1.0f32, 0.5]).unwrap_err();
        assert!(matches!(err, FilterError::CoefficientCount { which: "a", .. }));
    }

    #[test]
    fn rejects_zero_leading_denominator() {
        let err = FilterSpec::new(1, &[1.0f32, 1.0], &[0.0f32, 0.5]).unwrap_err();
        assert_eq!(err, FilterError::ZeroLeadingDenominator);
        assert!(err.to_string().contains("a[0]"));
    }

    #[test]
    fn rejects_non_finite_coefficients() {
        let err = FilterSpec::new(1, &[1.0, f64::NAN], &[1.0, 0.5]).unwrap_err();
        assert!(matches!(err, FilterError::NonFiniteCoefficient { which: "b", index: 1, .. }));
    }

    #[test]
    fn extra_coefficients_are_ignored() {
        let spec = FilterSpec::new(1, &[0.5f32, 0.5, 99.0], &[1.0f32, 0.0, 42.0]).unwrap();
        assert_eq!(spec.b(), &[0.5, 0.5]);
        assert_eq!(spec.a(), &[1.0, 0.0]);
    }

    #[test]
    fn normalises_by_leading_denominator() {
        let scaled = FilterSpec::new(2, &[0.4, 0.8, 0.4], &[2.0, -0.5, 0.2]).unwrap();
        assert_eq!(scaled.a()[0], 1.0);
        assert_relative_eq!(scaled.b()[1], 0.4);
        assert_relative_eq!(scaled.a()[1], -0.25);

        let unit = FilterSpec::new(2, &[0.2, 0.4, 0.2], &[1.0, -0.25, 0.1]).unwrap();
        let mut a = RecursiveFilter::new(scaled, FilterForm::Transposed);
        let mut b = RecursiveFilter::new(unit, FilterForm::Transposed);
        for x in test_signal(200) {
            assert_relative_eq!(a.update(x), b.update(x), max_relative = 1e-6);
        }
    }

    #[test]
    fn first_order_matches_hand_computed_recurrence() {
        // y[n] = 0.5 x[n] + 0.5 x[n-1] + 0.25 y[n-1]
        let mut f = RecursiveFilter::from_coefficients(1, &[0.5, 0.5], &[1.0, -0.25], FilterForm::Transposed).unwrap();
        assert_relative_eq!(f.update(4.0), 2.0);
        assert_relative_eq!(f.update(0.0), 2.0 + 0.5);
        assert_relative_eq!(f.update(0.0), 0.625);
    }

    #[test]
    fn transposed_and_direct_forms_agree_on_beat_band() {
        let (mut t, mut d) = pair(FILTER_ORDER, &BEAT_B, &BEAT_A);
        assert_forms_agree(&mut t, &mut d, &test_signal(2000));
    }

    #[test]
    fn transposed_and_direct_forms_agree_on_impulse_and_step() {
        let (mut t, mut d) = pair(FILTER_ORDER, &AFIB_B, &AFIB_A);
        let mut impulse = vec![0.0f32; 600];
        impulse[0] = 1000.0;
        assert_forms_agree(&mut t, &mut d, &impulse);

        t.reset();
        d.reset();
        assert_forms_agree(&mut t, &mut d, &[500.0; 600]);
    }

    #[test]
    fn transposed_and_direct_forms_agree_on_order_eight() {
        let (mut t, mut d) = pair(WIDE_ORDER, &WIDE_B, &WIDE_A);
        assert_forms_agree(&mut t, &mut d, &test_signal(3000));
    }

    #[test]
    fn reset_is_idempotent_and_restores_rest() {
        for form in [FilterForm::Transposed, FilterForm::DirectForm] {
            let mut f = RecursiveFilter::from_coefficients(FILTER_ORDER, &BEAT_B, &BEAT_A, form).unwrap();
            assert!(f.is_at_rest());
            for x in test_signal(100) {
                f.update(x);
            }
            assert!(!f.is_at_rest());

            f.reset();
            let once = format!("{:?}", f);
            f.reset();
            assert_eq!(once, format!("{:?}", f));
            assert!(f.is_at_rest());

            for _ in 0..50 {
                assert_eq!(f.update(0.0), 0.0);
            }
        }
    }

    #[test]
    fn band_pass_rejects_dc() {
        let spec = FilterSpec::new(FILTER_ORDER, &AFIB_B, &AFIB_A).unwrap();
        assert_relative_eq!(spec.dc_gain(), 0.0, epsilon = 1e-9);

        for form in [FilterForm::Transposed, FilterForm::DirectForm] {
            let mut f = RecursiveFilter::new(spec.clone(), form);
            let mut last = f32::MAX;
            for _ in 0..600 {
                last = f.update(1000.0);
            }
            assert!(last.abs() < 1e-2, "{form:?} settled at {last}");
        }
    }

    #[test]
    fn order_eight_band_pass_settles_on_dc() {
        let mut f = RecursiveFilter::from_coefficients(WIDE_ORDER, &WIDE_B, &WIDE_A, FilterForm::Transposed).unwrap();
        let mut last = f32::MAX;
        for _ in 0..4000 {
            last = f.update(1000.0);
        }
        assert!(last.abs() < 0.1, "settled at {last}");
    }

    #[test]
    fn process_filters_a_block() {
        let mut streamed = RecursiveFilter::from_coefficients(FILTER_ORDER, &BEAT_B, &BEAT_A, FilterForm::Transposed).unwrap();
        let mut block = streamed.clone();
        let input = test_signal(64);
        let mut output = vec![0.0; input.len()];
        block.process(&input, &mut output);
        for (x, y) in input.iter().zip(&output) {
            assert_eq!(streamed.update(*x), *y);
        }
    }

    #[test]
    fn nan_input_propagates_without_panicking() {
        let mut f = RecursiveFilter::from_coefficients(FILTER_ORDER, &BEAT_B, &BEAT_A, FilterForm::Transposed).unwrap();
        assert!(f.update(f32::NAN).is_nan());
        assert!(f.update(0.0).is_nan());
        f.reset();
        assert_eq!(f.update(0.0), 0.0);
    }
}
