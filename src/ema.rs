use std::{fmt::Display, num::NonZero};

use crate::{
    Error, Indicator, IndicatorConfig, IndicatorConfigBuilder, Result, Reusable, Series,
    Timestamp,
    indicator::{mean, non_zero_length},
};

/// Configuration for the Exponential Moving Average ([`Ema`])
/// indicator.
///
/// # Convergence
///
/// EMA has infinite memory: the initial seed value (SMA of the
/// first `length` values) influences all subsequent values. With
/// `enforce_convergence` enabled, the published value stays
/// `None` until the seed's contribution decays below 1%.
///
/// For EMA(20), that's 63 periods (`3 × (length + 1)`).
/// Without enforcement, values are published as soon as the
/// SMA seed is ready (after `length` periods).
///
/// # Example
///
/// ```
/// use quantedge_hubs::{EmaConfig, IndicatorConfig, IndicatorConfigBuilder};
/// use std::num::NonZero;
///
/// let config = EmaConfig::builder()
///     .length(NonZero::new(20).unwrap())
///     .enforce_convergence(true)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.length(), 20);
/// assert_eq!(config.required_bars_to_converge(), 63);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct EmaConfig {
    length: usize,
    convergence: bool,
    bars_to_converge: usize,
}

impl IndicatorConfig for EmaConfig {
    type Builder = EmaConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        EmaConfigBuilder::new()
    }

    #[inline]
    fn length(&self) -> usize {
        self.length
    }
}

impl EmaConfig {
    /// EMA over `length` periods, published as soon as it is seeded.
    #[must_use]
    pub fn new(length: NonZero<usize>) -> Self {
        Self {
            length: length.get(),
            convergence: false,
            bars_to_converge: length.get(),
        }
    }

    /// When `true`, values stay `None` until
    /// [`required_bars_to_converge`](Self::required_bars_to_converge)
    /// periods have been processed. Default: `false`.
    #[inline]
    #[must_use]
    pub fn enforce_convergence(&self) -> bool {
        self.convergence
    }

    /// Number of periods needed before the EMA output is published.
    ///
    /// When convergence is not enforced, this equals the window length.
    /// When enforced, this is `3 × (length + 1)`.
    #[must_use]
    pub fn required_bars_to_converge(&self) -> usize {
        self.bars_to_converge
    }
}

impl Display for EmaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EmaConfig({}, {})", self.length, self.convergence)
    }
}

/// Builder for [`EmaConfig`].
///
/// Defaults: convergence enforcement = `false`.
/// Length must be set before calling
/// [`build`](IndicatorConfigBuilder::build).
pub struct EmaConfigBuilder {
    length: Option<usize>,
    convergence: bool,
}

impl EmaConfigBuilder {
    fn new() -> Self {
        Self {
            length: None,
            convergence: false,
        }
    }

    /// Enables or disables convergence enforcement.
    #[inline]
    #[must_use]
    pub fn enforce_convergence(mut self, enforce: bool) -> Self {
        self.convergence = enforce;
        self
    }
}

impl IndicatorConfigBuilder<EmaConfig> for EmaConfigBuilder {
    #[inline]
    fn length(mut self, length: NonZero<usize>) -> Self {
        self.length.replace(length.get());
        self
    }

    #[inline]
    fn build(self) -> Result<EmaConfig> {
        let length = self
            .length
            .ok_or_else(|| Error::invalid_parameter("length", "is required"))?;
        let bars_to_converge = if self.convergence {
            3 * (length + 1)
        } else {
            length
        };

        Ok(EmaConfig {
            length,
            convergence: self.convergence,
            bars_to_converge,
        })
    }
}

/// EMA result for one period.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct EmaResult {
    pub timestamp: Timestamp,
    /// Published value, `None` until seeded (or converged, when enforced).
    pub ema: Option<f64>,
    state: Option<f64>,
    periods: usize,
}

impl Series for EmaResult {
    #[inline]
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl Reusable for EmaResult {
    #[inline]
    fn value(&self) -> Option<f64> {
        self.ema
    }
}

/// Exponential Moving Average (EMA).
///
/// A weighted moving average that gives more weight to recent
/// values. Uses the standard smoothing factor
/// `α = 2 / (length + 1)`. Each value is computed as:
///
/// ```text
/// EMA = α × value + (1 − α) × prev_EMA
/// ```
///
/// The first `length` values are averaged into an SMA seed.
/// After seeding, every period is a single fused multiply-add
/// over the previous result. A missing input value resets the
/// average, which re-seeds from the next full window.
///
/// # Example
///
/// ```
/// use quantedge_hubs::{Ema, TimeValue, batch};
///
/// let values: Vec<_> = [2.0, 4.0, 6.0, 8.0]
///     .iter()
///     .zip(1..)
///     .map(|(&v, t)| TimeValue::new(t, Some(v)))
///     .collect();
///
/// let results = batch::compute(&values, &Ema::with_length(3).unwrap()).unwrap();
///
/// // Seeding phase
/// assert_eq!(results[1].ema, None);
///
/// // SMA seed = (2 + 4 + 6) / 3 = 4.0
/// assert_eq!(results[2].ema, Some(4.0));
///
/// // EMA(3) α = 0.5: 8 × 0.5 + 4 × 0.5 = 6.0
/// assert_eq!(results[3].ema, Some(6.0));
/// ```
#[derive(Clone, Debug)]
pub struct Ema {
    config: EmaConfig,
    alpha: f64,
}

impl Ema {
    #[must_use]
    pub fn new(config: EmaConfig) -> Self {
        Self {
            config,
            #[allow(clippy::cast_precision_loss)]
            alpha: 2.0 / (config.length + 1) as f64,
        }
    }

    /// EMA over `length` periods, without convergence enforcement.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] when `length` is zero.
    pub fn with_length(length: usize) -> Result<Self> {
        Ok(Self::new(EmaConfig::new(non_zero_length(length)?)))
    }

    #[must_use]
    pub fn config(&self) -> &EmaConfig {
        &self.config
    }
}

impl<In: Reusable> Indicator<In> for Ema {
    type Output = EmaResult;

    #[inline]
    fn lookback(&self) -> usize {
        self.config.length
    }

    fn warmup_periods(&self) -> usize {
        self.config.bars_to_converge - 1
    }

    #[inline]
    fn compute(&self, inputs: &[In], results: &[EmaResult], index: usize) -> Result<EmaResult> {
        let length = self.config.length;
        let previous = index
            .checked_sub(1)
            .and_then(|i| results[i].state.map(|state| (state, results[i].periods)));

        let (state, periods) = match (previous, inputs[index].value()) {
            (Some((prev, periods)), Some(value)) => (
                Some(self.alpha.mul_add(value - prev, prev)),
                (periods + 1).min(self.config.bars_to_converge),
            ),
            (Some(_), None) => (None, 0),
            _ if index + 1 >= length => {
                let seed = mean(
                    inputs[index + 1 - length..=index].iter().map(Reusable::value),
                    length,
                );
                (seed, if seed.is_some() { length } else { 0 })
            }
            _ => (None, 0),
        };

        Ok(EmaResult {
            timestamp: inputs[index].timestamp(),
            ema: state.filter(|_| periods >= self.config.bars_to_converge),
            state,
            periods,
        })
    }
}

impl Display for Ema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EMA({})", self.config.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        TimeValue, batch,
        test_util::{assert_approx, tv},
    };

    fn ema(length: usize) -> Ema {
        Ema::with_length(length).unwrap()
    }

    fn ema_converged(length: usize) -> Ema {
        Ema::new(
            EmaConfig::builder()
                .length(NonZero::new(length).unwrap())
                .enforce_convergence(true)
                .build()
                .unwrap(),
        )
    }

    fn values(inputs: &[f64]) -> Vec<TimeValue> {
        inputs.iter().zip(1..).map(|(&v, t)| tv(t, v)).collect()
    }

    fn emas(results: &[EmaResult]) -> Vec<Option<f64>> {
        results.iter().map(|r| r.ema).collect()
    }

    mod seeding {
        use super::*;

        #[test]
        fn none_until_seeded() {
            let results = batch::compute(&values(&[10.0, 20.0]), &ema(3)).unwrap();
            assert_eq!(emas(&results), vec![None, None]);
        }

        #[test]
        fn seed_is_sma() {
            let results = batch::compute(&values(&[10.0, 20.0, 30.0]), &ema(3)).unwrap();
            assert_eq!(results[2].ema, Some(20.0));
        }

        #[test]
        fn length_one_tracks_input() {
            let results = batch::compute(&values(&[3.0, 7.0, 5.0]), &ema(1)).unwrap();
            assert_eq!(emas(&results), vec![Some(3.0), Some(7.0), Some(5.0)]);
        }
    }

    mod smoothing {
        use super::*;

        #[test]
        fn applies_alpha() {
            // α = 2 / (4 + 1) = 0.4, seed = 25
            let results =
                batch::compute(&values(&[10.0, 20.0, 30.0, 40.0, 50.0]), &ema(4)).unwrap();
            assert_approx!(results[4].ema.unwrap(), 0.4f64.mul_add(50.0 - 25.0, 25.0));
        }

        #[test]
        fn constant_input_is_constant() {
            let results = batch::compute(&values(&[5.0; 10]), &ema(3)).unwrap();
            assert!(results[2..].iter().all(|r| r.ema == Some(5.0)));
        }

        #[test]
        fn gap_reseeds() {
            let mut inputs = values(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
            inputs[3].value = None;
            let results = batch::compute(&inputs, &ema(2)).unwrap();

            assert!(results[1].ema.is_some());
            assert_eq!(results[3].ema, None);
            assert_eq!(results[4].ema, None);
            // re-seeded from (5 + 6) / 2
            assert_eq!(results[5].ema, Some(5.5));
        }
    }

    mod convergence {
        use super::*;

        #[test]
        fn hidden_until_converged() {
            let ema = ema_converged(2);
            let inputs = values(&[1.0; 12]);
            let results = batch::compute(&inputs, &ema).unwrap();

            // 3 × (2 + 1) = 9 periods
            assert!(results[..8].iter().all(|r| r.ema.is_none()));
            assert!(results[8..].iter().all(|r| r.ema == Some(1.0)));
            assert_eq!(Indicator::<TimeValue>::warmup_periods(&ema), 8);
        }

        #[test]
        fn converged_values_match_unenforced() {
            let inputs = values(&[4.0, 8.0, 1.0, 9.0, 3.0, 7.0, 2.0, 6.0, 5.0, 0.5, 11.0]);
            let plain = batch::compute(&inputs, &ema(2)).unwrap();
            let enforced = batch::compute(&inputs, &ema_converged(2)).unwrap();

            assert_eq!(enforced[10].ema, plain[10].ema);
        }
    }

    mod config {
        use super::*;

        #[test]
        fn zero_length_rejected() {
            assert!(Ema::with_length(0).is_err());
        }

        #[test]
        fn display() {
            assert_eq!(ema(20).to_string(), "EMA(20)");
            assert_eq!(ema(20).config().to_string(), "EmaConfig(20, false)");
        }
    }
}
