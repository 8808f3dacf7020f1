use std::{fmt::Display, num::NonZero};

use crate::{
    Error, Indicator, IndicatorConfig, IndicatorConfigBuilder, Price, Result, Reusable, Series,
    Timestamp, indicator::non_zero_length,
};

/// Configuration for the Relative Strength Index ([`Rsi`])
/// indicator.
///
/// RSI uses Wilder's smoothing, which has infinite memory: the
/// SMA seed (first `length` price changes) influences all
/// subsequent values. Output begins at period `length + 1`.
///
/// # Example
///
/// ```
/// use quantedge_hubs::{IndicatorConfig, RsiConfig};
/// use std::num::NonZero;
///
/// let config = RsiConfig::new(NonZero::new(14).unwrap());
/// assert_eq!(config.length(), 14);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct RsiConfig {
    length: usize,
}

impl IndicatorConfig for RsiConfig {
    type Builder = RsiConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        RsiConfigBuilder::new()
    }

    #[inline]
    fn length(&self) -> usize {
        self.length
    }
}

impl RsiConfig {
    /// RSI over `length` price changes.
    #[must_use]
    pub fn new(length: NonZero<usize>) -> Self {
        Self {
            length: length.get(),
        }
    }
}

impl Display for RsiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RsiConfig({})", self.length)
    }
}

/// Builder for [`RsiConfig`].
///
/// Length must be set before calling
/// [`build`](IndicatorConfigBuilder::build).
pub struct RsiConfigBuilder {
    length: Option<usize>,
}

impl RsiConfigBuilder {
    #[must_use]
    fn new() -> Self {
        Self { length: None }
    }
}

impl IndicatorConfigBuilder<RsiConfig> for RsiConfigBuilder {
    #[inline]
    fn length(mut self, length: NonZero<usize>) -> Self {
        self.length = Some(length.get());
        self
    }

    #[inline]
    fn build(self) -> Result<RsiConfig> {
        let length = self
            .length
            .ok_or_else(|| Error::invalid_parameter("length", "is required"))?;

        Ok(RsiConfig { length })
    }
}

/// RSI result for one period.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct RsiResult {
    pub timestamp: Timestamp,
    pub rsi: Option<f64>,
    /// Smoothed average gain and loss.
    averages: Option<(f64, f64)>,
}

impl RsiResult {
    fn new(timestamp: Timestamp, averages: Option<(f64, f64)>) -> Self {
        Self {
            timestamp,
            rsi: averages.map(|(gain, loss)| Rsi::rsi_from_averages(gain, loss)),
            averages,
        }
    }

    /// Wilder-smoothed average gain, once seeded.
    #[must_use]
    pub fn avg_gain(&self) -> Option<f64> {
        self.averages.map(|(gain, _)| gain)
    }

    /// Wilder-smoothed average loss, once seeded.
    #[must_use]
    pub fn avg_loss(&self) -> Option<f64> {
        self.averages.map(|(_, loss)| loss)
    }
}

impl Series for RsiResult {
    #[inline]
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl Reusable for RsiResult {
    #[inline]
    fn value(&self) -> Option<f64> {
        self.rsi
    }
}

/// Relative Strength Index (RSI) with Wilder's smoothing.
///
/// Measures the speed and magnitude of recent price changes on
/// a 0–100 scale. Values above 70 are conventionally considered
/// overbought; below 30, oversold.
///
/// The first `length` price changes are averaged with a simple
/// mean (SMA seed). After seeding, gains and losses are smoothed
/// with Wilder's method (`α = 1 / length`):
///
/// ```text
/// avg_gain = (prev_avg_gain × (length − 1) + gain) / length
/// avg_loss = (prev_avg_loss × (length − 1) + loss) / length
/// RSI      = 100 × avg_gain / (avg_gain + avg_loss)
/// ```
///
/// A flat window, with neither gains nor losses, reads 50.
///
/// # Example
///
/// ```
/// use quantedge_hubs::{Rsi, TimeValue, batch};
///
/// let values: Vec<_> = [10.0, 12.0, 11.0, 13.0]
///     .iter()
///     .zip(1..)
///     .map(|(&v, t)| TimeValue::new(t, Some(v)))
///     .collect();
///
/// let results = batch::compute(&values, &Rsi::with_length(3).unwrap()).unwrap();
///
/// // Seeding: need 3 price changes (4 values)
/// assert_eq!(results[2].rsi, None);
///
/// // changes = +2, −1, +2 → avg_gain=4/3, avg_loss=1/3 → RSI=80
/// assert!((results[3].rsi.unwrap() - 80.0).abs() < 1e-10);
/// ```
#[derive(Clone, Debug)]
pub struct Rsi {
    config: RsiConfig,
    length_reciprocal: f64,
    length_minus_one: f64,
}

impl Rsi {
    #[must_use]
    pub fn new(config: RsiConfig) -> Self {
        Self {
            config,
            #[allow(clippy::cast_precision_loss)]
            length_reciprocal: 1.0 / config.length as f64,
            #[allow(clippy::cast_precision_loss)]
            length_minus_one: (config.length - 1) as f64,
        }
    }

    /// RSI over `length` price changes.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] when `length` is zero.
    pub fn with_length(length: usize) -> Result<Self> {
        Ok(Self::new(RsiConfig::new(non_zero_length(length)?)))
    }

    #[must_use]
    pub fn config(&self) -> &RsiConfig {
        &self.config
    }

    /// SMA seed over the `length` changes ending at `index`.
    fn seed<In: Reusable>(&self, inputs: &[In], index: usize) -> Option<(f64, f64)> {
        let window = &inputs[index - self.config.length..=index];
        let (mut sum_gain, mut sum_loss) = (0.0, 0.0);
        for pair in window.windows(2) {
            let (gain, loss) = Self::gain_and_loss(pair[0].value()?, pair[1].value()?);
            sum_gain += gain;
            sum_loss += loss;
        }

        Some((
            sum_gain * self.length_reciprocal,
            sum_loss * self.length_reciprocal,
        ))
    }

    #[inline]
    fn smooth(&self, previous: f64, change: f64) -> f64 {
        previous.mul_add(self.length_minus_one, change) * self.length_reciprocal
    }

    #[inline]
    fn gain_and_loss(prev_price: Price, price: Price) -> (Price, Price) {
        let change = price - prev_price;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        (gain, loss)
    }

    #[inline]
    fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
        let sum = avg_gain + avg_loss;
        if sum == 0.0 {
            50.0
        } else {
            100.0 * avg_gain / sum
        }
    }
}

impl<In: Reusable> Indicator<In> for Rsi {
    type Output = RsiResult;

    #[inline]
    fn lookback(&self) -> usize {
        self.config.length
    }

    fn compute(&self, inputs: &[In], results: &[RsiResult], index: usize) -> Result<RsiResult> {
        let timestamp = inputs[index].timestamp();
        let Some(prev) = index.checked_sub(1) else {
            return Ok(RsiResult::new(timestamp, None));
        };

        let averages = match results[prev].averages {
            Some((avg_gain, avg_loss)) => inputs[prev]
                .value()
                .zip(inputs[index].value())
                .map(|(prev_price, price)| {
                    let (gain, loss) = Self::gain_and_loss(prev_price, price);
                    (self.smooth(avg_gain, gain), self.smooth(avg_loss, loss))
                }),
            None if index >= self.config.length => self.seed(inputs, index),
            None => None,
        };

        Ok(RsiResult::new(timestamp, averages))
    }
}

impl Display for Rsi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RSI({})", self.config.length)
    }
}
