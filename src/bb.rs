use std::{
    fmt::Display,
    hash::{Hash, Hasher},
    num::NonZero,
};

use crate::{
    Error, Indicator, IndicatorConfig, IndicatorConfigBuilder, Price, Result, Reusable, Series,
    Timestamp, indicator::non_zero_length,
};

/// Standard deviation multiplier for Bollinger Bands.
///
/// Wraps a positive, finite `f64`.
///
/// Defaults to `2.0` (the standard Bollinger Bands setting).
///
/// Implements `Eq` and `Hash` via bit-level comparison, which is safe because
/// NaN is rejected at construction.
#[derive(Clone, Copy, Debug)]
pub struct StdDev(f64);

impl StdDev {
    /// Creates a new standard deviation multiplier.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] if `value` is zero, negative, or not
    /// finite.
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::invalid_parameter("std_dev", "must be finite"));
        }
        if value <= 0.0 {
            return Err(Error::invalid_parameter("std_dev", "must be positive"));
        }

        Ok(Self(value))
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for StdDev {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for StdDev {}

impl Hash for StdDev {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl Default for StdDev {
    fn default() -> Self {
        Self(2.0)
    }
}

/// Configuration for the Bollinger Bands ([`Bb`]) indicator.
///
/// # Example
///
/// ```
/// use quantedge_hubs::{BbConfig, IndicatorConfig, IndicatorConfigBuilder, StdDev};
/// use std::num::NonZero;
///
/// let config = BbConfig::builder()
///     .length(NonZero::new(20).unwrap())
///     .std_dev(StdDev::new(2.5).unwrap())
///     .build()
///     .unwrap();
///
/// assert_eq!(config.length(), 20);
/// assert_eq!(config.std_dev().value(), 2.5);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct BbConfig {
    length: usize,
    std_dev: StdDev,
}

impl IndicatorConfig for BbConfig {
    type Builder = BbConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        BbConfigBuilder::new()
    }

    #[inline]
    fn length(&self) -> usize {
        self.length
    }
}

impl BbConfig {
    /// Standard deviation multiplier.
    #[inline]
    #[must_use]
    pub fn std_dev(&self) -> StdDev {
        self.std_dev
    }

    /// Standard Bollinger Bands: 20 periods, 2 standard deviations.
    #[must_use]
    pub fn default_20() -> Self {
        Self {
            length: 20,
            std_dev: StdDev::default(),
        }
    }
}

impl Display for BbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BbConfig({}, {})", self.length, self.std_dev.0)
    }
}

/// Builder for [`BbConfig`].
///
/// Defaults: `std_dev` = `2.0`.
/// Length must be set before calling
/// [`build`](IndicatorConfigBuilder::build).
pub struct BbConfigBuilder {
    length: Option<usize>,
    std_dev: StdDev,
}

impl BbConfigBuilder {
    fn new() -> Self {
        Self {
            length: None,
            std_dev: StdDev::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn std_dev(mut self, std_dev: StdDev) -> Self {
        self.std_dev = std_dev;
        self
    }
}

impl IndicatorConfigBuilder<BbConfig> for BbConfigBuilder {
    #[inline]
    fn length(mut self, length: NonZero<usize>) -> Self {
        self.length.replace(length.get());
        self
    }

    #[inline]
    fn build(self) -> Result<BbConfig> {
        let length = self
            .length
            .ok_or_else(|| Error::invalid_parameter("length", "is required"))?;

        Ok(BbConfig {
            length,
            std_dev: self.std_dev,
        })
    }
}

/// Bollinger Bands for one period.
///
/// The middle band is the SMA. Upper and lower bands are offset by
/// `std_dev × σ`, where `σ` is the population standard deviation of the window.
///
/// ```text
/// upper     = SMA + k × σ
/// middle    = SMA
/// lower     = SMA − k × σ
/// percent_b = (value − lower) / (upper − lower)
/// ```
///
/// Every band is `None` inside the warm-up period. `percent_b`, the value
/// chained to further stages, is also `None` when the bands collapse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BbResult {
    pub timestamp: Timestamp,
    pub upper: Option<Price>,
    pub middle: Option<Price>,
    pub lower: Option<Price>,
    pub percent_b: Option<f64>,
}

impl BbResult {
    fn empty(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            upper: None,
            middle: None,
            lower: None,
            percent_b: None,
        }
    }

    /// Band width: `upper − lower`.
    ///
    /// Useful for measuring volatility. Narrow width indicates
    /// consolidation (Bollinger squeeze); wide width indicates
    /// high volatility.
    #[inline]
    #[must_use]
    pub fn width(&self) -> Option<f64> {
        Some(self.upper? - self.lower?)
    }
}

impl Series for BbResult {
    #[inline]
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl Reusable for BbResult {
    #[inline]
    fn value(&self) -> Option<f64> {
        self.percent_b
    }
}

/// Bollinger Bands (BB).
///
/// A volatility indicator consisting of three bands: a simple moving average
/// (middle) surrounded by an upper and lower band placed `k` standard
/// deviations away. Uses the population standard deviation, computed in one
/// pass over the window as `E[X²] − E[X]²`.
///
/// # Example
///
/// ```
/// use quantedge_hubs::{Bb, TimeValue, batch};
///
/// let values = [TimeValue::new(1, Some(3.0)), TimeValue::new(2, Some(5.0))];
/// let results = batch::compute(&values, &Bb::with_length(2).unwrap()).unwrap();
///
/// // mean = 4, σ = 1, k = 2
/// assert_eq!(results[1].upper, Some(6.0));
/// assert_eq!(results[1].lower, Some(2.0));
/// assert_eq!(results[1].percent_b, Some(0.75));
/// ```
#[derive(Clone, Debug)]
pub struct Bb {
    config: BbConfig,
    length_reciprocal: f64,
}

impl Bb {
    #[must_use]
    pub fn new(config: BbConfig) -> Self {
        Self {
            config,
            #[allow(clippy::cast_precision_loss)]
            length_reciprocal: 1.0 / config.length as f64,
        }
    }

    /// Bollinger Bands over `length` periods at 2 standard deviations.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] when `length` is zero.
    pub fn with_length(length: usize) -> Result<Self> {
        let config = BbConfig::builder()
            .length(non_zero_length(length)?)
            .build()?;

        Ok(Self::new(config))
    }

    #[must_use]
    pub fn config(&self) -> &BbConfig {
        &self.config
    }
}

impl<In: Reusable> Indicator<In> for Bb {
    type Output = BbResult;

    #[inline]
    fn lookback(&self) -> usize {
        self.config.length - 1
    }

    fn compute(&self, inputs: &[In], _: &[BbResult], index: usize) -> Result<BbResult> {
        let length = self.config.length;
        let timestamp = inputs[index].timestamp();
        if index + 1 < length {
            return Ok(BbResult::empty(timestamp));
        }

        let mut sum = 0.0;
        let mut sum_of_squares = 0.0;
        for input in &inputs[index + 1 - length..=index] {
            let Some(value) = input.value() else {
                return Ok(BbResult::empty(timestamp));
            };
            sum += value;
            sum_of_squares += value * value;
        }

        let mean = sum * self.length_reciprocal;

        // Variance = E[X^2] - (E[X])^2 = (sum_of_squares / n) - mean^2
        let variance = sum_of_squares.mul_add(self.length_reciprocal, -(mean * mean));
        let offset = variance.max(0.0).sqrt() * self.config.std_dev.0;
        let (upper, lower) = (mean + offset, mean - offset);

        let percent_b = inputs[index]
            .value()
            .filter(|_| upper > lower)
            .map(|value| (value - lower) / (upper - lower));

        Ok(BbResult {
            timestamp,
            upper: Some(upper),
            middle: Some(mean),
            lower: Some(lower),
            percent_b,
        })
    }
}

impl Display for Bb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BB({}, {})", self.config.length, self.config.std_dev.0)
    }
}
