use std::{fmt::Display, num::NonZero};

use crate::{
    Error, Indicator, IndicatorConfig, IndicatorConfigBuilder, Result, Reusable, TimeValue,
    indicator::{mean, non_zero_length},
};

/// Configuration for the Simple Moving Average ([`Sma`]) indicator.
///
/// # Example
///
/// ```rust
/// use quantedge_hubs::{IndicatorConfig, IndicatorConfigBuilder, SmaConfig};
/// use std::num::NonZero;
///
/// let config = SmaConfig::builder()
///     .length(NonZero::new(20).unwrap())
///     .build()
///     .unwrap();
/// assert_eq!(config.length(), 20);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct SmaConfig {
    length: usize,
}

impl IndicatorConfig for SmaConfig {
    type Builder = SmaConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        SmaConfigBuilder::new()
    }

    #[inline]
    fn length(&self) -> usize {
        self.length
    }
}

impl SmaConfig {
    /// SMA over `length` periods.
    #[must_use]
    pub fn new(length: NonZero<usize>) -> Self {
        Self {
            length: length.get(),
        }
    }
}

impl Display for SmaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SmaConfig({})", self.length)
    }
}

/// Builder for [`SmaConfig`].
///
/// Length must be set before calling [`build`](IndicatorConfigBuilder::build).
pub struct SmaConfigBuilder {
    length: Option<usize>,
}

impl SmaConfigBuilder {
    fn new() -> Self {
        Self { length: None }
    }
}

impl IndicatorConfigBuilder<SmaConfig> for SmaConfigBuilder {
    #[inline]
    fn length(mut self, length: NonZero<usize>) -> Self {
        self.length.replace(length.get());
        self
    }

    #[inline]
    fn build(self) -> Result<SmaConfig> {
        let length = self
            .length
            .ok_or_else(|| Error::invalid_parameter("length", "is required"))?;

        Ok(SmaConfig { length })
    }
}

/// Simple Moving Average (SMA).
///
/// Computes the unweighted mean of the last *n* values, where *n* is the
/// configured window length. The value is `None` until the window is full,
/// and whenever a value inside the window is missing (e.g. the warm-up of
/// an upstream stage).
///
/// # Example
///
/// ```rust
/// use quantedge_hubs::{Sma, TimeValue, batch};
///
/// let values: Vec<_> = (1..=4).map(|t| TimeValue::new(t, Some(t as f64 * 10.0))).collect();
/// let results = batch::compute(&values, &Sma::with_length(3).unwrap()).unwrap();
///
/// assert_eq!(results[1].value, None);
/// assert_eq!(results[2].value, Some(20.0));
/// assert_eq!(results[3].value, Some(30.0));
/// ```
#[derive(Clone, Debug)]
pub struct Sma {
    config: SmaConfig,
}

impl Sma {
    #[must_use]
    pub fn new(config: SmaConfig) -> Self {
        Self { config }
    }

    /// SMA over `length` periods.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] when `length` is zero.
    pub fn with_length(length: usize) -> Result<Self> {
        Ok(Self::new(SmaConfig::new(non_zero_length(length)?)))
    }

    #[must_use]
    pub fn config(&self) -> &SmaConfig {
        &self.config
    }
}

impl<In: Reusable> Indicator<In> for Sma {
    type Output = TimeValue;

    #[inline]
    fn lookback(&self) -> usize {
        self.config.length - 1
    }

    #[inline]
    fn compute(&self, inputs: &[In], _: &[TimeValue], index: usize) -> Result<TimeValue> {
        let length = self.config.length;
        let value = if index + 1 < length {
            None
        } else {
            mean(
                inputs[index + 1 - length..=index].iter().map(Reusable::value),
                length,
            )
        };

        Ok(TimeValue::new(inputs[index].timestamp(), value))
    }
}

impl Display for Sma {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SMA({})", self.config.length)
    }
}
