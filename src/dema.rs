use std::{fmt::Display, num::NonZero};

use crate::{
    Error, Indicator, IndicatorConfig, IndicatorConfigBuilder, Result, Reusable, Series,
    Timestamp,
    indicator::{mean, non_zero_length},
};

/// Configuration for the Double Exponential Moving Average ([`Dema`])
/// indicator.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct DemaConfig {
    length: usize,
}

impl IndicatorConfig for DemaConfig {
    type Builder = DemaConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        DemaConfigBuilder { length: None }
    }

    #[inline]
    fn length(&self) -> usize {
        self.length
    }
}

impl DemaConfig {
    #[must_use]
    pub fn new(length: NonZero<usize>) -> Self {
        Self {
            length: length.get(),
        }
    }
}

impl Display for DemaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DemaConfig({})", self.length)
    }
}

/// Builder for [`DemaConfig`].
pub struct DemaConfigBuilder {
    length: Option<usize>,
}

impl IndicatorConfigBuilder<DemaConfig> for DemaConfigBuilder {
    #[inline]
    fn length(mut self, length: NonZero<usize>) -> Self {
        self.length.replace(length.get());
        self
    }

    #[inline]
    fn build(self) -> Result<DemaConfig> {
        let length = self
            .length
            .ok_or_else(|| Error::invalid_parameter("length", "is required"))?;

        Ok(DemaConfig { length })
    }
}

/// DEMA result for one period.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct DemaResult {
    pub timestamp: Timestamp,
    pub dema: Option<f64>,
    /// EMA of the input and EMA of that EMA.
    state: Option<(f64, f64)>,
}

impl Series for DemaResult {
    #[inline]
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl Reusable for DemaResult {
    #[inline]
    fn value(&self) -> Option<f64> {
        self.dema
    }
}

/// Double Exponential Moving Average (DEMA).
///
/// Reduces the lag of a plain EMA by subtracting the EMA of the EMA:
///
/// ```text
/// EMA1 = EMA(value)
/// EMA2 = EMA(EMA1)
/// DEMA = 2 × EMA1 − EMA2
/// ```
///
/// Both averages are seeded with the SMA of the first `length` values, so
/// the first DEMA equals that SMA. A missing input resets both averages.
///
/// # Example
///
/// ```
/// use quantedge_hubs::{Dema, TimeValue, batch};
///
/// let values: Vec<_> = [2.0, 4.0, 6.0, 8.0]
///     .iter()
///     .zip(1..)
///     .map(|(&v, t)| TimeValue::new(t, Some(v)))
///     .collect();
///
/// let results = batch::compute(&values, &Dema::with_length(3).unwrap()).unwrap();
///
/// assert_eq!(results[2].dema, Some(4.0));
/// // EMA1 = 6, EMA2 = 5 → DEMA = 7
/// assert_eq!(results[3].dema, Some(7.0));
/// ```
#[derive(Clone, Debug)]
pub struct Dema {
    config: DemaConfig,
    alpha: f64,
}

impl Dema {
    #[must_use]
    pub fn new(config: DemaConfig) -> Self {
        Self {
            config,
            #[allow(clippy::cast_precision_loss)]
            alpha: 2.0 / (config.length + 1) as f64,
        }
    }

    /// DEMA over `length` periods.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] when `length` is zero.
    pub fn with_length(length: usize) -> Result<Self> {
        Ok(Self::new(DemaConfig::new(non_zero_length(length)?)))
    }

    #[must_use]
    pub fn config(&self) -> &DemaConfig {
        &self.config
    }
}

impl<In: Reusable> Indicator<In> for Dema {
    type Output = DemaResult;

    #[inline]
    fn lookback(&self) -> usize {
        self.config.length
    }

    fn warmup_periods(&self) -> usize {
        self.config.length - 1
    }

    fn compute(&self, inputs: &[In], results: &[DemaResult], index: usize) -> Result<DemaResult> {
        let length = self.config.length;
        let previous = index.checked_sub(1).and_then(|i| results[i].state);

        let state = match (previous, inputs[index].value()) {
            (Some((ema1, ema2)), Some(value)) => {
                let ema1 = self.alpha.mul_add(value - ema1, ema1);
                Some((ema1, self.alpha.mul_add(ema1 - ema2, ema2)))
            }
            (Some(_), None) => None,
            _ if index + 1 >= length => mean(
                inputs[index + 1 - length..=index].iter().map(Reusable::value),
                length,
            )
            .map(|seed| (seed, seed)),
            _ => None,
        };

        Ok(DemaResult {
            timestamp: inputs[index].timestamp(),
            dema: state.map(|(ema1, ema2)| 2.0f64.mul_add(ema1, -ema2)),
            state,
        })
    }
}

impl Display for Dema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DEMA({})", self.config.length)
    }
}
