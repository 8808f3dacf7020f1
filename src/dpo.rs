use std::{fmt::Display, num::NonZero};

use crate::{
    Error, Indicator, IndicatorConfig, IndicatorConfigBuilder, Result, Reusable, Series,
    Timestamp,
    indicator::{mean, non_zero_length},
};

/// Configuration for the Detrended Price Oscillator ([`Dpo`]) indicator.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct DpoConfig {
    length: usize,
}

impl IndicatorConfig for DpoConfig {
    type Builder = DpoConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        DpoConfigBuilder { length: None }
    }

    #[inline]
    fn length(&self) -> usize {
        self.length
    }
}

impl DpoConfig {
    #[must_use]
    pub fn new(length: NonZero<usize>) -> Self {
        Self {
            length: length.get(),
        }
    }

    /// Displacement of the centered SMA: `length / 2 + 1`.
    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.length / 2 + 1
    }
}

impl Display for DpoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DpoConfig({})", self.length)
    }
}

/// Builder for [`DpoConfig`].
pub struct DpoConfigBuilder {
    length: Option<usize>,
}

impl IndicatorConfigBuilder<DpoConfig> for DpoConfigBuilder {
    #[inline]
    fn length(mut self, length: NonZero<usize>) -> Self {
        self.length.replace(length.get());
        self
    }

    #[inline]
    fn build(self) -> Result<DpoConfig> {
        let length = self
            .length
            .ok_or_else(|| Error::invalid_parameter("length", "is required"))?;

        Ok(DpoConfig { length })
    }
}

/// DPO result for one period.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct DpoResult {
    pub timestamp: Timestamp,
    pub dpo: Option<f64>,
    /// The displaced SMA the value was detrended against.
    pub sma: Option<f64>,
}

impl Series for DpoResult {
    #[inline]
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl Reusable for DpoResult {
    #[inline]
    fn value(&self) -> Option<f64> {
        self.dpo
    }
}

/// Detrended Price Oscillator (DPO).
///
/// Removes the trend from a series by subtracting an SMA displaced
/// `offset = length / 2 + 1` periods into the future:
///
/// ```text
/// DPO[j] = value[j] − SMA(length)[j + offset]
/// ```
///
/// The most recent `offset` positions have no value until enough later
/// inputs arrive, so every append also re-derives them
/// ([`lookahead`](Indicator::lookahead) is `offset`).
///
/// # Example
///
/// ```
/// use quantedge_hubs::{Dpo, TimeValue, batch};
///
/// let values: Vec<_> = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
///     .iter()
///     .zip(1..)
///     .map(|(&v, t)| TimeValue::new(t, Some(v)))
///     .collect();
///
/// // offset = 3 / 2 + 1 = 2
/// let results = batch::compute(&values, &Dpo::with_length(3).unwrap()).unwrap();
///
/// // value 1 minus SMA over (1, 2, 3)
/// assert_eq!(results[0].dpo, Some(-1.0));
/// assert_eq!(results[3].dpo, Some(-1.0));
/// assert_eq!(results[4].dpo, None);
/// ```
#[derive(Clone, Debug)]
pub struct Dpo {
    config: DpoConfig,
}

impl Dpo {
    #[must_use]
    pub fn new(config: DpoConfig) -> Self {
        Self { config }
    }

    /// DPO over `length` periods.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] when `length` is zero.
    pub fn with_length(length: usize) -> Result<Self> {
        Ok(Self::new(DpoConfig::new(non_zero_length(length)?)))
    }

    #[must_use]
    pub fn config(&self) -> &DpoConfig {
        &self.config
    }
}

impl<In: Reusable> Indicator<In> for Dpo {
    type Output = DpoResult;

    #[inline]
    fn lookback(&self) -> usize {
        (self.config.length - 1).saturating_sub(self.config.offset())
    }

    #[inline]
    fn lookahead(&self) -> usize {
        self.config.offset()
    }

    fn compute(&self, inputs: &[In], _: &[DpoResult], index: usize) -> Result<DpoResult> {
        let length = self.config.length;
        let sma_index = index + self.config.offset();

        let sma = if sma_index < inputs.len() && sma_index + 1 >= length {
            mean(
                inputs[sma_index + 1 - length..=sma_index]
                    .iter()
                    .map(Reusable::value),
                length,
            )
        } else {
            None
        };

        let input = &inputs[index];
        Ok(DpoResult {
            timestamp: input.timestamp(),
            dpo: input.value().zip(sma).map(|(value, sma)| value - sma),
            sma,
        })
    }
}

impl Display for Dpo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DPO({})", self.config.length)
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::{
        BufferList, TimeValue, batch,
        test_util::{sample_values, tv},
    };

    fn dpo(length: usize) -> Dpo {
        Dpo::with_length(length).unwrap()
    }

    fn values(inputs: &[f64]) -> Vec<TimeValue> {
        inputs.iter().zip(1..).map(|(&v, t)| tv(t, v)).collect()
    }

    mod window {
        use super::*;

        #[test]
        fn lookahead_is_offset() {
            let dpo = dpo(20);
            assert_eq!(Indicator::<TimeValue>::lookahead(&dpo), 11);
            assert_eq!(Indicator::<TimeValue>::lookback(&dpo), 8);
        }

        #[test]
        fn short_length_has_no_lookback() {
            let dpo = dpo(2);
            // offset = 2
            assert_eq!(Indicator::<TimeValue>::lookahead(&dpo), 2);
            assert_eq!(Indicator::<TimeValue>::lookback(&dpo), 0);
        }
    }

    mod detrending {
        use super::*;

        #[test]
        fn trailing_offset_positions_are_empty() {
            let results = batch::compute(&values(&[1.0, 2.0, 3.0, 4.0, 5.0]), &dpo(3)).unwrap();
            assert!(results[..3].iter().all(|r| r.dpo.is_some()));
            assert_eq!(results[3].dpo, None);
            assert_eq!(results[4].dpo, None);
        }

        #[test]
        fn leading_positions_wait_for_full_sma() {
            // offset = 6 / 2 + 1 = 4, SMA(6) first defined at position 5
            let results = batch::compute(&values(&[1.0; 10]), &dpo(6)).unwrap();
            assert_eq!(results[0].dpo, None);
            assert_eq!(results[1].dpo, Some(0.0));
            assert_eq!(results[1].sma, Some(1.0));
        }

        #[test]
        fn linear_trend_is_constant() {
            let inputs: Vec<f64> = (0..12).map(f64::from).collect();
            let results = batch::compute(&values(&inputs), &dpo(5)).unwrap();
            // offset 3: SMA over (j−1..=j+3) is j+1
            let defined: Vec<_> = results.iter().filter_map(|r| r.dpo).collect();
            assert_eq!(defined.len(), 8);
            assert!(defined.iter().all(|&d| d == -1.0));
        }

        #[test]
        fn missing_value_in_sma_window() {
            let mut inputs = values(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
            inputs[2].value = None;
            let results = batch::compute(&inputs, &dpo(3)).unwrap();
            // SMA at position 2 covers the gap
            assert_eq!(results[0].sma, None);
            assert_eq!(results[2].dpo, None);
            assert_eq!(results[3].sma, Some(5.0));
        }
    }

    mod buffering {
        use super::*;

        #[test]
        fn appends_rewrite_trailing_results() {
            let mut buffer = BufferList::new(dpo(3));
            buffer.add_batch(values(&[1.0, 2.0, 3.0])).unwrap();
            assert_eq!(buffer.get(0).unwrap().dpo, Some(-1.0));
            assert_eq!(buffer.get(1).unwrap().dpo, None);

            buffer.add(tv(4, 4.0)).unwrap();
            assert_eq!(buffer.get(1).unwrap().dpo, Some(-1.0));
        }

        #[test]
        fn bounded_buffer_matches_batch() {
            let inputs = sample_values(60);
            let expected = batch::compute(&inputs, &dpo(14)).unwrap();

            let mut buffer = BufferList::new(dpo(14));
            buffer.add_batch(inputs).unwrap();

            assert_eq!(buffer.to_vec(), expected);
        }
    }

    mod config {
        use super::*;

        #[test]
        fn zero_length_rejected() {
            assert!(Dpo::with_length(0).is_err());
        }

        #[test]
        fn display() {
            assert_eq!(dpo(14).to_string(), "DPO(14)");
            assert_eq!(dpo(14).config().to_string(), "DpoConfig(14)");
        }
    }
}
