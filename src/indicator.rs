use crate::{Result, Series};

use std::{
    fmt::{Debug, Display},
    hash::Hash,
    num::NonZero,
};

/// Configuration for an [`Indicator`].
///
/// Every indicator has a corresponding config type that holds its parameters
/// (length, multipliers, etc). Configs are value types: cheap to clone,
/// compare, and hash, and always valid once built.
pub trait IndicatorConfig: Sized + PartialEq + Eq + Hash + Display + Debug {
    /// Builder type for constructing this config.
    type Builder: IndicatorConfigBuilder<Self>;

    /// Returns a new builder with default values.
    fn builder() -> Self::Builder;

    /// Window length (number of periods).
    fn length(&self) -> usize;
}

/// Builder for an [`IndicatorConfig`].
pub trait IndicatorConfigBuilder<Config>
where
    Config: IndicatorConfig,
{
    /// Sets the indicator window length.
    #[must_use]
    fn length(self, length: NonZero<usize>) -> Self;

    /// Builds the config.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`](crate::Error::InvalidParameter)
    /// when a required field is missing or parameters contradict each other.
    fn build(self) -> Result<Config>;
}

/// The compute contract shared by the batch engine, stream hubs and bounded
/// buffers.
///
/// [`compute`](Indicator::compute) is a pure function of the materialized
/// inputs and of the results already produced for earlier positions. Any
/// smoothing state an indicator carries from one period to the next lives in
/// its result records, so the three computation modes cannot drift apart.
///
/// # Contract
///
/// When `compute(inputs, results, index)` is called:
///
/// - `results.len() == index`, and `results[j]` is the settled result for
///   `inputs[j]`;
/// - compute reads inputs no earlier than `index - lookback()` and no later
///   than `index + lookahead()` (when present; positions past
///   `inputs.len()` are not yet known);
/// - compute reads results no earlier than `index - lookback()`.
///
/// Bounded buffers only retain `lookback() + lookahead() + 1` inputs, so
/// positions are relative to the retained window there: warm-up must be
/// decided from `index` against values not exceeding the lookback, or from
/// the state carried by the previous result, never from an absolute count.
///
/// # Example
///
/// ```
/// use quantedge_hubs::{Sma, TimeValue, batch};
///
/// let values: Vec<TimeValue> = [10.0, 20.0, 30.0]
///     .iter()
///     .zip(1..)
///     .map(|(&v, t)| TimeValue::new(t, Some(v)))
///     .collect();
///
/// let sma = Sma::with_length(3).unwrap();
/// let results = batch::compute(&values, &sma).unwrap();
///
/// assert_eq!(results[1].value, None);
/// assert_eq!(results[2].value, Some(20.0));
/// ```
pub trait Indicator<In>: Display {
    /// Result record produced for each input position.
    type Output: Series + Clone + PartialEq + Debug;

    /// How many positions before `index` compute may read.
    fn lookback(&self) -> usize;

    /// How many positions after `index` compute may read. Appending an input
    /// changes the results of the trailing `lookahead()` positions.
    fn lookahead(&self) -> usize {
        0
    }

    /// Number of leading results inside the warm-up period, removed by
    /// [`batch::remove_warmup`](crate::batch::remove_warmup).
    fn warmup_periods(&self) -> usize {
        self.lookback()
    }

    /// Computes the result for `inputs[index]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Compute`](crate::Error::Compute) when the formula
    /// cannot produce a record for this position.
    fn compute(&self, inputs: &[In], results: &[Self::Output], index: usize)
    -> Result<Self::Output>;
}

/// Resolves a raw length into the [`NonZero`] a config builder expects.
pub(crate) fn non_zero_length(length: usize) -> Result<NonZero<usize>> {
    NonZero::new(length)
        .ok_or_else(|| crate::Error::invalid_parameter("length", "must be greater than 0"))
}

/// Mean of `values`, or `None` if any value is missing.
#[inline]
#[allow(clippy::cast_precision_loss)]
pub(crate) fn mean(values: impl Iterator<Item = Option<f64>>, length: usize) -> Option<f64> {
    values.sum::<Option<f64>>().map(|sum| sum / length as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn zero_length_is_rejected() {
        assert!(matches!(
            non_zero_length(0),
            Err(Error::InvalidParameter { name: "length", .. })
        ));
    }

    #[test]
    fn mean_of_full_window() {
        let window = [Some(1.0), Some(2.0), Some(6.0)];
        assert_eq!(mean(window.into_iter(), 3), Some(3.0));
    }

    #[test]
    fn mean_with_gap_is_none() {
        let window = [Some(1.0), None, Some(6.0)];
        assert_eq!(mean(window.into_iter(), 3), None);
    }
}
