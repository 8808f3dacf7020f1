//! One-shot computation over a complete series.
//!
//! The batch engine is the reference the incremental modes are held to: a
//! [`StreamHub`](crate::StreamHub) or [`BufferList`](crate::BufferList) fed
//! the same series produces exactly these results.

use crate::{Indicator, Result, Series, validate_order};

/// Computes `indicator` over a complete, time-sorted series.
///
/// The output has one record per input, including the warm-up positions
/// (which carry no value). Short inputs are not an error.
///
/// # Errors
///
/// [`Error::DuplicateTimestamp`](crate::Error::DuplicateTimestamp) or
/// [`Error::UnsortedSeries`](crate::Error::UnsortedSeries) for an input that
/// is not strictly increasing, or a compute error.
pub fn compute<In, I>(inputs: &[In], indicator: &I) -> Result<Vec<I::Output>>
where
    In: Series,
    I: Indicator<In> + ?Sized,
{
    validate_order(inputs)?;

    let mut results = Vec::with_capacity(inputs.len());
    for index in 0..inputs.len() {
        let result = indicator.compute(inputs, &results, index)?;
        results.push(result);
    }

    Ok(results)
}

/// Drops the first `periods` results, typically
/// [`Indicator::warmup_periods`].
#[must_use]
pub fn remove_warmup<T: Clone>(results: &[T], periods: usize) -> Vec<T> {
    results.get(periods..).map_or_else(Vec::new, <[T]>::to_vec)
}
