use std::{collections::VecDeque, num::NonZero};

use crate::{Error, Indicator, Result, Series, Timestamp};

/// Default upper bound on retained results.
pub const DEFAULT_MAX_SIZE: usize = (i32::MAX as usize) / 10 * 9;

/// Bounded, append-only incremental computation of one indicator.
///
/// Each [`add`](BufferList::add) computes the new result from a trailing
/// window of `lookback + lookahead + 1` inputs and their results, so memory
/// stays bounded by that window plus the retained results. Once more than
/// `max_size` results are held, the oldest are dropped.
///
/// Because smoothing state is carried by result records and the window keeps
/// the records compute reads, pruning old results never changes newer ones:
/// the retained tail always equals the tail of the batch computation over
/// every input seen since the last [`clear`](BufferList::clear).
///
/// Inputs must arrive in strictly increasing timestamp order; late arrivals,
/// updates and deletions need a [`StreamHub`](crate::StreamHub).
///
/// # Example
///
/// ```
/// use quantedge_hubs::{BufferList, Sma, TimeValue};
/// use std::num::NonZero;
///
/// let sma = Sma::with_length(3).unwrap();
/// let mut buffer = BufferList::with_max_size(sma, NonZero::new(2).unwrap());
///
/// for t in 1..=4 {
///     buffer.add(TimeValue::new(t, Some(t as f64))).unwrap();
/// }
///
/// assert_eq!(buffer.len(), 2);
/// assert_eq!(buffer.last().unwrap().value, Some(3.0));
/// ```
pub struct BufferList<In, I: Indicator<In>> {
    indicator: I,
    max_size: usize,
    last_timestamp: Option<Timestamp>,
    /// Trailing inputs compute may still read.
    inputs: VecDeque<In>,
    /// Results aligned with `inputs`.
    window: VecDeque<I::Output>,
    results: VecDeque<I::Output>,
}

impl<In, I> BufferList<In, I>
where
    In: Series,
    I: Indicator<In>,
{
    #[must_use]
    pub fn new(indicator: I) -> Self {
        Self::with_bound(indicator, DEFAULT_MAX_SIZE)
    }

    /// A buffer retaining at most `max_size` results.
    #[must_use]
    pub fn with_max_size(indicator: I, max_size: NonZero<usize>) -> Self {
        Self::with_bound(indicator, max_size.get())
    }

    fn with_bound(indicator: I, max_size: usize) -> Self {
        let span = indicator.lookback() + indicator.lookahead() + 1;
        Self {
            indicator,
            max_size,
            last_timestamp: None,
            inputs: VecDeque::with_capacity(span),
            window: VecDeque::with_capacity(span),
            results: VecDeque::new(),
        }
    }

    /// Appends one input and returns its result.
    ///
    /// With a lookahead indicator, the results of the trailing `lookahead`
    /// positions are recomputed and replaced as well.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateTimestamp`] or [`Error::UnsortedSeries`] for an
    /// input not newer than the previous one, or a compute error. The buffer
    /// is unchanged on error.
    pub fn add(&mut self, item: In) -> Result<&I::Output> {
        let timestamp = item.timestamp();
        if let Some(previous) = self.last_timestamp {
            if timestamp == previous {
                return Err(Error::DuplicateTimestamp(timestamp));
            }
            if timestamp < previous {
                return Err(Error::UnsortedSeries {
                    timestamp,
                    previous,
                });
            }
        }

        self.inputs.push_back(item);
        let index = self.inputs.len() - 1;
        let from = index.saturating_sub(self.indicator.lookahead());

        let replaced = self.window.split_off(from);
        let inputs = self.inputs.make_contiguous();
        for position in from..=index {
            match self
                .indicator
                .compute(inputs, self.window.make_contiguous(), position)
            {
                Ok(result) => self.window.push_back(result),
                Err(error) => {
                    self.window.truncate(from);
                    self.window.extend(replaced);
                    self.inputs.pop_back();
                    return Err(error);
                }
            }
        }

        self.last_timestamp = Some(timestamp);

        let replaced = replaced.len().min(self.results.len());
        self.results.truncate(self.results.len() - replaced);
        self.results.extend(self.window.range(from..).cloned());

        // keep the span - 1 inputs the next add reads
        let span = self.indicator.lookback() + self.indicator.lookahead() + 1;
        while self.inputs.len() >= span {
            self.inputs.pop_front();
            self.window.pop_front();
        }

        if self.results.len() > self.max_size {
            let excess = self.results.len() - self.max_size;
            self.results.drain(..excess);
        }

        self.results.back().ok_or_else(|| Error::Compute {
            index,
            reason: "no result retained".to_string(),
        })
    }

    /// Appends every input in order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing input; earlier inputs stay applied.
    pub fn add_batch(&mut self, items: impl IntoIterator<Item = In>) -> Result<()> {
        for item in items {
            self.add(item)?;
        }

        Ok(())
    }

    /// Discards every input and result.
    pub fn clear(&mut self) {
        self.last_timestamp = None;
        self.inputs.clear();
        self.window.clear();
        self.results.clear();
    }

    pub fn results(&self) -> impl ExactSizeIterator<Item = &I::Output> + DoubleEndedIterator {
        self.results.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&I::Output> {
        self.results.get(index)
    }

    #[must_use]
    pub fn last(&self) -> Option<&I::Output> {
        self.results.back()
    }

    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    #[must_use]
    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<I::Output> {
        self.results.iter().cloned().collect()
    }
}
