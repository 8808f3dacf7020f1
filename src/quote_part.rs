use std::fmt::Display;

use crate::{Indicator, Ohlcv, PriceSource, Result, Series, TimeValue};

/// Extracts one candle part from each quote as a reusable value.
///
/// Chains on quotes use the closing price; put a `QuotePart` in front of an
/// indicator to feed it any other part instead.
///
/// # Example
///
/// ```
/// use quantedge_hubs::{Chain, PriceSource, Quote, QuoteHub, QuotePart, Sma};
///
/// let quotes = QuoteHub::new();
/// let hl2 = quotes.chain(QuotePart::new(PriceSource::HL2)).unwrap();
/// let sma = hl2.chain(Sma::with_length(2).unwrap()).unwrap();
///
/// quotes.add(Quote::new(1, 10.0, 12.0, 8.0, 11.0, 1.0)).unwrap();
/// quotes.add(Quote::new(2, 11.0, 16.0, 10.0, 15.0, 1.0)).unwrap();
///
/// assert_eq!(hl2.results()[1].value, Some(13.0));
/// assert_eq!(sma.results()[1].value, Some(11.5));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct QuotePart {
    source: PriceSource,
}

impl QuotePart {
    #[must_use]
    pub fn new(source: PriceSource) -> Self {
        Self { source }
    }

    #[must_use]
    pub fn source(&self) -> PriceSource {
        self.source
    }
}

impl<In: Ohlcv + Series> Indicator<In> for QuotePart {
    type Output = TimeValue;

    /// True range reads the previous close.
    #[inline]
    fn lookback(&self) -> usize {
        usize::from(self.source == PriceSource::TrueRange)
    }

    fn warmup_periods(&self) -> usize {
        0
    }

    #[inline]
    fn compute(&self, inputs: &[In], _: &[TimeValue], index: usize) -> Result<TimeValue> {
        let prev_close = index.checked_sub(1).map(|i| inputs[i].close());
        let value = self.source.extract(&inputs[index], prev_close);

        Ok(TimeValue::new(inputs[index].timestamp(), Some(value)))
    }
}

impl Display for QuotePart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "QUOTEPART({})", self.source)
    }
}
