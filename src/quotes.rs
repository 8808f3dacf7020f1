//! Quote list helpers for the batch side.

use std::num::NonZero;

use crate::{Error, Quote, Result, Timestamp, validate_order};

/// Validates every quote and returns them sorted by timestamp.
///
/// # Errors
///
/// [`Error::InvalidQuote`] for a malformed quote,
/// [`Error::DuplicateTimestamp`] when two quotes share a timestamp.
pub fn prepare(quotes: impl IntoIterator<Item = Quote>) -> Result<Vec<Quote>> {
    let mut quotes: Vec<Quote> = quotes.into_iter().collect();
    for quote in &quotes {
        quote.validate()?;
    }

    quotes.sort_by_key(|q| q.timestamp);
    if let Some(pair) = quotes.windows(2).find(|p| p[0].timestamp == p[1].timestamp) {
        return Err(Error::DuplicateTimestamp(pair[1].timestamp));
    }

    Ok(quotes)
}

/// Quantizes sorted quotes into bars of `period` timestamp units.
///
/// Each output bar is stamped at the start of its period, with the first
/// open, highest high, lowest low, last close and summed volume of the
/// quotes it covers. Empty periods produce no bar.
///
/// # Errors
///
/// Fails when the quotes are not strictly increasing.
///
/// # Example
///
/// ```
/// use quantedge_hubs::{Quote, quotes};
/// use std::num::NonZero;
///
/// let minute = [
///     Quote::new(0, 10.0, 12.0, 9.0, 11.0, 1.0),
///     Quote::new(60, 11.0, 15.0, 10.0, 14.0, 2.0),
///     Quote::new(120, 14.0, 14.5, 13.0, 13.5, 3.0),
/// ];
///
/// let bars = quotes::aggregate(&minute, NonZero::new(120).unwrap()).unwrap();
///
/// assert_eq!(bars[0], Quote::new(0, 10.0, 15.0, 9.0, 14.0, 3.0));
/// assert_eq!(bars[1], Quote::new(120, 14.0, 14.5, 13.0, 13.5, 3.0));
/// ```
pub fn aggregate(quotes: &[Quote], period: NonZero<Timestamp>) -> Result<Vec<Quote>> {
    validate_order(quotes)?;

    let period = period.get();
    let mut bars: Vec<Quote> = Vec::new();

    for quote in quotes {
        let start = quote.timestamp - quote.timestamp % period;
        match bars.last_mut() {
            Some(bar) if bar.timestamp == start => {
                bar.high = bar.high.max(quote.high);
                bar.low = bar.low.min(quote.low);
                bar.close = quote.close;
                bar.volume += quote.volume;
            }
            _ => bars.push(Quote {
                timestamp: start,
                ..*quote
            }),
        }
    }

    Ok(bars)
}
