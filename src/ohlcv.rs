use crate::{Error, Reusable, Result, Series};

/// A price value.
///
/// Semantic alias for [`f64`]. Documents intent in function signatures
/// without introducing newtype construction overhead.
pub type Price = f64;

/// Bar open timestamp or sequence number.
///
/// Totally ordered key of every series handled by the crate. Within one
/// series timestamps are unique: two records sharing a timestamp are the
/// same logical position.
pub type Timestamp = u64;

/// OHLCV bar data accepted at the provider boundary.
///
/// Implement this on your own kline/candle type and feed it through
/// [`QuoteHub::add_ohlcv`](crate::QuoteHub::add_ohlcv) or
/// [`Quote::from_ohlcv`] to avoid hand-written conversions.
///
/// # Example
///
/// ```
/// use quantedge_hubs::{Ohlcv, Price, Timestamp};
///
/// struct MyKline {
///     o: f64, h: f64, l: f64, c: f64,
///     ts: u64,
/// }
///
/// impl Ohlcv for MyKline {
///     fn open(&self) -> Price { self.o }
///     fn high(&self) -> Price { self.h }
///     fn low(&self) -> Price { self.l }
///     fn close(&self) -> Price { self.c }
///     fn open_time(&self) -> Timestamp { self.ts }
/// }
/// ```
pub trait Ohlcv {
    /// Opening price of the bar.
    fn open(&self) -> Price;

    /// Highest price during the bar.
    fn high(&self) -> Price;

    /// Lowest price during the bar.
    fn low(&self) -> Price;

    /// Closing (or latest) price of the bar.
    fn close(&self) -> Price;

    /// Bar open timestamp or sequence number.
    fn open_time(&self) -> Timestamp;

    /// Trade volume during the bar. Defaults to `0.0`.
    fn volume(&self) -> f64 {
        0.0
    }
}

/// One immutable OHLCV bar, the source-of-truth unit of the engine.
///
/// Construction does not validate; every provider entry point calls
/// [`validate`](Quote::validate) before a quote reaches a cache.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Quote {
    pub timestamp: Timestamp,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: f64,
}

impl Quote {
    #[must_use]
    pub const fn new(
        timestamp: Timestamp,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Copies any [`Ohlcv`] bar into a validated quote.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuote`] when a price or the volume is not
    /// finite, or the volume is negative.
    pub fn from_ohlcv(bar: &impl Ohlcv) -> Result<Self> {
        let quote = Self::new(
            bar.open_time(),
            bar.open(),
            bar.high(),
            bar.low(),
            bar.close(),
            bar.volume(),
        );
        quote.validate()?;
        Ok(quote)
    }

    /// Checks that every numeric field is usable by the engine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuote`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ] {
            if !value.is_finite() || (field == "volume" && value < 0.0) {
                return Err(Error::InvalidQuote {
                    timestamp: self.timestamp,
                    field,
                    value,
                });
            }
        }

        Ok(())
    }
}

impl Ohlcv for Quote {
    #[inline]
    fn open(&self) -> Price {
        self.open
    }

    #[inline]
    fn high(&self) -> Price {
        self.high
    }

    #[inline]
    fn low(&self) -> Price {
        self.low
    }

    #[inline]
    fn close(&self) -> Price {
        self.close
    }

    #[inline]
    fn open_time(&self) -> Timestamp {
        self.timestamp
    }

    #[inline]
    fn volume(&self) -> f64 {
        self.volume
    }
}

impl Series for Quote {
    #[inline]
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// Quotes chain on their closing price.
impl Reusable for Quote {
    #[inline]
    fn value(&self) -> Option<f64> {
        Some(self.close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::Bar;

    mod validation {
        use super::*;

        #[test]
        fn accepts_finite_quote() {
            assert!(Quote::new(1, 10.0, 12.0, 9.0, 11.0, 100.0).validate().is_ok());
        }

        #[test]
        fn rejects_nan_close() {
            let err = Quote::new(3, 10.0, 12.0, 9.0, f64::NAN, 1.0)
                .validate()
                .unwrap_err();
            assert!(matches!(
                err,
                Error::InvalidQuote {
                    timestamp: 3,
                    field: "close",
                    ..
                }
            ));
        }

        #[test]
        fn rejects_infinite_high() {
            let err = Quote::new(1, 10.0, f64::INFINITY, 9.0, 11.0, 1.0)
                .validate()
                .unwrap_err();
            assert!(matches!(err, Error::InvalidQuote { field: "high", .. }));
        }

        #[test]
        fn rejects_negative_volume() {
            let err = Quote::new(1, 10.0, 12.0, 9.0, 11.0, -1.0)
                .validate()
                .unwrap_err();
            assert!(matches!(err, Error::InvalidQuote { field: "volume", .. }));
        }
    }

    mod conversion {
        use super::*;

        #[test]
        fn from_ohlcv_copies_fields() {
            let bar = Bar::new(10.0, 30.0, 5.0, 20.0).at(42);
            let quote = Quote::from_ohlcv(&bar).unwrap();
            assert_eq!(quote, Quote::new(42, 10.0, 30.0, 5.0, 20.0, 0.0));
        }

        #[test]
        fn from_ohlcv_validates() {
            let bar = Bar::new(10.0, 30.0, f64::NAN, 20.0).at(1);
            assert!(Quote::from_ohlcv(&bar).is_err());
        }

        #[test]
        fn chains_on_close() {
            let quote = Quote::new(5, 1.0, 4.0, 0.5, 3.0, 10.0);
            assert_eq!(quote.timestamp(), 5);
            assert_eq!(quote.value(), Some(3.0));
        }
    }
}
