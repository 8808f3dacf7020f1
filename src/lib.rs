//! Technical indicators computed three ways from one formula: over a full
//! series ([`batch`]), incrementally into a bounded buffer ([`BufferList`]),
//! and as reactive stages ([`StreamHub`]) chained to a mutable quote
//! provider ([`QuoteHub`]).
//!
//! Every indicator implements the pure [`Indicator`] compute contract, so
//! after any sequence of quote additions, late arrivals, updates and
//! deletions, each stage of a chain holds exactly what the batch
//! computation over the current quotes would produce.
//!
//! Results are `None` inside the warm-up period. Each indicator type
//! ([`Sma`], [`Ema`], [`Bb`], [`Rsi`], [`Dema`], [`Dpo`]) exposes a
//! [`batch`](Sma::batch) inherent method, so no trait import is needed
//! for one-off computations.
//!
//! # Example
//!
//! ```
//! use quantedge_hubs::{Chain, Ema, Quote, QuoteHub, Sma, batch};
//!
//! let quotes = QuoteHub::new();
//! let sma = quotes.chain(Sma::with_length(3).unwrap()).unwrap();
//! let ema = sma.chain(Ema::with_length(2).unwrap()).unwrap();
//!
//! for (t, close) in [(1, 10.0), (2, 11.0), (4, 13.0), (5, 12.0)] {
//!     quotes.add(Quote::new(t, close, close, close, close, 1.0)).unwrap();
//! }
//!
//! // A late quote re-derives every later result down the chain.
//! quotes.add(Quote::new(3, 12.0, 12.0, 12.0, 12.0, 1.0)).unwrap();
//!
//! let expected = batch::compute(&*sma.results(), &Ema::with_length(2).unwrap()).unwrap();
//! assert_eq!(&*ema.results(), expected.as_slice());
//! assert_eq!(sma.results()[2].value, Some(11.0));
//! ```

mod action;
pub mod batch;
mod bb;
mod buffer;
mod dema;
mod dpo;
mod ema;
mod error;
mod indicator;
mod observer;
mod ohlcv;
mod price_source;
mod quote_hub;
mod quote_part;
pub mod quotes;
mod rsi;
mod series;
mod sma;
mod stream_hub;

pub use crate::action::{Action, Mutation, Revision};
pub use crate::buffer::{BufferList, DEFAULT_MAX_SIZE};
pub use crate::error::{Error, Result};
pub use crate::indicator::{Indicator, IndicatorConfig, IndicatorConfigBuilder};
pub use crate::observer::{Callback, Publisher, Subscriber};
pub use crate::ohlcv::{Ohlcv, Price, Quote, Timestamp};
pub use crate::price_source::PriceSource;
pub use crate::quote_hub::QuoteHub;
pub use crate::series::{Reusable, Series, SeriesSlice, TimeValue, sync_to, validate_order};
pub use crate::stream_hub::{Chain, StreamHub};

pub use crate::bb::{Bb, BbConfig, BbConfigBuilder, BbResult, StdDev};
pub use crate::dema::{Dema, DemaConfig, DemaConfigBuilder, DemaResult};
pub use crate::dpo::{Dpo, DpoConfig, DpoConfigBuilder, DpoResult};
pub use crate::ema::{Ema, EmaConfig, EmaConfigBuilder, EmaResult};
pub use crate::quote_part::QuotePart;
pub use crate::rsi::{Rsi, RsiConfig, RsiConfigBuilder, RsiResult};
pub use crate::sma::{Sma, SmaConfig, SmaConfigBuilder};

macro_rules! impl_indicator_methods {
    ($type:ty, $output:ty) => {
        impl $type {
            /// See [`batch::compute`].
            ///
            /// # Errors
            ///
            /// Fails when `inputs` are not strictly increasing by timestamp.
            #[inline]
            pub fn batch<In: Reusable>(&self, inputs: &[In]) -> Result<Vec<$output>> {
                batch::compute(inputs, self)
            }
        }
    };
}

impl_indicator_methods!(Sma, TimeValue);
impl_indicator_methods!(Ema, EmaResult);
impl_indicator_methods!(Bb, BbResult);
impl_indicator_methods!(Rsi, RsiResult);
impl_indicator_methods!(Dema, DemaResult);
impl_indicator_methods!(Dpo, DpoResult);

#[cfg(test)]
mod test_util;
