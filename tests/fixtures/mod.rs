#![allow(dead_code)]

use quantedge_hubs::{
    Indicator, Ohlcv, Price, Publisher, Quote, QuoteHub, Reusable, Series, Timestamp, batch,
};
use serde::{Deserialize, de::DeserializeOwned};

/// OHLCV bar parsed from Binance CSV.
#[derive(Debug, Clone, Deserialize)]
pub struct RefBar {
    pub open_time: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Ohlcv for RefBar {
    fn open(&self) -> Price {
        self.open
    }

    fn high(&self) -> Price {
        self.high
    }

    fn low(&self) -> Price {
        self.low
    }

    fn close(&self) -> Price {
        self.close
    }

    fn open_time(&self) -> Timestamp {
        self.open_time
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

const OHLCV_PATH: &str = "tests/fixtures/data/btcusdt-1h.csv";

/// Load hourly OHLCV bars.
pub fn load_reference_ohlcvs() -> Vec<RefBar> {
    load_records(OHLCV_PATH, "invalid OHLCV record")
}

/// Hourly bars as validated quotes.
pub fn load_quotes() -> Vec<Quote> {
    load_reference_ohlcvs()
        .iter()
        .map(|bar| Quote::from_ohlcv(bar).expect("fixture bars are finite"))
        .collect()
}

/// Creates perturbed versions of a quote to simulate live repaints.
///
/// Returns 2 intermediate quotes (with shifted close/high/low) followed
/// by the original quote. All share the same timestamp.
pub fn repaint_sequence(quote: &Quote) -> Vec<Quote> {
    vec![
        // First tick: only open is known, close near open
        Quote {
            high: quote.open * 1.001,
            low: quote.open * 0.999,
            close: quote.open * 1.0005,
            volume: quote.volume - 2.0,
            ..*quote
        },
        // Mid-bar: partial movement toward final values
        Quote {
            high: quote.open.midpoint(quote.high),
            low: quote.open.midpoint(quote.low),
            close: quote.open.midpoint(quote.close),
            volume: quote.volume - 1.0,
            ..*quote
        },
        // Final: real OHLCV values
        *quote,
    ]
}

/// Ways of feeding the same final quote set to a provider.
#[derive(Debug, Clone, Copy)]
pub enum Scenario {
    /// Every quote appended in time order.
    InOrder,
    /// One quote withheld, then inserted late.
    LateArrival,
    /// A close revised, then restored.
    Revision,
    /// A quote deleted, then added back.
    DeleteAndReAdd,
    /// Each quote painted through intermediate ticks.
    Repaint,
    /// Quotes arriving in interleaved blocks, most of them late.
    Interleaved,
}

impl Scenario {
    /// Feeds `quotes` to `hub`, ending with exactly `quotes` cached.
    pub fn play(self, hub: &QuoteHub, quotes: &[Quote]) {
        match self {
            Self::InOrder => add_all(hub, quotes),
            Self::LateArrival => {
                let late = quotes.len() / 2;
                for (i, quote) in quotes.iter().enumerate() {
                    if i != late {
                        hub.add(*quote).unwrap();
                    }
                }
                hub.insert(quotes[late]).unwrap();
            }
            Self::Revision => {
                add_all(hub, quotes);
                let original = quotes[quotes.len() * 2 / 3];
                hub.add(Quote {
                    close: original.close * 1.01,
                    ..original
                })
                .unwrap();
                hub.add(original).unwrap();
            }
            Self::DeleteAndReAdd => {
                add_all(hub, quotes);
                let removed = hub.remove(quotes[quotes.len() / 4].timestamp).unwrap();
                hub.add(removed).unwrap();
            }
            Self::Repaint => {
                for quote in quotes {
                    for tick in repaint_sequence(quote) {
                        hub.add(tick).unwrap();
                    }
                }
            }
            Self::Interleaved => {
                for offset in (0..4).rev() {
                    for quote in quotes.iter().skip(offset).step_by(4) {
                        hub.add(*quote).unwrap();
                    }
                }
            }
        }
    }
}

fn add_all(hub: &QuoteHub, quotes: &[Quote]) {
    for quote in quotes {
        hub.add(*quote).unwrap();
    }
}

/// Asserts a stage holds exactly the batch results over its upstream.
pub fn assert_matches_batch<In, I, P>(stage: &P, upstream: &[In], indicator: &I)
where
    In: Series,
    I: Indicator<In>,
    P: Publisher<Item = I::Output> + ?Sized,
{
    let expected = batch::compute(upstream, indicator).unwrap();
    let actual = stage.results();

    assert_eq!(actual.len(), expected.len(), "{stage}: length mismatch");
    for (i, (a, e)) in actual.iter().zip(&expected).enumerate() {
        assert_eq!(a, e, "{stage}: diverged at #{i} (t={})", e.timestamp());
    }
}

/// Assert two f64 values are within tolerance.
pub fn assert_near(actual: f64, expected: f64, tolerance: f64, context: &str) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "{context}: expected {expected:.10}, got {actual:.10}, diff {diff:.2e} > tolerance {tolerance:.2e}"
    );
}

/// Values published by a reusable series.
pub fn values<T: Reusable>(series: &[T]) -> Vec<Option<f64>> {
    series.iter().map(Reusable::value).collect()
}

fn load_records<D>(path: &str, expect_msg: &str) -> Vec<D>
where
    D: DeserializeOwned,
{
    let mut rdr =
        csv::Reader::from_path(path).unwrap_or_else(|e| panic!("failed to open {path}: {e}"));

    rdr.deserialize().map(|r| r.expect(expect_msg)).collect()
}
