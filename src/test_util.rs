// src/test_util.rs

use crate::{Ohlcv, Price, Quote, TimeValue, Timestamp};

/// Asserts that two `f64` values are approximately equal using a
/// relative epsilon of `4 * f64::EPSILON`.
macro_rules! assert_approx {
    ($actual:expr, $expected:expr) => {{
        let (a, e) = ($actual, $expected);
        assert!(
            (a - e).abs() <= e.abs() * 4.0 * f64::EPSILON,
            "assert_approx failed: actual={a}, expected={e}, diff={}",
            (a - e).abs(),
        );
    }};
}

pub(crate) use assert_approx;

pub struct Bar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub open_time: u64,
}

impl Bar {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
            open_time: 0,
        }
    }

    pub fn at(mut self, open_time: u64) -> Self {
        self.open_time = open_time;
        self
    }
}

impl Ohlcv for Bar {
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
}

/// Quote with OHLC all equal to `close`.
pub fn quote(close: f64, timestamp: Timestamp) -> Quote {
    Quote::new(timestamp, close, close, close, close, 1.0)
}

/// Flat quotes stamped 1, 2, 3, ...
pub fn quotes(closes: &[f64]) -> Vec<Quote> {
    closes.iter().zip(1..).map(|(&c, t)| quote(c, t)).collect()
}

pub fn tv(timestamp: Timestamp, value: f64) -> TimeValue {
    TimeValue::new(timestamp, Some(value))
}

/// Deterministic wavy quotes stamped 1, 2, 3, ... with distinct OHLC parts.
#[allow(clippy::cast_precision_loss)]
pub fn sample_quotes(count: usize) -> Vec<Quote> {
    (0..count)
        .map(|i| {
            let x = i as f64;
            let close = 100.0 + 8.0 * (x * 0.35).sin() + 3.0 * (x * 1.7).cos() + x * 0.1;
            let open = close - 1.5 * (x * 0.9).sin();
            let high = open.max(close) + 0.5 + (x * 0.4).cos().abs();
            let low = open.min(close) - 0.5 - (x * 0.6).sin().abs();
            Quote::new(i as u64 + 1, open, high, low, close, 1_000.0 + 10.0 * x)
        })
        .collect()
}

/// Closing prices of [`sample_quotes`] as reusable values.
pub fn sample_values(count: usize) -> Vec<TimeValue> {
    sample_quotes(count)
        .iter()
        .map(|q| TimeValue::new(q.timestamp, Some(q.close)))
        .collect()
}
