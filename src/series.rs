use crate::{Error, Result, Timestamp};

/// A time-stamped record of an ordered series.
pub trait Series {
    fn timestamp(&self) -> Timestamp;
}

/// A record exposing one numeric value, the interchange shape between
/// chained stages.
///
/// `None` marks a position inside a warm-up period (or one that could not be
/// computed from its inputs).
pub trait Reusable: Series {
    fn value(&self) -> Option<f64>;
}

/// The minimal reusable record: a timestamp and a value.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct TimeValue {
    pub timestamp: Timestamp,
    pub value: Option<f64>,
}

impl TimeValue {
    #[must_use]
    pub const fn new(timestamp: Timestamp, value: Option<f64>) -> Self {
        Self { timestamp, value }
    }
}

impl Series for TimeValue {
    #[inline]
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl Reusable for TimeValue {
    #[inline]
    fn value(&self) -> Option<f64> {
        self.value
    }
}

/// Binary-search lookups over a series sorted by strictly increasing
/// timestamps.
pub trait SeriesSlice<T> {
    /// Position of `timestamp`, or `None` when it is not in the series.
    fn try_index_of(&self, timestamp: Timestamp) -> Option<usize>;

    /// Position of `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimestampNotFound`] when it is not in the series.
    fn index_of(&self, timestamp: Timestamp) -> Result<usize>;

    /// Position of the first record at or after `timestamp`.
    fn index_gte(&self, timestamp: Timestamp) -> Option<usize>;

    /// Position where a record with `timestamp` belongs, equal to the length
    /// of the series when every record is older.
    fn insertion_point(&self, timestamp: Timestamp) -> usize;

    /// Position of a record equal to `record`, matched by timestamp first.
    fn position_of(&self, record: &T) -> Option<usize>
    where
        T: PartialEq;
}

impl<T: Series> SeriesSlice<T> for [T] {
    #[inline]
    fn try_index_of(&self, timestamp: Timestamp) -> Option<usize> {
        self.binary_search_by_key(&timestamp, Series::timestamp).ok()
    }

    #[inline]
    fn index_of(&self, timestamp: Timestamp) -> Result<usize> {
        self.try_index_of(timestamp)
            .ok_or(Error::TimestampNotFound(timestamp))
    }

    #[inline]
    fn index_gte(&self, timestamp: Timestamp) -> Option<usize> {
        let index = self.insertion_point(timestamp);
        (index < self.len()).then_some(index)
    }

    #[inline]
    fn insertion_point(&self, timestamp: Timestamp) -> usize {
        self.partition_point(|r| r.timestamp() < timestamp)
    }

    fn position_of(&self, record: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.try_index_of(record.timestamp())
            .filter(|&i| self[i] == *record)
    }
}

/// Checks that timestamps strictly increase.
///
/// # Errors
///
/// [`Error::DuplicateTimestamp`] for a repeated timestamp,
/// [`Error::UnsortedSeries`] for a decreasing one.
pub fn validate_order<T: Series>(series: &[T]) -> Result<()> {
    for pair in series.windows(2) {
        let (previous, timestamp) = (pair[0].timestamp(), pair[1].timestamp());
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

    Ok(())
}

/// Aligns `series` onto a grid of `timestamps`.
///
/// Records whose timestamp is on the grid are kept, records off the grid
/// are dropped, and grid positions without a record are filled with
/// `fill(timestamp)`. The output has exactly one record per grid timestamp.
///
/// # Errors
///
/// Fails when either `series` or `timestamps` is not strictly increasing.
///
/// # Example
///
/// ```
/// use quantedge_hubs::{TimeValue, sync_to};
///
/// let series = [TimeValue::new(1, Some(1.0)), TimeValue::new(3, Some(3.0))];
/// let synced = sync_to(&series, &[1, 2, 3], |t| TimeValue::new(t, None)).unwrap();
///
/// assert_eq!(synced[1], TimeValue::new(2, None));
/// assert_eq!(synced[2].value, Some(3.0));
/// ```
pub fn sync_to<T, F>(series: &[T], timestamps: &[Timestamp], mut fill: F) -> Result<Vec<T>>
where
    T: Series + Clone,
    F: FnMut(Timestamp) -> T,
{
    validate_order(series)?;
    if let Some(pair) = timestamps.windows(2).find(|p| p[1] <= p[0]) {
        return Err(if pair[0] == pair[1] {
            Error::DuplicateTimestamp(pair[1])
        } else {
            Error::UnsortedSeries {
                timestamp: pair[1],
                previous: pair[0],
            }
        });
    }

    let mut records = series.iter().peekable();
    let mut synced = Vec::with_capacity(timestamps.len());

    for &timestamp in timestamps {
        while records.next_if(|r| r.timestamp() < timestamp).is_some() {}

        match records.next_if(|r| r.timestamp() == timestamp) {
            Some(record) => synced.push(record.clone()),
            None => synced.push(fill(timestamp)),
        }
    }

    Ok(synced)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tv(timestamp: Timestamp, value: f64) -> TimeValue {
        TimeValue::new(timestamp, Some(value))
    }

    fn series() -> Vec<TimeValue> {
        vec![tv(10, 1.0), tv(20, 2.0), tv(30, 3.0), tv(40, 4.0)]
    }

    mod lookups {
        use super::*;

        #[test]
        fn index_of_existing() {
            assert_eq!(series().index_of(30), Ok(2));
        }

        #[test]
        fn index_of_missing_is_an_error() {
            assert_eq!(series().index_of(25), Err(Error::TimestampNotFound(25)));
        }

        #[test]
        fn try_index_of_missing_is_none() {
            assert_eq!(series().try_index_of(5), None);
        }

        #[test]
        fn index_gte_between_records() {
            assert_eq!(series().index_gte(15), Some(1));
            assert_eq!(series().index_gte(20), Some(1));
        }

        #[test]
        fn index_gte_past_the_end() {
            assert_eq!(series().index_gte(41), None);
        }

        #[test]
        fn insertion_point_past_the_end_is_len() {
            assert_eq!(series().insertion_point(99), 4);
            assert_eq!(series().insertion_point(0), 0);
        }

        #[test]
        fn position_of_requires_equal_record() {
            let s = series();
            assert_eq!(s.position_of(&tv(20, 2.0)), Some(1));
            assert_eq!(s.position_of(&tv(20, 2.5)), None);
        }

        #[test]
        fn empty_series() {
            let empty: Vec<TimeValue> = Vec::new();
            assert_eq!(empty.try_index_of(1), None);
            assert_eq!(empty.index_gte(1), None);
            assert_eq!(empty.insertion_point(1), 0);
        }
    }

    mod ordering {
        use super::*;

        #[test]
        fn sorted_series_is_valid() {
            assert!(validate_order(&series()).is_ok());
        }

        #[test]
        fn duplicate_detected() {
            let s = [tv(1, 1.0), tv(2, 1.0), tv(2, 3.0)];
            assert_eq!(validate_order(&s), Err(Error::DuplicateTimestamp(2)));
        }

        #[test]
        fn decreasing_detected() {
            let s = [tv(5, 1.0), tv(3, 1.0)];
            assert_eq!(
                validate_order(&s),
                Err(Error::UnsortedSeries {
                    timestamp: 3,
                    previous: 5
                })
            );
        }
    }

    mod sync {
        use super::*;

        #[test]
        fn fills_gaps_with_factory() {
            let synced = sync_to(&series(), &[10, 15, 20], |t| TimeValue::new(t, None)).unwrap();
            assert_eq!(synced, vec![tv(10, 1.0), TimeValue::new(15, None), tv(20, 2.0)]);
        }

        #[test]
        fn drops_records_off_the_grid() {
            let synced = sync_to(&series(), &[20, 40], |t| TimeValue::new(t, None)).unwrap();
            assert_eq!(synced, vec![tv(20, 2.0), tv(40, 4.0)]);
        }

        #[test]
        fn factory_sees_each_gap_once() {
            let mut gaps = Vec::new();
            let _ = sync_to(&series(), &[5, 10, 35, 50], |t| {
                gaps.push(t);
                TimeValue::new(t, None)
            })
            .unwrap();
            assert_eq!(gaps, vec![5, 35, 50]);
        }

        #[test]
        fn rejects_unsorted_grid() {
            assert!(sync_to(&series(), &[20, 10], |t| TimeValue::new(t, None)).is_err());
        }
    }
}
