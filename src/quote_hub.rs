use std::{
    cell::Ref,
    fmt::Display,
    rc::{Rc, Weak},
};

use crate::{
    Action, Error, Mutation, Ohlcv, Publisher, Quote, Result, Revision, SeriesSlice, Subscriber,
    Timestamp, observer::Feed, quotes,
};

/// The root publisher: canonical, time-ordered store of quotes and single
/// entry point for every mutation.
///
/// Each call runs the whole cascade of subscriber rebuilds to completion
/// before returning. When a subscriber fails, the provider keeps the
/// mutation and returns the first error; the failing stage is faulted and
/// refuses further mutations until reinitialized.
///
/// # Example
///
/// ```
/// use quantedge_hubs::{Action, Quote, QuoteHub};
///
/// let quotes = QuoteHub::new();
/// let q = |t, close| Quote::new(t, close, close, close, close, 0.0);
///
/// assert_eq!(quotes.add(q(1, 10.0)).unwrap(), Some(Action::AddNew));
/// assert_eq!(quotes.add(q(3, 30.0)).unwrap(), Some(Action::AddNew));
/// assert_eq!(quotes.add(q(2, 20.0)).unwrap(), Some(Action::AddOld));
/// assert_eq!(quotes.add(q(2, 20.0)).unwrap(), None);
/// assert_eq!(quotes.add(q(2, 25.0)).unwrap(), Some(Action::Update));
/// assert_eq!(quotes.len(), 3);
/// ```
pub struct QuoteHub {
    feed: Feed<Quote>,
}

impl QuoteHub {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            feed: Feed::new(Vec::new()),
        })
    }

    /// Creates a provider pre-loaded with `quotes`, in any order.
    ///
    /// # Errors
    ///
    /// Fails on an invalid quote or on two quotes sharing a timestamp.
    pub fn from_quotes(quotes: impl IntoIterator<Item = Quote>) -> Result<Rc<Self>> {
        Ok(Rc::new(Self {
            feed: Feed::new(quotes::prepare(quotes)?),
        }))
    }

    /// Adds or replaces a quote.
    ///
    /// Returns the action notified to subscribers, or `None` when an equal
    /// quote is already cached (nothing is notified).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidQuote`] for a malformed quote, which never enters the
    /// cache, [`Error::Reentrant`] when called from inside a notification of
    /// this provider, or the first error raised by a subscriber.
    pub fn add(&self, quote: Quote) -> Result<Option<Action>> {
        quote.validate()?;

        let mutation = {
            let mut cache = self.feed.cache_mut(self)?;
            let timestamp = quote.timestamp;

            if cache.last().is_none_or(|last| last.timestamp < timestamp) {
                cache.push(quote);
                self.mutation(Action::AddNew, cache.len() - 1, timestamp)
            } else {
                match cache.binary_search_by_key(&timestamp, |q| q.timestamp) {
                    Ok(index) if cache[index] == quote => {
                        log::debug!("{self}: t={timestamp} unchanged, ignored");
                        return Ok(None);
                    }
                    Ok(index) => {
                        cache[index] = quote;
                        self.mutation(Action::Update, index, timestamp)
                    }
                    Err(index) => {
                        cache.insert(index, quote);
                        self.mutation(Action::AddOld, index, timestamp)
                    }
                }
            }
        };

        self.feed.notify(&[mutation])?;
        Ok(Some(mutation.action))
    }

    /// Same as [`add`](Self::add), for callers that know the quote arrives
    /// out of order.
    ///
    /// # Errors
    ///
    /// See [`add`](Self::add).
    #[inline]
    pub fn insert(&self, quote: Quote) -> Result<Option<Action>> {
        self.add(quote)
    }

    /// Adds any [`Ohlcv`] bar.
    ///
    /// # Errors
    ///
    /// See [`add`](Self::add).
    pub fn add_ohlcv(&self, bar: &impl Ohlcv) -> Result<Option<Action>> {
        self.add(Quote::from_ohlcv(bar)?)
    }

    /// Adds each quote in the given order and returns how many of them
    /// changed the cache.
    ///
    /// Pre-sorted input only takes the append path, but order is not
    /// required for correctness.
    ///
    /// # Errors
    ///
    /// Stops at the first failing quote; the quotes before it stay applied.
    pub fn add_range(&self, quotes: impl IntoIterator<Item = Quote>) -> Result<usize> {
        let mut applied = 0;
        for quote in quotes {
            if self.add(quote)?.is_some() {
                applied += 1;
            }
        }

        Ok(applied)
    }

    /// Removes the quote at `timestamp`.
    ///
    /// # Errors
    ///
    /// [`Error::TimestampNotFound`] when no quote has that timestamp, or the
    /// first error raised by a subscriber.
    pub fn remove(&self, timestamp: Timestamp) -> Result<Quote> {
        let index = self.feed.results().index_of(timestamp)?;
        self.remove_at(index)
    }

    /// Removes the quote at `index`.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] for an index past the end, or the first
    /// error raised by a subscriber.
    pub fn remove_at(&self, index: usize) -> Result<Quote> {
        let (removed, mutation) = {
            let mut cache = self.feed.cache_mut(self)?;
            if index >= cache.len() {
                return Err(Error::IndexOutOfRange {
                    index,
                    len: cache.len(),
                });
            }

            let removed = cache.remove(index);
            (
                removed,
                self.mutation(Action::Delete, index, removed.timestamp),
            )
        };

        self.feed.notify(&[mutation])?;
        Ok(removed)
    }

    /// Removes a cached quote equal to `quote`.
    ///
    /// # Errors
    ///
    /// [`Error::TimestampNotFound`] when no equal quote is cached, or the
    /// first error raised by a subscriber.
    pub fn remove_quote(&self, quote: &Quote) -> Result<Quote> {
        let index = self
            .feed
            .results()
            .position_of(quote)
            .ok_or(Error::TimestampNotFound(quote.timestamp))?;
        self.remove_at(index)
    }

    /// Removes every quote at or after `from`, newest first, notifying one
    /// [`Action::Delete`] each. Returns the number of removed quotes.
    ///
    /// # Errors
    ///
    /// Stops at the first subscriber error; older quotes stay cached.
    pub fn remove_range(&self, from: Timestamp) -> Result<usize> {
        let start = self.feed.results().insertion_point(from);
        let count = self.len() - start;

        for index in (start..start + count).rev() {
            self.remove_at(index)?;
        }

        if count > 0 {
            log::debug!("{self}: removed {count} quotes from t={from}");
        }

        Ok(count)
    }

    /// Read-only view of the cached quotes.
    #[must_use]
    pub fn quotes(&self) -> Ref<'_, [Quote]> {
        self.feed.results()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.feed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of the quote at `timestamp`.
    ///
    /// # Errors
    ///
    /// [`Error::TimestampNotFound`] when no quote has that timestamp.
    pub fn index_of(&self, timestamp: Timestamp) -> Result<usize> {
        self.feed.results().index_of(timestamp)
    }

    #[must_use]
    pub fn try_index_of(&self, timestamp: Timestamp) -> Option<usize> {
        self.feed.results().try_index_of(timestamp)
    }

    /// Position of the first quote at or after `timestamp`.
    #[must_use]
    pub fn index_gte(&self, timestamp: Timestamp) -> Option<usize> {
        self.feed.results().index_gte(timestamp)
    }

    fn mutation(&self, action: Action, index: usize, timestamp: Timestamp) -> Mutation {
        let mutation = Mutation::new(action, index, timestamp, Revision::next());
        log::trace!("{self}: {mutation}");
        mutation
    }
}

impl Publisher for QuoteHub {
    type Item = Quote;

    fn subscribe(&self, subscriber: Weak<dyn Subscriber<Quote>>) {
        self.feed.subscribe(subscriber);
        log::debug!("{self}: subscriber attached");
    }

    fn unsubscribe(&self, subscriber: &Weak<dyn Subscriber<Quote>>) -> bool {
        self.feed.unsubscribe(subscriber)
    }

    fn results(&self) -> Ref<'_, [Quote]> {
        self.feed.results()
    }

    fn subscriber_count(&self) -> usize {
        self.feed.subscriber_count()
    }

    fn end_transmission(&self) {
        log::debug!("{self}: end of transmission");
        self.feed.end_transmission();
    }
}

impl Display for QuoteHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "QUOTES")
    }
}
