use std::{
    cell::{Cell, Ref},
    fmt::Display,
    rc::{Rc, Weak},
};

use crate::{
    Action, Error, Indicator, Mutation, Publisher, Result, Revision, Series, SeriesSlice,
    Subscriber, Timestamp, observer::Feed,
};

#[derive(Clone, Copy, Debug, Default)]
struct HubState {
    /// Cascade already re-derived, and the first position recomputed for it.
    settled: Option<(Revision, usize)>,
    faulted: bool,
    attached: bool,
}

/// A chainable transform stage: subscribes to one upstream publisher, keeps
/// a result cache index-aligned with it and republishes its own mutations.
///
/// On every upstream mutation the stage recomputes its results from the
/// first affected position through the end, so that after any sequence of
/// mutations its cache equals the batch computation over the upstream
/// series. The recomputed span replaces the old one only when every position
/// computed successfully.
///
/// Notifications for one upstream mutation are emitted structural action
/// first (`AddNew`, `AddOld`, `Delete` or `Rebuild`), followed by one
/// `Update` per other recomputed position in ascending order.
///
/// # Example
///
/// ```
/// use quantedge_hubs::{Chain, Ema, Quote, QuoteHub, Sma};
///
/// let quotes = QuoteHub::new();
/// let sma = quotes.chain(Sma::with_length(2).unwrap()).unwrap();
/// let smoothed = sma.chain(Ema::with_length(2).unwrap()).unwrap();
///
/// for (t, close) in [(1, 10.0), (2, 20.0), (4, 40.0), (3, 30.0)] {
///     quotes.add(Quote::new(t, close, close, close, close, 0.0)).unwrap();
/// }
///
/// assert_eq!(sma.to_string(), "SMA(2)");
/// assert_eq!(sma.results()[3].value, Some(35.0));
/// assert_eq!(smoothed.len(), 4);
/// ```
pub struct StreamHub<In: 'static, I: Indicator<In>>
where
    I::Output: 'static,
{
    indicator: I,
    upstream: Rc<dyn Publisher<Item = In>>,
    feed: Feed<I::Output>,
    this: Weak<Self>,
    state: Cell<HubState>,
}

impl<In, I> StreamHub<In, I>
where
    In: Series + 'static,
    I: Indicator<In> + 'static,
{
    /// Builds a stage over `upstream`, computing results for everything the
    /// upstream already holds, and subscribes it.
    ///
    /// # Errors
    ///
    /// Fails when the indicator cannot compute over the existing upstream
    /// series; the stage is then not created.
    pub fn new(upstream: Rc<dyn Publisher<Item = In>>, indicator: I) -> Result<Rc<Self>> {
        let hub = Rc::new_cyclic(|this| Self {
            indicator,
            upstream,
            feed: Feed::new(Vec::new()),
            this: this.clone(),
            state: Cell::new(HubState::default()),
        });

        {
            let upstream = hub.upstream.results();
            let mut cache = hub.feed.cache_mut(&*hub)?;
            hub.recompute(&mut cache, 0, &upstream)?;
        }

        hub.attach();
        Ok(hub)
    }

    /// Results in upstream order.
    #[must_use]
    pub fn results(&self) -> Ref<'_, [I::Output]> {
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

    #[must_use]
    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    /// The stage failed to apply a mutation and refuses further ones until
    /// [`reinitialize`](Self::reinitialize) is called.
    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.state.get().faulted
    }

    /// Whether the stage still receives upstream mutations.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.state.get().attached
    }

    /// Stops receiving upstream mutations. The cache keeps its current
    /// content.
    pub fn unsubscribe(&self) -> bool {
        let detached = self.upstream.unsubscribe(&self.as_subscriber());
        self.update_state(|s| s.attached = false);
        if detached {
            log::debug!("{self}: unsubscribed from {}", self.upstream);
        }
        detached
    }

    /// Re-derives the whole cache from the upstream series, clears any
    /// fault, resubscribes if needed and notifies a [`Action::Rebuild`] from
    /// the first position.
    ///
    /// # Errors
    ///
    /// Fails when the indicator cannot compute over the upstream series (the
    /// stage stays faulted), or with the first error raised by a subscriber.
    pub fn reinitialize(&self) -> Result<()> {
        if !self.is_attached() {
            self.attach();
        }
        self.update_state(|s| {
            s.faulted = false;
            s.settled = None;
        });

        self.rebuild_at(0, Timestamp::MIN)
    }

    /// Recomputes every result and notifies a [`Action::Rebuild`] from the
    /// first position.
    ///
    /// # Errors
    ///
    /// See [`rebuild_from`](Self::rebuild_from).
    pub fn rebuild(&self) -> Result<()> {
        self.rebuild_from(Timestamp::MIN)
    }

    /// Recomputes the results at or after `timestamp` (walking back over the
    /// indicator's lookahead) and notifies a single [`Action::Rebuild`].
    ///
    /// # Errors
    ///
    /// [`Error::Faulted`] for a faulted stage, a compute error (the stage
    /// becomes faulted), or the first error raised by a subscriber.
    pub fn rebuild_from(&self, timestamp: Timestamp) -> Result<()> {
        if self.is_faulted() {
            return Err(Error::Faulted(self.to_string()));
        }

        // A detached stage may have missed mutations, so it re-derives everything.
        let start = if self.is_attached() {
            self.feed.results().insertion_point(timestamp)
        } else {
            0
        };
        self.rebuild_at(start.saturating_sub(self.indicator.lookahead()), timestamp)
    }

    fn rebuild_at(&self, from: usize, timestamp: Timestamp) -> Result<()> {
        let mutation = {
            let upstream = self.upstream.results();
            let mut cache = self.feed.cache_mut(self)?;
            let from = from.min(upstream.len());
            let timestamp = Self::rebuild_timestamp(&cache, from, timestamp);

            if let Err(error) = self.recompute(&mut cache, from, &upstream) {
                self.fault(&error);
                return Err(error);
            }

            Mutation::new(Action::Rebuild, from, timestamp, Revision::next())
        };

        log::debug!("{self}: rebuilt from #{}", mutation.index);
        self.update_state(|s| s.settled = Some((mutation.revision, mutation.index)));
        self.feed.notify(&[mutation])
    }

    /// A timestamp whose insertion point in the current cache is `from`.
    fn rebuild_timestamp(cache: &[I::Output], from: usize, timestamp: Timestamp) -> Timestamp {
        cache
            .get(from)
            .map_or(timestamp, |r| r.timestamp().min(timestamp))
    }

    /// Replaces `cache[from..]` with results computed over `upstream[from..]`.
    ///
    /// On failure the cache is restored to its previous content.
    fn recompute(
        &self,
        cache: &mut Vec<I::Output>,
        from: usize,
        upstream: &[In],
    ) -> Result<()> {
        debug_assert!(from <= cache.len() && from <= upstream.len());

        let previous = cache.split_off(from);
        let outcome = (from..upstream.len()).try_for_each(|index| {
            let result = self.indicator.compute(upstream, cache, index)?;
            if result.timestamp() != upstream[index].timestamp() {
                return Err(Error::Compute {
                    index,
                    reason: format!(
                        "result timestamp {} does not match input timestamp {}",
                        result.timestamp(),
                        upstream[index].timestamp()
                    ),
                });
            }

            cache.push(result);
            Ok(())
        });

        if outcome.is_err() {
            cache.truncate(from);
            cache.extend(previous);
        }

        outcome
    }

    /// Rebuilds the cache for one upstream mutation and returns the
    /// mutations to republish, or `None` when this cascade was already
    /// settled.
    fn apply(&self, mutation: &Mutation, upstream: &[In]) -> Result<Option<Vec<Mutation>>> {
        let mut cache = self.feed.cache_mut(self)?;
        let len = cache.len();
        let timestamp = mutation.timestamp;

        let start = match mutation.action {
            Action::AddNew => {
                if mutation.index != len || upstream.len() != len + 1 {
                    return Err(Error::out_of_sync(
                        self,
                        format!(
                            "cannot append t={timestamp} at #{} to {len} results",
                            mutation.index
                        ),
                    ));
                }
                len
            }
            Action::AddOld => {
                let index = cache.insertion_point(timestamp);
                if cache.get(index).is_some_and(|r| r.timestamp() == timestamp) {
                    return Err(Error::out_of_sync(
                        self,
                        format!("t={timestamp} inserted again"),
                    ));
                }
                self.expect_len(upstream.len(), len + 1)?;
                index
            }
            Action::Update => {
                let index = cache.try_index_of(timestamp).ok_or_else(|| {
                    Error::out_of_sync(self, format!("update of unknown t={timestamp}"))
                })?;
                if let Some((revision, from)) = self.state.get().settled
                    && revision == mutation.revision
                    && index >= from
                {
                    return Ok(None);
                }
                self.expect_len(upstream.len(), len)?;
                index
            }
            Action::Delete => {
                let index = cache.try_index_of(timestamp).ok_or_else(|| {
                    Error::out_of_sync(self, format!("delete of unknown t={timestamp}"))
                })?;
                self.expect_len(upstream.len() + 1, len)?;
                index
            }
            Action::Rebuild => cache.insertion_point(timestamp),
        };

        // Upstream positions before `start` may have changed in this cascade
        // too; their follow-up updates are then already settled here.
        let from = start
            .min(mutation.from)
            .saturating_sub(self.indicator.lookahead())
            .min(upstream.len());
        let rebuild_timestamp = Self::rebuild_timestamp(&cache, from, timestamp);

        self.recompute(&mut cache, from, upstream)?;

        let settled = match self.state.get().settled {
            Some((revision, settled)) if revision == mutation.revision => from.min(settled),
            _ => from,
        };
        self.update_state(|s| s.settled = Some((mutation.revision, settled)));

        let revision = mutation.revision;
        let emitted = match mutation.action {
            Action::Rebuild => vec![Mutation::new(
                Action::Rebuild,
                from,
                rebuild_timestamp,
                revision,
            )],
            Action::Update => (from..cache.len())
                .map(|i| {
                    Mutation::new(Action::Update, i, cache[i].timestamp(), revision)
                        .re_derived_from(from)
                })
                .collect(),
            action => {
                let head = match action {
                    Action::Delete => Mutation::new(action, start, timestamp, revision),
                    _ => Mutation::new(action, start, cache[start].timestamp(), revision),
                }
                .re_derived_from(from);
                std::iter::once(head)
                    .chain(
                        (from..cache.len())
                            .filter(|&i| action == Action::Delete || i != start)
                            .map(|i| {
                                Mutation::new(Action::Update, i, cache[i].timestamp(), revision)
                                    .re_derived_from(from)
                            }),
                    )
                    .collect()
            }
        };

        Ok(Some(emitted))
    }

    fn expect_len(&self, actual: usize, expected: usize) -> Result<()> {
        if actual == expected {
            Ok(())
        } else {
            Err(Error::out_of_sync(
                self,
                format!("provider holds {actual} records, expected {expected}"),
            ))
        }
    }

    fn fault(&self, error: &Error) {
        self.update_state(|s| s.faulted = true);
        log::warn!("{self}: faulted: {error}");
    }

    fn attach(&self) {
        self.upstream.subscribe(self.as_subscriber());
        self.update_state(|s| s.attached = true);
        log::debug!("{self}: subscribed to {}", self.upstream);
    }

    fn as_subscriber(&self) -> Weak<dyn Subscriber<In>> {
        let this: Weak<dyn Subscriber<In>> = self.this.clone();
        this
    }

    fn update_state(&self, update: impl FnOnce(&mut HubState)) {
        let mut state = self.state.get();
        update(&mut state);
        self.state.set(state);
    }
}

impl<In, I> Subscriber<In> for StreamHub<In, I>
where
    In: Series + 'static,
    I: Indicator<In> + 'static,
{
    fn on_next(&self, mutation: &Mutation, upstream: &[In]) -> Result<()> {
        if self.is_faulted() {
            return Err(Error::Faulted(self.to_string()));
        }

        match self.apply(mutation, upstream) {
            Ok(Some(emitted)) => {
                if emitted.len() > 1 {
                    log::debug!("{self}: {mutation} re-derived {} results", emitted.len());
                }
                self.feed.notify(&emitted)
            }
            Ok(None) => Ok(()),
            Err(error) => {
                self.fault(&error);
                Err(error)
            }
        }
    }

    fn on_completed(&self) {
        self.update_state(|s| s.attached = false);
        log::debug!("{self}: {} ended transmission", self.upstream);
    }
}

impl<In, I> Publisher for StreamHub<In, I>
where
    In: Series + 'static,
    I: Indicator<In> + 'static,
{
    type Item = I::Output;

    fn subscribe(&self, subscriber: Weak<dyn Subscriber<I::Output>>) {
        self.feed.subscribe(subscriber);
    }

    fn unsubscribe(&self, subscriber: &Weak<dyn Subscriber<I::Output>>) -> bool {
        self.feed.unsubscribe(subscriber)
    }

    fn results(&self) -> Ref<'_, [I::Output]> {
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

impl<In: 'static, I: Indicator<In>> Display for StreamHub<In, I>
where
    I::Output: 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.indicator, f)
    }
}

/// Subscribes a new [`StreamHub`] to a shared publisher.
pub trait Chain<T: 'static> {
    /// Builds a stage computing `indicator` over this publisher.
    ///
    /// # Errors
    ///
    /// See [`StreamHub::new`].
    fn chain<I>(&self, indicator: I) -> Result<Rc<StreamHub<T, I>>>
    where
        I: Indicator<T> + 'static;
}

impl<P> Chain<P::Item> for Rc<P>
where
    P: Publisher + 'static,
    P::Item: Series,
{
    fn chain<I>(&self, indicator: I) -> Result<Rc<StreamHub<P::Item, I>>>
    where
        I: Indicator<P::Item> + 'static,
    {
        let upstream = Rc::clone(self);
        let upstream: Rc<dyn Publisher<Item = P::Item>> = upstream;
        StreamHub::new(upstream, indicator)
    }
}
