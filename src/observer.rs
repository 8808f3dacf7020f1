use std::{
    cell::{Ref, RefCell, RefMut},
    fmt::Display,
    marker::PhantomData,
    rc::{Rc, Weak},
};

use crate::{Error, Mutation, Result};

/// Receives the mutations of one upstream publisher.
///
/// `upstream` is the publisher's full cache after the mutation was applied.
/// It stays borrowed for the duration of the call.
pub trait Subscriber<T> {
    /// Handles one mutation.
    ///
    /// # Errors
    ///
    /// Any error is reported back to the code that mutated the root
    /// provider. Delivery to sibling subscribers continues regardless.
    fn on_next(&self, mutation: &Mutation, upstream: &[T]) -> Result<()>;

    /// The publisher detached every subscriber; no further mutations follow.
    fn on_completed(&self) {}
}

/// A source of ordered records that notifies subscribers of each mutation.
///
/// Publishers hold weak references to subscribers: a subscriber is owned by
/// whoever constructed it and silently drops out of the subscriber list once
/// its last strong handle goes away.
pub trait Publisher: Display {
    /// Record type of the published series.
    type Item: 'static;

    /// Registers a subscriber. Notifications follow registration order.
    fn subscribe(&self, subscriber: Weak<dyn Subscriber<Self::Item>>);

    /// Deregisters a subscriber, returning `false` when it was not
    /// registered.
    fn unsubscribe(&self, subscriber: &Weak<dyn Subscriber<Self::Item>>) -> bool;

    /// Read-only view of the published series.
    fn results(&self) -> Ref<'_, [Self::Item]>;

    /// Number of live subscribers.
    fn subscriber_count(&self) -> usize;

    /// Detaches every subscriber, calling
    /// [`on_completed`](Subscriber::on_completed) on each.
    fn end_transmission(&self);
}

/// Ordered cache plus subscriber list, composed into every publisher.
pub(crate) struct Feed<T> {
    cache: RefCell<Vec<T>>,
    subscribers: RefCell<Vec<Weak<dyn Subscriber<T>>>>,
}

impl<T: 'static> Feed<T> {
    pub(crate) fn new(cache: Vec<T>) -> Self {
        Self {
            cache: RefCell::new(cache),
            subscribers: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn results(&self) -> Ref<'_, [T]> {
        Ref::map(self.cache.borrow(), Vec::as_slice)
    }

    /// Mutable access to the cache.
    ///
    /// # Errors
    ///
    /// [`Error::Reentrant`] while the cache is borrowed, i.e. from inside a
    /// notification of this very feed.
    pub(crate) fn cache_mut(&self, owner: &dyn Display) -> Result<RefMut<'_, Vec<T>>> {
        self.cache
            .try_borrow_mut()
            .map_err(|_| Error::Reentrant(owner.to_string()))
    }

    pub(crate) fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub(crate) fn subscribe(&self, subscriber: Weak<dyn Subscriber<T>>) {
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|s| s.strong_count() > 0);
        subscribers.push(subscriber);
    }

    pub(crate) fn unsubscribe(&self, subscriber: &Weak<dyn Subscriber<T>>) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let Some(position) = subscribers.iter().position(|s| Weak::ptr_eq(s, subscriber)) else {
            return false;
        };

        subscribers.remove(position);
        true
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|s| s.strong_count() > 0)
            .count()
    }

    pub(crate) fn end_transmission(&self) {
        let detached = std::mem::take(&mut *self.subscribers.borrow_mut());
        for subscriber in detached.iter().filter_map(Weak::upgrade) {
            subscriber.on_completed();
        }
    }

    /// Delivers `mutations` in order to every live subscriber.
    ///
    /// Each mutation goes to a snapshot of the subscriber list, so
    /// subscribers may detach (or attach) from inside a notification.
    ///
    /// # Errors
    ///
    /// The first error returned by any subscriber.
    pub(crate) fn notify(&self, mutations: &[Mutation]) -> Result<()> {
        let mut first_error = None;

        for mutation in mutations {
            let subscribers = self.live_subscribers();
            if subscribers.is_empty() {
                break;
            }

            let cache = self.cache.borrow();
            for subscriber in &subscribers {
                if let Err(error) = subscriber.on_next(mutation, &cache)
                    && first_error.is_none()
                {
                    first_error = Some(error);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    fn live_subscribers(&self) -> Vec<Rc<dyn Subscriber<T>>> {
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|s| s.strong_count() > 0);
        subscribers.iter().filter_map(Weak::upgrade).collect()
    }
}

/// A closure subscribed as a terminal observer.
///
/// # Example
///
/// ```
/// use quantedge_hubs::{Action, Callback, Mutation, Quote, QuoteHub};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let quotes = QuoteHub::new();
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let log = Rc::clone(&seen);
/// let _observer = Callback::subscribe_to(&*quotes, move |mutation: &Mutation, _: &[Quote]| {
///     log.borrow_mut().push(mutation.action);
/// });
///
/// quotes.add(Quote::new(1, 1.0, 1.0, 1.0, 1.0, 0.0)).unwrap();
/// assert_eq!(*seen.borrow(), vec![Action::AddNew]);
/// ```
pub struct Callback<T, F> {
    callback: F,
    _item: PhantomData<fn(&T)>,
}

impl<T, F> Callback<T, F>
where
    T: 'static,
    F: Fn(&Mutation, &[T]) + 'static,
{
    #[must_use]
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            _item: PhantomData,
        }
    }

    /// Wraps `callback` and subscribes it to `publisher`.
    ///
    /// The returned handle owns the observer; dropping it ends the
    /// subscription.
    #[must_use = "dropping the handle unsubscribes the callback"]
    pub fn subscribe_to<P>(publisher: &P, callback: F) -> Rc<Self>
    where
        P: Publisher<Item = T> + ?Sized,
    {
        let observer = Rc::new(Self::new(callback));
        let weak = Rc::downgrade(&observer);
        let weak: Weak<dyn Subscriber<T>> = weak;
        publisher.subscribe(weak);
        observer
    }
}

impl<T, F> Subscriber<T> for Callback<T, F>
where
    F: Fn(&Mutation, &[T]),
{
    fn on_next(&self, mutation: &Mutation, upstream: &[T]) -> Result<()> {
        (self.callback)(mutation, upstream);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, Revision, TimeValue};
    use std::cell::Cell;

    struct Probe {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
        fail: bool,
        completed: Cell<bool>,
    }

    impl Probe {
        fn new(name: &'static str, log: &Rc<RefCell<Vec<&'static str>>>, fail: bool) -> Rc<Self> {
            Rc::new(Self {
                name,
                log: Rc::clone(log),
                fail,
                completed: Cell::new(false),
            })
        }
    }

    impl Subscriber<TimeValue> for Probe {
        fn on_next(&self, _: &Mutation, _: &[TimeValue]) -> Result<()> {
            self.log.borrow_mut().push(self.name);
            if self.fail {
                Err(Error::Faulted(self.name.to_string()))
            } else {
                Ok(())
            }
        }

        fn on_completed(&self) {
            self.completed.set(true);
        }
    }

    fn weak(probe: &Rc<Probe>) -> Weak<dyn Subscriber<TimeValue>> {
        let weak = Rc::downgrade(probe);
        let weak: Weak<dyn Subscriber<TimeValue>> = weak;
        weak
    }

    fn mutation() -> Mutation {
        Mutation::new(Action::AddNew, 0, 1, Revision::next())
    }

    fn feed() -> Feed<TimeValue> {
        Feed::new(vec![TimeValue::new(1, Some(1.0))])
    }

    mod delivery {
        use super::*;

        #[test]
        fn registration_order() {
            let log = Rc::new(RefCell::new(Vec::new()));
            let (a, b) = (Probe::new("a", &log, false), Probe::new("b", &log, false));
            let feed = feed();
            feed.subscribe(weak(&b));
            feed.subscribe(weak(&a));

            feed.notify(&[mutation(), mutation()]).unwrap();

            assert_eq!(*log.borrow(), vec!["b", "a", "b", "a"]);
        }

        #[test]
        fn first_error_returned_siblings_still_notified() {
            let log = Rc::new(RefCell::new(Vec::new()));
            let failing = Probe::new("failing", &log, true);
            let healthy = Probe::new("healthy", &log, false);
            let feed = feed();
            feed.subscribe(weak(&failing));
            feed.subscribe(weak(&healthy));

            let result = feed.notify(&[mutation()]);

            assert_eq!(result, Err(Error::Faulted("failing".to_string())));
            assert_eq!(*log.borrow(), vec!["failing", "healthy"]);
        }

        #[test]
        fn dropped_subscriber_is_pruned() {
            let log = Rc::new(RefCell::new(Vec::new()));
            let kept = Probe::new("kept", &log, false);
            let feed = feed();
            feed.subscribe(weak(&kept));
            {
                let dropped = Probe::new("dropped", &log, false);
                feed.subscribe(weak(&dropped));
                assert_eq!(feed.subscriber_count(), 2);
            }

            feed.notify(&[mutation()]).unwrap();

            assert_eq!(feed.subscriber_count(), 1);
            assert_eq!(*log.borrow(), vec!["kept"]);
        }
    }

    mod subscription {
        use super::*;

        #[test]
        fn unsubscribe_known_subscriber() {
            let log = Rc::new(RefCell::new(Vec::new()));
            let probe = Probe::new("p", &log, false);
            let feed = feed();
            feed.subscribe(weak(&probe));

            assert!(feed.unsubscribe(&weak(&probe)));
            assert!(!feed.unsubscribe(&weak(&probe)));

            feed.notify(&[mutation()]).unwrap();
            assert!(log.borrow().is_empty());
        }

        #[test]
        fn end_transmission_completes_everyone() {
            let log = Rc::new(RefCell::new(Vec::new()));
            let (a, b) = (Probe::new("a", &log, false), Probe::new("b", &log, false));
            let feed = feed();
            feed.subscribe(weak(&a));
            feed.subscribe(weak(&b));

            feed.end_transmission();

            assert!(a.completed.get() && b.completed.get());
            assert_eq!(feed.subscriber_count(), 0);
        }

        #[test]
        fn cache_mut_while_notifying_is_reentrant() {
            let feed = feed();
            let _guard = feed.results();
            assert!(matches!(feed.cache_mut(&"FEED"), Err(Error::Reentrant(_))));
        }
    }
}
