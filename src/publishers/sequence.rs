//! # SequencePublisher: a finite sequence as a demand-driven source.
//!
//! Each `subscribe` opens a fresh cursor over the source, so subscriptions
//! never interfere. The cursor is opened lazily on the first production pass
//! and dropped as soon as the subscription ends.
//!
//! ## Sources
//! - [`SequencePublisher::new`]: a cloneable source (`Vec`, range, iterator, ...),
//!   cloned once per subscription.
//! - [`SequencePublisher::from_fn`]: a factory called once per subscription.
//! - [`SequencePublisher::fallible`]: a factory of `Result` items; errors are
//!   rarely `Clone`, so each subscription builds its own.
//!
//! ## Pass
//! ```text
//! produce(n):
//!   repeat up to n times while the emitter is open:
//!     ├─ cursor.next() == None     → Exhausted (completion)
//!     ├─ item is Err(e)            → Err(StreamError::Producer{ source: e })
//!     └─ item                      → emit(item)
//!   cursor.peek() == None          → Exhausted (complete right after the last element)
//!   otherwise                      → Pending
//! ```
//! A panic while opening or advancing the cursor is caught by the subscription
//! core and reported as `StreamError::ProducerPanicked`.
//!
//! ## Example
//! ```rust
//! use demandflow::{Config, SequencePublisher};
//!
//! let words = SequencePublisher::new(vec!["a", "b", "c"])
//!     .with_config(Config { prefetch: 8, batch: 2 });
//! let lines = SequencePublisher::fallible(|| {
//!     vec![Ok("header"), Err(std::io::Error::other("truncated"))]
//! });
//! # let _ = (&words, &lines);
//! ```

use std::iter::Peekable;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{BoxError, StreamError};
use crate::protocol::{Emitter, Producer, Progress, ProtocolSubscription};
use crate::publishers::Publisher;
use crate::subscribers::Subscriber;

/// Opens a fresh cursor for one subscription.
type Open<I> = Arc<dyn Fn() -> I + Send + Sync>;

/// Publisher over a finite in-memory sequence.
///
/// `I` is the cursor type each subscription iterates. `T` is the element type
/// delivered to subscribers: `I::Item` for [`SequencePublisher::new`] and
/// [`SequencePublisher::from_fn`], or the `Ok` type for
/// [`SequencePublisher::fallible`].
pub struct SequencePublisher<I: Iterator, T> {
    open: Open<I>,
    lift: fn(I::Item) -> Result<T, BoxError>,
    config: Config,
}

impl<I, T> SequencePublisher<I, T>
where
    I: Iterator<Item = T>,
{
    /// Publishes every element of `source`, in order.
    pub fn new<S>(source: S) -> Self
    where
        S: IntoIterator<IntoIter = I> + Clone + Send + Sync + 'static,
    {
        Self::from_fn(move || source.clone())
    }

    /// Publishes the sequence returned by `factory`, called once per subscription.
    pub fn from_fn<F, S>(factory: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: IntoIterator<IntoIter = I>,
    {
        Self {
            open: Arc::new(move || factory().into_iter()),
            lift: Ok,
            config: Config::default(),
        }
    }
}

impl<I, T, E> SequencePublisher<I, T>
where
    I: Iterator<Item = Result<T, E>>,
    E: Into<BoxError>,
{
    /// Publishes a sequence whose cursor can fail.
    ///
    /// `factory` is called once per subscription. The first `Err` ends the
    /// subscription with [`StreamError::Producer`] carrying the original error;
    /// elements before it are delivered normally.
    pub fn fallible<F, S>(factory: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: IntoIterator<IntoIter = I>,
    {
        Self {
            open: Arc::new(move || factory().into_iter()),
            lift: |item| item.map_err(Into::into),
            config: Config::default(),
        }
    }
}

impl<I: Iterator, T> SequencePublisher<I, T> {
    /// Replaces the configuration used for new subscriptions.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Configuration applied to new subscriptions.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl<I, T> Publisher for SequencePublisher<I, T>
where
    I: Iterator + Send + 'static,
    I::Item: Send + 'static,
    T: Send + 'static,
{
    type Item = T;

    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let cursor = SequenceCursor {
            open: Some(Arc::clone(&self.open)),
            iter: None,
            lift: self.lift,
        };
        ProtocolSubscription::new(cursor, &self.config).start(subscriber);
    }
}

/// Per-subscription cursor; exclusively owned by one `ProtocolSubscription`.
struct SequenceCursor<I: Iterator, T> {
    open: Option<Open<I>>,
    iter: Option<Peekable<I>>,
    lift: fn(I::Item) -> Result<T, BoxError>,
}

impl<I, T> Producer for SequenceCursor<I, T>
where
    I: Iterator + Send + 'static,
    I::Item: Send + 'static,
    T: Send + 'static,
{
    type Item = T;

    fn produce(&mut self, n: u64, emitter: &mut Emitter<'_, T>) -> Result<Progress, StreamError> {
        if let Some(open) = self.open.take() {
            self.iter = Some(open().peekable());
        }
        let Some(iter) = self.iter.as_mut() else {
            return Ok(Progress::Exhausted);
        };

        let lift = self.lift;
        let mut pulled = 0;
        while pulled < n && emitter.is_open() {
            let Some(next) = iter.next() else {
                return Ok(Progress::Exhausted);
            };
            pulled += 1;
            let item = lift(next).map_err(|source| StreamError::Producer { source })?;
            if !emitter.emit(item) {
                return Ok(Progress::Pending);
            }
        }

        if emitter.is_active() && iter.peek().is_none() {
            return Ok(Progress::Exhausted);
        }
        Ok(Progress::Pending)
    }

    fn on_cancel(&mut self) {
        self.iter = None;
        self.open = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Subscription;
    use crate::test_support::{Recorder, Seen};
    use std::fmt;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn test_two_then_one_of_three() {
        let publisher = SequencePublisher::new(vec![1_u32, 2, 3]);
        let rec = Recorder::<u32>::new(2).arc();
        publisher.subscribe(rec.clone());
        assert_eq!(
            rec.seen(),
            vec![Seen::Subscribed, Seen::Next(1), Seen::Next(2)]
        );

        rec.request(1);
        assert_eq!(
            rec.seen(),
            vec![
                Seen::Subscribed,
                Seen::Next(1),
                Seen::Next(2),
                Seen::Next(3),
                Seen::Complete
            ]
        );
    }

    #[test]
    fn test_empty_sequence_completes_on_first_request() {
        let publisher = SequencePublisher::new(Vec::<u8>::new());
        let rec = Recorder::<u8>::new(0).arc();
        publisher.subscribe(rec.clone());
        assert_eq!(rec.seen(), vec![Seen::Subscribed]);

        rec.request(1);
        assert_eq!(rec.seen(), vec![Seen::Subscribed, Seen::Complete]);
    }

    #[derive(Debug)]
    struct Broken;

    impl fmt::Display for Broken {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("cursor broke")
        }
    }

    impl std::error::Error for Broken {}

    #[test]
    fn test_fallible_cursor_fails_after_first_element() {
        let publisher = SequencePublisher::fallible(|| vec![Ok(10_u32), Err(Broken), Ok(30)]);
        let rec = Recorder::<u32>::new(3).arc();
        publisher.subscribe(rec.clone());
        assert_eq!(
            rec.seen(),
            vec![
                Seen::Subscribed,
                Seen::Next(10),
                Seen::Error("producer_failed")
            ]
        );

        rec.request(3);
        assert_eq!(rec.items(), vec![10]);
    }

    struct KeepError {
        error: Mutex<Option<StreamError>>,
    }

    impl Subscriber<u32> for KeepError {
        fn on_subscribe(&self, subscription: Subscription) {
            subscription.request(3);
        }
        fn on_next(&self, _item: u32) {}
        fn on_error(&self, error: StreamError) {
            *self.error.lock().unwrap() = Some(error);
        }
        fn on_complete(&self) {}
    }

    #[test]
    fn test_producer_error_carries_original_failure() {
        let publisher = SequencePublisher::fallible(|| vec![Ok(1_u32), Err(Broken)]);
        let sub = Arc::new(KeepError {
            error: Mutex::new(None),
        });
        publisher.subscribe(sub.clone());

        let error = sub.error.lock().unwrap().take().expect("error delivered");
        let source = std::error::Error::source(&error).expect("source kept");
        assert!(source.downcast_ref::<Broken>().is_some());
    }

    #[test]
    fn test_io_errors_fail_every_subscription() {
        let publisher = SequencePublisher::fallible(|| {
            vec![
                Ok(1_u32),
                Ok(2),
                Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "truncated",
                )),
            ]
        });
        for _ in 0..2 {
            let sub = Arc::new(KeepError {
                error: Mutex::new(None),
            });
            publisher.subscribe(sub.clone());
            let error = sub.error.lock().unwrap().take().expect("error delivered");
            assert_eq!(error.as_label(), "producer_failed");
            let source = std::error::Error::source(&error).expect("source kept");
            let io = source.downcast_ref::<std::io::Error>().expect("io error");
            assert_eq!(io.kind(), std::io::ErrorKind::UnexpectedEof);
        }
    }

    #[test]
    fn test_factory_runs_once_per_subscription() {
        let opened = Arc::new(AtomicUsize::new(0));
        let publisher = {
            let opened = Arc::clone(&opened);
            SequencePublisher::from_fn(move || {
                let run = opened.fetch_add(1, Ordering::SeqCst) as u32;
                vec![run * 10, run * 10 + 1]
            })
        };
        let a = Recorder::<u32>::new(0).arc();
        let b = Recorder::<u32>::new(5).arc();
        publisher.subscribe(a.clone());
        publisher.subscribe(b.clone());
        assert_eq!(opened.load(Ordering::SeqCst), 1);

        a.request(5);
        assert_eq!(opened.load(Ordering::SeqCst), 2);
        assert_eq!(b.items(), vec![0, 1]);
        assert_eq!(a.items(), vec![10, 11]);
        assert_eq!(a.terminals(), vec![Seen::Complete]);
    }

    /// Yields `1, 2, ...` and panics when asked for the element after `limit`.
    #[derive(Clone)]
    struct Exploding {
        next: u32,
        limit: u32,
    }

    impl Iterator for Exploding {
        type Item = u32;

        fn next(&mut self) -> Option<u32> {
            if self.next >= self.limit {
                panic!("cannot advance past {}", self.limit);
            }
            self.next += 1;
            Some(self.next)
        }
    }

    #[test]
    fn test_panicking_cursor_becomes_single_error() {
        let publisher = SequencePublisher::new(Exploding { next: 0, limit: 1 });
        let rec = Recorder::<u32>::new(3).arc();
        publisher.subscribe(rec.clone());
        assert_eq!(
            rec.seen(),
            vec![
                Seen::Subscribed,
                Seen::Next(1),
                Seen::Error("producer_panicked")
            ]
        );
    }

    #[test]
    fn test_subscriptions_are_independent_runs() {
        let publisher = SequencePublisher::new(1..=5_u32);
        let a = Recorder::<u32>::new(2).arc();
        let b = Recorder::<u32>::new(0).arc();
        publisher.subscribe(a.clone());
        publisher.subscribe(b.clone());

        b.request(1);
        b.request(10);
        a.request(3);

        assert_eq!(a.items(), vec![1, 2, 3, 4, 5]);
        assert_eq!(b.items(), vec![1, 2, 3, 4, 5]);
        assert_eq!(a.terminals(), vec![Seen::Complete]);
        assert_eq!(b.terminals(), vec![Seen::Complete]);
        assert_ne!(a.subscription().id(), b.subscription().id());
    }

    #[test]
    fn test_concurrent_subscribers_on_threads() {
        let publisher = Arc::new(SequencePublisher::new((0..1_000).collect::<Vec<u32>>()));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let publisher = Arc::clone(&publisher);
                std::thread::spawn(move || {
                    let rec = Recorder::<u32>::new(7).with_reentrant(3).arc();
                    publisher.subscribe(rec.clone());
                    rec.items()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), (0..1_000).collect::<Vec<u32>>());
        }
    }

    /// Source whose cursors report when they are dropped.
    #[derive(Clone)]
    struct Tracked {
        items: Vec<u32>,
        dropped: Arc<AtomicUsize>,
    }

    struct TrackedIter {
        inner: std::vec::IntoIter<u32>,
        dropped: Arc<AtomicUsize>,
    }

    impl Iterator for TrackedIter {
        type Item = u32;

        fn next(&mut self) -> Option<u32> {
            self.inner.next()
        }
    }

    impl Drop for TrackedIter {
        fn drop(&mut self) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl IntoIterator for Tracked {
        type Item = u32;
        type IntoIter = TrackedIter;

        fn into_iter(self) -> TrackedIter {
            TrackedIter {
                inner: self.items.into_iter(),
                dropped: self.dropped,
            }
        }
    }

    #[test]
    fn test_cancel_releases_cursor_immediately() {
        let dropped = Arc::new(AtomicUsize::new(0));
        let publisher = SequencePublisher::new(Tracked {
            items: vec![1, 2, 3, 4],
            dropped: Arc::clone(&dropped),
        });
        let rec = Recorder::<u32>::new(1).arc();
        publisher.subscribe(rec.clone());
        assert_eq!(dropped.load(Ordering::SeqCst), 0);

        rec.cancel();
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
        rec.request(3);
        assert_eq!(rec.items(), vec![1]);
        assert!(rec.terminals().is_empty());
    }

    /// Requests one element at a time from inside `on_next` and records the stack depth.
    struct DepthProbe {
        subscription: Mutex<Option<Subscription>>,
        items: Mutex<Vec<u32>>,
        lowest: AtomicUsize,
        highest: AtomicUsize,
        completed: AtomicBool,
    }

    impl Subscriber<u32> for DepthProbe {
        fn on_subscribe(&self, subscription: Subscription) {
            *self.subscription.lock().unwrap() = Some(subscription.clone());
            subscription.request(1);
        }

        fn on_next(&self, item: u32) {
            let marker = 0_u8;
            let addr = std::hint::black_box(&marker) as *const u8 as usize;
            self.lowest.fetch_min(addr, Ordering::SeqCst);
            self.highest.fetch_max(addr, Ordering::SeqCst);
            self.items.lock().unwrap().push(item);

            let subscription = self.subscription.lock().unwrap().clone();
            if let Some(subscription) = subscription {
                subscription.request(1);
            }
        }

        fn on_error(&self, _error: StreamError) {}

        fn on_complete(&self) {
            self.completed.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_reentrant_request_keeps_stack_flat() {
        let publisher = SequencePublisher::new(0..100_000_u32);
        let probe = Arc::new(DepthProbe {
            subscription: Mutex::new(None),
            items: Mutex::new(Vec::new()),
            lowest: AtomicUsize::new(usize::MAX),
            highest: AtomicUsize::new(0),
            completed: AtomicBool::new(false),
        });
        publisher.subscribe(probe.clone());

        let items = probe.items.lock().unwrap();
        assert_eq!(items.len(), 100_000);
        assert!(items.iter().copied().eq(0..100_000));
        assert!(probe.completed.load(Ordering::SeqCst));

        let spread = probe.highest.load(Ordering::SeqCst) - probe.lowest.load(Ordering::SeqCst);
        assert!(spread < 16 * 1024, "stack grew by {spread} bytes");
    }

    #[test]
    fn test_batch_config_still_delivers_everything() {
        let publisher = SequencePublisher::new(vec!['a', 'b', 'c', 'd', 'e']).with_config(Config {
            prefetch: 1,
            batch: 2,
        });
        assert_eq!(publisher.config().batch_limit(), Some(2));
        let rec = Recorder::<char>::new(i64::MAX).arc();
        publisher.subscribe(rec.clone());
        assert_eq!(rec.items(), vec!['a', 'b', 'c', 'd', 'e']);
        assert_eq!(rec.terminals(), vec![Seen::Complete]);
    }
}
