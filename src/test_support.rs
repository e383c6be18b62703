//! Recording subscriber shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::StreamError;
use crate::protocol::Subscription;
use crate::subscribers::Subscriber;

/// One observed signal; errors are kept as their label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Seen<T> {
    Subscribed,
    Next(T),
    Error(&'static str),
    Complete,
}

/// Subscriber that records every signal and follows a scripted demand schedule.
pub(crate) struct Recorder<T> {
    seen: Mutex<Vec<Seen<T>>>,
    subscription: Mutex<Option<Subscription>>,
    received: AtomicUsize,
    initial: i64,
    per_item: i64,
    cancel_after: Option<usize>,
    panic_after: Option<usize>,
}

impl<T: Clone + Send> Recorder<T> {
    /// Requests `initial` from `on_subscribe` (`0` = no request).
    pub(crate) fn new(initial: i64) -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            subscription: Mutex::new(None),
            received: AtomicUsize::new(0),
            initial,
            per_item: 0,
            cancel_after: None,
            panic_after: None,
        }
    }

    /// Requests `n` more from inside every `on_next`.
    pub(crate) fn with_reentrant(mut self, n: i64) -> Self {
        self.per_item = n;
        self
    }

    /// Cancels from inside `on_next` once `count` items arrived.
    pub(crate) fn with_cancel_after(mut self, count: usize) -> Self {
        self.cancel_after = Some(count);
        self
    }

    /// Panics from inside `on_next` once `count` items arrived.
    pub(crate) fn with_panic_after(mut self, count: usize) -> Self {
        self.panic_after = Some(count);
        self
    }

    pub(crate) fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub(crate) fn subscription(&self) -> Subscription {
        self.subscription
            .lock()
            .unwrap()
            .clone()
            .expect("on_subscribe was not delivered")
    }

    pub(crate) fn request(&self, n: i64) {
        self.subscription().request(n);
    }

    pub(crate) fn cancel(&self) {
        self.subscription().cancel();
    }

    pub(crate) fn seen(&self) -> Vec<Seen<T>> {
        self.seen.lock().unwrap().clone()
    }

    pub(crate) fn items(&self) -> Vec<T> {
        self.seen()
            .into_iter()
            .filter_map(|s| match s {
                Seen::Next(item) => Some(item),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn terminals(&self) -> Vec<Seen<T>> {
        self.seen()
            .into_iter()
            .filter(|s| matches!(s, Seen::Error(_) | Seen::Complete))
            .collect()
    }
}

impl<T: Clone + Send> Subscriber<T> for Recorder<T> {
    fn on_subscribe(&self, subscription: Subscription) {
        self.seen.lock().unwrap().push(Seen::Subscribed);
        *self.subscription.lock().unwrap() = Some(subscription.clone());
        if self.initial != 0 {
            subscription.request(self.initial);
        }
    }

    fn on_next(&self, item: T) {
        self.seen.lock().unwrap().push(Seen::Next(item));
        let count = self.received.fetch_add(1, Ordering::SeqCst) + 1;
        if self.panic_after == Some(count) {
            panic!("subscriber gave up after {count} items");
        }
        if self.cancel_after == Some(count) {
            self.cancel();
            return;
        }
        if self.per_item != 0 {
            self.request(self.per_item);
        }
    }

    fn on_error(&self, error: StreamError) {
        self.seen.lock().unwrap().push(Seen::Error(error.as_label()));
    }

    fn on_complete(&self) {
        self.seen.lock().unwrap().push(Seen::Complete);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}
