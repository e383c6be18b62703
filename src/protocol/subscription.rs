//! # ProtocolSubscription: demand-gated delivery for one subscriber.
//!
//! Mediates between one [`Producer`] and one [`Subscriber`] and enforces the
//! protocol regardless of what either side does:
//!
//! - elements delivered never exceed the demand granted via `request`;
//! - at most one terminal signal, none after `cancel`;
//! - signals are serialized: only the holder of the `producing` flag delivers;
//! - `request` issued from inside `on_next` never recurses into a new pass.
//!
//! ## Production loop
//! ```text
//! request(n) / cancel() ──► lock shared ──► producing? ──yes──► return (holder sees it)
//!                                               │ no
//!                                               ▼
//!                                     producing = true; drain()
//! drain() loop {
//!   ├─► Active, demand == 0       → producing = false, exit
//!   ├─► Cancelled / Terminated(_) → release producer, deliver pending terminal, exit
//!   └─► Active, demand > 0        → producer.produce(min(demand, batch), emitter)
//!          │                          └─► emit: check state, demand -= 1, on_next
//!          ├─ Ok(Pending)   → loop (re-reads demand: reentrant requests extend the pass)
//!          │                   nothing emitted and no request since planning → park
//!          ├─ Ok(Exhausted) → Terminated(Completed) + pending on_complete
//!          ├─ Err(e)        → Terminated(Failed) + pending on_error(e)
//!          └─ panic         → Terminated(Failed) + pending on_error(ProducerPanicked)
//! }
//! ```
//!
//! ## Rules
//! - `request`/`cancel` may come from any thread; both only touch the `shared`
//!   lock, so they are observed by the very next step of an in-flight pass.
//! - Locks are never held while calling into the subscriber.
//! - The `producer` lock is only taken by the `producing` holder.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::error::StreamError;
use crate::protocol::producer::{Deliver, Delivery, Emitter, Producer, Progress};
use crate::protocol::state::{Demand, SubscriptionState, Termination};
use crate::subscribers::Subscriber;

/// Global counter for subscription ids (diagnostics only).
static SUBSCRIPTION_SEQ: AtomicU64 = AtomicU64::new(1);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Terminal {
    Complete,
    Error(StreamError),
}

struct Shared<T> {
    state: SubscriptionState,
    demand: Demand,
    producing: bool,
    started: bool,
    /// Bumped by every accepted `request`; a pass that emitted nothing only
    /// parks if this did not move while it ran.
    requests: u64,
    /// Terminal signal decided but not yet delivered by the loop.
    pending: Option<Terminal>,
    /// Cleared on cancel/terminal so the handle <-> subscriber cycle is broken.
    subscriber: Option<Arc<dyn Subscriber<T>>>,
}

/// Generic subscription state machine driving a [`Producer`].
///
/// Publishers create one per `subscribe` call:
///
/// ```rust
/// use demandflow::{Config, Emitter, Producer, Progress, ProtocolSubscription, StreamError};
///
/// struct Countdown(u32);
///
/// impl Producer for Countdown {
///     type Item = u32;
///
///     fn produce(
///         &mut self,
///         _n: u64,
///         emitter: &mut Emitter<'_, u32>,
///     ) -> Result<Progress, StreamError> {
///         while self.0 > 0 && emitter.is_open() {
///             emitter.emit(self.0);
///             self.0 -= 1;
///         }
///         Ok(if self.0 == 0 { Progress::Exhausted } else { Progress::Pending })
///     }
/// }
///
/// let subscription = ProtocolSubscription::new(Countdown(3), &Config::default());
/// // subscription.start(subscriber);
/// assert!(!subscription.state().is_terminal());
/// ```
pub struct ProtocolSubscription<P: Producer> {
    id: u64,
    batch: Option<u64>,
    shared: Mutex<Shared<P::Item>>,
    producer: Mutex<Option<P>>,
}

impl<P: Producer> ProtocolSubscription<P> {
    /// Creates an unstarted subscription owning `producer`.
    pub fn new(producer: P, config: &Config) -> Arc<Self> {
        Arc::new(Self {
            id: SUBSCRIPTION_SEQ.fetch_add(1, Ordering::Relaxed),
            batch: config.batch_limit(),
            shared: Mutex::new(Shared {
                state: SubscriptionState::Active,
                demand: Demand::default(),
                producing: false,
                started: false,
                requests: 0,
                pending: None,
                subscriber: None,
            }),
            producer: Mutex::new(Some(producer)),
        })
    }

    /// Binds `subscriber` and delivers `on_subscribe` with the subscription handle.
    ///
    /// Nothing is produced before this call. A second call is ignored.
    pub fn start(self: &Arc<Self>, subscriber: Arc<dyn Subscriber<P::Item>>) {
        {
            let mut shared = lock(&self.shared);
            if shared.started {
                warn!(subscription = self.id, "start called twice; ignored");
                return;
            }
            shared.started = true;
            shared.subscriber = Some(Arc::clone(&subscriber));
        }
        debug!(
            subscription = self.id,
            subscriber = subscriber.name(),
            "subscription started"
        );

        let control: Arc<dyn Control> = Arc::clone(self) as Arc<dyn Control>;
        let handle = Subscription { control };
        if let Err(payload) =
            panic::catch_unwind(AssertUnwindSafe(|| subscriber.on_subscribe(handle)))
        {
            warn!(
                subscription = self.id,
                subscriber = subscriber.name(),
                "subscriber panicked in on_subscribe; cancelling"
            );
            self.cancel();
            panic::resume_unwind(payload);
        }
    }

    /// Diagnostic id, unique per process.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SubscriptionState {
        lock(&self.shared).state
    }

    /// Demand granted but not yet consumed.
    pub fn demand(&self) -> Demand {
        lock(&self.shared).demand
    }

    fn request(&self, n: i64) {
        let mut shared = lock(&self.shared);
        if shared.state.is_terminal() {
            trace!(subscription = self.id, requested = n, "request after termination ignored");
            return;
        }
        if n <= 0 {
            warn!(subscription = self.id, requested = n, "invalid demand; failing subscription");
            shared.state = SubscriptionState::Terminated(Termination::Failed);
            shared.pending = Some(Terminal::Error(StreamError::InvalidDemand { requested: n }));
        } else {
            shared.demand.add(n.unsigned_abs());
            shared.requests = shared.requests.wrapping_add(1);
            trace!(
                subscription = self.id,
                requested = n,
                demand = shared.demand.get(),
                "demand added"
            );
        }
        if shared.producing {
            return;
        }
        shared.producing = true;
        drop(shared);
        self.drain();
    }

    fn cancel(&self) {
        let mut shared = lock(&self.shared);
        if shared.state.is_terminal() {
            return;
        }
        debug!(subscription = self.id, "subscription cancelled");
        shared.state = SubscriptionState::Cancelled;
        shared.subscriber = None;
        if shared.producing {
            // The in-flight pass releases the producer at its next step.
            return;
        }
        shared.producing = true;
        drop(shared);
        self.drain();
    }

    /// Runs production passes until demand is spent or the subscription ends.
    ///
    /// Caller must have set `producing = true`.
    fn drain(&self) {
        loop {
            let (budget, stamp) = {
                let mut shared = lock(&self.shared);
                let state = shared.state;
                match state {
                    SubscriptionState::Active if shared.demand.is_zero() => {
                        shared.producing = false;
                        return;
                    }
                    SubscriptionState::Active => {
                        let demand = shared.demand.get();
                        let budget = self.batch.map_or(demand, |batch| demand.min(batch));
                        (budget, shared.requests)
                    }
                    state => {
                        shared.producing = false;
                        let terminal = shared.pending.take();
                        let subscriber = shared.subscriber.take();
                        drop(shared);

                        self.release_producer(state == SubscriptionState::Cancelled);
                        if let (Some(terminal), Some(subscriber)) = (terminal, subscriber) {
                            self.signal_terminal(subscriber.as_ref(), terminal);
                        }
                        return;
                    }
                }
            };

            if !self.produce_pass(budget, stamp) {
                return;
            }
        }
    }

    /// One call into the production hook. Returns `false` when the loop should park.
    ///
    /// `stamp` is the request count observed when the pass was planned.
    fn produce_pass(&self, budget: u64, stamp: u64) -> bool {
        let mut slot = lock(&self.producer);
        let Some(producer) = slot.as_mut() else {
            let mut shared = lock(&self.shared);
            shared.producing = false;
            return false;
        };

        let sink: &dyn Deliver<P::Item> = self;
        let mut emitter = Emitter::new(sink, budget);
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| producer.produce(budget, &mut emitter)));
        let emitted = emitter.emitted();
        let subscriber_panic = emitter.take_panic();
        drop(emitter);
        drop(slot);

        if let Some(payload) = subscriber_panic {
            self.abort();
            panic::resume_unwind(payload);
        }

        let mut shared = lock(&self.shared);
        if shared.state.is_terminal() {
            // Cancelled or failed mid-pass; the loop settles it.
            return true;
        }
        trace!(subscription = self.id, budget, emitted, "production pass finished");

        let error = match outcome {
            Ok(Ok(Progress::Pending)) => {
                if emitted == 0 && shared.requests == stamp {
                    shared.producing = false;
                    return false;
                }
                return true;
            }
            Ok(Ok(Progress::Exhausted)) => {
                shared.state = SubscriptionState::Terminated(Termination::Completed);
                shared.pending = Some(Terminal::Complete);
                return true;
            }
            Ok(Err(error)) => error,
            Err(payload) => StreamError::from_panic(payload.as_ref()),
        };
        warn!(
            subscription = self.id,
            error = error.as_label(),
            "producer failed: {}",
            error.as_message()
        );
        shared.state = SubscriptionState::Terminated(Termination::Failed);
        shared.pending = Some(Terminal::Error(error));
        true
    }

    /// Tears the subscription down after a subscriber panic inside a pass.
    fn abort(&self) {
        {
            let mut shared = lock(&self.shared);
            warn!(
                subscription = self.id,
                "subscriber panicked in on_next; cancelling"
            );
            if !shared.state.is_terminal() {
                shared.state = SubscriptionState::Cancelled;
            }
            shared.pending = None;
            shared.subscriber = None;
            shared.producing = false;
        }
        self.release_producer(true);
    }

    fn release_producer(&self, cancelled: bool) {
        let released = lock(&self.producer).take();
        let Some(mut producer) = released else {
            return;
        };
        if cancelled {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| producer.on_cancel())) {
                warn!(
                    subscription = self.id,
                    "producer panicked in on_cancel: {}",
                    crate::error::panic_message(payload.as_ref())
                );
            }
        }
        drop(producer);
        trace!(subscription = self.id, cancelled, "producer released");
    }

    fn signal_terminal(&self, subscriber: &dyn Subscriber<P::Item>, terminal: Terminal) {
        match terminal {
            Terminal::Complete => {
                debug!(subscription = self.id, "subscription completed");
                subscriber.on_complete();
            }
            Terminal::Error(error) => {
                debug!(
                    subscription = self.id,
                    error = error.as_label(),
                    "subscription failed"
                );
                subscriber.on_error(error);
            }
        }
    }
}

impl<P: Producer> Deliver<P::Item> for ProtocolSubscription<P> {
    fn deliver(&self, item: P::Item) -> Delivery {
        let subscriber = {
            let mut shared = lock(&self.shared);
            if shared.state.is_terminal() {
                return Delivery::Refused;
            }
            let Some(subscriber) = shared.subscriber.clone() else {
                return Delivery::Refused;
            };
            if !shared.demand.take_one() {
                return Delivery::Refused;
            }
            subscriber
        };
        match panic::catch_unwind(AssertUnwindSafe(|| subscriber.on_next(item))) {
            Ok(()) => Delivery::Delivered,
            Err(payload) => Delivery::Panicked(payload),
        }
    }

    fn is_active(&self) -> bool {
        !lock(&self.shared).state.is_terminal()
    }
}

/// Type-erased control surface behind a [`Subscription`] handle.
trait Control: Send + Sync {
    fn id(&self) -> u64;
    fn request(&self, n: i64);
    fn cancel(&self);
    fn state(&self) -> SubscriptionState;
}

impl<P: Producer> Control for ProtocolSubscription<P> {
    fn id(&self) -> u64 {
        self.id
    }

    fn request(&self, n: i64) {
        ProtocolSubscription::request(self, n);
    }

    fn cancel(&self) {
        ProtocolSubscription::cancel(self);
    }

    fn state(&self) -> SubscriptionState {
        ProtocolSubscription::state(self)
    }
}

/// Handle given to a subscriber through `on_subscribe`.
///
/// Cheap to clone; all clones control the same subscription and may be used
/// from any thread.
#[derive(Clone)]
pub struct Subscription {
    control: Arc<dyn Control>,
}

impl Subscription {
    /// Grants `n` more elements.
    ///
    /// `n <= 0` is a protocol violation: the subscriber receives a single
    /// [`StreamError::InvalidDemand`] and the subscription terminates. After
    /// termination or cancellation this is a no-op.
    pub fn request(&self, n: i64) {
        self.control.request(n);
    }

    /// Stops the subscription. Idempotent; no signal is delivered afterwards.
    pub fn cancel(&self) {
        self.control.cancel();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SubscriptionState {
        self.control.state()
    }

    /// True once the subscription was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state() == SubscriptionState::Cancelled
    }

    /// Diagnostic id of the underlying subscription.
    pub fn id(&self) -> u64 {
        self.control.id()
    }

    /// Cancels this subscription once `token` is cancelled.
    ///
    /// Spawns a task on the current Tokio runtime; must be called from within one.
    pub fn cancel_on(&self, token: CancellationToken) -> JoinHandle<()> {
        let subscription = self.clone();
        tokio::spawn(async move {
            token.cancelled().await;
            subscription.cancel();
        })
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}
