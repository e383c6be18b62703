//! # demandflow
//!
//! **demandflow** is a minimal demand-driven streaming core for Rust.
//!
//! A producer emits elements to a subscriber only as far as the subscriber
//! has explicitly requested (backpressure). Every subscription can be
//! cancelled at any point and ends with at most one terminal signal.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌──────────────────────┐  subscribe(Arc<dyn Subscriber<T>>)
//!  │ Publisher            │◄──────────────────────────────────┐
//!  │ (SequencePublisher)  │                                   │
//!  └──────────┬───────────┘                                   │
//!             │ one per subscribe call                        │
//!             ▼                                               │
//! ┌────────────────────────────────────────────────┐   ┌──────┴───────────┐
//! │ ProtocolSubscription<P: Producer>              │   │ Subscriber<T>    │
//! │  - Demand (saturating counter)                 │   │  on_subscribe    │
//! │  - SubscriptionState (Active/Cancelled/Term.)  │──►│  on_next  (≤ n)  │
//! │  - producing flag (serialized, iterative loop) │   │  on_error        │
//! │  - Producer (exclusively owned cursor)         │   │  on_complete     │
//! └──────────┬─────────────────────────────────────┘   └──────┬───────────┘
//!            ▲                                                │
//!            └──────── Subscription::request(n) / cancel() ───┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! subscribe ──► ProtocolSubscription::new(producer) ──► start(subscriber)
//!                                                          └─► on_subscribe(Subscription)
//! request(n):
//!   ├─► n <= 0           ─► on_error(InvalidDemand), Terminated(Failed)
//!   ├─► loop running     ─► demand += n (the running loop picks it up)
//!   └─► otherwise        ─► demand += n, run production loop:
//!         while Active && demand > 0:
//!           produce(min(demand, batch)) ─► emit ─► demand -= 1 ─► on_next
//!           ├─ Exhausted ─► on_complete, Terminated(Completed)
//!           └─ Err/panic ─► on_error,    Terminated(Failed)
//! cancel():
//!   └─► Cancelled, producer released, no further signals
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                         |
//! |-------------------|---------------------------------------------------------------|--------------------------------------------|
//! | **Protocol**      | Demand accounting, serialized delivery, cancellation.         | [`ProtocolSubscription`], [`Subscription`] |
//! | **Producers**     | Plug custom "produce up to n" logic into the protocol.        | [`Producer`], [`Emitter`], [`Progress`]    |
//! | **Publishers**    | Subscribe capability and the in-memory sequence adapter.      | [`Publisher`], [`SequencePublisher`]       |
//! | **Subscribers**   | Consumer capability and an async `Stream` bridge.             | [`Subscriber`], [`SubscriberStream`]       |
//! | **Errors**        | Typed terminal failures with stable labels.                   | [`StreamError`]                            |
//! | **Configuration** | Prefetch window and per-pass batch limit.                     | [`Config`]                                 |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use demandflow::{Publisher, SequencePublisher, StreamError, Subscriber, Subscription};
//!
//! #[derive(Default)]
//! struct Collect {
//!     subscription: Mutex<Option<Subscription>>,
//!     items: Mutex<Vec<u32>>,
//!     done: Mutex<bool>,
//! }
//!
//! impl Subscriber<u32> for Collect {
//!     fn on_subscribe(&self, subscription: Subscription) {
//!         *self.subscription.lock().unwrap() = Some(subscription);
//!     }
//!     fn on_next(&self, item: u32) {
//!         self.items.lock().unwrap().push(item);
//!     }
//!     fn on_error(&self, _error: StreamError) {}
//!     fn on_complete(&self) {
//!         *self.done.lock().unwrap() = true;
//!     }
//! }
//!
//! let publisher = SequencePublisher::new(vec![1_u32, 2, 3]);
//! let consumer = Arc::new(Collect::default());
//! publisher.subscribe(consumer.clone());
//!
//! let subscription = consumer.subscription.lock().unwrap().clone().unwrap();
//! subscription.request(2);
//! assert_eq!(*consumer.items.lock().unwrap(), vec![1, 2]);
//! assert!(!*consumer.done.lock().unwrap());
//!
//! subscription.request(1);
//! assert_eq!(*consumer.items.lock().unwrap(), vec![1, 2, 3]);
//! assert!(*consumer.done.lock().unwrap());
//! ```
mod config;
mod error;
mod protocol;
mod publishers;
mod subscribers;

#[cfg(test)]
mod test_support;

// ---- Public re-exports ----

pub use config::Config;
pub use error::{BoxError, StreamError};
pub use protocol::{
    Demand, Emitter, Producer, Progress, ProtocolSubscription, Subscription, SubscriptionState,
    Termination,
};
pub use publishers::{Publisher, SequencePublisher};
pub use subscribers::{Subscriber, SubscriberStream};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
