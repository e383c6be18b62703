//! # Subscriber trait.
//!
//! Provides [`Subscriber`], the consumer side of a subscription.
//!
//! ## Signal sequence
//! ```text
//! on_subscribe ──► on_next* ──► (on_complete | on_error)?
//! ```
//! - `on_subscribe` is delivered exactly once, before anything else.
//! - `on_next` is delivered at most as many times as the demand granted via `request`.
//! - At most one terminal signal; none if the subscriber cancelled first.
//! - Signals for one subscription are never delivered concurrently.
//!
//! ## Rules
//! - Callbacks must not block; request more from inside `on_next` freely
//!   (the production loop picks the new demand up iteratively).
//! - A panic escaping `on_subscribe`/`on_next` cancels the subscription and
//!   is then resumed into the caller that drove delivery.
//!
//! ## Example
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use demandflow::{Publisher, SequencePublisher, StreamError, Subscriber, Subscription};
//!
//! #[derive(Default)]
//! struct Sum {
//!     total: Mutex<u32>,
//! }
//!
//! impl Subscriber<u32> for Sum {
//!     fn on_subscribe(&self, subscription: Subscription) {
//!         subscription.request(i64::MAX);
//!     }
//!     fn on_next(&self, item: u32) {
//!         *self.total.lock().unwrap() += item;
//!     }
//!     fn on_error(&self, _error: StreamError) {}
//!     fn on_complete(&self) {}
//!
//!     fn name(&self) -> &'static str { "sum" }
//! }
//!
//! let sum = Arc::new(Sum::default());
//! SequencePublisher::new(vec![1_u32, 2, 3]).subscribe(sum.clone());
//! assert_eq!(*sum.total.lock().unwrap(), 6);
//! ```

use crate::error::StreamError;
use crate::protocol::Subscription;

/// Receiver of elements and terminal signals for one subscription.
///
/// Callbacks take `&self`: the subscriber is shared (`Arc<dyn Subscriber<T>>`)
/// between the caller and the subscription, so state lives behind interior
/// mutability.
pub trait Subscriber<T>: Send + Sync {
    /// Delivers the subscription handle. Called once, before any other signal.
    fn on_subscribe(&self, subscription: Subscription);

    /// Delivers one element. Only called while demand is outstanding.
    fn on_next(&self, item: T);

    /// Terminal failure signal. No further signals follow.
    fn on_error(&self, error: StreamError);

    /// Terminal success signal. No further signals follow.
    fn on_complete(&self);

    /// Returns the subscriber name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
