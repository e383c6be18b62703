//! # Subscribers: the consuming side of a subscription.
//!
//! This module provides the [`Subscriber`] trait and built-in implementations.
//!
//! ## Architecture
//! ```text
//! Publisher::subscribe(Arc<dyn Subscriber<T>>)
//!      │
//!      └──► on_subscribe(Subscription) ──► request(n) ──► on_next(T) × ≤n
//!                                                          │
//!                                                          └──► on_complete() | on_error(e)
//! ```
//!
//! ## Built-in subscribers
//! - [`SubscriberStream`] — async bridge: a `futures::Stream` whose reader grants demand.
//! - [`LogWriter`] — prints every signal (feature `logging`, demo/debug).

#[cfg(feature = "logging")]
mod log;
mod stream;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use stream::SubscriberStream;
pub use subscriber::Subscriber;
