//! Subscription protocol core.
//!
//! This module contains the demand-driven state machine shared by every
//! publisher. Publishers supply a [`Producer`] (the "produce up to n" hook)
//! and get protocol compliance for free.
//!
//! ## Contents
//! - [`ProtocolSubscription`] generic state machine (demand, serialization, cancellation)
//! - [`Subscription`]         cloneable handle handed to subscribers
//! - [`Producer`], [`Emitter`], [`Progress`] the production hook and its per-pass sink
//! - [`Demand`], [`SubscriptionState`], [`Termination`] accounting and lifecycle types
//!
//! ## Quick wiring
//! ```text
//! Publisher::subscribe(subscriber)
//!      └─► ProtocolSubscription::new(producer, &config).start(subscriber)
//!           └─► subscriber.on_subscribe(Subscription)
//!                └─► Subscription::request(n) ──► drain loop ──► Producer::produce(n, emitter)
//! ```

mod producer;
mod state;
mod subscription;

pub use producer::{Emitter, Producer, Progress};
pub use state::{Demand, SubscriptionState, Termination};
pub use subscription::{ProtocolSubscription, Subscription};
