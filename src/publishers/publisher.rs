//! # Publisher trait.
//!
//! A [`Publisher`] is a source that produces elements on demand to one
//! subscriber per subscription. Binding is delivered asynchronously through
//! [`Subscriber::on_subscribe`](crate::Subscriber::on_subscribe), never as a
//! return value.
//!
//! Every `subscribe` call starts an independent run: publishers must not share
//! cursor state between subscriptions.

use std::sync::Arc;

use crate::subscribers::Subscriber;

/// Source of demand-driven element streams.
pub trait Publisher {
    /// Element type of every subscription.
    type Item;

    /// Starts a new, independent subscription for `subscriber`.
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<Self::Item>>);
}
