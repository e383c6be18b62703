//! # SubscriberStream: async bridge over any publisher.
//!
//! [`SubscriberStream`] subscribes a channel-backed subscriber to a
//! [`Publisher`] and exposes the result as a [`futures::Stream`]. Reading
//! from the stream is what grants demand, so a slow reader throttles the
//! producer.
//!
//! ## Demand window
//! ```text
//! subscribe ──► request(prefetch)
//!
//! poll_next ──► [channel] ──► item
//!                  ▲            │ consumed += 1
//!                  │            └─► consumed == prefetch/2 ──► request(consumed)
//!   on_next ───────┘
//! ```
//! Buffered plus outstanding elements never exceed `prefetch`.
//!
//! ## Rules
//! - Ends (`None`) after completion.
//! - Yields one `Err` on failure, then ends.
//! - Dropping the stream cancels the subscription.
//!
//! ## Example
//! ```rust
//! use futures::StreamExt;
//! use demandflow::{Config, SequencePublisher, SubscriberStream};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let publisher = SequencePublisher::new(vec![1, 2, 3]);
//! let items: Vec<_> = SubscriberStream::subscribe(&publisher, &Config::default())
//!     .map(|r| r.unwrap())
//!     .collect()
//!     .await;
//! assert_eq!(items, vec![1, 2, 3]);
//! # }
//! ```

use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};

use futures::stream::{FusedStream, Stream};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::StreamError;
use crate::protocol::Subscription;
use crate::publishers::Publisher;
use crate::subscribers::Subscriber;

enum Signal<T> {
    Next(T),
    Error(StreamError),
    Complete,
}

fn as_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Forwards signals into the stream's channel.
struct ChannelSubscriber<T> {
    tx: mpsc::UnboundedSender<Signal<T>>,
    subscription: Arc<OnceLock<Subscription>>,
    prefetch: usize,
}

impl<T: Send> Subscriber<T> for ChannelSubscriber<T> {
    fn on_subscribe(&self, subscription: Subscription) {
        let _ = self.subscription.set(subscription.clone());
        subscription.request(as_count(self.prefetch));
    }

    fn on_next(&self, item: T) {
        let _ = self.tx.send(Signal::Next(item));
    }

    fn on_error(&self, error: StreamError) {
        let _ = self.tx.send(Signal::Error(error));
    }

    fn on_complete(&self) {
        let _ = self.tx.send(Signal::Complete);
    }

    fn name(&self) -> &'static str {
        "subscriber-stream"
    }
}

/// [`Stream`] of `Result<T, StreamError>` fed by a publisher under bounded demand.
pub struct SubscriberStream<T> {
    rx: mpsc::UnboundedReceiver<Signal<T>>,
    subscription: Arc<OnceLock<Subscription>>,
    consumed: usize,
    threshold: usize,
    done: bool,
}

impl<T: Send + 'static> SubscriberStream<T> {
    /// Subscribes to `publisher` with the demand window from `config.prefetch`.
    pub fn subscribe<P>(publisher: &P, config: &Config) -> Self
    where
        P: Publisher<Item = T> + ?Sized,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = Arc::new(OnceLock::new());
        publisher.subscribe(Arc::new(ChannelSubscriber {
            tx,
            subscription: Arc::clone(&subscription),
            prefetch: config.prefetch_clamped(),
        }));
        Self {
            rx,
            subscription,
            consumed: 0,
            threshold: config.replenish_threshold(),
            done: false,
        }
    }
}

impl<T> SubscriberStream<T> {
    /// Handle of the underlying subscription, once established.
    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.get()
    }

    /// Cancels the subscription and ends the stream.
    pub fn cancel(&mut self) {
        if let Some(subscription) = self.subscription.get() {
            subscription.cancel();
        }
        self.done = true;
    }
}

impl<T> Stream for SubscriberStream<T> {
    type Item = Result<T, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Signal::Next(item))) => {
                this.consumed += 1;
                if this.consumed >= this.threshold {
                    let n = std::mem::take(&mut this.consumed);
                    if let Some(subscription) = this.subscription.get() {
                        subscription.request(as_count(n));
                    }
                }
                Poll::Ready(Some(Ok(item)))
            }
            Poll::Ready(Some(Signal::Error(error))) => {
                this.done = true;
                Poll::Ready(Some(Err(error)))
            }
            Poll::Ready(Some(Signal::Complete)) | Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
        }
    }
}

impl<T> FusedStream for SubscriberStream<T> {
    fn is_terminated(&self) -> bool {
        self.done
    }
}

impl<T> Drop for SubscriberStream<T> {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.get() {
            subscription.cancel();
        }
    }
}
