//! # Production hook.
//!
//! [`Producer`] is the producer-specific half of a subscription: "produce up to
//! `n` elements". The generic half (demand accounting, serialization,
//! cancellation, terminal signals) lives in
//! [`ProtocolSubscription`](crate::ProtocolSubscription).
//!
//! Elements are handed to the core through an [`Emitter`], which performs the
//! per-element protocol step:
//!
//! ```text
//! emit(item) ──► state Active? ──no──► false (item dropped, stop producing)
//!                    │ yes
//!                    ▼
//!              demand -= 1 ──► subscriber.on_next(item) ──► true
//! ```

use std::any::Any;

use crate::error::StreamError;

/// Outcome of one production pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    /// The source may have more elements; wait for further demand.
    Pending,
    /// The source is exhausted; the subscription completes.
    Exhausted,
}

/// # Producer-specific production logic.
///
/// One instance is exclusively owned by one subscription and is only ever
/// driven by that subscription's production loop, one pass at a time.
///
/// ### Contract
/// - Emit at most `n` elements per call (the emitter refuses extras).
/// - Stop as soon as [`Emitter::emit`] returns `false` or [`Emitter::is_open`] is `false`.
/// - Return `Err` to fail the subscription; the error becomes the single `on_error` signal.
/// - Returning [`Progress::Pending`] without emitting anything parks the
///   subscription until the next `request`, unless one already arrived while
///   the pass ran; then the loop runs another pass.
///
/// Panics raised inside `produce` are caught by the core and reported as
/// [`StreamError::ProducerPanicked`].
pub trait Producer: Send + 'static {
    /// Element type delivered to the subscriber.
    type Item: Send + 'static;

    /// Produces up to `n` elements through `emitter`.
    fn produce(&mut self, n: u64, emitter: &mut Emitter<'_, Self::Item>)
        -> Result<Progress, StreamError>;

    /// Called once when the subscription is cancelled, right before the producer is dropped.
    ///
    /// Default: no-op (dropping the producer releases its resources).
    fn on_cancel(&mut self) {}
}

pub(crate) enum Delivery {
    Delivered,
    Refused,
    Panicked(Box<dyn Any + Send>),
}

/// Subscription side of an [`Emitter`].
pub(crate) trait Deliver<T> {
    fn deliver(&self, item: T) -> Delivery;
    fn is_active(&self) -> bool;
}

/// Per-pass handle a [`Producer`] uses to hand elements to its subscriber.
pub struct Emitter<'a, T> {
    sink: &'a dyn Deliver<T>,
    remaining: u64,
    emitted: u64,
    panic: Option<Box<dyn Any + Send>>,
}

impl<'a, T> Emitter<'a, T> {
    pub(crate) fn new(sink: &'a dyn Deliver<T>, budget: u64) -> Self {
        Self {
            sink,
            remaining: budget,
            emitted: 0,
            panic: None,
        }
    }

    /// Delivers one element.
    ///
    /// Returns `false` if the element was not delivered or production must
    /// stop: the pass budget is spent, the subscription is no longer active,
    /// or the subscriber panicked.
    pub fn emit(&mut self, item: T) -> bool {
        if self.remaining == 0 || self.panic.is_some() {
            return false;
        }
        match self.sink.deliver(item) {
            Delivery::Delivered => {
                self.remaining -= 1;
                self.emitted += 1;
                true
            }
            Delivery::Refused => {
                self.remaining = 0;
                false
            }
            Delivery::Panicked(payload) => {
                self.remaining = 0;
                self.panic = Some(payload);
                false
            }
        }
    }

    /// Elements this pass may still emit.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Elements delivered so far in this pass.
    #[inline]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// True while the subscription is active (not cancelled or terminated).
    pub fn is_active(&self) -> bool {
        self.panic.is_none() && self.sink.is_active()
    }

    /// True if another [`emit`](Self::emit) could succeed.
    ///
    /// Producers should check this before advancing their source so that
    /// no element is pulled only to be dropped.
    pub fn is_open(&self) -> bool {
        self.remaining > 0 && self.is_active()
    }

    pub(crate) fn take_panic(&mut self) -> Option<Box<dyn Any + Send>> {
        self.panic.take()
    }
}
