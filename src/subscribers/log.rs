//! # LogWriter — simple signal printer
//!
//! A minimal subscriber that requests unbounded demand and prints every
//! signal it receives to stdout. Use it for test or demo.
//!
//! ## Example output
//! ```text
//! [subscribed] stream="numbers" subscription=1
//! [next] stream="numbers" item=1
//! [next] stream="numbers" item=2
//! [complete] stream="numbers"
//! [error] stream="numbers" label=producer_failed err="producer: disk gone"
//! ```

use std::fmt::Debug;

use crate::error::StreamError;
use crate::protocol::Subscription;
use crate::subscribers::Subscriber;

/// Signal writer subscriber.
#[derive(Clone, Debug)]
pub struct LogWriter {
    stream: &'static str,
    demand: i64,
}

impl LogWriter {
    /// Construct a new [`LogWriter`] with unbounded demand.
    #[must_use]
    pub fn new(stream: &'static str) -> Self {
        Self {
            stream,
            demand: i64::MAX,
        }
    }

    /// Requests only `demand` elements instead of everything.
    #[must_use]
    pub fn with_demand(mut self, demand: i64) -> Self {
        self.demand = demand;
        self
    }
}

impl Default for LogWriter {
    fn default() -> Self {
        Self::new("stream")
    }
}

impl<T: Debug> Subscriber<T> for LogWriter {
    fn on_subscribe(&self, subscription: Subscription) {
        println!(
            "[subscribed] stream={:?} subscription={}",
            self.stream,
            subscription.id()
        );
        subscription.request(self.demand);
    }

    fn on_next(&self, item: T) {
        println!("[next] stream={:?} item={:?}", self.stream, item);
    }

    fn on_error(&self, error: StreamError) {
        println!(
            "[error] stream={:?} label={} err={:?}",
            self.stream,
            error.as_label(),
            error.as_message()
        );
    }

    fn on_complete(&self) {
        println!("[complete] stream={:?}", self.stream);
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
