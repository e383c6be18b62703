//! # Example: sequence
//!
//! Drives a [`SequencePublisher`] by hand with a subscriber that requests in batches.
//!
//! Shows how to:
//! - Implement [`Subscriber`] with interior mutability
//! - Request more demand from inside `on_next` (no recursion, no stack growth)
//! - Observe the single terminal signal
//!
//! ## Flow
//! ```text
//! main()
//!   └─► publisher.subscribe(batcher)
//!         ├─► on_subscribe ──► request(3)
//!         ├─► on_next × 3  ──► (after every 3rd item) request(3)
//!         ├─► ...
//!         └─► on_complete
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example sequence
//! ```

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};

use demandflow::{Publisher, SequencePublisher, StreamError, Subscriber, Subscription};

const BATCH: i64 = 3;

struct Batcher {
    subscription: Mutex<Option<Subscription>>,
    received: AtomicU64,
}

impl Batcher {
    fn new() -> Self {
        Self {
            subscription: Mutex::new(None),
            received: AtomicU64::new(0),
        }
    }
}

impl Subscriber<String> for Batcher {
    fn on_subscribe(&self, subscription: Subscription) {
        println!("[subscribed] id={}", subscription.id());
        if let Ok(mut slot) = self.subscription.lock() {
            *slot = Some(subscription.clone());
        }
        subscription.request(BATCH);
    }

    fn on_next(&self, item: String) {
        let n = self.received.fetch_add(1, Ordering::Relaxed) + 1;
        println!("[next] #{n} {item}");

        if n % BATCH as u64 == 0 {
            let subscription = self.subscription.lock().ok().and_then(|s| s.clone());
            if let Some(subscription) = subscription {
                println!(" └─► request({BATCH})");
                subscription.request(BATCH);
            }
        }
    }

    fn on_error(&self, error: StreamError) {
        println!("[error] {error}");
    }

    fn on_complete(&self) {
        println!("[complete] after {} items", self.received.load(Ordering::Relaxed));
    }

    fn name(&self) -> &'static str {
        "batcher"
    }
}

fn main() {
    let words: Vec<String> = "the quick brown fox jumps over the lazy dog"
        .split_whitespace()
        .map(str::to_owned)
        .collect();

    let publisher = SequencePublisher::new(words);
    publisher.subscribe(Arc::new(Batcher::new()));

    // A second subscription is an independent run over the same words.
    publisher.subscribe(Arc::new(Batcher::new()));
}
