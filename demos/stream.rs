//! # Example: stream
//!
//! Reads a publisher through [`SubscriberStream`]: reading is what grants demand,
//! so the producer never runs more than `prefetch` elements ahead of the reader.
//!
//! Also shows tying a subscription to a [`CancellationToken`].
//!
//! ## Run
//! ```bash
//! cargo run --example stream
//! ```

use std::time::Duration;

use demandflow::{Config, SequencePublisher, SubscriberStream};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cfg = Config {
        prefetch: 4,
        ..Config::default()
    };

    // Whole sequence, slow reader.
    let publisher = SequencePublisher::new(1..=10_u32);
    let mut stream = SubscriberStream::subscribe(&publisher, &cfg);
    while let Some(item) = stream.next().await {
        match item {
            Ok(n) => println!("[read] {n}"),
            Err(e) => println!("[error] {}", e.as_message()),
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    println!("[done]");

    // Failing cursor: one error, then the stream ends.
    let flaky = SequencePublisher::fallible(|| {
        vec![
            Ok("first"),
            Err(std::io::Error::other("cursor broke")),
            Ok("never"),
        ]
    });
    let results: Vec<_> = SubscriberStream::subscribe(&flaky, &cfg).collect().await;
    println!("[flaky] {results:?}");

    // Shutdown token cancels an endless reader.
    let token = CancellationToken::new();
    let endless = SequencePublisher::new(0_u64..);
    let mut stream = SubscriberStream::subscribe(&endless, &cfg);
    if let Some(subscription) = stream.subscription() {
        subscription.cancel_on(token.clone());
    }

    let mut read = 0;
    while let Some(Ok(_)) = stream.next().await {
        read += 1;
        if read == 25 {
            println!("[shutdown] cancelling after {read} items");
            token.cancel();
            tokio::task::yield_now().await;
        }
    }
    println!("[endless] stopped after {read} items");
}
