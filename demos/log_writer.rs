//! # Example: log_writer
//!
//! Attaches the built-in [`LogWriter`] to a few publishers.
//!
//! ## Run
//! ```bash
//! cargo run --example log_writer --features logging
//! ```

use std::sync::Arc;

use demandflow::{LogWriter, Publisher, SequencePublisher};

fn main() {
    let numbers = SequencePublisher::new(vec![1, 2, 3]);
    numbers.subscribe(Arc::new(LogWriter::new("numbers")));

    // Only two elements requested: no completion is printed.
    numbers.subscribe(Arc::new(LogWriter::new("partial").with_demand(2)));

    // Protocol violation: request(0) fails the subscription.
    numbers.subscribe(Arc::new(LogWriter::new("invalid").with_demand(0)));

    let flaky = SequencePublisher::fallible(|| {
        vec![Ok("a"), Err(std::io::Error::other("disk gone"))]
    });
    flaky.subscribe(Arc::new(LogWriter::new("flaky")));
}
