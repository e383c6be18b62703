//! Publishers: sources that subscribers attach to.
//!
//! - [`Publisher`] the subscribe capability
//! - [`SequencePublisher`] adapts a finite, synchronously iterable sequence

mod publisher;
mod sequence;

pub use publisher::Publisher;
pub use sequence::SequencePublisher;
