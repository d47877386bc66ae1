//! Bounded Ring Buffer
//!
//! Fixed-capacity history storage. Pushing into a full buffer overwrites the
//! oldest sample, so memory per owner stays constant for its whole lifetime.

mod buffer;

pub use buffer::RingBuffer;

use serde::{Deserialize, Serialize};

/// A value stamped with the index of the frame it was observed in
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stamped<T> {
    pub frame_index: u64,
    pub value: T,
}

impl<T> Stamped<T> {
    /// Tag `value` with `frame_index`
    pub fn new(frame_index: u64, value: T) -> Self {
        Self { frame_index, value }
    }
}
