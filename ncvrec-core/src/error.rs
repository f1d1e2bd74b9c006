//! Error types for ncvrec-core.

use thiserror::Error;

use crate::pulse::ChannelId;

/// Result type alias for reconstruction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for reconstruction operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error, surfaced at engine construction.
    #[error("configuration error: {0}")]
    Config(String),

    /// Pulses on a channel violate the time-ordering precondition.
    #[error("pulses on channel {channel} are not time-ordered at pulse index {index}")]
    UnsortedPulses {
        /// Channel carrying the out-of-order pulse.
        channel: ChannelId,
        /// Flattened pulse index (across groups) where the order breaks.
        index: usize,
    },

    /// A pulse carries a timestamp before the minibuffer start.
    #[error("negative pulse timestamp {time} ns on channel {channel}")]
    NegativeTimestamp {
        /// Channel carrying the malformed pulse.
        channel: ChannelId,
        /// The offending timestamp.
        time: i64,
    },
}
