use thiserror::Error;

/// Failure of a single [`Cursor`](crate::Cursor) write.
///
/// A failed write never leaves partial output behind, so callers are free to
/// retry with a larger destination.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum EncodeError {
    /// The payload does not fit in the remaining space.
    #[error("Not enough space: needed {needed} bytes, {remaining} remaining")]
    Overflow {
        /// Bytes the payload requires.
        needed: usize,
        /// Bytes left in the destination.
        remaining: usize,
    },

    /// NaN or infinite floating-point value.
    #[error("Non finite value: {0}")]
    NonFinite(f64),

    /// Floating-point value outside the representable decimal range.
    #[error("Value out of decimal range: {0}")]
    OutOfRange(f64),
}

/// Errors that can occur while encoding and emitting metrics.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// A custom error with a free-form message.
    #[error("Custom error: {0}")]
    Custom(String),

    /// An I/O error from the standard library.
    #[error("Std Io error: {0}")]
    StdIo(#[from] std::io::Error),

    /// A cursor write failed outside of the tag formatter's retry path.
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// An exactly sized render finished with a different number of bytes than measured.
    #[error("Sizing mismatch: computed {expected} bytes, wrote {written}")]
    SizingContract {
        /// Size computed by the measurement pass.
        expected: usize,
        /// Bytes the render wrote.
        written: usize,
    },

    /// An exactly sized render ran out of space before it finished.
    #[error("Sizing mismatch: computed {expected} bytes, render overflowed: {source}")]
    SizingOverflow {
        /// Size computed by the measurement pass.
        expected: usize,
        /// The failed cursor write.
        source: EncodeError,
    },

    /// The thread's scratch buffer is still borrowed by a previous result or an outer call.
    #[error("Scratch buffer is still borrowed on this thread")]
    ScratchBusy,

    /// An assembled metric line is larger than the maximum datagram size.
    #[error("Metric is larger than {max} ({len} bytes)")]
    DatagramTooLarge {
        /// Encoded line length.
        len: usize,
        /// Configured maximum datagram size.
        max: usize,
    },
}

impl From<String> for MetricsError {
    fn from(value: String) -> Self {
        Self::Custom(value)
    }
}

impl From<&str> for MetricsError {
    fn from(value: &str) -> Self {
        Self::Custom(value.to_string())
    }
}
