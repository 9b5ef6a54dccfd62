//! # rylv-statsd-encoding
//!
//! Allocation-free encoding of `DogStatsD` metric lines and tag blocks.
//!
//! ## Features
//!
//! - **Fixed-capacity cursor**: every write fully succeeds or leaves the buffer untouched
//! - **Tag formatting**: configurable prefix, suffix and separators, exact size measurement
//! - **Per-thread scratch buffers**: no locks and no allocation once a thread is warmed up
//! - **Exact decimals**: floats print their shortest round-trip digits, never exponent notation
//!
//! ## Quick Start
//!
//! ```
//! use rylv_statsd_encoding::{Cursor, MetricLine, MetricType, MetricValue, TagFormatOptions, TagFormatter};
//!
//! let formatter = TagFormatter::new(TagFormatOptions::dogstatsd()).unwrap();
//! let tags = [("endpoint", Some("api")), ("canary", None)];
//! let formatted = formatter.format(&tags).unwrap();
//!
//! let line = MetricLine {
//!     prefix: "myapp.",
//!     name: "request.latency",
//!     value: MetricValue::Float(12.5),
//!     metric_type: MetricType::Timing,
//!     sample_rate: None,
//! };
//! let len = line.encoded_len(formatted.len()).unwrap();
//!
//! let mut datagram = [0u8; 512];
//! let mut cursor = Cursor::new(&mut datagram[..len]);
//! line.encode(&mut cursor, &formatted, formatter.placement()).unwrap();
//! assert_eq!(&datagram[..len], b"myapp.request.latency:12.5|ms|#endpoint:api,canary\n");
//! ```

// #![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]
#![warn(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

// https://docs.datadoghq.com/developers/dogstatsd/datagram_shell/?tab=metrics
mod dogstats;
mod error;

pub use dogstats::cursor::{Cursor, MAX_DECIMAL_MAGNITUDE, MIN_DECIMAL_MAGNITUDE};
pub use dogstats::encoder::{DatagramSink, MetricEncoder, MetricEncoderOptions};
pub use dogstats::line::{MetricLine, MetricType, MetricValue};
pub use dogstats::size::{f64_len, i64_len, u64_len};
pub use dogstats::tags::{
    FormattedTags, TagFormatOptions, TagFormatter, TagPlacement, TagSet, DEFAULT_SCRATCH_CAPACITY,
};
pub use error::{EncodeError, MetricsError};

/// Result type for metric operations.
///
/// Wraps errors that can occur during metric encoding and emission.
pub type MetricResult<T> = Result<T, MetricsError>;
