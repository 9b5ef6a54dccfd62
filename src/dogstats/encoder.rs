use std::cell::RefCell;

use thread_local::ThreadLocal;
use tracing::warn;

use super::cursor::Cursor;
use super::line::{MetricLine, MetricType, MetricValue};
use super::tags::{TagFormatOptions, TagFormatter, TagSet};
use crate::{MetricResult, MetricsError};

/// Destination for finished datagrams, such as a connected UDP socket.
///
/// Each call receives exactly one encoded metric line.
pub trait DatagramSink {
    /// Sends one datagram and returns the number of bytes accepted.
    ///
    /// # Errors
    /// Returns `MetricResult::Err` if the transport rejects the datagram.
    fn send(&self, datagram: &[u8]) -> MetricResult<usize>;
}

impl<T> DatagramSink for &T
where
    T: DatagramSink + ?Sized,
{
    fn send(&self, datagram: &[u8]) -> MetricResult<usize> {
        (*self).send(datagram)
    }
}

/// Configuration options for [`MetricEncoder`].
#[derive(Debug, Clone)]
pub struct MetricEncoderOptions {
    /// Prefix prepended verbatim to all metric names. Include a trailing dot if desired (e.g., `"myapp."` results in `"myapp.metric"`).
    pub stats_prefix: String,
    /// Maximum size of a single datagram in bytes. Recommended: 1432 for safe MTU.
    pub max_datagram_size: u16,
    /// Tag block layout.
    pub tags: TagFormatOptions,
}

impl Default for MetricEncoderOptions {
    fn default() -> Self {
        Self {
            stats_prefix: String::new(),
            max_datagram_size: 1432,
            tags: TagFormatOptions::default(),
        }
    }
}

/// Encodes one metric per datagram and hands it to a [`DatagramSink`].
///
/// Tags go through a [`TagFormatter`], the full line is measured before it is
/// written, and the line is assembled in a per-thread buffer of
/// `max_datagram_size` bytes, so steady-state emission does not allocate.
///
/// ```
/// use rylv_statsd_encoding::{
///     DatagramSink, MetricEncoder, MetricEncoderOptions, MetricResult, MetricType,
/// };
/// use std::sync::Mutex;
///
/// struct Capture(Mutex<Vec<String>>);
///
/// impl DatagramSink for Capture {
///     fn send(&self, datagram: &[u8]) -> MetricResult<usize> {
///         let text = String::from_utf8_lossy(datagram).into_owned();
///         self.0.lock().unwrap().push(text);
///         Ok(datagram.len())
///     }
/// }
///
/// let encoder = MetricEncoder::new(MetricEncoderOptions {
///     stats_prefix: "myapp.".to_string(),
///     ..Default::default()
/// })
/// .unwrap();
/// let sink = Capture(Mutex::new(Vec::new()));
/// encoder
///     .emit(&sink, "requests", 1, MetricType::Count, &[("endpoint", Some("api"))])
///     .unwrap();
/// assert_eq!(sink.0.lock().unwrap()[0], "myapp.requests:1|c|#endpoint:api\n");
/// ```
pub struct MetricEncoder {
    stats_prefix: String,
    max_datagram_size: usize,
    tags: TagFormatter,
    lines: ThreadLocal<RefCell<Box<[u8]>>>,
}

impl std::fmt::Debug for MetricEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricEncoder")
            .field("stats_prefix", &self.stats_prefix)
            .field("max_datagram_size", &self.max_datagram_size)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

impl MetricEncoder {
    /// Creates an encoder.
    ///
    /// # Errors
    /// Returns [`MetricsError`] if `max_datagram_size` is 0 or the tag options are invalid.
    pub fn new(options: MetricEncoderOptions) -> MetricResult<Self> {
        if options.max_datagram_size == 0 {
            return Err(MetricsError::from(
                "Invalid max datagram size: must be greater than 0",
            ));
        }
        Ok(Self {
            stats_prefix: options.stats_prefix,
            max_datagram_size: usize::from(options.max_datagram_size),
            tags: TagFormatter::new(options.tags)?,
            lines: ThreadLocal::new(),
        })
    }

    /// The tag formatter used for every emitted line.
    #[must_use]
    pub const fn tag_formatter(&self) -> &TagFormatter {
        &self.tags
    }

    /// Encodes and sends one metric.
    ///
    /// # Errors
    /// Returns [`MetricsError::DatagramTooLarge`] when the line exceeds
    /// `max_datagram_size`, [`MetricsError::Encode`] for values that cannot be
    /// printed, and any error from the sink.
    pub fn emit<S, T>(
        &self,
        sink: &S,
        name: &str,
        value: impl Into<MetricValue>,
        metric_type: MetricType,
        tags: &T,
    ) -> MetricResult<usize>
    where
        S: DatagramSink + ?Sized,
        T: TagSet + ?Sized,
    {
        let line = MetricLine {
            prefix: &self.stats_prefix,
            name,
            value: value.into(),
            metric_type,
            sample_rate: None,
        };
        self.emit_line(sink, &line, tags)
    }

    /// Encodes and sends one metric with a `|@rate` sample rate.
    ///
    /// # Errors
    /// Same as [`MetricEncoder::emit`], plus [`MetricsError::Encode`] for an
    /// unprintable sample rate.
    pub fn emit_sampled<S, T>(
        &self,
        sink: &S,
        name: &str,
        value: impl Into<MetricValue>,
        metric_type: MetricType,
        sample_rate: f64,
        tags: &T,
    ) -> MetricResult<usize>
    where
        S: DatagramSink + ?Sized,
        T: TagSet + ?Sized,
    {
        let line = MetricLine {
            prefix: &self.stats_prefix,
            name,
            value: value.into(),
            metric_type,
            sample_rate: Some(sample_rate),
        };
        self.emit_line(sink, &line, tags)
    }

    fn emit_line<S, T>(&self, sink: &S, line: &MetricLine<'_>, tags: &T) -> MetricResult<usize>
    where
        S: DatagramSink + ?Sized,
        T: TagSet + ?Sized,
    {
        let formatted = self.tags.format(tags)?;
        let len = line.encoded_len(formatted.len())?;
        if len > self.max_datagram_size {
            return Err(MetricsError::DatagramTooLarge {
                len,
                max: self.max_datagram_size,
            });
        }

        let cell = self
            .lines
            .get_or(|| RefCell::new(vec![0u8; self.max_datagram_size].into_boxed_slice()));
        let mut buffer = cell
            .try_borrow_mut()
            .map_err(|_| MetricsError::ScratchBusy)?;

        let datagram = &mut buffer[..len];
        let mut cursor = Cursor::new(datagram);
        line.encode(&mut cursor, &formatted, self.tags.placement())?;
        let written = cursor.written();
        drop(formatted);
        if written != len {
            return Err(MetricsError::SizingContract {
                expected: len,
                written,
            });
        }

        let result = sink.send(&buffer[..len]);
        if let Err(ref err) = result {
            warn!("Datagram send error: {err}");
        }
        result
    }
}
