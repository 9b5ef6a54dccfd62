use super::cursor::Cursor;
use super::size::{f64_len, i64_len, u64_len};
use super::tags::TagPlacement;
use crate::EncodeError;

/// `DogStatsD` metric types and their wire suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricType {
    /// `c`
    Count,
    /// `g`
    Gauge,
    /// `ms`
    Timing,
    /// `h`
    Histogram,
    /// `d`
    Distribution,
    /// `s`
    Set,
}

impl MetricType {
    /// The wire suffix written after the value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Count => "c",
            Self::Gauge => "g",
            Self::Timing => "ms",
            Self::Histogram => "h",
            Self::Distribution => "d",
            Self::Set => "s",
        }
    }
}

/// A metric sample value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Finite floating-point value, printed as positional decimal.
    Float(f64),
}

impl MetricValue {
    /// Exact encoded length.
    ///
    /// # Errors
    /// Fails for floats that [`Cursor::write_f64`] rejects.
    pub fn encoded_len(self) -> Result<usize, EncodeError> {
        match self {
            Self::Int(value) => Ok(i64_len(value)),
            Self::UInt(value) => Ok(u64_len(value)),
            Self::Float(value) => f64_len(value),
        }
    }

    /// Writes the value.
    ///
    /// # Errors
    /// Same as the matching `Cursor` write.
    pub fn encode(self, cursor: &mut Cursor<'_>) -> Result<(), EncodeError> {
        match self {
            Self::Int(value) => cursor.write_i64(value),
            Self::UInt(value) => cursor.write_u64(value),
            Self::Float(value) => cursor.write_f64(value),
        }
    }
}

impl From<i32> for MetricValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for MetricValue {
    fn from(value: u32) -> Self {
        Self::UInt(u64::from(value))
    }
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// One metric event, without its tags.
///
/// The tag block is rendered separately by a
/// [`TagFormatter`](crate::TagFormatter) and spliced in by [`MetricLine::encode`].
#[derive(Debug, Clone, Copy)]
pub struct MetricLine<'a> {
    /// Prepended verbatim to the name.
    pub prefix: &'a str,
    /// Metric name.
    pub name: &'a str,
    /// Sample value.
    pub value: MetricValue,
    /// Metric type.
    pub metric_type: MetricType,
    /// Optional `|@rate` sample rate.
    pub sample_rate: Option<f64>,
}

impl MetricLine<'_> {
    /// Exact length of the encoded line for a tag block of `tags_len` bytes.
    ///
    /// # Errors
    /// Fails when the value or sample rate cannot be printed.
    pub fn encoded_len(&self, tags_len: usize) -> Result<usize, EncodeError> {
        // ':' + '|' + '\n'
        let mut len = self.prefix.len()
            + self.name.len()
            + self.value.encoded_len()?
            + self.metric_type.as_str().len()
            + tags_len
            + 3;
        if let Some(rate) = self.sample_rate {
            len += 2 + f64_len(rate)?; // '|@'
        }
        Ok(len)
    }

    /// Writes the line followed by `\n`.
    ///
    /// Trailing placement gives `{prefix}{name}:{value}|{type}[|@{rate}]{tags}`,
    /// after-name placement gives `{prefix}{name}{tags}:{value}|{type}[|@{rate}]`.
    ///
    /// # Errors
    /// Returns the first failing cursor write. Earlier parts stay written.
    pub fn encode(
        &self,
        cursor: &mut Cursor<'_>,
        tags: &[u8],
        placement: TagPlacement,
    ) -> Result<(), EncodeError> {
        cursor.write_str(self.prefix)?;
        cursor.write_str(self.name)?;
        if placement == TagPlacement::AfterName {
            cursor.write_bytes(tags)?;
        }
        cursor.write_u8(b':')?;
        self.value.encode(cursor)?;
        cursor.write_u8(b'|')?;
        cursor.write_str(self.metric_type.as_str())?;
        if let Some(rate) = self.sample_rate {
            cursor.write_2(b'|', b'@')?;
            cursor.write_f64(rate)?;
        }
        if placement == TagPlacement::Trailing {
            cursor.write_bytes(tags)?;
        }
        cursor.write_u8(b'\n')
    }
}
