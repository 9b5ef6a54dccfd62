use crate::EncodeError;

/// Exclusive upper bound on magnitudes accepted by [`Cursor::write_f64`].
///
/// The 96-bit decimal maximum rounds up to exactly 2^96 as an `f64`, so this
/// value itself is already out of range.
pub const MAX_DECIMAL_MAGNITUDE: f64 = 7.922_816_251_426_434e28;
/// Smallest non-zero magnitude accepted by [`Cursor::write_f64`].
pub const MIN_DECIMAL_MAGNITUDE: f64 = 1e-28;

// sign + "0." + 27 zeros + 17 significant digits fits with room to spare
pub(crate) const DECIMAL_BUFFER_LEN: usize = 64;

/// A fixed-capacity write position over a caller supplied buffer.
///
/// Every write either lands completely at the front of the remaining region
/// or fails with [`EncodeError`] and leaves both the cursor and the buffer
/// untouched. The cursor never allocates; growing is the caller's decision.
///
/// ```
/// use rylv_statsd_encoding::Cursor;
///
/// let mut buf = [0u8; 16];
/// let mut cursor = Cursor::new(&mut buf);
/// cursor.write_str("latency:").unwrap();
/// cursor.write_f64(12.5).unwrap();
/// let written = cursor.written();
/// assert_eq!(&buf[..written], b"latency:12.5");
/// ```
#[derive(Debug)]
pub struct Cursor<'a> {
    remaining: &'a mut [u8],
    written: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor positioned at the start of `buf`.
    #[must_use]
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            remaining: buf,
            written: 0,
        }
    }

    /// Bytes written so far.
    #[must_use]
    pub const fn written(&self) -> usize {
        self.written
    }

    /// Bytes still available.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.remaining.len()
    }

    // Hands out the next `len` bytes and advances, or fails without moving.
    fn claim(&mut self, len: usize) -> Result<&mut [u8], EncodeError> {
        if len > self.remaining.len() {
            return Err(EncodeError::Overflow {
                needed: len,
                remaining: self.remaining.len(),
            });
        }
        let (head, tail) = std::mem::take(&mut self.remaining).split_at_mut(len);
        self.remaining = tail;
        self.written += len;
        Ok(head)
    }

    /// Copies `bytes` verbatim.
    ///
    /// # Errors
    /// Returns [`EncodeError::Overflow`] if `bytes` is longer than the remaining space.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.claim(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Writes the UTF-8 encoding of `text`.
    ///
    /// # Errors
    /// Returns [`EncodeError::Overflow`] if the encoded text does not fit.
    #[inline]
    pub fn write_str(&mut self, text: &str) -> Result<(), EncodeError> {
        self.write_bytes(text.as_bytes())
    }

    /// Writes a single byte.
    ///
    /// # Errors
    /// Returns [`EncodeError::Overflow`] if the cursor is full.
    #[inline]
    pub fn write_u8(&mut self, byte: u8) -> Result<(), EncodeError> {
        self.claim(1)?[0] = byte;
        Ok(())
    }

    /// Writes two literal bytes in order, such as `|#`.
    ///
    /// # Errors
    /// Returns [`EncodeError::Overflow`] if fewer than two bytes remain.
    #[inline]
    pub fn write_2(&mut self, first: u8, second: u8) -> Result<(), EncodeError> {
        self.claim(2)?.copy_from_slice(&[first, second]);
        Ok(())
    }

    /// Writes three literal bytes in order.
    ///
    /// # Errors
    /// Returns [`EncodeError::Overflow`] if fewer than three bytes remain.
    #[inline]
    pub fn write_3(&mut self, first: u8, second: u8, third: u8) -> Result<(), EncodeError> {
        self.claim(3)?.copy_from_slice(&[first, second, third]);
        Ok(())
    }

    /// Writes the shortest decimal form of `value`, with a leading `-` when negative.
    ///
    /// # Errors
    /// Returns [`EncodeError::Overflow`] if the digits do not fit.
    pub fn write_i64(&mut self, value: i64) -> Result<(), EncodeError> {
        let mut buffer = itoa::Buffer::new();
        self.write_str(buffer.format(value))
    }

    /// Writes the shortest decimal form of `value`.
    ///
    /// # Errors
    /// Returns [`EncodeError::Overflow`] if the digits do not fit.
    pub fn write_u64(&mut self, value: u64) -> Result<(), EncodeError> {
        let mut buffer = itoa::Buffer::new();
        self.write_str(buffer.format(value))
    }

    /// Writes `value` as positional decimal text.
    ///
    /// Digits are the shortest sequence that round-trips to `value`, so `12.5`
    /// prints as `12.5` and `0.1` as `0.1`. Integral values drop the fractional
    /// part and exponent notation is never produced.
    ///
    /// # Errors
    /// Returns [`EncodeError::NonFinite`] for NaN and infinities,
    /// [`EncodeError::OutOfRange`] when the magnitude reaches
    /// [`MAX_DECIMAL_MAGNITUDE`] or a non-zero magnitude below
    /// [`MIN_DECIMAL_MAGNITUDE`], and [`EncodeError::Overflow`] if the text
    /// does not fit.
    pub fn write_f64(&mut self, value: f64) -> Result<(), EncodeError> {
        let mut scratch = [0u8; DECIMAL_BUFFER_LEN];
        let len = format_decimal(value, &mut scratch)?;
        self.write_bytes(&scratch[..len])
    }
}

fn check_decimal_range(value: f64) -> Result<(), EncodeError> {
    if !value.is_finite() {
        return Err(EncodeError::NonFinite(value));
    }
    let magnitude = value.abs();
    if magnitude >= MAX_DECIMAL_MAGNITUDE || (magnitude != 0.0 && magnitude < MIN_DECIMAL_MAGNITUDE)
    {
        return Err(EncodeError::OutOfRange(value));
    }
    Ok(())
}

/// Renders `value` into `out` and returns the number of bytes used.
pub(crate) fn format_decimal(
    value: f64,
    out: &mut [u8; DECIMAL_BUFFER_LEN],
) -> Result<usize, EncodeError> {
    check_decimal_range(value)?;

    let mut cursor = Cursor::new(out);
    if value == 0.0 {
        cursor.write_u8(b'0')?;
        return Ok(cursor.written());
    }

    let mut ryu_buffer = ryu::Buffer::new();
    let text = ryu_buffer.format_finite(value);

    // ryu emits either "12.5" / "42.0" or "1.5e-7" / "1e16"
    let (mantissa, exponent) = match text.split_once('e') {
        Some((mantissa, exponent)) => (
            mantissa,
            exponent
                .parse::<i32>()
                .map_err(|_| EncodeError::OutOfRange(value))?,
        ),
        None => (text, 0),
    };
    let (negative, mantissa) = match mantissa.strip_prefix('-') {
        Some(unsigned) => (true, unsigned),
        None => (false, mantissa),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let frac_part = if frac_part == "0" { "" } else { frac_part };

    let digit_count = int_part.len() + frac_part.len();
    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    let point = int_part.len() as i32 + exponent;

    if negative {
        cursor.write_u8(b'-')?;
    }
    if point <= 0 {
        cursor.write_2(b'0', b'.')?;
        for _ in point..0 {
            cursor.write_u8(b'0')?;
        }
    }
    #[allow(clippy::cast_sign_loss)]
    let point = point.max(0) as usize;
    for (index, digit) in int_part.bytes().chain(frac_part.bytes()).enumerate() {
        if index == point && point > 0 {
            cursor.write_u8(b'.')?;
        }
        cursor.write_u8(digit)?;
    }
    for _ in digit_count..point {
        cursor.write_u8(b'0')?;
    }
    Ok(cursor.written())
}
