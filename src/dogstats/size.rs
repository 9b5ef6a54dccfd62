//! Exact encoded lengths, kept in lockstep with [`Cursor`](super::cursor::Cursor).

use super::cursor::{format_decimal, DECIMAL_BUFFER_LEN};
use crate::EncodeError;

/// Length of the decimal form written by `Cursor::write_i64`.
#[must_use]
pub fn i64_len(value: i64) -> usize {
    itoa::Buffer::new().format(value).len()
}

/// Length of the decimal form written by `Cursor::write_u64`.
#[must_use]
pub fn u64_len(value: u64) -> usize {
    itoa::Buffer::new().format(value).len()
}

/// Length of the decimal form written by `Cursor::write_f64`.
///
/// # Errors
/// Fails exactly when `Cursor::write_f64` would fail for a reason other than overflow.
pub fn f64_len(value: f64) -> Result<usize, EncodeError> {
    let mut scratch = [0u8; DECIMAL_BUFFER_LEN];
    format_decimal(value, &mut scratch)
}

/// Length of one rendered tag: the key, plus separator and value when a value is present.
#[inline]
pub(crate) fn tag_len(key: &str, value: Option<&str>, key_value_separator_len: usize) -> usize {
    key.len() + value.map_or(0, |value| key_value_separator_len + value.len())
}
