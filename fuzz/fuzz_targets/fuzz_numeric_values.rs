#![no_main]

use libfuzzer_sys::fuzz_target;
use rylv_statsd_encoding::{f64_len, i64_len, Cursor, EncodeError};

// Fuzz target focusing on numeric edge cases
fuzz_target!(|data: &[u8]| {
    if data.len() < 9 {
        return;
    }

    let bits = u64::from_le_bytes([
        data[0], data[1], data[2], data[3],
        data[4], data[5], data[6], data[7],
    ]);
    let capacity = usize::from(data[8] % 64);

    // Integers: measured length matches, and a too-small buffer stays untouched
    #[allow(clippy::cast_possible_wrap)]
    let int = bits as i64;
    let mut buf = [b'#'; 64];
    let mut cursor = Cursor::new(&mut buf[..capacity]);
    match cursor.write_i64(int) {
        Ok(()) => assert_eq!(cursor.written(), i64_len(int)),
        Err(_) => {
            assert_eq!(cursor.written(), 0);
            assert!(i64_len(int) > capacity);
            assert!(buf.iter().all(|b| *b == b'#'));
        }
    }

    // Floats: printed text parses back to the same value
    let float = f64::from_bits(bits);
    let mut buf = [0u8; 64];
    let mut cursor = Cursor::new(&mut buf);
    match cursor.write_f64(float) {
        Ok(()) => {
            let written = cursor.written();
            assert_eq!(Ok(written), f64_len(float));
            let text = std::str::from_utf8(&buf[..written]).unwrap();
            assert!(!text.contains('e'));
            assert_eq!(text.parse::<f64>().unwrap(), float);
        }
        Err(EncodeError::NonFinite(_)) => assert!(!float.is_finite()),
        Err(EncodeError::OutOfRange(_)) => assert!(f64_len(float).is_err()),
        Err(EncodeError::Overflow { .. }) => panic!("64 bytes always fit a decimal"),
    }
});
