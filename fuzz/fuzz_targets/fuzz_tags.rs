#![no_main]

use libfuzzer_sys::fuzz_target;
use rylv_statsd_encoding::{TagFormatOptions, TagFormatter};

// Fuzz target checking that rendered tag blocks always match their measured size
fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // First byte picks a small scratch capacity so the retry path gets exercised
    let formatter = TagFormatter::new(TagFormatOptions {
        scratch_capacity: usize::from(data[0]) + 1,
        ..TagFormatOptions::dogstatsd()
    })
    .unwrap();

    // Split the remaining data into chunks to create key/value pairs
    let text = String::from_utf8_lossy(&data[1..]);
    let mut tags: Vec<(&str, Option<&str>)> = Vec::new();
    for (index, chunk) in text.split('\u{0}').enumerate() {
        match chunk.split_once('=') {
            Some((key, value)) => tags.push((key, Some(value))),
            None if index % 2 == 0 => tags.push((chunk, None)),
            None => tags.push((chunk, Some(""))),
        }
    }

    let expected = formatter.required_size(&tags);
    let first = formatter.format(&tags).unwrap().as_bytes().to_vec();
    assert_eq!(first.len(), expected);
    assert!(formatter.scratch_capacity() >= expected);

    let second = formatter.format(&tags).unwrap();
    assert_eq!(first.as_slice(), second.as_bytes());
});
