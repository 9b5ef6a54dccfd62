//! Checks that steady-state formatting does not touch the heap.
//!
//! Runs without the test harness so no other thread allocates while measuring.

use rylv_statsd_encoding::{
    Cursor, DatagramSink, MetricEncoder, MetricEncoderOptions, MetricResult, MetricType,
    TagFormatOptions, TagFormatter,
};

struct NullSink;

impl DatagramSink for NullSink {
    fn send(&self, datagram: &[u8]) -> MetricResult<usize> {
        Ok(datagram.len())
    }
}

fn cursor_writes_do_not_allocate() {
    let info = allocation_counter::measure(|| {
        let mut buf = [0u8; 128];
        let mut cursor = Cursor::new(&mut buf);
        cursor.write_str("latency:").unwrap();
        cursor.write_f64(12.5).unwrap();
        cursor.write_2(b'|', b'#').unwrap();
        cursor.write_i64(-42).unwrap();
        cursor.write_u64(u64::MAX).unwrap();
        assert!(cursor.write_bytes(&[0u8; 256]).is_err());
    });
    assert_eq!(info.count_total, 0, "cursor writes allocated: {info:?}");
}

fn warm_tag_formatting_does_not_allocate() {
    let formatter = TagFormatter::new(TagFormatOptions::dogstatsd()).unwrap();
    let tags = [("endpoint", Some("api")), ("canary", None), ("region", Some("eu"))];

    // first call creates this thread's scratch buffer
    assert_eq!(
        formatter.format(&tags).unwrap().as_str(),
        "|#endpoint:api,canary,region:eu"
    );

    let info = allocation_counter::measure(|| {
        for _ in 0..100 {
            let formatted = formatter.format(&tags).unwrap();
            assert_eq!(formatted.len(), 31);
        }
    });
    assert_eq!(info.count_total, 0, "warm formatting allocated: {info:?}");
}

fn warm_emission_does_not_allocate() {
    let encoder = MetricEncoder::new(MetricEncoderOptions {
        stats_prefix: "myapp.".to_string(),
        ..MetricEncoderOptions::default()
    })
    .unwrap();
    let tags = [("endpoint", Some("api"))];

    encoder
        .emit(&NullSink, "requests", 1, MetricType::Count, &tags)
        .unwrap();

    let info = allocation_counter::measure(|| {
        for i in 0..100_i64 {
            encoder
                .emit(&NullSink, "requests", i, MetricType::Count, &tags)
                .unwrap();
            encoder
                .emit_sampled(&NullSink, "latency", 0.75, MetricType::Timing, 0.1, &tags)
                .unwrap();
        }
    });
    assert_eq!(info.count_total, 0, "warm emission allocated: {info:?}");
}

fn main() {
    cursor_writes_do_not_allocate();
    warm_tag_formatting_does_not_allocate();
    warm_emission_does_not_allocate();
    println!("allocations: ok");
}
