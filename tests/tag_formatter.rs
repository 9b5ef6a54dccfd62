use proptest::collection::vec as arb_vec;
use proptest::option::of as arb_option;
use proptest::prelude::*;
use rylv_statsd_encoding::{MetricsError, TagFormatOptions, TagFormatter, TagPlacement};
use std::sync::{Arc, Barrier};
use std::thread;

fn formatter_with_capacity(scratch_capacity: usize) -> TagFormatter {
    TagFormatter::new(TagFormatOptions {
        scratch_capacity,
        ..TagFormatOptions::dogstatsd()
    })
    .unwrap()
}

// Plain string building used as the expected output
fn naive_render(options: &TagFormatOptions, tags: &[(String, Option<String>)]) -> String {
    if tags.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = tags
        .iter()
        .map(|(key, value)| match value {
            Some(value) => format!("{key}{}{value}", options.key_value_separator),
            None => key.clone(),
        })
        .collect();
    format!(
        "{}{}{}",
        options.prefix,
        rendered.join(options.tag_separator.as_str()),
        options.suffix
    )
}

#[test]
fn test_separator_placement_three_tags() {
    let formatter = TagFormatter::new(TagFormatOptions {
        prefix: "|#".to_string(),
        suffix: String::new(),
        tag_separator: ",".to_string(),
        key_value_separator: ":".to_string(),
        placement: TagPlacement::Trailing,
        scratch_capacity: 512,
    })
    .unwrap();

    let tags = vec![("a", Some("1")), ("b", None), ("c", Some("3"))];
    assert_eq!(formatter.format(&tags).unwrap().as_str(), "|#a:1,b,c:3");
    assert_eq!(formatter.required_size(&tags), 11);
}

#[test]
fn test_exact_size_for_zero_one_and_many() {
    let formatter = formatter_with_capacity(512);

    let none: Vec<(&str, Option<&str>)> = vec![];
    let one_with_value = vec![("env", Some("prod"))];
    let one_without_value = vec![("canary", None::<&str>)];
    let many = vec![
        ("env", Some("prod")),
        ("canary", None),
        ("region", Some("eu-west-1")),
        ("empty", Some("")),
    ];

    for tags in [&none, &one_with_value, &one_without_value, &many] {
        let formatted = formatter.format(tags).unwrap();
        assert_eq!(formatted.len(), formatter.required_size(tags));
    }
}

#[test]
fn test_overflow_output_is_not_truncated() {
    let formatter = formatter_with_capacity(16);
    let tags: Vec<(String, Option<String>)> = (0..50)
        .map(|i| (format!("key{i}"), Some(format!("value{i}"))))
        .collect();
    let expected = naive_render(formatter.options(), &tags);
    assert!(expected.len() > 16);

    assert_eq!(formatter.format(&tags).unwrap().as_str(), expected);
    assert!(formatter.scratch_capacity() >= expected.len());
    assert_eq!(formatter.format(&tags).unwrap().as_str(), expected);
}

#[test]
fn test_threads_use_independent_scratch_buffers() {
    let formatter = Arc::new(formatter_with_capacity(32));
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|thread_id| {
            let formatter = Arc::clone(&formatter);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let value = "v".repeat(10 * (thread_id + 1));
                let tags = [("thread", Some(thread_id.to_string())), ("v", Some(value))];
                let expected = format!("|#thread:{thread_id},v:{}", tags[1].1.as_ref().unwrap());

                // every thread holds its own result at the same time
                let held = formatter.format(&tags).unwrap();
                barrier.wait();
                assert_eq!(held.as_str(), expected);
                drop(held);

                for _ in 0..1000 {
                    assert_eq!(formatter.format(&tags).unwrap().as_str(), expected);
                }
                formatter.scratch_capacity()
            })
        })
        .collect();

    let capacities: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    // thread 0 fits in the initial 32 bytes, the others grew to their own exact sizes
    assert_eq!(capacities[0], 32);
    assert_eq!(capacities[1], "|#thread:1,v:".len() + 20);
    assert_eq!(capacities[3], "|#thread:3,v:".len() + 40);
    // the main thread never formatted, so it still reports the configured default
    assert_eq!(formatter.scratch_capacity(), 32);
}

#[test]
fn test_aliasing_is_reported_not_overwritten() {
    let formatter = formatter_with_capacity(512);
    let first = formatter.format(&[("a", Some("1"))]).unwrap();
    let second = formatter.format(&[("b", Some("2"))]);
    assert!(matches!(second, Err(MetricsError::ScratchBusy)));
    assert_eq!(first.as_str(), "|#a:1");
}

fn arb_tags() -> impl Strategy<Value = Vec<(String, Option<String>)>> {
    arb_vec(
        ("[a-z_.é]{1,12}", arb_option("[a-zA-Z0-9:/_ü-]{0,24}")),
        0..24,
    )
}

fn arb_options() -> impl Strategy<Value = TagFormatOptions> {
    (
        "[|#\\[ ]{0,3}",
        "[\\] ;]{0,2}",
        "[,; ]{1,2}",
        "[:=]{1,2}",
        1usize..128,
    )
        .prop_map(
            |(prefix, suffix, tag_separator, key_value_separator, scratch_capacity)| {
                TagFormatOptions {
                    prefix,
                    suffix,
                    tag_separator,
                    key_value_separator,
                    placement: TagPlacement::Trailing,
                    scratch_capacity,
                }
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn property_required_size_matches_output(options in arb_options(), tags in arb_tags()) {
        let expected = naive_render(&options, &tags);
        let formatter = TagFormatter::new(options).unwrap();

        prop_assert_eq!(formatter.required_size(&tags), expected.len());
        let formatted = formatter.format(&tags).unwrap();
        prop_assert_eq!(formatted.as_str(), expected.as_str());
    }

    #[test]
    fn property_formatting_is_repeatable(options in arb_options(), tags in arb_tags()) {
        let formatter = TagFormatter::new(options).unwrap();
        let first = formatter.format(&tags).unwrap().as_bytes().to_vec();
        let second = formatter.format(&tags).unwrap().as_bytes().to_vec();
        prop_assert_eq!(first, second);
    }
}
