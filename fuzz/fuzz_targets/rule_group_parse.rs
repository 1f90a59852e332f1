#![no_main]

use libfuzzer_sys::fuzz_target;
use vminloop_engine::repeat::has_to_repeat_search;
use vminloop_engine::results::SearchResults;
use vminloop_engine::rule_groups::parse_rule_groups;
use vminloop_engine::site_vector::SiteVector;

const MAX_WIDTH: usize = 64;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let width = usize::from(data[0]) % MAX_WIDTH + 1;
    let Ok(csv) = std::str::from_utf8(&data[1..]) else {
        return;
    };

    // Parsing never panics, and every accepted group matches the width.
    if let Ok(groups) = parse_rule_groups(csv, width) {
        for group in &groups {
            assert_eq!(group.bits().width(), width);
            let rendered = group.bits().to_bit_string();
            let reparsed = SiteVector::from_bit_string(&rendered).expect("round trip");
            assert_eq!(&reparsed, group.bits());
        }
    }

    // The repeat decision is total over any snapshot width and config.
    let mut literal = String::with_capacity(width);
    for index in 0..width {
        literal.push(if data.len() > index + 1 && data[index + 1] & 1 == 1 {
            '1'
        } else {
            '0'
        });
    }
    let Ok(seed) = SiteVector::from_bit_string(&literal) else {
        return;
    };

    let mut results = SearchResults {
        failed_rules: false,
        failed_search: true,
        test_result_bits: vec![SiteVector::zeros(width)],
        rule_result_bits: seed,
        incoming_mask: SiteVector::zeros(width),
        max_repetition_count: 2,
        per_result_data: Vec::new(),
    };
    let before = results.rule_result_bits.clone();
    match has_to_repeat_search(&mut results, csv) {
        Ok(true) => {
            // Merging only ever adds positions.
            for index in 0..width {
                if before.bit(index) == Some(true) {
                    assert_eq!(results.rule_result_bits.bit(index), Some(true));
                }
            }
        }
        Ok(false) | Err(_) => assert_eq!(results.rule_result_bits, before),
    }

    let json = serde_json::to_string(&results).expect("serialize snapshot");
    let restored: SearchResults = serde_json::from_str(&json).expect("deserialize snapshot");
    assert_eq!(results, restored);
});
