//! Fuzz test for title classification and department naming
//!
//! Titles and department names come straight from directory entries and
//! may be any text at all.
//!
//! Run with: cargo +nightly fuzz run title_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use orgcache_hierarchy::{normalize_department_name, title_priority, TitleCategory};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let category = TitleCategory::classify(input);
    assert_eq!(category, TitleCategory::classify(&input.to_ascii_uppercase()));
    assert_eq!(title_priority(Some(input)), category.priority());
    assert_eq!(category.is_hierarchical(), category.priority() < 999);

    let name = normalize_department_name(input);
    assert_eq!(name.trim(), name);
    assert!(!name.contains("  "), "whitespace not collapsed: {:?}", name);
});
