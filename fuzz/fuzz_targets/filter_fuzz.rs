//! Fuzz test for search filter rendering
//!
//! Arbitrary user input ends up inside directory filters (mail addresses,
//! department names, search terms). Rendering must never let it change the
//! filter's structure.
//!
//! Run with: cargo +nightly fuzz run filter_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use orgcache_directory::{escape_value, SearchFilter};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let escaped = escape_value(input);
    for meta in ['(', ')', '*', '\0'] {
        assert!(!escaped.contains(meta), "unescaped {:?} in {:?}", meta, escaped);
    }

    let filter = SearchFilter::people(Some(input))
        .and(SearchFilter::equals("mail", input))
        .and(SearchFilter::Or(vec![
            SearchFilter::contains("givenName", input),
            SearchFilter::contains("sn", input),
        ]));
    let rendered = filter.to_ldap();

    // Parentheses stay balanced whatever the input was.
    let mut depth = 0i64;
    for c in rendered.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                assert!(depth >= 0, "unbalanced filter: {}", rendered);
            }
            _ => {}
        }
    }
    assert_eq!(depth, 0, "unbalanced filter: {}", rendered);
});
