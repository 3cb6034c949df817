//! Fuzz harness for step text segmentation.
//!
//! Offsets and values come straight from the input, so spans may overlap,
//! run past the text or split a surrogate pair.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pickleview_segment::{MatchArgumentSet, MatchGroup, segment};

fuzz_target!(|input: (String, Vec<(u16, String)>, bool)| {
    let (text, groups, is_templated) = input;
    let set = MatchArgumentSet::new(
        groups
            .into_iter()
            .map(|(start, value)| MatchGroup::new(usize::from(start), value))
            .collect(),
    );
    let segments = segment(&text, std::slice::from_ref(&set), is_templated);
    assert!(!segments.is_empty() || text.is_empty());
});
