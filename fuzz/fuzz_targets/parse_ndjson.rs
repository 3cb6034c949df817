//! Fuzz harness for NDJSON message streams.
//!
//! Parsing may reject the input; indexing whatever parsed must not panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pickleview_ingest_ndjson::parse_ndjson;
use pickleview_query::Query;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(envelopes) = parse_ndjson(input) {
        let _ = Query::from_envelopes(&envelopes);
    }
});
