//! Reading streams produced by the fake runner.

use pickleview_ingest_ndjson::{NdjsonSource, parse_ndjson};
use pickleview_ports::MessageSource;

#[test]
fn full_run_survives_a_trip_through_a_file() {
    let envelopes = pickleview_testkit::full_run();
    let (_dir, path) = pickleview_testkit::write_ndjson(&envelopes).unwrap();

    let read = NdjsonSource::new(&path).read_envelopes().unwrap();
    assert_eq!(read, envelopes);
}

#[test]
fn message_kinds_keep_their_order() {
    let text = pickleview_testkit::to_ndjson(&pickleview_testkit::run(&[
        pickleview_testkit::minimal(),
    ]))
    .unwrap();
    let kinds: Vec<_> = parse_ndjson(&text)
        .unwrap()
        .iter()
        .filter_map(|e| e.kind())
        .collect();
    assert_eq!(kinds.first(), Some(&"meta"));
    assert_eq!(kinds.last(), Some(&"testRunFinished"));
    let document = kinds.iter().position(|k| *k == "gherkinDocument").unwrap();
    let pickle = kinds.iter().position(|k| *k == "pickle").unwrap();
    let test_case = kinds.iter().position(|k| *k == "testCase").unwrap();
    assert!(document < pickle && pickle < test_case);
}

#[test]
fn truncated_stream_reports_the_bad_line() {
    let mut text = pickleview_testkit::to_ndjson(&pickleview_testkit::run(&[
        pickleview_testkit::minimal(),
    ]))
    .unwrap();
    let lines = text.lines().count();
    text.push_str("{\"testRunFinished\":");
    let err = parse_ndjson(&text).unwrap_err();
    assert!(format!("{err:#}").contains(&format!("line {}", lines + 1)));
}
