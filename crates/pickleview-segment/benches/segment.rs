use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use pickleview_segment::{MatchArgumentSet, MatchGroup, segment};

fn many_parameters(n: usize) -> (String, MatchArgumentSet) {
    let mut text = String::new();
    let mut groups = Vec::with_capacity(n);
    for i in 0..n {
        text.push_str("and then ");
        let value = i.to_string();
        groups.push(MatchGroup::new(text.len(), value.clone()).with_parameter_type("int"));
        text.push_str(&value);
        text.push(' ');
    }
    (text, MatchArgumentSet::new(groups))
}

fn bench_segment(c: &mut Criterion) {
    let flight = MatchArgumentSet::new(vec![
        MatchGroup::new(0, "LHR-CDG").with_parameter_type("flight"),
        MatchGroup::new(25, "45").with_parameter_type("int"),
    ]);
    c.bench_function("segment_flight_step", |b| {
        b.iter(|| {
            segment(
                black_box("LHR-CDG has been delayed 45 minutes"),
                black_box(std::slice::from_ref(&flight)),
                false,
            )
        })
    });

    let (text, set) = many_parameters(64);
    c.bench_function("segment_64_parameters", |b| {
        b.iter(|| segment(black_box(&text), black_box(std::slice::from_ref(&set)), false))
    });

    let unicode = "🥒 ".repeat(32) + "weighs 12 grams";
    let start = unicode.encode_utf16().count() - "12 grams".len();
    let unicode_set = MatchArgumentSet::new(vec![MatchGroup::new(start, "12")]);
    c.bench_function("segment_non_ascii", |b| {
        b.iter(|| {
            segment(
                black_box(&unicode),
                black_box(std::slice::from_ref(&unicode_set)),
                false,
            )
        })
    });
}

criterion_group!(benches, bench_segment);
criterion_main!(benches);
