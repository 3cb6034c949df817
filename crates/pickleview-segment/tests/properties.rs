//! Property tests for step text segmentation.

use pickleview_segment::{
    ANONYMOUS_PARAMETER_TYPE, MatchArgumentSet, MatchGroup, ResolutionState, Segment, segment,
    segment_with_state, utf16,
};
use pickleview_testkit::proptest::{strategy_match_group, strategy_segmented_step};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn joined(segments: &[Segment]) -> String {
    segments.iter().map(Segment::text).collect()
}

/// UTF-16 offset between each pair of neighbouring segments.
fn boundaries(segments: &[Segment]) -> Vec<usize> {
    segments
        .iter()
        .scan(0, |at, s| {
            *at += utf16::len(s.text());
            Some(*at)
        })
        .collect()
}

proptest! {
    /// Segments concatenate back to the step text for well-formed matches.
    #[test]
    fn prop_round_trip(step in strategy_segmented_step()) {
        let segments = segment(&step.text, &[step.set.clone()], false);
        prop_assert_eq!(joined(&segments), step.text);
    }

    /// Parameters come out in order with their values and type names.
    #[test]
    fn prop_parameters_in_order(step in strategy_segmented_step()) {
        let segments = segment(&step.text, &[step.set.clone()], false);
        let parameters: Vec<(String, String)> = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Parameter { text, parameter_type_name } => {
                    Some((text.clone(), parameter_type_name.clone()))
                }
                Segment::Literal { .. } => None,
            })
            .collect();
        prop_assert_eq!(parameters, step.expected_parameters);
    }

    /// No empty segment is ever emitted for a defined step.
    #[test]
    fn prop_no_empty_segments(step in strategy_segmented_step()) {
        let segments = segment(&step.text, &[step.set.clone()], false);
        prop_assert!(segments.iter().all(|s| !s.text().is_empty()));
    }

    /// Segments are cut exactly at group starts and parameter ends inside
    /// the text. Empty groups cut too, so two literals may touch there.
    #[test]
    fn prop_cuts_follow_groups(step in strategy_segmented_step()) {
        let segments = segment(&step.text, &[step.set.clone()], false);
        let text_len = utf16::len(&step.text);

        let mut inner = boundaries(&segments);
        inner.pop();
        let cuts: BTreeSet<usize> = inner.iter().copied().collect();
        prop_assert_eq!(cuts.len(), inner.len());

        let expected: BTreeSet<usize> = step
            .set
            .groups
            .iter()
            .flat_map(|g| {
                let end = g.value.as_ref().map(|_| g.end);
                std::iter::once(g.start).chain(end)
            })
            .filter(|&cut| cut > 0 && cut < text_len)
            .collect();
        prop_assert_eq!(cuts, expected);

        for (pair, empty_start) in segments.windows(2).zip(boundaries(&segments)) {
            if matches!(pair, [Segment::Literal { .. }, Segment::Literal { .. }]) {
                prop_assert!(step.set.groups.iter().any(|g| g.value.is_none() && g.start == empty_start));
            }
        }
    }

    /// Outline steps render verbatim whatever matched them.
    #[test]
    fn prop_templated_precedence(
        step in strategy_segmented_step(),
        copies in 0usize..4,
    ) {
        let sets = vec![step.set.clone(); copies];
        let out = segment_with_state(&step.text, &sets, true);
        prop_assert_eq!(out.state, ResolutionState::Templated);
        prop_assert_eq!(out.segments, vec![Segment::literal(step.text.clone())]);
    }

    #[test]
    fn prop_ambiguous_is_single_literal(a in strategy_segmented_step(), b in strategy_segmented_step()) {
        let out = segment_with_state(&a.text, &[a.set.clone(), b.set], false);
        prop_assert_eq!(out.state, ResolutionState::Ambiguous);
        prop_assert_eq!(out.segments, vec![Segment::literal(a.text.clone())]);
    }

    #[test]
    fn prop_undefined_is_single_literal(text in "\\PC{0,40}") {
        let out = segment_with_state(&text, &[], false);
        prop_assert_eq!(out.state, ResolutionState::Undefined);
        prop_assert_eq!(out.segments, vec![Segment::literal(text.clone())]);
    }

    /// Arbitrary, inconsistent spans over arbitrary Unicode never panic.
    #[test]
    fn prop_total_over_garbage(
        text in "\\PC{0,30}",
        groups in prop::collection::vec(strategy_match_group(), 0..6),
    ) {
        let set = MatchArgumentSet::new(groups);
        let _ = segment(&text, &[set.clone()], false);
        let _ = set.anomalies(&text);
    }
}

#[test]
fn flight_example_snapshot() {
    let set = MatchArgumentSet::new(vec![
        MatchGroup::new(0, "LHR-CDG").with_parameter_type("flight"),
        MatchGroup::new(25, "45").with_parameter_type("int"),
    ]);
    let segments = segment("LHR-CDG has been delayed 45 minutes", &[set], false);
    insta::assert_debug_snapshot!(segments, @r###"
    [
        Parameter {
            text: "LHR-CDG",
            parameter_type_name: "flight",
        },
        Literal {
            text: " has been delayed ",
        },
        Parameter {
            text: "45",
            parameter_type_name: "int",
        },
        Literal {
            text: " minutes",
        },
    ]
    "###);
}

#[test]
fn empty_group_ahead_of_text_cuts_at_its_start() {
    // "<empty>wait for " then a parameter further on
    let text = "please wait for LHR-CDG";
    let set = MatchArgumentSet::new(vec![
        MatchGroup::empty(7),
        MatchGroup::new(16, "LHR-CDG").with_parameter_type("flight"),
    ]);
    let segments = segment(text, &[set], false);
    assert_eq!(
        segments,
        vec![
            Segment::literal("please "),
            Segment::literal("wait for "),
            Segment::parameter("LHR-CDG", "flight"),
        ]
    );
    assert_eq!(joined(&segments), text);
}

#[test]
fn empty_groups_only_cut_literals() {
    let text = "a b c";
    let set = MatchArgumentSet::new(vec![MatchGroup::empty(2), MatchGroup::new(4, "c")]);
    let segments = segment(text, &[set], false);
    assert_eq!(
        segments,
        vec![
            Segment::literal("a "),
            Segment::literal("b "),
            Segment::parameter("c", ANONYMOUS_PARAMETER_TYPE),
        ]
    );
    assert_eq!(joined(&segments), text);
}
