//! Proptest strategies for pickleview property-based testing

use pickleview_schema::execution::{Duration, TestStepResult, TestStepResultStatus};
use pickleview_schema::glue::Group;
use pickleview_segment::{ANONYMOUS_PARAMETER_TYPE, MatchArgumentSet, MatchGroup, utf16};
use proptest::prelude::*;

// ============================================================================
// Segmentation
// ============================================================================

/// A step text together with a well-formed match for it and the parameters
/// the segmenter should find.
#[derive(Clone, Debug)]
pub struct SegmentedStepCase {
    pub text: String,
    pub set: MatchArgumentSet,
    /// `(value, parameter type name)` in text order.
    pub expected_parameters: Vec<(String, String)>,
}

#[derive(Clone, Debug)]
enum Piece {
    Text(String),
    Parameter(String, Option<String>),
    Empty,
}

fn strategy_piece() -> impl Strategy<Value = Piece> {
    prop_oneof![
        3 => prop_oneof!["[a-z ]{1,8}", "\\PC{1,6}"].prop_map(Piece::Text),
        3 => ("\\PC{1,6}", prop::option::of("[a-z]{1,8}"))
            .prop_map(|(value, name)| Piece::Parameter(value, name)),
        1 => Just(Piece::Empty),
    ]
}

/// Strategy for step texts built from literal runs, parameters and empty
/// optional groups, with UTF-16 offsets that agree with the text.
pub fn strategy_segmented_step() -> impl Strategy<Value = SegmentedStepCase> {
    prop::collection::vec(strategy_piece(), 0..10).prop_map(|pieces| {
        let mut text = String::new();
        let mut groups = Vec::new();
        let mut expected_parameters = Vec::new();
        for piece in pieces {
            match piece {
                Piece::Text(t) => text.push_str(&t),
                Piece::Parameter(value, name) => {
                    let mut group = MatchGroup::new(utf16::len(&text), value.as_str());
                    group.parameter_type_name = name.clone();
                    groups.push(group);
                    expected_parameters.push((
                        value.clone(),
                        name.unwrap_or_else(|| ANONYMOUS_PARAMETER_TYPE.to_string()),
                    ));
                    text.push_str(&value);
                }
                Piece::Empty => groups.push(MatchGroup::empty(utf16::len(&text))),
            }
        }
        SegmentedStepCase {
            text,
            set: MatchArgumentSet::new(groups),
            expected_parameters,
        }
    })
}

/// Strategy for arbitrary, possibly inconsistent match groups
pub fn strategy_match_group() -> impl Strategy<Value = MatchGroup> {
    (
        0usize..64,
        0usize..64,
        prop::option::of("\\PC{0,8}"),
        prop::option::of("[a-z]{0,6}"),
    )
        .prop_map(|(start, end, value, parameter_type_name)| MatchGroup {
            start,
            end,
            value,
            parameter_type_name,
        })
}

/// Strategy for wire-level capture groups, including missing `start` and
/// `value` and nested children
pub fn strategy_group() -> impl Strategy<Value = Group> {
    let leaf = (prop::option::of(0u32..64), prop::option::of("\\PC{0,8}")).prop_map(
        |(start, value)| Group {
            children: Vec::new(),
            start,
            value,
        },
    );
    leaf.prop_recursive(2, 8, 3, |inner| {
        (
            prop::collection::vec(inner, 0..3),
            prop::option::of(0u32..64),
            prop::option::of("\\PC{0,8}"),
        )
            .prop_map(|(children, start, value)| Group {
                children,
                start,
                value,
            })
    })
}

// ============================================================================
// Results
// ============================================================================

/// Strategy for generating TestStepResultStatus values
pub fn strategy_status() -> impl Strategy<Value = TestStepResultStatus> {
    prop::sample::select(TestStepResultStatus::ALL.to_vec())
}

/// Strategy for generating TestStepResult values
pub fn strategy_test_step_result() -> impl Strategy<Value = TestStepResult> {
    (
        strategy_status(),
        prop::option::of("[a-zA-Z ]{1,30}"),
        0i64..5,
        0u32..1_000_000_000,
    )
        .prop_map(|(status, message, seconds, nanos)| TestStepResult {
            status,
            message,
            duration: Duration { seconds, nanos },
        })
}
