//! Step text segmentation.
//!
//! A step definition pattern that matches a step extracts parameter spans
//! from its text. Given those spans, [`segment`] splits the text into an
//! ordered run of [`Segment`]s (literal text and matched parameters) that
//! renderers can style individually.
//!
//! How a step is shown depends on its [`ResolutionState`]: only a step
//! matched by exactly one definition is split. Ambiguous, undefined and
//! templated outline steps come back as a single literal.
//!
//! Concatenating the text of the returned segments reproduces the step text
//! for any well-formed input. The functions here are total: malformed spans
//! are clamped, never reported as errors.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod utf16;

/// Parameter type name used when a match carries none.
pub const ANONYMOUS_PARAMETER_TYPE: &str = "anonymous";

/// One recognised parameter occurrence in the step text.
///
/// `start` and `end` are UTF-16 code unit offsets.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchGroup {
    pub start: usize,
    pub end: usize,
    pub value: Option<String>,
    pub parameter_type_name: Option<String>,
}

impl MatchGroup {
    pub fn new(start: usize, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            start,
            end: start + utf16::len(&value),
            value: Some(value),
            parameter_type_name: None,
        }
    }

    /// A group that matched nothing, e.g. an optional capture.
    pub fn empty(start: usize) -> Self {
        Self {
            start,
            end: start,
            value: None,
            parameter_type_name: None,
        }
    }

    pub fn with_parameter_type(mut self, name: impl Into<String>) -> Self {
        self.parameter_type_name = Some(name.into());
        self
    }

    fn non_empty_value(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.is_empty())
    }
}

/// Every parameter span one candidate pattern found, in text order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchArgumentSet {
    pub groups: Vec<MatchGroup>,
}

impl MatchArgumentSet {
    pub fn new(groups: Vec<MatchGroup>) -> Self {
        Self { groups }
    }

    /// Contract violations in this set relative to `text`.
    ///
    /// [`segment`] tolerates all of them; callers use this to report the
    /// upstream data problem.
    pub fn anomalies(&self, text: &str) -> Vec<SpanAnomaly> {
        let text_len = utf16::len(text);
        let mut out = Vec::new();
        let mut previous_end = 0;
        for (index, group) in self.groups.iter().enumerate() {
            if group.end < group.start || group.end > text_len {
                out.push(SpanAnomaly::OutOfRange {
                    index,
                    start: group.start,
                    end: group.end,
                    text_len,
                });
            } else if let Some(value) = group.non_empty_value() {
                if utf16::slice(text, group.start, group.end) != value {
                    out.push(SpanAnomaly::ValueMismatch { index });
                }
            }
            if group.start < previous_end {
                out.push(SpanAnomaly::Overlap { index });
            }
            previous_end = previous_end.max(group.end);
        }
        out
    }
}

impl From<Vec<MatchGroup>> for MatchArgumentSet {
    fn from(groups: Vec<MatchGroup>) -> Self {
        Self { groups }
    }
}

/// A way a [`MatchArgumentSet`] can disagree with its step text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpanAnomaly {
    OutOfRange {
        index: usize,
        start: usize,
        end: usize,
        text_len: usize,
    },
    Overlap {
        index: usize,
    },
    ValueMismatch {
        index: usize,
    },
}

impl fmt::Display for SpanAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpanAnomaly::OutOfRange {
                index,
                start,
                end,
                text_len,
            } => write!(
                f,
                "group {index} spans {start}..{end} outside text of length {text_len}"
            ),
            SpanAnomaly::Overlap { index } => {
                write!(f, "group {index} starts before the previous group ends")
            }
            SpanAnomaly::ValueMismatch { index } => {
                write!(f, "group {index} value differs from the text it spans")
            }
        }
    }
}

/// How a step's text relates to the step definitions that matched it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionState {
    /// Exactly one definition matched.
    Defined,
    /// Two or more definitions matched.
    Ambiguous,
    /// No definition matched.
    Undefined,
    /// Outline step still showing `<placeholder>` syntax.
    Templated,
}

impl ResolutionState {
    pub fn resolve(candidate_count: usize, is_templated: bool) -> Self {
        if is_templated {
            return ResolutionState::Templated;
        }
        match candidate_count {
            0 => ResolutionState::Undefined,
            1 => ResolutionState::Defined,
            _ => ResolutionState::Ambiguous,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionState::Defined => "defined",
            ResolutionState::Ambiguous => "ambiguous",
            ResolutionState::Undefined => "undefined",
            ResolutionState::Templated => "templated",
        }
    }
}

/// A run of step text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    Literal {
        text: String,
    },
    Parameter {
        text: String,
        parameter_type_name: String,
    },
}

impl Segment {
    pub fn literal(text: impl Into<String>) -> Self {
        Segment::Literal { text: text.into() }
    }

    pub fn parameter(text: impl Into<String>, parameter_type_name: impl Into<String>) -> Self {
        Segment::Parameter {
            text: text.into(),
            parameter_type_name: parameter_type_name.into(),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Segment::Literal { text } | Segment::Parameter { text, .. } => text,
        }
    }
}

/// Segments alongside the state that produced them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentedStep {
    pub state: ResolutionState,
    pub segments: Vec<Segment>,
}

impl SegmentedStep {
    /// The segment texts joined back together.
    pub fn text(&self) -> String {
        self.segments.iter().map(Segment::text).collect()
    }
}

/// Split `step_text` for rendering.
///
/// Only a step with exactly one candidate set and no outline placeholders is
/// split into parameters; everything else is a single literal.
pub fn segment(
    step_text: &str,
    candidate_sets: &[MatchArgumentSet],
    is_templated: bool,
) -> Vec<Segment> {
    segment_with_state(step_text, candidate_sets, is_templated).segments
}

pub fn segment_with_state(
    step_text: &str,
    candidate_sets: &[MatchArgumentSet],
    is_templated: bool,
) -> SegmentedStep {
    let state = ResolutionState::resolve(candidate_sets.len(), is_templated);
    let segments = match (state, candidate_sets) {
        (ResolutionState::Defined, [set]) => split_spans(step_text, set),
        _ => vec![Segment::literal(step_text)],
    };
    SegmentedStep { state, segments }
}

fn split_spans(text: &str, set: &MatchArgumentSet) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(set.groups.len() * 2 + 1);
    let mut offset = 0;

    for group in &set.groups {
        let plain = utf16::slice(text, offset, group.start);
        if !plain.is_empty() {
            segments.push(Segment::literal(plain));
        }
        // An empty group emits no parameter but still moves the cursor to
        // its start.
        let Some(value) = group.non_empty_value() else {
            offset += utf16::len(plain);
            continue;
        };
        let parameter_type = group
            .parameter_type_name
            .as_deref()
            .unwrap_or(ANONYMOUS_PARAMETER_TYPE);
        segments.push(Segment::parameter(value, parameter_type));
        offset += utf16::len(plain) + utf16::len(value);
    }

    let rest = utf16::slice_from(text, offset);
    if !rest.is_empty() {
        segments.push(Segment::literal(rest));
    }
    segments
}
