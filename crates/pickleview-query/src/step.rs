use pickleview_ids::{AstNodeId, PickleStepId};
use pickleview_ports::{CucumberQuery, GherkinQuery};
use pickleview_schema::execution::{Attachment, TestStepResult};
use pickleview_schema::gherkin::{DataTable, DocString, Step};
use pickleview_schema::glue::StepMatchArgumentsList;
use pickleview_schema::pickle::PickleStep;
use pickleview_schema::worst_test_step_result;
use pickleview_segment::{MatchArgumentSet, MatchGroup, ResolutionState, SegmentedStep};
use tracing::warn;

/// Convert a wire-level argument list into segmenter input.
///
/// A group without `start` is placed at offset 0 and a group without a value
/// is kept as an empty group, so ordering is preserved either way. The
/// anonymous `{}` parameter reports an empty type name, which becomes `None`.
pub fn to_match_argument_set(list: &StepMatchArgumentsList) -> MatchArgumentSet {
    list.step_match_arguments
        .iter()
        .map(|argument| {
            let start = argument.group.start.unwrap_or(0) as usize;
            let mut group = match &argument.group.value {
                Some(value) => MatchGroup::new(start, value.as_str()),
                None => MatchGroup::empty(start),
            };
            group.parameter_type_name = argument
                .parameter_type_name
                .clone()
                .filter(|name| !name.is_empty());
            group
        })
        .collect::<Vec<_>>()
        .into()
}

/// A step with everything needed to render it.
#[derive(Clone, Debug)]
pub struct ResolvedStep<'a> {
    pub id: &'a AstNodeId,
    pub keyword: &'a str,
    /// The text to segment: the pickle step's text when one was given,
    /// otherwise the AST text (which may hold `<placeholders>`).
    pub text: &'a str,
    pub data_table: Option<&'a DataTable>,
    pub doc_string: Option<&'a DocString>,
    pub pickle_step_ids: &'a [PickleStepId],
    pub candidate_sets: Vec<MatchArgumentSet>,
    pub is_templated: bool,
}

impl ResolvedStep<'_> {
    pub fn segmented(&self) -> SegmentedStep {
        pickleview_segment::segment_with_state(self.text, &self.candidate_sets, self.is_templated)
    }

    pub fn state(&self) -> ResolutionState {
        ResolutionState::resolve(self.candidate_sets.len(), self.is_templated)
    }
}

/// Worst result and attachments over every pickle step an AST step became.
#[derive(Clone, Debug)]
pub struct StepStatus<'a> {
    pub result: TestStepResult,
    pub attachments: Vec<&'a Attachment>,
}

/// Joins the two query sides into per-step rendering input.
#[derive(Clone, Copy)]
pub struct StepResolver<'a> {
    gherkin: &'a dyn GherkinQuery,
    cucumber: &'a dyn CucumberQuery,
}

impl std::fmt::Debug for StepResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepResolver").finish_non_exhaustive()
    }
}

impl<'a> StepResolver<'a> {
    pub fn new(gherkin: &'a dyn GherkinQuery, cucumber: &'a dyn CucumberQuery) -> Self {
        Self { gherkin, cucumber }
    }

    /// Resolve `step` as it appears under a scenario.
    ///
    /// Pass `pickle_step` when rendering a single examples row; the step is
    /// then shown with that row's substituted text and matches. Without it, an
    /// outline step (`has_examples`) stays templated.
    pub fn resolve(
        &self,
        step: &'a Step,
        pickle_step: Option<&'a PickleStep>,
        has_examples: bool,
    ) -> ResolvedStep<'a> {
        let pickle_step_ids = self.gherkin.pickle_step_ids(&step.id);
        let is_templated = has_examples && pickle_step.is_none();

        let (text, data_table, doc_string, match_source) = match pickle_step {
            Some(ps) => {
                let argument = ps.argument.as_ref();
                (
                    ps.text.as_str(),
                    argument.and_then(|a| a.data_table.as_ref()).or(step.data_table.as_ref()),
                    argument.and_then(|a| a.doc_string.as_ref()).or(step.doc_string.as_ref()),
                    Some(ps.id.as_str()),
                )
            }
            None => (
                step.text.as_str(),
                step.data_table.as_ref(),
                step.doc_string.as_ref(),
                pickle_step_ids.first().map(|id| id.as_str()),
            ),
        };

        let candidate_sets: Vec<MatchArgumentSet> = match_source
            .map(|id| self.cucumber.step_match_arguments_lists(id))
            .unwrap_or_default()
            .into_iter()
            .map(to_match_argument_set)
            .collect();

        if !is_templated {
            if let [set] = candidate_sets.as_slice() {
                for anomaly in set.anomalies(text) {
                    warn!(step = %step.id, %anomaly, "step match arguments disagree with step text");
                }
            }
        }

        ResolvedStep {
            id: &step.id,
            keyword: &step.keyword,
            text,
            data_table,
            doc_string,
            pickle_step_ids,
            candidate_sets,
            is_templated,
        }
    }

    /// Status of `step` across every pickle step it compiled to, or only
    /// `pickle_step` when one is given.
    pub fn step_status(&self, step: &Step, pickle_step: Option<&PickleStep>) -> StepStatus<'a> {
        let single;
        let ids: &[PickleStepId] = match pickle_step {
            Some(ps) => {
                single = [ps.id.clone()];
                &single
            }
            None => self.gherkin.pickle_step_ids(&step.id),
        };
        let results = self.cucumber.pickle_step_test_step_results(ids);
        StepStatus {
            result: worst_test_step_result(&results),
            attachments: self.cucumber.pickle_step_attachments(ids),
        }
    }
}
