//! In-memory index over a Cucumber message stream.
//!
//! [`Query`] answers both the Gherkin-side and the execution-side lookups a
//! report needs ([`GherkinQuery`] and [`CucumberQuery`]). [`StepResolver`]
//! sits on top and turns an AST step into the inputs of the step text
//! segmenter.

use itertools::Itertools;
use pickleview_ids::{
    AstNodeId, HookId, PickleId, PickleStepId, StepDefinitionId, TestCaseId, TestCaseStartedId,
    TestStepId,
};
use pickleview_ports::{CucumberQuery, GherkinQuery, HookExecution, HookPosition};
use pickleview_schema::Envelope;
use pickleview_schema::execution::{
    Attachment, TestCaseStarted, TestRunFinished, TestRunStarted, TestStepFinished,
    TestStepResult, TestStepResultStatus,
};
use pickleview_schema::gherkin::GherkinDocument;
use pickleview_schema::glue::{Hook, StepDefinition, StepMatchArgumentsList, TestCase};
use pickleview_schema::pickle::{Pickle, PickleStep};
use pickleview_schema::worst_test_step_result;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

mod error;
mod step;

pub use error::QueryError;
pub use step::{ResolvedStep, StepResolver, StepStatus, to_match_argument_set};

/// Where a test step lives inside its test case.
#[derive(Clone, Debug)]
struct TestStepLocation {
    test_case: TestCaseId,
    index: usize,
}

#[derive(Debug, Default)]
pub struct Query {
    documents: Vec<GherkinDocument>,
    pickles: Vec<Pickle>,
    pickle_index: HashMap<PickleId, usize>,
    pickle_steps: HashMap<PickleStepId, (usize, usize)>,
    pickle_ids_by_ast_node: HashMap<AstNodeId, Vec<PickleId>>,
    pickle_step_ids_by_ast_step: HashMap<AstNodeId, Vec<PickleStepId>>,
    hooks: HashMap<HookId, Hook>,
    step_definitions: HashMap<StepDefinitionId, StepDefinition>,
    test_cases: HashMap<TestCaseId, TestCase>,
    test_case_by_pickle: HashMap<PickleId, TestCaseId>,
    test_steps: HashMap<TestStepId, TestStepLocation>,
    test_step_ids_by_pickle_step: HashMap<PickleStepId, Vec<TestStepId>>,
    test_cases_started: HashMap<TestCaseStartedId, TestCaseStarted>,
    /// Highest attempt seen per test case; its results and attachments win.
    latest_attempt: HashMap<TestCaseId, TestCaseStartedId>,
    results: HashMap<(TestCaseStartedId, TestStepId), TestStepResult>,
    attachments: HashMap<(TestCaseStartedId, TestStepId), Vec<Attachment>>,
    test_run_started: Option<TestRunStarted>,
    test_run_finished: Option<TestRunFinished>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a whole stream. Messages with dangling references are logged
    /// and skipped.
    pub fn from_envelopes<'a>(envelopes: impl IntoIterator<Item = &'a Envelope>) -> Self {
        let mut query = Self::new();
        let mut skipped = 0usize;
        for envelope in envelopes {
            if let Err(err) = query.update(envelope) {
                warn!(error = %err, "skipping message");
                skipped += 1;
            }
        }
        debug!(
            documents = query.documents.len(),
            pickles = query.pickles.len(),
            test_cases = query.test_cases.len(),
            skipped,
            "indexed message stream"
        );
        query
    }

    /// Index one envelope.
    pub fn update(&mut self, envelope: &Envelope) -> Result<(), QueryError> {
        if let Some(doc) = &envelope.gherkin_document {
            self.documents.push(doc.clone());
        }
        if let Some(pickle) = &envelope.pickle {
            self.add_pickle(pickle);
        }
        if let Some(hook) = &envelope.hook {
            self.hooks.insert(hook.id.clone(), hook.clone());
        }
        if let Some(def) = &envelope.step_definition {
            self.step_definitions.insert(def.id.clone(), def.clone());
        }
        if let Some(test_case) = &envelope.test_case {
            self.add_test_case(test_case)?;
        }
        if let Some(started) = &envelope.test_case_started {
            self.add_test_case_started(started)?;
        }
        if let Some(finished) = &envelope.test_step_finished {
            self.add_test_step_finished(finished)?;
        }
        if let Some(attachment) = &envelope.attachment {
            self.add_attachment(attachment)?;
        }
        if let Some(started) = &envelope.test_run_started {
            self.test_run_started = Some(started.clone());
        }
        if let Some(finished) = &envelope.test_run_finished {
            self.test_run_finished = Some(finished.clone());
        }
        Ok(())
    }

    pub fn step_definition(&self, id: &str) -> Option<&StepDefinition> {
        self.step_definitions.get(id)
    }

    pub fn pickles(&self) -> &[Pickle] {
        &self.pickles
    }

    fn add_pickle(&mut self, pickle: &Pickle) {
        let index = self.pickles.len();
        for node in &pickle.ast_node_ids {
            self.pickle_ids_by_ast_node
                .entry(node.clone())
                .or_default()
                .push(pickle.id.clone());
        }
        for (step_index, step) in pickle.steps.iter().enumerate() {
            self.pickle_steps
                .insert(step.id.clone(), (index, step_index));
            if let Some(ast_step) = step.ast_node_ids.first() {
                self.pickle_step_ids_by_ast_step
                    .entry(ast_step.clone())
                    .or_default()
                    .push(step.id.clone());
            }
        }
        self.pickle_index.insert(pickle.id.clone(), index);
        self.pickles.push(pickle.clone());
    }

    fn add_test_case(&mut self, test_case: &TestCase) -> Result<(), QueryError> {
        if !self.pickle_index.contains_key(&test_case.pickle_id) {
            return Err(QueryError::UnknownPickle {
                test_case: test_case.id.to_string(),
                pickle: test_case.pickle_id.to_string(),
            });
        }
        for (index, step) in test_case.test_steps.iter().enumerate() {
            self.test_steps.insert(
                step.id.clone(),
                TestStepLocation {
                    test_case: test_case.id.clone(),
                    index,
                },
            );
            if let Some(pickle_step) = &step.pickle_step_id {
                self.test_step_ids_by_pickle_step
                    .entry(pickle_step.clone())
                    .or_default()
                    .push(step.id.clone());
            }
        }
        self.test_case_by_pickle
            .insert(test_case.pickle_id.clone(), test_case.id.clone());
        self.test_cases
            .insert(test_case.id.clone(), test_case.clone());
        Ok(())
    }

    fn add_test_case_started(&mut self, started: &TestCaseStarted) -> Result<(), QueryError> {
        if !self.test_cases.contains_key(&started.test_case_id) {
            return Err(QueryError::UnknownTestCase {
                started: started.id.to_string(),
                test_case: started.test_case_id.to_string(),
            });
        }
        let supersedes = self
            .latest_attempt
            .get(&started.test_case_id)
            .and_then(|id| self.test_cases_started.get(id))
            .is_none_or(|previous| started.attempt >= previous.attempt);
        if supersedes {
            self.latest_attempt
                .insert(started.test_case_id.clone(), started.id.clone());
        }
        self.test_cases_started
            .insert(started.id.clone(), started.clone());
        Ok(())
    }

    fn check_step_in_case(
        &self,
        message: &'static str,
        started_id: &TestCaseStartedId,
        test_step: &TestStepId,
    ) -> Result<(), QueryError> {
        let started = self.test_cases_started.get(started_id).ok_or_else(|| {
            QueryError::UnknownTestCaseStarted {
                message,
                started: started_id.to_string(),
            }
        })?;
        match self.test_steps.get(test_step) {
            Some(location) if location.test_case == started.test_case_id => Ok(()),
            _ => Err(QueryError::UnknownTestStep {
                message,
                test_step: test_step.to_string(),
                test_case: started.test_case_id.to_string(),
            }),
        }
    }

    fn add_test_step_finished(&mut self, finished: &TestStepFinished) -> Result<(), QueryError> {
        self.check_step_in_case(
            "testStepFinished",
            &finished.test_case_started_id,
            &finished.test_step_id,
        )?;
        self.results.insert(
            (
                finished.test_case_started_id.clone(),
                finished.test_step_id.clone(),
            ),
            finished.test_step_result.clone(),
        );
        Ok(())
    }

    fn add_attachment(&mut self, attachment: &Attachment) -> Result<(), QueryError> {
        let (Some(started), Some(step)) = (&attachment.test_case_started_id, &attachment.test_step_id)
        else {
            debug!(media_type = %attachment.media_type, "ignoring attachment outside a test step");
            return Ok(());
        };
        self.check_step_in_case("attachment", started, step)?;
        self.attachments
            .entry((started.clone(), step.clone()))
            .or_default()
            .push(attachment.clone());
        Ok(())
    }

    /// Attempt whose results count for the test case owning `test_step`.
    fn latest_attempt_for_step(&self, test_step: &str) -> Option<&TestCaseStartedId> {
        let location = self.test_steps.get(test_step)?;
        self.latest_attempt.get(&location.test_case)
    }

    fn latest_result(&self, test_step: &TestStepId) -> Option<&TestStepResult> {
        let started = self.latest_attempt_for_step(test_step)?;
        self.results.get(&(started.clone(), test_step.clone()))
    }

    fn latest_attachments(&self, test_step: &TestStepId) -> &[Attachment] {
        self.latest_attempt_for_step(test_step)
            .and_then(|started| self.attachments.get(&(started.clone(), test_step.clone())))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn test_step_ids(&self, pickle_step_ids: &[PickleStepId]) -> impl Iterator<Item = &TestStepId> {
        pickle_step_ids.iter().flat_map(|id| {
            self.test_step_ids_by_pickle_step
                .get(id)
                .map(Vec::as_slice)
                .unwrap_or(&[])
        })
    }

    fn test_case_for_pickle(&self, pickle_id: &str) -> Option<&TestCase> {
        let id = self.test_case_by_pickle.get(pickle_id)?;
        self.test_cases.get(id)
    }
}

impl GherkinQuery for Query {
    fn documents(&self) -> &[GherkinDocument] {
        &self.documents
    }

    fn pickle_step_ids(&self, ast_step_id: &str) -> &[PickleStepId] {
        self.pickle_step_ids_by_ast_step
            .get(ast_step_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn pickle_ids(&self, ast_node_id: &str) -> &[PickleId] {
        self.pickle_ids_by_ast_node
            .get(ast_node_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn pickle(&self, pickle_id: &str) -> Option<&Pickle> {
        self.pickle_index
            .get(pickle_id)
            .and_then(|&i| self.pickles.get(i))
    }

    fn pickle_step(&self, pickle_step_id: &str) -> Option<&PickleStep> {
        let &(pickle, step) = self.pickle_steps.get(pickle_step_id)?;
        self.pickles.get(pickle)?.steps.get(step)
    }
}

impl CucumberQuery for Query {
    fn pickle_step_test_step_results(
        &self,
        pickle_step_ids: &[PickleStepId],
    ) -> Vec<TestStepResult> {
        self.test_step_ids(pickle_step_ids)
            .filter_map(|id| self.latest_result(id))
            .cloned()
            .collect()
    }

    fn pickle_step_attachments(&self, pickle_step_ids: &[PickleStepId]) -> Vec<&Attachment> {
        self.test_step_ids(pickle_step_ids)
            .flat_map(|id| self.latest_attachments(id))
            .collect()
    }

    fn step_match_arguments_lists(&self, pickle_step_id: &str) -> Vec<&StepMatchArgumentsList> {
        let Some(test_steps) = self.test_step_ids_by_pickle_step.get(pickle_step_id) else {
            return Vec::new();
        };
        test_steps
            .iter()
            .filter_map(|id| {
                let location = self.test_steps.get(id)?;
                let test_case = self.test_cases.get(&location.test_case)?;
                test_case.test_steps.get(location.index)
            })
            .filter_map(|step| step.step_match_arguments_lists.as_ref())
            // identical lists within one test step are distinct definitions
            .unique()
            .flatten()
            .collect()
    }

    fn pickle_test_step_results(&self, pickle_ids: &[PickleId]) -> Vec<TestStepResult> {
        pickle_ids
            .iter()
            .filter_map(|id| self.test_case_for_pickle(id))
            .flat_map(|test_case| test_case.test_steps.iter())
            .filter_map(|step| self.latest_result(&step.id))
            .cloned()
            .collect()
    }

    fn hook_executions(&self, pickle_id: &str) -> Vec<HookExecution<'_>> {
        let Some(test_case) = self.test_case_for_pickle(pickle_id) else {
            return Vec::new();
        };
        let mut position = HookPosition::Before;
        let mut out = Vec::new();
        for step in &test_case.test_steps {
            if step.pickle_step_id.is_some() {
                position = HookPosition::After;
                continue;
            }
            let Some(hook_id) = &step.hook_id else {
                continue;
            };
            out.push(HookExecution {
                position,
                hook: self.hooks.get(hook_id),
                result: self.latest_result(&step.id),
                attachments: self.latest_attachments(&step.id).iter().collect(),
            });
        }
        out
    }

    fn test_run_started(&self) -> Option<&TestRunStarted> {
        self.test_run_started.as_ref()
    }

    fn test_run_finished(&self) -> Option<&TestRunFinished> {
        self.test_run_finished.as_ref()
    }

    fn scenario_status_counts(&self) -> BTreeMap<TestStepResultStatus, usize> {
        let mut counts = BTreeMap::new();
        for pickle in &self.pickles {
            let results = self.pickle_test_step_results(std::slice::from_ref(&pickle.id));
            let status = worst_test_step_result(&results).status;
            *counts.entry(status).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pickleview_schema::execution::{Duration, TestStepResultStatus};
    use pickleview_schema::glue::{Group, StepMatchArgument, TestStep};

    fn pickle(id: &str, scenario: &str, steps: &[(&str, &str)]) -> Pickle {
        Pickle {
            id: id.into(),
            uri: "features/a.feature".into(),
            name: "a".into(),
            ast_node_ids: vec![scenario.into()],
            steps: steps
                .iter()
                .map(|(step_id, ast)| PickleStep {
                    id: (*step_id).into(),
                    text: "a passed step".into(),
                    argument: None,
                    ast_node_ids: vec![(*ast).into()],
                })
                .collect(),
            ..Pickle::default()
        }
    }

    fn test_case(id: &str, pickle: &str, steps: Vec<TestStep>) -> TestCase {
        TestCase {
            id: id.into(),
            pickle_id: pickle.into(),
            test_steps: steps,
        }
    }

    fn pickle_test_step(id: &str, pickle_step: &str, lists: usize) -> TestStep {
        TestStep {
            id: id.into(),
            pickle_step_id: Some(pickle_step.into()),
            step_match_arguments_lists: Some(
                (0..lists)
                    .map(|_| StepMatchArgumentsList::default())
                    .collect(),
            ),
            ..TestStep::default()
        }
    }

    fn hook_test_step(id: &str, hook: &str) -> TestStep {
        TestStep {
            id: id.into(),
            hook_id: Some(hook.into()),
            ..TestStep::default()
        }
    }

    fn started(id: &str, test_case: &str, attempt: u32) -> TestCaseStarted {
        TestCaseStarted {
            id: id.into(),
            test_case_id: test_case.into(),
            attempt,
            ..TestCaseStarted::default()
        }
    }

    fn finished(started: &str, step: &str, status: TestStepResultStatus) -> TestStepFinished {
        TestStepFinished {
            test_case_started_id: started.into(),
            test_step_id: step.into(),
            test_step_result: TestStepResult {
                status,
                message: None,
                duration: Duration::ZERO,
            },
            ..TestStepFinished::default()
        }
    }

    fn basic_stream() -> Vec<Envelope> {
        vec![
            pickle("p1", "sc1", &[("ps1", "st1"), ("ps2", "st2")]).into(),
            Hook {
                id: "h1".into(),
                name: None,
                tag_expression: Some("@hooked".into()),
            }
            .into(),
            test_case(
                "tc1",
                "p1",
                vec![
                    hook_test_step("ts0", "h1"),
                    pickle_test_step("ts1", "ps1", 1),
                    pickle_test_step("ts2", "ps2", 2),
                ],
            )
            .into(),
            started("tcs1", "tc1", 0).into(),
            finished("tcs1", "ts0", TestStepResultStatus::Passed).into(),
            finished("tcs1", "ts1", TestStepResultStatus::Passed).into(),
            finished("tcs1", "ts2", TestStepResultStatus::Ambiguous).into(),
        ]
    }

    #[test]
    fn indexes_pickle_steps_by_ast_step() {
        let query = Query::from_envelopes(&basic_stream());
        assert_eq!(query.pickle_step_ids("st1"), &[PickleStepId::new("ps1")]);
        assert_eq!(query.pickle_ids("sc1"), &[PickleId::new("p1")]);
        assert!(query.pickle_step_ids("nope").is_empty());
        assert_eq!(query.pickle_step("ps2").map(|s| s.id.as_str()), Some("ps2"));
    }

    #[test]
    fn results_and_match_lists_per_pickle_step() {
        let query = Query::from_envelopes(&basic_stream());
        let results = query.pickle_step_test_step_results(&[PickleStepId::new("ps2")]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, TestStepResultStatus::Ambiguous);
        // two definitions matched without arguments; both are kept
        assert_eq!(query.step_match_arguments_lists("ps2").len(), 2);
        assert!(query.step_match_arguments_lists("missing").is_empty());
    }

    #[test]
    fn distinct_match_lists_are_kept() {
        let mut stream = basic_stream();
        let lists = vec![
            StepMatchArgumentsList {
                step_match_arguments: vec![StepMatchArgument {
                    group: Group {
                        children: vec![],
                        start: Some(2),
                        value: Some("passed".into()),
                    },
                    parameter_type_name: Some("word".into()),
                }],
            },
            StepMatchArgumentsList::default(),
        ];
        stream[2] = test_case(
            "tc1",
            "p1",
            vec![
                hook_test_step("ts0", "h1"),
                pickle_test_step("ts1", "ps1", 1),
                TestStep {
                    step_match_arguments_lists: Some(lists),
                    ..pickle_test_step("ts2", "ps2", 0)
                },
            ],
        )
        .into();
        let query = Query::from_envelopes(&stream);
        assert_eq!(query.step_match_arguments_lists("ps2").len(), 2);
    }

    #[test]
    fn retried_attempt_replaces_results() {
        let mut stream = basic_stream();
        stream.push(started("tcs2", "tc1", 1).into());
        stream.push(finished("tcs2", "ts2", TestStepResultStatus::Passed).into());
        let query = Query::from_envelopes(&stream);
        let results = query.pickle_step_test_step_results(&[PickleStepId::new("ps2")]);
        assert_eq!(results[0].status, TestStepResultStatus::Passed);
        // ts1 did not report in the retry, so nothing is known for it
        assert!(
            query
                .pickle_step_test_step_results(&[PickleStepId::new("ps1")])
                .is_empty()
        );
    }

    #[test]
    fn scenario_counts_use_worst_status() {
        let query = Query::from_envelopes(&basic_stream());
        let counts = query.scenario_status_counts();
        assert_eq!(counts.get(&TestStepResultStatus::Ambiguous), Some(&1));
        assert_eq!(counts.values().sum::<usize>(), 1);
    }

    #[test]
    fn hooks_are_positioned_around_steps() {
        let mut stream = basic_stream();
        stream[2] = test_case(
            "tc1",
            "p1",
            vec![
                hook_test_step("ts0", "h1"),
                pickle_test_step("ts1", "ps1", 1),
                hook_test_step("ts9", "h-missing"),
            ],
        )
        .into();
        stream.truncate(4);
        let query = Query::from_envelopes(&stream);
        let hooks = query.hook_executions("p1");
        assert_eq!(hooks.len(), 2);
        assert_eq!(hooks[0].position, HookPosition::Before);
        assert_eq!(
            hooks[0].hook.and_then(|h| h.tag_expression.as_deref()),
            Some("@hooked")
        );
        assert_eq!(hooks[1].position, HookPosition::After);
        assert!(hooks[1].hook.is_none());
        assert!(hooks[1].result.is_none());
    }

    #[test]
    fn dangling_references_are_rejected() {
        let mut query = Query::from_envelopes(&basic_stream());
        let err = query
            .update(&started("tcs9", "tc-unknown", 0).into())
            .unwrap_err();
        assert!(matches!(err, QueryError::UnknownTestCase { .. }));

        let err = query
            .update(&finished("tcs-unknown", "ts1", TestStepResultStatus::Failed).into())
            .unwrap_err();
        assert!(matches!(err, QueryError::UnknownTestCaseStarted { .. }));

        let err = query
            .update(&finished("tcs1", "ts-unknown", TestStepResultStatus::Failed).into())
            .unwrap_err();
        assert!(matches!(err, QueryError::UnknownTestStep { .. }));

        // the index is untouched
        let results = query.pickle_step_test_step_results(&[PickleStepId::new("ps1")]);
        assert_eq!(results[0].status, TestStepResultStatus::Passed);
    }

    #[test]
    fn attachments_follow_their_test_step() {
        let mut stream = basic_stream();
        stream.push(
            Attachment {
                body: "hello".into(),
                media_type: "text/plain".into(),
                test_case_started_id: Some("tcs1".into()),
                test_step_id: Some("ts1".into()),
                ..Attachment::default()
            }
            .into(),
        );
        let query = Query::from_envelopes(&stream);
        let attachments = query.pickle_step_attachments(&[PickleStepId::new("ps1")]);
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].body, "hello");
        assert!(query.pickle_step_attachments(&[PickleStepId::new("ps2")]).is_empty());
    }
}
