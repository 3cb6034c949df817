use anyhow::Result;
use pickleview_ids::{PickleId, PickleStepId};
use pickleview_schema::Envelope;
use pickleview_schema::execution::{
    Attachment, TestRunFinished, TestRunStarted, TestStepResult, TestStepResultStatus,
};
use pickleview_schema::gherkin::GherkinDocument;
use pickleview_schema::glue::{Hook, StepMatchArgumentsList};
use pickleview_schema::pickle::{Pickle, PickleStep};
use std::collections::BTreeMap;

/// Where a message stream comes from.
///
/// Adapters live in `pickleview-ingest-*` crates.
pub trait MessageSource {
    fn read_envelopes(&self) -> Result<Vec<Envelope>>;
}

/// Lookups over the Gherkin side of a run: documents and their pickles.
pub trait GherkinQuery {
    /// Documents in the order they arrived.
    fn documents(&self) -> &[GherkinDocument];

    /// Pickle steps compiled from an AST step. Background and outline steps
    /// compile to many.
    fn pickle_step_ids(&self, ast_step_id: &str) -> &[PickleStepId];

    /// Pickles compiled from a scenario or an examples table row.
    fn pickle_ids(&self, ast_node_id: &str) -> &[PickleId];

    fn pickle(&self, pickle_id: &str) -> Option<&Pickle>;

    fn pickle_step(&self, pickle_step_id: &str) -> Option<&PickleStep>;
}

/// Before or after the pickle's own steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookPosition {
    Before,
    After,
}

/// One hook run inside a test case.
#[derive(Clone, Debug)]
pub struct HookExecution<'a> {
    pub position: HookPosition,
    /// `None` when the stream never described the hook.
    pub hook: Option<&'a Hook>,
    pub result: Option<&'a TestStepResult>,
    pub attachments: Vec<&'a Attachment>,
}

/// Lookups over the execution side of a run: results, matches, attachments.
pub trait CucumberQuery {
    /// Latest result per test step that ran for these pickle steps.
    fn pickle_step_test_step_results(&self, pickle_step_ids: &[PickleStepId])
    -> Vec<TestStepResult>;

    fn pickle_step_attachments(&self, pickle_step_ids: &[PickleStepId]) -> Vec<&Attachment>;

    /// One list per matching step definition. Test steps that repeat the
    /// same lists, as retried cases do, count once.
    fn step_match_arguments_lists(&self, pickle_step_id: &str) -> Vec<&StepMatchArgumentsList>;

    /// Latest result of every test step (hooks included) of these pickles.
    fn pickle_test_step_results(&self, pickle_ids: &[PickleId]) -> Vec<TestStepResult>;

    fn hook_executions(&self, pickle_id: &str) -> Vec<HookExecution<'_>>;

    fn test_run_started(&self) -> Option<&TestRunStarted>;

    fn test_run_finished(&self) -> Option<&TestRunFinished>;

    /// Pickles grouped by their worst step status.
    fn scenario_status_counts(&self) -> BTreeMap<TestStepResultStatus, usize>;
}

/// Rendering.
///
/// Renderers are pure: queries in, text out.
pub trait ReportRenderer {
    fn render_report(&self, gherkin: &dyn GherkinQuery, cucumber: &dyn CucumberQuery)
    -> Result<String>;
}
