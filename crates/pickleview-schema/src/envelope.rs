use crate::execution::{
    Attachment, TestCaseFinished, TestCaseStarted, TestRunFinished, TestRunStarted,
    TestStepFinished, TestStepStarted,
};
use crate::gherkin::GherkinDocument;
use crate::glue::{Hook, ParameterType, StepDefinition, TestCase};
use crate::pickle::Pickle;
use serde::{Deserialize, Serialize};

/// Tool and platform information. Kept opaque.
pub type Meta = serde_json::Value;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub uri: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub media_type: String,
}

/// One line of an NDJSON message stream.
///
/// Producers set exactly one field. Message kinds this crate does not model
/// deserialize to an envelope with every field empty.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gherkin_document: Option<GherkinDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickle: Option<Pickle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_definition: Option<StepDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook: Option<Hook>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_type: Option<ParameterType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_run_started: Option<TestRunStarted>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case: Option<TestCase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case_started: Option<TestCaseStarted>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_step_started: Option<TestStepStarted>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_step_finished: Option<TestStepFinished>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case_finished: Option<TestCaseFinished>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_run_finished: Option<TestRunFinished>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

impl Envelope {
    /// Wire name of the populated message, `None` for an unrecognised envelope.
    pub fn kind(&self) -> Option<&'static str> {
        let kinds = [
            (self.meta.is_some(), "meta"),
            (self.source.is_some(), "source"),
            (self.gherkin_document.is_some(), "gherkinDocument"),
            (self.pickle.is_some(), "pickle"),
            (self.step_definition.is_some(), "stepDefinition"),
            (self.hook.is_some(), "hook"),
            (self.parameter_type.is_some(), "parameterType"),
            (self.test_run_started.is_some(), "testRunStarted"),
            (self.test_case.is_some(), "testCase"),
            (self.test_case_started.is_some(), "testCaseStarted"),
            (self.test_step_started.is_some(), "testStepStarted"),
            (self.test_step_finished.is_some(), "testStepFinished"),
            (self.test_case_finished.is_some(), "testCaseFinished"),
            (self.test_run_finished.is_some(), "testRunFinished"),
            (self.attachment.is_some(), "attachment"),
        ];
        kinds
            .into_iter()
            .find_map(|(present, name)| present.then_some(name))
    }
}

macro_rules! envelope_from {
    ($($ty:ty => $field:ident),* $(,)?) => {
        $(
            impl From<$ty> for Envelope {
                fn from(message: $ty) -> Self {
                    Envelope {
                        $field: Some(message),
                        ..Envelope::default()
                    }
                }
            }
        )*
    };
}

envelope_from! {
    Source => source,
    GherkinDocument => gherkin_document,
    Pickle => pickle,
    StepDefinition => step_definition,
    Hook => hook,
    ParameterType => parameter_type,
    TestRunStarted => test_run_started,
    TestCase => test_case,
    TestCaseStarted => test_case_started,
    TestStepStarted => test_step_started,
    TestStepFinished => test_step_finished,
    TestCaseFinished => test_case_finished,
    TestRunFinished => test_run_finished,
    Attachment => attachment,
}
