//! Messages that connect pickles to the code that ran them.

use pickleview_ids::{HookId, PickleId, PickleStepId, StepDefinitionId, TestCaseId, TestStepId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepDefinitionPatternType {
    CucumberExpression,
    RegularExpression,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinitionPattern {
    pub source: String,
    #[serde(rename = "type")]
    pub pattern_type: StepDefinitionPatternType,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    pub id: StepDefinitionId,
    pub pattern: StepDefinitionPattern,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Hook {
    pub id: HookId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_expression: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParameterType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub regular_expressions: Vec<String>,
    #[serde(default)]
    pub prefer_for_regular_expression_match: bool,
    #[serde(default)]
    pub use_for_snippets: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: TestCaseId,
    pub pickle_id: PickleId,
    #[serde(default)]
    pub test_steps: Vec<TestStep>,
}

/// Either a hook step (`hook_id`) or a pickle step (`pickle_step_id`).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestStep {
    pub id: TestStepId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_id: Option<HookId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickle_step_id: Option<PickleStepId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_definition_ids: Option<Vec<StepDefinitionId>>,
    /// One list per matching step definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_match_arguments_lists: Option<Vec<StepMatchArgumentsList>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct StepMatchArgumentsList {
    #[serde(default)]
    pub step_match_arguments: Vec<StepMatchArgument>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct StepMatchArgument {
    pub group: Group,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_type_name: Option<String>,
}

/// A regex capture group. `start` is in UTF-16 code units of the step text.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(default)]
    pub children: Vec<Group>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}
