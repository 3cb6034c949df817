use crate::gherkin::{DataTable, DocString};
use pickleview_ids::{AstNodeId, PickleId, PickleStepId};
use serde::{Deserialize, Serialize};

/// The executable form of a scenario: one per scenario, or one per examples
/// row for an outline, with backgrounds folded in.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pickle {
    pub id: PickleId,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub steps: Vec<PickleStep>,
    #[serde(default)]
    pub tags: Vec<PickleTag>,
    /// Scenario id, then the examples row id for outline pickles.
    #[serde(default)]
    pub ast_node_ids: Vec<AstNodeId>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PickleStep {
    pub id: PickleStepId,
    /// Step text with outline placeholders already substituted.
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<PickleStepArgument>,
    /// The AST step id, then the examples row id for outline steps.
    #[serde(default)]
    pub ast_node_ids: Vec<AstNodeId>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PickleStepArgument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_string: Option<DocString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_table: Option<DataTable>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PickleTag {
    pub name: String,
    #[serde(default)]
    pub ast_node_id: AstNodeId,
}
