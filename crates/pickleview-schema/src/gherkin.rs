use pickleview_ids::AstNodeId;
use serde::{Deserialize, Serialize};

/// A parsed `.feature` file.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GherkinDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<Feature>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub children: Vec<FeatureChild>,
}

/// Exactly one field is set by well-behaved producers.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureChild {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<Scenario>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: AstNodeId,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub children: Vec<RuleChild>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RuleChild {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<Scenario>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Background {
    pub id: AstNodeId,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A scenario or a scenario outline. Outlines carry `examples`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: AstNodeId,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub examples: Vec<Examples>,
}

impl Scenario {
    pub fn has_examples(&self) -> bool {
        !self.examples.is_empty()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Examples {
    pub id: AstNodeId,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_header: Option<TableRow>,
    #[serde(default)]
    pub table_body: Vec<TableRow>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub id: AstNodeId,
}

/// Gherkin keyword category as reported by the parser.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum StepKeywordType {
    Unknown,
    Context,
    Action,
    Outcome,
    Conjunction,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: AstNodeId,
    #[serde(default)]
    pub location: Location,
    /// Keyword including its trailing space, e.g. `"Given "`.
    #[serde(default)]
    pub keyword: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_type: Option<StepKeywordType>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_string: Option<DocString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_table: Option<DataTable>,
}

/// Table row. Pickle tables carry no ids, so `id` is optional.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AstNodeId>,
    #[serde(default)]
    pub cells: Vec<TableCell>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TableCell {
    #[serde(default)]
    pub value: String,
}

/// Used for both the AST data table and the pickle table.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DataTable {
    #[serde(default)]
    pub rows: Vec<TableRow>,
}

/// Used for both the AST doc string and the pickle doc string.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocString {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
}

impl TableRow {
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|c| c.value.as_str())
    }
}

impl Feature {
    /// Scenarios in document order, descending into rules.
    pub fn scenarios(&self) -> impl Iterator<Item = &Scenario> {
        self.children.iter().flat_map(|child| {
            let direct = child.scenario.iter();
            let ruled = child
                .rule
                .iter()
                .flat_map(|r| r.children.iter().filter_map(|c| c.scenario.as_ref()));
            direct.chain(ruled)
        })
    }
}
