//! JSON report writer for pickleview.
//!
//! The same walk as the Markdown report, kept as data: every step carries its
//! resolution state and segments so a frontend can style parameters without
//! re-deriving them from match arguments.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use pickleview_ids::{AnchorId, AstNodeId, PickleId};
use pickleview_ports::{CucumberQuery, GherkinQuery, ReportRenderer};
use pickleview_query::StepResolver;
use pickleview_schema::execution::Attachment;
use pickleview_schema::gherkin::{DataTable, Examples, GherkinDocument, Rule, Scenario, Step, Tag};
use pickleview_schema::pickle::PickleStep;
use pickleview_schema::{TestStepResultStatus, worst_test_step_result};
use pickleview_segment::{ResolutionState, Segment};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Bumped when a field changes meaning or goes away.
pub const REPORT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonReport {
    pub version: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<RunReport>,
    /// Scenario count per status.
    pub summary: BTreeMap<TestStepResultStatus, usize>,
    pub features: Vec<FeatureReport>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub success: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureReport {
    pub uri: String,
    pub anchor: AnchorId,
    pub keyword: String,
    pub name: String,
    pub tags: Vec<String>,
    pub status: TestStepResultStatus,
    /// Feature-level background steps.
    pub background: Vec<StepReport>,
    pub scenarios: Vec<ScenarioReport>,
    pub rules: Vec<RuleReport>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleReport {
    pub anchor: AnchorId,
    pub name: String,
    pub tags: Vec<String>,
    pub status: TestStepResultStatus,
    pub background: Vec<StepReport>,
    pub scenarios: Vec<ScenarioReport>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub id: AstNodeId,
    pub anchor: AnchorId,
    pub keyword: String,
    pub name: String,
    pub tags: Vec<String>,
    pub status: TestStepResultStatus,
    pub steps: Vec<StepReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<ExamplesReport>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExamplesReport {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<ExampleRowReport>,
}

/// One examples row with the steps as that row ran them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExampleRowReport {
    pub cells: Vec<String>,
    pub status: TestStepResultStatus,
    pub steps: Vec<StepReport>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub keyword: String,
    pub text: String,
    pub state: ResolutionState,
    pub segments: Vec<Segment>,
    pub status: TestStepResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_table: Option<Vec<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_string: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentReport>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentReport {
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Decoded size in bytes.
    pub size: usize,
}

impl From<&Attachment> for AttachmentReport {
    fn from(attachment: &Attachment) -> Self {
        Self {
            media_type: attachment.media_type.clone(),
            file_name: attachment.file_name.clone(),
            size: attachment.decoded_len(),
        }
    }
}

/// Renders [`JsonReport`] as pretty-printed JSON.
#[derive(Clone, Debug)]
pub struct JsonRenderer {
    pub title: String,
}

impl JsonRenderer {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl ReportRenderer for JsonRenderer {
    fn render_report(
        &self,
        gherkin: &dyn GherkinQuery,
        cucumber: &dyn CucumberQuery,
    ) -> Result<String> {
        let report = build_report(&self.title, gherkin, cucumber);
        serde_json::to_string_pretty(&report).context("serialize json report")
    }
}

/// Build the report without serializing it.
pub fn build_report(
    title: &str,
    gherkin: &dyn GherkinQuery,
    cucumber: &dyn CucumberQuery,
) -> JsonReport {
    let walk = Walk {
        gherkin,
        cucumber,
        resolver: StepResolver::new(gherkin, cucumber),
    };
    let run = match (cucumber.test_run_started(), cucumber.test_run_finished()) {
        (None, None) => None,
        (started, finished) => Some(RunReport {
            started_at: started.and_then(|s| s.timestamp.to_datetime()),
            finished_at: finished.and_then(|f| f.timestamp.to_datetime()),
            success: finished.map(|f| f.success),
        }),
    };
    let features: Vec<_> = gherkin
        .documents()
        .iter()
        .filter_map(|d| walk.feature(d))
        .collect();
    debug!(features = features.len(), "built json report");

    JsonReport {
        version: REPORT_VERSION,
        title: title.to_string(),
        run,
        summary: cucumber.scenario_status_counts(),
        features,
    }
}

pub fn write_report_json(path: &Path, report: &JsonReport) -> Result<()> {
    let text = serde_json::to_string_pretty(report).context("serialize json report")?;
    std::fs::write(path, text).with_context(|| format!("write {path:?}"))?;
    Ok(())
}

struct Walk<'r> {
    gherkin: &'r dyn GherkinQuery,
    cucumber: &'r dyn CucumberQuery,
    resolver: StepResolver<'r>,
}

impl<'r> Walk<'r> {
    fn feature(&self, document: &'r GherkinDocument) -> Option<FeatureReport> {
        let feature = document.feature.as_ref()?;
        let uri = document.uri.clone().unwrap_or_default();

        let mut background = Vec::new();
        let mut scenarios = Vec::new();
        let mut rules = Vec::new();
        for child in &feature.children {
            if let Some(b) = &child.background {
                background.extend(self.steps(&b.steps, false));
            }
            if let Some(s) = &child.scenario {
                scenarios.push(self.scenario(&uri, s));
            }
            if let Some(r) = &child.rule {
                rules.push(self.rule(&uri, r));
            }
        }

        Some(FeatureReport {
            anchor: AnchorId::from_parts([uri.as_str(), "feature"]),
            keyword: feature.keyword.clone(),
            name: feature.name.clone(),
            tags: tag_names(&feature.tags),
            status: self.worst_status(&self.pickles_of(feature.scenarios())),
            background,
            scenarios,
            rules,
            uri,
        })
    }

    fn rule(&self, uri: &str, rule: &'r Rule) -> RuleReport {
        let mut background = Vec::new();
        let mut scenarios = Vec::new();
        for child in &rule.children {
            if let Some(b) = &child.background {
                background.extend(self.steps(&b.steps, false));
            }
            if let Some(s) = &child.scenario {
                scenarios.push(self.scenario(uri, s));
            }
        }
        let ruled = rule.children.iter().filter_map(|c| c.scenario.as_ref());
        RuleReport {
            anchor: AnchorId::from_parts([uri, rule.id.as_str()]),
            name: rule.name.clone(),
            tags: tag_names(&rule.tags),
            status: self.worst_status(&self.pickles_of(ruled)),
            background,
            scenarios,
        }
    }

    fn scenario(&self, uri: &str, scenario: &'r Scenario) -> ScenarioReport {
        let has_examples = scenario.has_examples();
        ScenarioReport {
            id: scenario.id.clone(),
            anchor: AnchorId::from_parts([uri, scenario.id.as_str()]),
            keyword: scenario.keyword.clone(),
            name: scenario.name.clone(),
            tags: tag_names(&scenario.tags),
            status: self.worst_status(self.gherkin.pickle_ids(&scenario.id)),
            steps: self.steps(&scenario.steps, has_examples),
            examples: scenario
                .examples
                .iter()
                .map(|e| self.examples(scenario, e))
                .collect(),
        }
    }

    fn examples(&self, scenario: &'r Scenario, examples: &'r Examples) -> ExamplesReport {
        let rows = examples
            .table_body
            .iter()
            .map(|row| {
                let pickle_ids = row
                    .id
                    .as_ref()
                    .map(|id| self.gherkin.pickle_ids(id))
                    .unwrap_or_default();
                ExampleRowReport {
                    cells: row.values().map(str::to_string).collect(),
                    status: self.worst_status(pickle_ids),
                    steps: pickle_ids
                        .first()
                        .map(|id| self.row_steps(scenario, id))
                        .unwrap_or_default(),
                }
            })
            .collect();
        ExamplesReport {
            name: examples.name.clone(),
            header: examples
                .table_header
                .as_ref()
                .map(|h| h.values().map(str::to_string).collect())
                .unwrap_or_default(),
            rows,
        }
    }

    /// The outline's own steps as compiled for one row's pickle.
    fn row_steps(&self, scenario: &'r Scenario, pickle_id: &PickleId) -> Vec<StepReport> {
        let Some(pickle) = self.gherkin.pickle(pickle_id) else {
            return Vec::new();
        };
        scenario
            .steps
            .iter()
            .filter_map(|step| {
                let pickle_step = pickle
                    .steps
                    .iter()
                    .find(|ps| ps.ast_node_ids.first() == Some(&step.id))?;
                Some(self.step(step, Some(pickle_step), true))
            })
            .collect()
    }

    fn steps(&self, steps: &'r [Step], has_examples: bool) -> Vec<StepReport> {
        steps
            .iter()
            .map(|step| self.step(step, None, has_examples))
            .collect()
    }

    fn step(
        &self,
        step: &'r Step,
        pickle_step: Option<&'r PickleStep>,
        has_examples: bool,
    ) -> StepReport {
        let resolved = self.resolver.resolve(step, pickle_step, has_examples);
        let status = self.resolver.step_status(step, pickle_step);
        let segmented = resolved.segmented();
        let shows_outcome = !resolved.is_templated;
        StepReport {
            keyword: resolved.keyword.to_string(),
            text: resolved.text.to_string(),
            state: segmented.state,
            segments: segmented.segments,
            status: status.result.status,
            error_message: status.result.message.filter(|_| shows_outcome),
            data_table: resolved.data_table.map(table_cells),
            doc_string: resolved.doc_string.map(|d| d.content.clone()),
            attachments: if shows_outcome {
                status.attachments.into_iter().map(AttachmentReport::from).collect()
            } else {
                Vec::new()
            },
        }
    }

    fn pickles_of(&self, scenarios: impl Iterator<Item = &'r Scenario>) -> Vec<PickleId> {
        scenarios
            .flat_map(|s| self.gherkin.pickle_ids(&s.id).iter().cloned())
            .collect()
    }

    fn worst_status(&self, pickle_ids: &[PickleId]) -> TestStepResultStatus {
        if pickle_ids.is_empty() {
            return TestStepResultStatus::Unknown;
        }
        worst_test_step_result(&self.cucumber.pickle_test_step_results(pickle_ids)).status
    }
}

fn tag_names(tags: &[Tag]) -> Vec<String> {
    tags.iter().map(|t| t.name.clone()).collect()
}

fn table_cells(table: &DataTable) -> Vec<Vec<String>> {
    table
        .rows
        .iter()
        .map(|r| r.values().map(str::to_string).collect())
        .collect()
}
