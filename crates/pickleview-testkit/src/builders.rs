//! Fixture builders for Gherkin documents.
//!
//! Builders leave ids empty; [`FeatureBuilder::build`] numbers every node
//! (steps, scenarios, rules, examples, rows, tags) and gives it a line, so
//! documents built from different uris never share ids.

use pickleview_ids::AstNodeId;
use pickleview_schema::gherkin::*;

pub fn step(keyword: &str, text: &str) -> Step {
    Step {
        keyword: keyword.to_string(),
        keyword_type: keyword_type(keyword),
        text: text.to_string(),
        ..Step::default()
    }
}

fn keyword_type(keyword: &str) -> Option<StepKeywordType> {
    match keyword.trim() {
        "Given" => Some(StepKeywordType::Context),
        "When" => Some(StepKeywordType::Action),
        "Then" => Some(StepKeywordType::Outcome),
        "And" | "But" => Some(StepKeywordType::Conjunction),
        "*" => Some(StepKeywordType::Unknown),
        _ => None,
    }
}

pub fn row(cells: &[&str]) -> TableRow {
    TableRow {
        id: None,
        cells: cells
            .iter()
            .map(|c| TableCell {
                value: c.to_string(),
            })
            .collect(),
    }
}

pub fn data_table(rows: &[&[&str]]) -> DataTable {
    DataTable {
        rows: rows.iter().map(|r| row(r)).collect(),
    }
}

pub fn doc_string(content: &str, media_type: Option<&str>) -> DocString {
    DocString {
        media_type: media_type.map(str::to_string),
        content: content.to_string(),
        delimiter: Some("\"\"\"".to_string()),
    }
}

fn tag(name: &str) -> Tag {
    Tag {
        name: name.to_string(),
        id: AstNodeId::default(),
    }
}

pub struct ScenarioBuilder {
    scenario: Scenario,
}

impl ScenarioBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            scenario: Scenario {
                keyword: "Scenario".to_string(),
                name: name.to_string(),
                ..Scenario::default()
            },
        }
    }

    pub fn outline(name: &str) -> Self {
        let mut builder = Self::new(name);
        builder.scenario.keyword = "Scenario Outline".to_string();
        builder
    }

    pub fn tag(mut self, name: &str) -> Self {
        self.scenario.tags.push(tag(name));
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.scenario.description = description.to_string();
        self
    }

    pub fn step(self, keyword: &str, text: &str) -> Self {
        self.with_step(step(keyword, text))
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.scenario.steps.push(step);
        self
    }

    pub fn examples(self, name: &str, header: &[&str], body: &[&[&str]]) -> Self {
        self.with_examples(name, &[], header, body)
    }

    pub fn with_examples(
        mut self,
        name: &str,
        tags: &[&str],
        header: &[&str],
        body: &[&[&str]],
    ) -> Self {
        self.scenario.examples.push(Examples {
            keyword: "Examples".to_string(),
            name: name.to_string(),
            tags: tags.iter().map(|t| tag(t)).collect(),
            table_header: Some(row(header)),
            table_body: body.iter().map(|r| row(r)).collect(),
            ..Examples::default()
        });
        self
    }

    pub fn build(self) -> Scenario {
        self.scenario
    }
}

pub struct FeatureBuilder {
    uri: String,
    feature: Feature,
}

impl FeatureBuilder {
    pub fn new(uri: &str, name: &str) -> Self {
        Self {
            uri: uri.to_string(),
            feature: Feature {
                language: "en".to_string(),
                keyword: "Feature".to_string(),
                name: name.to_string(),
                ..Feature::default()
            },
        }
    }

    pub fn tag(mut self, name: &str) -> Self {
        self.feature.tags.push(tag(name));
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.feature.description = description.to_string();
        self
    }

    pub fn background(mut self, steps: Vec<Step>) -> Self {
        self.feature.children.push(FeatureChild {
            background: Some(background(steps)),
            ..FeatureChild::default()
        });
        self
    }

    pub fn scenario(mut self, scenario: ScenarioBuilder) -> Self {
        self.feature.children.push(FeatureChild {
            scenario: Some(scenario.build()),
            ..FeatureChild::default()
        });
        self
    }

    /// A rule holding `scenarios`, with an optional rule-level background.
    pub fn rule(
        mut self,
        name: &str,
        background_steps: Option<Vec<Step>>,
        scenarios: Vec<ScenarioBuilder>,
    ) -> Self {
        let mut children: Vec<RuleChild> = background_steps
            .map(|steps| RuleChild {
                background: Some(background(steps)),
                scenario: None,
            })
            .into_iter()
            .collect();
        children.extend(scenarios.into_iter().map(|s| RuleChild {
            background: None,
            scenario: Some(s.build()),
        }));
        self.feature.children.push(FeatureChild {
            rule: Some(Rule {
                keyword: "Rule".to_string(),
                name: name.to_string(),
                children,
                ..Rule::default()
            }),
            ..FeatureChild::default()
        });
        self
    }

    pub fn build(self) -> GherkinDocument {
        let mut feature = self.feature;
        let mut ids = NodeNumbering::new(&self.uri);
        ids.feature(&mut feature);
        GherkinDocument {
            uri: Some(self.uri),
            feature: Some(feature),
        }
    }
}

fn background(steps: Vec<Step>) -> Background {
    Background {
        keyword: "Background".to_string(),
        steps,
        ..Background::default()
    }
}

/// Hands out `<stem>-<n>` ids and increasing line numbers in document order.
struct NodeNumbering {
    prefix: String,
    next: u32,
}

impl NodeNumbering {
    fn new(uri: &str) -> Self {
        let stem = std::path::Path::new(uri)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("doc");
        Self {
            prefix: stem.to_string(),
            next: 0,
        }
    }

    fn id(&mut self) -> AstNodeId {
        self.next += 1;
        AstNodeId::new(format!("{}-{}", self.prefix, self.next))
    }

    fn location(&self) -> Location {
        Location {
            line: self.next + 1,
            column: Some(1),
        }
    }

    fn tags(&mut self, tags: &mut [Tag]) {
        for tag in tags {
            tag.id = self.id();
        }
    }

    fn steps(&mut self, steps: &mut [Step]) {
        for step in steps {
            step.id = self.id();
            step.location = self.location();
        }
    }

    fn background(&mut self, background: &mut Background) {
        background.id = self.id();
        background.location = self.location();
        self.steps(&mut background.steps);
    }

    fn scenario(&mut self, scenario: &mut Scenario) {
        self.tags(&mut scenario.tags);
        scenario.id = self.id();
        scenario.location = self.location();
        self.steps(&mut scenario.steps);
        for examples in &mut scenario.examples {
            self.tags(&mut examples.tags);
            examples.id = self.id();
            examples.location = self.location();
            for row in examples.table_header.iter_mut().chain(examples.table_body.iter_mut()) {
                row.id = Some(self.id());
            }
        }
    }

    fn feature(&mut self, feature: &mut Feature) {
        self.tags(&mut feature.tags);
        feature.location = self.location();
        for child in &mut feature.children {
            if let Some(background) = &mut child.background {
                self.background(background);
            }
            if let Some(scenario) = &mut child.scenario {
                self.scenario(scenario);
            }
            if let Some(rule) = &mut child.rule {
                self.tags(&mut rule.tags);
                rule.id = self.id();
                rule.location = self.location();
                for rule_child in &mut rule.children {
                    if let Some(background) = &mut rule_child.background {
                        self.background(background);
                    }
                    if let Some(scenario) = &mut rule_child.scenario {
                        self.scenario(scenario);
                    }
                }
            }
        }
    }
}
