//! A tiny fake Cucumber runner.
//!
//! [`FakeRunner`] compiles Gherkin documents into pickles, matches their steps
//! against [`Glue`] written as Cucumber expressions, runs hooks and steps and
//! emits the full message stream a real runner would. It exists so tests
//! can produce realistic streams (match arguments with UTF-16 offsets,
//! ambiguous and undefined steps, hook attachments, outline rows) without a
//! JavaScript toolchain.

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pickleview_ids::{
    AstNodeId, HookId, PickleId, PickleStepId, StepDefinitionId, TestCaseId, TestCaseStartedId,
    TestStepId,
};
use pickleview_schema::Envelope;
use pickleview_schema::execution::*;
use pickleview_schema::gherkin::*;
use pickleview_schema::glue::*;
use pickleview_schema::pickle::*;
use pickleview_segment::utf16;
use regex::Regex;

/// A 1x1 PNG, attached by the `@passedHooked` after hook.
pub const SCREENSHOT_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f, 0x15, 0xc4,
    0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0x64, 0xf8, 0xcf, 0x50,
    0x0f, 0x00, 0x03, 0x86, 0x01, 0x80, 0x5a, 0x34, 0x7d, 0x6b, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45,
    0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Error message of the `a step has failed` definition.
pub const FAILED_STEP_MESSAGE: &str = "Oh no we have an error";

/// Error message of the `@hooked` before hook.
pub const FAILED_HOOK_MESSAGE: &str = "Exception in hook";

/// Log line with ANSI colour codes written by the `@hooked` before hook.
pub const RAINBOW_LOG: &str = "\u{1b}[31mr\u{1b}[33ma\u{1b}[32mi\u{1b}[36mn\u{1b}[34mb\u{1b}[35mo\u{1b}[31mw\u{1b}[0m";

/// What a step or hook body decided.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed(String),
    Pending,
    Skipped,
}

/// Collects what a body attaches while it runs.
#[derive(Debug, Default)]
pub struct World {
    attachments: Vec<Attachment>,
}

impl World {
    pub fn log(&mut self, text: &str) {
        self.attachments.push(Attachment {
            body: text.to_string(),
            media_type: LOG_MEDIA_TYPE.to_string(),
            ..Attachment::default()
        });
    }

    pub fn attach_text(&mut self, text: &str, media_type: &str) {
        self.attachments.push(Attachment {
            body: text.to_string(),
            media_type: media_type.to_string(),
            ..Attachment::default()
        });
    }

    pub fn attach_bytes(&mut self, bytes: &[u8], media_type: &str, file_name: Option<&str>) {
        self.attachments.push(Attachment {
            body: STANDARD.encode(bytes),
            content_encoding: AttachmentContentEncoding::Base64,
            media_type: media_type.to_string(),
            file_name: file_name.map(str::to_string),
            ..Attachment::default()
        });
    }
}

pub type StepBody = fn(&mut World, &[String]) -> Outcome;
pub type HookBody = fn(&mut World) -> Outcome;

#[derive(Clone, Debug)]
pub struct ParameterTypeDef {
    pub name: String,
    pub regexps: Vec<String>,
}

impl ParameterTypeDef {
    pub fn new(name: &str, regexps: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            regexps: regexps.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn built_ins() -> Vec<Self> {
        vec![
            Self::new("int", &[r"-?\d+"]),
            Self::new("float", &[r"[-+]?\d*\.?\d+(?:[eE][-+]?\d+)?"]),
            Self::new("word", &[r"[^\s]+"]),
            Self::new("string", &[r#""([^"]*)""#, r"'([^']*)'"]),
            Self::new("", &[r".*"]),
        ]
    }
}

/// One parameter inside a compiled expression: its outer capture index and
/// the capture indices of its own inner groups.
#[derive(Clone, Debug)]
struct CompiledParameter {
    type_name: String,
    outer: usize,
    inner: std::ops::Range<usize>,
}

#[derive(Clone, Debug)]
pub struct StepDef {
    pub id: StepDefinitionId,
    pub expression: String,
    regex: Regex,
    parameters: Vec<CompiledParameter>,
    body: StepBody,
}

impl StepDef {
    /// Capture tree for `text`, or `None` when the expression does not match.
    fn match_arguments(&self, text: &str) -> Option<StepMatchArgumentsList> {
        let caps = self.regex.captures(text)?;
        let group = |index: usize| -> Group {
            match caps.get(index) {
                Some(m) => Group {
                    children: Vec::new(),
                    start: Some(utf16::len(&text[..m.start()]) as u32),
                    value: Some(m.as_str().to_string()),
                },
                None => Group::default(),
            }
        };
        let step_match_arguments = self
            .parameters
            .iter()
            .map(|p| StepMatchArgument {
                group: Group {
                    children: p.inner.clone().map(&group).collect(),
                    ..group(p.outer)
                },
                parameter_type_name: Some(p.type_name.clone()),
            })
            .collect();
        Some(StepMatchArgumentsList {
            step_match_arguments,
        })
    }

    fn arguments(&self, text: &str) -> Vec<String> {
        self.regex
            .captures(text)
            .map(|caps| {
                self.parameters
                    .iter()
                    .map(|p| {
                        caps.get(p.outer)
                            .map(|m| m.as_str().to_string())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookWhen {
    Before,
    After,
}

#[derive(Clone, Debug)]
pub struct HookDef {
    pub id: HookId,
    pub when: HookWhen,
    /// A single tag such as `@hooked`; `None` runs for every pickle.
    pub tag_expression: Option<String>,
    body: HookBody,
}

impl HookDef {
    fn applies_to(&self, pickle: &Pickle) -> bool {
        match &self.tag_expression {
            Some(tag) => pickle.tags.iter().any(|t| &t.name == tag),
            None => true,
        }
    }
}

/// Step definitions, hooks and parameter types of a fake project.
#[derive(Clone, Debug)]
pub struct Glue {
    parameter_types: Vec<ParameterTypeDef>,
    custom_parameter_types: usize,
    pub step_definitions: Vec<StepDef>,
    pub hooks: Vec<HookDef>,
}

impl Default for Glue {
    fn default() -> Self {
        Self::new()
    }
}

impl Glue {
    /// Glue with only the built-in parameter types.
    pub fn new() -> Self {
        Self {
            parameter_types: ParameterTypeDef::built_ins(),
            custom_parameter_types: 0,
            step_definitions: Vec::new(),
            hooks: Vec::new(),
        }
    }

    pub fn parameter_type(mut self, name: &str, regexps: &[&str]) -> Self {
        self.parameter_types
            .insert(0, ParameterTypeDef::new(name, regexps));
        self.custom_parameter_types += 1;
        self
    }

    pub fn step(mut self, expression: &str, body: StepBody) -> Result<Self> {
        let (regex, parameters) = self
            .compile(expression)
            .with_context(|| format!("compile cucumber expression {expression:?}"))?;
        let id = StepDefinitionId::new(format!("stepdef-{}", self.step_definitions.len() + 1));
        self.step_definitions.push(StepDef {
            id,
            expression: expression.to_string(),
            regex,
            parameters,
            body,
        });
        Ok(self)
    }

    pub fn hook(mut self, when: HookWhen, tag_expression: Option<&str>, body: HookBody) -> Self {
        let id = HookId::new(format!("hook-{}", self.hooks.len() + 1));
        self.hooks.push(HookDef {
            id,
            when,
            tag_expression: tag_expression.map(str::to_string),
            body,
        });
        self
    }

    /// The fixture project: a `flight` parameter type, definitions for
    /// flights, passing, failing, pending, ambiguous and logging steps, and
    /// tagged hooks that log, fail and attach a screenshot.
    pub fn standard() -> Result<Self> {
        Self::new()
            .parameter_type("flight", &["([A-Z]{3})-([A-Z]{3})"])
            .step("{flight} has been delayed {int} minutes", |_, args| {
                if args == ["LHR-CDG", "45"] {
                    Outcome::Passed
                } else {
                    Outcome::Failed(format!(
                        "expected LHR-CDG to be delayed 45 minutes, got {} delayed {}",
                        args.first().map(String::as_str).unwrap_or(""),
                        args.get(1).map(String::as_str).unwrap_or("")
                    ))
                }
            })?
            .step("a passed step", |_, _| Outcome::Passed)?
            .step("a step has failed", |_, _| Outcome::Failed(FAILED_STEP_MESSAGE.to_string()))?
            .step("a pending step", |_, _| Outcome::Pending)?
            .step("an ambiguous step", |_, _| Outcome::Passed)?
            .step("an {word} step", |_, _| Outcome::Passed)?
            .step("I have {int} cucumber(s) in my {word}", |_, _| Outcome::Passed)?
            .step("the step logs {string}", |world, args| {
                if let Some(text) = args.first() {
                    world.log(text.trim_matches(['"', '\'']));
                }
                Outcome::Passed
            })?
            .step("the step attaches the doc string", |world, _| {
                world.attach_text("{\"attached\":true}", "application/json");
                Outcome::Passed
            })
            .map(|glue| {
                glue.hook(HookWhen::Before, Some("@hooked"), |world| {
                    world.log("Before hook log line");
                    world.log(RAINBOW_LOG);
                    Outcome::Failed(FAILED_HOOK_MESSAGE.to_string())
                })
                .hook(HookWhen::Before, Some("@passedHooked"), |world| {
                    world.log("Hello from the before hook");
                    Outcome::Passed
                })
                .hook(HookWhen::After, Some("@passedHooked"), |world| {
                    world.log("Goodbye from the after hook");
                    world.attach_bytes(SCREENSHOT_PNG, "image/png", Some("screenshot.png"));
                    Outcome::Passed
                })
            })
    }

    fn parameter(&self, name: &str) -> Option<&ParameterTypeDef> {
        self.parameter_types.iter().find(|p| p.name == name)
    }

    /// Translate a Cucumber expression into an anchored regex. Supports
    /// `{type}` parameters, `{}` and optional text `(s)`.
    fn compile(&self, expression: &str) -> Result<(Regex, Vec<CompiledParameter>)> {
        let mut pattern = String::from("^");
        let mut parameters = Vec::new();
        let mut next_group = 1;
        let mut rest = expression;

        while let Some(pos) = rest.find(['{', '(']) {
            pattern.push_str(&regex::escape(&rest[..pos]));
            let open = &rest[pos..];
            let close = if open.starts_with('{') { '}' } else { ')' };
            let end = open
                .find(close)
                .with_context(|| format!("unclosed {:?}", &open[..1]))?;
            let inner = &open[1..end];
            if close == ')' {
                pattern.push_str(&format!("(?:{})?", regex::escape(inner)));
            } else {
                let Some(parameter_type) = self.parameter(inner) else {
                    bail!("undefined parameter type {inner:?}");
                };
                let mut alternatives = Vec::new();
                let outer = next_group;
                next_group += 1;
                let first_inner = next_group;
                for regexp in &parameter_type.regexps {
                    let groups = Regex::new(regexp)
                        .with_context(|| format!("parameter type {inner:?}"))?
                        .captures_len()
                        - 1;
                    next_group += groups;
                    alternatives.push(format!("(?:{regexp})"));
                }
                pattern.push_str(&format!("({})", alternatives.join("|")));
                parameters.push(CompiledParameter {
                    type_name: parameter_type.name.clone(),
                    outer,
                    inner: first_inner..next_group,
                });
            }
            rest = &open[end + 1..];
        }
        pattern.push_str(&regex::escape(rest));
        pattern.push('$');
        Ok((Regex::new(&pattern)?, parameters))
    }

    fn envelopes(&self) -> Vec<Envelope> {
        let parameter_types = self.parameter_types[..self.custom_parameter_types]
            .iter()
            .enumerate()
            .map(|(i, p)| {
                Envelope::from(ParameterType {
                    id: format!("paramtype-{}", i + 1),
                    name: p.name.clone(),
                    regular_expressions: p.regexps.clone(),
                    prefer_for_regular_expression_match: false,
                    use_for_snippets: true,
                })
            });
        let steps = self.step_definitions.iter().map(|d| {
            Envelope::from(StepDefinition {
                id: d.id.clone(),
                pattern: StepDefinitionPattern {
                    source: d.expression.clone(),
                    pattern_type: StepDefinitionPatternType::CucumberExpression,
                },
            })
        });
        let hooks = self.hooks.iter().map(|h| {
            Envelope::from(Hook {
                id: h.id.clone(),
                name: None,
                tag_expression: h.tag_expression.clone(),
            })
        });
        parameter_types.chain(steps).chain(hooks).collect()
    }
}

/// Substitute `<name>` placeholders from an examples row.
fn substitute(text: &str, header: &TableRow, row: &TableRow) -> String {
    header
        .values()
        .zip(row.values())
        .fold(text.to_string(), |acc, (name, value)| {
            acc.replace(&format!("<{name}>"), value)
        })
}

/// Deterministic ids and a clock that ticks one millisecond per message.
#[derive(Debug, Default)]
struct Clock {
    ids: usize,
    millis: i64,
}

impl Clock {
    fn id(&mut self, kind: &str) -> String {
        self.ids += 1;
        format!("{kind}-{}", self.ids)
    }

    fn tick(&mut self) -> Timestamp {
        self.millis += 1;
        Timestamp {
            seconds: 1_700_000_000 + self.millis / 1000,
            nanos: ((self.millis % 1000) * 1_000_000) as u32,
        }
    }
}

/// Runs documents against glue and records the message stream.
#[derive(Debug)]
pub struct FakeRunner {
    glue: Glue,
    clock: Clock,
}

impl FakeRunner {
    pub fn new(glue: Glue) -> Self {
        Self {
            glue,
            clock: Clock::default(),
        }
    }

    /// Runner over [`Glue::standard`].
    pub fn standard() -> Result<Self> {
        Ok(Self::new(Glue::standard()?))
    }

    pub fn run(&mut self, documents: &[GherkinDocument]) -> Vec<Envelope> {
        let mut out: Vec<Envelope> = vec![Envelope {
            meta: Some(serde_json::json!({
                "protocolVersion": "24.0.0",
                "implementation": { "name": "pickleview-fake-runner" }
            })),
            ..Envelope::default()
        }];

        let mut pickles = Vec::new();
        for document in documents {
            out.push(document.clone().into());
            let compiled = self.compile_pickles(document);
            out.extend(compiled.iter().cloned().map(Envelope::from));
            pickles.extend(compiled);
        }

        out.extend(self.glue.envelopes());
        out.push(
            TestRunStarted {
                timestamp: self.clock.tick(),
            }
            .into(),
        );

        let test_cases: Vec<TestCase> = pickles.iter().map(|p| self.test_case(p)).collect();
        out.extend(test_cases.iter().cloned().map(Envelope::from));

        let mut success = true;
        for (pickle, test_case) in pickles.iter().zip(&test_cases) {
            success &= self.execute(pickle, test_case, &mut out);
        }

        out.push(
            TestRunFinished {
                timestamp: self.clock.tick(),
                success,
                message: None,
            }
            .into(),
        );
        out
    }

    fn compile_pickles(&mut self, document: &GherkinDocument) -> Vec<Pickle> {
        let Some(feature) = &document.feature else {
            return Vec::new();
        };
        let uri = document.uri.clone().unwrap_or_default();
        let mut out = Vec::new();
        let mut feature_background: Vec<Step> = Vec::new();

        for child in &feature.children {
            if let Some(background) = &child.background {
                feature_background.extend(background.steps.iter().cloned());
            }
            if let Some(scenario) = &child.scenario {
                out.extend(self.scenario_pickles(&uri, feature, &[], &feature_background, scenario));
            }
            if let Some(rule) = &child.rule {
                let mut background = feature_background.clone();
                for rule_child in &rule.children {
                    if let Some(b) = &rule_child.background {
                        background.extend(b.steps.iter().cloned());
                    }
                    if let Some(scenario) = &rule_child.scenario {
                        out.extend(self.scenario_pickles(&uri, feature, &rule.tags, &background, scenario));
                    }
                }
            }
        }
        out
    }

    fn scenario_pickles(
        &mut self,
        uri: &str,
        feature: &Feature,
        rule_tags: &[Tag],
        background: &[Step],
        scenario: &Scenario,
    ) -> Vec<Pickle> {
        let inherited: Vec<&Tag> = feature
            .tags
            .iter()
            .chain(rule_tags)
            .chain(&scenario.tags)
            .collect();

        if !scenario.has_examples() {
            let tags = inherited.iter().copied().collect::<Vec<_>>();
            let steps = background
                .iter()
                .map(|s| (s, s.text.clone(), vec![s.id.clone()]))
                .chain(
                    scenario
                        .steps
                        .iter()
                        .map(|s| (s, s.text.clone(), vec![s.id.clone()])),
                )
                .collect::<Vec<_>>();
            return vec![self.pickle(uri, &scenario.name, &feature.language, &tags, steps, vec![scenario.id.clone()], None)];
        }

        let mut out = Vec::new();
        for examples in &scenario.examples {
            let Some(header) = &examples.table_header else {
                continue;
            };
            for row in &examples.table_body {
                let Some(row_id) = row.id.clone() else {
                    continue;
                };
                let tags: Vec<&Tag> = inherited.iter().copied().chain(&examples.tags).collect();
                let steps = background
                    .iter()
                    .map(|s| (s, s.text.clone(), vec![s.id.clone()]))
                    .chain(scenario.steps.iter().map(|s| {
                        (
                            s,
                            substitute(&s.text, header, row),
                            vec![s.id.clone(), row_id.clone()],
                        )
                    }))
                    .collect::<Vec<_>>();
                let name = substitute(&scenario.name, header, row);
                out.push(self.pickle(
                    uri,
                    &name,
                    &feature.language,
                    &tags,
                    steps,
                    vec![scenario.id.clone(), row_id.clone()],
                    Some((header, row)),
                ));
            }
        }
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn pickle(
        &mut self,
        uri: &str,
        name: &str,
        language: &str,
        tags: &[&Tag],
        steps: Vec<(&Step, String, Vec<AstNodeId>)>,
        ast_node_ids: Vec<AstNodeId>,
        row: Option<(&TableRow, &TableRow)>,
    ) -> Pickle {
        let substitute_row = |text: &str| match row {
            Some((header, row)) => substitute(text, header, row),
            None => text.to_string(),
        };
        let steps = steps
            .into_iter()
            .map(|(step, text, ast_node_ids)| {
                let data_table = step.data_table.as_ref().map(|t| DataTable {
                    rows: t
                        .rows
                        .iter()
                        .map(|r| TableRow {
                            id: None,
                            cells: r
                                .cells
                                .iter()
                                .map(|c| TableCell {
                                    value: substitute_row(&c.value),
                                })
                                .collect(),
                        })
                        .collect(),
                });
                let doc_string = step.doc_string.as_ref().map(|d| DocString {
                    content: substitute_row(&d.content),
                    delimiter: None,
                    ..d.clone()
                });
                let argument = (data_table.is_some() || doc_string.is_some()).then(|| {
                    PickleStepArgument {
                        doc_string,
                        data_table,
                    }
                });
                PickleStep {
                    id: PickleStepId::new(self.clock.id("picklestep")),
                    text,
                    argument,
                    ast_node_ids,
                }
            })
            .collect();
        Pickle {
            id: PickleId::new(self.clock.id("pickle")),
            uri: uri.to_string(),
            name: name.to_string(),
            language: language.to_string(),
            steps,
            tags: tags
                .iter()
                .map(|t| PickleTag {
                    name: t.name.clone(),
                    ast_node_id: t.id.clone(),
                })
                .collect(),
            ast_node_ids,
        }
    }

    fn test_case(&mut self, pickle: &Pickle) -> TestCase {
        let mut test_steps = Vec::new();
        let hook_step = |clock: &mut Clock, hook: &HookDef| TestStep {
            id: TestStepId::new(clock.id("teststep")),
            hook_id: Some(hook.id.clone()),
            ..TestStep::default()
        };
        for hook in self.glue.hooks.iter().filter(|h| h.when == HookWhen::Before) {
            if hook.applies_to(pickle) {
                test_steps.push(hook_step(&mut self.clock, hook));
            }
        }
        for step in &pickle.steps {
            let matches: Vec<(&StepDef, StepMatchArgumentsList)> = self
                .glue
                .step_definitions
                .iter()
                .filter_map(|d| d.match_arguments(&step.text).map(|m| (d, m)))
                .collect();
            test_steps.push(TestStep {
                id: TestStepId::new(self.clock.id("teststep")),
                pickle_step_id: Some(step.id.clone()),
                step_definition_ids: Some(matches.iter().map(|(d, _)| d.id.clone()).collect()),
                step_match_arguments_lists: Some(matches.into_iter().map(|(_, m)| m).collect()),
                ..TestStep::default()
            });
        }
        for hook in self.glue.hooks.iter().filter(|h| h.when == HookWhen::After) {
            if hook.applies_to(pickle) {
                test_steps.push(hook_step(&mut self.clock, hook));
            }
        }
        TestCase {
            id: TestCaseId::new(self.clock.id("testcase")),
            pickle_id: pickle.id.clone(),
            test_steps,
        }
    }

    /// Run one test case. Returns `false` when any step had a problem.
    fn execute(&mut self, pickle: &Pickle, test_case: &TestCase, out: &mut Vec<Envelope>) -> bool {
        let started_id = TestCaseStartedId::new(self.clock.id("testcasestarted"));
        out.push(
            TestCaseStarted {
                id: started_id.clone(),
                test_case_id: test_case.id.clone(),
                attempt: 0,
                timestamp: self.clock.tick(),
            }
            .into(),
        );

        let mut blocked = false;
        let mut ok = true;
        for test_step in &test_case.test_steps {
            out.push(
                TestStepStarted {
                    test_case_started_id: started_id.clone(),
                    test_step_id: test_step.id.clone(),
                    timestamp: self.clock.tick(),
                }
                .into(),
            );
            let mut world = World::default();
            let (status, message) = self.step_result(pickle, test_step, blocked, &mut world);
            for mut attachment in world.attachments {
                attachment.test_case_started_id = Some(started_id.clone());
                attachment.test_step_id = Some(test_step.id.clone());
                out.push(attachment.into());
            }
            if status.is_problem() {
                ok = false;
            }
            if status != TestStepResultStatus::Passed {
                blocked = true;
            }
            let duration = if status == TestStepResultStatus::Skipped {
                Duration::ZERO
            } else {
                Duration {
                    seconds: 0,
                    nanos: 1_000_000,
                }
            };
            out.push(
                TestStepFinished {
                    test_case_started_id: started_id.clone(),
                    test_step_id: test_step.id.clone(),
                    test_step_result: TestStepResult {
                        status,
                        message,
                        duration,
                    },
                    timestamp: self.clock.tick(),
                }
                .into(),
            );
        }

        out.push(
            TestCaseFinished {
                test_case_started_id: started_id,
                timestamp: self.clock.tick(),
                will_be_retried: false,
            }
            .into(),
        );
        ok
    }

    fn step_result(
        &self,
        pickle: &Pickle,
        test_step: &TestStep,
        blocked: bool,
        world: &mut World,
    ) -> (TestStepResultStatus, Option<String>) {
        if let Some(hook_id) = &test_step.hook_id {
            let Some(hook) = self.glue.hooks.iter().find(|h| &h.id == hook_id) else {
                return (TestStepResultStatus::Unknown, None);
            };
            // after hooks run even when a step failed
            if blocked && hook.when == HookWhen::Before {
                return (TestStepResultStatus::Skipped, None);
            }
            return outcome_status((hook.body)(world));
        }

        let definitions = test_step.step_definition_ids.as_deref().unwrap_or(&[]);
        let text = test_step
            .pickle_step_id
            .as_ref()
            .and_then(|id| pickle.steps.iter().find(|s| &s.id == id))
            .map(|s| s.text.as_str())
            .unwrap_or("");
        match definitions {
            [] => (TestStepResultStatus::Undefined, None),
            [_, _, ..] => (
                TestStepResultStatus::Ambiguous,
                Some(format!(
                    "Multiple step definitions match {text:?}:\n{}",
                    definitions
                        .iter()
                        .filter_map(|id| self.glue.step_definitions.iter().find(|d| &d.id == id))
                        .map(|d| format!("  {}", d.expression))
                        .collect::<Vec<_>>()
                        .join("\n")
                )),
            ),
            [_] if blocked => (TestStepResultStatus::Skipped, None),
            [id] => match self.glue.step_definitions.iter().find(|d| &d.id == id) {
                Some(definition) => {
                    let arguments = definition.arguments(text);
                    outcome_status((definition.body)(world, &arguments))
                }
                None => (TestStepResultStatus::Undefined, None),
            },
        }
    }
}

fn outcome_status(outcome: Outcome) -> (TestStepResultStatus, Option<String>) {
    match outcome {
        Outcome::Passed => (TestStepResultStatus::Passed, None),
        Outcome::Failed(message) => (TestStepResultStatus::Failed, Some(message)),
        Outcome::Pending => (TestStepResultStatus::Pending, None),
        Outcome::Skipped => (TestStepResultStatus::Skipped, None),
    }
}

/// Serialize envelopes as NDJSON, one per line.
pub fn to_ndjson(envelopes: &[Envelope]) -> Result<String> {
    let mut out = String::new();
    for envelope in envelopes {
        out.push_str(&serde_json::to_string(envelope)?);
        out.push('\n');
    }
    Ok(out)
}

/// Write `envelopes` as NDJSON into a fresh temp dir. Keep the returned dir
/// alive for as long as the file is needed.
pub fn write_ndjson(envelopes: &[Envelope]) -> Result<(tempfile::TempDir, std::path::PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("messages.ndjson");
    std::fs::write(&path, to_ndjson(envelopes)?)?;
    Ok((dir, path))
}
