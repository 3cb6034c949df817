//! Markdown test report renderer for pickleview.
//!
//! Walks the Gherkin documents of a run and draws each feature, rule,
//! background, scenario and step with its status. How each piece looks is
//! up to the [`Components`] registry; [`MarkdownRenderer`] only decides the
//! layout.

pub mod components;
pub mod defaults;
mod text;

use anyhow::Result;
use chrono::TimeDelta;
use pickleview_config::ReportConfig;
use pickleview_ids::{AnchorId, PickleId};
use pickleview_ports::{CucumberQuery, GherkinQuery, HookPosition, ReportRenderer};
use pickleview_query::StepResolver;
use pickleview_sanitize::{SanitizerSchema, escape_markdown_inline};
use pickleview_schema::gherkin::{Background, Examples, GherkinDocument, Rule, Scenario, Step};
use pickleview_schema::{TestStepResultStatus, worst_test_step_result};
use tracing::debug;

pub use components::{
    Components, ComponentsBuilder, ExamplesProps, GherkinStepProps, RenderContext, Renderer,
};

/// Renders a whole run as one Markdown document.
pub struct MarkdownRenderer {
    config: ReportConfig,
    schema: SanitizerSchema,
    components: Components,
}

impl MarkdownRenderer {
    pub fn new(config: ReportConfig) -> Self {
        let schema = config.sanitizer_schema();
        Self {
            config,
            schema,
            components: Components::default(),
        }
    }

    pub fn with_components(mut self, components: Components) -> Self {
        self.components = components;
        self
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(ReportConfig::default())
    }
}

impl ReportRenderer for MarkdownRenderer {
    fn render_report(
        &self,
        gherkin: &dyn GherkinQuery,
        cucumber: &dyn CucumberQuery,
    ) -> Result<String> {
        let layout = Layout {
            gherkin,
            cucumber,
            resolver: StepResolver::new(gherkin, cucumber),
            cx: RenderContext::new(&self.components, &self.config, &self.schema),
        };
        let mut out = String::new();

        out.push_str(&format!("# {}\n\n", escape_markdown_inline(&self.config.title)));
        layout.run_info(&mut out);
        layout.summary(&mut out);
        layout.contents(&mut out);
        for document in gherkin.documents() {
            layout.document(document, &mut out);
        }

        debug!(
            documents = gherkin.documents().len(),
            bytes = out.len(),
            "rendered markdown report"
        );
        Ok(out)
    }
}

struct Layout<'r> {
    gherkin: &'r dyn GherkinQuery,
    cucumber: &'r dyn CucumberQuery,
    resolver: StepResolver<'r>,
    cx: RenderContext<'r>,
}

impl<'r> Layout<'r> {
    fn run_info(&self, out: &mut String) {
        let started = self
            .cucumber
            .test_run_started()
            .and_then(|s| s.timestamp.to_datetime());
        let finished = self.cucumber.test_run_finished();
        if started.is_none() && finished.is_none() {
            return;
        }

        if let Some(started) = started {
            out.push_str(&format!(
                "- **Started:** {}\n",
                started.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
        if let Some(finished) = finished {
            if let (Some(start), Some(end)) = (started, finished.timestamp.to_datetime()) {
                out.push_str(&format!("- **Duration:** {}\n", format_elapsed(end - start)));
            }
            let result = if finished.success { "passed" } else { "failed" };
            out.push_str(&format!("- **Result:** {result}\n"));
            if let Some(message) = finished.message.as_deref() {
                out.push_str(&format!("- **Message:** {}\n", escape_markdown_inline(message)));
            }
        }
        out.push('\n');
    }

    fn summary(&self, out: &mut String) {
        out.push_str("## Summary\n\n");
        let counts = self.cucumber.scenario_status_counts();
        if counts.is_empty() {
            out.push_str("No scenarios ran.\n\n");
            return;
        }
        out.push_str("| Status | Scenarios |\n| --- | ---: |\n");
        // worst first
        for (status, count) in counts.iter().rev() {
            let icon = self.icon(*status);
            out.push_str(&format!("| {icon} {status} | {count} |\n"));
        }
        let total: usize = counts.values().sum();
        out.push_str(&format!("| **Total** | {total} |\n\n"));
    }

    fn contents(&self, out: &mut String) {
        let features: Vec<_> = self
            .gherkin
            .documents()
            .iter()
            .filter_map(|d| d.feature.as_ref().map(|f| (uri(d), f)))
            .collect();
        if features.is_empty() {
            return;
        }
        out.push_str("## Features\n\n");
        for (uri, feature) in features {
            let status = self.worst_status(&self.feature_pickles(feature.scenarios()));
            out.push_str(&format!(
                "- {} [{}](#{})\n",
                self.icon(status),
                escape_markdown_inline(display_name(&feature.name, uri)),
                anchor(uri, "feature")
            ));
        }
        out.push('\n');
    }

    fn document(&self, document: &'r GherkinDocument, out: &mut String) {
        let uri = uri(document);
        let Some(feature) = &document.feature else {
            debug!(uri, "document has no feature");
            return;
        };
        let status = self.worst_status(&self.feature_pickles(feature.scenarios()));
        heading(
            out,
            2,
            &feature.keyword,
            display_name(&feature.name, uri),
            Some(&self.icon(status)),
            &anchor(uri, "feature"),
        );
        if !uri.is_empty() {
            out.push_str(&format!("_{}_\n\n", escape_markdown_inline(uri)));
        }
        self.cx.components.tags().render(&feature.tags, &self.cx, out);
        self.cx
            .components
            .description()
            .render(&feature.description, &self.cx, out);

        for child in &feature.children {
            if let Some(background) = &child.background {
                self.background(uri, background, 3, out);
            }
            if let Some(scenario) = &child.scenario {
                self.scenario(uri, scenario, 3, out);
            }
            if let Some(rule) = &child.rule {
                self.rule(uri, rule, out);
            }
        }
    }

    fn rule(&self, uri: &str, rule: &'r Rule, out: &mut String) {
        let scenarios = rule.children.iter().filter_map(|c| c.scenario.as_ref());
        let status = self.worst_status(&self.feature_pickles(scenarios));
        heading(
            out,
            3,
            &rule.keyword,
            &rule.name,
            Some(&self.icon(status)),
            &anchor(uri, &rule.id),
        );
        self.cx.components.tags().render(&rule.tags, &self.cx, out);
        self.cx
            .components
            .description()
            .render(&rule.description, &self.cx, out);
        for child in &rule.children {
            if let Some(background) = &child.background {
                self.background(uri, background, 4, out);
            }
            if let Some(scenario) = &child.scenario {
                self.scenario(uri, scenario, 4, out);
            }
        }
    }

    fn background(&self, uri: &str, background: &'r Background, level: usize, out: &mut String) {
        heading(
            out,
            level,
            &background.keyword,
            &background.name,
            None,
            &anchor(uri, &background.id),
        );
        self.cx
            .components
            .description()
            .render(&background.description, &self.cx, out);
        self.steps(&background.steps, false, out);
    }

    fn scenario(&self, uri: &str, scenario: &'r Scenario, level: usize, out: &mut String) {
        let pickle_ids = self.gherkin.pickle_ids(&scenario.id);
        let status = self.worst_status(pickle_ids);
        heading(
            out,
            level,
            &scenario.keyword,
            &scenario.name,
            Some(&self.icon(status)),
            &anchor(uri, &scenario.id),
        );
        self.cx.components.tags().render(&scenario.tags, &self.cx, out);
        self.cx
            .components
            .description()
            .render(&scenario.description, &self.cx, out);

        let has_examples = scenario.has_examples();
        // An outline's pickles each ran their own hooks; only a plain
        // scenario has one set to show.
        let hooks = match pickle_ids {
            [only] if !has_examples => self.cucumber.hook_executions(only),
            _ => Vec::new(),
        };
        for hook in hooks.iter().filter(|h| h.position == HookPosition::Before) {
            self.cx.components.hook().render(hook, &self.cx, out);
        }
        self.steps(&scenario.steps, has_examples, out);
        let mut after = String::new();
        for hook in hooks.iter().filter(|h| h.position == HookPosition::After) {
            self.cx.components.hook().render(hook, &self.cx, &mut after);
        }
        if !after.is_empty() {
            out.push_str(&after);
            out.push('\n');
        }

        for examples in &scenario.examples {
            self.examples(examples, level + 1, out);
        }
    }

    fn steps(&self, steps: &'r [Step], has_examples: bool, out: &mut String) {
        if steps.is_empty() {
            return;
        }
        for step in steps {
            let props = GherkinStepProps {
                step: self.resolver.resolve(step, None, has_examples),
                status: self.resolver.step_status(step, None),
            };
            self.cx.components.gherkin_step().render(&props, &self.cx, out);
        }
        out.push('\n');
    }

    fn examples(&self, examples: &'r Examples, level: usize, out: &mut String) {
        let row_statuses = examples
            .table_body
            .iter()
            .map(|row| match &row.id {
                Some(id) => self.worst_status(self.gherkin.pickle_ids(id)),
                None => TestStepResultStatus::Unknown,
            })
            .collect();
        let props = ExamplesProps {
            examples,
            row_statuses,
            level,
        };
        self.cx.components.examples().render(&props, &self.cx, out);
    }

    fn feature_pickles(&self, scenarios: impl Iterator<Item = &'r Scenario>) -> Vec<PickleId> {
        scenarios
            .flat_map(|s| self.gherkin.pickle_ids(&s.id).iter().cloned())
            .collect()
    }

    fn worst_status(&self, pickle_ids: &[PickleId]) -> TestStepResultStatus {
        if pickle_ids.is_empty() {
            return TestStepResultStatus::Unknown;
        }
        let results = self.cucumber.pickle_test_step_results(pickle_ids);
        worst_test_step_result(&results).status
    }

    fn icon(&self, status: TestStepResultStatus) -> String {
        self.cx
            .render_to_string(self.cx.components.status_icon(), &status)
    }
}

fn uri(document: &GherkinDocument) -> &str {
    document.uri.as_deref().unwrap_or_default()
}

fn display_name<'a>(name: &'a str, uri: &'a str) -> &'a str {
    if name.is_empty() { uri } else { name }
}

fn anchor(uri: &str, node: &str) -> AnchorId {
    AnchorId::from_parts([uri, node])
}

fn heading(
    out: &mut String,
    level: usize,
    keyword: &str,
    name: &str,
    icon: Option<&str>,
    anchor: &AnchorId,
) {
    out.push_str(&format!("<a id=\"{anchor}\"></a>\n\n"));
    out.push_str(&"#".repeat(level.clamp(1, 6)));
    out.push(' ');
    out.push_str(&escape_markdown_inline(keyword.trim()));
    if !name.is_empty() {
        out.push_str(": ");
        out.push_str(&escape_markdown_inline(name));
    }
    if let Some(icon) = icon {
        out.push(' ');
        out.push_str(icon);
    }
    out.push_str("\n\n");
}

fn format_elapsed(elapsed: TimeDelta) -> String {
    let millis = elapsed.num_milliseconds();
    if millis < 1000 {
        format!("{millis} ms")
    } else {
        format!("{:.1} s", millis as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pickleview_config::IconStyle;
    use pickleview_query::Query;

    fn render(config: ReportConfig, envelopes: &[pickleview_schema::Envelope]) -> String {
        let query = Query::from_envelopes(envelopes);
        MarkdownRenderer::new(config)
            .render_report(&query, &query)
            .unwrap()
    }

    fn full_report() -> String {
        render(ReportConfig::default(), &pickleview_testkit::full_run())
    }

    #[test]
    fn report_has_title_summary_and_run_info() {
        let md = full_report();
        assert!(md.starts_with("# Test report\n\n"));
        assert!(md.contains("- **Result:** failed"));
        assert!(md.contains("## Summary"));
        assert!(md.contains("| ❌ failed |"));
        assert!(md.contains("| ✅ passed |"));
        assert!(md.contains("## Features"));
    }

    #[test]
    fn defined_step_shows_parameters() {
        let md = full_report();
        assert!(md.contains(
            "- ✅ **Given** I have <strong title=\"int\">42</strong> cucumbers in my <strong title=\"word\">belly</strong>\n"
        ));
    }

    #[test]
    fn outline_step_stays_templated_and_rows_carry_status() {
        let md = full_report();
        assert!(md.contains("**Given** \\<flight\\> has been delayed \\<delay\\> minutes\n"));
        assert!(md.contains("| | flight | delay |"));
        assert!(md.contains("| ✅ | LHR-CDG | 45 |"));
        assert!(md.contains("| ❌ | JFK-CDG | 10 |"));
        assert!(md.contains("| ❓ | lhr-cdg | 45 |"));
        // errors belong to rows, not to the template
        let outline = md.split("Scenario Outline").nth(1).unwrap();
        let outline = outline.split("#### Examples").next().unwrap();
        assert!(!outline.contains("```"));
    }

    #[test]
    fn failing_step_shows_its_error() {
        let md = full_report();
        assert!(md.contains("  ```\n  Oh no we have an error\n  ```\n"));
        assert!(md.contains("- ⏹️ **Then** a passed step"));
    }

    #[test]
    fn hooks_show_failures_logs_and_screenshots() {
        let md = full_report();
        assert!(md.contains("- ❌ **Before** hook @hooked\n"));
        assert!(md.contains("  > rainbow\n"));
        assert!(md.contains("- ✅ **After** hook @passedHooked\n"));
        assert!(md.contains("![screenshot.png](data:image/png;base64,"));
    }

    #[test]
    fn description_html_is_sanitized() {
        let md = full_report();
        assert!(md.contains("<p>Described with <strong>HTML</strong></p>"));
        assert!(!md.contains("<script>"));
        assert!(!md.contains("alert(1)"));
    }

    #[test]
    fn rules_backgrounds_and_step_arguments() {
        let md = full_report();
        assert!(md.contains("### Rule: Arguments are shown"));
        assert!(md.contains("#### Background"));
        assert!(md.contains("`@rules`"));
        assert!(md.contains("  | pipe | a\\|b |\n"));
        assert!(md.contains("  ```json\n  {\"attached\": true}\n  ```\n"));
    }

    #[test]
    fn ascii_icons_replace_emoji() {
        let config = ReportConfig {
            icons: IconStyle::Ascii,
            ..Default::default()
        };
        let md = render(config, &pickleview_testkit::full_run());
        assert!(md.contains("(x)"));
        assert!(!md.contains("✅"));
    }

    #[test]
    fn attachments_can_be_left_out() {
        let config = ReportConfig {
            include_attachments: false,
            ..Default::default()
        };
        let md = render(config, &pickleview_testkit::full_run());
        assert!(!md.contains("data:image/png"));
        assert!(!md.contains("> rainbow"));
    }

    #[test]
    fn anchors_are_stable() {
        assert_eq!(full_report(), full_report());
        let md = full_report();
        let anchor = anchor("features/minimal.feature", "feature");
        assert!(md.contains(&format!("<a id=\"{anchor}\"></a>")));
        assert!(md.contains(&format!("(#{anchor})")));
    }

    struct Letters;

    impl Renderer<TestStepResultStatus> for Letters {
        fn render(&self, status: &TestStepResultStatus, _cx: &RenderContext<'_>, out: &mut String) {
            out.push_str(&format!("[{}]", &status.as_str()[..1].to_uppercase()));
        }
    }

    #[test]
    fn overridden_component_applies_everywhere() {
        let components = Components::builder().status_icon(Letters).build();
        let query = Query::from_envelopes(&pickleview_testkit::full_run());
        let md = MarkdownRenderer::default()
            .with_components(components)
            .render_report(&query, &query)
            .unwrap();
        assert!(md.contains("| [F] failed |"));
        assert!(md.contains("- [P] **Given** I have"));
        assert!(md.contains("| [P] | LHR-CDG | 45 |"));
        assert!(!md.contains("✅"));
    }

    #[test]
    fn empty_stream_renders_a_stub() {
        let md = render(ReportConfig::default(), &[]);
        insta::assert_snapshot!(md, @r"
        # Test report

        ## Summary

        No scenarios ran.
        ");
    }
}
