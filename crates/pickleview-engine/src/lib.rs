//! Orchestration engine for pickleview.
//!
//! Reads a message stream from a [`MessageSource`], indexes it into a
//! [`Query`] and hands both query sides to a [`ReportRenderer`]. This is the
//! coordination layer between the CLI and the adapter crates.

use anyhow::{Context, Result};
use pickleview_config::{OutputFormat, ReportConfig};
use pickleview_ports::{CucumberQuery, MessageSource, ReportRenderer};
use pickleview_query::Query;
use pickleview_render_json::JsonRenderer;
use pickleview_render_md::MarkdownRenderer;
use pickleview_schema::TestStepResultStatus;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct Engine<'a> {
    pub renderer: &'a dyn ReportRenderer,
}

pub struct RunOutputs {
    /// The rendered report, also written to `out_path` when one was given.
    pub report: String,
    pub out_path: Option<PathBuf>,
    pub summary: RunSummary,
}

/// Scenario counts of one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub counts: BTreeMap<TestStepResultStatus, usize>,
    /// What the runner itself reported, if the stream got that far.
    pub success: Option<bool>,
}

impl RunSummary {
    pub fn from_query(query: &dyn CucumberQuery) -> Self {
        Self {
            counts: query.scenario_status_counts(),
            success: query.test_run_finished().map(|f| f.success),
        }
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Any scenario failed, is pending, undefined or ambiguous.
    pub fn has_problems(&self) -> bool {
        self.counts
            .iter()
            .any(|(status, count)| *count > 0 && status.is_problem())
    }
}

impl std::fmt::Display for RunSummary {
    /// One `status: count` line per status, worst first, then the total.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (status, count) in self.counts.iter().rev() {
            writeln!(f, "{status}: {count}")?;
        }
        write!(f, "total: {}", self.total())
    }
}

/// The renderer `config.format` asks for.
pub fn renderer_for(config: &ReportConfig) -> Box<dyn ReportRenderer> {
    match config.format {
        OutputFormat::Markdown => Box::new(MarkdownRenderer::new(config.clone())),
        OutputFormat::Json => Box::new(JsonRenderer::new(config.title.clone())),
    }
}

/// Read and index a whole stream.
pub fn index(source: &dyn MessageSource) -> Result<Query> {
    let envelopes = source.read_envelopes().context("read message stream")?;
    debug!(envelopes = envelopes.len(), "read message stream");
    Ok(Query::from_envelopes(&envelopes))
}

impl<'a> Engine<'a> {
    pub fn new(renderer: &'a dyn ReportRenderer) -> Self {
        Self { renderer }
    }

    /// Run the pipeline: read → index → render, then write to `out` if given.
    pub fn run(&self, source: &dyn MessageSource, out: Option<&Path>) -> Result<RunOutputs> {
        let query = index(source)?;
        let report = self.renderer.render_report(&query, &query)?;

        if let Some(path) = out {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir).with_context(|| format!("create {dir:?}"))?;
            }
            std::fs::write(path, &report).with_context(|| format!("write report {path:?}"))?;
            info!(path = %path.display(), bytes = report.len(), "wrote report");
        }

        Ok(RunOutputs {
            report,
            out_path: out.map(Path::to_path_buf),
            summary: RunSummary::from_query(&query),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pickleview_schema::Envelope;

    struct Canned(Vec<Envelope>);

    impl MessageSource for Canned {
        fn read_envelopes(&self) -> Result<Vec<Envelope>> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl MessageSource for Failing {
        fn read_envelopes(&self) -> Result<Vec<Envelope>> {
            anyhow::bail!("disk on fire")
        }
    }

    #[test]
    fn run_writes_report_into_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reports").join("report.md");
        let renderer = MarkdownRenderer::default();

        let outputs = Engine::new(&renderer)
            .run(&Canned(pickleview_testkit::full_run()), Some(&out))
            .unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), outputs.report);
        assert_eq!(outputs.out_path.as_deref(), Some(out.as_path()));
        assert_eq!(outputs.summary.total(), 11);
        assert_eq!(outputs.summary.success, Some(false));
        assert!(outputs.summary.has_problems());
    }

    #[test]
    fn run_without_out_path_only_returns_the_report() {
        let renderer = MarkdownRenderer::default();
        let source = Canned(pickleview_testkit::run(&[pickleview_testkit::minimal()]));
        let outputs = Engine::new(&renderer).run(&source, None).unwrap();
        assert!(outputs.report.contains("# Test report"));
        assert!(outputs.out_path.is_none());
        assert!(!outputs.summary.has_problems());
    }

    #[test]
    fn source_errors_are_wrapped() {
        let renderer = MarkdownRenderer::default();
        let err = Engine::new(&renderer).run(&Failing, None).err().unwrap();
        assert_eq!(err.to_string(), "read message stream");
        assert_eq!(err.root_cause().to_string(), "disk on fire");
    }

    #[test]
    fn renderer_follows_configured_format() {
        let query_source = Canned(pickleview_testkit::run(&[pickleview_testkit::minimal()]));
        let config = ReportConfig {
            format: OutputFormat::Json,
            title: "Nightly".into(),
            ..ReportConfig::default()
        };
        let renderer = renderer_for(&config);
        let outputs = Engine::new(renderer.as_ref()).run(&query_source, None).unwrap();
        assert!(outputs.report.trim_start().starts_with('{'));
        assert!(outputs.report.contains("\"title\": \"Nightly\""));
    }

    #[test]
    fn summary_lists_worst_status_first() {
        let summary = RunSummary {
            counts: BTreeMap::from([
                (TestStepResultStatus::Passed, 2),
                (TestStepResultStatus::Failed, 1),
            ]),
            success: Some(false),
        };
        assert_eq!(summary.to_string(), "failed: 1\npassed: 2\ntotal: 3");
    }

    #[test]
    fn zero_counts_are_not_problems() {
        let summary = RunSummary {
            counts: BTreeMap::from([
                (TestStepResultStatus::Passed, 2),
                (TestStepResultStatus::Failed, 0),
            ]),
            success: None,
        };
        assert!(!summary.has_problems());
    }
}
