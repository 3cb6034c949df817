//! Test fixtures for pickleview.
//!
//! Canned Gherkin documents and the message streams the fake runner produces
//! for them. Keeping these in a microcrate avoids copy-paste across query,
//! render and CLI tests.

pub mod bdd;
pub mod builders;
pub mod fake_run;
pub mod proptest;

use builders::{FeatureBuilder, ScenarioBuilder, data_table, doc_string, step};
use fake_run::FakeRunner;
use pickleview_schema::Envelope;
use pickleview_schema::gherkin::GherkinDocument;

pub use fake_run::{to_ndjson, write_ndjson};

/// One passing scenario with two parameters.
pub fn minimal() -> GherkinDocument {
    FeatureBuilder::new("features/minimal.feature", "minimal")
        .description("  Cucumber doesn't execute this markdown, but the report renders it")
        .scenario(
            ScenarioBuilder::new("cukes")
                .step("Given ", "I have 42 cucumbers in my belly"),
        )
        .build()
}

/// An outline whose rows pass, fail and go undefined.
pub fn examples_tables() -> GherkinDocument {
    FeatureBuilder::new("features/examples-tables.feature", "Examples Tables")
        .description("  Sometimes it can be desirable to run the same scenario multiple times\n  with different data each time.")
        .scenario(
            ScenarioBuilder::outline("Flight <flight> delay")
                .step("Given ", "<flight> has been delayed <delay> minutes")
                .step("Then ", "a passed step")
                .examples(
                    "Delays",
                    &["flight", "delay"],
                    &[&["LHR-CDG", "45"], &["JFK-CDG", "10"], &["lhr-cdg", "45"]],
                ),
        )
        .build()
}

/// Tagged scenarios that trigger the failing and the logging hooks.
pub fn hooks() -> GherkinDocument {
    FeatureBuilder::new("features/hooks.feature", "Hooks")
        .scenario(
            ScenarioBuilder::new("Before hook fails")
                .tag("@hooked")
                .step("Given ", "a passed step"),
        )
        .scenario(
            ScenarioBuilder::new("Hooks log and attach")
                .tag("@passedHooked")
                .step("Given ", "a passed step")
                .step("When ", "the step logs 'hello from a step'"),
        )
        .build()
}

/// Unmatched, doubly matched, pending and failing steps.
pub fn problems() -> GherkinDocument {
    FeatureBuilder::new("features/problems.feature", "Problems")
        .scenario(ScenarioBuilder::new("Undefined").step("Given ", "a step nobody wrote"))
        .scenario(ScenarioBuilder::new("Ambiguous").step("Given ", "an ambiguous step"))
        .scenario(ScenarioBuilder::new("Pending").step("Given ", "a pending step"))
        .scenario(
            ScenarioBuilder::new("Failing")
                .step("Given ", "a step has failed")
                .step("Then ", "a passed step"),
        )
        .build()
}

/// A rule with its own background, step arguments and an HTML description.
pub fn rules_and_arguments() -> GherkinDocument {
    FeatureBuilder::new("features/rules.feature", "Rules")
        .tag("@rules")
        .description("<p>Described with <strong>HTML</strong><script>alert(1)</script></p>")
        .background(vec![step("Given ", "a passed step")])
        .rule(
            "Arguments are shown",
            Some(vec![step("And ", "a passed step")]),
            vec![
                ScenarioBuilder::new("Data tables and doc strings")
                    .with_step(step_with_table())
                    .with_step({
                        let mut s = step("Then ", "the step attaches the doc string");
                        s.doc_string = Some(doc_string("{\"attached\": true}", Some("application/json")));
                        s
                    }),
            ],
        )
        .build()
}

fn step_with_table() -> pickleview_schema::gherkin::Step {
    let mut s = step("Given ", "a passed step");
    s.data_table = Some(data_table(&[&["name", "value"], &["pipe", "a|b"]]));
    s
}

/// Every canned document.
pub fn all_documents() -> Vec<GherkinDocument> {
    vec![
        minimal(),
        examples_tables(),
        hooks(),
        problems(),
        rules_and_arguments(),
    ]
}

/// Run `documents` through the standard fixture glue.
pub fn run(documents: &[GherkinDocument]) -> Vec<Envelope> {
    FakeRunner::standard()
        .expect("standard glue compiles")
        .run(documents)
}

/// The message stream for [`all_documents`].
pub fn full_run() -> Vec<Envelope> {
    run(&all_documents())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pickleview_schema::TestStepResultStatus;

    #[test]
    fn canned_documents_have_distinct_ids() {
        let mut ids = std::collections::HashSet::new();
        for doc in all_documents() {
            for scenario in doc.feature.as_ref().unwrap().scenarios() {
                assert!(ids.insert(scenario.id.clone()), "duplicate {}", scenario.id);
            }
        }
    }

    #[test]
    fn full_run_covers_every_status_but_unknown() {
        let statuses: std::collections::BTreeSet<_> = full_run()
            .iter()
            .filter_map(|e| e.test_step_finished.as_ref())
            .map(|f| f.test_step_result.status)
            .collect();
        for status in TestStepResultStatus::ALL {
            if status != TestStepResultStatus::Unknown {
                assert!(statuses.contains(&status), "missing {status}");
            }
        }
    }
}
