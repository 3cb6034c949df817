//! BDD-style testing helpers for pickleview.
//!
//! Given/When/Then scenarios for report workflows: build documents, run them
//! through the fake runner, render, then check the output.

use pickleview_schema::Envelope;
use pickleview_schema::gherkin::GherkinDocument;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A BDD scenario context that carries state through Given/When/Then steps.
#[derive(Debug, Default)]
pub struct ScenarioContext {
    /// Documents to feed the fake runner
    pub documents: Vec<GherkinDocument>,
    /// The message stream under test
    pub envelopes: Vec<Envelope>,
    /// Rendered output by name ("markdown", "json", ...)
    pub outputs: HashMap<String, String>,
    /// String values (titles, texts, etc.)
    pub strings: HashMap<String, String>,
    /// Numeric values (counts, exit codes, etc.)
    pub numbers: HashMap<String, u64>,
    /// Boolean flags
    pub flags: HashMap<String, bool>,
    /// Paths to files/directories
    pub paths: HashMap<String, PathBuf>,
}

impl ScenarioContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, document: GherkinDocument) -> Self {
        self.documents.push(document);
        self
    }

    pub fn with_string(mut self, key: &str, value: &str) -> Self {
        self.strings.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_flag(mut self, key: &str, value: bool) -> Self {
        self.flags.insert(key.to_string(), value);
        self
    }

    pub fn with_path(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.paths
            .insert(key.to_string(), value.as_ref().to_path_buf());
        self
    }

    pub fn output(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).map(|s| s.as_str())
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(|s| s.as_str())
    }

    pub fn number(&self, key: &str) -> Option<u64> {
        self.numbers.get(key).copied()
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        self.flags.get(key).copied()
    }

    pub fn path(&self, key: &str) -> Option<&Path> {
        self.paths.get(key).map(|p| p.as_path())
    }
}

/// Step definition types for BDD scenarios
pub type GivenStep = fn(&mut ScenarioContext);
pub type WhenStep = fn(&mut ScenarioContext) -> Result<(), String>;
pub type ThenStep = fn(&ScenarioContext) -> Result<(), String>;

/// A BDD scenario with named steps
pub struct Scenario {
    pub name: String,
    pub given_steps: Vec<(&'static str, GivenStep)>,
    pub when_steps: Vec<(&'static str, WhenStep)>,
    pub then_steps: Vec<(&'static str, ThenStep)>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            given_steps: Vec::new(),
            when_steps: Vec::new(),
            then_steps: Vec::new(),
        }
    }

    pub fn given(mut self, description: &'static str, step: GivenStep) -> Self {
        self.given_steps.push((description, step));
        self
    }

    pub fn when(mut self, description: &'static str, step: WhenStep) -> Self {
        self.when_steps.push((description, step));
        self
    }

    pub fn then(mut self, description: &'static str, step: ThenStep) -> Self {
        self.then_steps.push((description, step));
        self
    }

    pub fn run(&self) -> Result<(), String> {
        let mut ctx = ScenarioContext::new();
        eprintln!("Scenario: {}", self.name);

        for (desc, step) in &self.given_steps {
            eprintln!("  Given: {desc}");
            step(&mut ctx);
        }

        for (desc, step) in &self.when_steps {
            eprintln!("  When: {desc}");
            step(&mut ctx)?;
        }

        for (desc, step) in &self.then_steps {
            eprintln!("  Then: {desc}");
            step(&ctx)?;
        }

        Ok(())
    }
}

/// Assertion helpers for BDD scenarios
pub mod assertions {
    use std::fmt::Debug;

    pub fn assert_present<T: Debug>(option: Option<T>, name: &str) -> Result<T, String> {
        option.ok_or_else(|| format!("Expected {name} to be present, but was None"))
    }

    pub fn assert_eq<T: Debug + PartialEq>(actual: T, expected: T, name: &str) -> Result<(), String> {
        if actual != expected {
            Err(format!("Expected {name} to be {expected:?}, but was {actual:?}"))
        } else {
            Ok(())
        }
    }

    pub fn assert_true(flag: bool, name: &str) -> Result<(), String> {
        if !flag {
            Err(format!("Expected {name} to be true, but was false"))
        } else {
            Ok(())
        }
    }

    pub fn assert_contains(haystack: &str, needle: &str, name: &str) -> Result<(), String> {
        if !haystack.contains(needle) {
            Err(format!(
                "Expected {name} to contain '{needle}', but it did not. Content: {haystack}"
            ))
        } else {
            Ok(())
        }
    }

    pub fn assert_not_contains(haystack: &str, needle: &str, name: &str) -> Result<(), String> {
        if haystack.contains(needle) {
            Err(format!(
                "Expected {name} NOT to contain '{needle}', but it did. Content: {haystack}"
            ))
        } else {
            Ok(())
        }
    }

    /// `needles` appear in `haystack` in this order.
    pub fn assert_in_order(haystack: &str, needles: &[&str], name: &str) -> Result<(), String> {
        let mut from = 0;
        for needle in needles {
            match haystack[from..].find(needle) {
                Some(pos) => from += pos + needle.len(),
                None => {
                    return Err(format!(
                        "Expected {name} to contain '{needle}' after byte {from}. Content: {haystack}"
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::assertions::*;
    use super::*;

    #[test]
    fn scenario_runs_steps_in_order() {
        Scenario::new("context flows through steps")
            .given("a title", |ctx| {
                ctx.strings.insert("title".into(), "Nightly".into());
            })
            .when("it is rendered", |ctx| {
                let title = ctx.string("title").ok_or("no title")?.to_string();
                ctx.outputs.insert("markdown".into(), format!("# {title}\n"));
                Ok(())
            })
            .then("the heading is present", |ctx| {
                let md = assert_present(ctx.output("markdown"), "markdown")?;
                assert_contains(md, "# Nightly", "markdown")
            })
            .run()
            .unwrap();
    }

    #[test]
    fn in_order_detects_swaps() {
        assert!(assert_in_order("a b c", &["a", "c"], "text").is_ok());
        assert!(assert_in_order("a b c", &["c", "a"], "text").is_err());
    }
}
