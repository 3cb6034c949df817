use thiserror::Error;

/// A message that refers to something the stream never introduced.
///
/// The offending message is dropped; everything indexed so far stays valid.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("testCaseStarted {started} refers to unknown test case {test_case}")]
    UnknownTestCase { started: String, test_case: String },
    #[error("{message} refers to unknown testCaseStarted {started}")]
    UnknownTestCaseStarted {
        message: &'static str,
        started: String,
    },
    #[error("{message} refers to test step {test_step} which is not part of test case {test_case}")]
    UnknownTestStep {
        message: &'static str,
        test_step: String,
        test_case: String,
    },
    #[error("testCase {test_case} refers to unknown pickle {pickle}")]
    UnknownPickle { test_case: String, pickle: String },
}
