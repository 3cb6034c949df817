//! Cucumber messages data model for pickleview.
//!
//! Defines the subset of the messages schema the report needs: Gherkin
//! documents, pickles, step definitions and hooks, test cases and step
//! match arguments, step results and attachments. The model is read-only:
//! producers own the schema, we deserialize it and never mutate it.

pub mod envelope;
pub mod execution;
pub mod gherkin;
pub mod glue;
pub mod pickle;

pub use envelope::Envelope;
pub use execution::{TestStepResult, TestStepResultStatus, worst_test_step_result};
