use chrono::{DateTime, Utc};
use pickleview_ids::{TestCaseId, TestCaseStartedId, TestStepId};
use serde::{Deserialize, Serialize};

/// Step outcome, declared from least to most severe.
///
/// The derived `Ord` is the severity order used to pick the worst result.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStepResultStatus {
    #[default]
    Unknown,
    Passed,
    Skipped,
    Pending,
    Undefined,
    Ambiguous,
    Failed,
}

impl TestStepResultStatus {
    pub const ALL: [TestStepResultStatus; 7] = [
        TestStepResultStatus::Unknown,
        TestStepResultStatus::Passed,
        TestStepResultStatus::Skipped,
        TestStepResultStatus::Pending,
        TestStepResultStatus::Undefined,
        TestStepResultStatus::Ambiguous,
        TestStepResultStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestStepResultStatus::Unknown => "unknown",
            TestStepResultStatus::Passed => "passed",
            TestStepResultStatus::Skipped => "skipped",
            TestStepResultStatus::Pending => "pending",
            TestStepResultStatus::Undefined => "undefined",
            TestStepResultStatus::Ambiguous => "ambiguous",
            TestStepResultStatus::Failed => "failed",
        }
    }

    /// Whether a run containing this status counts as unsuccessful.
    pub fn is_problem(&self) -> bool {
        matches!(
            self,
            TestStepResultStatus::Pending
                | TestStepResultStatus::Undefined
                | TestStepResultStatus::Ambiguous
                | TestStepResultStatus::Failed
        )
    }
}

impl std::fmt::Display for TestStepResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Duration {
    pub seconds: i64,
    pub nanos: u32,
}

impl Duration {
    pub const ZERO: Duration = Duration {
        seconds: 0,
        nanos: 0,
    };

    pub fn as_millis(&self) -> i64 {
        self.seconds * 1000 + i64::from(self.nanos / 1_000_000)
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanos)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestStepResult {
    #[serde(default)]
    pub status: TestStepResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub duration: Duration,
}

impl TestStepResult {
    pub fn unknown() -> Self {
        Self {
            status: TestStepResultStatus::Unknown,
            message: None,
            duration: Duration::ZERO,
        }
    }
}

/// The most severe of `results`, or an `Unknown` result when there are none.
///
/// Ties keep the first result seen, so its message is the one shown.
pub fn worst_test_step_result<'a>(
    results: impl IntoIterator<Item = &'a TestStepResult>,
) -> TestStepResult {
    let mut worst: Option<&TestStepResult> = None;
    for r in results {
        match worst {
            Some(w) if w.status >= r.status => {}
            _ => worst = Some(r),
        }
    }
    worst.cloned().unwrap_or_else(TestStepResult::unknown)
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestRunStarted {
    #[serde(default)]
    pub timestamp: Timestamp,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestRunFinished {
    #[serde(default)]
    pub timestamp: Timestamp,
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseStarted {
    pub id: TestCaseStartedId,
    pub test_case_id: TestCaseId,
    #[serde(default)]
    pub attempt: u32,
    #[serde(default)]
    pub timestamp: Timestamp,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseFinished {
    pub test_case_started_id: TestCaseStartedId,
    #[serde(default)]
    pub timestamp: Timestamp,
    #[serde(default)]
    pub will_be_retried: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestStepStarted {
    pub test_case_started_id: TestCaseStartedId,
    pub test_step_id: TestStepId,
    #[serde(default)]
    pub timestamp: Timestamp,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestStepFinished {
    pub test_case_started_id: TestCaseStartedId,
    pub test_step_id: TestStepId,
    pub test_step_result: TestStepResult,
    #[serde(default)]
    pub timestamp: Timestamp,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttachmentContentEncoding {
    #[default]
    Identity,
    Base64,
}

/// Media type for the log lines a step writes with `log()`.
pub const LOG_MEDIA_TYPE: &str = "text/x.cucumber.log+plain";

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub content_encoding: AttachmentContentEncoding,
    #[serde(default)]
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case_started_id: Option<TestCaseStartedId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_step_id: Option<TestStepId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Attachment {
    pub fn is_log(&self) -> bool {
        self.media_type == LOG_MEDIA_TYPE
    }

    pub fn is_text(&self) -> bool {
        self.content_encoding == AttachmentContentEncoding::Identity
            && (self.media_type.starts_with("text/")
                || self.media_type == "application/json"
                || self.media_type.ends_with("+json"))
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// Size of the decoded payload. Base64 padding is accounted for, the
    /// payload itself is not decoded.
    pub fn decoded_len(&self) -> usize {
        match self.content_encoding {
            AttachmentContentEncoding::Identity => self.body.len(),
            AttachmentContentEncoding::Base64 => {
                let trimmed = self.body.trim_end();
                let padding = trimmed.bytes().rev().take_while(|b| *b == b'=').count();
                (trimmed.len() / 4 * 3).saturating_sub(padding)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: TestStepResultStatus, message: Option<&str>) -> TestStepResult {
        TestStepResult {
            status,
            message: message.map(str::to_string),
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn worst_of_nothing_is_unknown() {
        let worst = worst_test_step_result(&[]);
        assert_eq!(worst.status, TestStepResultStatus::Unknown);
        assert_eq!(worst.duration, Duration::ZERO);
    }

    #[test]
    fn failed_beats_everything() {
        let results = vec![
            result(TestStepResultStatus::Passed, None),
            result(TestStepResultStatus::Failed, Some("boom")),
            result(TestStepResultStatus::Skipped, None),
            result(TestStepResultStatus::Ambiguous, None),
        ];
        let worst = worst_test_step_result(&results);
        assert_eq!(worst.status, TestStepResultStatus::Failed);
        assert_eq!(worst.message.as_deref(), Some("boom"));
    }

    #[test]
    fn ties_keep_first_message() {
        let results = vec![
            result(TestStepResultStatus::Failed, Some("first")),
            result(TestStepResultStatus::Failed, Some("second")),
        ];
        assert_eq!(
            worst_test_step_result(&results).message.as_deref(),
            Some("first")
        );
    }

    #[test]
    fn severity_order_matches_declaration() {
        let mut sorted = TestStepResultStatus::ALL;
        sorted.sort();
        assert_eq!(sorted, TestStepResultStatus::ALL);
        assert!(TestStepResultStatus::Undefined < TestStepResultStatus::Ambiguous);
        assert!(TestStepResultStatus::Pending > TestStepResultStatus::Skipped);
    }

    #[test]
    fn status_uses_screaming_case_on_the_wire() {
        let json = serde_json::to_string(&TestStepResultStatus::Ambiguous).unwrap();
        assert_eq!(json, "\"AMBIGUOUS\"");
    }

    #[test]
    fn base64_decoded_len_accounts_for_padding() {
        let a = Attachment {
            body: "aGk=".into(),
            content_encoding: AttachmentContentEncoding::Base64,
            media_type: "text/plain".into(),
            ..Attachment::default()
        };
        assert_eq!(a.decoded_len(), 2);
        assert!(!a.is_text());
    }

    #[test]
    fn timestamp_converts_to_datetime() {
        let ts = Timestamp {
            seconds: 1_700_000_000,
            nanos: 0,
        };
        let dt = ts.to_datetime().unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
    }
}
