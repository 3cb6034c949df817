use anyhow::{Context, Result};
use pickleview_ports::MessageSource;
use pickleview_schema::Envelope;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Path that reads stdin instead of a file.
pub const STDIN_PATH: &str = "-";

/// Adapter for the NDJSON stream Cucumber's message formatter writes:
/// one JSON envelope per line.
///
/// Blank lines are skipped. Envelopes of kinds this crate does not model
/// parse as empty envelopes and are ignored downstream.
#[derive(Clone, Debug)]
pub struct NdjsonSource {
    pub path: PathBuf,
}

impl NdjsonSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn stdin() -> Self {
        Self::new(STDIN_PATH)
    }

    fn is_stdin(&self) -> bool {
        self.path == Path::new(STDIN_PATH)
    }
}

impl MessageSource for NdjsonSource {
    fn read_envelopes(&self) -> Result<Vec<Envelope>> {
        if self.is_stdin() {
            let stdin = std::io::stdin();
            return read_envelopes_from(stdin.lock(), "<stdin>");
        }
        let file = std::fs::File::open(&self.path)
            .with_context(|| format!("open {:?}", self.path))?;
        read_envelopes_from(BufReader::new(file), &self.path.display().to_string())
    }
}

/// Parse envelopes from any reader. `origin` names the input in errors.
pub fn read_envelopes_from(reader: impl BufRead, origin: &str) -> Result<Vec<Envelope>> {
    let mut out = Vec::new();
    let mut unknown = 0usize;
    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read line {} of {origin}", i + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let envelope: Envelope = serde_json::from_str(&line)
            .with_context(|| format!("parse envelope json line {} in {origin}", i + 1))?;
        if envelope.kind().is_none() {
            unknown += 1;
        }
        out.push(envelope);
    }
    debug!(origin, envelopes = out.len(), unknown, "read message stream");
    Ok(out)
}

/// Parse envelopes from an in-memory NDJSON string.
pub fn parse_ndjson(text: &str) -> Result<Vec<Envelope>> {
    read_envelopes_from(text.as_bytes(), "<memory>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const STREAM: &str = concat!(
        r#"{"meta":{"protocolVersion":"24.0.0"}}"#,
        "\n\n",
        r#"{"testRunStarted":{"timestamp":{"seconds":1,"nanos":0}}}"#,
        "\n",
        r#"{"someFutureMessage":{"x":1}}"#,
        "\n",
        r#"{"testRunFinished":{"timestamp":{"seconds":2,"nanos":0},"success":true}}"#,
        "\n",
    );

    #[test]
    fn parses_lines_and_skips_blanks() {
        let envelopes = parse_ndjson(STREAM).unwrap();
        assert_eq!(envelopes.len(), 4);
        assert_eq!(envelopes[0].kind(), Some("meta"));
        assert_eq!(envelopes[2].kind(), None);
        assert!(envelopes[3].test_run_finished.as_ref().unwrap().success);
    }

    #[test]
    fn error_names_the_line() {
        let err = parse_ndjson("{}\n\n{not json\n").unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("line 3"), "{msg}");
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(STREAM.as_bytes()).unwrap();
        let source = NdjsonSource::new(file.path());
        assert_eq!(source.read_envelopes().unwrap().len(), 4);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = NdjsonSource::new(dir.path().join("missing.ndjson"));
        let err = source.read_envelopes().unwrap_err();
        assert!(format!("{err:#}").contains("missing.ndjson"));
    }

    #[test]
    fn dash_means_stdin() {
        assert!(NdjsonSource::stdin().is_stdin());
        assert!(!NdjsonSource::new("messages.ndjson").is_stdin());
    }
}
