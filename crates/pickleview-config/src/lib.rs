//! Configuration loading for pickleview reports.

use anyhow::Context;
use pickleview_sanitize::SanitizerSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Configuration format types supported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    Json,
    #[default]
    Yaml,
}

/// Report output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("unknown output format {other:?}, expected markdown or json"),
        }
    }
}

/// How status icons are drawn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconStyle {
    #[default]
    Emoji,
    Ascii,
}

/// Log level for filtering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Level for `count` repetitions of `-v` on top of the default.
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Compact,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level. When unset, `-v` flags decide.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,
    #[serde(default)]
    pub format: LogFormat,
    /// Per-crate overrides, e.g. `pickleview_query: debug`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub component_levels: BTreeMap<String, LogLevel>,
}

impl LoggingConfig {
    /// `EnvFilter` directive string for `base` plus the component overrides.
    pub fn filter_directive(&self, base: LogLevel) -> String {
        let mut directive = base.as_str().to_string();
        for (component, level) in &self.component_levels {
            directive.push_str(&format!(",{component}={}", level.as_str()));
        }
        directive
    }
}

/// Additions to the report's default sanitizer schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizerConfig {
    #[serde(default)]
    pub extra_tag_names: Vec<String>,
    /// Tag name (or `*`) to extra attribute names.
    #[serde(default)]
    pub extra_attributes: BTreeMap<String, Vec<String>>,
}

/// Main report configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Top-level heading
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default)]
    pub format: OutputFormat,

    #[serde(default)]
    pub icons: IconStyle,

    /// Render step and hook attachments
    #[serde(default = "default_true")]
    pub include_attachments: bool,

    /// Attachments over this size are summarized instead of inlined
    #[serde(default = "default_max_inline_attachment_bytes")]
    pub max_inline_attachment_bytes: usize,

    #[serde(default)]
    pub sanitizer: SanitizerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_title() -> String {
    "Test report".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_inline_attachment_bytes() -> usize {
    64 * 1024
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            format: OutputFormat::default(),
            icons: IconStyle::default(),
            include_attachments: true,
            max_inline_attachment_bytes: default_max_inline_attachment_bytes(),
            sanitizer: SanitizerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ReportConfig {
    /// The report's default schema with the configured additions.
    pub fn sanitizer_schema(&self) -> SanitizerSchema {
        let mut schema = SanitizerSchema::report_default();
        for tag in &self.sanitizer.extra_tag_names {
            schema = schema.with_tag_name(tag);
        }
        for (tag, attributes) in &self.sanitizer.extra_attributes {
            for attribute in attributes {
                schema = schema.with_attribute(tag, attribute);
            }
        }
        schema
    }
}

fn format_for(path: &std::path::Path) -> ConfigFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => ConfigFormat::Json,
        Some("yaml") | Some("yml") => ConfigFormat::Yaml,
        _ => ConfigFormat::default(),
    }
}

/// Load configuration from a file
pub fn load_config<P: Into<PathBuf>>(path: P) -> anyhow::Result<ReportConfig> {
    let path = path.into();
    let contents =
        std::fs::read_to_string(&path).with_context(|| format!("read config {path:?}"))?;

    match format_for(&path) {
        ConfigFormat::Json => serde_json::from_str(&contents)
            .with_context(|| format!("parse JSON config {path:?}")),
        ConfigFormat::Yaml => serde_yaml::from_str(&contents)
            .with_context(|| format!("parse YAML config {path:?}")),
    }
}

/// Save configuration to a file
pub fn save_config<P: Into<PathBuf>>(config: &ReportConfig, path: P) -> anyhow::Result<()> {
    let path = path.into();
    let contents = match format_for(&path) {
        ConfigFormat::Json => {
            serde_json::to_string_pretty(config).context("serialize JSON config")?
        }
        ConfigFormat::Yaml => serde_yaml::to_string(config).context("serialize YAML config")?,
    };

    std::fs::write(&path, contents).with_context(|| format!("write config {path:?}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_default_values() {
        let config = ReportConfig::default();
        assert_eq!(config.title, "Test report");
        assert_eq!(config.format, OutputFormat::Markdown);
        assert_eq!(config.icons, IconStyle::Emoji);
        assert!(config.include_attachments);
        assert_eq!(config.max_inline_attachment_bytes, 65536);
        assert_eq!(config.logging.level, None);
    }

    #[test]
    fn empty_yaml_is_all_defaults() {
        let config: ReportConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ReportConfig::default());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let yaml = "title: Nightly\nicons: ascii\nlogging:\n  level: debug\n  format: json\n";
        let config: ReportConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "Nightly");
        assert_eq!(config.icons, IconStyle::Ascii);
        assert_eq!(config.logging.level, Some(LogLevel::Debug));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.include_attachments);
    }

    #[test]
    fn config_serialize_yaml() {
        let yaml = serde_yaml::to_string(&ReportConfig::default()).unwrap();
        insta::assert_snapshot!(yaml, @r"
        title: Test report
        format: markdown
        icons: emoji
        include_attachments: true
        max_inline_attachment_bytes: 65536
        sanitizer:
          extra_tag_names: []
          extra_attributes: {}
        logging:
          format: plain
        ");
    }

    #[test]
    fn load_save_yaml_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("pickleview.yaml");

        let config = ReportConfig {
            title: "Checkout".to_string(),
            format: OutputFormat::Json,
            include_attachments: false,
            sanitizer: SanitizerConfig {
                extra_tag_names: vec!["marquee".to_string()],
                extra_attributes: BTreeMap::from([(
                    "marquee".to_string(),
                    vec!["behavior".to_string()],
                )]),
            },
            ..ReportConfig::default()
        };

        save_config(&config, &config_path).unwrap();
        let loaded = load_config(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_save_json_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("pickleview.json");

        let config = ReportConfig::default();
        save_config(&config, &config_path).unwrap();
        let loaded = load_config(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn bad_config_names_the_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("broken.json");
        std::fs::write(&config_path, "{ nope").unwrap();
        let err = load_config(&config_path).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }

    #[test]
    fn sanitizer_schema_merges_extras() {
        let config = ReportConfig {
            sanitizer: SanitizerConfig {
                extra_tag_names: vec!["marquee".to_string()],
                extra_attributes: BTreeMap::from([(
                    "*".to_string(),
                    vec!["data-step".to_string()],
                )]),
            },
            ..ReportConfig::default()
        };
        let schema = config.sanitizer_schema();
        assert!(schema.allows_tag("marquee"));
        assert!(schema.allows_tag("section"));
        assert!(schema.allows_attribute("p", "data-step"));
        assert!(schema.allows_attribute("p", "class"));
        assert!(!SanitizerSchema::report_default().allows_tag("marquee"));
    }

    #[test]
    fn filter_directive_includes_components() {
        let logging = LoggingConfig {
            component_levels: BTreeMap::from([("pickleview_query".to_string(), LogLevel::Trace)]),
            ..LoggingConfig::default()
        };
        assert_eq!(logging.filter_directive(LogLevel::Info), "info,pickleview_query=trace");
        assert_eq!(LogLevel::from_verbosity(0), LogLevel::Warn);
        assert_eq!(LogLevel::from_verbosity(9), LogLevel::Trace);
    }

    #[test]
    fn output_format_parses() {
        assert_eq!("MD".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("html".parse::<OutputFormat>().is_err());
    }
}
