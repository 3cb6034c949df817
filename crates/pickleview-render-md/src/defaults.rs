//! Default components.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use itertools::Itertools;
use pickleview_config::IconStyle;
use pickleview_ports::{HookExecution, HookPosition};
use pickleview_sanitize::{escape_markdown_inline, escape_table_cell, sanitize_html};
use pickleview_schema::TestStepResultStatus;
use pickleview_schema::execution::{Attachment as AttachmentMessage, AttachmentContentEncoding};
use pickleview_schema::gherkin::{
    DataTable as DataTableMessage, DocString as DocStringMessage, Tag,
};
use pickleview_segment::Segment;
use std::borrow::Cow;
use tracing::warn;

use crate::components::{ExamplesProps, GherkinStepProps, RenderContext, Renderer};
use crate::text::{dedent, escape_attribute, escape_html_text, fenced, indent, strip_ansi};

/// Name of the circle icon drawn for `status`.
pub fn status_icon_name(status: TestStepResultStatus) -> &'static str {
    match status {
        TestStepResultStatus::Passed => "check-circle",
        TestStepResultStatus::Skipped => "stop-circle",
        TestStepResultStatus::Pending => "pause-circle",
        TestStepResultStatus::Undefined => "question-circle",
        TestStepResultStatus::Ambiguous => "info-circle",
        TestStepResultStatus::Failed => "times-circle",
        TestStepResultStatus::Unknown => "question-circle",
    }
}

fn glyph(icon: &str, style: IconStyle) -> &'static str {
    match (style, icon) {
        (IconStyle::Emoji, "check-circle") => "✅",
        (IconStyle::Emoji, "stop-circle") => "⏹️",
        (IconStyle::Emoji, "pause-circle") => "⏸️",
        (IconStyle::Emoji, "info-circle") => "ℹ️",
        (IconStyle::Emoji, "times-circle") => "❌",
        (IconStyle::Emoji, _) => "❓",
        (IconStyle::Ascii, "check-circle") => "(v)",
        (IconStyle::Ascii, "stop-circle") => "(-)",
        (IconStyle::Ascii, "pause-circle") => "(=)",
        (IconStyle::Ascii, "info-circle") => "(i)",
        (IconStyle::Ascii, "times-circle") => "(x)",
        (IconStyle::Ascii, _) => "(?)",
    }
}

pub struct StatusIcon;

impl Renderer<TestStepResultStatus> for StatusIcon {
    fn render(&self, status: &TestStepResultStatus, cx: &RenderContext<'_>, out: &mut String) {
        out.push_str(glyph(status_icon_name(*status), cx.config.icons));
    }
}

/// A step as a list item: icon, bold keyword, then the segmented text.
/// Arguments, errors and attachments follow indented under the item.
pub struct GherkinStep;

// Entity references are decoded in Markdown text too, so `&` is escaped
// outside the parameter spans as well.
fn literal_text(text: &str) -> String {
    escape_markdown_inline(&text.replace('&', "&amp;"))
}

fn parameter_text(text: &str) -> String {
    escape_markdown_inline(&escape_html_text(text))
}

impl<'a> Renderer<GherkinStepProps<'a>> for GherkinStep {
    fn render(&self, props: &GherkinStepProps<'a>, cx: &RenderContext<'_>, out: &mut String) {
        let step = &props.step;
        let components = cx.components;

        out.push_str("- ");
        components
            .status_icon()
            .render(&props.status.result.status, cx, out);
        out.push_str(&format!(" **{}** ", escape_markdown_inline(step.keyword.trim())));
        for segment in step.segmented().segments {
            match segment {
                Segment::Literal { text } => out.push_str(&literal_text(&text)),
                Segment::Parameter {
                    text,
                    parameter_type_name,
                } => out.push_str(&format!(
                    "<strong title=\"{}\">{}</strong>",
                    escape_attribute(&parameter_type_name),
                    parameter_text(&text)
                )),
            }
        }
        out.push('\n');

        let mut body = String::new();
        if let Some(table) = step.data_table {
            body.push('\n');
            components.data_table().render(table, cx, &mut body);
        }
        if let Some(doc_string) = step.doc_string {
            body.push('\n');
            components.doc_string().render(doc_string, cx, &mut body);
        }
        // A templated step stands for every row; row outcomes show in the
        // examples table instead.
        if !step.is_templated {
            if let Some(message) = props.status.result.message.as_deref() {
                if !message.is_empty() {
                    body.push('\n');
                    components.error_message().render(message, cx, &mut body);
                }
            }
            if cx.config.include_attachments {
                for &attachment in &props.status.attachments {
                    body.push('\n');
                    components.attachment().render(attachment, cx, &mut body);
                }
            }
        }
        out.push_str(&indent(&body, "  "));
    }
}

pub struct Examples;

impl<'a> Renderer<ExamplesProps<'a>> for Examples {
    fn render(&self, props: &ExamplesProps<'a>, cx: &RenderContext<'_>, out: &mut String) {
        let examples = props.examples;
        let hashes = "#".repeat(props.level.clamp(1, 6));
        let keyword = escape_markdown_inline(examples.keyword.trim());
        if examples.name.is_empty() {
            out.push_str(&format!("{hashes} {keyword}\n\n"));
        } else {
            out.push_str(&format!(
                "{hashes} {keyword}: {}\n\n",
                escape_markdown_inline(&examples.name)
            ));
        }
        cx.components.tags().render(&examples.tags, cx, out);
        cx.components
            .description()
            .render(&examples.description, cx, out);

        let Some(header) = &examples.table_header else {
            return;
        };
        out.push_str(&format!(
            "| | {} |\n",
            header.values().map(escape_table_cell).join(" | ")
        ));
        out.push_str(&separator(header.cells.len() + 1));
        for (i, row) in examples.table_body.iter().enumerate() {
            let status = props.row_statuses.get(i).copied().unwrap_or_default();
            let icon = cx.render_to_string(cx.components.status_icon(), &status);
            out.push_str(&format!(
                "| {icon} | {} |\n",
                row.values().map(escape_table_cell).join(" | ")
            ));
        }
        out.push('\n');
    }
}

pub struct Tags;

impl Renderer<[Tag]> for Tags {
    fn render(&self, tags: &[Tag], _cx: &RenderContext<'_>, out: &mut String) {
        if tags.is_empty() {
            return;
        }
        let line = tags
            .iter()
            .map(|tag| {
                if tag.name.contains('`') {
                    escape_markdown_inline(&tag.name)
                } else {
                    format!("`{}`", tag.name)
                }
            })
            .join(" ");
        out.push_str(&line);
        out.push_str("\n\n");
    }
}

/// Free-form Markdown, with HTML limited to the configured schema.
pub struct Description;

impl Renderer<str> for Description {
    fn render(&self, description: &str, cx: &RenderContext<'_>, out: &mut String) {
        let text = dedent(description);
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        out.push_str(sanitize_html(cx.schema, text).trim_end());
        out.push_str("\n\n");
    }
}

/// The first row is the header.
pub struct DataTable;

impl Renderer<DataTableMessage> for DataTable {
    fn render(&self, table: &DataTableMessage, _cx: &RenderContext<'_>, out: &mut String) {
        let mut rows = table.rows.iter();
        let Some(header) = rows.next() else {
            return;
        };
        out.push_str(&table_row(header.values()));
        out.push_str(&separator(header.cells.len()));
        for row in rows {
            out.push_str(&table_row(row.values()));
        }
    }
}

fn table_row<'v>(cells: impl Iterator<Item = &'v str>) -> String {
    format!("| {} |\n", cells.map(escape_table_cell).join(" | "))
}

fn separator(columns: usize) -> String {
    format!("|{}\n", " --- |".repeat(columns.max(1)))
}

pub struct DocString;

impl Renderer<DocStringMessage> for DocString {
    fn render(&self, doc_string: &DocStringMessage, _cx: &RenderContext<'_>, out: &mut String) {
        let info = doc_string.media_type.as_deref().map(language).unwrap_or("");
        out.push_str(&fenced(&doc_string.content, info));
    }
}

/// Fence info string for a media type: `application/json` is `json`.
fn language(media_type: &str) -> &str {
    let subtype = media_type.rsplit('/').next().unwrap_or_default();
    let subtype = subtype.rsplit('+').next().unwrap_or(subtype);
    let subtype = subtype.strip_prefix("x-").unwrap_or(subtype);
    let plain = subtype
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    match subtype {
        "plain" => "",
        s if plain => s,
        _ => "",
    }
}

pub struct ErrorMessage;

impl Renderer<str> for ErrorMessage {
    fn render(&self, message: &str, _cx: &RenderContext<'_>, out: &mut String) {
        out.push_str(&fenced(&strip_ansi(message), ""));
    }
}

/// Logs are quoted, text is fenced, images are inlined as data URLs and
/// anything else is summarized. So is anything over the inline size limit.
pub struct Attachment;

impl Renderer<AttachmentMessage> for Attachment {
    fn render(&self, attachment: &AttachmentMessage, cx: &RenderContext<'_>, out: &mut String) {
        if let Some(url) = attachment.url.as_deref().filter(|_| attachment.body.is_empty()) {
            let label = attachment.file_name.as_deref().unwrap_or(url);
            out.push_str(&format!("[{}](<{url}>)\n", escape_markdown_inline(label)));
            return;
        }
        if attachment.decoded_len() > cx.config.max_inline_attachment_bytes {
            out.push_str(&summary(attachment));
            return;
        }
        if attachment.is_image() {
            let data = match attachment.content_encoding {
                AttachmentContentEncoding::Base64 => Cow::Borrowed(attachment.body.trim()),
                AttachmentContentEncoding::Identity => Cow::Owned(STANDARD.encode(&attachment.body)),
            };
            let alt = attachment.file_name.as_deref().unwrap_or("image");
            out.push_str(&format!(
                "![{}](data:{};base64,{data})\n",
                escape_markdown_inline(alt),
                attachment.media_type
            ));
            return;
        }
        let textual = attachment.is_log() || is_textual(&attachment.media_type);
        let Some(text) = textual.then(|| decoded_text(attachment)).flatten() else {
            out.push_str(&summary(attachment));
            return;
        };
        if attachment.is_log() {
            for line in strip_ansi(&text).lines() {
                out.push_str(&format!("> {}\n", escape_markdown_inline(line)));
            }
        } else {
            out.push_str(&fenced(&text, language(&attachment.media_type)));
        }
    }
}

fn is_textual(media_type: &str) -> bool {
    media_type.starts_with("text/") || media_type == "application/json" || media_type.ends_with("+json")
}

fn decoded_text(attachment: &AttachmentMessage) -> Option<Cow<'_, str>> {
    match attachment.content_encoding {
        AttachmentContentEncoding::Identity => Some(Cow::Borrowed(attachment.body.as_str())),
        AttachmentContentEncoding::Base64 => {
            let bytes = match STANDARD.decode(attachment.body.trim()) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(media_type = %attachment.media_type, error = %err, "attachment is not valid base64");
                    return None;
                }
            };
            match String::from_utf8(bytes) {
                Ok(text) => Some(Cow::Owned(text)),
                Err(_) => {
                    warn!(media_type = %attachment.media_type, "text attachment is not utf-8");
                    None
                }
            }
        }
    }
}

fn summary(attachment: &AttachmentMessage) -> String {
    let size = attachment.decoded_len();
    match attachment.file_name.as_deref() {
        Some(name) => format!(
            "_Attachment_ {} ({}, {size} bytes)\n",
            escape_markdown_inline(name),
            attachment.media_type
        ),
        None => format!("_Attachment_ ({}, {size} bytes)\n", attachment.media_type),
    }
}

/// Only hooks worth reading: failed ones and those that attached something.
pub struct Hook;

impl<'a> Renderer<HookExecution<'a>> for Hook {
    fn render(&self, hook: &HookExecution<'a>, cx: &RenderContext<'_>, out: &mut String) {
        let result = hook.result;
        let status = result.map(|r| r.status).unwrap_or_default();
        if status != TestStepResultStatus::Failed && hook.attachments.is_empty() {
            return;
        }
        let when = match hook.position {
            HookPosition::Before => "Before",
            HookPosition::After => "After",
        };
        out.push_str("- ");
        cx.components.status_icon().render(&status, cx, out);
        out.push_str(&format!(" **{when}** hook"));
        let label = hook
            .hook
            .and_then(|h| h.name.as_deref().or(h.tag_expression.as_deref()));
        if let Some(label) = label {
            out.push_str(&format!(" {}", escape_markdown_inline(label)));
        }
        out.push('\n');

        let mut body = String::new();
        if let Some(message) = result.and_then(|r| r.message.as_deref()) {
            body.push('\n');
            cx.components.error_message().render(message, cx, &mut body);
        }
        if cx.config.include_attachments {
            for &attachment in &hook.attachments {
                body.push('\n');
                cx.components.attachment().render(attachment, cx, &mut body);
            }
        }
        out.push_str(&indent(&body, "  "));
    }
}
