//! HTML sanitizing and Markdown escaping for report text.
//!
//! Gherkin descriptions are free-form Markdown and may carry raw HTML. They
//! are passed through [`sanitize_html`] with an allow-list
//! [`SanitizerSchema`] before being embedded in a report. Step text and
//! table cells are plain text and only need escaping.

use regex::{Captures, Regex};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

/// Attribute allow-list key that applies to every tag.
pub const ANY_TAG: &str = "*";

/// An allow-list of HTML tags, attributes and URL protocols.
///
/// Values are immutable: the `with_*` methods return a new schema. Build one
/// at startup and pass it down.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SanitizerSchema {
    tag_names: BTreeSet<String>,
    /// Tag name (or [`ANY_TAG`]) to allowed attribute names, lowercase.
    attributes: BTreeMap<String, BTreeSet<String>>,
    /// URL attribute to allowed protocols.
    protocols: BTreeMap<String, BTreeSet<String>>,
    /// Elements removed together with their content.
    strip: BTreeSet<String>,
    /// Attributes whose values are prefixed to avoid clobbering page ids.
    clobber: BTreeSet<String>,
    clobber_prefix: String,
}

const GITHUB_TAG_NAMES: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "br", "b", "i", "strong", "em", "a", "pre", "code", "img",
    "tt", "div", "ins", "del", "sup", "sub", "p", "ol", "ul", "table", "thead", "tbody", "tfoot",
    "blockquote", "dl", "dt", "dd", "kbd", "q", "samp", "var", "hr", "ruby", "rt", "rp", "li",
    "tr", "td", "th", "s", "strike", "summary", "details", "caption", "figure", "figcaption",
    "abbr", "bdo", "cite", "dfn", "mark", "small", "span", "time", "wbr", "input",
];

const GITHUB_GLOBAL_ATTRIBUTES: &[&str] = &[
    "abbr", "accept", "accept-charset", "accesskey", "action", "align", "alt", "aria-describedby",
    "aria-hidden", "aria-label", "aria-labelledby", "axis", "border", "cellpadding",
    "cellspacing", "char", "charoff", "charset", "checked", "clear", "cols", "colspan", "color",
    "compact", "coords", "datetime", "dir", "disabled", "enctype", "for", "frame", "headers",
    "height", "hreflang", "hspace", "id", "ismap", "label", "lang", "maxlength", "media", "method",
    "multiple", "name", "nohref", "noshade", "nowrap", "open", "prompt", "readonly", "rel",
    "rev", "rows", "rowspan", "rules", "scope", "selected", "shape", "size", "span", "start",
    "summary", "tabindex", "target", "title", "type", "usemap", "valign", "value", "vspace",
    "width", "itemprop",
];

const GITHUB_TAG_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("a", &["href"]),
    ("img", &["src", "longdesc"]),
    ("div", &["itemscope", "itemtype"]),
    ("blockquote", &["cite"]),
    ("del", &["cite"]),
    ("ins", &["cite"]),
    ("q", &["cite"]),
    ("input", &["type", "disabled", "checked"]),
];

const GITHUB_PROTOCOLS: &[(&str, &[&str])] = &[
    ("href", &["http", "https", "mailto"]),
    ("cite", &["http", "https"]),
    ("src", &["http", "https"]),
    ("longdesc", &["http", "https"]),
];

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// DOM property names map onto their HTML attribute.
fn attribute_name(name: &str) -> String {
    match name {
        "className" => "class".to_string(),
        "htmlFor" => "for".to_string(),
        other => other.to_ascii_lowercase(),
    }
}

impl SanitizerSchema {
    /// GitHub's comment sanitizer allow-list.
    pub fn github() -> Self {
        let mut attributes: BTreeMap<String, BTreeSet<String>> = GITHUB_TAG_ATTRIBUTES
            .iter()
            .map(|(tag, attrs)| (tag.to_string(), set(attrs)))
            .collect();
        attributes.insert(ANY_TAG.to_string(), set(GITHUB_GLOBAL_ATTRIBUTES));
        Self {
            tag_names: set(GITHUB_TAG_NAMES),
            attributes,
            protocols: GITHUB_PROTOCOLS
                .iter()
                .map(|(attr, protocols)| (attr.to_string(), set(protocols)))
                .collect(),
            strip: set(&["script", "style"]),
            clobber: set(&["id", "name"]),
            clobber_prefix: "user-content-".to_string(),
        }
    }

    /// The schema reports use: GitHub's plus `<section>` and `class` anywhere.
    pub fn report_default() -> Self {
        Self::github()
            .with_tag_name("section")
            .with_attribute(ANY_TAG, "className")
    }

    pub fn with_tag_name(&self, tag: &str) -> Self {
        let mut next = self.clone();
        next.tag_names.insert(tag.to_ascii_lowercase());
        next
    }

    /// Allow `attribute` on `tag` (or on every tag with [`ANY_TAG`]).
    /// DOM property names such as `className` are accepted.
    pub fn with_attribute(&self, tag: &str, attribute: &str) -> Self {
        let mut next = self.clone();
        next.attributes
            .entry(tag.to_ascii_lowercase())
            .or_default()
            .insert(attribute_name(attribute));
        next
    }

    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tag_names.contains(&tag.to_ascii_lowercase())
    }

    pub fn allows_attribute(&self, tag: &str, attribute: &str) -> bool {
        let attribute = attribute_name(attribute);
        if attribute.starts_with("on") {
            return false;
        }
        [tag.to_ascii_lowercase().as_str(), ANY_TAG]
            .iter()
            .any(|key| self.attributes.get(*key).is_some_and(|a| a.contains(&attribute)))
    }

    /// Whether `value` is acceptable for the URL attribute `attribute`.
    /// Relative URLs always are.
    pub fn allows_url(&self, attribute: &str, value: &str) -> bool {
        let Some(allowed) = self.protocols.get(&attribute_name(attribute)) else {
            return true;
        };
        match url_protocol(value) {
            Some(protocol) => allowed.contains(&protocol),
            None => true,
        }
    }

    fn strips(&self, tag: &str) -> bool {
        self.strip.contains(tag)
    }
}

impl Default for SanitizerSchema {
    fn default() -> Self {
        Self::report_default()
    }
}

/// Lowercase scheme of an absolute URL. A colon after `/`, `?` or `#` does
/// not start a scheme.
fn url_protocol(value: &str) -> Option<String> {
    let value: String = value
        .trim()
        .chars()
        .filter(|c| !c.is_ascii_control() && !c.is_whitespace())
        .collect();
    let colon = value.find(':')?;
    let boundary = value.find(['/', '?', '#']).unwrap_or(usize::MAX);
    (colon < boundary).then(|| value[..colon].to_ascii_lowercase())
}

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?(?:-->|\z)").expect("comment pattern is valid"));

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<(/?)([A-Za-z][A-Za-z0-9-]*)((?:\s+[^\s/>"'=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)\s*(/?)>"#,
    )
    .expect("tag pattern is valid")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s/>"'=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("attribute pattern is valid")
});

/// Drop everything `schema` does not allow from `input`.
///
/// Comments go. Stripped elements (`<script>`, `<style>`) go with their
/// content. Other disallowed tags go but their text stays. Allowed tags keep
/// only allowed attributes, never event handlers, and URLs only with
/// allowed protocols. Text outside tags has stray `<` and `>` escaped.
pub fn sanitize_html(schema: &SanitizerSchema, input: &str) -> String {
    let input = COMMENT.replace_all(input, "");
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;
    // Depth inside stripped elements; their content is discarded.
    let mut stripping: Vec<String> = Vec::new();

    for caps in TAG.captures_iter(&input) {
        let Some(whole) = caps.get(0) else { continue };
        if stripping.is_empty() {
            push_text(&mut out, &input[cursor..whole.start()]);
        }
        cursor = whole.end();

        let closing = !caps[1].is_empty();
        let tag = caps[2].to_ascii_lowercase();

        if schema.strips(&tag) {
            if closing {
                if let Some(pos) = stripping.iter().rposition(|t| *t == tag) {
                    stripping.truncate(pos);
                }
            } else if caps[4].is_empty() {
                stripping.push(tag);
            }
            continue;
        }
        if !stripping.is_empty() || !schema.allows_tag(&tag) {
            continue;
        }
        if closing {
            out.push_str(&format!("</{tag}>"));
        } else {
            out.push('<');
            out.push_str(&tag);
            push_attributes(&mut out, schema, &tag, &caps);
            if !caps[4].is_empty() {
                out.push_str(" /");
            }
            out.push('>');
        }
    }
    if stripping.is_empty() {
        push_text(&mut out, &input[cursor..]);
    }
    out
}

fn push_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

fn push_attributes(out: &mut String, schema: &SanitizerSchema, tag: &str, caps: &Captures<'_>) {
    for attr in ATTRIBUTE.captures_iter(&caps[3]) {
        let name = attr[1].to_ascii_lowercase();
        if !schema.allows_attribute(tag, &name) {
            continue;
        }
        let value = attr
            .get(2)
            .or_else(|| attr.get(3))
            .or_else(|| attr.get(4))
            .map(|m| m.as_str());
        let Some(value) = value else {
            out.push(' ');
            out.push_str(&name);
            continue;
        };
        if !schema.allows_url(&name, value) {
            continue;
        }
        let value = if schema.clobber.contains(&name) {
            format!("{}{value}", schema.clobber_prefix)
        } else {
            value.to_string()
        };
        out.push_str(&format!(" {name}=\"{}\"", value.replace('"', "&quot;")));
    }
}

/// Characters with inline meaning in CommonMark and GFM.
const MARKDOWN_INLINE: &[char] = &['\\', '`', '*', '_', '[', ']', '<', '>', '~'];

/// Escape `text` so Markdown renders it literally inside a line.
pub fn escape_markdown_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_INLINE.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape `text` for a GFM table cell. Line breaks become `<br>`.
pub fn escape_table_cell(text: &str) -> String {
    escape_markdown_inline(text)
        .replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace('\n', "<br>")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(input: &str) -> String {
        sanitize_html(&SanitizerSchema::report_default(), input)
    }

    #[test]
    fn keeps_allowed_markup() {
        assert_eq!(
            clean("<p>This is <strong>important</strong></p>"),
            "<p>This is <strong>important</strong></p>"
        );
        assert_eq!(clean("line<br/>break"), "line<br />break");
    }

    #[test]
    fn strips_scripts_with_content() {
        assert_eq!(clean("a<script>alert(1)</script>b"), "ab");
        assert_eq!(clean("a<STYLE type=x>p{}</style>b"), "ab");
        // unterminated script swallows the rest
        assert_eq!(clean("a<script>alert(1)"), "a");
    }

    #[test]
    fn drops_unknown_tags_but_keeps_text() {
        assert_eq!(clean("<blink>hi</blink> <custom-el x=1>there</custom-el>"), "hi there");
    }

    #[test]
    fn drops_comments() {
        assert_eq!(clean("a<!-- secret -->b<!-- open"), "ab");
    }

    #[test]
    fn filters_attributes() {
        assert_eq!(
            clean(r#"<a href="https://cucumber.io" onclick="evil()" style="x">c</a>"#),
            r#"<a href="https://cucumber.io">c</a>"#
        );
        assert_eq!(clean(r#"<a href="javascript:alert(1)">x</a>"#), "<a>x</a>");
        assert_eq!(clean(r#"<a href=" JaVaScRiPt:alert(1)">x</a>"#), "<a>x</a>");
        assert_eq!(clean(r#"<a href="/docs#a:b">x</a>"#), r#"<a href="/docs#a:b">x</a>"#);
        assert_eq!(clean(r#"<img src='data:image/png;base64,AA'>"#), "<img>");
    }

    #[test]
    fn report_default_allows_section_and_class() {
        assert_eq!(
            clean(r#"<section class="note">n</section>"#),
            r#"<section class="note">n</section>"#
        );
        let github = SanitizerSchema::github();
        assert_eq!(sanitize_html(&github, r#"<section class="note">n</section>"#), "n");
    }

    #[test]
    fn ids_are_prefixed() {
        assert_eq!(clean(r#"<h2 id="top">T</h2>"#), r#"<h2 id="user-content-top">T</h2>"#);
    }

    #[test]
    fn schema_builders_do_not_mutate() {
        let base = SanitizerSchema::github();
        let extended = base.with_tag_name("Marquee").with_attribute("marquee", "behavior");
        assert!(!base.allows_tag("marquee"));
        assert!(extended.allows_tag("marquee"));
        assert!(extended.allows_attribute("marquee", "behavior"));
        assert!(!extended.allows_attribute("marquee", "onstart"));
    }

    #[test]
    fn stray_angle_brackets_are_escaped() {
        assert_eq!(clean("1 < 2 and 3 > 2"), "1 &lt; 2 and 3 &gt; 2");
        assert_eq!(clean("<scr<script>ipt>"), "&lt;scr");
    }

    #[test]
    fn escapes_markdown_inline() {
        assert_eq!(escape_markdown_inline("a *b* _c_ [d]"), r"a \*b\* \_c\_ \[d\]");
        assert_eq!(escape_markdown_inline("LHR-CDG has been delayed"), "LHR-CDG has been delayed");
        assert_eq!(escape_markdown_inline("<tag>"), r"\<tag\>");
    }

    #[test]
    fn escapes_table_cells() {
        assert_eq!(escape_table_cell("a|b\nc"), r"a\|b<br>c");
        insta::assert_snapshot!(escape_table_cell("`x` | *y*"), @r"\`x\` \| \*y\*");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn output_never_has_script_tags(input in "\\PC{0,80}") {
                let out = clean(&input).to_ascii_lowercase();
                prop_assert!(!out.contains("<script"));
                prop_assert!(!out.contains("<!--"));
            }

            #[test]
            fn plain_text_passes_through(input in "[a-zA-Z0-9 .,]{0,60}") {
                prop_assert_eq!(clean(&input), input);
            }
        }
    }
}
