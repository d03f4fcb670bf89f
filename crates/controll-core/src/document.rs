// ── Configuration document ──
//
// `configuration.yaml` held as raw text. Directive detection is
// line-oriented containment, NOT a YAML parse: flow mappings, anchors or
// keys split across lines can hide a directive from it. A leading UTF-8
// byte-order mark is skipped when scanning and kept in the text. Mutations never
// remove or reorder bytes; they append whole blocks or insert a single
// line directly below a section header.

const DEFAULT_INDENT: &str = "  ";
const BOM: char = '\u{feff}';

/// The full text of the structured configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    text: String,
}

/// Result of [`ConfigDocument::insert_under_section`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionInsert {
    /// The entry was inserted below the header.
    Inserted,
    /// No top-level header with that key exists.
    Missing,
    /// The header carries an inline value (`frontend: {}`,
    /// `frontend: !include ...`) so a child line cannot be added safely.
    InlineValue,
}

impl ConfigDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// `true` if any non-comment line, at any depth, declares `key:`.
    pub fn has_key(&self, key: &str) -> bool {
        self.directives().any(|d| d.key == key)
    }

    /// `true` if a direct child of the top-level `section:` declares
    /// `key: value`, ignoring quotes and case of the value (`name: Acme`,
    /// `name: "acme"` and `name: 'ACME'` all match `("name", "Acme")`).
    pub fn has_child_value(&self, section: &str, key: &str, value: &str) -> bool {
        let wanted = value.trim().to_lowercase();
        self.section_children(section)
            .iter()
            .any(|d| d.key == key && d.value.to_lowercase() == wanted)
    }

    /// `true` if a column-0 line declares `key:`.
    pub fn has_section(&self, key: &str) -> bool {
        self.directives().any(|d| d.indent == 0 && d.key == key)
    }

    /// Append a self-contained block at the end of the document.
    ///
    /// A non-empty document is first terminated with a newline, then a
    /// blank line separates it from the new block.
    pub fn append_block(&mut self, block: &str) {
        if !self.text.is_empty() {
            if !self.text.ends_with('\n') {
                self.text.push('\n');
            }
            self.text.push('\n');
        }
        self.text.push_str(block);
        if !block.ends_with('\n') {
            self.text.push('\n');
        }
    }

    /// Insert `entry` as the first child of the top-level `section:` header.
    ///
    /// The child is indented like the section's existing first child, or
    /// two spaces when the section is empty. The header's line ending
    /// (`\n` or `\r\n`) is reused.
    pub fn insert_under_section(&mut self, section: &str, entry: &str) -> SectionInsert {
        let body = self.body();
        let lines: Vec<&str> = body.split_inclusive('\n').collect();

        let mut offset = self.text.len() - body.len();
        let mut header = None;
        for (idx, line) in lines.iter().enumerate() {
            offset += line.len();
            if let Some(d) = parse_line(line) {
                if d.indent == 0 && d.key == section {
                    header = Some((idx, offset, d.value.is_empty()));
                    break;
                }
            }
        }

        let Some((idx, line_end, is_block)) = header else {
            return SectionInsert::Missing;
        };
        if !is_block {
            return SectionInsert::InlineValue;
        }

        let indent = lines
            .iter()
            .skip(idx + 1)
            .find(|line| is_content(line))
            .map(|line| leading_whitespace(line))
            .filter(|ws| !ws.is_empty())
            .unwrap_or(DEFAULT_INDENT)
            .to_owned();
        let header_line = lines.get(idx).copied().unwrap_or_default();
        let newline = if header_line.ends_with("\r\n") {
            "\r\n"
        } else {
            "\n"
        };

        let mut insertion = String::new();
        if !header_line.ends_with('\n') {
            insertion.push_str(newline);
        }
        insertion.push_str(&indent);
        insertion.push_str(entry);
        insertion.push_str(newline);

        self.text.insert_str(line_end, &insertion);
        SectionInsert::Inserted
    }

    /// The text without a leading byte-order mark.
    fn body(&self) -> &str {
        self.text.strip_prefix(BOM).unwrap_or(&self.text)
    }

    fn directives(&self) -> impl Iterator<Item = Directive<'_>> {
        self.body().lines().filter_map(parse_line)
    }

    /// Directives one level below the top-level `section:` header.
    fn section_children(&self, section: &str) -> Vec<Directive<'_>> {
        let mut directives = self
            .directives()
            .skip_while(|d| !(d.indent == 0 && d.key == section));
        if directives.next().is_none() {
            return Vec::new();
        }

        let nested: Vec<_> = directives.take_while(|d| d.indent > 0).collect();
        let Some(child_indent) = nested.first().map(|d| d.indent) else {
            return nested;
        };
        nested
            .into_iter()
            .filter(|d| d.indent == child_indent)
            .collect()
    }
}

impl From<String> for ConfigDocument {
    fn from(text: String) -> Self {
        Self { text }
    }
}

impl From<&str> for ConfigDocument {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

// ── Line scanning ───────────────────────────────────────────────────

/// One `key: value` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Directive<'a> {
    indent: usize,
    key: &'a str,
    value: &'a str,
}

fn parse_line(line: &str) -> Option<Directive<'_>> {
    let content = line.trim_end_matches(['\r', '\n']);
    if !is_content(content) {
        return None;
    }
    let trimmed = content.trim_start();
    let indent = content.len() - trimmed.len();
    let (key, value) = trimmed.split_once(':')?;
    Some(Directive {
        indent,
        key: unquote(key.trim()),
        value: unquote(strip_comment(value)),
    })
}

fn is_content(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start();
    &line[..line.len() - trimmed.len()]
}

/// Drop a trailing `# comment`, keeping a quoted scalar intact.
fn strip_comment(value: &str) -> &str {
    let v = value.trim();
    if let Some(quote) = v.chars().next().filter(|c| *c == '"' || *c == '\'') {
        return match v[1..].find(quote) {
            Some(end) => &v[..end + 2],
            None => v,
        };
    }
    if v.starts_with('#') {
        return "";
    }
    v.find(" #").map_or(v, |i| v[..i].trim_end())
}

fn unquote(s: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn has_key_ignores_comments() {
        let doc = ConfigDocument::new("# homeassistant:\ndefault_config:\n");
        assert!(!doc.has_key("homeassistant"));
        assert!(doc.has_key("default_config"));
    }

    #[test]
    fn has_key_matches_nested_and_quoted_keys() {
        let doc = ConfigDocument::new("frontend:\n  \"themes\": !include_dir_merge_named themes\n");
        assert!(doc.has_key("themes"));
        assert!(!doc.has_section("themes"));
        assert!(doc.has_section("frontend"));
    }

    #[test]
    fn has_key_requires_exact_key() {
        let doc = ConfigDocument::new("frontend:\n  themes_extra: true\n");
        assert!(!doc.has_key("themes"));
    }

    #[test]
    fn has_child_value_tolerates_quotes_and_case() {
        for text in [
            "homeassistant:\n  name: Controll\n",
            "homeassistant:\n  name: \"Controll\"\n",
            "homeassistant:\n  unit_system: metric\n  name: 'controll'  # brand\n",
        ] {
            let doc = ConfigDocument::new(text);
            assert!(
                doc.has_child_value("homeassistant", "name", "Controll"),
                "no match in {text:?}"
            );
        }
        let doc = ConfigDocument::new("homeassistant:\n  name: Other\n");
        assert!(!doc.has_child_value("homeassistant", "name", "Controll"));
    }

    #[test]
    fn has_child_value_ignores_other_sections_and_deeper_levels() {
        let doc = ConfigDocument::new(
            "sensor:\n  - platform: template\n    name: Controll\nhomeassistant:\n  customize:\n    light.x:\n      name: Controll\n  unit_system: metric\n",
        );
        assert!(!doc.has_child_value("homeassistant", "name", "Controll"));
        assert!(doc.has_child_value("homeassistant", "unit_system", "metric"));
    }

    #[test]
    fn leading_bom_is_ignored_when_scanning() {
        let doc = ConfigDocument::new("\u{feff}homeassistant:\n  name: Home\n");
        assert!(doc.has_section("homeassistant"));
        assert!(doc.has_child_value("homeassistant", "name", "home"));
    }

    #[test]
    fn insert_after_bom_keeps_the_mark() {
        let mut doc = ConfigDocument::new("\u{feff}frontend:\n  extra_module_url: []\n");
        assert_eq!(
            doc.insert_under_section("frontend", "themes: x"),
            SectionInsert::Inserted
        );
        assert_eq!(
            doc.as_str(),
            "\u{feff}frontend:\n  themes: x\n  extra_module_url: []\n"
        );
    }

    #[test]
    fn append_block_to_empty_document_has_no_separator() {
        let mut doc = ConfigDocument::default();
        doc.append_block("frontend:\n  themes: x\n");
        assert_eq!(doc.as_str(), "frontend:\n  themes: x\n");
    }

    #[test]
    fn append_block_terminates_and_separates() {
        let mut doc = ConfigDocument::new("default_config:");
        doc.append_block("frontend:");
        assert_eq!(doc.as_str(), "default_config:\n\nfrontend:\n");
    }

    #[test]
    fn insert_under_section_uses_existing_indent() {
        let mut doc = ConfigDocument::new("frontend:\n    extra_module_url: []\nhttp:\n");
        let result = doc.insert_under_section("frontend", "themes: x");
        assert_eq!(result, SectionInsert::Inserted);
        assert_eq!(
            doc.as_str(),
            "frontend:\n    themes: x\n    extra_module_url: []\nhttp:\n"
        );
    }

    #[test]
    fn insert_under_empty_section_defaults_to_two_spaces() {
        let mut doc = ConfigDocument::new("frontend:\n# trailing comment\nhttp:\n");
        doc.insert_under_section("frontend", "themes: x");
        assert_eq!(doc.as_str(), "frontend:\n  themes: x\n# trailing comment\nhttp:\n");
    }

    #[test]
    fn insert_under_unterminated_last_line() {
        let mut doc = ConfigDocument::new("frontend:");
        doc.insert_under_section("frontend", "themes: x");
        assert_eq!(doc.as_str(), "frontend:\n  themes: x\n");
    }

    #[test]
    fn insert_keeps_crlf_line_endings() {
        let mut doc = ConfigDocument::new("frontend: # ui\r\nhttp:\r\n");
        doc.insert_under_section("frontend", "themes: x");
        assert_eq!(doc.as_str(), "frontend: # ui\r\n  themes: x\r\nhttp:\r\n");
    }

    #[test]
    fn insert_refuses_inline_value() {
        let mut doc = ConfigDocument::new("frontend: !include frontend.yaml\n");
        let before = doc.clone();
        assert_eq!(
            doc.insert_under_section("frontend", "themes: x"),
            SectionInsert::InlineValue
        );
        assert_eq!(doc, before);
    }

    #[test]
    fn insert_ignores_nested_header() {
        let mut doc = ConfigDocument::new("panel:\n  frontend:\n");
        assert_eq!(
            doc.insert_under_section("frontend", "themes: x"),
            SectionInsert::Missing
        );
    }
}
