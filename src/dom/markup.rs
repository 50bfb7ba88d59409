//! Markup reader and serializer.
//!
//! A forgiving HTML subset, enough for templates: elements with quoted,
//! unquoted or bare attributes, void elements, comments, doctype (skipped),
//! raw-text `script`/`style`, and the common character references.
//! Tags are closed by name; a stray end tag closes up to the nearest matching
//! open element, and anything still open at the end is closed implicitly.

use super::document::{
    self, append_child, create_comment, create_element, create_fragment, create_text, NodeId,
    NodeKind,
};
use crate::error::{Error, Result};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

// =============================================================================
// Reading
// =============================================================================

/// Parse markup into a new fragment.
pub fn parse_html(src: &str) -> Result<NodeId> {
    let fragment = create_fragment();
    let mut reader = Reader { src, pos: 0 };
    let mut stack = vec![(fragment, String::new())];

    while reader.pos < src.len() {
        let current = stack.last().map_or(fragment, |(node, _)| *node);
        let rest = reader.rest();

        if rest.starts_with("<!--") {
            let end = rest[4..]
                .find("-->")
                .ok_or_else(|| reader.error("unterminated comment"))?;
            append_child(current, create_comment(&rest[4..4 + end]))?;
            reader.pos += 4 + end + 3;
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            let end = rest.find('>').ok_or_else(|| reader.error("unterminated declaration"))?;
            reader.pos += end + 1;
        } else if let Some(after) = rest.strip_prefix("</") {
            let end = after.find('>').ok_or_else(|| reader.error("unterminated end tag"))?;
            let name = after[..end].trim().to_ascii_lowercase();
            if let Some(depth) = stack.iter().rposition(|(_, tag)| *tag == name) {
                if depth > 0 {
                    stack.truncate(depth);
                }
            }
            reader.pos += 2 + end + 1;
        } else if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            let (element, tag, self_closing) = reader.start_tag()?;
            append_child(current, element)?;
            if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
                let body = reader.rest();
                let close = format!("</{tag}");
                let end = find_ascii_case_insensitive(body, &close).unwrap_or(body.len());
                if end > 0 {
                    append_child(element, create_text(&body[..end]))?;
                }
                reader.pos += end;
                let body = reader.rest();
                reader.pos += body.find('>').map_or(body.len(), |i| i + 1);
            } else if !self_closing && !VOID_ELEMENTS.contains(&tag.as_str()) {
                stack.push((element, tag));
            }
        } else {
            let end = text_end(rest);
            append_child(current, create_text(&decode_entities(&rest[..end])))?;
            reader.pos += end;
        }
    }

    Ok(fragment)
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn error(&self, message: &str) -> Error {
        Error::Markup {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn name(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '>' | '/' | '='))
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    /// Read `<tag attr=...>`. Returns the element, its tag and whether it
    /// ended with `/>`.
    fn start_tag(&mut self) -> Result<(NodeId, String, bool)> {
        self.pos += 1;
        let tag = self.name().to_ascii_lowercase();
        let element = create_element(&tag);

        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(self.error("unterminated start tag"));
            }
            if let Some(after) = rest.strip_prefix("/>") {
                self.pos = self.src.len() - after.len();
                return Ok((element, tag, true));
            }
            if rest.starts_with('>') {
                self.pos += 1;
                return Ok((element, tag, false));
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }

            let name = self.name();
            if name.is_empty() {
                return Err(self.error("expected attribute name"));
            }
            self.skip_whitespace();
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                self.attribute_value()?
            } else {
                String::new()
            };
            document::set_attribute(element, name, &value)?;
        }
    }

    fn attribute_value(&mut self) -> Result<String> {
        let rest = self.rest();
        match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let end = rest[1..]
                    .find(quote)
                    .ok_or_else(|| self.error("unterminated attribute value"))?;
                self.pos += end + 2;
                Ok(decode_entities(&rest[1..1 + end]))
            }
            _ => {
                let len = rest
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                self.pos += len;
                Ok(decode_entities(&rest[..len]))
            }
        }
    }
}

/// End of a text run: the first `<` that opens a tag, comment or declaration.
/// A `<` followed by anything else is literal text.
fn text_end(rest: &str) -> usize {
    rest.match_indices('<')
        .map(|(i, _)| i)
        .filter(|&i| i > 0)
        .find(|&i| {
            rest[i + 1..]
                .starts_with(|c: char| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'))
        })
        .unwrap_or(rest.len())
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}

/// Replace character references. Unknown references are kept verbatim.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
            let name = &rest[1..end];
            let c = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => name.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                        None => num.parse().ok()?,
                    };
                    char::from_u32(code)
                }),
            }?;
            Some((c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

// =============================================================================
// Writing
// =============================================================================

/// Serialize `node` and its subtree.
pub fn to_html(node: NodeId) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

/// Serialize the children of `node`.
pub fn inner_html(node: NodeId) -> String {
    let mut out = String::new();
    for child in document::children(node) {
        write_node(child, &mut out);
    }
    out
}

fn write_node(node: NodeId, out: &mut String) {
    match document::kind(node) {
        Some(NodeKind::Text) => {
            let text = document::text(node);
            let raw = document::parent(node)
                .and_then(document::tag_name)
                .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag.as_str()));
            if raw {
                out.push_str(&text);
            } else {
                escape_into(&text, false, out);
            }
        }
        Some(NodeKind::Comment) => {
            out.push_str("<!--");
            out.push_str(&document::text(node));
            out.push_str("-->");
        }
        Some(NodeKind::Fragment) => {
            for child in document::children(node) {
                write_node(child, out);
            }
        }
        Some(NodeKind::Element) => {
            let tag = document::tag_name(node).unwrap_or_default();
            out.push('<');
            out.push_str(&tag);
            for (name, value) in document::attributes(node) {
                out.push(' ');
                out.push_str(&name);
                if !value.is_empty() {
                    out.push_str("=\"");
                    escape_into(&value, true, out);
                    out.push('"');
                }
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }
            for child in document::children(node) {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&tag);
            out.push('>');
        }
        None => {}
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{children, get_attribute, reset_document, tag_name, text_content};

    #[test]
    fn test_parse_nested_elements_and_attributes() {
        reset_document();
        let root = parse_html(r#"<div id="app" class=box hidden><p>Hi <b>there</b></p></div>"#).unwrap();
        let div = children(root)[0];
        assert_eq!(tag_name(div).as_deref(), Some("div"));
        assert_eq!(get_attribute(div, "id").as_deref(), Some("app"));
        assert_eq!(get_attribute(div, "class").as_deref(), Some("box"));
        assert_eq!(get_attribute(div, "hidden").as_deref(), Some(""));
        assert_eq!(text_content(div), "Hi there");
    }

    #[test]
    fn test_void_and_self_closing() {
        reset_document();
        let root = parse_html("<p><input model='name'><br/>after</p>").unwrap();
        let p = children(root)[0];
        assert_eq!(children(p).len(), 3);
        assert_eq!(inner_html(p), "<input model=\"name\"><br>after");
    }

    #[test]
    fn test_script_is_raw_text() {
        reset_document();
        let root = parse_html("<script>if (a < b) { x = '</p>' }</script><p>ok</p>").unwrap();
        let nodes = children(root);
        assert_eq!(nodes.len(), 2);
        assert_eq!(text_content(nodes[0]), "if (a < b) { x = '</p>' }");
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        reset_document();
        let root = parse_html("<p>{{ a < b ? 'x' : 'y' }}</p>").unwrap();
        assert_eq!(text_content(root), "{{ a < b ? 'x' : 'y' }}");
    }

    #[test]
    fn test_comments_doctype_and_entities() {
        reset_document();
        let root = parse_html("<!DOCTYPE html><!-- note --><p title=\"a &amp; b\">&lt;tag&gt; &#65;&#x42; &bogus;</p>").unwrap();
        let nodes = children(root);
        assert_eq!(nodes.len(), 2);
        assert_eq!(to_html(nodes[0]), "<!-- note -->");
        assert_eq!(text_content(nodes[1]), "<tag> AB &bogus;");
        assert_eq!(to_html(nodes[1]), "<p title=\"a &amp; b\">&lt;tag&gt; AB &amp;bogus;</p>");
    }

    #[test]
    fn test_unbalanced_markup() {
        reset_document();
        let root = parse_html("<div><span>a</div>b</em>").unwrap();
        assert_eq!(inner_html(root), "<div><span>a</span></div>b");
        assert!(parse_html("<div id=\"x").is_err());
    }
}
