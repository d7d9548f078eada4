//! HTML serialization of a document subtree (string mode).

use super::document::{Document, NodeId, NodeKind};
use crate::value::Value;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlOptions {
    /// Emit comment nodes (conditional and list markers, portal placeholders).
    pub markers: bool,
}

/// Serializes `id` and its subtree.
pub fn to_html(doc: &Document, id: NodeId, options: HtmlOptions) -> String {
    let mut out = String::new();
    write_node(doc, id, options, &mut out);
    out
}

/// Serializes the children of `id`, without the node itself.
pub fn inner_html(doc: &Document, id: NodeId, options: HtmlOptions) -> String {
    let mut out = String::new();
    for child in doc.children(id) {
        write_node(doc, *child, options, &mut out);
    }
    out
}

fn write_node(doc: &Document, id: NodeId, options: HtmlOptions, out: &mut String) {
    match doc.kind(id) {
        None => {}
        Some(NodeKind::Text(text)) => escape_into(text, false, out),
        Some(NodeKind::Comment(text)) => {
            if options.markers {
                out.push_str("<!--");
                out.push_str(&text.replace("--", "- -"));
                out.push_str("-->");
            }
        }
        Some(NodeKind::Element { tag }) => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in doc.attributes(id) {
                if is_live_property(name) && !doc.property(id, name).is_undefined() {
                    continue;
                }
                write_attribute(name, value, out);
            }
            write_properties(doc, id, out);
            out.push('>');
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }
            match doc.inner_html(id) {
                Some(html) => out.push_str(html),
                None => {
                    for child in doc.children(id) {
                        write_node(doc, *child, options, out);
                    }
                }
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn is_live_property(name: &str) -> bool {
    matches!(name, "value" | "checked")
}

/// Live `value`/`checked` state is reflected as attributes so the markup shows
/// what the user would see.
fn write_properties(doc: &Document, id: NodeId, out: &mut String) {
    match doc.property(id, "value") {
        Value::Undefined => {}
        value => write_attribute("value", &value.to_text(), out),
    }
    match doc.property(id, "checked") {
        Value::Undefined => {}
        checked => {
            if checked.is_truthy() {
                out.push_str(" checked");
            }
        }
    }
}

fn write_attribute(name: &str, value: &str, out: &mut String) {
    out.push(' ');
    out.push_str(name);
    if !value.is_empty() {
        out.push_str("=\"");
        escape_into(value, true, out);
        out.push('"');
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_text_and_attributes() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        doc.set_attribute(p, "title", "a \"quote\"");
        let text = doc.create_text("1 < 2 & 3");
        doc.append_child(p, text);
        assert_eq!(
            to_html(&doc, p, HtmlOptions::default()),
            "<p title=\"a &quot;quote&quot;\">1 &lt; 2 &amp; 3</p>"
        );
    }

    #[test]
    fn void_elements_and_live_properties() {
        let mut doc = Document::new();
        let input = doc.create_element("input");
        doc.set_attribute(input, "type", "checkbox");
        doc.set_property(input, "checked", Value::Bool(true));
        doc.set_property(input, "value", Value::from("on"));
        assert_eq!(
            to_html(&doc, input, HtmlOptions::default()),
            "<input type=\"checkbox\" value=\"on\" checked>"
        );
    }

    #[test]
    fn markers_are_opt_in() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let marker = doc.create_comment("if");
        doc.append_child(div, marker);
        assert_eq!(to_html(&doc, div, HtmlOptions::default()), "<div></div>");
        assert_eq!(
            to_html(&doc, div, HtmlOptions { markers: true }),
            "<div><!--if--></div>"
        );
    }
}
