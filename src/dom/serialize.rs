//! HTML5 serialization of a [`Dom`] subtree.
//!
//! Follows the HTML fragment serialization algorithm: no self-closing
//! syntax, void elements without end tags, and raw-text elements written
//! verbatim.

use html5ever::{Namespace, QualName, ns};

use super::arena::{Attribute, Dom, NodeData, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style",
    "script",
    "xmp",
    "iframe",
    "noembed",
    "noframes",
    "plaintext",
];

/// Serialize `id` and its subtree (outer HTML).
pub fn outer_html(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    write_node(dom, id, &mut out);
    out
}

/// Serialize the children of `id` (inner HTML).
pub fn inner_html(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    for child in dom.children(id) {
        write_node(dom, child, &mut out);
    }
    out
}

fn write_node(dom: &Dom, id: NodeId, out: &mut String) {
    let Some(node) = dom.get(id) else {
        return;
    };

    match &node.data {
        NodeData::Document => {
            for child in dom.children(id) {
                write_node(dom, child, out);
            }
        }
        NodeData::Element { name, attrs, .. } => {
            let tag = tag_name(name);
            out.push('<');
            out.push_str(&tag);
            for attr in attrs {
                out.push(' ');
                out.push_str(&attr_name(attr));
                out.push_str("=\"");
                escape_into(&attr.value, true, out);
                out.push('"');
            }
            out.push('>');

            if name.ns == ns!(html) && VOID_ELEMENTS.contains(&name.local.as_ref()) {
                return;
            }

            for child in dom.children(id) {
                write_node(dom, child, out);
            }

            out.push_str("</");
            out.push_str(&tag);
            out.push('>');
        }
        NodeData::Text(text) => {
            if is_raw_text_parent(dom, node.parent) {
                out.push_str(text);
            } else {
                escape_into(text, false, out);
            }
        }
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::Doctype { name, .. } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        }
    }
}

fn is_raw_text_parent(dom: &Dom, parent: NodeId) -> bool {
    match dom.get(parent).map(|n| &n.data) {
        Some(NodeData::Element { name, .. }) => {
            name.ns == ns!(html) && RAW_TEXT_ELEMENTS.contains(&name.local.as_ref())
        }
        _ => false,
    }
}

fn tag_name(name: &QualName) -> String {
    let known: [Namespace; 3] = [ns!(html), ns!(mathml), ns!(svg)];
    match &name.prefix {
        Some(prefix) if !known.contains(&name.ns) => format!("{}:{}", prefix, name.local),
        _ => name.local.to_string(),
    }
}

fn attr_name(attr: &Attribute) -> String {
    let local = &attr.name.local;
    if attr.name.ns == ns!() {
        local.to_string()
    } else if attr.name.ns == ns!(xml) {
        format!("xml:{local}")
    } else if attr.name.ns == ns!(xmlns) {
        if local.as_ref() == "xmlns" {
            "xmlns".to_string()
        } else {
            format!("xmlns:{local}")
        }
    } else if attr.name.ns == ns!(xlink) {
        format!("xlink:{local}")
    } else {
        attr.qualified_name()
    }
}

/// Escape text (`& < >` and NBSP) or attribute values (`& "` and NBSP).
pub fn escape_into(s: &str, attr_mode: bool, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attr_mode => out.push_str("&quot;"),
            '<' if !attr_mode => out.push_str("&lt;"),
            '>' if !attr_mode => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}
