//! HTML document model.
//!
//! Documents are parsed by html5ever into an arena tree ([`Dom`]) and
//! written back out with the HTML5 serializer in [`serialize`].
//!
//! # Example
//!
//! ```
//! use mathpage::dom::Document;
//!
//! let doc = Document::parse("<p>Hello</p>").unwrap();
//! assert_eq!(doc.body_html(), "<p>Hello</p>");
//! assert_eq!(
//!     doc.to_html_document(),
//!     "<!DOCTYPE html>\n<html><head></head><body><p>Hello</p></body></html>"
//! );
//! ```

mod arena;
pub mod serialize;
mod tree_sink;

pub use arena::{Attribute, Children, Dom, Node, NodeData, NodeId};
pub use tree_sink::DomSink;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;

use crate::error::{Error, Result};

/// Parse a complete HTML document into an arena tree.
///
/// Scripting is off, so `<noscript>` content is parsed as markup rather
/// than raw text.
pub fn parse_html(html: &str) -> Dom {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            scripting_enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };
    parse_document(DomSink::new(), opts)
        .from_utf8()
        .one(html.as_bytes())
        .into_dom()
}

/// Parse markup as `<body>` content.
///
/// Returns the tree and the id of the body whose children are the parsed
/// nodes.
pub fn parse_body_fragment(html: &str) -> (Dom, NodeId) {
    let wrapped = format!("<!DOCTYPE html><html><head></head><body>{html}</body></html>");
    let dom = parse_html(&wrapped);
    let body = dom.find_by_tag("body").unwrap_or(NodeId::NONE);
    (dom, body)
}

/// A parsed HTML document with its `html`, `head` and `body` located.
#[derive(Debug, Clone)]
pub struct Document {
    dom: Dom,
    root: NodeId,
    head: NodeId,
    body: NodeId,
}

impl Document {
    /// Parse document text. Malformed markup is repaired the way a browser
    /// would; only a document without a `body` (a frameset) is rejected.
    pub fn parse(html: &str) -> Result<Self> {
        let dom = parse_html(html);

        let root = dom
            .children(dom.document())
            .find(|&id| dom.element_name(id).is_some_and(|n| n.as_ref() == "html"))
            .ok_or_else(|| Error::MissingElement("html".to_string()))?;
        let head = child_element(&dom, root, "head")
            .ok_or_else(|| Error::MissingElement("head".to_string()))?;
        let body = child_element(&dom, root, "body")
            .ok_or_else(|| Error::MissingElement("body".to_string()))?;

        Ok(Self {
            dom,
            root,
            head,
            body,
        })
    }

    /// Parse raw bytes: UTF-8, else the `<meta charset>` label, else Windows-1252.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self> {
        let hint = crate::util::extract_meta_charset(bytes);
        let text = crate::util::decode_text(bytes, hint);
        Self::parse(&text)
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    /// The `html` element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Inner HTML of `body`.
    pub fn body_html(&self) -> String {
        serialize::inner_html(&self.dom, self.body)
    }

    /// Inner HTML of `head`.
    pub fn head_html(&self) -> String {
        serialize::inner_html(&self.dom, self.head)
    }

    /// Outer HTML of the root element.
    pub fn outer_html(&self) -> String {
        serialize::outer_html(&self.dom, self.root)
    }

    /// Final document text: a literal HTML5 doctype line followed by the
    /// root element's outer HTML with leading whitespace removed.
    pub fn to_html_document(&self) -> String {
        let html = self.outer_html();
        format!("<!DOCTYPE html>\n{}", html.trim_start())
    }
}

fn child_element(dom: &Dom, parent: NodeId, tag: &str) -> Option<NodeId> {
    dom.children(parent)
        .find(|&id| dom.element_name(id).is_some_and(|n| n.as_ref() == tag))
}
