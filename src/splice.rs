//! Splicing typesetter output back into the page.

use crate::dom::{self, Document, NodeId};

/// `src` substring identifying the typesetter's own loader scripts.
pub const BOOTSTRAP_SCRIPT_MARKER: &str = "MathJax";

/// `type` of inline typesetter configuration blocks.
pub const CONFIG_SCRIPT_TYPE: &str = "text/x-mathjax-config";

/// Replace the body with `result_html`, move the leading definitions node
/// into `<head>` and drop scripts that only matter to a live page.
#[tracing::instrument(skip_all, fields(bytes = result_html.len()))]
pub fn splice(mut doc: Document, result_html: &str) -> Document {
    replace_body(&mut doc, result_html);
    hoist_definitions(&mut doc);
    let removed = remove_bootstrap_scripts(&mut doc);
    tracing::debug!(removed, "bootstrap scripts removed");
    doc
}

fn replace_body(doc: &mut Document, html: &str) {
    let body = doc.body();
    let (fragment, fragment_body) = dom::parse_body_fragment(html);

    let dom = doc.dom_mut();
    dom.clear_children(body);
    for child in fragment.children(fragment_body) {
        let copy = dom.import(&fragment, child);
        dom.append(body, copy);
    }
}

/// The typesetter always puts its shared glyph definitions first.
fn hoist_definitions(doc: &mut Document) {
    let (head, body) = (doc.head(), doc.body());
    let dom = doc.dom_mut();
    let Some(first) = dom.children(body).next() else {
        return;
    };
    dom.detach(first);
    dom.append(head, first);
}

/// Whether a `<script>` element is a typesetter loader or config block.
pub fn is_bootstrap_script(doc: &Document, script: NodeId) -> bool {
    let dom = doc.dom();
    let loader = dom
        .get_attr(script, "src")
        .is_some_and(|src| src.contains(BOOTSTRAP_SCRIPT_MARKER));
    let config = dom.get_attr(script, "type") == Some(CONFIG_SCRIPT_TYPE);
    loader || config
}

fn remove_bootstrap_scripts(doc: &mut Document) -> usize {
    let doomed: Vec<NodeId> = doc
        .dom()
        .elements_by_tag(doc.dom().document(), "script")
        .into_iter()
        .filter(|&id| is_bootstrap_script(doc, id))
        .collect();

    for &script in &doomed {
        doc.dom_mut().detach(script);
    }
    doomed.len()
}
