//! MathML namespace prefix lookup.

use crate::dom::Document;

/// The MathML namespace URI.
pub const MATHML_NAMESPACE: &str = "http://www.w3.org/1998/Math/MathML";

/// Prefix used when the document does not declare one.
pub const DEFAULT_PREFIX: &str = "mml";

const XMLNS_DECLARATION: &str = "xmlns:";

/// Find the prefix the root element binds to the MathML namespace.
///
/// Attributes are scanned in document order and the first `xmlns:*`
/// declaration of the MathML URI wins. Falls back to [`DEFAULT_PREFIX`].
pub fn mathml_prefix(doc: &Document) -> String {
    doc.dom()
        .attrs(doc.root())
        .iter()
        .find_map(|attr| {
            let name = attr.qualified_name();
            match name.strip_prefix(XMLNS_DECLARATION) {
                Some(prefix) if attr.value == MATHML_NAMESPACE => Some(prefix.to_string()),
                _ => None,
            }
        })
        .unwrap_or_else(|| DEFAULT_PREFIX.to_string())
}
