//! Arena-allocated document tree.
//!
//! html5ever parses into this tree through [`super::tree_sink::DomSink`].
//! Nodes live in one vector and link to each other by index, so moving a
//! subtree is a matter of rewriting a handful of links.

use html5ever::{LocalName, QualName, ns};

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel for "no node".
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

/// Payload of a node.
#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
        /// Pre-split `class` attribute.
        classes: Vec<String>,
    },
    Text(String),
    Comment(String),
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
}

/// Element attribute, in source order.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

impl Attribute {
    /// Attribute name as written in the source, e.g. `xmlns:m`.
    pub fn qualified_name(&self) -> String {
        match &self.name.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.name.local),
            None => self.name.local.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

fn split_classes(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

/// Arena DOM.
///
/// Detached nodes stay allocated until the arena is dropped; a conversion
/// only ever detaches a handful of nodes, so there is no free list.
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
    document: NodeId,
}

impl Dom {
    /// Create an empty tree holding only the document node.
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            document: NodeId::NONE,
        };
        dom.document = dom.alloc(Node::new(NodeData::Document));
        dom
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        let classes = attrs
            .iter()
            .find(|a| a.name.ns == ns!() && a.name.local.as_ref() == "class")
            .map(|a| split_classes(&a.value))
            .unwrap_or_default();

        self.alloc(Node::new(NodeData::Element {
            name,
            attrs,
            classes,
        }))
    }

    pub fn create_text(&mut self, text: String) -> NodeId {
        self.alloc(Node::new(NodeData::Text(text)))
    }

    pub fn create_comment(&mut self, text: String) -> NodeId {
        self.alloc(Node::new(NodeData::Comment(text)))
    }

    pub fn create_doctype(&mut self, name: String, public_id: String, system_id: String) -> NodeId {
        self.alloc(Node::new(NodeData::Doctype {
            name,
            public_id,
            system_id,
        }))
    }

    /// Append `child` as the last child of `parent`.
    ///
    /// `child` must already be detached.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(NodeId::NONE);

        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = parent;
            child_node.prev_sibling = last_child;
            child_node.next_sibling = NodeId::NONE;
        }

        if let Some(last_node) = self.get_mut(last_child) {
            last_node.next_sibling = child;
        }

        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Insert `new_node` immediately before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        let (parent, prev) = match self.get(sibling) {
            Some(n) => (n.parent, n.prev_sibling),
            None => return,
        };

        if let Some(new) = self.get_mut(new_node) {
            new.parent = parent;
            new.prev_sibling = prev;
            new.next_sibling = sibling;
        }

        if let Some(sib) = self.get_mut(sibling) {
            sib.prev_sibling = new_node;
        }

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = new_node;
        }
    }

    /// Append text, merging into a trailing text node when there is one.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(NodeId::NONE);

        if let Some(last) = self.get_mut(last_child)
            && let NodeData::Text(existing) = &mut last.data
        {
            existing.push_str(text);
            return;
        }

        let text_node = self.create_text(text.to_string());
        self.append(parent, text_node);
    }

    /// Unlink a node from its parent and siblings. The subtree below it
    /// stays intact.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = match self.get(id) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = next;
        }

        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.last_child = prev;
        }

        if let Some(node) = self.get_mut(id) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    /// Detach every child of `parent`.
    pub fn clear_children(&mut self, parent: NodeId) {
        let children: Vec<_> = self.children(parent).collect();
        for child in children {
            self.detach(child);
        }
    }

    /// Deep-copy the subtree rooted at `id` in `other` into this arena.
    ///
    /// The copy is returned detached.
    pub fn import(&mut self, other: &Dom, id: NodeId) -> NodeId {
        let Some(node) = other.get(id) else {
            return NodeId::NONE;
        };
        let copy = self.alloc(Node::new(node.data.clone()));
        for child in other.children(id) {
            let child_copy = self.import(other, child);
            self.append(copy, child_copy);
        }
        copy
    }

    pub fn children(&self, parent: NodeId) -> Children<'_> {
        let first = self
            .get(parent)
            .map(|n| n.first_child)
            .unwrap_or(NodeId::NONE);
        Children {
            dom: self,
            current: first,
        }
    }

    /// All nodes below `root` in document order, `root` excluded.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).collect();
        stack.reverse();
        while let Some(id) = stack.pop() {
            out.push(id);
            let mark = stack.len();
            stack.extend(self.children(id));
            stack[mark..].reverse();
        }
        out
    }

    /// First node below the document matching `predicate` (document order).
    pub fn find<F>(&self, predicate: F) -> Option<NodeId>
    where
        F: Fn(&Node) -> bool,
    {
        self.descendants(self.document)
            .into_iter()
            .find(|&id| self.get(id).is_some_and(&predicate))
    }

    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.find(|node| match &node.data {
            NodeData::Element { name, .. } => name.local.as_ref() == tag,
            _ => false,
        })
    }

    /// Every element below `root` with the given local name, in document order.
    pub fn elements_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&id| self.element_name(id).is_some_and(|n| n.as_ref() == tag))
            .collect()
    }

    /// Every element below `root` carrying `class`, in document order.
    pub fn elements_by_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&id| self.has_class(id, class))
            .collect()
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Children<'a> {
    dom: &'a Dom,
    current: NodeId,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self
            .dom
            .get(id)
            .map(|n| n.next_sibling)
            .unwrap_or(NodeId::NONE);
        Some(id)
    }
}

/// Element accessors.
impl Dom {
    pub fn element_name(&self, id: NodeId) -> Option<&LocalName> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(&name.local),
            _ => None,
        })
    }

    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Element { attrs, .. }) => attrs.as_slice(),
            _ => &[],
        }
    }

    /// Value of a no-namespace attribute.
    pub fn get_attr(&self, id: NodeId, attr_name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|a| a.name.ns == ns!() && a.name.local.as_ref() == attr_name)
            .map(|a| a.value.as_str())
    }

    /// Set a no-namespace attribute, appending it when absent.
    pub fn set_attr(&mut self, id: NodeId, attr_name: &str, value: &str) {
        let Some(NodeData::Element { attrs, classes, .. }) = self.get_mut(id).map(|n| &mut n.data)
        else {
            return;
        };

        if attr_name == "class" {
            *classes = split_classes(value);
        }

        match attrs
            .iter_mut()
            .find(|a| a.name.ns == ns!() && a.name.local.as_ref() == attr_name)
        {
            Some(attr) => attr.value = value.to_string(),
            None => attrs.push(Attribute {
                name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                value: value.to_string(),
            }),
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        matches!(
            self.get(id).map(|n| &n.data),
            Some(NodeData::Element { classes, .. }) if classes.iter().any(|c| c == class)
        )
    }

    pub fn text_content(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qname(local: &str) -> QualName {
        QualName::new(None, ns!(html), LocalName::from(local))
    }

    fn attr(name: &str, value: &str) -> Attribute {
        Attribute {
            name: QualName::new(None, ns!(), LocalName::from(name)),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_append_children() {
        let mut dom = Dom::new();

        let parent = dom.create_element(qname("div"), vec![]);
        let child1 = dom.create_element(qname("p"), vec![]);
        let child2 = dom.create_element(qname("p"), vec![]);

        dom.append(dom.document(), parent);
        dom.append(parent, child1);
        dom.append(parent, child2);

        let children: Vec<_> = dom.children(parent).collect();
        assert_eq!(children, vec![child1, child2]);
    }

    #[test]
    fn test_text_merging() {
        let mut dom = Dom::new();

        let p = dom.create_element(qname("p"), vec![]);
        dom.append(dom.document(), p);

        dom.append_text(p, "Hello, ");
        dom.append_text(p, "World!");

        let children: Vec<_> = dom.children(p).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(dom.text_content(children[0]), Some("Hello, World!"));
    }

    #[test]
    fn test_detach_middle_child() {
        let mut dom = Dom::new();
        let parent = dom.create_element(qname("div"), vec![]);
        let a = dom.create_element(qname("a"), vec![]);
        let b = dom.create_element(qname("b"), vec![]);
        let c = dom.create_element(qname("i"), vec![]);
        dom.append(dom.document(), parent);
        dom.append(parent, a);
        dom.append(parent, b);
        dom.append(parent, c);

        dom.detach(b);

        assert_eq!(dom.children(parent).collect::<Vec<_>>(), vec![a, c]);
        assert!(dom.get(b).unwrap().parent.is_none());

        dom.detach(a);
        dom.detach(c);
        assert!(dom.children(parent).next().is_none());
        assert!(dom.get(parent).unwrap().last_child.is_none());
    }

    #[test]
    fn test_moved_node_goes_last() {
        let mut dom = Dom::new();
        let head = dom.create_element(qname("head"), vec![]);
        let body = dom.create_element(qname("body"), vec![]);
        let title = dom.create_element(qname("title"), vec![]);
        let defs = dom.create_element(qname("div"), vec![]);
        dom.append(head, title);
        dom.append(body, defs);

        dom.detach(defs);
        dom.append(head, defs);

        assert_eq!(dom.children(head).collect::<Vec<_>>(), vec![title, defs]);
        assert!(dom.children(body).next().is_none());
    }

    #[test]
    fn test_descendants_document_order() {
        let mut dom = Dom::new();
        let root = dom.create_element(qname("div"), vec![]);
        let p1 = dom.create_element(qname("p"), vec![]);
        let span = dom.create_element(qname("span"), vec![]);
        let p2 = dom.create_element(qname("p"), vec![]);
        dom.append(dom.document(), root);
        dom.append(root, p1);
        dom.append(p1, span);
        dom.append(root, p2);

        assert_eq!(dom.descendants(dom.document()), vec![root, p1, span, p2]);
        assert_eq!(dom.elements_by_tag(root, "p"), vec![p1, p2]);
    }

    #[test]
    fn test_import_copies_subtree() {
        let mut src = Dom::new();
        let div = src.create_element(qname("div"), vec![attr("class", "a b")]);
        src.append(src.document(), div);
        src.append_text(div, "x");

        let mut dst = Dom::new();
        let copy = dst.import(&src, div);
        dst.append(dst.document(), copy);

        assert!(dst.has_class(copy, "b"));
        let text = dst.children(copy).next().unwrap();
        assert_eq!(dst.text_content(text), Some("x"));
    }

    #[test]
    fn test_set_attr_updates_classes() {
        let mut dom = Dom::new();
        let img = dom.create_element(qname("img"), vec![attr("src", "data:,")]);

        dom.set_attr(img, "src", "eq0001.svg");
        dom.set_attr(img, "class", "marked");

        assert_eq!(dom.get_attr(img, "src"), Some("eq0001.svg"));
        assert!(dom.has_class(img, "marked"));
        assert_eq!(dom.attrs(img).len(), 2);
    }
}
