//! A small element tree that the renderer draws into and the hover handler
//! mutates. Nodes live in an arena and are addressed by [`NodeId`]; removing a
//! node detaches it and frees its whole subtree. Freed slots are handed out
//! again, so an id must not be used after its node is removed.

use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

// Written as `<tag .../>` when they have no children.
const SELF_CLOSING: &[&str] = &["br", "path", "rect", "line", "circle", "polyline", "polygon"];

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    root: NodeId,
}

impl Document {
    pub fn new(root_tag: &str) -> Self {
        Self {
            nodes: vec![Some(Node {
                kind: NodeKind::Element {
                    tag: root_tag.to_string(),
                    attrs: Vec::new(),
                },
                parent: None,
                children: Vec::new(),
            })],
            free: Vec::new(),
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    fn alloc(&mut self, kind: NodeKind, parent: NodeId) -> NodeId {
        let node = Some(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                NodeId(slot)
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    /// Arena slots in use or free, i.e. the high-water mark of live nodes.
    #[cfg(test)]
    pub(crate) fn slots(&self) -> usize {
        self.nodes.len()
    }

    fn element_kind(tag: &str) -> NodeKind {
        NodeKind::Element {
            tag: tag.to_string(),
            attrs: Vec::new(),
        }
    }

    /// Appends a new element as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.alloc(Self::element_kind(tag), parent);
        if let Some(p) = self.node_mut(parent) {
            p.children.push(id);
        }
        id
    }

    /// Inserts a new element into `parent` just before `before`, or at the end
    /// if `before` is not one of its children.
    pub fn insert_before(&mut self, parent: NodeId, tag: &str, before: Option<NodeId>) -> NodeId {
        let id = self.alloc(Self::element_kind(tag), parent);
        if let Some(p) = self.node_mut(parent) {
            let at = before
                .and_then(|b| p.children.iter().position(|c| *c == b))
                .unwrap_or(p.children.len());
            p.children.insert(at, id);
        }
        id
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.alloc(NodeKind::Text(text.to_string()), parent);
        if let Some(p) = self.node_mut(parent) {
            p.children.push(id);
        }
        id
    }

    /// Sets (or replaces) an attribute. No-op on text or removed nodes.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> &mut Self {
        if let Some(Node {
            kind: NodeKind::Element { attrs, .. },
            ..
        }) = self.node_mut(id)
        {
            let value = value.into();
            match attrs.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value,
                None => attrs.push((name.to_string(), value)),
            }
        }
        self
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Detaches `id` from its parent and drops its subtree. Removing the root
    /// or an already removed node does nothing.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root || !self.contains(id) {
            return;
        }
        if let Some(parent) = self.parent(id) {
            if let Some(p) = self.node_mut(parent) {
                p.children.retain(|c| *c != id);
            }
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(next.0).and_then(Option::take) {
                self.free.push(next.0);
                stack.extend(node.children);
            }
        }
    }

    /// Live nodes under `id` (inclusive), in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.node(next) {
                out.push(next);
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    pub fn find_all<F>(&self, pred: F) -> Vec<NodeId>
    where
        F: Fn(&Self, NodeId) -> bool,
    {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| pred(self, *id))
            .collect()
    }

    pub fn element_by_id(&self, id_attr: &str) -> Option<NodeId> {
        self.find_all(|doc, n| doc.attr(n, "id") == Some(id_attr))
            .into_iter()
            .next()
    }

    pub fn elements_by_class(&self, class: &str) -> Vec<NodeId> {
        self.find_all(|doc, n| {
            doc.attr(n, "class")
                .is_some_and(|c| c.split_whitespace().any(|c| c == class))
        })
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.find_all(|doc, n| doc.tag(n) == Some(tag))
    }

    /// Concatenated text content of `id` and its descendants.
    pub fn text(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|n| match &self.node(n)?.kind {
                NodeKind::Text(t) => Some(t.as_str()),
                NodeKind::Element { .. } => None,
            })
            .collect()
    }

    /// Serializes `id` and its subtree.
    pub fn to_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(t) => out.push_str(&escape(t)),
            NodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (k, v) in attrs {
                    let _ = write!(out, " {}=\"{}\"", k, escape(v));
                }
                if node.children.is_empty() && SELF_CLOSING.contains(&tag.as_str()) {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for child in &node.children {
                    self.write_node(*child, out);
                }
                let _ = write!(out, "</{}>", tag);
            }
        }
    }
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_serializes_nested_elements() {
        let mut doc = Document::new("div");
        let root = doc.root();
        doc.set_attr(root, "id", "root");
        let h1 = doc.append(root, "h1");
        doc.append_text(h1, "Fish & <Chips>");
        let path = doc.append(root, "path");
        doc.set_attr(path, "d", "M0,0Z").set_attr(path, "fill", "#fff");

        assert_eq!(
            doc.to_markup(root),
            r##"<div id="root"><h1>Fish &amp; &lt;Chips&gt;</h1><path d="M0,0Z" fill="#fff"/></div>"##
        );
    }

    #[test]
    fn set_attr_replaces_existing_value() {
        let mut doc = Document::new("svg");
        let root = doc.root();
        doc.set_attr(root, "width", "1").set_attr(root, "width", "2");
        assert_eq!(doc.attr(root, "width"), Some("2"));
        assert_eq!(doc.to_markup(root), r#"<svg width="2"></svg>"#);
    }

    #[test]
    fn insert_before_orders_children() {
        let mut doc = Document::new("g");
        let root = doc.root();
        let tick = doc.append(root, "g");
        let rect = doc.insert_before(root, "rect", Some(tick));
        let last = doc.insert_before(root, "text", None);
        assert_eq!(doc.children(root), &[rect, tick, last]);
    }

    #[test]
    fn remove_drops_whole_subtree() {
        let mut doc = Document::new("div");
        let root = doc.root();
        let tooltip = doc.append(root, "div");
        doc.set_attr(tooltip, "id", "tooltip");
        let span = doc.append(tooltip, "span");
        let text = doc.append_text(span, "hello");

        doc.remove(tooltip);
        assert!(!doc.contains(tooltip));
        assert!(!doc.contains(span));
        assert!(!doc.contains(text));
        assert!(doc.children(root).is_empty());
        assert_eq!(doc.element_by_id("tooltip"), None);

        // removing twice, or the root, is harmless
        doc.remove(tooltip);
        doc.remove(root);
        assert!(doc.contains(root));
    }

    #[test]
    fn removed_slots_are_reused() {
        let mut doc = Document::new("div");
        let root = doc.root();
        let keep = doc.append(root, "h1");
        for _ in 0..50 {
            let tooltip = doc.append(root, "div");
            let span = doc.append(tooltip, "span");
            doc.append_text(span, "A, AL: 10%");
            doc.remove(tooltip);
        }
        assert_eq!(doc.slots(), 5);
        assert_eq!(doc.children(root), &[keep]);

        let fresh = doc.append(root, "p");
        doc.append_text(fresh, "x");
        assert_eq!(doc.slots(), 5);
        assert_eq!(doc.to_markup(root), "<div><h1></h1><p>x</p></div>");
    }

    #[test]
    fn queries_by_class_tag_and_text() {
        let mut doc = Document::new("svg");
        let root = doc.root();
        for _ in 0..3 {
            let p = doc.append(root, "path");
            doc.set_attr(p, "class", "county shape");
        }
        let t = doc.append(root, "text");
        doc.append_text(t, "50%");

        assert_eq!(doc.elements_by_class("county").len(), 3);
        assert_eq!(doc.elements_by_class("count").len(), 0);
        assert_eq!(doc.elements_by_tag("path").len(), 3);
        assert_eq!(doc.text(root), "50%");
    }
}
