//! Owned HTML tree.
//!
//! Nodes live in an arena (`Vec<Node>`) and refer to each other by
//! [`NodeId`]. Detached nodes stay in the arena but are unreachable from the
//! root; a document is short-lived so they are never reclaimed.

mod parse;
mod serialize;

pub use parse::parse_html;
pub use serialize::{escape_attr, escape_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Doctype(String),
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pub data: NodeData,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document: just the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Creates a detached node.
    pub fn create(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.create(NodeData::Element(Element {
            name: name.to_string(),
            attrs: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.create(NodeData::Text(text.to_string()))
    }

    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Puts `new` where `old` is in the tree and detaches `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        self.detach(new);
        let Some(parent) = self.nodes[old.0].parent.take() else {
            return;
        };
        let siblings = &mut self.nodes[parent.0].children;
        if let Some(slot) = siblings.iter_mut().find(|c| **c == old) {
            *slot = new;
        }
        self.nodes[new.0].parent = Some(parent);
    }

    /// Replaces an element with a new element called `new_name` that has
    /// the same attributes and children. Returns the id of the substitute.
    pub fn rename_element(&mut self, id: NodeId, new_name: &str) -> NodeId {
        let attrs = match &self.nodes[id.0].data {
            NodeData::Element(el) if el.name == new_name => return id,
            NodeData::Element(el) => el.attrs.clone(),
            _ => return id,
        };

        let substitute = self.create(NodeData::Element(Element {
            name: new_name.to_string(),
            attrs,
        }));
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for &child in &children {
            self.nodes[child.0].parent = Some(substitute);
        }
        self.nodes[substitute.0].children = children;
        self.replace(id, substitute);
        substitute
    }

    /// Deep-copies `id` from `other` into this document, detached.
    pub fn import(&mut self, other: &Document, id: NodeId) -> NodeId {
        let copy = self.create(other.node(id).data.clone());
        for &child in other.children(id) {
            let child_copy = self.import(other, child);
            self.append(copy, child_copy);
        }
        copy
    }

    /// Pre-order traversal of `id` and everything below it.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: vec![id],
        }
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId, name: &str) -> bool {
        self.element(id).is_some_and(|el| el.name == name)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(id) {
            match el.attrs.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => el.attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    /// True when the `class` attribute contains `token` as a whole word.
    pub fn has_class(&self, id: NodeId, token: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == token))
    }

    pub fn add_class(&mut self, id: NodeId, token: &str) {
        if self.element(id).is_none() || self.has_class(id, token) {
            return;
        }
        let value = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim_end(), token),
            _ => token.to_string(),
        };
        self.set_attr(id, "class", &value);
    }

    /// Elements below `id` (inclusive) whose class list contains `token`,
    /// in document order.
    pub fn elements_with_class(&self, id: NodeId, token: &str) -> Vec<NodeId> {
        self.descendants(id).filter(|&n| self.has_class(n, token)).collect()
    }

    pub fn elements_named(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(id).filter(|&n| self.is_element(n, name)).collect()
    }

    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter_map(|n| match &self.nodes[n.0].data {
                NodeData::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replaces all children of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        for child in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[child.0].parent = None;
        }
        let text = self.create_text(text);
        self.append(id, text);
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack.extend(self.doc.children(id).iter().rev());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        parse_html("<body><section class='slide intro' id=s1><h1>A</h1><p class=next>b</p></section><div class=slider>x</div></body>")
    }

    #[test]
    fn test_class_tokens_are_whole_words() {
        let doc = sample();
        let slides = doc.elements_with_class(doc.root(), "slide");
        assert_eq!(slides.len(), 1);
        assert_eq!(doc.attr(slides[0], "id"), Some("s1"));
    }

    #[test]
    fn test_rename_keeps_position_attributes_and_children() {
        let mut doc = sample();
        let section = doc.elements_named(doc.root(), "section")[0];
        let parent = doc.parent(section).unwrap();
        let index = doc.children(parent).iter().position(|&c| c == section).unwrap();

        let div = doc.rename_element(section, "div");

        assert_ne!(div, section);
        assert_eq!(doc.children(parent)[index], div);
        assert_eq!(doc.parent(section), None);
        assert_eq!(doc.attr(div, "class"), Some("slide intro"));
        assert_eq!(doc.text_content(div), "Ab");
        assert!(doc.elements_named(doc.root(), "section").is_empty());
        let p = doc.elements_with_class(div, "next")[0];
        assert_eq!(doc.parent(p), Some(div));
    }

    #[test]
    fn test_add_class_appends_once() {
        let mut doc = sample();
        let slide = doc.elements_with_class(doc.root(), "slide")[0];
        doc.add_class(slide, "active");
        doc.add_class(slide, "active");
        assert_eq!(doc.attr(slide, "class"), Some("slide intro active"));
    }

    #[test]
    fn test_import_is_a_deep_copy() {
        let src = sample();
        let slide = src.elements_with_class(src.root(), "slide")[0];
        let mut dst = Document::new();
        let copy = dst.import(&src, slide);
        let root = dst.root();
        dst.append(root, copy);
        assert_eq!(dst.text_content(dst.root()), "Ab");
        assert_eq!(dst.elements_with_class(dst.root(), "next").len(), 1);
    }

    #[test]
    fn test_set_text_content() {
        let mut doc = parse_html("<style>a{}<!-- x --></style>");
        let style = doc.elements_named(doc.root(), "style")[0];
        doc.set_text_content(style, "b{}");
        assert_eq!(doc.text_content(style), "b{}");
    }
}
