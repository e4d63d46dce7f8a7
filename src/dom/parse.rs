use html5ever::tendril::TendrilSink;
use html5ever::{ParseOpts, parse_document};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use super::{Document, Element, NodeData, NodeId};

/// Parses an HTML document the way a browser would. Never fails: broken
/// markup is repaired by the parser and parse errors are ignored.
pub fn parse_html(html: &str) -> Document {
    let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);

    let mut doc = Document::new();
    let root = doc.root();
    for child in dom.document.children.borrow().iter() {
        if let Some(id) = convert(&mut doc, child) {
            doc.append(root, id);
        }
    }
    doc
}

fn convert(doc: &mut Document, handle: &Handle) -> Option<NodeId> {
    let data = match &handle.data {
        RcNodeData::Doctype { name, .. } => NodeData::Doctype(name.to_string()),
        RcNodeData::Text { contents } => NodeData::Text(contents.borrow().to_string()),
        RcNodeData::Comment { contents } => NodeData::Comment(contents.to_string()),
        RcNodeData::Element { name, attrs, .. } => NodeData::Element(Element {
            name: name.local.to_string(),
            attrs: attrs
                .borrow()
                .iter()
                .map(|a| (a.name.local.to_string(), a.value.to_string()))
                .collect(),
        }),
        RcNodeData::Document | RcNodeData::ProcessingInstruction { .. } => return None,
    };
    let id = doc.create(data);

    // <template> keeps its content in a separate fragment.
    let template_children = match &handle.data {
        RcNodeData::Element {
            template_contents, ..
        } => template_contents
            .borrow()
            .as_ref()
            .map(|fragment| fragment.children.borrow().clone()),
        _ => None,
    };
    let children = template_children.unwrap_or_else(|| handle.children.borrow().clone());

    for child in &children {
        if let Some(child_id) = convert(doc, child) {
            doc.append(id, child_id);
        }
    }
    Some(id)
}
