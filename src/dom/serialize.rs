use super::{Document, NodeData, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

impl Document {
    /// Markup of `id` including its own tags.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, false, &mut out);
        out
    }

    /// Markup of the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let raw = self.element(id).is_some_and(|el| RAW_TEXT_ELEMENTS.contains(&el.name.as_str()));
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(child, raw, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, raw_text: bool, out: &mut String) {
        match &self.node(id).data {
            NodeData::Document => {
                for &child in self.children(id) {
                    self.write_node(child, false, out);
                }
            }
            NodeData::Doctype(name) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(name);
                out.push('>');
            }
            NodeData::Text(text) if raw_text => out.push_str(text),
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Element(el) => {
                out.push('<');
                out.push_str(&el.name);
                for (name, value) in &el.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&el.name.as_str()) {
                    return;
                }
                out.push_str(&self.inner_html(id));
                out.push_str("</");
                out.push_str(&el.name);
                out.push('>');
            }
        }
    }
}
