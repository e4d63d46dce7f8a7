//! Merging of a slide deck and a transcript into one annotated sequence.
//!
//! Slides and transcript blocks are paired by position only: slide `i` is
//! followed by transcript block `i`, and whichever side runs out first is
//! simply skipped from then on.

use std::collections::HashSet;

use crate::css::{self, SLIDES_SCOPE, ScopedSheet};
use crate::dom::{Document, NodeId, parse_html};
use crate::url::{rebase, resolve};

pub const PLACEHOLDER_SLIDES: &str = "<div class=slide>(No slides yet)</div>";
pub const EMPTY_TRANSCRIPT: &str = "<html>";

const SLIDE_CLASS: &str = "slide";
const REVEAL_CLASS: &str = "next";
const ACTIVE_CLASS: &str = "active";
const SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideNode {
    pub node: NodeId,
    pub id: String,
    /// "Slide i of N".
    pub label: String,
    pub index: usize,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscriptBlock {
    pub node: NodeId,
}

/// A slide deck parsed and prepared for merging: links rebased, slides
/// annotated, style sheets scoped under `#slides`.
#[derive(Debug, Clone)]
pub struct SlideDeck {
    doc: Document,
    pub slides: Vec<SlideNode>,
    styles: Vec<NodeId>,
}

impl SlideDeck {
    pub fn parse(html: &str, source_url: &str, asset_base: &str) -> Self {
        let mut doc = parse_html(html);
        rebase_links(&mut doc, source_url, asset_base);

        for section in doc.elements_named(doc.root(), "section") {
            if doc.has_class(section, SLIDE_CLASS) {
                doc.rename_element(section, "div");
            }
        }

        let nodes = top_level_slides(&doc);
        let slides = annotate_slides(&mut doc, &nodes);

        let styles = doc.elements_named(doc.root(), "style");
        let style_base = resolve(source_url, asset_base);
        for &style in &styles {
            let raw = css::extract_rules(&doc.text_content(style));
            let mut sheet = ScopedSheet::from_raw(&raw);
            sheet.scope(SLIDES_SCOPE, &style_base);
            doc.set_text_content(style, &format!("\n{}\n", sheet.to_css()));
        }

        Self { doc, slides, styles }
    }

    /// The rewritten `<style>` elements, ready to go in the page head.
    pub fn style_elements(&self) -> Vec<String> {
        self.styles.iter().map(|&s| self.doc.outer_html(s)).collect()
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }
}

#[derive(Debug, Clone)]
pub struct Transcript {
    doc: Document,
    pub blocks: Vec<TranscriptBlock>,
}

impl Transcript {
    /// The blocks are the `div` children of `body`; one per slide.
    pub fn parse(html: &str, source_url: &str, asset_base: &str) -> Self {
        let mut doc = parse_html(html);
        rebase_links(&mut doc, source_url, asset_base);

        let blocks = doc
            .elements_named(doc.root(), "body")
            .first()
            .map(|&body| {
                doc.children(body)
                    .iter()
                    .copied()
                    .filter(|&c| doc.is_element(c, "div"))
                    .map(|node| TranscriptBlock { node })
                    .collect()
            })
            .unwrap_or_default();

        Self { doc, blocks }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergedItem {
    Slide(usize),
    Transcript(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    /// Position within [`MergedDocument::slides`].
    Slide(usize),
    /// An incremental reveal step inside the most recent slide.
    Reveal,
}

/// One addressable step of the presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncElement {
    pub kind: SyncKind,
    pub id: Option<String>,
    pub label: Option<String>,
}

impl SyncElement {
    pub fn is_slide(&self) -> bool {
        matches!(self.kind, SyncKind::Slide(_))
    }
}

#[derive(Debug, Clone)]
pub struct MergedDocument {
    fragment: Document,
    pub order: Vec<MergedItem>,
    pub slides: Vec<SlideNode>,
    pub sync_elements: Vec<SyncElement>,
    pub styles: Vec<String>,
}

impl MergedDocument {
    /// Markup of the merged sequence, separators included.
    pub fn to_html(&self) -> String {
        self.fragment.inner_html(self.fragment.root())
    }

    pub fn first_slide(&self) -> Option<&SlideNode> {
        self.slides.first()
    }
}

/// Interleaves slides and transcript blocks: slide 0, block 0, slide 1,
/// block 1, ... Each item is followed by a blank-line separator.
pub fn merge(deck: &SlideDeck, transcript: &Transcript) -> MergedDocument {
    let mut fragment = Document::new();
    let root = fragment.root();
    let mut order = Vec::with_capacity(deck.slides.len() + transcript.blocks.len());
    let mut slides = Vec::with_capacity(deck.slides.len());
    let mut sync_elements = Vec::new();

    let mut i = 0;
    while i < deck.slides.len() || i < transcript.blocks.len() {
        if let Some(slide) = deck.slides.get(i) {
            let copy = fragment.import(deck.document(), slide.node);
            fragment.append(root, copy);
            append_separator(&mut fragment);
            order.push(MergedItem::Slide(i));

            sync_elements.push(SyncElement {
                kind: SyncKind::Slide(i),
                id: Some(slide.id.clone()),
                label: Some(slide.label.clone()),
            });
            let reveals = fragment.elements_with_class(copy, REVEAL_CLASS);
            for reveal in reveals.into_iter().filter(|&n| n != copy) {
                sync_elements.push(SyncElement {
                    kind: SyncKind::Reveal,
                    id: fragment.attr(reveal, "id").map(str::to_string),
                    label: fragment.attr(reveal, "aria-label").map(str::to_string),
                });
            }
            slides.push(SlideNode {
                node: copy,
                ..slide.clone()
            });
        }
        if let Some(block) = transcript.blocks.get(i) {
            let copy = fragment.import(transcript.document(), block.node);
            fragment.append(root, copy);
            append_separator(&mut fragment);
            order.push(MergedItem::Transcript(i));
        }
        i += 1;
    }

    MergedDocument {
        fragment,
        order,
        slides,
        sync_elements,
        styles: deck.style_elements(),
    }
}

fn append_separator(doc: &mut Document) {
    let root = doc.root();
    let text = doc.create_text(SEPARATOR);
    doc.append(root, text);
}

/// Makes every `href` and `src` relative to the rendered page instead of the
/// document it came from.
fn rebase_links(doc: &mut Document, source_url: &str, asset_base: &str) {
    let nodes: Vec<NodeId> = doc.descendants(doc.root()).collect();
    for node in nodes {
        for attr in ["href", "src"] {
            if let Some(value) = doc.attr(node, attr) {
                let rebased = rebase(value, source_url, asset_base);
                doc.set_attr(node, attr, &rebased);
            }
        }
    }
}

/// `div.slide` elements that are not inside another slide.
fn top_level_slides(doc: &Document) -> Vec<NodeId> {
    doc.elements_with_class(doc.root(), SLIDE_CLASS)
        .into_iter()
        .filter(|&n| doc.is_element(n, "div"))
        .filter(|&n| {
            let mut ancestor = doc.parent(n);
            while let Some(a) = ancestor {
                if doc.is_element(a, "div") && doc.has_class(a, SLIDE_CLASS) {
                    return false;
                }
                ancestor = doc.parent(a);
            }
            true
        })
        .collect()
}

/// Gives each slide an ARIA region role, a "Slide i of N" label and an id,
/// and marks the first one active. Author ids are kept; a generated id that
/// would clash with an existing id gets a numeric suffix.
fn annotate_slides(doc: &mut Document, nodes: &[NodeId]) -> Vec<SlideNode> {
    let mut taken: HashSet<String> = HashSet::new();
    for node in doc.descendants(doc.root()) {
        if let Some(id) = doc.attr(node, "id") {
            if !taken.insert(id.to_string()) && nodes.contains(&node) {
                tracing::warn!(id = %id, "slide id is used more than once in the deck");
            }
        }
    }

    let total = nodes.len();
    nodes
        .iter()
        .enumerate()
        .map(|(index, &node)| {
            let label = format!("Slide {} of {}", index + 1, total);
            doc.set_attr(node, "role", "region");
            doc.set_attr(node, "aria-label", &label);

            let id = match doc.attr(node, "id") {
                Some(id) => id.to_string(),
                None => {
                    let id = unique_id(&format!("slide-{}", index), &taken);
                    taken.insert(id.clone());
                    doc.set_attr(node, "id", &id);
                    id
                }
            };

            let is_active = index == 0;
            if is_active {
                doc.add_class(node, ACTIVE_CLASS);
            }

            SlideNode {
                node,
                id,
                label,
                index,
                is_active,
            }
        })
        .collect()
}

fn unique_id(candidate: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(candidate) {
        return candidate.to_string();
    }
    (2..)
        .map(|n| format!("{}-{}", candidate, n))
        .find(|id| !taken.contains(id))
        .unwrap_or_else(|| candidate.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECK: &str = r#"<!DOCTYPE html>
<html><head>
<style>
/* deck styles */
h1, h2 { color: navy; background: url(img/bg.png) }
@media print { .slide { page-break-after: always } }
</style>
</head><body>
<section class="slide cover" id=intro><h1>Title</h1><img src="img/logo.png"></section>
<div class=slide><h2>Agenda</h2><ul><li class=next>one<li class=next>two</ul></div>
<div class=slider>not a slide</div>
<div class=slide><p>Links <a href="../other.html">here</a></p></div>
</body></html>"#;

    const TRANSCRIPT: &str = r##"<html><body>
<div><p>Welcome.</p></div>
<p>stray paragraph</p>
<div><p>Agenda <a href="#intro">back</a>.</p></div>
<div><p>Thanks.</p></div>
<div><p>Q&amp;A.</p></div>
</body></html>"##;

    fn deck() -> SlideDeck {
        SlideDeck::parse(DECK, "deck/index.html", "../")
    }

    #[test]
    fn test_slides_are_annotated() {
        let deck = deck();
        let ids: Vec<_> = deck.slides.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["intro", "slide-1", "slide-2"]);
        assert_eq!(deck.slides[1].label, "Slide 2 of 3");
        assert!(deck.slides[0].is_active);
        assert!(!deck.slides[1].is_active);

        let doc = deck.document();
        let first = deck.slides[0].node;
        assert!(doc.is_element(first, "div"));
        assert_eq!(doc.attr(first, "class"), Some("slide cover active"));
        assert_eq!(doc.attr(first, "role"), Some("region"));
        assert!(doc.elements_named(doc.root(), "section").is_empty());
    }

    #[test]
    fn test_links_are_rebased() {
        let deck = deck();
        let doc = deck.document();
        let img = doc.elements_named(doc.root(), "img")[0];
        assert_eq!(doc.attr(img, "src"), Some("../deck/img/logo.png"));
        let a = doc.elements_named(doc.root(), "a")[0];
        assert_eq!(doc.attr(a, "href"), Some("../other.html"));
    }

    #[test]
    fn test_styles_are_scoped() {
        let styles = deck().style_elements();
        assert_eq!(styles.len(), 1);
        assert_eq!(
            styles[0],
            "<style>\n#slides h1, #slides h2 { color: navy; background: url(../deck/img/bg.png) }\n@media print { .slide { page-break-after: always } }\n</style>"
        );
    }

    #[test]
    fn test_merge_interleaves_and_tolerates_excess_transcript() {
        let transcript = Transcript::parse(TRANSCRIPT, "deck/transcript.html", "../");
        assert_eq!(transcript.blocks.len(), 4);

        let merged = merge(&deck(), &transcript);
        assert_eq!(
            merged.order,
            vec![
                MergedItem::Slide(0),
                MergedItem::Transcript(0),
                MergedItem::Slide(1),
                MergedItem::Transcript(1),
                MergedItem::Slide(2),
                MergedItem::Transcript(2),
                MergedItem::Transcript(3),
            ]
        );
        let html = merged.to_html();
        assert!(html.contains("Q&amp;A."));
        assert!(html.contains("<a href=\"../deck/transcript.html#intro\">back</a>"));
        assert!(!html.contains("stray paragraph"));
        assert_eq!(html.matches("\n\n").count(), 7);
    }

    #[test]
    fn test_merge_with_fewer_transcript_blocks() {
        let slides = "<div class=slide>a</div><div class=slide>b</div><div class=slide>c</div>";
        let deck = SlideDeck::parse(slides, "s.html", "../");
        let transcript = Transcript::parse("<body><div>t0</div></body>", "t.html", "../");
        let merged = merge(&deck, &transcript);
        assert_eq!(
            merged.order,
            vec![
                MergedItem::Slide(0),
                MergedItem::Transcript(0),
                MergedItem::Slide(1),
                MergedItem::Slide(2),
            ]
        );
    }

    #[test]
    fn test_sync_elements_include_reveals() {
        let merged = merge(&deck(), &Transcript::parse(EMPTY_TRANSCRIPT, "t.html", "../"));
        let kinds: Vec<_> = merged.sync_elements.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SyncKind::Slide(0),
                SyncKind::Slide(1),
                SyncKind::Reveal,
                SyncKind::Reveal,
                SyncKind::Slide(2),
            ]
        );
        assert_eq!(merged.sync_elements[1].id.as_deref(), Some("slide-1"));
        assert_eq!(merged.first_slide().map(|s| s.id.as_str()), Some("intro"));
    }

    #[test]
    fn test_slide_with_reveal_class_counts_once() {
        let deck = SlideDeck::parse("<div class='slide next'>a</div><div class=slide>b</div>", "s.html", "../");
        let merged = merge(&deck, &Transcript::parse(EMPTY_TRANSCRIPT, "t.html", "../"));
        let kinds: Vec<_> = merged.sync_elements.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![SyncKind::Slide(0), SyncKind::Slide(1)]);
    }

    #[test]
    fn test_generated_id_avoids_author_ids() {
        let slides = "<div class=slide>a</div><div class=slide id=slide-0>b</div>";
        let deck = SlideDeck::parse(slides, "s.html", "../");
        let ids: Vec<_> = deck.slides.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["slide-0-2", "slide-0"]);
    }

    #[test]
    fn test_placeholder_deck() {
        let deck = SlideDeck::parse(PLACEHOLDER_SLIDES, "missing.html", "../");
        assert_eq!(deck.slides.len(), 1);
        assert_eq!(deck.slides[0].label, "Slide 1 of 1");
    }
}
