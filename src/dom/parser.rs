use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Node as HtmlNode};
use serde::{Deserialize, Serialize};

use crate::dom::dom_model::{Document, NodeId};
use crate::geometry::geometry_model::Region;

/// One element of the layout snapshot emitted by the capture script.
///
/// Mirrors the DOM with the border box of every element measured in the
/// unscaled desktop viewport, so hit-testing can run without a browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutNode {
    pub tag: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub rect: Option<Region>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub children: Vec<LayoutNode>,
}

/// Parse captured HTML into a `Document`. Doctype and processing
/// instructions are dropped; element boxes are left unset.
pub fn parse_html(source: &str) -> Document {
    let html = Html::parse_document(source);
    let mut doc = Document::new();
    let root = doc.root();
    import_element(&mut doc, root, html.root_element());
    doc
}

fn import_element(doc: &mut Document, parent: NodeId, element: ElementRef<'_>) {
    let attrs = element
        .value()
        .attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let id = doc.create_element(element.value().name(), attrs);
    doc.append_child(parent, id);

    for child in element.children() {
        match child.value() {
            HtmlNode::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    import_element(doc, id, el);
                }
            }
            HtmlNode::Text(text) => {
                let t = doc.create_text(&**text);
                doc.append_child(id, t);
            }
            HtmlNode::Comment(comment) => {
                let c = doc.create_comment(&**comment);
                doc.append_child(id, c);
            }
            _ => {}
        }
    }
}

/// Build a `Document` from a layout snapshot, carrying element boxes over.
pub fn from_layout(root: &LayoutNode) -> Document {
    let mut doc = Document::new();
    let parent = doc.root();
    import_layout(&mut doc, parent, root);
    doc
}

fn import_layout(doc: &mut Document, parent: NodeId, node: &LayoutNode) {
    let attrs = node
        .attrs
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let id = doc.create_element(&node.tag, attrs);
    doc.set_rect(id, node.rect);
    doc.append_child(parent, id);

    if let Some(text) = node.text.as_deref().filter(|t| !t.is_empty()) {
        let t = doc.create_text(text);
        doc.append_child(id, t);
    }
    for child in &node.children {
        import_layout(doc, id, child);
    }
}
