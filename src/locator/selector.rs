use std::collections::HashMap;
use std::fmt;

use html5ever::tendril::StrTendril;
use html5ever::{Attribute, LocalName, Namespace, QualName};
use scraper::node::{Element, Text};
use scraper::{Html, Node, Selector};

use crate::dom::dom_model::{Document, ElementData, NodeData, NodeId};
use crate::dom::hit_test::OVERLAY_ATTR;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorError {
    pub selector: String,
    pub message: String,
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid selector '{}': {}", self.selector, self.message)
    }
}

impl std::error::Error for SelectorError {}

pub fn parse_selector(input: &str) -> Result<Selector, SelectorError> {
    Selector::parse(input).map_err(|e| SelectorError {
        selector: input.to_string(),
        message: e.to_string(),
    })
}

// ============================================================================
// Query index
// ============================================================================

/// Copy of a document's page content in scraper's tree, used for selector
/// matching. Overlay nodes and their subtrees are left out, so labels and
/// drag rectangles never take part in matching or sibling positions.
pub struct QueryIndex {
    html: Html,
    nodes: HashMap<ego_tree::NodeId, NodeId>,
}

impl QueryIndex {
    pub fn build(doc: &Document) -> Self {
        let mut html = Html::new_document();
        let mut nodes = HashMap::new();
        let root = html.tree.root().id();
        mirror_children(doc, doc.root(), &mut html, root, &mut nodes);
        Self { html, nodes }
    }

    /// Elements matching `selector`, in document order.
    pub fn select(&self, selector: &Selector) -> Vec<NodeId> {
        self.html
            .select(selector)
            .filter_map(|el| self.nodes.get(&el.id()).copied())
            .collect()
    }

    pub fn query(&self, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let selector = parse_selector(selector)?;
        Ok(self.select(&selector))
    }
}

pub fn is_overlay_element(el: &ElementData) -> bool {
    el.attrs.iter().any(|(name, _)| name == OVERLAY_ATTR)
}

fn mirror_children(
    doc: &Document,
    parent: NodeId,
    html: &mut Html,
    target: ego_tree::NodeId,
    nodes: &mut HashMap<ego_tree::NodeId, NodeId>,
) {
    for &child in doc.children(parent) {
        let Some(node) = doc.get(child) else {
            continue;
        };
        let value = match &node.data {
            NodeData::Element(el) if !is_overlay_element(el) => {
                Node::Element(Element::new(html_name(&el.tag), mirror_attrs(el)))
            }
            NodeData::Text(text) => Node::Text(Text {
                text: text.as_str().into(),
            }),
            _ => continue,
        };
        let is_element = value.is_element();

        let Some(mut target_node) = html.tree.get_mut(target) else {
            return;
        };
        let mirrored = target_node.append(value).id();
        if is_element {
            nodes.insert(mirrored, child);
            mirror_children(doc, child, html, mirrored, nodes);
        }
    }
}

fn html_name(tag: &str) -> QualName {
    QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(tag))
}

fn mirror_attrs(el: &ElementData) -> Vec<Attribute> {
    el.attrs
        .iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, Namespace::from(""), LocalName::from(name.as_str())),
            value: StrTendril::from_slice(value),
        })
        .collect()
}

/// All connected page elements matching `selector`, in document order.
pub fn query_all(doc: &Document, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
    QueryIndex::build(doc).query(selector)
}
