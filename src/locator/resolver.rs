use crate::dom::dom_model::{Document, NodeId};
use crate::locator::escape::css_escape;
use crate::locator::locator_model::Locator;
use crate::locator::selector::{QueryIndex, is_overlay_element};

/// Fragment naming the document element; children of it are joined with
/// a child combinator so the locator stays anchored at the root.
pub const ROOT_SYNONYM: &str = "html";

/// Compute a locator that re-identifies `node` within `doc`.
///
/// An element with a non-empty id resolves to `#id` straight away.
/// Anything else walks up through its ancestors, emitting `tag` or
/// `tag:nth-of-type(n)` for each level. Non-element nodes resolve to the
/// empty locator.
pub fn resolve(doc: &Document, node: NodeId) -> Locator {
    if !doc.is_element(node) {
        return Locator::empty();
    }
    Locator(fragment_path(doc, node))
}

fn fragment_path(doc: &Document, el: NodeId) -> String {
    if let Some(id) = doc.element_id(el) {
        return format!("#{}", css_escape(id));
    }

    let tag = doc.tag_name(el).unwrap_or_default().to_string();
    let Some(parent) = doc.parent_element(el) else {
        return tag;
    };

    let position = position_of_type(doc, el);
    let fragment = if position == 1 {
        tag
    } else {
        format!("{}:nth-of-type({})", tag, position)
    };

    let parent_path = fragment_path(doc, parent);
    if parent_path == ROOT_SYNONYM {
        format!("{} > {}", parent_path, fragment)
    } else {
        format!("{} {}", parent_path, fragment)
    }
}

/// 1-based position of `el` among its parent's page elements with the same
/// tag. Overlay siblings are not counted.
pub fn position_of_type(doc: &Document, el: NodeId) -> usize {
    let Some(tag) = doc.tag_name(el) else {
        return 0;
    };
    let Some(parent) = doc.parent(el) else {
        return 1;
    };
    doc.element_children(parent)
        .filter(|&c| doc.element(c).is_some_and(|e| !is_overlay_element(e)))
        .filter(|&c| doc.tag_name(c) == Some(tag))
        .position(|c| c == el)
        .map(|i| i + 1)
        .unwrap_or(1)
}

/// Elements currently matched by `locator`. Empty or unparsable locators
/// match nothing.
pub fn locate(doc: &Document, locator: &Locator) -> Vec<NodeId> {
    if locator.is_empty() {
        return vec![];
    }
    locate_in(&QueryIndex::build(doc), locator)
}

/// Same as [`locate`] against an index built earlier, for resolving many
/// locators against one document state.
pub fn locate_in(index: &QueryIndex, locator: &Locator) -> Vec<NodeId> {
    if locator.is_empty() {
        return vec![];
    }
    index.query(locator.as_str()).unwrap_or_default()
}
