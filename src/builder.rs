//! Markup-to-element helpers shared by every field and page.

use std::collections::HashMap;

use crate::document::Document;
use crate::dom::NodeId;
use crate::Result;

/// Where [`build`] puts the markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mount<'a> {
    /// Replace the content of an element that already exists.
    Existing(NodeId),
    /// Create a new, detached element with this tag.
    Tag(&'a str),
    /// Create a new, detached `div`.
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Built {
    pub root: NodeId,
    /// Direct element children keyed by their `id` attribute.
    pub children: HashMap<String, NodeId>,
}

impl Built {
    pub fn child(&self, id: &str) -> Option<NodeId> {
        self.children.get(id).copied()
    }
}

/// Mounts `markup` and maps its identified direct children.
///
/// Markup is trusted and inserted as-is; callers interpolate descriptor text
/// into it without escaping.
pub fn build(doc: &mut Document, markup: &str, mount: Mount<'_>) -> Result<Built> {
    let root = match mount {
        Mount::Existing(node) => node,
        Mount::Tag(tag) => doc.dom.create_detached_element(tag),
        Mount::Default => doc.dom.create_detached_element("div"),
    };
    doc.dom.set_inner_html(root, markup)?;

    let mut children = HashMap::new();
    for child in doc.dom.element_children(root) {
        if let Some(id) = doc.dom.attr(child, "id").filter(|id| !id.is_empty()) {
            children.insert(id, child);
        }
    }
    Ok(Built { root, children })
}

pub fn set_attributes(doc: &mut Document, node: NodeId, attrs: &[(&str, &str)]) -> Result<()> {
    for (name, value) in attrs {
        doc.set_attr(node, name, value)?;
    }
    Ok(())
}

pub fn clamp(v: i64, lo: i64, hi: i64) -> i64 {
    v.min(hi).max(lo)
}
