//! Arena-backed document tree.
//!
//! Nodes live in a `Vec` slot arena and are addressed by [`NodeId`]. Slots are
//! never reused: once a node is removed its id stays dead, so a selection that
//! still points at it can be recognised as stale instead of silently landing
//! somewhere else.

use std::fmt;

use smol_str::SmolStr;

use crate::html::{self, HtmlNode};
use crate::style;

/// Tag of the editing surface itself. Never serialized.
pub const ROOT_TAG: &str = "div";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Text(String),
    Element {
        tag: SmolStr,
        attrs: Vec<(SmolStr, String)>,
    },
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// The editable document: a root element holding the post body.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Option<NodeData>>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(NodeData {
                kind: NodeKind::Element {
                    tag: ROOT_TAG.into(),
                    attrs: Vec::new(),
                },
                parent: None,
                children: Vec::new(),
            })],
            root: NodeId(0),
        }
    }

    /// Build a document from markup. The markup is sanitized on the way in.
    pub fn from_html(markup: &str) -> Self {
        let mut doc = Self::new();
        doc.replace_contents(html::parse(markup));
        doc
    }

    /// Drop the current body and load `nodes` in its place.
    pub fn replace_contents(&mut self, nodes: Vec<HtmlNode>) {
        for child in self.children(self.root).to_vec() {
            self.remove(child);
        }
        for node in &nodes {
            let id = self.import(node);
            self.append_child(self.root, id);
        }
    }

    /// Serialize the body (everything inside the root).
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for &child in self.children(self.root) {
            self.write_node(&mut out, child);
        }
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId) {
        let Some(data) = self.data(id) else {
            return;
        };
        match &data.kind {
            NodeKind::Text(text) => html::escape_text(out, text),
            NodeKind::Element { tag, attrs } => {
                html::write_open_tag(out, tag, attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                if !html::is_void(tag) {
                    for &child in &data.children {
                        self.write_node(out, child);
                    }
                }
                html::write_close_tag(out, tag);
            }
        }
    }

    // === Inspection ===

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn data_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.data(id).map(|d| &d.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).and_then(|d| d.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.data(id).map(|d| d.children.as_slice()).unwrap_or(&[])
    }

    /// Whether the body has no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Text(_)))
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text(text) => Some(text.as_str()),
            NodeKind::Element { .. } => None,
        }
    }

    /// Whether `id` is alive and connected to the root.
    pub fn contains(&self, id: NodeId) -> bool {
        let mut cur = id;
        loop {
            if cur == self.root {
                return true;
            }
            match self.parent(cur) {
                Some(parent) => cur = parent,
                None => return false,
            }
        }
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        self.children(parent).get(idx + 1).copied()
    }

    /// Ancestors from the parent upwards, excluding the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.parent(id);
        while let Some(node) = cur {
            if node == self.root {
                break;
            }
            out.push(node);
            cur = self.parent(node);
        }
        out
    }

    /// Descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    /// All text nodes of the body in document order.
    pub fn text_nodes(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&n| self.is_text(n))
            .collect()
    }

    /// Length in characters of a text node (0 for elements).
    pub fn char_len(&self, id: NodeId) -> usize {
        self.text(id).map(|t| t.chars().count()).unwrap_or(0)
    }

    /// Total characters of text inside a subtree.
    pub fn text_len(&self, id: NodeId) -> usize {
        if self.is_text(id) {
            return self.char_len(id);
        }
        self.children(id).iter().map(|&c| self.text_len(c)).sum()
    }

    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_owned();
        }
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Whether a subtree shows anything: text or a media/void element other
    /// than a line break.
    pub fn has_content(&self, id: NodeId) -> bool {
        if self.text_len(id) > 0 {
            return true;
        }
        self.descendants(id)
            .into_iter()
            .any(|n| self.tag(n).is_some_and(|t| html::MEDIA_ELEMENTS.contains(&t)))
    }

    /// Nearest block-level ancestor-or-self, never the root.
    pub fn nearest_block(&self, id: NodeId) -> Option<NodeId> {
        if id != self.root && self.tag(id).is_some_and(html::is_block) {
            return Some(id);
        }
        self.ancestors(id)
            .into_iter()
            .find(|&a| self.tag(a).is_some_and(html::is_block))
    }

    /// Nearest ancestor matching `pred`, without leaving the enclosing block.
    pub fn inline_ancestor(
        &self,
        id: NodeId,
        mut pred: impl FnMut(&Self, NodeId) -> bool,
    ) -> Option<NodeId> {
        for ancestor in self.ancestors(id) {
            if self.tag(ancestor).is_some_and(html::is_block) {
                return None;
            }
            if pred(self, ancestor) {
                return Some(ancestor);
            }
        }
        None
    }

    /// Every attached element satisfying `pred`, in document order.
    pub fn find_elements(&self, mut pred: impl FnMut(&Self, NodeId) -> bool) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&n| !self.is_text(n) && pred(self, n))
            .collect()
    }

    // === Attributes ===

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(NodeData {
            kind: NodeKind::Element { attrs, .. },
            ..
        }) = self.data_mut(id)
        {
            let value = value.into();
            match attrs.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value,
                None => attrs.push((name.into(), value)),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        match &mut self.data_mut(id)?.kind {
            NodeKind::Element { attrs, .. } => {
                let idx = attrs.iter().position(|(k, _)| k == name)?;
                Some(attrs.remove(idx).1)
            }
            NodeKind::Text(_) => None,
        }
    }

    pub fn style_property(&self, id: NodeId, prop: &str) -> Option<String> {
        style::get_property(self.attr(id, "style")?, prop)
    }

    pub fn set_style_property(&mut self, id: NodeId, prop: &str, value: &str) {
        let current = self.attr(id, "style").unwrap_or_default();
        let updated = style::set_property(current, prop, value);
        self.set_attr(id, "style", updated);
    }

    pub fn remove_style_property(&mut self, id: NodeId, prop: &str) {
        let Some(current) = self.attr(id, "style") else {
            return;
        };
        let updated = style::remove_property(current, prop);
        if updated.is_empty() {
            self.remove_attr(id, "style");
        } else {
            self.set_attr(id, "style", updated);
        }
    }

    /// Same tag and same attributes, in any order.
    pub fn same_element_kind(&self, a: NodeId, b: NodeId) -> bool {
        match (self.kind(a), self.kind(b)) {
            (
                Some(NodeKind::Element { tag: ta, attrs: aa }),
                Some(NodeKind::Element { tag: tb, attrs: ab }),
            ) => {
                ta == tb
                    && aa.len() == ab.len()
                    && aa.iter().all(|pair| ab.contains(pair))
            }
            _ => false,
        }
    }

    // === Construction ===

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        }));
        id
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    /// Create a detached, childless element.
    pub fn create_element(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.into(),
            attrs: attrs
                .iter()
                .map(|&(k, v)| (SmolStr::from(k), v.to_owned()))
                .collect(),
        })
    }

    /// Copy an element's tag and attributes into a new detached element.
    pub fn shallow_clone(&mut self, id: NodeId) -> Option<NodeId> {
        let kind = match self.kind(id)? {
            NodeKind::Element { tag, attrs } => NodeKind::Element {
                tag: tag.clone(),
                attrs: attrs.clone(),
            },
            NodeKind::Text(_) => return None,
        };
        Some(self.alloc(kind))
    }

    /// Build a detached subtree from a markup node.
    pub fn import(&mut self, node: &HtmlNode) -> NodeId {
        match node {
            HtmlNode::Text(text) => self.create_text(text.clone()),
            HtmlNode::Element(el) => {
                let id = self.alloc(NodeKind::Element {
                    tag: el.tag.clone(),
                    attrs: el.attrs.clone(),
                });
                for child in &el.children {
                    let child_id = self.import(child);
                    self.append_child(id, child_id);
                }
                id
            }
        }
    }

    // === Tree edits ===

    /// Unlink a node from its parent. The subtree stays alive.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(p) = self.data_mut(parent) {
            p.children.retain(|&c| c != id);
        }
        if let Some(d) = self.data_mut(id) {
            d.parent = None;
        }
    }

    /// Insert `child` at `index` (clamped) of `parent`, moving it if attached.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if child == self.root || self.data(parent).is_none() {
            return;
        }
        self.detach(child);
        if let Some(p) = self.data_mut(parent) {
            let index = index.min(p.children.len());
            p.children.insert(index, child);
        }
        if let Some(c) = self.data_mut(child) {
            c.parent = Some(parent);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_child(parent, usize::MAX, child);
    }

    /// Detach and free a subtree. Its ids are never handed out again.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        self.detach(id);
        let mut doomed = self.descendants(id);
        doomed.push(id);
        for node in doomed {
            if let Some(slot) = self.nodes.get_mut(node.index()) {
                *slot = None;
            }
        }
    }

    /// Put `node` inside the detached element `wrapper`, in node's place.
    pub fn wrap(&mut self, node: NodeId, wrapper: NodeId) {
        let (Some(parent), Some(idx)) = (self.parent(node), self.index_in_parent(node)) else {
            return;
        };
        self.insert_child(parent, idx, wrapper);
        self.append_child(wrapper, node);
    }

    /// Replace an element by its children.
    pub fn unwrap(&mut self, element: NodeId) {
        let (Some(parent), Some(idx)) = (self.parent(element), self.index_in_parent(element))
        else {
            return;
        };
        let children = self.children(element).to_vec();
        for (offset, child) in children.into_iter().enumerate() {
            self.insert_child(parent, idx + 1 + offset, child);
        }
        self.remove(element);
    }

    /// Split a text node at a character offset strictly inside it.
    ///
    /// The left part keeps the id; the right part is inserted after it and
    /// returned.
    pub fn split_text(&mut self, id: NodeId, char_offset: usize) -> Option<NodeId> {
        let len = self.char_len(id);
        if char_offset == 0 || char_offset >= len {
            return None;
        }
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        let NodeKind::Text(text) = &mut self.data_mut(id)?.kind else {
            return None;
        };
        let byte = text
            .char_indices()
            .nth(char_offset)
            .map(|(b, _)| b)
            .unwrap_or(text.len());
        let right_text = text.split_off(byte);
        let right = self.create_text(right_text);
        self.insert_child(parent, idx + 1, right);
        Some(right)
    }

    /// Split `container` at child `index`, and every ancestor up to and
    /// including `up_to`, returning the clone of `up_to` holding the right
    /// half. Clones are inserted directly after their originals.
    pub fn split_at(&mut self, container: NodeId, index: usize, up_to: NodeId) -> Option<NodeId> {
        let mut cur = container;
        let mut idx = index;
        loop {
            let parent = self.parent(cur)?;
            let cur_idx = self.index_in_parent(cur)?;
            let clone = self.shallow_clone(cur)?;
            let moving: Vec<NodeId> = self.children(cur).iter().skip(idx).copied().collect();
            for child in moving {
                self.append_child(clone, child);
            }
            self.insert_child(parent, cur_idx + 1, clone);
            if cur == up_to {
                return Some(clone);
            }
            cur = parent;
            idx = cur_idx + 1;
        }
    }

    /// Split every element between `node` and `ancestor` so that `node` ends
    /// up as the only content of `ancestor`. Siblings on either side move
    /// into clones of their former parents.
    pub fn isolate(&mut self, node: NodeId, ancestor: NodeId) {
        let mut cur = node;
        while cur != ancestor {
            let Some(parent) = self.parent(cur) else {
                return;
            };
            if parent == self.root {
                return;
            }
            let Some(idx) = self.index_in_parent(cur) else {
                return;
            };
            let siblings = self.children(parent).to_vec();

            if idx + 1 < siblings.len()
                && let (Some(grand), Some(pidx), Some(right)) = (
                    self.parent(parent),
                    self.index_in_parent(parent),
                    self.shallow_clone(parent),
                )
            {
                for &sib in &siblings[idx + 1..] {
                    self.append_child(right, sib);
                }
                self.insert_child(grand, pidx + 1, right);
            }
            if idx > 0
                && let (Some(grand), Some(pidx), Some(left)) = (
                    self.parent(parent),
                    self.index_in_parent(parent),
                    self.shallow_clone(parent),
                )
            {
                for &sib in &siblings[..idx] {
                    self.append_child(left, sib);
                }
                self.insert_child(grand, pidx, left);
            }
            cur = parent;
        }
    }

    /// Tidy a subtree after an edit: drop empty text, merge adjacent text,
    /// drop empty inline formatting elements and merge adjacent identical
    /// ones.
    pub fn normalize(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            if !self.is_text(child) {
                self.normalize(child);
            }
        }

        let mut i = 0;
        while i < self.children(id).len() {
            let child = self.children(id)[i];
            if self.is_text(child) && self.char_len(child) == 0 {
                self.remove(child);
                continue;
            }
            if self.tag(child).is_some_and(is_formatting) && self.children(child).is_empty() {
                self.remove(child);
                continue;
            }
            if i > 0 {
                let prev = self.children(id)[i - 1];
                if self.is_text(prev) && self.is_text(child) {
                    let tail = self.text(child).unwrap_or_default().to_owned();
                    if let Some(NodeData {
                        kind: NodeKind::Text(text),
                        ..
                    }) = self.data_mut(prev)
                    {
                        text.push_str(&tail);
                    }
                    self.remove(child);
                    continue;
                }
                if self.tag(child).is_some_and(is_formatting) && self.same_element_kind(prev, child)
                {
                    for grandchild in self.children(child).to_vec() {
                        self.append_child(prev, grandchild);
                    }
                    self.remove(child);
                    self.normalize(prev);
                    continue;
                }
            }
            i += 1;
        }
    }
}

/// Inline elements produced by formatting commands.
pub const FORMATTING_ELEMENTS: &[&str] = &[
    "a", "b", "em", "font", "i", "s", "span", "strike", "strong", "sub", "sup", "u",
];

pub fn is_formatting(tag: &str) -> bool {
    FORMATTING_ELEMENTS.contains(&tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find_text(doc: &Document, needle: &str) -> NodeId {
        doc.text_nodes()
            .into_iter()
            .find(|&n| doc.text(n) == Some(needle))
            .unwrap()
    }

    #[test]
    fn test_roundtrip() {
        let markup = r#"<p>Hello <b>world</b></p><p><img src="a.png"></p>"#;
        assert_eq!(Document::from_html(markup).to_html(), markup);
    }

    #[test]
    fn test_removed_ids_stay_dead() {
        let mut doc = Document::from_html("<p>a</p>");
        let text = find_text(&doc, "a");
        doc.replace_contents(html::parse("<p>a</p>"));
        assert!(!doc.contains(text));
        assert!(doc.kind(text).is_none());
        assert_ne!(find_text(&doc, "a"), text);
    }

    #[test]
    fn test_split_text_is_char_based() {
        let mut doc = Document::from_html("<p>héllo</p>");
        let text = find_text(&doc, "héllo");
        let right = doc.split_text(text, 2).unwrap();
        assert_eq!(doc.text(text), Some("hé"));
        assert_eq!(doc.text(right), Some("llo"));
        assert!(doc.split_text(text, 0).is_none());
        assert!(doc.split_text(text, 2).is_none());
        assert_eq!(doc.to_html(), "<p>héllo</p>");
    }

    #[test]
    fn test_isolate_splits_ancestors() {
        let mut doc = Document::from_html("<p><b>one <i>two</i> three</b></p>");
        let two = find_text(&doc, "two");
        let b = doc.ancestors(two)[1];
        doc.isolate(two, b);
        assert_eq!(
            doc.to_html(),
            "<p><b>one </b><b><i>two</i></b><b> three</b></p>"
        );
        assert_eq!(doc.ancestors(two)[1], b);
    }

    #[test]
    fn test_split_at_block() {
        let mut doc = Document::from_html("<p><b>hello</b></p>");
        let text = find_text(&doc, "hello");
        doc.split_text(text, 3);
        let b = doc.parent(text).unwrap();
        let p = doc.parent(b).unwrap();
        let right = doc.split_at(b, 1, p).unwrap();
        assert_eq!(doc.to_html(), "<p><b>hel</b></p><p><b>lo</b></p>");
        assert_eq!(doc.tag(right), Some("p"));
    }

    #[test]
    fn test_normalize_merges_and_prunes() {
        let mut doc = Document::from_html("<p><b>a</b><b>b</b><i></i><br>c</p>");
        let p = doc.children(doc.root())[0];
        let br = doc.children(p)[3];
        let c = doc.create_text("d");
        doc.append_child(p, c);
        doc.normalize(doc.root());
        assert_eq!(doc.to_html(), "<p><b>ab</b><br>cd</p>");
        assert!(doc.contains(br));
    }

    #[test]
    fn test_normalize_keeps_distinct_attributes() {
        let mut doc =
            Document::from_html(r#"<font color="red">a</font><font color="blue">b</font>"#);
        doc.normalize(doc.root());
        assert_eq!(
            doc.to_html(),
            r#"<font color="red">a</font><font color="blue">b</font>"#
        );
    }

    #[test]
    fn test_unwrap_and_wrap() {
        let mut doc = Document::from_html("<p><b>x</b>y</p>");
        let x = find_text(&doc, "x");
        let b = doc.parent(x).unwrap();
        doc.unwrap(b);
        assert_eq!(doc.to_html(), "<p>xy</p>");
        let u = doc.create_element("u", &[]);
        doc.wrap(x, u);
        assert_eq!(doc.to_html(), "<p><u>x</u>y</p>");
    }

    #[test]
    fn test_style_properties() {
        let mut doc = Document::from_html(r#"<span style="color: red">x</span>"#);
        let span = doc.children(doc.root())[0];
        doc.set_style_property(span, "background-color", "#ffff00");
        assert_eq!(
            doc.attr(span, "style"),
            Some("color: red; background-color: #ffff00")
        );
        doc.remove_style_property(span, "color");
        doc.remove_style_property(span, "background-color");
        assert_eq!(doc.attr(span, "style"), None);
    }
}
