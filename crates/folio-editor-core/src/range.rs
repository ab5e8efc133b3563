//! Position arithmetic and range edits on [`Document`].
//!
//! Formatting commands work on linear text offsets (characters of text
//! content before a point) so that a selection can be re-resolved after the
//! tree underneath it has been split, wrapped and merged. Structural edits
//! (deletion, insertion, block splits) work on element boundaries instead.

use crate::dom::{Document, NodeId};
use crate::html::{self, HtmlNode};
use crate::types::{Position, SelectionRange, SnapDirection};

impl Document {
    /// Whether a position points at a live node with an in-range offset.
    pub fn is_valid_position(&self, pos: &Position) -> bool {
        if !self.contains(pos.node) {
            return false;
        }
        if self.is_text(pos.node) {
            pos.offset <= self.char_len(pos.node)
        } else {
            pos.offset <= self.children(pos.node).len()
        }
    }

    pub fn is_valid_range(&self, range: &SelectionRange) -> bool {
        self.is_valid_position(&range.anchor) && self.is_valid_position(&range.focus)
    }

    /// The end of the body: after the root's last child.
    pub fn end_position(&self) -> Position {
        Position::new(self.root(), self.children(self.root()).len())
    }

    /// Child-index path from the root down to `id`.
    fn path(&self, id: NodeId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut cur = id;
        while cur != self.root() {
            path.push(self.index_in_parent(cur)?);
            cur = self.parent(cur)?;
        }
        path.reverse();
        Some(path)
    }

    /// Sort key for a boundary point. Keys compare lexicographically in
    /// document order.
    fn key(&self, pos: &Position) -> Option<Vec<usize>> {
        let mut key = self.path(pos.node)?;
        key.push(pos.offset);
        Some(key)
    }

    /// The range's endpoints in document order, or `None` if either is stale.
    pub fn ordered(&self, range: &SelectionRange) -> Option<(Position, Position)> {
        if !self.is_valid_range(range) {
            return None;
        }
        let a = self.key(&range.anchor)?;
        let f = self.key(&range.focus)?;
        if a <= f {
            Some((range.anchor, range.focus))
        } else {
            Some((range.focus, range.anchor))
        }
    }

    /// Characters of text before `id` in document order.
    fn text_before(&self, id: NodeId) -> usize {
        let mut total = 0;
        let mut cur = id;
        while cur != self.root() {
            let (Some(parent), Some(idx)) = (self.parent(cur), self.index_in_parent(cur)) else {
                break;
            };
            total += self.children(parent)[..idx]
                .iter()
                .map(|&s| self.text_len(s))
                .sum::<usize>();
            cur = parent;
        }
        total
    }

    /// Linear text offset of a position.
    pub fn text_offset(&self, pos: &Position) -> Option<usize> {
        if !self.is_valid_position(pos) {
            return None;
        }
        let before = self.text_before(pos.node);
        if self.is_text(pos.node) {
            return Some(before + pos.offset);
        }
        let inside: usize = self.children(pos.node)[..pos.offset]
            .iter()
            .map(|&c| self.text_len(c))
            .sum();
        Some(before + inside)
    }

    /// Total characters of text in the body.
    pub fn total_text_len(&self) -> usize {
        self.text_len(self.root())
    }

    /// Resolve a linear text offset back into a position inside a text node.
    ///
    /// Offsets past the end, or a body without text, land at the end of the
    /// body.
    pub fn position_at(&self, offset: usize, snap: SnapDirection) -> Position {
        let mut spans = Vec::new();
        let mut start = 0;
        for node in self.text_nodes() {
            let len = self.char_len(node);
            spans.push((node, start, start + len));
            start += len;
        }
        let forward = || {
            spans
                .iter()
                .find(|&&(_, s, e)| s <= offset && offset < e)
                .map(|&(n, s, _)| Position::new(n, offset - s))
        };
        let backward = || {
            spans
                .iter()
                .find(|&&(_, s, e)| s < offset && offset <= e)
                .map(|&(n, s, _)| Position::new(n, offset - s))
        };
        let found = match snap {
            SnapDirection::Forward => forward().or_else(backward),
            SnapDirection::Backward => backward().or_else(forward),
        };
        found.unwrap_or_else(|| self.end_position())
    }

    /// Re-resolve a text-offset range: start snaps forward, end backward, so
    /// both stay inside the selected runs.
    pub fn range_at(&self, start: usize, end: usize) -> SelectionRange {
        if start == end {
            return SelectionRange::caret(self.position_at(start, SnapDirection::Forward));
        }
        SelectionRange::new(
            self.position_at(start, SnapDirection::Forward),
            self.position_at(end, SnapDirection::Backward),
        )
    }

    /// The text between two linear offsets.
    pub fn slice_text(&self, start: usize, end: usize) -> String {
        self.text_content(self.root())
            .chars()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect()
    }

    /// Split text nodes so that `[start, end)` is covered exactly by whole
    /// text nodes, returned in document order.
    pub fn isolate_text_range(&mut self, start: usize, end: usize) -> Vec<NodeId> {
        let mut runs = Vec::new();
        if start >= end {
            return runs;
        }
        let mut pos = 0;
        for node in self.text_nodes() {
            let len = self.char_len(node);
            let (s, e) = (pos, pos + len);
            pos = e;
            if e <= start || s >= end || len == 0 {
                continue;
            }
            let local_start = start.max(s) - s;
            let local_end = end.min(e) - s;
            self.split_text(node, local_end);
            let run = if local_start > 0 {
                match self.split_text(node, local_start) {
                    Some(right) => right,
                    None => continue,
                }
            } else {
                node
            };
            runs.push(run);
        }
        runs
    }

    /// Turn a position into an element boundary, splitting a text node when
    /// the position is strictly inside it.
    ///
    /// The boundary is returned as (parent, node after it) so it survives
    /// sibling insertions made by a later split.
    fn boundary(&mut self, pos: &Position) -> Option<(NodeId, Option<NodeId>)> {
        if self.is_text(pos.node) {
            let parent = self.parent(pos.node)?;
            let len = self.char_len(pos.node);
            let after = if pos.offset == 0 {
                Some(pos.node)
            } else if pos.offset >= len {
                self.next_sibling(pos.node)
            } else {
                self.split_text(pos.node, pos.offset)
            };
            Some((parent, after))
        } else {
            let after = self.children(pos.node).get(pos.offset).copied();
            Some((pos.node, after))
        }
    }

    fn boundary_index(&self, parent: NodeId, after: Option<NodeId>) -> usize {
        after
            .and_then(|n| self.index_in_parent(n))
            .unwrap_or_else(|| self.children(parent).len())
    }

    /// Delete everything between `start` and `end` (document order), and
    /// return the collapsed element boundary where they met.
    ///
    /// Nodes wholly inside the range are removed; text nodes cut by an
    /// endpoint are split first. Partially covered elements stay.
    pub fn delete_range(&mut self, start: &Position, end: &Position) -> Option<Position> {
        let (end_parent, end_after) = self.boundary(end)?;
        let (start_parent, start_after) = self.boundary(start)?;
        let start_index = self.boundary_index(start_parent, start_after);
        let start_pos = Position::new(start_parent, start_index);
        let end_pos = Position::new(end_parent, self.boundary_index(end_parent, end_after));

        let start_key = self.key(&start_pos)?;
        let end_key = self.key(&end_pos)?;
        if start_key >= end_key {
            return Some(start_pos);
        }

        let mut doomed = Vec::new();
        let mut stack: Vec<NodeId> = self.children(self.root()).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            let Some(before) = self.path(node) else {
                continue;
            };
            let mut after = before.clone();
            if let Some(last) = after.last_mut() {
                *last += 1;
            }
            if before >= start_key && after <= end_key {
                doomed.push(node);
            } else if before < end_key && after > start_key {
                stack.extend(self.children(node).iter().rev());
            }
        }
        for node in doomed {
            self.remove(node);
        }
        Some(start_pos)
    }

    /// Delete the selected content of a range, returning the caret boundary.
    pub fn delete_selection(&mut self, range: &SelectionRange) -> Option<Position> {
        let (start, end) = self.ordered(range)?;
        if start == end {
            return self.delete_range(&start, &start);
        }
        self.delete_range(&start, &end)
    }

    /// Wrap the run of inline root children around `index` in a `<p>`.
    ///
    /// Returns the paragraph and the index inside it that corresponds to
    /// the old root-level index.
    fn wrap_root_inline_run(&mut self, index: usize) -> Option<(NodeId, usize)> {
        let root = self.root();
        let children = self.children(root).to_vec();
        let is_inline = |doc: &Self, n: NodeId| !doc.tag(n).is_some_and(html::is_block);
        let mut first = index.min(children.len());
        while first > 0 && is_inline(self, children[first - 1]) {
            first -= 1;
        }
        let mut last = index.min(children.len());
        while last < children.len() && is_inline(self, children[last]) {
            last += 1;
        }
        let p = self.create_element("p", &[]);
        self.insert_child(root, first, p);
        for &child in &children[first..last] {
            self.append_child(p, child);
        }
        Some((p, index - first))
    }

    /// Break the enclosing block at an element boundary.
    ///
    /// Root-level inline content is first gathered into a paragraph. Halves
    /// left without content receive a `<br>` so they keep their height.
    /// Returns the new right-hand block.
    pub fn split_block(&mut self, at: &Position) -> Option<NodeId> {
        let (mut container, mut index) = (at.node, at.offset);
        if container == self.root() {
            let children = self.children(container);
            let touches_inline = [index.checked_sub(1), Some(index)]
                .into_iter()
                .flatten()
                .filter_map(|i| children.get(i))
                .any(|&n| !self.tag(n).is_some_and(html::is_block));
            if !touches_inline {
                // Between two blocks: start a fresh empty paragraph.
                let p = self.create_element("p", &[]);
                let br = self.create_element("br", &[]);
                self.append_child(p, br);
                self.insert_child(container, index, p);
                return Some(p);
            }
            let (p, idx) = self.wrap_root_inline_run(index)?;
            container = p;
            index = idx;
        }
        let block = match self.nearest_block(container) {
            Some(block) => block,
            None => {
                // Inline element directly under the root.
                let top = *self
                    .ancestors(container)
                    .last()
                    .unwrap_or(&container);
                let top_index = self.index_in_parent(top)?;
                let (p, _) = self.wrap_root_inline_run(top_index)?;
                p
            }
        };
        let right = self.split_at(container, index, block)?;
        for half in [block, right] {
            if !self.has_content(half) {
                for child in self.children(half).to_vec() {
                    self.remove(child);
                }
                let br = self.create_element("br", &[]);
                self.append_child(half, br);
            }
        }
        Some(right)
    }

    /// Insert markup nodes at an element boundary and return the boundary
    /// just after them.
    ///
    /// When the nodes contain block-level elements and the boundary sits in
    /// a block, the block is split and the nodes go between the halves;
    /// halves left empty are dropped.
    pub fn insert_nodes(&mut self, at: &Position, nodes: &[HtmlNode]) -> Option<Position> {
        let has_block = nodes.iter().any(HtmlNode::contains_block);
        let (mut parent, mut index) = (at.node, at.offset);

        if has_block && parent != self.root() {
            let right = self.split_block(at)?;
            let left = self.index_in_parent(right).and_then(|i| {
                let p = self.parent(right)?;
                self.children(p).get(i.checked_sub(1)?).copied()
            });
            parent = self.parent(right)?;
            index = self.index_in_parent(right)?;
            if !self.has_content(right) {
                self.remove(right);
            }
            if let Some(left) = left
                && !self.has_content(left)
            {
                self.remove(left);
                index -= 1;
            }
        }

        for node in nodes {
            let id = self.import(node);
            self.insert_child(parent, index, id);
            index += 1;
        }
        Some(Position::new(parent, index))
    }
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
    fn test_text_offsets() {
        let doc = Document::from_html("<p>ab<b>cd</b></p><p>ef</p>");
        let cd = find_text(&doc, "cd");
        assert_eq!(doc.text_offset(&Position::new(cd, 1)), Some(3));
        let second_p = doc.children(doc.root())[1];
        assert_eq!(doc.text_offset(&Position::new(second_p, 0)), Some(4));
        assert_eq!(doc.text_offset(&doc.end_position()), Some(6));
        assert_eq!(doc.text_offset(&Position::new(cd, 3)), None);
    }

    #[test]
    fn test_position_at_snaps() {
        let doc = Document::from_html("<p>ab<b>cd</b></p>");
        let ab = find_text(&doc, "ab");
        let cd = find_text(&doc, "cd");
        assert_eq!(
            doc.position_at(2, SnapDirection::Forward),
            Position::new(cd, 0)
        );
        assert_eq!(
            doc.position_at(2, SnapDirection::Backward),
            Position::new(ab, 2)
        );
        assert_eq!(
            doc.position_at(4, SnapDirection::Forward),
            Position::new(cd, 2)
        );
        assert_eq!(doc.position_at(99, SnapDirection::Forward), doc.end_position());
    }

    #[test]
    fn test_ordered_handles_backwards_and_stale() {
        let doc = Document::from_html("<p>hello</p>");
        let t = find_text(&doc, "hello");
        let range = SelectionRange::new(Position::new(t, 4), Position::new(t, 1));
        assert_eq!(
            doc.ordered(&range),
            Some((Position::new(t, 1), Position::new(t, 4)))
        );
        let stale = SelectionRange::caret(Position::new(t, 9));
        assert_eq!(doc.ordered(&stale), None);
    }

    #[test]
    fn test_isolate_text_range() {
        let mut doc = Document::from_html("<p>hello <i>big</i> world</p>");
        let runs = doc.isolate_text_range(3, 11);
        let texts: Vec<_> = runs.iter().map(|&r| doc.text(r).unwrap()).collect();
        assert_eq!(texts, vec!["lo ", "big", " w"]);
        assert_eq!(doc.to_html(), "<p>hello <i>big</i> world</p>");
    }

    #[test]
    fn test_delete_range_across_blocks() {
        let mut doc = Document::from_html("<p>one <b>two</b></p><p>three</p><p>four</p>");
        let start = doc.position_at(2, SnapDirection::Forward);
        let end = doc.position_at(14, SnapDirection::Backward);
        let caret = doc.delete_range(&start, &end).unwrap();
        assert_eq!(doc.to_html(), "<p>on</p><p>ur</p>");
        assert_eq!(doc.text_offset(&caret), Some(2));
    }

    #[test]
    fn test_split_block_in_paragraph() {
        let mut doc = Document::from_html("<p>hello world</p>");
        let caret = doc
            .delete_selection(&doc.range_at(5, 6))
            .unwrap();
        let right = doc.split_block(&caret).unwrap();
        assert_eq!(doc.to_html(), "<p>hello</p><p>world</p>");
        assert_eq!(doc.text_content(right), "world");
    }

    #[test]
    fn test_split_block_at_end_adds_break() {
        let mut doc = Document::from_html("<p>hello</p>");
        let caret = doc.delete_selection(&doc.range_at(5, 5)).unwrap();
        doc.split_block(&caret).unwrap();
        assert_eq!(doc.to_html(), "<p>hello</p><p><br></p>");
    }

    #[test]
    fn test_split_block_wraps_root_text() {
        let mut doc = Document::from_html("abc<b>def</b>");
        let caret = doc.delete_selection(&doc.range_at(4, 4)).unwrap();
        doc.split_block(&caret).unwrap();
        assert_eq!(doc.to_html(), "<p>abc<b>d</b></p><p><b>ef</b></p>");
    }

    #[test]
    fn test_split_block_between_blocks() {
        let mut doc = Document::from_html("<p>a</p><p>b</p>");
        let right = doc.split_block(&Position::new(doc.root(), 1)).unwrap();
        assert_eq!(doc.to_html(), "<p>a</p><p><br></p><p>b</p>");
        assert_eq!(doc.index_in_parent(right), Some(1));
    }

    #[test]
    fn test_insert_block_nodes_splits_paragraph() {
        let mut doc = Document::from_html("<p>hello world</p>");
        let caret = doc.delete_selection(&doc.range_at(6, 6)).unwrap();
        let nodes = html::parse("<div>embed</div>");
        let after = doc.insert_nodes(&caret, &nodes).unwrap();
        assert_eq!(doc.to_html(), "<p>hello </p><div>embed</div><p>world</p>");
        assert_eq!(after, Position::new(doc.root(), 2));
    }

    #[test]
    fn test_insert_block_at_end_drops_empty_half() {
        let mut doc = Document::from_html("<p>hello</p>");
        let caret = doc.delete_selection(&doc.range_at(5, 5)).unwrap();
        let nodes = html::parse("<div>x</div>");
        doc.insert_nodes(&caret, &nodes).unwrap();
        assert_eq!(doc.to_html(), "<p>hello</p><div>x</div>");
    }

    #[test]
    fn test_insert_inline_nodes() {
        let mut doc = Document::from_html("<p>ab</p>");
        let caret = doc.delete_selection(&doc.range_at(1, 1)).unwrap();
        let nodes = html::parse(r#"<img src="x.png">"#);
        doc.insert_nodes(&caret, &nodes).unwrap();
        assert_eq!(doc.to_html(), r#"<p>a<img src="x.png">b</p>"#);
    }
}
