//! Selection snapshots that survive focus changes.
//!
//! A toolbar interaction can move input focus out of the editing surface,
//! which loses the active selection. The tracker keeps an immutable copy of
//! the last captured range so the command triggered by that interaction can
//! put it back first.

use crate::dom::{Document, NodeId};
use crate::types::{Position, SelectionRange};

/// Result of restoring a captured range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The range still resolves and is active again.
    Restored(SelectionRange),
    /// Nothing was captured; the active selection is left alone.
    NothingCaptured,
    /// The captured nodes are gone or shrank. Callers fall back to a caret
    /// at the end of the document.
    Stale,
}

/// A captured range that can be found again after edits elsewhere in the
/// document.
///
/// Besides the raw range it records the linear text offsets of both ends
/// and, for a caret between elements, the sibling it sat in front of.
/// Edits that insert no text (embeds, line breaks) leave the offsets
/// meaningful even when they split the node the range pointed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bookmark {
    range: SelectionRange,
    start: usize,
    end: usize,
    /// Parent element and the child the caret preceded (`None` = last).
    boundary: Option<(NodeId, Option<NodeId>)>,
}

impl Bookmark {
    pub fn capture(doc: &Document, range: &SelectionRange) -> Option<Self> {
        let (start, end) = doc.ordered(range)?;
        let boundary = (range.is_collapsed() && !doc.is_text(start.node)).then(|| {
            let before = doc.children(start.node).get(start.offset).copied();
            (start.node, before)
        });
        Some(Self {
            range: *range,
            start: doc.text_offset(&start)?,
            end: doc.text_offset(&end)?,
            boundary,
        })
    }

    pub fn range(&self) -> &SelectionRange {
        &self.range
    }

    /// Find the range again in `doc`, or `None` if it no longer exists.
    pub fn resolve(&self, doc: &Document) -> Option<SelectionRange> {
        if let Some((parent, before)) = self.boundary
            && doc.contains(parent)
        {
            match before {
                None => {
                    let end = doc.children(parent).len();
                    return Some(SelectionRange::caret(Position::new(parent, end)));
                }
                Some(before) if doc.parent(before) == Some(parent) => {
                    let index = doc.index_in_parent(before)?;
                    return Some(SelectionRange::caret(Position::new(parent, index)));
                }
                Some(_) => {}
            }
        }
        if let Some((start, end)) = doc.ordered(&self.range)
            && doc.text_offset(&start) == Some(self.start)
            && doc.text_offset(&end) == Some(self.end)
        {
            return Some(self.range);
        }
        (self.end <= doc.total_text_len()).then(|| doc.range_at(self.start, self.end))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    saved: Option<SelectionRange>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a copy of `active`, if there is one.
    ///
    /// With no active selection the previous snapshot is kept and `None` is
    /// returned.
    pub fn capture(&mut self, active: Option<&SelectionRange>) -> Option<SelectionRange> {
        let range = *active?;
        self.saved = Some(range);
        Some(range)
    }

    /// The most recent snapshot.
    pub fn saved(&self) -> Option<&SelectionRange> {
        self.saved.as_ref()
    }

    /// Check a snapshot against the current document.
    ///
    /// Never touches the document; the editor applies the outcome to its
    /// active selection.
    pub fn restore(&self, doc: &Document, range: Option<&SelectionRange>) -> RestoreOutcome {
        match range {
            None => RestoreOutcome::NothingCaptured,
            Some(range) if doc.is_valid_range(range) => RestoreOutcome::Restored(*range),
            Some(range) => {
                tracing::debug!(target: "folio::editor", ?range, "captured selection is stale");
                RestoreOutcome::Stale
            }
        }
    }

    pub fn restore_saved(&self, doc: &Document) -> RestoreOutcome {
        self.restore(doc, self.saved.as_ref())
    }

    /// Like [`restore`](Self::restore), but follows the bookmark through
    /// edits made since it was captured.
    pub fn restore_bookmark(&self, doc: &Document, bookmark: Option<&Bookmark>) -> RestoreOutcome {
        let Some(bookmark) = bookmark else {
            return RestoreOutcome::NothingCaptured;
        };
        match bookmark.resolve(doc) {
            Some(range) => RestoreOutcome::Restored(range),
            None => {
                tracing::debug!(target: "folio::editor", range = ?bookmark.range(), "bookmark is stale");
                RestoreOutcome::Stale
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;

    #[test]
    fn test_restore_without_capture() {
        let doc = Document::from_html("<p>a</p>");
        let before = doc.to_html();
        let tracker = SelectionTracker::new();
        assert_eq!(tracker.restore_saved(&doc), RestoreOutcome::NothingCaptured);
        assert_eq!(doc.to_html(), before);
    }

    #[test]
    fn test_capture_keeps_previous_when_inactive() {
        let doc = Document::from_html("<p>abc</p>");
        let range = doc.range_at(0, 2);
        let mut tracker = SelectionTracker::new();
        assert_eq!(tracker.capture(Some(&range)), Some(range));
        assert_eq!(tracker.capture(None), None);
        assert_eq!(tracker.saved(), Some(&range));
        assert_eq!(tracker.restore_saved(&doc), RestoreOutcome::Restored(range));
    }

    #[test]
    fn test_stale_snapshot() {
        let mut doc = Document::from_html("<p>abc</p>");
        let range = doc.range_at(1, 3);
        let mut tracker = SelectionTracker::new();
        tracker.capture(Some(&range));
        doc.replace_contents(crate::html::parse("<p>xyz</p>"));
        assert_eq!(tracker.restore_saved(&doc), RestoreOutcome::Stale);

        let shrunk = SelectionRange::caret(Position::new(doc.root(), 5));
        assert_eq!(tracker.restore(&doc, Some(&shrunk)), RestoreOutcome::Stale);
    }

    #[test]
    fn test_bookmark_follows_split_text() {
        let mut doc = Document::from_html("<p>hello world</p>");
        let text = doc.text_nodes()[0];
        let bookmark = Bookmark::capture(&doc, &doc.range_at(6, 8)).unwrap();

        // Splitting in front of the range leaves the old node too short.
        let p = doc.children(doc.root())[0];
        let right = doc.split_text(text, 2).unwrap();
        let br = doc.create_element("br", &[]);
        doc.insert_child(p, 1, br);
        assert!(!doc.is_valid_range(bookmark.range()));

        let range = bookmark.resolve(&doc).unwrap();
        assert_eq!(range, SelectionRange::new(Position::new(right, 4), Position::new(right, 6)));
    }

    #[test]
    fn test_bookmark_keeps_element_boundary() {
        let mut doc = Document::from_html("<p>one</p><p>two</p>");
        let root = doc.root();
        let at_end = Bookmark::capture(&doc, &SelectionRange::caret(doc.end_position())).unwrap();
        let second = doc.children(root)[1];
        let before_second =
            Bookmark::capture(&doc, &SelectionRange::caret(Position::new(root, 1))).unwrap();

        let hr = doc.create_element("hr", &[]);
        doc.insert_child(root, 0, hr);

        assert_eq!(
            at_end.resolve(&doc),
            Some(SelectionRange::caret(Position::new(root, 3)))
        );
        assert_eq!(
            before_second.resolve(&doc),
            Some(SelectionRange::caret(Position::new(root, 2)))
        );
        assert_eq!(doc.index_in_parent(second), Some(2));
    }

    #[test]
    fn test_bookmark_past_end_is_stale() {
        let mut doc = Document::from_html("<p>abcdef</p>");
        let bookmark = Bookmark::capture(&doc, &doc.range_at(4, 6)).unwrap();
        doc.replace_contents(crate::html::parse("<p>ab</p>"));
        let tracker = SelectionTracker::new();
        assert_eq!(tracker.restore_bookmark(&doc, Some(&bookmark)), RestoreOutcome::Stale);
        assert_eq!(tracker.restore_bookmark(&doc, None), RestoreOutcome::NothingCaptured);
    }
}
