//! Core types for document positions and selections.

use crate::dom::NodeId;

/// A boundary point inside the document tree.
///
/// In a text node `offset` counts characters; in an element it counts
/// children, so `offset == 0` is "before the first child".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A selection range over the document.
///
/// Anchor is where the selection started, focus where it currently ends; the
/// two may be in either document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionRange {
    pub anchor: Position,
    pub focus: Position,
}

impl SelectionRange {
    pub fn new(anchor: Position, focus: Position) -> Self {
        Self { anchor, focus }
    }

    /// Create a collapsed selection (caret).
    pub fn caret(at: Position) -> Self {
        Self {
            anchor: at,
            focus: at,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// Which neighbouring text node a linear offset resolves into when it falls
/// exactly on a boundary between two of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapDirection {
    /// Prefer the start of the following text node.
    Forward,
    /// Prefer the end of the preceding text node.
    Backward,
}
