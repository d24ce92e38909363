//! Structural transforms built from primitive ops.
//!
//! Every public transform runs inside [`Editor::transact`]: it either applies
//! completely and is normalized once, or leaves the editor untouched.
//!
//! [`Editor::transact`]: crate::Editor

mod node;
mod selection;
mod text;

use crate::query::{Match, Mode, Unit};
use crate::range::{Edge, Location};

/// Options for transforms that select their targets by a match.
#[derive(Debug, Clone)]
pub struct NodeOptions {
    /// Defaults to the selection; with neither, the transform does nothing.
    pub at: Option<Location>,
    /// Defaults to the node at `at` for paths, and to blocks otherwise.
    pub matches: Option<Match>,
    pub mode: Mode,
    /// Split text and elements at the range edges so only the covered part
    /// is affected.
    pub split: bool,
    /// Keep a range that ends at the start of the next block as is.
    pub hanging: bool,
    pub voids: bool,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            at: None,
            matches: None,
            mode: Mode::Lowest,
            split: false,
            hanging: false,
            voids: false,
        }
    }
}

impl NodeOptions {
    pub fn at(at: impl Into<Location>) -> Self {
        Self {
            at: Some(at.into()),
            ..Self::default()
        }
    }

    pub fn matching(mut self, matches: Match) -> Self {
        self.matches = Some(matches);
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn split(mut self) -> Self {
        self.split = true;
        self
    }

    pub fn voids(mut self, voids: bool) -> Self {
        self.voids = voids;
        self
    }
}

#[derive(Debug, Clone)]
pub struct InsertOptions {
    pub at: Option<Location>,
    /// Which ancestor of a point target is split to make room. Defaults by
    /// the first node: text for text, inline for inline elements, block
    /// otherwise.
    pub matches: Option<Match>,
    pub mode: Mode,
    /// Move the selection to the end of the inserted nodes. Defaults to true
    /// when inserting at the selection.
    pub select: Option<bool>,
    pub voids: bool,
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self {
            at: None,
            matches: None,
            mode: Mode::Lowest,
            select: None,
            voids: false,
        }
    }
}

impl InsertOptions {
    pub fn at(at: impl Into<Location>) -> Self {
        Self {
            at: Some(at.into()),
            ..Self::default()
        }
    }

    pub fn select(mut self, select: bool) -> Self {
        self.select = Some(select);
        self
    }
}

#[derive(Debug, Clone)]
pub struct SplitOptions {
    pub at: Option<Location>,
    /// The highest node to split. Defaults to the lowest enclosing block.
    pub matches: Option<Match>,
    pub mode: Mode,
    /// Split even when the point sits at an edge of a node.
    pub always: bool,
    pub height: usize,
    pub voids: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            at: None,
            matches: None,
            mode: Mode::Lowest,
            always: false,
            height: 0,
            voids: false,
        }
    }
}

impl SplitOptions {
    pub fn at(at: impl Into<Location>) -> Self {
        Self {
            at: Some(at.into()),
            ..Self::default()
        }
    }

    pub fn always(mut self) -> Self {
        self.always = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct DeleteOptions {
    pub at: Option<Location>,
    pub distance: usize,
    pub unit: Unit,
    pub reverse: bool,
    pub hanging: bool,
    pub voids: bool,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            at: None,
            distance: 1,
            unit: Unit::Character,
            reverse: false,
            hanging: false,
            voids: false,
        }
    }
}

impl DeleteOptions {
    pub fn at(at: impl Into<Location>) -> Self {
        Self {
            at: Some(at.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct MoveOptions {
    pub distance: usize,
    pub unit: Unit,
    pub reverse: bool,
    pub edge: Option<Edge>,
}

impl Default for MoveOptions {
    fn default() -> Self {
        Self {
            distance: 1,
            unit: Unit::Character,
            reverse: false,
            edge: None,
        }
    }
}
