use crate::editor::Editor;
use crate::error::{ApplyError, EditorError, PathError};
use crate::ops::Op;
use crate::range::{Edge, Location, Point, Range};

use super::MoveOptions;

impl Editor {
    /// Select a location; a path selects its whole content.
    pub fn select(&mut self, target: impl Into<Location>) -> Result<(), EditorError> {
        let target = target.into();
        self.transact("select", |editor| editor.select_inner(target))
    }

    pub fn deselect(&mut self) -> Result<(), EditorError> {
        self.transact("deselect", |editor| {
            if editor.selection().is_some() {
                editor.apply_op(Op::SetSelection { selection: None })?;
            }
            Ok(())
        })
    }

    pub fn collapse(&mut self, edge: Edge) -> Result<(), EditorError> {
        self.transact("collapse", |editor| editor.collapse_inner(edge))
    }

    pub(crate) fn collapse_inner(&mut self, edge: Edge) -> Result<(), EditorError> {
        let Some(selection) = self.selection() else {
            return Ok(());
        };
        let collapsed = selection.collapse(edge);
        self.select_inner(Location::Range(collapsed))
    }

    /// Move the selection by `distance` units. Moving both edges of a
    /// collapsed selection moves the caret.
    pub fn move_selection(&mut self, options: MoveOptions) -> Result<(), EditorError> {
        self.transact("move_selection", |editor| {
            let Some(selection) = editor.selection().cloned() else {
                return Ok(());
            };
            let step = |editor: &Editor, point: &Point| {
                let mut current = point.clone();
                for _ in 0..options.distance {
                    let next = if options.reverse {
                        editor.before(&current, options.unit)
                    } else {
                        editor.after(&current, options.unit)
                    };
                    match next {
                        Some(next) => current = next,
                        None => break,
                    }
                }
                current
            };

            let (start, end) = selection.edges();
            let (move_anchor, move_focus) = match options.edge {
                None => (true, true),
                Some(Edge::Anchor) => (true, false),
                Some(Edge::Focus) => (false, true),
                Some(Edge::Start) => (start == &selection.anchor, start == &selection.focus),
                Some(Edge::End) => (end == &selection.anchor, end == &selection.focus),
            };
            let anchor = if move_anchor {
                step(editor, &selection.anchor)
            } else {
                selection.anchor.clone()
            };
            let focus = if move_focus {
                step(editor, &selection.focus)
            } else {
                selection.focus.clone()
            };
            editor.select_inner(Location::Range(Range::new(anchor, focus)))
        })
    }

    pub fn set_point(&mut self, point: Point, edge: Edge) -> Result<(), EditorError> {
        self.transact("set_point", |editor| {
            let Some(selection) = editor.selection().cloned() else {
                return Ok(());
            };
            let is_backward = selection.is_backward();
            let set_anchor = match edge {
                Edge::Anchor => true,
                Edge::Focus => false,
                Edge::Start => !is_backward,
                Edge::End => is_backward,
            };
            let range = if set_anchor {
                Range::new(point, selection.focus)
            } else {
                Range::new(selection.anchor, point)
            };
            editor.select_inner(Location::Range(range))
        })
    }

    pub(crate) fn select_inner(&mut self, target: Location) -> Result<(), EditorError> {
        let range = self.range(&target)?;
        self.check_point(&range.anchor)?;
        self.check_point(&range.focus)?;
        if self.selection() == Some(&range) {
            return Ok(());
        }
        self.apply_op(Op::SetSelection {
            selection: Some(range),
        })?;
        Ok(())
    }

    pub(crate) fn check_point(&self, point: &Point) -> Result<(), EditorError> {
        let Some(text) = self.leaf(point) else {
            return Err(match self.node(&point.path) {
                Some(_) => PathError::NotText(point.path.clone()).into(),
                None => PathError::Missing(point.path.clone()).into(),
            });
        };
        if point.offset > text.text.len() || !text.text.is_char_boundary(point.offset) {
            return Err(ApplyError::Offset {
                path: point.path.clone(),
                offset: point.offset,
            }
            .into());
        }
        Ok(())
    }
}
