use serde_json::Value;

use crate::data::DataTransfer;
use crate::editor::Editor;
use crate::error::EditorError;
use crate::node::{AttrPatch, Node};
use crate::ops::Op;
use crate::path::{Path, PathExt};
use crate::query::{Match, Mode, NodesOptions, Unit};
use crate::range::{Affinity, Location, Point, Range};

use super::{DeleteOptions, InsertOptions, NodeOptions, SplitOptions};

impl Editor {
    /// Delete the content of a range, or `distance` units from a point.
    /// Blocks the range spans are merged.
    pub fn delete(&mut self, options: DeleteOptions) -> Result<(), EditorError> {
        self.transact("delete", |editor| editor.delete_inner(options))
    }

    /// Insert `text` at a location without going through the plugin chain.
    pub fn insert_text_at(
        &mut self,
        text: &str,
        at: impl Into<Location>,
    ) -> Result<(), EditorError> {
        let at = at.into();
        self.transact("insert_text_at", |editor| {
            editor.insert_text_at_inner(text, Some(at), false)
        })
    }

    /// Set a mark on the selected text, or remember it for the next insert
    /// when the selection is collapsed.
    pub fn add_mark(&mut self, key: &str, value: impl Into<Value>) -> Result<(), EditorError> {
        let value = value.into();
        self.transact("add_mark", |editor| {
            let Some(selection) = editor.selection().cloned() else {
                return Ok(());
            };
            if selection.is_expanded() {
                editor.set_nodes_inner(
                    AttrPatch::set(key, value),
                    NodeOptions::default().matching(Match::Text).split(),
                )
            } else {
                let mut marks = editor.marks().unwrap_or_default();
                marks.insert(key.to_string(), value);
                editor.set_pending_marks(Some(marks));
                Ok(())
            }
        })
    }

    pub fn remove_mark(&mut self, key: &str) -> Result<(), EditorError> {
        self.transact("remove_mark", |editor| {
            let Some(selection) = editor.selection().cloned() else {
                return Ok(());
            };
            if selection.is_expanded() {
                editor.set_nodes_inner(
                    AttrPatch::remove([key]),
                    NodeOptions::default().matching(Match::Text).split(),
                )
            } else {
                let mut marks = editor.marks().unwrap_or_default();
                marks.remove(key);
                editor.set_pending_marks(Some(marks));
                Ok(())
            }
        })
    }

    pub(crate) fn default_insert_text(&mut self, text: &str) -> Result<(), EditorError> {
        let Some(selection) = self.selection().cloned() else {
            return Ok(());
        };
        match self.pending_marks().cloned() {
            Some(marks) => {
                self.insert_nodes_inner(vec![Node::marked(text, marks)], InsertOptions::default())?;
            }
            None => {
                self.insert_text_at_inner(text, Some(Location::Range(selection)), false)?;
            }
        }
        self.set_pending_marks(None);
        Ok(())
    }

    pub(crate) fn default_insert_data(&mut self, data: DataTransfer) -> Result<(), EditorError> {
        let Some(text) = data.text else {
            return Ok(());
        };
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.split_nodes_inner(SplitOptions::default().always())?;
            }
            self.default_insert_text(line)?;
        }
        Ok(())
    }

    pub(crate) fn default_delete(&mut self, unit: Unit, reverse: bool) -> Result<(), EditorError> {
        let Some(selection) = self.selection() else {
            return Ok(());
        };
        let options = if selection.is_collapsed() {
            DeleteOptions {
                unit,
                reverse,
                ..DeleteOptions::default()
            }
        } else {
            DeleteOptions {
                reverse,
                ..DeleteOptions::default()
            }
        };
        self.delete_inner(options)
    }

    pub(crate) fn default_insert_break(&mut self) -> Result<(), EditorError> {
        self.split_nodes_inner(SplitOptions::default().always())
    }

    pub(crate) fn insert_text_at_inner(
        &mut self,
        text: &str,
        at: Option<Location>,
        voids: bool,
    ) -> Result<(), EditorError> {
        let Some(at) = self.target(at) else {
            return Ok(());
        };
        let point = match at {
            Location::Path(path) => self.end(&Location::Path(path))?,
            Location::Point(point) => point,
            Location::Range(range) if range.is_collapsed() => range.anchor,
            Location::Range(range) => {
                if !voids && self.void_above(&Location::Point(range.end().clone())).is_some() {
                    return Ok(());
                }
                let start = range.start().clone();
                let end = range.end().clone();
                let start_ref = self.point_ref(start, Some(Affinity::Backward));
                let end_ref = self.point_ref(end, Some(Affinity::Forward));
                self.delete_inner(DeleteOptions {
                    at: Some(Location::Range(range)),
                    voids,
                    ..DeleteOptions::default()
                })?;
                let start = self.unref_point(start_ref);
                let end = self.unref_point(end_ref);
                let Some(point) = start.or(end) else {
                    return Ok(());
                };
                self.select_inner(Location::Point(point.clone()))?;
                point
            }
        };

        if !voids && self.void_above(&Location::Point(point.clone())).is_some() {
            return Ok(());
        }
        if !text.is_empty() {
            self.apply_op(Op::InsertText {
                path: point.path,
                offset: point.offset,
                text: text.to_string(),
            })?;
        }
        Ok(())
    }

    pub(crate) fn delete_inner(&mut self, options: DeleteOptions) -> Result<(), EditorError> {
        let DeleteOptions {
            at,
            distance,
            unit,
            reverse,
            mut hanging,
            voids,
        } = options;
        let explicit_at = at.is_some();
        let Some(at) = self.target(at) else {
            return Ok(());
        };

        let at = match at {
            Location::Range(range) if range.is_collapsed() => Location::Point(range.anchor),
            other => other,
        };
        let at = match at {
            Location::Point(point) => {
                let void_path = if voids {
                    None
                } else {
                    self.void_above(&Location::Point(point.clone()))
                };
                match void_path {
                    Some(path) => Location::Path(path),
                    None => {
                        let mut target = point.clone();
                        for _ in 0..distance.max(1) {
                            let step = if reverse {
                                self.before(&target, unit)
                            } else {
                                self.after(&target, unit)
                            };
                            match step {
                                Some(next) => target = next,
                                None => break,
                            }
                        }
                        hanging = true;
                        Location::Range(Range::new(point, target))
                    }
                }
            }
            other => other,
        };

        let mut range = match at {
            Location::Path(path) => {
                return self.remove_nodes_inner(NodeOptions {
                    at: Some(Location::Path(path)),
                    voids,
                    ..NodeOptions::default()
                });
            }
            Location::Point(_) => return Ok(()),
            Location::Range(range) => range,
        };
        if range.is_collapsed() {
            return Ok(());
        }
        if !hanging {
            let end_of_doc = self.end(&Location::Path(Vec::new())).ok();
            if end_of_doc.as_ref() != Some(range.end()) {
                range = self.unhang_range(&range);
            }
        }

        let (start, end) = range.edges();
        let (mut start, mut end) = (start.clone(), end.clone());
        let start_block = self.block_path(&start);
        let end_block = self.block_path(&end);
        let is_across_blocks = matches!((&start_block, &end_block), (Some(a), Some(b)) if a != b);
        let is_single_text = start.path == end.path;
        let start_void = if voids {
            None
        } else {
            self.void_above(&Location::Point(start.clone()))
        };
        let end_void = if voids {
            None
        } else {
            self.void_above(&Location::Point(end.clone()))
        };

        if let Some(void_path) = &start_void {
            if let Some(before) = self.text_beside(void_path, true) {
                if start_block.as_ref().is_some_and(|b| b.is_ancestor_of(&before.path)) {
                    start = before;
                }
            }
        }
        if let Some(void_path) = &end_void {
            if let Some(after) = self.text_beside(void_path, false) {
                if end_block.as_ref().is_some_and(|b| b.is_ancestor_of(&after.path)) {
                    end = after;
                }
            }
        }

        let mut covered: Vec<Path> = Vec::new();
        for (node, path) in self.nodes(NodesOptions {
            at: Some(Location::Range(range.clone())),
            matches: Match::Any,
            mode: Mode::All,
            reverse: false,
            voids,
        }) {
            if covered.last().is_some_and(|last| last.is_ancestor_of(&path)) {
                continue;
            }
            let is_void = !voids && self.is_void_node(node);
            if is_void || (!path.is_common_with(&start.path) && !path.is_common_with(&end.path)) {
                covered.push(path);
            }
        }
        let covered_refs: Vec<_> = covered.into_iter().map(|p| self.path_ref(p)).collect();
        let start_ref = self.point_ref(start.clone(), Some(Affinity::Forward));
        let end_ref = self.point_ref(end.clone(), Some(Affinity::Forward));

        if !is_single_text && start_void.is_none() {
            if let Some(point) = self.point_ref_current(start_ref) {
                let len = self.leaf(&point).map_or(0, |leaf| leaf.text.len());
                if start.offset < len {
                    self.apply_op(Op::RemoveText {
                        path: point.path,
                        range: start.offset..len,
                    })?;
                }
            }
        }

        for path_ref in covered_refs.into_iter().rev() {
            if let Some(path) = self.unref_path(path_ref) {
                self.apply_op(Op::RemoveNode { path })?;
            }
        }

        if end_void.is_none() {
            if let Some(point) = self.point_ref_current(end_ref) {
                let from = if is_single_text { start.offset } else { 0 };
                if from < end.offset {
                    self.apply_op(Op::RemoveText {
                        path: point.path,
                        range: from..end.offset,
                    })?;
                }
            }
        }

        if !is_single_text && is_across_blocks {
            let end_now = self.point_ref_current(end_ref);
            if let (Some(end_now), Some(_)) = (end_now, self.point_ref_current(start_ref)) {
                self.merge_nodes_inner(NodeOptions {
                    at: Some(Location::Point(end_now)),
                    hanging: true,
                    voids,
                    ..NodeOptions::default()
                })?;
            }
        }

        let start_after = self.unref_point(start_ref);
        let end_after = self.unref_point(end_ref);
        let point = if reverse {
            start_after.or(end_after)
        } else {
            end_after.or(start_after)
        };
        if !explicit_at {
            if let Some(point) = point {
                self.select_inner(Location::Point(point))?;
            }
        }
        Ok(())
    }

    fn block_path(&self, point: &Point) -> Option<Path> {
        self.block_above(&Location::Point(point.clone()))
            .map(|(_, path)| path)
    }

    fn text_beside(&self, void_path: &[usize], before: bool) -> Option<Point> {
        let path = if before {
            void_path.previous()?
        } else {
            void_path.next()?
        };
        let text = self.doc().text(&path)?;
        let offset = if before { text.text.len() } else { 0 };
        Some(Point::new(path, offset))
    }
}
