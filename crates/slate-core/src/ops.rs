use serde::{Deserialize, Serialize};

use crate::error::{ApplyError, PathError};
use crate::node::{AttrPatch, Attrs, Document, Node};
use crate::path::{Path, PathExt};
use crate::range::{Affinity, Point, Range};

/// Primitive, invertible document operation. Every edit is a sequence of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    InsertText {
        path: Path,
        offset: usize,
        text: String,
    },
    RemoveText {
        path: Path,
        range: std::ops::Range<usize>,
    },
    InsertNode {
        path: Path,
        node: Node,
    },
    RemoveNode {
        path: Path,
    },
    /// Splits the node at `path` at `position` (byte offset for text, child
    /// index for elements). The new right half gets `properties`, or a copy of
    /// the left half's properties when absent.
    SplitNode {
        path: Path,
        position: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        properties: Option<Attrs>,
    },
    /// Merges the node at `path` into its previous sibling, whose length must
    /// equal `position`.
    MergeNode {
        path: Path,
        position: usize,
    },
    /// Moves a node. `new_path` addresses the tree after the node has been
    /// removed from `path`, which is also where the node ends up.
    MoveNode {
        path: Path,
        new_path: Path,
    },
    SetNode {
        path: Path,
        patch: AttrPatch,
    },
    SetSelection {
        selection: Option<Range>,
    },
}

impl Op {
    pub fn path(&self) -> Option<&[usize]> {
        match self {
            Op::InsertText { path, .. }
            | Op::RemoveText { path, .. }
            | Op::InsertNode { path, .. }
            | Op::RemoveNode { path }
            | Op::SplitNode { path, .. }
            | Op::MergeNode { path, .. }
            | Op::MoveNode { path, .. }
            | Op::SetNode { path, .. } => Some(path),
            Op::SetSelection { .. } => None,
        }
    }

    pub fn is_selection(&self) -> bool {
        matches!(self, Op::SetSelection { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A batch of ops applied atomically by `Editor::apply`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub ops: Vec<Op>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_after: Option<Range>,
    #[serde(default)]
    pub meta: TransactionMeta,
}

impl Transaction {
    pub fn new(ops: Vec<Op>) -> Self {
        Self {
            ops,
            selection_after: None,
            meta: TransactionMeta::default(),
        }
    }

    pub fn selection_after(mut self, selection_after: Range) -> Self {
        self.selection_after = Some(selection_after);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.meta.source = Some(source.into());
        self
    }
}

/// Apply `op` to `doc` and `selection`, returning the op that undoes it.
pub fn apply_op_to(
    doc: &mut Document,
    selection: &mut Option<Range>,
    op: &Op,
) -> Result<Op, ApplyError> {
    let inverse = match op {
        Op::InsertText { path, offset, text } => {
            let node = doc.text_mut(path)?;
            if *offset > node.text.len() || !node.text.is_char_boundary(*offset) {
                return Err(ApplyError::Offset {
                    path: path.clone(),
                    offset: *offset,
                });
            }
            node.text.insert_str(*offset, text);
            Op::RemoveText {
                path: path.clone(),
                range: *offset..offset + text.len(),
            }
        }
        Op::RemoveText { path, range } => {
            let node = doc.text_mut(path)?;
            for offset in [range.start, range.end] {
                if range.start > range.end || !node.text.is_char_boundary(offset) {
                    return Err(ApplyError::Offset {
                        path: path.clone(),
                        offset,
                    });
                }
            }
            let removed: String = node.text.drain(range.clone()).collect();
            Op::InsertText {
                path: path.clone(),
                offset: range.start,
                text: removed,
            }
        }
        Op::InsertNode { path, node } => {
            doc.insert(path, node.clone())?;
            Op::RemoveNode { path: path.clone() }
        }
        Op::RemoveNode { path } => {
            let node = doc.remove(path)?;
            Op::InsertNode {
                path: path.clone(),
                node,
            }
        }
        Op::SplitNode {
            path,
            position,
            properties,
        } => {
            let next = path.next().ok_or(PathError::Root)?;
            let node = doc.node_mut(path)?;
            let mut right = node.empty_like(properties.as_ref());
            let fits = match &*node {
                Node::Text(text) => *position <= text.text.len() && text.text.is_char_boundary(*position),
                Node::Element(el) => *position <= el.children.len(),
            };
            if !fits {
                return Err(ApplyError::Offset {
                    path: path.clone(),
                    offset: *position,
                });
            }
            match (node, &mut right) {
                (Node::Text(left), Node::Text(right)) => right.text = left.text.split_off(*position),
                (Node::Element(left), Node::Element(right)) => {
                    right.children = left.children.split_off(*position)
                }
                _ => {}
            }
            doc.insert(&next, right)?;
            Op::MergeNode {
                path: next,
                position: *position,
            }
        }
        Op::MergeNode { path, position } => {
            let merge_err = |reason| ApplyError::Merge {
                path: path.clone(),
                reason,
            };
            let prev_path = path
                .previous()
                .ok_or_else(|| merge_err("it has no previous sibling"))?;
            let prev_len = match (doc.node(&prev_path), doc.node(path)) {
                (Some(Node::Text(prev)), Some(Node::Text(_))) => prev.text.len(),
                (Some(Node::Element(prev)), Some(Node::Element(_))) => prev.children.len(),
                (Some(_), Some(_)) => return Err(merge_err("text and elements cannot merge")),
                _ => return Err(PathError::Missing(path.clone()).into()),
            };
            if prev_len != *position {
                return Err(merge_err("position does not match the previous sibling"));
            }
            let node = doc.remove(path)?;
            let properties = node.props();
            match (doc.node_mut(&prev_path)?, node) {
                (Node::Text(prev), Node::Text(node)) => prev.text.push_str(&node.text),
                (Node::Element(prev), Node::Element(node)) => prev.children.extend(node.children),
                _ => return Err(merge_err("text and elements cannot merge")),
            }
            Op::SplitNode {
                path: prev_path,
                position: *position,
                properties: Some(properties),
            }
        }
        Op::MoveNode { path, new_path } => {
            if path != new_path {
                let node = doc.remove(path)?;
                if !can_insert_at(doc, new_path) {
                    doc.insert(path, node)?;
                    return Err(ApplyError::Move {
                        path: path.clone(),
                        new_path: new_path.clone(),
                    });
                }
                doc.insert(new_path, node)?;
            }
            Op::MoveNode {
                path: new_path.clone(),
                new_path: path.clone(),
            }
        }
        Op::SetNode { path, patch } => {
            let node = doc.node_mut(path)?;
            let inverse = node
                .apply_patch(patch)
                .map_err(|key| ApplyError::Property {
                    path: path.clone(),
                    key,
                })?;
            Op::SetNode {
                path: path.clone(),
                patch: inverse,
            }
        }
        Op::SetSelection {
            selection: new_selection,
        } => {
            let old = std::mem::replace(selection, new_selection.clone());
            return Ok(Op::SetSelection { selection: old });
        }
    };

    transform_selection(doc, selection, op);
    Ok(inverse)
}

fn can_insert_at(doc: &Document, path: &[usize]) -> bool {
    let Some((ix, parent)) = path.split_last() else {
        return false;
    };
    doc.children_at(parent)
        .is_some_and(|children| *ix <= children.len())
}

fn transform_selection(doc: &Document, selection: &mut Option<Range>, op: &Op) {
    let Some(range) = selection.take() else {
        return;
    };
    let anchor = transform_point(&range.anchor, op, Some(Affinity::Forward))
        .or_else(|| relocate_removed_point(doc, op));
    let focus = transform_point(&range.focus, op, Some(Affinity::Forward))
        .or_else(|| relocate_removed_point(doc, op));
    *selection = match (anchor, focus) {
        (Some(anchor), Some(focus)) => Some(Range::new(anchor, focus)),
        _ => None,
    };
}

fn relocate_removed_point(doc: &Document, op: &Op) -> Option<Point> {
    let Op::RemoveNode { path } = op else {
        return None;
    };

    let mut prev: Option<(Path, usize)> = None;
    let mut next: Option<Path> = None;
    for (text, text_path) in doc.texts() {
        if text_path.is_before(path) {
            prev = Some((text_path, text.text.len()));
        } else {
            next = Some(text_path);
            break;
        }
    }

    let prefer_next = match (&prev, &next) {
        (Some((prev_path, _)), Some(next_path)) => {
            if next_path == path {
                next_path.last() == Some(&0)
            } else {
                prev_path.common(path).len() < next_path.common(path).len()
            }
        }
        _ => false,
    };

    match (prev, next) {
        (Some((prev_path, len)), _) if !prefer_next => Some(Point::new(prev_path, len)),
        (_, Some(next_path)) => Some(Point::new(next_path, 0)),
        _ => None,
    }
}

/// Where a path ends up after `op`; `None` when the node it named is gone.
pub fn transform_path(path: &[usize], op: &Op, affinity: Option<Affinity>) -> Option<Path> {
    let mut p = path.to_vec();
    if p.is_empty() {
        return Some(p);
    }

    match op {
        Op::InsertNode { path: op_path, .. } => {
            if op_path == &p || op_path.ends_before(&p) || op_path.is_ancestor_of(&p) {
                p[op_path.len() - 1] += 1;
            }
        }
        Op::RemoveNode { path: op_path } => {
            if op_path.is_common_with(&p) {
                return None;
            }
            if op_path.ends_before(&p) {
                p[op_path.len() - 1] -= 1;
            }
        }
        Op::MergeNode {
            path: op_path,
            position,
        } => {
            if op_path == &p || op_path.ends_before(&p) {
                p[op_path.len() - 1] -= 1;
            } else if op_path.is_ancestor_of(&p) {
                p[op_path.len() - 1] -= 1;
                p[op_path.len()] += position;
            }
        }
        Op::SplitNode {
            path: op_path,
            position,
            ..
        } => {
            if op_path == &p {
                match affinity {
                    Some(Affinity::Forward) => {
                        let last = p.len() - 1;
                        p[last] += 1;
                    }
                    Some(Affinity::Backward) => {}
                    None => return None,
                }
            } else if op_path.ends_before(&p) {
                p[op_path.len() - 1] += 1;
            } else if op_path.is_ancestor_of(&p) && *position <= p[op_path.len()] {
                p[op_path.len() - 1] += 1;
                p[op_path.len()] -= position;
            }
        }
        Op::MoveNode {
            path: op_path,
            new_path,
        } => {
            if op_path == new_path {
                return Some(p);
            }
            if op_path.is_common_with(&p) {
                let mut moved = new_path.clone();
                moved.extend_from_slice(&p[op_path.len()..]);
                return Some(moved);
            }
            if op_path.ends_before(&p) {
                p[op_path.len() - 1] -= 1;
            }
            if new_path == &p || new_path.ends_before(&p) || new_path.is_ancestor_of(&p) {
                p[new_path.len() - 1] += 1;
            }
        }
        Op::InsertText { .. }
        | Op::RemoveText { .. }
        | Op::SetNode { .. }
        | Op::SetSelection { .. } => {}
    }
    Some(p)
}

/// Where a point ends up after `op`. With no affinity a point sitting exactly
/// on a split is dropped.
pub fn transform_point(point: &Point, op: &Op, affinity: Option<Affinity>) -> Option<Point> {
    let mut p = point.clone();
    match op {
        Op::InsertText { path, offset, text } => {
            if path == &p.path
                && (*offset < p.offset
                    || (*offset == p.offset && affinity == Some(Affinity::Forward)))
            {
                p.offset += text.len();
            }
        }
        Op::RemoveText { path, range } => {
            if path == &p.path && range.start <= p.offset {
                p.offset -= (p.offset - range.start).min(range.len());
            }
        }
        Op::MergeNode { path, position } => {
            if path == &p.path {
                p.offset += position;
            }
            p.path = transform_path(&p.path, op, affinity)?;
        }
        Op::SplitNode { path, position, .. } => {
            if path == &p.path {
                if *position == p.offset && affinity.is_none() {
                    return None;
                }
                if *position < p.offset
                    || (*position == p.offset && affinity == Some(Affinity::Forward))
                {
                    p.offset -= position;
                    p.path = path.next()?;
                }
            } else {
                p.path = transform_path(&p.path, op, affinity)?;
            }
        }
        _ => {
            p.path = transform_path(&p.path, op, affinity)?;
        }
    }
    Some(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_node_paths_follow_the_moved_subtree() {
        let op = Op::MoveNode {
            path: vec![0],
            new_path: vec![1, 0],
        };
        assert_eq!(transform_path(&[0, 2], &op, None), Some(vec![1, 0, 2]));
        assert_eq!(transform_path(&[1], &op, None), Some(vec![0]));
        assert_eq!(transform_path(&[2, 0], &op, None), Some(vec![1, 1]));
        assert_eq!(transform_path(&[3], &op, None), Some(vec![2]));
    }

    #[test]
    fn split_moves_points_after_the_position_into_the_new_node() {
        let op = Op::SplitNode {
            path: vec![0, 0],
            position: 3,
            properties: None,
        };
        let before = Point::new(vec![0, 0], 2);
        let after = Point::new(vec![0, 0], 5);
        let at = Point::new(vec![0, 0], 3);
        assert_eq!(transform_point(&before, &op, Some(Affinity::Forward)), Some(before.clone()));
        assert_eq!(
            transform_point(&after, &op, Some(Affinity::Forward)),
            Some(Point::new(vec![0, 1], 2))
        );
        assert_eq!(transform_point(&at, &op, Some(Affinity::Backward)), Some(at.clone()));
        assert_eq!(transform_point(&at, &op, None), None);
    }

    #[test]
    fn inverse_of_split_is_merge_and_back() {
        let mut doc = Document::new(vec![Node::paragraph("hello world")]);
        let mut selection = Some(Range::collapsed(Point::new(vec![0, 0], 8)));
        let split = Op::SplitNode {
            path: vec![0, 0],
            position: 5,
            properties: None,
        };
        let inverse = apply_op_to(&mut doc, &mut selection, &split).unwrap();
        assert_eq!(doc.string(&[0, 1]), " world");
        assert_eq!(selection, Some(Range::collapsed(Point::new(vec![0, 1], 3))));

        apply_op_to(&mut doc, &mut selection, &inverse).unwrap();
        assert_eq!(doc, Document::new(vec![Node::paragraph("hello world")]));
        assert_eq!(selection, Some(Range::collapsed(Point::new(vec![0, 0], 8))));
    }

    #[test]
    fn removing_the_selected_text_relocates_to_the_previous_text() {
        let mut doc = Document::new(vec![Node::paragraph("ab"), Node::paragraph("cd")]);
        let mut selection = Some(Range::collapsed(Point::new(vec![1, 0], 1)));
        apply_op_to(&mut doc, &mut selection, &Op::RemoveNode { path: vec![1] }).unwrap();
        assert_eq!(selection, Some(Range::collapsed(Point::new(vec![0, 0], 2))));
    }
}
