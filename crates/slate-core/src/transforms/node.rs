use crate::editor::Editor;
use crate::error::{EditorError, PathError};
use crate::node::{AttrPatch, ElementNode, Node};
use crate::ops::{Op, transform_path};
use crate::path::{Path, PathExt};
use crate::query::{Match, Mode, NodesOptions};
use crate::range::{Affinity, Location, Point, Range};

use super::{DeleteOptions, InsertOptions, NodeOptions, SplitOptions};

impl Editor {
    /// Insert `nodes` at a path, or at a point after splitting the node the
    /// point falls in. An expanded range is deleted first.
    pub fn insert_nodes(
        &mut self,
        nodes: Vec<Node>,
        options: InsertOptions,
    ) -> Result<(), EditorError> {
        self.transact("insert_nodes", |editor| {
            editor.insert_nodes_inner(nodes, options)
        })
    }

    pub fn remove_nodes(&mut self, options: NodeOptions) -> Result<(), EditorError> {
        self.transact("remove_nodes", |editor| editor.remove_nodes_inner(options))
    }

    /// Patch the properties of every matching node. With `split`, text and
    /// inline nodes are split at the range edges first.
    pub fn set_nodes(&mut self, patch: AttrPatch, options: NodeOptions) -> Result<(), EditorError> {
        self.transact("set_nodes", |editor| editor.set_nodes_inner(patch, options))
    }

    pub fn unset_nodes<I, S>(&mut self, keys: I, options: NodeOptions) -> Result<(), EditorError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patch = AttrPatch::remove(keys);
        self.transact("unset_nodes", |editor| editor.set_nodes_inner(patch, options))
    }

    pub fn split_nodes(&mut self, options: SplitOptions) -> Result<(), EditorError> {
        self.transact("split_nodes", |editor| editor.split_nodes_inner(options))
    }

    /// Merge the matching node into the node before it, moving it next to
    /// that node first when they are not siblings.
    pub fn merge_nodes(&mut self, options: NodeOptions) -> Result<(), EditorError> {
        self.transact("merge_nodes", |editor| editor.merge_nodes_inner(options))
    }

    /// Move the matching nodes so the first lands at `to`. `to` addresses the
    /// tree after the node has been taken out of its old place.
    pub fn move_nodes(&mut self, options: NodeOptions, to: Path) -> Result<(), EditorError> {
        self.transact("move_nodes", |editor| editor.move_nodes_inner(options, to))
    }

    /// Move the matching nodes up one level, splitting their parent when
    /// they sit in the middle of it.
    pub fn lift_nodes(&mut self, options: NodeOptions) -> Result<(), EditorError> {
        self.transact("lift_nodes", |editor| editor.lift_nodes_inner(options))
    }

    pub fn wrap_nodes(
        &mut self,
        element: ElementNode,
        options: NodeOptions,
    ) -> Result<(), EditorError> {
        self.transact("wrap_nodes", |editor| {
            editor.wrap_nodes_inner(element, options)
        })
    }

    pub fn unwrap_nodes(&mut self, options: NodeOptions) -> Result<(), EditorError> {
        self.transact("unwrap_nodes", |editor| editor.unwrap_nodes_inner(options))
    }

    pub(crate) fn target(&self, at: Option<Location>) -> Option<Location> {
        at.or_else(|| self.selection().cloned().map(Location::Range))
    }

    fn default_match(at: &Location) -> Match {
        match at {
            Location::Path(path) => Match::Path(path.clone()),
            _ => Match::Block,
        }
    }

    pub(crate) fn delete_range(&mut self, range: Range) -> Result<Option<Point>, EditorError> {
        if range.is_collapsed() {
            return Ok(Some(range.anchor));
        }
        let end_ref = self.point_ref(range.end().clone(), Some(Affinity::Forward));
        self.delete_inner(DeleteOptions::at(range))?;
        Ok(self.unref_point(end_ref))
    }

    fn matching_paths(&self, at: Location, matches: Match, mode: Mode, voids: bool) -> Vec<Path> {
        self.nodes(NodesOptions {
            at: Some(at),
            matches,
            mode,
            reverse: false,
            voids,
        })
        .map(|(_, path)| path)
        .collect()
    }

    fn first_match(&self, at: Location, matches: Match, mode: Mode, voids: bool) -> Option<Path> {
        self.nodes(NodesOptions {
            at: Some(at),
            matches,
            mode,
            reverse: false,
            voids,
        })
        .next()
        .map(|(_, path)| path)
    }

    pub(crate) fn insert_nodes_inner(
        &mut self,
        nodes: Vec<Node>,
        options: InsertOptions,
    ) -> Result<(), EditorError> {
        let InsertOptions {
            at,
            matches,
            mode,
            select,
            voids,
        } = options;
        let Some(first) = nodes.first() else {
            return Ok(());
        };
        let (at, select) = match at {
            Some(at) => (at, select.unwrap_or(false)),
            None => match self.selection() {
                Some(selection) => (Location::Range(selection.clone()), select.unwrap_or(true)),
                None => return Ok(()),
            },
        };
        let matches = matches.unwrap_or_else(|| match first {
            Node::Text(_) => Match::Text,
            Node::Element(el) if self.is_inline(el) => Match::Inline,
            Node::Element(_) => Match::Block,
        });

        let point = match at {
            Location::Path(path) => Err(path),
            Location::Point(point) => Ok(point),
            Location::Range(range) => match self.delete_range(range)? {
                Some(point) => Ok(point),
                None => return Ok(()),
            },
        };
        let at_path = match point {
            Err(path) => path,
            Ok(point) => {
                let Some(match_path) =
                    self.first_match(Location::Point(point.clone()), matches.clone(), mode, voids)
                else {
                    return Ok(());
                };
                let path_ref = self.path_ref(match_path.clone());
                let is_at_end = self.is_end(&point, &match_path);
                self.split_nodes_inner(SplitOptions {
                    at: Some(Location::Point(point)),
                    matches: Some(matches),
                    mode,
                    voids,
                    ..SplitOptions::default()
                })?;
                let path = self
                    .unref_path(path_ref)
                    .ok_or(EditorError::NoPosition(match_path))?;
                if is_at_end {
                    path.next().ok_or(PathError::Root)?
                } else {
                    path
                }
            }
        };

        let (&index, parent_path) = at_path.split_last().ok_or(PathError::Root)?;
        let parent_path = parent_path.to_vec();
        if !voids {
            let parent_is_void = self.node(&parent_path).is_some_and(|n| self.is_void_node(n));
            if parent_is_void || self.void_above(&Location::Path(parent_path.clone())).is_some() {
                return Ok(());
            }
        }

        let count = nodes.len();
        for (i, node) in nodes.into_iter().enumerate() {
            self.apply_op(Op::InsertNode {
                path: parent_path.child(index + i),
                node,
            })?;
        }

        if select {
            let last = parent_path.child(index + count - 1);
            let point = self.end(&Location::Path(last))?;
            self.select_inner(Location::Point(point))?;
        }
        Ok(())
    }

    pub(crate) fn remove_nodes_inner(&mut self, options: NodeOptions) -> Result<(), EditorError> {
        let Some(mut at) = self.target(options.at) else {
            return Ok(());
        };
        let matches = options.matches.unwrap_or_else(|| Self::default_match(&at));
        if !options.hanging {
            if let Location::Range(range) = &at {
                at = Location::Range(self.unhang_range(range));
            }
        }

        let paths = self.matching_paths(at, matches, options.mode, options.voids);
        let refs: Vec<_> = paths.into_iter().map(|p| self.path_ref(p)).collect();
        for path_ref in refs {
            if let Some(path) = self.unref_path(path_ref) {
                self.apply_op(Op::RemoveNode { path })?;
            }
        }
        Ok(())
    }

    pub(crate) fn set_nodes_inner(
        &mut self,
        mut patch: AttrPatch,
        options: NodeOptions,
    ) -> Result<(), EditorError> {
        let explicit_at = options.at.is_some();
        let Some(mut at) = self.target(options.at) else {
            return Ok(());
        };
        let matches = options.matches.unwrap_or_else(|| Self::default_match(&at));
        patch.set.remove("children");
        patch.set.remove("text");
        patch.remove.retain(|key| key != "children" && key != "text");

        if !options.hanging {
            if let Location::Range(range) = &at {
                at = Location::Range(self.unhang_range(range));
            }
        }

        if options.split {
            if let Location::Range(range) = at.clone() {
                if range.is_collapsed()
                    && self.leaf(&range.anchor).is_some_and(|leaf| !leaf.text.is_empty())
                {
                    return Ok(());
                }
                let range_ref = self.range_ref(range.clone());
                let (start, end) = range.edges();
                let (start, end) = (start.clone(), end.clone());
                let split_mode = if options.mode == Mode::Lowest {
                    Mode::Lowest
                } else {
                    Mode::Highest
                };
                let end_at_end = self.is_end(&end, &end.path);
                self.split_nodes_inner(SplitOptions {
                    at: Some(Location::Point(end)),
                    matches: Some(matches.clone()),
                    mode: split_mode,
                    always: !end_at_end,
                    height: 0,
                    voids: options.voids,
                })?;
                let start_at_start = self.is_start(&start, &start.path);
                self.split_nodes_inner(SplitOptions {
                    at: Some(Location::Point(start)),
                    matches: Some(matches.clone()),
                    mode: split_mode,
                    always: !start_at_start,
                    height: 0,
                    voids: options.voids,
                })?;
                let Some(range) = self.unref_range(range_ref) else {
                    return Ok(());
                };
                at = Location::Range(range);
                if !explicit_at {
                    self.select_inner(at.clone())?;
                }
            }
        }

        let changes: Vec<(Path, AttrPatch)> = self
            .nodes(NodesOptions {
                at: Some(at),
                matches,
                mode: options.mode,
                reverse: false,
                voids: options.voids,
            })
            .filter(|(_, path)| !path.is_empty())
            .filter_map(|(node, path)| {
                let diff = patch.diff(&node.props());
                (!diff.is_empty()).then_some((path, diff))
            })
            .collect();
        for (path, patch) in changes {
            self.apply_op(Op::SetNode { path, patch })?;
        }
        Ok(())
    }

    pub(crate) fn split_nodes_inner(&mut self, options: SplitOptions) -> Result<(), EditorError> {
        let SplitOptions {
            at,
            matches,
            mode,
            mut always,
            mut height,
            voids,
        } = options;
        let explicit_at = at.is_some();
        let mut matches = matches.unwrap_or(Match::Block);
        let Some(at) = self.target(at) else {
            return Ok(());
        };

        let mut at = match at {
            Location::Range(range) => match self.delete_range(range)? {
                Some(point) => point,
                None => return Ok(()),
            },
            Location::Point(point) => point,
            Location::Path(path) => {
                let point = self.start(&Location::Path(path.clone()))?;
                let parent = path.parent().ok_or(PathError::Root)?;
                matches = Match::Path(parent);
                height = point.path.len() - path.len() + 1;
                always = true;
                point
            }
        };

        let Some(highest_path) = self.first_match(Location::Point(at.clone()), matches, mode, voids)
        else {
            return Ok(());
        };
        let before_ref = self.point_ref(at.clone(), Some(Affinity::Backward));

        if !voids {
            if let Some(void_path) = self.void_above(&Location::Point(at.clone())) {
                let void_is_inline = self
                    .node(&void_path)
                    .and_then(Node::as_element)
                    .is_some_and(|el| self.is_inline(el));
                if void_is_inline {
                    let next = void_path.next().ok_or(PathError::Root)?;
                    if !matches!(self.node(&next), Some(Node::Text(_))) {
                        self.apply_op(Op::InsertNode {
                            path: next.clone(),
                            node: Node::text(""),
                        })?;
                    }
                    at = Point::new(next, 0);
                }
                height = at.path.len() - void_path.len() + 1;
                always = true;
            }
        }

        let after_ref = self.point_ref(at.clone(), Some(Affinity::Forward));
        let depth = at.path.len().saturating_sub(height);
        let lowest_path = at.path[..depth].to_vec();
        let mut position = if height == 0 {
            at.offset
        } else {
            at.path[depth]
        };

        for len in (1..=lowest_path.len()).rev() {
            let path = lowest_path[..len].to_vec();
            if path.len() < highest_path.len() {
                break;
            }
            let Some(node) = self.node(&path) else {
                break;
            };
            if !voids && self.is_void_node(node) {
                break;
            }
            let properties = node.props();
            let point = self.point_ref_current(before_ref);
            let is_end = point.as_ref().is_some_and(|p| self.is_end(p, &path));
            let split = always || point.as_ref().is_none_or(|p| !self.is_edge(p, &path));
            if split {
                self.apply_op(Op::SplitNode {
                    path: path.clone(),
                    position,
                    properties: Some(properties),
                })?;
            }
            position = path[len - 1] + usize::from(split || is_end);
        }

        let after = self.unref_point(after_ref);
        self.unref_point(before_ref);
        if !explicit_at {
            if let Some(point) = after {
                self.select_inner(Location::Point(point))?;
            }
        }
        Ok(())
    }

    pub(crate) fn merge_nodes_inner(&mut self, options: NodeOptions) -> Result<(), EditorError> {
        let explicit_at = options.at.is_some();
        let Some(mut at) = self.target(options.at) else {
            return Ok(());
        };
        let matches = options.matches.unwrap_or_else(|| match &at {
            Location::Path(path) => Match::ChildOf(path.parent().unwrap_or_default()),
            _ => Match::Block,
        });
        if !options.hanging {
            if let Location::Range(range) = &at {
                at = Location::Range(self.unhang_range(range));
            }
        }
        if let Location::Range(range) = at.clone() {
            if range.is_collapsed() {
                at = Location::Point(range.anchor);
            } else {
                let Some(point) = self.delete_range(range)? else {
                    return Ok(());
                };
                at = Location::Point(point);
                if !explicit_at {
                    self.select_inner(at.clone())?;
                }
            }
        }

        let Some(path) = self.first_match(at.clone(), matches.clone(), options.mode, options.voids)
        else {
            return Ok(());
        };
        let Some((prev_node, prev_path)) = self.previous(&at, &matches, options.mode) else {
            return Ok(());
        };
        if path.is_empty() || prev_path.is_empty() {
            return Ok(());
        }

        let prev_len = prev_node.children().len();
        let (prev_len, prev_removable) = match prev_node {
            Node::Element(el) => (prev_len, self.is_empty(el)),
            Node::Text(text) => (
                text.text.len(),
                text.text.is_empty() && prev_path.last() != Some(&0),
            ),
        };
        let same_kind = self
            .node(&path)
            .is_some_and(|node| node.is_text() == prev_node.is_text());
        if !same_kind {
            return Err(EditorError::MergeKind(path));
        }

        let new_path = prev_path.next().ok_or(PathError::Root)?;
        let common = path.common(&prev_path);
        let is_previous_sibling = path.is_sibling_of(&prev_path);
        let empty_ancestor = self
            .levels(&path)
            .into_iter()
            .filter(|(_, p)| p.len() >= common.len() && p != &path)
            .find(|(node, _)| self.has_single_child_nest(node))
            .map(|(_, p)| p);
        let empty_ref = empty_ancestor.map(|p| self.path_ref(p));

        if !is_previous_sibling {
            let op = Op::RemoveNode { path: path.clone() };
            let target = transform_path(&new_path, &op, Some(Affinity::Forward))
                .ok_or_else(|| EditorError::NoPosition(new_path.clone()))?;
            self.apply_op(Op::MoveNode {
                path,
                new_path: target,
            })?;
        }
        if let Some(empty_ref) = empty_ref {
            if let Some(path) = self.unref_path(empty_ref) {
                self.apply_op(Op::RemoveNode { path })?;
            }
        }

        if prev_removable {
            self.apply_op(Op::RemoveNode { path: prev_path })?;
        } else {
            self.apply_op(Op::MergeNode {
                path: new_path,
                position: prev_len,
            })?;
        }
        Ok(())
    }

    fn has_single_child_nest(&self, node: &Node) -> bool {
        match node {
            Node::Text(_) => true,
            Node::Element(el) if self.is_void(el) => true,
            Node::Element(el) => match el.children.as_slice() {
                [only] => self.has_single_child_nest(only),
                _ => false,
            },
        }
    }

    pub(crate) fn move_nodes_inner(
        &mut self,
        options: NodeOptions,
        to: Path,
    ) -> Result<(), EditorError> {
        let Some(at) = self.target(options.at) else {
            return Ok(());
        };
        let matches = options.matches.unwrap_or_else(|| Self::default_match(&at));
        let paths = self.matching_paths(at, matches, options.mode, options.voids);
        let refs: Vec<_> = paths.into_iter().map(|p| self.path_ref(p)).collect();

        let mut last_moved = None;
        for path_ref in refs {
            let Some(path) = self.unref_path(path_ref) else {
                continue;
            };
            if path.is_empty() {
                continue;
            }
            let new_path = match last_moved.and_then(|r| self.path_ref_current(r)) {
                None => to.clone(),
                Some(prev) => {
                    let after_prev = prev.next().ok_or(PathError::Root)?;
                    transform_path(&after_prev, &Op::RemoveNode { path: path.clone() }, None)
                        .ok_or_else(|| EditorError::NoPosition(after_prev.clone()))?
                }
            };
            if let Some(r) = last_moved {
                self.unref_path(r);
            }
            self.apply_op(Op::MoveNode {
                path,
                new_path: new_path.clone(),
            })?;
            last_moved = Some(self.path_ref(new_path));
        }
        if let Some(r) = last_moved {
            self.unref_path(r);
        }
        Ok(())
    }

    pub(crate) fn lift_nodes_inner(&mut self, options: NodeOptions) -> Result<(), EditorError> {
        let Some(at) = self.target(options.at) else {
            return Ok(());
        };
        let matches = options.matches.unwrap_or_else(|| Self::default_match(&at));
        let paths = self.matching_paths(at, matches, options.mode, options.voids);
        let refs: Vec<_> = paths.into_iter().map(|p| self.path_ref(p)).collect();

        for path_ref in refs {
            let Some(path) = self.unref_path(path_ref) else {
                continue;
            };
            if path.len() < 2 {
                return Err(EditorError::Lift(path));
            }
            let (&index, parent_path) = path.split_last().ok_or(PathError::Root)?;
            let parent_path = parent_path.to_vec();
            let parent_len = self
                .doc()
                .children_at(&parent_path)
                .map_or(0, <[Node]>::len);
            let after_parent = parent_path.next().ok_or(PathError::Root)?;

            if parent_len == 1 {
                self.apply_op(Op::MoveNode {
                    path,
                    new_path: after_parent,
                })?;
                self.apply_op(Op::RemoveNode { path: parent_path })?;
            } else if index == 0 {
                self.apply_op(Op::MoveNode {
                    path,
                    new_path: parent_path,
                })?;
            } else if index + 1 == parent_len {
                self.apply_op(Op::MoveNode {
                    path,
                    new_path: after_parent,
                })?;
            } else {
                self.apply_op(Op::SplitNode {
                    path: parent_path,
                    position: index + 1,
                    properties: None,
                })?;
                self.apply_op(Op::MoveNode {
                    path,
                    new_path: after_parent,
                })?;
            }
        }
        Ok(())
    }

    pub(crate) fn wrap_nodes_inner(
        &mut self,
        element: ElementNode,
        options: NodeOptions,
    ) -> Result<(), EditorError> {
        let explicit_at = options.at.is_some();
        let Some(mut at) = self.target(options.at) else {
            return Ok(());
        };
        let wrapper_is_inline = self.is_inline(&element);
        let matches = options.matches.unwrap_or_else(|| match &at {
            Location::Path(path) => Match::Path(path.clone()),
            _ if wrapper_is_inline => Match::Inline,
            _ => Match::Block,
        });

        if options.split {
            if let Location::Range(range) = at.clone() {
                let (start, end) = range.edges();
                let (start, end) = (start.clone(), end.clone());
                let range_ref = self.range_ref(range);
                for point in [end, start] {
                    self.split_nodes_inner(SplitOptions {
                        at: Some(Location::Point(point)),
                        matches: Some(matches.clone()),
                        mode: Mode::Lowest,
                        voids: options.voids,
                        ..SplitOptions::default()
                    })?;
                }
                let Some(range) = self.unref_range(range_ref) else {
                    return Ok(());
                };
                at = Location::Range(range);
                if !explicit_at {
                    self.select_inner(at.clone())?;
                }
            }
        }

        let roots: Vec<Path> = if wrapper_is_inline {
            self.matching_paths(at.clone(), Match::Block, Mode::Lowest, options.voids)
        } else {
            vec![Vec::new()]
        };

        let shell = ElementNode {
            children: Vec::new(),
            ..element
        };
        for root in roots {
            let scope = match &at {
                Location::Range(range) => {
                    let root_range = self.range(&Location::Path(root.clone()))?;
                    match range.intersection(&root_range) {
                        Some(scope) => Location::Range(scope),
                        None => continue,
                    }
                }
                other => other.clone(),
            };
            let found = self.matching_paths(scope, matches.clone(), options.mode, options.voids);
            let (Some(first), Some(last)) = (found.first(), found.last()) else {
                continue;
            };
            if first.is_empty() && last.is_empty() {
                continue;
            }
            let common = if first == last {
                first.parent().ok_or(PathError::Root)?
            } else {
                first.common(last)
            };
            if last.len() <= common.len() {
                continue;
            }
            let start_ix = first.get(common.len()).copied().unwrap_or(0);
            let end_ix = last[common.len()];

            self.apply_op(Op::InsertNode {
                path: common.child(end_ix + 1),
                node: Node::Element(shell.clone()),
            })?;
            for i in 0..=(end_ix - start_ix) {
                let wrapper_ix = end_ix - i;
                self.apply_op(Op::MoveNode {
                    path: common.child(start_ix),
                    new_path: common.child(wrapper_ix).child(i),
                })?;
            }
        }
        Ok(())
    }

    pub(crate) fn unwrap_nodes_inner(&mut self, options: NodeOptions) -> Result<(), EditorError> {
        let Some(at) = self.target(options.at) else {
            return Ok(());
        };
        let matches = options.matches.unwrap_or_else(|| Self::default_match(&at));
        let at = match at {
            Location::Path(path) => Location::Range(self.range(&Location::Path(path))?),
            other => other,
        };
        let range_ref = match &at {
            Location::Range(range) => Some(self.range_ref(range.clone())),
            _ => None,
        };

        let paths = self.matching_paths(at, matches, options.mode, options.voids);
        let refs: Vec<_> = paths.into_iter().rev().map(|p| self.path_ref(p)).collect();
        for path_ref in refs {
            let Some(path) = self.unref_path(path_ref) else {
                continue;
            };
            let mut range = self.range(&Location::Path(path.clone()))?;
            if options.split {
                if let Some(current) = range_ref.and_then(|r| self.range_ref_current(r)) {
                    match current.intersection(&range) {
                        Some(covered) => range = covered,
                        None => continue,
                    }
                }
            }
            self.lift_nodes_inner(NodeOptions {
                at: Some(Location::Range(range)),
                matches: Some(Match::ChildOf(path)),
                mode: Mode::Lowest,
                voids: options.voids,
                ..NodeOptions::default()
            })?;
        }
        if let Some(range_ref) = range_ref {
            self.unref_range(range_ref);
        }
        Ok(())
    }
}
