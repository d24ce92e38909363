use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use unicode_segmentation::UnicodeSegmentation;

use crate::editor::Editor;
use crate::error::EditorError;
use crate::node::{Descendants, ElementNode, Marks, Node, TextNode, Traversal};
use crate::path::{Path, PathExt};
use crate::range::{Edge, Location, Point, Range};

pub type NodeEntry<'a> = (&'a Node, Path);

/// Node predicate used by queries and transforms. Classification variants
/// (`Block`, `Inline`, `Void`) are answered by the plugin chain.
#[derive(Clone)]
pub enum Match {
    Any,
    Text,
    Element,
    Block,
    Inline,
    Void,
    Kind(String),
    Kinds(Vec<String>),
    Path(Path),
    ChildOf(Path),
    Not(Box<Match>),
    All(Vec<Match>),
    Custom(Arc<dyn Fn(&Node, &[usize]) -> bool + Send + Sync>),
}

impl Match {
    pub fn kind(kind: impl Into<String>) -> Self {
        Match::Kind(kind.into())
    }

    pub fn custom(f: impl Fn(&Node, &[usize]) -> bool + Send + Sync + 'static) -> Self {
        Match::Custom(Arc::new(f))
    }

    pub fn and(self, other: Match) -> Self {
        match self {
            Match::All(mut all) => {
                all.push(other);
                Match::All(all)
            }
            first => Match::All(vec![first, other]),
        }
    }
}

impl fmt::Debug for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Match::Any => write!(f, "Any"),
            Match::Text => write!(f, "Text"),
            Match::Element => write!(f, "Element"),
            Match::Block => write!(f, "Block"),
            Match::Inline => write!(f, "Inline"),
            Match::Void => write!(f, "Void"),
            Match::Kind(kind) => f.debug_tuple("Kind").field(kind).finish(),
            Match::Kinds(kinds) => f.debug_tuple("Kinds").field(kinds).finish(),
            Match::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Match::ChildOf(path) => f.debug_tuple("ChildOf").field(path).finish(),
            Match::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
            Match::All(all) => f.debug_tuple("All").field(all).finish(),
            Match::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    All,
    Highest,
    Lowest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    Offset,
    /// A user-perceived character (grapheme cluster).
    #[default]
    Character,
    Word,
}

#[derive(Debug, Clone)]
pub struct NodesOptions {
    pub at: Option<Location>,
    pub matches: Match,
    pub mode: Mode,
    pub reverse: bool,
    pub voids: bool,
}

impl Default for NodesOptions {
    fn default() -> Self {
        Self {
            at: None,
            matches: Match::Any,
            mode: Mode::All,
            reverse: false,
            voids: false,
        }
    }
}

impl NodesOptions {
    pub fn at(at: impl Into<Location>) -> Self {
        Self {
            at: Some(at.into()),
            ..Self::default()
        }
    }

    pub fn matching(mut self, matches: Match) -> Self {
        self.matches = matches;
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn voids(mut self, voids: bool) -> Self {
        self.voids = voids;
        self
    }
}

pub struct Nodes<'a> {
    editor: &'a Editor,
    inner: Option<Descendants<'a>>,
    matches: Match,
    mode: Mode,
    hit: Option<NodeEntry<'a>>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = NodeEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some((node, path)) = self.inner.as_mut().and_then(Iterator::next) else {
                self.inner = None;
                return match self.mode {
                    Mode::Lowest => self.hit.take(),
                    _ => None,
                };
            };

            let is_lower = self
                .hit
                .as_ref()
                .is_some_and(|(_, hit)| path.compare_path(hit) == Ordering::Equal);

            if self.mode == Mode::Highest && is_lower {
                continue;
            }
            if !self.editor.matches(&self.matches, node, &path) {
                continue;
            }
            if self.mode == Mode::Lowest && is_lower {
                self.hit = Some((node, path));
                continue;
            }

            let emit = match self.mode {
                Mode::Lowest => self.hit.replace((node, path)),
                _ => {
                    self.hit = Some((node, path.clone()));
                    Some((node, path))
                }
            };
            if emit.is_some() {
                return emit;
            }
        }
    }
}

impl Editor {
    pub fn is_void(&self, element: &ElementNode) -> bool {
        self.registry().is_void(element)
    }

    pub fn is_inline(&self, element: &ElementNode) -> bool {
        self.registry().is_inline(element)
    }

    pub fn is_block(&self, element: &ElementNode) -> bool {
        !self.is_inline(element)
    }

    pub(crate) fn is_void_node(&self, node: &Node) -> bool {
        node.as_element().is_some_and(|el| self.is_void(el))
    }

    /// An element with nothing but one empty text leaf. Voids are never empty.
    pub fn is_empty(&self, element: &ElementNode) -> bool {
        match element.children.as_slice() {
            [] => true,
            [Node::Text(text)] => text.text.is_empty() && !self.is_void(element),
            _ => false,
        }
    }

    pub fn matches(&self, m: &Match, node: &Node, path: &[usize]) -> bool {
        match m {
            Match::Any => true,
            Match::Text => node.is_text(),
            Match::Element => !node.is_text(),
            Match::Block => node.as_element().is_some_and(|el| self.is_block(el)),
            Match::Inline => match node {
                Node::Text(_) => true,
                Node::Element(el) => self.is_inline(el),
            },
            Match::Void => self.is_void_node(node),
            Match::Kind(kind) => node.kind() == Some(kind.as_str()),
            Match::Kinds(kinds) => node
                .kind()
                .is_some_and(|kind| kinds.iter().any(|k| k == kind)),
            Match::Path(target) => target.as_slice() == path,
            Match::ChildOf(parent) => parent.is_parent_of(path),
            Match::Not(inner) => !self.matches(inner, node, path),
            Match::All(all) => all.iter().all(|m| self.matches(m, node, path)),
            Match::Custom(f) => f(node, path),
        }
    }

    /// Nodes at or around `at` in document order (or reverse), including the
    /// ancestors of the span's edges.
    pub fn nodes(&self, options: NodesOptions) -> Nodes<'_> {
        let NodesOptions {
            at,
            matches,
            mode,
            reverse,
            voids,
        } = options;

        let inner = at
            .or_else(|| self.selection().cloned().map(Location::Range))
            .map(|at| {
                let (first, last) = match at {
                    Location::Path(path) => (path.clone(), path),
                    Location::Point(point) => (point.path.clone(), point.path),
                    Location::Range(range) => {
                        let (start, end) = range.edges();
                        (start.path.clone(), end.path.clone())
                    }
                };
                let (from, to) = if reverse { (last, first) } else { (first, last) };
                let registry = self.registry();
                let pass: Option<Box<dyn Fn(&Node) -> bool + '_>> = if voids {
                    None
                } else {
                    Some(Box::new(move |node: &Node| {
                        node.as_element().is_some_and(|el| registry.is_void(el))
                    }))
                };
                self.doc().descendants(Traversal {
                    from,
                    to: Some(to),
                    reverse,
                    pass,
                })
            });

        Nodes {
            editor: self,
            inner,
            matches,
            mode,
            hit: None,
        }
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        self.doc().node(path)
    }

    pub fn leaf(&self, point: &Point) -> Option<&TextNode> {
        self.doc().text(&point.path)
    }

    pub fn levels(&self, path: &[usize]) -> Vec<NodeEntry<'_>> {
        (1..=path.len())
            .filter_map(|len| {
                let sub = &path[..len];
                self.node(sub).map(|node| (node, sub.to_vec()))
            })
            .collect()
    }

    pub fn path_of(&self, at: &Location) -> Path {
        match at {
            Location::Path(path) => path.clone(),
            Location::Point(point) => point.path.clone(),
            Location::Range(range) => range.anchor.path.common(&range.focus.path),
        }
    }

    /// The lowest element above `at` that satisfies `m`. For a range, the
    /// element must contain both of its points.
    pub fn above(&self, at: &Location, m: &Match) -> Option<NodeEntry<'_>> {
        let path = self.path_of(at);
        self.levels(&path).into_iter().rev().find(|(node, p)| {
            if node.is_text() || !self.matches(m, node, p) {
                return false;
            }
            match at {
                Location::Range(range) => {
                    p.is_ancestor_of(&range.anchor.path) && p.is_ancestor_of(&range.focus.path)
                }
                _ => p != &path,
            }
        })
    }

    pub fn above_highest(&self, at: &Location, m: &Match) -> Option<NodeEntry<'_>> {
        let path = self.path_of(at);
        self.levels(&path).into_iter().find(|(node, p)| {
            !node.is_text() && self.matches(m, node, p) && p != &path
        })
    }

    pub fn void_above(&self, at: &Location) -> Option<Path> {
        self.above_highest(at, &Match::Void).map(|(_, path)| path)
    }

    pub fn block_above(&self, at: &Location) -> Option<NodeEntry<'_>> {
        self.above(at, &Match::Block)
    }

    pub fn start(&self, at: &Location) -> Result<Point, EditorError> {
        self.point(at, Edge::Start)
    }

    pub fn end(&self, at: &Location) -> Result<Point, EditorError> {
        self.point(at, Edge::End)
    }

    pub fn point(&self, at: &Location, edge: Edge) -> Result<Point, EditorError> {
        match at {
            Location::Point(point) => Ok(point.clone()),
            Location::Range(range) => Ok(range.edge(edge).clone()),
            Location::Path(path) => {
                let at_end = matches!(edge, Edge::End | Edge::Focus);
                let text_path = if at_end {
                    self.doc().last_text(path)
                } else {
                    self.doc().first_text(path)
                };
                let text_path = text_path.ok_or_else(|| EditorError::NoPosition(path.clone()))?;
                let offset = if at_end {
                    self.doc().text(&text_path).map_or(0, |t| t.text.len())
                } else {
                    0
                };
                Ok(Point::new(text_path, offset))
            }
        }
    }

    pub fn range(&self, at: &Location) -> Result<Range, EditorError> {
        match at {
            Location::Range(range) => Ok(range.clone()),
            Location::Point(point) => Ok(Range::collapsed(point.clone())),
            Location::Path(_) => Ok(Range::new(self.start(at)?, self.end(at)?)),
        }
    }

    pub fn is_start(&self, point: &Point, path: &[usize]) -> bool {
        self.start(&Location::Path(path.to_vec()))
            .is_ok_and(|start| &start == point)
    }

    pub fn is_end(&self, point: &Point, path: &[usize]) -> bool {
        self.end(&Location::Path(path.to_vec()))
            .is_ok_and(|end| &end == point)
    }

    pub fn is_edge(&self, point: &Point, path: &[usize]) -> bool {
        self.is_start(point, path) || self.is_end(point, path)
    }

    pub fn string(&self, at: &Location) -> String {
        let Location::Range(range) = at else {
            return self.doc().string(&self.path_of(at));
        };
        let (start, end) = range.edges();
        self.nodes(
            NodesOptions::at(range.clone())
                .matching(Match::Text)
                .voids(true),
        )
        .filter_map(|(node, path)| {
            let text = node.as_text()?.text.as_str();
            let from = if path == start.path { start.offset } else { 0 };
            let to = if path == end.path { end.offset } else { text.len() };
            text.get(from..to.max(from))
        })
        .collect()
    }

    /// Point one `unit` before `point`, crossing into the previous text leaf or
    /// block when `point` sits at the start of its leaf. A void counts as one
    /// position at its start.
    pub fn before(&self, point: &Point, unit: Unit) -> Option<Point> {
        let text = self.leaf(point)?;
        if point.offset > 0 {
            let offset = step_back(&text.text, point.offset, unit);
            return Some(Point::new(point.path.clone(), offset));
        }

        let block = self.block_above(&Location::Point(point.clone())).map(|(_, p)| p);
        let registry = self.registry();
        let walk = self.doc().descendants(Traversal {
            from: point.path.clone(),
            to: None,
            reverse: true,
            pass: Some(Box::new(|node: &Node| {
                node.as_element().is_some_and(|el| registry.is_void(el))
            })),
        });
        for (node, path) in walk {
            if path.is_common_with(&point.path) {
                continue;
            }
            match node {
                Node::Element(el) if self.is_void(el) => {
                    return self.start(&Location::Path(path)).ok();
                }
                Node::Element(_) => continue,
                Node::Text(text) => {
                    let same_block = block.as_ref().is_some_and(|b| b.is_ancestor_of(&path));
                    if !same_block {
                        return Some(Point::new(path, text.text.len()));
                    }
                    if !text.text.is_empty() {
                        let offset = step_back(&text.text, text.text.len(), unit);
                        return Some(Point::new(path, offset));
                    }
                }
            }
        }
        None
    }

    pub fn after(&self, point: &Point, unit: Unit) -> Option<Point> {
        let text = self.leaf(point)?;
        if point.offset < text.text.len() {
            let offset = step_forward(&text.text, point.offset, unit);
            return Some(Point::new(point.path.clone(), offset));
        }

        let block = self.block_above(&Location::Point(point.clone())).map(|(_, p)| p);
        let registry = self.registry();
        let walk = self.doc().descendants(Traversal {
            from: point.path.clone(),
            to: None,
            reverse: false,
            pass: Some(Box::new(|node: &Node| {
                node.as_element().is_some_and(|el| registry.is_void(el))
            })),
        });
        for (node, path) in walk {
            if path.is_common_with(&point.path) || !path.is_after(&point.path) {
                continue;
            }
            match node {
                Node::Element(el) if self.is_void(el) => {
                    return self.start(&Location::Path(path)).ok();
                }
                Node::Element(_) => continue,
                Node::Text(text) => {
                    let same_block = block.as_ref().is_some_and(|b| b.is_ancestor_of(&path));
                    if !same_block {
                        return Some(Point::new(path, 0));
                    }
                    if !text.text.is_empty() {
                        let offset = step_forward(&text.text, 0, unit);
                        return Some(Point::new(path, offset));
                    }
                }
            }
        }
        None
    }

    /// The match closest before `at`, looking through the ancestors of the
    /// position just before it.
    pub fn previous(&self, at: &Location, m: &Match, mode: Mode) -> Option<NodeEntry<'_>> {
        let start = self.start(at).ok()?;
        let before = self.before(&start, Unit::Offset)?;
        self.nodes(NodesOptions {
            at: Some(Location::Path(before.path)),
            matches: m.clone(),
            mode,
            reverse: true,
            voids: false,
        })
        .next()
    }

    /// Marks that the next inserted text will carry: the pending marks if
    /// any, otherwise the marks of the leaf at the selection.
    pub fn marks(&self) -> Option<Marks> {
        let selection = self.selection()?;
        if let Some(marks) = self.pending_marks() {
            return Some(marks.clone());
        }

        if selection.is_expanded() {
            let (mut anchor, focus) = {
                let (start, end) = selection.edges();
                (start.clone(), end.clone())
            };
            if self.is_end(&anchor, &anchor.path) {
                if let Some(after) = self.after(&anchor, Unit::Offset) {
                    anchor = after;
                }
            }
            let first = self
                .nodes(NodesOptions::at(Range::new(anchor, focus)).matching(Match::Text))
                .next();
            return Some(
                first
                    .and_then(|(node, _)| node.as_text())
                    .map(|text| text.marks.clone())
                    .unwrap_or_default(),
            );
        }

        let anchor = &selection.anchor;
        let mut leaf = self.leaf(anchor)?;
        if anchor.offset == 0 {
            let at = Location::Point(anchor.clone());
            let in_void = self.above(&at, &Match::Void).is_some();
            if !in_void {
                let prev = self.previous(&Location::Path(anchor.path.clone()), &Match::Text, Mode::Lowest);
                if let (Some((Node::Text(prev), prev_path)), Some((_, block_path))) =
                    (prev, self.block_above(&at))
                {
                    if block_path.is_ancestor_of(&prev_path) {
                        leaf = prev;
                    }
                }
            }
        }
        Some(leaf.marks.clone())
    }

    /// Pull the end of a range that hangs into the start of the next block
    /// back to the end of the last non-empty leaf before it.
    pub fn unhang_range(&self, range: &Range) -> Range {
        let (start, end) = range.edges();
        let (start, mut end) = (start.clone(), end.clone());
        if start.offset != 0
            || end.offset != 0
            || range.is_collapsed()
            || end.path.last().is_some_and(|&ix| ix > 0)
        {
            return range.clone();
        }

        let block_path = self
            .block_above(&Location::Point(end.clone()))
            .map(|(_, path)| path)
            .unwrap_or_default();
        let texts = self.nodes(
            NodesOptions::at(Range::new(start.clone(), end.clone()))
                .matching(Match::Text)
                .reverse(),
        );
        for (node, path) in texts.skip(1) {
            let Some(text) = node.as_text() else {
                continue;
            };
            if !text.text.is_empty() || path.is_before(&block_path) {
                end = Point::new(path, text.text.len());
                break;
            }
        }
        Range::new(start, end)
    }
}

fn step_back(text: &str, offset: usize, unit: Unit) -> usize {
    let head = text.get(..offset).unwrap_or(text);
    match unit {
        Unit::Offset => head
            .char_indices()
            .next_back()
            .map_or(0, |(ix, _)| ix),
        Unit::Character => head
            .grapheme_indices(true)
            .next_back()
            .map_or(0, |(ix, _)| ix),
        Unit::Word => {
            let mut start = offset;
            for (ix, segment) in head.split_word_bound_indices().rev() {
                start = ix;
                if segment.chars().any(char::is_alphanumeric) {
                    break;
                }
            }
            start
        }
    }
}

fn step_forward(text: &str, offset: usize, unit: Unit) -> usize {
    let Some(tail) = text.get(offset..) else {
        return text.len();
    };
    let len = match unit {
        Unit::Offset => tail.chars().next().map_or(0, char::len_utf8),
        Unit::Character => tail.graphemes(true).next().map_or(0, str::len),
        Unit::Word => {
            let mut end = 0;
            for (ix, segment) in tail.split_word_bound_indices() {
                end = ix + segment.len();
                if segment.chars().any(char::is_alphanumeric) {
                    break;
                }
            }
            end
        }
    };
    offset + len
}
