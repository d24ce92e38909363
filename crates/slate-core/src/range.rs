use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::path::{Path, PathExt};

/// A position inside a text node. `offset` is a byte offset on a char boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }

    pub fn compare(&self, other: &Point) -> Ordering {
        match self.path.compare_path(&other.path) {
            Ordering::Equal => self.offset.cmp(&other.offset),
            ord => ord,
        }
    }

    pub fn is_before(&self, other: &Point) -> bool {
        self.compare(other) == Ordering::Less
    }

    pub fn is_after(&self, other: &Point) -> bool {
        self.compare(other) == Ordering::Greater
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Anchor,
    Focus,
    Start,
    End,
}

/// Which side a point sticks to when content is inserted exactly at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Affinity {
    #[default]
    Forward,
    Backward,
}

/// A selection or span between two points. `anchor` is where the selection
/// started, `focus` is where it ends; either may come first in the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub anchor: Point,
    pub focus: Point,
}

impl Range {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_expanded(&self) -> bool {
        !self.is_collapsed()
    }

    pub fn is_backward(&self) -> bool {
        self.anchor.is_after(&self.focus)
    }

    pub fn edges(&self) -> (&Point, &Point) {
        if self.is_backward() {
            (&self.focus, &self.anchor)
        } else {
            (&self.anchor, &self.focus)
        }
    }

    pub fn start(&self) -> &Point {
        self.edges().0
    }

    pub fn end(&self) -> &Point {
        self.edges().1
    }

    pub fn edge(&self, edge: Edge) -> &Point {
        match edge {
            Edge::Anchor => &self.anchor,
            Edge::Focus => &self.focus,
            Edge::Start => self.start(),
            Edge::End => self.end(),
        }
    }

    pub fn includes_point(&self, point: &Point) -> bool {
        let (start, end) = self.edges();
        point.compare(start) != Ordering::Less && point.compare(end) != Ordering::Greater
    }

    pub fn includes_path(&self, path: &[usize]) -> bool {
        let (start, end) = self.edges();
        path.compare_path(&start.path) != Ordering::Less
            && path.compare_path(&end.path) != Ordering::Greater
    }

    pub fn intersection(&self, other: &Range) -> Option<Range> {
        let (s1, e1) = self.edges();
        let (s2, e2) = other.edges();
        let start = if s1.is_before(s2) { s2 } else { s1 };
        let end = if e1.is_before(e2) { e1 } else { e2 };
        if end.is_before(start) {
            None
        } else {
            Some(Range::new(start.clone(), end.clone()))
        }
    }

    pub fn collapse(&self, edge: Edge) -> Range {
        Range::collapsed(self.edge(edge).clone())
    }
}

/// Anything a transform can target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Path(Path),
    Point(Point),
    Range(Range),
}

impl From<Path> for Location {
    fn from(path: Path) -> Self {
        Location::Path(path)
    }
}

impl From<Point> for Location {
    fn from(point: Point) -> Self {
        Location::Point(point)
    }
}

impl From<Range> for Location {
    fn from(range: Range) -> Self {
        Location::Range(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(path: &[usize], offset: usize) -> Point {
        Point::new(path.to_vec(), offset)
    }

    #[test]
    fn backward_ranges_report_sorted_edges() {
        let range = Range::new(pt(&[1, 0], 2), pt(&[0, 0], 4));
        assert!(range.is_backward());
        assert_eq!(range.start(), &pt(&[0, 0], 4));
        assert_eq!(range.end(), &pt(&[1, 0], 2));
        assert!(range.includes_path(&[0]));
        assert!(range.includes_point(&pt(&[0, 0], 5)));
        assert!(!range.includes_point(&pt(&[1, 0], 3)));
    }

    #[test]
    fn intersection_of_disjoint_ranges_is_none() {
        let a = Range::new(pt(&[0, 0], 0), pt(&[0, 0], 2));
        let b = Range::new(pt(&[0, 0], 3), pt(&[1, 0], 0));
        assert_eq!(a.intersection(&b), None);

        let c = Range::new(pt(&[0, 0], 1), pt(&[2, 0], 0));
        assert_eq!(
            a.intersection(&c),
            Some(Range::new(pt(&[0, 0], 1), pt(&[0, 0], 2)))
        );
    }
}
