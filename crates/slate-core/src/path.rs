use std::cmp::Ordering;

/// Index path from the document root. The root itself is the empty path.
pub type Path = Vec<usize>;

/// Path algebra over index slices.
///
/// Comparison is lexicographic over the shared prefix, so an ancestor compares
/// equal to each of its descendants.
pub trait PathExt {
    fn compare_path(&self, other: &[usize]) -> Ordering;
    fn is_before(&self, other: &[usize]) -> bool;
    fn is_after(&self, other: &[usize]) -> bool;
    fn is_ancestor_of(&self, other: &[usize]) -> bool;
    fn is_descendant_of(&self, other: &[usize]) -> bool;
    /// True when `self` equals `other` or is one of its ancestors.
    fn is_common_with(&self, other: &[usize]) -> bool;
    fn is_parent_of(&self, other: &[usize]) -> bool;
    fn is_sibling_of(&self, other: &[usize]) -> bool;
    /// True when `self` is an earlier sibling of `other` or of one of its ancestors.
    fn ends_before(&self, other: &[usize]) -> bool;
    fn ends_after(&self, other: &[usize]) -> bool;
    fn ends_at(&self, other: &[usize]) -> bool;
    fn common(&self, other: &[usize]) -> Path;
    fn parent(&self) -> Option<Path>;
    fn next(&self) -> Option<Path>;
    fn previous(&self) -> Option<Path>;
    fn child(&self, index: usize) -> Path;
    fn ancestors(&self) -> Vec<Path>;
}

impl PathExt for [usize] {
    fn compare_path(&self, other: &[usize]) -> Ordering {
        for (a, b) in self.iter().zip(other) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }

    fn is_before(&self, other: &[usize]) -> bool {
        self.compare_path(other) == Ordering::Less
    }

    fn is_after(&self, other: &[usize]) -> bool {
        self.compare_path(other) == Ordering::Greater
    }

    fn is_ancestor_of(&self, other: &[usize]) -> bool {
        self.len() < other.len() && other.starts_with(self)
    }

    fn is_descendant_of(&self, other: &[usize]) -> bool {
        other.is_ancestor_of(self)
    }

    fn is_common_with(&self, other: &[usize]) -> bool {
        self.len() <= other.len() && other.starts_with(self)
    }

    fn is_parent_of(&self, other: &[usize]) -> bool {
        self.len() + 1 == other.len() && other.starts_with(self)
    }

    fn is_sibling_of(&self, other: &[usize]) -> bool {
        if self.is_empty() || self.len() != other.len() || self == other {
            return false;
        }
        let last = self.len() - 1;
        self[..last] == other[..last]
    }

    fn ends_before(&self, other: &[usize]) -> bool {
        let Some(last) = self.len().checked_sub(1) else {
            return false;
        };
        other.len() > last && self[..last] == other[..last] && self[last] < other[last]
    }

    fn ends_after(&self, other: &[usize]) -> bool {
        let Some(last) = self.len().checked_sub(1) else {
            return false;
        };
        other.len() > last && self[..last] == other[..last] && self[last] > other[last]
    }

    fn ends_at(&self, other: &[usize]) -> bool {
        let Some(last) = self.len().checked_sub(1) else {
            return false;
        };
        other.len() > last && self[..last] == other[..last] && self[last] == other[last]
    }

    fn common(&self, other: &[usize]) -> Path {
        self.iter()
            .zip(other)
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| *a)
            .collect()
    }

    fn parent(&self) -> Option<Path> {
        let (_, parent) = self.split_last()?;
        Some(parent.to_vec())
    }

    fn next(&self) -> Option<Path> {
        let (last, parent) = self.split_last()?;
        let mut path = parent.to_vec();
        path.push(last + 1);
        Some(path)
    }

    fn previous(&self) -> Option<Path> {
        let (last, parent) = self.split_last()?;
        let prev = last.checked_sub(1)?;
        let mut path = parent.to_vec();
        path.push(prev);
        Some(path)
    }

    fn child(&self, index: usize) -> Path {
        let mut path = self.to_vec();
        path.push(index);
        path
    }

    fn ancestors(&self) -> Vec<Path> {
        (0..self.len()).map(|len| self[..len].to_vec()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestors_compare_equal_to_descendants() {
        assert_eq!([0, 1].compare_path(&[0, 1, 2]), Ordering::Equal);
        assert!([0, 1].is_before(&[0, 2, 0]));
        assert!([1].is_after(&[0, 5]));
        assert!(![0].is_after(&[0, 5]));
    }

    #[test]
    fn ends_before_only_looks_at_the_last_index() {
        assert!([0, 1].ends_before(&[0, 2, 3]));
        assert!(![0, 1].ends_before(&[1, 2]));
        assert!(![0, 1].ends_before(&[0]));
        assert!([0, 1].ends_at(&[0, 1, 4]));
    }

    #[test]
    fn siblings_and_neighbours() {
        assert!([2, 0].is_sibling_of(&[2, 3]));
        assert!(![2, 0].is_sibling_of(&[2, 0]));
        assert_eq!([2, 0].next(), Some(vec![2, 1]));
        assert_eq!([2, 0].previous(), None);
        assert_eq!([2, 4].common(&[2, 4, 1]), vec![2, 4]);
        assert_eq!([1, 2, 3].ancestors(), vec![vec![], vec![1], vec![1, 2]]);
    }
}
