use crate::maybestd::ops::Range;

/// Calculates the largest power of two which is strictly less than the argument.
///
/// This is the split rule of the tree: a subtree of `n >= 2` leaves puts
/// `next_smaller_po2(n)` leaves on its left and the remainder on its right.
pub fn next_smaller_po2(int: usize) -> usize {
    // Calculate the first power of two which is greater than or equal to the argument, then divide by two.
    int.next_power_of_two() >> 1
}

/// Returns the index at which the subtree covering `range` splits into its two children.
pub fn split_point(range: &Range<usize>) -> usize {
    range.start + next_smaller_po2(range.len())
}

/// How a subtree relates to the leaf range being proven.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Overlap {
    /// No proven leaf is inside the subtree. Its root is a supporting node.
    Disjoint,
    /// Every leaf of the subtree is proven. Its root is rebuilt from the leaves.
    Contained,
    /// The subtree must be split further.
    Partial,
}

/// Classifies `subtree` against `target`.
///
/// An empty `target` marks an insertion point `k`: only subtrees with `start < k < end`
/// straddle it and need splitting, everything else is disjoint.
pub fn classify(subtree: &Range<usize>, target: &Range<usize>) -> Overlap {
    if target.is_empty() {
        let k = target.start;
        if subtree.start < k && k < subtree.end {
            return Overlap::Partial;
        }
        return Overlap::Disjoint;
    }
    if subtree.end <= target.start || subtree.start >= target.end {
        Overlap::Disjoint
    } else if target.start <= subtree.start && subtree.end <= target.end {
        Overlap::Contained
    } else {
        Overlap::Partial
    }
}

/// Compute the number of left siblings required for an inclusion proof of the node at the provided index
pub fn compute_num_left_siblings(node_idx: usize) -> usize {
    // Every left subtree is a complete, aligned power of two, so the nodes covering
    // `0..node_idx` are exactly the ones in its binary decomposition
    node_idx.count_ones() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_rule() {
        assert_eq!(next_smaller_po2(2), 1);
        assert_eq!(next_smaller_po2(3), 2);
        assert_eq!(next_smaller_po2(4), 2);
        assert_eq!(next_smaller_po2(5), 4);
        assert_eq!(next_smaller_po2(16), 8);
        assert_eq!(next_smaller_po2(17), 16);
        assert_eq!(split_point(&(8..13)), 12);
    }

    #[test]
    fn test_classify_non_empty_target() {
        let target = 2..5;
        assert_eq!(classify(&(0..2), &target), Overlap::Disjoint);
        assert_eq!(classify(&(5..8), &target), Overlap::Disjoint);
        assert_eq!(classify(&(2..4), &target), Overlap::Contained);
        assert_eq!(classify(&(4..5), &target), Overlap::Contained);
        assert_eq!(classify(&(0..4), &target), Overlap::Partial);
        assert_eq!(classify(&(4..8), &target), Overlap::Partial);
    }

    #[test]
    fn test_classify_insertion_point() {
        let target = 3..3;
        assert_eq!(classify(&(0..8), &target), Overlap::Partial);
        assert_eq!(classify(&(0..3), &target), Overlap::Disjoint);
        assert_eq!(classify(&(3..4), &target), Overlap::Disjoint);
        assert_eq!(classify(&(2..4), &target), Overlap::Partial);
        // boundary insertion points never split anything
        assert_eq!(classify(&(0..8), &(0..0)), Overlap::Disjoint);
        assert_eq!(classify(&(0..8), &(8..8)), Overlap::Disjoint);
    }

    #[test]
    fn test_num_left_siblings() {
        assert_eq!(compute_num_left_siblings(0), 0);
        assert_eq!(compute_num_left_siblings(1), 1);
        assert_eq!(compute_num_left_siblings(6), 2);
        assert_eq!(compute_num_left_siblings(7), 3);
    }
}
