//! Period-aligned merging of step sequences

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombineOp {
    /// Onset wherever either side has one (`+`)
    Union,
    /// Left onsets not masked by the right (`-`)
    Difference,
}

pub fn gcd(a: usize, b: usize) -> usize {
    if b == 0 { a } else { gcd(b, a % b) }
}

pub fn lcm(a: usize, b: usize) -> usize {
    if a == 0 || b == 0 {
        return 0;
    }
    a / gcd(a, b) * b
}

/// Tile `pattern` until it is `len` steps long
pub fn expand(pattern: &[bool], len: usize) -> Vec<bool> {
    if pattern.is_empty() {
        return vec![false; len];
    }
    pattern.iter().copied().cycle().take(len).collect()
}

/// Merge two patterns over the least common multiple of their lengths
pub fn combine(a: &[bool], b: &[bool], op: CombineOp) -> Vec<bool> {
    let len = lcm(a.len(), b.len());
    let a = expand(a, len);
    let b = expand(b, len);
    a.iter()
        .zip(&b)
        .map(|(&x, &y)| match op {
            CombineOp::Union => x || y,
            CombineOp::Difference => x && !y,
        })
        .collect()
}

/// Left-fold a list of patterns with their operators
pub fn combine_all<'a>(
    first: &[bool],
    rest: impl IntoIterator<Item = (CombineOp, &'a [bool])>,
) -> Vec<bool> {
    rest.into_iter()
        .fold(first.to_vec(), |acc, (op, next)| combine(&acc, next, op))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(s: &str) -> Vec<bool> {
        s.chars().map(|c| c == '1').collect()
    }

    #[test]
    fn test_lcm() {
        assert_eq!(lcm(3, 4), 12);
        assert_eq!(lcm(8, 12), 24);
        assert_eq!(lcm(5, 5), 5);
        assert_eq!(lcm(1, 7), 7);
    }

    #[test]
    fn test_union_spans_lcm() {
        let out = combine(&bits("100"), &bits("10"), CombineOp::Union);
        assert_eq!(out, bits("101110"));
        for (a, b) in [(3, 4), (5, 8), (6, 9), (7, 7)] {
            let out = combine(&vec![true; a], &vec![false; b], CombineOp::Union);
            assert_eq!(out.len(), lcm(a, b));
        }
    }

    #[test]
    fn test_difference_masks() {
        let out = combine(&bits("1111"), &bits("10"), CombineOp::Difference);
        assert_eq!(out, bits("0101"));
    }

    #[test]
    fn test_combine_all_folds_left() {
        let a = bits("1000");
        let b = bits("0100");
        let c = bits("11");
        let out = combine_all(
            &a,
            [(CombineOp::Union, b.as_slice()), (CombineOp::Difference, c.as_slice())],
        );
        assert_eq!(out, bits("0000"));
    }
}
