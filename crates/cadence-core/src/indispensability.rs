//! Metric indispensability and the onset add/remove steps built on it
//!
//! Scores follow a Barlow-style prime-factor reading of each position's
//! fraction of the cycle. Equal scores always resolve to the lowest
//! position index first, so every ordering here is total.

use std::cmp::Ordering;

use crate::combine::gcd;

/// Prime factors of `n`, with multiplicity, smallest first
fn prime_factors(mut n: usize) -> Vec<usize> {
    let mut factors = Vec::new();
    let mut p = 2;
    while p * p <= n {
        while n % p == 0 {
            factors.push(p);
            n /= p;
        }
        p += 1;
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}

fn prime_weight(n: usize) -> f64 {
    prime_factors(n)
        .iter()
        .map(|&f| (f as f64 - 1.0) / f as f64)
        .sum()
}

/// How structurally important `position` is in a cycle of `length` steps.
///
/// Always in (0, 1]. The downbeat scores 1.0, the pickup (last step) 0.75,
/// and every other step less than 0.7.
pub fn indispensability(position: usize, length: usize) -> f64 {
    if length <= 1 || position % length == 0 {
        return 1.0;
    }
    let position = position % length;
    if position == length - 1 {
        return 0.75;
    }
    let denominator = length / gcd(position, length);
    0.7 * (1.0 - prime_weight(denominator) / (prime_weight(length) + 1.0))
}

fn by_score_desc(length: usize) -> impl Fn(&usize, &usize) -> Ordering {
    move |&a, &b| {
        indispensability(b, length)
            .total_cmp(&indispensability(a, length))
            .then(a.cmp(&b))
    }
}

fn by_score_asc(length: usize) -> impl Fn(&usize, &usize) -> Ordering {
    move |&a, &b| {
        indispensability(a, length)
            .total_cmp(&indispensability(b, length))
            .then(a.cmp(&b))
    }
}

/// All positions of a cycle, most indispensable first
pub fn indispensability_order(length: usize) -> Vec<usize> {
    let mut positions: Vec<usize> = (0..length).collect();
    positions.sort_by(by_score_desc(length));
    positions
}

/// Remove onsets until `target` remain.
///
/// Least indispensable onsets go first; `inverse` removes the most
/// indispensable first instead. The downbeat is only removable in inverse
/// mode, so a normal dilution may stop above `target`.
pub fn dilute(pattern: &[bool], target: usize, inverse: bool) -> Vec<bool> {
    let length = pattern.len();
    let mut out = pattern.to_vec();
    let mut count = out.iter().filter(|&&s| s).count();

    let mut candidates: Vec<usize> = (0..length)
        .filter(|&i| out[i] && (inverse || i != 0))
        .collect();
    if inverse {
        candidates.sort_by(by_score_desc(length));
    } else {
        candidates.sort_by(by_score_asc(length));
    }

    for pos in candidates {
        if count <= target {
            break;
        }
        out[pos] = false;
        count -= 1;
    }
    out
}

/// Add onsets until `target` is reached (capped at the pattern length).
///
/// The ranked pass adds the most indispensable empty steps first, or the
/// least indispensable in inverse mode (which also leaves the downbeat for
/// last). Whatever is still missing is then filled in index order.
pub fn concentrate(pattern: &[bool], target: usize, inverse: bool) -> Vec<bool> {
    let length = pattern.len();
    let target = target.min(length);
    let mut out = pattern.to_vec();
    let mut count = out.iter().filter(|&&s| s).count();

    let mut ranked: Vec<usize> = (0..length)
        .filter(|&i| !out[i] && !(inverse && i == 0))
        .collect();
    if inverse {
        ranked.sort_by(by_score_asc(length));
    } else {
        ranked.sort_by(by_score_desc(length));
    }

    for pos in ranked {
        if count >= target {
            return out;
        }
        out[pos] = true;
        count += 1;
    }

    for slot in out.iter_mut() {
        if count >= target {
            break;
        }
        if !*slot {
            *slot = true;
            count += 1;
        }
    }
    out
}

/// Grow a downbeat-only cycle to `onsets` hits by concentration
pub fn indispensability_fill(onsets: usize, steps: usize, inverse: bool) -> Vec<bool> {
    if steps == 0 || onsets == 0 {
        return vec![false; steps];
    }
    let mut seed = vec![false; steps];
    seed[0] = true;
    concentrate(&seed, onsets, inverse)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(p: &[bool]) -> String {
        p.iter().map(|&b| if b { '1' } else { '0' }).collect()
    }

    fn parse_bits(s: &str) -> Vec<bool> {
        s.chars().map(|c| c == '1').collect()
    }

    #[test]
    fn test_score_bounds() {
        for n in 1..=64 {
            for p in 0..n {
                let s = indispensability(p, n);
                assert!(s > 0.0 && s <= 1.0, "score({p},{n}) = {s}");
                if p != 0 && p != n - 1 {
                    assert!(s < 0.75);
                }
            }
            assert_eq!(indispensability(0, n), 1.0);
        }
        assert_eq!(indispensability(7, 8), 0.75);
    }

    #[test]
    fn test_metric_hierarchy() {
        // Half beats beat quarter beats beat eighths in 8 steps
        assert!(indispensability(4, 8) > indispensability(2, 8));
        assert!(indispensability(2, 8) > indispensability(3, 8));
        // Thirds outrank quarters in 12 steps
        assert!(indispensability(4, 12) > indispensability(3, 12));
        assert_eq!(indispensability(2, 8), indispensability(6, 8));
    }

    #[test]
    fn test_order_breaks_ties_by_lowest_index() {
        assert_eq!(indispensability_order(8), vec![0, 7, 4, 2, 6, 1, 3, 5]);
        // Prime length: all inner steps tie
        assert_eq!(indispensability_order(5), vec![0, 4, 1, 2, 3]);
    }

    #[test]
    fn test_dilute() {
        let p = parse_bits("10110110");
        assert_eq!(bits(&dilute(&p, 4, false)), "10100110");
        assert_eq!(bits(&dilute(&p, 1, false)), "10000000");
        // Downbeat survives a normal dilution to zero
        assert_eq!(bits(&dilute(&p, 0, false)), "10000000");
        // Inverse mode strips the strongest first
        assert_eq!(bits(&dilute(&p, 4, true)), "00110110");
    }

    #[test]
    fn test_concentrate() {
        let p = parse_bits("10000000");
        assert_eq!(bits(&concentrate(&p, 3, false)), "10001001");
        assert_eq!(bits(&concentrate(&p, 8, false)), "11111111");
        assert_eq!(bits(&concentrate(&p, 3, true)), "11010000");
        // Downbeat is filled in the second pass
        assert_eq!(bits(&concentrate(&parse_bits("01111111"), 8, true)), "11111111");
        assert_eq!(concentrate(&p, 20, false).len(), 8);
    }

    #[test]
    fn test_indispensability_fill() {
        assert_eq!(bits(&indispensability_fill(1, 8, false)), "10000000");
        assert_eq!(bits(&indispensability_fill(3, 8, false)), "10001001");
        assert_eq!(bits(&indispensability_fill(0, 4, false)), "0000");
        assert_eq!(bits(&indispensability_fill(3, 8, true)), "11010000");
    }
}
