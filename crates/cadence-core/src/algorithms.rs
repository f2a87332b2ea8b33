//! Rhythm generators and step-level transformations
//!
//! Everything here works on plain `Vec<bool>` / `&[bool]`. Callers validate
//! parameters first; the functions clamp rather than fail.

// ============================================================================
// Even distribution (Euclidean)
// ============================================================================

/// Generate a Euclidean rhythm pattern
///
/// # Arguments
/// * `onsets` - Number of onsets to distribute (clamped to `steps`)
/// * `steps` - Total number of steps in the pattern
/// * `rotation` - Rotate the pattern left by this many steps (negative rotates right)
///
/// # Example
/// ```
/// use cadence_core::algorithms::euclidean;
/// let pattern = euclidean(3, 8, 0);
/// // [true, false, false, true, false, false, true, false]
/// # assert_eq!(pattern, vec![true, false, false, true, false, false, true, false]);
/// ```
pub fn euclidean(onsets: usize, steps: usize, rotation: i64) -> Vec<bool> {
    if steps == 0 {
        return vec![];
    }

    let onsets = onsets.min(steps);

    if onsets == 0 {
        return vec![false; steps];
    }

    if onsets == steps {
        return vec![true; steps];
    }

    // Bjorklund's algorithm
    let mut pattern = Vec::with_capacity(steps);
    let mut counts = vec![vec![true]; onsets];
    let mut remainders = vec![vec![false]; steps - onsets];

    loop {
        let mut new_counts = Vec::new();

        let pairs = counts.len().min(remainders.len());
        for i in 0..pairs {
            let mut combined = counts[i].clone();
            combined.extend(remainders[i].iter().copied());
            new_counts.push(combined);
        }

        // Leftover counts
        if counts.len() > pairs {
            remainders = counts[pairs..].to_vec();
        } else {
            remainders = remainders[pairs..].to_vec();
        }

        counts = new_counts;

        if remainders.len() <= 1 {
            break;
        }
    }

    for seq in counts.iter().chain(remainders.iter()) {
        pattern.extend(seq.iter().copied());
    }

    rotate(&pattern, rotation)
}

/// Complement of the even distribution of `steps - onsets`
pub fn inverse_euclidean(onsets: usize, steps: usize) -> Vec<bool> {
    let onsets = onsets.min(steps);
    invert(&euclidean(steps - onsets, steps, 0))
}

// ============================================================================
// Geometric (polygon)
// ============================================================================

/// Vertices of a regular polygon on a ring of `vertices * expansion` steps.
///
/// Vertex i sits on step `i * expansion`; the whole figure then turns
/// forward by `offset` steps.
pub fn polygon(vertices: usize, offset: i64, expansion: usize) -> Vec<bool> {
    project_polygon(vertices, offset, vertices * expansion)
}

/// Place a polygon onto an arbitrary ring, rounding vertex positions
pub fn project_polygon(vertices: usize, offset: i64, ring: usize) -> Vec<bool> {
    if ring == 0 {
        return vec![];
    }
    let shift = offset.rem_euclid(ring as i64) as usize;
    let mut pattern = vec![false; ring];
    for i in 0..vertices {
        let pos = (i * ring + vertices / 2) / vertices.max(1);
        pattern[(pos + shift) % ring] = true;
    }
    pattern
}

// ============================================================================
// Morse code
// ============================================================================

const MORSE_LETTERS: [&str; 26] = [
    ".-", "-...", "-.-.", "-..", ".", "..-.", "--.", "....", "..", ".---", "-.-", ".-..", "--",
    "-.", "---", ".--.", "--.-", ".-.", "...", "-", "..-", "...-", ".--", "-..-", "-.--", "--..",
];

/// Dots and dashes for `text`, letters run together without gaps.
///
/// `None` if `text` has anything other than ASCII letters.
pub fn morse_code(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    text.chars()
        .map(|c| {
            c.is_ascii_alphabetic()
                .then(|| MORSE_LETTERS[(c.to_ascii_lowercase() as u8 - b'a') as usize])
        })
        .collect()
}

/// A dot is one onset, a dash an onset held over a following rest.
/// Other characters are ignored.
pub fn morse(code: &str) -> Vec<bool> {
    let mut pattern = Vec::with_capacity(code.len() * 2);
    for c in code.chars() {
        match c {
            '.' => pattern.push(true),
            '-' => pattern.extend([true, false]),
            _ => {}
        }
    }
    pattern
}

// ============================================================================
// Seeded random
// ============================================================================

/// Scatter `onsets` hits over `steps` positions with a seeded shuffle
pub fn random(onsets: usize, steps: usize, seed: u64) -> Vec<bool> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut positions: Vec<usize> = (0..steps).collect();
    rng.shuffle(&mut positions);

    let mut pattern = vec![false; steps];
    for &pos in positions.iter().take(onsets.min(steps)) {
        pattern[pos] = true;
    }
    pattern
}

/// Onset count drawn from a bell curve centred on half the steps.
///
/// Clamped to `1..=steps-1` so the result is never silent or saturated.
pub fn bell_curve_onsets(steps: usize, rng: &mut fastrand::Rng) -> usize {
    if steps <= 1 {
        return steps;
    }
    // Mean of three uniforms is a cheap approximation of a normal
    let sample = (rng.f64() + rng.f64() + rng.f64()) / 3.0;
    let count = (sample * steps as f64).round() as usize;
    count.clamp(1, steps - 1)
}

/// A random pattern whose density follows [`bell_curve_onsets`]
pub fn random_bell(steps: usize, seed: u64) -> Vec<bool> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let onsets = bell_curve_onsets(steps, &mut rng);
    random(onsets, steps, rng.u64(..))
}

// ============================================================================
// Transformations
// ============================================================================

pub fn invert(pattern: &[bool]) -> Vec<bool> {
    pattern.iter().map(|&s| !s).collect()
}

pub fn reverse(pattern: &[bool]) -> Vec<bool> {
    pattern.iter().rev().copied().collect()
}

/// Rotate left by `amount` steps; negative amounts rotate right
pub fn rotate(pattern: &[bool], amount: i64) -> Vec<bool> {
    let mut out = pattern.to_vec();
    if out.is_empty() {
        return out;
    }
    let shift = amount.rem_euclid(out.len() as i64) as usize;
    out.rotate_left(shift);
    out
}

/// Map each onset angularly onto a ring of `new_steps`.
///
/// Counter-clockwise mapping mirrors every angle before projecting.
/// Onsets that land on the same step merge.
pub fn quantize(pattern: &[bool], new_steps: usize, clockwise: bool) -> Vec<bool> {
    let mut out = vec![false; new_steps];
    if new_steps == 0 || pattern.is_empty() {
        return out;
    }
    let n = pattern.len() as f64;
    for (pos, _) in pattern.iter().enumerate().filter(|&(_, &s)| s) {
        let mut turn = pos as f64 / n;
        if !clockwise && pos != 0 {
            turn = 1.0 - turn;
        }
        let target = (turn * new_steps as f64).round() as usize % new_steps;
        out[target] = true;
    }
    out
}
