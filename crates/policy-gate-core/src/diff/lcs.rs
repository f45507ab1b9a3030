//! Line alignment via Longest Common Subsequence.

use std::ops::Range;

/// One edit operation over index ranges of the two sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Equal { a: (usize, usize), b: (usize, usize) },
    Replace { a: (usize, usize), b: (usize, usize) },
    Delete { a: (usize, usize), b: (usize, usize) },
    Insert { a: (usize, usize), b: (usize, usize) },
}

impl Opcode {
    /// Half-open index range in sequence A.
    pub fn a_range(&self) -> (usize, usize) {
        match *self {
            Opcode::Equal { a, .. }
            | Opcode::Replace { a, .. }
            | Opcode::Delete { a, .. }
            | Opcode::Insert { a, .. } => a,
        }
    }

    /// Half-open index range in sequence B.
    pub fn b_range(&self) -> (usize, usize) {
        match *self {
            Opcode::Equal { b, .. }
            | Opcode::Replace { b, .. }
            | Opcode::Delete { b, .. }
            | Opcode::Insert { b, .. } => b,
        }
    }

    pub fn is_equal(&self) -> bool {
        matches!(self, Opcode::Equal { .. })
    }
}

/// Compute the LCS alignment of two line sequences as `(index_a, index_b)` pairs.
///
/// Uses Myers' linear-space divide and conquer: each pending range is
/// trimmed of its common prefix and suffix, then split at the middle snake
/// of a shortest edit script. Memory is `O(len_a + len_b)`.
pub fn lcs_alignment<T: PartialEq>(a: &[T], b: &[T]) -> Vec<(usize, usize)> {
    let max_d = max_edit_distance(a.len(), b.len());
    let mut forward = Frontier::new(max_d);
    let mut backward = Frontier::new(max_d);

    let mut alignment = Vec::new();
    let mut pending = vec![(0..a.len(), 0..b.len())];

    while let Some((mut ra, mut rb)) = pending.pop() {
        let prefix = common_prefix(&a[ra.clone()], &b[rb.clone()]);
        alignment.extend((0..prefix).map(|k| (ra.start + k, rb.start + k)));
        ra.start += prefix;
        rb.start += prefix;

        let suffix = common_suffix(&a[ra.clone()], &b[rb.clone()]);
        alignment.extend((0..suffix).map(|k| (ra.end - suffix + k, rb.end - suffix + k)));
        ra.end -= suffix;
        rb.end -= suffix;

        if ra.is_empty() || rb.is_empty() {
            continue;
        }
        if let Some((x, y)) =
            middle_snake(a, ra.clone(), b, rb.clone(), &mut forward, &mut backward)
        {
            pending.push((ra.start..x, rb.start..y));
            pending.push((x..ra.end, y..rb.end));
        }
    }

    alignment.sort_unstable();
    alignment
}

fn max_edit_distance(n: usize, m: usize) -> usize {
    (n + m + 1) / 2 + 1
}

fn common_prefix<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Furthest-reaching x per diagonal `k`, for `k` in `-max_d..=max_d`.
struct Frontier {
    offset: isize,
    x: Vec<usize>,
}

impl Frontier {
    fn new(max_d: usize) -> Self {
        Self {
            offset: max_d as isize,
            x: vec![0; 2 * max_d + 1],
        }
    }

    fn at(&self, k: isize) -> usize {
        self.x[(k + self.offset) as usize]
    }

    fn set(&mut self, k: isize, x: usize) {
        self.x[(k + self.offset) as usize] = x;
    }
}

/// Find a split point on an optimal edit path through `ra` x `rb`.
///
/// Both ranges are non-empty and share no common prefix or suffix.
fn middle_snake<T: PartialEq>(
    a: &[T],
    ra: Range<usize>,
    b: &[T],
    rb: Range<usize>,
    vf: &mut Frontier,
    vb: &mut Frontier,
) -> Option<(usize, usize)> {
    let n = ra.len();
    let m = rb.len();
    let delta = n as isize - m as isize;
    let odd = delta & 1 == 1;

    vf.set(1, 0);
    vb.set(1, 0);

    let d_max = max_edit_distance(n, m) as isize;
    for d in 0..d_max {
        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && vf.at(k - 1) < vf.at(k + 1)) {
                vf.at(k + 1)
            } else {
                vf.at(k - 1) + 1
            };
            let y = (x as isize - k) as usize;
            let (x0, y0) = (x, y);
            if x < n && y < m {
                x += common_prefix(&a[ra.start + x..ra.end], &b[rb.start + y..rb.end]);
            }
            vf.set(k, x);

            if odd && (k - delta).abs() < d && x + vb.at(-(k - delta)) >= n {
                return Some((ra.start + x0, rb.start + y0));
            }
        }

        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && vb.at(k - 1) < vb.at(k + 1)) {
                vb.at(k + 1)
            } else {
                vb.at(k - 1) + 1
            };
            let mut y = (x as isize - k) as usize;
            if x < n && y < m {
                let run = common_suffix(
                    &a[ra.start..ra.start + n - x],
                    &b[rb.start..rb.start + m - y],
                );
                x += run;
                y += run;
            }
            vb.set(k, x);

            if !odd && (k - delta).abs() <= d && x + vf.at(-(k - delta)) >= n {
                return Some((ra.start + n - x, rb.start + m - y));
            }
        }
    }

    None
}

/// Turn two sequences into a list of opcodes covering both completely.
pub fn opcodes<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Opcode> {
    let mut codes = Vec::new();
    let mut i = 0;
    let mut j = 0;

    let alignment = lcs_alignment(a, b);
    let mut pairs = alignment.iter().peekable();

    while let Some(&(mi, mj)) = pairs.next() {
        push_change(&mut codes, (i, mi), (j, mj));

        // Extend the matched run as far as consecutive pairs go.
        let (mut end_i, mut end_j) = (mi + 1, mj + 1);
        while let Some(&&(ni, nj)) = pairs.peek() {
            if ni != end_i || nj != end_j {
                break;
            }
            end_i += 1;
            end_j += 1;
            pairs.next();
        }
        codes.push(Opcode::Equal {
            a: (mi, end_i),
            b: (mj, end_j),
        });
        i = end_i;
        j = end_j;
    }

    push_change(&mut codes, (i, a.len()), (j, b.len()));
    codes
}

fn push_change(codes: &mut Vec<Opcode>, a: (usize, usize), b: (usize, usize)) {
    let a_len = a.1 - a.0;
    let b_len = b.1 - b.0;
    match (a_len > 0, b_len > 0) {
        (true, true) => codes.push(Opcode::Replace { a, b }),
        (true, false) => codes.push(Opcode::Delete { a, b }),
        (false, true) => codes.push(Opcode::Insert { a, b }),
        (false, false) => {}
    }
}
