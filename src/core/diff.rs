// src/core/diff.rs
//! Line-oriented unified diff between two in-memory documents.

/// Guard against quadratic blowup on pathological inputs; beyond this the
/// middle section is emitted as a full replace.
const MAX_LCS_CELLS: usize = 4_000_000;

#[derive(Debug, Clone)]
pub struct DiffOutcome {
    pub diff: String,
    /// Count of `+`/`-` body lines, excluding the `---`/`+++` file headers.
    pub approx_changed_lines: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op<'a> {
    Equal(&'a str),
    Del(&'a str),
    Ins(&'a str),
}

/// Classic unified diff with `context_lines` lines of context around each
/// hunk. Never fails on well-formed string input; identical inputs yield an
/// empty diff.
pub fn unified_diff(
    from_text: &str,
    to_text: &str,
    from_label: &str,
    to_label: &str,
    context_lines: usize,
) -> DiffOutcome {
    let a: Vec<&str> = from_text.lines().collect();
    let b: Vec<&str> = to_text.lines().collect();

    let ops = edit_script(&a, &b);

    let change_idxs: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| !matches!(op, Op::Equal(_)))
        .map(|(i, _)| i)
        .collect();

    if change_idxs.is_empty() {
        return DiffOutcome {
            diff: String::new(),
            approx_changed_lines: 0,
        };
    }

    // Line numbers (1-based old/new) at the start of each op.
    let mut positions = Vec::with_capacity(ops.len());
    let (mut old_line, mut new_line) = (1usize, 1usize);
    for op in &ops {
        positions.push((old_line, new_line));
        match op {
            Op::Equal(_) => {
                old_line += 1;
                new_line += 1;
            }
            Op::Del(_) => old_line += 1,
            Op::Ins(_) => new_line += 1,
        }
    }

    // Group change runs into hunks, merging hunks whose context would touch.
    let mut groups: Vec<(usize, usize)> = Vec::new();
    let mut start = change_idxs[0].saturating_sub(context_lines);
    let mut end = (change_idxs[0] + 1 + context_lines).min(ops.len());
    for &idx in &change_idxs[1..] {
        if idx.saturating_sub(context_lines) <= end {
            end = (idx + 1 + context_lines).min(ops.len());
        } else {
            groups.push((start, end));
            start = idx.saturating_sub(context_lines);
            end = (idx + 1 + context_lines).min(ops.len());
        }
    }
    groups.push((start, end));

    let mut out = String::new();
    out.push_str(&format!("--- {}\n", from_label));
    out.push_str(&format!("+++ {}\n", to_label));

    let mut changed: u64 = 0;
    for (lo, hi) in groups {
        let slice = &ops[lo..hi];
        let old_len = slice
            .iter()
            .filter(|op| matches!(op, Op::Equal(_) | Op::Del(_)))
            .count();
        let new_len = slice
            .iter()
            .filter(|op| matches!(op, Op::Equal(_) | Op::Ins(_)))
            .count();
        let (old_start, new_start) = positions[lo];

        out.push_str(&format!(
            "@@ -{} +{} @@\n",
            format_range(old_start, old_len),
            format_range(new_start, new_len)
        ));

        // Within a run of changes, emit removals before additions.
        let mut pending_ins: Vec<&str> = Vec::new();
        for op in slice {
            match op {
                Op::Equal(line) => {
                    for ins in pending_ins.drain(..) {
                        out.push_str(&format!("+{}\n", ins));
                        changed += 1;
                    }
                    out.push_str(&format!(" {}\n", line));
                }
                Op::Del(line) => {
                    out.push_str(&format!("-{}\n", line));
                    changed += 1;
                }
                Op::Ins(line) => pending_ins.push(line),
            }
        }
        for ins in pending_ins {
            out.push_str(&format!("+{}\n", ins));
            changed += 1;
        }
    }

    DiffOutcome {
        diff: out,
        approx_changed_lines: changed,
    }
}

/// Unified-diff range: `start,len`, with the length omitted when it is 1 and
/// the start shifted back one line for empty ranges.
fn format_range(start: usize, len: usize) -> String {
    match len {
        1 => format!("{}", start),
        0 => format!("{},0", start.saturating_sub(1)),
        _ => format!("{},{}", start, len),
    }
}

/// Edit script via longest-common-subsequence over lines, with common
/// prefix/suffix trimmed first to keep the DP table small.
fn edit_script<'a>(a: &[&'a str], b: &[&'a str]) -> Vec<Op<'a>> {
    let mut prefix = 0;
    while prefix < a.len() && prefix < b.len() && a[prefix] == b[prefix] {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < a.len() - prefix && suffix < b.len() - prefix
        && a[a.len() - 1 - suffix] == b[b.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let mid_a = &a[prefix..a.len() - suffix];
    let mid_b = &b[prefix..b.len() - suffix];

    let mut ops: Vec<Op<'a>> = a[..prefix].iter().map(|l| Op::Equal(l)).collect();

    if mid_a.len().saturating_mul(mid_b.len()) > MAX_LCS_CELLS {
        ops.extend(mid_a.iter().map(|l| Op::Del(l)));
        ops.extend(mid_b.iter().map(|l| Op::Ins(l)));
    } else {
        ops.extend(lcs_ops(mid_a, mid_b));
    }

    ops.extend(a[a.len() - suffix..].iter().map(|l| Op::Equal(l)));
    ops
}

fn lcs_ops<'a>(a: &[&'a str], b: &[&'a str]) -> Vec<Op<'a>> {
    let (m, n) = (a.len(), b.len());
    // dp[i][j] = LCS length of a[i..] and b[j..]
    let mut dp = vec![0u32; (m + 1) * (n + 1)];
    for i in (0..m).rev() {
        for j in (0..n).rev() {
            dp[i * (n + 1) + j] = if a[i] == b[j] {
                dp[(i + 1) * (n + 1) + j + 1] + 1
            } else {
                dp[(i + 1) * (n + 1) + j].max(dp[i * (n + 1) + j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(m + n);
    let (mut i, mut j) = (0, 0);
    while i < m && j < n {
        if a[i] == b[j] {
            ops.push(Op::Equal(a[i]));
            i += 1;
            j += 1;
        } else if dp[(i + 1) * (n + 1) + j] >= dp[i * (n + 1) + j + 1] {
            ops.push(Op::Del(a[i]));
            i += 1;
        } else {
            ops.push(Op::Ins(b[j]));
            j += 1;
        }
    }
    ops.extend(a[i..].iter().map(|l| Op::Del(l)));
    ops.extend(b[j..].iter().map(|l| Op::Ins(l)));
    ops
}
