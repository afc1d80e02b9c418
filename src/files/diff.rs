// src/files/diff.rs

//! Line-based unified diffs.
//!
//! [`unified_diff`] produces GNU-style output (3 lines of context,
//! `\ No newline at end of file` markers) and [`apply_diff`] replays such a
//! diff, so `apply_diff(old, &unified_diff(old, new, p)) == new` for any pair
//! of texts.

use thiserror::Error;

/// Lines of unchanged context around each change.
pub const CONTEXT_LINES: usize = 3;

const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file\n";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiffError {
    #[error("malformed hunk header: {0}")]
    MalformedHeader(String),

    #[error("hunk starting at diff line {line} ends early or has an unknown line prefix")]
    MalformedHunk { line: usize },

    #[error("hunk does not match original content at line {line}")]
    ContextMismatch { line: usize },

    #[error("hunk for original line {line} overlaps or lies outside the original")]
    HunkOutOfRange { line: usize },
}

/// Added/removed line counts of a diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub additions: usize,
    pub deletions: usize,
}

impl DiffSummary {
    pub fn total(&self) -> usize {
        self.additions + self.deletions
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Delete,
    Insert,
}

/// One step of the edit script, pointing at the line it consumes.
#[derive(Debug, Clone, Copy)]
struct Edit {
    op: Op,
    /// Index into the old lines (Equal/Delete) or new lines (Insert).
    line: usize,
}

/// Unified diff turning `old` into `new`, with `path` in the headers.
///
/// Empty when the two texts are identical.
pub fn unified_diff(old: &str, new: &str, path: &str) -> String {
    if old == new {
        return String::new();
    }

    let a: Vec<&str> = old.split_inclusive('\n').collect();
    let b: Vec<&str> = new.split_inclusive('\n').collect();
    let edits = edit_script(&a, &b);

    let mut out = format!("--- a/{path}\n+++ b/{path}\n");
    for (start, end) in hunk_ranges(&edits) {
        let (old_start, new_start) = position_before(&edits, start);
        let hunk = &edits[start..end];
        let old_len = hunk.iter().filter(|e| e.op != Op::Insert).count();
        let new_len = hunk.iter().filter(|e| e.op != Op::Delete).count();

        out.push_str(&format!(
            "@@ -{} +{} @@\n",
            format_range(old_start, old_len),
            format_range(new_start, new_len)
        ));

        for edit in hunk {
            let (prefix, text) = match edit.op {
                Op::Equal => (' ', a[edit.line]),
                Op::Delete => ('-', a[edit.line]),
                Op::Insert => ('+', b[edit.line]),
            };
            out.push(prefix);
            out.push_str(text);
            if !text.ends_with('\n') {
                out.push('\n');
                out.push_str(NO_NEWLINE_MARKER);
            }
        }
    }
    out
}

/// Replay a unified diff on `original`.
pub fn apply_diff(original: &str, diff: &str) -> Result<String, DiffError> {
    let hunks = parse_hunks(diff)?;
    let lines: Vec<&str> = original.split_inclusive('\n').collect();

    let mut out = String::with_capacity(original.len());
    let mut cursor = 0usize;

    for hunk in hunks {
        let start = if hunk.old_len == 0 {
            hunk.old_start
        } else {
            hunk.old_start.saturating_sub(1)
        };
        if start < cursor || start > lines.len() {
            return Err(DiffError::HunkOutOfRange {
                line: hunk.old_start,
            });
        }
        for line in &lines[cursor..start] {
            out.push_str(line);
        }
        cursor = start;

        for (op, text) in &hunk.lines {
            match op {
                Op::Equal | Op::Delete => {
                    if lines.get(cursor) != Some(&text.as_str()) {
                        return Err(DiffError::ContextMismatch { line: cursor + 1 });
                    }
                    if *op == Op::Equal {
                        out.push_str(text);
                    }
                    cursor += 1;
                }
                Op::Insert => out.push_str(text),
            }
        }
    }

    for line in &lines[cursor..] {
        out.push_str(line);
    }
    Ok(out)
}

/// Count added and removed lines of a unified diff.
pub fn summarize(diff: &str) -> Result<DiffSummary, DiffError> {
    let mut summary = DiffSummary::default();
    for hunk in parse_hunks(diff)? {
        for (op, _) in &hunk.lines {
            match op {
                Op::Insert => summary.additions += 1,
                Op::Delete => summary.deletions += 1,
                Op::Equal => {}
            }
        }
    }
    Ok(summary)
}

/// Myers shortest edit script between two line slices.
fn edit_script(a: &[&str], b: &[&str]) -> Vec<Edit> {
    // Common prefix/suffix never need the search.
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let mut edits: Vec<Edit> = (0..prefix).map(|i| Edit { op: Op::Equal, line: i }).collect();
    let mid_a = &a[prefix..a.len() - suffix];
    let mid_b = &b[prefix..b.len() - suffix];
    edits.extend(myers(mid_a, mid_b).into_iter().map(|e| Edit {
        op: e.op,
        line: e.line + prefix,
    }));
    edits.extend((a.len() - suffix..a.len()).map(|i| Edit { op: Op::Equal, line: i }));
    edits
}

fn myers(a: &[&str], b: &[&str]) -> Vec<Edit> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = n + m;
    if max == 0 {
        return Vec::new();
    }

    let offset = max;
    let idx = |k: isize| (k + offset) as usize;
    let mut v = vec![0isize; 2 * max as usize + 2];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    'search: for d in 0..=max {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let mut x = if k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]) {
                v[idx(k + 1)]
            } else {
                v[idx(k - 1)] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx(k)] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    let mut edits = Vec::new();
    let (mut x, mut y) = (n, m);
    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let prev_k = if k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[idx(prev_k)];
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            x -= 1;
            y -= 1;
            edits.push(Edit {
                op: Op::Equal,
                line: x as usize,
            });
        }
        if d > 0 {
            if x == prev_x {
                edits.push(Edit {
                    op: Op::Insert,
                    line: prev_y as usize,
                });
            } else {
                edits.push(Edit {
                    op: Op::Delete,
                    line: prev_x as usize,
                });
            }
        }
        x = prev_x;
        y = prev_y;
    }

    edits.reverse();
    edits
}

/// Ranges of the edit script to print as hunks, with context, merging
/// changes closer than twice the context.
fn hunk_ranges(edits: &[Edit]) -> Vec<(usize, usize)> {
    let changes: Vec<usize> = edits
        .iter()
        .enumerate()
        .filter(|(_, e)| e.op != Op::Equal)
        .map(|(i, _)| i)
        .collect();

    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for &i in &changes {
        let start = i.saturating_sub(CONTEXT_LINES);
        let end = (i + CONTEXT_LINES + 1).min(edits.len());
        match ranges.last_mut() {
            Some(last) if start <= last.1 => last.1 = end,
            _ => ranges.push((start, end)),
        }
    }
    ranges
}

/// Old/new line counts consumed before edit `at`.
fn position_before(edits: &[Edit], at: usize) -> (usize, usize) {
    let old = edits[..at].iter().filter(|e| e.op != Op::Insert).count();
    let new = edits[..at].iter().filter(|e| e.op != Op::Delete).count();
    (old, new)
}

fn format_range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{}", start + 1, len),
    }
}

struct Hunk {
    old_start: usize,
    old_len: usize,
    lines: Vec<(Op, String)>,
}

fn parse_hunks(diff: &str) -> Result<Vec<Hunk>, DiffError> {
    let raw: Vec<&str> = diff.split_inclusive('\n').collect();
    let mut hunks = Vec::new();
    let mut i = 0;

    while i < raw.len() {
        if !raw[i].starts_with("@@") {
            // File headers and anything between hunks.
            i += 1;
            continue;
        }

        let header_line = i + 1;
        let (old_start, old_len, new_len) = parse_header(raw[i])?;
        i += 1;

        let mut hunk = Hunk {
            old_start,
            old_len,
            lines: Vec::new(),
        };
        let (mut old_seen, mut new_seen) = (0, 0);

        while old_seen < old_len || new_seen < new_len {
            let line = raw
                .get(i)
                .ok_or(DiffError::MalformedHunk { line: header_line })?;
            let op = match line.chars().next() {
                Some(' ') => Op::Equal,
                Some('-') => Op::Delete,
                Some('+') => Op::Insert,
                _ => return Err(DiffError::MalformedHunk { line: header_line }),
            };
            if op != Op::Insert {
                old_seen += 1;
            }
            if op != Op::Delete {
                new_seen += 1;
            }

            let mut text = line[1..].to_string();
            i += 1;
            if raw.get(i).is_some_and(|next| next.starts_with('\\')) {
                if text.ends_with('\n') {
                    text.pop();
                }
                i += 1;
            }
            hunk.lines.push((op, text));
        }

        if old_seen != old_len || new_seen != new_len {
            return Err(DiffError::MalformedHunk { line: header_line });
        }
        hunks.push(hunk);
    }

    Ok(hunks)
}

/// Parse `@@ -a[,b] +c[,d] @@` into `(a, b, d)`.
fn parse_header(line: &str) -> Result<(usize, usize, usize), DiffError> {
    let malformed = || DiffError::MalformedHeader(line.trim_end().to_string());

    let body = line
        .strip_prefix("@@ -")
        .and_then(|rest| rest.split(" @@").next())
        .ok_or_else(malformed)?;
    let (old, new) = body.split_once(" +").ok_or_else(malformed)?;

    let parse_range = |s: &str| -> Result<(usize, usize), DiffError> {
        match s.split_once(',') {
            Some((start, len)) => Ok((
                start.parse().map_err(|_| malformed())?,
                len.parse().map_err(|_| malformed())?,
            )),
            None => Ok((s.parse().map_err(|_| malformed())?, 1)),
        }
    };

    let (old_start, old_len) = parse_range(old)?;
    let (_, new_len) = parse_range(new)?;
    Ok((old_start, old_len, new_len))
}
