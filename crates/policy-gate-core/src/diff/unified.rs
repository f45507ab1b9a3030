//! Unified diff output in the familiar `diff -u` shape.

use super::lcs::{opcodes, Opcode};

/// Context lines around each change.
pub const DEFAULT_CONTEXT: usize = 3;

/// A rendered unified diff with its change counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnifiedDiff {
    /// Diff lines without terminators, headers included. Empty when the
    /// inputs are identical.
    pub lines: Vec<String>,
    pub additions: usize,
    pub deletions: usize,
}

impl UnifiedDiff {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The diff as one newline-joined string.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Split text into lines that keep their `\n` terminator, with CRLF folded to LF.
pub fn split_lines(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .split_inclusive('\n')
        .map(str::to_string)
        .collect()
}

/// Diff two line sequences. Lines are compared with their terminators.
pub fn unified_diff(
    before: &[String],
    after: &[String],
    from_label: &str,
    to_label: &str,
    context: usize,
) -> UnifiedDiff {
    let mut diff = UnifiedDiff::default();

    for group in grouped_opcodes(opcodes(before, after), context) {
        if diff.lines.is_empty() {
            diff.lines.push(format!("--- {}", from_label));
            diff.lines.push(format!("+++ {}", to_label));
        }

        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        diff.lines.push(format!(
            "@@ -{} +{} @@",
            format_range(first.a_range().0, last.a_range().1),
            format_range(first.b_range().0, last.b_range().1)
        ));

        for code in &group {
            let (a1, a2) = code.a_range();
            let (b1, b2) = code.b_range();
            match code {
                Opcode::Equal { .. } => {
                    push_lines(&mut diff.lines, ' ', &before[a1..a2]);
                }
                Opcode::Delete { .. } => {
                    push_lines(&mut diff.lines, '-', &before[a1..a2]);
                    diff.deletions += a2 - a1;
                }
                Opcode::Insert { .. } => {
                    push_lines(&mut diff.lines, '+', &after[b1..b2]);
                    diff.additions += b2 - b1;
                }
                Opcode::Replace { .. } => {
                    push_lines(&mut diff.lines, '-', &before[a1..a2]);
                    push_lines(&mut diff.lines, '+', &after[b1..b2]);
                    diff.deletions += a2 - a1;
                    diff.additions += b2 - b1;
                }
            }
        }
    }

    diff
}

fn push_lines(out: &mut Vec<String>, marker: char, lines: &[String]) {
    for line in lines {
        out.push(format!("{}{}", marker, line.strip_suffix('\n').unwrap_or(line)));
    }
}

/// Hunk range as `start,len`, 1-based, with the single-line and empty forms
/// used by `diff -u`.
fn format_range(start: usize, stop: usize) -> String {
    let length = stop - start;
    match length {
        1 => format!("{}", start + 1),
        0 => format!("{},0", start),
        _ => format!("{},{}", start + 1, length),
    }
}

/// Group opcodes into hunks separated by more than `2 * context` unchanged lines.
fn grouped_opcodes(mut codes: Vec<Opcode>, context: usize) -> Vec<Vec<Opcode>> {
    if codes.is_empty() {
        return Vec::new();
    }

    if let Some(Opcode::Equal { a, b }) = codes.first().copied() {
        codes[0] = Opcode::Equal {
            a: (a.0.max(a.1.saturating_sub(context)), a.1),
            b: (b.0.max(b.1.saturating_sub(context)), b.1),
        };
    }
    let last = codes.len() - 1;
    if let Some(Opcode::Equal { a, b }) = codes.last().copied() {
        codes[last] = Opcode::Equal {
            a: (a.0, a.1.min(a.0 + context)),
            b: (b.0, b.1.min(b.0 + context)),
        };
    }

    let mut groups = Vec::new();
    let mut group = Vec::new();
    for code in codes {
        match code {
            Opcode::Equal { a, b } if a.1 - a.0 > 2 * context => {
                group.push(Opcode::Equal {
                    a: (a.0, a.1.min(a.0 + context)),
                    b: (b.0, b.1.min(b.0 + context)),
                });
                groups.push(std::mem::take(&mut group));
                group.push(Opcode::Equal {
                    a: (a.0.max(a.1.saturating_sub(context)), a.1),
                    b: (b.0.max(b.1.saturating_sub(context)), b.1),
                });
            }
            other => group.push(other),
        }
    }
    if !(group.is_empty() || (group.len() == 1 && group[0].is_equal())) {
        groups.push(group);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identical_inputs_produce_no_diff() {
        let a = lines(&["a\n", "b\n"]);
        let diff = unified_diff(&a, &a, "before/x", "after/x", DEFAULT_CONTEXT);
        assert!(diff.is_empty());
        assert_eq!((diff.additions, diff.deletions), (0, 0));
    }

    #[test]
    fn single_replacement() {
        let diff = unified_diff(
            &lines(&["a\n", "b\n"]),
            &lines(&["a\n", "c\n"]),
            "before/x.yaml",
            "after/x.yaml",
            DEFAULT_CONTEXT,
        );
        assert_eq!(
            diff.lines,
            vec!["--- before/x.yaml", "+++ after/x.yaml", "@@ -1,2 +1,2 @@", " a", "-b", "+c"]
        );
        assert_eq!((diff.additions, diff.deletions), (1, 1));
    }

    #[test]
    fn new_file_against_empty() {
        let diff = unified_diff(
            &[],
            &lines(&["kind: Service\n", "name: api\n"]),
            "before/api-prod.yaml",
            "after/api-prod.yaml",
            DEFAULT_CONTEXT,
        );
        assert_eq!(diff.lines[2], "@@ -0,0 +1,2 @@");
        assert_eq!((diff.additions, diff.deletions), (2, 0));
    }

    #[test]
    fn distant_changes_split_into_hunks() {
        let before: Vec<String> = (0..20).map(|i| format!("line {i}\n")).collect();
        let mut after = before.clone();
        after[1] = "changed 1\n".to_string();
        after[18] = "changed 18\n".to_string();

        let diff = unified_diff(&before, &after, "a", "b", DEFAULT_CONTEXT);
        let hunks: Vec<&String> = diff.lines.iter().filter(|l| l.starts_with("@@")).collect();
        assert_eq!(hunks, vec!["@@ -1,5 +1,5 @@", "@@ -16,5 +16,5 @@"]);
        assert_eq!((diff.additions, diff.deletions), (2, 2));
    }

    #[test]
    fn nearby_changes_share_a_hunk() {
        let before: Vec<String> = (0..10).map(|i| format!("{i}\n")).collect();
        let mut after = before.clone();
        after[2] = "x\n".to_string();
        after[7] = "y\n".to_string();

        let diff = unified_diff(&before, &after, "a", "b", DEFAULT_CONTEXT);
        let hunks = diff.lines.iter().filter(|l| l.starts_with("@@")).count();
        assert_eq!(hunks, 1);
        assert_eq!(diff.lines[2], "@@ -1,10 +1,10 @@");
    }

    #[test]
    fn counts_match_marker_lines() {
        let before = lines(&["a\n", "b\n", "c\n", "d\n"]);
        let after = lines(&["a\n", "c\n", "e\n", "f\n", "d\n"]);
        let diff = unified_diff(&before, &after, "a", "b", DEFAULT_CONTEXT);

        let plus = diff
            .lines
            .iter()
            .filter(|l| l.starts_with('+') && !l.starts_with("+++"))
            .count();
        let minus = diff
            .lines
            .iter()
            .filter(|l| l.starts_with('-') && !l.starts_with("---"))
            .count();
        assert_eq!(diff.additions, plus);
        assert_eq!(diff.deletions, minus);
    }

    #[test]
    fn split_lines_keeps_terminators() {
        assert_eq!(split_lines("a\r\nb\nc"), vec!["a\n", "b\n", "c"]);
        assert!(split_lines("").is_empty());
    }
}
