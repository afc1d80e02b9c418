use agentdev::files::{DiffError, apply_diff, summarize, unified_diff};
use proptest::prelude::*;

#[test]
fn identical_contents_give_empty_diff() {
    assert_eq!(unified_diff("same\n", "same\n", "f.txt"), "");
    assert_eq!(apply_diff("same\n", "").unwrap(), "same\n");
}

#[test]
fn single_line_change_without_trailing_newline() {
    let diff = unified_diff("hello", "hello world", "x.txt");
    assert_eq!(
        diff,
        "--- a/x.txt\n+++ b/x.txt\n@@ -1 +1 @@\n-hello\n\\ No newline at end of file\n+hello world\n\\ No newline at end of file\n"
    );
    assert_eq!(apply_diff("hello", &diff).unwrap(), "hello world");
}

#[test]
fn hunks_carry_three_lines_of_context() {
    let old: String = (1..=20).map(|i| format!("line {i}\n")).collect();
    let new = old.replace("line 10\n", "line ten\n");

    let diff = unified_diff(&old, &new, "n.txt");
    assert!(diff.contains("@@ -7,7 +7,7 @@\n"), "{diff}");
    assert!(diff.contains(" line 7\n"));
    assert!(!diff.contains(" line 6\n"));
    assert!(diff.contains("-line 10\n+line ten\n"));

    let summary = summarize(&diff).unwrap();
    assert_eq!(summary.additions, 1);
    assert_eq!(summary.deletions, 1);
    assert_eq!(summary.total(), 2);
}

#[test]
fn distant_changes_get_separate_hunks() {
    let old: String = (1..=30).map(|i| format!("{i}\n")).collect();
    let new = old.replace("2\n3\n", "2\nthree\n").replace("28\n", "twenty-eight\n");

    let diff = unified_diff(&old, &new, "d.txt");
    assert_eq!(diff.matches("@@ -").count(), 2, "{diff}");
    assert_eq!(apply_diff(&old, &diff).unwrap(), new);
}

#[test]
fn creating_from_empty_uses_zero_range() {
    let diff = unified_diff("", "a\nb\n", "new.txt");
    assert!(diff.contains("@@ -0,0 +1,2 @@\n"), "{diff}");
    assert_eq!(apply_diff("", &diff).unwrap(), "a\nb\n");
}

#[test]
fn apply_rejects_mismatched_context() {
    let diff = unified_diff("a\nb\nc\n", "a\nB\nc\n", "f");
    let err = apply_diff("a\nx\nc\n", &diff).unwrap_err();
    assert!(matches!(err, DiffError::ContextMismatch { .. }));
}

#[test]
fn apply_rejects_bad_header_and_truncated_hunk() {
    let err = apply_diff("a\n", "@@ -x +1 @@\n").unwrap_err();
    assert!(matches!(err, DiffError::MalformedHeader(_)));

    let err = apply_diff("a\nb\n", "@@ -1,2 +1,2 @@\n a\n").unwrap_err();
    assert!(matches!(err, DiffError::MalformedHunk { .. }));
}

fn text_strategy() -> impl Strategy<Value = String> {
    // Small alphabet so lines repeat and the diff has to align them.
    proptest::collection::vec(prop::sample::select(vec!["a", "b", "c", "d"]), 0..12).prop_flat_map(
        |lines| {
            any::<bool>().prop_map(move |trailing_newline| {
                let mut text = lines.join("\n");
                if trailing_newline && !text.is_empty() {
                    text.push('\n');
                }
                text
            })
        },
    )
}

proptest! {
    #[test]
    fn applying_a_diff_reproduces_the_new_text(old in text_strategy(), new in text_strategy()) {
        let diff = unified_diff(&old, &new, "p.txt");
        prop_assert_eq!(apply_diff(&old, &diff).unwrap(), new);
    }
}
