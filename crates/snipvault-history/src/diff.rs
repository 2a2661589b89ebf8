//! Line-oriented diff rendering.

use similar::TextDiff;

/// Default number of unchanged lines shown around each change.
pub const DEFAULT_CONTEXT_LINES: usize = 3;

/// Render content that has no predecessor: every line is an addition.
pub fn render_added(content: &str) -> String {
    let mut output = String::with_capacity(content.len() + content.lines().count());
    for line in content.lines() {
        output.push('+');
        output.push_str(line);
        output.push('\n');
    }
    output
}

/// Unified diff from `old` to `new`, labelled with `name`.
///
/// Produces the usual `--- a/<name>` / `+++ b/<name>` header followed by
/// `@@` hunks. Identical inputs yield an empty string.
pub fn unified_diff(old: &str, new: &str, name: &str, context_lines: usize) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut unified = diff.unified_diff();
    unified
        .context_radius(context_lines)
        .header(&format!("a/{name}"), &format!("b/{name}"));
    unified.to_string()
}

/// Count added and removed lines between two versions.
pub fn line_stats(old: &str, new: &str) -> (usize, usize) {
    use similar::ChangeTag;

    let diff = TextDiff::from_lines(old, new);
    let stats = diff
        .iter_all_changes()
        .fold((0, 0), |(added, removed), change| match change.tag() {
            ChangeTag::Insert => (added + 1, removed),
            ChangeTag::Delete => (added, removed + 1),
            ChangeTag::Equal => (added, removed),
        });
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_added_prefixes_every_line() {
        let rendered = render_added("line 1\nline 2\n\nline 4");
        assert_eq!(rendered, "+line 1\n+line 2\n+\n+line 4\n");
        assert!(rendered.lines().all(|l| l.starts_with('+')));
    }

    #[test]
    fn test_render_added_empty() {
        assert_eq!(render_added(""), "");
    }

    #[test]
    fn test_unified_diff_marks_changes() {
        let diff = unified_diff(
            "line 1\nline 2\nline 3\n",
            "line 1\nmodified line\nline 3\n",
            "snp_a",
            DEFAULT_CONTEXT_LINES,
        );

        let lines: Vec<&str> = diff.lines().collect();
        assert_eq!(lines[0], "--- a/snp_a");
        assert_eq!(lines[1], "+++ b/snp_a");
        assert!(lines[2].starts_with("@@ -1,3 +1,3 @@"));
        assert!(lines.contains(&"-line 2"));
        assert!(lines.contains(&"+modified line"));
        assert!(lines.contains(&" line 1"));
    }

    #[test]
    fn test_unified_diff_limits_context() {
        let old: String = (1..=20).map(|i| format!("{i}\n")).collect();
        let new = old.replace("10\n", "ten\n");
        let diff = unified_diff(&old, &new, "n", 1);

        assert!(diff.contains(" 9\n"));
        assert!(diff.contains(" 11\n"));
        assert!(!diff.contains(" 8\n"));
    }

    #[test]
    fn test_unified_diff_identical_is_empty() {
        assert_eq!(unified_diff("same\n", "same\n", "n", 3), "");
    }

    #[test]
    fn test_unified_diff_is_deterministic() {
        let a = unified_diff("a\nb\nc\n", "a\nc\nd\n", "n", 3);
        let b = unified_diff("a\nb\nc\n", "a\nc\nd\n", "n", 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_line_stats() {
        assert_eq!(line_stats("a\nb\n", "a\nc\nd\n"), (2, 1));
    }
}
