use std::fmt::Write;

use common::env::{Snapshot, SnapshotDiff};

const MASK: &str = "********";

fn shown<'a>(value: &'a str, show_secrets: bool) -> &'a str {
    if show_secrets {
        value
    } else {
        MASK
    }
}

/// One line per key, values masked
pub fn env_summary(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for key in snapshot.keys() {
        let _ = writeln!(out, "  {}={}", key, MASK);
    }
    let _ = write!(out, "{} variable(s)", snapshot.len());
    out
}

/// `+` added, `-` removed, `~` modified; values only with `show_secrets`
pub fn diff_report(
    changes: &SnapshotDiff,
    old: &Snapshot,
    new: &Snapshot,
    show_secrets: bool,
) -> String {
    if changes.is_empty() {
        return "no changes".to_string();
    }

    let value = |snapshot: &Snapshot, key: &str| -> String {
        snapshot
            .get(key)
            .map(|v| shown(v, show_secrets).to_string())
            .unwrap_or_default()
    };

    let mut out = String::new();
    for key in &changes.added {
        let _ = writeln!(out, "+ {}={}", key, value(new, key));
    }
    for key in &changes.removed {
        let _ = writeln!(out, "- {}={}", key, value(old, key));
    }
    for key in &changes.modified {
        if show_secrets {
            let _ = writeln!(out, "~ {}: {} -> {}", key, value(old, key), value(new, key));
        } else {
            let _ = writeln!(out, "~ {}", key);
        }
    }
    let _ = write!(
        out,
        "{} added, {} removed, {} modified",
        changes.added.len(),
        changes.removed.len(),
        changes.modified.len()
    );
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use common::env::diff;

    fn snapshot(pairs: &[(&str, &str)]) -> Snapshot {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_diff_report_masks_values() {
        let old = snapshot(&[("FOO", "bar"), ("GONE", "x")]);
        let new = snapshot(&[("FOO", "baz"), ("NEW", "1")]);
        let report = diff_report(&diff(&old, &new), &old, &new, false);

        assert!(report.contains("+ NEW=********"));
        assert!(report.contains("- GONE=********"));
        assert!(report.contains("~ FOO\n"));
        assert!(!report.contains("baz"));
        assert!(report.ends_with("1 added, 1 removed, 1 modified"));
    }

    #[test]
    fn test_diff_report_shows_secrets() {
        let old = snapshot(&[("FOO", "bar")]);
        let new = snapshot(&[("FOO", "baz")]);
        let report = diff_report(&diff(&old, &new), &old, &new, true);
        assert!(report.contains("~ FOO: bar -> baz"));
    }

    #[test]
    fn test_no_changes() {
        let s = snapshot(&[("A", "1")]);
        assert_eq!(diff_report(&diff(&s, &s), &s, &s, true), "no changes");
    }

    #[test]
    fn test_env_summary() {
        let summary = env_summary(&snapshot(&[("A", "secret")]));
        assert!(!summary.contains("secret"));
        assert!(summary.ends_with("1 variable(s)"));
    }
}
