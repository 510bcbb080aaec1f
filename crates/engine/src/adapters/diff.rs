//! Line-level change counting

/// Positional count of differing lines between two versions of a file.
/// Lines present on only one side each count as one change.
pub fn count_line_changes(before: &str, after: &str) -> usize {
    let before: Vec<&str> = before.lines().collect();
    let after: Vec<&str> = after.lines().collect();

    let changed = before
        .iter()
        .zip(after.iter())
        .filter(|(old, new)| old != new)
        .count();
    changed + before.len().abs_diff(after.len())
}
