use crate::model::BranchGroup;

/// Splits `git branch --list` output into one match per line, newlines kept.
///
/// Returns `None` for empty output so the repository can be left out.
pub fn decode_branches(raw: &[u8], project: &str) -> Option<BranchGroup> {
    if raw.is_empty() {
        return None;
    }

    let text = String::from_utf8_lossy(raw);
    let matches: Vec<String> = text.split_inclusive('\n').map(str::to_string).collect();

    Some(BranchGroup {
        project: project.to_string(),
        matches,
    })
}
