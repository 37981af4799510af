use std::sync::LazyLock;

use regex::Regex;

// project (- group) - description
// Word and space classes are ASCII only.
static SUBJECT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let word = r"[0-9A-Za-z_/]";
    let space = r"[\t\n\x0C\r ]";
    Regex::new(&format!(
        r"^{space}*({word}+)(?:{space}*-{space}*({word}+))?{space}*-{space}*(.*)"
    ))
    .expect("valid subject regex")
});

/// The three parts encoded in an event subject line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub project: String,
    pub group: String,
    pub description: String,
}

/// Splits `"Project - Group - Description"` or `"Project - Description"`.
///
/// Returns `None` when the subject does not follow that shape; callers drop such events.
pub fn parse_subject(raw: &str) -> Option<Subject> {
    let captures = SUBJECT_PATTERN.captures(raw)?;
    let project = captures.get(1)?.as_str().to_string();
    let group = captures
        .get(2)
        .map(|group| group.as_str().to_string())
        .unwrap_or_default();
    let description = captures
        .get(3)
        .map(|description| description.as_str().to_string())
        .unwrap_or_default();

    Some(Subject {
        project,
        group,
        description,
    })
}
