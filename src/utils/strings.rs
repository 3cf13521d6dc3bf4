//! Small string helpers.

use uuid::Uuid;

/// A random v4 UUID in its hyphenated form.
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_hyphenated().to_string()
}

pub fn starts_with(s: &str, prefix: &str) -> bool {
    s.starts_with(prefix)
}

pub fn ends_with(s: &str, suffix: &str) -> bool {
    s.ends_with(suffix)
}

/// Replaces every non-overlapping `from`, scanning left to right. An empty `from`
/// leaves `s` unchanged.
pub fn replace_all(s: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        return s.to_string();
    }
    s.replace(from, to)
}
