// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Namespace path syntax shared by modules, connectors and spawned elements.
//!
//! A path is a list of segments joined by [`NAMESPACE_SEPARATOR`]. A module at
//! `Arm:Hand` owns the namespace `Arm:Hand:` and every element whose name starts
//! with it. Segment names never contain the separator themselves.

/// Reserved character between namespace segments.
pub const NAMESPACE_SEPARATOR: char = ':';

/// Maximum number of characters kept by [`sanitize_name`].
pub const MAX_NAME_LENGTH: usize = 100;

/// Splits `path` at the last (`from_end`) or first separator.
///
/// Returns `None` when the path has no separator.
pub fn split_namespace(path: &str, from_end: bool) -> Option<(&str, &str)> {
    let index = if from_end {
        path.rfind(NAMESPACE_SEPARATOR)?
    } else {
        path.find(NAMESPACE_SEPARATOR)?
    };
    Some((
        &path[..index],
        &path[index + NAMESPACE_SEPARATOR.len_utf8()..],
    ))
}

/// Joins two path fragments with exactly one separator between them.
///
/// An empty `left` yields `right` unchanged.
pub fn join_namespace(left: &str, right: &str) -> String {
    if left.is_empty() {
        return right.to_owned();
    }
    if left.ends_with(NAMESPACE_SEPARATOR) {
        format!("{left}{right}")
    } else {
        format!("{left}{NAMESPACE_SEPARATOR}{right}")
    }
}

/// Returns the namespace (`path` plus a trailing separator) owned by a module path.
pub fn namespace_of_path(path: &str) -> String {
    format!("{path}{NAMESPACE_SEPARATOR}")
}

/// Module path encoded in an element name (the part before the last separator).
pub fn module_path_of_name(name: &str) -> Option<&str> {
    split_namespace(name, true).map(|(left, _)| left)
}

/// Namespace encoded in an element name, including the trailing separator.
pub fn namespace_of_name(name: &str) -> Option<&str> {
    name.rfind(NAMESPACE_SEPARATOR)
        .map(|index| &name[..=index])
}

/// Element name with any namespace stripped.
pub fn local_name(name: &str) -> &str {
    split_namespace(name, true).map_or(name, |(_, right)| right)
}

/// Replaces disallowed characters with `_` and truncates to [`MAX_NAME_LENGTH`].
///
/// Letters, ASCII digits and `_ - . |` are always kept. A space is kept unless
/// it is the first character. The separator is kept only when
/// `allow_namespaces` is set.
pub fn sanitize_name(name: &str, allow_namespaces: bool) -> String {
    name.chars()
        .enumerate()
        .map(|(index, c)| {
            let good = c.is_alphabetic()
                || c.is_ascii_digit()
                || matches!(c, '_' | '-' | '.' | '|')
                || (index > 0 && c == ' ')
                || (allow_namespaces && c == NAMESPACE_SEPARATOR);
            if good {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LENGTH)
        .collect()
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Case-insensitive string equality.
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars().count() == b.chars().count()
        && a.chars().zip(b.chars()).all(|(x, y)| chars_eq_ignore_case(x, y))
}

/// Case-insensitive prefix test.
pub fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    strip_prefix_ignore_case(text, prefix).is_some()
}

/// Strips `prefix` from `text` comparing case-insensitively.
pub fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut rest = text.char_indices();
    for p in prefix.chars() {
        let (_, c) = rest.next()?;
        if !chars_eq_ignore_case(c, p) {
            return None;
        }
    }
    let offset = rest.next().map_or(text.len(), |(index, _)| index);
    Some(&text[offset..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_from_end_and_start() {
        assert_eq!(split_namespace("A:B:c", true), Some(("A:B", "c")));
        assert_eq!(split_namespace("A:B:c", false), Some(("A", "B:c")));
        assert_eq!(split_namespace("plain", true), None);
    }

    #[test]
    fn join_never_doubles_separator() {
        assert_eq!(join_namespace("Arm", "Root"), "Arm:Root");
        assert_eq!(join_namespace("Arm:", "Root"), "Arm:Root");
        assert_eq!(join_namespace("", "Root"), "Root");
    }

    #[test]
    fn name_helpers_read_the_last_segment() {
        assert_eq!(module_path_of_name("Arm:Hand:Root"), Some("Arm:Hand"));
        assert_eq!(namespace_of_name("Arm:Hand:Root"), Some("Arm:Hand:"));
        assert_eq!(namespace_of_name("shoulder"), None);
        assert_eq!(local_name("Arm:Hand:Root"), "Root");
        assert_eq!(local_name("shoulder"), "shoulder");
    }

    #[test]
    fn sanitize_replaces_and_truncates() {
        assert_eq!(sanitize_name("arm left", false), "arm left");
        assert_eq!(sanitize_name(" arm", false), "_arm");
        assert_eq!(sanitize_name("a:b", false), "a_b");
        assert_eq!(sanitize_name("a:b", true), "a:b");
        assert_eq!(sanitize_name("a/b*c", false), "a_b_c");
        let long = "x".repeat(MAX_NAME_LENGTH + 20);
        assert_eq!(sanitize_name(&long, false).chars().count(), MAX_NAME_LENGTH);
    }

    #[test]
    fn case_insensitive_helpers() {
        assert!(eq_ignore_case("Arm", "aRM"));
        assert!(!eq_ignore_case("Arm", "Arms"));
        assert!(starts_with_ignore_case("ARM:hand", "arm:"));
        assert_eq!(strip_prefix_ignore_case("Arm:Hand", "arm:"), Some("Hand"));
        assert_eq!(strip_prefix_ignore_case("Armor:Hand", "arm:"), None);
        assert_eq!(strip_prefix_ignore_case("Arm", "Arm"), Some(""));
    }
}
