//! Path validation and normalization.
//!
//! Two different notions of "the same path" live here:
//! - [`validate`] keeps a relative path inside the library root before it is
//!   joined onto a directory on disk.
//! - [`normalize`] produces lookup keys for archive entries, where neither
//!   the case nor the unicode form of stored names can be trusted.

use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

use crate::error::{ErrorKind, Result};

/// Validates a storage path for security and correctness.
/// Ensures that paths don't escape the library root (no `..` traversal).
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use iphoto_storage::validate_path;
/// assert!(validate_path("Masters/2020/IMG_0001.JPG").is_ok());
/// assert!(validate_path("Masters/../Thumbnails/IMG_0001.JPG").is_ok());
/// assert!(validate_path("../Library.apdb").is_err());
/// assert!(validate_path("a\0b").is_err());
/// assert_eq!(
///     validate_path("Masters//2020/./IMG_0001.JPG/").unwrap(),
///     Path::new("Masters/2020/IMG_0001.JPG")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

/// Canonical lookup key for an archive path.
///
/// Backslashes become slashes, the string is NFC-composed and lower-cased,
/// then cleaned (see [`clean`]). Lower-casing can leave pairs that only
/// compose afterwards (`T\u{308}` becomes `t\u{308}`), so composition runs
/// again on the lower-cased string. Normalizing twice is the same as
/// normalizing once.
///
/// ```
/// use iphoto_storage::normalize_path;
/// assert_eq!(normalize_path("MyLibrary\\Masters\\2020\\IMG.JPG"), "mylibrary/masters/2020/img.jpg");
/// assert_eq!(normalize_path("Masters/./2020//../2021/Cafe\u{301}.jpg"), "masters/2021/caf\u{e9}.jpg");
/// ```
pub fn normalize(path: &str) -> String {
    let slashed = path.replace('\\', "/");
    let composed: String = slashed.nfc().collect();
    let lowered: String = composed.to_lowercase().nfc().collect();
    clean(&lowered)
}

/// Lexically clean a slash-separated path.
///
/// Redundant separators and `.` elements are dropped, `..` removes the
/// preceding element. A `..` that cannot be resolved is kept on relative
/// paths and dropped on rooted ones. Trailing separators are dropped and an
/// empty result becomes `.`.
pub fn clean(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {},
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                },
                _ if rooted => {},
                _ => parts.push(".."),
            },
            part => parts.push(part),
        }
    }
    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_valid_paths() {
        assert_eq!(
            validate(Path::new("Masters/2020/IMG.JPG")).unwrap(),
            Path::new("Masters/2020/IMG.JPG")
        );
        assert_eq!(validate(Path::new("Database/apdb/Faces.db")).unwrap(), Path::new("Database/apdb/Faces.db"));
        assert_eq!(validate(Path::new("a//b/./c/")).unwrap(), Path::new("a/b/c"));
        assert_eq!(validate(Path::new("a/b/..")).unwrap(), Path::new("a"));
    }

    #[test]
    fn test_traversal_attempts() {
        assert!(validate(Path::new("../Library.apdb")).is_err());
        assert!(validate(Path::new("Masters/../../etc/passwd")).is_err());
        assert!(validate(Path::new("..")).is_err());
    }

    #[test]
    fn test_invalid_paths() {
        assert!(validate(Path::new("a\0b")).is_err());
        assert!(validate(Path::new("")).is_err());
        assert!(validate(Path::new("./.")).is_err());
    }

    #[rstest]
    #[case("", ".")]
    #[case(".", ".")]
    #[case("/", "/")]
    #[case("a/b/c", "a/b/c")]
    #[case("a//b///c/", "a/b/c")]
    #[case("./a/./b/.", "a/b")]
    #[case("a/b/../c", "a/c")]
    #[case("a/../..", "..")]
    #[case("../../a", "../../a")]
    #[case("/../a", "/a")]
    #[case("/a/b/../../..", "/")]
    fn test_clean(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(clean(input), expected);
    }

    #[rstest]
    #[case("MyLibrary/Masters/2020/IMG.JPG", "mylibrary/masters/2020/img.jpg")]
    #[case("MyLibrary\\Masters\\2020\\IMG.JPG", "mylibrary/masters/2020/img.jpg")]
    #[case("Masters/2020/Cafe\u{301}.JPG", "masters/2020/caf\u{e9}.jpg")]
    #[case("Masters/2020/CAF\u{c9}.JPG", "masters/2020/caf\u{e9}.jpg")]
    #[case("Masters/./2020//IMG.JPG/", "masters/2020/img.jpg")]
    #[case("Masters/2019/../2020/IMG.JPG", "masters/2020/img.jpg")]
    #[case("Masters/T\u{308}.JPG", "masters/\u{1e97}.jpg")]
    #[case("Masters/W\u{30a}.JPG", "masters/\u{1e98}.jpg")]
    #[case("Masters/\u{1e97}.jpg", "masters/\u{1e97}.jpg")]
    fn test_normalize(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[rstest]
    #[case("")]
    #[case("..\\..\\Foo")]
    #[case("/Users/Pooh/Pictures/iPhoto Library/Masters")]
    #[case("A\u{30a}ngstro\u{308}m/./../\u{212b}/x")]
    #[case("\u{130}stanbul/Ç/ﬁle.jpg")]
    #[case("masters/2020/img.jpg")]
    #[case("T\u{308}")]
    #[case("W\u{30a}")]
    #[case("Y\u{30a}")]
    #[case("\u{130}\u{327}")]
    #[case("\u{386}\u{345}")]
    fn test_normalize_is_idempotent(#[case] input: &str) {
        let once = normalize(input);
        assert_eq!(normalize(&once), once);
    }
}
