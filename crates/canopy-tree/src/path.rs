//! Path parsing helpers
//!
//! Paths are absolute, "/"-delimited, and resolved segment by segment.
//! No relative paths, no "..", no globs.

use crate::error::{Result, TreeError};

/// Split an absolute path into its segments. "/" yields an empty list.
pub fn split(path: &str) -> Result<Vec<&str>> {
    let Some(rest) = path.strip_prefix('/') else {
        return Err(TreeError::invalid_path(path));
    };
    if rest.is_empty() {
        return Ok(Vec::new());
    }
    let segments: Vec<&str> = rest.trim_end_matches('/').split('/').collect();
    if segments.iter().any(|s| s.is_empty() || *s == "..") {
        return Err(TreeError::invalid_path(path));
    }
    Ok(segments)
}

/// Split into (parent segments, final segment). Fails on "/" itself.
pub fn split_parent(path: &str) -> Result<(Vec<&str>, &str)> {
    let mut segments = split(path)?;
    match segments.pop() {
        Some(last) => Ok((segments, last)),
        None => Err(TreeError::invalid_path(path)),
    }
}

/// Join a base path and a child name.
pub fn join(base: &str, name: &str) -> String {
    if base == "/" {
        format!("/{name}")
    } else {
        format!("{base}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_root() {
        assert!(split("/").unwrap().is_empty());
    }

    #[test]
    fn split_nested() {
        assert_eq!(split("/a/b/c").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(split("/a/b/").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn split_rejects_relative_and_empty() {
        assert!(split("a/b").is_err());
        assert!(split("").is_err());
        assert!(split("/a//b").is_err());
        assert!(split("/a/../b").is_err());
    }

    #[test]
    fn parent_of_top_level() {
        let (parent, last) = split_parent("/a").unwrap();
        assert!(parent.is_empty());
        assert_eq!(last, "a");
        assert!(split_parent("/").is_err());
    }

    #[test]
    fn join_handles_root() {
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/a", "b"), "/a/b");
    }
}
