//! Normalized repository paths.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexResult};

/// An absolute, normalized path inside the repository tree.
///
/// Always starts with `/`. The root is `/`; every other path is `/` followed
/// by one or more non-empty segments joined by `/`, with no trailing slash.
/// Segments are never `.` or `..` and never contain NUL.
///
/// Ordering is plain byte order of the normalized string, so all paths below
/// a directory `/d` form one contiguous run starting at `/d/`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoPath(String);

impl RepoPath {
    /// The repository root, `/`.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Normalize a caller-supplied file path.
    ///
    /// A missing leading `/` is added (`a/b` becomes `/a/b`). The root itself
    /// is rejected: changes always name an entry, never the whole tree.
    pub fn parse(raw: &str) -> IndexResult<Self> {
        if raw.is_empty() {
            return Err(IndexError::malformed(raw, "path is empty"));
        }
        let body = raw.strip_prefix('/').unwrap_or(raw);
        if body.is_empty() {
            return Err(IndexError::malformed(raw, "path names the repository root"));
        }
        for segment in body.split('/') {
            Self::check_segment(raw, segment)?;
        }
        Ok(Self(format!("/{body}")))
    }

    fn check_segment(raw: &str, segment: &str) -> IndexResult<()> {
        match segment {
            "" => Err(IndexError::malformed(raw, "empty path segment")),
            "." | ".." => Err(IndexError::malformed(
                raw,
                format!("relative segment {segment:?}"),
            )),
            s if s.contains('\0') => Err(IndexError::malformed(raw, "NUL byte in path")),
            _ => Ok(()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Path segments from the root down. Empty for the root.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0[1..].split('/').filter(|s| !s.is_empty())
    }

    /// Last segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.rsplit('/').next()
    }

    /// Containing directory, or `None` for the root.
    pub fn parent(&self) -> Option<RepoPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) | None => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
        }
    }

    /// Every proper ancestor, nearest first, ending with the root.
    pub fn ancestors(&self) -> impl Iterator<Item = RepoPath> {
        std::iter::successors(self.parent(), RepoPath::parent)
    }

    /// Append one segment.
    pub fn join(&self, segment: &str) -> IndexResult<RepoPath> {
        let joined = format!("{}{segment}", self.dir_prefix());
        if segment.contains('/') {
            return Err(IndexError::malformed(&joined, "segment contains '/'"));
        }
        Self::check_segment(&joined, segment)?;
        Ok(Self(joined))
    }

    /// The prefix shared by every path strictly below this one: `/` for the
    /// root, `/a/b/` for `/a/b`.
    pub fn dir_prefix(&self) -> String {
        if self.is_root() {
            self.0.clone()
        } else {
            format!("{}/", self.0)
        }
    }

    /// `true` if `other` lies strictly below `self`.
    pub fn is_ancestor_of(&self, other: &RepoPath) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.dir_prefix())
    }

    /// Segments of `self` below `ancestor`, or `None` if `ancestor` does not
    /// strictly contain `self`.
    pub fn strip_prefix<'a>(&'a self, ancestor: &RepoPath) -> Option<impl Iterator<Item = &'a str>> {
        if !ancestor.is_ancestor_of(self) {
            return None;
        }
        let rest = &self.0[ancestor.dir_prefix().len()..];
        Some(rest.split('/'))
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RepoPath({})", self.0)
    }
}

impl Borrow<str> for RepoPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RepoPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RepoPath {
    type Error = IndexError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        if raw == "/" {
            return Ok(Self::root());
        }
        Self::parse(&raw)
    }
}

impl From<RepoPath> for String {
    fn from(path: RepoPath) -> Self {
        path.0
    }
}

impl std::str::FromStr for RepoPath {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(raw: &str) -> RepoPath {
        RepoPath::parse(raw).unwrap()
    }

    // ---- normalization ----

    #[test]
    fn leading_slash_is_added() {
        assert_eq!(p("a/b/c").as_str(), "/a/b/c");
        assert_eq!(p("/a/b/c").as_str(), "/a/b/c");
        assert_eq!(p("a/b"), p("/a/b"));
    }

    #[test]
    fn rejects_empty_and_root() {
        for raw in ["", "/"] {
            assert!(matches!(
                RepoPath::parse(raw),
                Err(IndexError::MalformedPath { .. })
            ));
        }
    }

    #[test]
    fn rejects_escaping_and_ambiguous_segments() {
        for raw in ["../x", "/a/../b", "/a/./b", "a//b", "/a/", "//a", "a/\0b"] {
            assert!(RepoPath::parse(raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn error_names_the_offending_path() {
        let err = RepoPath::parse("a//b").unwrap_err();
        assert_eq!(
            err,
            IndexError::MalformedPath {
                path: "a//b".into(),
                reason: "empty path segment".into()
            }
        );
    }

    // ---- structure ----

    #[test]
    fn segments_name_and_parent() {
        let path = p("/test1/test2/test3/test");
        assert_eq!(
            path.segments().collect::<Vec<_>>(),
            vec!["test1", "test2", "test3", "test"]
        );
        assert_eq!(path.name(), Some("test"));
        assert_eq!(path.parent(), Some(p("/test1/test2/test3")));
        assert_eq!(p("/top").parent(), Some(RepoPath::root()));
        assert_eq!(RepoPath::root().parent(), None);
        assert_eq!(RepoPath::root().name(), None);
        assert_eq!(RepoPath::root().segments().count(), 0);
    }

    #[test]
    fn ancestors_end_at_root() {
        let chain: Vec<String> = p("/a/b/c").ancestors().map(|a| a.to_string()).collect();
        assert_eq!(chain, vec!["/a/b", "/a", "/"]);
    }

    #[test]
    fn join_appends_one_segment() {
        assert_eq!(RepoPath::root().join("a").unwrap(), p("/a"));
        assert_eq!(p("/a").join("b.txt").unwrap(), p("/a/b.txt"));
        assert!(p("/a").join("b/c").is_err());
        assert!(p("/a").join("..").is_err());
        assert!(p("/a").join("").is_err());
    }

    #[test]
    fn containment_is_segment_aware() {
        assert!(p("/a").is_ancestor_of(&p("/a/b")));
        assert!(RepoPath::root().is_ancestor_of(&p("/a")));
        assert!(!p("/a").is_ancestor_of(&p("/a")));
        assert!(!p("/a").is_ancestor_of(&p("/ab/c")));
        assert!(!p("/a/b").is_ancestor_of(&p("/a")));
    }

    #[test]
    fn strip_prefix_yields_relative_segments() {
        let full = p("/a/b/c");
        let rel: Vec<&str> = full.strip_prefix(&p("/a")).unwrap().collect();
        assert_eq!(rel, vec!["b", "c"]);
        assert!(p("/a").strip_prefix(&p("/a")).is_none());
        assert!(p("/x/y").strip_prefix(&p("/a")).is_none());
    }

    #[test]
    fn serde_validates_on_the_way_in() {
        let json = serde_json::to_string(&p("/a/b")).unwrap();
        assert_eq!(json, "\"/a/b\"");
        assert!(serde_json::from_str::<RepoPath>("\"/a/../b\"").is_err());
        let root: RepoPath = serde_json::from_str("\"/\"").unwrap();
        assert!(root.is_root());
    }

    proptest! {
        #[test]
        fn parse_is_idempotent(segments in proptest::collection::vec("[a-z0-9._-]{1,6}", 1..5)) {
            prop_assume!(segments.iter().all(|s| s != "." && s != ".."));
            let once = RepoPath::parse(&segments.join("/")).unwrap();
            let twice = RepoPath::parse(once.as_str()).unwrap();
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(once.segments().count(), segments.len());
        }
    }
}
