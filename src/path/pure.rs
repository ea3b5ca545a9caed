//! Pure (network-free) path algebra for AList remote paths.
//!
//! A remote path looks like `https://server:5244/local/a/f.txt`: a "drive"
//! naming the server, a root marker, and POSIX-style segments. The drive
//! plays the role a drive letter plays on Windows paths; stripping it
//! leaves the absolute path the server's filesystem API expects.

use std::fmt;
use std::str::FromStr;

use crate::error::{AlistError, Result};
use crate::registry::ServerIdentity;

/// An immutable remote path value: drive + root marker + segments.
///
/// Segments never contain empty or `"."` components; `".."` is kept
/// lexically. Equality and hashing are structural, so two spellings of
/// the same server (default port written out or omitted) compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PureAlistPath {
    drive: String,
    rooted: bool,
    segments: Vec<String>,
}

fn split_segments(tail: &str) -> Vec<String> {
    tail.split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .map(str::to_string)
        .collect()
}

impl PureAlistPath {
    /// Parse a path string. A leading `http://` or `https://` prefix is
    /// taken as the drive, with default ports normalized away; a leading
    /// `/` makes a rooted drive-less path; anything else is relative.
    pub fn new(s: impl AsRef<str>) -> Self {
        let s = s.as_ref();

        if s.starts_with("http://") || s.starts_with("https://") {
            let mut split = s.splitn(4, '/');
            let scheme = split.next().unwrap_or_default();
            let _ = split.next();
            let authority = split.next().unwrap_or_default();
            let tail = split.next().unwrap_or_default();

            let raw_drive = format!("{scheme}//{authority}");
            let drive = match ServerIdentity::parse(&raw_drive) {
                Ok(identity) => identity.to_string(),
                Err(_) => raw_drive,
            };
            return Self {
                drive,
                rooted: true,
                segments: split_segments(tail),
            };
        }

        if let Some(tail) = s.strip_prefix('/') {
            return Self {
                drive: String::new(),
                rooted: true,
                segments: split_segments(tail),
            };
        }

        Self {
            drive: String::new(),
            rooted: false,
            segments: split_segments(s),
        }
    }

    /// The server-identity prefix, or `""` for an unbound path.
    pub fn drive(&self) -> &str {
        &self.drive
    }

    /// Whether the path carries a root marker.
    pub fn has_root(&self) -> bool {
        self.rooted
    }

    /// True exactly when both drive and root are set.
    pub fn is_absolute(&self) -> bool {
        !self.drive.is_empty() && self.rooted
    }

    /// The ordered path segments below the anchor.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Anchor plus segments, pathlib-style.
    pub fn parts(&self) -> Vec<String> {
        let mut parts = Vec::with_capacity(self.segments.len() + 1);
        let anchor = self.anchor();
        if !anchor.is_empty() {
            parts.push(anchor);
        }
        parts.extend(self.segments.iter().cloned());
        parts
    }

    /// Drive + root in string form (`"https://server/"`, `"/"`, or `""`).
    pub fn anchor(&self) -> String {
        match (self.drive.is_empty(), self.rooted) {
            (false, true) => format!("{}/", self.drive),
            (false, false) => self.drive.clone(),
            (true, true) => "/".to_string(),
            (true, false) => String::new(),
        }
    }

    /// Final segment, or `""` for an anchor-only path.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// Name without its final extension.
    pub fn stem(&self) -> &str {
        let name = self.name();
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => name,
        }
    }

    /// Final extension including the dot, or `""`.
    pub fn suffix(&self) -> &str {
        let name = self.name();
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
                &name[name.len() - ext.len() - 1..]
            }
            _ => "",
        }
    }

    /// The logical parent. The parent of an anchor-only path is itself.
    pub fn parent(&self) -> Self {
        if self.segments.is_empty() {
            return self.clone();
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Self {
            drive: self.drive.clone(),
            rooted: self.rooted,
            segments,
        }
    }

    /// Join with another path. A rooted or drive-carrying argument
    /// replaces the current path part, pathlib-style.
    pub fn join(&self, other: impl AsRef<str>) -> Self {
        let other = Self::new(other);
        if !other.drive.is_empty() {
            return other;
        }
        if other.rooted {
            return Self {
                drive: self.drive.clone(),
                rooted: true,
                segments: other.segments,
            };
        }
        let mut segments = self.segments.clone();
        segments.extend(other.segments);
        Self {
            drive: self.drive.clone(),
            rooted: self.rooted,
            segments,
        }
    }

    /// Replace the final segment.
    pub fn with_name(&self, name: &str) -> Result<Self> {
        if name.is_empty() || name.contains('/') {
            return Err(AlistError::InvalidPath(format!("invalid name: {name:?}")));
        }
        if self.segments.is_empty() {
            return Err(AlistError::InvalidPath(format!(
                "path has no name to replace: {self}"
            )));
        }
        let mut segments = self.segments.clone();
        if let Some(last) = segments.last_mut() {
            *last = name.to_string();
        }
        Ok(Self {
            drive: self.drive.clone(),
            rooted: self.rooted,
            segments,
        })
    }

    /// The path in POSIX form with the drive stripped: `"/local/a/f.txt"`.
    pub fn as_posix(&self) -> String {
        if self.rooted {
            format!("/{}", self.segments.join("/"))
        } else {
            self.segments.join("/")
        }
    }

    /// The full URI form. Errors unless the path is absolute.
    pub fn as_uri(&self) -> Result<String> {
        if !self.is_absolute() {
            return Err(AlistError::InvalidPath(format!(
                "relative path can't be expressed as a URI: {self}"
            )));
        }
        Ok(self.to_string())
    }

    /// Compute the path relative to `other`.
    ///
    /// Errors when the two paths do not share an anchor, or when reaching
    /// `self` from `other` would require walking up through `..`.
    pub fn relative_to(&self, other: &Self) -> Result<Self> {
        if self.drive != other.drive || self.rooted != other.rooted {
            return Err(AlistError::InvalidPath(format!(
                "{self} and {other} have different anchors"
            )));
        }
        if self.segments.len() < other.segments.len()
            || self.segments[..other.segments.len()] != other.segments[..]
        {
            return Err(AlistError::InvalidPath(format!(
                "{self} is not in the subpath of {other}"
            )));
        }
        Ok(Self {
            drive: String::new(),
            rooted: false,
            segments: self.segments[other.segments.len()..].to_vec(),
        })
    }
}

impl fmt::Display for PureAlistPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.drive.is_empty() {
            write!(f, "{}/{}", self.drive, self.segments.join("/"))
        } else if self.rooted {
            write!(f, "/{}", self.segments.join("/"))
        } else if self.segments.is_empty() {
            write!(f, ".")
        } else {
            write!(f, "{}", self.segments.join("/"))
        }
    }
}

impl FromStr for PureAlistPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for PureAlistPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fully_qualified() {
        let path = PureAlistPath::new("https://server:5244/path/to/file");
        assert_eq!(path.drive(), "https://server:5244");
        assert!(path.has_root());
        assert!(path.is_absolute());
        assert_eq!(path.segments(), ["path", "to", "file"]);
        assert_eq!(path.anchor(), "https://server:5244/");
        assert_eq!(
            path.parts(),
            ["https://server:5244/", "path", "to", "file"]
        );
        assert_eq!(path.name(), "file");
        assert_eq!(path.parent(), PureAlistPath::new("https://server:5244/path/to"));
    }

    #[test]
    fn test_parse_reserialize_idempotent() {
        for s in [
            "https://server:5244/path/to/file",
            "http://server/local",
            "https://server/",
            "/local/a/f.txt",
            "/",
            "a/b/c",
        ] {
            let path = PureAlistPath::new(s);
            assert_eq!(PureAlistPath::new(path.to_string()), path, "round-trip of {s}");
        }
    }

    #[test]
    fn test_default_port_spellings_compare_equal() {
        assert_eq!(
            PureAlistPath::new("http://server:80/a/b"),
            PureAlistPath::new("http://server/a/b")
        );
        assert_eq!(
            PureAlistPath::new("https://server:443/a"),
            PureAlistPath::new("https://server/a")
        );
        assert_ne!(
            PureAlistPath::new("http://server:5244/a"),
            PureAlistPath::new("http://server/a")
        );
    }

    #[test]
    fn test_segments_drop_empty_and_dot() {
        let path = PureAlistPath::new("http://server//a/./b//c/");
        assert_eq!(path.segments(), ["a", "b", "c"]);

        let dotdot = PureAlistPath::new("/a/../b");
        assert_eq!(dotdot.segments(), ["a", "..", "b"]);
    }

    #[test]
    fn test_as_posix_strips_drive() {
        let path = PureAlistPath::new("https://server/path/to/file");
        assert_eq!(path.as_posix(), "/path/to/file");
        assert_eq!(path.as_uri().unwrap(), "https://server/path/to/file");

        let root = PureAlistPath::new("https://server");
        assert_eq!(root.as_posix(), "/");

        let relative = PureAlistPath::new("a/b");
        assert_eq!(relative.as_posix(), "a/b");
        assert!(relative.as_uri().is_err());
    }

    #[test]
    fn test_join() {
        let base = PureAlistPath::new("https://server/path/to/file");
        assert_eq!(
            base.join("another"),
            PureAlistPath::new("https://server/path/to/file/another")
        );
        assert_eq!(
            base.join("another/file/path"),
            PureAlistPath::new("https://server/path/to/file/another/file/path")
        );
        // A rooted argument replaces the path part, keeping the drive.
        assert_eq!(base.join("/other"), PureAlistPath::new("https://server/other"));
        // A drive-carrying argument replaces everything.
        assert_eq!(
            base.join("http://elsewhere/x"),
            PureAlistPath::new("http://elsewhere/x")
        );
    }

    #[test]
    fn test_name_stem_suffix() {
        let path = PureAlistPath::new("https://server/a/archive.tar.gz");
        assert_eq!(path.name(), "archive.tar.gz");
        assert_eq!(path.stem(), "archive.tar");
        assert_eq!(path.suffix(), ".gz");

        let bare = PureAlistPath::new("https://server/a/README");
        assert_eq!(bare.stem(), "README");
        assert_eq!(bare.suffix(), "");

        let hidden = PureAlistPath::new("https://server/a/.gitignore");
        assert_eq!(hidden.stem(), ".gitignore");
        assert_eq!(hidden.suffix(), "");
    }

    #[test]
    fn test_parent_of_root_is_root() {
        let root = PureAlistPath::new("https://server/");
        assert_eq!(root.parent(), root);
        assert_eq!(root.name(), "");
    }

    #[test]
    fn test_relative_to_roundtrip() {
        let a = PureAlistPath::new("https://server/local/a/f.txt");
        let b = PureAlistPath::new("https://server/local");
        let rel = a.relative_to(&b).unwrap();
        assert_eq!(rel.to_string(), "a/f.txt");
        assert!(!rel.is_absolute());
        assert_eq!(b.join(rel.to_string()), a);

        // A path is relative to itself by the empty path.
        assert_eq!(a.relative_to(&a).unwrap().segments().len(), 0);
    }

    #[test]
    fn test_relative_to_errors() {
        let a = PureAlistPath::new("https://server/local/a");
        let other_server = PureAlistPath::new("https://elsewhere/local");
        assert!(a.relative_to(&other_server).is_err());

        // Walking up would require "..": rejected.
        let deeper = PureAlistPath::new("https://server/local/a/b");
        assert!(a.relative_to(&deeper).is_err());

        let sibling = PureAlistPath::new("https://server/other");
        assert!(a.relative_to(&sibling).is_err());

        let unrooted = PureAlistPath::new("local/a");
        assert!(a.relative_to(&unrooted).is_err());
    }

    #[test]
    fn test_with_name() {
        let path = PureAlistPath::new("https://server/a/f.txt");
        assert_eq!(
            path.with_name("g.txt").unwrap(),
            PureAlistPath::new("https://server/a/g.txt")
        );
        assert!(path.with_name("").is_err());
        assert!(path.with_name("a/b").is_err());
        assert!(PureAlistPath::new("https://server/").with_name("x").is_err());
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(PureAlistPath::new("/a/b").to_string(), "/a/b");
        assert_eq!(PureAlistPath::new("a/b").to_string(), "a/b");
        assert_eq!(PureAlistPath::new("").to_string(), ".");
        assert_eq!(
            PureAlistPath::new("https://server:5244").to_string(),
            "https://server:5244/"
        );
    }
}
