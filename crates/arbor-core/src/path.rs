//! Paths into the state tree
//!
//! A path is a sequence of segments. A segment is either a literal name or a
//! named parameter. The external form is slash-delimited and percent-encoded,
//! with parameters written as `-name-`:
//!
//! ```
//! use arbor_core::path::Path;
//!
//! let path = Path::parse("/children/-child-/label").unwrap();
//! assert_eq!(path.len(), 3);
//! assert!(!path.is_definite());
//! assert_eq!(path.to_string(), "/children/-child-/label");
//! ```

use std::fmt;
use std::str::FromStr;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::binding::BindingEnvironment;
use crate::errors::{ArborError, Result};
use crate::model::Identifier;

/// Bytes left unencoded in a segment: RFC 3986 unreserved characters
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Name(String),
    Param(String),
}

impl Segment {
    /// # Errors
    ///
    /// `InvalidPath` if `name` is not a valid identifier.
    pub fn name(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref();
        check_name(name, name)?;
        Ok(Segment::Name(name.to_string()))
    }

    /// # Errors
    ///
    /// `InvalidPath` if `name` is not a valid identifier.
    pub fn param(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref();
        check_name(name, name)?;
        Ok(Segment::Param(name.to_string()))
    }

    /// Parse one raw, still-encoded segment
    fn parse(raw: &str, whole: &str) -> Result<Self> {
        if raw.len() >= 2 && raw.starts_with('-') && raw.ends_with('-') {
            let name = decode(&raw[1..raw.len() - 1], whole)?;
            check_name(&name, whole)?;
            return Ok(Segment::Param(name));
        }
        let name = decode(raw, whole)?;
        check_name(&name, whole)?;
        Ok(Segment::Name(name))
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Segment::Name(n) => Some(n),
            Segment::Param(_) => None,
        }
    }

    pub fn is_param(&self) -> bool {
        matches!(self, Segment::Param(_))
    }
}

fn decode(raw: &str, whole: &str) -> Result<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| ArborError::InvalidPath {
            path: whole.to_string(),
            reason: e.to_string(),
        })
}

fn check_name(name: &str, whole: &str) -> Result<()> {
    Identifier::new(name).map(|_| ()).map_err(|e| ArborError::InvalidPath {
        path: whole.to_string(),
        reason: e.to_string(),
    })
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Name(n) => write!(f, "{}", utf8_percent_encode(n, SEGMENT)),
            Segment::Param(p) => write!(f, "-{}-", utf8_percent_encode(p, SEGMENT)),
        }
    }
}

impl From<Identifier> for Segment {
    fn from(id: Identifier) -> Self {
        Segment::Name(id.as_str().to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Path(segments)
    }

    /// Parse the external form
    ///
    /// # Errors
    ///
    /// `InvalidPath` if the text does not start with `/`, has empty
    /// segments, or a segment is not a valid identifier.
    pub fn parse(text: &str) -> Result<Self> {
        let Some(rest) = text.strip_prefix('/') else {
            return Err(ArborError::InvalidPath {
                path: text.to_string(),
                reason: "path must start with '/'".to_string(),
            });
        };
        if rest.is_empty() {
            return Ok(Path::empty());
        }
        rest.split('/')
            .map(|raw| Segment::parse(raw, text))
            .collect::<Result<Vec<_>>>()
            .map(Path)
    }

    /// # Errors
    ///
    /// `InvalidPath` if `name` is not a valid identifier.
    pub fn then(&self, name: impl AsRef<str>) -> Result<Self> {
        Ok(self.then_segment(Segment::name(name)?))
    }

    /// # Errors
    ///
    /// `InvalidPath` if `name` is not a valid identifier.
    pub fn then_param(&self, name: impl AsRef<str>) -> Result<Self> {
        Ok(self.then_segment(Segment::param(name)?))
    }

    pub fn then_segment(&self, segment: Segment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Path(segments)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.0.get(index)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn last_segment(&self) -> Option<&Segment> {
        self.0.last()
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.truncated_by(1))
        }
    }

    pub fn truncated_to(&self, len: usize) -> Self {
        Path(self.0[..len.min(self.0.len())].to_vec())
    }

    pub fn truncated_by(&self, count: usize) -> Self {
        self.truncated_to(self.0.len().saturating_sub(count))
    }

    pub fn is_definite(&self) -> bool {
        !self.0.iter().any(Segment::is_param)
    }

    pub fn first_parameter_index(&self) -> Option<usize> {
        self.0.iter().position(Segment::is_param)
    }

    /// Distinct parameter names, in order of first appearance
    pub fn parameter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.0 {
            if let Segment::Param(p) = segment {
                if !names.contains(&p.as_str()) {
                    names.push(p);
                }
            }
        }
        names
    }

    /// Same length, with literal names agreeing wherever neither side is a parameter
    pub fn matches(&self, other: &Path) -> bool {
        self.len() == other.len()
            && self.0.iter().zip(&other.0).all(|pair| match pair {
                (Segment::Name(a), Segment::Name(b)) => a == b,
                _ => true,
            })
    }

    /// `self` matches the leading segments of `other`
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        self.len() <= other.len() && self.matches(&other.truncated_to(self.len()))
    }

    /// Bindings that turn this path into `definite`
    ///
    /// Returns `None` if the lengths differ, a literal disagrees, `definite`
    /// has parameters, or a repeated parameter would bind two different ids.
    pub fn parameters_from(&self, definite: &Path) -> Option<BindingEnvironment> {
        if self.len() != definite.len() {
            return None;
        }
        let mut env = BindingEnvironment::new();
        for pair in self.0.iter().zip(&definite.0) {
            match pair {
                (Segment::Name(a), Segment::Name(b)) if a == b => {}
                (Segment::Param(p), Segment::Name(n)) => {
                    let id = Identifier::new(n).ok()?;
                    env.bind(p.as_str(), id).ok()?;
                }
                _ => return None,
            }
        }
        Some(env)
    }

    /// Replace every parameter bound in `env` with its id
    pub fn bound_by(&self, env: &BindingEnvironment) -> Self {
        Path(
            self.0
                .iter()
                .map(|segment| match segment {
                    Segment::Param(p) => match env.get(p) {
                        Some(id) => Segment::from(id.clone()),
                        None => segment.clone(),
                    },
                    other => other.clone(),
                })
                .collect(),
        )
    }

    /// Bind parameters positionally, in order of first appearance
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if more ids are given than the path has parameters.
    pub fn bound_to(&self, ids: &[Identifier]) -> Result<Self> {
        let names = self.parameter_names();
        if ids.len() > names.len() {
            return Err(ArborError::invalid_argument(
                self,
                format!("{} ids given for {} parameters", ids.len(), names.len()),
            ));
        }
        let env = names
            .iter()
            .zip(ids)
            .fold(BindingEnvironment::builder(), |b, (name, id)| {
                b.bind(*name, id.clone())
            })
            .build();
        Ok(self.bound_by(&env))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = ArborError;

    fn from_str(s: &str) -> Result<Self> {
        Path::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    fn id(s: &str) -> Identifier {
        Identifier::new(s).unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert!(p("/").is_empty());
        assert_eq!(p("/").to_string(), "/");
        let path = p("/a/-x-/b");
        assert_eq!(path.segment(1), Some(&Segment::Param("x".to_string())));
        assert_eq!(path.to_string(), "/a/-x-/b");
    }

    #[test]
    fn test_percent_encoding_round_trips() {
        let path = Path::empty().then("a/b c").unwrap().then("naïve").unwrap();
        let text = path.to_string();
        assert_eq!(text, "/a%2Fb%20c/na%C3%AFve");
        assert_eq!(p(&text), path);
    }

    #[test]
    fn test_invalid_paths() {
        for text in ["", "a/b", "/a//b", "/a/", "/-", "/--", "/%2Dx"] {
            assert!(
                matches!(Path::parse(text), Err(ArborError::InvalidPath { .. })),
                "{text:?}"
            );
        }
    }

    #[test]
    fn test_truncation_and_parent() {
        let path = p("/a/b/c");
        assert_eq!(path.truncated_to(1), p("/a"));
        assert_eq!(path.truncated_by(2), p("/a"));
        assert_eq!(path.truncated_by(9), Path::empty());
        assert_eq!(path.parent(), Some(p("/a/b")));
        assert_eq!(Path::empty().parent(), None);
    }

    #[test]
    fn test_parameters_from() {
        let scope = p("/children/-child-/label");
        let env = scope.parameters_from(&p("/children/c1/label")).unwrap();
        assert_eq!(env.get("child"), Some(&id("c1")));

        assert!(scope.parameters_from(&p("/children/c1")).is_none());
        assert!(scope.parameters_from(&p("/other/c1/label")).is_none());

        let repeated = p("/a/-x-/b/-x-");
        assert!(repeated.parameters_from(&p("/a/1/b/1")).is_some());
        assert!(repeated.parameters_from(&p("/a/1/b/2")).is_none());
    }

    #[test]
    fn test_binding() {
        let path = p("/a/-x-/b/-y-/c/-x-");
        assert_eq!(path.parameter_names(), ["x", "y"]);
        let bound = path.bound_to(&[id("1")]).unwrap();
        assert_eq!(bound, p("/a/1/b/-y-/c/1"));
        assert!(!bound.is_definite());
        assert_eq!(bound.first_parameter_index(), Some(3));

        let env = BindingEnvironment::builder().bind("y", id("2")).build();
        assert!(bound.bound_by(&env).is_definite());
        assert!(path.bound_to(&[id("1"), id("2"), id("3")]).is_err());
    }

    #[test]
    fn test_matches_and_prefix() {
        assert!(p("/a/-x-").matches(&p("/a/1")));
        assert!(!p("/a/-x-").matches(&p("/b/1")));
        assert!(p("/a").is_prefix_of(&p("/a/1/c")));
        assert!(p("/a/-x-").is_prefix_of(&p("/a/1/c")));
        assert!(!p("/a/1/c").is_prefix_of(&p("/a")));
        assert!(Path::empty().is_prefix_of(&p("/a")));
    }
}
