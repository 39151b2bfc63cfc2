//! Path template syntax: `/literal/{name}` and `/literal/{name:cast}`.

use std::fmt;

use crate::routing::cast::DEFAULT_CAST;
use crate::routing::error::Error;

/// One parsed template segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    Variable { binding: &'a str, cast: &'a str },
}

impl fmt::Display for Segment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(literal) => f.write_str(literal),
            Segment::Variable { binding, cast } => write!(f, "{{{binding}:{cast}}}"),
        }
    }
}

/// Split a path into its `/`-delimited segments.
///
/// One leading slash is ignored, so `""` and `"/"` both have zero segments.
pub fn split_path(path: &str) -> Vec<&str> {
    let path = path.strip_prefix('/').unwrap_or(path);
    if path.is_empty() {
        return Vec::new();
    }
    path.split('/').collect()
}

/// Parse one template segment.
pub fn parse_segment<'a>(path: &str, segment: &'a str) -> Result<Segment<'a>, Error> {
    let invalid = |reason: &str| Error::InvalidPath {
        path: path.to_string(),
        reason: format!("segment {segment:?} {reason}"),
    };

    if !segment.contains(['{', '}']) {
        return Ok(Segment::Literal(segment));
    }

    let inner = segment
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(|| invalid("has unbalanced braces"))?;
    if inner.contains(['{', '}']) {
        return Err(invalid("has nested braces"));
    }

    let mut parts = inner.split(':');
    let binding = parts.next().unwrap_or_default();
    let cast = parts.next().unwrap_or(DEFAULT_CAST);
    if parts.next().is_some() {
        return Err(invalid("has more than one colon"));
    }
    if binding.is_empty() {
        return Err(invalid("has an empty binding name"));
    }
    if cast.is_empty() {
        return Err(invalid("has an empty cast name"));
    }

    Ok(Segment::Variable { binding, cast })
}

/// Parse every segment of `path`, rejecting repeated binding names.
pub fn parse_path(path: &str) -> Result<Vec<Segment<'_>>, Error> {
    let segments = split_path(path)
        .into_iter()
        .map(|segment| parse_segment(path, segment))
        .collect::<Result<Vec<_>, _>>()?;

    let mut bindings = Vec::new();
    for segment in &segments {
        if let Segment::Variable { binding, .. } = segment {
            if bindings.contains(binding) {
                return Err(Error::DuplicateBinding {
                    path: path.to_string(),
                    binding: binding.to_string(),
                });
            }
            bindings.push(*binding);
        }
    }

    Ok(segments)
}
