//! Casts: named patterns that validate and convert variable path segments.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::debug;
use regex::Regex;

use crate::routing::error::Error;
use crate::routing::params::Value;

/// The cast used by `{name}` segments that do not name one.
pub const DEFAULT_CAST: &str = "str";

/// Converts between a path segment and a typed [`Value`].
///
/// `parse` must succeed for every segment that fully matches `pattern`, and
/// `parse(serialize(v))` must give back `v`.
pub trait Cast: Send + Sync + 'static {
    /// Regular expression a segment must match in full.
    fn pattern(&self) -> &str;

    /// Convert a matching segment.
    fn parse(&self, segment: &str) -> Option<Value>;

    /// Render a value back into a segment, or `None` if the value has the wrong type.
    fn serialize(&self, value: &Value) -> Option<String>;
}

/// Decimal integers with an optional sign.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntCast;

impl Cast for IntCast {
    fn pattern(&self) -> &str {
        r"[+-]?[0-9]+"
    }

    fn parse(&self, segment: &str) -> Option<Value> {
        segment.parse::<i64>().ok().map(Value::Int)
    }

    fn serialize(&self, value: &Value) -> Option<String> {
        value.as_int().map(|value| value.to_string())
    }
}

/// Decimals with an optional fractional part.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatCast;

impl Cast for FloatCast {
    fn pattern(&self) -> &str {
        r"[+-]?(?:[0-9]*\.[0-9]+|[0-9]+)"
    }

    fn parse(&self, segment: &str) -> Option<Value> {
        segment.parse::<f64>().ok().map(Value::Float)
    }

    fn serialize(&self, value: &Value) -> Option<String> {
        match value {
            Value::Float(value) if value.is_finite() => Some(value.to_string()),
            _ => None,
        }
    }
}

/// The literals `true` and `false`, case-sensitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolCast;

impl Cast for BoolCast {
    fn pattern(&self) -> &str {
        "true|false"
    }

    fn parse(&self, segment: &str) -> Option<Value> {
        match segment {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        }
    }

    fn serialize(&self, value: &Value) -> Option<String> {
        value.as_bool().map(|value| value.to_string())
    }
}

/// Any non-empty run of non-separator characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrCast;

impl Cast for StrCast {
    fn pattern(&self) -> &str {
        "[^/]+"
    }

    fn parse(&self, segment: &str) -> Option<Value> {
        Some(Value::Str(segment.to_string()))
    }

    fn serialize(&self, value: &Value) -> Option<String> {
        value.as_str().map(str::to_string)
    }
}

/// A registered cast with its compiled, whole-segment pattern.
#[derive(Clone)]
pub struct CastSpec {
    name: String,
    regex: Regex,
    cast: Arc<dyn Cast>,
}

impl CastSpec {
    /// Compile `cast` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if the pattern does not compile.
    pub fn new(name: impl Into<String>, cast: impl Cast) -> Result<Self, Error> {
        let name = name.into();
        let anchored = format!("^(?:{})$", cast.pattern());
        let regex = Regex::new(&anchored).map_err(|e| Error::InvalidPattern {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            name,
            regex,
            cast: Arc::new(cast),
        })
    }

    /// The name templates refer to this cast by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The pattern as written by the cast.
    pub fn pattern(&self) -> &str {
        self.cast.pattern()
    }

    /// Whether `segment` matches the pattern in full.
    pub fn matches(&self, segment: &str) -> bool {
        self.regex.is_match(segment)
    }

    /// Match and convert `segment`.
    ///
    /// A segment that matches but fails to parse (an integer that overflows
    /// `i64`, say) is treated as a mismatch.
    pub fn parse(&self, segment: &str) -> Option<Value> {
        if !self.matches(segment) {
            return None;
        }
        let value = self.cast.parse(segment);
        if value.is_none() {
            debug!("Cast {} matched {segment:?} but could not parse it", self.name);
        }
        value
    }

    /// Render `value`, checking the result still matches the pattern.
    pub fn serialize(&self, value: &Value) -> Option<String> {
        self.cast
            .serialize(value)
            .filter(|segment| self.matches(segment))
    }
}

impl fmt::Debug for CastSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CastSpec")
            .field("name", &self.name)
            .field("pattern", &self.pattern())
            .finish()
    }
}

/// The casts known to one router.
#[derive(Debug, Clone)]
pub struct CastRegistry {
    casts: HashMap<String, CastSpec>,
}

impl CastRegistry {
    /// A registry holding the `str`, `int`, `float` and `bool` casts.
    pub fn new() -> Self {
        let mut casts = HashMap::new();
        for spec in [
            builtin("int", IntCast),
            builtin("float", FloatCast),
            builtin("bool", BoolCast),
            builtin(DEFAULT_CAST, StrCast),
        ] {
            casts.insert(spec.name.clone(), spec);
        }
        Self { casts }
    }

    /// Register `cast` under `name`.
    ///
    /// Registering a cast with the same pattern again is a no-op.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateCast`] when `name` is taken by a different pattern,
    /// [`Error::InvalidPattern`] when the pattern does not compile.
    pub fn register(&mut self, name: impl Into<String>, cast: impl Cast) -> Result<(), Error> {
        self.register_spec(CastSpec::new(name, cast)?)
    }

    /// Register an already compiled spec.
    pub fn register_spec(&mut self, spec: CastSpec) -> Result<(), Error> {
        if let Some(existing) = self.casts.get(&spec.name) {
            if existing.pattern() == spec.pattern() {
                return Ok(());
            }
            return Err(Error::DuplicateCast(spec.name));
        }
        debug!("Registered cast {} with pattern {:?}", spec.name, spec.pattern());
        self.casts.insert(spec.name.clone(), spec);
        Ok(())
    }

    /// Look up the cast registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<&CastSpec, Error> {
        self.casts
            .get(name)
            .ok_or_else(|| Error::UnknownCast(name.to_string()))
    }

    /// Whether a cast is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.casts.contains_key(name)
    }

    /// Registered cast names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.casts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Fail if merging `other` would redefine a cast with a different pattern.
    pub fn check_merge(&self, other: &CastRegistry) -> Result<(), Error> {
        for (name, incoming) in &other.casts {
            if let Some(existing) = self.casts.get(name) {
                if existing.pattern() != incoming.pattern() {
                    return Err(Error::CastConflict {
                        name: name.clone(),
                        existing: existing.pattern().to_string(),
                        incoming: incoming.pattern().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Add every cast of `other` not yet known here; existing entries win.
    ///
    /// Nothing is added when a conflict is found.
    pub fn merge(&mut self, other: &CastRegistry) -> Result<(), Error> {
        self.check_merge(other)?;
        for (name, spec) in &other.casts {
            self.casts
                .entry(name.clone())
                .or_insert_with(|| spec.clone());
        }
        Ok(())
    }
}

impl Default for CastRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin(name: &str, cast: impl Cast) -> CastSpec {
    CastSpec::new(name, cast).expect("built-in cast patterns are valid")
}
