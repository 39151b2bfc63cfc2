//! Path routing.
//!
//! A [`Router`] is a trie keyed by path segments. Literal segments map to
//! literal children; `{name:cast}` segments map to variable children that
//! accept any segment matching the cast's pattern. Lookup walks one level per
//! segment, preferring the literal child over variable children, and returns
//! the endpoint together with the converted parameters.

mod cast;
mod error;
mod node;
mod params;
mod path;
mod router;
mod tests;

// Re-export public items
pub use cast::{BoolCast, Cast, CastRegistry, CastSpec, FloatCast, IntCast, StrCast, DEFAULT_CAST};
pub use error::Error;
pub use node::{RouteInfo, RouterNode};
pub use params::{Params, Value};
pub use path::{parse_path, parse_segment, split_path, Segment};
pub use router::{RouteMatch, Router};
