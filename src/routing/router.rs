//! The path router.

use std::sync::Arc;

use log::{debug, info};

use crate::endpoint::{Endpoint, HttpHandler, StreamHandler};
use crate::http::Method;
use crate::routing::cast::{Cast, CastRegistry};
use crate::routing::error::Error;
use crate::routing::node::{RouteInfo, RouterNode};
use crate::routing::params::Params;
use crate::routing::path::{parse_path, split_path, Segment};

/// A successful path match.
#[derive(Debug)]
pub struct RouteMatch<'r> {
    /// The endpoint bound to the matched node.
    pub endpoint: &'r Endpoint,
    /// Bindings extracted along the way, converted by their casts.
    pub params: Params,
}

/// A prefix trie from path templates to endpoints.
///
/// Each router owns its cast registry; merging a sub-router merges the
/// registries as well. The router is built before serving and only read
/// afterwards.
#[derive(Debug, Default)]
pub struct Router {
    casts: CastRegistry,
    root: RouterNode,
}

impl Router {
    /// Create an empty router with the default casts.
    pub fn new() -> Self {
        Self::default()
    }

    /// The casts available to templates of this router.
    pub fn casts(&self) -> &CastRegistry {
        &self.casts
    }

    /// Register a cast for use in path templates.
    pub fn register_cast(&mut self, name: impl Into<String>, cast: impl Cast) -> Result<(), Error> {
        self.casts.register(name, cast)
    }

    /// Attach `endpoint` at `path`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPath`] and [`Error::DuplicateBinding`] for malformed
    /// templates, [`Error::UnknownCast`] for unregistered casts,
    /// [`Error::BindingConflict`] when a cast at some level is already bound
    /// under another name, and [`Error::EndpointConflict`] when the node
    /// already carries an endpoint.
    pub fn add_endpoint(&mut self, path: &str, endpoint: Endpoint) -> Result<(), Error> {
        let slot = self.node_mut(path)?.endpoint_slot();
        if slot.is_some() {
            return Err(Error::EndpointConflict(path.to_string()));
        }
        debug!("Attached endpoint at {path}");
        *slot = Some(endpoint);
        Ok(())
    }

    /// The endpoint at `path`, created empty if the node has none yet.
    pub fn endpoint_mut(&mut self, path: &str) -> Result<&mut Endpoint, Error> {
        let slot = self.node_mut(path)?.endpoint_slot();
        Ok(slot.get_or_insert_with(|| Endpoint::new(path)))
    }

    /// Bind `handler` to `methods` at `path`.
    pub fn add_route(
        &mut self,
        path: &str,
        methods: &[Method],
        handler: Arc<dyn HttpHandler>,
    ) -> Result<(), Error> {
        self.endpoint_mut(path)?.add_handler(methods, handler)
    }

    /// Bind the persistent-connection `handler` at `path`.
    pub fn add_stream_route(&mut self, path: &str, handler: Arc<dyn StreamHandler>) -> Result<(), Error> {
        self.endpoint_mut(path)?.add_stream_handler(handler)
    }

    /// The endpoint registered under exactly this template.
    pub fn get_endpoint(&self, path: &str) -> Option<&Endpoint> {
        let segments = parse_path(path).ok()?;
        let mut node = &self.root;
        for segment in &segments {
            node = node.child(segment)?;
        }
        node.endpoint()
    }

    /// Resolve a request path.
    ///
    /// Returns `None` when no endpoint matches.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_>> {
        let segments = split_path(path);
        let mut params = Params::new();
        let endpoint = self.root.match_segments(&segments, &self.casts, &mut params)?;
        debug!("Matched {path} to {}", endpoint.path());
        Some(RouteMatch { endpoint, params })
    }

    /// Graft `other` beneath `prefix`.
    ///
    /// Missing prefix nodes are created. The merge is all or nothing: every
    /// conflict is detected before the trie or the registry is touched.
    ///
    /// # Errors
    ///
    /// [`Error::CastConflict`] when both registries define a cast differently,
    /// [`Error::EndpointConflict`] when two endpoints would meet at one node,
    /// plus the template errors of [`add_endpoint`](Self::add_endpoint) for
    /// the prefix and [`Error::DuplicateBinding`] for bindings repeated
    /// between the prefix and the sub-router.
    pub fn merge_router(&mut self, prefix: &str, other: Router) -> Result<(), Error> {
        self.casts.check_merge(&other.casts)?;

        let segments = parse_path(prefix)?;
        let node = self.check_walk(prefix, &segments)?;
        let mut bindings = Vec::new();
        let mut trail = String::new();
        for segment in &segments {
            if let Segment::Variable { binding, .. } = segment {
                bindings.push(binding.to_string());
            }
            trail.push('/');
            trail.push_str(&segment.to_string());
        }

        match node {
            Some(existing) => existing.check_merge(&other.root, &mut bindings, &trail)?,
            None => RouterNode::new().check_merge(&other.root, &mut bindings, &trail)?,
        }

        self.casts.merge(&other.casts)?;
        let mut incoming = other.root;
        incoming.rebase(prefix);
        let target = self.node_mut(prefix)?;
        target.merge(incoming);
        info!("Merged router under {}", if prefix.is_empty() { "/" } else { prefix });
        Ok(())
    }

    /// Render a concrete path from a template and parameter values.
    ///
    /// Every value goes through its cast's `serialize`.
    pub fn url_for(&self, template: &str, params: &Params) -> Result<String, Error> {
        let segments = parse_path(template)?;
        let mut url = String::new();
        for segment in &segments {
            url.push('/');
            match segment {
                Segment::Literal(literal) => url.push_str(literal),
                Segment::Variable { binding, cast } => {
                    let spec = self.casts.resolve(cast)?;
                    let value = params.get(binding).ok_or_else(|| Error::MissingParam {
                        path: template.to_string(),
                        binding: binding.to_string(),
                    })?;
                    let rendered = spec.serialize(value).ok_or_else(|| Error::ParamMismatch {
                        binding: binding.to_string(),
                        cast: cast.to_string(),
                    })?;
                    url.push_str(&rendered);
                }
            }
        }
        if url.is_empty() {
            url.push('/');
        }
        Ok(url)
    }

    /// Every registered endpoint, sorted by template.
    pub fn routes(&self) -> Vec<RouteInfo> {
        let mut routes = Vec::new();
        self.root.collect_routes("", &mut routes);
        routes.sort_by(|a, b| a.path.cmp(&b.path));
        routes
    }

    /// Validate `segments` against the casts and the existing trie without
    /// changing anything. Returns the node the template ends on, if it exists.
    fn check_walk(&self, path: &str, segments: &[Segment<'_>]) -> Result<Option<&RouterNode>, Error> {
        let mut node = Some(&self.root);
        for segment in segments {
            if let Segment::Variable { binding, cast } = segment {
                self.casts.resolve(cast)?;
                if let Some(existing) = node {
                    existing.check_variable(path, binding, cast)?;
                }
            }
            node = node.and_then(|existing| existing.child(segment));
        }
        Ok(node)
    }

    /// Walk to the node for `path`, creating nodes as needed.
    ///
    /// The template is fully validated before anything is created.
    fn node_mut(&mut self, path: &str) -> Result<&mut RouterNode, Error> {
        let segments = parse_path(path)?;
        self.check_walk(path, &segments)?;

        let mut node = &mut self.root;
        for segment in &segments {
            node = node.child_or_insert(path, segment)?;
        }
        Ok(node)
    }
}
