//! Trie nodes.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::endpoint::Endpoint;
use crate::http::Method;
use crate::routing::cast::CastRegistry;
use crate::routing::error::Error;
use crate::routing::params::Params;
use crate::routing::path::Segment;

/// A variable child, keyed by the cast it matches with.
#[derive(Debug)]
pub(crate) struct VariableChild {
    pub(crate) cast: String,
    pub(crate) binding: String,
    pub(crate) node: RouterNode,
}

/// One level of the trie.
///
/// Literal children are looked up by exact segment, variable children are
/// tried in registration order. A node may carry an endpoint whether or not
/// it has children.
#[derive(Debug, Default)]
pub struct RouterNode {
    literals: HashMap<String, RouterNode>,
    variables: Vec<VariableChild>,
    endpoint: Option<Endpoint>,
}

/// Summary of one registered endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// The path template, variables written as `{binding:cast}`.
    pub path: String,
    /// HTTP methods with an explicit handler.
    pub methods: Vec<Method>,
    /// Whether a persistent-connection handler is bound.
    pub websocket: bool,
}

impl RouterNode {
    /// An empty node with no children and no endpoint.
    pub fn new() -> Self {
        Self::default()
    }

    /// The endpoint bound at this node, if any.
    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    /// Whether this node terminates a registered template.
    pub fn has_endpoint(&self) -> bool {
        self.endpoint.is_some()
    }

    pub(crate) fn endpoint_slot(&mut self) -> &mut Option<Endpoint> {
        &mut self.endpoint
    }

    /// The child for `segment`, if one exists.
    pub(crate) fn child(&self, segment: &Segment<'_>) -> Option<&RouterNode> {
        match segment {
            Segment::Literal(literal) => self.literals.get(*literal),
            Segment::Variable { cast, .. } => self
                .variables
                .iter()
                .find(|variable| variable.cast == *cast)
                .map(|variable| &variable.node),
        }
    }

    /// The child for `segment`, created if absent.
    ///
    /// A variable child is shared by every template using the same cast at
    /// this level, so its binding name must agree.
    pub(crate) fn child_or_insert(
        &mut self,
        path: &str,
        segment: &Segment<'_>,
    ) -> Result<&mut RouterNode, Error> {
        match segment {
            Segment::Literal(literal) => Ok(self.literals.entry(literal.to_string()).or_default()),
            Segment::Variable { binding, cast } => {
                self.check_variable(path, binding, cast)?;
                let index = match self.variables.iter().position(|v| v.cast == *cast) {
                    Some(index) => index,
                    None => {
                        self.variables.push(VariableChild {
                            cast: cast.to_string(),
                            binding: binding.to_string(),
                            node: RouterNode::new(),
                        });
                        self.variables.len() - 1
                    }
                };
                Ok(&mut self.variables[index].node)
            }
        }
    }

    /// Fail if `cast` is already bound here under a name other than `binding`.
    pub(crate) fn check_variable(&self, path: &str, binding: &str, cast: &str) -> Result<(), Error> {
        match self.variables.iter().find(|v| v.cast == cast) {
            Some(existing) if existing.binding != binding => Err(Error::BindingConflict {
                path: path.to_string(),
                cast: cast.to_string(),
                existing: existing.binding.clone(),
                incoming: binding.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Depth-first walk over `segments`.
    ///
    /// The literal child is tried first; if it does not lead to an endpoint the
    /// variable children are tried in registration order. `params` holds the
    /// bindings of the successful branch only.
    pub(crate) fn match_segments<'n>(
        &'n self,
        segments: &[&str],
        casts: &CastRegistry,
        params: &mut Params,
    ) -> Option<&'n Endpoint> {
        let Some((segment, rest)) = segments.split_first() else {
            return self.endpoint.as_ref();
        };

        if let Some(child) = self.literals.get(*segment) {
            if let Some(endpoint) = child.match_segments(rest, casts, params) {
                return Some(endpoint);
            }
        }

        for variable in &self.variables {
            let Ok(spec) = casts.resolve(&variable.cast) else {
                continue;
            };
            let Some(value) = spec.parse(segment) else {
                continue;
            };
            params.insert(variable.binding.clone(), value);
            if let Some(endpoint) = variable.node.match_segments(rest, casts, params) {
                return Some(endpoint);
            }
            params.remove(&variable.binding);
        }

        None
    }

    /// Check that `incoming` can be merged into this node.
    ///
    /// `bindings` holds the binding names already used on the way here, `path`
    /// the template of this node for error messages.
    pub(crate) fn check_merge(
        &self,
        incoming: &RouterNode,
        bindings: &mut Vec<String>,
        path: &str,
    ) -> Result<(), Error> {
        if self.endpoint.is_some() && incoming.endpoint.is_some() {
            return Err(Error::EndpointConflict(display_path(path)));
        }

        for (literal, child) in &incoming.literals {
            let child_path = format!("{path}/{literal}");
            match self.literals.get(literal) {
                Some(existing) => existing.check_merge(child, bindings, &child_path)?,
                None => child.check_bindings(bindings, &child_path)?,
            }
        }

        for variable in &incoming.variables {
            let child_path = format!("{path}/{{{}:{}}}", variable.binding, variable.cast);
            if bindings.contains(&variable.binding) {
                return Err(Error::DuplicateBinding {
                    path: child_path,
                    binding: variable.binding.clone(),
                });
            }
            self.check_variable(&child_path, &variable.binding, &variable.cast)?;

            bindings.push(variable.binding.clone());
            let result = match self.variables.iter().find(|v| v.cast == variable.cast) {
                Some(existing) => existing.node.check_merge(&variable.node, bindings, &child_path),
                None => variable.node.check_bindings(bindings, &child_path),
            };
            bindings.pop();
            result?;
        }

        Ok(())
    }

    /// Check that no binding below this node repeats one in `bindings`.
    fn check_bindings(&self, bindings: &mut Vec<String>, path: &str) -> Result<(), Error> {
        for (literal, child) in &self.literals {
            child.check_bindings(bindings, &format!("{path}/{literal}"))?;
        }
        for variable in &self.variables {
            let child_path = format!("{path}/{{{}:{}}}", variable.binding, variable.cast);
            if bindings.contains(&variable.binding) {
                return Err(Error::DuplicateBinding {
                    path: child_path,
                    binding: variable.binding.clone(),
                });
            }
            bindings.push(variable.binding.clone());
            let result = variable.node.check_bindings(bindings, &child_path);
            bindings.pop();
            result?;
        }
        Ok(())
    }

    /// Prefix the template of every endpoint at or below this node.
    pub(crate) fn rebase(&mut self, prefix: &str) {
        if let Some(endpoint) = &mut self.endpoint {
            endpoint.rebase(prefix);
        }
        for child in self.literals.values_mut() {
            child.rebase(prefix);
        }
        for variable in &mut self.variables {
            variable.node.rebase(prefix);
        }
    }

    /// Move `incoming` into this node. Call [`check_merge`](Self::check_merge) first.
    pub(crate) fn merge(&mut self, incoming: RouterNode) {
        if self.endpoint.is_none() {
            self.endpoint = incoming.endpoint;
        }

        for (literal, child) in incoming.literals {
            match self.literals.entry(literal) {
                Entry::Occupied(entry) => entry.into_mut().merge(child),
                Entry::Vacant(entry) => {
                    entry.insert(child);
                }
            }
        }

        for variable in incoming.variables {
            match self.variables.iter_mut().find(|v| v.cast == variable.cast) {
                Some(existing) => existing.node.merge(variable.node),
                None => self.variables.push(variable),
            }
        }
    }

    /// Append a [`RouteInfo`] for every endpoint at or below this node.
    pub(crate) fn collect_routes(&self, path: &str, routes: &mut Vec<RouteInfo>) {
        if let Some(endpoint) = &self.endpoint {
            routes.push(RouteInfo {
                path: display_path(path),
                methods: endpoint.methods().collect(),
                websocket: endpoint.has_stream_handler(),
            });
        }
        for (literal, child) in &self.literals {
            child.collect_routes(&format!("{path}/{literal}"), routes);
        }
        for variable in &self.variables {
            let child_path = format!("{path}/{{{}:{}}}", variable.binding, variable.cast);
            variable.node.collect_routes(&child_path, routes);
        }
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}
