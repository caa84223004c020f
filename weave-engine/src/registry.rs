//! Resolver registry and the recursive resolution algorithm.
//!
//! # `resolve_at` evaluation order
//!
//! 1. Reference already in flight (visited) → `CircularReference`.
//! 2. `depth >= max_depth` → `MaxDepthExceeded`.
//! 3. Parse `@kind:value` → `InvalidReference`.
//! 4. Find the resolver for `kind` → `ResolverNotFound`.
//! 5. Cache hit → return it (cacheable resolvers only).
//! 6. Mark visited, invoke the resolver, expand nested tokens at `depth + 1`.
//! 7. Store in the cache when `depth == 0` and no resolver in the tree was
//!    non-cacheable.
//! 8. Unmark visited on every exit path.
//!
//! Parsing and resolver lookup come before the cache so malformed or unknown
//! references never touch the cache counters. A cached entry can only exist
//! for a reference that already passed both checks.
//!
//! Nested failures: structural errors (circular, depth) abort the whole
//! resolution; anything else blanks the nested token, is recorded in the
//! [`ResolutionTrace`], and expansion continues.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use weave_core::{Context, Reference, ResolveError};

use crate::cache::ReferenceCache;
use crate::resolver::Resolver;
use crate::scan;

// ---------------------------------------------------------------------------
// Resolution trace
// ---------------------------------------------------------------------------

/// A non-fatal failure that was blanked out during expansion.
#[derive(Debug)]
pub struct ResolutionFailure {
    /// The token that failed, e.g. `@doc:missing.md`.
    pub reference: String,
    /// Depth the token was resolved at; `0` for top-level tokens.
    pub depth: usize,
    pub error: ResolveError,
}

/// Per-call traversal state for one top-level resolution tree.
///
/// Holds the set of references currently being resolved plus every failure
/// that was swallowed along the way. Never shared across top-level calls.
#[derive(Debug, Default)]
pub struct ResolutionTrace {
    visited: HashSet<String>,
    failures: Vec<ResolutionFailure>,
    /// Set while the current subtree has used a non-cacheable resolver.
    uncacheable: bool,
}

impl ResolutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` while `reference` is being resolved higher up the call stack.
    pub fn is_visiting(&self, reference: &str) -> bool {
        self.visited.contains(reference)
    }

    pub fn failures(&self) -> &[ResolutionFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<ResolutionFailure> {
        self.failures
    }

    pub(crate) fn record(&mut self, reference: &str, depth: usize, error: ResolveError) {
        self.failures.push(ResolutionFailure {
            reference: reference.to_string(),
            depth,
            error,
        });
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Owns the registered resolvers and the injected cache.
///
/// Register everything at startup through `&mut self`; after that the
/// registry is only read, so it can be shared freely across threads.
pub struct ResolverRegistry {
    resolvers: HashMap<String, Box<dyn Resolver>>,
    cache: Arc<ReferenceCache>,
    max_depth: usize,
}

impl ResolverRegistry {
    pub fn new(cache: Arc<ReferenceCache>, max_depth: usize) -> Self {
        Self {
            resolvers: HashMap::new(),
            cache,
            max_depth,
        }
    }

    /// Register `resolver` under its kind, replacing any previous one.
    pub fn register<R: Resolver + 'static>(&mut self, resolver: R) {
        self.register_boxed(Box::new(resolver));
    }

    pub fn register_boxed(&mut self, resolver: Box<dyn Resolver>) {
        let kind = resolver.kind().to_string();
        if self.resolvers.insert(kind.clone(), resolver).is_some() {
            tracing::debug!(kind = %kind, "replaced resolver");
        } else {
            tracing::debug!(kind = %kind, "registered resolver");
        }
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.resolvers.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.resolvers.contains_key(kind)
    }

    pub fn cache(&self) -> &Arc<ReferenceCache> {
        &self.cache
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Resolve a top-level reference with fresh traversal state.
    pub fn resolve(&self, reference: &str, context: &Context) -> Result<String, ResolveError> {
        self.resolve_at(reference, context, 0, &mut ResolutionTrace::new())
    }

    /// Resolve `reference` at `depth`, threading `trace` through recursion.
    pub fn resolve_at(
        &self,
        reference: &str,
        context: &Context,
        depth: usize,
        trace: &mut ResolutionTrace,
    ) -> Result<String, ResolveError> {
        if trace.is_visiting(reference) {
            return Err(ResolveError::CircularReference(reference.to_string()));
        }
        if depth >= self.max_depth {
            return Err(ResolveError::MaxDepthExceeded(self.max_depth));
        }

        let parsed = Reference::parse(reference)?;
        let resolver = self
            .resolvers
            .get(parsed.kind())
            .ok_or_else(|| ResolveError::ResolverNotFound(parsed.kind().to_string()))?;

        let cacheable = resolver.cacheable();
        if cacheable {
            if let Some(content) = self.cache.get(reference) {
                tracing::debug!(reference, "cache hit");
                return Ok(content);
            }
        }

        let outer = std::mem::take(&mut trace.uncacheable);
        trace.visited.insert(reference.to_string());
        let expanded = self.expand(reference, &parsed, resolver.as_ref(), context, depth, trace);
        trace.visited.remove(reference);
        let uncacheable = trace.uncacheable || !cacheable;
        trace.uncacheable = outer || uncacheable;
        let content = expanded?;

        if depth == 0 && !uncacheable {
            self.cache.set(reference, content.clone());
        }
        Ok(content)
    }

    fn expand(
        &self,
        reference: &str,
        parsed: &Reference,
        resolver: &dyn Resolver,
        context: &Context,
        depth: usize,
        trace: &mut ResolutionTrace,
    ) -> Result<String, ResolveError> {
        tracing::trace!(reference, depth, "resolving");
        let raw = resolver
            .resolve(parsed.value(), context)
            .map_err(|source| ResolveError::Resolver {
                reference: reference.to_string(),
                source,
            })?;

        scan::replace_references(&raw, |token| {
            match self.resolve_at(token, context, depth + 1, trace) {
                Ok(text) => Ok(text),
                Err(e) if e.is_structural() => Err(e),
                Err(e) => {
                    tracing::warn!(
                        reference = %token,
                        parent = %reference,
                        error = %e,
                        "blanked nested reference"
                    );
                    trace.record(token, depth + 1, e);
                    Ok(String::new())
                }
            }
        })
    }
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("kinds", &self.kinds())
            .field("max_depth", &self.max_depth)
            .field("cache", &self.cache.stats())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
