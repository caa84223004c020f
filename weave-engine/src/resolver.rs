//! The resolver capability the registry dispatches to.

use std::fmt;

use weave_core::{BoxError, Context};

/// A named handler turning a reference value into text.
///
/// The returned text may itself contain `@kind:value` references; the
/// registry expands those. Any error is treated as "resolution failed".
pub trait Resolver: Send + Sync {
    /// The reference kind this resolver serves, e.g. `"doc"`.
    fn kind(&self) -> &str;

    fn resolve(&self, value: &str, context: &Context) -> Result<String, BoxError>;

    /// Whether output depends only on `value`. Results of a non-cacheable
    /// resolver, and of anything that nests one, are never cached.
    fn cacheable(&self) -> bool {
        true
    }
}

type ResolveFn = dyn Fn(&str, &Context) -> Result<String, BoxError> + Send + Sync;

/// Closure-backed [`Resolver`].
pub struct FnResolver {
    kind: String,
    cacheable: bool,
    func: Box<ResolveFn>,
}

impl FnResolver {
    pub fn new<F>(kind: impl Into<String>, func: F) -> Self
    where
        F: Fn(&str, &Context) -> Result<String, BoxError> + Send + Sync + 'static,
    {
        Self {
            kind: kind.into(),
            cacheable: true,
            func: Box::new(func),
        }
    }

    /// Mark the closure as depending on the per-call context.
    pub fn uncached(mut self) -> Self {
        self.cacheable = false;
        self
    }
}

impl Resolver for FnResolver {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn resolve(&self, value: &str, context: &Context) -> Result<String, BoxError> {
        (self.func)(value, context)
    }

    fn cacheable(&self) -> bool {
        self.cacheable
    }
}

impl fmt::Debug for FnResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnResolver")
            .field("kind", &self.kind)
            .field("cacheable", &self.cacheable)
            .finish_non_exhaustive()
    }
}
