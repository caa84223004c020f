//! Rendering layer: [`ReferenceEngine`] and its builder.
//!
//! # `render_detailed` flow
//!
//! 1. Disabled engine → text passes through untouched.
//! 2. Known workflow → resolve its auto-injected variables and merge them
//!    under the caller's variables (caller wins on name clashes).
//! 3. Scan the text for top-level tokens; resolve each with its own trace.
//! 4. Structural errors abort; other failures blank the token.

use std::borrow::Cow;
use std::sync::Arc;

use serde_json::Value;

use weave_core::{CacheStats, Context, EngineConfig, ResolveError};

use crate::cache::ReferenceCache;
use crate::registry::{ResolutionFailure, ResolutionTrace, ResolverRegistry};
use crate::resolver::Resolver;
use crate::resolvers::{ConfigResolver, ContextResolver, DocResolver};
use crate::scan;

// ---------------------------------------------------------------------------
// Rendered
// ---------------------------------------------------------------------------

/// Output of [`ReferenceEngine::render_detailed`].
#[derive(Debug, Default)]
pub struct Rendered {
    pub text: String,
    /// Auto-injected variable names that were added to the context.
    pub injected: Vec<String>,
    /// Every failure that was blanked out, top-level and nested.
    pub failures: Vec<ResolutionFailure>,
}

// ---------------------------------------------------------------------------
// ReferenceEngine
// ---------------------------------------------------------------------------

/// Expands `@kind:value` references in already variable-substituted text.
///
/// Cheap to share: wrap in `Arc` and call [`render`](Self::render) from as
/// many threads as needed. Only the cache is mutated during rendering.
#[derive(Debug)]
pub struct ReferenceEngine {
    config: EngineConfig,
    registry: ResolverRegistry,
}

impl ReferenceEngine {
    /// Wrap an already populated registry. The registry's own `max_depth`
    /// governs resolution; `config` supplies `enabled` and auto-injection.
    pub fn new(config: EngineConfig, registry: ResolverRegistry) -> Self {
        Self { config, registry }
    }

    /// Start a builder that creates the cache and registry from `config`.
    pub fn builder(config: EngineConfig) -> ReferenceEngineBuilder {
        ReferenceEngineBuilder::new(config)
    }

    /// Expand every top-level reference in `text`.
    pub fn render(
        &self,
        text: &str,
        context: &Context,
        workflow: Option<&str>,
    ) -> Result<String, ResolveError> {
        self.render_detailed(text, context, workflow).map(|r| r.text)
    }

    /// Like [`render`](Self::render), also reporting injected variables and
    /// blanked failures.
    pub fn render_detailed(
        &self,
        text: &str,
        context: &Context,
        workflow: Option<&str>,
    ) -> Result<Rendered, ResolveError> {
        if !self.config.enabled {
            return Ok(Rendered {
                text: text.to_string(),
                ..Rendered::default()
            });
        }

        let mut rendered = Rendered::default();
        let context = match workflow {
            Some(name) => Cow::Owned(self.inject(name, context, &mut rendered)),
            None => Cow::Borrowed(context),
        };

        let failures = &mut rendered.failures;
        let text = scan::replace_references(text, |token| {
            let mut trace = ResolutionTrace::new();
            let result = self.registry.resolve_at(token, &context, 0, &mut trace);
            failures.extend(trace.into_failures());
            match result {
                Ok(resolved) => Ok(resolved),
                Err(e) if e.is_structural() => Err(e),
                Err(e) => {
                    tracing::warn!(reference = %token, error = %e, "blanked reference");
                    failures.push(ResolutionFailure {
                        reference: token.to_string(),
                        depth: 0,
                        error: e,
                    });
                    Ok(String::new())
                }
            }
        })?;
        rendered.text = text;
        Ok(rendered)
    }

    /// Full prompt pipeline: auto-inject for `workflow`, fill `{{var}}`
    /// placeholders from the merged variables, then expand references.
    pub fn render_template(
        &self,
        template: &str,
        context: &Context,
        workflow: Option<&str>,
    ) -> Result<Rendered, ResolveError> {
        if !self.config.enabled {
            return Ok(Rendered {
                text: scan::substitute_variables(template, context),
                ..Rendered::default()
            });
        }

        let mut rendered = Rendered::default();
        let merged = match workflow {
            Some(name) => self.inject(name, context, &mut rendered),
            None => context.clone(),
        };
        let text = scan::substitute_variables(template, &merged);
        let mut body = self.render_detailed(&text, &merged, None)?;
        rendered.text = body.text;
        rendered.failures.append(&mut body.failures);
        Ok(rendered)
    }

    /// Resolve the auto-injected variables configured for `workflow`.
    ///
    /// Returns the caller's variables merged with the injected ones; a name
    /// the caller already supplied is left alone and not resolved.
    pub fn injected_context(&self, workflow: &str, context: &Context) -> Context {
        self.inject(workflow, context, &mut Rendered::default())
    }

    fn inject(&self, workflow: &str, context: &Context, rendered: &mut Rendered) -> Context {
        let mut merged = context.clone();
        let Some(variables) = self.config.auto_inject.workflow(workflow) else {
            tracing::debug!(workflow, "no auto-injection configured");
            return merged;
        };

        for (name, template) in variables {
            if context.contains_key(name) {
                tracing::debug!(variable = %name, "supplied by caller; skipping auto-injection");
                continue;
            }
            let reference = scan::substitute_variables(template, context);
            let mut trace = ResolutionTrace::new();
            let result = self.registry.resolve_at(&reference, context, 0, &mut trace);
            rendered.failures.extend(trace.into_failures());
            match result {
                Ok(value) => {
                    merged.insert(name.clone(), Value::String(value));
                    rendered.injected.push(name.clone());
                }
                Err(e) => {
                    tracing::warn!(
                        workflow,
                        variable = %name,
                        error = %e,
                        "auto-injection failed"
                    );
                    rendered.failures.push(ResolutionFailure {
                        reference,
                        depth: 0,
                        error: e,
                    });
                }
            }
        }
        merged
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.registry.cache().stats()
    }

    pub fn resolver_kinds(&self) -> Vec<String> {
        self.registry.kinds()
    }

    /// Force the next lookup of `reference` to hit its resolver again.
    pub fn invalidate(&self, reference: &str) -> bool {
        self.registry.cache().invalidate(reference)
    }

    pub fn clear_cache(&self) {
        self.registry.cache().clear();
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects resolvers and an optional shared cache, then builds the engine.
pub struct ReferenceEngineBuilder {
    config: EngineConfig,
    cache: Option<Arc<ReferenceCache>>,
    resolvers: Vec<Box<dyn Resolver>>,
}

impl ReferenceEngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            cache: None,
            resolvers: Vec::new(),
        }
    }

    /// Use an existing cache instead of creating one from the config.
    pub fn cache(mut self, cache: Arc<ReferenceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn resolver<R: Resolver + 'static>(mut self, resolver: R) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Register `context`, `config` (from `values`), and `doc` when a
    /// document root is configured.
    pub fn builtin_resolvers(mut self) -> Self {
        self.resolvers.push(Box::new(ContextResolver));
        self.resolvers
            .push(Box::new(ConfigResolver::new(self.config.values.clone())));
        if let Some(root) = self.config.doc_root.clone() {
            self.resolvers.push(Box::new(DocResolver::new(root)));
        }
        self
    }

    pub fn build(self) -> ReferenceEngine {
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(ReferenceCache::from_config(&self.config.cache)));
        let mut registry = ResolverRegistry::new(cache, self.config.max_depth);
        for resolver in self.resolvers {
            registry.register_boxed(resolver);
        }
        ReferenceEngine::new(self.config, registry)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
