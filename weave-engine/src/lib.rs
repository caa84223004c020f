//! # weave-engine
//!
//! Expands `@kind:value` references in text through a registry of pluggable
//! resolvers, with a shared TTL/LRU cache and per-workflow auto-injection.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use weave_core::{Context, EngineConfig};
//! use weave_engine::{FnResolver, ReferenceEngine};
//!
//! fn render(text: &str) {
//!     let engine = ReferenceEngine::builder(EngineConfig::default())
//!         .builtin_resolvers()
//!         .resolver(FnResolver::new("upper", |value, _| Ok(value.to_uppercase())))
//!         .build();
//!     match engine.render(text, &Context::new(), None) {
//!         Ok(out) => println!("{out}"),
//!         Err(e) => eprintln!("render failed: {e}"),
//!     }
//! }
//! ```

pub mod cache;
pub mod engine;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod resolvers;
pub mod scan;

pub use cache::ReferenceCache;
pub use engine::{ReferenceEngine, ReferenceEngineBuilder, Rendered};
pub use error::BuiltinError;
pub use registry::{ResolutionFailure, ResolutionTrace, ResolverRegistry};
pub use resolver::{FnResolver, Resolver};
pub use resolvers::{ConfigResolver, ContextResolver, DocResolver};
