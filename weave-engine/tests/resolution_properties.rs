//! End-to-end resolution behaviour of the registry and engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;
use tempfile::TempDir;
use weave_core::{Context, EngineConfig, ResolveError};
use weave_engine::{
    DocResolver, FnResolver, ReferenceCache, ReferenceEngine, ResolverRegistry,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn registry_with(max_depth: usize, ttl: Duration, max_size: usize) -> ResolverRegistry {
    ResolverRegistry::new(Arc::new(ReferenceCache::new(ttl, max_size)), max_depth)
}

fn registry() -> ResolverRegistry {
    registry_with(3, Duration::from_secs(300), 100)
}

/// A resolver that counts its invocations and answers `value` with `answer(value)`.
fn counting<F>(kind: &str, answer: F) -> (FnResolver, Arc<AtomicUsize>)
where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
{
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let resolver = FnResolver::new(kind, move |value, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        answer(value).ok_or_else(|| format!("no content for '{value}'").into())
    });
    (resolver, calls)
}

fn write_docs(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, content).expect("write doc");
    }
    dir
}

// ---------------------------------------------------------------------------
// 1. Nesting, cycles, depth
// ---------------------------------------------------------------------------

#[test]
fn two_level_nesting_resolves_left_to_right() {
    let docs = write_docs(&[("a.md", "hello @doc:b.md"), ("b.md", "world")]);
    let mut reg = registry();
    reg.register(DocResolver::new(docs.path()));

    let text = reg.resolve("@doc:a.md", &Context::new()).expect("resolve");
    assert_eq!(text, "hello world");
}

#[test]
fn mutual_references_are_circular() {
    let mut reg = registry();
    reg.register(FnResolver::new("circ", |value, _| {
        Ok(match value {
            "a" => "@circ:b".to_string(),
            _ => "@circ:a".to_string(),
        })
    }));

    let err = reg.resolve("@circ:a", &Context::new()).unwrap_err();
    assert!(
        matches!(err, ResolveError::CircularReference(ref r) if r == "@circ:a"),
        "got: {err}"
    );
    assert!(reg.cache().is_empty(), "failed resolutions are never cached");
}

#[test]
fn self_reference_is_circular() {
    let mut reg = registry();
    reg.register(FnResolver::new("loop", |_, _| Ok("again @loop:x".to_string())));
    let err = reg.resolve("@loop:x", &Context::new()).unwrap_err();
    assert!(matches!(err, ResolveError::CircularReference(_)), "got: {err}");
}

/// `chain:N` returns `@chain:N-1` until it reaches `chain:0`, which is plain text.
fn chain_resolver() -> FnResolver {
    FnResolver::new("chain", |value, _| {
        let n: usize = value.parse()?;
        Ok(if n == 0 {
            "end".to_string()
        } else {
            format!("@chain:{}", n - 1)
        })
    })
}

#[rstest]
#[case(2, 0, true)]
#[case(2, 1, true)]
#[case(2, 2, false)]
#[case(3, 2, true)]
#[case(3, 3, false)]
fn depth_bound(#[case] max_depth: usize, #[case] links: usize, #[case] ok: bool) {
    let mut reg = registry_with(max_depth, Duration::from_secs(300), 100);
    reg.register(chain_resolver());

    let result = reg.resolve(&format!("@chain:{links}"), &Context::new());
    if ok {
        assert_eq!(result.expect("chain within bound"), "end");
    } else {
        let err = result.unwrap_err();
        assert!(
            matches!(err, ResolveError::MaxDepthExceeded(d) if d == max_depth),
            "got: {err}"
        );
    }
}

// ---------------------------------------------------------------------------
// 2. Cache coherence
// ---------------------------------------------------------------------------

#[test]
fn repeated_resolve_hits_cache() {
    let (resolver, calls) = counting("doc", |v| Some(format!("content of {v}")));
    let mut reg = registry();
    reg.register(resolver);

    let first = reg.resolve("@doc:x", &Context::new()).unwrap();
    let second = reg.resolve("@doc:x", &Context::new()).unwrap();
    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stats = reg.cache().stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.size, 1);
    assert_eq!(stats.hit_rate, 0.5);
}

#[test]
fn expired_entry_is_resolved_again() {
    let ttl = Duration::from_millis(40);
    let (resolver, calls) = counting("doc", |v| Some(v.to_string()));
    let mut reg = registry_with(3, ttl, 100);
    reg.register(resolver);

    reg.resolve("@doc:x", &Context::new()).unwrap();
    reg.resolve("@doc:x", &Context::new()).unwrap();
    assert_eq!(reg.cache().stats().misses, 1);

    std::thread::sleep(ttl * 2);
    reg.resolve("@doc:x", &Context::new()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(reg.cache().stats().misses, 2);
    assert_eq!(reg.cache().stats().hits, 1);
}

#[test]
fn lru_eviction_through_registry() {
    let (resolver, calls) = counting("doc", |v| Some(v.to_string()));
    let mut reg = registry_with(3, Duration::from_secs(300), 3);
    reg.register(resolver);
    let ctx = Context::new();

    for key in ["@doc:a", "@doc:b", "@doc:c"] {
        reg.resolve(key, &ctx).unwrap();
    }
    reg.resolve("@doc:a", &ctx).unwrap();
    reg.resolve("@doc:d", &ctx).unwrap();

    let cache = reg.cache();
    assert!(cache.contains("@doc:a"));
    assert!(!cache.contains("@doc:b"), "least recently used key is evicted");
    assert!(cache.contains("@doc:c"));
    assert!(cache.contains("@doc:d"));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[test]
fn invalidate_forces_re_resolution() {
    let (resolver, calls) = counting("doc", |v| Some(v.to_string()));
    let mut reg = registry();
    reg.register(resolver);
    reg.resolve("@doc:x", &Context::new()).unwrap();
    assert!(reg.cache().invalidate("@doc:x"));
    reg.resolve("@doc:x", &Context::new()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// ---------------------------------------------------------------------------
// 3. Leaf errors
// ---------------------------------------------------------------------------

#[test]
fn unknown_kind_never_touches_cache() {
    let reg = registry();
    let err = reg.resolve("@nope:x", &Context::new()).unwrap_err();
    assert!(matches!(err, ResolveError::ResolverNotFound(ref k) if k == "nope"), "got: {err}");

    let stats = reg.cache().stats();
    assert_eq!((stats.hits, stats.misses, stats.size), (0, 0, 0));
}

#[test]
fn malformed_literal_invokes_no_resolver() {
    let (resolver, calls) = counting("doc", |v| Some(v.to_string()));
    let mut reg = registry();
    reg.register(resolver);

    let err = reg.resolve("not-a-reference", &Context::new()).unwrap_err();
    assert!(matches!(err, ResolveError::InvalidReference(_)), "got: {err}");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// 4. Engine rendering
// ---------------------------------------------------------------------------

fn engine_with(resolvers: Vec<FnResolver>) -> ReferenceEngine {
    resolvers
        .into_iter()
        .fold(ReferenceEngine::builder(EngineConfig::default()), |b, r| b.resolver(r))
        .build()
}

#[test]
fn failing_token_is_blanked_and_siblings_survive() {
    let engine = engine_with(vec![
        FnResolver::new("ok", |v, _| Ok(format!("ok-{v}"))),
        FnResolver::new("bad", |_, _| Err("backend down".into())),
    ]);

    let rendered = engine
        .render_detailed("@ok:1 @bad:2", &Context::new(), None)
        .expect("non-structural failures never abort");
    assert_eq!(rendered.text, "ok-1 ");
    assert_eq!(rendered.failures.len(), 1);
    assert_eq!(rendered.failures[0].reference, "@bad:2");
    assert!(matches!(rendered.failures[0].error, ResolveError::Resolver { .. }));
}

#[test]
fn unknown_and_malformed_tokens_are_blanked() {
    let engine = engine_with(vec![FnResolver::new("ok", |v, _| Ok(v.to_string()))]);
    let out = engine
        .render("@missing:1 and @ok:2", &Context::new(), None)
        .unwrap();
    assert_eq!(out, " and 2");
}

#[test]
fn structural_error_aborts_render() {
    let engine = engine_with(vec![
        FnResolver::new("ok", |v, _| Ok(v.to_string())),
        FnResolver::new("circ", |v, _| {
            let next = if v == "a" { "@circ:b" } else { "@circ:a" };
            Ok(next.to_string())
        }),
    ]);
    let err = engine
        .render("@ok:before @circ:a @ok:after", &Context::new(), None)
        .unwrap_err();
    assert!(err.is_structural(), "got: {err}");
}

#[test]
fn surrounding_text_is_preserved() {
    let docs = write_docs(&[
        ("intro.md", "Intro with @doc:nested.md inside."),
        ("nested.md", "NESTED"),
    ]);
    let engine = ReferenceEngine::builder(EngineConfig::default())
        .resolver(DocResolver::new(docs.path()))
        .build();

    let out = engine
        .render("# Title\n\n@doc:intro.md\n\nTail: @doc:nested.md\n", &Context::new(), None)
        .unwrap();
    assert_eq!(out, "# Title\n\nIntro with NESTED inside.\n\nTail: NESTED\n");
}

#[test]
fn sibling_top_level_tokens_do_not_share_visited_state() {
    // Both tokens expand into the same nested reference; that is not a cycle.
    let engine = engine_with(vec![
        FnResolver::new("outer", |_, _| Ok("inner says @inner:x".to_string())),
        FnResolver::new("inner", |v, _| Ok(v.to_uppercase())),
    ]);
    let out = engine
        .render("@outer:1 @outer:2", &Context::new(), None)
        .unwrap();
    assert_eq!(out, "inner says X inner says X");
}

#[test]
fn duplicate_top_level_tokens_second_is_cached() {
    let (resolver, calls) = counting("doc", |v| Some(v.to_string()));
    let engine = ReferenceEngine::builder(EngineConfig::default())
        .resolver(resolver)
        .build();
    let out = engine.render("@doc:a + @doc:a", &Context::new(), None).unwrap();
    assert_eq!(out, "a + a");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.cache_stats().hits, 1);
}

#[test]
fn context_reaches_resolvers_unchanged() {
    let engine = engine_with(vec![FnResolver::new("var", |name, ctx| {
        ctx.get(name)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| format!("unset {name}").into())
    })]);
    let mut ctx = Context::new();
    ctx.insert("who".into(), serde_json::json!("reviewer"));
    assert_eq!(engine.render("hi @var:who", &ctx, None).unwrap(), "hi reviewer");
}

#[test]
fn context_values_never_leak_between_renders() {
    let docs = write_docs(&[("greeting.md", "Hello @context:user")]);
    let config = EngineConfig {
        doc_root: Some(docs.path().to_path_buf()),
        ..EngineConfig::default()
    };
    let engine = ReferenceEngine::builder(config).builtin_resolvers().build();

    let render_as = |name: &str| {
        let mut ctx = Context::new();
        ctx.insert("user".into(), serde_json::json!(name));
        engine
            .render("hi @context:user / @doc:greeting.md", &ctx, None)
            .unwrap()
    };
    assert_eq!(render_as("alice"), "hi alice / Hello alice");
    assert_eq!(render_as("bob"), "hi bob / Hello bob");
    assert!(engine.registry().cache().is_empty());
}
