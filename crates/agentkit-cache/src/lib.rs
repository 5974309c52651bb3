//! # agentkit-cache
//!
//! Result caching for agentkit tools.
//!
//! `cached(&tool, options)` returns a tool with the same name, schema, and
//! gating whose execute step consults a store first. Keys are derived from
//! the call arguments with a stable serialization (object keys sorted), an
//! optional per-context scope is appended as `|scope`, and entries older than
//! the TTL are treated as absent and removed on lookup.
//!
//! ```rust,ignore
//! let (weather, cache) = cached(&weather_tool(), CacheOptions::new().ttl(Duration::from_secs(60)))?;
//! let agent = Agent::builder("Weather", engine).tool(weather).build()?;
//! // ...
//! println!("{:?}", cache.stats().await?);
//! ```

pub mod cached;
pub mod key;
pub mod store;

pub use cached::{cache_tools, cached, CacheHandle, CacheOptions, CacheStats, DEFAULT_MAX_SIZE, DEFAULT_TTL};
pub use key::{default_key, stable_serialize};
pub use store::{CacheEntry, CacheStore, LruStore};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use serde_json::{json, Value};

    use agentkit_contracts::agent::RunContext;
    use agentkit_core::{tool::ToolCallMeta, Tool, ToolSet};

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn counting_tool(name: &str, calls: Arc<AtomicUsize>) -> Tool {
        Tool::new(
            name,
            "Look up the weather",
            json!({
                "type": "object",
                "properties": { "location": { "type": "string" } },
                "required": ["location"]
            }),
            move |input: Value, _ctx, _meta| {
                let calls = Arc::clone(&calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok(json!({ "location": input["location"], "call": n }))
                }
            },
        )
    }

    async fn call(tool: &Tool, args: Value, ctx: &RunContext) -> Value {
        tool.invoke(args, ctx, ToolCallMeta::default()).await.unwrap()
    }

    // ── 1. hits and misses ────────────────────────────────────────────────────

    #[tokio::test]
    async fn second_identical_call_is_served_from_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (tool, cache) = cached(&counting_tool("weather", Arc::clone(&calls)), CacheOptions::new()).unwrap();
        let ctx = RunContext::new();

        let first = call(&tool, json!({ "location": "Paris" }), &ctx).await;
        let second = call(&tool, json!({ "location": "Paris" }), &ctx).await;

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = cache.stats().await.unwrap();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 1));
        assert_eq!(stats.hit_rate, 0.5);
        assert_eq!(stats.max_size, DEFAULT_MAX_SIZE);
    }

    #[tokio::test]
    async fn different_arguments_miss() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (tool, cache) = cached(&counting_tool("weather", Arc::clone(&calls)), CacheOptions::new()).unwrap();
        let ctx = RunContext::new();

        call(&tool, json!({ "location": "Paris" }), &ctx).await;
        call(&tool, json!({ "location": "Oslo" }), &ctx).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().await.unwrap().misses, 2);
    }

    #[tokio::test]
    async fn wrapped_tool_keeps_name_and_schema() {
        let original = counting_tool("weather", Arc::new(AtomicUsize::new(0)));
        let (tool, _) = cached(&original, CacheOptions::new()).unwrap();

        assert_eq!(tool.name(), "weather");
        assert_eq!(tool.parameters(), original.parameters());

        // Validation still runs before the cache is consulted.
        let err = tool
            .invoke(json!({}), &RunContext::new(), ToolCallMeta::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid-tool-arguments");
    }

    // ── 2. expiry ─────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_removed_and_recomputed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let options = CacheOptions::new().ttl(Duration::from_secs(60));
        let (tool, cache) = cached(&counting_tool("weather", Arc::clone(&calls)), options).unwrap();
        let ctx = RunContext::new();
        let args = json!({ "location": "Paris" });

        call(&tool, args.clone(), &ctx).await;
        assert!(cache.is_cached(&args, &ctx).await.unwrap());

        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(!cache.is_cached(&args, &ctx).await.unwrap());
        assert_eq!(cache.stats().await.unwrap().size, 0, "stale entry deleted on lookup");

        let fresh = call(&tool, args, &ctx).await;
        assert_eq!(fresh["call"], 2);
    }

    // ── 3. keys and scopes ────────────────────────────────────────────────────

    #[tokio::test]
    async fn scope_partitions_entries_per_user() {
        let calls = Arc::new(AtomicUsize::new(0));
        let options = CacheOptions::new().scope_fn(|ctx| ctx.user_id.clone());
        let (tool, cache) = cached(&counting_tool("weather", Arc::clone(&calls)), options).unwrap();
        let alice = RunContext::new().with_user_id("alice");
        let bob = RunContext::new().with_user_id("bob");
        let args = json!({ "location": "Paris" });

        call(&tool, args.clone(), &alice).await;
        call(&tool, args.clone(), &bob).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.cache_key(&args, &alice), "{location:Paris}|alice");
    }

    #[tokio::test]
    async fn custom_key_fn_and_clear_by_key() {
        let calls = Arc::new(AtomicUsize::new(0));
        let options = CacheOptions::new().key_fn(|params, _| {
            params["location"].as_str().unwrap_or_default().to_lowercase()
        });
        let (tool, cache) = cached(&counting_tool("weather", Arc::clone(&calls)), options).unwrap();
        let ctx = RunContext::new();

        call(&tool, json!({ "location": "PARIS" }), &ctx).await;
        call(&tool, json!({ "location": "paris" }), &ctx).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.clear(Some("paris")).await.unwrap();
        call(&tool, json!({ "location": "Paris" }), &ctx).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    // ── 4. policies and callbacks ─────────────────────────────────────────────

    #[tokio::test]
    async fn should_cache_can_skip_storing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let options = CacheOptions::new().should_cache(|_, result| result["call"] != json!(1));
        let (tool, cache) = cached(&counting_tool("weather", Arc::clone(&calls)), options).unwrap();
        let ctx = RunContext::new();
        let args = json!({ "location": "Paris" });

        call(&tool, args.clone(), &ctx).await;
        call(&tool, args.clone(), &ctx).await;
        call(&tool, args, &ctx).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().await.unwrap().hits, 1);
    }

    #[tokio::test]
    async fn hit_and_miss_callbacks_receive_the_key() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (hit_log, miss_log) = (Arc::clone(&seen), Arc::clone(&seen));
        let options = CacheOptions::new()
            .on_hit(move |key| hit_log.lock().unwrap().push(format!("hit {key}")))
            .on_miss(move |key| miss_log.lock().unwrap().push(format!("miss {key}")));
        let (tool, _) = cached(&counting_tool("weather", Arc::new(AtomicUsize::new(0))), options).unwrap();
        let ctx = RunContext::new();

        call(&tool, json!({ "location": "Rome" }), &ctx).await;
        call(&tool, json!({ "location": "Rome" }), &ctx).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["miss {location:Rome}", "hit {location:Rome}"]
        );
    }

    #[tokio::test]
    async fn clear_all_empties_the_store() {
        let (tool, cache) = cached(&counting_tool("weather", Arc::new(AtomicUsize::new(0))), CacheOptions::new()).unwrap();
        let ctx = RunContext::new();
        call(&tool, json!({ "location": "A" }), &ctx).await;
        call(&tool, json!({ "location": "B" }), &ctx).await;

        cache.clear(None).await.unwrap();

        assert_eq!(cache.stats().await.unwrap().size, 0);
    }

    // ── 5. cache_tools ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn cache_tools_wraps_every_tool_independently() {
        let weather_calls = Arc::new(AtomicUsize::new(0));
        let forecast_calls = Arc::new(AtomicUsize::new(0));
        let tools = ToolSet::from_tools([
            counting_tool("weather", Arc::clone(&weather_calls)),
            counting_tool("forecast", Arc::clone(&forecast_calls)),
        ])
        .unwrap();

        let (tools, handles) = cache_tools(tools, &CacheOptions::new()).unwrap();
        let ctx = RunContext::new();
        let args = json!({ "location": "Lima" });

        for _ in 0..2 {
            call(tools.get("weather").unwrap(), args.clone(), &ctx).await;
            call(tools.get("forecast").unwrap(), args.clone(), &ctx).await;
        }

        assert_eq!(weather_calls.load(Ordering::SeqCst), 1);
        assert_eq!(forecast_calls.load(Ordering::SeqCst), 1);
        assert_eq!(handles["weather"].stats().await.unwrap().hits, 1);
        assert_eq!(handles["forecast"].stats().await.unwrap().size, 1);
    }
}
