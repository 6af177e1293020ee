//! Probe command - checks the configured backend end to end

use std::time::Instant;

use serde_json::{Value, json};
use tracing::info;

use crate::infrastructure::cache::CacheConfig;
use crate::infrastructure::services::MemoCache;

/// Round-trip a probe entry through the backend selected by the environment
pub async fn run() -> anyhow::Result<()> {
    let config = CacheConfig::from_env()?;
    let cache: MemoCache<Value> = MemoCache::connect(&config).await?;

    let key = cache.get_cache_key(&json!({
        "probe": "issuezz-cache",
        "pid": std::process::id(),
    }));
    let payload = json!({"match": 0.9});

    let start = Instant::now();
    cache.set(&key, &payload).await?;
    let read_back = cache.get(&key).await?;
    let elapsed = start.elapsed();
    cache.invalidate(&key).await?;

    let hit = read_back.as_ref() == Some(&payload);
    info!(backend = %cache.backend(), hit, "Probe finished");

    println!("backend:  {}", cache.backend());
    println!("ttl:      {}s", cache.ttl().as_secs());
    println!("hit:      {}", hit);
    println!("round-trip: {:?}", elapsed);

    if !hit {
        anyhow::bail!("Probe entry was not readable after being stored");
    }

    Ok(())
}
