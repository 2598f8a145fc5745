/// Read-through caching over [`crate::db::Cache`].
///
/// Checks the cache for `$key`; on a miss, awaits `$fetch`, stores a successful
/// result under `$key` with `$ttl` seconds to live, and returns it. Fetch
/// errors propagate untouched and nothing is cached for them.
///
/// # Example
/// ```rust,ignore
/// let recs: RecommendationSet = cached!(
///     cache,
///     CacheKey::Recommendations(user_id),
///     300,
///     catalog.recommend(user_id)
/// )?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $fetch:expr) => {{
        match $cache.get(&$key).await {
            Some(hit) => Ok(hit),
            None => match $fetch.await {
                Ok(value) => {
                    $cache.set(&$key, &value, $ttl).await;
                    Ok(value)
                }
                Err(e) => Err(e),
            },
        }
    }};
}
