//! Round-robin partitioner
//!
//! Element `i` of the input goes to shard `i % k`, so shard sizes differ by
//! at most one and the split is a single O(n) pass.

/// Split `items` into `k` shards. Returns no shards when `items` is empty
/// or `k` is zero.
pub fn split<T: Clone>(items: &[T], k: usize) -> Vec<Vec<T>> {
    if items.is_empty() || k == 0 {
        return Vec::new();
    }

    let k = k.min(items.len());
    let mut shards: Vec<Vec<T>> = (0..k)
        .map(|s| Vec::with_capacity(items.len() / k + usize::from(s < items.len() % k)))
        .collect();

    for (i, item) in items.iter().enumerate() {
        shards[i % k].push(item.clone());
    }

    shards
}

/// Shard count for a comparison set of `len` items and `max_workers` threads
pub fn shard_count(len: usize, max_workers: usize) -> usize {
    len.min(max_workers)
}
