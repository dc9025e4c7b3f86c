use std::hash::Hasher;

use fnv::FnvHasher;

use crate::kv::KeyValue;

/// FNV-1a over the key's raw bytes, masked to a non-negative 31-bit value.
pub fn ihash(key: &str) -> u32 {
    let mut hasher = FnvHasher::default();
    // raw bytes, not `Hash for str`, which appends a 0xff terminator
    hasher.write(key.as_bytes());
    (hasher.finish() & 0x7fff_ffff) as u32
}

/// Reduce bucket for `key` among `n_reduce` buckets.
///
/// Every map worker must agree on this for the shuffle to be correct, so it
/// uses a fixed hash instead of `DefaultHasher`.
///
/// Panics if `n_reduce` is zero.
pub fn bucket(key: &str, n_reduce: u32) -> u32 {
    ihash(key) % n_reduce
}

/// Splits `pairs` into `n_reduce` buckets, keeping emission order inside each.
pub fn partition(pairs: Vec<KeyValue>, n_reduce: u32) -> Vec<Vec<KeyValue>> {
    let mut buckets: Vec<Vec<KeyValue>> = (0..n_reduce).map(|_| Vec::new()).collect();
    for kv in pairs {
        let idx = bucket(&kv.key, n_reduce) as usize;
        buckets[idx].push(kv);
    }
    buckets
}
