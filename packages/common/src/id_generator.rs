use crc32fast::Hasher;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

/// Per-process nonce mixed into every seed so that two editing sessions over
/// the same scope never hand out the same ids.
fn session_nonce() -> &'static str {
    static NONCE: OnceLock<String> = OnceLock::new();
    NONCE.get_or_init(|| uuid::Uuid::new_v4().simple().to_string())
}

/// Derive a short seed for a scope (document id, project id, ...) using CRC32
pub fn get_scope_id(scope: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(session_nonce().as_bytes());
    hasher.update(b":");
    hasher.update(scope.as_bytes());
    format!("{:08x}", hasher.finalize())
}

/// Next id from the process-wide generator.
///
/// Safe to call from any thread; ids are unique for the lifetime of the
/// process and carry the session seed.
pub fn next_id() -> String {
    static SEED: OnceLock<String> = OnceLock::new();
    static COUNT: AtomicU32 = AtomicU32::new(0);

    let seed = SEED.get_or_init(|| get_scope_id("global"));
    let n = COUNT.fetch_add(1, Ordering::Relaxed) + 1;
    format!("{}-{}", seed, n)
}
