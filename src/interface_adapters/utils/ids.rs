use std::sync::atomic::{AtomicU64, Ordering};

/// Returns the next connection id. Ids start at 1 and are never reused within a process.
pub fn next_client_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}
