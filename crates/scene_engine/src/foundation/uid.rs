//! Process-unique object identifiers
//!
//! Every entity, transform, and unit gets a `u32` uid. Zero is reserved for
//! "no object", which is what the picking pass reads back for empty pixels.

use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_UID: AtomicU32 = AtomicU32::new(1);

/// Allocate a fresh uid
pub fn next_uid() -> u32 {
    NEXT_UID.fetch_add(1, Ordering::Relaxed)
}

/// Make sure `uid` is never handed out by [`next_uid`]
///
/// Used when objects are restored from a snapshot with their original uids.
pub fn reserve_uid(uid: u32) {
    NEXT_UID.fetch_max(uid.saturating_add(1), Ordering::Relaxed);
}
