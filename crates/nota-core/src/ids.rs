//! Identifier generation.
//!
//! Note and event ids are UUIDv7, so sorting ids sorts by creation time.
//! The context assembler relies on that to break ties between notes that
//! share a `created_at`.

use uuid::Uuid;

/// Fresh time-ordered id.
///
/// ```
/// let id = nota_core::new_v7();
/// assert_eq!(id.get_version_num(), 7);
/// ```
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

/// Unix milliseconds embedded in a v7 id, `None` for any other version.
pub fn v7_millis(id: &Uuid) -> Option<u64> {
    if id.get_version_num() != 7 {
        return None;
    }
    let (secs, nanos) = id.get_timestamp()?.to_unix();
    Some(secs * 1000 + u64::from(nanos) / 1_000_000)
}
