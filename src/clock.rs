use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch. Anchor times on the wire use this
/// scale; everything downstream of the anchor is logical time.
pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Should system clock never be before the epoch")
        .as_millis() as u64
}
