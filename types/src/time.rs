//! Wall-clock timestamps

/// Timestamp in milliseconds since Unix epoch
pub type Timestamp = u64;

/// Get current timestamp
#[cfg(target_arch = "wasm32")]
pub fn now() -> Timestamp {
    js_sys::Date::now() as u64
}

/// Get current timestamp
#[cfg(not(target_arch = "wasm32"))]
pub fn now() -> Timestamp {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
