use crate::domain::SessionId;
use std::{
    sync::{
        OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Returns a process-unique session id such as `session-1760870000123`.
///
/// The counter is seeded from the clock so ids from a restarted process do not
/// repeat the previous run's ids.
pub fn next_session_id() -> SessionId {
    static COUNTER: OnceLock<AtomicU64> = OnceLock::new();
    let counter = COUNTER.get_or_init(|| AtomicU64::new(now_millis()));
    format!("session-{}", counter.fetch_add(1, Ordering::Relaxed))
}
