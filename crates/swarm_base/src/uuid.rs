//! Identifier generation for symbols, jobs and lock holders.
//!
//! Production builds hand out random v4 UUIDs. Serialization tests need
//! byte-stable output, so the generator can be switched into a deterministic
//! mode that yields `d-guid-0`, `d-guid-1`, ... instead.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

static DETERMINISTIC: AtomicBool = AtomicBool::new(false);
static NEXT_DETERMINISTIC: AtomicUsize = AtomicUsize::new(0);

/// Switches every subsequent [`uuid4`] call to (or away from) the sequential
/// `d-guid-N` scheme. Enabling the mode resets the counter.
pub fn set_deterministic_uuids(enabled: bool) {
    DETERMINISTIC.store(enabled, Ordering::SeqCst);
    if enabled {
        NEXT_DETERMINISTIC.store(0, Ordering::SeqCst);
    }
}

/// Generates a fresh identifier.
pub fn uuid4() -> String {
    if DETERMINISTIC.load(Ordering::SeqCst) {
        let n = NEXT_DETERMINISTIC.fetch_add(1, Ordering::SeqCst);
        return format!("d-guid-{n}");
    }

    ::uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // The generator is process-global; tests touching its mode take turns.
    static MODE: Mutex<()> = Mutex::new(());

    #[test]
    fn random_uuids_are_distinct() {
        let _guard = MODE.lock().unwrap_or_else(|e| e.into_inner());
        set_deterministic_uuids(false);
        assert_ne!(uuid4(), uuid4());
    }

    #[test]
    fn deterministic_uuids_count_up_from_zero() {
        let _guard = MODE.lock().unwrap_or_else(|e| e.into_inner());
        set_deterministic_uuids(true);
        assert_eq!(uuid4(), "d-guid-0");
        assert_eq!(uuid4(), "d-guid-1");
        set_deterministic_uuids(false);
    }
}
