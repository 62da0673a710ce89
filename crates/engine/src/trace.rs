//! Timing helpers.

use std::time::Instant;

/// Run `f`, logging its duration at trace level under `label`.
pub fn timed<T>(label: &str, f: impl FnOnce() -> T) -> T {
    if !log::log_enabled!(log::Level::Trace) {
        return f();
    }
    let start = Instant::now();
    let out = f();
    log::trace!("{label}: {:.2?}", start.elapsed());
    out
}
