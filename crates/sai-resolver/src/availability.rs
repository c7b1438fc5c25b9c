//! PATH availability cache: one `which` probe per executable per run.
//!
//! spec.md §4.2 step 3 calls for the availability check to be "cached per
//! run" — the selector owns one of these rather than consulting a process
//! global, so tests and successive invocations never leak cached results
//! into one another.

use std::collections::HashMap;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

pub struct AvailabilityCache {
    cache: OnceCell<RwLock<HashMap<String, bool>>>,
}

impl AvailabilityCache {
    pub fn new() -> Self {
        Self { cache: OnceCell::new() }
    }

    fn map(&self) -> &RwLock<HashMap<String, bool>> {
        self.cache.get_or_init(|| RwLock::new(HashMap::new()))
    }

    /// Is `executable` discoverable on PATH? Absolute paths are checked for
    /// existence directly rather than searched.
    pub fn is_available(&self, executable: &str) -> bool {
        if let Some(hit) = self.map().read().get(executable) {
            return *hit;
        }
        let found = if std::path::Path::new(executable).is_absolute() {
            std::path::Path::new(executable).exists()
        } else {
            which::which(executable).is_ok()
        };
        self.map().write().insert(executable.to_string(), found);
        found
    }
}

impl Default for AvailabilityCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_executable_is_unavailable_and_cached() {
        let cache = AvailabilityCache::new();
        assert!(!cache.is_available("definitely-not-a-real-binary-abc123"));
        // second call should hit the cache path, same result
        assert!(!cache.is_available("definitely-not-a-real-binary-abc123"));
    }

    #[test]
    fn absolute_path_checked_for_existence_not_searched_on_path() {
        let cache = AvailabilityCache::new();
        assert!(!cache.is_available("/definitely/not/a/real/path/abc123"));
    }
}
