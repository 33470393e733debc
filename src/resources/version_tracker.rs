//! Change versions for data the renderer mirrors on the GPU.
//!
//! GPU caches record the version they last synced and re-upload only when
//! the owner's [`ChangeTracker`] has moved past it.

/// Monotonic per-resource change counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeTracker(u64);

impl ChangeTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    pub fn changed(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    /// The three.js `needsUpdate = value` setter: `false` never rewinds.
    pub fn set_needs_update(&mut self, value: bool) {
        if value {
            self.changed();
        }
    }

    #[inline]
    #[must_use]
    pub fn version(self) -> u64 {
        self.0
    }

    /// Whether contents changed after a cache synced at `synced`.
    #[inline]
    #[must_use]
    pub fn is_newer_than(self, synced: u64) -> bool {
        self.0 != synced
    }
}

/// Write access to tracked data. Counts as one change when dropped, but only
/// if it was written through.
pub struct MutGuard<'a, T> {
    data: &'a mut T,
    tracker: &'a mut ChangeTracker,
    written: bool,
}

impl<'a, T> MutGuard<'a, T> {
    pub fn new(data: &'a mut T, tracker: &'a mut ChangeTracker) -> Self {
        Self {
            data,
            tracker,
            written: false,
        }
    }
}

impl<T> std::ops::Deref for MutGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.data
    }
}

impl<T> std::ops::DerefMut for MutGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.written = true;
        self.data
    }
}

impl<T> Drop for MutGuard<'_, T> {
    fn drop(&mut self) {
        if self.written {
            self.tracker.changed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_update_only_moves_forward() {
        let mut tracker = ChangeTracker::new();
        tracker.set_needs_update(false);
        assert_eq!(tracker.version(), 0);
        tracker.set_needs_update(true);
        assert!(tracker.is_newer_than(0));
        assert!(!tracker.is_newer_than(1));
    }

    #[test]
    fn read_only_guard_is_not_a_change() {
        let mut samples = vec![1.0_f32, 2.0];
        let mut tracker = ChangeTracker::new();
        {
            let guard = MutGuard::new(&mut samples, &mut tracker);
            assert_eq!(guard.len(), 2);
        }
        assert_eq!(tracker.version(), 0);
        {
            let mut guard = MutGuard::new(&mut samples, &mut tracker);
            guard[1] = 4.0;
        }
        assert_eq!(tracker.version(), 1);
        assert_eq!(samples, [1.0, 4.0]);
    }
}
