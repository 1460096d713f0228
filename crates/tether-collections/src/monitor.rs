//! Counting busy monitor guarding collections against reentrant mutation.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Counts the active [`ReentrancyGuard`]s of one collection.
#[derive(Clone, Default)]
pub struct ReentrancyMonitor {
    count: Rc<Cell<usize>>,
}

impl ReentrancyMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take one more blocker. Blocking ends when every guard is dropped.
    #[must_use = "blocking ends as soon as the guard is dropped"]
    pub fn enter(&self) -> ReentrancyGuard {
        self.count.set(self.count.get() + 1);
        ReentrancyGuard {
            count: Rc::clone(&self.count),
        }
    }

    /// Whether at least one guard is alive.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.count.get() > 0
    }

    /// Number of live guards.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.count.get()
    }
}

impl fmt::Debug for ReentrancyMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReentrancyMonitor")
            .field("depth", &self.depth())
            .finish()
    }
}

/// One blocker of a [`ReentrancyMonitor`]; releases it on drop.
pub struct ReentrancyGuard {
    count: Rc<Cell<usize>>,
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        self.count.set(self.count.get().saturating_sub(1));
    }
}

impl fmt::Debug for ReentrancyGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReentrancyGuard")
            .field("depth", &self.count.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_guards_release_at_outermost() {
        let monitor = ReentrancyMonitor::new();
        let outer = monitor.enter();
        let inner = monitor.enter();
        assert_eq!(monitor.depth(), 2);
        drop(inner);
        assert!(monitor.is_busy());
        drop(outer);
        assert!(!monitor.is_busy());
    }
}
