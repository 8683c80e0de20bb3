//! Circular dependency detection infrastructure.

use std::cell::RefCell;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::error::{DiError, DiResult};
use crate::internal::FastMap;

/// Names currently under construction on one resolution call chain.
#[derive(Default)]
pub(crate) struct CreationStack {
    stack: RefCell<Vec<String>>,
}

impl CreationStack {
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.stack.borrow().iter().any(|n| n == name)
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.borrow().len()
    }

    /// Pushes `name`, failing on re-entry or when `max_depth` is reached.
    ///
    /// The returned guard pops the name when dropped.
    pub(crate) fn enter(&self, name: &str, max_depth: usize) -> DiResult<StackGuard<'_>> {
        let mut stack = self.stack.borrow_mut();

        // Circular detection BEFORE pushing the new name
        if stack.iter().any(|n| n == name) {
            let mut path = stack.clone();
            path.push(name.to_string());
            return Err(DiError::Circular(path));
        }

        // Depth guard
        if stack.len() >= max_depth {
            return Err(DiError::DepthExceeded(max_depth));
        }

        stack.push(name.to_string());
        Ok(StackGuard { owner: self })
    }
}

/// Pops the entry pushed by [`CreationStack::enter`].
pub(crate) struct StackGuard<'a> {
    owner: &'a CreationStack,
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        self.owner.stack.borrow_mut().pop();
    }
}

/// Names under construction in one container, per thread.
///
/// Deferred handles (providers, lazy proxies, unordered streams) start a
/// new [`CreationStack`] when used, so a cycle closed through one of them
/// is only visible here.
#[derive(Default)]
pub(crate) struct CreationTracker {
    threads: Mutex<FastMap<ThreadId, Vec<String>>>,
}

impl CreationTracker {
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.threads
            .lock()
            .get(&thread::current().id())
            .is_some_and(|names| names.iter().any(|n| n == name))
    }

    /// Marks `name` as in creation on the current thread.
    pub(crate) fn enter(&self, name: &str) -> DiResult<TrackerGuard<'_>> {
        let thread = thread::current().id();
        let mut threads = self.threads.lock();
        let names = threads.entry(thread).or_default();
        if names.iter().any(|n| n == name) {
            let mut path = names.clone();
            path.push(name.to_string());
            return Err(DiError::Circular(path));
        }
        names.push(name.to_string());
        Ok(TrackerGuard { owner: self, thread })
    }
}

pub(crate) struct TrackerGuard<'a> {
    owner: &'a CreationTracker,
    thread: ThreadId,
}

impl Drop for TrackerGuard<'_> {
    fn drop(&mut self) {
        let mut threads = self.owner.threads.lock();
        if let Some(names) = threads.get_mut(&self.thread) {
            names.pop();
            if names.is_empty() {
                threads.remove(&self.thread);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reentry_reports_full_path() {
        let stack = CreationStack::default();
        let _a = stack.enter("a", 16).unwrap();
        let _b = stack.enter("b", 16).unwrap();
        match stack.enter("a", 16) {
            Err(DiError::Circular(path)) => assert_eq!(path, vec!["a", "b", "a"]),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("cycle not detected"),
        }
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn guard_pops_on_drop_and_depth_is_bounded() {
        let stack = CreationStack::default();
        {
            let _a = stack.enter("a", 1).unwrap();
            assert!(matches!(stack.enter("b", 1), Err(DiError::DepthExceeded(1))));
        }
        assert!(!stack.contains("a"));
        assert!(stack.enter("a", 1).is_ok());
    }

    #[test]
    fn tracker_sees_reentry_across_stacks() {
        let tracker = CreationTracker::default();
        let _a = tracker.enter("a").unwrap();
        let _b = tracker.enter("b").unwrap();
        assert!(tracker.contains("a"));
        match tracker.enter("a") {
            Err(DiError::Circular(path)) => assert_eq!(path, vec!["a", "b", "a"]),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("cycle not detected"),
        };
    }

    #[test]
    fn tracker_is_per_thread() {
        let tracker = CreationTracker::default();
        let outer = tracker.enter("a").unwrap();
        std::thread::scope(|s| {
            s.spawn(|| {
                assert!(!tracker.contains("a"));
                let _other = tracker.enter("a").unwrap();
            });
        });
        drop(outer);
        assert!(!tracker.contains("a"));
        assert!(tracker.threads.lock().is_empty());
    }
}
