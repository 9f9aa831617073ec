/// Lazy, single-pass, finite sequence over a store resource.
///
/// The release hook runs exactly once: when the sequence is exhausted, or
/// when the cursor is dropped before that. After release the cursor yields
/// nothing further and cannot be restarted.
pub struct Cursor<'a, T> {
    items: Box<dyn Iterator<Item = T> + Send + 'a>,
    release: Option<Box<dyn FnOnce(usize) + Send + 'a>>,
    yielded: usize,
    done: bool,
}

impl<'a, T> Cursor<'a, T> {
    /// Wrap an iterator with a release hook. The hook receives the number
    /// of items that were yielded.
    pub fn new<I, F>(items: I, release: F) -> Self
    where
        I: Iterator<Item = T> + Send + 'a,
        F: FnOnce(usize) + Send + 'a,
    {
        Self {
            items: Box::new(items),
            release: Some(Box::new(release)),
            yielded: 0,
            done: false,
        }
    }

    /// A cursor with nothing to release.
    pub fn detached<I>(items: I) -> Self
    where
        I: Iterator<Item = T> + Send + 'a,
    {
        Self {
            items: Box::new(items),
            release: None,
            yielded: 0,
            done: false,
        }
    }

    /// Number of items yielded so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Returns `true` once the underlying resource has been released.
    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    /// Release the underlying resource now. Later calls are no-ops.
    pub fn close(&mut self) {
        self.done = true;
        if let Some(release) = self.release.take() {
            release(self.yielded);
        }
    }
}

impl<T> Iterator for Cursor<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.done {
            return None;
        }
        match self.items.next() {
            Some(item) => {
                self.yielded += 1;
                Some(item)
            }
            None => {
                self.close();
                None
            }
        }
    }
}

impl<T> Drop for Cursor<'_, T> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.yielded);
        }
    }
}

impl<T> std::fmt::Debug for Cursor<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("yielded", &self.yielded)
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counted(n: usize, releases: &Arc<AtomicUsize>) -> Cursor<'static, usize> {
        let releases = Arc::clone(releases);
        Cursor::new(0..n, move |_| {
            releases.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn releases_on_exhaustion() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut cursor = counted(3, &releases);
        assert_eq!(cursor.by_ref().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(cursor.is_released());
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        drop(cursor);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn releases_on_early_drop() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut cursor = counted(10, &releases);
        assert_eq!(cursor.next(), Some(0));
        drop(cursor);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn close_is_idempotent_and_stops_iteration() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut cursor = counted(5, &releases);
        cursor.next();
        cursor.close();
        cursor.close();
        assert_eq!(cursor.next(), None);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn release_hook_sees_yield_count() {
        let seen = Arc::new(AtomicUsize::new(usize::MAX));
        let seen_in_hook = Arc::clone(&seen);
        let mut cursor = Cursor::new(0..10, move |n| {
            seen_in_hook.store(n, Ordering::SeqCst);
        });
        cursor.next();
        cursor.next();
        drop(cursor);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn detached_cursor_iterates() {
        let cursor = Cursor::detached(vec!["a", "b"].into_iter());
        assert!(cursor.is_released());
        assert_eq!(cursor.count(), 2);
    }
}
