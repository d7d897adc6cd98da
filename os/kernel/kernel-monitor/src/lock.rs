//! # Page-Table Lock
//!
//! `setperm` mutates page tables that other subsystems own. The monitor does
//! not lock on its own behalf inside the inspector; instead the page walker is
//! handed over wrapped in a [`PageTableLock`], and the command acquires it for
//! exactly the duration of the walk and mutation. The guard releases on every
//! exit path, including unwinding panics.

use core::{
    cell::UnsafeCell,
    hint::spin_loop,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, Ordering},
};

/// A test-and-test-and-set spin lock around a page-table handle.
///
/// `T` may be unsized, so `&PageTableLock<W>` coerces to
/// `&PageTableLock<dyn PageWalker>`.
pub struct PageTableLock<T: ?Sized> {
    /// * `false`: unlocked
    /// * `true`: locked
    locked: AtomicBool,
    inner: UnsafeCell<T>,
}

// Safety: mutual exclusion; only T: Send may cross threads.
unsafe impl<T: ?Sized + Send> Sync for PageTableLock<T> {}

impl<T> PageTableLock<T> {
    pub const fn new(inner: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            inner: UnsafeCell::new(inner),
        }
    }

    /// Unwrap the protected value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: ?Sized> PageTableLock<T> {
    /// Try once; returns immediately.
    #[inline]
    pub fn try_lock(&self) -> Option<PageTableGuard<'_, T>> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(PageTableGuard { lock: self })
        } else {
            None
        }
    }

    /// Spin until acquired, then return a guard.
    #[inline]
    pub fn lock(&self) -> PageTableGuard<'_, T> {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            // Spin on a plain load until the holder releases.
            while self.locked.load(Ordering::Relaxed) {
                spin_loop();
            }
        }
        PageTableGuard { lock: self }
    }

    /// Run `f` with the lock held.
    #[inline]
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut g = self.lock();
        f(&mut g)
    }

    /// Whether some guard currently holds the lock.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// Mutable access when you have `&mut self` (no contention possible).
    #[inline]
    pub const fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }
}

/// Scoped ownership of a [`PageTableLock`]; unlocks on drop.
pub struct PageTableGuard<'a, T: ?Sized> {
    lock: &'a PageTableLock<T>,
}

impl<T: ?Sized> Deref for PageTableGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.inner.get() }
    }
}

impl<T: ?Sized> DerefMut for PageTableGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.inner.get() }
    }
}

impl<T: ?Sized> Drop for PageTableGuard<'_, T> {
    fn drop(&mut self) {
        // Release publishes the page-table writes made under the guard.
        self.lock.locked.store(false, Ordering::Release);
    }
}
