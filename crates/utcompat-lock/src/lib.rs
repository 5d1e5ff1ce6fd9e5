//! Process-wide lock guarding assertion recording.
//!
//! The host engine's result-recording protocol is a multi-step sequence
//! (begin, evaluate, capture, react) over shared run state. Every translated
//! assertion holds the lock returned by [`acquire_global_lock`] for the whole
//! sequence, so at most one thread is ever inside it.
//!
//! The lock is constructed lazily on first use from any thread. Uses manual
//! atomic publication instead of `OnceLock` so the steady-state path is a
//! single acquire load and the construction race is resolved without a
//! secondary blocking primitive.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicPtr, AtomicU8, Ordering};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

const STATE_UNINIT: u8 = 0;
const STATE_INITIALIZING: u8 = 1;
const STATE_READY: u8 = 2;

/// A value constructed at most once, on first access, from any thread.
///
/// Exactly one caller wins the `UNINIT -> INITIALIZING` transition and runs
/// the constructor; the others yield until the value is published as
/// `READY`. After that every access is a single acquire load.
pub struct LazyGlobal<T> {
    state: AtomicU8,
    ptr: AtomicPtr<T>,
    init: fn() -> T,
    _marker: PhantomData<*mut T>,
}

// SAFETY: the value is published once through release/acquire atomics and
// only shared references are handed out afterwards.
unsafe impl<T: Send + Sync> Sync for LazyGlobal<T> {}
// SAFETY: ownership of the boxed value moves with the cell.
unsafe impl<T: Send> Send for LazyGlobal<T> {}

impl<T> LazyGlobal<T> {
    /// Create an empty cell that will run `init` on first access.
    #[must_use]
    pub const fn new(init: fn() -> T) -> Self {
        Self {
            state: AtomicU8::new(STATE_UNINIT),
            ptr: AtomicPtr::new(std::ptr::null_mut()),
            init,
            _marker: PhantomData,
        }
    }

    /// Returns true once the value has been published.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_READY
    }

    /// Get the value, constructing it if this is the first access.
    pub fn get(&self) -> &T {
        // Fast path: already published.
        if self.state.load(Ordering::Acquire) == STATE_READY {
            return self.published();
        }
        self.get_slow()
    }

    #[cold]
    fn get_slow(&self) -> &T {
        loop {
            match self.state.load(Ordering::Acquire) {
                STATE_READY => return self.published(),
                STATE_UNINIT => {
                    if self
                        .state
                        .compare_exchange(
                            STATE_UNINIT,
                            STATE_INITIALIZING,
                            Ordering::Acquire,
                            Ordering::Relaxed,
                        )
                        .is_ok()
                    {
                        return self.construct();
                    }
                }
                _ => std::thread::yield_now(),
            }
        }
    }

    fn construct(&self) -> &T {
        // Hand the slot back if the constructor unwinds so waiters retry
        // instead of spinning on INITIALIZING forever.
        struct Rollback<'a>(&'a AtomicU8);
        impl Drop for Rollback<'_> {
            fn drop(&mut self) {
                self.0.store(STATE_UNINIT, Ordering::Release);
            }
        }

        let rollback = Rollback(&self.state);
        let ptr = Box::into_raw(Box::new((self.init)()));
        std::mem::forget(rollback);

        self.ptr.store(ptr, Ordering::Release);
        self.state.store(STATE_READY, Ordering::Release);
        // SAFETY: `ptr` came from Box::into_raw above and is never freed
        // while `self` is alive.
        unsafe { &*ptr }
    }

    fn published(&self) -> &T {
        let ptr = self.ptr.load(Ordering::Acquire);
        debug_assert!(!ptr.is_null());
        // SAFETY: READY is stored only after `ptr` holds a live Box.
        unsafe { &*ptr }
    }
}

impl<T> Drop for LazyGlobal<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == STATE_READY {
            let ptr = *self.ptr.get_mut();
            // SAFETY: we hold the only reference and the pointer came from
            // Box::into_raw in `construct`.
            unsafe { drop(Box::from_raw(ptr)) };
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for LazyGlobal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut d = f.debug_struct("LazyGlobal");
        if self.is_initialized() {
            d.field("value", self.published());
        } else {
            d.field("value", &"<uninit>");
        }
        d.finish()
    }
}

/// The mutex behind the global lock.
///
/// Reentrant so an asserted expression may call a helper that asserts on the
/// same thread; parking_lot mutexes never poison, so a hard-disposition
/// unwind through a held handle leaves the lock usable.
pub type GlobalMutex = ReentrantMutex<()>;

/// Scoped handle on the global lock; released when dropped.
pub type LockHandle = ReentrantMutexGuard<'static, ()>;

fn new_global_mutex() -> GlobalMutex {
    ReentrantMutex::new(())
}

static GLOBAL_LOCK: LazyGlobal<GlobalMutex> = LazyGlobal::new(new_global_mutex);

/// The single process-wide assertion lock.
#[must_use]
pub fn global_lock() -> &'static GlobalMutex {
    GLOBAL_LOCK.get()
}

/// Acquire the process-wide assertion lock for the current scope.
#[must_use]
pub fn acquire_global_lock() -> LockHandle {
    global_lock().lock()
}

/// Returns true if any thread currently holds the global lock.
#[must_use]
pub fn global_lock_is_held() -> bool {
    GLOBAL_LOCK.is_initialized() && GLOBAL_LOCK.get().is_locked()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn lazy_global_constructs_on_first_access() {
        static BUILDS: AtomicUsize = AtomicUsize::new(0);
        fn build() -> u32 {
            BUILDS.fetch_add(1, Ordering::SeqCst);
            41
        }

        let cell = LazyGlobal::new(build);
        assert!(!cell.is_initialized());
        assert_eq!(BUILDS.load(Ordering::SeqCst), 0);

        assert_eq!(*cell.get(), 41);
        assert!(cell.is_initialized());
        assert_eq!(*cell.get(), 41);
        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn lazy_global_retries_after_constructor_panic() {
        static ATTEMPTS: AtomicUsize = AtomicUsize::new(0);
        fn flaky() -> String {
            if ATTEMPTS.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first construction fails");
            }
            String::from("ok")
        }

        let cell = LazyGlobal::new(flaky);
        let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cell.get().len()));
        assert!(first.is_err());
        assert!(!cell.is_initialized());

        assert_eq!(cell.get(), "ok");
        assert_eq!(ATTEMPTS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn global_lock_is_one_instance() {
        let a = global_lock() as *const GlobalMutex;
        let b = global_lock() as *const GlobalMutex;
        assert_eq!(a, b);
    }

    #[test]
    fn global_lock_is_reentrant_on_one_thread() {
        let outer = acquire_global_lock();
        let inner = acquire_global_lock();
        assert!(global_lock_is_held());
        drop(inner);
        drop(outer);
    }

    #[test]
    fn handle_released_when_scope_unwinds() {
        let result = std::panic::catch_unwind(|| {
            let _handle = acquire_global_lock();
            panic!("unwind while holding the lock");
        });
        assert!(result.is_err());

        // Another thread must be able to take the lock afterwards.
        let taken = std::thread::spawn(|| {
            global_lock()
                .try_lock_for(std::time::Duration::from_secs(5))
                .is_some()
        })
        .join()
        .expect("lock thread");
        assert!(taken);
    }
}
