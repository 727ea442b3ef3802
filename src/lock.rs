use core::sync::atomic::Ordering::{Acquire, Relaxed, Release};

use crate::cfg::atomic::AtomicBool;
use crate::relax::Relax;

/// A trait for the binary gates the fat lock is built from.
///
/// Both the coordination mutex and every per-thread slot mutex are gates. A
/// gate is not bound to a guard: it can be acquired by one call and released
/// by another, and a writer releases gates that belong to other threads.
pub trait Lock {
    /// Creates a new, unlocked gate.
    fn unlocked() -> Self;

    /// Attempts to close the gate without waiting, returning `true` on
    /// success.
    fn try_lock_acquire(&self) -> bool;

    /// Closes the gate, waiting according to `W` while it is held elsewhere.
    fn lock_wait<W: Wait>(&self);

    /// Opens the gate, letting one waiter through.
    fn notify_release(&self);

    /// Returns `true` if the gate is currently closed.
    #[cfg(test)]
    fn is_locked(&self) -> bool;
}

/// A trait for waiting policies applied while a gate is held elsewhere.
pub trait Wait: Relax + Sized {
    /// Runs the relax policy for as long as `f` returns `true`.
    #[inline]
    fn wait_while<F: FnMut() -> bool>(mut f: F) {
        let mut waiter = Self::new();
        while f() {
            waiter.relax();
        }
    }
}

impl Lock for AtomicBool {
    #[inline(always)]
    fn unlocked() -> Self {
        Self::new(false)
    }

    #[inline(always)]
    fn try_lock_acquire(&self) -> bool {
        self.compare_exchange(false, true, Acquire, Relaxed).is_ok()
    }

    #[inline]
    fn lock_wait<W: Wait>(&self) {
        // Test and test-and-set.
        while !self.try_lock_acquire() {
            W::wait_while(|| self.load(Relaxed));
        }
    }

    #[inline(always)]
    fn notify_release(&self) {
        self.store(false, Release);
    }

    #[cfg(test)]
    fn is_locked(&self) -> bool {
        self.load(Relaxed)
    }
}

#[cfg(all(not(loom), test))]
mod test {
    use super::{AtomicBool, Lock};
    use crate::relax::{RelaxWait, Yield};

    #[test]
    fn gate_excludes_second_acquire() {
        let gate = <AtomicBool as Lock>::unlocked();
        assert!(gate.try_lock_acquire());
        assert!(gate.is_locked());
        assert!(!gate.try_lock_acquire());
        gate.notify_release();
        assert!(!gate.is_locked());
        gate.lock_wait::<RelaxWait<Yield>>();
        assert!(gate.is_locked());
    }

    #[test]
    fn gate_released_by_other_thread() {
        let gate = <AtomicBool as Lock>::unlocked();
        gate.lock_wait::<RelaxWait<Yield>>();
        std::thread::scope(|s| {
            s.spawn(|| gate.notify_release());
        });
        assert!(gate.try_lock_acquire());
    }
}
