//! Fat reader-writer lock implementation.
//!
//! A fat lock keeps one record, or slot, for every thread that has ever
//! acquired it. Each slot carries a private gate on its own cache line. A
//! reader closes only its own thread's gate, so readers on different threads
//! never synchronize with each other. A writer first takes the coordination
//! gate, which excludes other writers and freezes the set of slots, and then
//! closes every thread's gate.
//!
//! Slots are created lazily on a thread's first acquisition and removed when
//! the thread exits. The lock itself owns the registry of slots. Each thread
//! finds its own slot through thread local storage.
//!
//! Two lock types are provided: [`RawFatRwLock`] exposes the per-thread
//! `rdlock`/`wrlock`/`unlock` protocol directly, including recursion and
//! upgrade/downgrade, and [`FatRwLock`] protects a value behind RAII guards.
//!
//! Both types are generic over the waiting policy applied while a gate is
//! held elsewhere. The policy is any type implementing [`Relax`]. The
//! following modules provide type aliases bound to one of the policies from
//! the [`relax`] module.
//!
//! [`relax`]: crate::relax
//! [`Relax`]: crate::relax::Relax

mod rwlock;
pub use rwlock::{FatRwLock, FatRwLockReadGuard, FatRwLockWriteGuard, RawFatRwLock};

/// A fat lock that implements a `spin` relax policy.
///
/// While waiting, the lock spins while signaling the processor that it is
/// running a busy-wait spin-loop.
pub mod spins {
    use super::rwlock;
    use crate::relax::Spin;

    /// A [`raw::FatRwLock`] that implements the [`Spin`] relax policy.
    ///
    /// # Example
    ///
    /// ```
    /// use fatrwlock::raw::spins::FatRwLock;
    ///
    /// let lock = FatRwLock::new(0);
    /// assert_eq!(*lock.read(), 0);
    /// ```
    /// [`raw::FatRwLock`]: rwlock::FatRwLock
    pub type FatRwLock<T> = rwlock::FatRwLock<T, Spin>;

    /// A [`raw::RawFatRwLock`] that implements the [`Spin`] relax policy.
    ///
    /// [`raw::RawFatRwLock`]: rwlock::RawFatRwLock
    pub type RawFatRwLock = rwlock::RawFatRwLock<Spin>;

    /// A [`raw::FatRwLockReadGuard`] that implements the [`Spin`] relax
    /// policy.
    ///
    /// [`raw::FatRwLockReadGuard`]: rwlock::FatRwLockReadGuard
    pub type FatRwLockReadGuard<'a, T> = rwlock::FatRwLockReadGuard<'a, T, Spin>;

    /// A [`raw::FatRwLockWriteGuard`] that implements the [`Spin`] relax
    /// policy.
    ///
    /// [`raw::FatRwLockWriteGuard`]: rwlock::FatRwLockWriteGuard
    pub type FatRwLockWriteGuard<'a, T> = rwlock::FatRwLockWriteGuard<'a, T, Spin>;

    /// A fat lock that implements a `spin with backoff` relax policy.
    ///
    /// While waiting, the lock performs exponential backoff while spinning,
    /// signaling the processor that it is running a busy-wait spin-loop.
    pub mod backoff {
        use super::rwlock;
        use crate::relax::SpinBackoff;

        /// A [`raw::FatRwLock`] that implements the [`SpinBackoff`] relax
        /// policy.
        ///
        /// # Example
        ///
        /// ```
        /// use fatrwlock::raw::spins::backoff::FatRwLock;
        ///
        /// let lock = FatRwLock::new(0);
        /// assert_eq!(*lock.read(), 0);
        /// ```
        /// [`raw::FatRwLock`]: rwlock::FatRwLock
        pub type FatRwLock<T> = rwlock::FatRwLock<T, SpinBackoff>;

        /// A [`raw::RawFatRwLock`] that implements the [`SpinBackoff`] relax
        /// policy.
        ///
        /// [`raw::RawFatRwLock`]: rwlock::RawFatRwLock
        pub type RawFatRwLock = rwlock::RawFatRwLock<SpinBackoff>;

        /// A [`raw::FatRwLockReadGuard`] that implements the [`SpinBackoff`]
        /// relax policy.
        ///
        /// [`raw::FatRwLockReadGuard`]: rwlock::FatRwLockReadGuard
        pub type FatRwLockReadGuard<'a, T> = rwlock::FatRwLockReadGuard<'a, T, SpinBackoff>;

        /// A [`raw::FatRwLockWriteGuard`] that implements the [`SpinBackoff`]
        /// relax policy.
        ///
        /// [`raw::FatRwLockWriteGuard`]: rwlock::FatRwLockWriteGuard
        pub type FatRwLockWriteGuard<'a, T> = rwlock::FatRwLockWriteGuard<'a, T, SpinBackoff>;
    }
}

/// A fat lock that implements a `yield` relax policy.
///
/// While waiting, the lock yields the current time slice to the OS
/// scheduler. This is the policy to reach for when writers may wait on long
/// read sections.
pub mod yields {
    use super::rwlock;
    use crate::relax::Yield;

    /// A [`raw::FatRwLock`] that implements the [`Yield`] relax policy.
    ///
    /// # Example
    ///
    /// ```
    /// use fatrwlock::raw::yields::FatRwLock;
    ///
    /// let lock = FatRwLock::new(0);
    /// assert_eq!(*lock.read(), 0);
    /// ```
    /// [`raw::FatRwLock`]: rwlock::FatRwLock
    pub type FatRwLock<T> = rwlock::FatRwLock<T, Yield>;

    /// A [`raw::RawFatRwLock`] that implements the [`Yield`] relax policy.
    ///
    /// [`raw::RawFatRwLock`]: rwlock::RawFatRwLock
    pub type RawFatRwLock = rwlock::RawFatRwLock<Yield>;

    /// A [`raw::FatRwLockReadGuard`] that implements the [`Yield`] relax
    /// policy.
    ///
    /// [`raw::FatRwLockReadGuard`]: rwlock::FatRwLockReadGuard
    pub type FatRwLockReadGuard<'a, T> = rwlock::FatRwLockReadGuard<'a, T, Yield>;

    /// A [`raw::FatRwLockWriteGuard`] that implements the [`Yield`] relax
    /// policy.
    ///
    /// [`raw::FatRwLockWriteGuard`]: rwlock::FatRwLockWriteGuard
    pub type FatRwLockWriteGuard<'a, T> = rwlock::FatRwLockWriteGuard<'a, T, Yield>;

    /// A fat lock that implements a `yield with backoff` relax policy.
    ///
    /// While waiting, the lock performs exponential backoff while spinning,
    /// up to a threshold, then yields back to the OS scheduler.
    pub mod backoff {
        use super::rwlock;
        use crate::relax::YieldBackoff;

        /// A [`raw::FatRwLock`] that implements the [`YieldBackoff`] relax
        /// policy.
        ///
        /// # Example
        ///
        /// ```
        /// use fatrwlock::raw::yields::backoff::FatRwLock;
        ///
        /// let lock = FatRwLock::new(0);
        /// assert_eq!(*lock.read(), 0);
        /// ```
        /// [`raw::FatRwLock`]: rwlock::FatRwLock
        pub type FatRwLock<T> = rwlock::FatRwLock<T, YieldBackoff>;

        /// A [`raw::RawFatRwLock`] that implements the [`YieldBackoff`] relax
        /// policy.
        ///
        /// [`raw::RawFatRwLock`]: rwlock::RawFatRwLock
        pub type RawFatRwLock = rwlock::RawFatRwLock<YieldBackoff>;

        /// A [`raw::FatRwLockReadGuard`] that implements the [`YieldBackoff`]
        /// relax policy.
        ///
        /// [`raw::FatRwLockReadGuard`]: rwlock::FatRwLockReadGuard
        pub type FatRwLockReadGuard<'a, T> = rwlock::FatRwLockReadGuard<'a, T, YieldBackoff>;

        /// A [`raw::FatRwLockWriteGuard`] that implements the [`YieldBackoff`]
        /// relax policy.
        ///
        /// [`raw::FatRwLockWriteGuard`]: rwlock::FatRwLockWriteGuard
        pub type FatRwLockWriteGuard<'a, T> = rwlock::FatRwLockWriteGuard<'a, T, YieldBackoff>;
    }
}

/// A fat lock that implements a `loop` relax policy.
///
/// While waiting, the lock rapidly spins without telling the CPU to do any
/// power down.
pub mod loops {
    use super::rwlock;
    use crate::relax::Loop;

    /// A [`raw::FatRwLock`] that implements the [`Loop`] relax policy.
    ///
    /// # Example
    ///
    /// ```
    /// use fatrwlock::raw::loops::FatRwLock;
    ///
    /// let lock = FatRwLock::new(0);
    /// assert_eq!(*lock.read(), 0);
    /// ```
    /// [`raw::FatRwLock`]: rwlock::FatRwLock
    pub type FatRwLock<T> = rwlock::FatRwLock<T, Loop>;

    /// A [`raw::RawFatRwLock`] that implements the [`Loop`] relax policy.
    ///
    /// [`raw::RawFatRwLock`]: rwlock::RawFatRwLock
    pub type RawFatRwLock = rwlock::RawFatRwLock<Loop>;

    /// A [`raw::FatRwLockReadGuard`] that implements the [`Loop`] relax
    /// policy.
    ///
    /// [`raw::FatRwLockReadGuard`]: rwlock::FatRwLockReadGuard
    pub type FatRwLockReadGuard<'a, T> = rwlock::FatRwLockReadGuard<'a, T, Loop>;

    /// A [`raw::FatRwLockWriteGuard`] that implements the [`Loop`] relax
    /// policy.
    ///
    /// [`raw::FatRwLockWriteGuard`]: rwlock::FatRwLockWriteGuard
    pub type FatRwLockWriteGuard<'a, T> = rwlock::FatRwLockWriteGuard<'a, T, Loop>;
}

#[cfg(all(not(loom), test))]
mod test {
    use crate::test::tests;

    #[test]
    fn spins_lots_and_lots_lock() {
        tests::lots_and_lots_lock::<super::spins::FatRwLock<_>>();
    }

    #[test]
    fn spins_backoff_state_table() {
        tests::state_table::<crate::relax::SpinBackoff>();
    }

    #[test]
    fn yields_backoff_lots_and_lots_lock() {
        tests::lots_and_lots_lock::<super::yields::backoff::FatRwLock<_>>();
    }

    #[test]
    fn yields_backoff_upgrade_downgrade_round_trip() {
        tests::upgrade_downgrade_round_trip::<crate::relax::YieldBackoff>();
    }

    #[test]
    fn spins_backoff_thread_exit_while_holding_releases() {
        tests::thread_exit_while_holding_releases::<crate::relax::SpinBackoff>();
    }

    #[test]
    fn loops_smoke() {
        tests::smoke::<super::loops::FatRwLock<_>>();
    }
}
