use core::fmt::{self, Debug, Display, Formatter};
use core::marker::PhantomData;
use core::mem::ManuallyDrop;

use crate::cfg::cell::{UnsafeCell, UnsafeCellWith};
use crate::error::WouldBlock;
use crate::inner::raw::{self as inner, ThreadState};
use crate::relax::{Relax, RelaxWait};

#[cfg(test)]
use crate::test::{LockNew, LockWith};

/// A reader-writer lock with per-thread read state and no protected data.
///
/// Every thread that takes the lock gets its own cache-padded slot. Taking or
/// releasing the read side touches only that slot, so readers on different
/// threads never write to a shared cache line. Taking the write side visits
/// every thread's slot.
///
/// Holds are tracked per thread rather than per guard: each successful
/// [`rdlock`], [`try_rdlock`] or [`wrlock`] must be paired with exactly one
/// [`unlock`] from the same thread. Recursive acquisitions increase the
/// thread's depth. Every thread must release the lock before it exits.
///
/// | state | operation | result |
/// |---|---|---|
/// | unlocked | `rdlock` | read, depth 1 |
/// | unlocked | `wrlock` | write, depth 1 |
/// | read, depth N | `rdlock` | read, depth N+1 |
/// | read, depth 1 | `unlock` | unlocked |
/// | read, depth N | `unlock` | read, depth N-1 |
/// | read, depth N | `upgrade` | write, depth N |
/// | write, depth 1 | `unlock` | unlocked |
/// | write, depth N | `unlock` | read, depth N-1 |
/// | write, depth N | `downgrade` | read, depth N |
///
/// Dropping the lock destroys it. It must not be held by any thread at that
/// point; holds that are still recorded are abandoned.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use fatrwlock::raw::yields::RawFatRwLock;
/// use fatrwlock::ThreadState;
///
/// let lock = Arc::new(RawFatRwLock::new());
/// let c_lock = Arc::clone(&lock);
///
/// lock.rdlock();
/// thread::spawn(move || {
///     // Readers on other threads do not wait on each other.
///     c_lock.rdlock();
///     c_lock.unlock();
/// })
/// .join().expect("thread::spawn failed");
/// assert_eq!(lock.thread_state(), ThreadState::Read { depth: 1 });
/// lock.unlock();
/// ```
///
/// [`rdlock`]: RawFatRwLock::rdlock
/// [`try_rdlock`]: RawFatRwLock::try_rdlock
/// [`wrlock`]: RawFatRwLock::wrlock
/// [`unlock`]: RawFatRwLock::unlock
pub struct RawFatRwLock<R> {
    inner: inner::RawRwLock<RelaxWait<R>>,
}

impl<R> RawFatRwLock<R> {
    /// Creates a new, unlocked lock with no registered threads.
    ///
    /// # Examples
    ///
    /// ```
    /// use fatrwlock::raw::RawFatRwLock;
    /// use fatrwlock::relax::Spin;
    ///
    /// let lock = RawFatRwLock::<Spin>::new();
    /// ```
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self { inner: inner::RawRwLock::new() }
    }

    /// Returns the calling thread's hold on this lock.
    ///
    /// Does not register the calling thread.
    #[inline]
    pub fn thread_state(&self) -> ThreadState {
        self.inner.thread_state()
    }
}

impl<R: Relax> RawFatRwLock<R> {
    /// Acquires the read side, blocking only while a writer holds the lock.
    ///
    /// If the calling thread already holds the lock, read or write, this
    /// increments its depth without waiting.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread's local storage is being destroyed.
    #[inline]
    pub fn rdlock(&self) {
        self.inner.rdlock();
    }

    /// Attempts to acquire the read side without blocking.
    ///
    /// Follows the same recursion rule as [`rdlock`].
    ///
    /// # Errors
    ///
    /// Returns [`WouldBlock`] without changing any state if a writer holds the
    /// lock. If this is the calling thread's first use of the lock, it also
    /// fails whenever the coordination mutex is busy, including while another
    /// thread registers or deregisters its slot.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::thread;
    ///
    /// use fatrwlock::raw::yields::RawFatRwLock;
    ///
    /// let lock = RawFatRwLock::new();
    /// lock.wrlock();
    /// thread::scope(|s| {
    ///     s.spawn(|| assert!(lock.try_rdlock().is_err()));
    /// });
    /// lock.unlock();
    /// assert!(lock.try_rdlock().is_ok());
    /// lock.unlock();
    /// ```
    /// [`rdlock`]: RawFatRwLock::rdlock
    #[inline]
    pub fn try_rdlock(&self) -> Result<(), WouldBlock> {
        self.inner.try_rdlock().then_some(()).ok_or(WouldBlock)
    }

    /// Acquires the write side, blocking until no other thread holds the lock.
    ///
    /// If the calling thread already holds the write side, this increments
    /// its depth.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread holds the read side, see [`upgrade`].
    ///
    /// [`upgrade`]: RawFatRwLock::upgrade
    #[inline]
    #[track_caller]
    pub fn wrlock(&self) {
        self.inner.wrlock();
    }

    /// Releases one level of the calling thread's hold.
    ///
    /// Releasing a nested write hold (depth N > 1) leaves the thread with a
    /// read hold of depth N-1, not a write hold.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread does not hold the lock.
    #[inline]
    #[track_caller]
    pub fn unlock(&self) {
        self.inner.unlock();
    }

    /// Converts the calling thread's read hold into a write hold, keeping its
    /// depth.
    ///
    /// The caller must make sure no other thread is trying to acquire the
    /// write side at the same time. Two threads upgrading concurrently wait on
    /// each other forever.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread does not hold the read side.
    ///
    /// # Examples
    ///
    /// ```
    /// use fatrwlock::raw::yields::RawFatRwLock;
    /// use fatrwlock::ThreadState;
    ///
    /// let lock = RawFatRwLock::new();
    /// lock.rdlock();
    /// lock.upgrade();
    /// assert_eq!(lock.thread_state(), ThreadState::Write { depth: 1 });
    /// lock.downgrade();
    /// assert_eq!(lock.thread_state(), ThreadState::Read { depth: 1 });
    /// lock.unlock();
    /// ```
    #[inline]
    #[track_caller]
    pub fn upgrade(&self) {
        self.inner.upgrade();
    }

    /// Converts the calling thread's write hold into a read hold, keeping its
    /// depth.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread does not hold the write side.
    #[inline]
    #[track_caller]
    pub fn downgrade(&self) {
        self.inner.downgrade();
    }

    /// Returns the number of live threads that have acquired this lock.
    ///
    /// Waits for any writer on another thread to release the lock, so it must
    /// not be called while holding the read side if another thread may be
    /// waiting to write.
    #[inline]
    pub fn registered_threads(&self) -> usize {
        self.inner.registered_threads()
    }
}

impl<R> Default for RawFatRwLock<R> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Debug for RawFatRwLock<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

/// A reader-writer lock protecting shared data, optimized for frequent reads
/// from many threads.
///
/// The data can only be accessed through the RAII guards returned by
/// [`read`], [`try_read`] and [`write`]. Guards are bound to the thread that
/// acquired them and can not be sent to another thread.
///
/// A thread may hold several read guards at once. It may not take a read
/// guard while it holds a write guard, nor a write guard while it holds any
/// guard: doing so panics instead of aliasing the data.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use fatrwlock::raw::yields::FatRwLock;
///
/// const N: usize = 10;
///
/// let data = Arc::new(FatRwLock::new(0));
/// let handles: Vec<_> = (0..N)
///     .map(|_| {
///         let data = Arc::clone(&data);
///         thread::spawn(move || {
///             let current = *data.read();
///             assert!(current <= N);
///             *data.write() += 1;
///         })
///     })
///     .collect();
/// for handle in handles {
///     handle.join().expect("thread::spawn failed");
/// }
/// assert_eq!(*data.read(), N);
/// ```
/// [`read`]: FatRwLock::read
/// [`try_read`]: FatRwLock::try_read
/// [`write`]: FatRwLock::write
pub struct FatRwLock<T: ?Sized, R> {
    raw: RawFatRwLock<R>,
    data: UnsafeCell<T>,
}

// Same unsafe impls as `std::sync::RwLock`.
unsafe impl<T: ?Sized + Send, R> Send for FatRwLock<T, R> {}
unsafe impl<T: ?Sized + Send + Sync, R> Sync for FatRwLock<T, R> {}

impl<T, R> FatRwLock<T, R> {
    /// Creates a new, unlocked lock holding `value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use fatrwlock::raw::yields::FatRwLock;
    ///
    /// let lock = FatRwLock::new(0);
    /// ```
    #[inline]
    pub fn new(value: T) -> Self {
        Self { raw: RawFatRwLock::new(), data: UnsafeCell::new(value) }
    }

    /// Consumes this lock, returning the underlying data.
    ///
    /// # Examples
    ///
    /// ```
    /// use fatrwlock::raw::yields::FatRwLock;
    ///
    /// let lock = FatRwLock::new(String::from("fat"));
    /// assert_eq!(lock.into_inner(), "fat");
    /// ```
    #[cfg(not(all(loom, test)))]
    #[inline]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized, R> FatRwLock<T, R> {
    /// Returns a mutable reference to the underlying data.
    ///
    /// The mutable borrow statically guarantees no guard exists, so no
    /// locking takes place.
    #[cfg(not(all(loom, test)))]
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Returns the calling thread's hold on this lock.
    ///
    /// Every live guard of the calling thread counts one level of depth.
    ///
    /// # Examples
    ///
    /// ```
    /// use fatrwlock::raw::yields::FatRwLock;
    /// use fatrwlock::ThreadState;
    ///
    /// let lock = FatRwLock::new(0);
    /// let guard = lock.write();
    /// assert_eq!(lock.thread_state(), ThreadState::Write { depth: 1 });
    /// drop(guard);
    /// assert_eq!(lock.thread_state(), ThreadState::Unlocked);
    /// ```
    #[inline]
    pub fn thread_state(&self) -> ThreadState {
        self.raw.thread_state()
    }
}

impl<T: ?Sized, R: Relax> FatRwLock<T, R> {
    /// Acquires shared read access, blocking only while a writer holds the
    /// lock.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread holds a write guard for this lock.
    ///
    /// # Examples
    ///
    /// ```
    /// use fatrwlock::raw::yields::FatRwLock;
    ///
    /// let lock = FatRwLock::new(1);
    /// let r1 = lock.read();
    /// let r2 = lock.read();
    /// assert_eq!(*r1 + *r2, 2);
    /// ```
    #[inline]
    #[track_caller]
    pub fn read(&self) -> FatRwLockReadGuard<'_, T, R> {
        if let ThreadState::Write { .. } = self.raw.thread_state() {
            panic!("read of a fat rwlock write locked by the current thread");
        }
        self.raw.rdlock();
        FatRwLockReadGuard::new(self)
    }

    /// Attempts to acquire shared read access without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`WouldBlock`] if a writer holds the lock, including when that
    /// writer is the calling thread. On the calling thread's first use of the
    /// lock, also fails whenever the coordination mutex is busy, see
    /// [`RawFatRwLock::try_rdlock`].
    #[inline]
    pub fn try_read(&self) -> Result<FatRwLockReadGuard<'_, T, R>, WouldBlock> {
        if let ThreadState::Write { .. } = self.raw.thread_state() {
            return Err(WouldBlock);
        }
        self.raw.try_rdlock()?;
        Ok(FatRwLockReadGuard::new(self))
    }

    /// Acquires exclusive write access, blocking until no other thread holds
    /// the lock.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread already holds a guard for this lock.
    ///
    /// # Examples
    ///
    /// ```
    /// use fatrwlock::raw::yields::FatRwLock;
    ///
    /// let lock = FatRwLock::new(1);
    /// *lock.write() += 1;
    /// assert_eq!(*lock.read(), 2);
    /// ```
    #[inline]
    #[track_caller]
    pub fn write(&self) -> FatRwLockWriteGuard<'_, T, R> {
        if self.raw.thread_state() != ThreadState::Unlocked {
            panic!("write of a fat rwlock already held by the current thread");
        }
        self.raw.wrlock();
        FatRwLockWriteGuard::new(self)
    }

    /// Returns the number of live threads that have acquired this lock.
    ///
    /// Waits for any writer on another thread to release the lock, so it must
    /// not be called while holding a read guard if another thread may be
    /// waiting to write.
    #[inline]
    pub fn registered_threads(&self) -> usize {
        self.raw.registered_threads()
    }
}

impl<T: Default, R> Default for FatRwLock<T, R> {
    /// Creates a `FatRwLock<T, R>`, with the `Default` value for `T`.
    #[inline]
    fn default() -> Self {
        Self::new(Default::default())
    }
}

impl<T, R> From<T> for FatRwLock<T, R> {
    /// Creates a `FatRwLock<T, R>` from a instance of `T`.
    #[inline]
    fn from(data: T) -> Self {
        Self::new(data)
    }
}

impl<T: ?Sized + Debug, R: Relax> Debug for FatRwLock<T, R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("FatRwLock");
        match self.try_read() {
            Ok(guard) => guard.with(|data| d.field("data", &data)),
            Err(WouldBlock) => d.field("data", &format_args!("<locked>")),
        };
        d.finish()
    }
}

#[cfg(test)]
impl<T: ?Sized, R> LockNew for FatRwLock<T, R> {
    type Target = T;

    fn new(value: Self::Target) -> Self
    where
        Self::Target: Sized,
    {
        Self::new(value)
    }
}

#[cfg(all(not(loom), test))]
impl<T: ?Sized, R: Relax> LockWith for FatRwLock<T, R> {
    fn read_with<F, Ret>(&self, f: F) -> Ret
    where
        F: FnOnce(&Self::Target) -> Ret,
    {
        f(&self.read())
    }

    fn write_with<F, Ret>(&self, f: F) -> Ret
    where
        F: FnOnce(&mut Self::Target) -> Ret,
    {
        f(&mut self.write())
    }

    fn upgrade_with<F, Ret>(&self, f: F) -> Ret
    where
        F: FnOnce(&mut Self::Target) -> Ret,
    {
        f(&mut FatRwLockReadGuard::upgrade(self.read()))
    }
}

#[cfg(all(loom, test))]
#[cfg(not(tarpaulin_include))]
impl<T: ?Sized, R: Relax> LockWith for FatRwLock<T, R> {
    fn read_with<F, Ret>(&self, f: F) -> Ret
    where
        F: FnOnce(&Self::Target) -> Ret,
    {
        use crate::loom::Guard;
        f(&self.read().deref())
    }

    fn write_with<F, Ret>(&self, f: F) -> Ret
    where
        F: FnOnce(&mut Self::Target) -> Ret,
    {
        use crate::loom::GuardMut;
        f(&mut self.write().deref_mut())
    }

    fn upgrade_with<F, Ret>(&self, f: F) -> Ret
    where
        F: FnOnce(&mut Self::Target) -> Ret,
    {
        use crate::loom::GuardMut;
        f(&mut FatRwLockReadGuard::upgrade(self.read()).deref_mut())
    }
}

#[cfg(all(not(loom), test))]
impl<T: ?Sized, R: Relax> crate::test::LockData for FatRwLock<T, R> {
    fn get_mut(&mut self) -> &mut Self::Target {
        self.get_mut()
    }
}

/// An RAII implementation of a scoped read hold on a [`FatRwLock`]. When this
/// structure is dropped, one level of the thread's read hold is released.
///
/// This structure is returned by the [`read`] and [`try_read`] methods.
///
/// [`read`]: FatRwLock::read
/// [`try_read`]: FatRwLock::try_read
#[must_use = "if unused the FatRwLock will immediately unlock"]
pub struct FatRwLockReadGuard<'a, T: ?Sized, R: Relax> {
    lock: &'a FatRwLock<T, R>,
    // The hold lives in the acquiring thread's slot.
    marker: PhantomData<*const ()>,
}

unsafe impl<T: ?Sized + Sync, R: Relax> Sync for FatRwLockReadGuard<'_, T, R> {}

impl<'a, T: ?Sized, R: Relax> FatRwLockReadGuard<'a, T, R> {
    const fn new(lock: &'a FatRwLock<T, R>) -> Self {
        Self { lock, marker: PhantomData }
    }

    /// Runs `f` against a shared reference pointing to the underlying data.
    fn with<F, Ret>(&self, f: F) -> Ret
    where
        F: FnOnce(&T) -> Ret,
    {
        // SAFETY: A read guard keeps every writer out.
        unsafe { self.lock.data.with_unchecked(f) }
    }

    /// Converts this read guard into a write guard without releasing the
    /// thread's hold in between.
    ///
    /// The caller must make sure no other thread is trying to acquire the
    /// write side at the same time, otherwise both threads wait forever.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread holds other read guards for this lock.
    ///
    /// # Examples
    ///
    /// ```
    /// use fatrwlock::raw::yields::{FatRwLock, FatRwLockReadGuard};
    ///
    /// let lock = FatRwLock::new(Vec::new());
    /// let guard = lock.read();
    /// if guard.is_empty() {
    ///     let mut guard = FatRwLockReadGuard::upgrade(guard);
    ///     guard.push(1);
    /// }
    /// assert_eq!(*lock.read(), [1]);
    /// ```
    #[track_caller]
    pub fn upgrade(this: Self) -> FatRwLockWriteGuard<'a, T, R> {
        if this.lock.raw.thread_state() != (ThreadState::Read { depth: 1 }) {
            panic!("upgrade of a fat rwlock read guard while other read guards are live");
        }
        let this = ManuallyDrop::new(this);
        this.lock.raw.upgrade();
        FatRwLockWriteGuard::new(this.lock)
    }
}

impl<T: ?Sized, R: Relax> Drop for FatRwLockReadGuard<'_, T, R> {
    #[inline]
    fn drop(&mut self) {
        self.lock.raw.unlock();
    }
}

impl<T: ?Sized + Debug, R: Relax> Debug for FatRwLockReadGuard<'_, T, R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.with(|data| data.fmt(f))
    }
}

impl<T: ?Sized + Display, R: Relax> Display for FatRwLockReadGuard<'_, T, R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.with(|data| data.fmt(f))
    }
}

#[cfg(not(all(loom, test)))]
impl<T: ?Sized, R: Relax> core::ops::Deref for FatRwLockReadGuard<'_, T, R> {
    type Target = T;

    /// Dereferences the guard to access the underlying data.
    #[inline(always)]
    fn deref(&self) -> &T {
        // SAFETY: A read guard keeps every writer out.
        unsafe { &*self.lock.data.get() }
    }
}

/// SAFETY: A read guard keeps every writer out, so only shared references to
/// the underlying data exist.
#[cfg(all(loom, test))]
#[cfg(not(tarpaulin_include))]
unsafe impl<T: ?Sized, R: Relax> crate::loom::Guard for FatRwLockReadGuard<'_, T, R> {
    type Target = T;

    fn get(&self) -> &loom::cell::UnsafeCell<Self::Target> {
        &self.lock.data
    }
}

/// An RAII implementation of a scoped write hold on a [`FatRwLock`]. When this
/// structure is dropped, the write hold is released.
///
/// This structure is returned by the [`write`] method.
///
/// [`write`]: FatRwLock::write
#[must_use = "if unused the FatRwLock will immediately unlock"]
pub struct FatRwLockWriteGuard<'a, T: ?Sized, R: Relax> {
    lock: &'a FatRwLock<T, R>,
    // The hold lives in the acquiring thread's slot.
    marker: PhantomData<*const ()>,
}

unsafe impl<T: ?Sized + Sync, R: Relax> Sync for FatRwLockWriteGuard<'_, T, R> {}

impl<'a, T: ?Sized, R: Relax> FatRwLockWriteGuard<'a, T, R> {
    const fn new(lock: &'a FatRwLock<T, R>) -> Self {
        Self { lock, marker: PhantomData }
    }

    /// Runs `f` against a shared reference pointing to the underlying data.
    fn with<F, Ret>(&self, f: F) -> Ret
    where
        F: FnOnce(&T) -> Ret,
    {
        // SAFETY: A write guard holds the lock exclusively.
        unsafe { self.lock.data.with_unchecked(f) }
    }

    /// Converts this write guard into a read guard without letting another
    /// writer in between.
    ///
    /// # Examples
    ///
    /// ```
    /// use fatrwlock::raw::yields::{FatRwLock, FatRwLockWriteGuard};
    ///
    /// let lock = FatRwLock::new(0);
    /// let mut guard = lock.write();
    /// *guard = 7;
    /// let guard = FatRwLockWriteGuard::downgrade(guard);
    /// assert_eq!(*guard, 7);
    /// ```
    #[track_caller]
    pub fn downgrade(this: Self) -> FatRwLockReadGuard<'a, T, R> {
        let this = ManuallyDrop::new(this);
        this.lock.raw.downgrade();
        FatRwLockReadGuard::new(this.lock)
    }
}

impl<T: ?Sized, R: Relax> Drop for FatRwLockWriteGuard<'_, T, R> {
    #[inline]
    fn drop(&mut self) {
        self.lock.raw.unlock();
    }
}

impl<T: ?Sized + Debug, R: Relax> Debug for FatRwLockWriteGuard<'_, T, R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.with(|data| data.fmt(f))
    }
}

impl<T: ?Sized + Display, R: Relax> Display for FatRwLockWriteGuard<'_, T, R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.with(|data| data.fmt(f))
    }
}

#[cfg(not(all(loom, test)))]
impl<T: ?Sized, R: Relax> core::ops::Deref for FatRwLockWriteGuard<'_, T, R> {
    type Target = T;

    /// Dereferences the guard to access the underlying data.
    #[inline(always)]
    fn deref(&self) -> &T {
        // SAFETY: A write guard holds the lock exclusively.
        unsafe { &*self.lock.data.get() }
    }
}

#[cfg(not(all(loom, test)))]
impl<T: ?Sized, R: Relax> core::ops::DerefMut for FatRwLockWriteGuard<'_, T, R> {
    /// Mutably dereferences the guard to access the underlying data.
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: A write guard holds the lock exclusively.
        unsafe { &mut *self.lock.data.get() }
    }
}

/// SAFETY: A write guard holds the lock exclusively, with exclusive access to
/// the underlying data.
#[cfg(all(loom, test))]
#[cfg(not(tarpaulin_include))]
unsafe impl<T: ?Sized, R: Relax> crate::loom::Guard for FatRwLockWriteGuard<'_, T, R> {
    type Target = T;

    fn get(&self) -> &loom::cell::UnsafeCell<Self::Target> {
        &self.lock.data
    }
}

/// SAFETY: Same as the `Guard` impl above.
#[cfg(all(loom, test))]
#[cfg(not(tarpaulin_include))]
unsafe impl<T: ?Sized, R: Relax> crate::loom::GuardMut for FatRwLockWriteGuard<'_, T, R> {}

#[cfg(all(not(loom), test))]
mod test {
    use crate::inner::raw::ThreadState;
    use crate::relax::{SpinBackoff, Yield};
    use crate::test::tests;

    type FatRwLock<T> = super::FatRwLock<T, Yield>;
    type RawFatRwLock = super::RawFatRwLock<Yield>;

    #[test]
    fn lots_and_lots_lock() {
        tests::lots_and_lots_lock::<FatRwLock<_>>();
    }

    #[test]
    fn lots_and_lots_lock_backoff() {
        tests::lots_and_lots_lock::<super::FatRwLock<_, SpinBackoff>>();
    }

    #[test]
    fn smoke() {
        tests::smoke::<FatRwLock<_>>();
    }

    #[test]
    fn test_guard_debug_display() {
        let value = 42;
        let lock = FatRwLock::new(value);
        tests::test_guard_debug_display(value, lock.read());
        tests::test_guard_debug_display(value, lock.write());
    }

    #[test]
    fn test_rwlock_debug() {
        tests::test_rwlock_debug::<FatRwLock<_>>();
    }

    #[test]
    fn test_rwlock_debug_locked() {
        let lock = FatRwLock::new(42);
        let _guard = lock.write();
        std::thread::scope(|s| {
            s.spawn(|| assert_eq!(format!("{lock:?}"), "FatRwLock { data: <locked> }"));
        });
    }

    #[test]
    fn test_rwlock_default() {
        tests::test_rwlock_default::<FatRwLock<_>>();
    }

    #[test]
    fn test_rwlock_from() {
        tests::test_rwlock_from::<FatRwLock<_>>();
    }

    #[test]
    fn test_get_mut() {
        tests::test_get_mut::<FatRwLock<_>>();
    }

    #[test]
    fn test_into_inner() {
        let lock = FatRwLock::new(tests::NonCopy(10));
        assert_eq!(lock.into_inner(), tests::NonCopy(10));
    }

    #[test]
    fn test_lock_arc_access_in_unwind() {
        tests::test_lock_arc_access_in_unwind::<FatRwLock<_>>();
    }

    #[test]
    fn test_lock_unsized() {
        tests::test_lock_unsized::<FatRwLock<_>>();
    }

    #[test]
    fn state_table() {
        tests::state_table::<Yield>();
    }

    #[test]
    fn nested_write_unlocks_to_read() {
        tests::nested_write_unlocks_to_read::<Yield>();
    }

    #[test]
    fn upgrade_downgrade_round_trip() {
        tests::upgrade_downgrade_round_trip::<Yield>();
    }

    #[test]
    fn recursive_readers_across_threads() {
        tests::recursive_readers_across_threads::<Yield>();
    }

    #[test]
    fn writer_excludes_try_rdlock() {
        tests::writer_excludes_try_rdlock::<Yield>();
    }

    #[test]
    fn readers_do_not_block_each_other() {
        tests::readers_do_not_block_each_other::<Yield>();
    }

    #[test]
    fn thread_exit_deregisters_slot() {
        tests::thread_exit_deregisters_slot::<Yield>();
    }

    #[test]
    fn thread_exit_while_holding_releases() {
        tests::thread_exit_while_holding_releases::<Yield>();
    }

    #[test]
    fn writer_waits_for_reader() {
        tests::writer_waits_for_reader::<Yield>();
    }

    #[test]
    fn upgrade_excludes_other_readers() {
        tests::upgrade_excludes_other_readers::<Yield>();
    }

    #[test]
    fn destroyed_lock_is_pruned() {
        tests::destroyed_lock_is_pruned::<Yield>();
    }

    #[test]
    #[should_panic = "unlock on a fat rwlock not held by the current thread"]
    fn unlock_without_hold_panics() {
        RawFatRwLock::new().unlock();
    }

    #[test]
    #[should_panic = "upgrade on a fat rwlock not read locked by the current thread"]
    fn upgrade_without_read_panics() {
        RawFatRwLock::new().upgrade();
    }

    #[test]
    #[should_panic = "downgrade on a fat rwlock not write locked by the current thread"]
    fn downgrade_without_write_panics() {
        let lock = RawFatRwLock::new();
        lock.rdlock();
        lock.downgrade();
    }

    #[test]
    #[should_panic = "use upgrade"]
    fn wrlock_while_read_panics() {
        let lock = RawFatRwLock::new();
        lock.rdlock();
        lock.wrlock();
    }

    #[test]
    #[should_panic = "read of a fat rwlock write locked by the current thread"]
    fn read_while_write_guard_panics() {
        let lock = FatRwLock::new(0);
        let _guard = lock.write();
        let _guard = lock.read();
    }

    #[test]
    #[should_panic = "write of a fat rwlock already held by the current thread"]
    fn write_while_read_guard_panics() {
        let lock = FatRwLock::new(0);
        let _guard = lock.read();
        let _guard = lock.write();
    }

    #[test]
    #[should_panic = "while other read guards are live"]
    fn upgrade_nested_read_guard_panics() {
        let lock = FatRwLock::new(0);
        let _outer = lock.read();
        let inner = lock.read();
        let _guard = super::FatRwLockReadGuard::upgrade(inner);
    }

    #[test]
    fn write_guard_excludes_other_threads() {
        let lock = FatRwLock::new(0);
        let mut guard = lock.write();
        *guard = 1;
        assert_eq!(lock.thread_state(), ThreadState::Write { depth: 1 });
        std::thread::scope(|s| {
            s.spawn(|| {
                assert!(lock.try_read().is_err());
                assert_eq!(lock.thread_state(), ThreadState::Unlocked);
            });
        });
        *guard = 2;
        drop(guard);
        assert_eq!(lock.thread_state(), ThreadState::Unlocked);
        assert_eq!(*lock.read(), 2);
    }

    #[test]
    fn read_guards_count_as_depth() {
        let lock = FatRwLock::new(0);
        let r1 = lock.read();
        let r2 = lock.read();
        assert_eq!(lock.thread_state(), ThreadState::Read { depth: 2 });
        drop(r1);
        assert_eq!(lock.thread_state(), ThreadState::Read { depth: 1 });
        drop(r2);
        assert_eq!(lock.thread_state(), ThreadState::Unlocked);
        assert_eq!(lock.registered_threads(), 1);
    }

    #[test]
    fn try_read_while_write_guard_would_block() {
        let lock = FatRwLock::new(0);
        let _guard = lock.write();
        assert!(lock.try_read().is_err());
    }
}

#[cfg(all(loom, test))]
mod model {
    use crate::loom::models;
    use crate::relax::Yield;

    type FatRwLock<T> = super::FatRwLock<T, Yield>;

    #[test]
    fn write_join() {
        models::write_join::<FatRwLock<_>>();
    }

    #[test]
    fn read_write_join() {
        models::read_write_join::<FatRwLock<_>>();
    }

    #[test]
    fn upgrade_join() {
        models::upgrade_join::<FatRwLock<_>>();
    }
}
