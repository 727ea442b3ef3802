use core::fmt::{self, Debug, Formatter};
use core::marker::PhantomData;
use core::sync::atomic::{AtomicUsize, Ordering::Relaxed};

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use crossbeam_utils::CachePadded;

use crate::cfg::atomic::AtomicBool;
use crate::cfg::cell::{UnsafeCell, UnsafeCellWith};
use crate::cfg::thread::{self, ThreadId};
use crate::lock::{Lock, Wait};

mod thread_local;
use thread_local::{LocalSlot, Status};

/// Source of lock identities, which key the per-thread slot store.
///
/// Identities are never reused, so a thread's stale record for a destroyed
/// lock can never be mistaken for a record of a newer lock.
static NEXT_LOCK_ID: AtomicUsize = AtomicUsize::new(0);

/// Number of per-lock records the calling thread keeps.
#[cfg(test)]
pub(crate) fn thread_records() -> usize {
    thread_local::record_count()
}

/// The hold the calling thread has on a fat lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ThreadState {
    /// The thread does not hold the lock.
    Unlocked,
    /// The thread holds the read side, `depth` times.
    Read {
        /// Number of unlocks required to leave the read side.
        depth: usize,
    },
    /// The thread holds the write side at recursion `depth`.
    Write {
        /// Current recursion depth of the hold.
        depth: usize,
    },
}

/// The shared half of a thread's bookkeeping record.
///
/// Other threads only ever touch the gate: a writer proves exclusivity over
/// the owning thread by closing it. The hold status and recursion depth stay
/// with the owning thread, see [`LocalSlot`].
pub(crate) struct Slot {
    owner: ThreadId,
    gate: CachePadded<AtomicBool>,
}

impl Slot {
    /// Creates an unlocked slot owned by the calling thread.
    fn new() -> Self {
        let owner = thread::current().id();
        let gate = CachePadded::new(AtomicBool::unlocked());
        Self { owner, gate }
    }
}

impl Debug for Slot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot").field("owner", &self.owner).finish_non_exhaustive()
    }
}

/// Live slots in registration order, keyed by a never reused sequence number.
#[derive(Default)]
struct Registry {
    next: u64,
    slots: BTreeMap<u64, Arc<Slot>>,
}

/// The state shared between a lock handle and every thread's local record.
pub(crate) struct Shared {
    id: usize,
    coordination: AtomicBool,
    registry: UnsafeCell<Registry>,
}

// SAFETY: The registry is only accessed while the coordination gate is held,
// which serializes every access to it across threads.
unsafe impl Sync for Shared {}

impl Shared {
    fn new() -> Self {
        let id = NEXT_LOCK_ID.fetch_add(1, Relaxed);
        let coordination = AtomicBool::unlocked();
        let registry = UnsafeCell::new(Registry::default());
        Self { id, coordination, registry }
    }

    /// Runs `f` against the registry.
    ///
    /// # Safety
    ///
    /// The coordination gate must be held by the calling thread.
    unsafe fn with_registry<F, Ret>(&self, f: F) -> Ret
    where
        F: FnOnce(&mut Registry) -> Ret,
    {
        // SAFETY: Caller holds the coordination gate, so no other thread is
        // accessing the registry.
        unsafe { self.registry.with_mut_unchecked(f) }
    }

    /// Registers a new slot for the calling thread. The thread will take the
    /// coordination gate with `W` when it deregisters the slot.
    ///
    /// # Safety
    ///
    /// The coordination gate must be held by the calling thread.
    unsafe fn insert_slot<W: Wait>(self: &Arc<Self>) -> LocalSlot {
        let slot = Arc::new(Slot::new());
        // SAFETY: Caller holds the coordination gate.
        let key = unsafe {
            self.with_registry(|registry| {
                let key = registry.next;
                registry.next += 1;
                registry.slots.insert(key, Arc::clone(&slot));
                key
            })
        };
        log::trace!("fat rwlock {}: registered slot {key} for {:?}", self.id, slot.owner);
        LocalSlot::new(self, key, slot, <AtomicBool as Lock>::lock_wait::<W>)
    }

    /// Removes a slot from the registry.
    ///
    /// # Safety
    ///
    /// The coordination gate must be held by the calling thread.
    unsafe fn remove_slot(&self, key: u64) {
        // SAFETY: Caller holds the coordination gate.
        if let Some(slot) = unsafe { self.with_registry(|registry| registry.slots.remove(&key)) } {
            log::trace!("fat rwlock {}: deregistered slot {key} of {:?}", self.id, slot.owner);
        }
    }

    /// Closes the gate of every registered slot, waiting on each in turn.
    ///
    /// # Safety
    ///
    /// The coordination gate must be held by the calling thread.
    unsafe fn acquire_all<W: Wait>(&self) {
        // SAFETY: Caller holds the coordination gate.
        unsafe {
            self.with_registry(|registry| {
                for slot in registry.slots.values() {
                    slot.gate.lock_wait::<W>();
                }
            });
        }
    }

    /// Closes the gate of every registered slot except `own`.
    ///
    /// # Safety
    ///
    /// The coordination gate must be held by the calling thread.
    unsafe fn acquire_others<W: Wait>(&self, own: &Arc<Slot>) {
        // SAFETY: Caller holds the coordination gate.
        unsafe {
            self.with_registry(|registry| {
                for slot in registry.slots.values().filter(|slot| !Arc::ptr_eq(slot, own)) {
                    slot.gate.lock_wait::<W>();
                }
            });
        }
    }

    /// Opens the gate of every registered slot except `own`.
    ///
    /// # Safety
    ///
    /// The calling thread must hold the write side, which means it holds the
    /// coordination gate and every other slot's gate.
    unsafe fn release_others(&self, own: &Arc<Slot>) {
        // SAFETY: Caller holds the coordination gate.
        unsafe {
            self.with_registry(|registry| {
                for slot in registry.slots.values().filter(|slot| !Arc::ptr_eq(slot, own)) {
                    slot.gate.notify_release();
                }
            });
        }
    }

    /// Number of registered slots.
    ///
    /// # Safety
    ///
    /// The coordination gate must be held by the calling thread.
    unsafe fn slot_count(&self) -> usize {
        // SAFETY: Caller holds the coordination gate.
        unsafe { self.with_registry(|registry| registry.slots.len()) }
    }
}

/// A reader-writer lock that keeps one gate per participating thread.
///
/// Readers close only their own thread's gate. Writers take the coordination
/// gate, which freezes the registry, and then close every thread's gate.
pub struct RawRwLock<W> {
    shared: Arc<Shared>,
    wait: PhantomData<fn() -> W>,
}

impl<W> RawRwLock<W> {
    /// Creates a new, unlocked lock with no registered threads.
    pub fn new() -> Self {
        Self { shared: Arc::new(Shared::new()), wait: PhantomData }
    }

    /// Returns the calling thread's hold on this lock.
    pub fn thread_state(&self) -> ThreadState {
        thread_local::find(&self.shared).map_or(ThreadState::Unlocked, |local| local.state())
    }

    /// Returns the calling thread's record, panicking if it does not hold the
    /// lock with `expected` status.
    #[track_caller]
    fn held(&self, expected: Status, op: &str) -> Rc<LocalSlot> {
        match thread_local::find(&self.shared) {
            Some(local) if local.status() == expected => local,
            _ => panic!("{op} on a fat rwlock not {expected} by the current thread"),
        }
    }
}

impl<W: Wait> RawRwLock<W> {
    /// Returns the calling thread's record, registering a new slot if this is
    /// the thread's first use of the lock.
    fn local(&self) -> Rc<LocalSlot> {
        thread_local::get_or_insert_with(&self.shared, |shared| {
            shared.coordination.lock_wait::<W>();
            // SAFETY: We hold the coordination gate.
            let local = unsafe { shared.insert_slot::<W>() };
            shared.coordination.notify_release();
            local
        })
    }

    /// Acquires the read side, blocking while a writer holds this thread's
    /// slot.
    pub fn rdlock(&self) {
        let local = self.local();
        match local.status() {
            Status::Unlocked => {
                local.slot.gate.lock_wait::<W>();
                local.set(Status::ReadLocked, 1);
            }
            Status::ReadLocked | Status::WriteLocked => local.enter(),
        }
    }

    /// Attempts to acquire the read side without blocking.
    ///
    /// Returns `false` if a writer holds this thread's slot, or if this is the
    /// thread's first use of the lock and the coordination gate is busy.
    pub fn try_rdlock(&self) -> bool {
        let local = thread_local::try_get_or_insert_with(&self.shared, |shared| {
            shared.coordination.try_lock_acquire().then(|| {
                // SAFETY: We hold the coordination gate.
                let local = unsafe { shared.insert_slot::<W>() };
                shared.coordination.notify_release();
                local
            })
        });
        let Some(local) = local else { return false };
        match local.status() {
            Status::Unlocked => {
                if !local.slot.gate.try_lock_acquire() {
                    return false;
                }
                local.set(Status::ReadLocked, 1);
                true
            }
            Status::ReadLocked | Status::WriteLocked => {
                local.enter();
                true
            }
        }
    }

    /// Acquires the write side, blocking until every other thread has left
    /// its slot and no other writer holds the lock.
    #[track_caller]
    pub fn wrlock(&self) {
        let local = self.local();
        match local.status() {
            Status::Unlocked => {
                self.shared.coordination.lock_wait::<W>();
                // SAFETY: We hold the coordination gate.
                unsafe { self.shared.acquire_all::<W>() };
                local.set(Status::WriteLocked, 1);
            }
            Status::WriteLocked => local.enter(),
            Status::ReadLocked => {
                panic!("wrlock on a fat rwlock read locked by the current thread, use upgrade")
            }
        }
    }

    /// Releases one level of the calling thread's hold.
    #[track_caller]
    pub fn unlock(&self) {
        let Some(local) = thread_local::find(&self.shared) else {
            panic!("unlock on a fat rwlock not held by the current thread");
        };
        match (local.status(), local.depth()) {
            (Status::Unlocked, _) => {
                panic!("unlock on a fat rwlock not held by the current thread")
            }
            (Status::ReadLocked, 1) => {
                local.set(Status::Unlocked, 0);
                local.slot.gate.notify_release();
            }
            (Status::ReadLocked, _) => local.leave(),
            (Status::WriteLocked, depth) => {
                // SAFETY: This thread holds the write side.
                unsafe { self.shared.release_others(&local.slot) };
                if depth == 1 {
                    local.set(Status::Unlocked, 0);
                    local.slot.gate.notify_release();
                } else {
                    // Leaving a nested write hold keeps only a read hold.
                    local.set(Status::ReadLocked, depth - 1);
                }
                self.shared.coordination.notify_release();
            }
        }
    }

    /// Converts the calling thread's read hold into a write hold of the same
    /// depth.
    ///
    /// The caller must be the only thread trying to take the write side,
    /// otherwise two upgrading readers wait on each other forever.
    #[track_caller]
    pub fn upgrade(&self) {
        let local = self.held(Status::ReadLocked, "upgrade");
        self.shared.coordination.lock_wait::<W>();
        // SAFETY: We hold the coordination gate.
        unsafe { self.shared.acquire_others::<W>(&local.slot) };
        local.set_status(Status::WriteLocked);
    }

    /// Converts the calling thread's write hold into a read hold of the same
    /// depth.
    #[track_caller]
    pub fn downgrade(&self) {
        let local = self.held(Status::WriteLocked, "downgrade");
        // SAFETY: This thread holds the write side.
        unsafe { self.shared.release_others(&local.slot) };
        self.shared.coordination.notify_release();
        local.set_status(Status::ReadLocked);
    }

    /// Returns the number of threads with a live slot on this lock.
    pub fn registered_threads(&self) -> usize {
        if let ThreadState::Write { .. } = self.thread_state() {
            // SAFETY: A writer holds the coordination gate.
            return unsafe { self.shared.slot_count() };
        }
        self.shared.coordination.lock_wait::<W>();
        // SAFETY: We hold the coordination gate.
        let count = unsafe { self.shared.slot_count() };
        self.shared.coordination.notify_release();
        count
    }
}

impl<W> Default for RawRwLock<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> Drop for RawRwLock<W> {
    fn drop(&mut self) {
        // Slots are freed once the registry and every thread's record have
        // let go of them. Records for this lock turn stale and are pruned.
        log::trace!("fat rwlock {}: destroyed", self.shared.id);
    }
}

impl<W> Debug for RawRwLock<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawRwLock")
            .field("id", &self.shared.id)
            .field("thread_state", &self.thread_state())
            .finish_non_exhaustive()
    }
}

#[cfg(all(not(loom), test))]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};
    use std::sync::Barrier;
    use std::thread;

    use super::{RawRwLock, ThreadState};
    use crate::lock::Lock;
    use crate::relax::{Relax, RelaxWait, Yield};

    type W = RelaxWait<Yield>;

    static COUNTED_RELAXES: AtomicUsize = AtomicUsize::new(0);

    /// Yields, counting every round.
    struct Counted;

    impl Relax for Counted {
        fn new() -> Self {
            Self
        }

        fn relax(&mut self) {
            COUNTED_RELAXES.fetch_add(1, SeqCst);
            thread::yield_now();
        }
    }

    #[test]
    fn first_try_rdlock_fails_while_coordination_busy() {
        let lock = RawRwLock::<W>::new();
        // No writer, the registry is merely busy.
        lock.shared.coordination.lock_wait::<W>();
        thread::scope(|s| {
            s.spawn(|| {
                assert!(!lock.try_rdlock());
                assert_eq!(lock.thread_state(), ThreadState::Unlocked);
            });
        });
        lock.shared.coordination.notify_release();
        thread::scope(|s| {
            s.spawn(|| {
                assert!(lock.try_rdlock());
                lock.unlock();
            })
            .join()
            .unwrap();
        });
    }

    #[test]
    fn thread_exit_waits_with_lock_policy() {
        let lock = RawRwLock::<RelaxWait<Counted>>::new();
        let registered = Barrier::new(2);
        let busy = Barrier::new(2);
        thread::scope(|s| {
            let handle = s.spawn(|| {
                lock.rdlock();
                lock.unlock();
                registered.wait();
                busy.wait();
            });
            registered.wait();
            lock.shared.coordination.lock_wait::<W>();
            let before = COUNTED_RELAXES.load(SeqCst);
            busy.wait();
            // The exiting thread can only make progress once released.
            while COUNTED_RELAXES.load(SeqCst) == before {
                thread::yield_now();
            }
            lock.shared.coordination.notify_release();
            handle.join().unwrap();
        });
        assert_eq!(lock.registered_threads(), 0);
    }
}
