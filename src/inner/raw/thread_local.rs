use core::cell::{Cell, RefCell};
use core::fmt::{self, Debug, Display, Formatter};

use std::rc::Rc;
use std::sync::{Arc, Weak};
use std::vec::Vec;

use super::{Shared, Slot, ThreadState};
use crate::cfg::atomic::AtomicBool;
use crate::lock::Lock;

/// The calling thread's records, one per fat lock it has ever acquired and
/// that is still alive. Dropped records deregister their slot.
type Records = RefCell<Vec<Rc<LocalSlot>>>;

#[cfg(not(all(loom, test)))]
std::thread_local! {
    static RECORDS: Records = const { RefCell::new(Vec::new()) };
}

#[cfg(all(loom, test))]
loom::thread_local! {
    static RECORDS: Records = RefCell::new(Vec::new());
}

/// The hold a thread has on its own slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Status {
    Unlocked,
    ReadLocked,
    WriteLocked,
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unlocked => "unlocked",
            Self::ReadLocked => "read locked",
            Self::WriteLocked => "write locked",
        })
    }
}

/// The thread-confined half of a thread's bookkeeping record.
///
/// Status and depth are only ever read or written by the owning thread, so
/// they need no synchronization beyond the slot's gate.
pub(super) struct LocalSlot {
    lock_id: usize,
    shared: Weak<Shared>,
    key: u64,
    pub(super) slot: Arc<Slot>,
    status: Cell<Status>,
    depth: Cell<usize>,
    /// Takes the coordination gate with the lock's waiting policy.
    lock_coordination: fn(&AtomicBool),
}

impl LocalSlot {
    pub(super) fn new(
        shared: &Arc<Shared>,
        key: u64,
        slot: Arc<Slot>,
        lock_coordination: fn(&AtomicBool),
    ) -> Self {
        Self {
            lock_id: shared.id,
            shared: Arc::downgrade(shared),
            key,
            slot,
            status: Cell::new(Status::Unlocked),
            depth: Cell::new(0),
            lock_coordination,
        }
    }

    pub(super) fn status(&self) -> Status {
        self.status.get()
    }

    pub(super) fn depth(&self) -> usize {
        self.depth.get()
    }

    pub(super) fn state(&self) -> ThreadState {
        match self.status() {
            Status::Unlocked => ThreadState::Unlocked,
            Status::ReadLocked => ThreadState::Read { depth: self.depth() },
            Status::WriteLocked => ThreadState::Write { depth: self.depth() },
        }
    }

    pub(super) fn set(&self, status: Status, depth: usize) {
        debug_assert_eq!(status == Status::Unlocked, depth == 0);
        self.status.set(status);
        self.depth.set(depth);
    }

    pub(super) fn set_status(&self, status: Status) {
        self.status.set(status);
    }

    /// Adds one level of recursion to a held lock.
    pub(super) fn enter(&self) {
        self.depth.set(self.depth() + 1);
    }

    /// Removes one level of recursion, leaving the lock held.
    pub(super) fn leave(&self) {
        debug_assert!(self.depth() > 1);
        self.depth.set(self.depth() - 1);
    }

    /// Whether the lock this record belongs to is still alive.
    fn is_live(&self) -> bool {
        self.shared.strong_count() > 0
    }
}

impl Debug for LocalSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSlot")
            .field("lock_id", &self.lock_id)
            .field("key", &self.key)
            .field("slot", &self.slot)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for LocalSlot {
    fn drop(&mut self) {
        let Some(shared) = self.shared.upgrade() else { return };
        match self.status() {
            Status::Unlocked => (self.lock_coordination)(&shared.coordination),
            Status::ReadLocked => {
                log::warn!("fat rwlock {}: thread exited while read locked", self.lock_id);
                self.slot.gate.notify_release();
                (self.lock_coordination)(&shared.coordination);
            }
            // A writer already holds the coordination gate.
            Status::WriteLocked => {
                log::warn!("fat rwlock {}: thread exited while write locked", self.lock_id);
                // SAFETY: This thread holds the write side.
                unsafe { shared.release_others(&self.slot) };
                self.slot.gate.notify_release();
            }
        }
        // SAFETY: We hold the coordination gate.
        unsafe { shared.remove_slot(self.key) };
        shared.coordination.notify_release();
    }
}

/// Returns the calling thread's record for `shared`, if it has one.
///
/// # Panics
///
/// Panics if the thread local records are being destroyed.
pub(super) fn find(shared: &Shared) -> Option<Rc<LocalSlot>> {
    RECORDS.with(|records| {
        records.borrow().iter().find(|local| local.lock_id == shared.id).cloned()
    })
}

/// Returns the calling thread's record for `shared`, creating it with
/// `insert` if the thread has none.
///
/// # Panics
///
/// Panics if the thread local records are being destroyed.
pub(super) fn get_or_insert_with<F>(shared: &Arc<Shared>, insert: F) -> Rc<LocalSlot>
where
    F: FnOnce(&Arc<Shared>) -> LocalSlot,
{
    match find(shared) {
        Some(local) => local,
        None => remember(insert(shared)),
    }
}

/// Like [`get_or_insert_with`], except `insert` may give up, in which case
/// no record is created.
pub(super) fn try_get_or_insert_with<F>(shared: &Arc<Shared>, insert: F) -> Option<Rc<LocalSlot>>
where
    F: FnOnce(&Arc<Shared>) -> Option<LocalSlot>,
{
    match find(shared) {
        Some(local) => Some(local),
        None => insert(shared).map(remember),
    }
}

/// Stores a freshly registered record, pruning records of destroyed locks.
fn remember(local: LocalSlot) -> Rc<LocalSlot> {
    let local = Rc::new(local);
    RECORDS.with(|records| {
        let mut records = records.borrow_mut();
        records.retain(|record| record.is_live());
        records.push(Rc::clone(&local));
    });
    local
}

/// Number of records the calling thread currently keeps, live or stale.
#[cfg(test)]
pub(super) fn record_count() -> usize {
    RECORDS.with(|records| records.borrow().len())
}
