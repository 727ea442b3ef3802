use crate::cfg::sync::Arc;

/// A trait for lock types that can hold user defined values.
pub trait LockNew {
    /// The type of the value this lock holds.
    type Target: ?Sized;

    /// Creates a new lock in an unlocked state ready for use.
    fn new(value: Self::Target) -> Self
    where
        Self::Target: Sized;
}

/// A trait for lock types that can run closures against the protected data.
pub trait LockWith: LockNew {
    /// Acquires the read side and then runs the closure against the
    /// protected data.
    fn read_with<F, Ret>(&self, f: F) -> Ret
    where
        F: FnOnce(&Self::Target) -> Ret;

    /// Acquires the write side and then runs the closure against the
    /// protected data.
    fn write_with<F, Ret>(&self, f: F) -> Ret
    where
        F: FnOnce(&mut Self::Target) -> Ret;

    /// Acquires the read side, upgrades it to the write side and then runs
    /// the closure against the protected data.
    fn upgrade_with<F, Ret>(&self, f: F) -> Ret
    where
        F: FnOnce(&mut Self::Target) -> Ret;
}

/// A trait for lock types that can return an exclusive reference to the
/// underlying data without locking.
#[cfg(not(loom))]
pub trait LockData: LockNew {
    /// Returns a mutable reference to the underlying data.
    fn get_mut(&mut self) -> &mut Self::Target;
}

/// An arbitrary unsigned integer type.
pub type Int = u32;

/// Get a copy of the lock protected data.
pub fn get<L>(lock: &Arc<L>) -> L::Target
where
    L: LockWith,
    L::Target: Sized + Copy,
{
    lock.read_with(|data| *data)
}

/// Increments a shared integer.
pub fn inc<L>(lock: &Arc<L>)
where
    L: LockWith<Target = Int>,
{
    lock.write_with(|data| *data += 1);
}

#[cfg(all(not(loom), test))]
pub mod tests {
    // Test suite adapted from the Rust's RwLock tests, with the per-thread
    // state machine cases of the fat lock added.
    //
    // Copyright 2014 The Rust Project Developers.
    //
    // Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
    // http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
    // <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
    // option. This file may not be copied, modified, or distributed
    // except according to those terms.

    use std::fmt::{Debug, Display};
    use std::sync::atomic::{AtomicBool, Ordering::SeqCst};
    use std::sync::mpsc::channel;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    use super::{get, inc, Int};
    use super::{LockData, LockWith};
    use crate::inner::raw::thread_records;
    use crate::raw::RawFatRwLock;
    use crate::relax::Relax;
    use crate::ThreadState::{Read, Unlocked, Write};

    #[derive(Eq, PartialEq, Debug)]
    pub struct NonCopy(pub u32);

    const ITERS: Int = 500;
    const CONCURRENCY: Int = 3;
    const EXPECTED_VALUE: Int = ITERS * CONCURRENCY;

    fn inc_for<L>(lock: &Arc<L>)
    where
        L: LockWith<Target = Int>,
    {
        for _ in 0..ITERS {
            inc::<L>(lock);
        }
    }

    fn read_for<L>(lock: &Arc<L>)
    where
        L: LockWith<Target = Int>,
    {
        for _ in 0..ITERS {
            let value = get::<L>(lock);
            assert!(value <= EXPECTED_VALUE);
        }
    }

    pub fn lots_and_lots_lock<L>()
    where
        L: LockWith<Target = Int> + Send + Sync + 'static,
    {
        let lock = Arc::new(L::new(0));
        let (tx, rx) = channel();
        for _ in 0..CONCURRENCY {
            let lock1 = Arc::clone(&lock);
            let tx2 = tx.clone();
            thread::spawn(move || {
                inc_for(&lock1);
                tx2.send(()).unwrap();
            });
            let lock2 = Arc::clone(&lock);
            let tx2 = tx.clone();
            thread::spawn(move || {
                read_for(&lock2);
                tx2.send(()).unwrap();
            });
        }
        drop(tx);
        for _ in 0..2 * CONCURRENCY {
            rx.recv().unwrap();
        }
        assert_eq!(get(&lock), EXPECTED_VALUE);
    }

    pub fn smoke<L>()
    where
        L: LockWith<Target = Int>,
    {
        let lock = L::new(1);
        assert_eq!(lock.read_with(|data| *data), 1);
        lock.write_with(|data| *data = 2);
        assert_eq!(lock.read_with(|data| *data), 2);
        lock.read_with(|outer| lock.read_with(|inner| assert_eq!(outer, inner)));
        lock.upgrade_with(|data| *data = 3);
        assert_eq!(lock.read_with(|data| *data), 3);
    }

    pub fn test_guard_debug_display<G: Debug + Display>(value: Int, guard: G) {
        assert_eq!(format!("{value:?}"), format!("{guard:?}"));
        assert_eq!(format!("{value}"), format!("{guard}"));
    }

    pub fn test_rwlock_debug<L>()
    where
        L: LockWith<Target = Int> + Debug,
    {
        let value = 42;
        let lock = L::new(value);
        let msg = format!("FatRwLock {{ data: {value:?} }}");
        assert_eq!(msg, format!("{lock:?}"));
    }

    pub fn test_rwlock_default<L>()
    where
        L: LockData<Target = Int> + Default,
    {
        let mut lock: L = Default::default();
        assert_eq!(Int::default(), *lock.get_mut());
    }

    pub fn test_rwlock_from<L>()
    where
        L: LockData<Target = Int> + From<Int>,
    {
        let value = 42;
        let mut lock = L::from(value);
        assert_eq!(value, *lock.get_mut());
    }

    pub fn test_get_mut<L>()
    where
        L: LockData<Target = NonCopy>,
    {
        let mut lock = L::new(NonCopy(10));
        *lock.get_mut() = NonCopy(20);
        assert_eq!(*lock.get_mut(), NonCopy(20));
    }

    pub fn test_lock_arc_access_in_unwind<L>()
    where
        L: LockWith<Target = Int> + Send + Sync + 'static,
    {
        let arc = Arc::new(L::new(1));
        let arc2 = arc.clone();
        let _ = thread::spawn(move || {
            struct Unwinder<T: LockWith<Target = Int>> {
                i: Arc<T>,
            }
            impl<T: LockWith<Target = Int>> Drop for Unwinder<T> {
                fn drop(&mut self) {
                    inc(&self.i);
                }
            }
            let _u = Unwinder { i: arc2 };
            panic!();
        })
        .join();
        let value = get(&arc);
        assert_eq!(value, 2);
    }

    pub fn test_lock_unsized<L>()
    where
        L: LockWith<Target = [Int; 3]>,
    {
        let lock = Arc::new(L::new([1, 2, 3]));
        lock.write_with(|data| {
            data[0] = 4;
            data[2] = 5;
        });
        let comp: &[Int] = &[4, 2, 5];
        let data = get(&lock);
        assert_eq!(comp, data);
    }

    /// Walks every transition of the per-thread state machine.
    pub fn state_table<R: Relax>() {
        let lock = RawFatRwLock::<R>::new();
        assert_eq!(lock.thread_state(), Unlocked);

        lock.rdlock();
        assert_eq!(lock.thread_state(), Read { depth: 1 });
        lock.rdlock();
        assert_eq!(lock.thread_state(), Read { depth: 2 });
        lock.unlock();
        assert_eq!(lock.thread_state(), Read { depth: 1 });
        lock.unlock();
        assert_eq!(lock.thread_state(), Unlocked);

        lock.wrlock();
        assert_eq!(lock.thread_state(), Write { depth: 1 });
        lock.unlock();
        assert_eq!(lock.thread_state(), Unlocked);

        lock.rdlock();
        lock.upgrade();
        assert_eq!(lock.thread_state(), Write { depth: 1 });
        lock.downgrade();
        assert_eq!(lock.thread_state(), Read { depth: 1 });

        lock.rdlock();
        lock.rdlock();
        lock.upgrade();
        assert_eq!(lock.thread_state(), Write { depth: 3 });
        lock.downgrade();
        assert_eq!(lock.thread_state(), Read { depth: 3 });

        // Unlocking a nested write hold leaves a read hold, one level down.
        lock.upgrade();
        lock.unlock();
        assert_eq!(lock.thread_state(), Read { depth: 2 });
        lock.unlock();
        lock.unlock();
        assert_eq!(lock.thread_state(), Unlocked);
    }

    /// Unlocking a write hold of depth N > 1 gives up exclusivity and keeps
    /// a read hold of depth N-1. This is the documented contract, not the
    /// mirror image of the read rule.
    pub fn nested_write_unlocks_to_read<R: Relax>() {
        let lock = RawFatRwLock::<R>::new();
        let ready = Barrier::new(2);
        let written = Barrier::new(2);
        let released = Barrier::new(2);
        thread::scope(|s| {
            s.spawn(|| {
                lock.rdlock();
                lock.unlock();
                ready.wait();
                written.wait();
                assert!(lock.try_rdlock().is_err());
                released.wait();
                released.wait();
                lock.try_rdlock().expect("write hold should have been released");
                lock.unlock();
            });
            ready.wait();
            lock.wrlock();
            lock.wrlock();
            lock.rdlock();
            assert_eq!(lock.thread_state(), Write { depth: 3 });
            written.wait();
            released.wait();
            lock.unlock();
            assert_eq!(lock.thread_state(), Read { depth: 2 });
            released.wait();
        });
        lock.unlock();
        lock.unlock();
        assert_eq!(lock.thread_state(), Unlocked);
    }

    pub fn upgrade_downgrade_round_trip<R: Relax>() {
        let lock = RawFatRwLock::<R>::new();
        lock.rdlock();
        lock.upgrade();
        lock.downgrade();
        lock.unlock();
        assert_eq!(lock.thread_state(), Unlocked);
        thread::scope(|s| {
            s.spawn(|| {
                lock.wrlock();
                lock.unlock();
            });
        });
    }

    pub fn recursive_readers_across_threads<R: Relax>() {
        const THREADS: usize = 4;
        const DEPTH: usize = 3;
        let lock = RawFatRwLock::<R>::new();
        let barrier = Barrier::new(THREADS);
        thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        for depth in 1..=DEPTH {
                            lock.rdlock();
                            assert_eq!(lock.thread_state(), Read { depth });
                        }
                        barrier.wait();
                        for _ in 0..DEPTH {
                            lock.unlock();
                        }
                        assert_eq!(lock.thread_state(), Unlocked);
                    })
                })
                .collect();
            // An explicit join also waits for the thread local destructors
            // that deregister each slot.
            for handle in handles {
                handle.join().unwrap();
            }
        });
        assert_eq!(lock.registered_threads(), 0);
        lock.wrlock();
        lock.unlock();
    }

    pub fn writer_excludes_try_rdlock<R: Relax>() {
        let lock = RawFatRwLock::<R>::new();
        let registered = Barrier::new(3);
        let locked = Barrier::new(3);
        let unlocked = Barrier::new(3);
        thread::scope(|s| {
            s.spawn(|| {
                lock.rdlock();
                lock.unlock();
                registered.wait();
                locked.wait();
                for _ in 0..10 {
                    assert!(lock.try_rdlock().is_err());
                }
                unlocked.wait();
                unlocked.wait();
                lock.try_rdlock().expect("writer has unlocked");
                lock.unlock();
            });
            // A thread taking the lock for the first time does not block
            // either, even though it can not register while a writer holds
            // the lock.
            s.spawn(|| {
                registered.wait();
                locked.wait();
                assert!(lock.try_rdlock().is_err());
                assert_eq!(lock.thread_state(), Unlocked);
                unlocked.wait();
                unlocked.wait();
                // Registration may still race with the other reader's exit.
                lock.rdlock();
                assert_eq!(lock.thread_state(), Read { depth: 1 });
                lock.unlock();
            });
            registered.wait();
            lock.wrlock();
            locked.wait();
            unlocked.wait();
            lock.unlock();
            unlocked.wait();
        });
    }

    pub fn readers_do_not_block_each_other<R: Relax>() {
        const THREADS: usize = 8;
        let lock = RawFatRwLock::<R>::new();
        let registered = Barrier::new(THREADS);
        let holding = Barrier::new(THREADS);
        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    lock.rdlock();
                    lock.unlock();
                    registered.wait();
                    lock.try_rdlock().expect("readers never exclude readers");
                    holding.wait();
                    assert_eq!(lock.thread_state(), Read { depth: 1 });
                    lock.unlock();
                });
            }
        });
    }

    pub fn thread_exit_deregisters_slot<R: Relax + 'static>() {
        let lock = Arc::new(RawFatRwLock::<R>::new());
        assert_eq!(lock.registered_threads(), 0);
        let c_lock = Arc::clone(&lock);
        thread::spawn(move || {
            c_lock.rdlock();
            assert_eq!(c_lock.registered_threads(), 1);
            c_lock.unlock();
        })
        .join()
        .unwrap();
        assert_eq!(lock.registered_threads(), 0);
        lock.rdlock();
        lock.unlock();
        assert_eq!(lock.registered_threads(), 1);
    }

    pub fn thread_exit_while_holding_releases<R: Relax>() {
        let lock = RawFatRwLock::<R>::new();
        thread::scope(|s| {
            s.spawn(|| lock.rdlock()).join().unwrap();
            s.spawn(|| lock.wrlock()).join().unwrap();
        });
        lock.wrlock();
        assert_eq!(lock.registered_threads(), 1);
        lock.unlock();
    }

    pub fn writer_waits_for_reader<R: Relax>() {
        let lock = RawFatRwLock::<R>::new();
        let written = AtomicBool::new(false);
        lock.rdlock();
        thread::scope(|s| {
            s.spawn(|| {
                lock.wrlock();
                written.store(true, SeqCst);
                lock.unlock();
            });
            thread::sleep(Duration::from_millis(50));
            assert!(!written.load(SeqCst));
            lock.unlock();
        });
        assert!(written.load(SeqCst));
    }

    pub fn upgrade_excludes_other_readers<R: Relax>() {
        let lock = RawFatRwLock::<R>::new();
        let registered = Barrier::new(2);
        let upgraded = Barrier::new(2);
        let downgraded = Barrier::new(2);
        thread::scope(|s| {
            lock.rdlock();
            s.spawn(|| {
                lock.rdlock();
                lock.unlock();
                registered.wait();
                upgraded.wait();
                assert!(lock.try_rdlock().is_err());
                downgraded.wait();
                downgraded.wait();
                lock.try_rdlock().expect("readers share with a downgraded writer");
                lock.unlock();
            });
            registered.wait();
            lock.upgrade();
            upgraded.wait();
            downgraded.wait();
            lock.downgrade();
            downgraded.wait();
        });
        lock.unlock();
    }

    pub fn destroyed_lock_is_pruned<R: Relax>() {
        thread::scope(|s| {
            s.spawn(|| {
                for _ in 0..4 {
                    let lock = RawFatRwLock::<R>::new();
                    lock.rdlock();
                    lock.unlock();
                    // Registering with a new lock drops the stale record of
                    // the previous one.
                    assert_eq!(thread_records(), 1);
                }
                let lock = RawFatRwLock::<R>::new();
                assert_eq!(lock.thread_state(), Unlocked);
                assert_eq!(thread_records(), 1);
                lock.wrlock();
                assert_eq!(thread_records(), 1);
                assert_eq!(lock.registered_threads(), 1);
                lock.unlock();

                let other = RawFatRwLock::<R>::new();
                other.rdlock();
                assert_eq!(thread_records(), 2);
                other.unlock();
            });
        });
    }
}
