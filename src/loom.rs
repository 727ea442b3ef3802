use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};

use loom::cell::{ConstPtr, MutPtr, UnsafeCell};

/// A trait for guard types that hold at least shared access to the underlying
/// data behind Loom's [`UnsafeCell`].
///
/// # Safety
///
/// Must guarantee that no mutable access to the underlying data exists
/// elsewhere through all of the guard's lifetime.
pub unsafe trait Guard: Sized {
    /// The target type after dereferencing [`GuardDeref`] or [`GuardDerefMut`].
    type Target: ?Sized;

    /// Returns a shared reference to the underlying [`UnsafeCell`].
    fn get(&self) -> &UnsafeCell<Self::Target>;

    /// Get a Loom immutable pointer bounded by this guard lifetime.
    fn deref(&self) -> GuardDeref<'_, Self> {
        GuardDeref::new(self)
    }
}

/// A trait for guard types that hold exclusive access to the underlying data.
///
/// # Safety
///
/// Must guarantee that an instance of the guard holds exclusive access to its
/// underlying data through all its lifetime.
pub unsafe trait GuardMut: Guard {
    /// Get a Loom mutable pointer bounded by this guard lifetime.
    fn deref_mut(&self) -> GuardDerefMut<'_, Self> {
        GuardDerefMut::new(self)
    }
}

/// A Loom immutable pointer borrowed from a guard instance.
pub struct GuardDeref<'a, G: Guard> {
    ptr: ConstPtr<G::Target>,
    marker: PhantomData<(&'a G::Target, &'a G)>,
}

impl<G: Guard> GuardDeref<'_, G> {
    fn new(guard: &G) -> Self {
        let ptr = guard.get().get();
        Self { ptr, marker: PhantomData }
    }
}

impl<G: Guard> Deref for GuardDeref<'_, G> {
    type Target = G::Target;

    fn deref(&self) -> &Self::Target {
        // SAFETY: Our lifetime is bounded by the guard borrow.
        unsafe { self.ptr.deref() }
    }
}

/// A Loom mutable pointer borrowed from a guard instance.
pub struct GuardDerefMut<'a, G: GuardMut> {
    ptr: MutPtr<G::Target>,
    marker: PhantomData<(&'a G::Target, &'a G)>,
}

impl<G: GuardMut> GuardDerefMut<'_, G> {
    fn new(guard: &G) -> Self {
        let ptr = guard.get().get_mut();
        Self { ptr, marker: PhantomData }
    }
}

impl<G: GuardMut> Deref for GuardDerefMut<'_, G> {
    type Target = G::Target;

    fn deref(&self) -> &Self::Target {
        // SAFETY: Our lifetime is bounded by the guard borrow.
        unsafe { self.ptr.deref() }
    }
}

impl<G: GuardMut> DerefMut for GuardDerefMut<'_, G> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: Our lifetime is bounded by the guard borrow.
        unsafe { self.ptr.deref() }
    }
}

pub mod models {
    use loom::sync::Arc;
    use loom::{model, thread};

    use crate::test::{get, inc, Int, LockWith};

    /// Evaluates that concurrent writers serialize all mutations against the
    /// shared data, therefore no data races.
    pub fn write_join<L: LockWith<Target = Int> + Send + Sync + 'static>() {
        model(|| {
            let data = Arc::new(L::new(0));
            let c_data = Arc::clone(&data);
            let handle = thread::spawn(move || inc(&c_data));
            inc(&data);
            handle.join().unwrap();
            assert_eq!(get(&data), 2);
        });
    }

    /// Evaluates that a reader observes either the value before or after a
    /// concurrent writer, never a torn write.
    pub fn read_write_join<L: LockWith<Target = Int> + Send + Sync + 'static>() {
        model(|| {
            let data = Arc::new(L::new(0));
            let c_data = Arc::clone(&data);
            let handle = thread::spawn(move || inc(&c_data));
            let value = get(&data);
            assert!(value == 0 || value == 1);
            handle.join().unwrap();
            assert_eq!(get(&data), 1);
        });
    }

    /// Evaluates that a read hold upgraded to a write hold excludes a
    /// concurrent reader for the whole critical section.
    pub fn upgrade_join<L: LockWith<Target = Int> + Send + Sync + 'static>() {
        model(|| {
            let data = Arc::new(L::new(0));
            let c_data = Arc::clone(&data);
            let handle = thread::spawn(move || get(&c_data));
            data.upgrade_with(|value| *value += 1);
            let seen = handle.join().unwrap();
            assert!(seen == 0 || seen == 1);
        });
    }
}
