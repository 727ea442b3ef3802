//! Switches between `core`/`std` primitives and their Loom counterparts.

pub mod atomic {
    #[cfg(not(all(loom, test)))]
    pub use core::sync::atomic::AtomicBool;

    #[cfg(all(loom, test))]
    pub use loom::sync::atomic::AtomicBool;
}

pub mod cell {
    #[cfg(not(all(loom, test)))]
    pub use core::cell::UnsafeCell;

    #[cfg(all(loom, test))]
    pub use loom::cell::UnsafeCell;

    /// A trait that extends [`UnsafeCell`] to allow running closures against
    /// its underlying data.
    pub trait UnsafeCellWith<T: ?Sized> {
        /// Runs `f` against a shared reference borrowed from a [`UnsafeCell`].
        ///
        /// # Safety
        ///
        /// Caller must guarantee there are no mutable aliases to the
        /// underlying data.
        unsafe fn with_unchecked<F, Ret>(&self, f: F) -> Ret
        where
            F: FnOnce(&T) -> Ret;

        /// Runs `f` against a mutable reference borrowed from a
        /// [`UnsafeCell`].
        ///
        /// # Safety
        ///
        /// Caller must guarantee there are no other aliases to the underlying
        /// data.
        unsafe fn with_mut_unchecked<F, Ret>(&self, f: F) -> Ret
        where
            F: FnOnce(&mut T) -> Ret;
    }

    #[cfg(not(all(loom, test)))]
    impl<T: ?Sized> UnsafeCellWith<T> for UnsafeCell<T> {
        #[inline(always)]
        unsafe fn with_unchecked<F, Ret>(&self, f: F) -> Ret
        where
            F: FnOnce(&T) -> Ret,
        {
            // SAFETY: Caller guaranteed that there are no mutable aliases.
            f(unsafe { &*self.get() })
        }

        #[inline(always)]
        unsafe fn with_mut_unchecked<F, Ret>(&self, f: F) -> Ret
        where
            F: FnOnce(&mut T) -> Ret,
        {
            // SAFETY: Caller guaranteed that there are no other aliases.
            f(unsafe { &mut *self.get() })
        }
    }

    #[cfg(all(loom, test))]
    #[cfg(not(tarpaulin_include))]
    impl<T: ?Sized> UnsafeCellWith<T> for UnsafeCell<T> {
        unsafe fn with_unchecked<F, Ret>(&self, f: F) -> Ret
        where
            F: FnOnce(&T) -> Ret,
        {
            // SAFETY: Caller guaranteed that there are no mutable aliases.
            self.with(|ptr| f(unsafe { &*ptr }))
        }

        unsafe fn with_mut_unchecked<F, Ret>(&self, f: F) -> Ret
        where
            F: FnOnce(&mut T) -> Ret,
        {
            // SAFETY: Caller guaranteed that there are no other aliases.
            self.with_mut(|ptr| f(unsafe { &mut *ptr }))
        }
    }
}

pub mod hint {
    #[cfg(not(all(loom, test)))]
    pub use core::hint::spin_loop;

    #[cfg(all(loom, test))]
    pub use loom::hint::spin_loop;
}

pub mod thread {
    #[cfg(not(all(loom, test)))]
    pub use std::thread::{current, yield_now, ThreadId};

    #[cfg(all(loom, test))]
    pub use loom::thread::{current, yield_now, ThreadId};
}

pub mod sync {
    #[cfg(not(all(loom, test)))]
    pub use std::sync::Arc;

    #[cfg(all(loom, test))]
    pub use loom::sync::Arc;
}
