// Relax policies adapted from spin-rs's relax.rs, with exponential backoff
// based on crossbeam-utils' backoff.rs.
//
// Copyright (c) 2014 Mathijs van de Nes
// Copyright (c) 2019 The Crossbeam Project Developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Strategies that determine how a thread waits on a busy gate.
//!
//! A fat lock waits in two places: a reader whose slot mutex is held by a
//! writer, and a writer waiting for a reader to leave its slot or for another
//! writer to release the coordination mutex. Both waits run the same policy.

use crate::cfg::{hint, thread};
use crate::lock::Wait;

/// A trait implemented by waiting policies.
///
/// # Example
///
/// ```
/// use fatrwlock::relax::Relax;
///
/// struct Spin;
///
/// impl Relax for Spin {
///     #[inline(always)]
///     fn new() -> Self {
///         Self
///     }
///
///     #[inline(always)]
///     fn relax(&mut self) {
///         core::hint::spin_loop();
///     }
/// }
/// ```
pub trait Relax {
    /// Returns the initial value for this relaxing strategy.
    fn new() -> Self;

    /// Performs the relaxing operation during a period of contention.
    fn relax(&mut self);
}

/// A strategy that busy-waits while signaling the processor through
/// [`core::hint::spin_loop`].
///
/// Writers of a fat lock may wait on a reader for as long as the reader holds
/// its slot, so pure spinning is only appropriate when read sections are very
/// short. Prefer [`Yield`] otherwise.
pub struct Spin;

impl Relax for Spin {
    #[inline(always)]
    fn new() -> Self {
        Self
    }

    #[inline(always)]
    fn relax(&mut self) {
        hint::spin_loop();
    }
}

/// A strategy that gives the current time slice back to the OS scheduler.
pub struct Yield;

impl Relax for Yield {
    #[inline(always)]
    fn new() -> Self {
        Self
    }

    #[inline(always)]
    fn relax(&mut self) {
        thread::yield_now();
    }
}

/// A strategy that spins without any processor hint.
///
/// Exists for targets that miscompile spin hints. Use [`Spin`] instead.
pub struct Loop;

impl Relax for Loop {
    #[inline(always)]
    fn new() -> Self {
        Self
    }

    #[inline(always)]
    fn relax(&mut self) {}
}

/// An unsigned integer type use as the inner type for [`Backoff`].
type Uint = u32;

/// A strategy that spins with exponential backoff, doubling the number of
/// spin hints per round up to `1 << SpinBackoff::MAX`.
pub struct SpinBackoff {
    inner: Backoff<{ Self::MAX }>,
}

impl SpinBackoff {
    /// The largest value the inner backoff counter can reach.
    const MAX: Uint = 6;
}

// The shift must stay below the bit width of `Uint`.
const _: () = assert!(SpinBackoff::MAX < Uint::BITS);

impl Relax for SpinBackoff {
    #[inline(always)]
    fn new() -> Self {
        Self { inner: Backoff::default() }
    }

    #[inline(always)]
    fn relax(&mut self) {
        self.inner.spin();
        self.inner.step();
    }
}

/// A strategy that spins with exponential backoff until the threshold is
/// reached, then yields to the OS scheduler on every later round.
pub struct YieldBackoff {
    inner: Backoff<{ Self::MAX }>,
}

impl YieldBackoff {
    /// The largest value the inner backoff counter can reach.
    const MAX: Uint = SpinBackoff::MAX;
}

impl Relax for YieldBackoff {
    #[inline(always)]
    fn new() -> Self {
        Self { inner: Backoff::default() }
    }

    #[inline(always)]
    fn relax(&mut self) {
        if self.inner.0 < Self::MAX {
            self.inner.spin();
        } else {
            thread::yield_now();
        }
        self.inner.step();
    }
}

/// Backoff counter holding the current shift, saturating at `MAX`.
#[derive(Default)]
struct Backoff<const MAX: Uint>(Uint);

impl<const MAX: Uint> Backoff<MAX> {
    /// Runs `1 << self.0` spin hints.
    fn spin(&self) {
        for _ in 0..1 << self.0.min(MAX) {
            hint::spin_loop();
        }
    }

    /// Increments the shift, saturating at `MAX`.
    fn step(&mut self) {
        (self.0 < MAX).then(|| self.0 += 1);
    }
}

/// A generic relaxed waiter, implementing [`Wait`] for any [`Relax`] policy.
///
/// Keeps the public `Relax` trait free of the crate's internal `Wait` bound.
pub(crate) struct RelaxWait<R> {
    waiter: R,
}

impl<R: Relax> Relax for RelaxWait<R> {
    #[inline(always)]
    fn new() -> Self {
        Self { waiter: R::new() }
    }

    #[inline(always)]
    fn relax(&mut self) {
        self.waiter.relax();
    }
}

impl<R: Relax> Wait for RelaxWait<R> {}

#[cfg(all(not(loom), test))]
mod test {
    use super::{Relax, Uint};

    fn returns<R: Relax, const MAX: Uint>() {
        let mut relax = R::new();
        for _ in 0..=MAX.saturating_mul(10) {
            relax.relax();
        }
    }

    #[test]
    fn spins() {
        returns::<super::Spin, 10>();
    }

    #[test]
    fn spins_backoff() {
        returns::<super::SpinBackoff, { super::SpinBackoff::MAX }>();
    }

    #[test]
    fn yields() {
        returns::<super::Yield, 10>();
    }

    #[test]
    fn yields_backoff() {
        returns::<super::YieldBackoff, { super::YieldBackoff::MAX }>();
    }

    #[test]
    fn loops() {
        returns::<super::Loop, 10>();
    }

    #[test]
    fn backoff_saturates() {
        let mut backoff = super::Backoff::<3>::default();
        for _ in 0..10 {
            backoff.step();
        }
        assert_eq!(backoff.0, 3);
    }
}
