//! A scalable reader-writer lock, a "fat" lock, for data that is read very
//! often by many threads and written rarely.
//!
//! A conventional reader-writer lock keeps one shared reader count. Every
//! read acquisition and release writes to it, so under many concurrent
//! readers that cache line bounces between cores and readers effectively
//! serialize. A fat lock trades memory for scalability instead: it keeps a
//! record, or slot, for every thread that has ever taken it, each on its own
//! cache line, and the read side only ever touches the calling thread's slot.
//! Readers on different threads never write to shared memory, except once
//! per thread when its slot is first registered.
//!
//! Writers pay for it. A writer takes a coordination mutex, which excludes
//! other writers and freezes the set of slots, and then acquires every
//! thread's slot mutex in turn. Once it holds all of them, no reader can make
//! progress until the writer releases the lock.
//!
//! The main properties of this mechanism are:
//!
//! - readers on distinct threads never contend with each other;
//! - read holds are recursive, tracked per thread with a depth counter;
//! - a read hold can be upgraded to a write hold, and back, in place;
//! - memory grows with the number of threads that have used the lock; and
//! - no fairness is guaranteed, a steady stream of readers may starve a
//!   writer.
//!
//! ## Per-thread holds
//!
//! Holds belong to threads, not to values. [`raw::RawFatRwLock`] exposes the
//! per-thread protocol directly: every `rdlock`, successful `try_rdlock` or
//! `wrlock` must be paired with one `unlock` from the same thread, and a
//! thread must release the lock before it exits. Slots are removed from the
//! lock when their thread exits.
//!
//! [`raw::FatRwLock`] protects a value and hands out RAII guards on top of the
//! same protocol. Guards can not be sent across threads.
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//!
//! use fatrwlock::raw::yields::FatRwLock;
//!
//! let config = Arc::new(FatRwLock::new(String::from("v1")));
//!
//! let readers: Vec<_> = (0..4)
//!     .map(|_| {
//!         let config = Arc::clone(&config);
//!         thread::spawn(move || config.read().len())
//!     })
//!     .collect();
//!
//! *config.write() = String::from("v2");
//!
//! for reader in readers {
//!     assert_eq!(reader.join().expect("thread::spawn failed"), 2);
//! }
//! ```
//!
//! ## Upgrading
//!
//! Upgrading a read hold to a write hold is only safe when the caller knows
//! it is the only thread trying to take the write side at that moment. Two
//! readers upgrading concurrently each wait for the other's slot forever.
//! This is not checked.
//!
//! ## Waiting
//!
//! Both mutex kinds are atomic flags. Waiting on them follows a [`Relax`]
//! policy chosen at compile time, see the [`relax`] module and the type
//! aliases in [`raw`].
//!
//! [`Relax`]: relax::Relax

#![allow(clippy::doc_markdown)]
#![allow(clippy::inline_always)]
#![allow(clippy::module_name_repetitions)]
#![warn(missing_docs)]
#![warn(rust_2024_compatibility)]
#![warn(clippy::undocumented_unsafe_blocks)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod raw;
pub mod relax;

mod error;
pub use error::WouldBlock;
pub use inner::raw::ThreadState;

pub(crate) mod cfg;
pub(crate) mod inner;
pub(crate) mod lock;

#[cfg(test)]
pub(crate) mod test;

#[cfg(all(loom, test))]
#[cfg(not(tarpaulin))]
pub(crate) mod loom;
