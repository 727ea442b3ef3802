use thiserror::Error;

/// The lock could not be acquired without blocking.
///
/// Returned by the non-blocking acquisition methods when a writer holds the
/// calling thread's slot. On the calling thread's first use of the lock it is
/// also returned whenever the coordination mutex is busy, whether a writer
/// holds it or another thread is registering or deregistering its slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Error)]
#[error("fat rwlock is not available for reading without blocking")]
pub struct WouldBlock;
