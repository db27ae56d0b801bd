//! Level liveness
//!
//! One flag per pushed level. The layer-stack manager holds the only
//! `LifeOwner` and flips it when the level is popped; every wrapper created at
//! that level keeps a read-only `LivenessHandle` to the same flag.
//! The flag only ever goes true -> false.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Read side of a level's liveness flag.
#[derive(Clone)]
pub struct LivenessHandle {
    alive: Arc<AtomicBool>,
}

impl LivenessHandle {
    /// A flag nobody owns: it stays at `alive` forever.
    pub fn detached(alive: bool) -> Self {
        LivenessHandle { alive: Arc::new(AtomicBool::new(alive)) }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Whether both handles observe the same flag.
    pub fn same_flag(&self, other: &LivenessHandle) -> bool {
        Arc::ptr_eq(&self.alive, &other.alive)
    }
}

impl fmt::Debug for LivenessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LivenessHandle").field("alive", &self.is_alive()).finish()
    }
}

/// Write side of a level's liveness flag. Not cloneable.
#[derive(Debug)]
pub struct LifeOwner {
    handle: LivenessHandle,
}

impl LifeOwner {
    pub fn new() -> Self {
        LifeOwner { handle: LivenessHandle::detached(true) }
    }

    /// Handle to attach to wrappers created at this level.
    pub fn handle(&self) -> LivenessHandle {
        self.handle.clone()
    }

    pub fn is_alive(&self) -> bool {
        self.handle.is_alive()
    }

    /// Mark the level dead. Returns false if it already was.
    pub fn kill(&self) -> bool {
        self.handle.alive.swap(false, Ordering::Release)
    }
}

impl Default for LifeOwner {
    fn default() -> Self {
        Self::new()
    }
}
