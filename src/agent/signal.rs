// ABOUTME: Cooperative exit signal — a shared flag the loop and dispatcher poll by value.
// ABOUTME: Setting it never interrupts a running tool; it is checked between calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared "should exit" flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct ExitSignal(Arc<AtomicBool>);

impl ExitSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
