//! # trafsim-engine::control
//!
//! Cooperative cancellation for running simulations. The run loops check the
//! token between events; the orchestrator checks it between seeds. There is
//! no preemption: a set token means "stop at the next safe point and report
//! how far you got".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared cancellation flag. Cloning is cheap; all clones observe the same
/// flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
