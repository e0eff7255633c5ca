// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process per-user run locks.
//!
//! The session table's claim guard already enforces one running session per
//! user across processes; this registry is the fast path inside one process,
//! letting the worker refuse a second run without touching storage.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Registry of user IDs with a run in flight.
#[derive(Clone, Default)]
pub struct RunLockRegistry {
    held: Arc<Mutex<HashSet<String>>>,
}

impl RunLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to acquire the run lock for a user.
    ///
    /// Returns a guard that releases on drop, or `None` when the user already
    /// has a run in flight.
    pub fn try_acquire(&self, user_id: &str) -> Option<RunGuard> {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        if !held.insert(user_id.to_string()) {
            return None;
        }
        Some(RunGuard {
            registry: self.clone(),
            user_id: user_id.to_string(),
        })
    }

    /// True when the user currently holds a run lock.
    pub fn is_held(&self, user_id: &str) -> bool {
        self.held
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(user_id)
    }

    fn release(&self, user_id: &str) {
        self.held
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(user_id);
    }
}

/// RAII guard for a user's run lock.
pub struct RunGuard {
    registry: RunLockRegistry,
    user_id: String,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.registry.release(&self.user_id);
    }
}
