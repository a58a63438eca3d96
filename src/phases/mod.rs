//! Implementation of the conversion pipeline phases.
//!
//! ## Overview
//!
//! A conversion runs three phases in sequence:
//! 1. Discovery - clone the meta-repo and its first-layer submodules into
//!    the workspace (parallel, bounded worker pool) and build repository
//!    models
//! 2. Resolution - compute the monorepo branch set and the per-branch,
//!    per-repo plans (pure; lives in [`crate::resolver`])
//! 3. Synthesis - materialize each resolved branch in the monorepo, one
//!    branch at a time
//!
//! The orchestrator sequences the phases, appends every observation and
//! decision to the migration report, and writes the report on every exit
//! path. Branch synthesis is single-writer by design: only discovery
//! fans out.
//!
//! Cancellation is cooperative. Signal handlers set a shared flag which the
//! pipeline polls between VCS driver calls; in-flight git subprocesses run
//! to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

// Phase modules
pub mod discovery;
pub mod orchestrator;
pub mod synthesis;

/// Shared cooperative cancellation flag.
///
/// Cloning is cheap; every clone observes the same flag.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Error out when cancellation has been requested; polled between
    /// driver calls.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// The underlying flag, for signal-handler registration.
    pub fn as_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}
