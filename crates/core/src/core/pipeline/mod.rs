//! Backend pipeline structures.
//!
//! This module contains the structures shared between dispatch, commit, and
//! the speculation-safety analyses:
//! 1. **DynInst:** The in-flight instruction object with its status, taint,
//!    and producer-tracking flags.
//! 2. **Rob:** The reorder buffer: per-thread program-order queues, SMT
//!    capacity policy, in-order retirement, width-limited squash, and the
//!    per-cycle visibility and taint passes.

/// In-flight instruction object and shared handle.
pub mod dyn_inst;

/// Reorder buffer and its per-cycle analyses.
pub mod rob;
