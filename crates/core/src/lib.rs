//! Out-of-order CPU simulator core: reorder buffer with speculative taint tracking.
//!
//! This crate implements the commit-ordering backbone of a superscalar,
//! speculative, simultaneously-multithreaded pipeline model:
//! 1. **Reorder Buffer:** Per-thread ordered instruction queues with in-order
//!    retirement, SMT capacity policies, and width-limited squash.
//! 2. **Visibility analysis:** Per-cycle derivation of prev-instructions-completed
//!    and prev-branches-resolved state, and of the unsquashable property under the
//!    configured protection scheme.
//! 3. **Taint tracking:** Explicit, implicit, and address information-flow
//!    propagation over in-flight instructions (STT).
//! 4. **Configuration:** Hierarchical serde-deserializable config with defaults.
//! 5. **Statistics:** ROB read/write access counters with report output.
//!
//! The enclosing CPU model (clock, fetch, rename, issue, execute, writeback) is
//! an external collaborator: it owns instruction lifecycles and the active-thread
//! set, and drives the per-tick passes in order.

/// Common types (register identifiers, faults).
pub mod common;
/// Simulator configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// CPU core structures (pipeline, in-flight instructions, reorder buffer).
pub mod core;
/// ROB access statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// In-flight instruction object and its shared handle.
pub use crate::core::pipeline::dyn_inst::{DynInst, DynInstPtr, InstSeqNum, ThreadId};
/// The reorder buffer; construct with `Rob::new`.
pub use crate::core::pipeline::rob::Rob;
