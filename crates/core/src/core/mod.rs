//! CPU core structures.
//!
//! The backend structures of the out-of-order core: the in-flight instruction
//! object and the reorder buffer with its per-cycle analyses.

/// Pipeline structures (in-flight instructions, reorder buffer).
pub mod pipeline;
