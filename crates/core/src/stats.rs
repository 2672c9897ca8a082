//! ROB access statistics collection and reporting.
//!
//! This module tracks how often the reorder buffer is inspected and mutated.
//! It provides:
//! 1. **Read counter:** Incremented on inspection-only queries such as
//!    head-readiness checks.
//! 2. **Write counter:** Incremented on insertion, retirement, and each
//!    squash pump invocation.

/// Reorder buffer access counters.
///
/// Both counters increase monotonically over the lifetime of the buffer and
/// are reported at simulation teardown.
#[derive(Clone, Copy, Debug, Default)]
pub struct RobStats {
    /// The number of ROB reads.
    pub reads: u64,
    /// The number of ROB writes.
    pub writes: u64,
}

impl RobStats {
    /// Prints the access counters to stdout.
    pub fn print(&self) {
        println!("==========================================================");
        println!("ROB STATISTICS");
        println!("==========================================================");
        println!("rob_reads                {}", self.reads);
        println!("rob_writes               {}", self.writes);
        println!("==========================================================");
    }
}
