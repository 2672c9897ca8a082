//! Fault definitions.
//!
//! This module defines the faults an in-flight instruction can carry through
//! the backend. It provides:
//! 1. **Fault Representation:** Synchronous exceptions detected during decode,
//!    execute, or memory access.
//! 2. **Error Handling:** Integration with standard Rust error traits for
//!    system-level reporting.

use std::fmt;

/// Synchronous faults attached to an in-flight instruction.
///
/// A faulted instruction still occupies its reorder buffer entry and drains
/// through the normal commit path; the trap is taken when it reaches the
/// head of the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Illegal instruction exception.
    ///
    /// Raised when an instruction encoding is invalid or not implemented.
    /// The associated value is the instruction encoding.
    IllegalInstruction(u32),

    /// Breakpoint exception.
    ///
    /// The associated value is the program counter.
    Breakpoint(u64),

    /// Load access fault.
    ///
    /// Raised when a load violates memory protection or accesses invalid
    /// memory. The associated value is the faulting address.
    LoadAccessFault(u64),

    /// Store access fault.
    ///
    /// Raised when a store violates memory protection or accesses invalid
    /// memory. The associated value is the faulting address.
    StoreAccessFault(u64),

    /// Load page fault. The associated value is the faulting virtual address.
    LoadPageFault(u64),

    /// Store page fault. The associated value is the faulting virtual address.
    StorePageFault(u64),
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::IllegalInstruction(inst) => write!(f, "IllegalInstruction({:#x})", inst),
            Fault::Breakpoint(pc) => write!(f, "Breakpoint({:#x})", pc),
            Fault::LoadAccessFault(addr) => write!(f, "LoadAccessFault({:#x})", addr),
            Fault::StoreAccessFault(addr) => write!(f, "StoreAccessFault({:#x})", addr),
            Fault::LoadPageFault(addr) => write!(f, "LoadPageFault({:#x})", addr),
            Fault::StorePageFault(addr) => write!(f, "StorePageFault({:#x})", addr),
        }
    }
}

impl std::error::Error for Fault {}
