//! In-flight dynamic instruction object.
//!
//! A `DynInst` records everything the backend needs to know about one
//! dispatched instruction: its program-order identity, operand renames,
//! lifecycle status, speculation-visibility flags, and taint state. It
//! provides:
//! 1. **Shared handles:** Instructions are reference-counted; the pipeline
//!    stages and the reorder buffer all hold `DynInstPtr` clones of the same
//!    object.
//! 2. **Interior mutability:** Status flags are `Cell`s so any holder of a
//!    handle can update them without exclusive access.
//! 3. **Producer tracking:** One slot per source operand pointing at the most
//!    recent older in-flight writer of the matching physical register.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::common::error::Fault;
use crate::common::reg::{PhysRegId, RegId};

/// Monotonic global instruction sequence number assigned at dispatch.
pub type InstSeqNum = u64;

/// Hardware thread identifier.
pub type ThreadId = usize;

/// Shared handle to an in-flight instruction.
///
/// Producer slots always reference strictly older instructions, so strong
/// handles cannot form a cycle.
pub type DynInstPtr = Rc<DynInst>;

/// Static classification of an instruction, fixed at decode.
#[derive(Clone, Copy, Debug, Default)]
pub struct InstTraits {
    /// Memory-reading instruction.
    pub load: bool,
    /// Memory-writing instruction.
    pub store: bool,
    /// Instruction that computes an effective address.
    pub mem_ref: bool,
    /// Branch or jump.
    pub control: bool,
    /// Instruction whose execution can leave microarchitecturally observable
    /// state behind (e.g. a speculative cache fill).
    pub access: bool,
    /// Must not execute speculatively.
    pub non_speculative: bool,
    /// Store-conditional.
    pub store_conditional: bool,
    /// Memory barrier.
    pub mem_barrier: bool,
    /// Write barrier.
    pub write_barrier: bool,
    /// Strictly ordered memory access (e.g. device memory).
    pub strictly_ordered: bool,
}

/// One register operand: the architectural name and its rename.
#[derive(Clone, Copy, Debug)]
pub struct RegOperand {
    /// Architectural register index from decode.
    pub arch: RegId,
    /// Physical register index assigned by rename.
    pub phys: PhysRegId,
}

impl RegOperand {
    /// Creates an operand from raw architectural and physical indices.
    pub fn new(arch: u16, phys: u16) -> Self {
        Self {
            arch: RegId(arch),
            phys: PhysRegId(phys),
        }
    }
}

/// An in-flight dynamic instruction.
///
/// Identity fields (`seq_num`, `pc`, `thread_id`, operands, traits) are fixed
/// at dispatch. Everything else is status that the pipeline stages and the
/// reorder buffer update as the instruction moves toward commit or squash.
pub struct DynInst {
    /// Global program-order sequence number.
    pub seq_num: InstSeqNum,
    /// Program counter of this instruction.
    pub pc: u64,
    /// Hardware thread this instruction belongs to.
    pub thread_id: ThreadId,

    traits: InstTraits,
    srcs: Vec<RegOperand>,
    dests: Vec<RegOperand>,

    // Lifecycle status.
    in_rob: Cell<bool>,
    issued: Cell<bool>,
    executed: Cell<bool>,
    can_commit: Cell<bool>,
    load_safe_to_commit: Cell<bool>,
    committed: Cell<bool>,
    squashed: Cell<bool>,
    pending_squash: Cell<bool>,
    fault: Cell<Option<Fault>>,

    // Visibility state derived each cycle from older same-thread instructions.
    prev_insts_completed: Cell<bool>,
    prev_brs_resolved: Cell<bool>,
    prev_insts_committed: Cell<bool>,
    prev_brs_committed: Cell<bool>,
    unsquashable: Cell<bool>,

    // Taint state.
    explicit_flow: Cell<bool>,
    implicit_flow: Cell<bool>,
    addr_tainted: Cell<bool>,
    args_tainted: Cell<bool>,
    dest_tainted: Cell<bool>,

    /// Most recent older in-flight writer of each source's physical register.
    arg_producers: RefCell<Vec<Option<DynInstPtr>>>,
}

impl DynInst {
    /// Creates a new in-flight instruction and wraps it in a shared handle.
    ///
    /// Producer slots start empty; the reorder buffer wires them at insert.
    pub fn new(
        seq_num: InstSeqNum,
        pc: u64,
        thread_id: ThreadId,
        traits: InstTraits,
        srcs: Vec<RegOperand>,
        dests: Vec<RegOperand>,
    ) -> DynInstPtr {
        let num_srcs = srcs.len();
        Rc::new(Self {
            seq_num,
            pc,
            thread_id,
            traits,
            srcs,
            dests,
            in_rob: Cell::new(false),
            issued: Cell::new(false),
            executed: Cell::new(false),
            can_commit: Cell::new(false),
            // Loads are held back individually by the load queue; everything
            // else is safe by construction.
            load_safe_to_commit: Cell::new(true),
            committed: Cell::new(false),
            squashed: Cell::new(false),
            pending_squash: Cell::new(false),
            fault: Cell::new(None),
            prev_insts_completed: Cell::new(false),
            prev_brs_resolved: Cell::new(false),
            prev_insts_committed: Cell::new(false),
            prev_brs_committed: Cell::new(false),
            unsquashable: Cell::new(false),
            explicit_flow: Cell::new(false),
            implicit_flow: Cell::new(false),
            addr_tainted: Cell::new(false),
            args_tainted: Cell::new(false),
            dest_tainted: Cell::new(false),
            arg_producers: RefCell::new(vec![None; num_srcs]),
        })
    }

    // --- Operands ---

    /// Number of source register operands.
    #[inline]
    pub fn num_src_regs(&self) -> usize {
        self.srcs.len()
    }

    /// Number of destination register operands.
    #[inline]
    pub fn num_dest_regs(&self) -> usize {
        self.dests.len()
    }

    /// Architectural index of source operand `i`.
    #[inline]
    pub fn src_reg_idx(&self, i: usize) -> RegId {
        self.srcs[i].arch
    }

    /// Architectural index of destination operand `i`.
    #[inline]
    pub fn dest_reg_idx(&self, i: usize) -> RegId {
        self.dests[i].arch
    }

    /// Physical register read by source operand `i`.
    #[inline]
    pub fn renamed_src_reg_idx(&self, i: usize) -> PhysRegId {
        self.srcs[i].phys
    }

    /// Physical register written by destination operand `i`.
    #[inline]
    pub fn renamed_dest_reg_idx(&self, i: usize) -> PhysRegId {
        self.dests[i].phys
    }

    // --- Static classification ---

    #[inline]
    pub fn is_load(&self) -> bool {
        self.traits.load
    }

    #[inline]
    pub fn is_store(&self) -> bool {
        self.traits.store
    }

    #[inline]
    pub fn is_mem_ref(&self) -> bool {
        self.traits.mem_ref
    }

    #[inline]
    pub fn is_control(&self) -> bool {
        self.traits.control
    }

    #[inline]
    pub fn is_access(&self) -> bool {
        self.traits.access
    }

    #[inline]
    pub fn is_non_speculative(&self) -> bool {
        self.traits.non_speculative
    }

    #[inline]
    pub fn is_store_conditional(&self) -> bool {
        self.traits.store_conditional
    }

    #[inline]
    pub fn is_mem_barrier(&self) -> bool {
        self.traits.mem_barrier
    }

    #[inline]
    pub fn is_write_barrier(&self) -> bool {
        self.traits.write_barrier
    }

    #[inline]
    pub fn is_strictly_ordered(&self) -> bool {
        self.traits.strictly_ordered
    }

    // --- Lifecycle status ---

    pub fn set_in_rob(&self) {
        self.in_rob.set(true);
    }

    pub fn clear_in_rob(&self) {
        self.in_rob.set(false);
    }

    #[inline]
    pub fn is_in_rob(&self) -> bool {
        self.in_rob.get()
    }

    pub fn set_issued(&self) {
        self.issued.set(true);
    }

    #[inline]
    pub fn is_issued(&self) -> bool {
        self.issued.get()
    }

    pub fn set_executed(&self) {
        self.executed.set(true);
    }

    #[inline]
    pub fn is_executed(&self) -> bool {
        self.executed.get()
    }

    /// Marks the instruction as allowed to commit when it reaches the head.
    pub fn set_can_commit(&self) {
        self.can_commit.set(true);
    }

    #[inline]
    pub fn ready_to_commit(&self) -> bool {
        self.can_commit.get()
    }

    /// Set by the load queue once a load may expose its result at commit.
    pub fn set_load_safe_to_commit(&self, safe: bool) {
        self.load_safe_to_commit.set(safe);
    }

    #[inline]
    pub fn is_load_safe_to_commit(&self) -> bool {
        self.load_safe_to_commit.get()
    }

    pub fn set_committed(&self) {
        self.committed.set(true);
    }

    #[inline]
    pub fn is_committed(&self) -> bool {
        self.committed.get()
    }

    pub fn set_squashed(&self) {
        self.squashed.set(true);
    }

    #[inline]
    pub fn is_squashed(&self) -> bool {
        self.squashed.get()
    }

    /// A squash of this instruction has been requested but is stalled until
    /// its address operands are untainted.
    pub fn set_pending_squash(&self, pending: bool) {
        self.pending_squash.set(pending);
    }

    #[inline]
    pub fn has_pending_squash(&self) -> bool {
        self.pending_squash.get()
    }

    pub fn set_fault(&self, fault: Option<Fault>) {
        self.fault.set(fault);
    }

    #[inline]
    pub fn fault(&self) -> Option<Fault> {
        self.fault.get()
    }

    // --- Visibility state ---

    pub fn set_prev_insts_completed(&self) {
        self.prev_insts_completed.set(true);
    }

    #[inline]
    pub fn is_prev_insts_completed(&self) -> bool {
        self.prev_insts_completed.get()
    }

    pub fn set_prev_brs_resolved(&self) {
        self.prev_brs_resolved.set(true);
    }

    #[inline]
    pub fn is_prev_brs_resolved(&self) -> bool {
        self.prev_brs_resolved.get()
    }

    pub fn set_prev_insts_committed(&self) {
        self.prev_insts_committed.set(true);
    }

    #[inline]
    pub fn is_prev_insts_committed(&self) -> bool {
        self.prev_insts_committed.get()
    }

    pub fn set_prev_brs_committed(&self) {
        self.prev_brs_committed.set(true);
    }

    #[inline]
    pub fn is_prev_brs_committed(&self) -> bool {
        self.prev_brs_committed.get()
    }

    /// Whether the speculation policy deems this instruction safe to expose
    /// architecturally.
    pub fn set_unsquashable(&self, unsquashable: bool) {
        self.unsquashable.set(unsquashable);
    }

    #[inline]
    pub fn is_unsquashable(&self) -> bool {
        self.unsquashable.get()
    }

    // --- Taint state ---

    pub fn set_explicit_flow(&self, tainted: bool) {
        self.explicit_flow.set(tainted);
    }

    #[inline]
    pub fn has_explicit_flow(&self) -> bool {
        self.explicit_flow.get()
    }

    pub fn set_implicit_flow(&self, tainted: bool) {
        self.implicit_flow.set(tainted);
    }

    #[inline]
    pub fn has_implicit_flow(&self) -> bool {
        self.implicit_flow.get()
    }

    pub fn set_addr_tainted(&self, tainted: bool) {
        self.addr_tainted.set(tainted);
    }

    #[inline]
    pub fn is_addr_tainted(&self) -> bool {
        self.addr_tainted.get()
    }

    pub fn set_args_tainted(&self, tainted: bool) {
        self.args_tainted.set(tainted);
    }

    #[inline]
    pub fn is_args_tainted(&self) -> bool {
        self.args_tainted.get()
    }

    pub fn set_dest_tainted(&self, tainted: bool) {
        self.dest_tainted.set(tainted);
    }

    #[inline]
    pub fn is_dest_tainted(&self) -> bool {
        self.dest_tainted.get()
    }

    // --- Producer tracking ---

    /// Records `producer` as the in-flight writer feeding source operand `i`.
    /// Later recordings overwrite earlier ones.
    pub fn set_arg_producer(&self, i: usize, producer: DynInstPtr) {
        self.arg_producers.borrow_mut()[i] = Some(producer);
    }

    /// Returns the producer recorded for source operand `i`, if any.
    pub fn arg_producer(&self, i: usize) -> Option<DynInstPtr> {
        self.arg_producers.borrow()[i].clone()
    }

    /// Clears the producer slot of source operand `i`.
    pub fn clear_arg_producer(&self, i: usize) {
        self.arg_producers.borrow_mut()[i] = None;
    }

    /// Clears every producer slot.
    pub fn clear_arg_producers(&self) {
        for slot in self.arg_producers.borrow_mut().iter_mut() {
            *slot = None;
        }
    }

    /// Returns true if the producer of source operand `i` is `other`.
    pub fn arg_producer_is(&self, i: usize, other: &DynInstPtr) -> bool {
        match &self.arg_producers.borrow()[i] {
            Some(producer) => Rc::ptr_eq(producer, other),
            None => false,
        }
    }

    fn status_str(&self) -> &'static str {
        if self.is_committed() {
            "Committed"
        } else if self.ready_to_commit() {
            if self.is_executed() {
                "CanCommit(Exec)"
            } else {
                "CanCommit(NonExec)"
            }
        } else if self.is_executed() {
            "Executed"
        } else if self.is_issued() {
            "Issued"
        } else {
            "NotIssued"
        }
    }
}

impl fmt::Display for DynInst {
    /// One-line state summary used by the ROB contents dump.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[sn:{}] tid={} pc={:#x} status={} squashed={} fault={} pendingSquash={} \
             unsquashable={} destTainted={} argsTainted={} PBR={} PBC={} PIR={} PIC={}",
            self.seq_num,
            self.thread_id,
            self.pc,
            self.status_str(),
            self.is_squashed() as u8,
            self.fault().is_some() as u8,
            self.has_pending_squash() as u8,
            self.is_unsquashable() as u8,
            self.is_dest_tainted() as u8,
            self.is_args_tainted() as u8,
            self.is_prev_brs_resolved() as u8,
            self.is_prev_brs_committed() as u8,
            self.is_prev_insts_completed() as u8,
            self.is_prev_insts_committed() as u8,
        )
    }
}
