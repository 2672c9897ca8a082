//! Speculative taint tracking over in-flight instructions.
//!
//! Once per tick, after the visibility pass, every active thread's queue is
//! walked front-to-back and three information flows are evaluated per
//! instruction:
//! 1. **Explicit flow:** A source operand's producer still holds a tainted,
//!    uncommitted destination.
//! 2. **Implicit flow:** Some older control instruction in the same thread
//!    carries explicit flow (tracked only when the implicit channel is
//!    modeled).
//! 3. **Address flow:** A producer feeding the effective-address operands of
//!    a memory reference is tainted and uncommitted.
//!
//! The argument-taint and destination-taint flags are then derived; an
//! access instruction that is not yet unsquashable always taints its
//! destination.

use log::error;

use super::Rob;
use crate::core::pipeline::dyn_inst::{DynInstPtr, ThreadId};

impl Rob {
    /// Recomputes the taint state of every in-flight instruction.
    ///
    /// Producers earlier in the queue are visited first, so a taint derived
    /// this tick propagates through a whole dependence chain in one pass.
    ///
    /// # Panics
    ///
    /// Panics if speculative taint tracking is disabled in the configuration.
    pub fn compute_taint(&self, active_threads: &[ThreadId]) {
        assert!(self.mode.stt, "taint pass invoked with STT disabled");

        for &tid in active_threads {
            let thread = &self.threads[tid];
            if thread.list.is_empty() {
                continue;
            }

            for (pos, inst) in thread.list.iter().enumerate() {
                self.explicit_flow(tid, inst);
                self.implicit_flow(tid, pos, inst);
                self.address_flow(tid, inst);

                // Note: implicit flow is recorded but does not feed
                // args_tainted.
                inst.set_args_tainted(inst.has_explicit_flow());

                inst.set_dest_tainted(inst.is_args_tainted());
                if inst.is_access() && !inst.is_unsquashable() {
                    inst.set_dest_tainted(true);
                }
            }
        }
    }

    /// Marks `inst` as carrying explicit flow if any source operand's
    /// producer holds a tainted, uncommitted destination.
    fn explicit_flow(&self, tid: ThreadId, inst: &DynInstPtr) {
        for i in 0..inst.num_src_regs() {
            if let Some(producer) = inst.arg_producer(i) {
                debug_assert_eq!(producer.thread_id, tid);
                if producer.is_dest_tainted() && !producer.is_committed() {
                    inst.set_explicit_flow(true);
                    return;
                }
            }
        }
        inst.set_explicit_flow(false);
    }

    /// Marks `inst` as carrying implicit flow if any older control
    /// instruction in the same thread carries explicit flow. Always false
    /// when the implicit channel is not modeled.
    fn implicit_flow(&self, tid: ThreadId, pos: usize, inst: &DynInstPtr) {
        if self.mode.imp_channel {
            for prev in self.threads[tid].list.iter().take(pos) {
                if prev.is_control() && prev.has_explicit_flow() {
                    inst.set_implicit_flow(true);
                    return;
                }
            }
        }
        inst.set_implicit_flow(false);
    }

    /// Marks `inst`'s effective address as tainted if a producer feeding an
    /// address operand holds a tainted, uncommitted destination.
    ///
    /// # Panics
    ///
    /// Panics on a memory reference that is neither a load nor a store.
    fn address_flow(&self, tid: ThreadId, inst: &DynInstPtr) {
        if !inst.is_mem_ref() {
            inst.set_addr_tainted(false);
            return;
        }

        // Source 0 of a store is the data operand; only the remaining
        // sources form the address.
        let first_addr_src = if inst.is_store() {
            1
        } else if inst.is_load() {
            0
        } else {
            error!(target: "rob", "unidentified memory reference [sn:{}]", inst.seq_num);
            self.dump(&[tid]);
            panic!("unidentified memory reference [sn:{}]", inst.seq_num);
        };

        for i in first_addr_src..inst.num_src_regs() {
            if let Some(producer) = inst.arg_producer(i) {
                debug_assert_eq!(producer.thread_id, tid);
                if producer.is_dest_tainted() && !producer.is_committed() {
                    inst.set_addr_tainted(true);
                    return;
                }
            }
        }

        inst.set_addr_tainted(false);
    }
}
