//! Per-cycle visibility analysis.
//!
//! Walks each active thread's queue front-to-back once per tick and derives,
//! for every in-flight instruction, whether all older instructions have
//! completed, whether all older branches have resolved, and the committed
//! variants of both. From those flags and the configured protection scheme it
//! derives whether the instruction is unsquashable, i.e. safe to expose
//! architecturally.

use super::Rob;
use crate::core::pipeline::dyn_inst::ThreadId;

impl Rob {
    /// Updates the prev-instructions / prev-branches state of every
    /// in-flight instruction and derives its unsquashable flag.
    ///
    /// The running state is written to an instruction before it is
    /// downgraded by that instruction: each flag describes strictly older
    /// instructions only.
    pub fn update_visible_state(&self, active_threads: &[ThreadId]) {
        for &tid in active_threads {
            let thread = &self.threads[tid];
            if thread.list.is_empty() {
                continue;
            }

            let mut prev_insts_complete = true;
            let mut prev_brs_resolved = true;
            let mut prev_insts_committed = true;
            let mut prev_brs_committed = true;

            for inst in thread.list.iter() {
                // Nothing further down the queue can observe a better state.
                if !prev_insts_complete && !prev_brs_resolved {
                    break;
                }

                if prev_insts_complete {
                    inst.set_prev_insts_completed();
                }
                if prev_brs_resolved {
                    inst.set_prev_brs_resolved();
                }
                if prev_insts_committed {
                    inst.set_prev_insts_committed();
                }
                if prev_brs_committed {
                    inst.set_prev_brs_committed();
                }

                if inst.is_control() {
                    prev_brs_committed = false;
                    if !inst.ready_to_commit() || inst.fault().is_some() || inst.is_squashed() {
                        prev_brs_resolved = false;
                    }
                }

                prev_insts_committed = false;

                // Instructions that only commit at the head hold everything
                // younger back.
                if inst.is_non_speculative()
                    || inst.is_store_conditional()
                    || inst.is_mem_barrier()
                    || inst.is_write_barrier()
                    || (inst.is_load() && inst.is_strictly_ordered())
                {
                    prev_insts_complete = false;
                }
                if !(inst.ready_to_commit() && inst.is_load_safe_to_commit())
                    || inst.fault().is_some()
                    || inst.is_squashed()
                {
                    prev_insts_complete = false;
                }

                if self.mode.protection_enabled {
                    let safe = if self.mode.futuristic {
                        inst.is_prev_insts_completed()
                    } else {
                        inst.is_prev_brs_resolved()
                    };
                    inst.set_unsquashable(safe);
                } else {
                    // Unprotected baseline: everything may expose state.
                    inst.set_unsquashable(true);
                }
            }
        }
    }
}
