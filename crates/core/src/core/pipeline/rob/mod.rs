//! Reorder Buffer (ROB) for in-order commit of a speculative SMT backend.
//!
//! The ROB records in-flight instructions in program order, one queue per
//! hardware thread. It provides:
//! 1. **Insertion:** Appends dispatched instructions and wires their
//!    argument-producer slots to older in-flight writers.
//! 2. **In-order Retirement:** Retires the head instruction of a thread once
//!    it is ready to commit.
//! 3. **Squash:** Flags speculative instructions younger than a target
//!    sequence number, bounded by a configurable width per pump invocation.
//! 4. **SMT capacity policy:** Dynamic, partitioned, or threshold sharing of
//!    the total capacity among active threads.
//! 5. **Global cursors:** Tracks the oldest and youngest in-flight
//!    instruction across all threads.
//!
//! The per-cycle visibility and taint passes live in the `visibility` and
//! `taint` submodules.

mod taint;
mod visibility;

use std::collections::VecDeque;
use std::rc::Rc;

use log::{debug, trace};

use crate::common::reg::ZERO_REG;
use crate::config::{Config, SmtRobPolicy, SpeculationConfig};
use crate::core::pipeline::dyn_inst::{DynInstPtr, InstSeqNum, ThreadId};
use crate::stats::RobStats;

/// Commit-side state of one thread's queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ThreadStatus {
    /// Instructions enter and retire normally.
    #[default]
    Normal,
    /// A squash is in progress; the pump runs until the cursor passes the
    /// youngest surviving instruction.
    Squashing,
}

/// Per-thread instruction queue and squash state.
struct RobThread {
    /// In-flight instructions, oldest at the front, strictly ascending
    /// sequence numbers.
    list: VecDeque<DynInstPtr>,
    /// Capacity allotted to this thread by the sharing policy.
    max_entries: usize,
    status: ThreadStatus,
    /// Position of the next entry to squash, or `None` when no pump is
    /// outstanding.
    squash_cursor: Option<usize>,
    /// Youngest sequence number that survives the current squash.
    squashed_seq_num: InstSeqNum,
    done_squashing: bool,
}

impl RobThread {
    fn new(max_entries: usize) -> Self {
        Self {
            list: VecDeque::new(),
            max_entries,
            status: ThreadStatus::Normal,
            squash_cursor: None,
            squashed_seq_num: 0,
            done_squashing: true,
        }
    }
}

/// Reorder buffer: per-thread program-order queues with in-order retirement,
/// bulk squash, and SMT capacity partitioning.
pub struct Rob {
    /// Total entry capacity across all threads.
    num_entries: usize,
    /// Maximum squashes processed per pump invocation.
    squash_width: usize,
    /// Static upper bound on hardware threads.
    num_threads: usize,
    policy: SmtRobPolicy,
    /// Speculation-safety switches observed by the analysis passes.
    mode: SpeculationConfig,
    threads: Vec<RobThread>,
    /// Number of instructions across all threads.
    num_insts: usize,
    /// Oldest in-flight instruction across all threads; `None` when empty.
    head: Option<DynInstPtr>,
    /// Youngest in-flight instruction across all threads; `None` when empty.
    tail: Option<DynInstPtr>,
    /// Access counters reported at teardown.
    pub stats: RobStats,
}

impl Rob {
    /// Creates a reorder buffer from the configuration and applies the
    /// sharing policy to every thread's allotment.
    pub fn new(config: &Config) -> Self {
        let rob = &config.rob;
        let per_thread = match rob.smt_rob_policy {
            SmtRobPolicy::Dynamic => rob.num_rob_entries,
            SmtRobPolicy::Partitioned => {
                debug!(target: "rob", "ROB sharing policy set to Partitioned");
                rob.num_rob_entries / rob.num_threads
            }
            SmtRobPolicy::Threshold => {
                debug!(target: "rob", "ROB sharing policy set to Threshold");
                rob.smt_rob_threshold
            }
        };

        let threads = (0..rob.num_threads)
            .map(|_| RobThread::new(per_thread))
            .collect();

        let mut this = Self {
            num_entries: rob.num_rob_entries,
            squash_width: rob.squash_width,
            num_threads: rob.num_threads,
            policy: rob.smt_rob_policy,
            mode: config.speculation,
            threads,
            num_insts: 0,
            head: None,
            tail: None,
            stats: RobStats::default(),
        };
        this.reset_state();
        this
    }

    /// Clears squash state, counters, and the global cursors.
    ///
    /// The per-thread lists are expected to be empty (the pipeline drains
    /// before any state handover).
    pub fn reset_state(&mut self) {
        for thread in &mut self.threads {
            thread.status = ThreadStatus::Normal;
            thread.squash_cursor = None;
            thread.squashed_seq_num = 0;
            thread.done_squashing = true;
        }
        self.num_insts = 0;
        self.head = None;
        self.tail = None;
    }

    /// Reinitialises the buffer when another CPU's state is taken over.
    pub fn take_over_from(&mut self) {
        self.reset_state();
    }

    /// Reapplies the sharing policy after the active-thread set changed.
    pub fn reset_entries(&mut self, active_threads: &[ThreadId]) {
        if self.policy != SmtRobPolicy::Dynamic || self.num_threads > 1 {
            let active = active_threads.len();
            for &tid in active_threads {
                match self.policy {
                    SmtRobPolicy::Partitioned => {
                        self.threads[tid].max_entries = self.num_entries / active;
                    }
                    SmtRobPolicy::Threshold if active == 1 => {
                        self.threads[tid].max_entries = self.num_entries;
                    }
                    _ => {}
                }
            }
        }
    }

    /// Partitioned share for `num_threads` threads, used by rename for its
    /// own bookkeeping. Zero for the other policies.
    pub fn entry_amount(&self, num_threads: usize) -> usize {
        if self.policy == SmtRobPolicy::Partitioned {
            self.num_entries / num_threads
        } else {
            0
        }
    }

    // --- Occupancy ---

    /// Total entry capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.num_entries
    }

    /// Number of instructions across all threads.
    #[inline]
    pub fn len(&self) -> usize {
        self.num_insts
    }

    /// Returns true if no thread holds any instruction.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_insts == 0
    }

    /// Number of instructions in thread `tid`.
    #[inline]
    pub fn thread_len(&self, tid: ThreadId) -> usize {
        self.threads[tid].list.len()
    }

    /// Returns true if thread `tid` holds no instructions.
    #[inline]
    pub fn is_thread_empty(&self, tid: ThreadId) -> bool {
        self.threads[tid].list.is_empty()
    }

    /// Free entries across the whole buffer.
    #[inline]
    pub fn num_free_entries(&self) -> usize {
        self.num_entries - self.num_insts
    }

    /// Free entries within thread `tid`'s policy allotment.
    #[inline]
    pub fn num_free_entries_for(&self, tid: ThreadId) -> usize {
        self.threads[tid].max_entries - self.threads[tid].list.len()
    }

    /// Capacity allotted to thread `tid` by the sharing policy.
    #[inline]
    pub fn max_entries_for(&self, tid: ThreadId) -> usize {
        self.threads[tid].max_entries
    }

    // --- Insertion ---

    /// Inserts a dispatched instruction at the back of its thread's queue.
    ///
    /// Wires each source operand's producer slot to the most recent older
    /// same-thread instruction writing the matching physical register. Reads
    /// of the zero register never take a producer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is full; callers gate dispatch on
    /// `num_free_entries_for`.
    pub fn insert_inst(&mut self, inst: &DynInstPtr) {
        self.stats.writes += 1;

        trace!(target: "rob", "Adding inst PC {:#x} to the ROB.", inst.pc);

        assert!(self.num_insts != self.num_entries, "ROB full on insert");

        let tid = inst.thread_id;

        for prev in self.threads[tid].list.iter() {
            for i in 0..inst.num_src_regs() {
                if inst.src_reg_idx(i) == ZERO_REG {
                    continue;
                }
                for j in 0..prev.num_dest_regs() {
                    if inst.renamed_src_reg_idx(i) == prev.renamed_dest_reg_idx(j) {
                        inst.set_arg_producer(i, Rc::clone(prev));
                    }
                }
            }
        }

        self.threads[tid].list.push_back(Rc::clone(inst));

        // First instruction overall becomes the global head; the newest
        // insert is always the global tail (sequence numbers are assigned in
        // dispatch order).
        if self.num_insts == 0 {
            self.head = Some(Rc::clone(inst));
        }
        self.tail = Some(Rc::clone(inst));

        inst.set_in_rob();
        self.num_insts += 1;

        trace!(
            target: "rob",
            "[tid:{}] Now has {} instructions.",
            tid,
            self.threads[tid].list.len()
        );
    }

    // --- Retirement ---

    /// Retires the head instruction of thread `tid` and returns it so the
    /// enclosing CPU can drop it from its own tracking.
    ///
    /// Producer slots referencing the retired instruction are cleared in
    /// every surviving same-thread instruction, and the retired
    /// instruction's own slots are released.
    ///
    /// # Panics
    ///
    /// Panics if the thread is empty or its head is not ready to commit.
    pub fn retire_head(&mut self, active_threads: &[ThreadId], tid: ThreadId) -> DynInstPtr {
        self.stats.writes += 1;

        assert!(self.num_insts > 0, "retire from an empty ROB");

        let head_inst = self.threads[tid]
            .list
            .front()
            .cloned()
            .expect("retire from an empty thread");

        assert!(
            head_inst.ready_to_commit(),
            "retiring head [sn:{}] that is not ready to commit",
            head_inst.seq_num
        );

        trace!(
            target: "rob",
            "[tid:{}] Retiring head instruction, PC {:#x}, [sn:{}]",
            tid,
            head_inst.pc,
            head_inst.seq_num
        );

        self.num_insts -= 1;
        head_inst.clear_in_rob();
        head_inst.set_committed();

        self.threads[tid].list.pop_front();

        // An outstanding squash cursor indexes the queue; the front erasure
        // shifts it down by one. The pump never leaves the cursor on the
        // head entry.
        if let Some(cursor) = self.threads[tid].squash_cursor {
            debug_assert!(cursor > 0, "retired the entry under the squash cursor");
            self.threads[tid].squash_cursor = Some(cursor - 1);
        }

        for next in self.threads[tid].list.iter() {
            for i in 0..next.num_src_regs() {
                if next.arg_producer_is(i, &head_inst) {
                    next.clear_arg_producer(i);
                }
            }
        }
        head_inst.clear_arg_producers();

        self.update_head(active_threads);

        head_inst
    }

    /// Returns true if thread `tid`'s head instruction may retire this cycle.
    pub fn is_head_ready(&mut self, tid: ThreadId) -> bool {
        self.stats.reads += 1;
        match self.threads[tid].list.front() {
            Some(head) => head.ready_to_commit() && head.is_load_safe_to_commit(),
            None => false,
        }
    }

    /// Returns true if any active thread's head may retire this cycle.
    pub fn can_commit(&mut self, active_threads: &[ThreadId]) -> bool {
        active_threads.iter().any(|&tid| self.is_head_ready(tid))
    }

    // --- Squash engine ---

    /// Begins squashing every instruction in thread `tid` younger than
    /// `squash_num` and runs the first pump invocation.
    ///
    /// `squash_num` is the youngest surviving sequence number. Squashed
    /// instructions are flagged, not erased; they drain through the normal
    /// retirement path once the pipeline catches up.
    pub fn squash(&mut self, squash_num: InstSeqNum, active_threads: &[ThreadId], tid: ThreadId) {
        if self.threads[tid].list.is_empty() {
            trace!(
                target: "rob",
                "Does not need to squash due to being empty [sn:{}]",
                squash_num
            );
            return;
        }

        trace!(target: "rob", "Starting to squash within the ROB.");

        let thread = &mut self.threads[tid];
        thread.status = ThreadStatus::Squashing;
        thread.done_squashing = false;
        thread.squashed_seq_num = squash_num;
        thread.squash_cursor = Some(thread.list.len() - 1);

        self.do_squash(active_threads, tid);
    }

    /// One squash pump invocation: flags at most `squash_width` entries,
    /// walking from the cursor toward the front of the queue.
    ///
    /// Invoked once per tick while `is_done_squashing(tid)` is false.
    ///
    /// # Panics
    ///
    /// Panics if no squash is outstanding for the thread.
    pub fn do_squash(&mut self, active_threads: &[ThreadId], tid: ThreadId) {
        self.stats.writes += 1;

        let squash_width = self.squash_width;
        let thread = &mut self.threads[tid];

        trace!(
            target: "rob",
            "[tid:{}] Squashing instructions until [sn:{}].",
            tid,
            thread.squashed_seq_num
        );

        let mut idx = thread
            .squash_cursor
            .expect("squash pump invoked without a valid cursor");
        let target = thread.squashed_seq_num;

        if thread.list[idx].seq_num < target {
            trace!(target: "rob", "[tid:{}] Done squashing instructions.", tid);
            thread.squash_cursor = None;
            thread.done_squashing = true;
            thread.status = ThreadStatus::Normal;
            return;
        }

        let mut rob_tail_update = false;
        let mut num_squashed = 0;

        while num_squashed < squash_width && thread.list[idx].seq_num > target {
            let inst = &thread.list[idx];

            trace!(
                target: "rob",
                "[tid:{}] Squashing instruction PC {:#x}, seq num {}.",
                inst.thread_id,
                inst.pc,
                inst.seq_num
            );

            // Squashed and ready to commit, so it can drain out of the
            // pipeline through the normal retirement path.
            inst.set_squashed();
            inst.set_pending_squash(false);
            inst.set_can_commit();

            num_squashed += 1;

            if idx == thread.list.len() - 1 {
                rob_tail_update = true;
            }

            if idx == 0 {
                trace!(target: "rob", "Reached head of instruction list while squashing.");
                thread.squash_cursor = None;
                thread.done_squashing = true;
                thread.status = ThreadStatus::Normal;
                return;
            }

            idx -= 1;
        }

        thread.squash_cursor = Some(idx);

        if thread.list[idx].seq_num <= target {
            trace!(target: "rob", "[tid:{}] Done squashing instructions.", tid);
            thread.squash_cursor = None;
            thread.done_squashing = true;
            thread.status = ThreadStatus::Normal;
        }

        if rob_tail_update {
            self.update_tail(active_threads);
        }
    }

    /// Returns true if no squash pump is outstanding for thread `tid`.
    #[inline]
    pub fn is_done_squashing(&self, tid: ThreadId) -> bool {
        self.threads[tid].done_squashing
    }

    /// Commit-side state of thread `tid`.
    #[inline]
    pub fn thread_status(&self, tid: ThreadId) -> ThreadStatus {
        self.threads[tid].status
    }

    // --- Pending-squash selection ---

    /// Returns the oldest instruction in thread `tid` whose stalled squash
    /// has been resolved: its squash is pending, its arguments are no longer
    /// tainted, and it has not already been squashed.
    pub fn resolved_pending_squash_inst(&self, tid: ThreadId) -> Option<DynInstPtr> {
        self.threads[tid]
            .list
            .iter()
            .find(|inst| {
                inst.has_pending_squash() && !inst.is_args_tainted() && !inst.is_squashed()
            })
            .cloned()
    }

    // --- Global cursors ---

    /// Oldest in-flight instruction across all threads; `None` when empty.
    pub fn head_inst(&self) -> Option<DynInstPtr> {
        self.head.clone()
    }

    /// Youngest in-flight instruction across all threads; `None` when empty.
    pub fn tail_inst(&self) -> Option<DynInstPtr> {
        self.tail.clone()
    }

    /// Head instruction of thread `tid`, if any.
    pub fn read_head_inst(&self, tid: ThreadId) -> Option<DynInstPtr> {
        let head = self.threads[tid].list.front().cloned();
        if let Some(inst) = &head {
            debug_assert!(inst.is_in_rob());
        }
        head
    }

    /// Tail instruction of thread `tid`, if any.
    pub fn read_tail_inst(&self, tid: ThreadId) -> Option<DynInstPtr> {
        self.threads[tid].list.back().cloned()
    }

    /// Finds the in-flight instruction of thread `tid` with the given
    /// sequence number.
    pub fn find_inst(&self, tid: ThreadId, seq_num: InstSeqNum) -> Option<DynInstPtr> {
        self.threads[tid]
            .list
            .iter()
            .find(|inst| inst.seq_num == seq_num)
            .cloned()
    }

    /// Repoints the global head at the active thread whose front instruction
    /// has the minimum sequence number.
    fn update_head(&mut self, active_threads: &[ThreadId]) {
        let mut lowest: Option<DynInstPtr> = None;

        for &tid in active_threads {
            if let Some(front) = self.threads[tid].list.front() {
                let replace = match &lowest {
                    Some(current) => front.seq_num < current.seq_num,
                    None => true,
                };
                if replace {
                    lowest = Some(Rc::clone(front));
                }
            }
        }

        self.head = lowest;
    }

    /// Repoints the global tail at the active thread whose back instruction
    /// has the maximum sequence number.
    fn update_tail(&mut self, active_threads: &[ThreadId]) {
        let mut highest: Option<DynInstPtr> = None;

        for &tid in active_threads {
            if let Some(back) = self.threads[tid].list.back() {
                let replace = match &highest {
                    Some(current) => back.seq_num > current.seq_num,
                    None => true,
                };
                if replace {
                    highest = Some(Rc::clone(back));
                }
            }
        }

        self.tail = highest;
    }

    // --- Drain / debug ---

    /// Asserts that the buffer drained completely.
    pub fn drain_sanity_check(&self) {
        for thread in &self.threads {
            assert!(thread.list.is_empty(), "thread list not drained");
        }
        assert!(self.is_empty(), "ROB not drained");
    }

    /// Logs the full contents of every active thread's queue.
    pub fn dump(&self, active_threads: &[ThreadId]) {
        for &tid in active_threads {
            debug!(target: "rob", "ROB for thread {}", tid);
            for inst in self.threads[tid].list.iter() {
                debug!(target: "rob", "{}", inst);
            }
        }
    }
}
