use sttsim_core::common::error::Fault;
use sttsim_core::core::pipeline::dyn_inst::{
    DynInst, DynInstPtr, InstSeqNum, InstTraits, RegOperand, ThreadId,
};

/// Fluent builder for in-flight instructions.
///
/// Defaults to a plain ALU instruction on thread 0 with no operands, not yet
/// ready to commit.
pub struct DynInstBuilder {
    seq_num: InstSeqNum,
    pc: u64,
    thread_id: ThreadId,
    traits: InstTraits,
    srcs: Vec<RegOperand>,
    dests: Vec<RegOperand>,
    ready: bool,
    executed: bool,
    pending_squash: bool,
    fault: Option<Fault>,
}

impl DynInstBuilder {
    pub fn new(seq_num: InstSeqNum) -> Self {
        Self {
            seq_num,
            pc: 0x1000 + seq_num * 4,
            thread_id: 0,
            traits: InstTraits::default(),
            srcs: Vec::new(),
            dests: Vec::new(),
            ready: false,
            executed: false,
            pending_squash: false,
            fault: None,
        }
    }

    pub fn pc(mut self, pc: u64) -> Self {
        self.pc = pc;
        self
    }

    pub fn tid(mut self, tid: ThreadId) -> Self {
        self.thread_id = tid;
        self
    }

    /// Adds a source operand (architectural index, physical index).
    pub fn src(mut self, arch: u16, phys: u16) -> Self {
        self.srcs.push(RegOperand::new(arch, phys));
        self
    }

    /// Adds a destination operand (architectural index, physical index).
    pub fn dest(mut self, arch: u16, phys: u16) -> Self {
        self.dests.push(RegOperand::new(arch, phys));
        self
    }

    // --- Instruction classes ---

    pub fn load(mut self) -> Self {
        self.traits.load = true;
        self.traits.mem_ref = true;
        self
    }

    pub fn store(mut self) -> Self {
        self.traits.store = true;
        self.traits.mem_ref = true;
        self
    }

    /// A memory reference that is neither load nor store (malformed).
    pub fn raw_mem_ref(mut self) -> Self {
        self.traits.mem_ref = true;
        self
    }

    pub fn branch(mut self) -> Self {
        self.traits.control = true;
        self
    }

    pub fn access(mut self) -> Self {
        self.traits.access = true;
        self
    }

    pub fn non_speculative(mut self) -> Self {
        self.traits.non_speculative = true;
        self
    }

    pub fn store_conditional(mut self) -> Self {
        self.traits.store_conditional = true;
        self
    }

    pub fn mem_barrier(mut self) -> Self {
        self.traits.mem_barrier = true;
        self
    }

    pub fn write_barrier(mut self) -> Self {
        self.traits.write_barrier = true;
        self
    }

    pub fn strictly_ordered(mut self) -> Self {
        self.traits.strictly_ordered = true;
        self
    }

    // --- Dynamic state applied after construction ---

    /// Marks the instruction ready to commit.
    pub fn ready(mut self) -> Self {
        self.ready = true;
        self
    }

    pub fn executed(mut self) -> Self {
        self.executed = true;
        self
    }

    pub fn pending_squash(mut self) -> Self {
        self.pending_squash = true;
        self
    }

    pub fn faulted(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn build(self) -> DynInstPtr {
        let inst = DynInst::new(
            self.seq_num,
            self.pc,
            self.thread_id,
            self.traits,
            self.srcs,
            self.dests,
        );
        if self.executed {
            inst.set_issued();
            inst.set_executed();
        }
        if self.ready {
            inst.set_can_commit();
        }
        if self.pending_squash {
            inst.set_pending_squash(true);
        }
        inst.set_fault(self.fault);
        inst
    }
}

/// Shorthand for a ready single-destination ALU instruction.
pub fn ready_alu(seq_num: InstSeqNum, dest_phys: u16) -> DynInstPtr {
    DynInstBuilder::new(seq_num)
        .dest(1, dest_phys)
        .ready()
        .executed()
        .build()
}
