use sttsim_core::config::{Config, SmtRobPolicy};
use sttsim_core::core::pipeline::dyn_inst::{DynInstPtr, InstSeqNum, ThreadId};
use sttsim_core::core::pipeline::rob::Rob;

/// Builds a single-thread config with the given sizing.
pub fn config(entries: usize, squash_width: usize) -> Config {
    let mut config = Config::default();
    config.rob.num_rob_entries = entries;
    config.rob.squash_width = squash_width;
    config
}

/// Builds an SMT config with the given sharing policy.
pub fn smt_config(
    entries: usize,
    squash_width: usize,
    num_threads: usize,
    policy: SmtRobPolicy,
    threshold: usize,
) -> Config {
    let mut config = config(entries, squash_width);
    config.rob.num_threads = num_threads;
    config.rob.smt_rob_policy = policy;
    config.rob.smt_rob_threshold = threshold;
    config
}

/// Enables taint tracking and, optionally, the protection scheme switches.
pub fn stt_config(entries: usize, squash_width: usize, protection: bool) -> Config {
    let mut config = config(entries, squash_width);
    config.speculation.stt = true;
    config.speculation.protection_enabled = protection;
    config
}

/// Test wrapper owning a reorder buffer and the active-thread set.
pub struct RobHarness {
    pub rob: Rob,
    pub active: Vec<ThreadId>,
}

impl RobHarness {
    /// Single-thread harness.
    pub fn new(entries: usize, squash_width: usize) -> Self {
        Self::with_config(config(entries, squash_width))
    }

    pub fn with_config(config: Config) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let active: Vec<ThreadId> = (0..config.rob.num_threads).collect();
        Self {
            rob: Rob::new(&config),
            active,
        }
    }

    pub fn insert(&mut self, inst: &DynInstPtr) {
        self.rob.insert_inst(inst);
    }

    pub fn retire(&mut self, tid: ThreadId) -> DynInstPtr {
        self.rob.retire_head(&self.active, tid)
    }

    pub fn squash(&mut self, squash_num: InstSeqNum, tid: ThreadId) {
        self.rob.squash(squash_num, &self.active, tid);
    }

    /// One squash pump invocation.
    pub fn pump(&mut self, tid: ThreadId) {
        self.rob.do_squash(&self.active, tid);
    }

    /// Starts a squash and pumps until the thread reports done.
    pub fn squash_exhaustively(&mut self, squash_num: InstSeqNum, tid: ThreadId) {
        self.squash(squash_num, tid);
        while !self.rob.is_done_squashing(tid) {
            self.pump(tid);
        }
    }

    pub fn update_visible_state(&self) {
        self.rob.update_visible_state(&self.active);
    }

    pub fn compute_taint(&self) {
        self.rob.compute_taint(&self.active);
    }
}
