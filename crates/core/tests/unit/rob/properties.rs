// Property-based tests for reorder buffer invariants.
//
// Three categories:
// 1. Producer wiring: after any insert sequence, each source's producer is
//    the most recent older writer of the matching physical register.
// 2. Squash: exhaustive pumping flags exactly the instructions younger than
//    the target, at most `squash_width` per pump.
// 3. Occupancy: head/tail/length bookkeeping stays consistent under random
//    insert/retire interleavings across threads.
//
// Uses proptest with explicit configuration to prevent CI flakiness.

use proptest::prelude::*;

use crate::common::builder::DynInstBuilder;
use crate::common::harness::{smt_config, RobHarness};
use sttsim_core::config::SmtRobPolicy;
use sttsim_core::core::pipeline::dyn_inst::DynInstPtr;

/// Operand spec: (arch, phys) sources and phys destinations drawn from a
/// small register pool so collisions are common.
fn arb_operands() -> impl Strategy<Value = (Vec<(u16, u16)>, Vec<u16>)> {
    (
        prop::collection::vec((prop_oneof![Just(16u16), 1u16..6u16], 40u16..46u16), 0..3),
        prop::collection::vec(40u16..46u16, 0..3),
    )
}

fn build_insts(specs: &[(Vec<(u16, u16)>, Vec<u16>)]) -> Vec<DynInstPtr> {
    specs
        .iter()
        .enumerate()
        .map(|(i, (srcs, dests))| {
            let mut builder = DynInstBuilder::new(i as u64 + 1);
            for &(arch, phys) in srcs {
                builder = builder.src(arch, phys);
            }
            for (j, &phys) in dests.iter().enumerate() {
                builder = builder.dest(20 + j as u16, phys);
            }
            builder.build()
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn producer_wiring_matches_last_older_writer(
        specs in prop::collection::vec(arb_operands(), 1..20)
    ) {
        let mut h = RobHarness::new(64, 8);
        let insts = build_insts(&specs);
        for inst in &insts {
            h.insert(inst);
        }

        for (i, (srcs, _)) in specs.iter().enumerate() {
            for (s, &(arch, phys)) in srcs.iter().enumerate() {
                let expected = if arch == 16 {
                    None
                } else {
                    specs[..i]
                        .iter()
                        .enumerate()
                        .rev()
                        .find(|(_, (_, dests))| dests.contains(&phys))
                        .map(|(j, _)| j)
                };

                match expected {
                    Some(j) => prop_assert!(insts[i].arg_producer_is(s, &insts[j])),
                    None => prop_assert!(insts[i].arg_producer(s).is_none()),
                }
            }
        }
    }

    #[test]
    fn squash_flags_exactly_the_younger_entries(
        len in 1usize..20,
        width in 1usize..5,
        target in 0u64..22,
    ) {
        let mut h = RobHarness::new(32, width);
        let insts: Vec<DynInstPtr> = (1..=len as u64)
            .map(|seq| {
                let inst = DynInstBuilder::new(seq).build();
                h.insert(&inst);
                inst
            })
            .collect();

        let count = |insts: &[DynInstPtr]| {
            insts.iter().filter(|inst| inst.is_squashed()).count()
        };

        h.squash(target, 0);
        let mut flagged = count(&insts);
        prop_assert!(flagged <= width);

        while !h.rob.is_done_squashing(0) {
            h.pump(0);
            let now = count(&insts);
            prop_assert!(now - flagged <= width);
            flagged = now;
        }

        for inst in &insts {
            if inst.seq_num > target {
                prop_assert!(inst.is_squashed());
                prop_assert!(inst.ready_to_commit());
                prop_assert!(!inst.has_pending_squash());
            } else {
                prop_assert!(!inst.is_squashed());
                prop_assert!(!inst.ready_to_commit());
            }
        }

        // Flag-only squash: nothing left the queue.
        prop_assert_eq!(h.rob.thread_len(0), len);
    }

    #[test]
    fn occupancy_bookkeeping_survives_random_interleavings(
        ops in prop::collection::vec((any::<bool>(), 0usize..2), 0..40)
    ) {
        let mut h = RobHarness::with_config(
            smt_config(64, 8, 2, SmtRobPolicy::Dynamic, 0),
        );

        let mut shadow: [Vec<u64>; 2] = [Vec::new(), Vec::new()];
        let mut next_seq = 1u64;

        for (is_insert, tid) in ops {
            if is_insert {
                if h.rob.num_free_entries() == 0 {
                    continue;
                }
                let inst = DynInstBuilder::new(next_seq).tid(tid).build();
                h.insert(&inst);
                shadow[tid].push(next_seq);
                next_seq += 1;
            } else if !h.rob.is_thread_empty(tid) {
                h.rob.read_head_inst(tid).unwrap().set_can_commit();
                let retired = h.retire(tid);
                let expected = shadow[tid].remove(0);
                prop_assert_eq!(retired.seq_num, expected);
            }

            // Per-thread bookkeeping matches the shadow model.
            for t in 0..2 {
                prop_assert_eq!(h.rob.thread_len(t), shadow[t].len());
                prop_assert_eq!(
                    h.rob.read_head_inst(t).map(|inst| inst.seq_num),
                    shadow[t].first().copied()
                );
                prop_assert_eq!(
                    h.rob.read_tail_inst(t).map(|inst| inst.seq_num),
                    shadow[t].last().copied()
                );
            }
            prop_assert_eq!(h.rob.len(), shadow[0].len() + shadow[1].len());

            // The global head is the minimum front across threads.
            let expected_head = [shadow[0].first(), shadow[1].first()]
                .into_iter()
                .flatten()
                .min()
                .copied();
            prop_assert_eq!(h.rob.head_inst().map(|inst| inst.seq_num), expected_head);
        }

        // Drain and check the final sanity condition.
        for t in 0..2 {
            while !h.rob.is_thread_empty(t) {
                h.rob.read_head_inst(t).unwrap().set_can_commit();
                h.retire(t);
            }
        }
        h.rob.drain_sanity_check();
    }
}
