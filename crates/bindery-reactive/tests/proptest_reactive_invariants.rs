//! Property-based invariant tests for the reactive cell primitives.
//!
//! These tests verify structural invariants that must hold for any sequence
//! of operations:
//!
//! 1. Observable version is monotonic and bumps exactly once per effective
//!    change.
//! 2. A get after any op sequence returns the last written value
//!    (last-write-wins).
//! 3. Equal sets never bump the version and never notify.
//! 4. Notification count equals the number of effective changes while
//!    subscribed.
//! 5. Computed never yields a stale value, whatever the interleaving of
//!    sets and gets.

use std::cell::Cell;
use std::rc::Rc;

use bindery_reactive::{Computed, Observable};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Set(i32),
    Get,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-100i32..100).prop_map(Op::Set),
        Just(Op::Get),
    ]
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Version is monotonic, one bump per effective change
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn version_monotonic_one_bump_per_change(values in prop::collection::vec(-100i32..100, 1..64)) {
        let cell = Observable::new(0i32);
        let mut expected_version = 0u64;
        let mut current = 0i32;
        for v in values {
            cell.set(v);
            if v != current {
                expected_version += 1;
                current = v;
            }
            prop_assert_eq!(cell.version(), expected_version);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Last write wins
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn get_returns_last_written_value(ops in prop::collection::vec(op_strategy(), 1..64)) {
        let cell = Observable::new(0i32);
        let mut last = 0i32;
        for op in ops {
            match op {
                Op::Set(v) => {
                    cell.set(v);
                    last = v;
                }
                Op::Get => {
                    prop_assert_eq!(cell.get(), last);
                }
            }
        }
        prop_assert_eq!(cell.get(), last);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3 + 4. Notification count equals effective change count
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn notifications_match_effective_changes(values in prop::collection::vec(-100i32..100, 1..64)) {
        let cell = Observable::new(0i32);
        let notified = Rc::new(Cell::new(0u64));
        let n = Rc::clone(&notified);
        let _sub = cell.subscribe(move |_| n.set(n.get() + 1));

        let mut effective = 0u64;
        let mut current = 0i32;
        for v in values {
            cell.set(v);
            if v != current {
                effective += 1;
                current = v;
            }
        }
        prop_assert_eq!(notified.get(), effective);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Computed is never stale
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn computed_never_stale(ops in prop::collection::vec(op_strategy(), 1..64)) {
        let cell = Observable::new(0i32);
        let derived = Computed::from_observable(&cell, |v| v * 3);
        let mut last = 0i32;
        for op in ops {
            match op {
                Op::Set(v) => {
                    cell.set(v);
                    last = v;
                }
                Op::Get => {
                    prop_assert_eq!(derived.get(), last * 3);
                }
            }
        }
        prop_assert_eq!(derived.get(), last * 3);
    }
}
