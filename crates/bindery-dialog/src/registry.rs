#![forbid(unsafe_code)]

//! Generational slot map of weakly referenced dialogs.
//!
//! The registry answers "which dialogs exist right now" without ever
//! keeping one alive: it stores `Weak` references only. Slots are released
//! two ways:
//!
//! - **explicitly**, by `destroy()` through the [`DialogSlot`] handle the
//!   dialog was attached with (deterministic, immediate), and
//! - **lazily**, during enumeration, for dialogs dropped without destroy
//!   (the upgrade fails and the slot is reclaimed in passing).
//!
//! # Invariants
//!
//! 1. Enumeration never extends a dialog's lifetime.
//! 2. Releasing a slot bumps its generation, so a stale handle can never
//!    release the slot's next occupant.
//! 3. Lazy pruning is incidental to enumeration; nothing is scheduled.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::control::DialogControl;

/// Handle to one occupied registry slot. Stale once the slot is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogSlot {
    index: usize,
    generation: u64,
}

struct SlotEntry {
    generation: u64,
    occupant: Option<Weak<dyn DialogControl>>,
}

struct RegistryInner {
    slots: Vec<SlotEntry>,
    free: Vec<usize>,
}

impl RegistryInner {
    /// Reclaim slots whose occupant was dropped without destroy.
    fn prune(&mut self) -> usize {
        let mut pruned = 0;
        for (index, entry) in self.slots.iter_mut().enumerate() {
            if let Some(weak) = &entry.occupant {
                if weak.upgrade().is_none() {
                    entry.occupant = None;
                    entry.generation += 1;
                    self.free.push(index);
                    pruned += 1;
                }
            }
        }
        pruned
    }
}

/// Shared registry of live dialogs.
#[derive(Clone)]
pub struct DialogRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl Default for DialogRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DialogRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("DialogRegistry")
            .field("slots", &inner.slots.len())
            .field("free", &inner.free.len())
            .finish()
    }
}

impl DialogRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(RegistryInner {
                slots: Vec::new(),
                free: Vec::new(),
            })),
        }
    }

    /// Store a weak reference, reusing a released slot when one is free.
    pub fn insert(&self, dialog: Weak<dyn DialogControl>) -> DialogSlot {
        let mut inner = self.inner.borrow_mut();
        let index = match inner.free.pop() {
            Some(index) => {
                inner.slots[index].occupant = Some(dialog);
                index
            }
            None => {
                inner.slots.push(SlotEntry {
                    generation: 0,
                    occupant: Some(dialog),
                });
                inner.slots.len() - 1
            }
        };
        let slot = DialogSlot {
            index,
            generation: inner.slots[index].generation,
        };
        tracing::debug!(index = slot.index, generation = slot.generation, "dialog registered");
        slot
    }

    /// Release a slot through its handle. Returns whether the handle was
    /// current; a stale handle (older generation, or an already-released
    /// slot) is ignored.
    pub fn release(&self, slot: DialogSlot) -> bool {
        let mut inner = self.inner.borrow_mut();
        match inner.slots.get_mut(slot.index) {
            Some(entry) if entry.generation == slot.generation && entry.occupant.is_some() => {
                entry.occupant = None;
                entry.generation += 1;
                inner.free.push(slot.index);
                tracing::debug!(index = slot.index, "dialog slot released");
                true
            }
            _ => {
                tracing::trace!(index = slot.index, "stale dialog slot release ignored");
                false
            }
        }
    }

    /// Number of registered dialogs still alive. Prunes in passing.
    #[must_use]
    pub fn len(&self) -> usize {
        let mut inner = self.inner.borrow_mut();
        let pruned = inner.prune();
        if pruned > 0 {
            tracing::trace!(pruned, "dropped dialogs pruned from registry");
        }
        inner.slots.iter().filter(|entry| entry.occupant.is_some()).count()
    }

    /// Whether no registered dialog is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Strong handles to every live dialog, in slot order. Prunes in
    /// passing.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Rc<dyn DialogControl>> {
        let mut inner = self.inner.borrow_mut();
        let pruned = inner.prune();
        if pruned > 0 {
            tracing::trace!(pruned, "dropped dialogs pruned from registry");
        }
        inner
            .slots
            .iter()
            .filter_map(|entry| entry.occupant.as_ref().and_then(Weak::upgrade))
            .collect()
    }

    /// Live dialogs that have not been destroyed. This is the render
    /// filter: a destroyed-but-still-referenced dialog is invisible.
    #[must_use]
    pub fn active(&self) -> Vec<Rc<dyn DialogControl>> {
        self.snapshot()
            .into_iter()
            .filter(|dialog| !dialog.dialog_core().is_destroyed())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::DialogCore;
    use bindery_core::context::AppContext;
    use bindery_core::viewmodel::{ViewModel, ViewModelCore};

    struct StubDialog {
        dialog: DialogCore,
    }

    impl StubDialog {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                dialog: DialogCore::new(AppContext::new().view()),
            })
        }
    }

    impl ViewModel for StubDialog {
        fn core(&self) -> &ViewModelCore {
            self.dialog.vm()
        }
    }

    impl DialogControl for StubDialog {
        fn dialog_core(&self) -> &DialogCore {
            &self.dialog
        }
    }

    fn insert(registry: &DialogRegistry, dialog: &Rc<StubDialog>) -> DialogSlot {
        let erased: Rc<dyn DialogControl> = Rc::clone(dialog) as Rc<dyn DialogControl>;
        registry.insert(Rc::downgrade(&erased))
    }

    // ── Weak semantics ──────────────────────────────────────────────────

    #[test]
    fn registry_never_keeps_a_dialog_alive() {
        let registry = DialogRegistry::new();
        let dialog = StubDialog::new();
        insert(&registry, &dialog);
        assert_eq!(registry.len(), 1);
        assert_eq!(Rc::strong_count(&dialog), 1);

        drop(dialog);
        assert_eq!(registry.len(), 0);
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn snapshot_upgrades_live_entries() {
        let registry = DialogRegistry::new();
        let a = StubDialog::new();
        let b = StubDialog::new();
        insert(&registry, &a);
        insert(&registry, &b);
        b.open_dialog().unwrap();

        drop(a);
        let live = registry.snapshot();
        assert_eq!(live.len(), 1);
        // The surviving entry is `b`, identified by the state it opened to.
        assert_eq!(live[0].dialog_core().state(), crate::control::DialogState::Opened);
    }

    // ── Explicit release ────────────────────────────────────────────────

    #[test]
    fn release_frees_the_slot_while_the_dialog_lives_on() {
        let registry = DialogRegistry::new();
        let dialog = StubDialog::new();
        let slot = insert(&registry, &dialog);

        assert!(registry.release(slot));
        assert_eq!(registry.len(), 0);
        // The dialog itself is untouched.
        assert!(!dialog.dialog_core().is_destroyed());
    }

    #[test]
    fn a_stale_handle_cannot_release_a_successor() {
        let registry = DialogRegistry::new();
        let first = StubDialog::new();
        let stale = insert(&registry, &first);
        assert!(registry.release(stale));

        // The successor reuses the index under a bumped generation.
        let second = StubDialog::new();
        let current = insert(&registry, &second);
        assert!(!registry.release(stale));
        assert_eq!(registry.len(), 1);
        assert!(registry.release(current));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn double_release_is_ignored() {
        let registry = DialogRegistry::new();
        let dialog = StubDialog::new();
        let slot = insert(&registry, &dialog);
        assert!(registry.release(slot));
        assert!(!registry.release(slot));
    }

    // ── Render filter ───────────────────────────────────────────────────

    #[test]
    fn active_excludes_destroyed_dialogs() {
        let registry = DialogRegistry::new();
        let dialog = StubDialog::new();
        insert(&registry, &dialog);

        // Destroyed without a registry attachment: the slot stays occupied
        // but the render filter hides the dialog.
        dialog.dialog_core().destroy();
        assert_eq!(registry.snapshot().len(), 1);
        assert!(registry.active().is_empty());
    }
}
