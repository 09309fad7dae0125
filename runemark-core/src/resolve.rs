//! Deferred resolution of entity references in save data.
//!
//! Entities appear in the file in storage order, not in reference order:
//! an attribute payload may point at an entity many records ahead. While
//! loading, payloads register a fixup for each reference they cannot
//! satisfy yet; the loading driver announces every entity as soon as it
//! is constructed, which immediately satisfies all fixups waiting for it.
//! One [Resolver::finalize] call after the last record settles whatever
//! is left: such references are dangling and their fixups are fed `None`,
//! so no payload is ever left half-initialized.

use log::warn;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::entity::{EntityId, EntityKind};

/// Shared handle under which loaded entities are announced.
pub type EntityHandle = Rc<dyn Any>;

type Setter = Box<dyn FnOnce(Option<&EntityHandle>)>;

/// Pending-fixup registry for one load operation.
#[derive(Default)]
pub struct Resolver {
    pending: HashMap<(EntityKind, EntityId), Vec<Setter>>,
    known: HashMap<(EntityKind, EntityId), EntityHandle>,
}

impl Resolver {
    pub fn new() -> Self {
        Resolver::default()
    }

    /// Registers a fixup for the entity `(kind, id)`. If that entity was
    /// already announced the fixup runs on the spot; otherwise it waits
    /// for [Resolver::resolve_now] or [Resolver::finalize]. Either way it
    /// runs exactly once.
    pub fn defer<F>(&mut self, kind: EntityKind, id: EntityId, setter: F)
    where
        F: FnOnce(Option<&EntityHandle>) + 'static,
    {
        if let Some(handle) = self.known.get(&(kind, id)) {
            setter(Some(handle));
            return;
        }
        self.pending
            .entry((kind, id))
            .or_default()
            .push(Box::new(setter));
    }

    /// Registers a fixup that stores the resolved entity into `link`.
    /// An entity of the wrong concrete type counts as unresolved.
    pub fn defer_link<T: 'static>(&mut self, kind: EntityKind, id: EntityId, link: &EntityLink<T>) {
        let slot = Rc::clone(&link.slot);
        self.defer(kind, id, move |value| {
            let resolved = value.and_then(|handle| match Rc::clone(handle).downcast::<RefCell<T>>() {
                Ok(cell) => Some(Rc::downgrade(&cell)),
                Err(_) => {
                    warn!("deferred {kind} reference {id} resolved to an entity of another kind");
                    None
                }
            });
            *slot.borrow_mut() = resolved;
        });
    }

    /// Announces an entity. All fixups waiting for `(kind, id)` run now
    /// and leave the pending set; fixups registered later find the entity
    /// directly. Announcing the same identity again has no further effect
    /// on already-satisfied fixups.
    pub fn resolve_now(&mut self, kind: EntityKind, id: EntityId, value: EntityHandle) {
        if let Some(setters) = self.pending.remove(&(kind, id)) {
            for setter in setters {
                setter(Some(&value));
            }
        }
        self.known.insert((kind, id), value);
    }

    /// Settles every fixup still pending after the whole file is loaded.
    /// Each one is fed `None` and logged as dangling. Returns how many
    /// there were. The resolver is empty afterwards.
    pub fn finalize(&mut self) -> usize {
        let mut dangling = 0;
        for ((kind, id), setters) in self.pending.drain() {
            for setter in setters {
                warn!("dangling {kind} reference {id} left after load");
                setter(None);
                dangling += 1;
            }
        }
        self.known.clear();
        dangling
    }

    /// Fixups not yet satisfied.
    pub fn pending(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }
}

/// A possibly-unresolved pointer from an attribute payload to an entity.
///
/// The slot is shared between the payload and the fixup registered with
/// the [Resolver], so resolution reaches the payload without touching the
/// chain that owns it. Resolved links hold a [Weak] reference: attribute
/// payloads never keep an entity alive, and a link whose target was
/// destroyed reads as `None` again. Consumers are expected to do nothing
/// when a link reads `None` (a reference to a dead entity makes the
/// attribute inert, it is not an error).
pub struct EntityLink<T> {
    slot: Rc<RefCell<Option<Weak<RefCell<T>>>>>,
}

impl<T> Clone for EntityLink<T> {
    fn clone(&self) -> Self {
        EntityLink {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T> Default for EntityLink<T> {
    fn default() -> Self {
        Self::unresolved()
    }
}

impl<T> fmt::Debug for EntityLink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match *self.slot.borrow() {
            Some(_) => "resolved",
            None => "unresolved",
        };
        write!(f, "EntityLink({state})")
    }
}

impl<T> EntityLink<T> {
    pub fn unresolved() -> Self {
        EntityLink {
            slot: Rc::new(RefCell::new(None)),
        }
    }

    pub fn to(target: &Rc<RefCell<T>>) -> Self {
        let link = Self::unresolved();
        link.set(target);
        link
    }

    pub fn set(&self, target: &Rc<RefCell<T>>) {
        *self.slot.borrow_mut() = Some(Rc::downgrade(target));
    }

    pub fn clear(&self) {
        *self.slot.borrow_mut() = None;
    }

    /// The linked entity, or `None` while unresolved, after a dangling
    /// resolution, or once the target was destroyed.
    pub fn get(&self) -> Option<Rc<RefCell<T>>> {
        self.slot.borrow().as_ref().and_then(Weak::upgrade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, PartialEq)]
    struct Keep {
        id: u32,
    }

    fn handle(id: u32) -> (Rc<RefCell<Keep>>, EntityHandle) {
        let keep = Rc::new(RefCell::new(Keep { id }));
        let handle: EntityHandle = keep.clone();
        (keep, handle)
    }

    #[test]
    fn fixup_runs_exactly_once() {
        let mut refs = Resolver::new();
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        refs.defer(EntityKind::Building, EntityId(42), move |value| {
            assert!(value.is_some());
            seen.set(seen.get() + 1);
        });
        assert_eq!(refs.pending(), 1);

        let (_keep, h) = handle(42);
        refs.resolve_now(EntityKind::Building, EntityId(42), Rc::clone(&h));
        assert_eq!(calls.get(), 1);
        assert_eq!(refs.pending(), 0);

        // announcing again must not re-run the consumed fixup
        refs.resolve_now(EntityKind::Building, EntityId(42), h);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn late_fixup_resolves_immediately() {
        let mut refs = Resolver::new();
        let (_keep, h) = handle(7);
        refs.resolve_now(EntityKind::Unit, EntityId(7), h);

        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        refs.defer(EntityKind::Unit, EntityId(7), move |value| {
            assert!(value.is_some());
            seen.set(seen.get() + 1);
        });
        assert_eq!(calls.get(), 1);
        assert_eq!(refs.pending(), 0);
    }

    #[test]
    fn kinds_and_ids_are_distinct_keys() {
        let mut refs = Resolver::new();
        let hit = Rc::new(Cell::new(false));
        let seen = Rc::clone(&hit);
        refs.defer(EntityKind::Ship, EntityId(5), move |_| seen.set(true));

        let (_keep, h) = handle(5);
        refs.resolve_now(EntityKind::Building, EntityId(5), Rc::clone(&h));
        refs.resolve_now(EntityKind::Ship, EntityId(6), h);
        assert!(!hit.get());
        assert_eq!(refs.pending(), 1);
    }

    #[test_log::test]
    fn finalize_feeds_none_to_dangling_fixups() {
        let mut refs = Resolver::new();
        let outcome = Rc::new(Cell::new(None));
        let seen = Rc::clone(&outcome);
        refs.defer(EntityKind::Faction, EntityId(9), move |value| {
            seen.set(Some(value.is_some()));
        });
        assert_eq!(refs.finalize(), 1);
        assert_eq!(outcome.get(), Some(false));
        assert_eq!(refs.pending(), 0);
        // finalize settled everything; a second pass has nothing to do
        assert_eq!(refs.finalize(), 0);
    }

    #[test]
    fn link_resolves_through_the_resolver() {
        let mut refs = Resolver::new();
        let link: EntityLink<Keep> = EntityLink::unresolved();
        refs.defer_link(EntityKind::Region, EntityId(3), &link);
        assert!(link.get().is_none());

        let (keep, h) = handle(3);
        refs.resolve_now(EntityKind::Region, EntityId(3), h);
        let target = link.get().expect("resolved");
        assert_eq!(*target.borrow(), Keep { id: 3 });

        drop(target);
        drop(keep);
        assert!(link.get().is_none(), "links never keep entities alive");
    }

    #[test_log::test]
    fn link_of_wrong_type_counts_as_unresolved() {
        let mut refs = Resolver::new();
        let link: EntityLink<String> = EntityLink::unresolved();
        refs.defer_link(EntityKind::Unit, EntityId(8), &link);

        let (_keep, h) = handle(8);
        refs.resolve_now(EntityKind::Unit, EntityId(8), h);
        assert!(link.get().is_none());
    }
}
