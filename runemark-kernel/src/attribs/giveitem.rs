//! Deliver-on-capture attribute: a stash of items handed to whoever
//! commands a building.

use std::any::Any;

use runemark_core::attrib::{AgeVerdict, Attrib, AttribKind, ReadOutcome};
use runemark_core::resolve::{EntityLink, Resolver};
use runemark_core::save::error::Result;
use runemark_core::save::{Reader, Writer};
use runemark_core::{EntityKind, Owner};

use crate::item::{change_item, read_items, write_items, ItemStack};
use crate::save::{read_entity_ref, write_entity_ref};
use crate::world::Building;

pub struct GiveItemKind;

pub static AT_GIVEITEM: GiveItemKind = GiveItemKind;

impl AttribKind for GiveItemKind {
    fn name(&self) -> &'static str {
        "giveitem"
    }

    fn construct(&self) -> Box<dyn Attrib> {
        Box::new(GiveItem::default())
    }
}

/// Payload: the target building and the stash still to deliver.
#[derive(Default)]
pub struct GiveItem {
    pub building: EntityLink<Building>,
    pub items: Vec<ItemStack>,
}

impl GiveItem {
    pub fn make(building: &EntityLink<Building>, items: Vec<ItemStack>) -> Box<dyn Attrib> {
        Box::new(GiveItem {
            building: building.clone(),
            items,
        })
    }

    /// Attempts the delivery. While the building stands but nobody
    /// commands it the stash waits; a vanished building quietly swallows
    /// the stash.
    fn deliver(&mut self) -> AgeVerdict {
        if self.items.is_empty() {
            return AgeVerdict::Remove;
        }
        let Some(building) = self.building.get() else {
            return AgeVerdict::Remove;
        };
        let Some(owner) = building.borrow().owner.get() else {
            return AgeVerdict::Keep;
        };
        let mut owner = owner.borrow_mut();
        for stack in self.items.drain(..) {
            change_item(&mut owner.items, stack.kind, stack.count);
        }
        AgeVerdict::Remove
    }
}

impl Attrib for GiveItem {
    fn kind(&self) -> &'static dyn AttribKind {
        &AT_GIVEITEM
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn age(&mut self, _owner: Owner) -> AgeVerdict {
        self.deliver()
    }

    fn save(&self, out: &mut Writer<'_>) -> Result<'static, ()> {
        write_entity_ref(out, self.building.get().map(|b| b.borrow().id))?;
        write_items(&self.items, out)
    }

    fn load<'a>(
        &mut self,
        src: &mut Reader<'a>,
        refs: &mut Resolver,
        _owner: Owner,
    ) -> Result<'a, ReadOutcome> {
        if let Some(id) = read_entity_ref(src)? {
            refs.defer_link(EntityKind::Building, id, &self.building);
        }
        let (items, unknown) = read_items(src)?;
        self.items = items;
        if unknown > 0 {
            return Ok(ReadOutcome::Fail);
        }
        Ok(ReadOutcome::Ok)
    }
}
