//! Creator attribute: remembers which unit built a building or ship.

use std::any::Any;

use runemark_core::attrib::{Attrib, AttribKind, ReadOutcome};
use runemark_core::resolve::Resolver;
use runemark_core::save::error::Result;
use runemark_core::save::{Reader, Writer};
use runemark_core::{EntityId, Owner};

use crate::save::{read_entity_ref, write_entity_ref};

pub struct CreatorKind;

pub static AT_CREATOR: CreatorKind = CreatorKind;

impl AttribKind for CreatorKind {
    fn name(&self) -> &'static str {
        "creator"
    }

    fn construct(&self) -> Box<dyn Attrib> {
        Box::new(Creator::default())
    }
}

/// Only the identifier is kept; the unit itself may be long dead.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Creator {
    pub unit: EntityId,
}

impl Creator {
    pub fn make(unit: EntityId) -> Box<dyn Attrib> {
        Box::new(Creator { unit })
    }
}

impl Attrib for Creator {
    fn kind(&self) -> &'static dyn AttribKind {
        &AT_CREATOR
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn save(&self, out: &mut Writer<'_>) -> Result<'static, ()> {
        write_entity_ref(out, Some(self.unit))
    }

    fn load<'a>(
        &mut self,
        src: &mut Reader<'a>,
        _refs: &mut Resolver,
        _owner: Owner,
    ) -> Result<'a, ReadOutcome> {
        match read_entity_ref(src)? {
            Some(unit) => {
                self.unit = unit;
                Ok(ReadOutcome::Ok)
            }
            // a creator of nobody is meaningless, drop the record
            None => Ok(ReadOutcome::Fail),
        }
    }
}
