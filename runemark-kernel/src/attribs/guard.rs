//! Guard attribute: a unit watching over its region.

use std::any::Any;

use runemark_core::attrib::{Attrib, AttribKind, ReadOutcome};
use runemark_core::resolve::Resolver;
use runemark_core::save::error::Result;
use runemark_core::save::{Reader, Writer};
use runemark_core::Owner;

/// The guarding unit blocks taxation by strangers.
pub const GUARD_TAX: u32 = 1 << 0;
/// Blocks mining and quarrying.
pub const GUARD_PRODUCE: u32 = 1 << 1;
/// Blocks travel through the region.
pub const GUARD_TRAVEL: u32 = 1 << 2;
/// Blocks recruiting.
pub const GUARD_RECRUIT: u32 = 1 << 3;

pub struct GuardKind;

pub static AT_GUARD: GuardKind = GuardKind;

impl AttribKind for GuardKind {
    fn name(&self) -> &'static str {
        "guard"
    }

    fn construct(&self) -> Box<dyn Attrib> {
        Box::new(Guard::default())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Guard {
    pub flags: u32,
}

impl Guard {
    pub fn make(flags: u32) -> Box<dyn Attrib> {
        Box::new(Guard { flags })
    }
}

impl Attrib for Guard {
    fn kind(&self) -> &'static dyn AttribKind {
        &AT_GUARD
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn save(&self, out: &mut Writer<'_>) -> Result<'static, ()> {
        out.write_int(self.flags as i32)
    }

    fn load<'a>(
        &mut self,
        src: &mut Reader<'a>,
        _refs: &mut Resolver,
        _owner: Owner,
    ) -> Result<'a, ReadOutcome> {
        self.flags = src.read_int()? as u32;
        Ok(ReadOutcome::Ok)
    }
}
