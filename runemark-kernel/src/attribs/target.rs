//! Combat-target attribute. Runtime only: targets are re-acquired every
//! session, so this kind is never written to a save file.

use std::any::Any;

use runemark_core::attrib::{AgeVerdict, Attrib, AttribKind};
use runemark_core::resolve::EntityLink;
use runemark_core::Owner;

use crate::world::Unit;

pub struct TargetKind;

pub static AT_TARGET: TargetKind = TargetKind;

impl AttribKind for TargetKind {
    fn name(&self) -> &'static str {
        "target"
    }

    fn persistent(&self) -> bool {
        false
    }

    fn construct(&self) -> Box<dyn Attrib> {
        Box::new(Target::default())
    }
}

#[derive(Default)]
pub struct Target {
    pub enemy: EntityLink<Unit>,
}

impl Target {
    pub fn make(enemy: &EntityLink<Unit>) -> Box<dyn Attrib> {
        Box::new(Target {
            enemy: enemy.clone(),
        })
    }
}

impl Attrib for Target {
    fn kind(&self) -> &'static dyn AttribKind {
        &AT_TARGET
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    /// A target that no longer exists releases the attribute.
    fn age(&mut self, _owner: Owner) -> AgeVerdict {
        if self.enemy.get().is_some() {
            AgeVerdict::Keep
        } else {
            AgeVerdict::Remove
        }
    }
}
