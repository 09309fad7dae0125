//! Timeout attribute: a counter that burns down one turn at a time.
//! Other game systems attach it next to an effect they want bounded.

use std::any::Any;

use runemark_core::attrib::{AgeVerdict, Attrib, AttribKind, ReadOutcome};
use runemark_core::resolve::Resolver;
use runemark_core::save::error::Result;
use runemark_core::save::{Reader, Writer};
use runemark_core::Owner;

pub struct TimeoutKind;

pub static AT_TIMEOUT: TimeoutKind = TimeoutKind;

impl AttribKind for TimeoutKind {
    fn name(&self) -> &'static str {
        "timeout"
    }

    fn construct(&self) -> Box<dyn Attrib> {
        Box::new(Timeout::default())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timeout {
    pub remaining: i32,
}

impl Timeout {
    pub fn make(turns: i32) -> Box<dyn Attrib> {
        Box::new(Timeout { remaining: turns })
    }
}

impl Attrib for Timeout {
    fn kind(&self) -> &'static dyn AttribKind {
        &AT_TIMEOUT
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn age(&mut self, _owner: Owner) -> AgeVerdict {
        self.remaining -= 1;
        if self.remaining > 0 {
            AgeVerdict::Keep
        } else {
            AgeVerdict::Remove
        }
    }

    fn save(&self, out: &mut Writer<'_>) -> Result<'static, ()> {
        out.write_int(self.remaining)
    }

    fn load<'a>(
        &mut self,
        src: &mut Reader<'a>,
        _refs: &mut Resolver,
        _owner: Owner,
    ) -> Result<'a, ReadOutcome> {
        self.remaining = src.read_int()?;
        Ok(ReadOutcome::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runemark_core::{AttribChain, EntityId, EntityKind};

    #[test]
    fn burns_down_and_expires() {
        let mut chain = AttribChain::new();
        chain.attach(Timeout::make(2));
        let owner = Owner::new(EntityKind::Region, EntityId(3));

        assert_eq!(chain.age(owner), 0);
        assert_eq!(chain.get::<Timeout>().expect("ticking").remaining, 1);
        assert_eq!(chain.age(owner), 1);
        assert!(chain.get::<Timeout>().is_none());
    }
}
