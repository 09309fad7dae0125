//! Chronicle attribute: notable events recorded against a faction,
//! stored as one CBOR block.

use std::any::Any;

use runemark_core::attrib::{Attrib, AttribKind, ReadOutcome};
use runemark_core::resolve::Resolver;
use runemark_core::save::error::Result;
use runemark_core::save::{Reader, Writer};
use runemark_core::Owner;

pub struct ChronicleKind;

pub static AT_CHRONICLE: ChronicleKind = ChronicleKind;

impl AttribKind for ChronicleKind {
    fn name(&self) -> &'static str {
        "chronicle"
    }

    fn construct(&self) -> Box<dyn Attrib> {
        Box::new(Chronicle::default())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Chronicle {
    pub events: Vec<String>,
}

impl Chronicle {
    pub fn make(events: Vec<String>) -> Box<dyn Attrib> {
        Box::new(Chronicle { events })
    }

    pub fn record(&mut self, event: impl Into<String>) {
        self.events.push(event.into());
    }
}

impl Attrib for Chronicle {
    fn kind(&self) -> &'static dyn AttribKind {
        &AT_CHRONICLE
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn save(&self, out: &mut Writer<'_>) -> Result<'static, ()> {
        out.write_cbor(&self.events)
    }

    fn load<'a>(
        &mut self,
        src: &mut Reader<'a>,
        _refs: &mut Resolver,
        _owner: Owner,
    ) -> Result<'a, ReadOutcome> {
        self.events = src.read_cbor()?.unwrap_or_default();
        Ok(ReadOutcome::Ok)
    }
}
