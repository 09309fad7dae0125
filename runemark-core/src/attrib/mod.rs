//! Dynamically typed extension records ("attributes") that entities carry
//! in an ordered chain, with per-kind persistence and lifecycle hooks.

mod registry;

pub use registry::AttribRegistry;

use log::warn;
use std::any::Any;
use thiserror::Error;

use crate::entity::Owner;
use crate::resolve::Resolver;
use crate::save::error::{Error as SaveError, Result};
use crate::save::{Reader, Writer, END_TOKEN};

/// What an attribute's per-turn age hook decided about its own future.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeVerdict {
    /// The attribute stays on the chain
    Keep,
    /// The attribute is torn down and removed from the chain
    Remove,
}

/// What an attribute's deserialize hook made of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Payload decoded, the instance joins the chain
    Ok,
    /// Payload was consumed but rejected, the instance is discarded
    Fail,
}

/// One kind of attribute: a name, persistence flags and a constructor.
///
/// Kinds are declared as `static` values and registered by reference; the
/// registry and every instance hold the same `&'static` descriptor, so a
/// descriptor can never be outlived.
pub trait AttribKind: Sync {
    /// Stable name this kind is persisted under. Names live forever: a
    /// save file containing a name no build registers anymore cannot be
    /// read past that point, because only the kind knows its payload
    /// length. Never retire a persistent kind's name.
    fn name(&self) -> &'static str;

    /// Runtime-only kinds answer `false` and are never written.
    fn persistent(&self) -> bool {
        true
    }

    /// Fresh instance with an empty payload, ready for [Attrib::load].
    fn construct(&self) -> Box<dyn Attrib>;
}

/// One attribute instance. The payload lives in the implementing struct
/// itself; it exists from `construct` to drop and is never shared.
pub trait Attrib: Any {
    fn kind(&self) -> &'static dyn AttribKind;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Per-turn hook. The default keeps the attribute forever.
    fn age(&mut self, _owner: Owner) -> AgeVerdict {
        AgeVerdict::Keep
    }

    /// Writes the payload. Not invoked for kinds that are not persistent.
    fn save(&self, _out: &mut Writer<'_>) -> Result<'static, ()> {
        Ok(())
    }

    /// Reads the payload written by [Attrib::save]. Must consume the whole
    /// payload even when answering [ReadOutcome::Fail], so that the next
    /// record can be read.
    fn load<'a>(
        &mut self,
        _src: &mut Reader<'a>,
        _refs: &mut Resolver,
        _owner: Owner,
    ) -> Result<'a, ReadOutcome> {
        Ok(ReadOutcome::Ok)
    }
}

/// Raised when removing an attribute kind that is not on the chain.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("no \"{0}\" attribute is attached to this chain")]
pub struct NotAttached(pub &'static str);

/// The ordered attribute chain of one entity. The chain exclusively owns
/// its instances; insertion order is kept and the first match wins when a
/// kind appears more than once.
#[derive(Default)]
pub struct AttribChain {
    items: Vec<Box<dyn Attrib>>,
}

impl AttribChain {
    pub fn new() -> Self {
        AttribChain { items: vec![] }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Attrib> {
        self.items.iter().map(|a| a.as_ref())
    }

    /// Appends an instance and returns it. The reference is valid until
    /// the chain is mutated again.
    pub fn attach(&mut self, attrib: Box<dyn Attrib>) -> &mut dyn Attrib {
        self.items.push(attrib);
        let last = self.items.len() - 1;
        self.items[last].as_mut()
    }

    /// Moves every attribute of `other` to the end of this chain.
    pub fn append(&mut self, mut other: AttribChain) {
        self.items.append(&mut other.items);
    }

    /// First attribute of the given kind, in insertion order.
    pub fn find(&self, kind: &dyn AttribKind) -> Option<&dyn Attrib> {
        self.items
            .iter()
            .find(|a| a.kind().name() == kind.name())
            .map(|a| a.as_ref())
    }

    pub fn find_mut(&mut self, kind: &dyn AttribKind) -> Option<&mut dyn Attrib> {
        self.items
            .iter_mut()
            .find(|a| a.kind().name() == kind.name())
            .map(|a| a.as_mut())
    }

    /// First attribute downcast to its concrete payload type.
    pub fn get<T: Attrib>(&self) -> Option<&T> {
        self.items.iter().find_map(|a| a.as_any().downcast_ref())
    }

    pub fn get_mut<T: Attrib>(&mut self) -> Option<&mut T> {
        self.items
            .iter_mut()
            .find_map(|a| a.as_any_mut().downcast_mut())
    }

    /// Detaches and returns the first attribute of the given kind.
    /// Removing a kind that is not attached is a caller bug and answered
    /// with an explicit error, never ignored.
    pub fn remove(&mut self, kind: &dyn AttribKind) -> std::result::Result<Box<dyn Attrib>, NotAttached> {
        match self
            .items
            .iter()
            .position(|a| a.kind().name() == kind.name())
        {
            Some(at) => Ok(self.items.remove(at)),
            None => Err(NotAttached(kind.name())),
        }
    }

    /// Writes every persistent attribute as its kind name followed by its
    /// payload, terminated by the `"end"` sentinel. Runtime-only kinds
    /// are skipped entirely.
    pub fn write(&self, out: &mut Writer<'_>) -> Result<'static, ()> {
        for attrib in &self.items {
            if !attrib.kind().persistent() {
                continue;
            }
            out.write_token(attrib.kind().name())?;
            attrib.save(out)?;
        }
        out.write_end()
    }

    /// Reads a chain back: kind name tokens up to the `"end"` sentinel,
    /// each followed by the kind's payload. A payload rejected by its kind
    /// is logged and dropped without disturbing the rest of the chain. A
    /// kind name missing from the registry is fatal for the whole load:
    /// nothing but the kind knows how long its payload is.
    pub fn read<'a>(
        registry: &AttribRegistry,
        src: &mut Reader<'a>,
        refs: &mut Resolver,
        owner: Owner,
    ) -> Result<'a, AttribChain> {
        let mut chain = AttribChain::new();
        loop {
            let name = src.read_token()?;
            if name == END_TOKEN {
                break;
            }
            let Some(kind) = registry.lookup(&name) else {
                return Err(SaveError::UnknownAttrib(name));
            };
            let mut attrib = kind.construct();
            match attrib.load(src, refs, owner)? {
                ReadOutcome::Ok => {
                    chain.items.push(attrib);
                }
                ReadOutcome::Fail => {
                    warn!("discarding corrupt \"{name}\" attribute on {owner}");
                }
            }
        }
        Ok(chain)
    }

    /// Ages every attribute once, tearing down those that answer
    /// [AgeVerdict::Remove]. Returns how many were removed.
    pub fn age(&mut self, owner: Owner) -> usize {
        let before = self.items.len();
        self.items
            .retain_mut(|attrib| attrib.age(owner) == AgeVerdict::Keep);
        before - self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityId, EntityKind};
    use crate::save::FORMAT_VERSION;

    struct NoteKind;
    static AT_NOTE: NoteKind = NoteKind;

    impl AttribKind for NoteKind {
        fn name(&self) -> &'static str {
            "note"
        }

        fn construct(&self) -> Box<dyn Attrib> {
            Box::new(Note::default())
        }
    }

    #[derive(Default)]
    struct Note {
        text: String,
    }

    impl Attrib for Note {
        fn kind(&self) -> &'static dyn AttribKind {
            &AT_NOTE
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }

        fn save(&self, out: &mut Writer<'_>) -> Result<'static, ()> {
            out.write_token(&self.text)
        }

        fn load<'a>(
            &mut self,
            src: &mut Reader<'a>,
            _refs: &mut Resolver,
            _owner: Owner,
        ) -> Result<'a, ReadOutcome> {
            self.text = src.read_token()?;
            Ok(ReadOutcome::Ok)
        }
    }

    struct StrengthKind;
    static AT_STRENGTH: StrengthKind = StrengthKind;

    impl AttribKind for StrengthKind {
        fn name(&self) -> &'static str {
            "strength"
        }

        fn construct(&self) -> Box<dyn Attrib> {
            Box::new(Strength::default())
        }
    }

    /// Rejects negative values on load, exercising payload isolation.
    #[derive(Default)]
    struct Strength {
        value: i32,
    }

    impl Attrib for Strength {
        fn kind(&self) -> &'static dyn AttribKind {
            &AT_STRENGTH
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }

        fn save(&self, out: &mut Writer<'_>) -> Result<'static, ()> {
            out.write_int(self.value)
        }

        fn load<'a>(
            &mut self,
            src: &mut Reader<'a>,
            _refs: &mut Resolver,
            _owner: Owner,
        ) -> Result<'a, ReadOutcome> {
            self.value = src.read_int()?;
            if self.value < 0 {
                return Ok(ReadOutcome::Fail);
            }
            Ok(ReadOutcome::Ok)
        }
    }

    struct ScratchKind;
    static AT_SCRATCH: ScratchKind = ScratchKind;

    impl AttribKind for ScratchKind {
        fn name(&self) -> &'static str {
            "scratch"
        }

        fn persistent(&self) -> bool {
            false
        }

        fn construct(&self) -> Box<dyn Attrib> {
            Box::new(Scratch)
        }
    }

    struct Scratch;

    impl Attrib for Scratch {
        fn kind(&self) -> &'static dyn AttribKind {
            &AT_SCRATCH
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn registry() -> AttribRegistry {
        let mut registry = AttribRegistry::new();
        registry.register(&AT_NOTE);
        registry.register(&AT_STRENGTH);
        registry.register(&AT_SCRATCH);
        registry
    }

    fn owner() -> Owner {
        Owner::new(EntityKind::Unit, EntityId(1))
    }

    fn note(text: &str) -> Box<dyn Attrib> {
        Box::new(Note {
            text: text.to_owned(),
        })
    }

    fn read_back(registry: &AttribRegistry, buff: &[u8]) -> AttribChain {
        let mut refs = Resolver::new();
        let mut src = Reader::new(buff, FORMAT_VERSION);
        let chain =
            AttribChain::read(registry, &mut src, &mut refs, owner()).expect("chain reads");
        assert_eq!(src.remaining(), 0);
        chain
    }

    #[test]
    fn find_prefers_insertion_order() {
        let mut chain = AttribChain::new();
        chain.attach(note("first"));
        chain.attach(note("second"));
        let found = chain.get::<Note>().expect("note attached");
        assert_eq!(found.text, "first");
    }

    #[test]
    fn remove_of_absent_kind_is_an_error() {
        let mut chain = AttribChain::new();
        chain.attach(note("only"));
        chain.remove(&AT_NOTE).expect("attached");
        assert_eq!(chain.remove(&AT_NOTE).err(), Some(NotAttached("note")));
    }

    #[test]
    fn round_trip_keeps_order_and_payloads() {
        let registry = registry();
        let mut chain = AttribChain::new();
        chain.attach(note("hello"));
        chain.attach(Box::new(Strength { value: 11 }));

        let mut buff = vec![];
        {
            let mut out = Writer::new(&mut buff);
            chain.write(&mut out).expect("chain writes");
        }
        let loaded = read_back(&registry, &buff);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get::<Note>().expect("note").text, "hello");
        assert_eq!(loaded.get::<Strength>().expect("strength").value, 11);
        assert!(matches!(loaded.iter().next(), Some(a) if a.kind().name() == "note"));
    }

    #[test]
    fn runtime_only_kinds_are_never_written() {
        let registry = registry();
        let mut chain = AttribChain::new();
        chain.attach(Box::new(Scratch));
        chain.attach(note("kept"));

        let mut buff = vec![];
        {
            let mut out = Writer::new(&mut buff);
            chain.write(&mut out).expect("chain writes");
        }
        let loaded = read_back(&registry, &buff);
        assert_eq!(loaded.len(), 1);
        assert!(loaded.get::<Scratch>().is_none());
    }

    #[test_log::test]
    fn corrupt_payload_does_not_abort_the_chain() {
        let registry = registry();
        let mut chain = AttribChain::new();
        chain.attach(note("before"));
        chain.attach(Box::new(Strength { value: -3 }));
        chain.attach(note("after"));

        let mut buff = vec![];
        {
            let mut out = Writer::new(&mut buff);
            chain.write(&mut out).expect("chain writes");
        }
        let loaded = read_back(&registry, &buff);
        assert_eq!(loaded.len(), 2);
        assert!(loaded.get::<Strength>().is_none());
        let texts: Vec<&str> = loaded
            .iter()
            .filter_map(|a| a.as_any().downcast_ref::<Note>())
            .map(|n| n.text.as_str())
            .collect();
        assert_eq!(texts, ["before", "after"]);
    }

    #[test]
    fn unknown_kind_is_fatal() {
        let mut chain = AttribChain::new();
        chain.attach(note("x"));
        let mut buff = vec![];
        {
            let mut out = Writer::new(&mut buff);
            chain.write(&mut out).expect("chain writes");
        }
        // a registry that never learned about "note"
        let empty = AttribRegistry::new();
        let mut refs = Resolver::new();
        let mut src = Reader::new(&buff, FORMAT_VERSION);
        let err = AttribChain::read(&empty, &mut src, &mut refs, owner())
            .err()
            .expect("must fail");
        assert!(matches!(err, SaveError::UnknownAttrib(name) if name == "note"));
    }

    #[test]
    fn empty_chain_is_a_single_sentinel() {
        let registry = registry();
        let chain = AttribChain::new();
        let mut buff = vec![];
        {
            let mut out = Writer::new(&mut buff);
            chain.write(&mut out).expect("chain writes");
        }
        assert_eq!(buff, [3, b'e', b'n', b'd']);
        assert!(read_back(&registry, &buff).is_empty());
    }
}
