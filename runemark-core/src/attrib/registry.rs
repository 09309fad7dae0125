use std::collections::HashMap;

use super::AttribKind;

/// Process-wide table of attribute kinds, keyed by their persisted names.
///
/// The host constructs one registry during start-up, registers every kind
/// before the first entity or save file is touched, and only reads it
/// afterwards. There is no removal: a name, once persisted, must stay
/// registered in every later build or old save files become unreadable.
pub struct AttribRegistry {
    kinds: HashMap<&'static str, &'static dyn AttribKind>,
}

impl AttribRegistry {
    pub fn new() -> Self {
        AttribRegistry {
            kinds: HashMap::new(),
        }
    }

    /// Registers a kind and returns the registered descriptor.
    ///
    /// Registering the same descriptor again is a no-op that returns the
    /// existing entry. Registering a *different* descriptor under an
    /// already-taken name is a start-up misconfiguration and panics.
    pub fn register(&mut self, kind: &'static dyn AttribKind) -> &'static dyn AttribKind {
        let name = kind.name();
        match self.kinds.get(name) {
            Some(existing) if same_descriptor(*existing, kind) => *existing,
            Some(_) => panic!("attribute kind \"{name}\" is already registered with a different descriptor"),
            None => {
                self.kinds.insert(name, kind);
                kind
            }
        }
    }

    /// Looks a kind up by its persisted name. Absence is data, not an
    /// error: save files may carry names from builds older or newer than
    /// this one.
    pub fn lookup(&self, name: &str) -> Option<&'static dyn AttribKind> {
        self.kinds.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl Default for AttribRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Descriptors are compared by address: kinds are declared as statics and
/// registered by reference, the way their instances point back at them.
fn same_descriptor(a: &'static dyn AttribKind, b: &'static dyn AttribKind) -> bool {
    std::ptr::eq(a as *const dyn AttribKind as *const u8, b as *const dyn AttribKind as *const u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrib::Attrib;

    struct MarkerKind {
        tag: u8,
    }

    static AT_MARKER: MarkerKind = MarkerKind { tag: 1 };
    static AT_IMPOSTER: MarkerKind = MarkerKind { tag: 2 };

    impl AttribKind for MarkerKind {
        fn name(&self) -> &'static str {
            let _ = self.tag;
            "marker"
        }

        fn construct(&self) -> Box<dyn Attrib> {
            unreachable!("never constructed in these tests")
        }
    }

    #[test]
    fn registration_is_idempotent() {
        let mut registry = AttribRegistry::new();
        let first = registry.register(&AT_MARKER);
        let second = registry.register(&AT_MARKER);
        assert!(same_descriptor(first, second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn conflicting_registration_panics() {
        let mut registry = AttribRegistry::new();
        registry.register(&AT_MARKER);
        registry.register(&AT_IMPOSTER);
    }

    #[test]
    fn lookup_miss_is_none() {
        let mut registry = AttribRegistry::new();
        registry.register(&AT_MARKER);
        assert!(registry.lookup("marker").is_some());
        assert!(registry.lookup("ghost").is_none());
    }
}
