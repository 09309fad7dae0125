//! The attribute kinds the game ships.

pub mod chronicle;
pub mod creator;
pub mod giveitem;
pub mod guard;
pub mod target;
pub mod timeout;

pub use chronicle::{Chronicle, AT_CHRONICLE};
pub use creator::{Creator, AT_CREATOR};
pub use giveitem::{GiveItem, AT_GIVEITEM};
pub use guard::{Guard, AT_GUARD};
pub use target::{Target, AT_TARGET};
pub use timeout::{Timeout, AT_TIMEOUT};

use runemark_core::AttribRegistry;

/// Registers every attribute kind. Runs once during start-up, before any
/// save file is read or any entity is created.
pub fn register_all(registry: &mut AttribRegistry) {
    registry.register(&AT_CHRONICLE);
    registry.register(&AT_CREATOR);
    registry.register(&AT_GIVEITEM);
    registry.register(&AT_GUARD);
    registry.register(&AT_TARGET);
    registry.register(&AT_TIMEOUT);
}
