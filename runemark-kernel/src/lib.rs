//! Game kernel of the runemark simulation host: the concrete entities
//! (factions, regions, buildings, ships, units), their item inventories,
//! the attribute kinds the game ships, and the whole-world save/load
//! driver built on `runemark-core`.

pub mod attribs;
pub mod item;
pub mod save;
pub mod world;

pub use save::{load_world, load_world_from_path, save_world, save_world_to_path, LoadedWorld};
pub use world::{Building, Faction, Region, Ship, Unit, World};
