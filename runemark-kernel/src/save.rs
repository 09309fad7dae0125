//! Whole-world save and load.
//!
//! A save file is the core header followed by five entity sections in a
//! fixed order: factions, regions, buildings, ships, units. Sections are
//! a record count, then one record per entity carrying its identifier,
//! its scalar fields and its attribute chain. Records are loaded in file
//! order, which is not reference order; every entity is announced to the
//! resolver the moment it is constructed and one finalize pass after the
//! last record settles whatever never turned up. A load either completes
//! or fails as a whole; only individually corrupt attributes are dropped
//! along the way.

use log::info;
use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use runemark_core::base36::{atoi36, itoa36};
use runemark_core::save::error::{Error, Result, ResultOwned};
use runemark_core::save::{
    begin_load, begin_save, Reader, SaveMeta, Writer, VER_BASE36_REFS, VER_FACTION_ATTRIBS,
    VER_SHIPS,
};
use runemark_core::{
    AttribChain, AttribRegistry, EntityHandle, EntityId, EntityKind, Owner, Resolver,
};

use crate::item::{read_items, write_items};
use crate::world::{Building, Faction, Region, Ship, Unit, World};

/// Writes an entity reference as a base-36 token, `"0"` meaning none.
/// Entity identifiers are never zero.
pub fn write_entity_ref(out: &mut Writer<'_>, id: Option<EntityId>) -> Result<'static, ()> {
    match id {
        Some(id) => out.write_token(&itoa36(id.0)),
        None => out.write_token("0"),
    }
}

/// Reads an entity reference. Files older than [VER_BASE36_REFS] stored
/// references as decimal integers; newer files use base-36 tokens.
pub fn read_entity_ref<'a>(src: &mut Reader<'a>) -> Result<'a, Option<EntityId>> {
    if src.version() < VER_BASE36_REFS {
        let id = src.read_int()?;
        Ok((id > 0).then(|| EntityId(id as u32)))
    } else {
        let token = src.read_token()?;
        match atoi36(&token) {
            Some(0) => Ok(None),
            Some(id) => Ok(Some(EntityId(id))),
            None => Err(Error::BadReference(token)),
        }
    }
}

fn write_id(out: &mut Writer<'_>, id: EntityId) -> Result<'static, ()> {
    out.write_token(&itoa36(id.0))
}

fn read_id<'a>(src: &mut Reader<'a>) -> Result<'a, EntityId> {
    let token = src.read_token()?;
    match atoi36(&token) {
        Some(id) if id > 0 => Ok(EntityId(id)),
        _ => Err(Error::BadReference(token)),
    }
}

fn read_count<'a>(src: &mut Reader<'a>) -> Result<'a, usize> {
    let count = src.read_int()?;
    usize::try_from(count).map_err(|_| Error::BadCount(count))
}

/// Writes the whole world in the current format version.
pub fn save_world(world: &World, meta: &SaveMeta, sink: &mut dyn Write) -> Result<'static, ()> {
    let mut out = begin_save(sink, meta)?;

    out.write_int(world.factions.len() as i32)?;
    for faction in &world.factions {
        let faction = faction.borrow();
        write_id(&mut out, faction.id)?;
        out.write_token(&faction.name)?;
        faction.attribs.write(&mut out)?;
    }

    out.write_int(world.regions.len() as i32)?;
    for region in &world.regions {
        let region = region.borrow();
        write_id(&mut out, region.id)?;
        out.write_token(&region.name)?;
        out.write_token(&region.terrain)?;
        region.attribs.write(&mut out)?;
    }

    out.write_int(world.buildings.len() as i32)?;
    for building in &world.buildings {
        let building = building.borrow();
        write_id(&mut out, building.id)?;
        out.write_token(&building.name)?;
        write_entity_ref(&mut out, building.owner.get().map(|u| u.borrow().id))?;
        building.attribs.write(&mut out)?;
    }

    out.write_int(world.ships.len() as i32)?;
    for ship in &world.ships {
        let ship = ship.borrow();
        write_id(&mut out, ship.id)?;
        out.write_token(&ship.name)?;
        ship.attribs.write(&mut out)?;
    }

    out.write_int(world.units.len() as i32)?;
    for unit in &world.units {
        let unit = unit.borrow();
        write_id(&mut out, unit.id)?;
        out.write_token(&unit.name)?;
        write_entity_ref(&mut out, unit.faction.get().map(|f| f.borrow().id))?;
        write_items(&unit.items, &mut out)?;
        unit.attribs.write(&mut out)?;
    }

    Ok(())
}

/// A loaded world plus what the file said about itself.
pub struct LoadedWorld {
    pub world: World,
    pub meta: SaveMeta,
    /// References that never resolved; their links read as `None`
    pub dangling: usize,
}

fn announce<T: 'static>(refs: &mut Resolver, kind: EntityKind, id: EntityId, entity: &Rc<RefCell<T>>) {
    let handle: EntityHandle = entity.clone();
    refs.resolve_now(kind, id, handle);
}

/// Loads a world from raw save bytes. Every registered attribute kind
/// must still cover the names the file uses.
pub fn load_world<'a>(registry: &AttribRegistry, bytes: &'a [u8]) -> Result<'a, LoadedWorld> {
    let (meta, mut src) = begin_load(bytes)?;
    let mut world = World::new();
    let mut refs = Resolver::new();

    for _ in 0..read_count(&mut src)? {
        let id = read_id(&mut src)?;
        let name = src.read_token()?;
        let attribs = if src.version() >= VER_FACTION_ATTRIBS {
            AttribChain::read(
                registry,
                &mut src,
                &mut refs,
                Owner::new(EntityKind::Faction, id),
            )?
        } else {
            AttribChain::new()
        };
        let faction = Rc::new(RefCell::new(Faction { id, name, attribs }));
        announce(&mut refs, EntityKind::Faction, id, &faction);
        world.factions.push(faction);
    }

    for _ in 0..read_count(&mut src)? {
        let id = read_id(&mut src)?;
        let name = src.read_token()?;
        let terrain = src.read_token()?;
        let attribs = AttribChain::read(
            registry,
            &mut src,
            &mut refs,
            Owner::new(EntityKind::Region, id),
        )?;
        let region = Rc::new(RefCell::new(Region {
            id,
            name,
            terrain,
            attribs,
        }));
        announce(&mut refs, EntityKind::Region, id, &region);
        world.regions.push(region);
    }

    for _ in 0..read_count(&mut src)? {
        let id = read_id(&mut src)?;
        let name = src.read_token()?;
        let owner_ref = read_entity_ref(&mut src)?;
        let attribs = AttribChain::read(
            registry,
            &mut src,
            &mut refs,
            Owner::new(EntityKind::Building, id),
        )?;
        let building = Rc::new(RefCell::new(Building {
            id,
            name,
            owner: runemark_core::EntityLink::unresolved(),
            attribs,
        }));
        if let Some(unit_id) = owner_ref {
            refs.defer_link(EntityKind::Unit, unit_id, &building.borrow().owner);
        }
        announce(&mut refs, EntityKind::Building, id, &building);
        world.buildings.push(building);
    }

    if src.version() >= VER_SHIPS {
        for _ in 0..read_count(&mut src)? {
            let id = read_id(&mut src)?;
            let name = src.read_token()?;
            let attribs = AttribChain::read(
                registry,
                &mut src,
                &mut refs,
                Owner::new(EntityKind::Ship, id),
            )?;
            let ship = Rc::new(RefCell::new(Ship { id, name, attribs }));
            announce(&mut refs, EntityKind::Ship, id, &ship);
            world.ships.push(ship);
        }
    }

    for _ in 0..read_count(&mut src)? {
        let id = read_id(&mut src)?;
        let name = src.read_token()?;
        let faction_ref = read_entity_ref(&mut src)?;
        let (items, _unknown) = read_items(&mut src)?;
        let attribs = AttribChain::read(
            registry,
            &mut src,
            &mut refs,
            Owner::new(EntityKind::Unit, id),
        )?;
        let unit = Rc::new(RefCell::new(Unit {
            id,
            name,
            faction: runemark_core::EntityLink::unresolved(),
            items,
            attribs,
        }));
        if let Some(faction_id) = faction_ref {
            refs.defer_link(EntityKind::Faction, faction_id, &unit.borrow().faction);
        }
        announce(&mut refs, EntityKind::Unit, id, &unit);
        world.units.push(unit);
    }

    let dangling = refs.finalize();
    info!(
        "loaded turn {}: {} factions, {} regions, {} buildings, {} ships, {} units, {} dangling references",
        meta.turn,
        world.factions.len(),
        world.regions.len(),
        world.buildings.len(),
        world.ships.len(),
        world.units.len(),
        dangling
    );
    Ok(LoadedWorld {
        world,
        meta,
        dangling,
    })
}

/// Writes the world to a file at `path`.
pub fn save_world_to_path<P: AsRef<Path>>(
    world: &World,
    meta: &SaveMeta,
    path: P,
) -> ResultOwned<()> {
    let mut sink = fs::File::create(path)?;
    save_world(world, meta, &mut sink).map_err(Error::into_owned)
}

/// Reads a world back from a file written by [save_world_to_path].
pub fn load_world_from_path<P: AsRef<Path>>(
    registry: &AttribRegistry,
    path: P,
) -> ResultOwned<LoadedWorld> {
    let bytes = fs::read(path)?;
    match load_world(registry, &bytes) {
        Ok(loaded) => Ok(loaded),
        Err(e) => Err(e.into_owned()),
    }
}
