//! Item kinds and inventories.

use log::warn;

use runemark_core::save::error::Result;
use runemark_core::save::{Reader, Writer, END_TOKEN};

/// One kind of tradable resource. The name doubles as its save token.
#[derive(Debug, PartialEq, Eq)]
pub struct ItemKind {
    pub name: &'static str,
    /// Weight per piece, in stones
    pub weight: i32,
}

/// Every resource the game knows. The table is closed: save data naming
/// anything else is treated as corrupt.
pub static ITEM_KINDS: &[ItemKind] = &[
    ItemKind {
        name: "silver",
        weight: 0,
    },
    ItemKind {
        name: "sword",
        weight: 1,
    },
    ItemKind {
        name: "stone",
        weight: 60,
    },
    ItemKind {
        name: "iron",
        weight: 5,
    },
    ItemKind {
        name: "horse",
        weight: 50,
    },
    ItemKind {
        name: "wagon",
        weight: 40,
    },
];

pub fn find_item(name: &str) -> Option<&'static ItemKind> {
    ITEM_KINDS.iter().find(|kind| kind.name == name)
}

/// A pile of one item kind inside an inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemStack {
    pub kind: &'static ItemKind,
    pub count: i32,
}

impl ItemStack {
    pub fn new(kind: &'static ItemKind, count: i32) -> Self {
        ItemStack { kind, count }
    }
}

/// Adds `count` pieces of `kind` to an inventory, merging with an
/// existing stack of the same kind. Stacks that reach zero vanish.
pub fn change_item(stacks: &mut Vec<ItemStack>, kind: &'static ItemKind, count: i32) {
    if let Some(stack) = stacks.iter_mut().find(|stack| stack.kind.name == kind.name) {
        stack.count += count;
        stacks.retain(|stack| stack.count != 0);
    } else if count != 0 {
        stacks.push(ItemStack { kind, count });
    }
}

/// Pieces of the named kind in an inventory.
pub fn item_count(stacks: &[ItemStack], name: &str) -> i32 {
    stacks
        .iter()
        .find(|stack| stack.kind.name == name)
        .map_or(0, |stack| stack.count)
}

/// Writes an inventory as `(kind token, count)` pairs closed by the
/// `"end"` sentinel.
pub fn write_items(stacks: &[ItemStack], out: &mut Writer<'_>) -> Result<'static, ()> {
    for stack in stacks {
        out.write_token(stack.kind.name)?;
        out.write_int(stack.count)?;
    }
    out.write_end()
}

/// Reads an inventory written by [write_items]. Pairs naming an unknown
/// kind are logged and skipped; the second element of the result counts
/// them so callers can decide how hard to reject the payload.
pub fn read_items<'a>(src: &mut Reader<'a>) -> Result<'a, (Vec<ItemStack>, usize)> {
    let mut stacks = Vec::new();
    let mut unknown = 0;
    loop {
        let token = src.read_token()?;
        if token == END_TOKEN {
            break;
        }
        let count = src.read_int()?;
        match find_item(&token) {
            Some(kind) if count != 0 => change_item(&mut stacks, kind, count),
            Some(_) => {}
            None => {
                warn!("unknown item kind \"{token}\" in save data");
                unknown += 1;
            }
        }
    }
    Ok((stacks, unknown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use runemark_core::save::FORMAT_VERSION;

    fn kind(name: &str) -> &'static ItemKind {
        find_item(name).expect("known kind")
    }

    #[test]
    fn stacks_merge_and_deplete() {
        let mut stacks = vec![];
        change_item(&mut stacks, kind("silver"), 100);
        change_item(&mut stacks, kind("silver"), 20);
        change_item(&mut stacks, kind("sword"), 2);
        assert_eq!(item_count(&stacks, "silver"), 120);
        assert_eq!(item_count(&stacks, "sword"), 2);

        change_item(&mut stacks, kind("silver"), -120);
        assert_eq!(item_count(&stacks, "silver"), 0);
        assert_eq!(stacks.len(), 1);
    }

    #[test]
    fn inventory_round_trip() {
        let stacks = vec![
            ItemStack::new(kind("silver"), 100),
            ItemStack::new(kind("sword"), 2),
        ];
        let mut buff = vec![];
        {
            let mut out = Writer::new(&mut buff);
            write_items(&stacks, &mut out).expect("written");
        }
        let mut src = Reader::new(&buff, FORMAT_VERSION);
        let (loaded, unknown) = read_items(&mut src).expect("read");
        assert_eq!(loaded, stacks);
        assert_eq!(unknown, 0);
        assert_eq!(src.remaining(), 0);
    }

    #[test_log::test]
    fn unknown_kinds_are_skipped_but_counted() {
        let mut buff = vec![];
        {
            let mut out = Writer::new(&mut buff);
            out.write_token("silver").expect("token");
            out.write_int(5).expect("int");
            out.write_token("mithril").expect("token");
            out.write_int(3).expect("int");
            out.write_end().expect("end");
        }
        let mut src = Reader::new(&buff, FORMAT_VERSION);
        let (loaded, unknown) = read_items(&mut src).expect("read");
        assert_eq!(item_count(&loaded, "silver"), 5);
        assert_eq!(loaded.len(), 1);
        assert_eq!(unknown, 1);
        assert_eq!(src.remaining(), 0);
    }
}
