//! Once-per-turn aging of attribute chains.

use log::debug;
use std::cell::RefCell;
use std::rc::Rc;

use crate::attrib::AttribChain;
use crate::entity::Entity;

/// What one aging pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AgingReport {
    /// Chains visited
    pub chains: usize,
    /// Attributes that expired and were torn down
    pub removed: usize,
}

impl AgingReport {
    pub fn merge(&mut self, other: AgingReport) {
        self.chains += other.chains;
        self.removed += other.removed;
    }
}

/// Ages every listed entity's attribute chain once, removing attributes
/// whose age hook reports expiry.
///
/// Each chain is detached from its entity while it ages. That snapshot
/// keeps the walk stable against anything an age hook does, and it leaves
/// the entity itself unborrowed, so hooks are free to borrow any entity,
/// their own owner included. Lookups on the owner's chain from inside a
/// hook see an empty chain for the duration; attributes attached to the
/// owner while it ages are kept and take their turn next time.
pub fn advance_turn<'a, E, I>(entities: I) -> AgingReport
where
    E: Entity + 'a,
    I: IntoIterator<Item = &'a Rc<RefCell<E>>>,
{
    let mut report = AgingReport::default();
    for cell in entities {
        let (owner, mut chain) = {
            let mut entity = cell.borrow_mut();
            let owner = entity.owner();
            (owner, std::mem::take(entity.attribs_mut()))
        };
        report.chains += 1;
        report.removed += chain.age(owner);
        let mut entity = cell.borrow_mut();
        chain.append(std::mem::take(entity.attribs_mut()));
        *entity.attribs_mut() = chain;
    }
    debug!(
        "aged {} attribute chains, {} attributes expired",
        report.chains, report.removed
    );
    report
}
