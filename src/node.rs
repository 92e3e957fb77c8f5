//! The AIG object record and its fixed-slot arena.
use crate::edge::{Edge, NodeId};

/// Object kind. `Dead` marks a recycled slot so iterators can skip it
/// without a second bookkeeping structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjType {
    #[default]
    Dead,
    Const1,
    CombInput,
    CombOutput,
    Buffer,
    And,
}

/// One node (or terminal) in the graph. Per the design notes, the
/// original's per-pass scratch union (`pData`) is *not* represented
/// here: passes that need per-node working storage keep their own
/// side table (`Vec<T>` indexed by `NodeId`) instead, which also
/// removes the "clean before use" convention the union required.
#[derive(Debug, Clone, Default)]
pub struct AigObj {
    pub typ: ObjType,
    pub fanin0: Option<Edge>,
    pub fanin1: Option<Edge>,
    pub phase: bool,
    pub refs: u32,
    pub level: u32,
    pub trav_id: u32,
    pub mark_a: bool,
    pub mark_b: bool,
    /// intrusive structural-hash chain; `None` terminates
    pub next: Option<NodeId>,
}

impl AigObj {
    #[inline]
    pub fn is_and(&self) -> bool {
        self.typ == ObjType::And
    }
    #[inline]
    pub fn is_ci(&self) -> bool {
        self.typ == ObjType::CombInput
    }
    #[inline]
    pub fn is_co(&self) -> bool {
        self.typ == ObjType::CombOutput
    }
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self.typ, ObjType::CombInput | ObjType::Const1)
    }
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.typ == ObjType::Dead
    }

    /// Both fanins, as edges, for nodes that have two (`And`), or one
    /// for `CombOutput`/`Buffer`; panics on terminals.
    #[inline]
    pub fn fanins(&self) -> (Edge, Option<Edge>) {
        (self.fanin0.expect("node has no fanin0"), self.fanin1)
    }
}

/// Fixed-slot node storage. IDs are assigned monotonically from
/// `fetch()` and are never recycled: unlike the original's fixed-block
/// allocator (where blocks and IDs are independent so a freed block's
/// *memory* can back a later, differently-numbered node), a `Vec`
/// already reclaims the interesting resource -- this mirrors the intent
/// (`Dead` slots cost only a few bytes, not a live node) without
/// reintroducing the monotonic-ID bookkeeping that reuse would break
/// (see spec's ordering guarantee: new nodes get IDs past the old
/// iteration bound).
#[derive(Debug, Default)]
pub struct Arena {
    slots: Vec<AigObj>,
    n_dead: u32,
}

impl Arena {
    pub fn new() -> Arena {
        Arena::default()
    }

    pub fn fetch(&mut self) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(AigObj::default());
        id
    }

    pub fn recycle(&mut self, id: NodeId) {
        let slot = &mut self.slots[id.idx()];
        debug_assert!(!slot.is_dead(), "double-recycle of {id}");
        *slot = AigObj::default();
        self.n_dead += 1;
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&AigObj> {
        let slot = &self.slots[id.idx()];
        if slot.is_dead() {
            None
        } else {
            Some(slot)
        }
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut AigObj> {
        let dead = self.slots[id.idx()].is_dead();
        if dead {
            None
        } else {
            Some(&mut self.slots[id.idx()])
        }
    }

    /// Raw access bypassing the dead check; used by the hash chain and
    /// by code that has already established liveness.
    #[inline]
    pub fn raw(&self, id: NodeId) -> &AigObj {
        &self.slots[id.idx()]
    }
    #[inline]
    pub fn raw_mut(&mut self, id: NodeId) -> &mut AigObj {
        &mut self.slots[id.idx()]
    }

    /// Upper bound on live IDs: `0..len()` covers every slot ever
    /// allocated (dead or alive).
    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
    pub fn n_dead(&self) -> u32 {
        self.n_dead
    }

    pub fn iter_live(&self) -> impl Iterator<Item = (NodeId, &AigObj)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, o)| !o.is_dead())
            .map(|(i, o)| (NodeId(i as u32), o))
    }

    pub fn iter_live_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut AigObj)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter(|(_, o)| !o.is_dead())
            .map(|(i, o)| (NodeId(i as u32), o))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_monotonic() {
        let mut a = Arena::new();
        let x = a.fetch();
        let y = a.fetch();
        assert!(y.0 > x.0);
    }

    #[test]
    fn test_recycle_hides_from_get() {
        let mut a = Arena::new();
        let x = a.fetch();
        a.raw_mut(x).typ = ObjType::And;
        assert!(a.get(x).is_some());
        a.recycle(x);
        assert!(a.get(x).is_none());
        assert_eq!(a.n_dead(), 1);
    }

    #[test]
    fn test_iter_live_skips_dead() {
        let mut a = Arena::new();
        let x = a.fetch();
        a.raw_mut(x).typ = ObjType::And;
        let y = a.fetch();
        a.raw_mut(y).typ = ObjType::And;
        a.recycle(x);
        let live: Vec<_> = a.iter_live().map(|(id, _)| id).collect();
        assert_eq!(live, vec![y]);
    }
}
