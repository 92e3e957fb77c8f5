//! The AIG manager: owns every node, the structural-hash table, the
//! combinational input/output lists, and the handful of sweeps
//! (traversal IDs, fanout index, level) that sit directly on top of
//! the arena. This is the `Aig_Man_t` of the port.
use crate::edge::{Edge, NodeId};
use crate::hash::{FxHashMap, HashKey};
use crate::node::{AigObj, Arena, ObjType};

/// Lazily built reverse-edge index: `old -> [nodes with a fanin on old]`.
/// Built on demand (e.g. before `replace`) and dropped once the graph
/// changes underneath it, so it never goes stale sitting on a node
/// table that's since been rewritten.
type FanoutIndex = FxHashMap<NodeId, Vec<NodeId>>;

/// A latch's reset behavior, per the three forms AIGER's optional
/// latch-reset token can encode: absent or `0` (resets to 0), `1`
/// (resets to 1), or the latch's own literal (don't-care -- any
/// initial value is valid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatchReset {
    #[default]
    Zero,
    One,
    DontCare,
}

#[derive(Debug, Default)]
pub struct AigManager {
    arena: Arena,
    cis: Vec<NodeId>,
    cos: Vec<NodeId>,
    n_regs: usize,
    latch_resets: Vec<LatchReset>,
    table: FxHashMap<HashKey, NodeId>,
    trav_id: u32,
    fanout_index: Option<FanoutIndex>,
}

impl AigManager {
    pub fn new() -> AigManager {
        let mut m = AigManager::default();
        let id = m.arena.fetch();
        debug_assert_eq!(id, NodeId::CONST1);
        let o = m.arena.raw_mut(id);
        o.typ = ObjType::Const1;
        o.phase = true;
        m
    }

    // -- terminals -----------------------------------------------------

    pub fn zero(&self) -> Edge {
        Edge::const0()
    }
    pub fn one(&self) -> Edge {
        Edge::const1()
    }

    pub fn create_ci(&mut self) -> Edge {
        let id = self.arena.fetch();
        let o = self.arena.raw_mut(id);
        o.typ = ObjType::CombInput;
        o.phase = false;
        self.cis.push(id);
        Edge::pos(id)
    }

    pub fn create_co(&mut self, driver: Edge) -> NodeId {
        let id = self.arena.fetch();
        {
            let o = self.arena.raw_mut(id);
            o.typ = ObjType::CombOutput;
            o.fanin0 = Some(driver);
        }
        self.connect(driver.id());
        self.cos.push(id);
        id
    }

    pub fn set_reg_num(&mut self, n: usize) {
        assert!(n <= self.cis.len() && n <= self.cos.len());
        self.n_regs = n;
        self.latch_resets.resize(n, LatchReset::Zero);
    }

    pub fn cis(&self) -> &[NodeId] {
        &self.cis
    }
    pub fn cos(&self) -> &[NodeId] {
        &self.cos
    }
    pub fn n_regs(&self) -> usize {
        self.n_regs
    }
    pub fn latch_reset(&self, reg: usize) -> LatchReset {
        self.latch_resets.get(reg).copied().unwrap_or_default()
    }
    pub fn set_latch_reset(&mut self, reg: usize, reset: LatchReset) {
        self.latch_resets[reg] = reset;
    }
    pub fn n_pis(&self) -> usize {
        self.cis.len() - self.n_regs
    }
    pub fn n_pos(&self) -> usize {
        self.cos.len() - self.n_regs
    }

    pub fn co_driver(&self, co: NodeId) -> Edge {
        self.arena.get(co).and_then(|o| o.fanin0).expect("co has no driver")
    }

    // -- node access -----------------------------------------------------

    pub fn obj(&self, id: NodeId) -> Option<&AigObj> {
        self.arena.get(id)
    }
    pub fn arena_len(&self) -> usize {
        self.arena.len()
    }
    pub fn iter_live(&self) -> impl Iterator<Item = (NodeId, &AigObj)> {
        self.arena.iter_live()
    }

    pub fn n_and(&self) -> usize {
        self.arena.iter_live().filter(|(_, o)| o.is_and()).count()
    }

    #[inline]
    fn edge_phase(&self, e: Edge) -> bool {
        self.arena.get(e.id()).map(|o| o.phase).unwrap_or(false) ^ e.is_compl()
    }

    #[inline]
    fn connect(&mut self, id: NodeId) {
        self.inc_ref(id);
    }
    #[inline]
    fn disconnect(&mut self, id: NodeId) {
        self.dec_ref(id);
    }

    /// Bumps `id`'s reference count and returns the new value. Exposed
    /// to `dfs.rs`'s MFFC dereference/reference passes, which drive
    /// the same counters the manager itself uses for dangling-node
    /// cleanup.
    #[inline]
    pub(crate) fn inc_ref(&mut self, id: NodeId) -> u32 {
        if let Some(o) = self.arena.get_mut(id) {
            o.refs += 1;
            o.refs
        } else {
            0
        }
    }
    #[inline]
    pub(crate) fn dec_ref(&mut self, id: NodeId) -> u32 {
        if let Some(o) = self.arena.get_mut(id) {
            debug_assert!(o.refs > 0, "ref underflow on {id}");
            o.refs -= 1;
            o.refs
        } else {
            0
        }
    }
    #[inline]
    pub(crate) fn ref_count(&self, id: NodeId) -> u32 {
        self.arena.get(id).map(|o| o.refs).unwrap_or(0)
    }

    // -- the workhorse -----------------------------------------------------

    /// `And(p, q)`: canonicalize, simplify trivially, strash. Never
    /// fails -- trivial-simplification results are returned directly,
    /// and the arena is expected to grow as needed.
    pub fn and(&mut self, p: Edge, q: Edge) -> Edge {
        if p == q {
            return p;
        }
        if p == !q {
            return self.zero();
        }
        if p.id() == NodeId::CONST1 {
            return if !p.is_compl() { q } else { self.zero() };
        }
        if q.id() == NodeId::CONST1 {
            return if !q.is_compl() { p } else { self.zero() };
        }
        let (key, f0, f1) = HashKey::new(p, q);
        if let Some(&id) = self.table.get(&key) {
            return Edge::pos(id);
        }
        let id = self.arena.fetch();
        let phase = self.edge_phase(f0) && self.edge_phase(f1);
        {
            let o = self.arena.raw_mut(id);
            o.typ = ObjType::And;
            o.fanin0 = Some(f0);
            o.fanin1 = Some(f1);
            o.phase = phase;
        }
        self.connect(f0.id());
        self.connect(f1.id());
        self.table.insert(key, id);
        self.fanout_index = None;
        Edge::pos(id)
    }

    /// Builds an `And` node the same way `and()` does, but without
    /// consulting or updating the hash table -- so calling it twice
    /// with the same fanins produces two distinct nodes with identical
    /// structural-hash keys. Exists only so `check.rs` has a way to
    /// exercise its strashing-violation detection; never call this
    /// outside a test.
    #[cfg(test)]
    pub(crate) fn and_skip_strash(&mut self, p: Edge, q: Edge) -> Edge {
        let (_, f0, f1) = HashKey::new(p, q);
        let id = self.arena.fetch();
        let phase = self.edge_phase(f0) && self.edge_phase(f1);
        {
            let o = self.arena.raw_mut(id);
            o.typ = ObjType::And;
            o.fanin0 = Some(f0);
            o.fanin1 = Some(f1);
            o.phase = phase;
        }
        self.connect(f0.id());
        self.connect(f1.id());
        self.fanout_index = None;
        Edge::pos(id)
    }

    pub fn or(&mut self, p: Edge, q: Edge) -> Edge {
        !self.and(!p, !q)
    }
    pub fn xor(&mut self, p: Edge, q: Edge) -> Edge {
        let a = self.and(p, !q);
        let b = self.and(!p, q);
        self.or(a, b)
    }
    pub fn mux(&mut self, sel: Edge, hi: Edge, lo: Edge) -> Edge {
        let a = self.and(sel, hi);
        let b = self.and(!sel, lo);
        self.or(a, b)
    }

    // -- fanout index -----------------------------------------------------

    pub fn build_fanout_index(&mut self) {
        let mut idx: FanoutIndex = FxHashMap::default();
        for (id, o) in self.arena.iter_live() {
            if let Some(f0) = o.fanin0 {
                idx.entry(f0.id()).or_default().push(id);
            }
            if o.is_and() {
                if let Some(f1) = o.fanin1 {
                    idx.entry(f1.id()).or_default().push(id);
                }
            }
        }
        self.fanout_index = Some(idx);
    }
    pub fn drop_fanout_index(&mut self) {
        self.fanout_index = None;
    }
    pub fn fanouts_of(&self, id: NodeId) -> &[NodeId] {
        static EMPTY: [NodeId; 0] = [];
        self.fanout_index
            .as_ref()
            .and_then(|idx| idx.get(&id))
            .map(|v| v.as_slice())
            .unwrap_or(&EMPTY)
    }

    // -- traversal IDs -----------------------------------------------------

    /// Starts a new traversal. Wraps (zeroing every node's stored ID)
    /// before the counter would overflow `i32::MAX - 1`, per the
    /// design notes on traversal-ID saturation.
    pub fn bump_trav(&mut self) -> u32 {
        const WRAP_AT: u32 = (i32::MAX as u32) - 1;
        if self.trav_id >= WRAP_AT {
            for (_, o) in self.arena.iter_live_mut() {
                o.trav_id = 0;
            }
            self.trav_id = 0;
        }
        self.trav_id += 1;
        self.trav_id
    }
    pub fn trav_id(&self) -> u32 {
        self.trav_id
    }
    pub fn is_trav_current(&self, id: NodeId) -> bool {
        self.arena.get(id).map(|o| o.trav_id == self.trav_id).unwrap_or(false)
    }
    pub fn set_trav_current(&mut self, id: NodeId) {
        if let Some(o) = self.arena.get_mut(id) {
            o.trav_id = self.trav_id;
        }
    }

    // -- levels -----------------------------------------------------

    pub fn level(&self, id: NodeId) -> u32 {
        self.arena.get(id).map(|o| o.level).unwrap_or(0)
    }

    /// Recomputes every node's level in one ascending pass over IDs.
    /// IDs are always a valid topological order (fanins are created,
    /// or chosen by `replace`, strictly before their users), so a
    /// single forward sweep suffices instead of a DFS.
    pub fn recompute_levels(&mut self) {
        for i in 0..self.arena.len() {
            let id = NodeId(i as u32);
            let Some(obj) = self.arena.get(id) else { continue };
            let lvl = match obj.typ {
                ObjType::Const1 | ObjType::CombInput => 0,
                ObjType::And => {
                    let (f0, f1) = (obj.fanin0.unwrap(), obj.fanin1.unwrap());
                    1 + self.level(f0.id()).max(self.level(f1.id()))
                }
                ObjType::CombOutput | ObjType::Buffer => self.level(obj.fanin0.unwrap().id()),
                ObjType::Dead => 0,
            };
            self.arena.raw_mut(id).level = lvl;
        }
    }

    pub fn max_level(&self) -> u32 {
        self.cos.iter().map(|&co| self.level(co)).max().unwrap_or(0)
    }

    // -- replacement -----------------------------------------------------

    /// Does `from`'s cone (transitively, through fanins) contain `target`?
    /// Used only as a defensive debug-mode cycle check in `replace`.
    fn depends_on(&mut self, from: NodeId, target: NodeId) -> bool {
        if from == target {
            return true;
        }
        self.bump_trav();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if self.is_trav_current(id) {
                continue;
            }
            self.set_trav_current(id);
            if let Some(o) = self.arena.get(id) {
                if let Some(f0) = o.fanin0 {
                    stack.push(f0.id());
                }
                if o.is_and() {
                    if let Some(f1) = o.fanin1 {
                        stack.push(f1.id());
                    }
                }
            }
        }
        false
    }

    fn patch_fanin(&mut self, node: NodeId, old: NodeId, new: Edge) {
        let Some(typ) = self.arena.get(node).map(|o| o.typ) else { return };
        if typ == ObjType::And {
            let (old_f0, old_f1) = {
                let o = self.arena.raw(node);
                (o.fanin0.unwrap(), o.fanin1.unwrap())
            };
            let (old_key, _, _) = HashKey::new(old_f0, old_f1);
            self.table.remove(&old_key);
            let patch = |e: Edge| if e.id() == old { new.not_if(e.is_compl()) } else { e };
            let p0 = patch(old_f0);
            let p1 = patch(old_f1);
            if p0.id() != old_f0.id() || p0.is_compl() != old_f0.is_compl() {
                self.disconnect(old_f0.id());
                self.connect(p0.id());
            }
            if p1.id() != old_f1.id() || p1.is_compl() != old_f1.is_compl() {
                self.disconnect(old_f1.id());
                self.connect(p1.id());
            }
            let (key, nf0, nf1) = HashKey::new(p0, p1);
            debug_assert!(
                !self.table.contains_key(&key),
                "replace: patched fanin collides with an existing node"
            );
            let phase = self.edge_phase(nf0) && self.edge_phase(nf1);
            {
                let o = self.arena.raw_mut(node);
                o.fanin0 = Some(nf0);
                o.fanin1 = Some(nf1);
                o.phase = phase;
            }
            self.table.insert(key, node);
        } else {
            let f0 = self.arena.raw(node).fanin0.unwrap();
            if f0.id() == old {
                let nf = new.not_if(f0.is_compl());
                self.disconnect(f0.id());
                self.connect(nf.id());
                self.arena.raw_mut(node).fanin0 = Some(nf);
            }
        }
    }

    /// Recursively deletes the MFFC rooted at `root` via an explicit
    /// work-list (the original recurses; see design notes on
    /// converting that to a loop to bound stack depth).
    fn delete_mffc(&mut self, root: NodeId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(obj) = self.arena.get(id).cloned() else { continue };
            if obj.typ != ObjType::And || obj.refs != 0 {
                continue;
            }
            let (f0, f1) = (obj.fanin0.unwrap(), obj.fanin1.unwrap());
            self.disconnect(f0.id());
            if self.arena.get(f0.id()).map(|o| o.refs) == Some(0) {
                stack.push(f0.id());
            }
            self.disconnect(f1.id());
            if self.arena.get(f1.id()).map(|o| o.refs) == Some(0) {
                stack.push(f1.id());
            }
            let (key, _, _) = HashKey::new(f0, f1);
            self.table.remove(&key);
            self.arena.recycle(id);
        }
    }

    /// Rewires every fanout of `old` onto `new` (complementing per
    /// edge as needed) then deletes `old`'s now-dead MFFC. `new` must
    /// not depend on `old` -- callers are expected to choose `new` from
    /// a cut strictly below `old`; in debug builds this is checked.
    pub fn replace(&mut self, old: NodeId, new: Edge) {
        assert_ne!(old, new.id(), "Replace: self-replacement");
        debug_assert!(!self.depends_on(new.id(), old), "Replace: new depends on old's cone");
        self.build_fanout_index();
        let fanouts = self.fanout_index.as_ref().unwrap().get(&old).cloned().unwrap_or_default();
        for fo in fanouts {
            self.patch_fanin(fo, old, new);
        }
        self.delete_mffc(old);
        self.fanout_index = None;
    }

    /// Flips the polarity every current reader of `id` sees it through,
    /// leaving `id` itself (its own fanins, its own identity) untouched.
    /// Unlike `replace()` this targets the *same* node, so it can't go
    /// through `replace()`'s self-replacement guard; used by the `zero`
    /// command to swap a latch's stored meaning to its complement.
    pub fn invert_fanout_polarity(&mut self, id: NodeId) {
        self.build_fanout_index();
        let fanouts = self.fanout_index.as_ref().unwrap().get(&id).cloned().unwrap_or_default();
        let flipped = Edge::new(id, true);
        for fo in fanouts {
            self.patch_fanin(fo, id, flipped);
        }
        self.fanout_index = None;
    }

    /// Complements `co`'s driver edge directly. The referenced node is
    /// unchanged, so no ref-count bookkeeping is needed.
    pub fn invert_co_driver(&mut self, co: NodeId) {
        if let Some(o) = self.arena.get_mut(co) {
            if let Some(f0) = o.fanin0 {
                o.fanin0 = Some(!f0);
            }
        }
    }

    /// Sweeps away every dangling (`refs == 0`) `And` node, cascading
    /// through its MFFC. Returns the number of nodes removed.
    pub fn cleanup(&mut self) -> usize {
        let before = self.n_and();
        let dangling: Vec<NodeId> = self
            .arena
            .iter_live()
            .filter(|(_, o)| o.typ == ObjType::And && o.refs == 0)
            .map(|(id, _)| id)
            .collect();
        for id in dangling {
            self.delete_mffc(id);
        }
        before - self.n_and()
    }
}
