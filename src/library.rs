//! The rewrite library: one or two factored candidate subgraphs per
//! NPN equivalence class of 4-input functions (222 classes for n=4).
//! The original ships a hand-tuned table (`opt/dar/darLib.c`) built
//! offline by its own generator, which isn't part of the sources
//! available here -- so this port builds the table at process start by
//! canonicalizing every 4-input truth table and factoring each
//! distinct canonical form, plus an alternate association when the
//! cover has one to offer (see `factor.rs`). Slower to start than a
//! baked-in table, and not claiming to match the original's literal
//! entries, but grounded in the same NPN-class structure and matcher
//! contract (`abci/abcRewrite.c`'s use of `Dar_Lib*`).
use crate::edge::Edge;
use crate::factor::{self, FactorNode};
use crate::hash::FxHashMap;
use crate::manager::AigManager;
use crate::npn::{self, NpnTransform};
use crate::truth::DynTruth;

pub struct LibEntry {
    pub canonical_truth: u16,
    pub factor: FactorNode,
    /// A second candidate subgraph, present only when the canonical
    /// form had a redundant middle term (more than one literal could be
    /// factored out first) -- see `factor::factor_truth_alt`. Gives the
    /// matcher an alternate association to weigh against `factor`.
    pub factor_alt: Option<FactorNode>,
}

pub struct Library {
    entries: FxHashMap<u16, LibEntry>,
}

impl Library {
    /// Builds the library by brute-force NPN canonicalization of all
    /// 65536 four-input truth tables. Expect on the order of tens of
    /// millions of canonicalization steps; a real deployment would
    /// cache this table to disk rather than rebuild it every run.
    pub fn build() -> Library {
        let mut entries: FxHashMap<u16, LibEntry> = FxHashMap::default();
        for t in 0u32..=0xFFFF {
            let t = t as u16;
            let (canon, _) = npn::canonicalize(t);
            if entries.contains_key(&canon) {
                continue;
            }
            let dt = DynTruth::from_u16(canon);
            let factor = factor::factor_truth(&dt);
            let factor_alt = factor::factor_truth_alt(&dt);
            entries.insert(canon, LibEntry { canonical_truth: canon, factor, factor_alt });
        }
        Library { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the class `cut_truth` belongs to, returning the entry
    /// plus the transform needed to map its canonical variables back
    /// onto the cut's actual leaves.
    pub fn lookup(&self, cut_truth: u16) -> Option<(&LibEntry, NpnTransform)> {
        let (canon, t) = npn::canonicalize(cut_truth);
        self.entries.get(&canon).map(|e| (e, npn::invert(&t)))
    }

    /// Instantiates `entry`'s primary candidate onto `leaves` (the cut's
    /// real, positive leaf edges) under the back-mapping `inv`,
    /// producing an edge computing exactly the cut's original function.
    pub fn instantiate(
        &self,
        entry: &LibEntry,
        leaves: &[Edge],
        inv: &NpnTransform,
        mgr: &mut AigManager,
    ) -> Edge {
        self.instantiate_factor(&entry.factor, leaves, inv, mgr)
    }

    /// Instantiates `entry`'s alternate candidate, if it has one. Same
    /// function as `instantiate`, different internal structure.
    pub fn instantiate_alt(
        &self,
        entry: &LibEntry,
        leaves: &[Edge],
        inv: &NpnTransform,
        mgr: &mut AigManager,
    ) -> Option<Edge> {
        entry.factor_alt.as_ref().map(|f| self.instantiate_factor(f, leaves, inv, mgr))
    }

    fn instantiate_factor(
        &self,
        factor: &FactorNode,
        leaves: &[Edge],
        inv: &NpnTransform,
        mgr: &mut AigManager,
    ) -> Edge {
        let mut mapped = [mgr.zero(); 4];
        for i in 0..4 {
            let j = inv.perm[i] as usize;
            let neg = (inv.input_neg >> i) & 1 == 1;
            let leaf = leaves.get(i).copied().unwrap_or_else(|| mgr.zero());
            mapped[j] = leaf.not_if(neg);
        }
        let out = factor::to_aig(factor, mgr, &mapped);
        out.not_if(inv.output_neg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::truth::ELEM4;

    #[test]
    fn test_library_has_222_classes() {
        let lib = Library::build();
        assert_eq!(lib.len(), 222, "4-input functions form exactly 222 NPN classes");
    }

    #[test]
    fn test_instantiate_reproduces_and() {
        let lib = Library::build();
        let mut m = AigManager::new();
        let a = m.create_ci();
        let b = m.create_ci();
        let cut_truth = ELEM4[0] & ELEM4[1];
        let (entry, inv) = lib.lookup(cut_truth).unwrap();
        let out = lib.instantiate(entry, &[a, b, m.zero(), m.zero()], &inv, &mut m);
        assert_eq!(out, m.and(a, b));
    }

    #[test]
    fn test_instantiate_reproduces_xor() {
        let lib = Library::build();
        let mut m = AigManager::new();
        let a = m.create_ci();
        let b = m.create_ci();
        let cut_truth = ELEM4[0] ^ ELEM4[1];
        let (entry, inv) = lib.lookup(cut_truth).unwrap();
        let out = lib.instantiate(entry, &[a, b, m.zero(), m.zero()], &inv, &mut m);
        assert_eq!(out, m.xor(a, b));
    }

    #[test]
    fn test_alt_candidate_reproduces_same_function_when_present() {
        let lib = Library::build();
        let mut m = AigManager::new();
        let a = m.create_ci();
        let b = m.create_ci();
        let c = m.create_ci();
        // Majority-of-3 (ab + ac + bc) has three literals each repeated
        // twice, so its class entry should carry a second candidate.
        let cut_truth = (ELEM4[0] & ELEM4[1]) | (ELEM4[0] & ELEM4[2]) | (ELEM4[1] & ELEM4[2]);
        let (entry, inv) = lib.lookup(cut_truth).unwrap();
        let leaves = [a, b, c, m.zero()];
        let primary = lib.instantiate(entry, &leaves, &inv, &mut m);
        let alt = lib.instantiate_alt(entry, &leaves, &inv, &mut m).expect("maj-3 has a redundant middle term");

        let mut fx = crate::hash::FxHashMap::default();
        for av in [false, true] {
            for bv in [false, true] {
                for cv in [false, true] {
                    fx.insert(a.id(), av);
                    fx.insert(b.id(), bv);
                    fx.insert(c.id(), cv);
                    assert_eq!(eval_edge(&m, primary, &fx), eval_edge(&m, alt, &fx));
                }
            }
        }
    }

    fn eval_edge(mgr: &AigManager, e: Edge, inputs: &crate::hash::FxHashMap<crate::edge::NodeId, bool>) -> bool {
        use crate::node::ObjType;
        let v = match mgr.obj(e.id()) {
            None => false,
            Some(o) => match o.typ {
                ObjType::Const1 => true,
                ObjType::CombInput => *inputs.get(&e.id()).unwrap_or(&false),
                ObjType::And => {
                    let (f0, f1) = (o.fanin0.unwrap(), o.fanin1.unwrap());
                    eval_edge(mgr, f0, inputs) && eval_edge(mgr, f1, inputs)
                }
                _ => unreachable!("not a combinational function node"),
            },
        };
        v ^ e.is_compl()
    }

    #[test]
    fn test_instantiate_reproduces_mux() {
        let lib = Library::build();
        let mut m = AigManager::new();
        let s = m.create_ci();
        let a = m.create_ci();
        let b = m.create_ci();
        let cut_truth = (ELEM4[0] & ELEM4[1]) | (!ELEM4[0] & ELEM4[2]);
        let (entry, inv) = lib.lookup(cut_truth).unwrap();
        let out = lib.instantiate(entry, &[s, a, b, m.zero()], &inv, &mut m);
        assert_eq!(out, m.mux(s, a, b));
    }
}
