//! Refactor pass: re-derive a node's reconvergence window as a
//! multi-level factored form from scratch and keep it if cheaper.
//! Grounded on `abci/abcRefactor.c`'s `Abc_NodeRefactor`, with
//! `dfs::grow_window` standing in for the original's level-bounded
//! cone collection and `factor.rs`'s quick-factor standing in for its
//! kernel-extraction-based factoring.
use crate::dfs;
use crate::edge::{Edge, NodeId};
use crate::factor;
use crate::hash::{FxHashMap, FxHashSet};
use crate::manager::AigManager;
use crate::node::ObjType;
use crate::truth::DynTruth;

/// Upper bound on a refactor window's leaf count. Truth-table
/// simulation and factoring are exponential in this, so it stays
/// small relative to `cut::MAX_CUT_SIZE`.
pub const MAX_WINDOW_LEAVES: usize = 8;

fn visit(
    mgr: &AigManager,
    id: NodeId,
    leaf_set: &FxHashSet<NodeId>,
    visited: &mut FxHashSet<NodeId>,
    order: &mut Vec<NodeId>,
) {
    if visited.contains(&id) {
        return;
    }
    visited.insert(id);
    if leaf_set.contains(&id) {
        order.push(id);
        return;
    }
    if let Some(obj) = mgr.obj(id) {
        if obj.is_and() {
            let (f0, f1) = (obj.fanin0.unwrap(), obj.fanin1.unwrap());
            visit(mgr, f0.id(), leaf_set, visited, order);
            visit(mgr, f1.id(), leaf_set, visited, order);
        }
    }
    order.push(id);
}

fn cone_postorder(mgr: &AigManager, root: NodeId, leaves: &[NodeId]) -> Vec<NodeId> {
    let leaf_set: FxHashSet<NodeId> = leaves.iter().copied().collect();
    let mut order = Vec::new();
    let mut visited = FxHashSet::default();
    visit(mgr, root, &leaf_set, &mut visited, &mut order);
    order
}

fn edge_truth(vals: &FxHashMap<NodeId, DynTruth>, e: Edge, nvars: usize) -> DynTruth {
    match vals.get(&e.id()) {
        Some(t) => {
            if e.is_compl() {
                t.not()
            } else {
                t.clone()
            }
        }
        None => DynTruth::zero(nvars),
    }
}

/// Bottom-up truth-table simulation of `root`'s cone, treating `leaves`
/// as free variables in the given order. Mirrors `Abc_NodeConeTruth`.
fn simulate_cone(mgr: &AigManager, root: Edge, leaves: &[NodeId]) -> DynTruth {
    let nvars = leaves.len();
    let order = cone_postorder(mgr, root.id(), leaves);
    let mut vals: FxHashMap<NodeId, DynTruth> = FxHashMap::default();
    for (i, &l) in leaves.iter().enumerate() {
        vals.insert(l, DynTruth::elementary(nvars, i));
    }
    for &id in &order {
        if vals.contains_key(&id) {
            continue;
        }
        let Some(obj) = mgr.obj(id) else { continue };
        match obj.typ {
            ObjType::Const1 => {
                vals.insert(id, DynTruth::ones(nvars));
            }
            ObjType::And => {
                let (f0, f1) = (obj.fanin0.unwrap(), obj.fanin1.unwrap());
                let t0 = edge_truth(&vals, f0, nvars);
                let t1 = edge_truth(&vals, f1, nvars);
                vals.insert(id, t0.and(&t1));
            }
            _ => {}
        }
    }
    edge_truth(&vals, root, nvars)
}

/// One refactor pass over every `And` node. Returns the number of
/// cones actually replaced.
pub fn refactor(mgr: &mut AigManager) -> usize {
    mgr.recompute_levels();
    let roots: Vec<_> = mgr.cos().to_vec();
    let order = dfs::dfs_postorder(mgr, &roots);
    let mut n_improved = 0;

    for &id in &order {
        if !mgr.obj(id).map(|o| o.is_and()).unwrap_or(false) {
            continue;
        }
        let leaves = dfs::grow_window(mgr, &[id], MAX_WINDOW_LEAVES);
        if leaves.len() < 2 {
            continue;
        }
        let old_cost = dfs::mffc_size_bounded(mgr, id, &leaves);
        if old_cost < 2 {
            continue;
        }
        let truth = simulate_cone(mgr, Edge::pos(id), &leaves);
        let factored = factor::factor_truth(&truth);
        let leaf_edges: Vec<Edge> = leaves.iter().map(|&l| Edge::pos(l)).collect();
        let cand = factor::to_aig(&factored, mgr, &leaf_edges);
        if cand.id() == id {
            continue;
        }
        let new_cost = dfs::mffc_size_bounded(mgr, cand.id(), &leaves);
        if new_cost < old_cost {
            mgr.replace(id, cand);
            n_improved += 1;
        }
    }

    mgr.cleanup();
    mgr.recompute_levels();
    n_improved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(mgr: &AigManager, e: Edge, inputs: &FxHashMap<NodeId, bool>) -> bool {
        let v = match mgr.obj(e.id()) {
            None => false,
            Some(o) => match o.typ {
                ObjType::Const1 => true,
                ObjType::CombInput => *inputs.get(&e.id()).unwrap_or(&false),
                ObjType::And => {
                    let (f0, f1) = (o.fanin0.unwrap(), o.fanin1.unwrap());
                    eval(mgr, f0, inputs) && eval(mgr, f1, inputs)
                }
                _ => unreachable!("not a combinational function node"),
            },
        };
        v ^ e.is_compl()
    }

    #[test]
    fn test_refactor_reduces_distributed_form() {
        let mut m = AigManager::new();
        let a = m.create_ci();
        let b = m.create_ci();
        let c = m.create_ci();
        // a&b | a&c, built flatly rather than as a&(b|c).
        let t1 = m.and(a, b);
        let t2 = m.and(a, c);
        let out = m.or(t1, t2);
        let co = m.create_co(out);
        let before = m.n_and();

        refactor(&mut m);
        let after = m.n_and();
        assert!(after <= before, "refactor should never grow the network: {before} -> {after}");

        for av in [false, true] {
            for bv in [false, true] {
                for cv in [false, true] {
                    let mut inputs = FxHashMap::default();
                    inputs.insert(a.id(), av);
                    inputs.insert(b.id(), bv);
                    inputs.insert(c.id(), cv);
                    let driver = m.co_driver(co);
                    let expect = (av && bv) || (av && cv);
                    assert_eq!(eval(&m, driver, &inputs), expect);
                }
            }
        }
    }

    #[test]
    fn test_refactor_is_idempotent_on_already_minimal_network() {
        let mut m = AigManager::new();
        let a = m.create_ci();
        let b = m.create_ci();
        let x = m.and(a, b);
        m.create_co(x);
        let before = m.n_and();
        refactor(&mut m);
        assert_eq!(m.n_and(), before);
    }
}
