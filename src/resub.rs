//! Resubstitution: replace a node's cone with an AND/OR combination of
//! existing nodes (divisors) already live elsewhere in the graph, so
//! the replacement costs fewer new nodes than it reuses. Grounded on
//! `abci/abcResub.c`'s divisor collection and zero/one/two/three-node
//! search, restricted the same way the original restricts its
//! three-divisor search: built by extending already-found two-divisor
//! terms rather than a fresh exhaustive triple loop.
use crate::dfs;
use crate::edge::{Edge, NodeId};
use crate::hash::{FxHashMap, FxHashSet};
use crate::manager::AigManager;
use crate::node::ObjType;
use crate::truth::DynTruth;

/// Cap on the number of divisors collected for a single root. Matches
/// the bound the original applies to its divisor array.
pub const DIV1_MAX: usize = 150;
/// Cap on the number of two-divisor (AND/OR pair) combinations tried
/// per root, keeping the search from growing with the square of the
/// divisor count.
pub const DIV2_MAX: usize = 500;
/// Upper bound on the resubstitution window's leaf count.
pub const MAX_LEAVES: usize = 8;

struct Divisor {
    id: NodeId,
    truth: DynTruth,
}

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

fn window_postorder(mgr: &AigManager, root: NodeId, leaves: &[NodeId]) -> Vec<NodeId> {
    let leaf_set: FxHashSet<NodeId> = leaves.iter().copied().collect();
    let mut order = Vec::new();
    let mut visited = FxHashSet::default();
    visit(mgr, root, &leaf_set, &mut visited, &mut order);
    order
}

/// Simulates `id`'s function over `leaves`, returning `None` if `id`'s
/// cone escapes the window (depends on a CI or constant not in
/// `leaves`) -- such a node can't be used as a divisor restricted to
/// this window's care set.
fn support_within(mgr: &AigManager, id: NodeId, leaves: &[NodeId]) -> Option<DynTruth> {
    let leaf_set: FxHashSet<NodeId> = leaves.iter().copied().collect();
    let nvars = leaves.len();
    let mut vals: FxHashMap<NodeId, DynTruth> = FxHashMap::default();
    for (i, &l) in leaves.iter().enumerate() {
        vals.insert(l, DynTruth::elementary(nvars, i));
    }
    fn rec(
        mgr: &AigManager,
        id: NodeId,
        leaf_set: &FxHashSet<NodeId>,
        vals: &mut FxHashMap<NodeId, DynTruth>,
        nvars: usize,
    ) -> Option<DynTruth> {
        if let Some(t) = vals.get(&id) {
            return Some(t.clone());
        }
        if !leaf_set.contains(&id) {
            let obj = mgr.obj(id)?;
            if obj.typ == ObjType::Const1 {
                let t = DynTruth::ones(nvars);
                vals.insert(id, t.clone());
                return Some(t);
            }
            if obj.is_and() {
                let (f0, f1) = (obj.fanin0.unwrap(), obj.fanin1.unwrap());
                let t0 = rec(mgr, f0.id(), leaf_set, vals, nvars)?;
                let t0 = if f0.is_compl() { t0.not() } else { t0 };
                let t1 = rec(mgr, f1.id(), leaf_set, vals, nvars)?;
                let t1 = if f1.is_compl() { t1.not() } else { t1 };
                let t = t0.and(&t1);
                vals.insert(id, t.clone());
                return Some(t);
            }
            return None;
        }
        None
    }
    rec(mgr, id, &leaf_set, &mut vals, nvars)
}

/// Collects candidate divisors for `root`'s window: the leaves
/// themselves, the window's own internal nodes, and any other live
/// `And` node in the graph whose support happens to fall entirely
/// within the leaf set (free reuse from elsewhere in the network).
fn collect_divisors(mgr: &AigManager, root: NodeId, leaves: &[NodeId]) -> Vec<Divisor> {
    let nvars = leaves.len();
    let mut out = Vec::new();
    let mut seen: FxHashSet<NodeId> = FxHashSet::default();
    for (i, &l) in leaves.iter().enumerate() {
        out.push(Divisor { id: l, truth: DynTruth::elementary(nvars, i) });
        seen.insert(l);
    }
    let window = window_postorder(mgr, root, leaves);
    for &id in &window {
        if out.len() >= DIV1_MAX {
            return out;
        }
        if id == root || seen.contains(&id) {
            continue;
        }
        if let Some(t) = support_within(mgr, id, leaves) {
            out.push(Divisor { id, truth: t });
            seen.insert(id);
        }
    }
    for (id, obj) in mgr.iter_live() {
        if out.len() >= DIV1_MAX {
            break;
        }
        if id == root || !obj.is_and() || seen.contains(&id) {
            continue;
        }
        if let Some(t) = support_within(mgr, id, leaves) {
            out.push(Divisor { id, truth: t });
            seen.insert(id);
        }
    }
    out
}

fn combine_truth(a: &DynTruth, na: bool, b: &DynTruth, nb: bool, or: bool, nout: bool) -> DynTruth {
    let ta = if na { a.not() } else { a.clone() };
    let tb = if nb { b.not() } else { b.clone() };
    let t = if or { ta.or(&tb) } else { ta.and(&tb) };
    if nout {
        t.not()
    } else {
        t
    }
}

fn build_edge(mgr: &mut AigManager, a: Edge, na: bool, b: Edge, nb: bool, or: bool, nout: bool) -> Edge {
    let ea = a.not_if(na);
    let eb = b.not_if(nb);
    let out = if or { mgr.or(ea, eb) } else { mgr.and(ea, eb) };
    out.not_if(nout)
}

/// A candidate pairing of two divisors, kept around so three-divisor
/// search can extend it with a third rather than starting over.
struct PairTerm {
    i: usize,
    na: bool,
    j: usize,
    nb: bool,
    or: bool,
    nout: bool,
    truth: DynTruth,
}

fn enumerate_pairs(divs: &[Divisor], cap: usize) -> Vec<PairTerm> {
    let mut out = Vec::new();
    'outer: for i in 0..divs.len() {
        for j in (i + 1)..divs.len() {
            for &or in &[false, true] {
                for &na in &[false, true] {
                    for &nb in &[false, true] {
                        for &nout in &[false, true] {
                            let truth = combine_truth(&divs[i].truth, na, &divs[j].truth, nb, or, nout);
                            out.push(PairTerm { i, na, j, nb, or, nout, truth });
                            if out.len() >= cap {
                                break 'outer;
                            }
                        }
                    }
                }
            }
        }
    }
    out
}

/// Tries zero-, one-, two-, and three-divisor resubstitution (in that
/// cost order) and returns the replacement edge for `root`, or `None`
/// if nothing matches.
fn find_replacement(mgr: &mut AigManager, root_truth: &DynTruth, divs: &[Divisor]) -> Option<Edge> {
    // Zero divisors: root's window function is constant.
    if root_truth.is_const0() {
        return Some(mgr.zero());
    }
    if root_truth.is_const1() {
        return Some(mgr.one());
    }

    // One divisor: root equals (possibly inverted) some divisor directly.
    for d in divs {
        if &d.truth == root_truth {
            return Some(Edge::pos(d.id));
        }
        if d.truth.not() == *root_truth {
            return Some(!Edge::pos(d.id));
        }
    }

    // Two divisors: an AND/OR pairing, possibly inverted either input
    // or the output, reproduces root's function exactly.
    let pairs = enumerate_pairs(divs, DIV2_MAX);
    for p in &pairs {
        if &p.truth == root_truth {
            let a = Edge::pos(divs[p.i].id);
            let b = Edge::pos(divs[p.j].id);
            return Some(build_edge(mgr, a, p.na, b, p.nb, p.or, p.nout));
        }
    }

    // Three divisors: extend an existing pair term with a third
    // divisor rather than re-searching all triples from scratch.
    for p in &pairs {
        for (k, dk) in divs.iter().enumerate() {
            if k == p.i || k == p.j {
                continue;
            }
            for &or2 in &[false, true] {
                for &nk in &[false, true] {
                    for &nout2 in &[false, true] {
                        let truth = combine_truth(&p.truth, false, &dk.truth, nk, or2, nout2);
                        if &truth == root_truth {
                            let inner = build_edge(
                                mgr,
                                Edge::pos(divs[p.i].id),
                                p.na,
                                Edge::pos(divs[p.j].id),
                                p.nb,
                                p.or,
                                p.nout,
                            );
                            return Some(build_edge(mgr, inner, false, Edge::pos(dk.id), nk, or2, nout2));
                        }
                    }
                }
            }
        }
    }

    None
}

/// One resubstitution pass over every `And` node. Returns the number
/// of nodes replaced.
pub fn resub(mgr: &mut AigManager) -> usize {
    mgr.recompute_levels();
    let roots: Vec<_> = mgr.cos().to_vec();
    let order = dfs::dfs_postorder(mgr, &roots);
    let mut n_improved = 0;

    for &id in &order {
        if !mgr.obj(id).map(|o| o.is_and()).unwrap_or(false) {
            continue;
        }
        let leaves = dfs::grow_window(mgr, &[id], MAX_LEAVES);
        if leaves.len() < 2 {
            continue;
        }
        let old_cost = dfs::mffc_size_bounded(mgr, id, &leaves);
        if old_cost == 0 {
            continue;
        }
        let Some(root_truth) = support_within(mgr, id, &leaves) else { continue };
        let divisors = collect_divisors(mgr, id, &leaves);
        let Some(cand) = find_replacement(mgr, &root_truth, &divisors) else { continue };
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
    fn test_resub_preserves_function_and_does_not_grow() {
        let mut m = AigManager::new();
        let a = m.create_ci();
        let b = m.create_ci();
        let c = m.create_ci();
        let ab = m.and(a, b);
        let root = m.and(ab, c);
        let co = m.create_co(root);
        let before = m.n_and();

        resub(&mut m);
        assert!(m.n_and() <= before);

        for av in [false, true] {
            for bv in [false, true] {
                for cv in [false, true] {
                    let mut inputs = FxHashMap::default();
                    inputs.insert(a.id(), av);
                    inputs.insert(b.id(), bv);
                    inputs.insert(c.id(), cv);
                    let driver = m.co_driver(co);
                    assert_eq!(eval(&m, driver, &inputs), av && bv && cv);
                }
            }
        }
    }

    #[test]
    fn test_resub_is_idempotent_on_already_minimal_network() {
        let mut m = AigManager::new();
        let a = m.create_ci();
        let b = m.create_ci();
        let x = m.and(a, b);
        m.create_co(x);
        let before = m.n_and();
        resub(&mut m);
        assert_eq!(m.n_and(), before);
    }
}
