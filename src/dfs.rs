//! DFS traversal, MFFC sizing/collection, and reconvergence-driven
//! window growth. Grounded on `aig/aig/aigDfs.c` (`Aig_ManDfs_rec`,
//! traversal-ID marking) and `base/abc/abcRefs.c`
//! (`Abc_NodeRefDeref`, `Abc_NodeMffcInside`'s cut-bounded variant).
use crate::edge::NodeId;
use crate::hash::FxHashSet;
use crate::manager::AigManager;

/// Post-order (topological) DFS from `roots`, skipping already-visited
/// nodes via the manager's traversal-ID counter. Terminals are
/// included in the order.
pub fn dfs_postorder(mgr: &mut AigManager, roots: &[NodeId]) -> Vec<NodeId> {
    mgr.bump_trav();
    let mut order = Vec::new();
    let mut stack: Vec<(NodeId, bool)> = roots.iter().map(|&r| (r, false)).collect();
    while let Some((id, expanded)) = stack.pop() {
        if mgr.is_trav_current(id) {
            continue;
        }
        if expanded {
            mgr.set_trav_current(id);
            order.push(id);
            continue;
        }
        let (is_and, f0, f1) = match mgr.obj(id) {
            Some(obj) => (obj.is_and(), obj.fanin0, obj.fanin1),
            None => continue,
        };
        if !is_and {
            mgr.set_trav_current(id);
            order.push(id);
            continue;
        }
        stack.push((id, true));
        if let Some(f1) = f1 {
            stack.push((f1.id(), false));
        }
        if let Some(f0) = f0 {
            stack.push((f0.id(), false));
        }
    }
    order
}

/// Decrements the reference count along every edge reachable from
/// `root` without crossing `boundary`, recursing only into fanins
/// whose count just hit zero. Mirrors `Abc_NodeDeref_rec`; the
/// original's recursion becomes an explicit stack per the design
/// notes on bounding worst-case stack depth.
fn deref_collect(mgr: &mut AigManager, root: NodeId, boundary: Option<&FxHashSet<NodeId>>) -> Vec<NodeId> {
    let mut nodes = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let (is_and, f0, f1) = match mgr.obj(id) {
            Some(obj) if obj.is_and() => (true, obj.fanin0.unwrap(), obj.fanin1.unwrap()),
            _ => continue,
        };
        let _ = is_and;
        nodes.push(id);
        for f in [f0, f1] {
            if boundary.map(|b| b.contains(&f.id())).unwrap_or(false) {
                mgr.dec_ref(f.id());
                continue;
            }
            if mgr.dec_ref(f.id()) == 0 {
                stack.push(f.id());
            }
        }
    }
    nodes
}

/// Restores reference counts dropped by `deref_collect` for the exact
/// node set it returned -- mirrors `Abc_NodeRef_rec`'s dual pass.
fn ref_restore(mgr: &mut AigManager, nodes: &[NodeId]) {
    for &id in nodes {
        let obj = mgr.obj(id).expect("mffc node vanished before ref restore");
        let (f0, f1) = (obj.fanin0.unwrap(), obj.fanin1.unwrap());
        mgr.inc_ref(f0.id());
        mgr.inc_ref(f1.id());
    }
}

/// Size of `root`'s maximum fanout-free cone: the number of `And`
/// nodes that become dangling if `root` is deleted. Leaves the
/// manager's ref counts unchanged (dereference, measure, re-reference).
pub fn mffc_size(mgr: &mut AigManager, root: NodeId) -> usize {
    let nodes = deref_collect(mgr, root, None);
    let n = nodes.len();
    ref_restore(mgr, &nodes);
    n
}

/// Same as [`mffc_size`] but treats `leaves` as a hard boundary: the
/// cone never grows past them. Used when judging the gain of
/// replacing `root` with a subgraph built purely from `leaves`.
pub fn mffc_size_bounded(mgr: &mut AigManager, root: NodeId, leaves: &[NodeId]) -> usize {
    let boundary: FxHashSet<NodeId> = leaves.iter().copied().collect();
    let nodes = deref_collect(mgr, root, Some(&boundary));
    let n = nodes.len();
    ref_restore(mgr, &nodes);
    n
}

/// The actual node IDs in `root`'s MFFC (bounded by `leaves`), in an
/// order safe to delete leaf-first (fanins appear after their users
/// since the stack pops in reverse discovery order... in practice
/// callers should delete via `AigManager::replace`, which recomputes
/// its own worklist; this is for cost accounting and reporting).
pub fn mffc_nodes(mgr: &mut AigManager, root: NodeId, leaves: &[NodeId]) -> Vec<NodeId> {
    let boundary: FxHashSet<NodeId> = leaves.iter().copied().collect();
    let nodes = deref_collect(mgr, root, Some(&boundary));
    ref_restore(mgr, &nodes);
    nodes
}

/// Grows a leaf cut by repeatedly absorbing whichever leaf is
/// cheapest to expand into its own fanins (cost = net change in leaf
/// count), stopping at `max_leaves` or when every expansion would
/// only grow the frontier. Used to build resubstitution/refactor
/// windows around a reconvergent region; the cost model mirrors the
/// cut-merge bookkeeping in `opt/cut/cutNode.c`.
pub fn grow_window(mgr: &AigManager, seed: &[NodeId], max_leaves: usize) -> Vec<NodeId> {
    let mut leaves: Vec<NodeId> = seed.to_vec();
    loop {
        if leaves.len() >= max_leaves {
            break;
        }
        let mut best: Option<(usize, i64)> = None;
        for (i, &l) in leaves.iter().enumerate() {
            let Some(obj) = mgr.obj(l) else { continue };
            if !obj.is_and() {
                continue;
            }
            let (f0, f1) = (obj.fanin0.unwrap().id(), obj.fanin1.unwrap().id());
            let mut new_count = 0i64;
            if !leaves.contains(&f0) {
                new_count += 1;
            }
            if f1 != f0 && !leaves.contains(&f1) {
                new_count += 1;
            }
            let cost = new_count - 1;
            let better = match best {
                Some((_, c)) => cost < c,
                None => true,
            };
            if better {
                best = Some((i, cost));
            }
        }
        let Some((i, cost)) = best else { break };
        if leaves.len() as i64 + cost > max_leaves as i64 {
            break;
        }
        let l = leaves.remove(i);
        let obj = mgr.obj(l).unwrap();
        let (f0, f1) = (obj.fanin0.unwrap().id(), obj.fanin1.unwrap().id());
        if !leaves.contains(&f0) {
            leaves.push(f0);
        }
        if f1 != f0 && !leaves.contains(&f1) {
            leaves.push(f1);
        }
    }
    leaves
}
