//! Tree balancing: collapse each maximal AND supergate (a node's
//! uncomplemented-edge AND fanin tree, stopping at shared nodes or
//! inverted edges) and rebuild it as a minimum-depth tree. Grounded on
//! `abci/abcBalance.c`'s `Abc_NodeBalanceBuildSuper`/supergate
//! collection, with the priority-by-level multiway merge it uses to
//! keep the rebuilt tree shallow.
use crate::dfs;
use crate::edge::{Edge, NodeId};
use crate::manager::AigManager;

/// Collects the leaves of the maximal AND supergate rooted at `e`. The
/// root itself is always expanded; a fanin is expanded only if it's an
/// uncomplemented `And` edge with no other fanout (so it's not shared
/// structure we'd otherwise duplicate).
fn collect_supergate(mgr: &AigManager, e: Edge, is_root: bool, leaves: &mut Vec<Edge>) {
    let is_and = mgr.obj(e.id()).map(|o| o.is_and()).unwrap_or(false);
    let expandable = is_and && !e.is_compl() && (is_root || mgr.ref_count(e.id()) <= 1);
    if !expandable {
        leaves.push(e);
        return;
    }
    let obj = mgr.obj(e.id()).unwrap();
    let (f0, f1) = (obj.fanin0.unwrap(), obj.fanin1.unwrap());
    collect_supergate(mgr, f0, false, leaves);
    collect_supergate(mgr, f1, false, leaves);
}

/// A supergate root is any live `And` node whose single fanout (if it
/// has exactly one) wouldn't pull it into a bigger supergate: CO
/// drivers, shared nodes, and nodes reached only through a complement.
fn is_supergate_root(mgr: &AigManager, id: NodeId) -> bool {
    let fanouts = mgr.fanouts_of(id);
    if fanouts.len() != 1 {
        return true;
    }
    let Some(obj) = mgr.obj(fanouts[0]) else { return true };
    if !obj.is_and() {
        return true;
    }
    let edge_in = if obj.fanin0.unwrap().id() == id { obj.fanin0.unwrap() } else { obj.fanin1.unwrap() };
    edge_in.is_compl()
}

/// Rebuilds a balanced AND tree over `leaves` by always combining the
/// two lowest-level edges first, so shallow leaves end up near the
/// root and the tree's depth stays close to `ceil(log2(leaves.len()))`.
/// Each combined node's level is tracked locally (`1 + max` of its two
/// children) rather than read back from `mgr.level()`, which stays at
/// its arena-default 0 for every node built here until the pass's
/// trailing `recompute_levels()` -- reading it mid-loop would make
/// every fresh node look shallower than it really is and defeat the
/// whole point of sorting by level.
fn build_balanced(mgr: &mut AigManager, leaves: Vec<Edge>) -> Edge {
    if leaves.is_empty() {
        return mgr.one();
    }
    let mut items: Vec<(Edge, u32)> = leaves.into_iter().map(|e| (e, mgr.level(e.id()))).collect();
    while items.len() > 1 {
        items.sort_by_key(|(_, lvl)| *lvl);
        let (a, la) = items.remove(0);
        let (b, lb) = items.remove(0);
        let c = mgr.and(a, b);
        items.push((c, 1 + la.max(lb)));
    }
    items.into_iter().next().unwrap().0
}

/// One balancing pass over the whole network. Returns the number of
/// supergates that were actually rebuilt (as opposed to already
/// minimal, e.g. single `And` nodes).
pub fn balance(mgr: &mut AigManager) -> usize {
    mgr.recompute_levels();
    mgr.build_fanout_index();
    let order = dfs::dfs_postorder(mgr, &mgr.cos().to_vec());
    let mut roots = Vec::new();
    for &id in &order {
        if mgr.obj(id).map(|o| o.is_and()).unwrap_or(false) && is_supergate_root(mgr, id) {
            roots.push(id);
        }
    }
    mgr.drop_fanout_index();

    let mut n_rebuilt = 0;
    for id in roots {
        if !mgr.obj(id).map(|o| o.is_and()).unwrap_or(false) {
            continue;
        }
        let mut leaves = Vec::new();
        collect_supergate(mgr, Edge::pos(id), true, &mut leaves);
        if leaves.len() <= 2 {
            continue;
        }
        let rebuilt = build_balanced(mgr, leaves);
        if rebuilt.id() != id {
            mgr.replace(id, rebuilt);
            n_rebuilt += 1;
        }
    }
    mgr.cleanup();
    mgr.recompute_levels();
    n_rebuilt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_reduces_depth_of_left_leaning_chain() {
        let mut m = AigManager::new();
        let vars: Vec<_> = (0..4).map(|_| m.create_ci()).collect();
        let mut e = vars[0];
        for &v in &vars[1..] {
            e = m.and(e, v);
        }
        m.create_co(e);
        m.recompute_levels();
        let before_depth = m.max_level();
        assert_eq!(before_depth, 3);

        balance(&mut m);
        m.recompute_levels();
        assert_eq!(m.max_level(), 2, "4-way AND should balance to depth 2");
    }

    #[test]
    fn test_balance_preserves_function() {
        let mut m = AigManager::new();
        let vars: Vec<_> = (0..4).map(|_| m.create_ci()).collect();
        let mut e = vars[0];
        for &v in &vars[1..] {
            e = m.and(e, v);
        }
        let co = m.create_co(e);
        balance(&mut m);
        // All four leaves must still appear (with positive polarity) as
        // fanins somewhere in the new cone, and the cone must still be
        // a pure AND of exactly those four.
        let driver = m.co_driver(co);
        let mut leaves = Vec::new();
        super::collect_supergate(&m, driver, true, &mut leaves);
        let mut ids: Vec<_> = leaves.iter().map(|l| l.id()).collect();
        ids.sort();
        let mut want: Vec<_> = vars.iter().map(|v| v.id()).collect();
        want.sort();
        assert_eq!(ids, want);
        assert!(leaves.iter().all(|l| !l.is_compl()));
    }

    #[test]
    fn test_build_balanced_tracks_combined_node_levels() {
        // Six depth-0 leaves plus one depth-1 leaf: greedily combining
        // the two lowest-level edges at each step, with each merge's
        // level correctly tracked as 1 + max(children), reaches depth
        // 3. Reading a fresh merge's level back from the manager
        // (which stays 0 until the pass's trailing recompute) instead
        // makes every later leaf sort as if it were shallower than the
        // depth-1 leaf forever, producing a left-leaning depth-4 tree.
        let mut m = AigManager::new();
        let p = m.create_ci();
        let q = m.create_ci();
        let shared = m.and(p, q);
        let l0 = m.create_ci();
        let l1 = m.create_ci();
        let l2 = m.create_ci();
        let l3 = m.create_ci();
        let l4 = m.create_ci();
        let l5 = m.create_ci();
        m.recompute_levels();
        assert_eq!(m.level(shared.id()), 1);

        let leaves = vec![l0, l1, l2, l3, l4, l5, shared];
        let rebuilt = super::build_balanced(&mut m, leaves);
        m.create_co(rebuilt);
        m.recompute_levels();
        assert_eq!(m.level(rebuilt.id()), 3);
    }

    #[test]
    fn test_balance_is_noop_on_shared_subgraph() {
        let mut m = AigManager::new();
        let a = m.create_ci();
        let b = m.create_ci();
        let c = m.create_ci();
        let shared = m.and(a, b);
        let x = m.and(shared, c);
        let y = m.and(shared, !c);
        m.create_co(x);
        m.create_co(y);
        let before = m.n_and();
        balance(&mut m);
        assert_eq!(m.n_and(), before, "sharing shouldn't be broken apart by balancing");
    }
}
