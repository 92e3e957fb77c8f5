//! k-feasible cut enumeration (k <= 4), with 16-bit truth tables and
//! signature-based dominance filtering. Grounded on `opt/cut/cutNode.c`
//! (`Cut_NodeDoComputeCuts`'s merge-and-filter structure) and
//! `cutMerge.c` (`Cut_CutMergeTwo`, `Cut_CutFilterOne`).
use crate::edge::NodeId;
use crate::hash::FxHashMap;
use crate::manager::AigManager;

pub const MAX_CUT_SIZE: usize = 4;
pub const MAX_CUTS_PER_NODE: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cut {
    /// Sorted, deduplicated leaf IDs; `len() <= MAX_CUT_SIZE`.
    pub leaves: Vec<NodeId>,
    /// Truth table of the node's function over `leaves`, in the order
    /// they appear in `leaves` (bit `i` of the minterm index is
    /// `leaves[i]`'s value).
    pub truth: u16,
}

impl Cut {
    pub fn trivial(id: NodeId) -> Cut {
        Cut { leaves: vec![id], truth: 0b10 }
    }
}

fn mask_for(nvars: usize) -> u16 {
    let nbits = 1usize << nvars;
    if nbits >= 16 {
        0xFFFF
    } else {
        (1u16 << nbits) - 1
    }
}

/// Re-expresses `truth` (defined over `from`) as a table over the
/// superset variable order `to`.
fn remap(truth: u16, from: &[NodeId], to: &[NodeId]) -> u16 {
    let n = to.len();
    let mut result = 0u16;
    for m in 0..(1usize << n) {
        let mut src = 0usize;
        for (j, leaf) in from.iter().enumerate() {
            let i = to.iter().position(|l| l == leaf).expect("from not a subset of to");
            if (m >> i) & 1 == 1 {
                src |= 1 << j;
            }
        }
        if (truth >> src) & 1 == 1 {
            result |= 1 << m;
        }
    }
    result
}

fn merge_two(c0: &Cut, compl0: bool, c1: &Cut, compl1: bool) -> Option<Cut> {
    let mut leaves: Vec<NodeId> = c0.leaves.iter().chain(c1.leaves.iter()).copied().collect();
    leaves.sort_unstable();
    leaves.dedup();
    if leaves.len() > MAX_CUT_SIZE {
        return None;
    }
    let mask = mask_for(leaves.len());
    let mut t0 = remap(c0.truth, &c0.leaves, &leaves);
    let mut t1 = remap(c1.truth, &c1.leaves, &leaves);
    if compl0 {
        t0 = !t0 & mask;
    }
    if compl1 {
        t1 = !t1 & mask;
    }
    Some(Cut { leaves, truth: t0 & t1 & mask })
}

fn signature(leaves: &[NodeId]) -> u32 {
    leaves.iter().fold(0u32, |acc, id| acc | (1 << (id.0 % 32)))
}

fn is_subset(a: &[NodeId], b: &[NodeId]) -> bool {
    a.iter().all(|x| b.contains(x))
}

/// Drops any cut whose leaf set is a strict superset of another cut
/// for the same node (both compute the same function, so the smaller
/// support always dominates). The signature is a cheap pre-filter
/// before the exact containment check.
fn filter_dominated(cuts: &mut Vec<Cut>) {
    let sigs: Vec<u32> = cuts.iter().map(|c| signature(&c.leaves)).collect();
    let mut keep = vec![true; cuts.len()];
    for i in 0..cuts.len() {
        if !keep[i] {
            continue;
        }
        for j in 0..cuts.len() {
            if i == j || !keep[j] {
                continue;
            }
            if cuts[i].leaves.len() < cuts[j].leaves.len()
                && (sigs[i] & !sigs[j]) == 0
                && is_subset(&cuts[i].leaves, &cuts[j].leaves)
            {
                keep[j] = false;
            }
        }
    }
    let mut idx = 0;
    cuts.retain(|_| {
        let k = keep[idx];
        idx += 1;
        k
    });
}

fn cap_cuts(cuts: &mut Vec<Cut>, limit: usize) {
    if cuts.len() <= limit {
        return;
    }
    cuts.sort_by_key(|c| c.leaves.len());
    cuts.truncate(limit);
}

/// Enumerates k-feasible cuts for every node in `order` (expected to
/// be a DFS postorder so fanins are processed first), returning a
/// side table keyed by node ID rather than mutating the manager.
pub fn enumerate_cuts(mgr: &AigManager, order: &[NodeId]) -> FxHashMap<NodeId, Vec<Cut>> {
    let mut cuts: FxHashMap<NodeId, Vec<Cut>> = FxHashMap::default();
    for &id in order {
        let Some(obj) = mgr.obj(id) else { continue };
        if !obj.is_and() {
            cuts.insert(id, vec![Cut::trivial(id)]);
            continue;
        }
        let (f0, f1) = (obj.fanin0.unwrap(), obj.fanin1.unwrap());
        let empty = Vec::new();
        let cuts0 = cuts.get(&f0.id()).unwrap_or(&empty).clone();
        let cuts1 = cuts.get(&f1.id()).unwrap_or(&empty).clone();
        let mut merged = Vec::new();
        for c0 in &cuts0 {
            for c1 in &cuts1 {
                if let Some(c) = merge_two(c0, f0.is_compl(), c1, f1.is_compl()) {
                    merged.push(c);
                }
            }
        }
        merged.push(Cut::trivial(id));
        filter_dominated(&mut merged);
        cap_cuts(&mut merged, MAX_CUTS_PER_NODE);
        cuts.insert(id, merged);
    }
    cuts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfs::dfs_postorder;

    #[test]
    fn test_trivial_cut_always_present() {
        let mut m = AigManager::new();
        let a = m.create_ci();
        let b = m.create_ci();
        let x = m.and(a, b);
        let order = dfs_postorder(&mut m, &[x.id()]);
        let cuts = enumerate_cuts(&m, &order);
        let xc = cuts.get(&x.id()).unwrap();
        assert!(xc.iter().any(|c| c.leaves == vec![x.id()]));
    }

    #[test]
    fn test_merged_cut_truth_is_and() {
        let mut m = AigManager::new();
        let a = m.create_ci();
        let b = m.create_ci();
        let x = m.and(a, b);
        let order = dfs_postorder(&mut m, &[x.id()]);
        let cuts = enumerate_cuts(&m, &order);
        let xc = cuts.get(&x.id()).unwrap();
        let merged = xc.iter().find(|c| c.leaves.len() == 2).expect("2-leaf cut");
        assert_eq!(merged.leaves, vec![a.id(), b.id()]);
        assert_eq!(merged.truth, 0b1000); // AND of two projection vars
    }

    #[test]
    fn test_no_cut_exceeds_k() {
        let mut m = AigManager::new();
        let vars: Vec<_> = (0..6).map(|_| m.create_ci()).collect();
        let mut e = vars[0];
        for &v in &vars[1..] {
            e = m.and(e, v);
        }
        let order = dfs_postorder(&mut m, &[e.id()]);
        let cuts = enumerate_cuts(&m, &order);
        for set in cuts.values() {
            for c in set {
                assert!(c.leaves.len() <= MAX_CUT_SIZE);
            }
        }
    }

    #[test]
    fn test_dominance_filter_drops_superset() {
        let a = Cut { leaves: vec![NodeId(1)], truth: 0b10 };
        let b = Cut { leaves: vec![NodeId(1), NodeId(2)], truth: 0b1000 };
        let mut v = vec![a.clone(), b];
        filter_dominated(&mut v);
        assert_eq!(v, vec![a]);
    }
}
