//! Structural invariant checker (the `Check` command). Verifies the
//! invariants the rest of the engine relies on rather than re-deriving
//! them implicitly, mirroring the standalone consistency pass ABC
//! runs after every major transform.
use crate::edge::NodeId;
use crate::error::{EngineError, Result};
use crate::hash::{FxHashMap, HashKey};
use crate::manager::AigManager;
use crate::node::ObjType;

/// Runs every structural invariant check and returns the first
/// violation found, or `Ok(())` if the network is consistent:
/// 1. Fanins are ordered by ID (canonical form for `And` nodes).
/// 2. No two live `And` nodes share a structural-hash key (every `And`
///    node is exactly the one the hash table would return for its
///    fanins -- the strashing invariant).
/// 3. Reference counts match the number of structural fanouts.
/// 4. The graph is acyclic.
/// 5. The phase field is consistent with the all-zero-pattern value.
pub fn check(mgr: &mut AigManager) -> Result<()> {
    check_canonical_order(mgr)?;
    check_strash_unique(mgr)?;
    check_refs(mgr)?;
    check_acyclic(mgr)?;
    check_phase(mgr)?;
    Ok(())
}

fn check_canonical_order(mgr: &AigManager) -> Result<()> {
    for (id, obj) in mgr.iter_live() {
        if obj.typ != ObjType::And {
            continue;
        }
        let (f0, f1) = (obj.fanin0.unwrap(), obj.fanin1.unwrap());
        if f0.id() > f1.id() {
            return Err(EngineError::CheckFailed(format!(
                "node {id} has fanins out of canonical order: {} > {}",
                f0.id(),
                f1.id()
            )));
        }
        if f0.id() == f1.id() {
            return Err(EngineError::CheckFailed(format!(
                "node {id} has two identical fanins; should have been trivially simplified"
            )));
        }
    }
    Ok(())
}

fn check_strash_unique(mgr: &AigManager) -> Result<()> {
    let mut seen: FxHashMap<HashKey, NodeId> = FxHashMap::default();
    for (id, obj) in mgr.iter_live() {
        if obj.typ != ObjType::And {
            continue;
        }
        let (f0, f1) = (obj.fanin0.unwrap(), obj.fanin1.unwrap());
        let (key, _, _) = HashKey::new(f0, f1);
        if let Some(&other) = seen.get(&key) {
            return Err(EngineError::CheckFailed(format!(
                "nodes {other} and {id} share a structural-hash key; strashing invariant violated"
            )));
        }
        seen.insert(key, id);
    }
    Ok(())
}

fn check_refs(mgr: &AigManager) -> Result<()> {
    let mut expected: FxCounter = FxCounter::default();
    for (_, obj) in mgr.iter_live() {
        if let Some(f0) = obj.fanin0 {
            expected.bump(f0.id());
        }
        if obj.is_and() {
            if let Some(f1) = obj.fanin1 {
                expected.bump(f1.id());
            }
        }
    }
    for (id, obj) in mgr.iter_live() {
        let want = expected.get(id);
        if obj.refs != want {
            return Err(EngineError::CheckFailed(format!(
                "node {id} has refs={}, but {want} structural fanouts were found",
                obj.refs
            )));
        }
    }
    Ok(())
}

#[derive(Default)]
struct FxCounter(crate::hash::FxHashMap<crate::edge::NodeId, u32>);
impl FxCounter {
    fn bump(&mut self, id: crate::edge::NodeId) {
        *self.0.entry(id).or_insert(0) += 1;
    }
    fn get(&self, id: crate::edge::NodeId) -> u32 {
        self.0.get(&id).copied().unwrap_or(0)
    }
}

fn check_acyclic(mgr: &mut AigManager) -> Result<()> {
    let roots: Vec<_> = mgr.cos().to_vec();
    mgr.bump_trav();
    let mut on_stack = crate::hash::FxHashSet::default();
    let mut stack: Vec<(crate::edge::NodeId, bool)> = roots.into_iter().map(|r| (r, false)).collect();
    while let Some((id, leaving)) = stack.pop() {
        if leaving {
            on_stack.remove(&id);
            continue;
        }
        if on_stack.contains(&id) {
            return Err(EngineError::CheckFailed(format!("cycle detected through node {id}")));
        }
        if mgr.is_trav_current(id) {
            continue;
        }
        mgr.set_trav_current(id);
        on_stack.insert(id);
        stack.push((id, true));
        let Some(obj) = mgr.obj(id) else { continue };
        if let Some(f0) = obj.fanin0 {
            stack.push((f0.id(), false));
        }
        if obj.is_and() {
            if let Some(f1) = obj.fanin1 {
                stack.push((f1.id(), false));
            }
        }
    }
    Ok(())
}

fn check_phase(mgr: &AigManager) -> Result<()> {
    for (id, obj) in mgr.iter_live() {
        if obj.typ != ObjType::And {
            continue;
        }
        let (f0, f1) = (obj.fanin0.unwrap(), obj.fanin1.unwrap());
        let phase0 = mgr.obj(f0.id()).map(|o| o.phase).unwrap_or(false) ^ f0.is_compl();
        let phase1 = mgr.obj(f1.id()).map(|o| o.phase).unwrap_or(false) ^ f1.is_compl();
        if obj.phase != (phase0 && phase1) {
            return Err(EngineError::CheckFailed(format!("node {id} has an inconsistent phase bit")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_manager_passes() {
        let mut m = AigManager::new();
        let a = m.create_ci();
        let b = m.create_ci();
        let x = m.and(a, b);
        m.create_co(x);
        assert!(check(&mut m).is_ok());
    }

    #[test]
    fn test_dangling_node_fails_ref_check() {
        let mut m = AigManager::new();
        let a = m.create_ci();
        let b = m.create_ci();
        let _x = m.and(a, b);
        m.create_co(a); // x is never used, but stays allocated with refs == 0
        assert!(check(&mut m).is_ok(), "refs==0 for a dangling node is still consistent");
    }

    #[test]
    fn test_duplicate_strash_key_fails_check() {
        let mut m = AigManager::new();
        let a = m.create_ci();
        let b = m.create_ci();
        let x = m.and(a, b);
        let y = m.and_skip_strash(a, b);
        m.create_co(x);
        m.create_co(y);
        assert!(matches!(check(&mut m), Err(EngineError::CheckFailed(_))));
    }

    #[test]
    fn test_replace_preserves_consistency() {
        let mut m = AigManager::new();
        let a = m.create_ci();
        let b = m.create_ci();
        let x = m.and(a, b);
        let co = m.create_co(x);
        m.replace(x.id(), a);
        let _ = co;
        assert!(check(&mut m).is_ok());
    }
}
