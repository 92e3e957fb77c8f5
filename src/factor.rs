//! Algebraic factoring: cover a truth table with prime implicants,
//! then repeatedly divide out the most-repeated literal ("quick
//! factor", after Brayton's `Boolean division` family of algorithms)
//! to turn a flat sum-of-products into a multi-level AND/OR tree.
//! Used both to build the rewrite library's subgraphs (over 4-input
//! canonical functions) and by the refactor pass (over arbitrary
//! reconvergence windows). Grounded loosely on `abci/abcRefactor.c`'s
//! use of a factored form, though the original's cube/kernel
//! extraction is considerably more elaborate than this port's.
use crate::edge::Edge;
use crate::manager::AigManager;
use crate::truth::DynTruth;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cube {
    /// bit `i` set: variable `i` is a literal in this cube.
    care: u32,
    /// bit `i` (when `care` has it set): the literal's polarity.
    pol: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactorNode {
    Const0,
    Const1,
    Lit(usize, bool),
    And(Box<FactorNode>, Box<FactorNode>),
    Or(Box<FactorNode>, Box<FactorNode>),
}

fn onset_minterms(t: &DynTruth) -> Vec<u32> {
    let nbits = 1usize << t.nvars();
    (0..nbits).filter(|&m| t.bit(m)).map(|m| m as u32).collect()
}

fn combine(a: &Cube, b: &Cube) -> Option<Cube> {
    if a.care != b.care {
        return None;
    }
    let diff = a.pol ^ b.pol;
    if diff.count_ones() != 1 {
        return None;
    }
    if a.care & diff != diff {
        return None;
    }
    Some(Cube { care: a.care & !diff, pol: a.pol & !diff })
}

/// Quine-McCluskey-style prime implicant generation: repeatedly merge
/// cubes differing in exactly one (cared-about) literal until no pair
/// combines, collecting every cube that never got merged away.
fn primes(nvars: usize, minterms: &[u32]) -> Vec<Cube> {
    let full_care = if nvars >= 32 { u32::MAX } else { (1u32 << nvars) - 1 };
    let mut level: Vec<Cube> = minterms.iter().map(|&m| Cube { care: full_care, pol: m }).collect();
    level.sort_by_key(|c| (c.care, c.pol));
    level.dedup_by_key(|c| (c.care, c.pol));
    let mut all_primes: Vec<Cube> = Vec::new();
    loop {
        let mut used = vec![false; level.len()];
        let mut next: Vec<Cube> = Vec::new();
        for i in 0..level.len() {
            for j in (i + 1)..level.len() {
                if let Some(c) = combine(&level[i], &level[j]) {
                    used[i] = true;
                    used[j] = true;
                    next.push(c);
                }
            }
        }
        for (i, c) in level.iter().enumerate() {
            if !used[i] {
                all_primes.push(*c);
            }
        }
        if next.is_empty() {
            break;
        }
        next.sort_by_key(|c| (c.care, c.pol));
        next.dedup_by_key(|c| (c.care, c.pol));
        level = next;
    }
    all_primes.sort_by_key(|c| (c.care, c.pol));
    all_primes.dedup_by_key(|c| (c.care, c.pol));
    all_primes
}

fn covers(p: &Cube, m: u32) -> bool {
    (m & p.care) == (p.pol & p.care)
}

/// Greedy (not globally minimal) unate covering: repeatedly pick the
/// prime implicant covering the most still-uncovered minterms.
fn greedy_cover(primes: &[Cube], minterms: &[u32]) -> Vec<Cube> {
    let mut uncovered: HashSet<u32> = minterms.iter().copied().collect();
    let mut chosen = Vec::new();
    while !uncovered.is_empty() {
        let mut best_idx = None;
        let mut best_count = 0usize;
        for (i, p) in primes.iter().enumerate() {
            let count = uncovered.iter().filter(|&&m| covers(p, m)).count();
            if count > best_count {
                best_count = count;
                best_idx = Some(i);
            }
        }
        let Some(i) = best_idx else { break };
        let p = primes[i];
        uncovered.retain(|&m| !covers(&p, m));
        chosen.push(p);
    }
    chosen
}

fn cube_to_factor(c: &Cube, nvars: usize) -> FactorNode {
    let mut node: Option<FactorNode> = None;
    for v in 0..nvars {
        if (c.care >> v) & 1 == 1 {
            let lit = FactorNode::Lit(v, (c.pol >> v) & 1 == 1);
            node = Some(match node {
                None => lit,
                Some(acc) => FactorNode::And(Box::new(acc), Box::new(lit)),
            });
        }
    }
    node.unwrap_or(FactorNode::Const1)
}

/// Every (variable, polarity) literal that repeats across more than one
/// cube, sorted most-repeated first (ties broken by variable then
/// polarity for determinism). The first entry is the literal
/// `factor_cover` divides out; a second entry means the cover has a
/// redundant middle term -- more than one literal could be pulled out
/// first -- which is what `factor_truth_alt` uses to produce a
/// structurally different, still function-equivalent, tree.
fn repeated_literals(cubes: &[Cube], nvars: usize) -> Vec<(usize, bool, usize)> {
    let mut choices = Vec::new();
    for var in 0..nvars {
        for &pol in &[false, true] {
            let count = cubes
                .iter()
                .filter(|c| (c.care >> var) & 1 == 1 && ((c.pol >> var) & 1 == 1) == pol)
                .count();
            if count > 1 {
                choices.push((var, pol, count));
            }
        }
    }
    choices.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)).then(a.1.cmp(&b.1)));
    choices
}

/// Divides `cubes` by the literal `(var, pol)`, factoring both halves
/// recursively -- the actual algebraic division step. Sound for any
/// literal actually appearing in the cover, not just the most-repeated
/// one, since it's just `f = lit & (f / lit) | (f without lit)`.
fn divide_by_literal(cubes: &[Cube], nvars: usize, var: usize, pol: bool) -> FactorNode {
    let (with_lit, without_lit): (Vec<Cube>, Vec<Cube>) = cubes
        .iter()
        .copied()
        .partition(|c| (c.care >> var) & 1 == 1 && ((c.pol >> var) & 1 == 1) == pol);
    let divided: Vec<Cube> = with_lit.into_iter().map(|mut c| { c.care &= !(1 << var); c }).collect();
    let d_factor = factor_cover(&divided, nvars);
    let term = FactorNode::And(Box::new(FactorNode::Lit(var, pol)), Box::new(d_factor));
    if without_lit.is_empty() {
        term
    } else {
        let r_factor = factor_cover(&without_lit, nvars);
        FactorNode::Or(Box::new(term), Box::new(r_factor))
    }
}

/// Divides out whichever literal appears in the most cubes, factoring
/// the remainder recursively -- the "quick factor" step. Falls back to
/// a flat sum of product terms once no literal repeats.
fn factor_cover(cubes: &[Cube], nvars: usize) -> FactorNode {
    if cubes.is_empty() {
        return FactorNode::Const0;
    }
    if cubes.len() == 1 {
        return cube_to_factor(&cubes[0], nvars);
    }
    match repeated_literals(cubes, nvars).first() {
        None => {
            let mut it = cubes.iter().map(|c| cube_to_factor(c, nvars));
            let first = it.next().unwrap();
            it.fold(first, |acc, n| FactorNode::Or(Box::new(acc), Box::new(n)))
        }
        Some(&(var, pol, _)) => divide_by_literal(cubes, nvars, var, pol),
    }
}

/// Factors `t` into a multi-level AND/OR/literal tree.
pub fn factor_truth(t: &DynTruth) -> FactorNode {
    if t.is_const0() {
        return FactorNode::Const0;
    }
    if t.is_const1() {
        return FactorNode::Const1;
    }
    let minterms = onset_minterms(t);
    let prime_list = primes(t.nvars(), &minterms);
    let cover = greedy_cover(&prime_list, &minterms);
    factor_cover(&cover, t.nvars())
}

/// An alternate top-level factoring of `t`, dividing by the
/// second-most-repeated literal instead of the one `factor_truth` picks.
/// Returns `None` when there's no second literal to divide by (the
/// cover has a single irredundant literal to factor on, or none at
/// all), i.e. when there's no redundant middle term to offer a choice
/// over.
pub fn factor_truth_alt(t: &DynTruth) -> Option<FactorNode> {
    if t.is_const0() || t.is_const1() {
        return None;
    }
    let minterms = onset_minterms(t);
    let prime_list = primes(t.nvars(), &minterms);
    let cover = greedy_cover(&prime_list, &minterms);
    if cover.len() <= 1 {
        return None;
    }
    let choices = repeated_literals(&cover, t.nvars());
    let &(var, pol, _) = choices.get(1)?;
    Some(divide_by_literal(&cover, t.nvars(), var, pol))
}

/// Lowers a factored tree into real AIG nodes, `leaf_edges[v]` being
/// the edge to use wherever the tree references variable `v`.
pub fn to_aig(node: &FactorNode, mgr: &mut AigManager, leaf_edges: &[Edge]) -> Edge {
    match node {
        FactorNode::Const0 => mgr.zero(),
        FactorNode::Const1 => mgr.one(),
        FactorNode::Lit(v, pol) => leaf_edges[*v].not_if(!*pol),
        FactorNode::And(a, b) => {
            let ea = to_aig(a, mgr, leaf_edges);
            let eb = to_aig(b, mgr, leaf_edges);
            mgr.and(ea, eb)
        }
        FactorNode::Or(a, b) => {
            let ea = to_aig(a, mgr, leaf_edges);
            let eb = to_aig(b, mgr, leaf_edges);
            mgr.or(ea, eb)
        }
    }
}

/// Literal count of a factored tree, the cost metric refactor/rewrite
/// use to decide whether a candidate is actually cheaper.
pub fn literal_count(node: &FactorNode) -> usize {
    match node {
        FactorNode::Const0 | FactorNode::Const1 => 0,
        FactorNode::Lit(..) => 1,
        FactorNode::And(a, b) | FactorNode::Or(a, b) => literal_count(a) + literal_count(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::truth::{DynTruth, ELEM4};

    fn eval_factor(node: &FactorNode, inputs: &[bool]) -> bool {
        match node {
            FactorNode::Const0 => false,
            FactorNode::Const1 => true,
            FactorNode::Lit(v, pol) => inputs[*v] == *pol,
            FactorNode::And(a, b) => eval_factor(a, inputs) && eval_factor(b, inputs),
            FactorNode::Or(a, b) => eval_factor(a, inputs) || eval_factor(b, inputs),
        }
    }

    fn check_equivalent(t: &DynTruth, node: &FactorNode) {
        let nbits = 1usize << t.nvars();
        for m in 0..nbits {
            let inputs: Vec<bool> = (0..t.nvars()).map(|v| (m >> v) & 1 == 1).collect();
            assert_eq!(t.bit(m), eval_factor(node, &inputs), "mismatch at minterm {m}");
        }
    }

    #[test]
    fn test_factor_and() {
        let f = DynTruth::elementary(4, 0).and(&DynTruth::elementary(4, 1));
        let node = factor_truth(&f);
        check_equivalent(&f, &node);
    }

    #[test]
    fn test_factor_xor() {
        let x0 = DynTruth::elementary(4, 0);
        let x1 = DynTruth::elementary(4, 1);
        let f = x0.xor(&x1);
        let node = factor_truth(&f);
        check_equivalent(&f, &node);
    }

    #[test]
    fn test_factor_mux() {
        // f = s ? a : b, over vars (s=0, a=1, b=2)
        let s = DynTruth::elementary(4, 0);
        let a = DynTruth::elementary(4, 1);
        let b = DynTruth::elementary(4, 2);
        let f = s.and(&a).or(&s.not().and(&b));
        let node = factor_truth(&f);
        check_equivalent(&f, &node);
    }

    #[test]
    fn test_factor_const() {
        assert_eq!(factor_truth(&DynTruth::zero(4)), FactorNode::Const0);
    }

    #[test]
    fn test_factor_alt_is_equivalent_when_present() {
        // f = ab + ac + bc has three literals (a, b, c) each repeated
        // twice, so there's a genuine second literal to divide by.
        let a = DynTruth::elementary(4, 0);
        let b = DynTruth::elementary(4, 1);
        let c = DynTruth::elementary(4, 2);
        let f = (a.and(&b)).or(&a.and(&c)).or(&b.and(&c));
        let alt = factor_truth_alt(&f).expect("majority-3 has a redundant middle term");
        check_equivalent(&f, &alt);
        assert_ne!(alt, factor_truth(&f), "alt candidate should divide on a different literal");
    }

    #[test]
    fn test_factor_alt_absent_for_single_and_term() {
        let f = DynTruth::elementary(4, 0).and(&DynTruth::elementary(4, 1));
        assert_eq!(factor_truth_alt(&f), None);
    }

    #[test]
    fn test_to_aig_matches_truth_table() {
        let mut m = AigManager::new();
        let a = m.create_ci();
        let b = m.create_ci();
        let f = DynTruth::from_u16(ELEM4[0] & ELEM4[1]);
        let node = factor_truth(&f);
        let leaves = [a, b, m.zero(), m.zero()];
        let out = to_aig(&node, &mut m, &leaves);
        assert_eq!(out, m.and(a, b));
    }
}
