//! AIGER binary format reader/writer. Grounded on
//! `base/io/ioReadAiger.c`: ASCII header, ASCII latch/output (and
//! bad-state/constraint) lines, then the binary delta-encoded AND
//! section (7-bit/byte, MSB-continuation varints), plus an optional
//! trailing symbol table.
use crate::edge::{Edge, NodeId};
use crate::error::{EngineError, Result};
use crate::hash::FxHashMap;
use crate::manager::{AigManager, LatchReset};
use std::io::{BufRead, BufReader, Read, Write};

#[derive(Debug, Default)]
pub struct SymbolTable {
    pub input_names: FxHashMap<usize, String>,
    pub latch_names: FxHashMap<usize, String>,
    pub output_names: FxHashMap<usize, String>,
}

struct Header {
    m: usize,
    i: usize,
    l: usize,
    o: usize,
    a: usize,
    b: usize,
    c: usize,
    j: usize,
    f: usize,
}

fn parse_header(line: &str) -> Result<Header> {
    let mut it = line.split_whitespace();
    let tag = it.next().ok_or_else(|| EngineError::BadAiger("empty header".into()))?;
    if tag != "aig" {
        return Err(EngineError::BadAiger(format!("expected \"aig\" tag, got {tag:?}")));
    }
    let fields: Vec<&str> = it.collect();
    if fields.len() < 5 {
        return Err(EngineError::BadAiger("header needs at least M I L O A".into()));
    }
    let parse = |s: &str| -> Result<usize> { s.parse().map_err(|_| EngineError::BadAiger(format!("bad header field {s:?}"))) };
    let get = |i: usize| -> Result<usize> { if i < fields.len() { parse(fields[i]) } else { Ok(0) } };
    Ok(Header {
        m: get(0)?,
        i: get(1)?,
        l: get(2)?,
        o: get(3)?,
        a: get(4)?,
        b: get(5)?,
        c: get(6)?,
        j: get(7)?,
        f: get(8)?,
    })
}

fn read_varint(r: &mut impl Read) -> Result<u32> {
    let mut result: u32 = 0;
    let mut shift = 0;
    loop {
        let mut byte = [0u8; 1];
        r.read_exact(&mut byte).map_err(io_err)?;
        let b = byte[0];
        result |= ((b & 0x7f) as u32) << shift;
        if b & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok(result)
}

fn write_varint(w: &mut impl Write, mut v: u32) -> Result<()> {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v != 0 {
            w.write_all(&[byte | 0x80]).map_err(io_err)?;
        } else {
            w.write_all(&[byte]).map_err(io_err)?;
            break;
        }
    }
    Ok(())
}

fn io_err(e: std::io::Error) -> EngineError {
    EngineError::Io { path: "<aiger>".into(), source: e }
}

/// Reads an AIGER binary file, returning the built manager plus
/// whatever symbol-table entries it carried. Bad-state (`B`) and
/// constraint (`C`) outputs are folded into the ordinary output list
/// with a warning -- this port has no property-checking layer to give
/// them separate treatment, and folding is what a reader without one
/// does. Liveness sections (`J`/`F`) are rejected outright.
pub fn read_aiger(path: &str) -> Result<(AigManager, SymbolTable)> {
    let file = std::fs::File::open(path).map_err(|e| EngineError::Io { path: path.into(), source: e })?;
    let mut reader = BufReader::new(file);

    let mut header_line = String::new();
    reader.read_line(&mut header_line).map_err(|e| EngineError::Io { path: path.into(), source: e })?;
    let header = parse_header(header_line.trim_end())?;
    if header.j != 0 || header.f != 0 {
        return Err(EngineError::UnsupportedLiveness);
    }
    if header.m != header.i + header.l + header.a {
        return Err(EngineError::BadAiger(format!(
            "M ({}) != I+L+A ({})",
            header.m,
            header.i + header.l + header.a
        )));
    }
    if header.b != 0 || header.c != 0 {
        log::warn!(
            "aiger: folding {} bad-state and {} constraint outputs into the plain output list",
            header.b,
            header.c
        );
    }

    let mut mgr = AigManager::new();
    for _ in 0..(header.i + header.l) {
        mgr.create_ci();
    }

    let mut latch_lits = Vec::with_capacity(header.l);
    let mut latch_resets = Vec::with_capacity(header.l);
    for idx in 0..header.l {
        let mut line = String::new();
        reader.read_line(&mut line).map_err(|e| EngineError::Io { path: path.into(), source: e })?;
        let mut parts = line.trim_end().split_whitespace();
        let lit: u32 = parts
            .next()
            .ok_or_else(|| EngineError::BadAiger("missing latch line".into()))?
            .parse()
            .map_err(|_| EngineError::BadAiger("bad latch literal".into()))?;
        // A latch's own literal is `var * 2` where `var` is its aiger
        // variable number (inputs come first, so this latch is
        // variable `i + 1 + idx`). That value, used as the reset
        // token, means "don't care" -- any initial value is valid.
        let own_lit = 2 * (header.i + 1 + idx) as u32;
        let reset = match parts.next() {
            None | Some("0") => LatchReset::Zero,
            Some("1") => LatchReset::One,
            Some(tok) => {
                let v: u32 = tok
                    .parse()
                    .map_err(|_| EngineError::BadAiger(format!("bad latch reset token {tok:?}")))?;
                if v == own_lit {
                    LatchReset::DontCare
                } else {
                    return Err(EngineError::BadAiger(format!(
                        "latch reset {v} is neither 0, 1, nor the latch's own literal {own_lit}"
                    )));
                }
            }
        };
        latch_lits.push(lit);
        latch_resets.push(reset);
    }

    let total_outputs = header.o + header.b + header.c;
    let mut output_lits = Vec::with_capacity(total_outputs);
    for _ in 0..total_outputs {
        let mut line = String::new();
        reader.read_line(&mut line).map_err(|e| EngineError::Io { path: path.into(), source: e })?;
        let lit: u32 = line
            .trim_end()
            .parse()
            .map_err(|_| EngineError::BadAiger(format!("bad output literal {line:?}")))?;
        output_lits.push(lit);
    }

    // `var_of_aiger[v]` is the manager NodeId that now stands in for
    // aiger variable `v`, filled in as CIs (known up front) and then
    // AND gates (as the binary section is decoded) are created.
    let mut var_of_aiger: Vec<NodeId> = vec![NodeId::CONST1; header.m + 1];
    for v in 1..=(header.i + header.l) {
        var_of_aiger[v] = mgr.cis()[v - 1];
    }
    let lit_to_edge = |var_of_aiger: &[NodeId], lit: u32| -> Edge {
        let var = (lit >> 1) as usize;
        let id = if var == 0 { NodeId::CONST1 } else { var_of_aiger[var] };
        Edge::new(id, lit & 1 == 1)
    };

    for i in 0..header.a {
        let var = header.i + header.l + 1 + i;
        let lhs_lit = (var as u32) * 2;
        let d0 = read_varint(&mut reader)?;
        let rhs0_lit = lhs_lit
            .checked_sub(d0)
            .ok_or_else(|| EngineError::BadAiger("AND delta underflow".into()))?;
        let d1 = read_varint(&mut reader)?;
        let rhs1_lit = rhs0_lit
            .checked_sub(d1)
            .ok_or_else(|| EngineError::BadAiger("AND delta underflow".into()))?;
        let e0 = lit_to_edge(&var_of_aiger, rhs0_lit);
        let e1 = lit_to_edge(&var_of_aiger, rhs1_lit);
        let out = mgr.and(e0, e1);
        var_of_aiger[var] = out.id();
    }

    mgr.set_reg_num(header.l);
    for (i, reset) in latch_resets.into_iter().enumerate() {
        mgr.set_latch_reset(i, reset);
    }
    // POs precede LIs in the manager's CO list (see node.rs/manager.rs
    // docs): create the plain/bad/constraint outputs first, then the
    // latch next-state drivers.
    for &lit in &output_lits {
        let driver = lit_to_edge(&var_of_aiger, lit);
        mgr.create_co(driver);
    }
    for &lit in &latch_lits {
        let driver = lit_to_edge(&var_of_aiger, lit);
        mgr.create_co(driver);
    }

    let mut symtab = SymbolTable::default();
    let mut line = String::new();
    while reader.read_line(&mut line).map_err(|e| EngineError::Io { path: path.into(), source: e })? > 0 {
        let trimmed = line.trim_end().to_string();
        line.clear();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('c') {
            break;
        }
        let mut chars = trimmed.chars();
        let Some(kind) = chars.next() else { continue };
        let rest: String = chars.collect();
        let mut parts = rest.splitn(2, ' ');
        let Some(idx_str) = parts.next() else { continue };
        let name = parts.next().unwrap_or("").to_string();
        let Ok(idx) = idx_str.parse::<usize>() else { continue };
        match kind {
            'i' => {
                symtab.input_names.insert(idx, name);
            }
            'l' => {
                symtab.latch_names.insert(idx, name);
            }
            'o' => {
                symtab.output_names.insert(idx, name);
            }
            _ => {}
        }
    }

    Ok((mgr, symtab))
}

/// Writes `mgr` out in AIGER binary form. Bad-state/constraint/
/// liveness sections are never produced -- this port folded them into
/// plain outputs on read (or never had them), so `write_aiger` only
/// ever emits the `aig M I L O A` form. `symbols`, when given, is
/// appended as a trailing symbol table (the `write_aiger -s` case).
pub fn write_aiger(path: &str, mgr: &AigManager, symbols: Option<&SymbolTable>) -> Result<()> {
    let n_pis = mgr.n_pis();
    let n_regs = mgr.n_regs();
    let n_pos = mgr.n_pos();

    let mut and_nodes: Vec<NodeId> = Vec::new();
    for (id, obj) in mgr.iter_live() {
        if obj.is_and() {
            and_nodes.push(id);
        }
    }
    and_nodes.sort_unstable();

    let mut var_of: FxHashMap<NodeId, u32> = FxHashMap::default();
    let mut next_var = 1u32;
    for &id in mgr.cis() {
        var_of.insert(id, next_var);
        next_var += 1;
    }
    for &id in &and_nodes {
        var_of.insert(id, next_var);
        next_var += 1;
    }

    let lit_of = |e: Edge| -> u32 {
        if e.id() == NodeId::CONST1 {
            e.is_compl() as u32
        } else {
            2 * var_of[&e.id()] + e.is_compl() as u32
        }
    };

    let m = n_pis + n_regs + and_nodes.len();
    let mut out = Vec::new();
    writeln!(out, "aig {} {} {} {} {}", m, n_pis, n_regs, n_pos, and_nodes.len()).map_err(io_err)?;

    for i in 0..n_regs {
        let co = mgr.cos()[n_pos + i];
        let driver = mgr.co_driver(co);
        match mgr.latch_reset(i) {
            LatchReset::Zero => writeln!(out, "{}", lit_of(driver)).map_err(io_err)?,
            LatchReset::One => writeln!(out, "{} 1", lit_of(driver)).map_err(io_err)?,
            LatchReset::DontCare => {
                let ci = mgr.cis()[n_pis + i];
                let own_lit = 2 * var_of[&ci];
                writeln!(out, "{} {}", lit_of(driver), own_lit).map_err(io_err)?;
            }
        }
    }
    for i in 0..n_pos {
        let co = mgr.cos()[i];
        let driver = mgr.co_driver(co);
        writeln!(out, "{}", lit_of(driver)).map_err(io_err)?;
    }

    for &id in &and_nodes {
        let obj = mgr.obj(id).expect("and node vanished during write");
        let (f0, f1) = (obj.fanin0.unwrap(), obj.fanin1.unwrap());
        let lit0 = lit_of(f0);
        let lit1 = lit_of(f1);
        let (rhs0, rhs1) = if lit0 >= lit1 { (lit0, lit1) } else { (lit1, lit0) };
        let lhs = 2 * var_of[&id];
        write_varint(&mut out, lhs - rhs0)?;
        write_varint(&mut out, rhs0 - rhs1)?;
    }

    if let Some(syms) = symbols {
        let mut names: Vec<(char, usize, &String)> = Vec::new();
        names.extend(syms.input_names.iter().map(|(&i, n)| ('i', i, n)));
        names.extend(syms.latch_names.iter().map(|(&i, n)| ('l', i, n)));
        names.extend(syms.output_names.iter().map(|(&i, n)| ('o', i, n)));
        names.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        for (kind, idx, name) in names {
            writeln!(out, "{kind}{idx} {name}").map_err(io_err)?;
        }
    }

    std::fs::write(path, out).map_err(|e| EngineError::Io { path: path.into(), source: e })?;
    Ok(())
}
