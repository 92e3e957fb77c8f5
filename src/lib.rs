//! A DAG-aware And-Inverter-Graph rewriting engine: structural hashing,
//! cut enumeration, and library-based rewrite/refactor/resub/balance
//! passes over a single in-memory network.

#[macro_use] extern crate log;
extern crate simplelog;

/// Complemented-edge wrapper over a node ID, plus node-ID itself.
pub mod edge;
/// The arena node type and its fields.
pub mod node;
/// Structural-hash key and the `fxhash`-backed map/set aliases.
pub mod hash;
/// The AIG manager: arena, structural hashing, traversal IDs, levels.
pub mod manager;
/// Crate-wide user-facing error type.
pub mod error;

/// Postorder traversal, MFFC computation, reconvergence-window growth.
pub mod dfs;
/// k-feasible cut enumeration with 16-bit truth tables.
pub mod cut;
/// NPN canonicalization of 4-input truth tables.
pub mod npn;
/// Arbitrary-width truth tables for refactor/resub/library.
pub mod truth;
/// Quine-McCluskey-derived algebraic factoring.
pub mod factor;
/// The 4-input NPN-class rewrite library.
pub mod library;

/// Library-based 4-cut rewriting.
pub mod rewrite;
/// AND-tree balancing.
pub mod balance;
/// Window-local algebraic refactoring.
pub mod refactor;
/// Divisor-based resubstitution.
pub mod resub;

/// AIGER binary format reader/writer.
pub mod aiger;
/// Whole-network invariant checker.
pub mod check;

/// Hand-rolled getopt-style flag parser for the command loop.
pub mod getopt;
/// The interactive command loop.
pub mod cli;
