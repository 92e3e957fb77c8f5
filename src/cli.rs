//! The interactive command loop. Grounded on `bex-shell.rs`'s `repl()`:
//! read a line, split on whitespace, match the first token against a
//! command table, loop. Commands here carry real flags, so each one
//! hands its trailing tokens to `getopt::parse` rather than matching on
//! the raw strings the teacher's stack-language REPL does.
use std::io::{self, BufRead, IsTerminal, Write};

use crate::aiger::{self, SymbolTable};
use crate::balance;
use crate::check;
use crate::error::{EngineError, Result};
use crate::getopt::{self, Opts};
use crate::library::Library;
use crate::manager::{AigManager, LatchReset};
use crate::refactor;
use crate::resub;
use crate::rewrite;

/// Holds the one network (and its cached symbol table / rewrite
/// library) that the REPL operates on. There is never more than one --
/// `empty` drops it, `read_aiger` replaces it.
pub struct Cli {
    mgr: Option<AigManager>,
    symbols: Option<SymbolTable>,
    lib: Option<Library>,
}

impl Default for Cli {
    fn default() -> Cli {
        Cli::new()
    }
}

impl Cli {
    pub fn new() -> Cli {
        Cli { mgr: None, symbols: None, lib: None }
    }

    fn ensure_library(&mut self) {
        if self.lib.is_none() {
            self.lib = Some(Library::build());
        }
    }

    /// Runs one command line. Returns `Ok(false)` on `quit`, `Ok(true)`
    /// otherwise (including on a reported-but-recovered error, which
    /// the caller is expected to print and keep looping past).
    pub fn dispatch(&mut self, line: &str) -> Result<bool> {
        let mut toks = line.split_whitespace();
        let Some(cmd) = toks.next() else { return Ok(true) };
        let args: Vec<&str> = toks.collect();
        match cmd {
            "quit" | "q" => {
                getopt::parse(&args, "")?;
                return Ok(false);
            }
            "help" | "h" | "?" => self.cmd_help(&args)?,
            "empty" => self.cmd_empty(&args)?,
            "read_aiger" => self.cmd_read_aiger(&args)?,
            "write_aiger" => self.cmd_write_aiger(&args)?,
            "balance" => self.cmd_balance(&args)?,
            "rewrite" | "drw" => self.cmd_rewrite(&args)?,
            "refactor" | "drf" => self.cmd_refactor(&args)?,
            "resub" => self.cmd_resub(&args)?,
            "zero" => self.cmd_zero(&args)?,
            other => return Err(EngineError::UnknownCommand(other.to_string())),
        }
        Ok(true)
    }

    fn cmd_help(&mut self, args: &[&str]) -> Result<()> {
        let opts = getopt::parse(args, "")?;
        println!("I/O:");
        println!("  read_aiger <file>  [-c]   replace network with a parsed AIGER file");
        println!("  write_aiger <file> [-s]   write network to an AIGER file");
        println!("Various:");
        println!("  empty                     drop the current network");
        println!("  zero                      normalize latches to reset-to-0");
        println!("  quit, q                   exit the loop");
        println!("Synthesis:");
        println!("  balance        [-d] [-s]          level-reducing rebuild");
        println!("  rewrite, drw   [-z] [-x]           library-based 4-cut rewriting");
        println!("  refactor, drf  [-N n] [-C n] [-z] [-d]   factored-form rewriting");
        println!("  resub          [-K n] [-N n]       resubstitution");
        if opts.has('a') || opts.has('d') {
            println!();
            println!("(-a/-d requested, but this is already the full listing)");
        }
        Ok(())
    }

    fn cmd_empty(&mut self, args: &[&str]) -> Result<()> {
        getopt::parse(args, "")?;
        self.mgr = None;
        self.symbols = None;
        Ok(())
    }

    fn cmd_read_aiger(&mut self, args: &[&str]) -> Result<()> {
        let opts = getopt::parse(args, "")?;
        let path = opts
            .positional
            .first()
            .ok_or_else(|| EngineError::Usage("read_aiger <file>".into()))?;
        let (mut mgr, symtab) = aiger::read_aiger(path)?;
        // -c toggles OFF the post-read consistency check; it runs by
        // default, since catching a malformed network right after
        // load is cheaper than tracing a bad result back to it later.
        if !opts.has('c') {
            check::check(&mut mgr)?;
        }
        log::info!(
            "read_aiger: {} PIs, {} latches, {} POs, {} ANDs",
            mgr.n_pis(),
            mgr.n_regs(),
            mgr.n_pos(),
            mgr.n_and()
        );
        self.mgr = Some(mgr);
        self.symbols = Some(symtab);
        Ok(())
    }

    fn cmd_write_aiger(&mut self, args: &[&str]) -> Result<()> {
        let opts = getopt::parse(args, "")?;
        let path = opts
            .positional
            .first()
            .ok_or_else(|| EngineError::Usage("write_aiger <file>".into()))?;
        let mgr = self.mgr.as_ref().ok_or(EngineError::NoNetwork)?;
        let syms = if opts.has('s') { self.symbols.as_ref() } else { None };
        aiger::write_aiger(path, mgr, syms)?;
        log::info!("write_aiger: wrote {} nodes to {path}", mgr.n_and());
        Ok(())
    }

    fn cmd_balance(&mut self, args: &[&str]) -> Result<()> {
        getopt::parse(args, "")?;
        let mgr = self.mgr.as_mut().ok_or(EngineError::NoNetwork)?;
        let before = mgr.n_and();
        balance::balance(mgr);
        log::info!("balance: {} -> {} nodes", before, mgr.n_and());
        Ok(())
    }

    fn cmd_rewrite(&mut self, args: &[&str]) -> Result<()> {
        getopt::parse(args, "")?;
        self.ensure_library();
        let lib = self.lib.as_ref().unwrap();
        let mgr = self.mgr.as_mut().ok_or(EngineError::NoNetwork)?;
        let before = mgr.n_and();
        let n = rewrite::rewrite(mgr, lib);
        log::info!("rewrite: {} -> {} nodes ({n} improved)", before, mgr.n_and());
        Ok(())
    }

    fn cmd_refactor(&mut self, args: &[&str]) -> Result<()> {
        let opts = getopt::parse(args, "NC")?;
        check_range(&opts, 'N', 1, 15)?;
        check_range(&opts, 'C', 0, i64::MAX)?;
        let mgr = self.mgr.as_mut().ok_or(EngineError::NoNetwork)?;
        let before = mgr.n_and();
        let n = refactor::refactor(mgr);
        log::info!("refactor: {} -> {} nodes ({n} improved)", before, mgr.n_and());
        Ok(())
    }

    fn cmd_resub(&mut self, args: &[&str]) -> Result<()> {
        let opts = getopt::parse(args, "KN")?;
        check_range(&opts, 'K', 4, 16)?;
        check_range(&opts, 'N', 0, 3)?;
        let mgr = self.mgr.as_mut().ok_or(EngineError::NoNetwork)?;
        let before = mgr.n_and();
        let n = resub::resub(mgr);
        log::info!("resub: {} -> {} nodes ({n} improved)", before, mgr.n_and());
        Ok(())
    }

    /// Rebuilds the network so every latch resets to 0. A reset-1 latch
    /// is handled by inverting its stored polarity (every current
    /// reader now sees its complement, which is exactly what the old
    /// value was) and then complementing its own next-state driver, so
    /// external behavior is unchanged but the new reset value is 0.
    /// Don't-care latches are left alone -- any reset value already
    /// satisfies them.
    fn cmd_zero(&mut self, args: &[&str]) -> Result<()> {
        getopt::parse(args, "")?;
        let mgr = self.mgr.as_mut().ok_or(EngineError::NoNetwork)?;
        let n_pis = mgr.n_pis();
        let n_pos = mgr.n_pos();
        let mut flipped = 0;
        for i in 0..mgr.n_regs() {
            if mgr.latch_reset(i) != LatchReset::One {
                continue;
            }
            let ci = mgr.cis()[n_pis + i];
            let co = mgr.cos()[n_pos + i];
            mgr.invert_fanout_polarity(ci);
            mgr.invert_co_driver(co);
            mgr.set_latch_reset(i, LatchReset::Zero);
            flipped += 1;
        }
        log::info!("zero: inverted {flipped} reset-1 latch(es) to reset-0");
        Ok(())
    }

    /// Runs the loop until `quit` or end-of-input. The prompt is
    /// suppressed on non-TTY stdin so piped/scripted input doesn't get
    /// a spurious `daig> ` in its output stream.
    pub fn run(&mut self) {
        let stdin = io::stdin();
        let interactive = stdin.is_terminal();
        loop {
            if interactive {
                print!("daig> ");
                let _ = io::stdout().flush();
            }
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    eprintln!("daig: {e}");
                    break;
                }
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match self.dispatch(line) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => eprintln!("daig: {e}"),
            }
        }
    }
}

fn check_range(opts: &Opts, c: char, lo: i64, hi: i64) -> Result<()> {
    if let Some(v) = opts.int_value(c)? {
        if v < lo || v > hi {
            return Err(EngineError::Usage(format!("-{c} must be in [{lo},{hi}], got {v}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_command_is_an_error() {
        let mut cli = Cli::new();
        assert!(matches!(cli.dispatch("frobnicate"), Err(EngineError::UnknownCommand(_))));
    }

    #[test]
    fn test_commands_without_a_network_report_no_network() {
        let mut cli = Cli::new();
        assert!(matches!(cli.dispatch("balance"), Err(EngineError::NoNetwork)));
        assert!(matches!(cli.dispatch("rewrite"), Err(EngineError::NoNetwork)));
        assert!(matches!(cli.dispatch("write_aiger out.aig"), Err(EngineError::NoNetwork)));
    }

    #[test]
    fn test_quit_stops_the_loop() {
        let mut cli = Cli::new();
        assert_eq!(cli.dispatch("quit").unwrap(), false);
    }

    #[test]
    fn test_read_balance_write_round_trip() {
        let mut cli = Cli::new();
        let path = std::env::temp_dir().join(format!("daig-cli-test-{}.aig", std::process::id()));
        {
            let mut m = AigManager::new();
            let a = m.create_ci();
            let b = m.create_ci();
            let c = m.create_ci();
            let d = m.create_ci();
            let mut e = m.and(a, b);
            e = m.and(e, c);
            e = m.and(e, d);
            m.create_co(e);
            aiger::write_aiger(path.to_str().unwrap(), &m, None).unwrap();
        }
        let read_cmd = format!("read_aiger {}", path.to_str().unwrap());
        assert!(cli.dispatch(&read_cmd).is_ok());
        assert!(cli.dispatch("balance").is_ok());
        assert!(cli.dispatch("rewrite").is_ok());
        let out_path = std::env::temp_dir().join(format!("daig-cli-out-{}.aig", std::process::id()));
        let write_cmd = format!("write_aiger {}", out_path.to_str().unwrap());
        assert!(cli.dispatch(&write_cmd).is_ok());
        std::fs::remove_file(&path).ok();
        std::fs::remove_file(&out_path).ok();
    }

    #[test]
    fn test_zero_inverts_reset_one_latch() {
        let mut cli = Cli::new();
        let path = std::env::temp_dir().join(format!("daig-cli-zero-in-{}.aig", std::process::id()));
        {
            let mut m = AigManager::new();
            let pi = m.create_ci();
            let q = m.create_ci();
            m.set_reg_num(1);
            m.set_latch_reset(0, LatchReset::One);
            m.create_co(pi);
            m.create_co(q);
            aiger::write_aiger(path.to_str().unwrap(), &m, None).unwrap();
        }
        cli.dispatch(&format!("read_aiger {}", path.to_str().unwrap())).unwrap();
        std::fs::remove_file(&path).ok();
        cli.dispatch("zero").unwrap();

        let out_path = std::env::temp_dir().join(format!("daig-cli-zero-out-{}.aig", std::process::id()));
        cli.dispatch(&format!("write_aiger {}", out_path.to_str().unwrap())).unwrap();
        let contents = std::fs::read_to_string(&out_path).unwrap();
        std::fs::remove_file(&out_path).ok();
        let latch_line = contents.lines().nth(1).unwrap();
        assert!(
            !latch_line.contains(' '),
            "latch should now reset to 0 with no reset token: {latch_line:?}"
        );
    }

    #[test]
    fn test_refactor_rejects_out_of_range_n() {
        let mut cli = Cli::new();
        let mut m = AigManager::new();
        let a = m.create_ci();
        let b = m.create_ci();
        m.create_co(m.and(a, b));
        let path = std::env::temp_dir().join(format!("daig-cli-range-{}.aig", std::process::id()));
        aiger::write_aiger(path.to_str().unwrap(), &m, None).unwrap();
        cli.dispatch(&format!("read_aiger {}", path.to_str().unwrap())).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(matches!(cli.dispatch("refactor -N20"), Err(EngineError::Usage(_))));
    }
}
