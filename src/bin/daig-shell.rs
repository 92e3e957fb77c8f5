//! Thin binary wrapper over the `daig` library: initializes logging,
//! then hands off to the command loop. Mirrors the way `bex-shell`
//! sits as a small binary on top of the `bex` library crate.
use simplelog::{Config, LevelFilter, TermLogger};

include!(concat!(env!("OUT_DIR"), "/daig-build-info.rs"));

fn main() {
    TermLogger::init(LevelFilter::Info, Config::default()).expect("failed to init logger");
    println!("daig-shell {DAIG_VERSION} | compile flags: -O{DAIG_OPT_LEVEL} | type 'quit' to exit");
    daig::cli::Cli::new().run();
}
