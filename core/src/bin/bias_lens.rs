//! bias-lens binary: analyze job descriptions from the command line.
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.

use bias_lens::cli::{run, Cli};
use clap::Parser;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
