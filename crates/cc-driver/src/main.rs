//! `ccvm` binary entry point. `main` itself is `anyhow::Result`-returning,
//! as `raya-cli::main` is, but the exit code spec §6/§7 mandates (`0`
//! success, `1` any failure, reported as one stderr line with the stage
//! and line number) is computed explicitly here rather than left to
//! anyhow's default `Debug`-dump-and-exit-1 behavior.

use cc_driver::cli::Cli;
use cc_driver::{diagnostics, run, Outcome};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(Outcome::Built { path: Some(path) }) => {
            if cli.verbose {
                diagnostics::report_progress(&format!("wrote {}", path.display()));
            }
            Ok(())
        }
        Ok(Outcome::Built { path: None }) | Ok(Outcome::Dumped) => Ok(()),
        Ok(Outcome::Ran { status }) => std::process::exit(status),
        Err(err) => {
            diagnostics::report_error(err.stage(), err.line(), &err.to_string());
            std::process::exit(1);
        }
    }
}
