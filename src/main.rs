//! RustMemORM demo
//!
//! Runs the hero/team walkthroughs against fresh database files.
//!
//! ```bash
//! # everything, in the current directory
//! rustmemorm
//!
//! # only the join walkthrough, echoing every storage operation
//! rustmemorm --echo --data-dir /tmp/heroes joins
//! ```

mod cli;

use std::process::ExitCode;

use clap::Parser;

use cli::app::{App, Args};

fn main() -> ExitCode {
    let args = Args::parse();
    cli::init_logging(args.verbose, args.echo);

    match App::new(args).run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
