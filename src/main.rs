#![forbid(unsafe_code)]

//! blf — backlog forecast CLI entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    match cli_app::run(&args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("blf: {e}");
            std::process::exit(1);
        }
    }
}
