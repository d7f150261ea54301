//! Smellcheck CLI entry point.

use clap::Parser;
use smellcheck::cli::{self, Cli, Commands, EXIT_ERROR};
use smellcheck::logging;

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.quiet, cli.verbose);

    let outcome = match &cli.command {
        Commands::Check(args) => cli::run_check(args),
        Commands::Rules => cli::run_rules(),
        Commands::Init(args) => cli::run_init(args),
    };

    let exit_code = match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
