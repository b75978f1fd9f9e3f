//! nbcheck CLI entry point

use clap::Parser;

fn main() {
    let cli = nbcheck::cli::Cli::parse();

    // Initialize structured logging with env-based filter, defaulting to info
    nbcheck::logging::init(cli.verbose);

    nbcheck::cli::run(cli);
}
