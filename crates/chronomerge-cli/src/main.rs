//! Chronomerge CLI - import and merge time-series files.

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    logging::init_logging(&logging::LogConfig::from_verbose(cli.verbose));

    let result = match cli.command {
        Commands::Inspect { files, json } => commands::inspect::run(files, json, cli.verbose),

        Commands::Import {
            files,
            rename,
            pivot,
            group,
            date,
            local_pivot,
            api_url,
            start,
            end,
            output,
        } => commands::import::run(
            commands::import::ImportArgs {
                files,
                rename,
                pivot,
                group,
                date,
                local_pivot,
                api_url,
                start,
                end,
                output,
            },
            cli.verbose,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
