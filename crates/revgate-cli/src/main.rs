//! Revgate CLI: the `revgate` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    support::init_tracing();

    match cli.command {
        Commands::Parse { line, json } => commands::parse::run(line, json),

        Commands::Evaluate {
            snapshot,
            census,
            config,
            write,
            json,
        } => commands::evaluate::run(snapshot, census, config, write, json),

        Commands::Gate {
            snapshot,
            action,
            census,
            config,
            write,
            json,
        } => commands::gate::run(snapshot, action.into(), census, config, write, json),

        Commands::Watch {
            snapshot,
            census,
            config,
            passes,
            interval_secs,
            write,
        } => commands::watch::run(commands::watch::Args {
            snapshot,
            census,
            config,
            passes,
            interval_secs,
            write,
        }),
    }
}
