//! Surge - a reactive server component engine.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use surge::cli::{self, Cli, Commands};
use surge::config::{SurgeConfig, init_config};
use surge::logger;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    surge::core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = init_config(SurgeConfig::load(&cli.config)?);
    logger::set_verbose(cli.verbose || config.engine.env.is_dev());

    let engine = cli::build_engine(config)?;

    match &cli.command {
        Commands::Serve { interface, port } => {
            cli::serve::bind_server(engine, *interface, *port)?.run()
        }
        Commands::Index => cli::index::run_index(&engine),
        Commands::Render { route } => cli::render::run_render(&engine, route),
    }
}
