use std::process::ExitCode;

use clap::Parser;
use cli::{Args, Commands};
use commands::{build_request, init, open_database, print_response};
use glossa_config::{
    config::{self, get_config, set_config_path},
    utils::resolve_path,
};
use glossa_core::{
    registry::Registry,
    service::ModuleService,
    CoreResult,
};
use logging::setup_logging;
use tracing::debug;
use utils::disable_color;

mod cli;
mod commands;
mod logging;
mod utils;

/// Runs the command line, returning whether the request succeeded.
fn handle_cli() -> CoreResult<bool> {
    let args = Args::parse();

    if args.no_color {
        disable_color();
    }
    setup_logging(&args);

    if let Some(ref path) = args.config {
        set_config_path(resolve_path(path)?);
    }
    config::init()?;

    let config = get_config();
    let db = open_database(&config)?;

    match args.command {
        Commands::Init => {
            init(&db, &config)?;
            Ok(true)
        }
        command => {
            let request = build_request(command, args.locale)?;
            debug!("Dispatching {} request", request.method);

            let service = ModuleService::new(db, Registry::default(), config);
            let response = service.handle(&request);
            print_response(&response);
            Ok(response.success)
        }
    }
}

fn main() -> ExitCode {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    match handle_cli() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::FAILURE
        }
    }
}
