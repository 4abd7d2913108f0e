use std::process::ExitCode;

use clap::Parser;

mod args;
mod cmd;
mod config;
mod logging;
mod output;

fn main() -> ExitCode {
    let cli = args::Cli::parse();
    logging::init(cli.log_json);
    output::init(cli.json);

    match cmd::dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            output::error(&e);
            ExitCode::FAILURE
        }
    }
}
