//! toolshed command-line entry point.

use toolshed::cli::{self, EXIT_CLI, EXIT_OK, exit_code_for, render_error};
use toolshed::commands;
use toolshed::tracing::{TracingConfig, init_tracing};

#[allow(clippy::print_stderr)]
fn main() {
    let cli = cli::parse();

    let config = TracingConfig {
        format: cli.log_format,
        level: cli.level.into(),
        filter: None,
    };
    if let Err(e) = init_tracing(config) {
        eprintln!("{e:?}");
        std::process::exit(EXIT_CLI);
    }

    let code = match commands::run(&cli) {
        Ok(()) => EXIT_OK,
        Err(err) => {
            let code = exit_code_for(&err);
            tracing::debug!(code, "Command failed");
            render_error(err);
            code
        }
    };
    std::process::exit(code);
}
