use clap::Parser;
use kkcards::cli::{Cli, run_cli};
use kkcards::output::OutputFormatter;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run_cli(cli.command(), &cli.dir, cli.config.as_deref(), cli.json) {
        OutputFormatter::error(&e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
