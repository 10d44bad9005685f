mod args;
mod output;

use anyhow::{Context, Result};
use mailcheck_bulk::Verifier;

use crate::args::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let options = cli.verify_options()?;
    let addresses = cli.read_addresses()?;
    if addresses.is_empty() {
        Cli::clap_command().print_help()?;
        println!();
        return Ok(());
    }

    let mut verifier = Verifier::from_system_conf(options).context("init DNS resolver")?;
    if cli.progress {
        verifier = verifier.on_progress(|snap| eprintln!("progress: {snap}"));
    }

    let verdicts = verifier.check_emails(&addresses, &cli.proxies).await;
    output::write_reports(&verdicts, &cli)?;

    // codes de sortie : 0 OK, 2 au moins un lot en échec, 1 fatal
    if output::any_failed(&verdicts) {
        std::process::exit(2);
    }
    Ok(())
}

#[cfg(feature = "with-tracing")]
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(not(feature = "with-tracing"))]
fn init_tracing() {}
